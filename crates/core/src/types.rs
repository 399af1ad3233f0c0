use crate::error::{CrmError, CrmResult};
use crate::time::{
    days_between, minutes_between, parse_timestamp, start_of_day, start_of_next_day,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Grouping label for cards without any stage field.
pub const NO_STAGE: &str = "No stage";
/// Grouping label for lost cards without a loss reason.
pub const NO_REASON: &str = "No reason";
/// Grouping label for cards missing the ranked entity field.
pub const NO_ENTITY: &str = "None";

/// Status spellings the CRM uses for a won card.
pub const CLOSED_STATUSES: [&str; 2] = ["closed", "concluido"];
/// Status spellings the CRM uses for a lost card.
pub const LOST_STATUSES: [&str; 2] = ["lost", "perdido"];

/// Person responsible for a card, as embedded by the CRM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponsibleUser {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// One sales-pipeline opportunity exported by the CRM.
///
/// The CRM has renamed several fields over time and does not populate the
/// old and new names consistently, so both generations are kept here and
/// every computation goes through one of the resolution methods below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub title: Option<String>,
    pub panel_id: Option<String>,
    pub step_id: Option<String>,
    pub step_title: Option<String>,
    pub monetary_amount: Option<f64>,
    pub archived: bool,
    /// Raw ISO-8601 text; may be missing or malformed.
    pub created_at: Option<String>,
    /// Raw ISO-8601 text; may be missing or malformed.
    pub updated_at: Option<String>,
    pub responsible_user_id: Option<String>,
    pub responsible_user: Option<ResponsibleUser>,

    // Legacy fields
    pub stage: Option<String>,
    pub value: Option<f64>,
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub channel: Option<String>,
    pub lost_reason: Option<String>,
    pub product: Option<String>,
}

/// Logical state derived from the free-text status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Closed,
    Lost,
    Other,
}

impl CardStatus {
    /// Exact match against the recognized spellings; anything else is `Other`.
    pub fn classify(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if CLOSED_STATUSES.contains(&s) => CardStatus::Closed,
            Some(s) if LOST_STATUSES.contains(&s) => CardStatus::Lost,
            _ => CardStatus::Other,
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn finite(amount: Option<f64>) -> Option<f64> {
    amount.filter(|v| v.is_finite())
}

impl Card {
    pub fn status(&self) -> CardStatus {
        CardStatus::classify(self.status.as_deref())
    }

    pub fn is_closed(&self) -> bool {
        self.status() == CardStatus::Closed
    }

    pub fn is_lost(&self) -> bool {
        self.status() == CardStatus::Lost
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        self.updated_at.as_deref().and_then(parse_timestamp)
    }

    fn lifetime(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.created_at_utc()?, self.updated_at_utc()?))
    }

    /// Whole days between creation and last update, `None` when either
    /// timestamp is malformed or the difference is negative.
    pub fn dwell_days(&self) -> Option<i64> {
        self.lifetime()
            .map(|(created, updated)| days_between(&created, &updated))
            .filter(|days| *days >= 0)
    }

    /// Whole minutes between creation and last update, with the same
    /// exclusions as [`Card::dwell_days`].
    pub fn lifetime_minutes(&self) -> Option<i64> {
        self.lifetime()
            .map(|(created, updated)| minutes_between(&created, &updated))
            .filter(|minutes| *minutes >= 0)
    }

    /// Stage label without a name lookup:
    /// `stepTitle` → `stepId` → `stage` → [`NO_STAGE`].
    pub fn stage_label(&self) -> &str {
        non_empty(&self.step_title)
            .or_else(|| non_empty(&self.step_id))
            .or_else(|| non_empty(&self.stage))
            .unwrap_or(NO_STAGE)
    }

    /// Amount used by the funnel: `monetaryAmount` → `value` → 0.
    /// A zero monetary amount falls through to the legacy value.
    pub fn funnel_value(&self) -> f64 {
        finite(self.monetary_amount)
            .filter(|v| *v != 0.0)
            .or_else(|| finite(self.value))
            .unwrap_or(0.0)
    }

    /// Amount used by revenue, loss, period and entity rollups:
    /// the legacy `value` field, or 0.
    pub fn deal_value(&self) -> f64 {
        finite(self.value).unwrap_or(0.0)
    }

    /// Owner key: `responsibleUserId` → `assignedTo`.
    pub fn owner_id(&self) -> Option<&str> {
        non_empty(&self.responsible_user_id).or_else(|| non_empty(&self.assigned_to))
    }

    /// True when either owner field equals `owner_id`.
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.responsible_user_id.as_deref() == Some(owner_id)
            || self.assigned_to.as_deref() == Some(owner_id)
    }

    pub fn channel_id(&self) -> Option<&str> {
        non_empty(&self.channel)
    }

    pub fn loss_reason(&self) -> &str {
        non_empty(&self.lost_reason).unwrap_or(NO_REASON)
    }

    pub fn product_label(&self) -> Option<&str> {
        non_empty(&self.product)
    }

    pub fn owner_name(&self) -> Option<&str> {
        self.responsible_user
            .as_ref()
            .and_then(|user| non_empty(&user.name))
    }
}

/// Dashboard-level narrowing applied before any aggregation.
/// A `None` field places no restriction on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardFilters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub user_id: Option<String>,
    pub channel_id: Option<String>,
    /// Scopes the source query; the aggregation engine ignores it.
    pub panel_id: Option<String>,
}

impl DashboardFilters {
    /// Parse a `YYYY-MM-DD` bound supplied by a user.
    pub fn parse_date(raw: &str) -> CrmResult<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| CrmError::InvalidFilter(format!("date '{raw}': {e}")))
    }

    pub fn with_period(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn with_panel(mut self, panel_id: impl Into<String>) -> Self {
        self.panel_id = Some(panel_id.into());
        self
    }

    /// Instant range covered by the date bounds: the start is inclusive,
    /// the end is the exclusive first instant after `end_date`.
    pub fn period_bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (
            self.start_date.map(start_of_day),
            self.end_date.map(start_of_next_day),
        )
    }

    pub fn has_period(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Reject a start date after the end date.
    pub fn validate(&self) -> CrmResult<()> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(CrmError::InvalidFilter(format!(
                "start date {start} is after end date {end}"
            ))),
            _ => Ok(()),
        }
    }
}

/// List envelope returned by the CRM card endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CardResponse {
    pub items: Vec<Card>,
    pub total_items: Option<u64>,
    pub total_pages: Option<u32>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}
