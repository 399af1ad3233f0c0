//! Record filter pipeline — narrows the raw card collection by creation
//! period, owner and channel before any aggregation runs.
//!
//! Every step is order-preserving and idempotent. The pipeline always runs
//! period → owner → channel.

use chrono::{DateTime, NaiveDate, Utc};
use crm_core::time::{start_of_day, start_of_next_day};
use crm_core::{Card, DashboardFilters};
use tracing::debug;

fn in_period(card: &Card, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
    let Some(created) = card.created_at_utc() else {
        return false;
    };
    start.map_or(true, |s| created >= s) && end.map_or(true, |e| created < e)
}

/// Keep cards created on or after `start` 00:00:00 and before the day
/// following `end`, so the whole end date is included.
///
/// With both bounds absent the input is returned unchanged, including cards
/// whose creation timestamp is malformed. With any bound present such cards
/// are dropped.
pub fn filter_by_period(
    cards: &[Card],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<Card> {
    if start.is_none() && end.is_none() {
        return cards.to_vec();
    }
    let (start, end) = (start.map(start_of_day), end.map(start_of_next_day));
    cards
        .iter()
        .filter(|card| in_period(card, start, end))
        .cloned()
        .collect()
}

/// Keep cards whose current or legacy owner field equals `owner_id`.
pub fn filter_by_owner(cards: &[Card], owner_id: Option<&str>) -> Vec<Card> {
    match owner_id {
        Some(owner) => cards
            .iter()
            .filter(|card| card.is_owned_by(owner))
            .cloned()
            .collect(),
        None => cards.to_vec(),
    }
}

/// Keep cards whose channel equals `channel_id`.
pub fn filter_by_channel(cards: &[Card], channel_id: Option<&str>) -> Vec<Card> {
    match channel_id {
        Some(channel) => cards
            .iter()
            .filter(|card| card.channel.as_deref() == Some(channel))
            .cloned()
            .collect(),
        None => cards.to_vec(),
    }
}

/// Run the full pipeline. Filters compose by conjunction; absent fields
/// impose no constraint. `panel_id` is a source concern and is ignored here.
pub fn apply_filters(cards: &[Card], filters: &DashboardFilters) -> Vec<Card> {
    let mut out = cards.to_vec();

    if filters.has_period() {
        let (start, end) = filters.period_bounds();
        out.retain(|card| in_period(card, start, end));
    }
    if let Some(owner) = filters.user_id.as_deref() {
        out.retain(|card| card.is_owned_by(owner));
    }
    if let Some(channel) = filters.channel_id.as_deref() {
        out.retain(|card| card.channel.as_deref() == Some(channel));
    }

    debug!(cards_in = cards.len(), cards_out = out.len(), "Filters applied");
    out
}
