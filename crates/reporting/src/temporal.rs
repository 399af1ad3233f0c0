//! Time bucketing — card counts and value per day, Sunday-starting week,
//! or month of creation.

use chrono::{DateTime, Utc};
use crm_core::time::week_start_sunday;
use crm_core::Card;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// Bucket key for a creation instant: `YYYY-MM-DD` for day and week
    /// (the week's Sunday), `YYYY-MM` for month.
    pub fn period_key(&self, at: &DateTime<Utc>) -> String {
        let date = at.date_naive();
        match self {
            Granularity::Day => date.format("%Y-%m-%d").to_string(),
            Granularity::Week => week_start_sunday(date).format("%Y-%m-%d").to_string(),
            Granularity::Month => date.format("%Y-%m").to_string(),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        };
        f.write_str(name)
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            other => Err(format!("unknown granularity '{other}' (expected day, week or month)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    pub period: String,
    pub count: u64,
    pub value: f64,
}

/// Bucket cards by creation period. Cards with a malformed or missing
/// creation timestamp are left out entirely.
pub fn aggregate_by_period(
    cards: &[Card],
    granularity: Granularity,
) -> BTreeMap<String, PeriodAggregate> {
    let mut buckets: BTreeMap<String, PeriodAggregate> = BTreeMap::new();

    for card in cards {
        let Some(created) = card.created_at_utc() else {
            continue;
        };
        let key = granularity.period_key(&created);
        let bucket = buckets
            .entry(key.clone())
            .or_insert_with(|| PeriodAggregate {
                period: key,
                count: 0,
                value: 0.0,
            });
        bucket.count += 1;
        bucket.value += card.deal_value();
    }

    debug!(%granularity, buckets = buckets.len(), "Periods aggregated");
    buckets
}

/// Buckets in ascending period order, keeping only the most recent
/// `last_n` when given.
pub fn period_series(
    cards: &[Card],
    granularity: Granularity,
    last_n: Option<usize>,
) -> Vec<PeriodAggregate> {
    let series: Vec<PeriodAggregate> = aggregate_by_period(cards, granularity)
        .into_values()
        .collect();
    match last_n {
        Some(n) if n < series.len() => series[series.len() - n..].to_vec(),
        _ => series,
    }
}
