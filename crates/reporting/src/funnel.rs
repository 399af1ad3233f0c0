//! Funnel stage aggregation — lead count, value, dwell time and conversion
//! rate per pipeline stage.

use crate::group::OrderedGroups;
use crate::rates::{conversion_rate, mean_of};
use crate::stage::{pipeline_rank, resolve_stage, StageLookup};
use crm_core::Card;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelMetric {
    pub stage: String,
    pub leads: u64,
    pub value: f64,
    /// Percentage in `[0, 100]`; see [`aggregate_funnel_with`].
    pub conversion_rate: f64,
    pub average_days: f64,
}

#[derive(Default)]
struct StageAccumulator {
    leads: u64,
    value: f64,
    dwell_days: Vec<i64>,
}

/// Funnel over `cards` with no stage-name lookup.
pub fn aggregate_funnel(cards: &[Card]) -> Vec<FunnelMetric> {
    aggregate_funnel_with(cards, &())
}

/// Funnel over `cards`, naming stages through `lookup`.
///
/// Rows are sorted by lead count descending (ties keep first-seen order).
/// The first row's conversion rate is 100; every later row's rate is its
/// lead count over the summed leads of all rows ranked above it. This is a
/// rank-based drop-off, not stage-to-stage progression, and dashboards
/// depend on it as is.
pub fn aggregate_funnel_with<L>(cards: &[Card], lookup: &L) -> Vec<FunnelMetric>
where
    L: StageLookup + ?Sized,
{
    let mut groups: OrderedGroups<StageAccumulator> = OrderedGroups::new();
    for card in cards {
        let acc = groups.entry(&resolve_stage(card, lookup));
        acc.leads += 1;
        acc.value += card.funnel_value();
        if let Some(days) = card.dwell_days() {
            acc.dwell_days.push(days);
        }
    }

    let mut stages = groups.into_vec();
    stages.sort_by(|a, b| b.1.leads.cmp(&a.1.leads));

    let mut leads_above = 0u64;
    let metrics: Vec<FunnelMetric> = stages
        .into_iter()
        .map(|(stage, acc)| {
            let rate = if leads_above > 0 {
                conversion_rate(acc.leads, leads_above)
            } else {
                100.0
            };
            leads_above += acc.leads;
            FunnelMetric {
                stage,
                leads: acc.leads,
                value: acc.value,
                conversion_rate: rate,
                average_days: mean_of(acc.dwell_days),
            }
        })
        .collect();

    debug!(cards = cards.len(), stages = metrics.len(), "Funnel aggregated");
    metrics
}

/// Reorder rows into the canonical pipeline `order` for display. Stages not
/// in the order go last, keeping their relative position. Conversion rates
/// are left exactly as computed.
pub fn sort_by_pipeline_order(metrics: &mut [FunnelMetric], order: &[String]) {
    metrics.sort_by_key(|m| pipeline_rank(&m.stage, order));
}
