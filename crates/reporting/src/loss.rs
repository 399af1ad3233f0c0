//! Loss analysis — lost cards grouped by reason.

use crate::group::OrderedGroups;
use crm_core::Card;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossMetric {
    pub reason: String,
    pub value: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossSummary {
    pub reasons: Vec<LossMetric>,
    pub total_lost_value: f64,
    pub lost_count: u64,
}

#[derive(Default)]
struct ReasonAccumulator {
    value: f64,
    count: u64,
}

/// Lost cards grouped by reason ("No reason" when absent), sorted by summed
/// value descending. Ties keep first-seen order.
pub fn aggregate_loss(cards: &[Card]) -> Vec<LossMetric> {
    let mut groups: OrderedGroups<ReasonAccumulator> = OrderedGroups::new();
    for card in cards.iter().filter(|c| c.is_lost()) {
        let acc = groups.entry(card.loss_reason());
        acc.value += card.deal_value();
        acc.count += 1;
    }

    let mut metrics: Vec<LossMetric> = groups
        .into_vec()
        .into_iter()
        .map(|(reason, acc)| LossMetric {
            reason,
            value: acc.value,
            count: acc.count,
        })
        .collect();
    metrics.sort_by(|a, b| b.value.total_cmp(&a.value));

    debug!(reasons = metrics.len(), "Losses aggregated");
    metrics
}

/// [`aggregate_loss`] plus the totals shown next to the breakdown.
pub fn summarize_losses(cards: &[Card]) -> LossSummary {
    let reasons = aggregate_loss(cards);
    LossSummary {
        total_lost_value: reasons.iter().map(|r| r.value).sum(),
        lost_count: reasons.iter().map(|r| r.count).sum(),
        reasons,
    }
}
