//! Revenue over closed cards, with per-seller and per-channel breakdowns.

use crate::rates::average_ticket;
use crm_core::Card;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueMetrics {
    pub total_revenue: f64,
    pub average_ticket: f64,
    pub closed_count: u64,
    pub revenue_by_seller: BTreeMap<String, f64>,
    pub revenue_by_channel: BTreeMap<String, f64>,
}

/// Sum the legacy `value` of every closed card. Cards without an owner or
/// channel are left out of that breakdown rather than bucketed as unknown.
pub fn aggregate_revenue(cards: &[Card]) -> RevenueMetrics {
    let mut metrics = RevenueMetrics::default();

    for card in cards.iter().filter(|c| c.is_closed()) {
        let value = card.deal_value();
        metrics.total_revenue += value;
        metrics.closed_count += 1;

        if let Some(owner) = card.owner_id() {
            *metrics
                .revenue_by_seller
                .entry(owner.to_string())
                .or_insert(0.0) += value;
        }
        if let Some(channel) = card.channel_id() {
            *metrics
                .revenue_by_channel
                .entry(channel.to_string())
                .or_insert(0.0) += value;
        }
    }

    metrics.average_ticket = average_ticket(metrics.total_revenue, metrics.closed_count);
    debug!(
        closed = metrics.closed_count,
        total_revenue = metrics.total_revenue,
        "Revenue aggregated"
    );
    metrics
}
