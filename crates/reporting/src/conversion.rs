//! Overall conversion, sales cycle and response-time metrics.

use crate::rates::{conversion_rate, mean_of};
use crm_core::Card;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionMetrics {
    /// Closed cards over all cards, as a percentage.
    pub overall_conversion_rate: f64,
    /// Mean days from creation to last update over every card with a valid
    /// timestamp pair, closed or not.
    pub average_sales_cycle: f64,
    /// Mean minutes from creation to last update. The CRM does not expose a
    /// first-response timestamp, so this is an approximation of response
    /// time and overstates it for cards touched after the first reply.
    pub average_response_time: f64,
}

pub fn aggregate_conversion(cards: &[Card]) -> ConversionMetrics {
    let closed = cards.iter().filter(|c| c.is_closed()).count() as u64;

    let metrics = ConversionMetrics {
        overall_conversion_rate: conversion_rate(closed, cards.len() as u64),
        average_sales_cycle: mean_of(cards.iter().filter_map(Card::dwell_days)),
        average_response_time: mean_of(cards.iter().filter_map(Card::lifetime_minutes)),
    };

    debug!(
        cards = cards.len(),
        closed,
        rate = metrics.overall_conversion_rate,
        "Conversion aggregated"
    );
    metrics
}
