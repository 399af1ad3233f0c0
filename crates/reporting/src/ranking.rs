//! Entity ranking — revenue, conversion, ticket and closing-time rollups per
//! product, seller, or any other card field.

use crate::group::OrderedGroups;
use crate::rates::{average_ticket, conversion_rate, mean_of};
use crm_core::types::NO_ENTITY;
use crm_core::Card;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How many products the product ranking keeps by default.
pub const DEFAULT_PRODUCT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetric {
    pub name: String,
    pub total_cards: u64,
    pub closed_cards: u64,
    pub total_revenue: f64,
    pub conversion_rate: f64,
    pub average_ticket: f64,
    pub average_closing_time: f64,
}

/// Card fields the dashboard ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityField {
    Product,
    Seller,
    Channel,
    Stage,
}

impl EntityField {
    pub fn select<'a>(&self, card: &'a Card) -> Option<&'a str> {
        match self {
            EntityField::Product => card.product_label(),
            EntityField::Seller => card.owner_id(),
            EntityField::Channel => card.channel_id(),
            EntityField::Stage => Some(card.stage_label()),
        }
    }
}

impl fmt::Display for EntityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityField::Product => "product",
            EntityField::Seller => "seller",
            EntityField::Channel => "channel",
            EntityField::Stage => "stage",
        };
        f.write_str(name)
    }
}

impl FromStr for EntityField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(EntityField::Product),
            "seller" | "owner" => Ok(EntityField::Seller),
            "channel" => Ok(EntityField::Channel),
            "stage" => Ok(EntityField::Stage),
            other => Err(format!("unknown entity field '{other}'")),
        }
    }
}

#[derive(Default)]
struct EntityAccumulator {
    total: u64,
    closed: u64,
    revenue: f64,
    closing_days: Vec<i64>,
}

/// Group `cards` by `selector` ("None" when it yields nothing), roll up each
/// group, sort by revenue descending and keep the first `limit` rows.
///
/// Revenue, ticket and closing time only consider closed members of a group;
/// conversion is closed over total members.
pub fn rank_by_entity<F>(cards: &[Card], selector: F, limit: Option<usize>) -> Vec<EntityMetric>
where
    F: Fn(&Card) -> Option<&str>,
{
    let mut groups: OrderedGroups<EntityAccumulator> = OrderedGroups::new();
    for card in cards {
        let acc = groups.entry(selector(card).unwrap_or(NO_ENTITY));
        acc.total += 1;
        if card.is_closed() {
            acc.closed += 1;
            acc.revenue += card.deal_value();
            if let Some(days) = card.dwell_days() {
                acc.closing_days.push(days);
            }
        }
    }

    let mut ranked: Vec<EntityMetric> = groups
        .into_vec()
        .into_iter()
        .map(|(name, acc)| EntityMetric {
            name,
            total_cards: acc.total,
            closed_cards: acc.closed,
            total_revenue: acc.revenue,
            conversion_rate: conversion_rate(acc.closed, acc.total),
            average_ticket: average_ticket(acc.revenue, acc.closed),
            average_closing_time: mean_of(acc.closing_days),
        })
        .collect();
    ranked.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    debug!(groups = ranked.len(), ?limit, "Entities ranked");
    ranked
}

pub fn rank_by_field(cards: &[Card], field: EntityField, limit: Option<usize>) -> Vec<EntityMetric> {
    rank_by_entity(cards, |card| field.select(card), limit)
}

pub fn rank_products(cards: &[Card], limit: usize) -> Vec<EntityMetric> {
    rank_by_field(cards, EntityField::Product, Some(limit))
}

pub fn rank_sellers(cards: &[Card]) -> Vec<EntityMetric> {
    rank_by_field(cards, EntityField::Seller, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(product: Option<&str>, status: &str, value: f64, days: Option<i64>) -> Card {
        let (created, updated) = match days {
            Some(d) => (
                Some("2024-01-01T00:00:00Z".to_string()),
                Some(format!("2024-01-{:02}T00:00:00Z", 1 + d)),
            ),
            None => (None, None),
        };
        Card {
            id: "c".to_string(),
            product: product.map(str::to_string),
            status: Some(status.to_string()),
            value: Some(value),
            created_at: created,
            updated_at: updated,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(rank_products(&[], DEFAULT_PRODUCT_LIMIT).is_empty());
        assert!(rank_sellers(&[]).is_empty());
    }

    #[test]
    fn test_product_rollup() {
        let cards = vec![
            card(Some("crm"), "closed", 100.0, Some(4)),
            card(Some("crm"), "concluido", 300.0, Some(2)),
            card(Some("crm"), "lost", 999.0, Some(20)),
            card(Some("crm"), "open", 999.0, None),
            card(Some("erp"), "closed", 1000.0, None),
            card(None, "open", 50.0, None),
        ];
        let ranked = rank_products(&cards, DEFAULT_PRODUCT_LIMIT);
        let names: Vec<_> = ranked.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["erp", "crm", "None"]);

        let crm = &ranked[1];
        assert_eq!(crm.total_cards, 4);
        assert_eq!(crm.closed_cards, 2);
        assert_eq!(crm.total_revenue, 400.0);
        assert_eq!(crm.conversion_rate, 50.0);
        assert_eq!(crm.average_ticket, 200.0);
        assert_eq!(crm.average_closing_time, 3.0);

        let erp = &ranked[0];
        assert_eq!(erp.average_closing_time, 0.0);
        assert_eq!(erp.average_ticket, erp.total_revenue / erp.closed_cards as f64);

        let none = &ranked[2];
        assert_eq!(none.total_revenue, 0.0);
        assert_eq!(none.average_ticket, 0.0);
        assert_eq!(none.conversion_rate, 0.0);
    }

    #[test]
    fn test_limit_truncates_after_sort() {
        let cards: Vec<Card> = (1..=15)
            .map(|i| card(Some(&format!("p{i}")), "closed", i as f64, None))
            .collect();
        let ranked = rank_products(&cards, 10);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].name, "p15");
        assert_eq!(ranked[9].name, "p6");
    }

    #[test]
    fn test_sellers_use_owner_chain() {
        let mut a = card(None, "closed", 10.0, None);
        a.responsible_user_id = Some("u1".into());
        let mut b = card(None, "closed", 30.0, None);
        b.assigned_to = Some("u2".into());
        let c = card(None, "open", 0.0, None);

        let ranked = rank_sellers(&[a, b, c]);
        let names: Vec<_> = ranked.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["u2", "u1", "None"]);
    }

    #[test]
    fn test_custom_selector() {
        let mut a = card(None, "closed", 10.0, None);
        a.channel = Some("meta".into());
        let ranked = rank_by_entity(&[a], |c| c.channel.as_deref(), None);
        assert_eq!(ranked[0].name, "meta");
        assert_eq!("owner".parse::<EntityField>().unwrap(), EntityField::Seller);
        assert!("planet".parse::<EntityField>().is_err());
    }
}
