//! Pipeline dashboard — runs the filter pipeline once and every aggregator
//! over its output.

use crate::conversion::{aggregate_conversion, ConversionMetrics};
use crate::filter::apply_filters;
use crate::funnel::{aggregate_funnel_with, sort_by_pipeline_order, FunnelMetric};
use crate::loss::{summarize_losses, LossSummary};
use crate::options::{extract_filter_options, FilterOptions};
use crate::ranking::{rank_products, rank_sellers, EntityMetric, DEFAULT_PRODUCT_LIMIT};
use crate::revenue::{aggregate_revenue, RevenueMetrics};
use crate::stage::StageDirectory;
use crate::temporal::{period_series, Granularity, PeriodAggregate};
use chrono::{DateTime, Utc};
use crm_core::{AppConfig, Card, DashboardFilters};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub filters: DashboardFilters,
    pub total_cards: u64,
    pub filtered_cards: u64,
    pub funnel: Vec<FunnelMetric>,
    pub revenue: RevenueMetrics,
    pub conversion: ConversionMetrics,
    pub losses: LossSummary,
    pub monthly: Vec<PeriodAggregate>,
    pub weekly: Vec<PeriodAggregate>,
    pub sellers: Vec<EntityMetric>,
    pub products: Vec<EntityMetric>,
    /// Built from the unfiltered cards so every choice stays selectable.
    pub options: FilterOptions,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub product_limit: usize,
    pub weekly_window: usize,
    pub pipeline_order: Vec<String>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            product_limit: DEFAULT_PRODUCT_LIMIT,
            weekly_window: 12,
            pipeline_order: Vec::new(),
        }
    }
}

impl DashboardSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            product_limit: config.reporting.product_limit,
            weekly_window: config.reporting.weekly_window,
            pipeline_order: config.stages.order.clone(),
        }
    }
}

pub struct PipelineDashboard {
    stages: Arc<StageDirectory>,
    settings: DashboardSettings,
}

impl PipelineDashboard {
    pub fn new(stages: Arc<StageDirectory>, settings: DashboardSettings) -> Self {
        Self { stages, settings }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(StageDirectory::from_config(&config.stages)),
            DashboardSettings::from_config(config),
        )
    }

    /// Shared handle for registering stage titles out-of-band.
    pub fn stages(&self) -> Arc<StageDirectory> {
        self.stages.clone()
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    /// Funnel rows named through the stage directory, in rank order.
    pub fn funnel(&self, cards: &[Card]) -> Vec<FunnelMetric> {
        aggregate_funnel_with(cards, self.stages.as_ref())
    }

    /// Funnel rows rearranged into the configured pipeline order for display.
    pub fn funnel_in_pipeline_order(&self, cards: &[Card]) -> Vec<FunnelMetric> {
        let mut rows = self.funnel(cards);
        sort_by_pipeline_order(&mut rows, &self.settings.pipeline_order);
        rows
    }

    pub fn snapshot(&self, cards: &[Card], filters: &DashboardFilters) -> DashboardSnapshot {
        let started = Instant::now();
        let filtered = apply_filters(cards, filters);

        let snapshot = DashboardSnapshot {
            filters: filters.clone(),
            total_cards: cards.len() as u64,
            filtered_cards: filtered.len() as u64,
            funnel: self.funnel(&filtered),
            revenue: aggregate_revenue(&filtered),
            conversion: aggregate_conversion(&filtered),
            losses: summarize_losses(&filtered),
            monthly: period_series(&filtered, Granularity::Month, None),
            weekly: period_series(&filtered, Granularity::Week, Some(self.settings.weekly_window)),
            sellers: rank_sellers(&filtered),
            products: rank_products(&filtered, self.settings.product_limit),
            options: extract_filter_options(cards),
            generated_at: Utc::now(),
        };

        let elapsed_us = started.elapsed().as_micros() as f64;
        metrics::counter!("reporting.snapshots").increment(1);
        metrics::counter!("reporting.cards_in").increment(snapshot.total_cards);
        metrics::counter!("reporting.cards_filtered").increment(snapshot.filtered_cards);
        metrics::histogram!("reporting.snapshot_latency_us").record(elapsed_us);

        info!(
            total = snapshot.total_cards,
            filtered = snapshot.filtered_cards,
            stages = snapshot.funnel.len(),
            latency_us = elapsed_us,
            "Dashboard snapshot generated"
        );
        snapshot
    }
}

impl Default for PipelineDashboard {
    fn default() -> Self {
        Self::new(Arc::new(StageDirectory::with_defaults()), DashboardSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, step: &str, status: &str, value: f64, created: &str) -> Card {
        Card {
            id: id.to_string(),
            step_id: Some(step.to_string()),
            status: Some(status.to_string()),
            value: Some(value),
            created_at: Some(created.to_string()),
            updated_at: Some(created.to_string()),
            responsible_user_id: Some("u1".to_string()),
            channel: Some("meta".to_string()),
            ..Default::default()
        }
    }

    fn sample() -> Vec<Card> {
        vec![
            card("1", "qualificado", "closed", 100.0, "2024-03-04T10:00:00Z"),
            card("2", "qualificado", "open", 50.0, "2024-03-05T10:00:00Z"),
            card("3", "venda-realizada", "closed", 200.0, "2024-04-10T10:00:00Z"),
            card("4", "perdido", "lost", 70.0, "2024-04-11T10:00:00Z"),
        ]
    }

    #[test]
    fn test_snapshot_composes_aggregators() {
        let dashboard = PipelineDashboard::default();
        let snapshot = dashboard.snapshot(&sample(), &DashboardFilters::default());

        assert_eq!(snapshot.total_cards, 4);
        assert_eq!(snapshot.filtered_cards, 4);
        assert_eq!(snapshot.funnel[0].stage, "Qualificado");
        assert_eq!(snapshot.funnel[0].leads, 2);
        assert_eq!(snapshot.revenue.total_revenue, 300.0);
        assert_eq!(snapshot.conversion.overall_conversion_rate, 50.0);
        assert_eq!(snapshot.losses.lost_count, 1);
        assert_eq!(snapshot.monthly.len(), 2);
        assert_eq!(snapshot.sellers.len(), 1);
        assert_eq!(snapshot.products[0].name, "None");
    }

    #[test]
    fn test_snapshot_applies_filters_but_not_to_options() {
        let dashboard = PipelineDashboard::default();
        let filters = DashboardFilters::default().with_period(
            Some(DashboardFilters::parse_date("2024-04-01").unwrap()),
            None,
        );
        let snapshot = dashboard.snapshot(&sample(), &filters);
        assert_eq!(snapshot.filtered_cards, 2);
        assert_eq!(snapshot.revenue.total_revenue, 200.0);
        assert_eq!(snapshot.options.owners.len(), 1);
        assert_eq!(snapshot.options.channels[0].id, "meta");
    }

    #[test]
    fn test_weekly_window_limits_series() {
        let settings = DashboardSettings {
            weekly_window: 1,
            ..Default::default()
        };
        let dashboard = PipelineDashboard::new(Arc::new(StageDirectory::new()), settings);
        let snapshot = dashboard.snapshot(&sample(), &DashboardFilters::default());
        assert_eq!(snapshot.weekly.len(), 1);
        assert_eq!(snapshot.weekly[0].period, "2024-04-07");
        assert_eq!(snapshot.funnel[0].stage, "qualificado");
    }

    #[test]
    fn test_stage_titles_registered_after_construction() {
        let dashboard = PipelineDashboard::new(Arc::new(StageDirectory::new()), DashboardSettings::default());
        dashboard.stages().register("qualificado", "Qualified");
        let funnel = dashboard.funnel(&sample());
        assert_eq!(funnel[0].stage, "Qualified");
    }

    #[test]
    fn test_pipeline_order_view() {
        let dashboard = PipelineDashboard::from_config(&AppConfig::default());
        let rows = dashboard.funnel_in_pipeline_order(&sample());
        let stages: Vec<_> = rows.iter().map(|r| r.stage.as_str()).collect();
        assert_eq!(stages, vec!["Qualificado", "Perdido", "Venda realizada"]);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = PipelineDashboard::default().snapshot(&[], &DashboardFilters::default());
        assert_eq!(snapshot.total_cards, 0);
        assert!(snapshot.funnel.is_empty());
        assert_eq!(snapshot.revenue.total_revenue, 0.0);
        assert_eq!(snapshot.conversion.overall_conversion_rate, 0.0);
        assert!(snapshot.losses.reasons.is_empty());
        assert!(snapshot.weekly.is_empty());
        assert!(snapshot.products.is_empty());
    }
}
