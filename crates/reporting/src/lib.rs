//! Pipeline analytics — funnel, revenue, conversion, loss, period and
//! per-entity metrics derived from CRM cards.
//!
//! Every aggregator is a pure function over an already-filtered card slice;
//! none depends on another's output.

pub mod conversion;
pub mod dashboard;
pub mod filter;
pub mod funnel;
mod group;
pub mod loss;
pub mod options;
pub mod ranking;
pub mod rates;
pub mod revenue;
pub mod stage;
pub mod temporal;

pub use conversion::{aggregate_conversion, ConversionMetrics};
pub use dashboard::{DashboardSettings, DashboardSnapshot, PipelineDashboard};
pub use filter::{apply_filters, filter_by_channel, filter_by_owner, filter_by_period};
pub use funnel::{aggregate_funnel, aggregate_funnel_with, FunnelMetric};
pub use loss::{aggregate_loss, summarize_losses, LossMetric, LossSummary};
pub use options::{extract_filter_options, FilterOption, FilterOptions};
pub use ranking::{rank_by_entity, rank_by_field, rank_products, rank_sellers, EntityField, EntityMetric};
pub use revenue::{aggregate_revenue, RevenueMetrics};
pub use stage::{resolve_stage, StageDirectory, StageLookup};
pub use temporal::{aggregate_by_period, period_series, Granularity, PeriodAggregate};
