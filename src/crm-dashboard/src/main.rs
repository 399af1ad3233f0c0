//! CRM Dashboard — sales-pipeline metrics from a CRM card export.
//!
//! Loads configuration, reads cards from the configured source, applies the
//! dashboard filters and prints the requested metric structures as JSON on
//! stdout. Logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crm_core::{AppConfig, Card, CrmError, DashboardFilters};
use crm_integrations::{CardSource, JsonFileSource};
use crm_reporting::{
    aggregate_by_period, aggregate_conversion, aggregate_revenue, apply_filters,
    extract_filter_options, period_series, rank_by_field, summarize_losses, EntityField,
    Granularity, PipelineDashboard,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "crm-dashboard")]
#[command(about = "Sales-pipeline metrics from CRM cards")]
#[command(version)]
struct Cli {
    /// TOML config file (environment variables still apply on top)
    #[arg(long, env = "CRM_DASHBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Card export to read (overrides config)
    #[arg(long, env = "CRM_DASHBOARD__SOURCE__CARDS_PATH")]
    cards: Option<String>,

    /// Restrict the source to one CRM panel (overrides config)
    #[arg(long)]
    panel: Option<String>,

    /// First creation date to include, YYYY-MM-DD
    #[arg(long)]
    start: Option<String>,

    /// Last creation date to include, YYYY-MM-DD
    #[arg(long)]
    end: Option<String>,

    /// Owner id (matches current or legacy owner field)
    #[arg(long)]
    owner: Option<String>,

    /// Channel id
    #[arg(long)]
    channel: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Every dashboard widget in one document
    Snapshot,

    /// Per-stage leads, value, dwell time and conversion
    Funnel {
        /// Reorder rows into the configured pipeline order
        #[arg(long, default_value_t = false)]
        pipeline_order: bool,
    },

    /// Closed revenue with seller and channel breakdowns
    Revenue,

    /// Overall conversion, sales cycle and response time
    Conversion,

    /// Lost value grouped by reason
    Losses,

    /// Card count and value per period
    Periods {
        /// day, week or month (default from config)
        #[arg(long)]
        granularity: Option<Granularity>,

        /// Keep only the most recent N periods
        #[arg(long)]
        last: Option<usize>,
    },

    /// Revenue ranking by product, seller, channel or stage
    Ranking {
        #[arg(long, default_value = "product")]
        by: EntityField,

        /// Keep the top N rows (products default to the configured limit)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Owner and channel choices for filter controls
    Options,
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => AppConfig::load(Some(path))
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }),
    };

    // Apply CLI overrides
    if let Some(cards) = &cli.cards {
        config.source.cards_path = cards.clone();
    }
    if let Some(panel) = &cli.panel {
        config.source.panel_id = Some(panel.clone());
    }
    Ok(config)
}

fn build_filters(cli: &Cli, config: &AppConfig) -> anyhow::Result<DashboardFilters> {
    let start = cli.start.as_deref().map(DashboardFilters::parse_date).transpose()?;
    let end = cli.end.as_deref().map(DashboardFilters::parse_date).transpose()?;

    let mut filters = DashboardFilters::default().with_period(start, end);
    filters.user_id = cli.owner.clone();
    filters.channel_id = cli.channel.clone();
    filters.panel_id = config.source.panel_id.clone();
    filters.validate()?;
    Ok(filters)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(
    command: &Commands,
    dashboard: &PipelineDashboard,
    config: &AppConfig,
    cards: &[Card],
    filters: &DashboardFilters,
) -> anyhow::Result<()> {
    let filtered = || {
        let out = apply_filters(cards, filters);
        info!(total = cards.len(), filtered = out.len(), "Cards filtered");
        out
    };

    match command {
        Commands::Snapshot => print_json(&dashboard.snapshot(cards, filters)),
        Commands::Funnel { pipeline_order } => {
            let rows = if *pipeline_order {
                dashboard.funnel_in_pipeline_order(&filtered())
            } else {
                dashboard.funnel(&filtered())
            };
            print_json(&rows)
        }
        Commands::Revenue => print_json(&aggregate_revenue(&filtered())),
        Commands::Conversion => print_json(&aggregate_conversion(&filtered())),
        Commands::Losses => print_json(&summarize_losses(&filtered())),
        Commands::Periods { granularity, last } => {
            let granularity = match granularity {
                Some(g) => *g,
                None => config
                    .reporting
                    .default_granularity
                    .parse::<Granularity>()
                    .map_err(CrmError::Config)?,
            };
            if last.is_some() {
                print_json(&period_series(&filtered(), granularity, *last))
            } else {
                print_json(&aggregate_by_period(&filtered(), granularity))
            }
        }
        Commands::Ranking { by, limit } => {
            let limit = match (by, limit) {
                (_, Some(n)) => Some(*n),
                (EntityField::Product, None) => Some(dashboard.settings().product_limit),
                _ => None,
            };
            print_json(&rank_by_field(&filtered(), *by, limit))
        }
        // Options come from the unfiltered cards so every choice stays selectable.
        Commands::Options => print_json(&extract_filter_options(cards)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_dashboard=info,crm_reporting=info,crm_integrations=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let filters = build_filters(&cli, &config)?;

    info!(
        cards_path = %config.source.cards_path,
        panel = ?config.source.panel_id,
        product_limit = config.reporting.product_limit,
        weekly_window = config.reporting.weekly_window,
        "Configuration loaded"
    );

    let source = JsonFileSource::new(&config.source.cards_path);
    let cards = source.fetch_cards(&filters).await?;

    let dashboard = PipelineDashboard::from_config(&config);
    run(&cli.command, &dashboard, &config, &cards, &filters)
}
