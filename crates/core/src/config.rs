use crate::error::CrmResult;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `CRM_DASHBOARD__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub stages: StageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_cards_path")]
    pub cards_path: String,
    #[serde(default)]
    pub panel_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_product_limit")]
    pub product_limit: usize,
    #[serde(default = "default_weekly_window")]
    pub weekly_window: usize,
    /// One of `day`, `week`, `month`.
    #[serde(default = "default_granularity")]
    pub default_granularity: String,
}

/// Human-readable stage titles and the display order of the pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    #[serde(default = "default_stage_names")]
    pub names: HashMap<String, String>,
    #[serde(default = "default_stage_order")]
    pub order: Vec<String>,
}

// Default functions
fn default_cards_path() -> String {
    "cards.json".to_string()
}
fn default_product_limit() -> usize {
    10
}
fn default_weekly_window() -> usize {
    12
}
fn default_granularity() -> String {
    "month".to_string()
}

/// Step ids the CRM ships with and their display titles.
pub const DEFAULT_STAGES: [(&str, &str); 6] = [
    ("em-atendimento", "Em atendimento"),
    ("atendimento-humano", "Atendimento Humano"),
    ("qualificado", "Qualificado"),
    ("orcamento-enviado", "Orçamento Enviado"),
    ("perdido", "Perdido"),
    ("venda-realizada", "Venda realizada"),
];

fn default_stage_names() -> HashMap<String, String> {
    DEFAULT_STAGES
        .iter()
        .map(|(id, title)| (id.to_string(), title.to_string()))
        .collect()
}
fn default_stage_order() -> Vec<String> {
    DEFAULT_STAGES
        .iter()
        .map(|(_, title)| title.to_string())
        .collect()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            cards_path: default_cards_path(),
            panel_id: None,
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            product_limit: default_product_limit(),
            weekly_window: default_weekly_window(),
            default_granularity: default_granularity(),
        }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            names: default_stage_names(),
            order: default_stage_order(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            reporting: ReportingConfig::default(),
            stages: StageConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(file: Option<&Path>) -> CrmResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("CRM_DASHBOARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrmError;

    fn temp_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "crm-core-{}-{name}.toml",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.source.cards_path, "cards.json");
        assert_eq!(config.reporting.product_limit, 10);
        assert_eq!(config.reporting.weekly_window, 12);
        assert_eq!(config.reporting.default_granularity, "month");
        assert_eq!(config.stages.names.len(), 6);
        assert_eq!(
            config.stages.names.get("venda-realizada").map(String::as_str),
            Some("Venda realizada")
        );
        assert_eq!(config.stages.order.first().map(String::as_str), Some("Em atendimento"));
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"reporting":{"product_limit":5}}"#).unwrap();
        assert_eq!(config.reporting.product_limit, 5);
        assert_eq!(config.reporting.weekly_window, 12);
        assert_eq!(config.stages.order.len(), 6);
    }

    #[test]
    fn test_load_toml_file() {
        let path = temp_config(
            "valid",
            "[source]\ncards_path = \"export.json\"\n\n[reporting]\nweekly_window = 8\n",
        );
        let config = AppConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.source.cards_path, "export.json");
        assert_eq!(config.reporting.weekly_window, 8);
        assert_eq!(config.reporting.product_limit, 10);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let path = temp_config("broken", "[reporting\nproduct_limit = = 3\n");
        assert!(matches!(
            AppConfig::load(Some(path.as_path())),
            Err(CrmError::Config(_))
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let path = std::env::temp_dir().join("crm-core-definitely-missing.toml");
        assert!(matches!(
            AppConfig::load(Some(path.as_path())),
            Err(CrmError::Config(_))
        ));
    }
}
