//! Stage naming — resolves a card to the label it is grouped under in the
//! funnel, consulting an injected step-id → title lookup.

use crm_core::config::{StageConfig, DEFAULT_STAGES};
use crm_core::Card;
use dashmap::DashMap;
use std::collections::HashMap;

/// Source of human-readable titles for CRM step ids.
pub trait StageLookup {
    fn stage_name(&self, step_id: &str) -> Option<String>;
}

/// No titles registered; every card keeps its own stage label.
impl StageLookup for () {
    fn stage_name(&self, _step_id: &str) -> Option<String> {
        None
    }
}

impl StageLookup for HashMap<String, String> {
    fn stage_name(&self, step_id: &str) -> Option<String> {
        self.get(step_id).cloned()
    }
}

/// Concurrent step-id → title map. Titles can be registered out-of-band
/// (e.g. when the CRM's panel metadata arrives) while readers keep
/// resolving cards against whatever is present.
#[derive(Debug, Default)]
pub struct StageDirectory {
    names: DashMap<String, String>,
}

impl StageDirectory {
    pub fn new() -> Self {
        Self {
            names: DashMap::new(),
        }
    }

    /// Directory pre-populated with the CRM's stock pipeline steps.
    pub fn with_defaults() -> Self {
        let directory = Self::new();
        for (id, title) in DEFAULT_STAGES {
            directory.register(id, title);
        }
        directory
    }

    pub fn from_config(config: &StageConfig) -> Self {
        let directory = Self::new();
        for (id, title) in &config.names {
            directory.register(id.clone(), title.clone());
        }
        directory
    }

    pub fn register(&self, step_id: impl Into<String>, title: impl Into<String>) {
        self.names.insert(step_id.into(), title.into());
    }

    pub fn forget(&self, step_id: &str) -> bool {
        self.names.remove(step_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl StageLookup for StageDirectory {
    fn stage_name(&self, step_id: &str) -> Option<String> {
        self.names.get(step_id).map(|entry| entry.value().clone())
    }
}

/// Stage label for `card`:
/// `stepTitle` → lookup of `stepId` → `stepId` → legacy `stage` → "No stage".
pub fn resolve_stage<L>(card: &Card, lookup: &L) -> String
where
    L: StageLookup + ?Sized,
{
    if let Some(title) = card.step_title.as_deref().filter(|t| !t.is_empty()) {
        return title.to_string();
    }
    card.step_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .and_then(|id| lookup.stage_name(id))
        .unwrap_or_else(|| card.stage_label().to_string())
}

/// Position of `label` in the canonical pipeline `order`; labels not in the
/// order sort after every known stage.
pub fn pipeline_rank(label: &str, order: &[String]) -> usize {
    order
        .iter()
        .position(|known| known == label)
        .unwrap_or(order.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::types::NO_STAGE;

    fn card(step_id: Option<&str>, step_title: Option<&str>, stage: Option<&str>) -> Card {
        Card {
            id: "c".to_string(),
            step_id: step_id.map(str::to_string),
            step_title: step_title.map(str::to_string),
            stage: stage.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_title_wins_over_lookup() {
        let directory = StageDirectory::with_defaults();
        let c = card(Some("qualificado"), Some("Custom title"), None);
        assert_eq!(resolve_stage(&c, &directory), "Custom title");
    }

    #[test]
    fn test_lookup_then_raw_id_then_legacy() {
        let directory = StageDirectory::with_defaults();
        assert_eq!(
            resolve_stage(&card(Some("orcamento-enviado"), None, None), &directory),
            "Orçamento Enviado"
        );
        assert_eq!(
            resolve_stage(&card(Some("step-x"), None, Some("legacy")), &directory),
            "step-x"
        );
        assert_eq!(
            resolve_stage(&card(None, None, Some("legacy")), &directory),
            "legacy"
        );
        assert_eq!(resolve_stage(&card(None, None, None), &directory), NO_STAGE);
    }

    #[test]
    fn test_directory_updates_are_visible() {
        let directory = StageDirectory::new();
        let c = card(Some("s-1"), None, None);
        assert_eq!(resolve_stage(&c, &directory), "s-1");

        directory.register("s-1", "Discovery");
        assert_eq!(resolve_stage(&c, &directory), "Discovery");
        assert_eq!(directory.len(), 1);

        assert!(directory.forget("s-1"));
        assert!(directory.is_empty());
        assert_eq!(resolve_stage(&c, &directory), "s-1");
    }

    #[test]
    fn test_unit_lookup_names_nothing() {
        assert_eq!(().stage_name("qualificado"), None);
        assert_eq!(
            resolve_stage(&card(Some("qualificado"), None, Some("legacy")), &()),
            "qualificado"
        );
        assert_eq!(resolve_stage(&card(None, None, None), &()), NO_STAGE);
    }

    #[test]
    fn test_hashmap_lookup() {
        let mut names = HashMap::new();
        names.insert("a".to_string(), "Alpha".to_string());
        assert_eq!(resolve_stage(&card(Some("a"), None, None), &names), "Alpha");
    }

    #[test]
    fn test_from_config_and_rank() {
        let config = StageConfig::default();
        let directory = StageDirectory::from_config(&config);
        assert_eq!(directory.len(), 6);
        assert_eq!(pipeline_rank("Em atendimento", &config.order), 0);
        assert_eq!(pipeline_rank("Venda realizada", &config.order), 5);
        assert_eq!(pipeline_rank("Unknown", &config.order), 6);
    }
}
