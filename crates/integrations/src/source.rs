//! Card sources — where the dashboard gets its fully materialized card list.

use crm_core::{Card, CardResponse, CrmError, CrmResult, DashboardFilters};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Supplies the cards a dashboard aggregates over.
///
/// Implementations may scope by `filters.panel_id`; the remaining filter
/// fields are applied by the reporting pipeline, so a source is free to
/// return more than they would admit.
#[allow(async_fn_in_trait)]
pub trait CardSource {
    async fn fetch_cards(&self, filters: &DashboardFilters) -> CrmResult<Vec<Card>>;
}

fn scope_to_panel(cards: Vec<Card>, panel_id: Option<&str>) -> Vec<Card> {
    match panel_id {
        Some(panel) => cards
            .into_iter()
            .filter(|c| c.panel_id.as_deref() == Some(panel))
            .collect(),
        None => cards,
    }
}

/// Fixed in-memory card list.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    cards: Vec<Card>,
}

impl InMemorySource {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl CardSource for InMemorySource {
    async fn fetch_cards(&self, filters: &DashboardFilters) -> CrmResult<Vec<Card>> {
        Ok(scope_to_panel(self.cards.clone(), filters.panel_id.as_deref()))
    }
}

/// Either shape a CRM card export may take on disk.
#[derive(Deserialize)]
#[serde(untagged)]
enum CardExport {
    Bare(Vec<Card>),
    Envelope(CardResponse),
}

impl CardExport {
    fn into_cards(self) -> Vec<Card> {
        match self {
            CardExport::Bare(cards) => cards,
            CardExport::Envelope(response) => response.items,
        }
    }
}

/// Parse a card export: a `{"items": [...]}` envelope or a bare array.
pub fn parse_card_export(raw: &str) -> CrmResult<Vec<Card>> {
    let export: CardExport = serde_json::from_str(raw)?;
    Ok(export.into_cards())
}

/// Cards read from a JSON export of the CRM's card endpoint.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CardSource for JsonFileSource {
    async fn fetch_cards(&self, filters: &DashboardFilters) -> CrmResult<Vec<Card>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CrmError::Source(format!("cannot read {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), bytes = raw.len(), "Card export read");

        let cards = parse_card_export(&raw)?;
        let total = cards.len();
        let cards = scope_to_panel(cards, filters.panel_id.as_deref());

        metrics::counter!("sources.cards_loaded").increment(cards.len() as u64);
        info!(
            path = %self.path.display(),
            total,
            kept = cards.len(),
            panel = ?filters.panel_id,
            "Cards loaded"
        );
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, panel: Option<&str>) -> Card {
        Card {
            id: id.to_string(),
            panel_id: panel.map(str::to_string),
            ..Default::default()
        }
    }

    fn temp_export(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "crm-integrations-{}-{name}.json",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_envelope_and_bare_array() {
        let envelope = r#"{"items":[{"id":"a"},{"id":"b"}],"totalItems":2}"#;
        assert_eq!(parse_card_export(envelope).unwrap().len(), 2);

        let bare = r#"[{"id":"a"}]"#;
        assert_eq!(parse_card_export(bare).unwrap()[0].id, "a");

        assert!(matches!(
            parse_card_export("not json"),
            Err(CrmError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_in_memory_panel_scope() {
        let source = InMemorySource::new(vec![card("1", Some("p1")), card("2", Some("p2")), card("3", None)]);
        assert_eq!(source.len(), 3);

        let all = source.fetch_cards(&DashboardFilters::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let p1 = source
            .fetch_cards(&DashboardFilters::default().with_panel("p1"))
            .await
            .unwrap();
        assert_eq!(p1.len(), 1);
        assert_eq!(p1[0].id, "1");
    }

    #[tokio::test]
    async fn test_json_file_source() {
        let path = temp_export(
            "envelope",
            r#"{"items":[{"id":"x","panelId":"p1","status":"closed","value":10},{"id":"y","panelId":"p2"}]}"#,
        );
        let source = JsonFileSource::new(&path);
        assert_eq!(source.path(), path.as_path());

        let cards = source.fetch_cards(&DashboardFilters::default()).await.unwrap();
        assert_eq!(cards.len(), 2);
        assert!(cards[0].is_closed());

        let scoped = source
            .fetch_cards(&DashboardFilters::default().with_panel("p2"))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id, "y");

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_json_file_source_errors() {
        let missing = JsonFileSource::new("/definitely/not/here/cards.json");
        assert!(matches!(
            missing.fetch_cards(&DashboardFilters::default()).await,
            Err(CrmError::Source(_))
        ));

        let path = temp_export("broken", "{ nope");
        let broken = JsonFileSource::new(&path);
        assert!(matches!(
            broken.fetch_cards(&DashboardFilters::default()).await,
            Err(CrmError::Serialization(_))
        ));
        std::fs::remove_file(&path).ok();
    }
}
