//! Choices offered by the dashboard's owner and channel filter controls.

use crm_core::Card;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Channels offered when no card carries one.
pub const FALLBACK_CHANNELS: [(&str, &str); 3] =
    [("meta", "Meta"), ("google", "Google"), ("whatsapp", "WhatsApp")];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub owners: Vec<FilterOption>,
    pub channels: Vec<FilterOption>,
}

fn seller_placeholder(id: &str) -> String {
    let short: String = id.chars().take(8).collect();
    format!("Seller {short}")
}

/// Distinct owners, named after the responsible user when the CRM embeds
/// one. Sorted by id.
pub fn extract_owners(cards: &[Card]) -> Vec<FilterOption> {
    // id -> (display name, name came from the CRM)
    let mut owners: BTreeMap<String, (String, bool)> = BTreeMap::new();
    for card in cards {
        let Some(id) = card.owner_id() else {
            continue;
        };
        let named = card.owner_name();
        match owners.get(id) {
            Some((_, true)) => {}
            Some((_, false)) if named.is_none() => {}
            _ => {
                let name = named
                    .map(str::to_string)
                    .unwrap_or_else(|| seller_placeholder(id));
                owners.insert(id.to_string(), (name, named.is_some()));
            }
        }
    }
    owners
        .into_iter()
        .map(|(id, (name, _))| FilterOption { id, name })
        .collect()
}

/// Distinct channels, or the stock channel list when none is present.
pub fn extract_channels(cards: &[Card]) -> Vec<FilterOption> {
    let mut channels: Vec<String> = cards
        .iter()
        .filter_map(|c| c.channel_id().map(str::to_string))
        .collect();
    channels.sort();
    channels.dedup();

    if channels.is_empty() {
        return FALLBACK_CHANNELS
            .iter()
            .map(|(id, name)| FilterOption {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();
    }
    channels
        .into_iter()
        .map(|id| FilterOption {
            name: id.clone(),
            id,
        })
        .collect()
}

pub fn extract_filter_options(cards: &[Card]) -> FilterOptions {
    FilterOptions {
        owners: extract_owners(cards),
        channels: extract_channels(cards),
    }
}
