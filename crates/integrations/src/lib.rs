//! Card sources — the boundary between the CRM and the reporting engine.
//! Sources hand over fully materialized card lists; pagination and
//! transport stay on this side of the boundary.

pub mod source;

pub use source::{parse_card_export, CardSource, InMemorySource, JsonFileSource};
