pub mod config;
pub mod error;
pub mod time;
pub mod types;

pub use config::AppConfig;
pub use error::{CrmError, CrmResult};
pub use types::{Card, CardResponse, CardStatus, DashboardFilters, ResponsibleUser};
