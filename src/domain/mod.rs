pub mod log_entry;
pub mod money;
pub mod offer;
pub mod rule;
pub mod settings;
pub mod statistics;
pub mod sync;
pub mod timefmt;
pub mod wire;

pub use log_entry::{ActionFilter, DateFilter, LogAction, LogEntry, LogFilter, LogLevel, LogSummary};
pub use offer::{AiRecommendation, Offer, OfferFilter, OfferResponse, OfferStatus, ResponseAction};
pub use rule::{NegotiationRule, NegotiationTone, RuleType};
pub use settings::{ConnectionTest, Service, Settings};
pub use statistics::DashboardStats;
pub use sync::BatchSyncStatus;

use thiserror::Error;

/// Input rejected before anything is sent to the backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Für ein Gegenangebot wird ein Preis größer 0 benötigt")]
    CounterPriceRequired,
    #[error("Der Regelname darf nicht leer sein")]
    EmptyRuleName,
    #[error("{field} muss zwischen 0 und 100 liegen (ist {value})")]
    PercentageOutOfRange { field: &'static str, value: f64 },
    #[error("Max. Gegenangebote muss zwischen 1 und 10 liegen (ist {0})")]
    CounterLimitOutOfRange(u32),
    #[error("Zeitbereich ungültig: {start} bis {end} Tage")]
    InvalidTimeRange { start: u32, end: u32 },
    #[error("Aktive Regeln können nicht gelöscht werden")]
    RuleIsActive,
}
