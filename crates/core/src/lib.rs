//! Shared types, error taxonomy and configuration for the lead-generation
//! experiment optimizer.

pub mod config;
pub mod error;
pub mod types;

pub use self::config::{AppConfig, BanditConfig};
pub use error::{EngineError, EngineResult};
pub use types::{
    AllocationMap, BetaPrior, CredibleInterval, NoWinnerReason, SelectionResult, VariantRecord,
    VariantState, VariantStatistics, WinnerAnalysis,
};
