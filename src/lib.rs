pub mod analysis;
pub mod config;
pub mod ledger;
pub mod pose;
pub mod service;
pub mod video;

pub use analysis::{AnalysisError, AnalysisResult, Analyzer};
pub use ledger::{JsonStore, Ledger, LedgerError, UserBucket};
pub use service::{Coach, CoachError, SessionOutcome};
