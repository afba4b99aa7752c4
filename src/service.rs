use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::analysis::{AnalysisError, AnalysisResult, Analyzer};
use crate::ledger::{Ledger, LedgerError, UserBucket};
use crate::pose::KeypointExtractor;
use crate::video::VideoSource;

#[derive(Error, Debug)]
pub enum CoachError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// What one uploaded session produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub result: AnalysisResult,
    pub unlocked: Vec<String>,
}

/// Analysis pipeline wired to an extractor and a ledger.
///
/// The extractor is shared behind a mutex, so analyses run one at a time while
/// ledger reads stay available.
pub struct Coach<E, L> {
    analyzer: Analyzer,
    extractor: Mutex<E>,
    ledger: L,
}

impl<E, L: Ledger> Coach<E, L> {
    pub fn new(analyzer: Analyzer, extractor: E, ledger: L) -> Self {
        Self {
            analyzer,
            extractor: Mutex::new(extractor),
            ledger,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Analyse `source` without touching the ledger.
    pub fn analyze<S>(&self, source: S) -> Result<AnalysisResult, CoachError>
    where
        S: VideoSource,
        E: KeypointExtractor<S::Frame>,
    {
        // a panic mid-analysis leaves the extractor itself usable
        let mut extractor = self.extractor.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.analyzer.analyze(source, &mut *extractor)?)
    }

    /// Analyse `source`, then add the session to `user_id`'s ledger.
    pub fn analyze_and_record<S>(&self, user_id: &str, source: S) -> Result<SessionOutcome, CoachError>
    where
        S: VideoSource,
        E: KeypointExtractor<S::Frame>,
    {
        let result = self.analyze(source)?;
        let unlocked = self.ledger.record_session(
            user_id,
            result.count as u64,
            result.duration_seconds,
            result.cadence_spm,
        )?;
        if !unlocked.is_empty() {
            tracing::info!("{} unlocked {:?}", user_id, unlocked);
        }
        Ok(SessionOutcome { result, unlocked })
    }

    pub fn stats(&self, user_id: &str) -> Result<UserBucket, CoachError> {
        Ok(self.ledger.get_bucket(user_id)?)
    }

    pub fn reset(&self, user_id: &str) -> Result<UserBucket, CoachError> {
        Ok(self.ledger.reset(user_id)?)
    }
}
