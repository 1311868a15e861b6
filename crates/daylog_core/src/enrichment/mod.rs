//! Optional text-enrichment collaborator.
//!
//! # Responsibility
//! - Define the contract for rewriting a deterministic day summary.
//! - Bound every enrichment call by a timeout.
//!
//! # Invariants
//! - Enrichment failures are values, never panics; callers decide how to
//!   surface them.
//! - Empty or whitespace-only output counts as a failure.

use crate::model::date_key::DateKey;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default upper bound for one enrichment call.
pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(12);

/// Successful enrichment output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedText {
    pub text: String,
    /// Identifier of the model or backend that produced `text`.
    pub model: String,
}

/// Enrichment failure reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    /// No enricher is configured for this process.
    NotConfigured,
    TimedOut(Duration),
    EmptyOutput,
    /// Backend reported a failure (missing credentials, transport error, ...).
    Backend(String),
    /// Worker thread ended without reporting a result.
    Disconnected,
}

impl Display for EnrichmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "no summary enricher configured"),
            Self::TimedOut(limit) => {
                write!(f, "summary enrichment timed out after {}ms", limit.as_millis())
            }
            Self::EmptyOutput => write!(f, "summary enrichment returned empty text"),
            Self::Backend(message) => write!(f, "summary enrichment failed: {message}"),
            Self::Disconnected => write!(f, "summary enrichment worker stopped unexpectedly"),
        }
    }
}

impl Error for EnrichmentError {}

/// Rewrites a deterministic summary into friendlier prose.
pub trait SummaryEnricher: Send + Sync {
    fn enrich(&self, date: DateKey, summary: &str) -> Result<EnrichedText, EnrichmentError>;
}

/// Runs `enricher` on a worker thread and waits at most `timeout`.
///
/// A timed-out worker is detached; its late result is dropped.
pub fn enrich_with_timeout(
    enricher: Arc<dyn SummaryEnricher>,
    date: DateKey,
    summary: &str,
    timeout: Duration,
) -> Result<EnrichedText, EnrichmentError> {
    let (tx, rx) = mpsc::channel();
    let summary = summary.to_string();
    thread::Builder::new()
        .name("daylog-enrichment".to_string())
        .spawn(move || {
            let _ = tx.send(enricher.enrich(date, &summary));
        })
        .map_err(|err| EnrichmentError::Backend(err.to_string()))?;

    let enriched = match rx.recv_timeout(timeout) {
        Ok(result) => result?,
        Err(mpsc::RecvTimeoutError::Timeout) => return Err(EnrichmentError::TimedOut(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => return Err(EnrichmentError::Disconnected),
    };

    let text = enriched.text.trim();
    if text.is_empty() {
        return Err(EnrichmentError::EmptyOutput);
    }
    Ok(EnrichedText {
        text: text.to_string(),
        model: enriched.model,
    })
}
