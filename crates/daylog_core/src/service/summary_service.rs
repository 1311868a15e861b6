//! Deterministic summary generation with optional enrichment.
//!
//! # Responsibility
//! - Build and persist the deterministic summary of one day.
//! - Run the optional enricher under a timeout and store its output.
//!
//! # Invariants
//! - Enrichment failure never fails `generate`; the deterministic summary is
//!   persisted first and `ai_summary` keeps its previous value.
//! - Swept days report their frozen summary and score unchanged.

use crate::config::CoreConfig;
use crate::enrichment::{
    enrich_with_timeout, EnrichedText, EnrichmentError, SummaryEnricher,
    DEFAULT_ENRICHMENT_TIMEOUT,
};
use crate::model::date_key::DateKey;
use crate::model::day::{DayView, UserId};
use crate::model::summary::{build_summary, SummaryInput};
use crate::repo::day_repo::DayRepository;
use crate::repo::{Entity, RepoError};
use crate::service::{parse_date_input, retry_on_conflict, ServiceError, ServiceResult};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Result of one summary generation.
#[derive(Debug)]
pub struct SummaryReport {
    pub date: DateKey,
    /// Persisted deterministic summary.
    pub summary: String,
    pub score: i64,
    /// Enrichment outcome; `Err(EnrichmentUnavailable)` on any failure.
    pub enrichment: Result<EnrichedText, ServiceError>,
}

/// Summary service facade over repository implementations.
pub struct SummaryService<R: DayRepository> {
    repo: R,
    enricher: Option<Arc<dyn SummaryEnricher>>,
    timeout: Duration,
}

impl<R: DayRepository> SummaryService<R> {
    /// Creates a service without an enricher; enrichment always reports
    /// `EnrichmentUnavailable`.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            enricher: None,
            timeout: DEFAULT_ENRICHMENT_TIMEOUT,
        }
    }

    /// Creates a service bounded by `config.enrichment_timeout`.
    pub fn from_config(
        repo: R,
        config: &CoreConfig,
        enricher: Option<Arc<dyn SummaryEnricher>>,
    ) -> Self {
        Self {
            repo,
            enricher,
            timeout: config.enrichment_timeout,
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn SummaryEnricher>, timeout: Duration) -> Self {
        self.enricher = Some(enricher);
        self.timeout = timeout;
        self
    }

    /// Upper bound applied to each enrichment call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds, persists and optionally enriches the summary of one day.
    ///
    /// On an unswept day the rendered text is stored in `summary`, and a
    /// later sweep keeps a stored summary as is. Text generated before the
    /// day ends therefore stays frozen with the counts it had at that time.
    pub fn generate(
        &self,
        user_id: UserId,
        date: &str,
        today: DateKey,
    ) -> ServiceResult<SummaryReport> {
        let date = parse_date_input(date)?;
        retry_on_conflict("ensure_day", || self.repo.ensure_day(user_id, date, today))?;
        let view = self
            .repo
            .load_day_view(user_id, date)?
            .ok_or_else(|| RepoError::not_found(Entity::DailyLog, date))?;

        let score = view.effective_score();
        let summary = match (&view.log.summary, view.log.is_swept()) {
            (Some(frozen), true) => frozen.clone(),
            _ => {
                let built = render(&view, score);
                self.repo.save_summary(view.log.id, &built)?;
                built
            }
        };

        let enrichment = self.enrich(&view, &summary);
        Ok(SummaryReport {
            date,
            summary,
            score,
            enrichment,
        })
    }

    fn enrich(&self, view: &DayView, summary: &str) -> Result<EnrichedText, ServiceError> {
        let outcome = match &self.enricher {
            Some(enricher) => {
                enrich_with_timeout(Arc::clone(enricher), view.log.date, summary, self.timeout)
            }
            None => Err(EnrichmentError::NotConfigured),
        };

        match outcome {
            Ok(enriched) => {
                self.repo
                    .save_ai_summary(view.log.id, &enriched.text, &enriched.model)?;
                info!(
                    "event=summary_enrich module=service status=ok date={} model={}",
                    view.log.date, enriched.model
                );
                Ok(enriched)
            }
            Err(err) => {
                warn!(
                    "event=summary_enrich module=service status=unavailable date={} reason={}",
                    view.log.date, err
                );
                Err(ServiceError::EnrichmentUnavailable(err.to_string()))
            }
        }
    }
}

fn render(view: &DayView, score: i64) -> String {
    build_summary(&SummaryInput {
        date: view.log.date,
        blocks: &view.blocks,
        counters: view.score_input(),
        score,
        deferred_count: view.pending_count(),
    })
}
