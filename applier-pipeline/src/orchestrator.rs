//! Top-level run loop: authenticate, search, then collect/apply/paginate
//! until the quota or the results run out.
use crate::application::ApplicationStateMachine;
use crate::collector::JobCollector;
use crate::model::{Candidate, PostingKey, RunCounters, UserProfile};
use crate::search::SearchQuery;
use crate::selectors::Role;
use crate::session::{Credentials, SessionContext};
use applier_common::ApplierError;
use applier_drivers::Browser;
use std::collections::HashSet;
use std::fmt;
use tracing::Instrument;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub credentials: Credentials,
    pub query: SearchQuery,
    pub profile: UserProfile,
    /// Upper bound on application attempts for the run.
    pub max_applications: u32,
    /// Randomized pause after each attempt, in seconds.
    pub between_applications_secs: (u64, u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QuotaReached,
    NoMorePages,
    PaginationFailed,
    EmptyFirstPage,
}

impl StopReason {
    /// Whether the run should be reported as unsuccessful.
    pub fn is_failure(self) -> bool {
        matches!(self, StopReason::PaginationFailed | StopReason::EmptyFirstPage)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::QuotaReached => "quota-reached",
            StopReason::NoMorePages => "no-more-pages",
            StopReason::PaginationFailed => "pagination-failed",
            StopReason::EmptyFirstPage => "empty-first-page",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub counters: RunCounters,
    pub stop_reason: StopReason,
    pub pages: u32,
}

pub struct Orchestrator {
    config: RunConfig,
    collector: JobCollector,
    applications: ApplicationStateMachine,
}

impl Orchestrator {
    pub fn new(config: RunConfig, applications: ApplicationStateMachine) -> Self {
        Self {
            config,
            collector: JobCollector::new(),
            applications,
        }
    }

    /// Execute one run. The session is closed before this returns, whether
    /// the run completed or aborted.
    pub async fn run<B: Browser>(&self, mut session: SessionContext<B>) -> Result<RunSummary, ApplierError> {
        let span = tracing::info_span!("run", component = "orchestrator");
        let result = self.run_inner(&mut session).instrument(span).await;
        session.close().await;
        match &result {
            Ok(summary) => tracing::info!(
                target: "applier.orchestrator",
                applied = summary.counters.applied,
                attempted = summary.counters.attempted,
                skipped = summary.counters.skipped,
                failed = summary.counters.failed,
                pages = summary.pages,
                stop_reason = %summary.stop_reason,
                "run finished"
            ),
            Err(e) => tracing::error!(target: "applier.orchestrator", error = %e, "run aborted"),
        }
        result
    }

    async fn run_inner<B: Browser>(&self, session: &mut SessionContext<B>) -> Result<RunSummary, ApplierError> {
        session.authenticate(&self.config.credentials).await?;
        self.open_search(session).await?;

        let mut counters = RunCounters::default();
        let mut seen: HashSet<PostingKey> = HashSet::new();
        let mut page = 1u32;

        let stop_reason = loop {
            let candidates = self.collector.collect(session).await;
            tracing::info!(target: "applier.orchestrator", page, candidates = candidates.len(), "page collected");
            if candidates.is_empty() {
                break if page == 1 {
                    StopReason::EmptyFirstPage
                } else {
                    StopReason::NoMorePages
                };
            }

            if self.apply_page(session, candidates, &mut counters, &mut seen).await {
                break StopReason::QuotaReached;
            }

            match self.next_page(session).await {
                Some(reason) => break reason,
                None => page += 1,
            }
        };

        Ok(RunSummary {
            counters,
            stop_reason,
            pages: page,
        })
    }

    /// Search navigation and verification of a usable results view.
    async fn open_search<B: Browser>(&self, session: &SessionContext<B>) -> Result<(), ApplierError> {
        let url = self
            .config
            .query
            .to_url()
            .map_err(|e| ApplierError::SearchUnavailable(format!("invalid search url: {e}")))?;
        tracing::info!(target: "applier.orchestrator", %url, "searching");
        if let Err(e) = session.navigate(url.as_str()).await {
            session.snapshot_screenshot("job_search_error").await;
            return Err(ApplierError::SearchUnavailable(format!("search navigation failed: {e}")));
        }
        session.settle().await;

        let resolver = session.resolver();
        match resolver.resolve(None, Role::SingleJobDismiss).await {
            Ok(resolution) => {
                if let Some(dismiss) = resolution.into_element() {
                    tracing::debug!(target: "applier.orchestrator", "dismissing single-job view");
                    if let Err(e) = session.browser().click(&dismiss).await {
                        tracing::debug!(target: "applier.orchestrator", error = %e, "single-job dismiss failed");
                    }
                    session.human_pause().await;
                }
            }
            Err(e) => tracing::debug!(target: "applier.orchestrator", error = %e, "single-job dismiss lookup failed"),
        }

        let container = resolver
            .resolve_within(None, Role::ResultsContainer, session.timeouts().results)
            .await
            .map_err(|e| ApplierError::SearchUnavailable(e.to_string()))?
            .into_element();
        let Some(container) = container else {
            session.snapshot_screenshot("no_jobs_list_found").await;
            return Err(ApplierError::SearchUnavailable("results list not found".into()));
        };

        let cards = resolver
            .resolve_all(Some(&container), Role::JobCard)
            .await
            .map_err(|e| ApplierError::SearchUnavailable(e.to_string()))?;
        if cards.is_empty() {
            session.snapshot_screenshot("empty_jobs_list").await;
            return Err(ApplierError::SearchUnavailable("results list holds no job cards".into()));
        }

        tracing::info!(target: "applier.orchestrator", cards = cards.len(), "search results ready");
        session.snapshot_screenshot("jobs_search_success").await;
        Ok(())
    }

    /// Apply to the page's candidates in order. Returns `true` once the
    /// quota is reached.
    async fn apply_page<B: Browser>(
        &self,
        session: &SessionContext<B>,
        candidates: Vec<Candidate<B::Element>>,
        counters: &mut RunCounters,
        seen: &mut HashSet<PostingKey>,
    ) -> bool {
        let (min_secs, max_secs) = self.config.between_applications_secs;
        for candidate in candidates {
            if self.quota_reached(counters) {
                return true;
            }
            let repeat = candidate.key().is_some_and(|key| !seen.insert(key));
            if repeat {
                tracing::debug!(
                    target: "applier.orchestrator",
                    title = %candidate.title,
                    company = %candidate.company,
                    "already attempted, skipping"
                );
                counters.skipped += 1;
                continue;
            }

            let attempt = self
                .applications
                .apply(session, &candidate, &self.config.profile)
                .await;
            counters.record(&attempt.outcome);
            tracing::info!(
                target: "applier.orchestrator",
                attempt_id = %attempt.attempt_id,
                outcome = %attempt.outcome,
                attempted = counters.attempted,
                max = self.config.max_applications,
                "attempt recorded"
            );

            if self.quota_reached(counters) {
                return true;
            }
            session
                .behavioral()
                .random_delay(min_secs.saturating_mul(1_000), max_secs.saturating_mul(1_000))
                .await;
        }
        false
    }

    fn quota_reached(&self, counters: &RunCounters) -> bool {
        counters.attempted >= self.config.max_applications
    }

    /// Advance to the next results page. `Some` ends the run.
    async fn next_page<B: Browser>(&self, session: &SessionContext<B>) -> Option<StopReason> {
        let next = match session.resolver().resolve(None, Role::PaginationNext).await {
            Ok(resolution) => resolution.into_element(),
            Err(e) => {
                tracing::warn!(target: "applier.orchestrator", error = %e, "pagination lookup failed");
                return Some(StopReason::PaginationFailed);
            }
        };
        let Some(next) = next else {
            tracing::info!(target: "applier.orchestrator", "no further results pages");
            return Some(StopReason::NoMorePages);
        };
        if let Err(e) = session.browser().click(&next).await {
            tracing::warn!(target: "applier.orchestrator", error = %e, "pagination click failed");
            return Some(StopReason::PaginationFailed);
        }
        session.invalidate();
        session.settle().await;
        None
    }
}
