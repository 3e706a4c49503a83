//! Candidate discovery on a results page.
use crate::model::Candidate;
use crate::selectors::Role;
use crate::session::SessionContext;
use applier_drivers::{Browser, DriverError};
use std::time::Duration;
use tracing::Instrument;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

#[derive(Debug, Default, Clone, Copy)]
pub struct JobCollector;

impl JobCollector {
    pub fn new() -> Self {
        Self
    }

    /// Candidates on the current results page, in page order.
    ///
    /// Never fails: a missing container or an empty list yields an empty
    /// vector (logged and screenshotted), and a card that cannot be read is
    /// dropped without affecting the others.
    pub async fn collect<B: Browser>(&self, session: &SessionContext<B>) -> Vec<Candidate<B::Element>> {
        let span = tracing::info_span!("collect", component = "collector");
        self.collect_inner(session).instrument(span).await
    }

    async fn collect_inner<B: Browser>(&self, session: &SessionContext<B>) -> Vec<Candidate<B::Element>> {
        session.snapshot_screenshot("initial_jobs_page").await;
        let resolver = session.resolver();

        let container = match resolver
            .resolve_within(None, Role::ResultsContainer, session.timeouts().results)
            .await
        {
            Ok(resolution) => match resolution.found() {
                Some(hit) => {
                    tracing::debug!(target: "applier.collector", container = %hit.descriptor, "results container found");
                    hit.element
                }
                None => {
                    tracing::warn!(target: "applier.collector", "results container not found");
                    session.snapshot_screenshot("no_jobs_list_found").await;
                    return Vec::new();
                }
            },
            Err(e) => {
                tracing::warn!(target: "applier.collector", error = %e, "results container lookup failed");
                session.snapshot_screenshot("no_jobs_list_found").await;
                return Vec::new();
            }
        };

        session.settle().await;

        let cards = match resolver.resolve_all(Some(&container), Role::JobCard).await {
            Ok(cards) => cards,
            Err(e) => {
                tracing::warn!(target: "applier.collector", error = %e, "job card enumeration failed");
                Vec::new()
            }
        };
        if cards.is_empty() {
            tracing::warn!(target: "applier.collector", "results container holds no job cards");
            session.snapshot_screenshot("empty_jobs_list").await;
            return Vec::new();
        }

        let generation = session.generation();
        let total = cards.len();
        let mut candidates = Vec::new();
        for (index, card) in cards.into_iter().enumerate() {
            match self.inspect_card(session, card, generation).await {
                Ok(Some(candidate)) => {
                    tracing::debug!(
                        target: "applier.collector",
                        index,
                        title = %candidate.title,
                        company = %candidate.company,
                        selector = %candidate.matched_selector,
                        "eligible card"
                    );
                    candidates.push(candidate);
                }
                Ok(None) => {
                    tracing::trace!(target: "applier.collector", index, "card has no simplified apply affordance");
                }
                Err(e) => {
                    tracing::warn!(target: "applier.collector", index, error = %e, "card skipped");
                }
            }
        }

        tracing::info!(
            target: "applier.collector",
            eligible = candidates.len(),
            total,
            "collection complete"
        );
        session.snapshot_screenshot("jobs_collection_complete").await;
        candidates
    }

    async fn inspect_card<B: Browser>(
        &self,
        session: &SessionContext<B>,
        card: B::Element,
        generation: u64,
    ) -> Result<Option<Candidate<B::Element>>, DriverError> {
        let resolver = session.resolver();

        // The page has settled; card-scoped lookups take a single look.
        let affordance = match resolver
            .resolve_within(Some(&card), Role::EasyApplyButton, Duration::ZERO)
            .await?
            .found()
        {
            Some(hit) => hit,
            None => return Ok(None),
        };

        let title = label(session, &card, Role::CardTitle).await?;
        let company = label(session, &card, Role::CardCompany).await?;
        let location = label(session, &card, Role::CardLocation).await?;
        let job_id = job_id(session.browser(), &card).await?;
        let labelled = title.is_some() && company.is_some();

        Ok(Some(Candidate {
            title: title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            company: company.unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
            location,
            job_id,
            labelled,
            card,
            affordance: affordance.element,
            matched_selector: affordance.descriptor.to_string(),
            generation,
        }))
    }
}

/// Card attributes carrying the site's job id, in lookup order.
pub const JOB_ID_ATTRIBUTES: [&str; 2] = ["data-occludable-job-id", "data-job-id"];

async fn job_id<B: Browser>(browser: &B, card: &B::Element) -> Result<Option<String>, DriverError> {
    for name in JOB_ID_ATTRIBUTES {
        if let Some(value) = browser.attr(card, name).await? {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(Some(value.to_string()));
            }
        }
    }
    Ok(None)
}

/// Trimmed text of the first element matching `role` inside `card`;
/// `None` when absent or blank.
async fn label<B: Browser>(
    session: &SessionContext<B>,
    card: &B::Element,
    role: Role,
) -> Result<Option<String>, DriverError> {
    let Some(element) = session
        .resolver()
        .resolve_within(Some(card), role, Duration::ZERO)
        .await?
        .into_element()
    else {
        return Ok(None);
    };
    let text = session.browser().text(&element).await?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}
