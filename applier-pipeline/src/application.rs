//! Per-candidate application flow.
//!
//! `Idle → CardOpened → DialogOpen → Filling → Submitted`, with every
//! element re-resolved at the moment it is used. Whatever happens inside an
//! attempt ends up in its [`AttemptOutcome`]; nothing escapes to the caller.
use crate::form::{FormFiller, StepOutcome};
use crate::model::{ApplicationAttempt, AttemptOutcome, Candidate, FailureReason, UserProfile};
use crate::selectors::Role;
use crate::session::SessionContext;
use applier_drivers::{Browser, DriverError};
use std::time::Duration;
use tracing::Instrument;

#[derive(Debug, Clone, Copy)]
pub struct ApplicationPolicy {
    /// Walk the whole flow but never press the submit control.
    pub dry_run: bool,
    /// Upper bound on dialog steps before the attempt is declared stuck.
    pub max_steps: usize,
}

impl Default for ApplicationPolicy {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_steps: 12,
        }
    }
}

pub struct ApplicationStateMachine {
    filler: FormFiller,
    policy: ApplicationPolicy,
}

impl ApplicationStateMachine {
    pub fn new(filler: FormFiller, policy: ApplicationPolicy) -> Self {
        Self { filler, policy }
    }

    /// Drive one candidate to a terminal outcome.
    pub async fn apply<B: Browser>(
        &self,
        session: &SessionContext<B>,
        candidate: &Candidate<B::Element>,
        profile: &UserProfile,
    ) -> ApplicationAttempt {
        let mut attempt = ApplicationAttempt::new(candidate);
        let span = tracing::info_span!(
            "apply",
            component = "application",
            attempt_id = %attempt.attempt_id,
            title = %candidate.title,
            company = %candidate.company,
        );

        async {
            tracing::info!(target: "applier.application", selector = %candidate.matched_selector, "starting application");
            let outcome = match self.run(session, candidate, profile, &mut attempt).await {
                Ok(outcome) => outcome,
                Err(DriverError::StaleElement) => AttemptOutcome::Failed(FailureReason::StaleElement),
                Err(e) => AttemptOutcome::Failed(FailureReason::Fault(e.to_string())),
            };

            match &outcome {
                AttemptOutcome::Submitted => {
                    tracing::info!(target: "applier.application", steps = attempt.step + 1, "application submitted");
                    self.close_confirmation(session).await;
                }
                AttemptOutcome::Abandoned => {
                    tracing::info!(target: "applier.application", "dry run: stopped at the submit control");
                    self.close_dialog(session).await;
                }
                AttemptOutcome::Failed(reason) => {
                    tracing::error!(target: "applier.application", %reason, step = attempt.step, "application failed");
                    session.snapshot_screenshot("failed_application").await;
                    self.close_dialog(session).await;
                }
            }
            session.route_diagnostics().await;
            attempt.outcome = outcome;
        }
        .instrument(span)
        .await;

        attempt
    }

    async fn run<B: Browser>(
        &self,
        session: &SessionContext<B>,
        candidate: &Candidate<B::Element>,
        profile: &UserProfile,
        attempt: &mut ApplicationAttempt,
    ) -> Result<AttemptOutcome, DriverError> {
        let browser = session.browser();
        let resolver = session.resolver();

        // Idle → CardOpened
        if candidate.generation != session.generation() {
            tracing::warn!(target: "applier.application", "candidate belongs to a previous page view");
            return Ok(AttemptOutcome::Failed(FailureReason::StaleElement));
        }
        if !browser.is_attached(&candidate.card).await? {
            tracing::warn!(target: "applier.application", "job card detached before click");
            return Ok(AttemptOutcome::Failed(FailureReason::StaleElement));
        }
        session.snapshot_screenshot("before_card_click").await;
        browser.click(&candidate.card).await?;
        session.settle().await;

        let details = resolver
            .resolve_within(None, Role::JobDetails, Duration::ZERO)
            .await?
            .into_element();
        if details.is_none() {
            tracing::warn!(target: "applier.application", "job details panel not found after click");
        }
        session.snapshot_screenshot("after_details_load").await;

        // CardOpened → DialogOpen
        let Some(affordance) = resolver
            .resolve(details.as_ref(), Role::EasyApplyButton)
            .await?
            .found()
        else {
            tracing::warn!(target: "applier.application", "apply affordance not found on detail panel");
            return Ok(AttemptOutcome::Failed(FailureReason::DialogNotOpened));
        };
        tracing::debug!(target: "applier.application", control = %affordance.descriptor, "opening dialog");
        browser.click(&affordance.element).await?;

        if !resolver
            .first_to_appear(None, Role::ApplyModal, session.timeouts().modal)
            .await?
            .is_found()
        {
            tracing::warn!(target: "applier.application", "application dialog did not appear");
            return Ok(AttemptOutcome::Failed(FailureReason::DialogNotOpened));
        }

        // DialogOpen → Filling
        let mut ready = false;
        for step in 0..self.policy.max_steps {
            attempt.step = step;
            let Some(dialog) = resolver.resolve(None, Role::ApplyModal).await?.into_element() else {
                return Ok(AttemptOutcome::Failed(FailureReason::Fault(
                    "application dialog closed unexpectedly".into(),
                )));
            };
            match self
                .filler
                .fill_step(session, &dialog, profile, candidate, &mut attempt.actions, step)
                .await?
            {
                StepOutcome::MoreSteps => continue,
                StepOutcome::ReadyToSubmit => {
                    ready = true;
                    break;
                }
                StepOutcome::Blocked(field) => {
                    return Ok(AttemptOutcome::Failed(FailureReason::UnhandledRequiredField(field)));
                }
            }
        }
        if !ready {
            return Ok(AttemptOutcome::Failed(FailureReason::StepLimitExceeded));
        }

        // Filling → Submitted
        let dialog = resolver.resolve(None, Role::ApplyModal).await?.into_element();
        let Some(submit) = resolver
            .resolve(dialog.as_ref(), Role::SubmitButton)
            .await?
            .found()
        else {
            return Ok(AttemptOutcome::Failed(FailureReason::NoSubmitControl));
        };
        if self.policy.dry_run {
            tracing::debug!(target: "applier.application", control = %submit.descriptor, "dry run: submit not pressed");
            return Ok(AttemptOutcome::Abandoned);
        }
        browser.click(&submit.element).await?;
        session
            .wait_for_network_idle(session.timeouts().submit_idle)
            .await;
        Ok(AttemptOutcome::Submitted)
    }

    /// Best-effort dismissal of a dialog left open, including the discard
    /// confirmation. Errors are logged only.
    async fn close_dialog<B: Browser>(&self, session: &SessionContext<B>) {
        for role in [Role::DialogDismiss, Role::DiscardConfirm] {
            if let Err(e) = click_control(session, role).await {
                tracing::debug!(target: "applier.application", %role, error = %e, "dialog cleanup failed");
                return;
            }
        }
    }

    /// Best-effort close of the confirmation shown after a submit.
    async fn close_confirmation<B: Browser>(&self, session: &SessionContext<B>) {
        for role in [Role::ConfirmationDone, Role::DialogDismiss] {
            match click_control(session, role).await {
                Ok(true) => return,
                Ok(false) => continue,
                Err(e) => {
                    tracing::debug!(target: "applier.application", %role, error = %e, "confirmation close failed");
                    return;
                }
            }
        }
    }
}

/// Click the control for `role` if one is present. `Ok(false)` when absent.
async fn click_control<B: Browser>(session: &SessionContext<B>, role: Role) -> Result<bool, DriverError> {
    let Some(control) = session
        .resolver()
        .resolve_within(None, role, Duration::ZERO)
        .await?
        .into_element()
    else {
        return Ok(false);
    };
    session.browser().click(&control).await?;
    session.human_pause().await;
    Ok(true)
}
