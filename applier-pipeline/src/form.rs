//! Field population and step advance inside the application dialog.
use crate::description::extract_description;
use crate::model::{Candidate, FillAction, UserProfile};
use crate::selectors::Role;
use crate::session::SessionContext;
use applier_drivers::{Browser, DriverError, Locator};
use applier_llm::cover_letter::CoverLetterGenerator;
use std::sync::Arc;
use std::time::Duration;

/// Placeholder values a `<select>` shows before a choice is made.
const UNSET_SELECT_VALUES: [&str; 2] = ["", "Select an option"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequiredFieldPolicy {
    /// A required field left empty blocks the step.
    #[default]
    Fail,
    /// Leave it as the site defaults it and keep going.
    ClickThrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// "Next" was clicked; another step follows.
    MoreSteps,
    /// No "Next" control on this step.
    ReadyToSubmit,
    /// A required field no rule fills is still empty.
    Blocked(String),
}

pub struct FormFiller {
    cover_letters: Option<Arc<dyn CoverLetterGenerator>>,
    required_fields: RequiredFieldPolicy,
    step_pause: Duration,
}

impl FormFiller {
    pub fn new(required_fields: RequiredFieldPolicy, step_pause: Duration) -> Self {
        Self {
            cover_letters: None,
            required_fields,
            step_pause,
        }
    }

    pub fn with_cover_letters(mut self, generator: Arc<dyn CoverLetterGenerator>) -> Self {
        self.cover_letters = Some(generator);
        self
    }

    /// Populate the recognised fields of the current step, then advance.
    ///
    /// Missing fields are skipped silently. Driver faults propagate and end
    /// the attempt.
    pub async fn fill_step<B: Browser>(
        &self,
        session: &SessionContext<B>,
        dialog: &B::Element,
        profile: &UserProfile,
        candidate: &Candidate<B::Element>,
        actions: &mut Vec<FillAction>,
        step: usize,
    ) -> Result<StepOutcome, DriverError> {
        let browser = session.browser();
        let resolver = session.resolver();

        if !profile.phone.is_empty() {
            if let Some(input) = resolver
                .resolve_within(Some(dialog), Role::PhoneInput, Duration::ZERO)
                .await?
                .into_element()
            {
                browser.fill(&input, &profile.phone).await?;
                actions.push(FillAction::Phone);
                session.human_pause().await;
            }
        }

        if let Some(resume) = &profile.resume_path {
            if let Some(input) = resolver
                .resolve_within(Some(dialog), Role::ResumeInput, Duration::ZERO)
                .await?
                .into_element()
            {
                browser.set_file(&input, resume).await?;
                actions.push(FillAction::Resume(resume.clone()));
                session.human_pause().await;
            }
        }

        if let Some(generator) = self.cover_letter_generator(profile) {
            if let Some(area) = resolver
                .resolve_within(Some(dialog), Role::CoverLetterInput, Duration::ZERO)
                .await?
                .into_element()
            {
                let current = browser.prop(&area, "value").await?.unwrap_or_default();
                if current.trim().is_empty() {
                    let description = extract_description(browser, &resolver).await;
                    let letter = generator
                        .generate(&candidate.title, &candidate.company, &description, &profile.summary)
                        .await;
                    browser.fill(&area, &letter).await?;
                    actions.push(FillAction::CoverLetter {
                        chars: letter.chars().count(),
                    });
                    session.human_pause().await;
                }
            }
        }

        if self.required_fields == RequiredFieldPolicy::Fail {
            let skip_free_text = self.cover_letter_generator(profile).is_none();
            if let Some(field) = self.unfilled_required_field(session, dialog, skip_free_text).await? {
                tracing::warn!(target: "applier.form", step, %field, "required field left empty");
                return Ok(StepOutcome::Blocked(field));
            }
        }

        match resolver
            .resolve_within(Some(dialog), Role::NextButton, Duration::ZERO)
            .await?
            .found()
        {
            Some(next) => {
                tracing::debug!(target: "applier.form", step, control = %next.descriptor, "advancing");
                browser.click(&next.element).await?;
                actions.push(FillAction::Next { step });
                session.behavioral().pause(self.step_pause).await;
                Ok(StepOutcome::MoreSteps)
            }
            None => Ok(StepOutcome::ReadyToSubmit),
        }
    }

    fn cover_letter_generator(&self, profile: &UserProfile) -> Option<&Arc<dyn CoverLetterGenerator>> {
        if profile.cover_letter {
            self.cover_letters.as_ref()
        } else {
            None
        }
    }

    /// Label of the first visible required field that is still empty.
    ///
    /// With `skip_free_text` set, textareas are left out of the scan
    /// entirely: neither looked up by a textarea descriptor nor read.
    async fn unfilled_required_field<B: Browser>(
        &self,
        session: &SessionContext<B>,
        dialog: &B::Element,
        skip_free_text: bool,
    ) -> Result<Option<String>, DriverError> {
        let browser = session.browser();
        let resolver = session.resolver();
        let spec = resolver.spec(Role::RequiredField);

        for descriptor in &spec.descriptors {
            if skip_free_text && targets_textarea(&descriptor.locator) {
                continue;
            }
            for field in resolver.qualifying(Some(dialog), descriptor, &spec).await? {
                if skip_free_text && is_textarea(browser, &field).await? {
                    continue;
                }
                let value = browser.prop(&field, "value").await?.unwrap_or_default();
                if !UNSET_SELECT_VALUES.contains(&value.trim()) {
                    continue;
                }
                let mut label = None;
                for attribute in ["aria-label", "name", "id"] {
                    if let Some(v) = browser.attr(&field, attribute).await? {
                        if !v.trim().is_empty() {
                            label = Some(v.trim().to_string());
                            break;
                        }
                    }
                }
                return Ok(Some(label.unwrap_or_else(|| descriptor.to_string())));
            }
        }
        Ok(None)
    }
}

fn targets_textarea(locator: &Locator) -> bool {
    match locator {
        Locator::Css(css) => css.trim_start().to_ascii_lowercase().starts_with("textarea"),
        Locator::XPath(xpath) => xpath.to_ascii_lowercase().contains("textarea"),
    }
}

async fn is_textarea<B: Browser>(browser: &B, field: &B::Element) -> Result<bool, DriverError> {
    Ok(browser
        .prop(field, "tagName")
        .await?
        .is_some_and(|tag| tag.eq_ignore_ascii_case("textarea")))
}
