//! Declarative role → descriptor-chain registry and the resolver that walks it.
//!
//! Every lookup the pipeline performs goes through a [`Role`]. The registry
//! maps each role to a [`SelectorSpec`]: descriptors in priority order plus
//! the state an element must be in to count. The resolver returns the first
//! qualifying element of the first descriptor that yields one, so a higher
//! priority descriptor always wins over a lower one.
//!
//! An empty lookup is [`Resolution::NotFound`]. `Err` is reserved for
//! driver faults the caller cannot treat as ordinary absence.
use applier_drivers::{Browser, Descriptor, DriverError};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    LoginUsername,
    LoginPassword,
    LoginSubmit,
    AuthIndicator,
    SingleJobDismiss,
    ResultsContainer,
    JobCard,
    CardTitle,
    CardCompany,
    CardLocation,
    EasyApplyButton,
    JobDetails,
    ApplyModal,
    JobDescription,
    DescriptionHeuristic,
    PhoneInput,
    ResumeInput,
    CoverLetterInput,
    RequiredField,
    NextButton,
    SubmitButton,
    PaginationNext,
    DialogDismiss,
    DiscardConfirm,
    ConfirmationDone,
}

impl Role {
    pub const ALL: [Role; 25] = [
        Role::LoginUsername,
        Role::LoginPassword,
        Role::LoginSubmit,
        Role::AuthIndicator,
        Role::SingleJobDismiss,
        Role::ResultsContainer,
        Role::JobCard,
        Role::CardTitle,
        Role::CardCompany,
        Role::CardLocation,
        Role::EasyApplyButton,
        Role::JobDetails,
        Role::ApplyModal,
        Role::JobDescription,
        Role::DescriptionHeuristic,
        Role::PhoneInput,
        Role::ResumeInput,
        Role::CoverLetterInput,
        Role::RequiredField,
        Role::NextButton,
        Role::SubmitButton,
        Role::PaginationNext,
        Role::DialogDismiss,
        Role::DiscardConfirm,
        Role::ConfirmationDone,
    ];

    /// Configuration key of the role.
    pub fn name(self) -> &'static str {
        match self {
            Role::LoginUsername => "login_username",
            Role::LoginPassword => "login_password",
            Role::LoginSubmit => "login_submit",
            Role::AuthIndicator => "auth_indicator",
            Role::SingleJobDismiss => "single_job_dismiss",
            Role::ResultsContainer => "results_container",
            Role::JobCard => "job_card",
            Role::CardTitle => "card_title",
            Role::CardCompany => "card_company",
            Role::CardLocation => "card_location",
            Role::EasyApplyButton => "easy_apply_button",
            Role::JobDetails => "job_details",
            Role::ApplyModal => "apply_modal",
            Role::JobDescription => "job_description",
            Role::DescriptionHeuristic => "description_heuristic",
            Role::PhoneInput => "phone_input",
            Role::ResumeInput => "resume_input",
            Role::CoverLetterInput => "cover_letter_input",
            Role::RequiredField => "required_field",
            Role::NextButton => "next_button",
            Role::SubmitButton => "submit_button",
            Role::PaginationNext => "pagination_next",
            Role::DialogDismiss => "dialog_dismiss",
            Role::DiscardConfirm => "discard_confirm",
            Role::ConfirmationDone => "confirmation_done",
        }
    }

    /// ```
    /// use applier_pipeline::selectors::Role;
    ///
    /// assert_eq!(Role::from_name("submit_button"), Some(Role::SubmitButton));
    /// assert_eq!(Role::from_name("nope"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.name() == name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element state required for a match to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Present in the DOM; hidden file inputs are the typical case.
    Present,
    Visible,
    /// Visible and not disabled by attribute, `aria-disabled` or a
    /// `*disabled*` class.
    Interactable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorSpec {
    pub descriptors: Vec<Descriptor>,
    pub requirement: Requirement,
    /// Text every match must contain regardless of which descriptor found it.
    pub confirm_text: Option<String>,
}

impl SelectorSpec {
    fn new(requirement: Requirement, descriptors: Vec<Descriptor>) -> Self {
        Self {
            descriptors,
            requirement,
            confirm_text: None,
        }
    }

    fn confirmed_by(mut self, text: &str) -> Self {
        self.confirm_text = Some(text.to_string());
        self
    }
}

fn css(selector: &str) -> Descriptor {
    Descriptor::css(selector)
}

fn button_text(text: &str) -> Descriptor {
    Descriptor::css("button").with_text(text)
}

/// Marker the apply affordance's text must carry.
pub const EASY_APPLY_MARKER: &str = "Easy Apply";

/// Headings that usually open a job description block.
pub const DESCRIPTION_KEYWORDS: [&str; 4] =
    ["Requirements", "Responsibilities", "Qualifications", "About the role"];

fn builtin_spec(role: Role) -> SelectorSpec {
    use Requirement::*;
    match role {
        Role::LoginUsername => SelectorSpec::new(Interactable, vec![css("input#username")]),
        Role::LoginPassword => SelectorSpec::new(Interactable, vec![css("input#password")]),
        Role::LoginSubmit => SelectorSpec::new(Interactable, vec![css("button[type='submit']")]),
        Role::AuthIndicator => SelectorSpec::new(
            Visible,
            vec![
                css("input[placeholder='Search']"),
                css(".global-nav__me-photo"),
                css(".feed-identity-module"),
            ],
        ),
        Role::SingleJobDismiss => SelectorSpec::new(
            Interactable,
            vec![
                css("button[aria-label='Dismiss']"),
                css("button[aria-label='Close']"),
                css("button.jobs-search__close-button"),
                css("button.jobs-home-close-button"),
            ],
        ),
        Role::ResultsContainer => SelectorSpec::new(
            Visible,
            vec![
                css("div.jobs-search-two-pane__results"),
                css("ul.jobs-search__results-list"),
                css(".jobs-search-results-list"),
                css("div.jobs-search-results-list"),
                css("ul.scaffold-layout__list-container"),
            ],
        ),
        Role::JobCard => SelectorSpec::new(
            Present,
            vec![
                css("li.jobs-search-results__list-item"),
                css("li.scaffold-layout__list-item"),
                css("li[data-occludable-job-id]"),
                css(":scope > li"),
            ],
        ),
        Role::CardTitle => SelectorSpec::new(
            Present,
            vec![css(".job-card-list__title"), css("h3.base-search-card__title")],
        ),
        Role::CardCompany => SelectorSpec::new(
            Present,
            vec![
                css(".job-card-container__company-name"),
                css("h4.base-search-card__subtitle"),
            ],
        ),
        Role::CardLocation => SelectorSpec::new(
            Present,
            vec![
                css(".job-card-container__metadata-item"),
                css(".job-search-card__location"),
            ],
        ),
        Role::EasyApplyButton => SelectorSpec::new(
            Interactable,
            vec![
                css("button.jobs-apply-button"),
                button_text(EASY_APPLY_MARKER),
                css("[aria-label='Easy Apply']"),
                css(".jobs-apply-button"),
                css("button.artdeco-button--icon-right"),
            ],
        )
        .confirmed_by(EASY_APPLY_MARKER),
        Role::JobDetails => SelectorSpec::new(
            Visible,
            vec![css(".jobs-search__job-details"), css(".jobs-details")],
        ),
        Role::ApplyModal => SelectorSpec::new(
            Visible,
            vec![
                css("div#artdeco-modal-outlet div[role='dialog']"),
                css("div#artdeco-modal-outlet"),
                css(".jobs-easy-apply-modal"),
            ],
        ),
        Role::JobDescription => SelectorSpec::new(
            Visible,
            vec![
                css("div#job-details"),
                css("div.jobs-description__content"),
                css("div.jobs-description"),
                css("div.description"),
                css("[data-job-detail-type='description']"),
            ],
        ),
        Role::DescriptionHeuristic => SelectorSpec::new(
            Visible,
            DESCRIPTION_KEYWORDS
                .iter()
                .map(|kw| Descriptor::css("div").with_text(*kw))
                .collect(),
        ),
        Role::PhoneInput => SelectorSpec::new(
            Interactable,
            vec![css("input#phoneNumber"), css("input[aria-label='Phone']")],
        ),
        Role::ResumeInput => SelectorSpec::new(Present, vec![css("input[type='file']")]),
        Role::CoverLetterInput => SelectorSpec::new(
            Interactable,
            vec![
                css("textarea[name*='coverLetter']"),
                css("textarea[aria-label*='cover letter']"),
            ],
        ),
        Role::RequiredField => SelectorSpec::new(
            Interactable,
            vec![
                css("input[required]"),
                css("select[required]"),
                css("textarea[required]"),
                css("[aria-required='true']"),
            ],
        ),
        Role::NextButton => SelectorSpec::new(
            Interactable,
            vec![
                css("button[aria-label='Continue to next step']"),
                button_text("Next"),
                css("button[aria-label='Review your application']"),
                button_text("Review"),
            ],
        ),
        Role::SubmitButton => SelectorSpec::new(
            Interactable,
            vec![
                button_text("Submit application"),
                button_text("Submit"),
                button_text("Send"),
            ],
        ),
        Role::PaginationNext => {
            SelectorSpec::new(Interactable, vec![css("button[aria-label='Next']")])
        }
        Role::DialogDismiss => SelectorSpec::new(
            Interactable,
            vec![
                css("button[aria-label='Dismiss']"),
                css("button.artdeco-modal__dismiss"),
            ],
        ),
        Role::DiscardConfirm => SelectorSpec::new(
            Interactable,
            vec![
                css("button[data-control-name='discard_application_confirm_btn']"),
                button_text("Discard"),
            ],
        ),
        Role::ConfirmationDone => SelectorSpec::new(
            Interactable,
            vec![css("button[data-test-modal-close-btn]"), button_text("Done")],
        ),
    }
}

/// Role → [`SelectorSpec`] table: built-in chains, optionally replaced per
/// role from configuration.
#[derive(Debug, Clone, Default)]
pub struct SelectorRegistry {
    overrides: BTreeMap<Role, Vec<Descriptor>>,
}

impl SelectorRegistry {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Replace the descriptor chain for `role`. The role's requirement and
    /// confirmation text stay in force. An empty chain is ignored.
    pub fn with_override(mut self, role: Role, descriptors: Vec<Descriptor>) -> Self {
        if !descriptors.is_empty() {
            self.overrides.insert(role, descriptors);
        }
        self
    }

    pub fn spec(&self, role: Role) -> SelectorSpec {
        let mut spec = builtin_spec(role);
        if let Some(descriptors) = self.overrides.get(&role) {
            spec.descriptors = descriptors.clone();
        }
        spec
    }
}

/// A qualifying element and the descriptor that produced it.
#[derive(Debug, Clone)]
pub struct Resolved<E> {
    pub element: E,
    pub descriptor: Descriptor,
    /// Position of `descriptor` in the chain.
    pub rank: usize,
}

#[derive(Debug, Clone)]
pub enum Resolution<E> {
    Found(Resolved<E>),
    NotFound,
}

impl<E> Resolution<E> {
    pub fn found(self) -> Option<Resolved<E>> {
        match self {
            Resolution::Found(r) => Some(r),
            Resolution::NotFound => None,
        }
    }

    pub fn into_element(self) -> Option<E> {
        self.found().map(|r| r.element)
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// Stateless lookup against the live page.
pub struct SelectorResolver<'a, B: Browser> {
    browser: &'a B,
    registry: &'a SelectorRegistry,
    probe_timeout: Duration,
}

impl<'a, B: Browser> SelectorResolver<'a, B> {
    pub fn new(browser: &'a B, registry: &'a SelectorRegistry, probe_timeout: Duration) -> Self {
        Self {
            browser,
            registry,
            probe_timeout,
        }
    }

    pub fn spec(&self, role: Role) -> SelectorSpec {
        self.registry.spec(role)
    }

    /// First qualifying element for `role`, each descriptor probed for at
    /// most the short probe timeout.
    pub async fn resolve(
        &self,
        scope: Option<&B::Element>,
        role: Role,
    ) -> Result<Resolution<B::Element>, DriverError> {
        self.resolve_within(scope, role, self.probe_timeout).await
    }

    /// Like [`Self::resolve`] with an explicit per-descriptor bound.
    /// `Duration::ZERO` means a single immediate look.
    pub async fn resolve_within(
        &self,
        scope: Option<&B::Element>,
        role: Role,
        per_descriptor: Duration,
    ) -> Result<Resolution<B::Element>, DriverError> {
        let spec = self.spec(role);
        for (rank, descriptor) in spec.descriptors.iter().enumerate() {
            let started = Instant::now();
            loop {
                let matches = self.qualifying(scope, descriptor, &spec).await?;
                if let Some(element) = matches.into_iter().next() {
                    tracing::trace!(
                        target: "applier.selectors",
                        %role,
                        rank,
                        %descriptor,
                        "resolved"
                    );
                    return Ok(Resolution::Found(Resolved {
                        element,
                        descriptor: descriptor.clone(),
                        rank,
                    }));
                }
                if started.elapsed() >= per_descriptor {
                    break;
                }
                sleep(POLL_INTERVAL.min(per_descriptor)).await;
            }
            tracing::trace!(target: "applier.selectors", %role, rank, %descriptor, "no match");
        }
        tracing::trace!(target: "applier.selectors", %role, "not found");
        Ok(Resolution::NotFound)
    }

    /// Every qualifying element of the first descriptor that yields any.
    pub async fn resolve_all(
        &self,
        scope: Option<&B::Element>,
        role: Role,
    ) -> Result<Vec<B::Element>, DriverError> {
        let spec = self.spec(role);
        for descriptor in &spec.descriptors {
            let matches = self.qualifying(scope, descriptor, &spec).await?;
            if !matches.is_empty() {
                tracing::trace!(
                    target: "applier.selectors",
                    %role,
                    %descriptor,
                    count = matches.len(),
                    "resolved all"
                );
                return Ok(matches);
            }
        }
        Ok(Vec::new())
    }

    /// Wait up to `timeout` for any descriptor of `role` to qualify, polling
    /// the whole chain round-robin. Unlike [`Self::resolve`], no descriptor
    /// is preferred: whichever appears first wins.
    pub async fn first_to_appear(
        &self,
        scope: Option<&B::Element>,
        role: Role,
        timeout: Duration,
    ) -> Result<Resolution<B::Element>, DriverError> {
        let spec = self.spec(role);
        let started = Instant::now();
        loop {
            for (rank, descriptor) in spec.descriptors.iter().enumerate() {
                if let Some(element) = self
                    .qualifying(scope, descriptor, &spec)
                    .await?
                    .into_iter()
                    .next()
                {
                    return Ok(Resolution::Found(Resolved {
                        element,
                        descriptor: descriptor.clone(),
                        rank,
                    }));
                }
            }
            if started.elapsed() >= timeout {
                return Ok(Resolution::NotFound);
            }
            sleep(POLL_INTERVAL.min(timeout)).await;
        }
    }

    /// Elements matched by `descriptor` that satisfy `spec`'s requirement
    /// and text filters, in document order.
    pub async fn qualifying(
        &self,
        scope: Option<&B::Element>,
        descriptor: &Descriptor,
        spec: &SelectorSpec,
    ) -> Result<Vec<B::Element>, DriverError> {
        let found = self.browser.find_all(scope, &descriptor.locator).await?;
        let mut out = Vec::with_capacity(found.len());
        for element in found {
            match self.accepts(&element, descriptor, spec).await {
                Ok(true) => out.push(element),
                Ok(false) => {}
                // Re-rendered between the query and the state checks.
                Err(DriverError::StaleElement) => {
                    tracing::trace!(target: "applier.selectors", %descriptor, "stale match skipped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    async fn accepts(
        &self,
        element: &B::Element,
        descriptor: &Descriptor,
        spec: &SelectorSpec,
    ) -> Result<bool, DriverError> {
        let b = self.browser;
        match spec.requirement {
            Requirement::Present => {}
            Requirement::Visible => {
                if !b.is_displayed(element).await? {
                    return Ok(false);
                }
            }
            Requirement::Interactable => {
                if !b.is_displayed(element).await? || !b.is_enabled(element).await? {
                    return Ok(false);
                }
                if b.attr(element, "aria-disabled").await?.as_deref() == Some("true") {
                    return Ok(false);
                }
                let class = b.attr(element, "class").await?.unwrap_or_default();
                if class.contains("disabled") {
                    return Ok(false);
                }
            }
        }

        if descriptor.text.is_none() && spec.confirm_text.is_none() {
            return Ok(true);
        }
        let text = b.text(element).await?;
        let confirmed = spec
            .confirm_text
            .as_deref()
            .map_or(true, |needle| text.to_lowercase().contains(&needle.to_lowercase()));
        if !confirmed {
            tracing::trace!(
                target: "applier.selectors",
                %descriptor,
                text = %text.trim(),
                "text does not confirm role"
            );
        }
        Ok(confirmed && descriptor.text_matches(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_name(role.name()), Some(role));
        }
    }

    #[test]
    fn submit_chain_prefers_most_specific_label() {
        let spec = SelectorRegistry::builtin().spec(Role::SubmitButton);
        let texts: Vec<_> = spec
            .descriptors
            .iter()
            .filter_map(|d| d.text.clone())
            .collect();
        assert_eq!(texts, vec!["Submit application", "Submit", "Send"]);
    }

    #[test]
    fn override_keeps_confirmation_text() {
        let registry = SelectorRegistry::builtin()
            .with_override(Role::EasyApplyButton, vec![Descriptor::css("button.apply-v2")]);
        let spec = registry.spec(Role::EasyApplyButton);
        assert_eq!(spec.descriptors, vec![Descriptor::css("button.apply-v2")]);
        assert_eq!(spec.confirm_text.as_deref(), Some(EASY_APPLY_MARKER));
        assert_eq!(spec.requirement, Requirement::Interactable);
    }

    #[test]
    fn empty_override_is_ignored() {
        let registry = SelectorRegistry::builtin().with_override(Role::NextButton, Vec::new());
        assert_eq!(registry.spec(Role::NextButton).descriptors.len(), 4);
    }
}
