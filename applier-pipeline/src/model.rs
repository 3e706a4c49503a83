use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// A posting on the current results page that exposes the simplified apply
/// affordance.
///
/// The element handles belong to the page view identified by `generation`
/// and must not be used once the session has navigated away from it.
#[derive(Debug, Clone)]
pub struct Candidate<E> {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    /// Site job id read from the card, when it carries one.
    pub job_id: Option<String>,
    /// Title and company were both read from the card, not defaulted.
    pub labelled: bool,
    pub card: E,
    pub affordance: E,
    /// Descriptor that located the affordance, for diagnostics.
    pub matched_selector: String,
    pub generation: u64,
}

/// Identity used to recognise the same posting on a later page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PostingKey {
    JobId(String),
    Labels {
        title: String,
        company: String,
        location: String,
    },
}

impl<E> Candidate<E> {
    /// The job id when present, otherwise the card labels. `None` when
    /// neither identifies the posting, so it is never treated as a repeat.
    pub fn key(&self) -> Option<PostingKey> {
        if let Some(id) = &self.job_id {
            return Some(PostingKey::JobId(id.clone()));
        }
        self.labelled.then(|| PostingKey::Labels {
            title: self.title.clone(),
            company: self.company.clone(),
            location: self.location.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub full_name: String,
    pub phone: String,
    pub resume_path: Option<PathBuf>,
    pub summary: String,
    pub cover_letter: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub applied: u32,
    pub attempted: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl RunCounters {
    pub fn record(&mut self, outcome: &AttemptOutcome) {
        self.attempted += 1;
        match outcome {
            AttemptOutcome::Submitted => self.applied += 1,
            AttemptOutcome::Failed(_) => self.failed += 1,
            AttemptOutcome::Abandoned => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("stale-element")]
    StaleElement,
    #[error("dialog-not-opened")]
    DialogNotOpened,
    #[error("no-submit-control")]
    NoSubmitControl,
    #[error("unhandled-required-field: {0}")]
    UnhandledRequiredField(String),
    #[error("step-limit-exceeded")]
    StepLimitExceeded,
    #[error("{0}")]
    Fault(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Submitted,
    Failed(FailureReason),
    /// The flow reached the submit control but did not press it.
    Abandoned,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Submitted => f.write_str("submitted"),
            AttemptOutcome::Failed(reason) => write!(f, "failed({reason})"),
            AttemptOutcome::Abandoned => f.write_str("abandoned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillAction {
    Phone,
    Resume(PathBuf),
    CoverLetter { chars: usize },
    Next { step: usize },
}

/// Record of one pass through the application dialog.
#[derive(Debug, Clone)]
pub struct ApplicationAttempt {
    pub attempt_id: Uuid,
    pub title: String,
    pub company: String,
    pub started_at: DateTime<Utc>,
    pub step: usize,
    pub actions: Vec<FillAction>,
    pub outcome: AttemptOutcome,
}

impl ApplicationAttempt {
    pub fn new<E>(candidate: &Candidate<E>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            title: candidate.title.clone(),
            company: candidate.company.clone(),
            started_at: Utc::now(),
            step: 0,
            actions: Vec::new(),
            outcome: AttemptOutcome::Abandoned,
        }
    }
}
