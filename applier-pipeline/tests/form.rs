mod common;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use applier_llm::cover_letter::CoverLetterGenerator;
use applier_pipeline::description::extract_description;
use applier_pipeline::form::StepOutcome;
use applier_pipeline::model::{Candidate, FillAction, UserProfile};
use applier_pipeline::selectors::Role;
use applier_pipeline::session::SessionContext;
use applier_pipeline::{FormFiller, RequiredFieldPolicy};
use async_trait::async_trait;
use common::{loc, session, FakeBrowser, NodeId};

/// Records every request and answers with a fixed letter.
#[derive(Default)]
struct RecordingWriter {
    requests: Mutex<Vec<(String, String, String, String)>>,
}

#[async_trait]
impl CoverLetterGenerator for RecordingWriter {
    async fn generate(&self, job_title: &str, company: &str, job_description: &str, user_background: &str) -> String {
        self.requests.lock().unwrap().push((
            job_title.into(),
            company.into(),
            job_description.into(),
            user_background.into(),
        ));
        "Dear Acme team, ...".into()
    }
}

fn candidate(session: &SessionContext<FakeBrowser>, card: NodeId) -> Candidate<NodeId> {
    Candidate {
        title: "Rust Engineer".into(),
        company: "Acme".into(),
        location: Some("Remote".into()),
        job_id: None,
        labelled: true,
        card,
        affordance: card,
        matched_selector: "css=button.jobs-apply-button".into(),
        generation: session.generation(),
    }
}

fn open_dialog(browser: &FakeBrowser) -> (NodeId, NodeId) {
    let card = browser.add_role(None, Role::JobCard, 0, "");
    let dialog = browser.add_role(None, Role::ApplyModal, 0, "");
    (card, dialog)
}

#[tokio::test]
async fn step_without_next_is_ready_in_one_call() {
    let browser = FakeBrowser::new();
    let (card, dialog) = open_dialog(&browser);
    let phone = browser.add_role(Some(dialog), Role::PhoneInput, 1, "");
    let resume = browser.add_role(Some(dialog), Role::ResumeInput, 0, "");
    browser.set_visible(resume, false);
    let session = session(&browser);
    let profile = UserProfile {
        phone: "0123".into(),
        resume_path: Some(PathBuf::from("/tmp/cv.pdf")),
        ..UserProfile::default()
    };

    let mut actions = Vec::new();
    let outcome = FormFiller::new(RequiredFieldPolicy::Fail, Duration::ZERO)
        .fill_step(&session, &dialog, &profile, &candidate(&session, card), &mut actions, 0)
        .await
        .unwrap();

    assert_eq!(outcome, StepOutcome::ReadyToSubmit);
    assert_eq!(browser.fill_of(phone).as_deref(), Some("0123"));
    assert_eq!(browser.page().files, vec![(resume, PathBuf::from("/tmp/cv.pdf"))]);
    assert_eq!(
        actions,
        vec![FillAction::Phone, FillAction::Resume(PathBuf::from("/tmp/cv.pdf"))]
    );
}

#[tokio::test]
async fn empty_profile_values_leave_fields_alone() {
    let browser = FakeBrowser::new();
    let (card, dialog) = open_dialog(&browser);
    let phone = browser.add_role(Some(dialog), Role::PhoneInput, 0, "");
    browser.add_role(Some(dialog), Role::ResumeInput, 0, "");
    let session = session(&browser);

    let mut actions = Vec::new();
    FormFiller::new(RequiredFieldPolicy::ClickThrough, Duration::ZERO)
        .fill_step(&session, &dialog, &UserProfile::default(), &candidate(&session, card), &mut actions, 0)
        .await
        .unwrap();

    assert!(actions.is_empty());
    assert_eq!(browser.fill_of(phone), None);
    assert!(browser.page().files.is_empty());
}

#[tokio::test]
async fn disabled_cover_letter_never_touches_the_textarea() {
    let browser = FakeBrowser::new();
    let (card, dialog) = open_dialog(&browser);
    let area = browser.add_role(Some(dialog), Role::CoverLetterInput, 0, "");
    let session = session(&browser);
    let writer = Arc::new(RecordingWriter::default());
    let profile = UserProfile {
        cover_letter: false,
        ..UserProfile::default()
    };

    let mut actions = Vec::new();
    FormFiller::new(RequiredFieldPolicy::ClickThrough, Duration::ZERO)
        .with_cover_letters(writer.clone())
        .fill_step(&session, &dialog, &profile, &candidate(&session, card), &mut actions, 0)
        .await
        .unwrap();

    assert_eq!(browser.fill_of(area), None);
    assert!(!browser.queried("textarea"));
    assert!(writer.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn required_check_skips_free_text_when_cover_letters_are_off() {
    let browser = FakeBrowser::new();
    let (card, dialog) = open_dialog(&browser);
    let area = browser.add(
        Some(dialog),
        vec![loc(Role::CoverLetterInput, 0), loc(Role::RequiredField, 2), loc(Role::RequiredField, 3)],
        "",
    );
    browser.set_prop(area, "tagName", "TEXTAREA");
    let session = session(&browser);

    let mut actions = Vec::new();
    let outcome = FormFiller::new(RequiredFieldPolicy::Fail, Duration::ZERO)
        .fill_step(&session, &dialog, &UserProfile::default(), &candidate(&session, card), &mut actions, 0)
        .await
        .unwrap();

    assert_eq!(outcome, StepOutcome::ReadyToSubmit);
    assert!(!browser.queried("textarea"));
    assert_eq!(browser.fill_of(area), None);
}

#[tokio::test]
async fn enabled_cover_letter_uses_description_and_background() {
    let browser = FakeBrowser::new();
    let (card, dialog) = open_dialog(&browser);
    browser.add_role(None, Role::JobDescription, 1, "  Build\n  reliable   services ");
    let area = browser.add_role(Some(dialog), Role::CoverLetterInput, 1, "");
    let session = session(&browser);
    let writer = Arc::new(RecordingWriter::default());
    let profile = UserProfile {
        summary: "Ten years of backend work".into(),
        cover_letter: true,
        ..UserProfile::default()
    };

    let mut actions = Vec::new();
    FormFiller::new(RequiredFieldPolicy::Fail, Duration::ZERO)
        .with_cover_letters(writer.clone())
        .fill_step(&session, &dialog, &profile, &candidate(&session, card), &mut actions, 0)
        .await
        .unwrap();

    assert_eq!(browser.fill_of(area).as_deref(), Some("Dear Acme team, ..."));
    assert_eq!(
        writer.requests.lock().unwrap()[0],
        (
            "Rust Engineer".to_string(),
            "Acme".to_string(),
            "Build reliable services".to_string(),
            "Ten years of backend work".to_string()
        )
    );
    assert_eq!(actions, vec![FillAction::CoverLetter { chars: 19 }]);
}

#[tokio::test]
async fn prefilled_cover_letter_is_kept() {
    let browser = FakeBrowser::new();
    let (card, dialog) = open_dialog(&browser);
    let area = browser.add_role(Some(dialog), Role::CoverLetterInput, 0, "");
    browser.set_prop(area, "value", "Already written");
    let session = session(&browser);
    let writer = Arc::new(RecordingWriter::default());
    let profile = UserProfile {
        cover_letter: true,
        ..UserProfile::default()
    };

    let mut actions = Vec::new();
    FormFiller::new(RequiredFieldPolicy::Fail, Duration::ZERO)
        .with_cover_letters(writer.clone())
        .fill_step(&session, &dialog, &profile, &candidate(&session, card), &mut actions, 0)
        .await
        .unwrap();

    assert_eq!(browser.fill_of(area), None);
    assert!(writer.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn next_click_reports_more_steps() {
    let browser = FakeBrowser::new();
    let (card, dialog) = open_dialog(&browser);
    let next = browser.add_role(Some(dialog), Role::NextButton, 2, "");
    let session = session(&browser);

    let mut actions = Vec::new();
    let outcome = FormFiller::new(RequiredFieldPolicy::Fail, Duration::ZERO)
        .fill_step(&session, &dialog, &UserProfile::default(), &candidate(&session, card), &mut actions, 4)
        .await
        .unwrap();

    assert_eq!(outcome, StepOutcome::MoreSteps);
    assert_eq!(browser.clicks_on(next), 1);
    assert_eq!(actions, vec![FillAction::Next { step: 4 }]);
}

#[tokio::test]
async fn chosen_select_value_satisfies_required_field() {
    let browser = FakeBrowser::new();
    let (card, dialog) = open_dialog(&browser);
    let select = browser.add(Some(dialog), vec![loc(Role::RequiredField, 1)], "");
    browser.set_prop(select, "value", "Select an option");
    browser.set_attr(select, "name", "workAuthorization");
    let session = session(&browser);

    let mut actions = Vec::new();
    let outcome = FormFiller::new(RequiredFieldPolicy::Fail, Duration::ZERO)
        .fill_step(&session, &dialog, &UserProfile::default(), &candidate(&session, card), &mut actions, 0)
        .await
        .unwrap();
    assert_eq!(outcome, StepOutcome::Blocked("workAuthorization".into()));

    browser.set_prop(select, "value", "Yes");
    let outcome = FormFiller::new(RequiredFieldPolicy::Fail, Duration::ZERO)
        .fill_step(&session, &dialog, &UserProfile::default(), &candidate(&session, card), &mut actions, 0)
        .await
        .unwrap();
    assert_eq!(outcome, StepOutcome::ReadyToSubmit);
}

#[tokio::test]
async fn heuristic_picks_shortest_long_enough_block() {
    let browser = FakeBrowser::new();
    let long = format!("Responsibilities {}", "ship code ".repeat(40));
    let medium = format!("Responsibilities {}", "own services ".repeat(11));
    browser.add_role(None, Role::DescriptionHeuristic, 1, "Responsibilities: short");
    browser.add_role(None, Role::DescriptionHeuristic, 1, &long);
    browser.add_role(None, Role::DescriptionHeuristic, 1, &medium);
    let session = session(&browser);

    let text = extract_description(session.browser(), &session.resolver()).await;

    assert_eq!(text, medium.trim());
    assert!(text.chars().count() > 100);
}

#[tokio::test]
async fn heuristic_recovers_block_with_collapsed_whitespace() {
    let browser = FakeBrowser::new();
    let raw = "Responsibilities:\n\n  design and operate batch and  streaming data pipelines,\n\t review schema changes,\n   mentor two junior engineers and keep dashboards honest";
    browser.add_role(None, Role::DescriptionHeuristic, 1, raw);
    let session = session(&browser);

    let text = extract_description(session.browser(), &session.resolver()).await;

    let expected = "Responsibilities: design and operate batch and streaming data pipelines, review schema changes, mentor two junior engineers and keep dashboards honest";
    assert_eq!(expected.chars().count(), 150);
    assert_eq!(text, expected);
}

#[tokio::test]
async fn heuristic_rejects_block_at_the_length_threshold() {
    let browser = FakeBrowser::new();
    let block = format!("Responsibilities {}", "x".repeat(83));
    assert_eq!(block.chars().count(), 100);
    browser.add_role(None, Role::DescriptionHeuristic, 1, &block);
    let session = session(&browser);

    assert_eq!(extract_description(session.browser(), &session.resolver()).await, "");
}

#[tokio::test]
async fn description_is_empty_when_nothing_matches() {
    let browser = FakeBrowser::new();
    browser.add_role(None, Role::DescriptionHeuristic, 0, "Requirements: none");
    let session = session(&browser);

    assert_eq!(extract_description(session.browser(), &session.resolver()).await, "");
}
