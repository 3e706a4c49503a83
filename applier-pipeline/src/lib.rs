//! The application pipeline.
//!
//! Data flows one way: [`orchestrator::Orchestrator`] →
//! [`collector::JobCollector`] → [`application::ApplicationStateMachine`]
//! → [`form::FormFiller`] → [`selectors::SelectorResolver`] →
//! [`session::SessionContext`]. Everything is generic over
//! [`applier_drivers::Browser`], so the same code drives a real WebDriver
//! session or an in-memory page.
//!
//! Per-candidate problems end up as an [`model::AttemptOutcome`]; only
//! failures that make the whole run pointless (login, search view) surface
//! as [`applier_common::ApplierError`].
pub mod application;
pub mod collector;
pub mod description;
pub mod form;
pub mod model;
pub mod orchestrator;
pub mod search;
pub mod selectors;
pub mod session;

pub use application::{ApplicationPolicy, ApplicationStateMachine};
pub use form::{FormFiller, RequiredFieldPolicy};
pub use orchestrator::{Orchestrator, RunConfig, RunSummary, StopReason};
pub use session::{Credentials, SessionContext, SessionTimeouts};
