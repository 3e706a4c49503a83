//! Browser-automation boundary for the applier.
//!
//! - [`browser::Browser`]: the capability the pipeline drives, generic over
//!   the element handle type
//! - [`locator::Descriptor`]: structural locator plus optional text filter
//! - [`webdriver::WebDriverBrowser`]: fantoccini-backed implementation
//! - [`behavioral::BehavioralEngine`]: randomized pauses and human-like typing
//! - [`identity`]: user-agent/viewport profiles and launch arguments
pub mod behavioral;
pub mod browser;
pub mod error;
pub mod identity;
pub mod locator;
pub mod webdriver;

pub use browser::{Browser, DiagnosticEvent};
pub use error::{DriverError, Result};
pub use locator::{Descriptor, Locator};
