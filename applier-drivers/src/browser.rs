use crate::error::Result;
use crate::locator::Locator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

/// Event captured inside the page by the diagnostics hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    Console { level: String, text: String },
    PageError { message: String },
    Resource { url: String, initiator: String },
}

/// The automation capability the pipeline is written against.
///
/// Element handles are opaque and only valid for the page view that
/// produced them. Operations on a handle whose node has left the DOM fail
/// with [`crate::DriverError::StaleElement`].
#[async_trait]
pub trait Browser: Send + Sync {
    type Element: Clone + Debug + Send + Sync;

    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// All elements matching `locator`, searched under `scope` when given.
    /// No match is an empty list, never an error.
    async fn find_all(
        &self,
        scope: Option<&Self::Element>,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>>;

    async fn text(&self, element: &Self::Element) -> Result<String>;

    async fn attr(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    async fn prop(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    async fn is_displayed(&self, element: &Self::Element) -> Result<bool>;

    async fn is_enabled(&self, element: &Self::Element) -> Result<bool>;

    /// Whether the node behind the handle is still part of the document.
    async fn is_attached(&self, element: &Self::Element) -> Result<bool>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// Replace the element's value with `text`.
    async fn fill(&self, element: &Self::Element, text: &str) -> Result<()>;

    async fn set_file(&self, element: &Self::Element, path: &Path) -> Result<()>;

    /// Wait until network activity settles. `Ok(false)` means the timeout
    /// elapsed first.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<bool>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Events captured since the previous call.
    async fn drain_diagnostics(&self) -> Result<Vec<DiagnosticEvent>> {
        Ok(Vec::new())
    }

    async fn close(&self) -> Result<()>;
}
