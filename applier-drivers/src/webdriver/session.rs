use super::scripts;
use crate::behavioral::BehavioralEngine;
use crate::browser::{Browser, DiagnosticEvent};
use crate::error::{DriverError, Result};
use crate::identity::{launch_arguments, IdentityPool, IdentityProfile};
use crate::locator::Locator;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use webdriver::capabilities::Capabilities;

const NETWORK_POLL: Duration = Duration::from_millis(250);
const QUIET_POLLS: u32 = 2;

#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    /// Default: `http://localhost:9515` (Chromedriver).
    pub webdriver_url: String,
    pub headless: bool,
    pub navigation_timeout: Duration,
    pub behavioral: BehavioralEngine,
}

impl Default for WebDriverOptions {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            navigation_timeout: Duration::from_secs(60),
            behavioral: BehavioralEngine::new(),
        }
    }
}

/// WebDriver session driving a Chromium browser.
pub struct WebDriverBrowser {
    client: Client,
    behavioral: BehavioralEngine,
    identity: IdentityProfile,
}

#[derive(Deserialize)]
struct NetworkSnapshot {
    ready: bool,
    resources: u64,
}

impl WebDriverBrowser {
    /// Connect to a running WebDriver service and open a new session.
    pub async fn connect(opts: WebDriverOptions) -> Result<Self> {
        let identity = IdentityPool::new().choose();

        let mut caps = Capabilities::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": launch_arguments(&identity, opts.headless) }),
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&opts.webdriver_url)
            .await
            .map_err(|e| DriverError::Session(format!("{}: {e}", opts.webdriver_url)))?;

        client
            .update_timeouts(TimeoutConfiguration::new(
                Some(Duration::from_secs(30)),
                Some(opts.navigation_timeout),
                Some(Duration::ZERO),
            ))
            .await
            .map_err(map_cmd)?;
        let (width, height) = identity.viewport;
        client.set_window_size(width, height).await.map_err(map_cmd)?;

        tracing::info!(
            target: "applier.browser",
            webdriver = %opts.webdriver_url,
            headless = opts.headless,
            user_agent = %identity.user_agent,
            "webdriver session opened"
        );

        Ok(Self {
            client,
            behavioral: opts.behavioral,
            identity,
        })
    }

    pub fn identity(&self) -> &IdentityProfile {
        &self.identity
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.client.execute(script, args).await.map_err(map_cmd)
    }
}

fn map_cmd(e: CmdError) -> DriverError {
    if e.is_no_such_element() {
        DriverError::NoSuchElement(e.to_string())
    } else if e.is_stale_element_reference() {
        DriverError::StaleElement
    } else if e.is_javascript_error() {
        DriverError::Script(e.to_string())
    } else if matches!(e, CmdError::WaitTimeout) {
        DriverError::Timeout(0)
    } else {
        DriverError::Session(e.to_string())
    }
}

fn element_arg(element: &Element) -> Result<Value> {
    serde_json::to_value(element).map_err(|e| DriverError::Script(e.to_string()))
}

fn to_fantoccini(locator: &Locator) -> fantoccini::Locator<'_> {
    match locator {
        Locator::Css(s) => fantoccini::Locator::Css(s),
        Locator::XPath(s) => fantoccini::Locator::XPath(s),
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    type Element = Element;

    async fn goto(&self, url: &str) -> Result<()> {
        self.client.goto(url).await.map_err(map_cmd)?;
        if let Err(e) = self.execute(scripts::INSTALL_DIAGNOSTICS_HOOK, vec![]).await {
            tracing::debug!(target: "applier.browser", error = %e, "diagnostics hook not installed");
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(map_cmd)
    }

    async fn find_all(&self, scope: Option<&Element>, locator: &Locator) -> Result<Vec<Element>> {
        let found = match scope {
            Some(el) => el.find_all(to_fantoccini(locator)).await,
            None => self.client.find_all(to_fantoccini(locator)).await,
        };
        match found {
            Ok(elements) => Ok(elements),
            Err(e) if e.is_no_such_element() => Ok(Vec::new()),
            Err(e) => Err(map_cmd(e)),
        }
    }

    async fn text(&self, element: &Element) -> Result<String> {
        element.text().await.map_err(map_cmd)
    }

    async fn attr(&self, element: &Element, name: &str) -> Result<Option<String>> {
        element.attr(name).await.map_err(map_cmd)
    }

    async fn prop(&self, element: &Element, name: &str) -> Result<Option<String>> {
        element.prop(name).await.map_err(map_cmd)
    }

    async fn is_displayed(&self, element: &Element) -> Result<bool> {
        element.is_displayed().await.map_err(map_cmd)
    }

    async fn is_enabled(&self, element: &Element) -> Result<bool> {
        element.is_enabled().await.map_err(map_cmd)
    }

    async fn is_attached(&self, element: &Element) -> Result<bool> {
        match self
            .execute(scripts::IS_CONNECTED, vec![element_arg(element)?])
            .await
        {
            Ok(v) => Ok(v.as_bool().unwrap_or(false)),
            Err(DriverError::StaleElement) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element.click().await.map_err(map_cmd)
    }

    async fn fill(&self, element: &Element, text: &str) -> Result<()> {
        element.clear().await.map_err(map_cmd)?;
        for (ch, delay) in text.chars().zip(self.behavioral.keystroke_delays(text)) {
            element
                .send_keys(&ch.to_string())
                .await
                .map_err(map_cmd)?;
            sleep(delay).await;
        }
        Ok(())
    }

    async fn set_file(&self, element: &Element, path: &Path) -> Result<()> {
        let absolute = std::fs::canonicalize(path)?;
        element
            .send_keys(&absolute.to_string_lossy())
            .await
            .map_err(map_cmd)
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<bool> {
        let started = Instant::now();
        let mut last = None;
        let mut quiet = 0;

        while started.elapsed() < timeout {
            let snapshot: NetworkSnapshot =
                serde_json::from_value(self.execute(scripts::NETWORK_SNAPSHOT, vec![]).await?)
                    .map_err(|e| DriverError::Script(e.to_string()))?;

            if snapshot.ready && last == Some(snapshot.resources) {
                quiet += 1;
                if quiet >= QUIET_POLLS {
                    return Ok(true);
                }
            } else {
                quiet = 0;
            }
            last = Some(snapshot.resources);
            sleep(NETWORK_POLL).await;
        }
        Ok(false)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.client.screenshot().await.map_err(map_cmd)
    }

    async fn drain_diagnostics(&self) -> Result<Vec<DiagnosticEvent>> {
        let raw = self.execute(scripts::DRAIN_DIAGNOSTICS, vec![]).await?;
        let events = match raw {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        };
        Ok(events)
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().close().await.map_err(map_cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fantoccini::error::{ErrorStatus, WebDriver};

    fn standard(status: ErrorStatus) -> CmdError {
        CmdError::Standard(WebDriver::new(status, "from driver"))
    }

    #[test]
    fn webdriver_statuses_map_to_driver_errors() {
        assert!(matches!(
            map_cmd(standard(ErrorStatus::NoSuchElement)),
            DriverError::NoSuchElement(_)
        ));
        assert!(matches!(
            map_cmd(standard(ErrorStatus::StaleElementReference)),
            DriverError::StaleElement
        ));
        assert!(matches!(
            map_cmd(standard(ErrorStatus::JavascriptError)),
            DriverError::Script(_)
        ));
        assert!(matches!(map_cmd(CmdError::WaitTimeout), DriverError::Timeout(_)));
        assert!(matches!(
            map_cmd(standard(ErrorStatus::InvalidSessionId)),
            DriverError::Session(_)
        ));
    }
}
