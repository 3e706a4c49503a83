//! The browsing session every other component queries and mutates.
use crate::selectors::{Role, SelectorRegistry, SelectorResolver};
use applier_common::ApplierError;
use applier_drivers::behavioral::BehavioralEngine;
use applier_drivers::{Browser, DiagnosticEvent, DriverError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::Instrument;

#[derive(Debug, Clone, Copy)]
pub struct SessionTimeouts {
    pub navigation: Duration,
    /// Per-descriptor bound for ordinary lookups.
    pub probe: Duration,
    pub network_idle: Duration,
    /// Fixed pause after network idle for client-side layout to finish.
    pub stabilization: Duration,
    pub modal: Duration,
    pub auth: Duration,
    /// Bound on waiting for the results list container.
    pub results: Duration,
    pub submit_idle: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(60),
            probe: Duration::from_millis(1_500),
            network_idle: Duration::from_secs(5),
            stabilization: Duration::from_secs(2),
            modal: Duration::from_secs(8),
            auth: Duration::from_secs(10),
            results: Duration::from_secs(10),
            submit_idle: Duration::from_secs(10),
        }
    }
}

impl SessionTimeouts {
    /// All bounds zero; every wait becomes a single look.
    pub fn immediate() -> Self {
        Self {
            navigation: Duration::ZERO,
            probe: Duration::ZERO,
            network_idle: Duration::ZERO,
            stabilization: Duration::ZERO,
            modal: Duration::ZERO,
            auth: Duration::ZERO,
            results: Duration::ZERO,
            submit_idle: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub login_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    NotStarted,
    CredentialsSubmitted,
    Authenticated { indicator: String },
    Failed { reason: String },
}

pub struct SessionContext<B: Browser> {
    browser: B,
    registry: SelectorRegistry,
    timeouts: SessionTimeouts,
    behavioral: BehavioralEngine,
    /// Randomized pause between small UI actions, in milliseconds.
    action_delay_ms: (u64, u64),
    screenshot_dir: Option<PathBuf>,
    generation: AtomicU64,
    auth: AuthState,
}

impl<B: Browser> SessionContext<B> {
    pub fn new(browser: B, registry: SelectorRegistry, timeouts: SessionTimeouts) -> Self {
        Self {
            browser,
            registry,
            timeouts,
            behavioral: BehavioralEngine::new(),
            action_delay_ms: (0, 0),
            screenshot_dir: None,
            generation: AtomicU64::new(0),
            auth: AuthState::NotStarted,
        }
    }

    pub fn with_screenshots(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    pub fn with_action_delay(mut self, behavioral: BehavioralEngine, min_ms: u64, max_ms: u64) -> Self {
        self.behavioral = behavioral;
        self.action_delay_ms = (min_ms, max_ms);
        self
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn timeouts(&self) -> &SessionTimeouts {
        &self.timeouts
    }

    pub fn behavioral(&self) -> &BehavioralEngine {
        &self.behavioral
    }

    pub fn resolver(&self) -> SelectorResolver<'_, B> {
        SelectorResolver::new(&self.browser, &self.registry, self.timeouts.probe)
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    /// Identifier of the current page view. Element handles captured under
    /// an older generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Mark every outstanding element handle stale; called whenever the page
    /// is replaced (navigation, pagination).
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        tracing::debug!(target: "applier.session", %url, "navigate");
        self.invalidate();
        self.browser.goto(url).await?;
        self.route_diagnostics().await;
        Ok(())
    }

    /// `false` when the timeout elapsed first; a driver fault counts as not idle.
    pub async fn wait_for_network_idle(&self, timeout: Duration) -> bool {
        match self.browser.wait_for_network_idle(timeout).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(
                    target: "applier.session",
                    timeout_ms = timeout.as_millis() as u64,
                    "network did not go idle"
                );
                false
            }
            Err(e) => {
                tracing::warn!(target: "applier.session", error = %e, "network idle wait failed");
                false
            }
        }
    }

    /// Network idle followed by the stabilization pause.
    pub async fn settle(&self) {
        self.wait_for_network_idle(self.timeouts.network_idle).await;
        self.behavioral.pause(self.timeouts.stabilization).await;
    }

    pub async fn human_pause(&self) {
        let (min, max) = self.action_delay_ms;
        self.behavioral.random_delay(min, max).await;
    }

    /// Best-effort PNG capture to `<dir>/<label>_<timestamp>.png`. Failures
    /// are logged and swallowed.
    pub async fn snapshot_screenshot(&self, label: &str) -> Option<PathBuf> {
        let dir = self.screenshot_dir.as_ref()?;
        let bytes = match self.browser.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(target: "applier.session", %label, error = %e, "screenshot capture failed");
                return None;
            }
        };
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S%3f");
        let path = dir.join(format!("{label}_{stamp}.png"));
        match write_png(dir, &path, &bytes).await {
            Ok(()) => {
                tracing::debug!(target: "applier.session", path = %path.display(), "screenshot saved");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(target: "applier.session", %label, error = %e, "screenshot write failed");
                None
            }
        }
    }

    /// Forward captured browser events to the log. Never fails.
    pub async fn route_diagnostics(&self) {
        let events = match self.browser.drain_diagnostics().await {
            Ok(events) => events,
            Err(e) => {
                tracing::trace!(target: "applier.browser", error = %e, "diagnostics drain failed");
                return;
            }
        };
        for event in events {
            match event {
                DiagnosticEvent::Console { level, text } if level == "error" => {
                    tracing::debug!(target: "applier.browser", console = %level, %text, "console");
                }
                DiagnosticEvent::Console { level, text } => {
                    tracing::trace!(target: "applier.browser", console = %level, %text, "console");
                }
                DiagnosticEvent::PageError { message } => {
                    tracing::debug!(target: "applier.browser", %message, "page error");
                }
                DiagnosticEvent::Resource { url, initiator } => {
                    tracing::trace!(target: "applier.browser", %url, %initiator, "resource");
                }
            }
        }
    }

    /// Log in and wait for any post-login indicator.
    ///
    /// `Err` means the run cannot continue; the failure screenshot has
    /// already been attempted.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), ApplierError> {
        let span = tracing::info_span!("authenticate", component = "session");
        async {
            self.auth = AuthState::NotStarted;
            match self.submit_credentials(credentials).await {
                Ok(()) => self.auth = AuthState::CredentialsSubmitted,
                Err(reason) => return Err(self.fail_auth(reason).await),
            }

            let indicator = self
                .resolver()
                .first_to_appear(None, Role::AuthIndicator, self.timeouts.auth)
                .await;
            match indicator {
                Ok(found) => match found.found() {
                    Some(hit) => {
                        let indicator = hit.descriptor.to_string();
                        tracing::info!(target: "applier.session", %indicator, "authenticated");
                        self.auth = AuthState::Authenticated { indicator };
                        Ok(())
                    }
                    None => Err(self
                        .fail_auth("no post-login indicator appeared".to_string())
                        .await),
                },
                Err(e) => Err(self.fail_auth(e.to_string()).await),
            }
        }
        .instrument(span)
        .await
    }

    async fn submit_credentials(&self, credentials: &Credentials) -> Result<(), String> {
        self.navigate(&credentials.login_url)
            .await
            .map_err(|e| format!("login page unreachable: {e}"))?;

        let resolver = self.resolver();
        let fields = [
            (Role::LoginUsername, credentials.email.as_str()),
            (Role::LoginPassword, credentials.password.as_str()),
        ];
        for (role, value) in fields {
            let field = resolver
                .resolve_within(None, role, self.timeouts.results)
                .await
                .map_err(|e| e.to_string())?
                .into_element()
                .ok_or_else(|| format!("{role} not found"))?;
            self.browser
                .fill(&field, value)
                .await
                .map_err(|e| e.to_string())?;
            self.human_pause().await;
        }

        let submit = resolver
            .resolve(None, Role::LoginSubmit)
            .await
            .map_err(|e| e.to_string())?
            .into_element()
            .ok_or_else(|| format!("{} not found", Role::LoginSubmit))?;
        self.browser.click(&submit).await.map_err(|e| e.to_string())?;
        self.invalidate();
        Ok(())
    }

    async fn fail_auth(&mut self, reason: String) -> ApplierError {
        tracing::error!(target: "applier.session", %reason, "authentication failed");
        self.snapshot_screenshot("login_error").await;
        self.auth = AuthState::Failed {
            reason: reason.clone(),
        };
        ApplierError::Authentication(reason)
    }

    /// Release the browser. Errors are logged; the session is gone either way.
    pub async fn close(self) {
        match self.browser.close().await {
            Ok(()) => tracing::info!(target: "applier.session", "session closed"),
            Err(e) => tracing::warn!(target: "applier.session", error = %e, "session close failed"),
        }
    }
}

async fn write_png(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, bytes).await
}
