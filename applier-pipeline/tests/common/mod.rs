#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use applier_common::observability::{LogConfig, LogFormat};
use applier_drivers::{Browser, DriverError, Locator, Result};
use applier_pipeline::selectors::{Role, SelectorRegistry};
use applier_pipeline::session::{SessionContext, SessionTimeouts};
use async_trait::async_trait;

static INIT_PATH: OnceLock<PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "applier-tests",
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "debug",
            log_dir: Some(std::env::temp_dir().join("applier-tests")),
            ..LogConfig::default()
        };

        applier_common::observability::init_logging(config).unwrap_or_default()
    });
}

pub type NodeId = usize;

/// Locator of the built-in descriptor at `rank` for `role`.
pub fn loc(role: Role, rank: usize) -> Locator {
    SelectorRegistry::builtin().spec(role).descriptors[rank]
        .locator
        .clone()
}

#[derive(Debug, Clone)]
pub enum Effect {
    Attach(NodeId),
    Detach(NodeId),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub matches: Vec<Locator>,
    /// Own text only; descendants are not concatenated.
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    pub attached: bool,
    pub attrs: HashMap<String, String>,
    pub props: HashMap<String, String>,
    pub on_click: Vec<Effect>,
}

#[derive(Debug, Default)]
pub struct Page {
    pub nodes: Vec<Node>,
    pub queries: Vec<String>,
    pub clicks: Vec<NodeId>,
    pub fills: Vec<(NodeId, String)>,
    pub files: Vec<(NodeId, PathBuf)>,
    pub visited: Vec<String>,
    pub screenshots: usize,
    pub fail_screenshots: bool,
    pub closed: bool,
}

impl Page {
    fn live(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get(current) else {
                return false;
            };
            if !node.attached {
                return false;
            }
            cursor = node.parent;
        }
        true
    }

    fn descends_from(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.nodes[id].parent;
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes[current].parent;
        }
        false
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        if self.live(id) {
            Ok(&self.nodes[id])
        } else {
            Err(DriverError::StaleElement)
        }
    }
}

/// Scripted in-memory page. Clones share the same page, so a test keeps a
/// handle while the session owns another.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    page: Arc<Mutex<Page>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> MutexGuard<'_, Page> {
        self.page.lock().unwrap()
    }

    pub fn add(&self, parent: Option<NodeId>, matches: Vec<Locator>, text: &str) -> NodeId {
        let mut page = self.page();
        page.nodes.push(Node {
            parent,
            matches,
            text: text.to_string(),
            visible: true,
            enabled: true,
            attached: true,
            attrs: HashMap::new(),
            props: HashMap::new(),
            on_click: Vec::new(),
        });
        page.nodes.len() - 1
    }

    /// Node matched by the built-in descriptor `rank` of `role`.
    pub fn add_role(&self, parent: Option<NodeId>, role: Role, rank: usize, text: &str) -> NodeId {
        self.add(parent, vec![loc(role, rank)], text)
    }

    pub fn set_attr(&self, id: NodeId, name: &str, value: &str) {
        self.page().nodes[id].attrs.insert(name.into(), value.into());
    }

    pub fn set_prop(&self, id: NodeId, name: &str, value: &str) {
        self.page().nodes[id].props.insert(name.into(), value.into());
    }

    pub fn set_attached(&self, id: NodeId, attached: bool) {
        self.page().nodes[id].attached = attached;
    }

    pub fn set_visible(&self, id: NodeId, visible: bool) {
        self.page().nodes[id].visible = visible;
    }

    pub fn on_click(&self, id: NodeId, effects: Vec<Effect>) {
        self.page().nodes[id].on_click.extend(effects);
    }

    pub fn clicks_on(&self, id: NodeId) -> usize {
        self.page().clicks.iter().filter(|c| **c == id).count()
    }

    pub fn fill_of(&self, id: NodeId) -> Option<String> {
        self.page()
            .fills
            .iter()
            .rev()
            .find(|(node, _)| *node == id)
            .map(|(_, text)| text.clone())
    }

    pub fn queried(&self, needle: &str) -> bool {
        self.page().queries.iter().any(|q| q.contains(needle))
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    type Element = NodeId;

    async fn goto(&self, url: &str) -> Result<()> {
        self.page().visited.push(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page().visited.last().cloned().unwrap_or_default())
    }

    async fn find_all(&self, scope: Option<&NodeId>, locator: &Locator) -> Result<Vec<NodeId>> {
        let mut page = self.page();
        page.queries.push(locator.to_string());
        if let Some(scope) = scope {
            page.node(*scope)?;
        }
        Ok((0..page.nodes.len())
            .filter(|id| page.live(*id))
            .filter(|id| page.nodes[*id].matches.contains(locator))
            .filter(|id| scope.map_or(true, |s| page.descends_from(*id, *s)))
            .collect())
    }

    async fn text(&self, element: &NodeId) -> Result<String> {
        Ok(self.page().node(*element)?.text.clone())
    }

    async fn attr(&self, element: &NodeId, name: &str) -> Result<Option<String>> {
        Ok(self.page().node(*element)?.attrs.get(name).cloned())
    }

    async fn prop(&self, element: &NodeId, name: &str) -> Result<Option<String>> {
        Ok(self.page().node(*element)?.props.get(name).cloned())
    }

    async fn is_displayed(&self, element: &NodeId) -> Result<bool> {
        Ok(self.page().node(*element)?.visible)
    }

    async fn is_enabled(&self, element: &NodeId) -> Result<bool> {
        Ok(self.page().node(*element)?.enabled)
    }

    async fn is_attached(&self, element: &NodeId) -> Result<bool> {
        Ok(self.page().live(*element))
    }

    async fn click(&self, element: &NodeId) -> Result<()> {
        let mut page = self.page();
        let effects = page.node(*element)?.on_click.clone();
        page.clicks.push(*element);
        for effect in effects {
            match effect {
                Effect::Attach(id) => page.nodes[id].attached = true,
                Effect::Detach(id) => page.nodes[id].attached = false,
            }
        }
        Ok(())
    }

    async fn fill(&self, element: &NodeId, text: &str) -> Result<()> {
        let mut page = self.page();
        page.node(*element)?;
        page.nodes[*element].props.insert("value".into(), text.into());
        page.fills.push((*element, text.to_string()));
        Ok(())
    }

    async fn set_file(&self, element: &NodeId, path: &Path) -> Result<()> {
        let mut page = self.page();
        page.node(*element)?;
        page.files.push((*element, path.to_path_buf()));
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let mut page = self.page();
        if page.fail_screenshots {
            return Err(DriverError::Session("screenshot unavailable".into()));
        }
        page.screenshots += 1;
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn close(&self) -> Result<()> {
        self.page().closed = true;
        Ok(())
    }
}

pub fn session(browser: &FakeBrowser) -> SessionContext<FakeBrowser> {
    init_test_tracing();
    SessionContext::new(
        browser.clone(),
        SelectorRegistry::builtin(),
        SessionTimeouts::immediate(),
    )
}

/// Node ids of a results page built by [`JobBoard::build`].
pub struct JobBoard {
    pub container: NodeId,
    pub cards: Vec<NodeId>,
    pub details: NodeId,
    pub details_apply: NodeId,
    pub modal: NodeId,
    pub phone: NodeId,
    pub submit: NodeId,
    pub dismiss: NodeId,
    pub discard: NodeId,
}

impl JobBoard {
    /// Login form, a results list with one card per `(title, company,
    /// easy_apply)` entry, a details panel and a one-step dialog that closes
    /// on submit.
    pub fn build(browser: &FakeBrowser, jobs: &[(&str, &str, bool)]) -> JobBoard {
        browser.add_role(None, Role::LoginUsername, 0, "");
        browser.add_role(None, Role::LoginPassword, 0, "");
        browser.add_role(None, Role::LoginSubmit, 0, "Sign in");
        browser.add_role(None, Role::AuthIndicator, 0, "");

        let container = browser.add_role(None, Role::ResultsContainer, 0, "");
        let cards = jobs
            .iter()
            .map(|(title, company, easy)| add_card(browser, container, title, company, *easy))
            .collect();

        let details = browser.add_role(None, Role::JobDetails, 0, "");
        let details_apply = browser.add_role(Some(details), Role::EasyApplyButton, 0, "Easy Apply");

        let modal = browser.add_role(None, Role::ApplyModal, 0, "");
        browser.set_attached(modal, false);
        let phone = browser.add_role(Some(modal), Role::PhoneInput, 0, "");
        let submit = browser.add_role(Some(modal), Role::SubmitButton, 0, "Submit application");
        let dismiss = browser.add_role(Some(modal), Role::DialogDismiss, 0, "");
        let discard = browser.add_role(None, Role::DiscardConfirm, 0, "Discard");
        browser.set_attached(discard, false);

        browser.on_click(details_apply, vec![Effect::Attach(modal)]);
        browser.on_click(submit, vec![Effect::Detach(modal)]);
        browser.on_click(dismiss, vec![Effect::Attach(discard)]);
        browser.on_click(discard, vec![Effect::Detach(discard), Effect::Detach(modal)]);

        JobBoard {
            container,
            cards,
            details,
            details_apply,
            modal,
            phone,
            submit,
            dismiss,
            discard,
        }
    }
}

pub fn add_card(browser: &FakeBrowser, container: NodeId, title: &str, company: &str, easy_apply: bool) -> NodeId {
    let card = browser.add_role(Some(container), Role::JobCard, 0, "");
    browser.add_role(Some(card), Role::CardTitle, 0, title);
    browser.add_role(Some(card), Role::CardCompany, 0, company);
    browser.add_role(Some(card), Role::CardLocation, 0, "Remote");
    let label = if easy_apply { "Easy Apply" } else { "Apply on company site" };
    browser.add_role(Some(card), Role::EasyApplyButton, 0, label);
    card
}
