//! Translation of the typed configuration into pipeline components.
use applier_common::ApplierError;
use applier_config::{AppConfig, BrowserSection, RequiredFields, SelectorOverride};
use applier_drivers::behavioral::BehavioralEngine;
use applier_drivers::webdriver::{WebDriverBrowser, WebDriverOptions};
use applier_drivers::{Browser, Descriptor};
use applier_llm::cover_letter::{CoverLetterGenerator, LlmCoverLetterWriter};
use applier_llm::openai::OpenAiClient;
use applier_pipeline::model::UserProfile;
use applier_pipeline::search::{DatePosted, SearchQuery};
use applier_pipeline::selectors::{Role, SelectorRegistry};
use applier_pipeline::{
    ApplicationPolicy, ApplicationStateMachine, Credentials, FormFiller, Orchestrator,
    RequiredFieldPolicy, RunConfig, SessionContext, SessionTimeouts,
};
use std::sync::Arc;
use std::time::Duration;

fn config_error(msg: impl Into<String>) -> ApplierError {
    ApplierError::Config(msg.into())
}

fn descriptor(entry: &SelectorOverride) -> Option<Descriptor> {
    let base = match (&entry.css, &entry.xpath) {
        (Some(css), None) => Descriptor::css(css.clone()),
        (None, Some(xpath)) => Descriptor::xpath(xpath.clone()),
        _ => return None,
    };
    Some(match &entry.text {
        Some(text) if !text.trim().is_empty() => base.with_text(text.clone()),
        _ => base,
    })
}

pub fn registry(cfg: &AppConfig) -> Result<SelectorRegistry, ApplierError> {
    let mut registry = SelectorRegistry::builtin();
    for (name, chain) in &cfg.selectors {
        let role = Role::from_name(name).ok_or_else(|| config_error(format!("selectors.{name}: unknown role")))?;
        let descriptors = chain
            .iter()
            .map(|entry| {
                descriptor(entry).ok_or_else(|| {
                    config_error(format!("selectors.{name}: each entry needs exactly one of `css` or `xpath`"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(target: "applier.app", %role, descriptors = descriptors.len(), "selector chain overridden");
        registry = registry.with_override(role, descriptors);
    }
    Ok(registry)
}

pub fn timeouts(browser: &BrowserSection) -> SessionTimeouts {
    let ms = Duration::from_millis;
    SessionTimeouts {
        navigation: ms(browser.navigation_timeout_ms),
        probe: ms(browser.probe_timeout_ms),
        network_idle: ms(browser.network_idle_timeout_ms),
        stabilization: ms(browser.stabilization_ms),
        modal: ms(browser.modal_timeout_ms),
        auth: ms(browser.auth_timeout_ms),
        ..SessionTimeouts::default()
    }
}

pub fn behavioral(cfg: &AppConfig) -> BehavioralEngine {
    BehavioralEngine::new().with_typing_delay(cfg.pacing.typing_delay_min_ms, cfg.pacing.typing_delay_max_ms)
}

pub fn webdriver_options(cfg: &AppConfig) -> WebDriverOptions {
    WebDriverOptions {
        webdriver_url: cfg.browser.webdriver_url.clone(),
        headless: cfg.browser.headless,
        navigation_timeout: Duration::from_millis(cfg.browser.navigation_timeout_ms),
        behavioral: behavioral(cfg),
    }
}

pub async fn connect(cfg: &AppConfig) -> Result<WebDriverBrowser, ApplierError> {
    WebDriverBrowser::connect(webdriver_options(cfg)).await.map_err(|e| {
        ApplierError::Driver(
            anyhow::Error::new(e).context(format!("connecting to WebDriver at {}", cfg.browser.webdriver_url)),
        )
    })
}

pub fn session<B: Browser>(cfg: &AppConfig, browser: B, registry: SelectorRegistry) -> SessionContext<B> {
    let session = SessionContext::new(browser, registry, timeouts(&cfg.browser)).with_action_delay(
        behavioral(cfg),
        cfg.pacing.action_delay_min_ms,
        cfg.pacing.action_delay_max_ms,
    );
    if cfg.browser.screenshots {
        session.with_screenshots(cfg.browser.screenshot_dir.clone())
    } else {
        session
    }
}

pub fn search_query(cfg: &AppConfig) -> Result<SearchQuery, ApplierError> {
    let search = &cfg.search;
    let mut query = SearchQuery::new(
        cfg.linkedin.search_url.clone(),
        search.keywords.clone(),
        search.location.clone(),
    );
    query.experience_levels = search.experience_levels.clone();
    query.job_types = search.job_types.clone();
    query.date_posted = match &search.date_posted {
        Some(raw) => raw
            .parse::<DatePosted>()
            .map_err(|e| config_error(format!("search.date_posted: {e}")))?,
        None => DatePosted::Any,
    };
    query.filters = search.filter_pairs();
    Ok(query)
}

pub fn user_profile(cfg: &AppConfig) -> UserProfile {
    let profile = &cfg.user_profile;
    UserProfile {
        full_name: profile.full_name.clone(),
        phone: profile.phone.trim().to_string(),
        resume_path: profile
            .resume_path
            .clone()
            .filter(|path| !path.as_os_str().is_empty()),
        summary: profile.summary.clone(),
        cover_letter: cfg.llm.enabled,
    }
}

pub fn cover_letters(cfg: &AppConfig) -> Result<Option<Arc<dyn CoverLetterGenerator>>, ApplierError> {
    let llm = &cfg.llm;
    if !llm.enabled {
        return Ok(None);
    }
    let api_key = llm
        .api_key
        .clone()
        .ok_or_else(|| config_error("llm.enabled requires llm.api_key"))?;
    let mut client = OpenAiClient::new(api_key, llm.model.clone()).map_err(|e| config_error(e.to_string()))?;
    if let Some(base_url) = &llm.base_url {
        client = client.with_base_url(base_url.clone());
    }
    let writer = LlmCoverLetterWriter::new(Arc::new(client), cfg.user_profile.full_name.clone())
        .with_sampling(llm.max_output_tokens, llm.temperature);
    Ok(Some(Arc::new(writer)))
}

pub fn orchestrator(cfg: &AppConfig) -> Result<Orchestrator, ApplierError> {
    let policy = match cfg.application.required_fields {
        RequiredFields::Fail => RequiredFieldPolicy::Fail,
        RequiredFields::ClickThrough => RequiredFieldPolicy::ClickThrough,
    };
    let mut filler = FormFiller::new(policy, Duration::from_millis(cfg.pacing.step_pause_ms));
    if let Some(generator) = cover_letters(cfg)? {
        filler = filler.with_cover_letters(generator);
    }
    let applications = ApplicationStateMachine::new(
        filler,
        ApplicationPolicy {
            dry_run: cfg.application.dry_run,
            max_steps: cfg.application.max_steps.max(1) as usize,
        },
    );

    let run = RunConfig {
        credentials: Credentials {
            email: cfg.linkedin.email.clone(),
            password: cfg.linkedin.password.clone(),
            login_url: cfg.linkedin.login_url.clone(),
        },
        query: search_query(cfg)?,
        profile: user_profile(cfg),
        max_applications: cfg.search.max_applications,
        between_applications_secs: (
            cfg.pacing.between_applications_min_secs,
            cfg.pacing.between_applications_max_secs,
        ),
    };
    Ok(Orchestrator::new(run, applications))
}
