//! Strongly typed view of the merged configuration.
//!
//! Every section defaults field by field, so a file only needs to name
//! what it changes.
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Query parameters the search URL builder owns; user filters may not set them.
pub const RESERVED_FILTER_KEYS: [&str; 3] = ["currentJobId", "miniJob", "pageNum"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub linkedin: LinkedInSection,
    pub search: SearchSection,
    pub llm: LlmSection,
    pub user_profile: UserProfileSection,
    pub browser: BrowserSection,
    pub pacing: PacingSection,
    pub application: ApplicationSection,
    /// Per-role replacement selector chains, keyed by role name
    /// (`submit_button`, `easy_apply_button`, ...).
    pub selectors: BTreeMap<String, Vec<SelectorOverride>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkedInSection {
    pub email: String,
    pub password: String,
    pub login_url: String,
    pub search_url: String,
}

impl Default for LinkedInSection {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            login_url: "https://www.linkedin.com/login".into(),
            search_url: "https://www.linkedin.com/jobs/search/".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub keywords: String,
    pub location: String,
    pub max_applications: u32,
    /// Extra query parameters appended verbatim to the search URL.
    pub filters: BTreeMap<String, Value>,
    #[serde(deserialize_with = "scalar_strings")]
    pub experience_levels: Vec<String>,
    #[serde(deserialize_with = "scalar_strings")]
    pub job_types: Vec<String>,
    pub date_posted: Option<String>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            location: "Remote".into(),
            max_applications: 10,
            filters: BTreeMap::new(),
            experience_levels: Vec::new(),
            job_types: Vec::new(),
            date_posted: None,
        }
    }
}

impl SearchSection {
    /// Filters rendered as query pairs. Null, `false` and empty values are
    /// dropped, as are the keys in [`RESERVED_FILTER_KEYS`].
    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .filter(|(key, _)| !RESERVED_FILTER_KEYS.contains(&key.as_str()))
            .filter_map(|(key, value)| {
                let rendered = match value {
                    Value::Null | Value::Bool(false) => return None,
                    Value::String(s) if s.is_empty() => return None,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((key.clone(), rendered))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: "gpt-4o-mini".into(),
            base_url: None,
            max_output_tokens: 250,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserProfileSection {
    pub full_name: String,
    pub phone: String,
    pub resume_path: Option<PathBuf>,
    pub summary: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub webdriver_url: String,
    pub headless: bool,
    pub screenshots: bool,
    pub screenshot_dir: PathBuf,
    pub navigation_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub network_idle_timeout_ms: u64,
    pub stabilization_ms: u64,
    pub modal_timeout_ms: u64,
    pub auth_timeout_ms: u64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: false,
            screenshots: true,
            screenshot_dir: PathBuf::from("screenshots"),
            navigation_timeout_ms: 60_000,
            probe_timeout_ms: 1_500,
            network_idle_timeout_ms: 5_000,
            stabilization_ms: 2_000,
            modal_timeout_ms: 8_000,
            auth_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingSection {
    pub between_applications_min_secs: u64,
    pub between_applications_max_secs: u64,
    pub action_delay_min_ms: u64,
    pub action_delay_max_ms: u64,
    pub typing_delay_min_ms: u64,
    pub typing_delay_max_ms: u64,
    pub step_pause_ms: u64,
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            between_applications_min_secs: 10,
            between_applications_max_secs: 30,
            action_delay_min_ms: 1_000,
            action_delay_max_ms: 2_000,
            typing_delay_min_ms: 30,
            typing_delay_max_ms: 150,
            step_pause_ms: 1_000,
        }
    }
}

/// What to do when an application step shows a required field nobody fills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredFields {
    #[default]
    Fail,
    ClickThrough,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApplicationSection {
    pub dry_run: bool,
    pub max_steps: u32,
    pub required_fields: RequiredFields,
}

impl Default for ApplicationSection {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_steps: 12,
            required_fields: RequiredFields::Fail,
        }
    }
}

/// One replacement descriptor: exactly one of `css`/`xpath`, plus an
/// optional text the element must contain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectorOverride {
    pub css: Option<String>,
    pub xpath: Option<String>,
    pub text: Option<String>,
}

impl AppConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let fail = |msg: String| Err(config::ConfigError::Message(msg));

        if self.linkedin.email.trim().is_empty() || self.linkedin.password.is_empty() {
            return fail("linkedin.email and linkedin.password are required".into());
        }
        if self.llm.enabled && self.llm.api_key.as_deref().map_or(true, str::is_empty) {
            return fail("llm.enabled requires llm.api_key".into());
        }
        let p = &self.pacing;
        if p.between_applications_min_secs > p.between_applications_max_secs
            || p.action_delay_min_ms > p.action_delay_max_ms
            || p.typing_delay_min_ms > p.typing_delay_max_ms
        {
            return fail("pacing ranges must have min <= max".into());
        }
        for (role, chain) in &self.selectors {
            for entry in chain {
                if entry.css.is_some() == entry.xpath.is_some() {
                    return fail(format!(
                        "selectors.{role}: each entry needs exactly one of `css` or `xpath`"
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Accept `[2, "3", "mid-senior"]` style lists, rendering numbers as text.
fn scalar_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "expected string or number, got {other}"
            ))),
        })
        .collect()
}
