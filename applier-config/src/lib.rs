//! Loader for the applier configuration with YAML + environment overlays.
//!
//! Sources merge in this order, later ones winning:
//!
//! 1. the YAML file (optional unless added with [`SettingsLoader::with_file`]),
//! 2. `APPLIER__SECTION__KEY` environment variables,
//! 3. the legacy variables listed in [`LEGACY_ENV_VARS`],
//! 4. explicit overrides (CLI flags) via [`SettingsLoader::with_override`].
//!
//! `${VAR}` placeholders in string values are expanded afterwards. The
//! result is a read-only [`Settings`] accessor with dotted-path lookup and
//! a typed [`AppConfig`] view.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

mod sections;

pub use sections::{
    AppConfig, ApplicationSection, BrowserSection, LinkedInSection, LlmSection, PacingSection,
    RequiredFields, SearchSection, SelectorOverride, UserProfileSection, RESERVED_FILTER_KEYS,
};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// How a legacy variable's raw text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKind {
    Text,
    Bool,
    Int,
}

/// Environment variables honoured for compatibility, with the config key
/// each one lands on.
pub const LEGACY_ENV_VARS: &[(&str, &str, EnvKind)] = &[
    ("LINKEDIN_EMAIL", "linkedin.email", EnvKind::Text),
    ("LINKEDIN_PASSWORD", "linkedin.password", EnvKind::Text),
    ("LINKEDIN_KEYWORDS", "search.keywords", EnvKind::Text),
    ("LINKEDIN_LOCATION", "search.location", EnvKind::Text),
    ("LINKEDIN_MAX_APPS", "search.max_applications", EnvKind::Int),
    ("OPENAI_API_KEY", "llm.api_key", EnvKind::Text),
    ("LLM_ENABLED", "llm.enabled", EnvKind::Bool),
    ("USER_FULLNAME", "user_profile.full_name", EnvKind::Text),
    ("USER_PHONE", "user_profile.phone", EnvKind::Text),
    ("USER_RESUME", "user_profile.resume_path", EnvKind::Text),
];

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

fn parse_legacy(raw: &str, kind: EnvKind) -> Result<config::Value, ConfigError> {
    let bad = |expected: &str| {
        ConfigError::Message(format!("expected {expected} in environment value `{raw}`"))
    };
    Ok(match kind {
        EnvKind::Text => config::Value::from(raw.to_string()),
        EnvKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => config::Value::from(true),
            "false" | "0" | "no" => config::Value::from(false),
            _ => return Err(bad("a boolean")),
        },
        EnvKind::Int => config::Value::from(raw.trim().parse::<i64>().map_err(|_| bad("an integer"))?),
    })
}

/// Builder hiding the `config` crate wiring.
pub struct SettingsLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    overrides: Vec<(String, config::Value)>,
    legacy_env: bool,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Start with `APPLIER__` environment overrides and legacy variables enabled.
    ///
    /// ```
    /// use applier_config::SettingsLoader;
    ///
    /// let settings = SettingsLoader::new()
    ///     .without_legacy_env()
    ///     .with_yaml_str("search:\n  keywords: data engineer\n")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(settings.get_or("search.keywords", String::new()), "data engineer");
    /// assert_eq!(settings.get_or("search.max_applications", 10u32), 10);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            overrides: Vec::new(),
            legacy_env: true,
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so deployments can rely purely on
    /// environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Force `key` to `value` regardless of every other source.
    pub fn with_override(mut self, key: &str, value: impl Into<config::Value>) -> Self {
        self.overrides.push((key.to_string(), value.into()));
        self
    }

    /// Ignore [`LEGACY_ENV_VARS`]; used by tests that must not see the host env.
    pub fn without_legacy_env(mut self) -> Self {
        self.legacy_env = false;
        self
    }

    /// Consume the builder, merge every source and expand `${VAR}` placeholders.
    ///
    /// ```
    /// use applier_config::SettingsLoader;
    ///
    /// unsafe { std::env::set_var("APPLIER_DOC_SECRET", "injected-from-env"); }
    ///
    /// let cfg = SettingsLoader::new()
    ///     .without_legacy_env()
    ///     .with_yaml_str("linkedin:\n  email: me@example.com\n  password: \"${APPLIER_DOC_SECRET}\"\n")
    ///     .load()
    ///     .and_then(|s| s.typed())
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(cfg.linkedin.password, "injected-from-env");
    /// assert_eq!(cfg.search.location, "Remote");
    ///
    /// unsafe { std::env::remove_var("APPLIER_DOC_SECRET"); }
    /// ```
    pub fn load(self) -> Result<Settings, ConfigError> {
        let mut builder = self.builder.add_source(
            Environment::with_prefix("APPLIER")
                .separator("__")
                .try_parsing(true),
        );

        if self.legacy_env {
            for (var, key, kind) in LEGACY_ENV_VARS {
                if let Ok(raw) = std::env::var(var) {
                    builder = builder.set_override(*key, parse_legacy(&raw, *kind)?)?;
                }
            }
        }
        for (key, value) in self.overrides {
            builder = builder.set_override(key, value)?;
        }

        let cfg = builder.build()?;
        let mut root: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut root);

        Ok(Settings { root })
    }
}

/// Read-only view of the merged configuration document.
#[derive(Debug, Clone)]
pub struct Settings {
    root: Value,
}

impl Settings {
    /// Look up a dotted path such as `search.max_applications`.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let node = path
            .split('.')
            .try_fold(&self.root, |node, segment| node.get(segment))?;
        serde_json::from_value(node.clone()).ok()
    }

    /// [`Settings::get`] with a fallback for missing or mistyped values.
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    /// Deserialize the whole document into strongly typed sections.
    pub fn typed(&self) -> Result<AppConfig, ConfigError> {
        serde_json::from_value(self.root.clone()).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
