use applier_config::SettingsLoader;
use clap::Parser;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(name = "jobs-applier", version, about = "Apply to simplified-apply job postings")]
pub struct Cli {
    /// Configuration file; `config.yaml` is read when present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub keywords: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub max_applications: Option<u32>,

    /// Walk every dialog but never press submit.
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long)]
    pub headless: bool,

    #[arg(long, env = "APPLIER_WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Emit JSON log lines instead of text.
    #[arg(long)]
    pub log_json: bool,

    /// Mirror logs to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Config sources, with flags layered over everything else.
    pub fn loader(&self) -> SettingsLoader {
        let mut loader = match &self.config {
            Some(path) => SettingsLoader::new().with_file(path),
            None => SettingsLoader::new().with_optional_file(DEFAULT_CONFIG),
        };
        if let Some(keywords) = &self.keywords {
            loader = loader.with_override("search.keywords", keywords.clone());
        }
        if let Some(location) = &self.location {
            loader = loader.with_override("search.location", location.clone());
        }
        if let Some(max) = self.max_applications {
            loader = loader.with_override("search.max_applications", i64::from(max));
        }
        if self.dry_run {
            loader = loader.with_override("application.dry_run", true);
        }
        if self.headless {
            loader = loader.with_override("browser.headless", true);
        }
        if let Some(url) = &self.webdriver_url {
            loader = loader.with_override("browser.webdriver_url", url.clone());
        }
        loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let cli = Cli::parse_from([
            "jobs-applier",
            "--keywords",
            "rust developer",
            "--max-applications",
            "2",
            "--dry-run",
        ]);
        let settings = cli
            .loader()
            .without_legacy_env()
            .with_yaml_str("search:\n  keywords: python\n  max_applications: 9\n")
            .load()
            .unwrap();

        assert_eq!(settings.get_or("search.keywords", String::new()), "rust developer");
        assert_eq!(settings.get_or("search.max_applications", 0u32), 2);
        assert!(settings.get_or("application.dry_run", false));
        assert!(!settings.get_or("browser.headless", false));
    }
}
