use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Snapshot of user agent, viewport, and locale characteristics.
pub struct IdentityProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub languages: Vec<String>,
}

impl Default for IdentityProfile {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string(),
            viewport: (1920, 1080),
            languages: vec!["en-US".to_string(), "en".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
/// Small pool of plausible desktop profiles; one is picked per session.
pub struct IdentityPool {
    profiles: Vec<IdentityProfile>,
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityPool {
    pub fn new() -> Self {
        Self {
            profiles: vec![
                IdentityProfile::default(),
                IdentityProfile {
                    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
                    viewport: (1920, 1080),
                    languages: vec!["en-US".to_string(), "en".to_string()],
                },
                IdentityProfile {
                    user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
                    viewport: (1440, 900),
                    languages: vec!["en-US".to_string(), "en".to_string()],
                },
            ],
        }
    }

    pub fn choose(&self) -> IdentityProfile {
        let mut rng = rand::thread_rng();
        self.profiles.choose(&mut rng).cloned().unwrap_or_default()
    }
}

/// Chrome command-line arguments for a session using `profile`.
///
/// ```
/// use applier_drivers::identity::{launch_arguments, IdentityProfile};
///
/// let args = launch_arguments(&IdentityProfile::default(), true);
/// assert!(args.contains(&"--window-size=1920,1080".to_string()));
/// assert!(args.contains(&"--headless=new".to_string()));
/// ```
pub fn launch_arguments(profile: &IdentityProfile, headless: bool) -> Vec<String> {
    let mut args = vec![
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        format!("--user-agent={}", profile.user_agent),
        format!("--window-size={},{}", profile.viewport.0, profile.viewport.1),
        format!("--lang={}", profile.languages.join(",")),
    ];
    if headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}
