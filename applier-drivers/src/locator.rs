use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural element locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// One way of identifying an element: a locator, optionally narrowed to
/// elements whose visible text contains `text` (case-insensitive).
///
/// ```
/// use applier_drivers::Descriptor;
///
/// let d = Descriptor::css("button").with_text("Submit");
/// assert_eq!(d.to_string(), "css=button[text~\"Submit\"]");
/// assert!(d.text_matches("  submit application "));
/// assert!(!d.text_matches("Next"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    pub locator: Locator,
    #[serde(default)]
    pub text: Option<String>,
}

impl Descriptor {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            text: None,
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Locator::css(selector))
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::new(Locator::xpath(expr))
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Whether `candidate` satisfies the text filter; always true without one.
    pub fn text_matches(&self, candidate: &str) -> bool {
        match &self.text {
            None => true,
            Some(needle) => candidate
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{}[text~{text:?}]", self.locator),
            None => write!(f, "{}", self.locator),
        }
    }
}
