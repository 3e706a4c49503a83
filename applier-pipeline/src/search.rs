//! Search URL construction.
use std::str::FromStr;
use url::Url;

/// Query pairs every search carries: simplified apply only, remote,
/// most recent first.
pub const FIXED_FILTERS: [(&str, &str); 3] = [("f_LF", "f_AL"), ("f_WT", "2"), ("sortBy", "DD")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatePosted {
    #[default]
    Any,
    Past24Hours,
    PastWeek,
    PastMonth,
}

impl DatePosted {
    fn filter_value(self) -> Option<&'static str> {
        match self {
            DatePosted::Any => None,
            DatePosted::Past24Hours => Some("r86400"),
            DatePosted::PastWeek => Some("r604800"),
            DatePosted::PastMonth => Some("r2592000"),
        }
    }
}

impl FromStr for DatePosted {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Ok(DatePosted::Any),
            "past_24h" | "24h" | "day" => Ok(DatePosted::Past24Hours),
            "past_week" | "week" => Ok(DatePosted::PastWeek),
            "past_month" | "month" => Ok(DatePosted::PastMonth),
            other => Err(format!("unknown date_posted value `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub base_url: String,
    pub keywords: String,
    pub location: String,
    pub experience_levels: Vec<String>,
    pub job_types: Vec<String>,
    pub date_posted: DatePosted,
    /// Extra pairs appended after the built-in ones. A key that is already
    /// present (keywords, location, fixed or translated filters) is ignored.
    pub filters: Vec<(String, String)>,
}

impl SearchQuery {
    pub fn new(base_url: impl Into<String>, keywords: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            keywords: keywords.into(),
            location: location.into(),
            experience_levels: Vec::new(),
            job_types: Vec::new(),
            date_posted: DatePosted::Any,
            filters: Vec::new(),
        }
    }

    fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = vec![
            ("keywords".into(), self.keywords.clone()),
            ("location".into(), self.location.clone()),
        ];
        pairs.extend(FIXED_FILTERS.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        if !self.experience_levels.is_empty() {
            pairs.push(("f_E".into(), self.experience_levels.join(",")));
        }
        if !self.job_types.is_empty() {
            pairs.push(("f_JT".into(), self.job_types.join(",")));
        }
        if let Some(tpr) = self.date_posted.filter_value() {
            pairs.push(("f_TPR".into(), tpr.into()));
        }
        for (key, value) in &self.filters {
            if pairs.iter().any(|(k, _)| k == key) {
                tracing::warn!(target: "applier.search", key = %key, "configured filter collides with a built-in parameter, ignored");
                continue;
            }
            pairs.push((key.clone(), value.clone()));
        }
        pairs
    }

    /// ```
    /// use applier_pipeline::search::SearchQuery;
    ///
    /// let url = SearchQuery::new("https://www.linkedin.com/jobs/search/", "data engineer", "Remote")
    ///     .to_url()
    ///     .unwrap();
    /// assert_eq!(
    ///     url.as_str(),
    ///     "https://www.linkedin.com/jobs/search/?keywords=data+engineer&location=Remote&f_LF=f_AL&f_WT=2&sortBy=DD"
    /// );
    /// ```
    pub fn to_url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.base_url)?;
        url.query_pairs_mut().clear().extend_pairs(self.pairs());
        Ok(url)
    }
}
