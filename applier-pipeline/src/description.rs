//! Job description extraction from the detail panel.
use crate::selectors::{Role, SelectorResolver};
use applier_drivers::{Browser, DriverError};

/// The keyword heuristic only accepts text longer than this many characters.
pub const MIN_HEURISTIC_LEN: usize = 100;

/// Collapse every whitespace run to a single space and trim the ends.
///
/// ```
/// use applier_pipeline::description::collapse_whitespace;
///
/// assert_eq!(collapse_whitespace("  Build\n\n data\tpipelines  "), "Build data pipelines");
/// ```
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Description text with whitespace collapsed, or an empty string when
/// nothing usable is on the page.
///
/// The dedicated description containers are tried first. When none yields
/// text, every block mentioning a description keyword (in keyword order) is
/// considered, and the shortest one longer than [`MIN_HEURISTIC_LEN`]
/// characters wins.
pub async fn extract_description<B: Browser>(
    browser: &B,
    resolver: &SelectorResolver<'_, B>,
) -> String {
    match try_extract(browser, resolver).await {
        Ok(Some(text)) => {
            tracing::debug!(target: "applier.description", chars = text.len(), "description extracted");
            text
        }
        Ok(None) => {
            tracing::warn!(target: "applier.description", "job description not found");
            String::new()
        }
        Err(e) => {
            tracing::warn!(target: "applier.description", error = %e, "job description lookup failed");
            String::new()
        }
    }
}

async fn try_extract<B: Browser>(
    browser: &B,
    resolver: &SelectorResolver<'_, B>,
) -> Result<Option<String>, DriverError> {
    let primary = resolver.spec(Role::JobDescription);
    for descriptor in &primary.descriptors {
        for element in resolver.qualifying(None, descriptor, &primary).await? {
            let text = collapse_whitespace(&browser.text(&element).await?);
            if !text.is_empty() {
                tracing::trace!(target: "applier.description", %descriptor, "primary container matched");
                return Ok(Some(text));
            }
        }
    }

    let heuristic = resolver.spec(Role::DescriptionHeuristic);
    for descriptor in &heuristic.descriptors {
        let mut best: Option<(usize, String)> = None;
        for element in resolver.qualifying(None, descriptor, &heuristic).await? {
            let text = collapse_whitespace(&browser.text(&element).await?);
            let chars = text.chars().count();
            if chars <= MIN_HEURISTIC_LEN {
                continue;
            }
            if best.as_ref().map_or(true, |(shortest, _)| chars < *shortest) {
                best = Some((chars, text));
            }
        }
        if let Some((_, text)) = best {
            tracing::trace!(target: "applier.description", %descriptor, "heuristic block matched");
            return Ok(Some(text));
        }
    }
    Ok(None)
}
