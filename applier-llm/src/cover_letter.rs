//! Cover letters from a job posting and the applicant's background.
//!
//! [`CoverLetterGenerator::generate`] is infallible: any failure collapses
//! into the generic [`fallback_letter`].
use crate::traits::LlmClient;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const MAX_TOKENS: u32 = 250;
const TEMPERATURE: f32 = 0.7;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

const SYSTEM_PROMPT: &str = "You are a professional resume writer.";

#[async_trait]
pub trait CoverLetterGenerator: Send + Sync {
    async fn generate(
        &self,
        job_title: &str,
        company: &str,
        job_description: &str,
        user_background: &str,
    ) -> String;
}

/// Generic letter used whenever generation fails.
///
/// ```
/// let letter = applier_llm::cover_letter::fallback_letter("Sam Doe");
/// assert!(letter.starts_with("Dear Hiring Manager,"));
/// assert!(letter.ends_with("Best Regards,\nSam Doe"));
/// ```
pub fn fallback_letter(signature: &str) -> String {
    let signature = match signature.trim() {
        "" => "[Your Name]",
        name => name,
    };
    format!(
        "Dear Hiring Manager,\n\nI am excited to apply for this position. \
         Thank you for your consideration.\n\nBest Regards,\n{signature}"
    )
}

fn build_prompt(job_title: &str, company: &str, job_description: &str, user_background: &str) -> String {
    format!(
        "Please write a concise, tailored cover letter for the position: '{job_title}' at '{company}'.\n\
         Job Description: {job_description}\n\
         My background: {user_background}\n\
         Output a professional cover letter with a friendly tone."
    )
}

pub struct LlmCoverLetterWriter {
    client: Arc<dyn LlmClient>,
    signature: String,
    timeout: Duration,
    max_tokens: u32,
    temperature: f32,
}

impl LlmCoverLetterWriter {
    pub fn new(client: Arc<dyn LlmClient>, signature: impl Into<String>) -> Self {
        Self {
            client,
            signature: signature.into(),
            timeout: DEFAULT_TIMEOUT,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CoverLetterGenerator for LlmCoverLetterWriter {
    async fn generate(
        &self,
        job_title: &str,
        company: &str,
        job_description: &str,
        user_background: &str,
    ) -> String {
        let prompt = build_prompt(job_title, company, job_description, user_background);
        let call = self
            .client
            .generate(&prompt, Some(SYSTEM_PROMPT), Some(self.max_tokens), Some(self.temperature));

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(resp)) if !resp.text.trim().is_empty() => {
                tracing::info!(
                    target: "applier.cover_letter",
                    model = %self.client.model_name(),
                    chars = resp.text.len(),
                    "cover letter generated"
                );
                resp.text
            }
            Ok(Ok(_)) => {
                tracing::warn!(target: "applier.cover_letter", "empty completion, using fallback letter");
                fallback_letter(&self.signature)
            }
            Ok(Err(e)) => {
                tracing::warn!(target: "applier.cover_letter", error = %e, "generation failed, using fallback letter");
                fallback_letter(&self.signature)
            }
            Err(_) => {
                tracing::warn!(
                    target: "applier.cover_letter",
                    timeout_ms = self.timeout.as_millis() as u64,
                    "generation timed out, using fallback letter"
                );
                fallback_letter(&self.signature)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_without_name_keeps_placeholder() {
        assert!(fallback_letter("  ").ends_with("[Your Name]"));
    }

    #[test]
    fn prompt_names_position_and_background() {
        let prompt = build_prompt("Data Engineer", "Acme", "Build pipelines.", "Ten years of ETL.");
        assert!(prompt.contains("'Data Engineer' at 'Acme'"));
        assert!(prompt.contains("Job Description: Build pipelines."));
        assert!(prompt.contains("My background: Ten years of ETL."));
    }
}
