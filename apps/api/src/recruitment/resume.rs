//! Resume parsing: pluggable, trait-based extraction of contact details, skills
//! and experience from an uploaded resume.
//!
//! Default: `KeywordResumeParser` (in-process, deterministic).
//! Optional: `RemoteResumeParser`, which forwards the file to an external
//! parsing service when `RESUME_PARSER_URL` is configured.
//!
//! `AppState` holds an `Arc<dyn ResumeParser>`, chosen at startup.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;

/// Skills recognised by the keyword parser, in reporting order.
pub const KNOWN_SKILLS: &[&str] = &[
    "Python",
    "Java",
    "JavaScript",
    "React",
    "Node.js",
    "SQL",
    "MongoDB",
    "AWS",
    "Docker",
    "Kubernetes",
    "Git",
    "REST API",
    "GraphQL",
    "HTML",
    "CSS",
    "TypeScript",
    "Express",
    "Django",
    "Flask",
    "Machine Learning",
    "Data Science",
    "TensorFlow",
    "Pandas",
];

const PREVIEW_CHARS: usize = 500;
const MAX_RETRIES: u32 = 3;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\+?\d[\d\s().-]{8,}\d").expect("valid phone regex")
});

static EXPERIENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\+?\s*(?:years?|yrs?)\s*(?:of\s*)?(?:experience|exp)")
        .expect("valid experience regex")
});

// ────────────────────────────────────────────────────────────────────────────
// Output data model (shared across parser backends)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_years: i32,
    #[serde(default)]
    pub text_preview: String,
}

/// An uploaded resume as received from a multipart form.
#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl ResumeFile {
    fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some("application/pdf")
            || self.file_name.to_ascii_lowercase().ends_with(".pdf")
            || self.data.starts_with(b"%PDF")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ResumeParser: Send + Sync {
    async fn parse(&self, file: &ResumeFile) -> Result<ParsedResume, AppError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordResumeParser
// ────────────────────────────────────────────────────────────────────────────

pub struct KeywordResumeParser;

#[async_trait]
impl ResumeParser for KeywordResumeParser {
    async fn parse(&self, file: &ResumeFile) -> Result<ParsedResume, AppError> {
        let text = if file.is_pdf() {
            let data = file.data.clone();
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
                .await
                .map_err(|e| AppError::Internal(anyhow::anyhow!("pdf worker failed: {e}")))?
                .map_err(|e| AppError::Validation(format!("Could not read PDF resume: {e:?}")))?
        } else {
            String::from_utf8_lossy(&file.data).into_owned()
        };
        Ok(extract_from_text(&text))
    }

    fn backend(&self) -> &'static str {
        "keyword"
    }
}

/// Pulls contact details, known skills and years of experience out of plain text.
pub fn extract_from_text(text: &str) -> ParsedResume {
    let lowered = text.to_lowercase();
    let skills = KNOWN_SKILLS
        .iter()
        .filter(|skill| contains_skill(&lowered, &skill.to_lowercase()))
        .map(|skill| skill.to_string())
        .collect();

    let experience_years = EXPERIENCE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    ParsedResume {
        email: EMAIL_RE.find(text).map(|m| m.as_str().to_string()),
        phone: PHONE_RE.find(text).map(|m| m.as_str().trim().to_string()),
        skills,
        experience_years,
        text_preview: text.chars().take(PREVIEW_CHARS).collect(),
    }
}

/// Substring match that refuses to match inside a longer word,
/// so "java" is not found in "javascript" and "git" not in "digital".
fn contains_skill(haystack: &str, skill: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric();
    haystack.match_indices(skill).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + skill.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// RemoteResumeParser
// ────────────────────────────────────────────────────────────────────────────

/// Posts the file as multipart field `file` to an external parser that
/// answers with the `ParsedResume` JSON shape.
pub struct RemoteResumeParser {
    client: Client,
    url: String,
}

impl RemoteResumeParser {
    pub fn new(url: String) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl ResumeParser for RemoteResumeParser {
    async fn parse(&self, file: &ResumeFile) -> Result<ParsedResume, AppError> {
        let mut last_error = String::from("no attempt made");

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "Resume parser attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut part = multipart::Part::bytes(file.data.to_vec()).file_name(file.file_name.clone());
            if let Some(content_type) = &file.content_type {
                part = part
                    .mime_str(content_type)
                    .map_err(|e| AppError::Validation(format!("Invalid content type: {e}")))?;
            }
            let form = multipart::Form::new().part("file", part);

            let response = match self.client.post(&self.url).multipart(form).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() || status.as_u16() == 429 {
                last_error = format!("parser returned {status}");
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::ResumeParse(format!("parser returned {status}: {body}")));
            }

            let parsed: ParsedResume = response
                .json()
                .await
                .map_err(|e| AppError::ResumeParse(format!("invalid parser response: {e}")))?;
            debug!(
                "Remote resume parse succeeded: {} skills",
                parsed.skills.len()
            );
            return Ok(parsed);
        }

        Err(AppError::ResumeParse(format!(
            "gave up after {MAX_RETRIES} attempts: {last_error}"
        )))
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Priya Sharma\npriya.sharma@example.com | +91 98765 43210\n\
        Backend engineer with 5 years of experience building REST API services in \
        Python, Django and PostgreSQL (SQL). Comfortable with docker and AWS.\n\
        Hobbies: digital photography";

    #[test]
    fn test_extracts_contact_details() {
        let parsed = extract_from_text(SAMPLE);
        assert_eq!(parsed.email.as_deref(), Some("priya.sharma@example.com"));
        assert_eq!(parsed.phone.as_deref(), Some("+91 98765 43210"));
    }

    #[test]
    fn test_skills_follow_list_order_and_ignore_case() {
        let parsed = extract_from_text(SAMPLE);
        assert_eq!(
            parsed.skills,
            vec!["Python", "SQL", "AWS", "Docker", "REST API", "Django"]
        );
    }

    #[test]
    fn test_skill_inside_longer_word_is_not_matched() {
        let parsed = extract_from_text("Fluent in JavaScript; digital marketing");
        assert_eq!(parsed.skills, vec!["JavaScript"]);
    }

    #[test]
    fn test_experience_years() {
        assert_eq!(extract_from_text(SAMPLE).experience_years, 5);
        assert_eq!(extract_from_text("3+ yrs exp in sales").experience_years, 3);
        assert_eq!(extract_from_text("fresh graduate").experience_years, 0);
    }

    #[test]
    fn test_preview_is_capped() {
        let text = "a".repeat(2_000);
        assert_eq!(extract_from_text(&text).text_preview.len(), PREVIEW_CHARS);
    }

    #[tokio::test]
    async fn test_keyword_parser_reads_plain_text() {
        let file = ResumeFile {
            file_name: "resume.txt".into(),
            content_type: Some("text/plain".into()),
            data: Bytes::from_static(b"Kubernetes and Git, 2 years experience"),
        };
        let parsed = KeywordResumeParser.parse(&file).await.unwrap();
        assert_eq!(parsed.skills, vec!["Kubernetes", "Git"]);
        assert_eq!(parsed.experience_years, 2);
    }

    #[test]
    fn test_remote_response_tolerates_missing_fields() {
        let parsed: ParsedResume = serde_json::from_str(r#"{"email": null}"#).unwrap();
        assert_eq!(parsed, ParsedResume::default());
    }
}
