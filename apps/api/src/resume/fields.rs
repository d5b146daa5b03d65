//! Structured resume fields and the remote parser that produces them.
//!
//! `ResumeIngestor` holds the parser as an `Arc<dyn FieldParser>`, so the
//! ingestion pipeline can run against a stub in tests.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::llm_client::prompts::resume_fields_prompt;
use crate::llm_client::{strip_json_fences, LlmClient, LlmError};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no text could be extracted from the resume")]
    NoTextExtracted,

    #[error(transparent)]
    Completion(#[from] LlmError),

    #[error("completion text is not a valid resume record: {0}")]
    MalformedPayload(#[source] serde_json::Error),
}

/// The six fields extracted from a resume. Shape is the same for every source format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub education: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub experience: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub skills: Option<String>,
}

impl ParsedFields {
    /// Parses a completion payload, tolerating markdown fences around the JSON.
    pub fn from_completion(text: &str) -> Result<Self, ParseError> {
        serde_json::from_str(strip_json_fences(text)).map_err(ParseError::MalformedPayload)
    }
}

/// Models drift from "every value is a string": lists are joined, scalars stringified.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    flatten_value(value).map_err(serde::de::Error::custom)
}

fn flatten_value(value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(items) => {
            let parts = items
                .into_iter()
                .map(flatten_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(
                parts
                    .into_iter()
                    .flatten()
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", "),
            ))
        }
        Value::Object(_) => Err("expected a string, list or scalar".to_string()),
    }
}

/// Turns raw resume text into [`ParsedFields`].
#[async_trait]
pub trait FieldParser: Send + Sync {
    async fn parse(&self, raw_text: &str) -> Result<ParsedFields, ParseError>;
}

/// Remote-model backed parser. Never caches: each call is a fresh completion.
pub struct LlmFieldParser {
    llm: LlmClient,
}

impl LlmFieldParser {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl FieldParser for LlmFieldParser {
    async fn parse(&self, raw_text: &str) -> Result<ParsedFields, ParseError> {
        if raw_text.trim().is_empty() {
            return Err(ParseError::NoTextExtracted);
        }

        let prompt = resume_fields_prompt(raw_text);
        let response = self.llm.complete(&prompt).await?;
        let text = response.text().ok_or_else(|| {
            LlmError::MalformedEnvelope("every candidate completion was empty".to_string())
        })?;

        debug!("Parsing {} byte completion payload", text.len());
        ParsedFields::from_completion(text)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::llm_client::RetryPolicy;

    const JANE_RESPONSE: &str = r#"{"choices":[{"text":"{\"name\":\"Jane\",\"email\":\"j@x.com\",\"phone\":\"\",\"education\":\"\",\"experience\":\"\",\"skills\":\"Go\"}"}]}"#;

    fn parser_for(url: String) -> LlmFieldParser {
        let llm = LlmClient::new(
            url,
            "secret".to_string(),
            Duration::from_secs(5),
            RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
            },
        )
        .unwrap();
        LlmFieldParser::new(llm)
    }

    fn is_blank(field: &Option<String>) -> bool {
        field.as_deref().unwrap_or_default().is_empty()
    }

    #[tokio::test]
    async fn test_parse_jane_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(JANE_RESPONSE)
            .create_async()
            .await;

        let fields = parser_for(server.url()).parse("Jane, Go developer").await.unwrap();

        assert_eq!(fields.name.as_deref(), Some("Jane"));
        assert_eq!(fields.email.as_deref(), Some("j@x.com"));
        assert_eq!(fields.skills.as_deref(), Some("Go"));
        assert!(is_blank(&fields.phone));
        assert!(is_blank(&fields.education));
        assert!(is_blank(&fields.experience));
    }

    #[tokio::test]
    async fn test_empty_text_makes_no_network_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(JANE_RESPONSE)
            .expect(0)
            .create_async()
            .await;

        let err = parser_for(server.url()).parse("  \n ").await.unwrap_err();

        assert!(matches!(err, ParseError::NoTextExtracted));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_surfaces_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(400)
            .with_body("prompt too long")
            .create_async()
            .await;

        let err = parser_for(server.url()).parse("text").await.unwrap_err();

        match err {
            ParseError::Completion(LlmError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "prompt too long");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_envelope() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"result": "no choices here"}"#)
            .create_async()
            .await;

        let err = parser_for(server.url()).parse("text").await.unwrap_err();
        assert!(matches!(
            err,
            ParseError::Completion(LlmError::MalformedEnvelope(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"choices":[{"text":"Sorry, I cannot help with that."}]}"#)
            .create_async()
            .await;

        let err = parser_for(server.url()).parse("text").await.unwrap_err();
        assert!(matches!(err, ParseError::MalformedPayload(_)));
    }

    #[test]
    fn test_list_fields_are_joined() {
        let fields = ParsedFields::from_completion(
            r#"{"name": "Ana", "skills": ["Rust", "SQL"], "phone": null, "experience": 5}"#,
        )
        .unwrap();
        assert_eq!(fields.skills.as_deref(), Some("Rust, SQL"));
        assert_eq!(fields.experience.as_deref(), Some("5"));
        assert_eq!(fields.phone, None);
        assert_eq!(fields.email, None);
    }

    #[test]
    fn test_fenced_payload() {
        let fields =
            ParsedFields::from_completion("```json\n{\"name\": \"Ana\"}\n```").unwrap();
        assert_eq!(fields.name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_nested_object_is_rejected() {
        let err = ParsedFields::from_completion(r#"{"education": {"school": "MIT"}}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::MalformedPayload(_)));
    }
}
