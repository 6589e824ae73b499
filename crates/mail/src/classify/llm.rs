//! OpenAI-compatible classifier
//!
//! Talks to a chat-completions endpoint with a JSON-schema constrained
//! response format. Transient failures (rate limits, server errors) are
//! retried with bounded exponential backoff; everything else fails the
//! item immediately.

use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::prompt::{CLASSIFICATION_INSTRUCTIONS, build_prompt};
use super::{Classifier, ClassifyError};
use crate::config::ClassifierConfig;
use crate::models::{Category, Message};

/// Attempts per message, including the first
const MAX_ATTEMPTS: u32 = 5;

/// First retry delay; doubles per attempt up to the cap
const BACKOFF_START: Duration = Duration::from_secs(2);
const BACKOFF_CAP: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// The answer shape the schema constrains the model to
#[derive(Deserialize)]
struct LabelAnswer {
    label: String,
}

/// Classifier backed by an OpenAI-compatible chat-completions API
pub struct OpenAiClassifier {
    config: ClassifierConfig,
}

impl OpenAiClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    fn answer_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "label": { "type": "string" }
            },
            "required": ["label"],
            "additionalProperties": false
        })
    }

    /// Send one classification request, without retry
    fn request_once(&self, user_prompt: &str) -> Result<String, RequestFailure> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: CLASSIFICATION_INSTRUCTIONS,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "classification",
                    strict: true,
                    schema: Self::answer_schema(),
                },
            },
        };

        let result = ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", self.config.api_key))
            .send_json(&body);

        let mut response = match result {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(code)) if code == 429 || code >= 500 => {
                return Err(RequestFailure::Transient(format!("status {}", code)));
            }
            Err(e) => return Err(RequestFailure::Fatal(e.to_string())),
        };

        let parsed: ChatResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| RequestFailure::Fatal(format!("bad response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RequestFailure::Fatal("response had no choices".to_string()))
    }
}

/// Whether a failed request is worth retrying
enum RequestFailure {
    Transient(String),
    Fatal(String),
}

impl Classifier for OpenAiClassifier {
    fn classify(&self, message: &Message) -> Result<Category, ClassifyError> {
        let user_prompt = build_prompt(message);

        let mut delay = BACKOFF_START;
        let mut last_failure = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            match self.request_once(&user_prompt) {
                Ok(content) => {
                    debug!("Classified message {} on attempt {}", message.id, attempt + 1);
                    return parse_answer(&content);
                }
                Err(RequestFailure::Fatal(detail)) => {
                    return Err(ClassifyError::Transport(detail));
                }
                Err(RequestFailure::Transient(detail)) => {
                    last_failure = detail;
                    if attempt < MAX_ATTEMPTS - 1 {
                        let jitter = Duration::from_millis(rand_jitter());
                        warn!(
                            "Classifier request for {} failed ({}), retrying in {:?}",
                            message.id, last_failure, delay
                        );
                        std::thread::sleep(delay + jitter);
                        delay = (delay * 2).min(BACKOFF_CAP);
                    }
                }
            }
        }

        Err(ClassifyError::Transport(format!(
            "gave up after {} attempts: {}",
            MAX_ATTEMPTS, last_failure
        )))
    }
}

/// Parse the model's JSON answer into a category
fn parse_answer(content: &str) -> Result<Category, ClassifyError> {
    let answer: LabelAnswer = serde_json::from_str(content.trim())
        .map_err(|e| ClassifyError::Decode(format!("{} (content: {:?})", e, content)))?;

    Ok(Category::from_label_name(&answer.label)?)
}

/// Generate a random jitter value (0-1000ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer_valid() {
        let category =
            parse_answer(r#"{"label": "classifications/requires_action"}"#).unwrap();
        assert_eq!(category, Category::RequiresAction);
    }

    #[test]
    fn test_parse_answer_unknown_label() {
        let err = parse_answer(r#"{"label": "classifications/junk"}"#).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidLabel(_)));
    }

    #[test]
    fn test_parse_answer_malformed() {
        let err = parse_answer("the label is bulk_content").unwrap_err();
        assert!(matches!(err, ClassifyError::Decode(_)));
    }

    #[test]
    fn test_parse_answer_tolerates_surrounding_whitespace() {
        let category = parse_answer("\n  {\"label\": \"classifications/records\"}  ").unwrap();
        assert_eq!(category, Category::Records);
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "gpt-5-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "classification",
                    strict: true,
                    schema: OpenAiClassifier::answer_schema(),
                },
            },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gpt-5-mini");
        assert_eq!(value["response_format"]["type"], "json_schema");
        assert_eq!(
            value["response_format"]["json_schema"]["schema"]["required"][0],
            "label"
        );
    }
}
