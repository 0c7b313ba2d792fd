//! Lookup boundary.
//!
//! The index answers a question with a tagged result. Only `output-list`
//! carries meters; `error` carries a description and anything else is a
//! wrong result type.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::broadcast::BoxFuture;
use crate::error::{OverlayError, OverlayResult};

/// Lookup service indexing live meter outputs.
pub const METER_SERVICE: &str = "ls_meter";

/// Question sent to a lookup service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupQuestion {
    pub service: String,
    pub query: Value,
}

impl LookupQuestion {
    /// `{ service, query: { findAll: true } }`
    pub fn find_all(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            query: json!({ "findAll": true }),
        }
    }

    pub fn is_find_all(&self) -> bool {
        self.query.get("findAll").and_then(Value::as_bool) == Some(true)
    }
}

/// One candidate output in a lookup answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupOutput {
    /// Atomic envelope whose subject holds the output.
    pub beef: Vec<u8>,
    #[serde(rename = "outputIndex")]
    pub output_index: u32,
}

/// Tagged lookup answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupAnswer {
    /// `outputs` is `None` when the service omitted the list.
    OutputList { outputs: Option<Vec<LookupOutput>> },
    Error { description: String },
    /// Any other `type`, kept verbatim.
    Unknown(String),
}

impl LookupAnswer {
    pub fn output_list(outputs: Vec<LookupOutput>) -> Self {
        Self::OutputList {
            outputs: Some(outputs),
        }
    }

    /// Parse the JSON answer of a lookup service.
    ///
    /// # Errors
    /// `OverlayError::Json` if the `outputs` list is present but malformed.
    pub fn from_value(value: Value) -> OverlayResult<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match kind.as_str() {
            "output-list" => {
                let outputs = match value.get("outputs") {
                    None | Some(Value::Null) => None,
                    Some(list) => Some(serde_json::from_value(list.clone())?),
                };
                Ok(Self::OutputList { outputs })
            }
            "error" => Ok(Self::Error {
                description: value
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("unspecified lookup error")
                    .to_string(),
            }),
            _ => Ok(Self::Unknown(kind)),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::OutputList { outputs: Some(outputs) } => {
                json!({ "type": "output-list", "outputs": outputs })
            }
            Self::OutputList { outputs: None } => json!({ "type": "output-list" }),
            Self::Error { description } => json!({ "type": "error", "description": description }),
            Self::Unknown(kind) => json!({ "type": kind }),
        }
    }

    /// Candidate outputs of an `output-list` answer.
    ///
    /// # Errors
    /// - `MissingOutputs` for an `output-list` without outputs
    /// - `LookupFailed` for an `error` answer
    /// - `WrongResultType` for any other answer
    pub fn into_outputs(self) -> OverlayResult<Vec<LookupOutput>> {
        match self {
            Self::OutputList {
                outputs: Some(outputs),
            } => Ok(outputs),
            Self::OutputList { outputs: None } => Err(OverlayError::MissingOutputs),
            Self::Error { description } => Err(OverlayError::LookupFailed(description)),
            Self::Unknown(kind) => Err(OverlayError::WrongResultType(kind)),
        }
    }
}

/// Trait for answering lookup questions.
pub trait LookupResolver: Send + Sync {
    fn query(&self, question: LookupQuestion) -> BoxFuture<'_, OverlayResult<LookupAnswer>>;
}

/// Arc wrapper for LookupResolver trait objects.
pub type DynLookupResolver = Arc<dyn LookupResolver>;

/// HTTP resolver posting questions to `{url}/lookup`.
pub struct HttpLookupResolver {
    client: Client,
    lookup_url: String,
}

impl HttpLookupResolver {
    pub fn new(base_url: &str, timeout: Duration) -> OverlayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OverlayError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            lookup_url: format!("{}/lookup", base_url.trim_end_matches('/')),
        })
    }

    async fn post(&self, question: LookupQuestion) -> OverlayResult<LookupAnswer> {
        debug!(url = %self.lookup_url, service = %question.service, "Sending lookup question");

        let response = self
            .client
            .post(&self.lookup_url)
            .json(&question)
            .send()
            .await
            .map_err(|e| OverlayError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OverlayError::HttpClient(format!("HTTP {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| OverlayError::HttpClient(format!("Failed to parse response: {e}")))?;

        LookupAnswer::from_value(body)
    }
}

impl LookupResolver for HttpLookupResolver {
    fn query(&self, question: LookupQuestion) -> BoxFuture<'_, OverlayResult<LookupAnswer>> {
        Box::pin(self.post(question))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_all_question_shape() {
        let question = LookupQuestion::find_all(METER_SERVICE);
        let value = serde_json::to_value(&question).unwrap();
        assert_eq!(value, json!({ "service": "ls_meter", "query": { "findAll": true } }));
        assert!(question.is_find_all());
    }

    #[test]
    fn test_parse_output_list() {
        let answer = LookupAnswer::from_value(json!({
            "type": "output-list",
            "outputs": [{ "beef": [1, 2, 3], "outputIndex": 0 }]
        }))
        .unwrap();
        let outputs = answer.into_outputs().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].beef, vec![1, 2, 3]);
    }

    #[test]
    fn test_output_list_without_outputs() {
        let answer = LookupAnswer::from_value(json!({ "type": "output-list" })).unwrap();
        assert!(matches!(answer.into_outputs(), Err(OverlayError::MissingOutputs)));
    }

    #[test]
    fn test_error_answer() {
        let answer =
            LookupAnswer::from_value(json!({ "type": "error", "description": "index down" }))
                .unwrap();
        match answer.into_outputs() {
            Err(OverlayError::LookupFailed(description)) => assert_eq!(description, "index down"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_wrong_result_type() {
        let answer = LookupAnswer::from_value(json!({ "type": "freeform", "result": 1 })).unwrap();
        assert!(matches!(
            answer.into_outputs(),
            Err(OverlayError::WrongResultType(kind)) if kind == "freeform"
        ));
    }

    #[test]
    fn test_answer_value_is_parseable() {
        let answer = LookupAnswer::output_list(vec![LookupOutput {
            beef: vec![9],
            output_index: 2,
        }]);
        assert_eq!(LookupAnswer::from_value(answer.to_value()).unwrap(), answer);
    }
}
