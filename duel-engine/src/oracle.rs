use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use duel_types::{DuelError, SuggestionRequest, ValidationRequest, WordVerdict};

/// Judges whether a candidate word is playable under the room's rules.
///
/// Transport failure stays distinct from rejection: a failed call is
/// `Err(OracleUnavailable)` and never a verdict, so the engine can leave
/// the turn open for a retry instead of ending somebody's game.
#[async_trait]
pub trait WordOracle: Send + Sync {
    async fn validate(&self, request: &ValidationRequest) -> Result<WordVerdict, DuelError>;
}

/// Proposes the AI opponent's next word. `Ok(None)` means nothing playable
/// came back and the AI concedes.
#[async_trait]
pub trait SuggestionOracle: Send + Sync {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Option<String>, DuelError>;
}

#[derive(Debug, Deserialize)]
struct SuggestionResponse {
    word: Option<String>,
}

/// Client for the generative word service, which backs both validation and
/// suggestions over plain JSON POSTs.
pub struct GenerativeOracle {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GenerativeOracle {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DuelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DuelError::OracleUnavailable {
                message: e.to_string(),
            })?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, DuelError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Oracle request to {} failed: {:?}", url, e);
            DuelError::OracleUnavailable {
                message: e.to_string(),
            }
        })?;
        if !response.status().is_success() {
            warn!("Oracle request to {} returned {}", url, response.status());
            return Err(DuelError::OracleUnavailable {
                message: format!("unexpected status {}", response.status()),
            });
        }
        response.json::<R>().await.map_err(|e| {
            warn!("Oracle response from {} did not parse: {:?}", url, e);
            DuelError::OracleUnavailable {
                message: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl WordOracle for GenerativeOracle {
    async fn validate(&self, request: &ValidationRequest) -> Result<WordVerdict, DuelError> {
        self.post("validate", request).await
    }
}

#[async_trait]
impl SuggestionOracle for GenerativeOracle {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Option<String>, DuelError> {
        let response: SuggestionResponse = self.post("suggest", request).await?;
        Ok(response
            .word
            .map(|word| word.trim().to_string())
            .filter(|word| !word.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_types::{Difficulty, RuleContext};

    fn unreachable_oracle() -> GenerativeOracle {
        // Nothing listens on the discard port; requests fail fast.
        GenerativeOracle::new(
            "http://127.0.0.1:9/oracle/",
            None,
            Duration::from_millis(500),
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_is_normalized() {
        let oracle = unreachable_oracle();
        assert_eq!(oracle.base_url, "http://127.0.0.1:9/oracle");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable_not_a_verdict() {
        let oracle = unreachable_oracle();
        let request = ValidationRequest {
            word: "apple".to_string(),
            used_words: vec![],
            language: "en".to_string(),
            context: RuleContext::Longest,
        };

        let result = oracle.validate(&request).await;
        assert!(matches!(result, Err(DuelError::OracleUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_suggestions_too() {
        let oracle = unreachable_oracle();
        let request = SuggestionRequest {
            used_words: vec!["apple".to_string()],
            language: "en".to_string(),
            difficulty: Difficulty::Medium,
            context: RuleContext::Chain {
                last_word: Some("apple".to_string()),
            },
        };

        let result = oracle.suggest(&request).await;
        assert!(matches!(result, Err(DuelError::OracleUnavailable { .. })));
    }

    #[test]
    fn test_suggestion_response_shapes() {
        let some: SuggestionResponse = serde_json::from_str(r#"{"word":"zebra"}"#).unwrap();
        assert_eq!(some.word.as_deref(), Some("zebra"));

        let none: SuggestionResponse = serde_json::from_str(r#"{"word":null}"#).unwrap();
        assert!(none.word.is_none());
    }
}
