// src/translation/http.rs
use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};

use super::TranslationService;
use crate::model::Language;
use crate::utils::error::TranslationError;

const USER_AGENT: &str = concat!("filing_extractor/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

/// Client for a LibreTranslate-compatible `/translate` endpoint.
pub struct HttpTranslator {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpTranslator {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?; // Propagate client build error if any

        let url = format!("{}/translate", endpoint.trim_end_matches('/'));
        tracing::info!("Using translation service at {}", url);
        Ok(Self { client, url, api_key })
    }
}

#[async_trait]
impl TranslationService for HttpTranslator {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslationError> {
        let request = TranslateRequest {
            q: text,
            source: source.code(),
            target: target.code(),
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        tracing::debug!("Translating {} chars {} -> {}", text.len(), source.code(), target.code());

        let response = self
            .client
            .post(&self.url)
            .header(header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await?; // Propagates reqwest::Error as TranslationError::Network

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} from {}", status, self.url);
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(TranslationError::RateLimited);
            }
            if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
                tracing::warn!("Translation service refused the request - check the API key.");
            }
            return Err(TranslationError::Http(status));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::Response(e.to_string()))?;

        if body.translated_text.trim().is_empty() {
            return Err(TranslationError::Response("empty translatedText".to_string()));
        }
        Ok(body.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_libretranslate_shape() {
        let request = TranslateRequest {
            q: "价格",
            source: Language::Zh.code(),
            target: Language::En.code(),
            format: "text",
            api_key: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"q": "价格", "source": "zh", "target": "en", "format": "text"})
        );
    }

    #[test]
    fn response_is_read_from_translated_text() {
        let body: TranslateResponse =
            serde_json::from_str(r#"{"translatedText": "price", "detectedLanguage": {"language": "zh"}}"#)
                .unwrap();
        assert_eq!(body.translated_text, "price");
    }

    #[test]
    fn endpoint_trailing_slash_is_normalized() {
        let translator = HttpTranslator::new("http://localhost:5000/", None).unwrap();
        assert_eq!(translator.url, "http://localhost:5000/translate");
    }
}
