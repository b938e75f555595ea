// src/translation/mod.rs
pub mod http;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::model::Language;
use crate::utils::error::TranslationError;

pub use http::HttpTranslator;

/// Text-to-text translation capability.
#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslationError>;
}

/// Used when no translation endpoint is configured.
pub struct DisabledTranslator;

#[async_trait]
impl TranslationService for DisabledTranslator {
    async fn translate(
        &self,
        _text: &str,
        _source: Language,
        _target: Language,
    ) -> Result<String, TranslationError> {
        Err(TranslationError::Unavailable(
            "no translation endpoint configured".to_string(),
        ))
    }
}

/// Translation state for a single document: the service, the per-call
/// timeout, and a memo of texts already translated. Dropped with the document.
pub struct TranslationSession {
    service: Arc<dyn TranslationService>,
    timeout: Duration,
    cache: HashMap<(Language, String), String>,
}

impl TranslationSession {
    pub fn new(service: Arc<dyn TranslationService>, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            cache: HashMap::new(),
        }
    }

    /// Translates `text` into English. Blank text translates to itself
    /// without a service call.
    pub async fn to_english(
        &mut self,
        text: &str,
        source: Language,
    ) -> Result<String, TranslationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(String::new());
        }

        let key = (source, trimmed.to_string());
        if let Some(hit) = self.cache.get(&key) {
            tracing::trace!("Translation cache hit ({} chars)", trimmed.len());
            return Ok(hit.clone());
        }

        let call = self.service.translate(trimmed, source, Language::En);
        let translated = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result?,
            Err(_) => {
                let millis = self.timeout.as_millis() as u64;
                tracing::warn!("Translation call timed out after {} ms", millis);
                return Err(TranslationError::Timeout(millis));
            }
        };

        self.cache.insert(key, translated.clone());
        Ok(translated)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Translation doubles shared by the parser and dispatcher tests.
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Prefixes the text with `EN:`; counts calls.
    #[derive(Default)]
    pub struct EchoTranslator {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl TranslationService for EchoTranslator {
        async fn translate(
            &self,
            text: &str,
            _source: Language,
            _target: Language,
        ) -> Result<String, TranslationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("EN:{}", text))
        }
    }

    /// Fails for any text containing `needle`, echoes everything else.
    pub struct FailingTranslator {
        pub needle: String,
    }

    #[async_trait]
    impl TranslationService for FailingTranslator {
        async fn translate(
            &self,
            text: &str,
            _source: Language,
            _target: Language,
        ) -> Result<String, TranslationError> {
            if text.contains(&self.needle) {
                Err(TranslationError::Unavailable("service returned 503".to_string()))
            } else {
                Ok(format!("EN:{}", text))
            }
        }
    }

    /// Never answers within any sensible timeout.
    pub struct StalledTranslator;

    #[async_trait]
    impl TranslationService for StalledTranslator {
        async fn translate(
            &self,
            _text: &str,
            _source: Language,
            _target: Language,
        ) -> Result<String, TranslationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    pub fn session(service: Arc<dyn TranslationService>) -> TranslationSession {
        TranslationSession::new(service, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn caches_repeated_text() {
        let echo = Arc::new(EchoTranslator::default());
        let mut session = session(echo.clone());
        let first = session.to_english("价格指数", Language::Zh).await.unwrap();
        let second = session.to_english(" 价格指数 ", Language::Zh).await.unwrap();
        assert_eq!(first, "EN:价格指数");
        assert_eq!(first, second);
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_text_skips_the_service() {
        let mut session = session(Arc::new(DisabledTranslator));
        assert_eq!(session.to_english("  ", Language::Zh).await.unwrap(), "");
    }

    #[tokio::test]
    async fn disabled_translator_is_unavailable() {
        let mut session = session(Arc::new(DisabledTranslator));
        let err = session.to_english("就业", Language::Zh).await.unwrap_err();
        assert!(matches!(err, TranslationError::Unavailable(_)));
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let mut session =
            TranslationSession::new(Arc::new(StalledTranslator), Duration::from_millis(50));
        let err = session.to_english("收入", Language::Zh).await.unwrap_err();
        assert!(matches!(err, TranslationError::Timeout(50)));
    }
}
