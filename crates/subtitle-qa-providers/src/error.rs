use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to decode {payload} payload: {source}")]
    Decode {
        payload: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{provider} provider failed: {message}")]
    Backend {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn decode(payload: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { payload, source }
    }

    pub fn backend(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            provider,
            message: message.into(),
        }
    }
}
