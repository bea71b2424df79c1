//! Provider identities and their authentication conventions.

use std::fmt;

use reqwest::{Client, Method, RequestBuilder};
use url::Url;

/// The upstream services the pipeline talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// NewsAPI top headlines.
    NewsApi,
    /// OpenAI chat completions.
    OpenAi,
    /// ElevenLabs text-to-speech.
    ElevenLabs,
}

impl Provider {
    /// All providers, in pipeline order.
    pub const ALL: [Self; 3] = [Self::NewsApi, Self::OpenAi, Self::ElevenLabs];

    /// Short lowercase name used in logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NewsApi => "newsapi",
            Self::OpenAi => "openai",
            Self::ElevenLabs => "elevenlabs",
        }
    }

    /// Environment variable holding this provider's credential.
    #[must_use]
    pub const fn env_key(self) -> &'static str {
        match self {
            Self::NewsApi => "NEWS_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::ElevenLabs => "ELEVENLABS_API_KEY",
        }
    }

    /// How this provider expects its credential to be presented.
    #[must_use]
    pub const fn auth_scheme(self) -> AuthScheme {
        match self {
            Self::NewsApi => AuthScheme::Query { param: "apiKey" },
            Self::OpenAi => AuthScheme::Bearer,
            Self::ElevenLabs => AuthScheme::Header { name: "xi-api-key" },
        }
    }

    /// Public API base URL.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::NewsApi => "https://newsapi.org/v2",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::ElevenLabs => "https://api.elevenlabs.io/v1",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a credential travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// Raw key appended as a query parameter.
    Query {
        /// Query parameter name.
        param: &'static str,
    },
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// Raw key in a provider-specific header.
    Header {
        /// Header name.
        name: &'static str,
    },
}

/// A provider's secret, able to authorize requests to that provider.
#[derive(Clone)]
pub struct Credential {
    provider: Provider,
    secret: String,
}

impl Credential {
    /// Wrap a secret for `provider`.
    #[must_use]
    pub fn new(provider: Provider, secret: impl Into<String>) -> Self {
        Self {
            provider,
            secret: secret.into(),
        }
    }

    /// The provider this credential belongs to.
    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.provider
    }

    /// Start an authorized request.
    ///
    /// The URL is taken by value because query-parameter schemes mutate it.
    #[must_use]
    pub fn authorize(&self, client: &Client, method: Method, mut url: Url) -> RequestBuilder {
        match self.provider.auth_scheme() {
            AuthScheme::Query { param } => {
                url.query_pairs_mut().append_pair(param, &self.secret);
                client.request(method, url)
            }
            AuthScheme::Bearer => client.request(method, url).bearer_auth(&self.secret),
            AuthScheme::Header { name } => {
                client.request(method, url).header(name, self.secret.as_str())
            }
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn build(provider: Provider, method: Method, url: &str) -> reqwest::Request {
        let credential = Credential::new(provider, "s3cret");
        credential
            .authorize(&Client::new(), method, Url::parse(url).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn newsapi_key_travels_as_query_parameter() {
        let request = build(
            Provider::NewsApi,
            Method::GET,
            "https://newsapi.org/v2/top-headlines?country=us",
        );

        let pairs: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("country".to_owned(), "us".to_owned())));
        assert!(pairs.contains(&("apiKey".to_owned(), "s3cret".to_owned())));
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn openai_key_travels_as_bearer_token() {
        let request = build(
            Provider::OpenAi,
            Method::POST,
            "https://api.openai.com/v1/chat/completions",
        );

        assert_eq!(request.headers()["authorization"], "Bearer s3cret");
        assert!(request.url().query().is_none());
    }

    #[test]
    fn elevenlabs_key_travels_in_custom_header() {
        let request = build(
            Provider::ElevenLabs,
            Method::POST,
            "https://api.elevenlabs.io/v1/text-to-speech/voice",
        );

        assert_eq!(request.headers()["xi-api-key"], "s3cret");
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let credential = Credential::new(Provider::OpenAi, "sk-very-secret");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn env_keys_follow_pipeline_order() {
        let keys: Vec<&str> = Provider::ALL.iter().map(|p| p.env_key()).collect();
        assert_eq!(
            keys,
            ["NEWS_API_KEY", "OPENAI_API_KEY", "ELEVENLABS_API_KEY"]
        );
    }
}
