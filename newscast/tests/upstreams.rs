//! Upstream client tests against local mock servers.

#![allow(clippy::unwrap_used, clippy::panic)]

use newscast::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VOICE: &str = "21m00Tcm4TlvDq8ikWAM";

struct Upstreams {
    news: MockServer,
    openai: MockServer,
    elevenlabs: MockServer,
    temp: assert_fs::TempDir,
}

impl Upstreams {
    async fn start() -> Self {
        Self {
            news: MockServer::start().await,
            openai: MockServer::start().await,
            elevenlabs: MockServer::start().await,
            temp: assert_fs::TempDir::new().unwrap(),
        }
    }

    fn config(&self) -> Config {
        Config::from_lookup(|key| match key {
            "NEWS_API_KEY" => Some("news-key".to_owned()),
            "OPENAI_API_KEY" => Some("sk-test".to_owned()),
            "ELEVENLABS_API_KEY" => Some("el-key".to_owned()),
            _ => None,
        })
        .with_output_dir(self.temp.path().join("output"))
        .with_base_url(Provider::NewsApi, self.news.uri())
        .with_base_url(Provider::OpenAi, self.openai.uri())
        .with_base_url(Provider::ElevenLabs, self.elevenlabs.uri())
    }
}

fn headlines_body(count: usize) -> serde_json::Value {
    let articles: Vec<_> = (1..=count)
        .map(|i| {
            json!({
                "source": {"id": null, "name": format!("Outlet {i}")},
                "author": null,
                "title": format!("Headline {i}"),
                "description": format!("Summary {i}"),
                "url": format!("https://example.com/{i}"),
                "publishedAt": "2024-05-01T10:30:00Z",
                "content": null
            })
        })
        .collect();
    json!({"status": "ok", "totalResults": count, "articles": articles})
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_714_557_000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 200, "completion_tokens": 300, "total_tokens": 500}
    })
}

fn audio_payload() -> Vec<u8> {
    let mut bytes = b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec();
    bytes.extend((0..=255u8).rev());
    bytes
}

fn audio_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "audio/mpeg")
        .set_body_bytes(audio_payload())
}

mod news {
    use super::*;

    #[tokio::test]
    async fn sends_fixed_query_and_key_parameter() {
        let up = Upstreams::start().await;
        let mut body = headlines_body(5);
        body["articles"][2]["title"] = json!("[Removed]");

        Mock::given(method("GET"))
            .and(path("/top-headlines"))
            .and(query_param("country", "us"))
            .and(query_param("category", "technology"))
            .and(query_param("pageSize", "5"))
            .and(query_param("apiKey", "news-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&up.news)
            .await;

        let articles = NewsApi::from_config(&up.config())
            .unwrap()
            .headlines()
            .await
            .unwrap();

        assert_eq!(articles.len(), 4);
        assert!(articles.iter().all(|a| a.title != "[Removed]"));
        assert_eq!(articles[0].source_name, "Outlet 1");
    }

    #[tokio::test]
    async fn error_status_on_200_is_upstream_error() {
        let up = Upstreams::start().await;
        Mock::given(method("GET"))
            .and(path("/top-headlines"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "code": "apiKeyInvalid",
                "message": "Your API key is invalid or incorrect."
            })))
            .mount(&up.news)
            .await;

        let err = NewsApi::from_config(&up.config())
            .unwrap()
            .headlines()
            .await
            .unwrap_err();

        let upstream = err.upstream().unwrap();
        assert_eq!(upstream.kind, UpstreamErrorKind::Auth);
        assert!(upstream.message.contains("invalid"));
    }

    #[tokio::test]
    async fn unauthorized_status_carries_provider_message() {
        let up = Upstreams::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status": "error",
                "code": "apiKeyMissing",
                "message": "Your API key is missing."
            })))
            .mount(&up.news)
            .await;

        let err = NewsApi::from_config(&up.config())
            .unwrap()
            .headlines()
            .await
            .unwrap_err();

        let upstream = err.upstream().unwrap();
        assert_eq!(upstream.status, Some(401));
        assert_eq!(upstream.kind, UpstreamErrorKind::Auth);
        assert_eq!(upstream.message, "Your API key is missing.");
        assert!(upstream.hint().unwrap().contains("API key"));
    }
}

mod openai {
    use super::*;

    #[tokio::test]
    async fn sends_bearer_token_and_fixed_parameters() {
        let up = Upstreams::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "temperature": 0.7,
                "max_tokens": 1000
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hi there.")))
            .expect(1)
            .mount(&up.openai)
            .await;

        let config = up.config();
        let articles = vec![Article::new("Headline", "Outlet")];
        let script = ScriptGenerator::from_config(&config)
            .unwrap()
            .write(&articles)
            .await
            .unwrap();

        assert_eq!(script.as_str(), "Hi there.");
        let saved = script.saved_to().unwrap();
        assert_eq!(saved, config.output_dir.join("podcast_script.txt"));
        assert_eq!(tokio::fs::read_to_string(saved).await.unwrap(), "Hi there.");

        let requests = up.openai.received_requests().await.unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["messages"].as_array().unwrap().len(), 1);
        assert_eq!(sent["messages"][0]["role"], "user");
        assert!(
            sent["messages"][0]["content"]
                .as_str()
                .unwrap()
                .contains("1. Title: Headline")
        );
    }

    #[tokio::test]
    async fn empty_article_list_sends_nothing() {
        let up = Upstreams::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("x")))
            .expect(0)
            .mount(&up.openai)
            .await;

        let err = ScriptGenerator::from_config(&up.config())
            .unwrap()
            .write(&[])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EmptyResult { .. }));
    }
}

mod elevenlabs {
    use super::*;

    #[tokio::test]
    async fn sends_key_header_and_returns_bytes_verbatim() {
        let up = Upstreams::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/text-to-speech/{VOICE}")))
            .and(header("xi-api-key", "el-key"))
            .and(header("accept", "audio/mpeg"))
            .and(body_partial_json(json!({
                "text": "Hello listeners.",
                "model_id": "eleven_monolingual_v1",
                "voice_settings": {"stability": 0.5, "similarity_boost": 0.5}
            })))
            .respond_with(audio_response())
            .expect(1)
            .mount(&up.elevenlabs)
            .await;

        let audio = ElevenLabs::from_config(&up.config())
            .unwrap()
            .synthesize("Hello listeners.")
            .await
            .unwrap();

        assert_eq!(audio.as_bytes(), audio_payload().as_slice());
    }

    #[tokio::test]
    async fn configured_voice_is_used() {
        let up = Upstreams::start().await;
        Mock::given(method("POST"))
            .and(path("/text-to-speech/custom-voice"))
            .respond_with(audio_response())
            .expect(1)
            .mount(&up.elevenlabs)
            .await;

        let mut config = up.config();
        config.voice_id = Some("custom-voice".to_owned());

        ElevenLabs::from_config(&config)
            .unwrap()
            .synthesize("Hi.")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn detail_message_is_extracted() {
        let up = Upstreams::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "detail": {"status": "invalid_api_key", "message": "Invalid API key"}
            })))
            .mount(&up.elevenlabs)
            .await;

        let err = ElevenLabs::from_config(&up.config())
            .unwrap()
            .synthesize("Hi.")
            .await
            .unwrap_err();

        let upstream = err.upstream().unwrap();
        assert_eq!(upstream.provider, Provider::ElevenLabs);
        assert_eq!(upstream.kind, UpstreamErrorKind::Auth);
        assert_eq!(upstream.message, "Invalid API key");
    }

    #[tokio::test]
    async fn json_success_body_is_not_audio() {
        let up = Upstreams::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "queued"})))
            .mount(&up.elevenlabs)
            .await;

        let err = ElevenLabs::from_config(&up.config())
            .unwrap()
            .synthesize("Hi.")
            .await
            .unwrap_err();

        assert_eq!(err.upstream().unwrap().kind, UpstreamErrorKind::ResponseFormat);
    }
}

mod pipeline {
    use super::*;

    #[tokio::test]
    async fn end_to_end_run_persists_script_and_audio() {
        let up = Upstreams::start().await;
        Mock::given(method("GET"))
            .and(path("/top-headlines"))
            .respond_with(ResponseTemplate::new(200).set_body_json(headlines_body(5)))
            .expect(1)
            .mount(&up.news)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("Welcome to Tech News Today.")),
            )
            .expect(1)
            .mount(&up.openai)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/text-to-speech/{VOICE}")))
            .and(body_partial_json(json!({"text": "Welcome to Tech News Today."})))
            .respond_with(audio_response())
            .expect(1)
            .mount(&up.elevenlabs)
            .await;

        let result = Pipeline::from_config(up.config())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.article_count(), 5);
        assert_eq!(result.script_length(), "Welcome to Tech News Today.".len());
        assert_eq!(
            tokio::fs::read(result.audio_path()).await.unwrap(),
            audio_payload()
        );
        assert!(result.script_path().unwrap().exists());
    }

    #[tokio::test]
    async fn padded_keys_are_sent_trimmed() {
        let up = Upstreams::start().await;
        Mock::given(method("GET"))
            .and(path("/top-headlines"))
            .and(query_param("apiKey", "news-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(headlines_body(2)))
            .expect(1)
            .mount(&up.news)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hello.")))
            .expect(1)
            .mount(&up.openai)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/text-to-speech/{VOICE}")))
            .and(header("xi-api-key", "el-key"))
            .respond_with(audio_response())
            .expect(1)
            .mount(&up.elevenlabs)
            .await;

        let config = up.config().with_lookup(|key| match key {
            "NEWS_API_KEY" => Some("news-key ".to_owned()),
            "OPENAI_API_KEY" => Some("  sk-test".to_owned()),
            "ELEVENLABS_API_KEY" => Some("el-key\n".to_owned()),
            _ => None,
        });
        assert!(config.validate().valid);

        let result = Pipeline::from_config(config).unwrap().run().await.unwrap();
        assert_eq!(result.article_count(), 2);
    }

    #[tokio::test]
    async fn rate_limited_headlines_abort_at_fetching() {
        let up = Upstreams::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "status": "error",
                "code": "rateLimited",
                "message": "You have made too many requests recently."
            })))
            .expect(1)
            .mount(&up.news)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("x")))
            .expect(0)
            .mount(&up.openai)
            .await;
        Mock::given(method("POST"))
            .respond_with(audio_response())
            .expect(0)
            .mount(&up.elevenlabs)
            .await;

        let err = Pipeline::from_config(up.config())
            .unwrap()
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.aborted_at(), Some(PipelineState::Fetching));
        let upstream = err.upstream().unwrap();
        assert_eq!(upstream.status, Some(429));
        assert_eq!(upstream.kind, UpstreamErrorKind::RateLimited);
        assert!(upstream.hint().unwrap().contains("rate limit"));
    }

    #[tokio::test]
    async fn zero_choices_abort_at_scripting_without_audio_call() {
        let up = Upstreams::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(headlines_body(3)))
            .mount(&up.news)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-2",
                "object": "chat.completion",
                "model": "gpt-4o-mini",
                "choices": []
            })))
            .expect(1)
            .mount(&up.openai)
            .await;
        Mock::given(method("POST"))
            .respond_with(audio_response())
            .expect(0)
            .mount(&up.elevenlabs)
            .await;

        let err = Pipeline::from_config(up.config())
            .unwrap()
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Generate));
        assert_eq!(err.aborted_at(), Some(PipelineState::Scripting));
        assert!(matches!(err.root(), Error::EmptyResult { .. }));
    }

    #[tokio::test]
    async fn empty_headline_page_aborts_before_generation() {
        let up = Upstreams::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(headlines_body(0)))
            .mount(&up.news)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("x")))
            .expect(0)
            .mount(&up.openai)
            .await;

        let err = Pipeline::from_config(up.config())
            .unwrap()
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.aborted_at(), Some(PipelineState::Fetching));
        assert!(matches!(err.root(), Error::EmptyResult { .. }));
    }
}

mod retry {
    use super::*;

    fn unavailable() -> ResponseTemplate {
        ResponseTemplate::new(503).set_body_string("upstream overloaded")
    }

    #[tokio::test]
    async fn disabled_by_default() {
        let up = Upstreams::start().await;
        Mock::given(method("GET"))
            .respond_with(unavailable())
            .expect(1)
            .mount(&up.news)
            .await;

        let err = NewsApi::from_config(&up.config())
            .unwrap()
            .headlines()
            .await
            .unwrap_err();

        assert_eq!(err.upstream().unwrap().status, Some(503));
    }

    #[tokio::test]
    async fn configured_retry_recovers_from_transient_failure() {
        let up = Upstreams::start().await;
        Mock::given(method("GET"))
            .respond_with(unavailable())
            .up_to_n_times(1)
            .expect(1)
            .mount(&up.news)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(headlines_body(2)))
            .expect(1)
            .mount(&up.news)
            .await;

        let mut config = up.config();
        config.retry = RetryConfig {
            max_attempts: 2,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
            jitter: false,
        };

        let articles = NewsApi::from_config(&config)
            .unwrap()
            .headlines()
            .await
            .unwrap();
        assert_eq!(articles.len(), 2);
    }

    #[tokio::test]
    async fn auth_failures_are_never_retried() {
        let up = Upstreams::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&up.openai)
            .await;

        let mut config = up.config();
        config.retry.max_attempts = 3;
        config.retry.initial_delay_ms = 1;

        let err = ScriptGenerator::from_config(&config)
            .unwrap()
            .complete("hello")
            .await
            .unwrap_err();

        assert_eq!(err.upstream().unwrap().kind, UpstreamErrorKind::Auth);
    }
}
