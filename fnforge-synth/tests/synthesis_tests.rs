//! End-to-end synthesis with scripted and HTTP oracles

use fnforge_cache::{FileStore, MemoCache};
use fnforge_synth::config::OracleConfig;
use fnforge_synth::{
    CachedOracle, Conversation, OpenAiOracle, Oracle, OracleError, ScriptedOracle,
    SynthError, SynthesisRequest, Synthesizer, TestCase,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIME_REPLY: &str = r#"Let's think step by step. A prime has exactly two divisors.

```javascript
function f(x) {
  if (x < 2) return false;
  for (let i = 2; i * i <= x; i++) {
    if (x % i === 0) return false;
  }
  return true;
}
```"#;

fn prime_request(iterations: u32) -> SynthesisRequest {
    SynthesisRequest::new(
        "determine if prime",
        vec![
            TestCase::new(json!(1), json!(false)),
            TestCase::new(json!(2), json!(true)),
            TestCase::new(json!(4), json!(false)),
        ],
        iterations,
    )
}

#[tokio::test]
async fn test_prime_scenario() {
    let oracle = Arc::new(ScriptedOracle::new([PRIME_REPLY]));
    let synthesizer = Synthesizer::new(oracle.clone());

    let f = synthesizer.synthesize(prime_request(2)).await.unwrap();
    assert_eq!(f.call(&json!(53)).unwrap(), json!(true));
    assert_eq!(f.call(&json!(44)).unwrap(), json!(false));
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_prime_scenario_exhausted() {
    let wrong = "```\nfunction f(x) { return x % 2 === 0 }\n```";
    let oracle = Arc::new(ScriptedOracle::new([wrong, wrong]));
    let synthesizer = Synthesizer::new(oracle.clone());

    match synthesizer.synthesize(prime_request(2)).await {
        Err(SynthError::Exhausted {
            iterations,
            transcript,
        }) => {
            assert_eq!(iterations, 2);
            assert_eq!(transcript.oracle_turns(), 2);
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn test_function_is_shareable() {
    let oracle = Arc::new(ScriptedOracle::new([PRIME_REPLY]));
    let f = Synthesizer::new(oracle)
        .synthesize(prime_request(1))
        .await
        .unwrap();

    let handles: Vec<_> = [7, 9, 11]
        .into_iter()
        .map(|n| {
            let f = f.clone();
            std::thread::spawn(move || f.call(&json!(n)).unwrap())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, vec![json!(true), json!(false), json!(true)]);
}

#[tokio::test]
async fn test_cached_run_replays_without_oracle() {
    let dir = TempDir::new().unwrap();

    let first = Arc::new(ScriptedOracle::new([PRIME_REPLY]));
    {
        let cache = Arc::new(MemoCache::open("chat", Arc::new(FileStore::new(dir.path()))).await);
        let oracle = Arc::new(CachedOracle::new(first.clone(), cache));
        Synthesizer::new(oracle)
            .synthesize(prime_request(2))
            .await
            .unwrap();
    }
    assert_eq!(first.calls(), 1);

    let second = Arc::new(ScriptedOracle::new(Vec::<String>::new()));
    let cache = Arc::new(MemoCache::open("chat", Arc::new(FileStore::new(dir.path()))).await);
    let oracle = Arc::new(CachedOracle::new(second.clone(), cache.clone()));
    let f = Synthesizer::new(oracle)
        .synthesize(prime_request(2))
        .await
        .unwrap();

    assert_eq!(second.calls(), 0);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(f.call(&json!(97)).unwrap(), json!(true));
}

fn openai_config(server: &MockServer) -> OracleConfig {
    OracleConfig {
        base_url: format!("{}/v1", server.uri()),
        api_key: Some("test-key".to_string()),
        ..OracleConfig::default()
    }
}

#[tokio::test]
async fn test_openai_oracle_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "```\nconst f = x => x\n```"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let oracle = OpenAiOracle::new(&openai_config(&server)).unwrap();
    let reply = oracle.complete(&Conversation::new("hello")).await.unwrap();
    assert_eq!(reply.content, "```\nconst f = x => x\n```");
}

#[tokio::test]
async fn test_openai_oracle_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let oracle = OpenAiOracle::new(&openai_config(&server)).unwrap();
    match oracle.complete(&Conversation::new("hello")).await {
        Err(OracleError::Status { status, body }) => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected {:?}", other),
    }

    let synthesizer = Synthesizer::new(Arc::new(oracle));
    assert!(matches!(
        synthesizer.synthesize(prime_request(3)).await,
        Err(SynthError::Oracle(OracleError::Status { status: 429, .. }))
    ));
}

#[tokio::test]
async fn test_openai_oracle_missing_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let oracle = OpenAiOracle::new(&openai_config(&server)).unwrap();
    assert!(matches!(
        oracle.complete(&Conversation::new("hello")).await,
        Err(OracleError::MalformedResponse(_))
    ));
}
