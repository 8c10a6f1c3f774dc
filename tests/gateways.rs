use std::time::Duration;

use async_openai::config::OpenAIConfig;
use chatrpg::error::Error;
use chatrpg::gateway::{
    CompletionClient, Embedder, ImageGenerator, JobHandle, JobStatus, OpenAICompletion,
    OpenAIEmbedder, PollPolicy, ScenarioClient, SkyboxClient, SkyboxStyle, generate,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(5),
        max_attempts: 10,
        timeout: None,
    }
}

#[tokio::test]
async fn skybox_is_submitted_then_polled() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/skybox"))
        .and(header("x-api-key", "blockade-key"))
        .and(body_string_contains("skybox_style_id=2"))
        .and(body_string_contains("prompt=A+ruined+temple"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4242,
            "status": "pending",
            "file_url": "",
            "thumb_url": "",
            "depth_map_url": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/imagine/requests/4242"))
        .and(header("x-api-key", "blockade-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request": {
                "id": 4242,
                "status": "complete",
                "file_url": "https://cdn/temple.jpg",
                "thumb_url": "https://cdn/temple_thumb.jpg",
                "depth_map_url": "https://cdn/temple_depth.jpg"
            }
        })))
        .mount(&server)
        .await;

    let client = SkyboxClient::new(
        reqwest::Client::new(),
        server.uri(),
        "blockade-key",
        SkyboxStyle::FantasyLand,
    );
    assert_eq!(client.model_id(), "FANTASY_LAND");

    let image = generate(&client, "A ruined temple", &fast_policy(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(image.file_url, "https://cdn/temple.jpg");
    assert_eq!(image.thumb_url.as_deref(), Some("https://cdn/temple_thumb.jpg"));
    assert_eq!(image.depth_map_url.as_deref(), Some("https://cdn/temple_depth.jpg"));
}

#[tokio::test]
async fn skybox_error_status_is_a_failed_job() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/imagine/requests/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request": { "id": 7, "status": "error", "error_message": "prompt rejected" }
        })))
        .mount(&server)
        .await;

    let client = SkyboxClient::new(reqwest::Client::new(), server.uri(), "k", SkyboxStyle::DigitalPainting);
    let status = client.status(&JobHandle("7".to_string())).await.unwrap();

    assert_eq!(status, JobStatus::Failed("prompt rejected".to_string()));
}

#[tokio::test]
async fn non_success_status_is_an_upstream_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/skybox"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let client = SkyboxClient::new(reqwest::Client::new(), server.uri(), "bad", SkyboxStyle::FantasyLand);
    let err = client.submit("anything").await.unwrap_err();

    match err {
        Error::Upstream(msg) => {
            assert!(msg.contains("401"));
            assert!(msg.contains("invalid api key"));
        }
        other => panic!("expected an upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn garbage_body_is_an_upstream_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/imagine/requests/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = SkyboxClient::new(reqwest::Client::new(), server.uri(), "k", SkyboxStyle::FantasyLand);
    let err = client.status(&JobHandle("1".to_string())).await.unwrap_err();

    assert!(matches!(err, Error::Upstream(ref msg) if msg.contains("malformed")));
}

#[tokio::test]
async fn portrait_inference_is_polled_until_it_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/model-7/inferences"))
        .and(header("Authorization", "Basic scenario-key"))
        .and(body_partial_json(json!({
            "parameters": {
                "prompt": "A grizzled dwarf",
                "type": "txt2img",
                "width": 512,
                "height": 512,
                "numInferenceSteps": 30,
                "numSamples": 1,
                "enableSafetyCheck": false
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inference": { "id": "inf-1", "modelId": "model-7", "status": "queued", "images": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/models/model-7/inferences/inf-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inference": {
                "id": "inf-1",
                "modelId": "model-7",
                "status": "succeeded",
                "images": [{ "id": "img-1", "url": "https://cdn/dwarf.png" }]
            }
        })))
        .mount(&server)
        .await;

    let client = ScenarioClient::new(reqwest::Client::new(), server.uri(), "scenario-key", "model-7");
    let image = generate(&client, "A grizzled dwarf", &fast_policy(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(image.file_url, "https://cdn/dwarf.png");
    assert_eq!(image.thumb_url, None);
}

#[tokio::test]
async fn failed_inference_stops_without_more_polls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/m/inferences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inference": { "id": "inf-2", "status": "in-progress" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/models/m/inferences/inf-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inference": { "id": "inf-2", "status": "failed", "images": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ScenarioClient::new(reqwest::Client::new(), server.uri(), "k", "m");
    let err = generate(&client, "anything", &fast_policy(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Upstream(_)));
}

#[tokio::test]
async fn completion_returns_the_first_choice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "<ROOM_NAME>Tavern</ROOM_NAME>" },
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let config = OpenAIConfig::new()
        .with_api_base(server.uri())
        .with_api_key("sk-test");
    let client = OpenAICompletion::with_config(config);

    let text = client.complete("Narrate.", "gpt-4o-mini", 256).await.unwrap();
    assert_eq!(text, "<ROOM_NAME>Tavern</ROOM_NAME>");
}

#[tokio::test]
async fn embedding_with_wrong_dimensions_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "model": "text-embedding-ada-002",
            "data": [{ "object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3] }],
            "usage": { "prompt_tokens": 3, "total_tokens": 3 }
        })))
        .mount(&server)
        .await;

    let config = || {
        OpenAIConfig::new()
            .with_api_base(server.uri())
            .with_api_key("sk-test")
    };

    let embedder = OpenAIEmbedder::with_config(config(), "text-embedding-ada-002", 3);
    assert_eq!(embedder.embed("a dwarf").await.unwrap(), vec![0.1, 0.2, 0.3]);

    let embedder = OpenAIEmbedder::with_config(config(), "text-embedding-ada-002", 1536);
    let err = embedder.embed("a dwarf").await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
}
