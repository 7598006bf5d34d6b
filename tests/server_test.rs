// Integration tests for the HTTP routes
//
// The router is driven with tower::ServiceExt::oneshot() against a fake
// assistant platform, so no network access is needed.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt; // provides .oneshot()

use safewalk::assistant::{
    AssistantClient, AssistantConfigurator, AssistantHandle, AssistantIdentity, AssistantUpdate,
    CallHandle, CallRequest,
};
use safewalk::persona::{PersonaKind, PersonaRegistry};
use safewalk::server::{create_router, AppState, CallThrottle, EXTERNAL_FAILURE_MESSAGE};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakePlatform {
    updates: Mutex<Vec<AssistantUpdate>>,
    calls: Mutex<Vec<CallRequest>>,
    fail_calls: bool,
    fail_updates: bool,
}

#[async_trait]
impl AssistantClient for FakePlatform {
    async fn get_assistant(&self, id: &str) -> anyhow::Result<AssistantHandle> {
        Ok(AssistantHandle {
            id: id.to_string(),
            name: None,
        })
    }

    async fn update_assistant(
        &self,
        id: &str,
        update: &AssistantUpdate,
    ) -> anyhow::Result<AssistantHandle> {
        if self.fail_updates {
            anyhow::bail!("Vapi update assistant request failed\n\nStatus: 503\nBody: down");
        }
        self.updates.lock().unwrap().push(update.clone());
        Ok(AssistantHandle {
            id: id.to_string(),
            name: None,
        })
    }

    async fn create_call(&self, request: &CallRequest) -> anyhow::Result<CallHandle> {
        if self.fail_calls {
            anyhow::bail!(
                "Vapi create call request failed\n\nStatus: 401\nBody: bad token sk-secret"
            );
        }
        self.calls.lock().unwrap().push(request.clone());
        Ok(CallHandle {
            id: "call_123".to_string(),
            status: Some("queued".to_string()),
        })
    }
}

struct Harness {
    router: Router,
    registry: Arc<PersonaRegistry>,
    platform: Arc<FakePlatform>,
}

fn harness_with(platform: FakePlatform, customize: impl FnOnce(AppState) -> AppState) -> Harness {
    let platform = Arc::new(platform);
    let registry = Arc::new(PersonaRegistry::builtin().expect("builtin personas"));
    let configurator = AssistantConfigurator::new(platform.clone());
    let state = AppState::new(
        registry.clone(),
        configurator,
        AssistantIdentity::new("asst_perm"),
        "phone_1",
    );
    Harness {
        router: create_router(Arc::new(customize(state))),
        registry,
        platform,
    }
}

fn harness() -> Harness {
    harness_with(FakePlatform::default(), |s| s)
}

async fn post_json(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    post_raw(router, path, body.to_string()).await
}

async fn post_raw(router: &Router, path: &str, body: String) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("failed to build request");

    let resp = router.clone().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("failed to read body");
    let json = serde_json::from_slice(&bytes).expect("response body is not valid JSON");
    (status, json)
}

async fn get_json(router: &Router, path: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request");
    let resp = router.clone().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("failed to read body");
    (status, serde_json::from_slice(&bytes).expect("invalid JSON"))
}

// ---------------------------------------------------------------------------
// /update_context
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_update_context_merges_into_persona() {
    let h = harness();
    let (status, body) = post_json(
        &h.router,
        "/update_context",
        json!({"context": "test", "voice": "dad"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Context received"}));

    let text = h.registry.resolve("dad").unwrap();
    assert!(text.ends_with("* Additional user context:\n- test"), "got: {text}");
}

#[tokio::test]
async fn test_update_context_missing_context() {
    let h = harness();
    let before = h.registry.resolve("dad").unwrap();

    let (status, body) = post_json(&h.router, "/update_context", json!({"voice": "dad"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No context provided"}));
    assert_eq!(h.registry.resolve("dad").unwrap(), before);
}

#[tokio::test]
async fn test_update_context_empty_string_is_missing() {
    let h = harness();
    let (status, body) =
        post_json(&h.router, "/update_context", json!({"context": "", "voice": "mom"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No context provided");
}

#[tokio::test]
async fn test_update_context_defaults_to_female_friend() {
    let h = harness();
    let (status, _) =
        post_json(&h.router, "/update_context", json!({"context": "on the tram"})).await;

    assert_eq!(status, StatusCode::OK);
    assert!(h.registry.resolve("female_friend").unwrap().ends_with("- on the tram"));
    assert!(!h.registry.resolve("mom").unwrap().contains("on the tram"));
}

#[tokio::test]
async fn test_update_context_custom_default_persona() {
    let h = harness_with(FakePlatform::default(), |s| s.with_default_persona("male_friend"));
    post_json(&h.router, "/update_context", json!({"context": "near the library"})).await;
    assert!(h.registry.resolve("male_friend").unwrap().contains("near the library"));
}

#[tokio::test]
async fn test_update_context_voice_is_case_insensitive() {
    let h = harness();
    let (status, _) = post_json(
        &h.router,
        "/update_context",
        json!({"context": "late shift", "voice": "MOM"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.registry.resolve("mom").unwrap().contains("late shift"));
}

#[tokio::test]
async fn test_update_context_unknown_voice_is_a_no_op() {
    let h = harness();
    let before: Vec<String> = PersonaKind::ALL
        .iter()
        .map(|k| h.registry.resolve(k.key()).unwrap())
        .collect();

    let (status, body) = post_json(
        &h.router,
        "/update_context",
        json!({"context": "hello", "voice": "grandpa"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Context received"}));
    let after: Vec<String> = PersonaKind::ALL
        .iter()
        .map(|k| h.registry.resolve(k.key()).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_update_context_rejects_oversized_fragment() {
    let h = harness();
    let huge = "x".repeat(h.registry.limits().max_fragment_chars + 1);
    let (status, body) =
        post_json(&h.router, "/update_context", json!({"context": huge, "voice": "dad"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid context fragment"));
}

#[tokio::test]
async fn test_update_context_invalid_json() {
    let h = harness();
    let (status, body) = post_raw(&h.router, "/update_context", "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid JSON body"}));
}

#[tokio::test]
async fn test_update_context_does_not_touch_assistant_by_default() {
    let h = harness();
    post_json(&h.router, "/update_context", json!({"context": "test", "voice": "dad"})).await;
    assert!(h.platform.updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_context_syncs_assistant_when_enabled() {
    let h = harness_with(FakePlatform::default(), |s| {
        s.with_sync("Do you want to get pizza?", "+12095550100")
    });
    let (status, _) = post_json(
        &h.router,
        "/update_context",
        json!({"context": "walking past the bar", "voice": "dad"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let updates = h.platform.updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].voice.voice_id, "chris");
    assert!(updates[0].model.messages[0].content.contains("walking past the bar"));
    assert!(updates[0].model.messages[0]
        .content
        .ends_with("if you hear Do you want to get pizza? use the 'transferCall' tool."));
}

#[tokio::test]
async fn test_failed_sync_leaves_persona_unchanged() {
    let platform = FakePlatform {
        fail_updates: true,
        ..Default::default()
    };
    let h = harness_with(platform, |s| s.with_sync("pizza?", "+12095550100"));
    let before = h.registry.resolve("dad").unwrap();

    // A client retrying after the 500 must not stack the fragment twice
    for _ in 0..2 {
        let (status, body) = post_json(
            &h.router,
            "/update_context",
            json!({"context": "walking past the bar", "voice": "dad"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": EXTERNAL_FAILURE_MESSAGE}));
    }

    assert_eq!(h.registry.resolve("dad").unwrap(), before);
}

#[tokio::test]
async fn test_sync_pushes_text_that_is_stored() {
    let h = harness_with(FakePlatform::default(), |s| s.with_sync("pizza?", "+12095550100"));
    let requests = (0..10).map(|i| {
        let router = h.router.clone();
        async move {
            post_json(
                &router,
                "/update_context",
                json!({"context": format!("stop-{i:02}"), "voice": "dad"}),
            )
            .await
        }
    });
    let results = futures::future::join_all(requests).await;
    assert!(results.iter().all(|(status, _)| *status == StatusCode::OK));

    let stored = h.registry.resolve("dad").unwrap();
    let updates = h.platform.updates.lock().unwrap();
    assert_eq!(updates.len(), 10);
    // The last push carries every fragment, not just its own
    let last = updates.last().unwrap();
    assert_eq!(last.metadata.context, stored);
    for i in 0..10 {
        assert!(last.metadata.context.contains(&format!("stop-{i:02}")));
    }
}

#[tokio::test]
async fn test_concurrent_updates_are_all_kept() {
    let h = harness();
    let requests = (0..20).map(|i| {
        let router = h.router.clone();
        async move {
            post_json(
                &router,
                "/update_context",
                json!({"context": format!("update-{i:02}"), "voice": "mom"}),
            )
            .await
        }
    });
    let results = futures::future::join_all(requests).await;
    assert!(results.iter().all(|(status, _)| *status == StatusCode::OK));

    let text = h.registry.resolve("mom").unwrap();
    for i in 0..20 {
        assert!(text.contains(&format!("update-{i:02}")), "update-{i:02} was lost");
    }
}

// ---------------------------------------------------------------------------
// /outbound_call
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_outbound_call_missing_number() {
    let h = harness();
    let (status, body) = post_json(&h.router, "/outbound_call", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No phone number provided"}));
    assert!(h.platform.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_outbound_call_success() {
    let h = harness();
    let (status, body) =
        post_json(&h.router, "/outbound_call", json!({"number": "+12095550100"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Call initiated", "call_id": "call_123"}));

    let calls = h.platform.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].assistant_id, "asst_perm");
    assert_eq!(calls[0].phone_number_id, "phone_1");
    assert_eq!(calls[0].customer.number, "+12095550100");
}

#[tokio::test]
async fn test_outbound_call_rejects_malformed_number() {
    let h = harness();
    let (status, body) =
        post_json(&h.router, "/outbound_call", json!({"number": "209-555-0100"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("E.164"));
    assert!(h.platform.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_outbound_call_platform_failure_is_generic_500() {
    let h = harness_with(
        FakePlatform {
            fail_calls: true,
            ..Default::default()
        },
        |s| s,
    );
    let (status, body) =
        post_json(&h.router, "/outbound_call", json!({"number": "+12095550100"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": EXTERNAL_FAILURE_MESSAGE}));
    assert!(!body.to_string().contains("sk-secret"));
}

#[tokio::test]
async fn test_outbound_call_throttled_per_number() {
    let h = harness_with(FakePlatform::default(), |s| {
        s.with_throttle(CallThrottle::new(2, Duration::from_secs(3600)))
    });

    for _ in 0..2 {
        let (status, _) =
            post_json(&h.router, "/outbound_call", json!({"number": "+12095550100"})).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) =
        post_json(&h.router, "/outbound_call", json!({"number": "+12095550100"})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({"error": "Call budget exhausted for this number"}));

    let (status, _) =
        post_json(&h.router, "/outbound_call", json!({"number": "+12095550199"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.platform.calls.lock().unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Auxiliary routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let h = harness();
    let (status, body) = get_json(&h.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_list_personas() {
    let h = harness();
    let (status, body) = get_json(&h.router, "/personas").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "personas": ["dad", "female_friend", "male_friend", "mom"],
            "default": "female_friend"
        })
    );
}
