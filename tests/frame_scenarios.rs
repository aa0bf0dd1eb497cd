//! End-to-end scenarios: a mock host, the real Neynar client against a
//! wiremock server, and the frame controller in between.

use castframe::feeds::neynar::NeynarFetcher;
use castframe::feeds::poller::FeedPoller;
use castframe::feeds::FetchOutcome;
use castframe::session::mock::{HostCall, MockDiscovery, MockHost};
use castframe::session::{FrameController, FrameSettings, SessionState};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cast(hash: &str, timestamp: &str) -> serde_json::Value {
    serde_json::json!({
        "hash": hash,
        "text": format!("cast {}", hash),
        "timestamp": timestamp,
        "author": { "username": hash.to_lowercase(), "display_name": format!("User {}", hash) }
    })
}

async fn controller_against(server: &MockServer, host: Arc<MockHost>) -> FrameController {
    let fetcher = Arc::new(NeynarFetcher::with_base_url(
        "test-key".to_string(),
        server.uri(),
    ));
    FrameController::new(
        host,
        Arc::new(MockDiscovery::default()),
        FeedPoller::new(fetcher),
        FrameSettings {
            poll_interval: Duration::from_secs(15),
            batch_size: 25,
            context_timeout: Some(Duration::from_secs(5)),
        },
    )
}

async fn first_outcome(controller: &mut FrameController) -> FetchOutcome {
    controller.mount();
    tokio::time::timeout(Duration::from_secs(5), async {
        while controller.casts().outcome().is_none() {
            controller.pump().await;
        }
    })
    .await
    .expect("no feed outcome within 5s");
    controller.casts().outcome().cloned().unwrap()
}

#[tokio::test]
async fn test_casts_displayed_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/farcaster/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "casts": [
                cast("A", "2024-01-01T00:00:03Z"),
                cast("B", "2024-01-01T00:00:01Z"),
                cast("C", "2024-01-01T00:00:02Z"),
            ]
        })))
        .mount(&server)
        .await;

    let mut controller = controller_against(&server, Arc::new(MockHost::with_added(true))).await;

    match first_outcome(&mut controller).await {
        FetchOutcome::Success(snapshot) => {
            let order: Vec<_> = snapshot.items().iter().map(|c| c.hash.as_str()).collect();
            assert_eq!(order, vec!["A", "C", "B"]);
        }
        other => panic!("expected casts, got {:?}", other),
    }
}

#[tokio::test]
async fn test_api_error_is_displayed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/farcaster/feed"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(serde_json::json!({ "message": "unavailable" })),
        )
        .mount(&server)
        .await;

    let mut controller = controller_against(&server, Arc::new(MockHost::with_added(true))).await;

    assert_eq!(
        first_outcome(&mut controller).await,
        FetchOutcome::Failure("API Error: 503 - unavailable".to_string())
    );
    assert!(controller.is_ready());
}

#[tokio::test]
async fn test_unadded_frame_requests_add_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "casts": [] })))
        .mount(&server)
        .await;

    let host = Arc::new(MockHost::with_added(false));
    let mut controller = controller_against(&server, host.clone()).await;

    controller.mount();
    controller.mount();
    while !controller.is_ready() {
        controller.pump().await;
    }
    assert_eq!(host.add_frame_calls(), 1);
    let calls = host.calls();
    let add = calls.iter().position(|c| matches!(c, HostCall::AddFrame));
    let ready = calls.iter().position(|c| matches!(c, HostCall::Ready(_)));
    assert!(add.is_some() && add < ready);

    while controller.add_frame_result().is_none() || controller.casts().outcome().is_none() {
        controller.pump().await;
    }

    assert_eq!(controller.state(), &SessionState::Ready);
    assert_eq!(host.add_frame_calls(), 1);
    assert_eq!(host.registered(), 6);
}

#[tokio::test]
async fn test_unmount_leaves_no_listeners() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "casts": [] })))
        .mount(&server)
        .await;

    let host = Arc::new(MockHost::with_added(true));
    let mut controller = controller_against(&server, host.clone()).await;
    first_outcome(&mut controller).await;

    controller.unmount();

    assert_eq!(host.registered(), 6);
    assert_eq!(host.deregistered(), 6);
    assert_eq!(host.active_listeners(), 0);
}
