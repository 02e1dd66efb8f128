// Resilient fetch layer and snippet client driven through a scripted transport
use std::sync::Mutex;

use snipshare::device::SharedConnectivity;
use snipshare::error::SnapError;
use snipshare::net::{
    ApiRequest, ApiResponse, HttpMethod, HttpTransport, ResilientFetcher, SESSION_COOKIE,
    SnippetClient, SnippetPatch,
};
use snipshare::status::{StatusReporter, codes};
use tokio::time::{Duration, Instant};

/// Replays scripted responses and records every request with its send time.
/// With a watched reporter it also records the status visible at each send.
struct RecordingTransport {
    script: Mutex<Vec<ApiResponse>>,
    fallback: ApiResponse,
    sent: Mutex<Vec<(ApiRequest, Instant)>>,
    watched: Option<StatusReporter>,
    seen_status: Mutex<Vec<String>>,
}

impl RecordingTransport {
    fn new(mut script: Vec<ApiResponse>, fallback: ApiResponse) -> Self {
        script.reverse();
        Self {
            script: Mutex::new(script),
            fallback,
            sent: Mutex::new(Vec::new()),
            watched: None,
            seen_status: Mutex::new(Vec::new()),
        }
    }

    fn watching(mut self, status: StatusReporter) -> Self {
        self.watched = Some(status);
        self
    }

    fn seen_status(&self) -> Vec<String> {
        self.seen_status.lock().unwrap().clone()
    }

    fn always(response: ApiResponse) -> Self {
        Self::new(Vec::new(), response)
    }

    fn requests(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }

    fn send_times(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

impl HttpTransport for RecordingTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SnapError> {
        if let Some(status) = &self.watched {
            self.seen_status.lock().unwrap().push(status.current());
        }
        self.sent.lock().unwrap().push((request, Instant::now()));
        let next = self.script.lock().unwrap().pop();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

fn fetcher(
    transport: RecordingTransport,
    online: bool,
) -> ResilientFetcher<RecordingTransport, SharedConnectivity> {
    ResilientFetcher::new(transport, SharedConnectivity::new(online), StatusReporter::new())
}

#[tokio::test(start_paused = true)]
async fn persistent_429_makes_n_plus_one_attempts_with_linear_spacing() {
    for max_retries in 0..=3u32 {
        let f = fetcher(RecordingTransport::always(ApiResponse::new(429, "{}")), true);
        let result: Result<serde_json::Value, _> =
            f.request(ApiRequest::get("https://api.test/x"), max_retries).await;

        assert!(matches!(result, Err(SnapError::TooManyRequests)));
        assert_eq!(f.status().current(), codes::TOO_MANY_REQUESTS);

        let times = f.transport().send_times();
        assert_eq!(times.len() as u32, max_retries + 1);
        for (k, pair) in times.windows(2).enumerate() {
            let gap = pair[1] - pair[0];
            assert_eq!(gap, Duration::from_millis(1000 * (k as u64 + 1)));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn rate_limit_then_success_clears_status() {
    let transport = RecordingTransport::new(
        vec![ApiResponse::new(429, "{}")],
        ApiResponse::new(200, r#"{"id":"s1"}"#),
    );
    let f = fetcher(transport, true);
    let body: serde_json::Value = f
        .request(ApiRequest::get("https://api.test/x"), 2)
        .await
        .expect("second attempt succeeds");

    assert_eq!(body["id"], "s1");
    assert_eq!(f.status().current(), "");
    assert_eq!(f.transport().requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn first_attempt_shows_loading_and_retries_show_retrying() {
    let status = StatusReporter::new();
    let transport = RecordingTransport::new(
        vec![ApiResponse::new(429, "{}")],
        ApiResponse::new(200, r#"{"id":"s1"}"#),
    )
    .watching(status.clone());
    let f = ResilientFetcher::new(transport, SharedConnectivity::new(true), status);
    let _: serde_json::Value = f
        .request(ApiRequest::get("https://api.test/x"), 2)
        .await
        .expect("retry succeeds");

    assert_eq!(
        f.transport().seen_status(),
        vec![codes::LOADING.to_string(), codes::RETRYING_REQUEST.to_string()]
    );
    assert_eq!(f.status().current(), "");
}

#[tokio::test(start_paused = true)]
async fn offline_request_never_reaches_transport() {
    let f = fetcher(RecordingTransport::always(ApiResponse::new(200, "{}")), false);
    let result: Result<serde_json::Value, _> =
        f.request(ApiRequest::get("https://api.test/x"), 2).await;

    assert!(matches!(result, Err(SnapError::Offline)));
    assert_eq!(f.status().current(), codes::OFFLINE);
    assert!(f.transport().requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn default_json_headers_are_sent() {
    let f = fetcher(RecordingTransport::always(ApiResponse::new(200, "{}")), true);
    let request = ApiRequest::get("https://api.test/x").with_header("accept", "text/plain");
    let _: serde_json::Value = f.request(request, 0).await.expect("request succeeds");

    let sent = f.transport().requests();
    assert_eq!(sent[0].header("content-type"), Some("application/json"));
    assert_eq!(sent[0].header("Accept"), Some("text/plain"));
}

fn client(transport: RecordingTransport) -> SnippetClient<RecordingTransport, SharedConnectivity> {
    SnippetClient::new(fetcher(transport, true), "https://api.test/")
}

#[tokio::test(start_paused = true)]
async fn snippet_lifecycle_hits_the_snippets_endpoint() {
    let transport = RecordingTransport::new(
        vec![
            ApiResponse::new(200, r#"{"id":"s1","title":null}"#),
            ApiResponse::new(200, r#"{"id":"s1","title":"Hello"}"#),
            ApiResponse::new(200, r#"{"id":"s1"}"#),
        ],
        ApiResponse::new(500, "{}"),
    );
    let client = client(transport);

    let created = client.create_snippet(3).await.expect("create");
    assert_eq!(created.id, "s1");

    let patch = SnippetPatch {
        title: Some("  Hello  ".to_string()),
        ..Default::default()
    };
    let updated = client.update_snippet("s1", &patch).await.expect("update");
    assert_eq!(updated.fields["title"], "Hello");

    let deleted = client.delete_snippet("s1").await.expect("delete");
    assert_eq!(deleted.id, "s1");

    let sent = client.fetcher().transport().requests();
    assert_eq!(sent.len(), 3);

    assert_eq!(sent[0].method, HttpMethod::Post);
    assert_eq!(sent[0].url, "https://api.test/api/snippets");
    let create_body: serde_json::Value =
        serde_json::from_str(sent[0].body.as_deref().expect("create body")).expect("json");
    assert_eq!(create_body["snippetCount"], 3);

    assert_eq!(sent[1].method, HttpMethod::Patch);
    let update_body: serde_json::Value =
        serde_json::from_str(sent[1].body.as_deref().expect("update body")).expect("json");
    assert_eq!(update_body["id"], "s1");
    assert_eq!(update_body["title"], "Hello");
    assert!(update_body["updatedAt"].is_string());

    assert_eq!(sent[2].method, HttpMethod::Delete);
    assert_eq!(sent[2].url, "https://api.test/api/snippets?id=s1");
}

#[tokio::test(start_paused = true)]
async fn session_cookie_is_sent_with_every_snippet_request() {
    let transport = RecordingTransport::always(ApiResponse::new(200, r#"{"id":"s1"}"#));
    let client = client(transport).with_session("  tok-123  ");
    assert!(client.has_session());

    client.create_snippet(0).await.expect("create");
    client
        .update_snippet("s1", &SnippetPatch::default())
        .await
        .expect("update");
    client.delete_snippet("s1").await.expect("delete");

    let expected = format!("{SESSION_COOKIE}=tok-123");
    let sent = client.fetcher().transport().requests();
    assert_eq!(sent.len(), 3);
    for request in &sent {
        assert_eq!(request.header("cookie"), Some(expected.as_str()));
        assert_eq!(request.header("content-type"), Some("application/json"));
    }
}

#[tokio::test(start_paused = true)]
async fn blank_session_sends_no_cookie() {
    let transport = RecordingTransport::always(ApiResponse::new(200, r#"{"id":"s1"}"#));
    let client = client(transport).with_session("   ");
    assert!(!client.has_session());

    client.create_snippet(0).await.expect("create");
    let sent = client.fetcher().transport().requests();
    assert_eq!(sent[0].header("cookie"), None);
}

#[tokio::test(start_paused = true)]
async fn server_error_code_is_rethrown_by_client() {
    let client = client(RecordingTransport::always(ApiResponse::new(
        403,
        r#"{"code":"SNIPPET_LIMIT_REACHED"}"#,
    )));
    let err = client.create_snippet(10).await.expect_err("limit reached");

    assert_eq!(err.code(), "SNIPPET_LIMIT_REACHED");
    assert_eq!(client.fetcher().status().current(), "SNIPPET_LIMIT_REACHED");
}
