//! Integration tests against a stub tracking backend.

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use jobfeed_signals::{
    Capabilities, Config, ControlAction, FeedbackSurface, ManualClock, PageContext, PageEvent,
    PreferenceControl, ReportOutcome, SessionBuilder, Toast, TrackedItem,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// A request captured by the stub backend.
#[derive(Debug, Clone)]
struct Captured {
    csrf_token: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Backend {
    views: Arc<Mutex<Vec<Captured>>>,
    preferences: Arc<Mutex<Vec<Captured>>>,
    preference_reply: (StatusCode, String),
}

fn capture(headers: &HeaderMap, body: Value) -> Captured {
    Captured {
        csrf_token: headers
            .get("x-csrftoken")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    }
}

async fn track_view(State(backend): State<Backend>, headers: HeaderMap, Json(body): Json<Value>) {
    backend.views.lock().unwrap().push(capture(&headers, body));
}

async fn track_preference(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, [(axum::http::HeaderName, &'static str); 1], String) {
    backend.preferences.lock().unwrap().push(capture(&headers, body));
    let (status, reply) = backend.preference_reply.clone();
    (status, [(CONTENT_TYPE, "application/json")], reply)
}

async fn start_backend(preference_reply: (StatusCode, &str)) -> (SocketAddr, Backend) {
    let backend = Backend {
        views: Arc::default(),
        preferences: Arc::default(),
        preference_reply: (preference_reply.0, preference_reply.1.to_string()),
    };

    let app = Router::new()
        .route("/jobs/api/track-view/", post(track_view))
        .route("/jobs/api/track-preference/", post(track_preference))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub backend");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, backend)
}

#[derive(Default)]
struct ToastCounter {
    shown: Mutex<Vec<String>>,
}

impl FeedbackSurface for ToastCounter {
    fn show_toast(&self, toast: &Toast) {
        self.shown.lock().unwrap().push(toast.message.clone());
    }
    fn begin_toast_exit(&self, _toast: &Toast) {}
    fn remove_toast(&self, _toast: &Toast) {}
    fn fade_card(&self, _job_id: &str) {}
    fn remove_card(&self, _job_id: &str) {}
}

fn page(addr: SocketAddr, query: &str, item: Option<&str>) -> PageContext {
    PageContext::new(
        &format!("http://{addr}/jobs/42/{query}"),
        "sessionid=s1; csrftoken=abc123",
        TrackedItem::from_attribute(item),
    )
    .expect("valid page")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_beacon_delivers_view_after_page_is_gone() {
    let (addr, backend) = start_backend((StatusCode::OK, r#"{"success": true}"#)).await;
    let clock = Arc::new(ManualClock::default());

    let (mut session, delivery) = SessionBuilder::new(page(addr, "", Some("42")), Config::default())
        .capabilities(Capabilities::new(true))
        .clock(clock.clone())
        .build(Arc::new(ToastCounter::default()), tokio::runtime::Handle::current())
        .expect("session");

    session.start();
    clock.advance_ms(125_000);
    session.dispatch(PageEvent::Unload);
    drop(session);

    tokio::task::spawn_blocking(move || delivery.shutdown())
        .await
        .expect("shutdown");

    let views = backend.views.lock().unwrap().clone();
    assert_eq!(views.len(), 1);
    assert_eq!(
        views[0].body,
        json!({"job_id": "42", "time_spent_seconds": 125, "source": "direct"})
    );
    // Beacons cannot carry custom headers.
    assert_eq!(views[0].csrf_token, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_keepalive_fallback_reports_hidden_and_unload() {
    let (addr, backend) = start_backend((StatusCode::OK, r#"{"success": true}"#)).await;
    let clock = Arc::new(ManualClock::default());

    let (mut session, delivery) =
        SessionBuilder::new(page(addr, "?source=email", Some("42")), Config::default())
            .capabilities(Capabilities::new(false))
            .clock(clock.clone())
            .build(Arc::new(ToastCounter::default()), tokio::runtime::Handle::current())
            .expect("session");

    session.start();
    clock.advance_ms(9_800);
    session.dispatch(PageEvent::hidden());
    clock.advance_ms(100);
    session.dispatch(PageEvent::Unload);

    tokio::task::spawn_blocking(move || delivery.shutdown())
        .await
        .expect("shutdown");

    let views = backend.views.lock().unwrap().clone();
    assert_eq!(views.len(), 2);
    for view in &views {
        assert_eq!(
            view.body,
            json!({"job_id": "42", "time_spent_seconds": 9, "source": "email"})
        );
        assert_eq!(view.csrf_token.as_deref(), Some("abc123"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_short_visit_sends_nothing() {
    let (addr, backend) = start_backend((StatusCode::OK, r#"{"success": true}"#)).await;
    let clock = Arc::new(ManualClock::default());

    let (mut session, delivery) = SessionBuilder::new(page(addr, "", Some("42")), Config::default())
        .capabilities(Capabilities::new(true))
        .clock(clock.clone())
        .build(Arc::new(ToastCounter::default()), tokio::runtime::Handle::current())
        .expect("session");

    session.start();
    clock.advance_ms(2_999);
    session.dispatch(PageEvent::Unload);

    tokio::task::spawn_blocking(move || delivery.shutdown())
        .await
        .expect("shutdown");
    assert!(backend.views.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_acknowledged_preference_shows_toast() {
    let (addr, backend) = start_backend((
        StatusCode::OK,
        r#"{"success": true, "action": "created", "preference_type": "saved"}"#,
    ))
    .await;
    let surface = Arc::new(ToastCounter::default());

    // No tracked job on this page: preferences still work.
    let (mut session, _delivery) = SessionBuilder::new(page(addr, "", None), Config::default())
        .build(surface.clone(), tokio::runtime::Handle::current())
        .expect("session");
    assert!(!session.start());

    session.dispatch(PageEvent::Control(PreferenceControl::new(
        ControlAction::Save,
        "7",
    )));
    assert_eq!(session.settle().await, vec![ReportOutcome::Confirmed]);

    let preferences = backend.preferences.lock().unwrap().clone();
    assert_eq!(preferences.len(), 1);
    assert_eq!(
        preferences[0].body,
        json!({"job_id": "7", "preference_type": "saved"})
    );
    assert_eq!(preferences[0].csrf_token.as_deref(), Some("abc123"));
    assert_eq!(
        *surface.shown.lock().unwrap(),
        vec!["Job saved! We'll show you more like this.".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_error_body_is_declined_without_toast() {
    let (addr, _backend) =
        start_backend((StatusCode::BAD_REQUEST, r#"{"error": "Invalid data"}"#)).await;
    let surface = Arc::new(ToastCounter::default());

    let (mut session, _delivery) = SessionBuilder::new(page(addr, "", Some("42")), Config::default())
        .build(surface.clone(), tokio::runtime::Handle::current())
        .expect("session");
    session.start();

    session.dispatch(PageEvent::Control(PreferenceControl::new(
        ControlAction::Ignore,
        "9",
    )));
    assert_eq!(session.settle().await, vec![ReportOutcome::Declined]);
    assert!(surface.shown.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_reply_fails_without_toast() {
    let (addr, _backend) = start_backend((StatusCode::OK, "<html>oops</html>")).await;
    let surface = Arc::new(ToastCounter::default());

    let (mut session, _delivery) = SessionBuilder::new(page(addr, "", Some("42")), Config::default())
        .build(surface.clone(), tokio::runtime::Handle::current())
        .expect("session");
    session.start();

    session.dispatch(PageEvent::Control(PreferenceControl::new(
        ControlAction::Reject,
        "9",
    )));
    assert_eq!(session.settle().await, vec![ReportOutcome::Failed]);
    assert!(surface.shown.lock().unwrap().is_empty());
}
