//! Admission limits and per-conversation serialization under load.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use tokio::task::JoinSet;

use common::*;

fn chat(id: &str) -> String {
    json!({ "message": "hi", "conversation_id": id }).to_string()
}

#[tokio::test]
async fn fifth_call_is_refused_while_four_are_running() {
    let backend = Arc::new(BlockingBackend::default());
    let app = test_app(backend.clone(), "");

    let mut running = JoinSet::new();
    for i in 0..4 {
        let router = app.router.clone();
        running.spawn(async move { post_chat(&router, &chat(&format!("c{}", i)), None).await });
    }
    wait_until(|| backend.entered.load(Ordering::SeqCst) == 4).await;
    assert_eq!(app.dispatcher.admission().in_flight(), 4);

    let (status, body) = post_chat(&app.router, &chat("c4"), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "server busy");
    assert_eq!(backend.entered.load(Ordering::SeqCst), 4);

    backend.release();
    while let Some(result) = running.join_next().await {
        let (status, _) = result.unwrap();
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(app.dispatcher.admission().in_flight(), 0);

    let (status, _) = post_chat(&app.router, &chat("c4"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refused_call_takes_no_session_lock() {
    let backend = Arc::new(BlockingBackend::default());
    let app = test_app(backend.clone(), "");

    let mut running = JoinSet::new();
    for i in 0..4 {
        let router = app.router.clone();
        running.spawn(async move { post_chat(&router, &chat(&format!("c{}", i)), None).await });
    }
    wait_until(|| backend.entered.load(Ordering::SeqCst) == 4).await;

    let (status, _) = post_chat(&app.router, &chat("fresh"), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.dispatcher.sessions().len(), 4);

    backend.release();
    while running.join_next().await.is_some() {}
    assert!(app.dispatcher.sessions().is_empty());
}

#[tokio::test]
async fn same_conversation_never_overlaps() {
    let backend = Arc::new(TrackingBackend::new(Duration::from_millis(30)));
    let app = test_app(backend.clone(), "");

    let mut running = JoinSet::new();
    for _ in 0..3 {
        let router = app.router.clone();
        running.spawn(async move { post_chat(&router, &chat("shared"), None).await });
    }
    while let Some(result) = running.join_next().await {
        let (status, _) = result.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(backend.seen().len(), 3);
    assert_eq!(backend.max_for("http:shared"), 1);
}

#[tokio::test]
async fn distinct_conversations_run_in_parallel() {
    let backend = Arc::new(TrackingBackend::new(Duration::from_millis(100)));
    let app = test_app(backend.clone(), "");

    let mut running = JoinSet::new();
    for i in 0..4 {
        let router = app.router.clone();
        running.spawn(async move { post_chat(&router, &chat(&format!("p{}", i)), None).await });
    }
    while let Some(result) = running.join_next().await {
        assert_eq!(result.unwrap().0, StatusCode::OK);
    }

    assert!(backend.max_running() > 1);
    for i in 0..4 {
        assert_eq!(backend.max_for(&format!("http:p{}", i)), 1);
    }
}

#[tokio::test]
async fn omitted_ids_share_the_default_conversation() {
    let backend = Arc::new(TrackingBackend::new(Duration::from_millis(30)));
    let app = test_app(backend.clone(), "");

    let mut running = JoinSet::new();
    for payload in [r#"{"message":"a"}"#, r#"{"message":"b","conversation_id":""}"#] {
        let router = app.router.clone();
        running.spawn(async move { post_chat(&router, payload, None).await });
    }
    while let Some(result) = running.join_next().await {
        let (status, body) = result.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["conversation_id"], "default");
    }

    assert_eq!(backend.seen(), vec!["http:default", "http:default"]);
    assert_eq!(backend.max_for("http:default"), 1);
}

#[tokio::test]
async fn waiters_on_one_conversation_hold_admission_slots() {
    let backend = Arc::new(BlockingBackend::default());
    let app = test_app(backend.clone(), "");

    // One call runs, three queue behind it on the same lock.
    let mut running = JoinSet::new();
    for _ in 0..4 {
        let router = app.router.clone();
        running.spawn(async move { post_chat(&router, &chat("busy"), None).await });
    }
    wait_until(|| app.dispatcher.admission().in_flight() == 4).await;
    assert_eq!(backend.entered.load(Ordering::SeqCst), 1);

    let (status, _) = post_chat(&app.router, &chat("other"), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    backend.release();
    while let Some(result) = running.join_next().await {
        assert_eq!(result.unwrap().0, StatusCode::OK);
    }
    assert_eq!(backend.entered.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn disconnected_client_keeps_resources_until_call_ends() {
    let backend = Arc::new(BlockingBackend::default());
    let app = test_app(backend.clone(), "");

    let router = app.router.clone();
    let client = tokio::spawn(async move { post_chat(&router, &chat("gone"), None).await });
    wait_until(|| backend.entered.load(Ordering::SeqCst) == 1).await;

    client.abort();
    assert!(client.await.unwrap_err().is_cancelled());

    // The call is still running on its own task and owns both resources.
    assert_eq!(app.dispatcher.admission().in_flight(), 1);
    assert_eq!(app.dispatcher.sessions().len(), 1);

    backend.release();
    wait_until(|| app.dispatcher.admission().in_flight() == 0).await;
    wait_until(|| app.dispatcher.sessions().is_empty()).await;
}
