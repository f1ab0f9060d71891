use anyhow::Result;
use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::build_router_with_store;
use crate::config::Config;
use crate::pixel::TRANSPARENT_PIXEL_PNG;
use crate::store::TrackingStore;

fn test_app() -> (Router, TrackingStore) {
    let store = TrackingStore::open(None).expect("in-memory store");
    let app = build_router_with_store(Config::for_tests(), store.clone());
    (app, store)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn read_json(response: axum::response::Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

async fn read_text(response: axum::response::Response) -> Result<String> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[tokio::test]
async fn healthz_route_returns_ok() -> Result<()> {
    let (app, _store) = test_app();
    let response = app.oneshot(get("/healthz")).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "campaign-tracker");
    Ok(())
}

#[tokio::test]
async fn open_pixel_returns_the_transparent_png() -> Result<()> {
    let (app, _store) = test_app();
    let response = app.oneshot(get("/track/open/abc123.png")).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let bytes = response.into_body().collect().await?.to_bytes();
    assert_eq!(bytes.as_ref(), TRANSPARENT_PIXEL_PNG);
    Ok(())
}

#[tokio::test]
async fn repeated_opens_record_a_single_event() -> Result<()> {
    let (app, store) = test_app();

    for _ in 0..3 {
        let response = app.clone().oneshot(get("/track/open/abc123.png")).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let document = store.snapshot().await;
    assert_eq!(document.opens.len(), 1);
    assert_eq!(document.opens[0].tracking_id, "abc123");
    Ok(())
}

#[tokio::test]
async fn open_records_request_metadata() -> Result<()> {
    let (app, store) = test_app();
    let request = Request::builder()
        .uri("/track/open/abc123.png")
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .header("user-agent", "Thunderbird/128.0")
        .body(Body::empty())?;
    app.oneshot(request).await?;

    let document = store.snapshot().await;
    assert_eq!(document.opens[0].ip, "203.0.113.9");
    assert_eq!(document.opens[0].user_agent, "Thunderbird/128.0");
    Ok(())
}

#[tokio::test]
async fn open_without_user_agent_records_unknown() -> Result<()> {
    let (app, store) = test_app();
    app.oneshot(get("/track/open/abc123.png")).await?;

    let document = store.snapshot().await;
    assert_eq!(document.opens[0].user_agent, "Unknown");
    assert_eq!(document.opens[0].ip, "");
    Ok(())
}

#[tokio::test]
async fn clicks_accumulate_without_dedup() -> Result<()> {
    let (app, store) = test_app();

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(get("/track/click/abc123/products"))
            .await?;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    let document = store.snapshot().await;
    assert_eq!(document.clicks.len(), 3);
    assert!(
        document
            .clicks
            .iter()
            .all(|click| click.action_name == "products")
    );
    Ok(())
}

#[tokio::test]
async fn click_redirects_to_the_query_target() -> Result<()> {
    let (app, _store) = test_app();
    let response = app
        .oneshot(get(
            "/track/click/abc123/products?redirect=https%3A%2F%2Fshop.example%2Fcatalog",
        ))
        .await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "https://shop.example/catalog"
    );
    Ok(())
}

#[tokio::test]
async fn click_without_redirect_uses_the_fallback_url() -> Result<()> {
    let (app, _store) = test_app();
    let response = app.oneshot(get("/track/click/abc123/products")).await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "https://fallback.example/home"
    );
    Ok(())
}

#[tokio::test]
async fn unsubscribe_records_and_renders_confirmation() -> Result<()> {
    let (app, store) = test_app();

    let response = app.clone().oneshot(get("/unsubscribe/abc123")).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let html = read_text(response).await?;
    assert!(html.contains("You have been unsubscribed"));

    // A second request records again; there is no dedup on unsubscribes.
    app.oneshot(get("/unsubscribe/abc123")).await?;
    let document = store.snapshot().await;
    assert_eq!(document.unsubscribes.len(), 2);
    Ok(())
}

#[tokio::test]
async fn api_stats_reports_counts_rates_and_breakdown() -> Result<()> {
    let (app, store) = test_app();

    for i in 0..10 {
        store.record_sent(json!({"tracking_id": i})).await?;
    }
    for i in 0..3 {
        app.clone()
            .oneshot(get(&format!("/track/open/id-{i}.png")))
            .await?;
    }
    app.clone()
        .oneshot(get("/track/click/id-0/products"))
        .await?;
    app.clone()
        .oneshot(get("/track/click/id-1/products"))
        .await?;
    app.clone()
        .oneshot(get("/track/click/id-0/whatsapp"))
        .await?;

    let response = app.oneshot(get("/api/stats")).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await?;

    assert_eq!(body["total_sent"], 10);
    assert_eq!(body["total_opens"], 3);
    assert_eq!(body["total_clicks"], 3);
    assert_eq!(body["open_rate"], 30.0);
    assert_eq!(body["click_rate"], 30.0);
    assert_eq!(body["click_breakdown"]["products"], 2);
    assert_eq!(body["click_breakdown"]["whatsapp"], 1);
    Ok(())
}

#[tokio::test]
async fn api_stats_on_an_empty_store_reports_zero_rates() -> Result<()> {
    let (app, _store) = test_app();
    let response = app.oneshot(get("/api/stats")).await?;

    let body = read_json(response).await?;
    assert_eq!(body["total_sent"], 0);
    assert_eq!(body["open_rate"], 0.0);
    assert_eq!(body["click_rate"], 0.0);
    assert_eq!(body["click_breakdown"], json!({}));
    Ok(())
}

#[tokio::test]
async fn stats_page_renders_with_auto_refresh() -> Result<()> {
    let (app, _store) = test_app();
    let response = app.oneshot(get("/stats")).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = read_text(response).await?;
    assert!(html.contains("http-equiv=\"refresh\" content=\"30\""));
    assert!(html.contains("Campaign Stats"));
    Ok(())
}

#[tokio::test]
async fn home_page_renders() -> Result<()> {
    let (app, _store) = test_app();
    let response = app.oneshot(get("/")).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = read_text(response).await?;
    assert!(html.contains("Email Campaign Tracker"));
    Ok(())
}

#[tokio::test]
async fn record_sent_appends_an_opaque_record() -> Result<()> {
    let (app, store) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/sent")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"tracking_id": "abc123", "to": "a@example.com"}).to_string(),
        ))?;

    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let document = store.snapshot().await;
    assert_eq!(document.emails_sent.len(), 1);
    assert_eq!(document.emails_sent[0]["to"], "a@example.com");
    Ok(())
}
