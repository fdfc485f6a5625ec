use serde_json::json;

use super::client::{FetchError, FetchSpec, HttpMethod};
use super::http::HttpClient;
use crate::shared::config::FetchConfig;

#[test]
fn get_request_carries_accept_and_custom_headers() {
    let spec = FetchSpec::get("http://127.0.0.1:8080/telemetry?machine=m1")
        .with_header("X-Api-Key", "secret");

    let req = HttpClient::build_request(&spec).unwrap();
    assert_eq!(req.method(), hyper::Method::GET);
    assert_eq!(req.uri().path(), "/telemetry");
    assert_eq!(req.uri().query(), Some("machine=m1"));
    assert_eq!(req.headers()["accept"], "application/json");
    assert_eq!(req.headers()["x-api-key"], "secret");
    assert!(req.headers().get("content-type").is_none());
}

#[test]
fn body_is_sent_as_json() {
    let spec = FetchSpec::get("http://127.0.0.1:8080/query")
        .with_body(HttpMethod::Post, json!({"machine": "m1"}));

    let req = HttpClient::build_request(&spec).unwrap();
    assert_eq!(req.method(), hyper::Method::POST);
    assert_eq!(req.headers()["content-type"], "application/json");
}

#[test]
fn invalid_url_is_rejected() {
    let spec = FetchSpec::get("not a url");
    assert!(matches!(
        HttpClient::build_request(&spec),
        Err(FetchError::InvalidUrl(url)) if url == "not a url"
    ));
}

#[tokio::test]
async fn client_takes_timeout_from_config() {
    let client = HttpClient::new(&FetchConfig {
        timeout_ms: 1_500,
        pool_idle_timeout_secs: 5,
    });
    assert_eq!(client.timeout().as_millis(), 1_500);
}
