//! Tests for policy-aware HTTP clients against a local mock server.

use llmgate_resolver::{
    NetworkDefaults, ProxyOverride, ProxyPolicy, ProxyPolicyBuilder, ProxyEnv, http,
};
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

async fn server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn direct_client_reaches_server() {
    let server = server().await;
    let client = http::client(&ProxyPolicy::new(), Duration::from_secs(5)).unwrap();
    let body = client
        .get(format!("{}/health", server.uri()))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn loopback_bypasses_configured_proxy() {
    let server = server().await;
    // Every other request would go through a proxy that does not resolve.
    let policy = ProxyPolicyBuilder::new(Vec::new())
        .env(ProxyEnv::default())
        .explicit(Some(ProxyOverride::All("http://proxy.invalid:3128".into())))
        .build()
        .unwrap();
    assert!(policy.has_proxies());

    let defaults = NetworkDefaults::new(policy, Duration::from_secs(5));
    let response = defaults
        .client()
        .unwrap()
        .get(format!("{}/health", server.uri()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[test]
fn per_entry_override_keeps_pinned_bypasses() {
    let base = ProxyPolicyBuilder::new(Vec::new())
        .env(ProxyEnv::default())
        .build()
        .unwrap();
    let defaults = NetworkDefaults::from_secs(base, 300.0).unwrap();
    let scoped = defaults
        .with_override(&ProxyOverride::All("http://entry:8080".into()))
        .unwrap();

    assert_eq!(scoped.timeout, Duration::from_secs(300));
    assert!(!defaults.policy.has_proxies());
    assert_eq!(
        scoped.policy.route_str("http://127.0.0.1:1/").unwrap(),
        llmgate_resolver::Route::Direct
    );
    assert_eq!(
        scoped
            .policy
            .route_str("https://api.example.com/")
            .unwrap()
            .to_string(),
        "http://entry:8080/"
    );
    assert!(NetworkDefaults::from_secs(ProxyPolicy::new(), -1.0).is_err());
}
