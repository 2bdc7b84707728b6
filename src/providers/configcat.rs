//! ConfigCat through the vendor SDK in lazy-load mode.
//!
//! The SDK downloads the config JSON on first use, serves it from memory
//! for the cache TTL, then revalidates with `If-None-Match`. Evaluation
//! never fails: a download error, a missing key or a type mismatch is logged
//! by the SDK and the caller's default comes back.

use std::time::Duration;

use configcat::{Client, ClientError, PollingMode};

use crate::config::ConfigCatConfig;

pub fn build_client(cfg: &ConfigCatConfig, http_timeout: Duration) -> Result<Client, ClientError> {
    let mut builder = Client::builder(&cfg.sdk_key)
        .polling_mode(PollingMode::LazyLoad(cfg.cache_ttl))
        .http_timeout(http_timeout);
    // Without an override the SDK picks its own CDN and honours redirects.
    if let Some(base_url) = &cfg.base_url {
        builder = builder.base_url(base_url);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::testing::CONFIGCAT_TEST_KEY;

    fn config_path() -> String {
        format!("/configuration-files/{CONFIGCAT_TEST_KEY}/config_v6.json")
    }

    fn config_body(base: &str) -> serde_json::Value {
        json!({
            "p": {"u": base, "r": 0, "s": "salt"},
            "f": {
                "iswinter": {"t": 0, "v": {"b": false}, "i": "a1"},
                "greeting": {"t": 1, "v": {"s": "hello"}, "i": "b1"}
            }
        })
    }

    fn client(server: &MockServer, ttl: Duration) -> Client {
        let cfg = ConfigCatConfig {
            sdk_key: CONFIGCAT_TEST_KEY.into(),
            base_url: Some(server.uri()),
            flag_key: "iswinter".into(),
            cache_ttl: ttl,
        };
        build_client(&cfg, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn evaluates_served_setting() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(config_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(config_body(&server.uri())))
            .mount(&server)
            .await;

        let cc = client(&server, Duration::from_secs(60));
        assert!(!cc.get_value("iswinter", true, None).await);
        assert_eq!(
            cc.get_value("greeting", String::new(), None).await,
            "hello"
        );
    }

    #[tokio::test]
    async fn lazy_load_downloads_once_within_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(config_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(config_body(&server.uri())))
            .expect(1)
            .mount(&server)
            .await;

        let cc = client(&server, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(!cc.get_value("iswinter", true, None).await);
        }
    }

    #[tokio::test]
    async fn missing_key_and_type_mismatch_serve_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(config_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(config_body(&server.uri())))
            .mount(&server)
            .await;

        let cc = client(&server, Duration::from_secs(60));
        assert!(cc.get_value("nope", true, None).await);
        assert!(cc.get_value("greeting", true, None).await);
    }

    #[tokio::test]
    async fn unreachable_cdn_serves_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cc = client(&server, Duration::from_secs(60));
        assert!(cc.get_value("iswinter", true, None).await);
    }

    #[test]
    fn malformed_sdk_key_is_rejected() {
        let cfg = ConfigCatConfig {
            sdk_key: "not-a-key".into(),
            base_url: None,
            flag_key: "iswinter".into(),
            cache_ttl: Duration::from_secs(60),
        };
        assert!(build_client(&cfg, Duration::from_secs(5)).is_err());
    }
}
