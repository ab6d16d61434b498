//! Shared utilities for integration testing.

use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use users_api::ServiceConfig;

/// Configuration bound to an ephemeral loopback port.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.shutdown_grace_secs = 2;
    config.observability.upkeep_interval_secs = 1;
    config
}

/// Plain HTTP client that never pools, so shutdown is not held up by idle connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Scrape the metrics endpoint and return the body.
pub async fn scrape(client: &reqwest::Client, addr: SocketAddr) -> String {
    let res = client
        .get(format!("http://{}/metrics", addr))
        .send()
        .await
        .expect("metrics endpoint unreachable");
    assert_eq!(res.status(), 200);
    res.text().await.unwrap()
}

/// Value of the first sample of `metric` whose label set contains every entry of `labels`.
#[allow(dead_code)]
pub fn sample_value(body: &str, metric: &str, labels: &[(&str, &str)]) -> Option<f64> {
    body.lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| {
            line.strip_prefix(metric)
                .is_some_and(|rest| rest.starts_with('{') || rest.starts_with(' '))
        })
        .find(|line| {
            labels
                .iter()
                .all(|(k, v)| line.contains(&format!("{}=\"{}\"", k, v)))
        })
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}

/// Whether something accepts TCP connections on `addr`.
#[allow(dead_code)]
pub fn is_listening(addr: SocketAddr) -> bool {
    std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_ok()
}

/// Reserve a loopback port by holding a listener on it.
#[allow(dead_code)]
pub fn occupy_port() -> TcpListener {
    TcpListener::bind("127.0.0.1:0").unwrap()
}
