//! A collector that cannot sample aborts startup before the port is bound.

mod common;

use common::{is_listening, test_config};
use users_api::observability::{CollectError, Collector};
use users_api::{Application, Phase, StartupError};

struct BrokenCollector;

impl Collector for BrokenCollector {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn describe(&self) {}

    fn collect(&self) -> Result<(), CollectError> {
        Err(CollectError::NoRuntime)
    }
}

#[tokio::test]
async fn test_failing_collector_prevents_listener() {
    // Pick a free port, then release it so the application could take it.
    let addr = {
        let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        reserved.local_addr().unwrap()
    };
    let mut config = test_config();
    config.listener.bind_address = addr.to_string();

    let app = Application::new(config)
        .with_default_collectors()
        .with_collector(BrokenCollector);
    let lifecycle = app.lifecycle();

    let err = match app.start().await {
        Ok(_) => panic!("startup should fail"),
        Err(e) => e,
    };

    assert!(matches!(err, StartupError::Metrics(_)));
    assert!(err.to_string().contains("broken"));
    assert_eq!(lifecycle.phase(), Phase::NotStarted);
    assert!(!is_listening(addr));
}
