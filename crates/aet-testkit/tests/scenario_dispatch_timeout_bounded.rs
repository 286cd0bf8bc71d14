//! A hung broker call cannot stall intake.
//!
//! GREEN when:
//! - A dispatch slower than the configured timeout is abandoned and the file
//!   fails with `api_error`, `details.class = "timeout"`.
//! - The key is not recorded.
//! - A broker rejection surfaces its HTTP status in the outcome details.

use aet_dispatch::{DispatchError, DispatcherFactory};
use aet_pipeline::Pipeline;
use aet_schemas::ErrorKind;
use aet_testkit::{order_file_name, stock_buy_body, FakeFactory, TestTower, TS};
use std::sync::Arc;
use std::time::{Duration, Instant};

const KEY: &str = "bot_20260214120000000000_stockbuy";

#[tokio::test]
async fn slow_dispatch_times_out() {
    let tower = TestTower::new().unwrap();
    let factory = Arc::new(FakeFactory::new());
    factory.dispatcher().set_delay(Duration::from_secs(10));
    let dyn_factory: Arc<dyn DispatcherFactory> = factory.clone();
    let mut p = Pipeline::new(&tower.cfg, dyn_factory).unwrap();

    let name = order_file_name("paper", "bot", "stockbuy", TS);
    let path = tower.submit(&name, &stock_buy_body("paper", "bot", KEY)).unwrap();

    let started = Instant::now();
    let disposition = p.process_file(&path).await;
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(disposition.error_kind(), Some(ErrorKind::ApiError));
    assert!(!p.ledger().contains(KEY));

    let outcome = tower.read_outcome("bot", "paper", "stockbuy", TS).unwrap();
    assert_eq!(outcome["error"]["details"]["class"], "timeout");
    assert_eq!(outcome["error"]["details"]["timeout_ms"], 1000);
}

#[tokio::test]
async fn rejection_keeps_http_status() {
    let tower = TestTower::new().unwrap();
    let factory = Arc::new(FakeFactory::new());
    factory.dispatcher().fail_next(DispatchError::Rejected {
        status: 403,
        message: "insufficient buying power".into(),
    });
    let dyn_factory: Arc<dyn DispatcherFactory> = factory.clone();
    let mut p = Pipeline::new(&tower.cfg, dyn_factory).unwrap();

    let name = order_file_name("paper", "bot", "stockbuy", TS);
    let path = tower.submit(&name, &stock_buy_body("paper", "bot", KEY)).unwrap();
    p.process_file(&path).await;

    let outcome = tower.read_outcome("bot", "paper", "stockbuy", TS).unwrap();
    assert_eq!(outcome["error"]["type"], "api_error");
    assert_eq!(outcome["error"]["details"]["class"], "rejected");
    assert_eq!(outcome["error"]["details"]["http_status"], 403);
    assert!(outcome["error"]["message"]
        .as_str()
        .unwrap()
        .contains("insufficient buying power"));
}
