//! Brokerage clients are built lazily, once per mode.
//!
//! GREEN when:
//! - Several paper orders share one connect; a live order adds exactly one more.
//! - A mode whose credentials are missing fails its order with
//!   `client_init_error` naming the env var, and the failure is not cached:
//!   once the credential appears the next order connects and succeeds.

use aet_dispatch::DispatcherFactory;
use aet_pipeline::{FileDisposition, Pipeline};
use aet_schemas::{ErrorKind, Mode};
use aet_testkit::{order_file_name, stock_buy_body, FakeFactory, TestTower};
use std::sync::Arc;

fn ts(i: u32) -> String {
    format!("20260214120000{i:06}")
}

fn key(agent: &str, ts: &str) -> String {
    format!("{agent}_{ts}_stockbuy")
}

#[tokio::test]
async fn one_connect_per_mode() {
    let tower = TestTower::new().unwrap();
    let factory = Arc::new(FakeFactory::new());
    let dyn_factory: Arc<dyn DispatcherFactory> = factory.clone();
    let mut p = Pipeline::new(&tower.cfg, dyn_factory).unwrap();

    for i in 0..3 {
        let t = ts(i);
        let name = order_file_name("paper", "bot", "stockbuy", &t);
        let path = tower.submit(&name, &stock_buy_body("paper", "bot", &key("bot", &t))).unwrap();
        assert!(matches!(p.process_file(&path).await, FileDisposition::Completed(_)));
    }
    assert_eq!(factory.connect_count(), 1);

    let t = ts(9);
    let name = order_file_name("live", "bot", "stockbuy", &t);
    let path = tower.submit(&name, &stock_buy_body("live", "bot", &key("bot", &t))).unwrap();
    assert!(matches!(p.process_file(&path).await, FileDisposition::Completed(_)));

    assert_eq!(factory.connect_count(), 2);
    assert_eq!(p.clients().connected_modes(), vec![Mode::Paper, Mode::Live]);
    assert_eq!(factory.dispatcher().submit_count(), 4);
}

#[tokio::test]
async fn init_failure_is_reported_and_retried_next_time() {
    let tower = TestTower::new().unwrap();
    let factory = Arc::new(FakeFactory::new());
    factory.fail_mode(Mode::Live);
    let dyn_factory: Arc<dyn DispatcherFactory> = factory.clone();
    let mut p = Pipeline::new(&tower.cfg, dyn_factory).unwrap();

    let t = ts(1);
    let name = order_file_name("live", "bot", "stockbuy", &t);
    let path = tower.submit(&name, &stock_buy_body("live", "bot", &key("bot", &t))).unwrap();

    let disposition = p.process_file(&path).await;
    assert_eq!(disposition.error_kind(), Some(ErrorKind::ClientInitError));
    assert_eq!(factory.dispatcher().submit_count(), 0);
    assert!(!p.ledger().contains(&key("bot", &t)));

    let outcome = tower.read_outcome("bot", "live", "stockbuy", &t).unwrap();
    let message = outcome["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("Failed to initialize brokerage client: "));
    assert!(message.contains("ALPACA_LIVE_API_KEY"));
    assert_eq!(outcome["error"]["details"]["env_var"], "ALPACA_LIVE_API_KEY");

    factory.heal_mode(Mode::Live);
    let t = ts(2);
    let name = order_file_name("live", "bot", "stockbuy", &t);
    let path = tower.submit(&name, &stock_buy_body("live", "bot", &key("bot", &t))).unwrap();
    assert!(matches!(p.process_file(&path).await, FileDisposition::Completed(_)));

    assert_eq!(factory.connect_count(), 2);
}
