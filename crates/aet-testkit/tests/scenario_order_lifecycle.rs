//! One order file from intake to a terminal area.
//!
//! GREEN when:
//! - A valid stock buy is dispatched once, recorded once, answered with a
//!   success outcome and lands in completed.
//! - Resubmitting the same key is caught before dispatch and fails with
//!   `duplicate_error`; the broker sees exactly one call across both runs.
//! - A filename/body mode mismatch fails validation and never reaches
//!   dedupe or dispatch.
//! - An unparseable body fails with a JSON error; a bad filename as well
//!   gets its outcome under the `unknown` sentinel partition.
//! - A transient broker failure leaves the ledger untouched, so the same key
//!   can be resubmitted and succeed.

use aet_dispatch::{DispatchError, DispatcherFactory};
use aet_ledger::Ledger;
use aet_pipeline::{FileDisposition, Pipeline};
use aet_schemas::ErrorKind;
use aet_testkit::{order_file_name, stock_buy_body, FakeFactory, TestTower, TS};
use serde_json::json;
use std::fs;
use std::sync::Arc;

const KEY: &str = "testbot_20260214120000000000_stockbuy";

fn pipeline(tower: &TestTower, factory: &Arc<FakeFactory>) -> Pipeline {
    let factory: Arc<dyn DispatcherFactory> = factory.clone();
    Pipeline::new(&tower.cfg, factory).unwrap()
}

#[tokio::test]
async fn scenario_a_valid_order_completes() {
    let tower = TestTower::new().unwrap();
    let factory = Arc::new(FakeFactory::new());
    let mut p = pipeline(&tower, &factory);

    let name = order_file_name("paper", "testbot", "stockbuy", TS);
    let path = tower.submit(&name, &stock_buy_body("paper", "testbot", KEY)).unwrap();

    let disposition = p.process_file(&path).await;
    assert_eq!(disposition, FileDisposition::Completed(tower.completed().join(&name)));

    assert_eq!(factory.dispatcher().submit_count(), 1);
    assert_eq!(factory.dispatcher().submissions()[0].client_order_id, KEY);

    let ledger = Ledger::open(tower.cfg.paths.ledger_file()).unwrap();
    assert_eq!(ledger.len(), 1);
    assert!(ledger.contains(KEY));

    let outcome = tower.read_outcome("testbot", "paper", "stockbuy", TS).unwrap();
    assert_eq!(outcome["status"], "success");
    assert_eq!(outcome["agent_id"], "testbot");
    assert_eq!(outcome["client_order_id"], KEY);
    assert_eq!(outcome["request_order_id"], "fake-1");
    assert!(outcome["error"].is_null());

    assert!(TestTower::list(&tower.incoming()).is_empty());
    assert!(TestTower::list(&tower.processing()).is_empty());
    assert_eq!(TestTower::list(&tower.completed()), vec![name]);

    let stats = p.stats();
    assert_eq!((stats.processed, stats.successful, stats.failed), (1, 1, 0));
}

#[tokio::test]
async fn scenario_b_resubmitted_key_is_a_duplicate() {
    let tower = TestTower::new().unwrap();
    let factory = Arc::new(FakeFactory::new());
    let mut p = pipeline(&tower, &factory);

    let name = order_file_name("paper", "testbot", "stockbuy", TS);
    let body = stock_buy_body("paper", "testbot", KEY);

    let first = tower.submit(&name, &body).unwrap();
    assert!(matches!(p.process_file(&first).await, FileDisposition::Completed(_)));

    let second = tower.submit(&name, &body).unwrap();
    let disposition = p.process_file(&second).await;
    assert_eq!(
        disposition,
        FileDisposition::Failed {
            kind: ErrorKind::DuplicateError,
            path: tower.failed().join(&name),
        }
    );

    assert_eq!(factory.dispatcher().submit_count(), 1);

    let outcome = tower.read_outcome("testbot", "paper", "stockbuy", TS).unwrap();
    assert_eq!(outcome["status"], "error");
    assert_eq!(outcome["error"]["type"], "duplicate_error");
    assert_eq!(
        outcome["error"]["message"],
        "Duplicate order detected: Order already processed (found in ledger)"
    );

    let stats = p.stats();
    assert_eq!(
        (stats.processed, stats.successful, stats.failed, stats.duplicates),
        (2, 1, 1, 1)
    );
}

#[tokio::test]
async fn scenario_c_mode_mismatch_never_reaches_dispatch() {
    let tower = TestTower::new().unwrap();
    let factory = Arc::new(FakeFactory::new());
    let mut p = pipeline(&tower, &factory);

    let name = order_file_name("paper", "testbot", "stockbuy", TS);
    let path = tower.submit(&name, &stock_buy_body("live", "testbot", KEY)).unwrap();

    let disposition = p.process_file(&path).await;
    assert_eq!(disposition.error_kind(), Some(ErrorKind::ValidationError));
    assert_eq!(disposition.path(), tower.failed().join(&name));

    assert_eq!(factory.dispatcher().submit_count(), 0);
    assert_eq!(factory.connect_count(), 0);
    assert!(TestTower::list(&tower.processing()).is_empty());

    let outcome = tower.read_outcome("testbot", "paper", "stockbuy", TS).unwrap();
    assert_eq!(outcome["error"]["type"], "validation_error");
    assert_eq!(
        outcome["error"]["message"],
        "Mode mismatch: filename has 'paper', JSON has 'live'"
    );
    assert_eq!(outcome["error"]["details"]["stage"], "cross_check");
    assert_eq!(outcome["client_order_id"], "unknown");
}

#[tokio::test]
async fn scenario_d_malformed_body_and_bad_filename_fail_with_sentinels() {
    let tower = TestTower::new().unwrap();
    let factory = Arc::new(FakeFactory::new());
    let mut p = pipeline(&tower, &factory);
    fs::create_dir_all(tower.incoming()).unwrap();

    let name = order_file_name("paper", "testbot", "stockbuy", TS);
    let path = tower.incoming().join(&name);
    fs::write(&path, "{ this is not json").unwrap();

    let disposition = p.process_file(&path).await;
    assert_eq!(disposition.error_kind(), Some(ErrorKind::ValidationError));
    let outcome = tower.read_outcome("testbot", "paper", "stockbuy", TS).unwrap();
    assert!(outcome["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid JSON: "));

    let junk = tower.incoming().join("garbage.json");
    fs::write(&junk, "also not json").unwrap();
    let disposition = p.process_file(&junk).await;
    assert_eq!(disposition.path(), tower.failed().join("garbage.json"));

    let sentinel = tower
        .read_outcome("unknown", "unknown", "unknown", "00000000000000000000")
        .unwrap();
    assert_eq!(sentinel["error"]["type"], "validation_error");
    assert_eq!(sentinel["error"]["details"]["stage"], "filename");
    assert_eq!(
        sentinel["error"]["message"],
        "Filename must have exactly 4 parts separated by underscores, got 1"
    );

    assert_eq!(factory.dispatcher().submit_count(), 0);
    assert_eq!(
        TestTower::list(&tower.failed()),
        vec!["garbage.json".to_string(), name]
    );
}

#[tokio::test]
async fn scenario_e_transient_failure_is_not_recorded() {
    let tower = TestTower::new().unwrap();
    let factory = Arc::new(FakeFactory::new());
    let mut p = pipeline(&tower, &factory);
    factory
        .dispatcher()
        .fail_next(DispatchError::Transient("HTTP 503: service unavailable".into()));

    let name = order_file_name("paper", "testbot", "stockbuy", TS);
    let body = stock_buy_body("paper", "testbot", KEY);

    let path = tower.submit(&name, &body).unwrap();
    let disposition = p.process_file(&path).await;
    assert_eq!(disposition.error_kind(), Some(ErrorKind::ApiError));
    assert_eq!(disposition.path(), tower.failed().join(&name));
    assert!(!p.ledger().contains(KEY));

    let outcome = tower.read_outcome("testbot", "paper", "stockbuy", TS).unwrap();
    assert_eq!(outcome["error"]["type"], "api_error");
    assert_eq!(outcome["error"]["details"], json!({ "class": "transient" }));

    // Same key again: not a duplicate, goes through.
    let again = tower.submit(&name, &body).unwrap();
    assert!(matches!(p.process_file(&again).await, FileDisposition::Completed(_)));
    assert_eq!(factory.dispatcher().submit_count(), 2);
    assert!(p.ledger().contains(KEY));

    let outcome = tower.read_outcome("testbot", "paper", "stockbuy", TS).unwrap();
    assert_eq!(outcome["status"], "success");
}
