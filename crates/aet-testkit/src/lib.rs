//! Fixtures for driving the tower without a broker.

mod fake;
mod tower;

pub use fake::{FakeDispatcher, FakeFactory, Submission};
pub use tower::{order_file_name, stock_buy_body, write_order_file, TestTower, TS};
