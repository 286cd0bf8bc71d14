//! Broker JSON reduced to the shapes producers read.
//!
//! Prices and quantities come back as decimal strings so no float rounding
//! is introduced on the way through.

use serde_json::{Map, Value};

const ORDER_FIELDS: &[&str] = &[
    "id",
    "client_order_id",
    "created_at",
    "updated_at",
    "submitted_at",
    "filled_at",
    "canceled_at",
    "failed_at",
    "symbol",
    "asset_class",
    "qty",
    "filled_qty",
    "filled_avg_price",
    "order_type",
    "side",
    "time_in_force",
    "limit_price",
    "stop_price",
    "status",
];

const POSITION_FIELDS: &[&str] = &[
    "symbol",
    "qty",
    "avg_entry_price",
    "current_price",
    "market_value",
    "unrealized_pl",
    "unrealized_plpc",
    "side",
    "asset_class",
];

const ACCOUNT_FIELDS: &[&str] = &[
    "status",
    "buying_power",
    "cash",
    "portfolio_value",
    "equity",
    "last_equity",
    "long_market_value",
    "short_market_value",
];

/// Numbers and strings become strings; null and absent become null.
pub(crate) fn text(v: Option<&Value>) -> Value {
    match v {
        Some(Value::String(s)) => Value::String(s.clone()),
        Some(Value::Number(n)) => Value::String(n.to_string()),
        Some(Value::Bool(b)) => Value::String(b.to_string()),
        _ => Value::Null,
    }
}

fn pick(src: &Value, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .map(|f| (f.to_string(), text(src.get(*f))))
        .collect()
}

pub(crate) fn order(src: &Value) -> Value {
    let mut out = pick(src, ORDER_FIELDS);
    // older payloads only carry `type`
    if out.get("order_type").is_some_and(Value::is_null) {
        out.insert("order_type".into(), text(src.get("type")));
    }
    out.insert(
        "extended_hours".into(),
        Value::Bool(src.get("extended_hours").and_then(Value::as_bool).unwrap_or(false)),
    );
    Value::Object(out)
}

pub(crate) fn orders(src: &Value) -> Value {
    let list = src
        .as_array()
        .map(|a| a.iter().map(order).collect())
        .unwrap_or_default();
    Value::Array(list)
}

pub(crate) fn position(src: &Value) -> Value {
    Value::Object(pick(src, POSITION_FIELDS))
}

pub(crate) fn account(src: &Value) -> Value {
    Value::Object(pick(src, ACCOUNT_FIELDS))
}

pub(crate) fn quote(q: &Value) -> Value {
    serde_json::json!({
        "bid_price": text(q.get("bp")),
        "ask_price": text(q.get("ap")),
        "timestamp": text(q.get("t")),
    })
}

pub(crate) fn bar(b: &Value) -> Value {
    serde_json::json!({
        "open": text(b.get("o")),
        "high": text(b.get("h")),
        "low": text(b.get("l")),
        "close": text(b.get("c")),
        "volume": text(b.get("v")),
        "timestamp": text(b.get("t")),
    })
}

pub(crate) fn trade(t: &Value) -> Value {
    serde_json::json!({
        "price": text(t.get("p")),
        "size": text(t.get("s")),
        "timestamp": text(t.get("t")),
    })
}

/// `BTCUSD` style symbols are routed to the crypto data feed.
pub(crate) fn is_crypto_pair(symbol: &str) -> bool {
    symbol.ends_with("USD") && symbol.len() > 5
}

/// `BTCUSD` -> `BTC/USD`, the form the crypto data API expects.
pub(crate) fn crypto_pair(symbol: &str) -> String {
    match symbol.strip_suffix("USD") {
        Some(base) => format!("{base}/USD"),
        None => symbol.to_string(),
    }
}

/// Decimal string for a wire quantity or price (`10.0` -> `"10"`).
pub(crate) fn decimal(v: f64) -> String {
    v.to_string()
}
