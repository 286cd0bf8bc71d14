//! Typed payloads, one per order type.
//!
//! Deserialisation enforces shapes and enumerations only. Numeric bounds and
//! cross-field rules are checked by the validator.

use crate::OrderType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
    Ioc,
    Fok,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Day => "day",
            TimeInForce::Gtc => "gtc",
            TimeInForce::Ioc => "ioc",
            TimeInForce::Fok => "fok",
        }
    }
}

/// Order classes available to equities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderClass {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderClass::Market => "market",
            OrderClass::Limit => "limit",
            OrderClass::Stop => "stop",
            OrderClass::StopLimit => "stop_limit",
        }
    }

    pub fn needs_limit_price(&self) -> bool {
        matches!(self, OrderClass::Limit | OrderClass::StopLimit)
    }

    pub fn needs_stop_price(&self) -> bool {
        matches!(self, OrderClass::Stop | OrderClass::StopLimit)
    }
}

/// Order classes available to single-leg options and crypto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimpleOrderClass {
    Market,
    Limit,
}

impl SimpleOrderClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleOrderClass::Market => "market",
            SimpleOrderClass::Limit => "limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MlegClass {
    Mleg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MlegType {
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Quote,
    Bar,
    Trade,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Quote => "quote",
            DataType::Bar => "bar",
            DataType::Trade => "trade",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusFilter {
    Open,
    Closed,
    All,
}

impl OrderStatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusFilter::Open => "open",
            OrderStatusFilter::Closed => "closed",
            OrderStatusFilter::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    UsEquity,
    UsOption,
    Crypto,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::UsEquity => "us_equity",
            AssetClass::UsOption => "us_option",
            AssetClass::Crypto => "crypto",
        }
    }
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockOrderPayload {
    pub symbol: String,
    pub qty: f64,
    pub order_class: OrderClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<f64>,
    pub time_in_force: TimeInForce,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSinglePayload {
    pub symbol: String,
    pub qty: u32,
    pub side: Side,
    pub order_class: SimpleOrderClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    pub time_in_force: TimeInForce,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    pub symbol: String,
    pub side: Side,
    pub ratio_qty: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionMultiPayload {
    pub order_class: MlegClass,
    #[serde(rename = "type")]
    pub kind: MlegType,
    pub limit_price: f64,
    pub time_in_force: TimeInForce,
    pub legs: Vec<OptionLeg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoOrderPayload {
    pub symbol: String,
    pub qty: f64,
    pub order_class: SimpleOrderClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    pub time_in_force: TimeInForce,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataPayload {
    pub symbols: Vec<String>,
    pub data_type: DataType,
}

/// Shared by `orderstatus` and `cancelorder`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderLookupPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpaca_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

/// Which identifier a lookup resolves through. The upstream id wins when
/// both are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderRef<'a> {
    Upstream(&'a str),
    Client(&'a str),
}

impl OrderLookupPayload {
    pub fn target(&self) -> Option<OrderRef<'_>> {
        if let Some(id) = present(&self.alpaca_order_id) {
            return Some(OrderRef::Upstream(id));
        }
        present(&self.client_order_id).map(OrderRef::Client)
    }
}

fn present(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|v| !v.trim().is_empty())
}

fn default_open() -> OrderStatusFilter {
    OrderStatusFilter::Open
}

fn default_all() -> OrderStatusFilter {
    OrderStatusFilter::All
}

fn default_limit() -> u32 {
    100
}

fn default_desc() -> SortDirection {
    SortDirection::Desc
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrdersPayload {
    #[serde(default = "default_open")]
    pub status: OrderStatusFilter,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllOrdersPayload {
    #[serde(default = "default_all")]
    pub status: OrderStatusFilter,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
    #[serde(default = "default_desc")]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<AssetClass>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfoPayload {}

// ---------------------------------------------------------------------------
// OrderPayload
// ---------------------------------------------------------------------------

/// A payload tagged with its order type. Every consumer matches on this
/// exhaustively, so adding a kind is a compile error until it is handled.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderPayload {
    StockBuy(StockOrderPayload),
    StockSell(StockOrderPayload),
    OptionSingle(OptionSinglePayload),
    OptionMulti(OptionMultiPayload),
    CryptoBuy(CryptoOrderPayload),
    CryptoSell(CryptoOrderPayload),
    MarketData(MarketDataPayload),
    OrderStatus(OrderLookupPayload),
    OpenOrders(OpenOrdersPayload),
    AllOrders(AllOrdersPayload),
    Positions(PositionsPayload),
    AccountInfo(AccountInfoPayload),
    CancelOrder(OrderLookupPayload),
}

impl OrderPayload {
    /// Decode `raw` into the struct selected by `order_type`.
    pub fn from_map(order_type: OrderType, raw: Map<String, Value>) -> serde_json::Result<Self> {
        let v = Value::Object(raw);
        Ok(match order_type {
            OrderType::StockBuy => OrderPayload::StockBuy(serde_json::from_value(v)?),
            OrderType::StockSell => OrderPayload::StockSell(serde_json::from_value(v)?),
            OrderType::OptionSingle => OrderPayload::OptionSingle(serde_json::from_value(v)?),
            OrderType::OptionMulti => OrderPayload::OptionMulti(serde_json::from_value(v)?),
            OrderType::CryptoBuy => OrderPayload::CryptoBuy(serde_json::from_value(v)?),
            OrderType::CryptoSell => OrderPayload::CryptoSell(serde_json::from_value(v)?),
            OrderType::MarketData => OrderPayload::MarketData(serde_json::from_value(v)?),
            OrderType::OrderStatus => OrderPayload::OrderStatus(serde_json::from_value(v)?),
            OrderType::OpenOrders => OrderPayload::OpenOrders(serde_json::from_value(v)?),
            OrderType::AllOrders => OrderPayload::AllOrders(serde_json::from_value(v)?),
            OrderType::Positions => OrderPayload::Positions(serde_json::from_value(v)?),
            OrderType::AccountInfo => OrderPayload::AccountInfo(serde_json::from_value(v)?),
            OrderType::CancelOrder => OrderPayload::CancelOrder(serde_json::from_value(v)?),
        })
    }

    pub fn order_type(&self) -> OrderType {
        match self {
            OrderPayload::StockBuy(_) => OrderType::StockBuy,
            OrderPayload::StockSell(_) => OrderType::StockSell,
            OrderPayload::OptionSingle(_) => OrderType::OptionSingle,
            OrderPayload::OptionMulti(_) => OrderType::OptionMulti,
            OrderPayload::CryptoBuy(_) => OrderType::CryptoBuy,
            OrderPayload::CryptoSell(_) => OrderType::CryptoSell,
            OrderPayload::MarketData(_) => OrderType::MarketData,
            OrderPayload::OrderStatus(_) => OrderType::OrderStatus,
            OrderPayload::OpenOrders(_) => OrderType::OpenOrders,
            OrderPayload::AllOrders(_) => OrderType::AllOrders,
            OrderPayload::Positions(_) => OrderType::Positions,
            OrderPayload::AccountInfo(_) => OrderType::AccountInfo,
            OrderPayload::CancelOrder(_) => OrderType::CancelOrder,
        }
    }

    /// Serialise the inner payload back to a JSON object (used by the file
    /// generator).
    pub fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            OrderPayload::StockBuy(p) | OrderPayload::StockSell(p) => serde_json::to_value(p),
            OrderPayload::OptionSingle(p) => serde_json::to_value(p),
            OrderPayload::OptionMulti(p) => serde_json::to_value(p),
            OrderPayload::CryptoBuy(p) | OrderPayload::CryptoSell(p) => serde_json::to_value(p),
            OrderPayload::MarketData(p) => serde_json::to_value(p),
            OrderPayload::OrderStatus(p) | OrderPayload::CancelOrder(p) => serde_json::to_value(p),
            OrderPayload::OpenOrders(p) => serde_json::to_value(p),
            OrderPayload::AllOrders(p) => serde_json::to_value(p),
            OrderPayload::Positions(p) => serde_json::to_value(p),
            OrderPayload::AccountInfo(p) => serde_json::to_value(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn defaults_fill_in_for_order_queries() {
        let p = OrderPayload::from_map(OrderType::AllOrders, map(json!({}))).unwrap();
        match p {
            OrderPayload::AllOrders(a) => {
                assert_eq!(a.status, OrderStatusFilter::All);
                assert_eq!(a.limit, 100);
                assert_eq!(a.direction, SortDirection::Desc);
            }
            other => panic!("wrong variant: {other:?}"),
        }

        let p = OrderPayload::from_map(OrderType::OpenOrders, map(json!({}))).unwrap();
        assert!(matches!(
            p,
            OrderPayload::OpenOrders(OpenOrdersPayload { status: OrderStatusFilter::Open, limit: 100, .. })
        ));
    }

    #[test]
    fn enumerations_reject_unknown_spellings() {
        let raw = json!({"symbol": "AAPL", "qty": 1, "order_class": "Market", "time_in_force": "day"});
        assert!(OrderPayload::from_map(OrderType::StockBuy, map(raw)).is_err());

        let raw = json!({"symbol": "AAPL", "qty": 1, "order_class": "market", "time_in_force": "opg"});
        assert!(OrderPayload::from_map(OrderType::StockBuy, map(raw)).is_err());
    }

    #[test]
    fn lookup_target_prefers_upstream_id() {
        let both = OrderLookupPayload {
            alpaca_order_id: Some("abc".into()),
            client_order_id: Some("def".into()),
        };
        assert_eq!(both.target(), Some(OrderRef::Upstream("abc")));

        let client_only = OrderLookupPayload {
            alpaca_order_id: Some("  ".into()),
            client_order_id: Some("def".into()),
        };
        assert_eq!(client_only.target(), Some(OrderRef::Client("def")));

        assert_eq!(OrderLookupPayload::default().target(), None);
    }

    #[test]
    fn payload_tag_follows_variant() {
        let p = OrderPayload::from_map(OrderType::CancelOrder, map(json!({"client_order_id": "x"})))
            .unwrap();
        assert_eq!(p.order_type(), OrderType::CancelOrder);
        assert_eq!(p.to_value().unwrap(), json!({"client_order_id": "x"}));
    }
}
