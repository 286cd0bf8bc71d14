//! Wire types shared by every stage of the order tower.
//!
//! The filename and body of an intake file carry the same three identity
//! fields (`mode`, `agent_id`, `order_type`). This crate owns their closed
//! vocabularies, the 13 typed payloads, and the outcome record written back
//! to producers.

mod outcome;
mod payload;

pub use outcome::{ErrorKind, OutcomeError, OutcomeRecord, OutcomeStatus};
pub use payload::{
    AccountInfoPayload, AllOrdersPayload, AssetClass, CryptoOrderPayload, DataType,
    MarketDataPayload, MlegClass, MlegType, OpenOrdersPayload, OptionLeg, OptionMultiPayload,
    OptionSinglePayload, OrderClass, OrderLookupPayload, OrderPayload, OrderRef,
    OrderStatusFilter, PositionsPayload, Side, SimpleOrderClass, SortDirection,
    StockOrderPayload, TimeInForce,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Trading mode. Selects the brokerage account and appears in every path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Paper,
    Live,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Paper, Mode::Live];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Paper => "paper",
            Mode::Live => "live",
        }
    }

    /// Case-sensitive: only the lowercase spelling is accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paper" => Some(Mode::Paper),
            "live" => Some(Mode::Live),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::parse(s).ok_or_else(|| format!("unknown mode '{s}' (expected paper|live)"))
    }
}

// ---------------------------------------------------------------------------
// OrderType
// ---------------------------------------------------------------------------

/// The closed set of request kinds an agent may submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    StockBuy,
    StockSell,
    OptionSingle,
    OptionMulti,
    CryptoBuy,
    CryptoSell,
    MarketData,
    OrderStatus,
    OpenOrders,
    AllOrders,
    Positions,
    AccountInfo,
    CancelOrder,
}

impl OrderType {
    pub const ALL: [OrderType; 13] = [
        OrderType::StockBuy,
        OrderType::StockSell,
        OrderType::OptionSingle,
        OrderType::OptionMulti,
        OrderType::CryptoBuy,
        OrderType::CryptoSell,
        OrderType::MarketData,
        OrderType::OrderStatus,
        OrderType::OpenOrders,
        OrderType::AllOrders,
        OrderType::Positions,
        OrderType::AccountInfo,
        OrderType::CancelOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::StockBuy => "stockbuy",
            OrderType::StockSell => "stocksell",
            OrderType::OptionSingle => "optionsingle",
            OrderType::OptionMulti => "optionmulti",
            OrderType::CryptoBuy => "cryptobuy",
            OrderType::CryptoSell => "cryptosell",
            OrderType::MarketData => "marketdata",
            OrderType::OrderStatus => "orderstatus",
            OrderType::OpenOrders => "openorders",
            OrderType::AllOrders => "allorders",
            OrderType::Positions => "positions",
            OrderType::AccountInfo => "accountinfo",
            OrderType::CancelOrder => "cancelorder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        OrderType::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    /// Comma separated list of every wire tag, for operator messages.
    pub fn allowed_list() -> String {
        OrderType::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// True for the kinds that place a new order at the broker.
    pub fn is_placement(&self) -> bool {
        matches!(
            self,
            OrderType::StockBuy
                | OrderType::StockSell
                | OrderType::OptionSingle
                | OrderType::OptionMulti
                | OrderType::CryptoBuy
                | OrderType::CryptoSell
        )
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderType::parse(s).ok_or_else(|| {
            format!(
                "unknown order type '{s}' (expected one of: {})",
                OrderType::allowed_list()
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Intake body envelope
// ---------------------------------------------------------------------------

/// Raw top-level body of an intake file.
///
/// Identity fields stay as strings here so the validator can report a bad
/// value with the exact text the producer wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEnvelope {
    pub agent_id: String,
    pub client_order_id: String,
    pub order_type: String,
    pub mode: String,
    pub payload: serde_json::Map<String, serde_json::Value>,
}
