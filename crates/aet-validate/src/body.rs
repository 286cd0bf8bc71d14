//! Body structure, filename cross-checks, and per-type payload rules.

use crate::error::ValidationError;
use crate::filename::{is_agent_id, FilenameFields};
use aet_schemas::{
    CryptoOrderPayload, Mode, OptionMultiPayload, OptionSinglePayload, OrderEnvelope,
    OrderPayload, OrderType, SimpleOrderClass, StockOrderPayload,
};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const MAX_ORDER_QUERY_LIMIT: u32 = 500;
const MAX_STOCK_SYMBOL_CHARS: usize = 10;
const MIN_OPTION_LEGS: usize = 2;

/// An intake file that passed every check. Nothing downstream re-validates.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    pub fields: FilenameFields,
    pub client_order_id: String,
    pub payload: OrderPayload,
}

impl ValidatedOrder {
    pub fn mode(&self) -> Mode {
        self.fields.mode
    }

    pub fn agent_id(&self) -> &str {
        &self.fields.agent_id
    }

    pub fn order_type(&self) -> OrderType {
        self.payload.order_type()
    }
}

pub fn validate_body(raw: &Value, fields: &FilenameFields) -> Result<ValidatedOrder, ValidationError> {
    let envelope: OrderEnvelope = serde_json::from_value(raw.clone())
        .map_err(|e| ValidationError::Structure(e.to_string()))?;

    if !is_agent_id(&envelope.agent_id) {
        return Err(ValidationError::Structure(format!(
            "agent_id '{}' must be 1-20 lowercase alphanumeric characters",
            envelope.agent_id
        )));
    }
    if Mode::parse(&envelope.mode).is_none() {
        return Err(ValidationError::Structure(format!(
            "mode '{}' must be 'paper' or 'live'",
            envelope.mode
        )));
    }
    let Some(order_type) = OrderType::parse(&envelope.order_type) else {
        return Err(ValidationError::Structure(format!(
            "order_type must be one of: {}",
            OrderType::allowed_list()
        )));
    };
    check_client_order_id(&envelope.client_order_id)?;

    if envelope.mode != fields.mode.as_str() {
        return Err(ValidationError::ModeMismatch {
            filename: fields.mode.as_str().to_string(),
            body: envelope.mode,
        });
    }
    if envelope.agent_id != fields.agent_id {
        return Err(ValidationError::AgentMismatch {
            filename: fields.agent_id.clone(),
            body: envelope.agent_id,
        });
    }
    if order_type != fields.order_type {
        return Err(ValidationError::OrderTypeMismatch {
            filename: fields.order_type.as_str().to_string(),
            body: envelope.order_type,
        });
    }

    let payload_err = |reason: String| ValidationError::Payload { order_type, reason };
    let payload = OrderPayload::from_map(order_type, envelope.payload)
        .map_err(|e| payload_err(e.to_string()))?;
    check_payload(&payload).map_err(payload_err)?;

    Ok(ValidatedOrder {
        fields: fields.clone(),
        client_order_id: envelope.client_order_id,
        payload,
    })
}

/// The key is stored one-per-line in a trimming ledger.
fn check_client_order_id(key: &str) -> Result<(), ValidationError> {
    let reason = if key.is_empty() {
        "client_order_id must not be empty"
    } else if key.contains(['\n', '\r']) {
        "client_order_id must not contain line breaks"
    } else if key.trim() != key {
        "client_order_id must not have leading or trailing whitespace"
    } else {
        return Ok(());
    };
    Err(ValidationError::Structure(reason.to_string()))
}

// ---------------------------------------------------------------------------
// Payload rules
// ---------------------------------------------------------------------------

fn check_payload(payload: &OrderPayload) -> Result<(), String> {
    match payload {
        OrderPayload::StockBuy(p) | OrderPayload::StockSell(p) => check_stock(p),
        OrderPayload::OptionSingle(p) => check_option_single(p),
        OrderPayload::OptionMulti(p) => check_option_multi(p),
        OrderPayload::CryptoBuy(p) | OrderPayload::CryptoSell(p) => check_crypto(p),
        OrderPayload::MarketData(p) => {
            if p.symbols.is_empty() {
                return Err("symbols must contain at least 1 item".into());
            }
            if p.symbols.iter().any(|s| s.trim().is_empty()) {
                return Err("symbols must not contain empty strings".into());
            }
            Ok(())
        }
        OrderPayload::OrderStatus(p) | OrderPayload::CancelOrder(p) => match p.target() {
            Some(_) => Ok(()),
            None => Err("Must provide either alpaca_order_id or client_order_id".into()),
        },
        OrderPayload::OpenOrders(p) => check_query_limit(p.limit),
        OrderPayload::AllOrders(p) => check_query_limit(p.limit),
        OrderPayload::Positions(_) | OrderPayload::AccountInfo(_) => Ok(()),
    }
}

fn positive(name: &str, v: f64) -> Result<(), String> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(format!("{name} must be greater than 0 (got {v})"))
    }
}

fn positive_opt(name: &str, v: Option<f64>) -> Result<(), String> {
    v.map_or(Ok(()), |v| positive(name, v))
}

fn required(name: &str, class: &str, v: Option<f64>) -> Result<(), String> {
    match v {
        Some(_) => Ok(()),
        None => Err(format!("{name} is required for order_class '{class}'")),
    }
}

fn check_stock(p: &StockOrderPayload) -> Result<(), String> {
    let len = p.symbol.chars().count();
    if len == 0 || len > MAX_STOCK_SYMBOL_CHARS {
        return Err(format!(
            "symbol must be 1-{MAX_STOCK_SYMBOL_CHARS} characters (got {len})"
        ));
    }
    positive("qty", p.qty)?;
    positive_opt("limit_price", p.limit_price)?;
    positive_opt("stop_price", p.stop_price)?;
    if p.order_class.needs_limit_price() {
        required("limit_price", p.order_class.as_str(), p.limit_price)?;
    }
    if p.order_class.needs_stop_price() {
        required("stop_price", p.order_class.as_str(), p.stop_price)?;
    }
    Ok(())
}

fn check_option_single(p: &OptionSinglePayload) -> Result<(), String> {
    if p.symbol.trim().is_empty() {
        return Err("symbol must not be empty".into());
    }
    if p.qty == 0 {
        return Err("qty must be greater than 0".into());
    }
    positive_opt("limit_price", p.limit_price)?;
    if p.order_class == SimpleOrderClass::Limit {
        required("limit_price", p.order_class.as_str(), p.limit_price)?;
    }
    Ok(())
}

fn check_option_multi(p: &OptionMultiPayload) -> Result<(), String> {
    positive("limit_price", p.limit_price)?;
    if p.legs.len() < MIN_OPTION_LEGS {
        return Err(format!(
            "legs must contain at least {MIN_OPTION_LEGS} items (got {})",
            p.legs.len()
        ));
    }
    for (i, leg) in p.legs.iter().enumerate() {
        if leg.symbol.trim().is_empty() {
            return Err(format!("legs[{i}].symbol must not be empty"));
        }
        if leg.ratio_qty == 0 {
            return Err(format!("legs[{i}].ratio_qty must be greater than 0"));
        }
    }
    Ok(())
}

/// `[A-Z]+USD`, e.g. BTCUSD.
pub fn is_crypto_symbol(s: &str) -> bool {
    static CRYPTO_SYMBOL: OnceLock<Option<Regex>> = OnceLock::new();
    CRYPTO_SYMBOL
        .get_or_init(|| Regex::new(r"^[A-Z]+USD$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

fn check_crypto(p: &CryptoOrderPayload) -> Result<(), String> {
    if !is_crypto_symbol(&p.symbol) {
        return Err(format!(
            "symbol '{}' must be uppercase letters ending in USD (e.g. BTCUSD)",
            p.symbol
        ));
    }
    positive("qty", p.qty)?;
    positive_opt("limit_price", p.limit_price)?;
    if p.order_class == SimpleOrderClass::Limit {
        required("limit_price", p.order_class.as_str(), p.limit_price)?;
    }
    Ok(())
}

fn check_query_limit(limit: u32) -> Result<(), String> {
    if (1..=MAX_ORDER_QUERY_LIMIT).contains(&limit) {
        Ok(())
    } else {
        Err(format!("limit must be between 1 and {MAX_ORDER_QUERY_LIMIT} (got {limit})"))
    }
}
