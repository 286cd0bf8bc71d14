//! `aet create`: write a well-formed order file for manual testing.
//!
//! The body is validated with the same rules the tower applies before it is
//! written, so a file this command produces is never rejected at intake.

use aet_schemas::{Mode, OrderType};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Agent id (1-20 lowercase alphanumeric, no underscores)
    #[arg(long)]
    pub agent: String,

    #[arg(long)]
    pub mode: Mode,

    #[arg(long = "type")]
    pub order_type: OrderType,

    /// Symbol; comma-separated for marketdata / openorders
    #[arg(long)]
    pub symbol: Option<String>,

    #[arg(long)]
    pub qty: Option<f64>,

    /// market | limit | stop | stop_limit
    #[arg(long)]
    pub order_class: Option<String>,

    #[arg(long)]
    pub limit_price: Option<f64>,

    #[arg(long)]
    pub stop_price: Option<f64>,

    /// day | gtc | ioc | fok
    #[arg(long)]
    pub tif: Option<String>,

    /// buy | sell (options)
    #[arg(long)]
    pub side: Option<String>,

    /// us_equity | us_option | crypto (positions)
    #[arg(long)]
    pub asset_class: Option<String>,

    /// Result limit (openorders / allorders)
    #[arg(long)]
    pub limit: Option<u32>,

    /// Broker order id (orderstatus / cancelorder)
    #[arg(long)]
    pub order_id: Option<String>,

    /// Target client_order_id (orderstatus / cancelorder)
    #[arg(long)]
    pub client_order_id: Option<String>,

    /// quote | bar | trade (marketdata)
    #[arg(long)]
    pub data_type: Option<String>,

    #[arg(long, default_value = "orders/incoming")]
    pub output_dir: PathBuf,
}

pub fn create(args: CreateArgs) -> Result<()> {
    let ts = Utc::now().format("%Y%m%d%H%M%S%6f").to_string();
    let name = format!("{}_{}_{}_{}.json", args.mode, args.agent, args.order_type, ts);
    let client_order_id = format!("{}_{}_{}", args.agent, ts, args.order_type);

    let body = json!({
        "agent_id": args.agent,
        "client_order_id": client_order_id,
        "order_type": args.order_type,
        "mode": args.mode,
        "payload": build_payload(&args)?,
    });

    let fields = aet_validate::validate_filename(&name)?;
    aet_validate::validate_body(&body, &fields)?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("create output dir failed: {}", args.output_dir.display()))?;
    let path = args.output_dir.join(&name);
    let tmp = args.output_dir.join(format!("{name}.tmp"));
    let pretty = serde_json::to_string_pretty(&body).context("serialize order")?;
    fs::write(&tmp, format!("{pretty}\n")).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("rename into {}", path.display()))?;

    println!("path={}", path.display());
    println!("client_order_id={client_order_id}");
    Ok(())
}

fn build_payload(args: &CreateArgs) -> Result<Value> {
    let mut p = Map::new();
    let mut put = |k: &str, v: Option<Value>| {
        if let Some(v) = v {
            p.insert(k.to_string(), v);
        }
    };

    match args.order_type {
        OrderType::StockBuy | OrderType::StockSell => {
            put("symbol", Some(json!(required_symbol(args)?.to_uppercase())));
            put("qty", Some(json!(required_qty(args)?)));
            put("order_class", Some(json!(args.order_class.as_deref().unwrap_or("market"))));
            put("limit_price", args.limit_price.map(|v| json!(v)));
            put("stop_price", args.stop_price.map(|v| json!(v)));
            put("time_in_force", Some(json!(args.tif.as_deref().unwrap_or("day"))));
        }
        OrderType::CryptoBuy | OrderType::CryptoSell => {
            put("symbol", Some(json!(required_symbol(args)?.to_uppercase())));
            put("qty", Some(json!(required_qty(args)?)));
            put("order_class", Some(json!(args.order_class.as_deref().unwrap_or("market"))));
            put("limit_price", args.limit_price.map(|v| json!(v)));
            put("time_in_force", Some(json!(args.tif.as_deref().unwrap_or("gtc"))));
        }
        OrderType::OptionSingle => {
            let qty = required_qty(args)?;
            if qty.fract() != 0.0 || qty < 1.0 {
                bail!("--qty must be a whole number of contracts for option orders");
            }
            let side = args.side.as_deref().context("--side is required for option orders")?;
            put("symbol", Some(json!(required_symbol(args)?)));
            put("qty", Some(json!(qty as u32)));
            put("side", Some(json!(side)));
            put("order_class", Some(json!(args.order_class.as_deref().unwrap_or("market"))));
            put("limit_price", args.limit_price.map(|v| json!(v)));
            put("time_in_force", Some(json!(args.tif.as_deref().unwrap_or("day"))));
        }
        OrderType::OptionMulti => {
            bail!("optionmulti legs cannot be expressed with flags; write the file by hand")
        }
        OrderType::MarketData => {
            put("symbols", Some(json!(symbol_list(required_symbol(args)?))));
            put("data_type", Some(json!(args.data_type.as_deref().unwrap_or("quote"))));
        }
        OrderType::OrderStatus | OrderType::CancelOrder => {
            if args.order_id.is_none() && args.client_order_id.is_none() {
                bail!("--order-id or --client-order-id is required for {}", args.order_type);
            }
            put("alpaca_order_id", args.order_id.as_ref().map(|v| json!(v)));
            put("client_order_id", args.client_order_id.as_ref().map(|v| json!(v)));
        }
        OrderType::OpenOrders => {
            put("status", Some(json!("open")));
            put("limit", Some(json!(args.limit.unwrap_or(100))));
            put("symbols", args.symbol.as_deref().map(|s| json!(symbol_list(s))));
        }
        OrderType::AllOrders => {
            put("status", Some(json!("all")));
            put("limit", Some(json!(args.limit.unwrap_or(100))));
            put("direction", Some(json!("desc")));
        }
        OrderType::Positions => {
            put("asset_class", args.asset_class.as_ref().map(|v| json!(v)));
        }
        OrderType::AccountInfo => {}
    }

    Ok(Value::Object(p))
}

fn required_symbol(args: &CreateArgs) -> Result<&str> {
    args.symbol
        .as_deref()
        .with_context(|| format!("--symbol is required for {}", args.order_type))
}

fn required_qty(args: &CreateArgs) -> Result<f64> {
    args.qty
        .with_context(|| format!("--qty is required for {}", args.order_type))
}

fn symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
