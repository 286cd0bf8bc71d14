use crate::normalize;
use aet_config::secrets::BrokerCredentials;
use aet_dispatch::{ClientInitError, DispatchError, DispatchResult, Dispatcher};
use aet_schemas::{
    AllOrdersPayload, CryptoOrderPayload, DataType, MarketDataPayload, OpenOrdersPayload,
    OptionMultiPayload, OptionSinglePayload, OrderLookupPayload, OrderPayload, OrderRef,
    PositionsPayload, Side, StockOrderPayload,
};
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::{json, Map, Value};
use std::time::Duration;

pub struct AlpacaDispatcher {
    client: Client,
    api_key: String,
    api_secret: String,
    trading_base_url: String,
    data_base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for AlpacaDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaDispatcher")
            .field("trading_base_url", &self.trading_base_url)
            .field("data_base_url", &self.data_base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AlpacaDispatcher {
    pub fn new(
        creds: &BrokerCredentials,
        trading_base_url: &str,
        data_base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ClientInitError> {
        for base in [trading_base_url, data_base_url] {
            Url::parse(base)
                .map_err(|e| ClientInitError::Build(format!("invalid base url '{base}': {e}")))?;
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientInitError::Build(format!("http client build failed: {e}")))?;

        Ok(Self {
            client,
            api_key: creds.api_key.clone(),
            api_secret: creds.api_secret.clone(),
            trading_base_url: trading_base_url.trim_end_matches('/').to_string(),
            data_base_url: data_base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Point both APIs at one server. Used against local mocks.
    pub fn new_with_base_url(
        creds: &BrokerCredentials,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ClientInitError> {
        Self::new(creds, base_url, base_url, timeout)
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    fn url(&self, base: &str, segments: &[&str]) -> Result<Url, DispatchError> {
        let mut url = Url::parse(base).map_err(|e| DispatchError::Transient(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| DispatchError::Transient(format!("base url '{base}' cannot carry a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, DispatchError> {
        let mut req = self
            .client
            .request(method.clone(), url.clone())
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        tracing::debug!(%method, path = %url.path(), "alpaca request");
        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(classify(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| DispatchError::Decode(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> DispatchError {
        if e.is_timeout() {
            DispatchError::Timeout(self.timeout)
        } else {
            DispatchError::Transient(e.to_string())
        }
    }

    async fn trading(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, DispatchError> {
        let url = self.url(&self.trading_base_url, segments)?;
        self.call(method, url, query, body).await
    }

    async fn data(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Value, DispatchError> {
        let url = self.url(&self.data_base_url, segments)?;
        self.call(Method::GET, url, query, None).await
    }

    // -----------------------------------------------------------------------
    // Placements
    // -----------------------------------------------------------------------

    async fn place(&self, body: Value) -> Result<DispatchResult, DispatchError> {
        let raw = self.trading(Method::POST, &["v2", "orders"], &[], Some(&body)).await?;
        Ok(DispatchResult::new(normalize::order(&raw)))
    }

    fn stock_body(p: &StockOrderPayload, side: Side, client_order_id: &str) -> Value {
        let mut body = Map::new();
        body.insert("symbol".into(), json!(p.symbol));
        body.insert("qty".into(), json!(normalize::decimal(p.qty)));
        body.insert("side".into(), json!(side.as_str()));
        body.insert("type".into(), json!(p.order_class.as_str()));
        body.insert("time_in_force".into(), json!(p.time_in_force.as_str()));
        if let Some(lp) = p.limit_price.filter(|_| p.order_class.needs_limit_price()) {
            body.insert("limit_price".into(), json!(normalize::decimal(lp)));
        }
        if let Some(sp) = p.stop_price.filter(|_| p.order_class.needs_stop_price()) {
            body.insert("stop_price".into(), json!(normalize::decimal(sp)));
        }
        body.insert("client_order_id".into(), json!(client_order_id));
        Value::Object(body)
    }

    fn crypto_body(p: &CryptoOrderPayload, side: Side, client_order_id: &str) -> Value {
        let mut body = json!({
            "symbol": p.symbol,
            "qty": normalize::decimal(p.qty),
            "side": side.as_str(),
            "type": p.order_class.as_str(),
            "time_in_force": p.time_in_force.as_str(),
            "client_order_id": client_order_id,
        });
        if let Some(lp) = p.limit_price {
            body["limit_price"] = json!(normalize::decimal(lp));
        }
        body
    }

    fn option_single_body(p: &OptionSinglePayload, client_order_id: &str) -> Value {
        let mut body = json!({
            "symbol": p.symbol,
            "qty": p.qty.to_string(),
            "side": p.side.as_str(),
            "type": p.order_class.as_str(),
            "time_in_force": p.time_in_force.as_str(),
            "client_order_id": client_order_id,
        });
        if let Some(lp) = p.limit_price {
            body["limit_price"] = json!(normalize::decimal(lp));
        }
        body
    }

    fn option_multi_body(p: &OptionMultiPayload, client_order_id: &str) -> Value {
        let legs: Vec<Value> = p
            .legs
            .iter()
            .map(|l| json!({"symbol": l.symbol, "side": l.side.as_str(), "ratio_qty": l.ratio_qty.to_string()}))
            .collect();
        json!({
            "order_class": "mleg",
            "type": "limit",
            "limit_price": normalize::decimal(p.limit_price),
            "time_in_force": p.time_in_force.as_str(),
            "legs": legs,
            "client_order_id": client_order_id,
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    async fn market_data(&self, p: &MarketDataPayload) -> Result<DispatchResult, DispatchError> {
        let (plural, wrapper) = match p.data_type {
            DataType::Quote => ("quotes", "quote"),
            DataType::Bar => ("bars", "bar"),
            DataType::Trade => ("trades", "trade"),
        };
        let shape = |v: &Value| match p.data_type {
            DataType::Quote => normalize::quote(v),
            DataType::Bar => normalize::bar(v),
            DataType::Trade => normalize::trade(v),
        };

        let mut results = Map::new();
        for symbol in &p.symbols {
            let entry = if normalize::is_crypto_pair(symbol) {
                let pair = normalize::crypto_pair(symbol);
                let raw = self
                    .data(
                        &["v1beta3", "crypto", "us", "latest", plural],
                        &[("symbols", pair.clone())],
                    )
                    .await?;
                raw.get(plural).and_then(|m| m.get(&pair)).map(shape)
            } else {
                let raw = self.data(&["v2", "stocks", symbol.as_str(), plural, "latest"], &[]).await?;
                raw.get(wrapper).map(shape)
            };
            let entry = entry.ok_or_else(|| {
                DispatchError::Decode(format!("no {} returned for {symbol}", p.data_type.as_str()))
            })?;
            results.insert(symbol.clone(), entry);
        }

        let mut out = Map::new();
        out.insert(plural.to_string(), Value::Object(results));
        Ok(DispatchResult::new(Value::Object(out)))
    }

    async fn find_order(&self, target: OrderRef<'_>) -> Result<Value, DispatchError> {
        match target {
            OrderRef::Upstream(id) => self.trading(Method::GET, &["v2", "orders", id], &[], None).await,
            OrderRef::Client(cid) => {
                self.trading(
                    Method::GET,
                    &["v2", "orders:by_client_order_id"],
                    &[("client_order_id", cid.to_string())],
                    None,
                )
                .await
            }
        }
    }

    fn lookup_target(p: &OrderLookupPayload) -> Result<OrderRef<'_>, DispatchError> {
        p.target().ok_or_else(|| DispatchError::Rejected {
            status: StatusCode::BAD_REQUEST.as_u16(),
            message: "Must provide either alpaca_order_id or client_order_id".into(),
        })
    }

    async fn order_status(&self, p: &OrderLookupPayload) -> Result<DispatchResult, DispatchError> {
        let raw = self.find_order(Self::lookup_target(p)?).await?;
        Ok(DispatchResult::new(normalize::order(&raw)))
    }

    async fn cancel_order(&self, p: &OrderLookupPayload) -> Result<DispatchResult, DispatchError> {
        let data = match Self::lookup_target(p)? {
            OrderRef::Upstream(id) => {
                self.trading(Method::DELETE, &["v2", "orders", id], &[], None).await?;
                json!({"cancelled": true, "order_id": id})
            }
            OrderRef::Client(cid) => {
                let order = self.find_order(OrderRef::Client(cid)).await?;
                let id = order
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| DispatchError::Decode(format!("order for '{cid}' has no id")))?
                    .to_string();
                self.trading(Method::DELETE, &["v2", "orders", id.as_str()], &[], None).await?;
                json!({"cancelled": true, "order_id": id, "client_order_id": cid})
            }
        };
        let upstream_id = data.get("order_id").and_then(Value::as_str).map(str::to_string);
        Ok(DispatchResult { upstream_id, data })
    }

    async fn list_orders(&self, query: Vec<(&str, String)>) -> Result<DispatchResult, DispatchError> {
        let raw = self.trading(Method::GET, &["v2", "orders"], &query, None).await?;
        Ok(DispatchResult::new(json!({ "orders": normalize::orders(&raw) })))
    }

    async fn open_orders(&self, p: &OpenOrdersPayload) -> Result<DispatchResult, DispatchError> {
        let mut query = vec![("status", p.status.as_str().to_string()), ("limit", p.limit.to_string())];
        if let Some(symbols) = p.symbols.as_ref().filter(|s| !s.is_empty()) {
            query.push(("symbols", symbols.join(",")));
        }
        self.list_orders(query).await
    }

    async fn all_orders(&self, p: &AllOrdersPayload) -> Result<DispatchResult, DispatchError> {
        let mut query = vec![
            ("status", p.status.as_str().to_string()),
            ("limit", p.limit.to_string()),
            ("direction", p.direction.as_str().to_string()),
        ];
        if let Some(after) = &p.after {
            query.push(("after", after.clone()));
        }
        if let Some(until) = &p.until {
            query.push(("until", until.clone()));
        }
        self.list_orders(query).await
    }

    async fn positions(&self, p: &PositionsPayload) -> Result<DispatchResult, DispatchError> {
        let raw = self.trading(Method::GET, &["v2", "positions"], &[], None).await?;
        let wanted = p.asset_class.map(|c| c.as_str());
        let positions: Vec<Value> = raw
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter(|pos| match wanted {
                Some(class) => pos.get("asset_class").and_then(Value::as_str) == Some(class),
                None => true,
            })
            .map(normalize::position)
            .collect();
        Ok(DispatchResult::new(json!({ "positions": positions })))
    }

    async fn account(&self) -> Result<DispatchResult, DispatchError> {
        let raw = self.trading(Method::GET, &["v2", "account"], &[], None).await?;
        Ok(DispatchResult::new(normalize::account(&raw)))
    }
}

/// Non-2xx status to error class. The broker's `message` is preferred over
/// the raw body.
fn classify(status: StatusCode, body: &str) -> DispatchError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    let code = status.as_u16();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DispatchError::Auth { status: code, message },
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            DispatchError::Transient(format!("HTTP {code}: {message}"))
        }
        _ => DispatchError::Rejected { status: code, message },
    }
}

#[async_trait::async_trait]
impl Dispatcher for AlpacaDispatcher {
    async fn submit(
        &self,
        payload: &OrderPayload,
        client_order_id: &str,
    ) -> Result<DispatchResult, DispatchError> {
        match payload {
            OrderPayload::StockBuy(p) => self.place(Self::stock_body(p, Side::Buy, client_order_id)).await,
            OrderPayload::StockSell(p) => self.place(Self::stock_body(p, Side::Sell, client_order_id)).await,
            OrderPayload::OptionSingle(p) => self.place(Self::option_single_body(p, client_order_id)).await,
            OrderPayload::OptionMulti(p) => self.place(Self::option_multi_body(p, client_order_id)).await,
            OrderPayload::CryptoBuy(p) => self.place(Self::crypto_body(p, Side::Buy, client_order_id)).await,
            OrderPayload::CryptoSell(p) => self.place(Self::crypto_body(p, Side::Sell, client_order_id)).await,
            OrderPayload::MarketData(p) => self.market_data(p).await,
            OrderPayload::OrderStatus(p) => self.order_status(p).await,
            OrderPayload::OpenOrders(p) => self.open_orders(p).await,
            OrderPayload::AllOrders(p) => self.all_orders(p).await,
            OrderPayload::Positions(p) => self.positions(p).await,
            OrderPayload::AccountInfo(_) => self.account().await,
            OrderPayload::CancelOrder(p) => self.cancel_order(p).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, r#"{"message":"unauthorized."}"#),
            DispatchError::Auth { status: 401, ref message } if message == "unauthorized."
        ));
        assert!(matches!(
            classify(StatusCode::UNPROCESSABLE_ENTITY, "qty must be > 0"),
            DispatchError::Rejected { status: 422, .. }
        ));
        assert!(matches!(classify(StatusCode::BAD_GATEWAY, ""), DispatchError::Transient(_)));
        assert!(matches!(classify(StatusCode::TOO_MANY_REQUESTS, ""), DispatchError::Transient(_)));
    }

    #[test]
    fn limit_price_only_sent_for_priced_classes() {
        let p: StockOrderPayload = serde_json::from_value(json!({
            "symbol": "AAPL", "qty": 5, "order_class": "market", "limit_price": 1.0, "time_in_force": "day"
        }))
        .unwrap();
        let body = AlpacaDispatcher::stock_body(&p, Side::Buy, "k");
        assert!(body.get("limit_price").is_none());
        assert_eq!(body["qty"], json!("5"));
        assert_eq!(body["side"], json!("buy"));
        assert_eq!(body["client_order_id"], json!("k"));
    }
}
