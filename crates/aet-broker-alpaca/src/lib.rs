//! Alpaca REST implementation of the dispatcher boundary.
//!
//! One [`AlpacaDispatcher`] per mode. It holds a pooled `reqwest::Client`
//! with a bounded timeout and the mode's credentials, and maps every
//! order type onto the trading or market-data API.

mod client;
mod normalize;

pub use client::AlpacaDispatcher;

use aet_config::secrets::resolve_broker_credentials;
use aet_config::BrokerConfig;
use aet_dispatch::{ClientInitError, Dispatcher, DispatcherFactory};
use aet_schemas::Mode;
use std::sync::Arc;
use std::time::Duration;

/// Builds an [`AlpacaDispatcher`] for a mode on first use, reading that
/// mode's credentials from the environment at that moment.
#[derive(Debug, Clone)]
pub struct AlpacaFactory {
    broker: BrokerConfig,
    timeout: Duration,
}

impl AlpacaFactory {
    pub fn new(broker: BrokerConfig, timeout: Duration) -> Self {
        Self { broker, timeout }
    }
}

impl DispatcherFactory for AlpacaFactory {
    fn connect(&self, mode: Mode) -> Result<Arc<dyn Dispatcher>, ClientInitError> {
        let endpoint = self.broker.endpoint(mode);
        let creds = resolve_broker_credentials(endpoint)
            .map_err(|e| ClientInitError::MissingCredential { mode, var: e.var })?;

        let dispatcher = AlpacaDispatcher::new(
            &creds,
            &endpoint.trading_base_url,
            &endpoint.data_base_url,
            self.timeout,
        )?;
        tracing::info!(%mode, base_url = %endpoint.trading_base_url, "alpaca client ready");
        Ok(Arc::new(dispatcher))
    }
}
