use aet_dispatch::{ClientInitError, Dispatcher, DispatcherFactory};
use aet_schemas::Mode;
use std::collections::HashMap;
use std::sync::Arc;

/// One dispatcher per mode, built on first use and reused for the life of
/// the pipeline. A failed build is not cached; the next order retries it.
pub struct ClientRegistry {
    factory: Arc<dyn DispatcherFactory>,
    clients: HashMap<Mode, Arc<dyn Dispatcher>>,
}

impl ClientRegistry {
    pub fn new(factory: Arc<dyn DispatcherFactory>) -> Self {
        Self {
            factory,
            clients: HashMap::new(),
        }
    }

    pub fn get(&mut self, mode: Mode) -> Result<Arc<dyn Dispatcher>, ClientInitError> {
        if let Some(c) = self.clients.get(&mode) {
            return Ok(Arc::clone(c));
        }
        let client = self.factory.connect(mode)?;
        self.clients.insert(mode, Arc::clone(&client));
        Ok(client)
    }

    pub fn connected_modes(&self) -> Vec<Mode> {
        Mode::ALL
            .into_iter()
            .filter(|m| self.clients.contains_key(m))
            .collect()
    }
}
