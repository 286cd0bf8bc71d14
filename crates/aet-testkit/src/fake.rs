use aet_dispatch::{ClientInitError, DispatchError, DispatchResult, Dispatcher, DispatcherFactory};
use aet_schemas::{Mode, OrderPayload, OrderType};
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One call that reached the fake broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub client_order_id: String,
    pub order_type: OrderType,
}

/// In-memory broker.
///
/// Answers from a scripted queue first; once the queue is empty every call
/// succeeds with a synthetic order `fake-<n>`.
#[derive(Debug, Default)]
pub struct FakeDispatcher {
    submits: AtomicUsize,
    log: Mutex<Vec<Submission>>,
    script: Mutex<VecDeque<Result<DispatchResult, DispatchError>>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, r: Result<DispatchResult, DispatchError>) {
        lock(&self.script).push_back(r);
    }

    pub fn fail_next(&self, e: DispatchError) {
        self.push_result(Err(e));
    }

    /// Every call sleeps this long before answering.
    pub fn set_delay(&self, d: Duration) {
        *lock(&self.delay) = Some(d);
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        lock(&self.log).clone()
    }
}

#[async_trait::async_trait]
impl Dispatcher for FakeDispatcher {
    async fn submit(
        &self,
        payload: &OrderPayload,
        client_order_id: &str,
    ) -> Result<DispatchResult, DispatchError> {
        let n = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.log).push(Submission {
            client_order_id: client_order_id.to_string(),
            order_type: payload.order_type(),
        });

        let delay = *lock(&self.delay);
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        let scripted = lock(&self.script).pop_front();
        scripted.unwrap_or_else(|| {
            Ok(DispatchResult::new(json!({
                "id": format!("fake-{n}"),
                "client_order_id": client_order_id,
                "status": "accepted",
            })))
        })
    }
}

/// Hands out one shared [`FakeDispatcher`] for every mode that is not
/// configured to fail.
#[derive(Debug, Default)]
pub struct FakeFactory {
    dispatcher: Arc<FakeDispatcher>,
    connects: AtomicUsize,
    failing: Mutex<HashSet<Mode>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatcher(&self) -> Arc<FakeDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Make `connect(mode)` fail as if its credential were missing.
    pub fn fail_mode(&self, mode: Mode) {
        lock(&self.failing).insert(mode);
    }

    pub fn heal_mode(&self, mode: Mode) {
        lock(&self.failing).remove(&mode);
    }

    /// Successful and failed attempts alike.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl DispatcherFactory for FakeFactory {
    fn connect(&self, mode: Mode) -> Result<Arc<dyn Dispatcher>, ClientInitError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if lock(&self.failing).contains(&mode) {
            return Err(ClientInitError::MissingCredential {
                mode,
                var: format!("ALPACA_{}_API_KEY", mode.as_str().to_uppercase()),
            });
        }
        Ok(self.dispatcher() as Arc<dyn Dispatcher>)
    }
}
