use crate::dirs::{relocate, TowerDirs};
use crate::registry::ClientRegistry;
use crate::stats::RunStats;
use aet_config::TowerConfig;
use aet_dispatch::{ClientInitError, DispatchError, DispatcherFactory};
use aet_ledger::Ledger;
use aet_outcome::{OutcomeTarget, ResponseWriter};
use aet_schemas::ErrorKind;
use aet_validate::{salvage_filename, validate_order_file, ValidatedOrder, ValidationError};
use anyhow::Result;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Where a file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDisposition {
    Completed(PathBuf),
    /// `path` is the file's location after the attempt. It is only outside
    /// the failed area when relocation itself failed.
    Failed { kind: ErrorKind, path: PathBuf },
}

impl FileDisposition {
    pub fn path(&self) -> &Path {
        match self {
            FileDisposition::Completed(p) => p,
            FileDisposition::Failed { path, .. } => path,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            FileDisposition::Completed(_) => None,
            FileDisposition::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// Everything that can send a file to the failed area.
#[derive(Debug)]
enum Failure {
    Rejected(ValidationError),
    Duplicate(&'static str),
    ClientInit(ClientInitError),
    Dispatch(DispatchError),
    Unexpected {
        stage: &'static str,
        reason: String,
        extra: Value,
        /// Broker id when the failure came after a successful dispatch.
        upstream_id: Option<String>,
    },
}

impl Failure {
    fn unexpected(stage: &'static str, err: &anyhow::Error) -> Self {
        Failure::Unexpected {
            stage,
            reason: format!("{err:#}"),
            extra: Value::Null,
            upstream_id: None,
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Failure::Rejected(_) => ErrorKind::ValidationError,
            Failure::Duplicate(_) => ErrorKind::DuplicateError,
            Failure::ClientInit(_) => ErrorKind::ClientInitError,
            Failure::Dispatch(_) => ErrorKind::ApiError,
            Failure::Unexpected { .. } => ErrorKind::UnknownError,
        }
    }

    fn message(&self) -> String {
        match self {
            Failure::Rejected(e) => e.to_string(),
            Failure::Duplicate(reason) => format!("Duplicate order detected: {reason}"),
            Failure::ClientInit(e) => format!("Failed to initialize brokerage client: {e}"),
            Failure::Dispatch(e) => e.to_string(),
            Failure::Unexpected { reason, .. } => format!("Unexpected error: {reason}"),
        }
    }

    fn request_order_id(&self) -> Option<String> {
        match self {
            Failure::Unexpected { upstream_id, .. } => upstream_id.clone(),
            _ => None,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Failure::Rejected(e) => Some(json!({ "stage": e.stage() })),
            Failure::Duplicate(_) => None,
            Failure::ClientInit(ClientInitError::MissingCredential { mode, var }) => {
                Some(json!({ "mode": mode.as_str(), "env_var": var }))
            }
            Failure::ClientInit(ClientInitError::Build(_)) => None,
            Failure::Dispatch(e) => Some(e.details()),
            Failure::Unexpected { stage, extra, .. } => {
                let mut d = json!({ "stage": stage });
                if let (Some(obj), Value::Object(more)) = (d.as_object_mut(), extra) {
                    obj.extend(more.clone());
                }
                Some(d)
            }
        }
    }
}

/// Drives one order file at a time from intake to a terminal area.
pub struct Pipeline {
    dirs: TowerDirs,
    ledger: Ledger,
    writer: ResponseWriter,
    clients: ClientRegistry,
    dispatch_timeout: Duration,
    stats: RunStats,
}

impl Pipeline {
    /// Create the state directories and open the ledger.
    pub fn new(cfg: &TowerConfig, factory: Arc<dyn DispatcherFactory>) -> Result<Self> {
        let dirs = TowerDirs::from_config(&cfg.paths);
        dirs.ensure()?;
        let ledger = Ledger::open(cfg.paths.ledger_file())?;
        let writer = ResponseWriter::new(cfg.paths.responses_dir());

        tracing::info!(
            incoming = %dirs.incoming.display(),
            responses = %writer.root().display(),
            ledger = %ledger.path().display(),
            ledger_keys = ledger.len(),
            "pipeline ready"
        );

        Ok(Self {
            dirs,
            ledger,
            writer,
            clients: ClientRegistry::new(factory),
            dispatch_timeout: cfg.dispatch.timeout(),
            stats: RunStats::default(),
        })
    }

    pub fn dirs(&self) -> &TowerDirs {
        &self.dirs
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Finish or flag whatever a previous run left in the processing area.
    pub fn reconcile(&self) -> Result<crate::ReconcileReport> {
        crate::reconcile_processing(&self.dirs, &self.ledger, &self.writer)
    }

    /// Take one intake file to completed or failed.
    pub async fn process_file(&mut self, path: &Path) -> FileDisposition {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(file = %name, "order file picked up");

        let order = match validate_order_file(path) {
            Ok(order) => order,
            Err(e) => {
                let salvaged = salvage_filename(&name);
                let target = OutcomeTarget::new(
                    salvaged.agent_id,
                    salvaged.mode,
                    salvaged.order_type,
                    salvaged.timestamp,
                );
                return self.fail(path, &target, &salvaged.client_order_id, Failure::Rejected(e));
            }
        };

        let target = OutcomeTarget::new(
            order.agent_id(),
            order.mode().as_str(),
            order.order_type().as_str(),
            order.fields.timestamp.as_str(),
        );
        let key = order.client_order_id.clone();

        let in_flight = match relocate(path, &self.dirs.processing) {
            Ok(p) => p,
            Err(e) => {
                let failure = Failure::unexpected("move_to_processing", &e);
                return self.fail(path, &target, &key, failure);
            }
        };

        match self.dispatch(&order).await {
            Ok(done) => self.complete(&in_flight, &target, &order, done),
            Err(failure) => self.fail(&in_flight, &target, &key, failure),
        }
    }

    /// Dedupe, connect, and send. No broker call is made for a known key.
    async fn dispatch(&mut self, order: &ValidatedOrder) -> Result<aet_dispatch::DispatchResult, Failure> {
        if let Some(reason) = self.ledger.is_duplicate(&order.client_order_id) {
            return Err(Failure::Duplicate(reason));
        }

        let client = self.clients.get(order.mode()).map_err(Failure::ClientInit)?;

        tracing::info!(
            client_order_id = %order.client_order_id,
            mode = %order.mode(),
            order_type = %order.order_type(),
            "dispatching"
        );
        let sent = tokio::time::timeout(
            self.dispatch_timeout,
            client.submit(&order.payload, &order.client_order_id),
        )
        .await;

        match sent {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(Failure::Dispatch(e)),
            Err(_) => Err(Failure::Dispatch(DispatchError::Timeout(self.dispatch_timeout))),
        }
    }

    fn complete(
        &mut self,
        in_flight: &Path,
        target: &OutcomeTarget,
        order: &ValidatedOrder,
        done: aet_dispatch::DispatchResult,
    ) -> FileDisposition {
        let key = order.client_order_id.as_str();

        if let Err(e) = self.ledger.record(key) {
            tracing::error!(
                event = "ledger_record_failed_after_dispatch",
                client_order_id = %key,
                upstream_id = ?done.upstream_id,
                error = %format!("{e:#}"),
                "broker accepted the order but the ledger was not updated; resubmitting this key would dispatch again"
            );
            let failure = Failure::Unexpected {
                stage: "ledger_record",
                reason: format!("{e:#}"),
                extra: json!({ "data": done.data }),
                upstream_id: done.upstream_id,
            };
            return self.fail(in_flight, target, key, failure);
        }

        let upstream_id = done.upstream_id.clone();
        if let Err(e) = self
            .writer
            .write_success(target, key, done.upstream_id, done.data)
        {
            let failure = Failure::Unexpected {
                stage: "write_response",
                reason: format!("{e:#}"),
                extra: Value::Null,
                upstream_id,
            };
            return self.fail(in_flight, target, key, failure);
        }

        match relocate(in_flight, &self.dirs.completed) {
            Ok(p) => {
                self.stats.record_success();
                tracing::info!(
                    client_order_id = %key,
                    upstream_id = ?upstream_id,
                    "order completed"
                );
                FileDisposition::Completed(p)
            }
            Err(e) => {
                let failure = Failure::Unexpected {
                    stage: "move_to_completed",
                    reason: format!("{e:#}"),
                    extra: Value::Null,
                    upstream_id,
                };
                self.fail(in_flight, target, key, failure)
            }
        }
    }

    /// Best-effort error outcome, then relocation to the failed area.
    fn fail(
        &mut self,
        current: &Path,
        target: &OutcomeTarget,
        client_order_id: &str,
        failure: Failure,
    ) -> FileDisposition {
        let kind = failure.kind();
        let message = failure.message();
        tracing::warn!(
            file = %current.display(),
            client_order_id = %client_order_id,
            kind = %kind,
            %message,
            "order failed"
        );

        if let Err(e) =
            self.writer
                .write_error(
                    target,
                    client_order_id,
                    failure.request_order_id(),
                    kind,
                    &message,
                    failure.details(),
                )
        {
            tracing::warn!(error = %format!("{e:#}"), "error outcome not written");
        }

        self.stats.record_failure(kind);
        let path = match relocate(current, &self.dirs.failed) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(
                    file = %current.display(),
                    error = %format!("{e:#}"),
                    "could not move file to failed area; left in place"
                );
                current.to_path_buf()
            }
        };
        FileDisposition::Failed { kind, path }
    }
}
