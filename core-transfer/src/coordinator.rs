//! Transfer orchestration.
//!
//! Every transfer walks Validating → Fetching → Persisting → Notifying.
//! The outcome is fixed before the Notifying stage starts; the notice and the
//! transfer event are emitted afterwards and cannot change it.

use crate::error::PersistError;
use crate::fetcher::{HttpMediaFetcher, MediaFetcher};
use crate::notifier::NotificationSink;
use crate::outcome::TransferOutcome;
use crate::persister::{select_persister, MediaPersister};
use crate::request::TransferRequest;
use bridge_traits::platform::PermissionGate;
use core_runtime::config::{BridgeConfig, DEFAULT_FETCH_TIMEOUT};
use core_runtime::events::{CoreEvent, EventBus, TransferEvent};
use core_runtime::logging::redact_url;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, Instrument};

/// Stage a transfer is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Validating,
    Fetching,
    Persisting,
    Notifying,
    Done,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferStage::Validating => "validating",
            TransferStage::Fetching => "fetching",
            TransferStage::Persisting => "persisting",
            TransferStage::Notifying => "notifying",
            TransferStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Runs fetch → persist → notify as one unit of work.
///
/// Invocations share no state besides the notification sink, so independent
/// requests may run concurrently. Two requests with the same display name
/// are not coordinated; the persister's own conflict behavior applies.
pub struct TransferCoordinator {
    fetcher: Arc<dyn MediaFetcher>,
    persister: Arc<dyn MediaPersister>,
    notifier: Arc<NotificationSink>,
    permission_gate: Option<Arc<dyn PermissionGate>>,
    fetch_timeout: Duration,
    event_bus: Option<EventBus>,
}

impl TransferCoordinator {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        persister: Arc<dyn MediaPersister>,
        notifier: Arc<NotificationSink>,
    ) -> Self {
        Self {
            fetcher,
            persister,
            notifier,
            permission_gate: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            event_bus: None,
        }
    }

    /// Wire a coordinator from validated configuration.
    ///
    /// The permission gate is only consulted when the platform requires a
    /// storage-write grant.
    pub fn from_config(
        config: &BridgeConfig,
        notifier: Arc<NotificationSink>,
    ) -> core_runtime::Result<Self> {
        let fetcher = Arc::new(HttpMediaFetcher::new(config.http_client.clone()));
        let persister = select_persister(config)?;

        let mut coordinator =
            Self::new(fetcher, persister, notifier).with_fetch_timeout(config.fetch_timeout);
        if config.capabilities.storage_permission_required {
            coordinator = coordinator.with_permission_gate(config.permission_gate.clone());
        }
        Ok(coordinator)
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Refuse to start a transfer unless this gate reports a storage grant.
    pub fn with_permission_gate(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.permission_gate = Some(gate);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Run one transfer.
    ///
    /// Never fails outright: every failure is folded into the returned
    /// [`TransferOutcome`]. Exactly one notice is dispatched per call.
    pub async fn run(&self, source_url: &str, display_name: &str) -> TransferOutcome {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("transfer", request_id = %request_id, display_name = %display_name);

        async {
            let outcome = self.execute(&request_id, source_url, display_name).await;

            debug!(stage = %TransferStage::Notifying, "Transfer stage");
            self.publish(&request_id, display_name, &outcome);

            match &outcome {
                TransferOutcome::Success(location) => {
                    info!(location = %location, "Transfer finished")
                }
                failure => info!(
                    outcome = %failure,
                    retryable = failure.is_retryable(),
                    "Transfer failed"
                ),
            }
            debug!(stage = %TransferStage::Done, "Transfer stage");
            outcome
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        request_id: &str,
        source_url: &str,
        display_name: &str,
    ) -> TransferOutcome {
        debug!(stage = %TransferStage::Validating, "Transfer stage");
        let request = match TransferRequest::new(source_url, display_name) {
            Ok(request) => request,
            Err(err) => return TransferOutcome::InvalidRequest(err),
        };

        if let Some(gate) = &self.permission_gate {
            let status = gate.storage_write_status().await;
            if !status.is_granted() {
                return TransferOutcome::PersistFailed(PersistError::PermissionDenied(format!(
                    "storage write permission is {:?}",
                    status
                )));
            }
        }

        self.emit(TransferEvent::Started {
            request_id: request_id.to_string(),
            display_name: request.display_name().to_string(),
        });

        debug!(
            stage = %TransferStage::Fetching,
            url = %redact_url(request.source_url()),
            timeout = ?self.fetch_timeout,
            "Transfer stage"
        );
        let image = match self
            .fetcher
            .fetch(request.source_url(), self.fetch_timeout)
            .await
        {
            Ok(image) => image,
            Err(err) => return TransferOutcome::DownloadFailed(err),
        };

        debug!(stage = %TransferStage::Persisting, image = ?image, "Transfer stage");
        match self.persister.persist(&image, request.display_name()).await {
            Ok(location) => TransferOutcome::Success(location),
            Err(err) => TransferOutcome::PersistFailed(err),
        }
    }

    fn publish(&self, request_id: &str, display_name: &str, outcome: &TransferOutcome) {
        self.notifier.dispatch(outcome.notice(display_name));

        let event = match outcome {
            TransferOutcome::Success(location) => TransferEvent::Succeeded {
                request_id: request_id.to_string(),
                display_name: display_name.to_string(),
                location: location.to_string(),
            },
            failure => TransferEvent::Failed {
                request_id: request_id.to_string(),
                display_name: display_name.to_string(),
                code: failure.error_code().unwrap_or_default().to_string(),
                retryable: failure.is_retryable(),
            },
        };
        self.emit(event);
    }

    fn emit(&self, event: TransferEvent) {
        if let Some(bus) = &self.event_bus {
            // No subscribers is fine
            let _ = bus.emit(CoreEvent::Transfer(event));
        }
    }
}

impl fmt::Debug for TransferCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferCoordinator")
            .field("strategy", &self.persister.strategy())
            .field("fetch_timeout", &self.fetch_timeout)
            .field("permission_gated", &self.permission_gate.is_some())
            .finish()
    }
}
