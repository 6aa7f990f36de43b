//! Host-facing façade.

use crate::channels::{
    SaveImageArgs, GALLERY_CHANNEL, GET_NETWORK_TYPE, INPUT_FILE_NAME, INPUT_URL, NETWORK_CHANNEL,
    SAVE_IMAGE_TASK, SAVE_IMAGE_TO_GALLERY,
};
use crate::error::{CoreError, MethodError, Result};
use crate::worker::DeferredSaveWorker;
use bridge_traits::background::{
    DeferredTaskScheduler, DeferredWorker, TaskConstraints, TaskId, TaskInput, TaskStatus,
    WorkResult,
};
use bridge_traits::network::ConnectionClass;
use bridge_traits::platform::{PermissionGate, PlatformCapabilities};
use core_connectivity::{ConnectivityObserver, Subscription, SubscriptionId};
use core_runtime::config::BridgeConfig;
use core_runtime::events::{EventBus, EventStream};
use core_transfer::{NotificationSink, TransferCoordinator};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct Inner {
    observer: ConnectivityObserver,
    coordinator: Arc<TransferCoordinator>,
    worker: Arc<DeferredSaveWorker>,
    permission_gate: Arc<dyn PermissionGate>,
    capabilities: PlatformCapabilities,
    scheduler: Option<Arc<dyn DeferredTaskScheduler>>,
    event_bus: EventBus,
}

/// Primary façade exposed to host applications.
///
/// Cloning is cheap; clones share the connectivity registration and the
/// notification channel.
#[derive(Clone)]
pub struct BridgeService {
    inner: Arc<Inner>,
}

impl BridgeService {
    /// Wire the service from validated configuration.
    ///
    /// When a deferred scheduler is configured the background save worker is
    /// registered with it.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid, a bridge required by the
    /// platform capabilities is missing, or the scheduler rejects the worker.
    pub async fn new(config: BridgeConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let observer = ConnectivityObserver::with_event_bus(
            config.connectivity_provider.clone(),
            event_bus.clone(),
        );
        let notifier = Arc::new(NotificationSink::from_config(&config));
        let coordinator = Arc::new(
            TransferCoordinator::from_config(&config, notifier)?.with_event_bus(event_bus.clone()),
        );
        let worker = Arc::new(DeferredSaveWorker::new(coordinator.clone()));

        if let Some(scheduler) = &config.deferred_scheduler {
            scheduler
                .register_worker(SAVE_IMAGE_TASK, worker.clone() as Arc<dyn DeferredWorker>)
                .await?;
            debug!(task = SAVE_IMAGE_TASK, "Registered deferred save worker");
        }

        info!(coordinator = ?coordinator, "Bridge service ready");

        Ok(Self {
            inner: Arc::new(Inner {
                observer,
                coordinator,
                worker,
                permission_gate: config.permission_gate.clone(),
                capabilities: config.capabilities,
                scheduler: config.deferred_scheduler.clone(),
                event_bus,
            }),
        })
    }

    /// Current network type as its wire name.
    pub fn get_network_type(&self) -> &'static str {
        self.network_class().as_str()
    }

    pub fn network_class(&self) -> ConnectionClass {
        self.inner.observer.current_class()
    }

    /// Start the `networkTypeChanges` stream.
    ///
    /// The first item is the current type. Only the most recent stream
    /// receives events; starting another ends the previous one.
    pub fn network_type_changes(&self) -> Result<Subscription> {
        Ok(self.inner.observer.subscribe()?)
    }

    /// Stop a `networkTypeChanges` stream. Unknown ids are ignored.
    pub fn cancel_network_type_changes(&self, id: SubscriptionId) {
        self.inner.observer.unsubscribe(id);
    }

    /// Interactive save.
    ///
    /// When the platform needs a storage grant that is missing, the prompt is
    /// raised in the background and `PERMISSION_DENIED` returned without any
    /// download.
    pub async fn save_image_to_gallery(
        &self,
        url: &str,
        file_name: &str,
    ) -> std::result::Result<bool, MethodError> {
        if self.inner.capabilities.storage_permission_required {
            let status = self.inner.permission_gate.storage_write_status().await;
            if !status.is_granted() {
                warn!(?status, "Storage permission missing; requesting");
                let gate = self.inner.permission_gate.clone();
                tokio::spawn(async move { gate.request_storage_write().await });
                return Err(MethodError::permission_denied());
            }
        }

        let outcome = self.inner.coordinator.run(url, file_name).await;
        match MethodError::from_outcome(&outcome) {
            None => Ok(true),
            Some(err) => Err(err),
        }
    }

    /// Queue a background save with the deferred scheduler.
    pub async fn enqueue_save(&self, url: &str, file_name: &str) -> Result<TaskId> {
        let scheduler = self.scheduler()?;
        let input = TaskInput::new()
            .with(INPUT_URL, url)
            .with(INPUT_FILE_NAME, file_name);

        let id = scheduler
            .enqueue(SAVE_IMAGE_TASK, input, TaskConstraints::default())
            .await?;
        debug!(task_id = %id.0, "Queued background save");
        Ok(id)
    }

    pub async fn save_task_status(&self, id: &TaskId) -> Result<TaskStatus> {
        Ok(self.scheduler()?.get_task_status(id).await?)
    }

    pub async fn cancel_save(&self, id: &TaskId) -> Result<()> {
        Ok(self.scheduler()?.cancel_task(id).await?)
    }

    /// Deferred-task entry point for hosts whose scheduler calls back in.
    pub async fn run_deferred_save(&self, input: &TaskInput) -> WorkResult {
        self.inner.worker.do_work(input).await
    }

    /// Dispatch a host method call.
    ///
    /// Returns the method's JSON result or a structured error; unknown
    /// methods yield `NOT_IMPLEMENTED`.
    pub async fn handle_method_call(
        &self,
        channel: &str,
        method: &str,
        args: Value,
    ) -> std::result::Result<Value, MethodError> {
        match (channel, method) {
            (NETWORK_CHANNEL, GET_NETWORK_TYPE) => {
                Ok(Value::String(self.get_network_type().to_string()))
            }
            (GALLERY_CHANNEL, SAVE_IMAGE_TO_GALLERY) => {
                let SaveImageArgs {
                    url: Some(url),
                    file_name: Some(file_name),
                } = SaveImageArgs::from_value(args)
                else {
                    return Err(MethodError::invalid_arguments("URL or fileName missing"));
                };
                self.save_image_to_gallery(&url, &file_name)
                    .await
                    .map(Value::Bool)
            }
            _ => {
                debug!(channel, method, "Unhandled method call");
                Err(MethodError::not_implemented(channel, method))
            }
        }
    }

    /// Subscribe to core events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.inner.event_bus.subscribe())
    }

    fn scheduler(&self) -> Result<&Arc<dyn DeferredTaskScheduler>> {
        self.inner
            .scheduler
            .as_ref()
            .ok_or_else(|| CoreError::CapabilityMissing {
                capability: "DeferredTaskScheduler".to_string(),
                message: "Background saves need a deferred scheduler bridge".to_string(),
            })
    }
}

/// Build a service backed entirely by the desktop bridges.
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop() -> Result<BridgeService> {
    let config = BridgeConfig::builder().build()?;
    BridgeService::new(config).await
}
