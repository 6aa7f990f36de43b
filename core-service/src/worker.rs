//! Deferred save entry point.

use crate::channels::{INPUT_FILE_NAME, INPUT_URL};
use async_trait::async_trait;
use bridge_traits::background::{DeferredWorker, TaskInput, WorkResult};
use core_transfer::{TransferCoordinator, TransferOutcome};
use std::sync::Arc;
use tracing::debug;

/// Runs a background save and reports the outcome to the scheduler.
///
/// The only user-visible result is the coordinator's notification.
pub struct DeferredSaveWorker {
    coordinator: Arc<TransferCoordinator>,
}

impl DeferredSaveWorker {
    pub fn new(coordinator: Arc<TransferCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Scheduler signal for an outcome.
    pub fn work_result(outcome: &TransferOutcome) -> WorkResult {
        if outcome.is_success() {
            WorkResult::Success
        } else if outcome.is_retryable() {
            WorkResult::Retry
        } else {
            WorkResult::Failure
        }
    }
}

#[async_trait]
impl DeferredWorker for DeferredSaveWorker {
    async fn do_work(&self, input: &TaskInput) -> WorkResult {
        // Missing keys flow through validation and surface as an invalid request
        let url = input.get_string(INPUT_URL).unwrap_or_default();
        let file_name = input.get_string(INPUT_FILE_NAME).unwrap_or_default();

        let outcome = self.coordinator.run(url, file_name).await;
        let result = Self::work_result(&outcome);
        debug!(?result, "Deferred save finished");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::MediaUri;
    use core_transfer::{FetchError, InvalidRequest, PersistError, PersistedLocation};

    #[test]
    fn test_work_result_mapping() {
        let saved = TransferOutcome::Success(PersistedLocation::Media(MediaUri::new("media://1")));
        assert_eq!(DeferredSaveWorker::work_result(&saved), WorkResult::Success);
        assert_eq!(
            DeferredSaveWorker::work_result(&TransferOutcome::DownloadFailed(
                FetchError::ConnectionFailed("refused".into())
            )),
            WorkResult::Retry
        );
        assert_eq!(
            DeferredSaveWorker::work_result(&TransferOutcome::PersistFailed(
                PersistError::IoFailed("disk".into())
            )),
            WorkResult::Retry
        );
        assert_eq!(
            DeferredSaveWorker::work_result(&TransferOutcome::PersistFailed(
                PersistError::EncodeFailed("png".into())
            )),
            WorkResult::Failure
        );
        assert_eq!(
            DeferredSaveWorker::work_result(&TransferOutcome::InvalidRequest(
                InvalidRequest::MissingUrl
            )),
            WorkResult::Failure
        );
    }
}
