//! # Transfer Module
//!
//! Fetches a remote image and saves it into the user's media library.
//!
//! ## Components
//!
//! - **Request** (`request`): validated `{url, fileName}` pair
//! - **Fetcher** (`fetcher`): single-attempt, timeout-bounded download and decode
//! - **Persister** (`persister`): mediated media-store insertion or direct
//!   pictures-directory write, picked once from platform capabilities
//! - **Notifier** (`notifier`): best-effort status notifications
//! - **Coordinator** (`coordinator`): Validating → Fetching → Persisting →
//!   Notifying as one unit of work
//! - **Outcome** (`outcome`): the single externally visible result

pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod notifier;
pub mod outcome;
pub mod persister;
pub mod request;

pub use coordinator::{TransferCoordinator, TransferStage};
pub use error::{FetchError, PersistError};
pub use fetcher::{DecodedImage, HttpMediaFetcher, MediaFetcher};
pub use notifier::{Notice, NotificationSink};
pub use outcome::TransferOutcome;
pub use persister::{
    select_persister, DirectPersister, MediaPersister, MediatedPersister, PersistStrategy,
    PersistedLocation,
};
pub use request::{InvalidRequest, TransferRequest};
