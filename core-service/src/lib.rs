//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (connectivity,
//! HTTP, media storage, notifications, permissions, deferred scheduling)
//! into the connectivity and transfer cores and exposes them through the
//! host method channels. Desktop apps typically enable the `desktop-shims`
//! feature (which depends on `bridge-desktop`).

pub mod channels;
pub mod error;
pub mod service;
pub mod worker;

pub use error::{CoreError, ErrorCode, MethodError, Result};
pub use service::BridgeService;
pub use worker::DeferredSaveWorker;

#[cfg(feature = "desktop-shims")]
pub use service::bootstrap_desktop;
