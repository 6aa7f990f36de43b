//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the photo bridge core:
//! - Logging and tracing setup
//! - Bridge configuration with fail-fast validation
//! - Typed event bus
//!
//! Every other core crate builds on these pieces; none of them touch the
//! network or storage directly.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{BridgeConfig, BridgeConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
