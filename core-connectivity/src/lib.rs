//! # Connectivity
//!
//! Reports the device's current connection class and streams changes.
//!
//! - [`classify`] maps a [`NetworkSnapshot`](bridge_traits::NetworkSnapshot)
//!   to a [`ConnectionClass`](bridge_traits::ConnectionClass) using the fixed
//!   priority wifi > ethernet > mobile.
//! - [`ConnectivityObserver`] owns the single OS callback registration and
//!   feeds one active [`Subscription`].

pub mod classifier;
pub mod error;
pub mod observer;

pub use classifier::{classify, classify_active};
pub use error::{ConnectivityError, Result};
pub use observer::{ConnectivityObserver, Subscription, SubscriptionId};
