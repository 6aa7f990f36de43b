use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectivityError {
    #[error("Failed to register for network changes: {0}")]
    Registration(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, ConnectivityError>;
