use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("echo timeout")]
    EchoTimeout,
    #[error("address {addr} outside storage of {capacity} bytes")]
    AddressOutOfRange { addr: usize, capacity: usize },
    #[error("storage commit failed: {0}")]
    CommitFailed(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
