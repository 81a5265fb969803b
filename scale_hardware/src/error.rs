use scale_traits::PinId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("gpio pin {0} is unavailable or already in use")]
    PinUnavailable(PinId),
    #[error("gpio pin {0} used before being configured for that direction")]
    PinNotConfigured(PinId),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
