//! Maps `Box<dyn Error>` from the `GpioPort` boundary to typed `ScaleError`.
//!
//! `scale_traits::GpioPort` returns boxed errors so each backend keeps its own
//! type; this module folds them into `ScaleError::Backend`, with an optional
//! feature-gated path for `scale_hardware::HwError` downcasting.

use crate::error::ScaleError;

/// Map a port-boundary error to a typed `ScaleError`.
///
/// Port failures are never timeouts: readiness is decided by the transport,
/// so every error from the port itself is a backend failure.
pub fn map_hw_error(e: &(dyn std::error::Error + Send + Sync + 'static)) -> ScaleError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<scale_hardware::HwError>() {
            return match hw {
                scale_hardware::HwError::PinUnavailable(pin) => {
                    ScaleError::Backend(format!("pin {pin} unavailable"))
                }
                other => ScaleError::Backend(other.to_string()),
            };
        }
    }

    ScaleError::Backend(e.to_string())
}
