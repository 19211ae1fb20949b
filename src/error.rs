use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The local Bluetooth radio could not be accessed.
    #[error("local Bluetooth adapter unavailable: {0}")]
    AdapterUnavailable(String),

    /// A remote device's friendly name could not be resolved.
    ///
    /// Name resolution is a round-trip to the peer and can fail for a
    /// single device while the rest of the enumeration is fine.
    #[error("could not resolve the name of {address}: {reason}")]
    NameResolution { address: String, reason: String },

    /// The inquiry did not signal completion within the configured deadline.
    #[error("inquiry did not complete within {0:?}")]
    InquiryTimeout(Duration),

    /// Failure inside the platform Bluetooth stack.
    #[error("bluetooth stack error: {0}")]
    Stack(String),
}
