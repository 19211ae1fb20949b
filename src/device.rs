use std::fmt;
use std::sync::Arc;

use crate::class::DeviceClass;
use crate::error::Result;
use crate::stack::RemoteDevice;

/// Handle to a preknown or discovered remote device.
///
/// The platform stack owns the peer; this handle is valid for the duration
/// of the query that produced it. Cloning is cheap.
#[derive(Clone)]
pub struct Device {
    remote: Arc<dyn RemoteDevice>,
}

impl Device {
    pub(crate) fn new(remote: Arc<dyn RemoteDevice>) -> Self {
        Self { remote }
    }

    #[inline]
    pub fn address(&self) -> String {
        self.remote.address()
    }

    /// Friendly name of the device, trimmed.
    ///
    /// Resolving the name is a round-trip to the peer and can fail per
    /// device; the discovery operations document how each of them treats
    /// that failure.
    pub fn friendly_name(&self) -> Result<String> {
        Ok(self.remote.friendly_name()?.trim().to_string())
    }

    #[inline]
    pub fn is_trusted(&self) -> bool {
        self.remote.is_trusted()
    }

    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.remote.is_encrypted()
    }

    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.remote.is_authenticated()
    }

    #[inline]
    pub fn device_class(&self) -> DeviceClass {
        self.remote.device_class()
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("address", &self.address())
            .field("class", &self.device_class())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Discovered(Device),
    InquiryCompleted,
}
