//! Platform Bluetooth capability.
//!
//! The discovery layer never talks to a radio directly. Everything it needs
//! from the platform — local adapter access, the preknown device set, live
//! inquiries, per-device property reads — comes through the traits in this
//! module, so a host application can plug in a real stack (see the `bluez`
//! feature) or a scripted one in tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::class::DeviceClass;
use crate::error::Result;

/// Inquiry access code used when starting a live inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InquiryAccess {
    /// General/unlimited inquiry access (GIAC).
    General,
    /// Limited dedicated inquiry access (LIAC).
    Limited,
}

/// Discoverability mode of the local adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverableMode {
    General,
    Limited,
    NotDiscoverable,
}

/// How an inquiry ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InquiryStatus {
    Completed,
    Terminated,
    Error,
}

/// Named local-adapter properties read by
/// [`Discovery::describe_local_adapter`](crate::Discovery::describe_local_adapter).
///
/// A stack that does not know a property answers `None`.
pub mod properties {
    pub const API_VERSION: &str = "bluetooth.api.version";
    pub const MASTER_SWITCH: &str = "bluetooth.master.switch";
    pub const SD_ATTR_RETRIEVABLE_MAX: &str = "bluetooth.sd.attr.retrievable.max";
    pub const CONNECTED_DEVICES_MAX: &str = "bluetooth.connected.devices.max";
    pub const L2CAP_RECEIVE_MTU_MAX: &str = "bluetooth.l2cap.receiveMTU.max";
    pub const SD_TRANS_MAX: &str = "bluetooth.sd.trans.max";
    pub const CONNECTED_INQUIRY_SCAN: &str = "bluetooth.connected.inquiry.scan";
    pub const CONNECTED_PAGE_SCAN: &str = "bluetooth.connected.page.scan";
    pub const CONNECTED_INQUIRY: &str = "bluetooth.connected.inquiry";
    pub const CONNECTED_PAGE: &str = "bluetooth.connected.page";
}

/// Entry point into a platform Bluetooth stack.
#[async_trait]
pub trait BluetoothStack: Send + Sync {
    /// Access the local adapter.
    ///
    /// Called fresh by every discovery operation; the returned adapter is a
    /// read-only snapshot. Fails with
    /// [`Error::AdapterUnavailable`](crate::Error::AdapterUnavailable) when
    /// the local radio cannot be accessed.
    async fn local_adapter(&self) -> Result<Arc<dyn LocalAdapter>>;
}

/// A snapshot of the local Bluetooth adapter.
#[async_trait]
pub trait LocalAdapter: Send + Sync {
    fn address(&self) -> String;

    fn friendly_name(&self) -> String;

    fn discoverable_mode(&self) -> DiscoverableMode;

    /// Look up a named adapter property (see [`properties`]).
    fn property(&self, key: &str) -> Option<String>;

    /// Devices already known to the adapter (paired or cached), in the
    /// stack's enumeration order. No live scan is performed.
    async fn preknown_devices(&self) -> Result<Vec<Arc<dyn RemoteDevice>>>;

    /// Start a live inquiry, reporting results through `listener` from the
    /// stack's own thread.
    ///
    /// Returns `Ok(false)` when the platform refuses to start the inquiry.
    /// A refused inquiry is not an error and invokes no callbacks.
    async fn start_inquiry(
        &self,
        access: InquiryAccess,
        listener: Arc<dyn InquiryListener>,
    ) -> Result<bool>;
}

/// A remote Bluetooth peer, owned by the platform stack.
///
/// Handles are only valid for the duration of the query that produced them.
pub trait RemoteDevice: Send + Sync {
    fn address(&self) -> String;

    /// Resolve the device's friendly name.
    ///
    /// This is a round-trip to the peer and can block or fail per device.
    fn friendly_name(&self) -> Result<String>;

    fn is_trusted(&self) -> bool;

    fn is_encrypted(&self) -> bool;

    fn is_authenticated(&self) -> bool;

    fn device_class(&self) -> DeviceClass;
}

/// Callbacks invoked by the platform stack during a live inquiry.
///
/// The stack calls these from its own thread, one at a time. All
/// `device_discovered` calls for an inquiry happen before its
/// `inquiry_completed`.
pub trait InquiryListener: Send + Sync {
    fn device_discovered(&self, device: Arc<dyn RemoteDevice>, class: DeviceClass);

    fn inquiry_completed(&self, status: InquiryStatus);

    /// Service-level discovery is unused; stacks that report it anyway get
    /// a no-op.
    fn service_search_completed(&self, _transaction: u32, _status: InquiryStatus) {}

    /// See [`InquiryListener::service_search_completed`].
    fn services_discovered(&self, _transaction: u32) {}
}
