use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures::{Stream, StreamExt};
use stream_cancel::{Trigger, Valved};
use tokio::sync::broadcast;
use tokio::sync::broadcast::Sender;
use tokio::sync::oneshot;
use tokio_stream::wrappers::BroadcastStream;

use crate::class::DeviceClass;
use crate::device::{Device, DeviceEvent};
use crate::error::{Error, Result};
use crate::stack::{
    properties, BluetoothStack, DiscoverableMode, InquiryAccess, InquiryListener, InquiryStatus,
    RemoteDevice,
};

pub struct ScanConfig {
    /// Inquiry access code used when starting the inquiry.
    access: InquiryAccess,
    /// Filters discovered devices by their class-of-device record.
    class_filter: Box<dyn Fn(DeviceClass) -> bool + Send + Sync>,
    /// The scan fails with `Error::InquiryTimeout` when no completion
    /// signal arrives within this duration.
    timeout: Option<Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            access: InquiryAccess::General,
            class_filter: Box::new(DeviceClass::is_printer),
            timeout: None,
        }
    }
}

impl ScanConfig {
    /// Inquiry access code to scan with
    pub fn access(mut self, access: InquiryAccess) -> Self {
        self.access = access;
        self
    }

    /// Filter scanned devices based on the device class, replacing the
    /// default printer filter
    pub fn filter_by_class(
        mut self,
        func: impl Fn(DeviceClass) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.class_filter = Box::new(func);
        self
    }

    /// Fail the scan if no completion signal arrives within the given
    /// duration. Without a timeout the scan waits indefinitely.
    pub fn stop_after_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Discovers Bluetooth printers through an injected platform stack.
///
/// Three of the four operations report failure through [`Error`];
/// [`Discovery::describe_local_adapter`] alone collapses failure into a
/// sentinel string. Each operation's contract states which per-device
/// failures it propagates and which it skips.
pub struct Discovery {
    stack: Arc<dyn BluetoothStack>,
    event_sender: Sender<DeviceEvent>,
    stream_stoppers: Arc<RwLock<Vec<Trigger>>>,
}

impl Discovery {
    pub fn new(stack: Arc<dyn BluetoothStack>) -> Self {
        let (event_sender, _) = broadcast::channel(16);

        Self {
            stack,
            event_sender,
            stream_stoppers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Comma-separated names of the preknown (paired) devices, in the
    /// stack's enumeration order. No live scan is performed.
    ///
    /// Fails with [`Error::AdapterUnavailable`] when the local radio cannot
    /// be accessed, and with [`Error::NameResolution`] as soon as any one
    /// device's name cannot be resolved; there is no per-device isolation
    /// here.
    pub async fn list_known_printers(&self) -> Result<String> {
        let adapter = self.stack.local_adapter().await?;

        let mut names = Vec::new();
        for remote in adapter.preknown_devices().await? {
            let device = Device::new(remote);
            let name = device.friendly_name()?;
            log::info!("device {} at {}", name, device.address());
            names.push(name);
        }

        Ok(names.join(","))
    }

    /// Full records of the preknown (paired) devices, keyed by trimmed
    /// friendly name. A later duplicate name overwrites the earlier entry.
    ///
    /// Same error policy as [`Discovery::list_known_printers`]: adapter and
    /// per-device name failures both propagate and abort the call.
    pub async fn refresh_known_devices(&self) -> Result<HashMap<String, Device>> {
        let adapter = self.stack.local_adapter().await?;

        let mut known = HashMap::new();
        for remote in adapter.preknown_devices().await? {
            let device = Device::new(remote);
            let name = device.friendly_name()?;
            log::info!("device {} found", device.address());
            log::debug!(
                "adding {}: trusted={} encrypted={} authenticated={}",
                name,
                device.is_trusted(),
                device.is_encrypted(),
                device.is_authenticated()
            );
            known.insert(name, device);
        }

        Ok(known)
    }

    /// Run a live inquiry and collect the devices that pass the configured
    /// class filter (printers, unless overridden), keyed by trimmed
    /// friendly name.
    ///
    /// The call returns once the stack signals inquiry completion, with the
    /// map exactly as populated at that point. Unlike the preknown
    /// listings, a device whose name cannot be resolved mid-inquiry is
    /// skipped with a warning and the scan continues.
    ///
    /// An inquiry the platform refuses to start yields an empty map, not an
    /// error. With [`ScanConfig::stop_after_timeout`] set, a missing
    /// completion signal surfaces as [`Error::InquiryTimeout`]; without it
    /// the call waits indefinitely.
    pub async fn active_discovery_scan(
        &self,
        config: ScanConfig,
    ) -> Result<HashMap<String, Device>> {
        let adapter = self.stack.local_adapter().await?;

        let (completed_sender, completed) = oneshot::channel();
        let listener = Arc::new(ScanListener {
            found: Mutex::new(HashMap::new()),
            class_filter: config.class_filter,
            completed: Mutex::new(Some(completed_sender)),
            event_sender: self.event_sender.clone(),
        });

        let started = adapter.start_inquiry(config.access, listener.clone()).await?;
        if !started {
            log::warn!("inquiry refused by the local adapter");
            self.stream_stoppers.write().unwrap().clear();
            return Ok(HashMap::new());
        }

        log::info!("waiting for device inquiry to complete");
        let signal = match config.timeout {
            Some(limit) => match tokio::time::timeout(limit, completed).await {
                Ok(signal) => signal,
                Err(_) => {
                    self.stream_stoppers.write().unwrap().clear();
                    return Err(Error::InquiryTimeout(limit));
                }
            },
            None => completed.await,
        };
        let (status, found) =
            signal.map_err(|_| Error::Stack("inquiry completion channel closed".into()))?;
        log::trace!("inquiry ended with {:?}", status);
        log::info!("{} device(s) found", found.len());

        self.stream_stoppers.write().unwrap().clear();

        Ok(found)
    }

    /// Describe the local adapter as labeled lines: address, friendly name,
    /// discoverability mode, and the named properties of
    /// [`properties`](crate::stack::properties). Properties the stack does
    /// not know render as `null`.
    ///
    /// Never fails: when the local radio cannot be accessed this returns
    /// the literal `"Failed to initialize Bluetooth"` instead of an error.
    pub async fn describe_local_adapter(&self) -> String {
        let adapter = match self.stack.local_adapter().await {
            Ok(adapter) => adapter,
            Err(e) => {
                log::error!("could not access the local adapter: {}", e);
                return "Failed to initialize Bluetooth".to_string();
            }
        };

        let mode = match adapter.discoverable_mode() {
            DiscoverableMode::General => "General/Unlimited Inquiry Access",
            DiscoverableMode::Limited => "Limited Dedicated Inquiry Access",
            DiscoverableMode::NotDiscoverable => "Not discoverable",
        };

        let property = |key| adapter.property(key).unwrap_or_else(|| "null".to_string());

        let lines = [
            ("Bluetooth Address", adapter.address()),
            ("Bluetooth friendly name", adapter.friendly_name()),
            ("Discovery Mode", mode.to_string()),
            ("API Version", property(properties::API_VERSION)),
            (
                "Master/Slave Switch Allowed",
                property(properties::MASTER_SWITCH),
            ),
            (
                "Max number of service attributes retrieved per record",
                property(properties::SD_ATTR_RETRIEVABLE_MAX),
            ),
            (
                "Max number of supported connected devices at one time",
                property(properties::CONNECTED_DEVICES_MAX),
            ),
            (
                "Max receiveMTU size in bytes supported in L2CAP",
                property(properties::L2CAP_RECEIVE_MTU_MAX),
            ),
            (
                "Maximum number of concurrent service discovery transactions",
                property(properties::SD_TRANS_MAX),
            ),
            (
                "Inquiry scanning allowed during connection",
                property(properties::CONNECTED_INQUIRY_SCAN),
            ),
            (
                "Page scanning allowed during connection",
                property(properties::CONNECTED_PAGE_SCAN),
            ),
            (
                "Inquiry allowed during a connection",
                property(properties::CONNECTED_INQUIRY),
            ),
            (
                "Paging allowed during a connection",
                property(properties::CONNECTED_PAGE),
            ),
        ];

        let mut out = String::new();
        for (label, value) in lines {
            out.push_str(label);
            out.push_str(": ");
            out.push_str(&value);
            out.push('\n');
        }
        out
    }

    /// Create a new stream that receives device events from active scans.
    ///
    /// The stream ends when the scan that is running completes.
    pub fn device_event_stream(&self) -> Valved<Pin<Box<dyn Stream<Item = DeviceEvent> + Send>>> {
        let receiver = self.event_sender.subscribe();

        let stream: Pin<Box<dyn Stream<Item = DeviceEvent> + Send>> =
            Box::pin(BroadcastStream::new(receiver).filter_map(|x| async move { x.ok() }));

        let (trigger, stream) = Valved::new(stream);
        self.stream_stoppers.write().unwrap().push(trigger);

        stream
    }

    /// Create a new stream that receives devices discovered by active
    /// scans, as they pass the class filter.
    pub fn device_stream(&self) -> Valved<Pin<Box<dyn Stream<Item = Device> + Send>>> {
        let receiver = self.event_sender.subscribe();

        let stream: Pin<Box<dyn Stream<Item = Device> + Send>> =
            Box::pin(BroadcastStream::new(receiver).filter_map(|x| async move {
                match x {
                    Ok(DeviceEvent::Discovered(device)) => Some(device),
                    _ => None,
                }
            }));

        let (trigger, stream) = Valved::new(stream);
        self.stream_stoppers.write().unwrap().push(trigger);

        stream
    }
}

/// Listener registered with the platform stack for one active scan.
///
/// The stack invokes the callbacks from its own thread. The first
/// completion callback carries the result map to the initiating task over
/// the one-shot channel, so the caller sees the map exactly as it stood at
/// signal time; a device reported after completion lands in a map nobody
/// reads.
struct ScanListener {
    /// Devices that passed the class filter, keyed by resolved name.
    found: Mutex<HashMap<String, Device>>,
    class_filter: Box<dyn Fn(DeviceClass) -> bool + Send + Sync>,
    /// Fired at most once, by the first completion callback.
    completed: Mutex<Option<oneshot::Sender<(InquiryStatus, HashMap<String, Device>)>>>,
    event_sender: Sender<DeviceEvent>,
}

impl InquiryListener for ScanListener {
    fn device_discovered(&self, remote: Arc<dyn RemoteDevice>, class: DeviceClass) {
        if !(self.class_filter)(class) {
            log::trace!("ignoring {} with class {}", remote.address(), class);
            return;
        }

        let device = Device::new(remote);
        log::info!("device {} found", device.address());

        match device.friendly_name() {
            Ok(name) => {
                log::info!("printer added to list: {} ({})", name, class);
                self.event_sender
                    .send(DeviceEvent::Discovered(device.clone()))
                    .ok();
                self.found.lock().unwrap().insert(name, device);
            }
            // A name that cannot be resolved mid-inquiry drops only this
            // device; the scan keeps going.
            Err(e) => log::warn!("skipping {}: {}", device.address(), e),
        }
    }

    fn inquiry_completed(&self, status: InquiryStatus) {
        log::info!("device inquiry completed");
        self.event_sender.send(DeviceEvent::InquiryCompleted).ok();

        if let Some(sender) = self.completed.lock().unwrap().take() {
            let found = std::mem::take(&mut *self.found.lock().unwrap());
            sender.send((status, found)).ok();
        }
    }
}
