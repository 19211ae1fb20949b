//! BlueZ implementation of the platform capability, over the D-Bus API.
//!
//! Adapter and device state is read with `GetManagedObjects` and
//! snapshotted per call; a live inquiry wraps `StartDiscovery` /
//! `StopDiscovery` around a fixed inquiry window, polling the object tree
//! and reporting newly seen devices from a dedicated thread.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use dbus::arg::{PropMap, RefArg, Variant};
use dbus::blocking::stdintf::org_freedesktop_dbus::ObjectManager;
use dbus::blocking::Connection;

use crate::class::DeviceClass;
use crate::error::{Error, Result};
use crate::stack::{
    BluetoothStack, DiscoverableMode, InquiryAccess, InquiryListener, InquiryStatus, LocalAdapter,
    RemoteDevice,
};

const BLUEZ_SERVICE: &str = "org.bluez";
const ADAPTER_IFACE: &str = "org.bluez.Adapter1";
const DEVICE_IFACE: &str = "org.bluez.Device1";

const DBUS_TIMEOUT: Duration = Duration::from_secs(5);
/// Length of one inquiry pass before completion is signalled.
const INQUIRY_WINDOW: Duration = Duration::from_secs(10);
/// How often the inquiry thread polls BlueZ for newly seen devices.
const INQUIRY_POLL: Duration = Duration::from_secs(1);

type ManagedObjects = HashMap<
    dbus::Path<'static>,
    HashMap<String, HashMap<String, Variant<Box<dyn RefArg + 'static>>>>,
>;

/// Entry point for discovery against the system BlueZ daemon.
pub struct BlueZStack;

impl BlueZStack {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BlueZStack {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BluetoothStack for BlueZStack {
    async fn local_adapter(&self) -> Result<Arc<dyn LocalAdapter>> {
        tokio::task::spawn_blocking(snapshot_adapter)
            .await
            .map_err(|e| Error::Stack(e.to_string()))?
    }
}

/// Read-only snapshot of the default adapter and its preknown device set.
struct BlueZAdapter {
    path: String,
    address: String,
    name: String,
    discoverable: bool,
    preknown: Vec<Arc<dyn RemoteDevice>>,
}

#[async_trait]
impl LocalAdapter for BlueZAdapter {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn friendly_name(&self) -> String {
        self.name.clone()
    }

    fn discoverable_mode(&self) -> DiscoverableMode {
        // BlueZ does not distinguish limited discoverability here.
        if self.discoverable {
            DiscoverableMode::General
        } else {
            DiscoverableMode::NotDiscoverable
        }
    }

    fn property(&self, key: &str) -> Option<String> {
        // BlueZ does not surface these adapter limits over D-Bus.
        log::trace!("adapter property {} not known to BlueZ", key);
        None
    }

    async fn preknown_devices(&self) -> Result<Vec<Arc<dyn RemoteDevice>>> {
        Ok(self.preknown.clone())
    }

    async fn start_inquiry(
        &self,
        access: InquiryAccess,
        listener: Arc<dyn InquiryListener>,
    ) -> Result<bool> {
        if access == InquiryAccess::Limited {
            log::debug!("BlueZ has no limited inquiry access; scanning general");
        }

        let path = self.path.clone();
        let (started_sender, started) = mpsc::channel();
        thread::spawn(move || inquiry_thread(path, listener, started_sender));

        tokio::task::spawn_blocking(move || {
            started
                .recv()
                .unwrap_or_else(|_| Err(Error::Stack("inquiry thread exited early".into())))
        })
        .await
        .map_err(|e| Error::Stack(e.to_string()))?
    }
}

/// Drives one inquiry window, invoking the listener callbacks the same way
/// a platform stack thread would.
fn inquiry_thread(
    adapter_path: String,
    listener: Arc<dyn InquiryListener>,
    started: mpsc::Sender<Result<bool>>,
) {
    let conn = match Connection::new_system() {
        Ok(conn) => conn,
        Err(e) => {
            started.send(Err(Error::Stack(e.to_string()))).ok();
            return;
        }
    };
    let proxy = conn.with_proxy(BLUEZ_SERVICE, adapter_path, DBUS_TIMEOUT);

    // Classic inquiry only. Older daemons without filter support still scan.
    let mut filter: PropMap = HashMap::new();
    filter.insert(
        "Transport".to_string(),
        Variant(Box::new("bredr".to_string()) as Box<dyn RefArg>),
    );
    let filtered: std::result::Result<(), dbus::Error> =
        proxy.method_call(ADAPTER_IFACE, "SetDiscoveryFilter", (filter,));
    if let Err(e) = filtered {
        log::debug!("SetDiscoveryFilter not applied: {}", e);
    }

    let start: std::result::Result<(), dbus::Error> =
        proxy.method_call(ADAPTER_IFACE, "StartDiscovery", ());
    if let Err(e) = start {
        log::warn!("StartDiscovery refused: {}", e);
        started.send(Ok(false)).ok();
        return;
    }
    started.send(Ok(true)).ok();

    let mut seen = HashSet::new();
    let mut remaining = INQUIRY_WINDOW;
    while !remaining.is_zero() {
        let step = remaining.min(INQUIRY_POLL);
        thread::sleep(step);
        remaining -= step;

        let objects = match read_managed_objects(&conn) {
            Ok(objects) => objects,
            Err(e) => {
                log::warn!("device enumeration failed mid-inquiry: {}", e);
                continue;
            }
        };

        for device in devices_from(&objects, false) {
            if !seen.insert(device.address.clone()) {
                continue;
            }
            let class = device.device_class();
            listener.device_discovered(Arc::new(device), class);
        }
    }

    let stop: std::result::Result<(), dbus::Error> =
        proxy.method_call(ADAPTER_IFACE, "StopDiscovery", ());
    if let Err(e) = stop {
        log::debug!("StopDiscovery failed: {}", e);
    }

    listener.inquiry_completed(InquiryStatus::Completed);
}

/// Device snapshot taken from the BlueZ object tree.
///
/// BlueZ has no per-link encryption/authentication properties; the closest
/// it reports are `Bonded` and `Paired`.
struct BlueZDevice {
    address: String,
    name: Option<String>,
    trusted: bool,
    bonded: bool,
    paired: bool,
    class: DeviceClass,
}

impl RemoteDevice for BlueZDevice {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn friendly_name(&self) -> Result<String> {
        self.name.clone().ok_or_else(|| Error::NameResolution {
            address: self.address.clone(),
            reason: "device has no name property".into(),
        })
    }

    fn is_trusted(&self) -> bool {
        self.trusted
    }

    fn is_encrypted(&self) -> bool {
        self.bonded
    }

    fn is_authenticated(&self) -> bool {
        self.paired
    }

    fn device_class(&self) -> DeviceClass {
        self.class
    }
}

fn snapshot_adapter() -> Result<Arc<dyn LocalAdapter>> {
    let conn =
        Connection::new_system().map_err(|e| Error::AdapterUnavailable(e.to_string()))?;
    let objects = read_managed_objects(&conn)?;

    let (path, props) = objects
        .iter()
        .find_map(|(path, interfaces)| {
            interfaces
                .get(ADAPTER_IFACE)
                .map(|props| (path.to_string(), props))
        })
        .ok_or_else(|| Error::AdapterUnavailable("no adapter registered with BlueZ".into()))?;

    let address = prop_str(props, "Address").unwrap_or_default();
    let name = prop_str(props, "Alias")
        .or_else(|| prop_str(props, "Name"))
        .unwrap_or_default();
    let discoverable = prop_bool(props, "Discoverable").unwrap_or(false);

    let preknown = devices_from(&objects, true)
        .into_iter()
        .map(|device| Arc::new(device) as Arc<dyn RemoteDevice>)
        .collect();

    log::trace!("using adapter {} ({})", path, address);

    Ok(Arc::new(BlueZAdapter {
        path,
        address,
        name,
        discoverable,
        preknown,
    }))
}

fn read_managed_objects(conn: &Connection) -> Result<ManagedObjects> {
    let proxy = conn.with_proxy(BLUEZ_SERVICE, "/", DBUS_TIMEOUT);
    proxy
        .get_managed_objects()
        .map_err(|e| Error::AdapterUnavailable(e.to_string()))
}

fn devices_from(objects: &ManagedObjects, paired_only: bool) -> Vec<BlueZDevice> {
    let mut devices = Vec::new();

    for (path, interfaces) in objects {
        let props = match interfaces.get(DEVICE_IFACE) {
            Some(props) => props,
            None => continue,
        };

        let address = match prop_str(props, "Address") {
            Some(address) => address,
            None => {
                log::debug!("device {} has no address; skipping", path);
                continue;
            }
        };

        let paired = prop_bool(props, "Paired").unwrap_or(false);
        if paired_only && !paired {
            continue;
        }

        devices.push(BlueZDevice {
            address,
            name: prop_str(props, "Alias").or_else(|| prop_str(props, "Name")),
            trusted: prop_bool(props, "Trusted").unwrap_or(false),
            bonded: prop_bool(props, "Bonded").unwrap_or(paired),
            paired,
            class: DeviceClass::new(prop_u32(props, "Class").unwrap_or(0)),
        });
    }

    devices
}

fn prop_str(props: &HashMap<String, Variant<Box<dyn RefArg>>>, key: &str) -> Option<String> {
    props.get(key).and_then(|v| v.0.as_str()).map(String::from)
}

fn prop_bool(props: &HashMap<String, Variant<Box<dyn RefArg>>>, key: &str) -> Option<bool> {
    props.get(key).and_then(|v| v.0.as_i64()).map(|v| v != 0)
}

fn prop_u32(props: &HashMap<String, Variant<Box<dyn RefArg>>>, key: &str) -> Option<u32> {
    props.get(key).and_then(|v| v.0.as_i64()).map(|v| v as u32)
}
