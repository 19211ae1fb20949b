//! High-level Bluetooth printer discovery library.
//!
//! The goal of this library is to provide an easy-to-use interface for
//! finding nearby Bluetooth printers: listing the devices already paired
//! with the machine, running a live inquiry filtered by device class, and
//! describing the local adapter.
//!
//! The platform stack is injected through the [`BluetoothStack`] trait, so
//! the discovery logic runs unchanged against real hardware (enable the
//! `bluez` feature for the BlueZ implementation) or against a scripted
//! stack in tests.
//!
//! ## Usage
//!
//! Here is an example on how to list paired printers and then scan for
//! printers in range:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use printfind::{BluetoothStack, Discovery, Result, ScanConfig};
//!
//! async fn find_printers(stack: Arc<dyn BluetoothStack>) -> Result<()> {
//!     let discovery = Discovery::new(stack);
//!
//!     // Printers that are already paired with this machine
//!     println!("{}", discovery.list_known_printers().await?);
//!
//!     // Live inquiry, filtered to printer-class devices
//!     let config = ScanConfig::default().stop_after_timeout(Duration::from_secs(30));
//!     for (name, device) in discovery.active_discovery_scan(config).await? {
//!         println!("{} ({})", name, device.address());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(clippy::all, future_incompatible, nonstandard_style, rust_2018_idioms)]

pub use class::DeviceClass;
pub use device::{Device, DeviceEvent};
pub use discovery::{Discovery, ScanConfig};
pub use error::{Error, Result};
pub use stack::{
    BluetoothStack, DiscoverableMode, InquiryAccess, InquiryListener, InquiryStatus, LocalAdapter,
    RemoteDevice,
};

pub mod class;

mod device;
mod discovery;
mod error;

pub mod stack;

#[cfg(feature = "bluez")]
pub mod bluez;
