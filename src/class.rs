use std::fmt;

/// Bits of the major device class field in a class-of-device record.
pub const MAJOR_DEVICE_CLASS_MASK: u32 = 0x1F00;
/// Bits of the minor device class field in a class-of-device record.
pub const MINOR_DEVICE_CLASS_MASK: u32 = 0xFC;
/// Bits of the major service class field in a class-of-device record.
pub const SERVICE_CLASS_MASK: u32 = 0xFF_E000;

/// Major device class of imaging devices (printers, scanners, cameras).
pub const MAJOR_IMAGING: u32 = 0x0600;
/// Minor class bit marking an imaging device as a printer.
pub const IMAGING_MINOR_PRINTER_MASK: u32 = 0x80;

/// A 24-bit Bluetooth class-of-device record.
///
/// Discovered devices advertise their kind through this record. The
/// accessors expose the three packed fields, and [`DeviceClass::is_printer`]
/// is the predicate used by the default scan filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceClass(u32);

impl DeviceClass {
    pub const fn new(record: u32) -> Self {
        Self(record)
    }

    /// The raw class-of-device record.
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn major_device_class(self) -> u32 {
        self.0 & MAJOR_DEVICE_CLASS_MASK
    }

    pub const fn minor_device_class(self) -> u32 {
        self.0 & MINOR_DEVICE_CLASS_MASK
    }

    pub const fn service_classes(self) -> u32 {
        self.0 & SERVICE_CLASS_MASK
    }

    /// Whether the record describes a printer: the major class is imaging
    /// and the printer bit is set in the minor class.
    pub const fn is_printer(self) -> bool {
        self.major_device_class() == MAJOR_IMAGING
            && self.minor_device_class() & IMAGING_MINOR_PRINTER_MASK != 0
    }
}

impl From<u32> for DeviceClass {
    fn from(record: u32) -> Self {
        Self::new(record)
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = match self.major_device_class() {
            0x0000 => "miscellaneous",
            0x0100 => "computer",
            0x0200 => "phone",
            0x0300 => "lan access point",
            0x0400 => "audio/video",
            0x0500 => "peripheral",
            0x0600 => "imaging",
            0x0700 => "wearable",
            0x0800 => "toy",
            _ => "uncategorized",
        };

        if self.is_printer() {
            write!(f, "{} printer (0x{:06x})", major, self.0)
        } else {
            write!(f, "{} (0x{:06x})", major, self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printer_record_matches() {
        assert!(DeviceClass::new(0x0680).is_printer());
        // Rendering service bit set on top of the device class
        assert!(DeviceClass::new(0x04_0680).is_printer());
        // Combined printer and scanner minor bits
        assert!(DeviceClass::new(0x06C0).is_printer());
    }

    #[test]
    fn imaging_without_printer_bit_is_rejected() {
        // Camera
        assert!(!DeviceClass::new(0x0620).is_printer());
        // Display
        assert!(!DeviceClass::new(0x0610).is_printer());
    }

    #[test]
    fn printer_bit_outside_imaging_is_rejected() {
        assert!(!DeviceClass::new(0x0580).is_printer());
        assert!(!DeviceClass::new(0x0280).is_printer());
    }

    #[test]
    fn field_accessors_mask_the_record() {
        let class = DeviceClass::new(0x04_06A4);
        assert_eq!(class.major_device_class(), 0x0600);
        assert_eq!(class.minor_device_class(), 0xA4);
        assert_eq!(class.service_classes(), 0x04_0000);
    }

    #[test]
    fn display_names_the_major_class() {
        assert_eq!(
            DeviceClass::new(0x0680).to_string(),
            "imaging printer (0x000680)"
        );
        assert_eq!(DeviceClass::new(0x0204).to_string(), "phone (0x000204)");
    }
}
