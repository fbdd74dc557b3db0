// Licensed under the Apache-2.0 license

//! Compiled-in table of boards known to carry an AURA lighting controller.

use crate::asic::AsicType;
use crate::error::Error;

pub const VENDOR_AMD: u16 = 0x1002;
pub const SUBVENDOR_ASUS: u16 = 0x1043;

/// Identity of an enumerated PCI function, as read from its config space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PciDevice {
    pub vendor_id: u16,
    pub device_id: u16,
    pub subsystem_vendor_id: u16,
    pub subsystem_device_id: u16,
}

impl PciDevice {
    #[must_use]
    pub const fn new(
        vendor_id: u16,
        device_id: u16,
        subsystem_vendor_id: u16,
        subsystem_device_id: u16,
    ) -> Self {
        Self {
            vendor_id,
            device_id,
            subsystem_vendor_id,
            subsystem_device_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciDeviceId {
    pub id: PciDevice,
    pub asic: AsicType,
    pub name: &'static str,
}

pub static DEVICE_TABLE: [PciDeviceId; 4] = [
    PciDeviceId {
        id: PciDevice::new(VENDOR_AMD, 0x67df, SUBVENDOR_ASUS, 0x0517),
        asic: AsicType::Polaris10,
        name: "ROG STRIX RX 580",
    },
    PciDeviceId {
        id: PciDevice::new(VENDOR_AMD, 0x687f, SUBVENDOR_ASUS, 0x0555),
        asic: AsicType::Vega10,
        name: "ROG STRIX RX VEGA 56",
    },
    PciDeviceId {
        id: PciDevice::new(VENDOR_AMD, 0x687f, SUBVENDOR_ASUS, 0x04c4),
        asic: AsicType::Vega10,
        name: "ROG STRIX RX VEGA 64",
    },
    PciDeviceId {
        id: PciDevice::new(VENDOR_AMD, 0x731f, SUBVENDOR_ASUS, 0x04e2),
        asic: AsicType::Navi10,
        name: "ROG STRIX RX 5700 XT",
    },
];

/// Table entry for `device`, if the board is known.
#[must_use]
pub fn lookup(device: &PciDevice) -> Option<&'static PciDeviceId> {
    DEVICE_TABLE.iter().find(|entry| entry.id == *device)
}

/// First enumerated device present in the table.
///
/// # Errors
///
/// [`Error::DeviceNotFound`] when nothing matches.
pub fn find_supported<I>(devices: I) -> Result<(PciDevice, &'static PciDeviceId), Error>
where
    I: IntoIterator<Item = PciDevice>,
{
    devices
        .into_iter()
        .find_map(|device| lookup(&device).map(|entry| (device, entry)))
        .ok_or(Error::DeviceNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_boards() {
        let rx580 = PciDevice::new(0x1002, 0x67df, 0x1043, 0x0517);
        assert_eq!(lookup(&rx580).map(|e| e.asic), Some(AsicType::Polaris10));

        let vega64 = PciDevice::new(0x1002, 0x687f, 0x1043, 0x04c4);
        assert_eq!(lookup(&vega64).map(|e| e.asic), Some(AsicType::Vega10));
    }

    #[test]
    fn test_subsystem_must_match() {
        let reference_rx580 = PciDevice::new(0x1002, 0x67df, 0x1002, 0x0b37);
        assert!(lookup(&reference_rx580).is_none());
    }

    #[test]
    fn test_find_supported_skips_unknown_devices() {
        let devices = [
            PciDevice::new(0x8086, 0x1234, 0x8086, 0x0001),
            PciDevice::new(0x1002, 0x731f, 0x1043, 0x04e2),
        ];
        let (device, entry) = find_supported(devices).unwrap();
        assert_eq!(device.device_id, 0x731f);
        assert_eq!(entry.asic, AsicType::Navi10);
    }

    #[test]
    fn test_find_supported_reports_missing_device() {
        let devices = [PciDevice::new(0x10de, 0x1b80, 0x1043, 0x85aa)];
        assert_eq!(find_supported(devices), Err(Error::DeviceNotFound));
    }
}
