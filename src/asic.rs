// Licensed under the Apache-2.0 license

//! Static per-family description of the GENERIC_I2C register block.
//!
//! Each supported family gets an [`AsicDescriptor`]: the dword index of every
//! GENERIC_I2C register plus the mask/shift of every field the engine
//! touches. Families also carry a [`ChipProfile`] describing how the
//! adapter drives the bus.

use crate::reg::RegField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsicType {
    Polaris10,
    Polaris11,
    Polaris12,
    VegaM,
    Vega10,
    Vega12,
    Vega20,
    Navi10,
}

/// How transfers are mapped onto the engine for a given family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    /// Bus wiring comes from the firmware tables and transfers use
    /// register-offset framing (one offset byte then data).
    FirmwareTable,
    /// Every message is submitted as-is to the engine.
    DirectRegister,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipProfile {
    pub asic: AsicType,
    pub drive_mode: DriveMode,
    /// GPIO_I2C line the lighting controller hangs off.
    pub bus_line: u8,
    /// The lighting controller advances its register offset on every data
    /// byte, so consecutive bytes may share one bus transaction.
    pub register_auto_increment: bool,
}

impl AsicType {
    /// Register block for this family, if one is known.
    #[must_use]
    pub fn descriptor(self) -> Option<&'static AsicDescriptor> {
        match self {
            Self::Polaris10 | Self::Polaris11 | Self::Polaris12 | Self::VegaM => {
                Some(&POLARIS_DESCRIPTOR)
            }
            // DCE 12 exposes GENERIC_I2C behind a different aperture that has
            // never been mapped out for these boards.
            Self::Vega10 | Self::Vega12 | Self::Vega20 => None,
            Self::Navi10 => Some(&NAVI_DESCRIPTOR),
        }
    }

    #[must_use]
    pub const fn profile(self) -> ChipProfile {
        let drive_mode = match self {
            Self::Navi10 => DriveMode::DirectRegister,
            _ => DriveMode::FirmwareTable,
        };
        ChipProfile {
            asic: self,
            drive_mode,
            bus_line: AURA_BUS_LINE,
            register_auto_increment: false,
        }
    }
}

/// GPIO_I2C line wired to the lighting controller on ASUS boards.
pub const AURA_BUS_LINE: u8 = 6;

/// Dword indices of the GENERIC_I2C registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cRegisters {
    pub control: u32,
    pub interrupt_control: u32,
    pub status: u32,
    pub speed: u32,
    pub setup: u32,
    pub transaction: u32,
    pub data: u32,
    pub pin_selection: u32,
}

/// Field layout of the GENERIC_I2C registers. Every entry carries a zero
/// value; use [`RegField::with`] to build a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cFields {
    // GENERIC_I2C_CONTROL
    pub go: RegField,
    pub soft_reset: RegField,
    pub send_reset: RegField,
    pub enable: RegField,
    // GENERIC_I2C_INTERRUPT_CONTROL
    pub done_int: RegField,
    pub done_ack: RegField,
    pub done_mask: RegField,
    // GENERIC_I2C_STATUS
    pub status: RegField,
    pub done: RegField,
    pub aborted: RegField,
    pub timeout: RegField,
    pub stopped_on_nack: RegField,
    pub nack: RegField,
    // GENERIC_I2C_SPEED
    pub threshold: RegField,
    pub disable_filter_during_stall: RegField,
    pub start_stop_timing_cntl: RegField,
    pub prescale: RegField,
    // GENERIC_I2C_SETUP
    pub data_drive_en: RegField,
    pub data_drive_sel: RegField,
    pub clk_drive_en: RegField,
    pub intra_byte_delay: RegField,
    pub time_limit: RegField,
    // GENERIC_I2C_TRANSACTION
    pub rw: RegField,
    pub stop_on_nack: RegField,
    pub ack_on_read: RegField,
    pub start: RegField,
    pub stop: RegField,
    pub count: RegField,
    // GENERIC_I2C_DATA
    pub data_rw: RegField,
    pub data: RegField,
    pub index: RegField,
    pub index_write: RegField,
    // GENERIC_I2C_PIN_SELECTION
    pub scl_pin_sel: RegField,
    pub sda_pin_sel: RegField,
}

#[derive(Debug, PartialEq, Eq)]
pub struct AsicDescriptor {
    pub name: &'static str,
    pub registers: I2cRegisters,
    pub fields: &'static I2cFields,
}

impl AsicDescriptor {
    /// Symbolic name of a GENERIC_I2C register, for tracing.
    #[must_use]
    pub fn register_name(&self, addr: u32) -> Option<&'static str> {
        let r = &self.registers;
        let name = match addr {
            a if a == r.control => "GENERIC_I2C_CONTROL",
            a if a == r.interrupt_control => "GENERIC_I2C_INTERRUPT_CONTROL",
            a if a == r.status => "GENERIC_I2C_STATUS",
            a if a == r.speed => "GENERIC_I2C_SPEED",
            a if a == r.setup => "GENERIC_I2C_SETUP",
            a if a == r.transaction => "GENERIC_I2C_TRANSACTION",
            a if a == r.data => "GENERIC_I2C_DATA",
            a if a == r.pin_selection => "GENERIC_I2C_PIN_SELECTION",
            _ => return None,
        };
        Some(name)
    }
}

const fn field(mask: u32, shift: u8) -> RegField {
    RegField::new(mask, shift, 0)
}

/// The field layout is identical on every DCE/DCN generation seen so far.
pub static GENERIC_I2C_FIELDS: I2cFields = I2cFields {
    go: field(0x0000_0001, 0),
    soft_reset: field(0x0000_0002, 1),
    send_reset: field(0x0000_0004, 2),
    enable: field(0x0000_0008, 3),

    done_int: field(0x0000_0001, 0),
    done_ack: field(0x0000_0002, 1),
    done_mask: field(0x0000_0004, 2),

    status: field(0x0000_000F, 0),
    done: field(0x0000_0010, 4),
    aborted: field(0x0000_0020, 5),
    timeout: field(0x0000_0040, 6),
    stopped_on_nack: field(0x0000_0200, 9),
    nack: field(0x0000_0400, 10),

    threshold: field(0x0000_0003, 0),
    disable_filter_during_stall: field(0x0000_0010, 4),
    start_stop_timing_cntl: field(0x0000_0300, 8),
    prescale: field(0xFFFF_0000, 16),

    data_drive_en: field(0x0000_0001, 0),
    data_drive_sel: field(0x0000_0002, 1),
    clk_drive_en: field(0x0000_0080, 7),
    intra_byte_delay: field(0x0000_FF00, 8),
    time_limit: field(0xFF00_0000, 24),

    rw: field(0x0000_0001, 0),
    stop_on_nack: field(0x0000_0100, 8),
    ack_on_read: field(0x0000_0200, 9),
    start: field(0x0000_1000, 12),
    stop: field(0x0000_2000, 13),
    count: field(0x000F_0000, 16),

    data_rw: field(0x0000_0001, 0),
    data: field(0x0000_FF00, 8),
    index: field(0x000F_0000, 16),
    index_write: field(0x8000_0000, 31),

    scl_pin_sel: field(0x0000_007F, 0),
    sda_pin_sel: field(0x0000_7F00, 8),
};

/// DCE 11.2 (Polaris 10/11/12, Vega M).
pub static POLARIS_DESCRIPTOR: AsicDescriptor = AsicDescriptor {
    name: "polaris",
    registers: I2cRegisters {
        control: 0x16f4,
        interrupt_control: 0x16f5,
        status: 0x16f6,
        speed: 0x16f7,
        setup: 0x16f8,
        transaction: 0x16f9,
        data: 0x16fa,
        pin_selection: 0x16fb,
    },
    fields: &GENERIC_I2C_FIELDS,
};

/// DCN 2.0 (Navi 10).
pub static NAVI_DESCRIPTOR: AsicDescriptor = AsicDescriptor {
    name: "navi",
    registers: I2cRegisters {
        control: 0x1eb8,
        interrupt_control: 0x1eb9,
        status: 0x1eba,
        speed: 0x1ebb,
        setup: 0x1ebc,
        transaction: 0x1ebd,
        data: 0x1ebe,
        pin_selection: 0x1ebf,
    },
    fields: &GENERIC_I2C_FIELDS,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn all_fields(f: &I2cFields) -> [RegField; 34] {
        [
            f.go, f.soft_reset, f.send_reset, f.enable, f.done_int, f.done_ack, f.done_mask,
            f.status, f.done, f.aborted, f.timeout, f.stopped_on_nack, f.nack, f.threshold,
            f.disable_filter_during_stall, f.start_stop_timing_cntl, f.prescale,
            f.data_drive_en, f.data_drive_sel, f.clk_drive_en, f.intra_byte_delay,
            f.time_limit, f.rw, f.stop_on_nack, f.ack_on_read, f.start, f.stop, f.count,
            f.data_rw, f.data, f.index, f.index_write, f.scl_pin_sel, f.sda_pin_sel,
        ]
    }

    #[test]
    fn test_field_shifts_match_masks() {
        for field in all_fields(&GENERIC_I2C_FIELDS) {
            assert_eq!(field.mask.trailing_zeros(), u32::from(field.shift));
            assert_eq!(field.value, 0);
        }
    }

    #[test]
    fn test_descriptor_selection() {
        assert_eq!(AsicType::Polaris10.descriptor(), Some(&POLARIS_DESCRIPTOR));
        assert_eq!(AsicType::VegaM.descriptor(), Some(&POLARIS_DESCRIPTOR));
        assert_eq!(AsicType::Navi10.descriptor(), Some(&NAVI_DESCRIPTOR));
        assert_eq!(AsicType::Vega20.descriptor(), None);
    }

    #[test]
    fn test_profiles() {
        let polaris = AsicType::Polaris11.profile();
        assert_eq!(polaris.drive_mode, DriveMode::FirmwareTable);
        assert_eq!(polaris.bus_line, AURA_BUS_LINE);
        assert!(!polaris.register_auto_increment);

        assert_eq!(AsicType::Navi10.profile().drive_mode, DriveMode::DirectRegister);
    }

    #[test]
    fn test_register_names() {
        assert_eq!(POLARIS_DESCRIPTOR.register_name(0x16f6), Some("GENERIC_I2C_STATUS"));
        assert_eq!(NAVI_DESCRIPTOR.register_name(0x1ebf), Some("GENERIC_I2C_PIN_SELECTION"));
        assert_eq!(NAVI_DESCRIPTOR.register_name(0x16f6), None);
    }
}
