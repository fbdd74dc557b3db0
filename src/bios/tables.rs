// Licensed under the Apache-2.0 license

//! On-image layouts of the ATOM data tables.
//!
//! All structures are packed and little-endian. Only the fields the parser
//! reads are named; everything else is kept as reserved bytes so that the
//! sizes match the firmware exactly.

use core::mem::size_of;

use static_assertions::const_assert_eq;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

use super::TableRevision;

/// Record type of an I2C record.
pub const I2C_RECORD_TYPE: u8 = 1;
/// Record type terminating a record list.
pub const RECORD_END_TYPE: u8 = 0xFF;

#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct CommonTableHeader {
    pub structure_size: U16,
    pub format_revision: u8,
    pub content_revision: u8,
}

impl CommonTableHeader {
    #[must_use]
    pub fn revision(&self) -> TableRevision {
        TableRevision::from_header(self.format_revision, self.content_revision)
    }
}

/// ROM header, v2.2 layout. Earlier revisions share every field read here.
#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct RomHeader {
    pub header: CommonTableHeader,
    pub atom_signature: [u8; 4],
    pub bios_segment_address: U16,
    pub protected_mode_offset: U16,
    pub config_filename_offset: U16,
    pub crc_block_offset: U16,
    pub bootup_message_offset: U16,
    pub int10_offset: U16,
    pub pci_bus_dev_init_code: U16,
    pub io_base_address: U16,
    pub subsystem_vendor_id: U16,
    pub subsystem_id: U16,
    pub pci_info_offset: U16,
    pub master_command_table_offset: U16,
    pub master_data_table_offset: U16,
    pub reserved: U16,
    pub psp_dir_table_offset: U32,
}

/// Master list of data tables used by Polaris and Vega images.
#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct MasterDataTableV1_1 {
    pub header: CommonTableHeader,
    pub utility_pipeline: U16,
    _multimedia: [U16; 3],
    pub firmware_info: U16,
    _reserved0: [U16; 5],
    pub gpio_i2c_info: U16,
    pub vram_usage_by_firmware: U16,
    pub gpio_pin_lut: U16,
    _reserved1: [U16; 9],
    pub object_header: U16,
    _reserved2: [U16; 12],
}

/// Master list of data tables used by Navi images.
#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct MasterDataTableV2_1 {
    pub header: CommonTableHeader,
    pub utility_pipeline: U16,
    _multimedia: [U16; 3],
    pub firmware_info: U16,
    _reserved0: [U16; 7],
    pub gpio_pin_lut: U16,
    _reserved1: [U16; 9],
    pub display_object_info: U16,
    _reserved2: [U16; 4],
    pub dce_info: U16,
    _reserved3: [U16; 7],
}

/// Object header v1.1 / v1.2. Sub-table offsets are relative to the header.
#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct ObjectInfoV1_1 {
    pub header: CommonTableHeader,
    pub device_support: U16,
    pub connector_table: U16,
    pub router_table: U16,
    pub encoder_table: U16,
    pub protection_table: U16,
    pub display_path_table: U16,
}

/// Object header v1.3, which adds the misc (generic) object table.
#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct ObjectInfoV1_3 {
    pub header: CommonTableHeader,
    pub device_support: U16,
    pub connector_table: U16,
    pub router_table: U16,
    pub encoder_table: U16,
    pub protection_table: U16,
    pub display_path_table: U16,
    pub misc_table: U16,
}

/// Display object info v1.4 header; `number_of_path` display paths follow.
#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct DisplayObjectInfoV1_4 {
    pub header: CommonTableHeader,
    pub supported_devices: U16,
    pub number_of_path: u8,
    pub reserved: u8,
}

#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct DisplayObjectPath {
    /// Connector or generic object id.
    pub display_objid: U16,
    /// Relative to the display object info table.
    pub disp_record_offset: U16,
    /// Encoder closest to the connector; zero for an unused path.
    pub encoder_objid: U16,
    pub ext_encoder_objid: U16,
    pub encoder_record_offset: U16,
    pub ext_encoder_record_offset: U16,
    pub device_tag: U16,
    pub priority_id: u8,
    pub reserved: u8,
}

/// Header of a v1 object table; `count` [`AtomObject`]s follow.
#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct ObjectTableHeader {
    pub count: u8,
    pub padding: [u8; 3],
}

#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct AtomObject {
    pub object_id: U16,
    pub src_dst_table_offset: U16,
    /// Relative to the object header.
    pub record_offset: U16,
    pub reserved: U16,
}

#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct RecordHeader {
    pub record_type: u8,
    /// Size of the whole record, header included.
    pub record_size: u8,
}

#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct I2cRecord {
    pub header: RecordHeader,
    pub i2c_id: u8,
    /// Zero when the record describes a connector's DDC bus.
    pub slave_address: u8,
}

/// GPIO_I2C_Info entry: the GPIO registers and bits behind one I2C line.
#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct GpioI2cAssignment {
    pub clk_mask_register: U16,
    pub clk_en_register: U16,
    pub clk_y_register: U16,
    pub clk_a_register: U16,
    pub data_mask_register: U16,
    pub data_en_register: U16,
    pub data_y_register: U16,
    pub data_a_register: U16,
    pub i2c_id: u8,
    pub clk_mask_shift: u8,
    pub clk_en_shift: u8,
    pub clk_y_shift: u8,
    pub clk_a_shift: u8,
    pub data_mask_shift: u8,
    pub data_en_shift: u8,
    pub data_y_shift: u8,
    pub data_a_shift: u8,
    pub reserved: [u8; 2],
}

/// GPIO pin LUT v2.1 entry.
#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct GpioPinAssignment {
    pub data_a_reg_index: U32,
    pub gpio_bitshift: u8,
    pub gpio_mask_bitshift: u8,
    pub gpio_id: u8,
    pub reserved: u8,
}

#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct FirmwareInfoV1_4 {
    pub header: CommonTableHeader,
    pub firmware_revision: U32,
    _clocks: [u8; 74],
    /// In 10 kHz units.
    pub reference_clock: U16,
    _tail: [u8; 5],
}

#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct FirmwareInfoV2_1 {
    pub header: CommonTableHeader,
    pub firmware_revision: U32,
    _clocks: [u8; 74],
    /// In 10 kHz units.
    pub core_reference_clock: U16,
    pub memory_reference_clock: U16,
    _tail: [u8; 6],
}

#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct FirmwareInfoV2_2 {
    pub header: CommonTableHeader,
    pub firmware_revision: U32,
    _clocks: [u8; 74],
    /// In 10 kHz units.
    pub core_reference_clock: U16,
    pub memory_reference_clock: U16,
    _tail: [u8; 22],
}

#[derive(Debug, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct DisplayControllerInfoV4_1 {
    pub header: CommonTableHeader,
    pub display_caps: U32,
    pub bootup_dispclk_10khz: U32,
    pub dce_refclk_10khz: U16,
    pub i2c_engine_refclk_10khz: U16,
    _tail: [u8; 40],
}

const_assert_eq!(size_of::<CommonTableHeader>(), 4);
const_assert_eq!(size_of::<RomHeader>(), 40);
const_assert_eq!(size_of::<MasterDataTableV1_1>(), 74);
const_assert_eq!(size_of::<MasterDataTableV2_1>(), 74);
const_assert_eq!(size_of::<ObjectInfoV1_1>(), 16);
const_assert_eq!(size_of::<ObjectInfoV1_3>(), 18);
const_assert_eq!(size_of::<DisplayObjectInfoV1_4>(), 8);
const_assert_eq!(size_of::<DisplayObjectPath>(), 16);
const_assert_eq!(size_of::<ObjectTableHeader>(), 4);
const_assert_eq!(size_of::<AtomObject>(), 8);
const_assert_eq!(size_of::<I2cRecord>(), 4);
const_assert_eq!(size_of::<GpioI2cAssignment>(), 27);
const_assert_eq!(size_of::<GpioPinAssignment>(), 8);
const_assert_eq!(size_of::<FirmwareInfoV1_4>(), 89);
const_assert_eq!(size_of::<FirmwareInfoV2_1>(), 92);
const_assert_eq!(size_of::<FirmwareInfoV2_2>(), 108);
const_assert_eq!(size_of::<DisplayControllerInfoV4_1>(), 56);
