// Licensed under the Apache-2.0 license

//! Synthetic ATOM images for parser and adapter tests.
//!
//! Layout of a built image:
//!
//! | offset | contents                                   |
//! |--------|--------------------------------------------|
//! | 0x000  | 0xAA55, size byte, ATI magic, pointers     |
//! | 0x080  | part number                                |
//! | 0x100  | ROM header                                 |
//! | 0x200  | master data list                           |
//! | 0x300  | firmware info                              |
//! | 0x380  | display controller info (v2.1 lists only)  |
//! | 0x400  | GPIO_I2C_Info or GPIO pin LUT              |
//! | 0x600  | object header or display object info       |
//! | 0x800  | record lists, 0x20 bytes per connector     |

use std::string::String;
use std::vec::Vec;

pub const CONNECTOR_HDMI: u16 = 0x310C;
pub const CONNECTOR_DP: u16 = 0x3113;
pub const ENCODER_UNIPHY: u16 = 0x211E;

const ROM_HEADER: usize = 0x100;
const MASTER: usize = 0x200;
const FIRMWARE_INFO: usize = 0x300;
const DCE_INFO: usize = 0x380;
const GPIO_TABLE: usize = 0x400;
const OBJECTS: usize = 0x600;
const RECORDS: usize = 0x800;
const RECORD_STRIDE: usize = 0x20;

const CONNECTOR_TABLE: usize = 0x40;
const ROUTER_TABLE: usize = 0x180;
const ENCODER_TABLE: usize = 0x100;
const MISC_TABLE: usize = 0x1C0;

const GPIO_I2C_ENTRY: usize = 27;
const PIN_LUT_ENTRY: usize = 8;

/// GPIO_I2C_Info register bases, one register per line on top.
const GPIO_REGISTER_BASES: [u16; 8] = [
    0x1500, // clk mask
    0x1600, // clk en
    0x1B00, // clk y
    0x1900, // clk a
    0x1700, // data mask
    0x1800, // data en
    0x1C00, // data y
    0x1A00, // data a
];

struct Connector {
    object_id: u16,
    encoder_id: u16,
    i2c: Option<(u8, u8)>,
}

pub struct ImageBuilder {
    rom_revision: (u8, u8),
    object_revision: (u8, u8),
    firmware_revision: (u8, u8),
    reference_clock: u16,
    dce_reference_clock: u16,
    gpio_content_revision: u8,
    gpio_lines: usize,
    connectors: Vec<Connector>,
    name: String,
    sectors: u8,
}

impl ImageBuilder {
    /// A v1.1 master list image with object info v1.3.
    pub fn polaris() -> Self {
        Self {
            rom_revision: (1, 1),
            object_revision: (1, 3),
            firmware_revision: (1, 4),
            reference_clock: 2700,
            dce_reference_clock: 0,
            gpio_content_revision: 1,
            gpio_lines: 16,
            connectors: Vec::new(),
            name: String::from("113-ROG-STRIX-RX580"),
            sectors: 64,
        }
    }

    /// A v2.1 master list image with display object info v1.4.
    pub fn navi() -> Self {
        Self {
            rom_revision: (2, 2),
            object_revision: (1, 4),
            firmware_revision: (3, 1),
            reference_clock: 0,
            dce_reference_clock: 10_000,
            name: String::from("113-D1820200-101"),
            ..Self::polaris()
        }
    }

    pub fn rom_revision(mut self, major: u8, minor: u8) -> Self {
        self.rom_revision = (major, minor);
        self
    }

    pub fn object_revision(mut self, major: u8, minor: u8) -> Self {
        self.object_revision = (major, minor);
        self
    }

    pub fn firmware_revision(mut self, major: u8, minor: u8) -> Self {
        self.firmware_revision = (major, minor);
        self
    }

    /// Firmware info reference clock in 10 kHz units.
    pub fn reference_clock(mut self, clock_10khz: u16) -> Self {
        self.reference_clock = clock_10khz;
        self
    }

    pub fn dce_reference_clock(mut self, clock_10khz: u16) -> Self {
        self.dce_reference_clock = clock_10khz;
        self
    }

    pub fn gpio_content_revision(mut self, revision: u8) -> Self {
        self.gpio_content_revision = revision;
        self
    }

    pub fn gpio_lines(mut self, lines: usize) -> Self {
        self.gpio_lines = lines;
        self
    }

    /// Adds a connector; `i2c` is the (i2c id, slave address) record.
    pub fn connector(mut self, object_id: u16, encoder_id: u16, i2c: Option<(u8, u8)>) -> Self {
        self.connectors.push(Connector {
            object_id,
            encoder_id,
            i2c,
        });
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = String::from(name);
        self
    }

    fn display_paths(&self) -> bool {
        let (major, minor) = self.rom_revision;
        major >= 2 && minor >= 2
    }

    pub fn build(&self) -> Vec<u8> {
        let mut image = vec![0u8; usize::from(self.sectors) * 512];
        let mut w = Writer(&mut image);

        w.u16(0, 0xAA55);
        w.u8(2, self.sectors);
        w.bytes(0x30, b" 761295520");
        w.u16(0x48, ROM_HEADER as u16);
        w.u16(0x6E, 0);
        w.bytes(0x80, self.name.as_bytes());
        w.u8(0x80 + self.name.len(), 0);

        w.header(ROM_HEADER, 40, self.rom_revision);
        w.bytes(ROM_HEADER + 4, b"ATOM");
        w.u16(ROM_HEADER + 32, MASTER as u16);

        w.header(FIRMWARE_INFO, 108, self.firmware_revision);
        w.u16(FIRMWARE_INFO + 82, self.reference_clock);

        w.header(MASTER, 74, (1, 1));
        let master = |index: usize| MASTER + 4 + 2 * index;
        w.u16(master(4), FIRMWARE_INFO as u16);

        if self.display_paths() {
            w.u16(master(12), GPIO_TABLE as u16);
            w.u16(master(22), OBJECTS as u16);
            w.u16(master(27), DCE_INFO as u16);
            w.header(DCE_INFO, 56, (4, 1));
            w.u16(DCE_INFO + 12, self.dce_reference_clock);
            self.write_pin_lut(&mut w);
            self.write_display_paths(&mut w);
        } else {
            w.u16(master(10), GPIO_TABLE as u16);
            w.u16(master(22), OBJECTS as u16);
            self.write_gpio_i2c(&mut w);
            self.write_object_tables(&mut w);
        }

        for (index, connector) in self.connectors.iter().enumerate() {
            let mut offset = RECORDS + index * RECORD_STRIDE;
            // An HPD record ahead of the I2C record.
            w.bytes(offset, &[2, 3, 0x01]);
            offset += 3;
            if let Some((i2c_id, slave)) = connector.i2c {
                w.bytes(offset, &[1, 4, i2c_id, slave]);
                offset += 4;
            }
            w.bytes(offset, &[0xFF, 2]);
        }

        image
    }

    fn write_gpio_i2c(&self, w: &mut Writer<'_>) {
        let size = 4 + self.gpio_lines * GPIO_I2C_ENTRY;
        w.u16(GPIO_TABLE, size as u16);
        w.u8(GPIO_TABLE + 2, 1);
        w.u8(GPIO_TABLE + 3, self.gpio_content_revision);

        for line in 0..self.gpio_lines {
            let entry = GPIO_TABLE + 4 + line * GPIO_I2C_ENTRY;
            for (slot, base) in GPIO_REGISTER_BASES.iter().enumerate() {
                w.u16(entry + slot * 2, base + line as u16);
                w.u8(entry + 17 + slot, line as u8);
            }
            w.u8(entry + 16, 0x90 | line as u8);
        }
    }

    fn write_pin_lut(&self, w: &mut Writer<'_>) {
        let size = 4 + self.gpio_lines * PIN_LUT_ENTRY;
        w.u16(GPIO_TABLE, size as u16);
        w.u8(GPIO_TABLE + 2, 2);
        w.u8(GPIO_TABLE + 3, self.gpio_content_revision);

        for line in 0..self.gpio_lines {
            let entry = GPIO_TABLE + 4 + line * PIN_LUT_ENTRY;
            w.u32(entry, 0x4800 + line as u32);
            w.u8(entry + 4, line as u8);
            w.u8(entry + 6, 0x90 | line as u8);
        }
    }

    fn write_object_tables(&self, w: &mut Writer<'_>) {
        let size = if self.object_revision.1 >= 3 { 18 } else { 16 };
        w.header(OBJECTS, size, self.object_revision);
        w.u16(OBJECTS + 6, CONNECTOR_TABLE as u16);
        w.u16(OBJECTS + 8, ROUTER_TABLE as u16);
        w.u16(OBJECTS + 10, ENCODER_TABLE as u16);
        if size == 18 {
            w.u16(OBJECTS + 16, MISC_TABLE as u16);
        }

        let record_offset = |index: usize| (RECORDS - OBJECTS + index * RECORD_STRIDE) as u16;

        w.u8(OBJECTS + CONNECTOR_TABLE, self.connectors.len() as u8);
        for (index, connector) in self.connectors.iter().enumerate() {
            let entry = OBJECTS + CONNECTOR_TABLE + 4 + index * 8;
            w.u16(entry, connector.object_id);
            w.u16(entry + 4, record_offset(index));
        }

        let encoders: Vec<(usize, u16)> = self
            .connectors
            .iter()
            .enumerate()
            .filter(|(_, connector)| connector.encoder_id != 0)
            .map(|(index, connector)| (index, connector.encoder_id))
            .collect();
        w.u8(OBJECTS + ENCODER_TABLE, encoders.len() as u8);
        for (slot, (index, encoder_id)) in encoders.into_iter().enumerate() {
            let entry = OBJECTS + ENCODER_TABLE + 4 + slot * 8;
            w.u16(entry, encoder_id);
            w.u16(entry + 4, record_offset(index));
        }
    }

    fn write_display_paths(&self, w: &mut Writer<'_>) {
        w.header(OBJECTS, 8, self.object_revision);
        w.u8(OBJECTS + 6, self.connectors.len() as u8);

        for (index, connector) in self.connectors.iter().enumerate() {
            let path = OBJECTS + 8 + index * 16;
            w.u16(path, connector.object_id);
            w.u16(path + 2, (RECORDS - OBJECTS + index * RECORD_STRIDE) as u16);
            w.u16(path + 4, connector.encoder_id);
        }
    }
}

struct Writer<'a>(&'a mut Vec<u8>);

impl Writer<'_> {
    fn bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.0[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn u8(&mut self, offset: usize, value: u8) {
        self.0[offset] = value;
    }

    fn u16(&mut self, offset: usize, value: u16) {
        self.bytes(offset, &value.to_le_bytes());
    }

    fn u32(&mut self, offset: usize, value: u32) {
        self.bytes(offset, &value.to_le_bytes());
    }

    fn header(&mut self, offset: usize, size: u16, (major, minor): (u8, u8)) {
        self.u16(offset, size);
        self.u8(offset + 2, major);
        self.u8(offset + 3, minor);
    }
}
