// Licensed under the Apache-2.0 license

//! Schema selection and queries over a parsed ATOM image.

use core::mem::size_of;

use super::image::FirmwareImage;
use super::object_id::{GraphicsObjectId, ObjectType};
use super::tables::{
    AtomObject, CommonTableHeader, DisplayControllerInfoV4_1, DisplayObjectInfoV1_4,
    DisplayObjectPath, FirmwareInfoV1_4, FirmwareInfoV2_1, FirmwareInfoV2_2, GpioI2cAssignment,
    GpioPinAssignment, I2cRecord, MasterDataTableV1_1, MasterDataTableV2_1, ObjectInfoV1_1,
    ObjectInfoV1_3, ObjectTableHeader, RecordHeader, RomHeader, I2C_RECORD_TYPE,
    RECORD_END_TYPE,
};
use super::{BiosError, TableRevision};

const ROM_HEADER_POINTER: usize = 0x48;

const I2C_LINE_MASK: u8 = 0x0F;
const I2C_ENGINE_MASK: u8 = 0x70;
const I2C_HW_CAPABLE: u8 = 0x80;

/// Master data table layout selected from the ROM header revision.
#[derive(Debug, Clone, Copy)]
pub enum MasterDataTable<'a> {
    V1_1(&'a MasterDataTableV1_1),
    V2_1(&'a MasterDataTableV2_1),
}

/// Object info table layout selected from its own header revision.
#[derive(Debug, Clone, Copy)]
pub enum ObjectInfoTable<'a> {
    V1_1(&'a ObjectInfoV1_1),
    V1_3(&'a ObjectInfoV1_3),
    V1_4(&'a DisplayObjectInfoV1_4),
}

/// Object tables that pair with the v1.1 master list.
#[derive(Debug, Clone, Copy)]
enum LegacyObjects<'a> {
    V1_1(&'a ObjectInfoV1_1),
    V1_3(&'a ObjectInfoV1_3),
}

impl LegacyObjects<'_> {
    fn connector_table(&self) -> u16 {
        match self {
            Self::V1_1(table) => table.connector_table.get(),
            Self::V1_3(table) => table.connector_table.get(),
        }
    }

    /// Sub-table offset holding objects of `object_type`.
    fn table_for(&self, object_type: ObjectType) -> Option<u16> {
        match (self, object_type) {
            (_, ObjectType::Connector) => Some(self.connector_table()),
            (Self::V1_1(table), ObjectType::Encoder) => Some(table.encoder_table.get()),
            (Self::V1_3(table), ObjectType::Encoder) => Some(table.encoder_table.get()),
            (Self::V1_1(table), ObjectType::Router) => Some(table.router_table.get()),
            (Self::V1_3(table), ObjectType::Router) => Some(table.router_table.get()),
            // The misc table only exists from v1.3 on.
            (Self::V1_3(table), ObjectType::Generic) => Some(table.misc_table.get()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Schema<'a> {
    /// Polaris and Vega.
    V1_1 {
        master: &'a MasterDataTableV1_1,
        objects: LegacyObjects<'a>,
    },
    /// Navi.
    V2_1 {
        master: &'a MasterDataTableV2_1,
        objects: &'a DisplayObjectInfoV1_4,
    },
}

/// Register and bit of one GPIO signal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GpioLine {
    pub register_index: u32,
    pub shift: u8,
    pub mask: u32,
}

impl GpioLine {
    fn new(register_index: u32, shift: u8) -> Self {
        Self {
            register_index,
            shift,
            mask: 1u32.checked_shl(u32::from(shift)).unwrap_or(0),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GpioPinInfo {
    pub clk_mask: GpioLine,
    pub clk_en: GpioLine,
    pub clk_y: GpioLine,
    pub clk_a: GpioLine,
    pub data_mask: GpioLine,
    pub data_en: GpioLine,
    pub data_y: GpioLine,
    pub data_a: GpioLine,
}

impl GpioPinInfo {
    fn from_assignment(pin: &GpioI2cAssignment) -> Self {
        let line = |register: u16, shift| GpioLine::new(u32::from(register), shift);
        Self {
            clk_mask: line(pin.clk_mask_register.get(), pin.clk_mask_shift),
            clk_en: line(pin.clk_en_register.get(), pin.clk_en_shift),
            clk_y: line(pin.clk_y_register.get(), pin.clk_y_shift),
            clk_a: line(pin.clk_a_register.get(), pin.clk_a_shift),
            data_mask: line(pin.data_mask_register.get(), pin.data_mask_shift),
            data_en: line(pin.data_en_register.get(), pin.data_en_shift),
            data_y: line(pin.data_y_register.get(), pin.data_y_shift),
            data_a: line(pin.data_a_register.get(), pin.data_a_shift),
        }
    }
}

/// I2C wiring of a display object.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct I2cInfo {
    /// GPIO_I2C line (pin mux) index.
    pub line: u8,
    pub hw_assist: bool,
    pub engine_id: u8,
    pub slave_address: u8,
    pub gpio: GpioPinInfo,
}

impl I2cInfo {
    fn from_id(i2c_id: u8, slave_address: u8, gpio: GpioPinInfo) -> Self {
        Self {
            line: i2c_id & I2C_LINE_MASK,
            hw_assist: i2c_id & I2C_HW_CAPABLE != 0,
            engine_id: (i2c_id & I2C_ENGINE_MASK) >> 4,
            slave_address,
            gpio,
        }
    }
}

/// A parsed ATOM image with its table layouts resolved.
#[derive(Debug, Clone)]
pub struct FirmwareContext<'a> {
    image: FirmwareImage<'a>,
    revision: TableRevision,
    object_info_revision: TableRevision,
    schema: Schema<'a>,
}

/// ROM headers from 2.2 on point at the v2.1 master list and display paths.
const fn has_display_paths(revision: TableRevision) -> bool {
    revision.major >= 2 && revision.minor >= 2
}

/// Validates `image` and resolves its master data and object info tables.
///
/// # Errors
///
/// Signature and size errors from [`FirmwareImage::new`], fetch errors for
/// the ROM header, master list and object table, and
/// [`BiosError::UnsupportedVersion`] for an object info revision with no
/// known layout.
pub fn parse(image: &[u8]) -> Result<FirmwareContext<'_>, BiosError> {
    let image = FirmwareImage::new(image)?;

    let rom_offset = usize::from(image.read_u16(ROM_HEADER_POINTER)?);
    let rom = image.read_struct::<RomHeader>(rom_offset)?;
    let revision = rom.header.revision();
    let master_offset = usize::from(rom.master_data_table_offset.get());

    let (schema, object_info_revision) = if has_display_paths(revision) {
        let master = image.read_struct::<MasterDataTableV2_1>(master_offset)?;
        let objects = image
            .read_struct::<DisplayObjectInfoV1_4>(usize::from(master.display_object_info.get()))?;
        let object_revision = objects.header.revision();
        match (object_revision.major, object_revision.minor) {
            (1, minor) if minor >= 4 => {}
            _ => return Err(BiosError::UnsupportedVersion(object_revision)),
        }
        (Schema::V2_1 { master, objects }, object_revision)
    } else {
        let master = image.read_struct::<MasterDataTableV1_1>(master_offset)?;
        let offset = usize::from(master.object_header.get());
        let header = image.read_struct::<ObjectInfoV1_1>(offset)?;
        let object_revision = header.header.revision();
        let objects = match (object_revision.major, object_revision.minor) {
            (1, 1..=2) => LegacyObjects::V1_1(header),
            (1, minor) if minor >= 3 => {
                LegacyObjects::V1_3(image.read_struct::<ObjectInfoV1_3>(offset)?)
            }
            _ => return Err(BiosError::UnsupportedVersion(object_revision)),
        };
        (Schema::V1_1 { master, objects }, object_revision)
    };

    Ok(FirmwareContext {
        image,
        revision,
        object_info_revision,
        schema,
    })
}

impl<'a> FirmwareContext<'a> {
    #[must_use]
    pub fn image(&self) -> &FirmwareImage<'a> {
        &self.image
    }

    /// Part number string of the image.
    #[must_use]
    pub fn name(&self) -> &str {
        self.image.name()
    }

    /// ROM header revision.
    #[must_use]
    pub fn revision(&self) -> TableRevision {
        self.revision
    }

    #[must_use]
    pub fn object_info_revision(&self) -> TableRevision {
        self.object_info_revision
    }

    #[must_use]
    pub fn master_data_table(&self) -> MasterDataTable<'a> {
        match self.schema {
            Schema::V1_1 { master, .. } => MasterDataTable::V1_1(master),
            Schema::V2_1 { master, .. } => MasterDataTable::V2_1(master),
        }
    }

    #[must_use]
    pub fn object_info_table(&self) -> ObjectInfoTable<'a> {
        match self.schema {
            Schema::V1_1 {
                objects: LegacyObjects::V1_1(table),
                ..
            } => ObjectInfoTable::V1_1(table),
            Schema::V1_1 {
                objects: LegacyObjects::V1_3(table),
                ..
            } => ObjectInfoTable::V1_3(table),
            Schema::V2_1 { objects, .. } => ObjectInfoTable::V1_4(objects),
        }
    }

    fn legacy_table(
        &self,
        master: &MasterDataTableV1_1,
        sub_table: u16,
    ) -> Result<(usize, &'a ObjectTableHeader), BiosError> {
        let offset = usize::from(master.object_header.get()) + usize::from(sub_table);
        Ok((offset, self.image.read_struct::<ObjectTableHeader>(offset)?))
    }

    fn legacy_object(&self, table_offset: usize, index: usize) -> Result<&'a AtomObject, BiosError> {
        self.image.read_struct::<AtomObject>(
            table_offset + size_of::<ObjectTableHeader>() + index * size_of::<AtomObject>(),
        )
    }

    fn display_path(&self, index: usize) -> Result<&'a DisplayObjectPath, BiosError> {
        let Schema::V2_1 { master, .. } = self.schema else {
            return Err(BiosError::Unsupported);
        };
        self.image.read_struct::<DisplayObjectPath>(
            usize::from(master.display_object_info.get())
                + size_of::<DisplayObjectInfoV1_4>()
                + index * size_of::<DisplayObjectPath>(),
        )
    }

    /// Display paths that lie inside the image.
    fn display_paths(
        &self,
        objects: &DisplayObjectInfoV1_4,
    ) -> impl Iterator<Item = &'a DisplayObjectPath> + '_ {
        (0..usize::from(objects.number_of_path))
            .filter_map(move |index| self.display_path(index).ok())
    }

    /// Number of connectors the image describes.
    ///
    /// Legacy images report the size of the connector object table (0 when
    /// the table is missing); display-path images count paths that have an
    /// encoder attached.
    #[must_use]
    pub fn connectors_count(&self) -> u8 {
        match self.schema {
            Schema::V1_1 { master, objects } => self
                .legacy_table(master, objects.connector_table())
                .map_or(0, |(_, table)| table.count),
            Schema::V2_1 { objects, .. } => {
                let paths = self
                    .display_paths(objects)
                    .filter(|path| path.encoder_objid.get() != 0)
                    .count();
                u8::try_from(paths).unwrap_or(u8::MAX)
            }
        }
    }

    /// Object id of the connector at `index`, if it exists and decodes.
    #[must_use]
    pub fn connector_id(&self, index: u8) -> Option<GraphicsObjectId> {
        match self.schema {
            Schema::V1_1 { master, objects } => {
                let (offset, table) = self.legacy_table(master, objects.connector_table()).ok()?;
                if index >= table.count {
                    return None;
                }
                let object = self.legacy_object(offset, usize::from(index)).ok()?;
                GraphicsObjectId::from_bios(object.object_id.get())
            }
            Schema::V2_1 { objects, .. } => {
                if index >= objects.number_of_path {
                    return None;
                }
                let path = self.display_path(usize::from(index)).ok()?;
                // A generic object sits in display_objid with no encoder.
                if path.encoder_objid.get() == 0 || path.display_objid.get() == 0 {
                    return None;
                }
                GraphicsObjectId::from_bios(path.display_objid.get())
            }
        }
    }

    /// Finds `id` in the legacy object tables; returns its record list offset.
    fn legacy_records(
        &self,
        master: &MasterDataTableV1_1,
        objects: LegacyObjects<'a>,
        id: &GraphicsObjectId,
    ) -> Result<usize, BiosError> {
        let sub_table = objects.table_for(id.object_type).ok_or(BiosError::BadInput)?;
        let (offset, table) = self
            .legacy_table(master, sub_table)
            .map_err(|_| BiosError::BadInput)?;

        (0..usize::from(table.count))
            .filter_map(|index| self.legacy_object(offset, index).ok())
            .find(|object| GraphicsObjectId::from_bios(object.object_id.get()).as_ref() == Some(id))
            .map(|object| usize::from(master.object_header.get()) + usize::from(object.record_offset.get()))
            .ok_or(BiosError::BadInput)
    }

    /// Finds `id` among the display paths; returns its record list offset.
    fn path_records(
        &self,
        master: &MasterDataTableV2_1,
        objects: &DisplayObjectInfoV1_4,
        id: &GraphicsObjectId,
    ) -> Result<usize, BiosError> {
        let paths = || self.display_paths(objects);
        let is_id = |raw: u16| GraphicsObjectId::from_bios(raw).as_ref() == Some(id);

        let path = match id.object_type {
            ObjectType::Encoder => paths()
                .find(|path| is_id(path.encoder_objid.get()))
                .or_else(|| paths().find(|path| is_id(path.display_objid.get()))),
            // Connector and generic ids both live in display_objid.
            ObjectType::Connector | ObjectType::Generic => {
                paths().find(|path| is_id(path.display_objid.get()))
            }
            _ => None,
        }
        .ok_or(BiosError::BadInput)?;

        Ok(usize::from(master.display_object_info.get()) + usize::from(path.disp_record_offset.get()))
    }

    /// Walks the record list at `offset` until an I2C record resolves.
    ///
    /// A resolver failure does not stop the walk; if no later record
    /// resolves, the last failure is reported instead of
    /// [`BiosError::NoRecord`].
    fn walk_records(
        &self,
        mut offset: usize,
        resolve: impl Fn(&I2cRecord) -> Result<I2cInfo, BiosError>,
    ) -> Result<I2cInfo, BiosError> {
        let mut last_error = None;
        loop {
            let header = self
                .image
                .read_struct::<RecordHeader>(offset)
                .map_err(|_| BiosError::BadBiosTable)?;
            if header.record_type == RECORD_END_TYPE || header.record_size == 0 {
                break;
            }

            if header.record_type == I2C_RECORD_TYPE
                && usize::from(header.record_size) >= size_of::<I2cRecord>()
            {
                let record = self
                    .image
                    .read_struct::<I2cRecord>(offset)
                    .map_err(|_| BiosError::BadBiosTable)?;
                match resolve(record) {
                    Ok(info) => return Ok(info),
                    Err(err) => last_error = Some(err),
                }
            }

            offset += usize::from(header.record_size);
        }
        Err(last_error.unwrap_or(BiosError::NoRecord))
    }

    /// Header of a table of fixed-size entries; returns the entry count.
    fn entry_table(&self, offset: usize, entry_size: usize) -> Result<usize, BiosError> {
        let header = self
            .image
            .read_struct::<CommonTableHeader>(offset)
            .map_err(|_| BiosError::BadBiosTable)?;
        let size = usize::from(header.structure_size.get());
        let header_size = size_of::<CommonTableHeader>();
        if header_size + entry_size > size {
            return Err(BiosError::BadBiosTable);
        }
        if header.content_revision != 1 {
            return Err(BiosError::Unsupported);
        }
        Ok((size - header_size) / entry_size)
    }

    fn gpio_assignment(
        &self,
        master: &MasterDataTableV1_1,
        line: u8,
    ) -> Result<&'a GpioI2cAssignment, BiosError> {
        let offset = usize::from(master.gpio_i2c_info.get());
        let count = self.entry_table(offset, size_of::<GpioI2cAssignment>())?;
        let line = usize::from(line);
        if line >= count {
            return Err(BiosError::BadBiosTable);
        }
        self.image
            .read_struct::<GpioI2cAssignment>(
                offset + size_of::<CommonTableHeader>() + line * size_of::<GpioI2cAssignment>(),
            )
            .map_err(|_| BiosError::BadBiosTable)
    }

    fn resolve_gpio_i2c(
        &self,
        master: &MasterDataTableV1_1,
        record: &I2cRecord,
    ) -> Result<I2cInfo, BiosError> {
        let pin = self.gpio_assignment(master, record.i2c_id & I2C_LINE_MASK)?;
        Ok(I2cInfo::from_id(
            record.i2c_id,
            record.slave_address,
            GpioPinInfo::from_assignment(pin),
        ))
    }

    fn resolve_pin_lut(
        &self,
        master: &MasterDataTableV2_1,
        record: &I2cRecord,
    ) -> Result<I2cInfo, BiosError> {
        let offset = usize::from(master.gpio_pin_lut.get());
        let count = self.entry_table(offset, size_of::<GpioPinAssignment>())?;
        let key = I2C_HW_CAPABLE | I2C_ENGINE_MASK | I2C_LINE_MASK;

        let pin = (0..count)
            .filter_map(|index| {
                self.image
                    .read_struct::<GpioPinAssignment>(
                        offset
                            + size_of::<CommonTableHeader>()
                            + index * size_of::<GpioPinAssignment>(),
                    )
                    .ok()
            })
            .find(|pin| pin.gpio_id & key == record.i2c_id & key)
            .ok_or(BiosError::BadBiosTable)?;

        // The LUT only describes the A register of the pin pair.
        let gpio = GpioPinInfo {
            clk_a: GpioLine::new(pin.data_a_reg_index.get(), pin.gpio_bitshift),
            ..GpioPinInfo::default()
        };
        Ok(I2cInfo::from_id(record.i2c_id, record.slave_address, gpio))
    }

    /// I2C wiring of the object `id`.
    ///
    /// # Errors
    ///
    /// [`BiosError::BadInput`] if the object is not in the tables,
    /// [`BiosError::BadBiosTable`] for a malformed record list or GPIO
    /// table, [`BiosError::Unsupported`] for an unknown GPIO table content
    /// revision, [`BiosError::NoRecord`] if the object has no I2C record.
    pub fn i2c_info(&self, id: &GraphicsObjectId) -> Result<I2cInfo, BiosError> {
        match self.schema {
            Schema::V1_1 { master, objects } => {
                let records = self.legacy_records(master, objects, id)?;
                self.walk_records(records, |record| self.resolve_gpio_i2c(master, record))
            }
            Schema::V2_1 { master, objects } => {
                let records = self.path_records(master, objects, id)?;
                self.walk_records(records, |record| self.resolve_pin_lut(master, record))
            }
        }
    }

    /// GPIO_I2C_Info entry for `line`, described by its own id byte.
    ///
    /// # Errors
    ///
    /// As [`FirmwareContext::i2c_info`]; images without a GPIO_I2C_Info
    /// table report [`BiosError::Unsupported`].
    pub fn gpio_info(&self, line: u8) -> Result<I2cInfo, BiosError> {
        let Schema::V1_1 { master, .. } = self.schema else {
            return Err(BiosError::Unsupported);
        };
        let pin = self.gpio_assignment(master, line)?;
        Ok(I2cInfo::from_id(
            pin.i2c_id,
            0,
            GpioPinInfo::from_assignment(pin),
        ))
    }

    /// Reference (crystal) clock in kHz.
    ///
    /// # Errors
    ///
    /// Fetch errors for the firmware info or display controller info table,
    /// [`BiosError::UnsupportedVersion`] for an unknown firmware info
    /// revision, [`BiosError::Unsupported`] for a 3.x table on an image
    /// without display controller info.
    pub fn crystal_frequency(&self) -> Result<u32, BiosError> {
        let firmware_info = match self.schema {
            Schema::V1_1 { master, .. } => master.firmware_info.get(),
            Schema::V2_1 { master, .. } => master.firmware_info.get(),
        };
        let offset = usize::from(firmware_info);
        let revision = self.image.read_struct::<CommonTableHeader>(offset)?.revision();

        let clock_10khz = match (revision.major, revision.minor) {
            (1, 1..=4) => self
                .image
                .read_struct::<FirmwareInfoV1_4>(offset)?
                .reference_clock
                .get(),
            (2, 1) => self
                .image
                .read_struct::<FirmwareInfoV2_1>(offset)?
                .core_reference_clock
                .get(),
            (2, 2) => self
                .image
                .read_struct::<FirmwareInfoV2_2>(offset)?
                .core_reference_clock
                .get(),
            (3, 1..=3) => {
                let Schema::V2_1 { master, .. } = self.schema else {
                    return Err(BiosError::Unsupported);
                };
                self.image
                    .read_struct::<DisplayControllerInfoV4_1>(usize::from(master.dce_info.get()))?
                    .dce_refclk_10khz
                    .get()
            }
            _ => return Err(BiosError::UnsupportedVersion(revision)),
        };

        Ok(u32::from(clock_10khz) * 10)
    }
}
