// Licensed under the Apache-2.0 license

//! Bounds-checked view of a video BIOS image.

use core::mem::size_of;

use heapless::String;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

use super::BiosError;

const BIOS_MAGIC: u16 = 0xAA55;
const ATI_MAGIC_OFFSET: usize = 0x30;
const ATI_MAGIC: &[u8] = b" 761295520";
const ROM_HEADER_POINTER: usize = 0x48;
const ROM_MAGIC_OFFSET: usize = 4;
const ROM_MAGIC: &[u8] = b"ATOM";
const IMAGE_SIZE_OFFSET: usize = 2;
const IMAGE_SIZE_UNIT: usize = 512;
const PART_NUMBER_POINTER: usize = 0x6E;
const DEFAULT_PART_NUMBER_OFFSET: usize = 0x80;

/// Longest part number kept from the image.
pub const NAME_LEN: usize = 19;

/// A signature-checked ATOM image, truncated to its declared size.
///
/// Every fetch is checked against the declared size. Structure fetches also
/// treat offset zero as a missing table, since the master list uses zero for
/// tables the image does not carry.
#[derive(Debug, Clone)]
pub struct FirmwareImage<'a> {
    data: &'a [u8],
    name: String<NAME_LEN>,
}

impl<'a> FirmwareImage<'a> {
    /// # Errors
    ///
    /// [`BiosError::NotRecognized`] if any of the three signatures is
    /// missing, [`BiosError::SizeMismatch`] if the image declares more bytes
    /// than `mapped` holds.
    pub fn new(mapped: &'a [u8]) -> Result<Self, BiosError> {
        let mut image = Self {
            data: mapped,
            name: String::new(),
        };
        if !image.is_atom() {
            return Err(BiosError::NotRecognized);
        }

        let declared = usize::from(image.read_u8(IMAGE_SIZE_OFFSET)?) * IMAGE_SIZE_UNIT;
        image.data = mapped.get(..declared).ok_or(BiosError::SizeMismatch {
            declared,
            mapped: mapped.len(),
        })?;
        image.name = image.read_name();
        Ok(image)
    }

    fn is_atom(&self) -> bool {
        if self.read_u16(0) != Ok(BIOS_MAGIC) {
            return false;
        }
        if self.read_bytes(ATI_MAGIC_OFFSET, ATI_MAGIC.len()) != Ok(ATI_MAGIC) {
            return false;
        }
        let Ok(rom_header) = self.read_u16(ROM_HEADER_POINTER) else {
            return false;
        };
        self.read_bytes(usize::from(rom_header) + ROM_MAGIC_OFFSET, ROM_MAGIC.len())
            == Ok(ROM_MAGIC)
    }

    fn read_name(&self) -> String<NAME_LEN> {
        let offset = match self.read_u16(PART_NUMBER_POINTER) {
            Ok(0) | Err(_) => DEFAULT_PART_NUMBER_OFFSET,
            Ok(offset) => usize::from(offset),
        };
        let mut name = String::new();
        let Ok(bytes) = self.read_bytes(offset, NAME_LEN) else {
            return name;
        };
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        let text = bytes.get(..end).unwrap_or_default();
        let text = match core::str::from_utf8(text) {
            Ok(text) => text,
            Err(err) => core::str::from_utf8(text.get(..err.valid_up_to()).unwrap_or_default())
                .unwrap_or_default(),
        };
        for ch in text.chars() {
            if name.push(ch).is_err() {
                break;
            }
        }
        name
    }

    /// Declared image size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Part number string, empty if the image carries none.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// # Errors
    ///
    /// [`BiosError::OutOfBounds`] unless `offset + len` lies strictly inside
    /// the image.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], BiosError> {
        let out_of_bounds = BiosError::OutOfBounds { offset, size: len };
        let end = offset.checked_add(len).ok_or(out_of_bounds)?;
        if end >= self.data.len() {
            return Err(out_of_bounds);
        }
        self.data.get(offset..end).ok_or(out_of_bounds)
    }

    /// # Errors
    ///
    /// [`BiosError::OutOfBounds`] past the end of the image.
    pub fn read_u8(&self, offset: usize) -> Result<u8, BiosError> {
        self.data
            .get(offset)
            .copied()
            .ok_or(BiosError::OutOfBounds { offset, size: 1 })
    }

    /// # Errors
    ///
    /// [`BiosError::OutOfBounds`] past the end of the image.
    pub fn read_u16(&self, offset: usize) -> Result<u16, BiosError> {
        let lo = self.read_u8(offset)?;
        let hi = self.read_u8(offset.checked_add(1).ok_or(BiosError::OutOfBounds {
            offset,
            size: 2,
        })?)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// # Errors
    ///
    /// [`BiosError::OutOfBounds`] past the end of the image.
    pub fn read_u32(&self, offset: usize) -> Result<u32, BiosError> {
        let lo = self.read_u16(offset)?;
        let hi = self.read_u16(offset.checked_add(2).ok_or(BiosError::OutOfBounds {
            offset,
            size: 4,
        })?)?;
        Ok(u32::from(lo) | (u32::from(hi) << 16))
    }

    /// Borrows a table structure at `offset`.
    ///
    /// # Errors
    ///
    /// [`BiosError::TableAbsent`] for offset zero, [`BiosError::OutOfBounds`]
    /// unless the whole structure lies strictly inside the image.
    pub fn read_struct<T>(&self, offset: usize) -> Result<&'a T, BiosError>
    where
        T: FromBytes + KnownLayout + Immutable + Unaligned,
    {
        if offset == 0 {
            return Err(BiosError::TableAbsent);
        }
        let size = size_of::<T>();
        let bytes = self.read_bytes(offset, size)?;
        T::ref_from_bytes(bytes).map_err(|_| BiosError::OutOfBounds { offset, size })
    }
}
