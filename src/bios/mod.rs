// Licensed under the Apache-2.0 license

//! ATOM BIOS firmware table parser.
//!
//! The video BIOS carries a master list of data tables; the ones that matter
//! here describe display objects (connectors, encoders) and the GPIO pins
//! behind each object's I2C bus. Two incompatible master list layouts exist
//! and each pairs with its own object table layouts:
//!
//! | ROM header | master list | object info          |
//! |------------|-------------|----------------------|
//! | 1.x, 2.0, 2.1 | v1.1     | v1.1/v1.2, v1.3      |
//! | 2.2 and up    | v2.1     | v1.4 (display paths) |
//!
//! [`parse`] selects both layouts once; every query then matches on them.

use core::fmt;

pub mod image;
pub mod object_id;
pub mod parser;
pub mod tables;

pub use image::FirmwareImage;
pub use object_id::{GraphicsObjectId, ObjectType};
pub use parser::{
    parse, FirmwareContext, GpioLine, GpioPinInfo, I2cInfo, MasterDataTable, ObjectInfoTable,
};

/// Table format/content revision pair from a common table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableRevision {
    pub major: u8,
    pub minor: u8,
}

impl TableRevision {
    /// The top two bits of both header bytes are reserved.
    #[must_use]
    pub const fn from_header(format_revision: u8, content_revision: u8) -> Self {
        Self {
            major: format_revision & 0x3F,
            minor: content_revision & 0x3F,
        }
    }

    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for TableRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiosError {
    /// Missing 0xAA55, ATI or ATOM signature.
    NotRecognized,
    /// The image declares more bytes than were mapped.
    SizeMismatch { declared: usize, mapped: usize },
    /// A table offset of zero.
    TableAbsent,
    /// A fetch that would reach the end of the declared image.
    OutOfBounds { offset: usize, size: usize },
    /// A table revision no layout is known for.
    UnsupportedVersion(TableRevision),
    /// The object is not present in the object tables.
    BadInput,
    /// A table is present but structurally invalid.
    BadBiosTable,
    /// A table content revision or schema feature that is not handled.
    Unsupported,
    /// The record list ended without an I2C record.
    NoRecord,
}

impl fmt::Display for BiosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRecognized => f.write_str("not an ATOM BIOS"),
            Self::SizeMismatch { declared, mapped } => {
                write!(f, "declared size {declared} exceeds mapped size {mapped}")
            }
            Self::TableAbsent => f.write_str("table absent"),
            Self::OutOfBounds { offset, size } => {
                write!(f, "{size} bytes at {offset:#x} out of bounds")
            }
            Self::UnsupportedVersion(revision) => write!(f, "unsupported table revision {revision}"),
            Self::BadInput => f.write_str("object not found"),
            Self::BadBiosTable => f.write_str("bad BIOS table"),
            Self::Unsupported => f.write_str("unsupported BIOS table"),
            Self::NoRecord => f.write_str("no I2C record"),
        }
    }
}
