// Licensed under the Apache-2.0 license

//! Crate-level error returned by adapter construction and transfers.

use core::fmt;

use embedded_hal::i2c::ErrorKind;

use crate::asic::AsicType;
use crate::bios::BiosError;
use crate::i2c::common::Error as I2cError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The firmware image could not be parsed or queried.
    Firmware(BiosError),
    /// A bus transaction failed.
    I2c(I2cError),
    /// No enumerated PCI device is in the supported board table.
    DeviceNotFound,
    /// The board is known but its GENERIC_I2C block is not.
    UnsupportedAsic(AsicType),
}

impl From<BiosError> for Error {
    fn from(err: BiosError) -> Self {
        Self::Firmware(err)
    }
}

impl From<I2cError> for Error {
    fn from(err: I2cError) -> Self {
        Self::I2c(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Firmware(err) => write!(f, "firmware: {err}"),
            Self::I2c(err) => write!(f, "i2c: {err}"),
            Self::DeviceNotFound => f.write_str("no supported GPU found"),
            Self::UnsupportedAsic(asic) => write!(f, "unsupported ASIC {asic:?}"),
        }
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::I2c(err) => err.kind(),
            _ => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{Error as _, NoAcknowledgeSource};
    use std::string::ToString;

    #[test]
    fn test_conversions_and_kind() {
        let err: Error = I2cError::NoResponse.into();
        assert_eq!(err, Error::I2c(I2cError::NoResponse));
        assert_eq!(
            err.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown)
        );

        let err: Error = BiosError::NotRecognized.into();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::DeviceNotFound.to_string(), "no supported GPU found");
        assert_eq!(
            Error::UnsupportedAsic(AsicType::Vega10).to_string(),
            "unsupported ASIC Vega10"
        );
    }
}
