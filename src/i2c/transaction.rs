// Licensed under the Apache-2.0 license

//! Transaction requests, bus messages and status classification.

use crate::asic::I2cFields;
use crate::i2c::common::{Error, MAX_TRANSACTION_LEN};
use crate::reg::get_field;

/// DCE I2C transaction action codes.
///
/// Bit 4 selects the read direction, bit 6 marks a transaction that is
/// followed by another one in the same bus transfer ("more data").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Action {
    Write = 0x00,
    Read = 0x10,
    StatusRequest = 0x20,
    WriteContinued = 0x40,
    ReadContinued = 0x50,
    StatusRequestContinued = 0x60,
    DpWrite = 0x80,
    DpRead = 0x90,
}

impl Action {
    const READ: u8 = 0x10;
    const MOT: u8 = 0x40;

    #[must_use]
    pub const fn for_direction(read: bool, more: bool) -> Self {
        match (read, more) {
            (false, false) => Self::Write,
            (false, true) => Self::WriteContinued,
            (true, false) => Self::Read,
            (true, true) => Self::ReadContinued,
        }
    }

    #[must_use]
    pub const fn is_read(self) -> bool {
        self as u8 & Self::READ != 0
    }

    #[must_use]
    pub const fn is_continued(self) -> bool {
        self as u8 & Self::MOT != 0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Payload<'b> {
    None,
    Write(&'b [u8]),
    Read(&'b mut [u8]),
}

/// One hardware transaction: address phase plus up to fifteen data bytes.
#[derive(Debug, PartialEq, Eq)]
pub struct TransactionRequest<'b> {
    action: Action,
    address: u8,
    payload: Payload<'b>,
}

impl<'b> TransactionRequest<'b> {
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if `data` does not fit one transaction.
    pub fn write(address: u8, data: &'b [u8], more: bool) -> Result<Self, Error> {
        if data.len() > MAX_TRANSACTION_LEN {
            return Err(Error::InvalidInput);
        }
        Ok(Self {
            action: Action::for_direction(false, more),
            address,
            payload: Payload::Write(data),
        })
    }

    /// # Errors
    ///
    /// [`Error::InvalidInput`] if `buffer` does not fit one transaction.
    pub fn read(address: u8, buffer: &'b mut [u8], more: bool) -> Result<Self, Error> {
        if buffer.len() > MAX_TRANSACTION_LEN {
            return Err(Error::InvalidInput);
        }
        Ok(Self {
            action: Action::for_direction(true, more),
            address,
            payload: Payload::Read(buffer),
        })
    }

    /// Address-only write, used to probe for a device.
    #[must_use]
    pub fn probe(address: u8) -> Self {
        Self {
            action: Action::Write,
            address,
            payload: Payload::None,
        }
    }

    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Address byte as it goes on the wire: 7-bit address, R/W in bit 0.
    #[must_use]
    pub fn address_byte(&self) -> u8 {
        (self.address << 1) | u8::from(self.action.is_read())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match &self.payload {
            Payload::None => 0,
            Payload::Write(data) => data.len(),
            Payload::Read(buffer) => buffer.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn payload(&self) -> &Payload<'b> {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload<'b> {
        &mut self.payload
    }
}

/// One message of a bus transfer.
#[derive(Debug, PartialEq, Eq)]
pub enum Message<'b> {
    Write { address: u8, data: &'b [u8] },
    Read { address: u8, buffer: &'b mut [u8] },
}

impl Message<'_> {
    #[must_use]
    pub fn address(&self) -> u8 {
        match self {
            Self::Write { address, .. } | Self::Read { address, .. } => *address,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Write { data, .. } => data.len(),
            Self::Read { buffer, .. } => buffer.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read { .. })
    }
}

/// Terminal (or busy) state reported by GENERIC_I2C_STATUS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Succeeded,
    /// ABORTED was raised.
    Failed,
    EngineBusy,
    Timeout,
    NoResponse,
}

impl ChannelStatus {
    /// Classifies a raw status register value.
    ///
    /// Error bits win over DONE: STOPPED_ON_NACK, TIMEOUT, ABORTED, DONE,
    /// NACK, in that order.
    #[must_use]
    pub fn from_raw(raw: u32, fields: &I2cFields) -> Self {
        let completion = fields.done.mask
            | fields.aborted.mask
            | fields.timeout.mask
            | fields.stopped_on_nack.mask
            | fields.nack.mask;

        if get_field(raw, fields.status.mask, fields.status.shift) != 0 || raw & completion == 0 {
            Self::EngineBusy
        } else if raw & fields.stopped_on_nack.mask != 0 {
            Self::NoResponse
        } else if raw & fields.timeout.mask != 0 {
            Self::Timeout
        } else if raw & fields.aborted.mask != 0 {
            Self::Failed
        } else if raw & fields.done.mask != 0 {
            Self::Succeeded
        } else {
            Self::NoResponse
        }
    }

    /// # Errors
    ///
    /// Every state but [`ChannelStatus::Succeeded`] maps to its [`Error`].
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Self::Succeeded => Ok(()),
            Self::Failed => Err(Error::Aborted),
            Self::EngineBusy => Err(Error::EngineBusy),
            Self::Timeout => Err(Error::Timeout),
            Self::NoResponse => Err(Error::NoResponse),
        }
    }
}
