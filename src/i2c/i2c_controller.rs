// Licensed under the Apache-2.0 license

//! embedded-hal front for an [`I2cMaster`].
//!
//! Lets generic device drivers written against `embedded_hal::i2c::I2c` talk
//! to the lighting controller through a GPU adapter.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::Error;
use crate::i2c::traits::I2cMaster;
use crate::i2c::transaction::Message;
use embedded_hal::i2c::{Operation, SevenBitAddress};
use heapless::Vec;

/// Most operations one `transaction` call may carry.
pub const MAX_OPERATIONS: usize = 8;

pub struct I2cController<H: I2cMaster, L: Logger = NoOpLogger> {
    pub hardware: H,
    pub logger: L,
}

impl<H: I2cMaster, L: Logger> I2cController<H, L> {
    pub fn new(hardware: H, logger: L) -> Self {
        Self { hardware, logger }
    }
}

impl<H: I2cMaster, L: Logger> embedded_hal::i2c::ErrorType for I2cController<H, L> {
    type Error = H::Error;
}

impl<H, L> embedded_hal::i2c::I2c for I2cController<H, L>
where
    H: I2cMaster,
    H::Error: From<Error>,
    L: Logger,
{
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let mut messages = [Message::Read {
            address: addr,
            buffer,
        }];
        self.hardware.transfer(&mut messages).map(|_| ())
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut messages = [Message::Write {
            address: addr,
            data: bytes,
        }];
        self.hardware.transfer(&mut messages).map(|_| ())
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut messages = [
            Message::Write {
                address: addr,
                data: bytes,
            },
            Message::Read {
                address: addr,
                buffer,
            },
        ];
        self.hardware.transfer(&mut messages).map(|_| ())
    }

    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let count = operations.len();
        let mut messages: Vec<Message<'_>, MAX_OPERATIONS> = Vec::new();
        for operation in operations.iter_mut() {
            let message = match operation {
                Operation::Read(buffer) => Message::Read {
                    address: addr,
                    buffer: &mut **buffer,
                },
                Operation::Write(data) => Message::Write {
                    address: addr,
                    data: *data,
                },
            };
            if messages.push(message).is_err() {
                self.logger.warn(format_args!(
                    "transaction of {count} operations exceeds {MAX_OPERATIONS}"
                ));
                return Err(Error::InvalidInput.into());
            }
        }
        self.hardware.transfer(&mut messages).map(|_| ())
    }
}
