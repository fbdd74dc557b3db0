// Licensed under the Apache-2.0 license

//! # I2C master abstraction
//!
//! A bus master runs a list of [`Message`]s as one transfer. The GPU adapters
//! implement it, and [`I2cController`](crate::i2c::i2c_controller::I2cController)
//! turns any implementor into an `embedded_hal::i2c::I2c` bus.

use crate::i2c::transaction::Message;

/// I2C master operations
///
/// # Examples
///
/// ```rust,no_run
/// use aura_gpu_ddk::i2c::{I2cMaster, Message};
///
/// fn read_register<T: I2cMaster>(bus: &T, addr: u8, reg: u8) -> Result<u8, T::Error> {
///     let mut value = [0u8; 1];
///     let mut messages = [
///         Message::Write { address: addr, data: &[reg] },
///         Message::Read { address: addr, buffer: &mut value },
///     ];
///     bus.transfer(&mut messages)?;
///     Ok(value[0])
/// }
/// ```
pub trait I2cMaster {
    /// Hardware-specific error type that implements embedded-hal error traits
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Runs `messages` in order as one bus transfer.
    ///
    /// Read messages have their buffers filled. Returns the number of
    /// messages processed.
    ///
    /// # Errors
    ///
    /// Returns an error if a device does not acknowledge, the hardware aborts
    /// or times out, or the message list cannot be expressed on this bus.
    /// Messages after a failing one are not run.
    fn transfer(&self, messages: &mut [Message<'_>]) -> Result<usize, Self::Error>;
}
