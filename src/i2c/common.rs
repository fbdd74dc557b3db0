// Licensed under the Apache-2.0 license

//! Common types for the GENERIC_I2C driver modules.
//!
//! This module provides the shared error type and the engine configuration
//! used across the transaction engine and the bus adapters.

use core::fmt;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use fugit::{KilohertzU32, MicrosDurationU32};

/// Largest byte count the TRANSACTION.COUNT field can hold.
pub const MAX_TRANSACTION_LEN: usize = 15;

/// Delay between two status polls.
pub const DEFAULT_TIMEOUT_DELAY_US: u32 = 1000;
/// Status polls before a transaction is declared timed out.
pub const DEFAULT_TIMEOUT_INTERVAL: u32 = 10;
/// GPIO pad routed to SCL on the lighting header.
pub const DEFAULT_SCL_PIN: u8 = 0x29;
/// GPIO pad routed to SDA on the lighting header.
pub const DEFAULT_SDA_PIN: u8 = 0x28;
/// Bus clock used by the vendor tools for the lighting controller.
pub const DEFAULT_SPEED_KHZ: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Caller arguments the engine cannot express (too long, bad pattern).
    InvalidInput,
    /// The engine never left its busy state.
    EngineBusy,
    /// The poll budget ran out or the hardware flagged a bus timeout.
    Timeout,
    /// No device acknowledged.
    NoResponse,
    /// The hardware aborted the transaction.
    Aborted,
    /// The message pattern is not supported by this adapter.
    Unsupported,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidInput => "invalid input",
            Self::EngineBusy => "engine busy",
            Self::Timeout => "timeout",
            Self::NoResponse => "no response",
            Self::Aborted => "aborted",
            Self::Unsupported => "unsupported transfer",
        };
        f.write_str(text)
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NoResponse => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            Self::Aborted => ErrorKind::Bus,
            Self::InvalidInput | Self::EngineBusy | Self::Timeout | Self::Unsupported => {
                ErrorKind::Other
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub timeout_delay: MicrosDurationU32,
    pub timeout_interval: u32,
    pub scl_pin: u8,
    pub sda_pin: u8,
    pub speed: KilohertzU32,
    /// Engine reference clock. The speed register is left untouched when
    /// this is unknown.
    pub reference_clock: Option<KilohertzU32>,
}

impl EngineConfig {
    /// PRESCALE value for the configured bus speed, if it can be derived.
    #[must_use]
    pub fn prescale(&self) -> Option<u16> {
        let reference = self.reference_clock?.to_kHz();
        let prescale = reference.checked_div(self.speed.to_kHz())?;
        u16::try_from(prescale).ok().filter(|p| *p != 0)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfigBuilder::new().build()
    }
}

pub struct EngineConfigBuilder {
    timeout_delay: MicrosDurationU32,
    timeout_interval: u32,
    scl_pin: u8,
    sda_pin: u8,
    speed: KilohertzU32,
    reference_clock: Option<KilohertzU32>,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout_delay: MicrosDurationU32::micros(DEFAULT_TIMEOUT_DELAY_US),
            timeout_interval: DEFAULT_TIMEOUT_INTERVAL,
            scl_pin: DEFAULT_SCL_PIN,
            sda_pin: DEFAULT_SDA_PIN,
            speed: KilohertzU32::kHz(DEFAULT_SPEED_KHZ),
            reference_clock: None,
        }
    }
    #[must_use]
    pub fn timeout_delay(mut self, delay: MicrosDurationU32) -> Self {
        self.timeout_delay = delay;
        self
    }
    #[must_use]
    pub fn timeout_interval(mut self, attempts: u32) -> Self {
        self.timeout_interval = attempts;
        self
    }
    #[must_use]
    pub fn pins(mut self, scl: u8, sda: u8) -> Self {
        self.scl_pin = scl;
        self.sda_pin = sda;
        self
    }
    #[must_use]
    pub fn speed(mut self, speed: KilohertzU32) -> Self {
        self.speed = speed;
        self
    }
    #[must_use]
    pub fn reference_clock(mut self, clock: KilohertzU32) -> Self {
        self.reference_clock = Some(clock);
        self
    }
    #[must_use]
    pub fn build(self) -> EngineConfig {
        EngineConfig {
            timeout_delay: self.timeout_delay,
            // STATUS is read at least once.
            timeout_interval: self.timeout_interval.max(1),
            scl_pin: self.scl_pin,
            sda_pin: self.sda_pin,
            speed: self.speed,
            reference_clock: self.reference_clock,
        }
    }
}
