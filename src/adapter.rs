// Licensed under the Apache-2.0 license

//! Bus adapter exposing the GENERIC_I2C engine of a supported GPU.
//!
//! A [`GpuAdapter`] is built once per board. Families whose lighting bus is
//! described by the video BIOS get a [`FirmwareAdapter`], which frames every
//! transfer as register-offset accesses to the lighting controller. The
//! other families get a [`DirectAdapter`], which hands messages to the engine
//! unchanged. [`GpuAdapter::create_all`] covers hosts with more than one
//! supported card.

use embedded_hal::delay::DelayNs;
use fugit::KilohertzU32;
use heapless::Vec;

use crate::asic::{AsicDescriptor, ChipProfile, DriveMode};
use crate::bios::{self, FirmwareContext, I2cInfo};
use crate::common::{Logger, NoOpLogger};
use crate::error::Error;
use crate::i2c::common::{EngineConfig, EngineConfigBuilder, Error as I2cError, MAX_TRANSACTION_LEN};
use crate::i2c::engine::{EngineSession, I2cEngine};
use crate::i2c::traits::I2cMaster;
use crate::i2c::transaction::{Message, TransactionRequest};
use crate::pci::{self, PciDevice};
use crate::reg::RegisterBackend;

/// Most GPUs [`GpuAdapter::create_all`] builds adapters for.
pub const MAX_ADAPTERS: usize = 2;

/// Adapter for a board whose lighting bus is described by its video BIOS.
pub struct FirmwareAdapter<'f, B: RegisterBackend, D: DelayNs, L: Logger = NoOpLogger> {
    engine: I2cEngine<B, D, L>,
    firmware: FirmwareContext<'f>,
    profile: ChipProfile,
    bus: Option<I2cInfo>,
}

/// Adapter that submits every message as one engine transaction.
pub struct DirectAdapter<B: RegisterBackend, D: DelayNs, L: Logger = NoOpLogger> {
    engine: I2cEngine<B, D, L>,
    profile: ChipProfile,
}

pub enum GpuAdapter<'f, B: RegisterBackend, D: DelayNs, L: Logger = NoOpLogger> {
    FirmwareDriven(FirmwareAdapter<'f, B, D, L>),
    DirectRegister(DirectAdapter<B, D, L>),
}

impl<'f, B: RegisterBackend, D: DelayNs, L: Logger> GpuAdapter<'f, B, D, L> {
    /// Builds the adapter for `device`.
    ///
    /// `firmware` is the mapped video BIOS; it is only parsed for families
    /// whose bus wiring comes from the firmware tables.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceNotFound`] for a board outside the device table,
    /// [`Error::UnsupportedAsic`] for a family without a register
    /// descriptor, [`Error::Firmware`] if the firmware image is unusable.
    pub fn create(
        device: &PciDevice,
        backend: B,
        firmware: &'f [u8],
        delay: D,
        mut logger: L,
    ) -> Result<Self, Error> {
        let entry = pci::lookup(device).ok_or(Error::DeviceNotFound)?;
        let profile = entry.asic.profile();
        let descriptor = entry
            .asic
            .descriptor()
            .ok_or(Error::UnsupportedAsic(entry.asic))?;

        logger.info(format_args!(
            "{} ({:04x}:{:04x}) on the {} register block",
            entry.name, device.vendor_id, device.device_id, descriptor.name
        ));

        match profile.drive_mode {
            DriveMode::FirmwareTable => {
                FirmwareAdapter::new(backend, descriptor, profile, firmware, delay, logger)
                    .map(Self::FirmwareDriven)
            }
            DriveMode::DirectRegister => Ok(Self::DirectRegister(DirectAdapter::new(
                backend,
                descriptor,
                profile,
                delay,
                logger,
            ))),
        }
    }

    /// Builds the adapter for the first enumerated device in the table.
    ///
    /// # Errors
    ///
    /// As [`GpuAdapter::create`].
    pub fn probe<I>(
        devices: I,
        backend: B,
        firmware: &'f [u8],
        delay: D,
        logger: L,
    ) -> Result<Self, Error>
    where
        I: IntoIterator<Item = PciDevice>,
    {
        let (device, _) = pci::find_supported(devices)?;
        Self::create(&device, backend, firmware, delay, logger)
    }

    /// Builds adapters for up to [`MAX_ADAPTERS`] supported boards.
    ///
    /// `boards` yields each enumerated device with the register backend and
    /// mapped video BIOS of that GPU. Devices outside the table are skipped,
    /// and enumeration stops once the set is full. No supported board gives
    /// an empty set.
    ///
    /// # Errors
    ///
    /// The first [`GpuAdapter::create`] failure. Adapters already built for
    /// earlier boards are dropped before it is returned.
    pub fn create_all<I>(
        boards: I,
        delay: D,
        mut logger: L,
    ) -> Result<Vec<Self, MAX_ADAPTERS>, Error>
    where
        I: IntoIterator<Item = (PciDevice, B, &'f [u8])>,
        D: Clone,
        L: Clone,
    {
        let mut adapters = Vec::new();
        for (device, backend, firmware) in boards {
            if pci::lookup(&device).is_none() {
                continue;
            }
            let adapter =
                match Self::create(&device, backend, firmware, delay.clone(), logger.clone()) {
                    Ok(adapter) => adapter,
                    Err(err) => {
                        logger.error(format_args!(
                            "{:04x}:{:04x}: {err}, releasing {} adapters",
                            device.vendor_id,
                            device.device_id,
                            adapters.len()
                        ));
                        return Err(err);
                    }
                };
            if adapters.push(adapter).is_err() || adapters.is_full() {
                break;
            }
        }
        Ok(adapters)
    }

    #[must_use]
    pub fn profile(&self) -> &ChipProfile {
        match self {
            Self::FirmwareDriven(adapter) => &adapter.profile,
            Self::DirectRegister(adapter) => &adapter.profile,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &I2cEngine<B, D, L> {
        match self {
            Self::FirmwareDriven(adapter) => &adapter.engine,
            Self::DirectRegister(adapter) => &adapter.engine,
        }
    }

    /// Parsed firmware, for firmware-driven adapters.
    #[must_use]
    pub fn firmware(&self) -> Option<&FirmwareContext<'f>> {
        match self {
            Self::FirmwareDriven(adapter) => Some(&adapter.firmware),
            Self::DirectRegister(_) => None,
        }
    }

    /// Runs `messages` as one bus transfer; returns the number of messages.
    ///
    /// # Errors
    ///
    /// [`Error::I2c`] with the first transaction failure, or with
    /// [`I2cError::Unsupported`] / [`I2cError::InvalidInput`] for messages
    /// the adapter cannot express.
    pub fn transfer(&self, messages: &mut [Message<'_>]) -> Result<usize, Error> {
        match self {
            Self::FirmwareDriven(adapter) => adapter.transfer(messages),
            Self::DirectRegister(adapter) => adapter.transfer(messages),
        }
    }
}

impl<B: RegisterBackend, D: DelayNs, L: Logger> I2cMaster for GpuAdapter<'_, B, D, L> {
    type Error = Error;

    fn transfer(&self, messages: &mut [Message<'_>]) -> Result<usize, Self::Error> {
        GpuAdapter::transfer(self, messages)
    }
}

/// Logs the display objects of `firmware` and their I2C wiring.
fn log_connectors<L: Logger>(firmware: &FirmwareContext<'_>, logger: &mut L) {
    logger.info(format_args!(
        "BIOS {:?}: ROM {}, object info {}",
        firmware.name(),
        firmware.revision(),
        firmware.object_info_revision()
    ));

    for index in 0..firmware.connectors_count() {
        let Some(id) = firmware.connector_id(index) else {
            continue;
        };
        match firmware.i2c_info(&id) {
            Ok(info) => logger.debug(format_args!(
                "connector {index}: {id:?} line {} engine {} slave {:#04x}",
                info.line, info.engine_id, info.slave_address
            )),
            Err(err) => logger.debug(format_args!("connector {index}: {id:?} ({err})")),
        }
    }
}

impl<'f, B: RegisterBackend, D: DelayNs, L: Logger> FirmwareAdapter<'f, B, D, L> {
    fn new(
        backend: B,
        descriptor: &'static AsicDescriptor,
        profile: ChipProfile,
        image: &'f [u8],
        delay: D,
        mut logger: L,
    ) -> Result<Self, Error> {
        let firmware = bios::parse(image)?;
        log_connectors(&firmware, &mut logger);

        let bus = match firmware.gpio_info(profile.bus_line) {
            Ok(info) => {
                logger.info(format_args!(
                    "lighting bus on line {} (engine {}, hw assist {})",
                    info.line, info.engine_id, info.hw_assist
                ));
                Some(info)
            }
            Err(err) => {
                logger.warn(format_args!(
                    "no GPIO_I2C entry for line {}: {err}",
                    profile.bus_line
                ));
                None
            }
        };

        let mut config = EngineConfigBuilder::new();
        match firmware.crystal_frequency() {
            Ok(khz) => config = config.reference_clock(KilohertzU32::kHz(khz)),
            Err(err) => logger.warn(format_args!(
                "reference clock unknown ({err}), leaving bus speed as is"
            )),
        }

        Ok(Self {
            engine: I2cEngine::new(backend, descriptor, config.build(), delay, logger),
            firmware,
            profile,
            bus,
        })
    }

    #[must_use]
    pub fn firmware(&self) -> &FirmwareContext<'f> {
        &self.firmware
    }

    /// GPIO_I2C entry of the lighting bus line, if the image has one.
    #[must_use]
    pub fn bus_info(&self) -> Option<&I2cInfo> {
        self.bus.as_ref()
    }

    /// Bytes per transaction, offset byte excluded.
    fn group_len(&self) -> usize {
        if self.profile.register_auto_increment {
            MAX_TRANSACTION_LEN - 1
        } else {
            1
        }
    }

    fn write_registers(
        &self,
        session: &mut EngineSession<'_, B, D, L>,
        address: u8,
        offset: u8,
        data: &[u8],
    ) -> Result<(), I2cError> {
        let group = self.group_len();
        for (index, chunk) in data.chunks(group).enumerate() {
            let mut frame: Vec<u8, MAX_TRANSACTION_LEN> = Vec::new();
            frame
                .push(offset.wrapping_add((index * group) as u8))
                .map_err(|_| I2cError::InvalidInput)?;
            frame
                .extend_from_slice(chunk)
                .map_err(|_| I2cError::InvalidInput)?;
            session.transact(&mut TransactionRequest::write(address, &frame, false)?)?;
        }
        Ok(())
    }

    fn read_registers(
        &self,
        session: &mut EngineSession<'_, B, D, L>,
        address: u8,
        offset: u8,
        buffer: &mut [u8],
    ) -> Result<(), I2cError> {
        let group = self.group_len();
        for (index, chunk) in buffer.chunks_mut(group).enumerate() {
            let register = [offset.wrapping_add((index * group) as u8)];
            session.transact(&mut TransactionRequest::write(address, &register, true)?)?;
            session.transact(&mut TransactionRequest::read(address, chunk, false)?)?;
        }
        Ok(())
    }

    /// Register-offset framing:
    ///
    /// * one empty message probes the address;
    /// * one write carries the offset in its first byte, then the data;
    /// * a one-byte write (the offset) followed by a read or a write
    ///   accesses consecutive registers from that offset.
    ///
    /// Any other shape is rejected.
    pub fn transfer(&self, messages: &mut [Message<'_>]) -> Result<usize, Error> {
        let count = messages.len();
        let supported = match &*messages {
            [only] => only.is_empty() || (!only.is_read() && only.len() > 1),
            [Message::Write { data, .. }, _] => data.len() == 1,
            _ => false,
        };
        if !supported {
            self.engine.with_logger(|logger| {
                logger.warn(format_args!("unsupported transfer of {count} message(s)"));
            });
            return Err(I2cError::Unsupported.into());
        }

        let mut session = self.engine.open();
        let result = match messages {
            [only] if only.is_empty() => {
                session.transact(&mut TransactionRequest::probe(only.address()))
            }
            [Message::Write { address, data }] => match data.split_first() {
                Some((offset, bytes)) => {
                    self.write_registers(&mut session, *address, *offset, bytes)
                }
                None => Err(I2cError::InvalidInput),
            },
            [Message::Write { address, data }, second] => {
                let offset = data.first().copied().ok_or(I2cError::InvalidInput)?;
                match second {
                    Message::Read { buffer, .. } => {
                        self.read_registers(&mut session, *address, offset, buffer)
                    }
                    Message::Write { data, .. } => {
                        self.write_registers(&mut session, *address, offset, data)
                    }
                }
            }
            _ => Err(I2cError::Unsupported),
        };

        if let Err(err) = result {
            session
                .logger()
                .debug(format_args!("register transfer failed: {err}"));
        }
        session.close();
        result.map(|()| count).map_err(Error::from)
    }
}

impl<B: RegisterBackend, D: DelayNs, L: Logger> DirectAdapter<B, D, L> {
    fn new(
        backend: B,
        descriptor: &'static AsicDescriptor,
        profile: ChipProfile,
        delay: D,
        logger: L,
    ) -> Self {
        Self {
            engine: I2cEngine::new(backend, descriptor, EngineConfig::default(), delay, logger),
            profile,
        }
    }

    /// Submits each message as one transaction, all but the last flagged
    /// as continued. Stops at the first failure.
    pub fn transfer(&self, messages: &mut [Message<'_>]) -> Result<usize, Error> {
        if messages.iter().any(|message| message.len() > MAX_TRANSACTION_LEN) {
            return Err(I2cError::InvalidInput.into());
        }

        let count = messages.len();
        let last = count.saturating_sub(1);
        let mut session = self.engine.open();
        for (index, message) in messages.iter_mut().enumerate() {
            let more = index < last;
            let mut request = match message {
                Message::Write { address, data } => TransactionRequest::write(*address, data, more)?,
                Message::Read { address, buffer } => {
                    TransactionRequest::read(*address, buffer, more)?
                }
            };
            if let Err(err) = session.transact(&mut request) {
                session
                    .logger()
                    .debug(format_args!("message {index} of {count} failed: {err}"));
                session.close();
                return Err(err.into());
            }
        }
        session.close();
        Ok(count)
    }
}
