// Licensed under the Apache-2.0 license

//! Polled driver for the GENERIC_I2C transaction engine.
//!
//! The engine moves through `Closed → Open → TransactionPending → Polling →
//! Complete | Failed | TimedOut → Open → … → Closed`. Opening takes the
//! per-engine lock and returns an [`EngineSession`]; the session is the only
//! way to touch the hardware and it resets the engine and releases the lock
//! when it is closed or dropped, so an early return can never leave the pin
//! mux routed or the lock held.

use embedded_hal::delay::DelayNs;
use spin::{Mutex, MutexGuard};

use crate::asic::AsicDescriptor;
use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{EngineConfig, Error};
use crate::i2c::transaction::{ChannelStatus, Payload, TransactionRequest};
use crate::reg::{get_field, RegField, RegisterBackend, RegisterService};

/// Engine state only one transfer may own at a time.
struct EngineHw<D, L> {
    delay: D,
    logger: L,
}

pub struct I2cEngine<B: RegisterBackend, D: DelayNs, L: Logger = NoOpLogger> {
    regs: RegisterService<B>,
    asic: &'static AsicDescriptor,
    config: EngineConfig,
    hw: Mutex<EngineHw<D, L>>,
}

impl<B: RegisterBackend, D: DelayNs, L: Logger> I2cEngine<B, D, L> {
    pub fn new(
        backend: B,
        asic: &'static AsicDescriptor,
        config: EngineConfig,
        delay: D,
        logger: L,
    ) -> Self {
        Self {
            regs: RegisterService::new(backend),
            asic,
            config,
            hw: Mutex::new(EngineHw { delay, logger }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn descriptor(&self) -> &'static AsicDescriptor {
        self.asic
    }

    pub fn registers(&self) -> &RegisterService<B> {
        &self.regs
    }

    /// Whether a session currently owns the engine.
    pub fn is_locked(&self) -> bool {
        self.hw.is_locked()
    }

    /// Runs `f` with the engine logger. Must not be called while a session
    /// is open on the same thread.
    pub fn with_logger<R>(&self, f: impl FnOnce(&mut L) -> R) -> R {
        f(&mut self.hw.lock().logger)
    }

    /// Takes the engine lock, enables the engine and routes the pin mux.
    ///
    /// Blocks until any other session has been closed.
    pub fn open(&self) -> EngineSession<'_, B, D, L> {
        let hw = self.hw.lock();
        let mut session = EngineSession {
            engine: self,
            hw,
            closed: false,
        };

        let regs = &self.asic.registers;
        let fields = self.asic.fields;
        session.update(regs.control, &[fields.enable.with(1)]);
        session.update(
            regs.pin_selection,
            &[
                fields.scl_pin_sel.with(u32::from(self.config.scl_pin)),
                fields.sda_pin_sel.with(u32::from(self.config.sda_pin)),
            ],
        );
        if let Some(prescale) = self.config.prescale() {
            session.update(
                regs.speed,
                &[
                    fields.prescale.with(u32::from(prescale)),
                    fields.threshold.with(2),
                ],
            );
        }

        session
    }
}

/// Exclusive, open engine.
pub struct EngineSession<'e, B: RegisterBackend, D: DelayNs, L: Logger> {
    engine: &'e I2cEngine<B, D, L>,
    hw: MutexGuard<'e, EngineHw<D, L>>,
    closed: bool,
}

impl<B: RegisterBackend, D: DelayNs, L: Logger> EngineSession<'_, B, D, L> {
    pub fn logger(&mut self) -> &mut L {
        &mut self.hw.logger
    }

    fn trace(&mut self, op: &str, addr: u32, value: u32) {
        if cfg!(feature = "trace-registers") {
            let name = self.engine.asic.register_name(addr).unwrap_or("?");
            self.hw
                .logger
                .debug(format_args!("reg {op} {name} ({addr:#06x}) = {value:#010x}"));
        }
    }

    fn read(&mut self, addr: u32) -> u32 {
        let value = self.engine.regs.read(addr);
        self.trace("read", addr, value);
        value
    }

    fn update(&mut self, addr: u32, fields: &[RegField]) -> u32 {
        let value = self.engine.regs.update(addr, fields);
        self.trace("write", addr, value);
        value
    }

    fn set(&mut self, addr: u32, fields: &[RegField]) -> u32 {
        let value = self.engine.regs.set(addr, 0, fields);
        self.trace("write", addr, value);
        value
    }

    /// Programs one transaction into the engine and sets GO.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the request length does not fit COUNT.
    pub fn submit(&mut self, request: &TransactionRequest<'_>) -> Result<(), Error> {
        let regs = self.engine.asic.registers;
        let fields = self.engine.asic.fields;
        let count = u32::try_from(request.len()).map_err(|_| Error::InvalidInput)?;

        self.update(
            regs.transaction,
            &[
                fields.rw.with(u32::from(request.action().is_read())),
                fields.stop_on_nack.with(1),
                fields.ack_on_read.with(0),
                fields.start.with(1),
                fields.stop.with(1),
                fields.count.with(count),
            ],
        );

        // Buffer slot 0 is the address byte.
        self.set(
            regs.data,
            &[
                fields.data_rw.with(0),
                fields.data.with(u32::from(request.address_byte())),
                fields.index.with(0),
                fields.index_write.with(1),
            ],
        );

        if let Payload::Write(bytes) = request.payload() {
            for (slot, byte) in (1u32..).zip(bytes.iter()) {
                self.set(
                    regs.data,
                    &[fields.index.with(slot), fields.data.with(u32::from(*byte))],
                );
            }
        }

        self.update(regs.control, &[fields.go.with(1)]);
        Ok(())
    }

    fn clear_ack(&mut self) {
        let regs = self.engine.asic.registers;
        let fields = self.engine.asic.fields;
        self.update(regs.interrupt_control, &[fields.done_ack.with(1)]);
    }

    /// Waits for the submitted transaction to finish.
    ///
    /// Reads STATUS up to `timeout_interval` times, sleeping `timeout_delay`
    /// between busy reads. DONE is acknowledged on every exit.
    pub fn poll(&mut self) -> ChannelStatus {
        let regs = self.engine.asic.registers;
        let fields = self.engine.asic.fields;
        let attempts = self.engine.config.timeout_interval;
        let delay_us = self.engine.config.timeout_delay.to_micros();

        let mut result = ChannelStatus::Timeout;
        for attempt in 0..attempts {
            let raw = self.read(regs.status);
            let status = ChannelStatus::from_raw(raw, fields);
            if status != ChannelStatus::EngineBusy {
                result = status;
                break;
            }
            if attempt + 1 < attempts {
                self.hw.delay.delay_us(delay_us);
            }
        }

        self.clear_ack();
        result
    }

    /// Copies the bytes of a completed read out of the engine buffer.
    pub fn read_reply(&mut self, buffer: &mut [u8]) {
        let regs = self.engine.asic.registers;
        let fields = self.engine.asic.fields;

        // Slot 0 holds the echoed address; the index advances on each read.
        self.set(
            regs.data,
            &[
                fields.data_rw.with(1),
                fields.index.with(1),
                fields.index_write.with(1),
            ],
        );

        for byte in buffer.iter_mut() {
            let raw = self.read(regs.data);
            *byte = get_field(raw, fields.data.mask, fields.data.shift) as u8;
        }

        self.clear_ack();
    }

    /// Submit, poll and, for reads, collect the reply.
    ///
    /// # Errors
    ///
    /// The classified channel status of a transaction that did not succeed.
    pub fn transact(&mut self, request: &mut TransactionRequest<'_>) -> Result<(), Error> {
        self.submit(request)?;
        self.poll().into_result()?;
        if let Payload::Read(buffer) = request.payload_mut() {
            self.read_reply(buffer);
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        let regs = self.engine.asic.registers;
        let fields = self.engine.asic.fields;

        self.update(
            regs.pin_selection,
            &[fields.scl_pin_sel.with(0), fields.sda_pin_sel.with(0)],
        );
        // The enable clear and reset assert must land in one write.
        self.update(
            regs.control,
            &[fields.enable.with(0), fields.soft_reset.with(1)],
        );
        self.update(regs.control, &[fields.soft_reset.with(0)]);
        self.closed = true;
    }

    /// Disables and resets the engine, then releases the lock.
    pub fn close(mut self) {
        self.shutdown();
    }
}

impl<B: RegisterBackend, D: DelayNs, L: Logger> Drop for EngineSession<'_, B, D, L> {
    fn drop(&mut self) {
        if !self.closed {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asic::{GENERIC_I2C_FIELDS, NAVI_DESCRIPTOR, POLARIS_DESCRIPTOR};
    use crate::common::tests::RecordingLogger;
    use crate::i2c::common::EngineConfigBuilder;
    use crate::reg::tests::{CountingDelay, MockBackend};
    use crate::tests::sim::SimulatedGpu;
    use fugit::KilohertzU32;

    const NAVI_STATUS_OFFSET: usize = 0x1eba * 4;

    fn engine(sim: &SimulatedGpu) -> I2cEngine<&SimulatedGpu, CountingDelay> {
        I2cEngine::new(
            sim,
            &NAVI_DESCRIPTOR,
            EngineConfig::default(),
            CountingDelay::default(),
            NoOpLogger {},
        )
    }

    #[test]
    fn test_open_enables_engine_and_routes_pins() {
        let sim = SimulatedGpu::new(&NAVI_DESCRIPTOR);
        let engine = engine(&sim);

        let session = engine.open();
        assert!(engine.is_locked());
        assert_eq!(sim.register(0x1eb8) & GENERIC_I2C_FIELDS.enable.mask, 0x8);
        assert_eq!(sim.register(0x1ebf), 0x2829);
        session.close();

        assert!(!engine.is_locked());
        assert_eq!(sim.register(0x1ebf), 0);
        assert_eq!(sim.register(0x1eb8), 0);
        assert!(sim.soft_reset_pulses() >= 1);
    }

    #[test]
    fn test_dropping_session_closes_engine() {
        let sim = SimulatedGpu::new(&NAVI_DESCRIPTOR);
        let engine = engine(&sim);
        {
            let _session = engine.open();
        }
        assert!(!engine.is_locked());
        assert_eq!(sim.register(0x1ebf), 0);
    }

    #[test]
    fn test_open_programs_speed_when_reference_clock_known() {
        let sim = SimulatedGpu::new(&POLARIS_DESCRIPTOR);
        let config = EngineConfigBuilder::new()
            .reference_clock(KilohertzU32::kHz(27_000))
            .build();
        let engine = I2cEngine::new(
            &sim,
            &POLARIS_DESCRIPTOR,
            config,
            CountingDelay::default(),
            NoOpLogger {},
        );

        engine.open().close();
        assert_eq!(sim.register(0x16f7), (540 << 16) | 2);
    }

    #[test]
    fn test_write_transaction_programs_buffer() {
        let sim = SimulatedGpu::new(&NAVI_DESCRIPTOR);
        sim.attach_device(0x29);
        let engine = engine(&sim);

        let mut session = engine.open();
        let mut request = TransactionRequest::write(0x29, &[0x80, 0x20], false).unwrap();
        assert_eq!(session.transact(&mut request), Ok(()));
        session.close();

        assert_eq!(sim.transactions(), vec![(0x52, vec![0x80, 0x20])]);
        let transaction = sim.register(0x1ebd);
        assert_eq!(transaction & GENERIC_I2C_FIELDS.count.mask, 2 << 16);
        assert_eq!(transaction & GENERIC_I2C_FIELDS.rw.mask, 0);
        assert_eq!(transaction & 0x3100, 0x3100);
    }

    #[test]
    fn test_read_transaction_returns_reply() {
        let sim = SimulatedGpu::new(&NAVI_DESCRIPTOR);
        sim.attach_device(0x50);
        sim.load(0x50, 0x00, &[0xAA, 0xBB, 0xCC]);
        let engine = engine(&sim);

        let mut buffer = [0u8; 3];
        let mut session = engine.open();
        let mut request = TransactionRequest::read(0x50, &mut buffer, false).unwrap();
        assert_eq!(session.transact(&mut request), Ok(()));
        session.close();

        assert_eq!(buffer, [0xAA, 0xBB, 0xCC]);
        assert!(sim.done_acks() >= 2);
    }

    #[test]
    fn test_missing_device_reports_no_response() {
        let sim = SimulatedGpu::new(&NAVI_DESCRIPTOR);
        let engine = engine(&sim);

        let mut session = engine.open();
        let mut request = TransactionRequest::probe(0x33);
        assert_eq!(session.transact(&mut request), Err(Error::NoResponse));
    }

    #[test]
    fn test_poll_times_out_after_budget() {
        let backend = MockBackend::new(0x10000);
        // STATUS field non-zero: engine stays busy.
        backend.preset(NAVI_STATUS_OFFSET, 0x1);
        let config = EngineConfigBuilder::new().timeout_interval(4).build();
        let engine = I2cEngine::new(
            &backend,
            &NAVI_DESCRIPTOR,
            config,
            CountingDelay::default(),
            NoOpLogger {},
        );

        let mut session = engine.open();
        assert_eq!(session.poll(), ChannelStatus::Timeout);
        assert_eq!(session.hw.delay.us_calls.get(), 3);
        drop(session);

        let status_reads = backend
            .reads
            .borrow()
            .iter()
            .filter(|offset| **offset == NAVI_STATUS_OFFSET)
            .count();
        assert_eq!(status_reads, 4);
        // DONE_ACK written on the way out.
        assert!(backend
            .writes
            .borrow()
            .iter()
            .any(|(offset, value)| *offset == 0x1eb9 * 4 && value & 0x2 != 0));
    }

    #[test]
    fn test_poll_reports_aborted_over_done() {
        let backend = MockBackend::new(0x10000);
        backend.preset(NAVI_STATUS_OFFSET, 0b0010_0000 | 0b0001_0000);
        let engine = I2cEngine::new(
            &backend,
            &NAVI_DESCRIPTOR,
            EngineConfig::default(),
            CountingDelay::default(),
            NoOpLogger {},
        );

        let mut session = engine.open();
        assert_eq!(session.poll(), ChannelStatus::Failed);
    }

    #[test]
    fn test_register_tracing_goes_to_logger() {
        let sim = SimulatedGpu::new(&NAVI_DESCRIPTOR);
        let engine = I2cEngine::new(
            &sim,
            &NAVI_DESCRIPTOR,
            EngineConfig::default(),
            CountingDelay::default(),
            RecordingLogger::default(),
        );

        engine.open().close();
        let traced = engine.with_logger(|logger| logger.contains("GENERIC_I2C_CONTROL"));
        assert_eq!(traced, cfg!(feature = "trace-registers"));
    }
}
