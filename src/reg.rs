// Licensed under the Apache-2.0 license

//! Register access service for the GPU MMIO aperture.
//!
//! Registers are addressed by dword index. Indices whose byte offset falls
//! inside the directly mapped window are accessed in place; everything else
//! goes through the `MM_INDEX`/`MM_DATA` pair, which is serialized by a
//! spin lock so the index write and the data access are never interleaved
//! with another accessor.
//!
//! On top of raw access the service offers masked field helpers. A batch of
//! [`RegField`]s is always folded into one mask and one value so that the
//! hardware observes a single write per call.

use embedded_hal::delay::DelayNs;
use fugit::MicrosDurationU32;
use spin::Mutex;

/// Dword index of the indirect index register.
pub const MM_INDEX: u32 = 0x0000;
/// Dword index of the indirect data register.
pub const MM_DATA: u32 = 0x0001;

/// Raw 32-bit access to a mapped register window.
///
/// Offsets are in bytes. Implementations perform no caching: every call
/// must reach the device.
pub trait RegisterBackend {
    /// Size in bytes of the directly mapped window.
    fn window_size(&self) -> usize;

    fn read32(&self, offset: usize) -> u32;

    fn write32(&self, offset: usize, value: u32);
}

impl<B: RegisterBackend + ?Sized> RegisterBackend for &B {
    fn window_size(&self) -> usize {
        (**self).window_size()
    }

    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }
}

/// Volatile access to a memory-mapped BAR.
#[derive(Debug)]
pub struct MmioWindow {
    base: *mut u8,
    size: usize,
}

// SAFETY: the window is plain device memory; the service serializes the
// only access sequence that must not interleave.
unsafe impl Send for MmioWindow {}
// SAFETY: see above.
unsafe impl Sync for MmioWindow {}

impl MmioWindow {
    /// # Safety
    ///
    /// `base` must point to a live mapping of at least `size` bytes of device
    /// registers, aligned to 4 bytes, that stays mapped for the lifetime of
    /// the returned value.
    #[must_use]
    pub unsafe fn new(base: *mut u8, size: usize) -> Self {
        Self { base, size }
    }

    fn in_window(&self, offset: usize) -> bool {
        offset
            .checked_add(4)
            .is_some_and(|end| end <= self.size && offset % 4 == 0)
    }
}

impl RegisterBackend for MmioWindow {
    fn window_size(&self) -> usize {
        self.size
    }

    fn read32(&self, offset: usize) -> u32 {
        if !self.in_window(offset) {
            return 0;
        }
        // SAFETY: bounds and alignment checked against the mapping from `new`.
        unsafe { core::ptr::read_volatile(self.base.add(offset).cast::<u32>()) }
    }

    fn write32(&self, offset: usize, value: u32) {
        if !self.in_window(offset) {
            return;
        }
        // SAFETY: bounds and alignment checked against the mapping from `new`.
        unsafe { core::ptr::write_volatile(self.base.add(offset).cast::<u32>(), value) }
    }
}

/// One masked field of a register together with the value to place in it
/// (or the value extracted from it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegField {
    pub mask: u32,
    pub shift: u8,
    pub value: u32,
}

impl RegField {
    #[must_use]
    pub const fn new(mask: u32, shift: u8, value: u32) -> Self {
        Self { mask, shift, value }
    }

    /// Same field, different value.
    #[must_use]
    pub const fn with(self, value: u32) -> Self {
        Self {
            mask: self.mask,
            shift: self.shift,
            value,
        }
    }
}

#[must_use]
pub fn get_field(value: u32, mask: u32, shift: u8) -> u32 {
    (value & mask).wrapping_shr(u32::from(shift))
}

#[must_use]
pub fn set_field(current: u32, mask: u32, shift: u8, new: u32) -> u32 {
    (current & !mask) | (mask & new.wrapping_shl(u32::from(shift)))
}

fn combine(fields: &[RegField]) -> (u32, u32) {
    fields.iter().fold((0, 0), |(mask, value), field| {
        (
            mask | field.mask,
            set_field(value, field.mask, field.shift, field.value),
        )
    })
}

/// The awaited field never reached its expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeout {
    /// Last raw register value observed.
    pub last: u32,
}

pub struct RegisterService<B: RegisterBackend> {
    backend: B,
    indirect: Mutex<()>,
}

impl<B: RegisterBackend> RegisterService<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            indirect: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn direct_offset(&self, addr: u32) -> Option<usize> {
        let offset = usize::try_from(addr).ok()?.checked_mul(4)?;
        (offset < self.backend.window_size()).then_some(offset)
    }

    pub fn read(&self, addr: u32) -> u32 {
        if let Some(offset) = self.direct_offset(addr) {
            return self.backend.read32(offset);
        }

        let _guard = self.indirect.lock();
        self.backend
            .write32(MM_INDEX as usize * 4, addr.wrapping_mul(4));
        self.backend.read32(MM_DATA as usize * 4)
    }

    pub fn write(&self, addr: u32, value: u32) {
        if let Some(offset) = self.direct_offset(addr) {
            self.backend.write32(offset, value);
            return;
        }

        let _guard = self.indirect.lock();
        self.backend
            .write32(MM_INDEX as usize * 4, addr.wrapping_mul(4));
        self.backend.write32(MM_DATA as usize * 4, value);
    }

    /// Read-modify-write of every field in `fields` with a single write.
    ///
    /// Returns the value written.
    pub fn update(&self, addr: u32, fields: &[RegField]) -> u32 {
        let (mask, value) = combine(fields);
        let updated = (self.read(addr) & !mask) | value;
        self.write(addr, updated);
        updated
    }

    /// Writes `initial` with `fields` applied, without reading the register.
    ///
    /// Returns the value written.
    pub fn set(&self, addr: u32, initial: u32, fields: &[RegField]) -> u32 {
        let (mask, value) = combine(fields);
        let updated = (initial & !mask) | value;
        self.write(addr, updated);
        updated
    }

    /// Reads the register once and stores every field's value into `fields`.
    pub fn get(&self, addr: u32, fields: &mut [RegField]) -> u32 {
        let raw = self.read(addr);
        for field in fields.iter_mut() {
            field.value = get_field(raw, field.mask, field.shift);
        }
        raw
    }

    /// Polls until `field` holds `field.value`.
    ///
    /// Sleeps `interval` between unsuccessful reads, in milliseconds when the
    /// interval is at least one millisecond. Returns the matching raw value,
    /// or [`WaitTimeout`] once `attempts` reads have failed.
    pub fn wait<D: DelayNs>(
        &self,
        addr: u32,
        field: RegField,
        attempts: u32,
        interval: MicrosDurationU32,
        delay: &mut D,
    ) -> Result<u32, WaitTimeout> {
        let mut last = 0;
        for attempt in 0..attempts {
            last = self.read(addr);
            if get_field(last, field.mask, field.shift) == field.value {
                return Ok(last);
            }
            if attempt + 1 == attempts {
                break;
            }
            let micros = interval.to_micros();
            if micros >= 1000 {
                delay.delay_ms(micros / 1000);
            } else {
                delay.delay_us(micros);
            }
        }
        Err(WaitTimeout { last })
    }
}
