// Licensed under the Apache-2.0 license

// Enforce Copilot coding guidelines - prevent panic-prone patterns in production code only
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::indexing_slicing))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(test), no_std)]

//! Driver for the GENERIC_I2C engine of AMD GPUs, as used to reach the RGB
//! lighting controller on ASUS graphics cards.
//!
//! * [`reg`]: MMIO register access with the MM_INDEX/MM_DATA fallback.
//! * [`asic`]: per-family GENERIC_I2C register layout and drive mode.
//! * [`bios`]: ATOM video BIOS tables (connectors, GPIO I2C wiring, clocks).
//! * [`i2c`]: the polled transaction engine.
//! * [`adapter`]: the bus adapter built from a PCI device and its BIOS.

pub mod adapter;
pub mod asic;
pub mod bios;
pub mod common;
pub mod error;
pub mod i2c;
pub mod pci;
pub mod reg;

#[cfg(test)]
mod tests;

pub use adapter::GpuAdapter;
pub use error::Error;
pub use pci::PciDevice;
