// Licensed under the Apache-2.0 license

//! GENERIC_I2C driver module.
//!
//! Polled transaction engine for the display controller's GENERIC_I2C block,
//! the request and status types it works with, and the `embedded-hal`
//! front used by the bus adapters.

pub mod common;
pub mod engine;
pub mod i2c_controller;
pub mod traits;
pub mod transaction;

pub use common::{EngineConfig, EngineConfigBuilder, Error};
pub use engine::{EngineSession, I2cEngine};
pub use i2c_controller::I2cController;
pub use traits::I2cMaster;
pub use transaction::{Action, ChannelStatus, Message, TransactionRequest};
