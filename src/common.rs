// Licensed under the Apache-2.0 license

//! Shared infrastructure used by every driver module.
//!
//! Drivers are generic over a [`Logger`] so that bare-metal builds can compile
//! diagnostics away entirely with [`NoOpLogger`], while hosted builds can route
//! them to the `log` facade through [`LogLogger`].

use core::fmt;

/// Diagnostic sink for driver messages.
///
/// Messages are passed as pre-built [`fmt::Arguments`] so nothing is
/// formatted unless the implementation actually consumes them.
pub trait Logger {
    fn debug(&mut self, args: fmt::Arguments<'_>);
    fn info(&mut self, args: fmt::Arguments<'_>);
    fn warn(&mut self, args: fmt::Arguments<'_>);
    fn error(&mut self, args: fmt::Arguments<'_>);
}

/// Logger that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLogger {}

impl Logger for NoOpLogger {
    fn debug(&mut self, _args: fmt::Arguments<'_>) {}
    fn info(&mut self, _args: fmt::Arguments<'_>) {}
    fn warn(&mut self, _args: fmt::Arguments<'_>) {}
    fn error(&mut self, _args: fmt::Arguments<'_>) {}
}

/// Logger forwarding to the `log` crate under the `aura_gpu` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLogger {}

impl Logger for LogLogger {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        log::debug!(target: "aura_gpu", "{args}");
    }
    fn info(&mut self, args: fmt::Arguments<'_>) {
        log::info!(target: "aura_gpu", "{args}");
    }
    fn warn(&mut self, args: fmt::Arguments<'_>) {
        log::warn!(target: "aura_gpu", "{args}");
    }
    fn error(&mut self, args: fmt::Arguments<'_>) {
        log::error!(target: "aura_gpu", "{args}");
    }
}

impl<L: Logger + ?Sized> Logger for &mut L {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        (**self).debug(args);
    }
    fn info(&mut self, args: fmt::Arguments<'_>) {
        (**self).info(args);
    }
    fn warn(&mut self, args: fmt::Arguments<'_>) {
        (**self).warn(args);
    }
    fn error(&mut self, args: fmt::Arguments<'_>) {
        (**self).error(args);
    }
}
