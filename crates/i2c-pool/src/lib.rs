#![no_std]
//! Handle-based manager for a fixed pool of I2C controller hardware blocks.
//!
//! A pool owns the driver for a multi-instance I2C controller peripheral and
//! hands out one handle per hardware block. Opening a block programs its
//! pins, pullups, clock and transaction timeout; *adopting* attaches to a
//! block that somebody else already configured, without taking over that
//! configuration's lifecycle (adopted instances can transfer, but refuse
//! reconfiguration).
//!
//! A single table lock serializes every operation across the whole pool;
//! only the open-instance count is lock-free.

mod driver;
mod error;
mod pool;
mod timeout;
mod transfer;

pub use driver::{Ack, I2cConfig, I2cDriver, Mode};
pub use error::Error;
pub use pool::{I2cHandle, I2cPool, DEFAULT_CLOCK_HERTZ, DEFAULT_TIMEOUT_MS};
pub use timeout::TimeoutClock;
