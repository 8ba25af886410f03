use crate::timeout::TimeoutClock;

/// Acknowledge handling for a queued read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    /// Acknowledge every byte.
    Ack,
    /// Acknowledge nothing.
    Nack,
    /// Acknowledge all but the final byte of the transaction, signalling
    /// end-of-read to the peripheral.
    LastNack,
}

/// Role of a configured hardware block on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Controller,
    Peripheral,
}

/// Full configuration of one hardware block.
///
/// Installing a config replaces whatever was there before; the clock cannot
/// be changed on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    pub mode: Mode,
    /// Data-line GPIO identifier.
    pub pin_sda: i32,
    /// Clock-line GPIO identifier.
    pub pin_scl: i32,
    pub pullup_enable: bool,
    pub clock_hertz: u32,
    /// Source feeding the block's timeout counter.
    pub clock_source: TimeoutClock,
}

/// Hardware seam for a multi-block I2C controller peripheral.
///
/// A transaction (`Txn`) is a command list: the primitives queue steps, and
/// [`execute`](I2cDriver::execute) runs the queued list against one hardware
/// block, blocking until it completes or the block's configured timeout
/// expires. Read primitives borrow their destination buffers for the life of
/// the transaction (`'buf`), which is how the hardware fills them during
/// execution.
pub trait I2cDriver {
    /// Transaction descriptor; borrows the transfer buffers for `'buf`.
    type Txn<'buf>;
    /// Driver-specific failure detail. Collapsed to
    /// [`Error::Platform`](crate::Error::Platform) at the pool boundary.
    type Error: core::fmt::Debug;

    /// Acquire a transaction descriptor.
    fn txn_create<'buf>(&mut self) -> Result<Self::Txn<'buf>, Self::Error>;

    /// Release a transaction descriptor. Callers must do this on every path
    /// out of a transfer, including failures.
    fn txn_delete(&mut self, txn: Self::Txn<'_>);

    /// Queue a (repeated) start condition.
    fn start(&mut self, txn: &mut Self::Txn<'_>) -> Result<(), Self::Error>;

    /// Queue one byte, optionally checking the peripheral's acknowledge.
    fn write_byte(
        &mut self,
        txn: &mut Self::Txn<'_>,
        byte: u8,
        ack_check: bool,
    ) -> Result<(), Self::Error>;

    /// Queue a multi-byte write.
    fn write<'buf>(
        &mut self,
        txn: &mut Self::Txn<'buf>,
        data: &'buf [u8],
        ack_check: bool,
    ) -> Result<(), Self::Error>;

    /// Queue a multi-byte read into `buf`.
    fn read<'buf>(
        &mut self,
        txn: &mut Self::Txn<'buf>,
        buf: &'buf mut [u8],
        ack: Ack,
    ) -> Result<(), Self::Error>;

    /// Queue a single-byte read.
    fn read_byte<'buf>(
        &mut self,
        txn: &mut Self::Txn<'buf>,
        byte: &'buf mut u8,
        ack: Ack,
    ) -> Result<(), Self::Error>;

    /// Queue a stop condition.
    fn stop(&mut self, txn: &mut Self::Txn<'_>) -> Result<(), Self::Error>;

    /// Run the queued transaction against hardware block `index`, blocking
    /// until done. `None` uses the block's configured timeout.
    fn execute(
        &mut self,
        index: usize,
        txn: &mut Self::Txn<'_>,
        timeout_override_ms: Option<u32>,
    ) -> Result<(), Self::Error>;

    /// Install (or replace) the configuration of block `index`.
    fn config_install(&mut self, index: usize, config: &I2cConfig) -> Result<(), Self::Error>;

    /// Tear down the configuration of block `index`.
    fn config_delete(&mut self, index: usize) -> Result<(), Self::Error>;

    /// Program the encoded timeout register of block `index`.
    fn timeout_set(&mut self, index: usize, register: u32) -> Result<(), Self::Error>;

    /// Read back the encoded timeout register of block `index`.
    fn timeout_get(&mut self, index: usize) -> Result<u32, Self::Error>;
}
