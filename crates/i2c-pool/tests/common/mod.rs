#![allow(dead_code)]
//! Scripted mock of the driver seam, shared by the integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use i2c_pool::{Ack, I2cConfig, I2cDriver, I2cPool, TimeoutClock};

/// One driver call, recorded in order for asserting exact sequences.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    TxnCreate,
    TxnDelete,
    Start,
    WriteByte { byte: u8, ack_check: bool },
    Write { data: Vec<u8>, ack_check: bool },
    Read { len: usize, ack: Ack },
    ReadByte { ack: Ack },
    Stop,
    Execute { index: usize, timeout_override_ms: Option<u32> },
    ConfigInstall { index: usize, config: I2cConfig },
    ConfigDelete { index: usize },
    TimeoutSet { index: usize, register: u32 },
    TimeoutGet { index: usize },
}

/// Call log plus failure script. `fail_*` makes the matching primitive
/// return an error (after being recorded).
#[derive(Default)]
pub struct MockLog {
    pub calls: Vec<Call>,
    pub fail_start: bool,
    pub fail_write: bool,
    pub fail_execute: bool,
    pub fail_config_install: bool,
    pub fail_config_delete: bool,
    pub fail_timeout_set: bool,
    pub fail_timeout_get: bool,
    /// Value returned by `timeout_get`.
    pub timeout_register: u32,
    /// First byte written into read buffers at execute; subsequent bytes
    /// increment from it.
    pub rx_fill: u8,
}

impl MockLog {
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }
}

#[derive(Debug, PartialEq)]
pub struct MockError;

enum QueuedRead<'buf> {
    Block(&'buf mut [u8]),
    Byte(&'buf mut u8),
}

pub struct MockTxn<'buf> {
    reads: Vec<QueuedRead<'buf>>,
}

pub struct MockDriver {
    pub log: Rc<RefCell<MockLog>>,
}

impl I2cDriver for MockDriver {
    type Txn<'buf> = MockTxn<'buf>;
    type Error = MockError;

    fn txn_create<'buf>(&mut self) -> Result<MockTxn<'buf>, MockError> {
        self.log.borrow_mut().calls.push(Call::TxnCreate);
        Ok(MockTxn { reads: Vec::new() })
    }

    fn txn_delete(&mut self, _txn: MockTxn<'_>) {
        self.log.borrow_mut().calls.push(Call::TxnDelete);
    }

    fn start(&mut self, _txn: &mut MockTxn<'_>) -> Result<(), MockError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::Start);
        if log.fail_start {
            return Err(MockError);
        }
        Ok(())
    }

    fn write_byte(
        &mut self,
        _txn: &mut MockTxn<'_>,
        byte: u8,
        ack_check: bool,
    ) -> Result<(), MockError> {
        self.log
            .borrow_mut()
            .calls
            .push(Call::WriteByte { byte, ack_check });
        Ok(())
    }

    fn write<'buf>(
        &mut self,
        _txn: &mut MockTxn<'buf>,
        data: &'buf [u8],
        ack_check: bool,
    ) -> Result<(), MockError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::Write {
            data: data.to_vec(),
            ack_check,
        });
        if log.fail_write {
            return Err(MockError);
        }
        Ok(())
    }

    fn read<'buf>(
        &mut self,
        txn: &mut MockTxn<'buf>,
        buf: &'buf mut [u8],
        ack: Ack,
    ) -> Result<(), MockError> {
        self.log
            .borrow_mut()
            .calls
            .push(Call::Read { len: buf.len(), ack });
        txn.reads.push(QueuedRead::Block(buf));
        Ok(())
    }

    fn read_byte<'buf>(
        &mut self,
        txn: &mut MockTxn<'buf>,
        byte: &'buf mut u8,
        ack: Ack,
    ) -> Result<(), MockError> {
        self.log.borrow_mut().calls.push(Call::ReadByte { ack });
        txn.reads.push(QueuedRead::Byte(byte));
        Ok(())
    }

    fn stop(&mut self, _txn: &mut MockTxn<'_>) -> Result<(), MockError> {
        self.log.borrow_mut().calls.push(Call::Stop);
        Ok(())
    }

    fn execute(
        &mut self,
        index: usize,
        txn: &mut MockTxn<'_>,
        timeout_override_ms: Option<u32>,
    ) -> Result<(), MockError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::Execute {
            index,
            timeout_override_ms,
        });
        if log.fail_execute {
            return Err(MockError);
        }
        let mut value = log.rx_fill;
        for read in txn.reads.iter_mut() {
            match read {
                QueuedRead::Block(buf) => {
                    for byte in buf.iter_mut() {
                        *byte = value;
                        value = value.wrapping_add(1);
                    }
                }
                QueuedRead::Byte(byte) => {
                    **byte = value;
                    value = value.wrapping_add(1);
                }
            }
        }
        Ok(())
    }

    fn config_install(&mut self, index: usize, config: &I2cConfig) -> Result<(), MockError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::ConfigInstall {
            index,
            config: *config,
        });
        if log.fail_config_install {
            return Err(MockError);
        }
        Ok(())
    }

    fn config_delete(&mut self, index: usize) -> Result<(), MockError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::ConfigDelete { index });
        if log.fail_config_delete {
            return Err(MockError);
        }
        Ok(())
    }

    fn timeout_set(&mut self, index: usize, register: u32) -> Result<(), MockError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::TimeoutSet { index, register });
        if log.fail_timeout_set {
            return Err(MockError);
        }
        Ok(())
    }

    fn timeout_get(&mut self, index: usize) -> Result<u32, MockError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::TimeoutGet { index });
        if log.fail_timeout_get {
            return Err(MockError);
        }
        Ok(log.timeout_register)
    }
}

pub type TestPool = I2cPool<NoopRawMutex, MockDriver, 2>;

pub fn make_pool(clock: TimeoutClock) -> (TestPool, Rc<RefCell<MockLog>>) {
    let log = Rc::new(RefCell::new(MockLog::default()));
    let pool = I2cPool::new(MockDriver { log: log.clone() }, clock);
    (pool, log)
}
