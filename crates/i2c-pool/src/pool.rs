use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use portable_atomic::{AtomicU32, Ordering};

use crate::driver::{I2cConfig, I2cDriver, Mode};
use crate::error::Error;
use crate::timeout::TimeoutClock;
use crate::transfer;

/// Clock programmed into an instance at open time, in Hertz.
pub const DEFAULT_CLOCK_HERTZ: u32 = 100_000;

/// Transaction timeout programmed into an instance at open time.
pub const DEFAULT_TIMEOUT_MS: u32 = 10;

/// Handle to an open instance. The value is the hardware block index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cHandle(usize);

impl I2cHandle {
    /// The hardware block index this handle refers to.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Per-block bookkeeping while an instance is open.
///
/// The pins and clock are remembered because the only way to change the
/// clock is to rebuild the whole configuration.
#[derive(Debug, Clone, Copy)]
struct OpenState {
    pin_sda: i32,
    pin_scl: i32,
    clock_hertz: u32,
    adopted: bool,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Closed,
    Open(OpenState),
}

struct Inner<D, const N: usize> {
    driver: D,
    /// `None` until [`I2cPool::init`]; doubles as the initialized flag.
    slots: Option<[Slot; N]>,
}

/// Handle-based manager for a fixed pool of `N` I2C controller blocks.
///
/// One table lock serializes every operation (including transfers) across
/// the whole pool. That trades throughput for simplicity, which fits a small
/// number of rarely-reconfigured hardware blocks. [`I2cPool::open_count`]
/// alone is lock-free.
pub struct I2cPool<M: RawMutex, D: I2cDriver, const N: usize> {
    inner: Mutex<M, RefCell<Inner<D, N>>>,
    /// Diagnostic count of open instances, readable while another thread
    /// holds the table lock.
    open_count: AtomicU32,
    clock: TimeoutClock,
}

impl<M: RawMutex, D: I2cDriver, const N: usize> I2cPool<M, D, N> {
    /// Create a pool over `driver`, uninitialized. `clock` selects the
    /// timeout counter source shared by every block.
    pub const fn new(driver: D, clock: TimeoutClock) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner { driver, slots: None })),
            open_count: AtomicU32::new(0),
            clock,
        }
    }

    /// Initialize the pool, marking every slot closed. Idempotent.
    pub fn init(&self) -> Result<(), Error> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if inner.slots.is_none() {
                inner.slots = Some([Slot::Closed; N]);
            }
            Ok(())
        })
    }

    /// Close every open instance (tearing down hardware for the non-adopted
    /// ones) and return the pool to the uninitialized state. No-op when not
    /// initialized.
    pub fn deinit(&self) {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let Inner { driver, slots } = &mut *inner;
            let Some(table) = slots.as_mut() else {
                return;
            };
            for (index, slot) in table.iter_mut().enumerate() {
                Self::close_slot(driver, &self.open_count, index, slot);
            }
            *slots = None;
        })
    }

    /// Open hardware block `index` as a bus controller, programming pins,
    /// pullups and the default clock and timeout. Returns the handle.
    pub fn open(
        &self,
        index: usize,
        pin_sda: i32,
        pin_scl: i32,
        controller: bool,
    ) -> Result<I2cHandle, Error> {
        self.do_open(index, pin_sda, pin_scl, controller, false)
    }

    /// Attach to hardware block `index` that somebody else already
    /// configured. No hardware is touched; the instance can transfer but
    /// refuses reconfiguration for as long as it lives.
    pub fn adopt(&self, index: usize, controller: bool) -> Result<I2cHandle, Error> {
        self.do_open(index, -1, -1, controller, true)
    }

    fn do_open(
        &self,
        index: usize,
        pin_sda: i32,
        pin_scl: i32,
        controller: bool,
        adopt: bool,
    ) -> Result<I2cHandle, Error> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let Inner { driver, slots } = &mut *inner;
            let slots = slots.as_mut().ok_or(Error::NotInitialized)?;
            let slot = slots.get_mut(index).ok_or(Error::InvalidParameter)?;
            if !matches!(*slot, Slot::Closed)
                || !controller
                || (!adopt && (pin_sda < 0 || pin_scl < 0))
            {
                return Err(Error::InvalidParameter);
            }
            if !adopt {
                let register = self
                    .clock
                    .ms_to_register(DEFAULT_TIMEOUT_MS)
                    .ok_or(Error::Platform)?;
                let config = I2cConfig {
                    mode: Mode::Controller,
                    pin_sda,
                    pin_scl,
                    pullup_enable: true,
                    clock_hertz: DEFAULT_CLOCK_HERTZ,
                    clock_source: self.clock,
                };
                driver.config_install(index, &config).map_err(Error::platform)?;
                if driver.timeout_set(index, register).is_err() {
                    // Leave no half-programmed block behind.
                    let _ = driver.config_delete(index);
                    return Err(Error::Platform);
                }
            }
            *slot = Slot::Open(OpenState {
                pin_sda,
                pin_scl,
                clock_hertz: DEFAULT_CLOCK_HERTZ,
                adopted: adopt,
            });
            self.open_count.fetch_add(1, Ordering::Relaxed);
            Ok(I2cHandle(index))
        })
    }

    /// Close an instance. Silent when the pool is uninitialized, the handle
    /// is out of range, or the slot is already closed.
    pub fn close(&self, handle: I2cHandle) {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let Inner { driver, slots } = &mut *inner;
            let Some(slots) = slots.as_mut() else {
                return;
            };
            let Some(slot) = slots.get_mut(handle.index()) else {
                return;
            };
            Self::close_slot(driver, &self.open_count, handle.index(), slot);
        })
    }

    /// Close an instance and attempt electrical bus recovery.
    ///
    /// This driver model has no explicit recovery sequence (recovery happens
    /// implicitly when a block is next initialized), so the owned-instance
    /// path still closes the slot but reports [`Error::NotSupported`].
    /// Adopted instances are refused without touching anything.
    pub fn close_recover_bus(&self, handle: I2cHandle) -> Result<(), Error> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let Inner { driver, slots } = &mut *inner;
            let slots = slots.as_mut().ok_or(Error::NotInitialized)?;
            let slot = slots
                .get_mut(handle.index())
                .ok_or(Error::InvalidParameter)?;
            match *slot {
                Slot::Closed => Err(Error::InvalidParameter),
                Slot::Open(state) if state.adopted => Err(Error::NotSupported),
                Slot::Open(_) => {
                    Self::close_slot(driver, &self.open_count, handle.index(), slot);
                    Err(Error::NotSupported)
                }
            }
        })
    }

    /// Change an instance's clock frequency.
    ///
    /// The clock cannot be changed on its own: the whole configuration is
    /// torn down and rebuilt with the new rate, preserving the encoded
    /// timeout across the rebuild. Once the old configuration is gone a
    /// failure leaves the slot closed; there is nothing to roll back to.
    pub fn set_clock(&self, handle: I2cHandle, hertz: u32) -> Result<(), Error> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let Inner { driver, slots } = &mut *inner;
            let slots = slots.as_mut().ok_or(Error::NotInitialized)?;
            let slot = slots
                .get_mut(handle.index())
                .ok_or(Error::InvalidParameter)?;
            let state = match *slot {
                Slot::Open(state) => state,
                Slot::Closed => return Err(Error::InvalidParameter),
            };
            if hertz == 0 {
                return Err(Error::InvalidParameter);
            }
            if state.adopted {
                return Err(Error::NotSupported);
            }

            let register = driver.timeout_get(handle.index()).map_err(Error::platform)?;
            driver.config_delete(handle.index()).map_err(Error::platform)?;
            // Fail closed from here on.
            *slot = Slot::Closed;
            self.open_count.fetch_sub(1, Ordering::Relaxed);

            let config = I2cConfig {
                mode: Mode::Controller,
                pin_sda: state.pin_sda,
                pin_scl: state.pin_scl,
                pullup_enable: true,
                clock_hertz: hertz,
                clock_source: self.clock,
            };
            driver
                .config_install(handle.index(), &config)
                .map_err(Error::platform)?;
            driver
                .timeout_set(handle.index(), register)
                .map_err(Error::platform)?;

            *slot = Slot::Open(OpenState {
                clock_hertz: hertz,
                ..state
            });
            self.open_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }

    /// The instance's clock frequency in Hertz.
    pub fn get_clock(&self, handle: I2cHandle) -> Result<u32, Error> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let state = Self::open_state(&mut inner.slots, handle)?;
            if state.adopted {
                return Err(Error::NotSupported);
            }
            Ok(state.clock_hertz)
        })
    }

    /// Program the instance's transaction timeout in milliseconds.
    pub fn set_timeout(&self, handle: I2cHandle, ms: u32) -> Result<(), Error> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let Inner { driver, slots } = &mut *inner;
            let state = Self::open_state(slots, handle)?;
            if ms == 0 {
                return Err(Error::InvalidParameter);
            }
            if state.adopted {
                return Err(Error::NotSupported);
            }
            let register = self.clock.ms_to_register(ms).ok_or(Error::Platform)?;
            driver
                .timeout_set(handle.index(), register)
                .map_err(Error::platform)?;
            Ok(())
        })
    }

    /// Read back the instance's transaction timeout, truncated to
    /// milliseconds.
    pub fn get_timeout(&self, handle: I2cHandle) -> Result<u32, Error> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let Inner { driver, slots } = &mut *inner;
            let state = Self::open_state(slots, handle)?;
            if state.adopted {
                return Err(Error::NotSupported);
            }
            let register = driver.timeout_get(handle.index()).map_err(Error::platform)?;
            Ok(self.clock.register_to_ms(register))
        })
    }

    /// Addressed write as a single transaction. `data` of `None` sends the
    /// address phase alone; `no_stop` leaves the bus claimed for a follow-up
    /// transaction.
    pub fn send(
        &self,
        handle: I2cHandle,
        address: u16,
        data: Option<&[u8]>,
        no_stop: bool,
    ) -> Result<(), Error> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let Inner { driver, slots } = &mut *inner;
            Self::open_state(slots, handle)?;
            transfer::send(driver, handle.index(), address, data, no_stop)
        })
    }

    /// Addressed write and/or read; either half alone is valid. Returns the
    /// number of bytes received (zero when no receive half ran).
    pub fn send_receive(
        &self,
        handle: I2cHandle,
        address: u16,
        tx: Option<&[u8]>,
        rx: Option<&mut [u8]>,
    ) -> Result<usize, Error> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let Inner { driver, slots } = &mut *inner;
            Self::open_state(slots, handle)?;
            if let Some(tx) = tx {
                // The send half ends with a stop; the receive half opens
                // with its own start rather than a repeated start.
                transfer::send(driver, handle.index(), address, Some(tx), false)?;
            }
            match rx {
                Some(rx) => transfer::receive(driver, handle.index(), address, rx),
                None => Ok(0),
            }
        })
    }

    /// Number of open instances. Lock-free.
    pub fn open_count(&self) -> u32 {
        self.open_count.load(Ordering::Relaxed)
    }

    /// Validated lookup: a mutable view of an open slot's state, or the
    /// applicable error.
    fn open_state(
        slots: &mut Option<[Slot; N]>,
        handle: I2cHandle,
    ) -> Result<&mut OpenState, Error> {
        let slots = slots.as_mut().ok_or(Error::NotInitialized)?;
        match slots.get_mut(handle.index()) {
            Some(Slot::Open(state)) => Ok(state),
            _ => Err(Error::InvalidParameter),
        }
    }

    fn close_slot(driver: &mut D, open_count: &AtomicU32, index: usize, slot: &mut Slot) {
        if let Slot::Open(state) = *slot {
            if !state.adopted {
                // Failure here is unreportable; the slot closes regardless.
                let _ = driver.config_delete(index);
            }
            *slot = Slot::Closed;
            open_count.fetch_sub(1, Ordering::Relaxed);
        }
    }
}
