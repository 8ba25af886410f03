//! Stateless transfer helpers: build one addressed transaction from driver
//! primitives and run it. Callers hold the table lock.

use crate::driver::{Ack, I2cDriver};
use crate::error::Error;

const READ_BIT: u8 = 0x01;
const WRITE_BIT: u8 = 0x00;

/// 7-bit address byte with the direction bit.
fn address_7bit(address: u16, direction: u8) -> u8 {
    ((address as u8) << 1) | direction
}

/// 10-bit addressing header: the reserved `11110xx` pattern carrying the two
/// high address bits, plus the direction bit.
fn header_10bit(address: u16, direction: u8) -> u8 {
    (((address & 0x0300) >> 7) as u8) | 0xF0 | direction
}

/// Low byte of a 10-bit address, sent after the header.
fn address_10bit_low(address: u16) -> u8 {
    (address & 0xFF) as u8
}

/// Addressed write as one transaction. `no_stop` leaves the bus claimed so a
/// follow-up transaction can continue without an intervening stop.
pub(crate) fn send<D: I2cDriver>(
    driver: &mut D,
    index: usize,
    address: u16,
    data: Option<&[u8]>,
    no_stop: bool,
) -> Result<(), Error> {
    let mut txn = driver.txn_create().map_err(Error::platform)?;
    let result = queue_send(driver, &mut txn, index, address, data, no_stop);
    driver.txn_delete(txn);
    result
}

fn queue_send<'buf, D: I2cDriver>(
    driver: &mut D,
    txn: &mut D::Txn<'buf>,
    index: usize,
    address: u16,
    data: Option<&'buf [u8]>,
    no_stop: bool,
) -> Result<(), Error> {
    driver.start(txn).map_err(Error::platform)?;
    if address > 0x7F {
        driver
            .write_byte(txn, header_10bit(address, WRITE_BIT), true)
            .map_err(Error::platform)?;
        driver
            .write_byte(txn, address_10bit_low(address), true)
            .map_err(Error::platform)?;
    } else {
        driver
            .write_byte(txn, address_7bit(address, WRITE_BIT), true)
            .map_err(Error::platform)?;
    }
    if let Some(data) = data {
        driver.write(txn, data, true).map_err(Error::platform)?;
    }
    if !no_stop {
        driver.stop(txn).map_err(Error::platform)?;
    }
    driver.execute(index, txn, None).map_err(Error::platform)
}

/// Addressed read as one transaction. Returns the number of bytes received
/// (`buf.len()`).
pub(crate) fn receive<D: I2cDriver>(
    driver: &mut D,
    index: usize,
    address: u16,
    buf: &mut [u8],
) -> Result<usize, Error> {
    let mut txn = driver.txn_create().map_err(Error::platform)?;
    let result = queue_receive(driver, &mut txn, index, address, buf);
    driver.txn_delete(txn);
    result
}

fn queue_receive<'buf, D: I2cDriver>(
    driver: &mut D,
    txn: &mut D::Txn<'buf>,
    index: usize,
    address: u16,
    buf: &'buf mut [u8],
) -> Result<usize, Error> {
    driver.start(txn).map_err(Error::platform)?;
    if address > 0x7F {
        // A 10-bit read addresses the peripheral in write direction first,
        // then re-issues a start and sends the read-direction header.
        driver
            .write_byte(txn, header_10bit(address, WRITE_BIT), true)
            .map_err(Error::platform)?;
        driver
            .write_byte(txn, address_10bit_low(address), true)
            .map_err(Error::platform)?;
        driver.start(txn).map_err(Error::platform)?;
        driver
            .write_byte(txn, header_10bit(address, READ_BIT), true)
            .map_err(Error::platform)?;
    } else {
        driver
            .write_byte(txn, address_7bit(address, READ_BIT), true)
            .map_err(Error::platform)?;
    }
    let len = buf.len();
    if len > 1 {
        let (head, last) = buf.split_at_mut(len - 1);
        driver.read(txn, head, Ack::Ack).map_err(Error::platform)?;
        driver
            .read_byte(txn, &mut last[0], Ack::LastNack)
            .map_err(Error::platform)?;
    } else if len == 1 {
        driver
            .read_byte(txn, &mut buf[0], Ack::LastNack)
            .map_err(Error::platform)?;
    }
    driver.stop(txn).map_err(Error::platform)?;
    driver.execute(index, txn, None).map_err(Error::platform)?;
    Ok(len)
}
