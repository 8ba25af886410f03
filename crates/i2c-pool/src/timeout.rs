//! Conversion between millisecond timeouts and the hardware register
//! encoding, which differs per timeout clock source.

/// Largest exponent the exponential timeout register accepts.
/// `2^22 * 25 ns` is just short of 105 ms, the ceiling for the crystal source.
const TIMEOUT_REGISTER_MAX: u32 = 22;

/// Register counts per millisecond for the cycle-counting family.
const APB_CYCLES_PER_MS: u32 = 80_000;

/// Clock source feeding the timeout counter of a hardware block.
///
/// The register encoding depends on it: the bus-clock family counts clock
/// cycles directly (linear both ways), the others store an exponent `x` such
/// that the real timeout is `2^x` source-clock periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutClock {
    /// 80 MHz peripheral bus clock; the register counts cycles.
    Apb,
    /// 40 MHz crystal, 25 ns period; exponential encoding.
    Xtal,
    /// 17.5 MHz RC network (light-sleep source), 57 ns period; exponential
    /// encoding.
    LightSleepRc,
}

impl TimeoutClock {
    /// Period of the exponential sources; `None` for the linear one.
    fn period_ns(self) -> Option<u32> {
        match self {
            TimeoutClock::Apb => None,
            TimeoutClock::Xtal => Some(25),
            TimeoutClock::LightSleepRc => Some(57),
        }
    }

    /// Encode a millisecond timeout as a register value for this source.
    ///
    /// The exponential families pick the smallest exponent whose real
    /// timeout, truncated to milliseconds, is at least `ms`; `None` when
    /// nothing representable is large enough.
    pub fn ms_to_register(self, ms: u32) -> Option<u32> {
        match self.period_ns() {
            None => ms.checked_mul(APB_CYCLES_PER_MS),
            Some(period_ns) => (0..=TIMEOUT_REGISTER_MAX)
                .find(|&x| (1u64 << x) * u64::from(period_ns) / 1_000_000 >= u64::from(ms)),
        }
    }

    /// Decode a register value back to milliseconds, truncating.
    pub fn register_to_ms(self, register: u32) -> u32 {
        match self.period_ns() {
            None => register / APB_CYCLES_PER_MS,
            Some(period_ns) => {
                let exponent = register.min(TIMEOUT_REGISTER_MAX);
                ((1u64 << exponent) * u64::from(period_ns) / 1_000_000) as u32
            }
        }
    }
}
