/// Failure kinds for pool operations.
///
/// Every public operation returns success or exactly one of these; there are
/// no partial-success results. Driver errors collapse into
/// [`Error::Platform`] with no further detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The pool has not been initialized (or has been deinitialized).
    NotInitialized,
    /// Out-of-range index, closed handle, unset pin, or zero clock/timeout.
    InvalidParameter,
    /// The operation needs configuration ownership the instance does not
    /// have (it was adopted), or the platform offers no such mechanism.
    NotSupported,
    /// An underlying hardware call failed.
    Platform,
}

impl Error {
    /// Collapse a driver error into [`Error::Platform`].
    pub(crate) fn platform<E>(_: E) -> Self {
        Error::Platform
    }
}
