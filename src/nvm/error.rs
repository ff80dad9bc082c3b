/// Errors returned by storage, clipboard, scheduler and pool operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A required argument was missing.
    NullArgument,
    /// Arguments were present but malformed or inconsistent.
    InvalidParameter,
    /// The instance is not in a state that allows the operation.
    InvalidState,
    /// Length is zero or not a multiple of the required unit.
    InvalidLength,
    /// Address range falls outside the permitted region.
    InvalidAddress,
    /// Another operation is in flight.
    Busy,
    /// The backend refuses the operation (e.g. not initialized).
    Forbidden,
    /// The backend does not implement the operation.
    NotSupported,
    /// Lookup, dequeue or scan found nothing.
    NotFound,
    /// A bounded resource is exhausted.
    OutOfMemory,
    /// Stored checksum does not match the data it covers.
    CrcMismatch,
    /// The underlying driver reported a failure.
    Internal,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NullArgument => write!(f, "required argument missing"),
            Error::InvalidParameter => write!(f, "invalid parameter"),
            Error::InvalidState => write!(f, "invalid state for operation"),
            Error::InvalidLength => write!(f, "length is zero or misaligned"),
            Error::InvalidAddress => write!(f, "address range out of bounds"),
            Error::Busy => write!(f, "operation already in flight"),
            Error::Forbidden => write!(f, "operation forbidden by backend"),
            Error::NotSupported => write!(f, "operation not supported"),
            Error::NotFound => write!(f, "not found"),
            Error::OutOfMemory => write!(f, "bounded resource exhausted"),
            Error::CrcMismatch => write!(f, "checksum mismatch"),
            Error::Internal => write!(f, "driver failure"),
        }
    }
}
