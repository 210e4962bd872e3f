//! Process exit codes.

/// Successful operation.
pub const EXIT_SUCCESS: i32 = 0;

/// The signature was well-formed but did not match.
pub const EXIT_INVALID: i32 = 1;

/// Any other failure (configuration, I/O, invalid input, enclave errors).
pub const EXIT_ERROR: i32 = 2;
