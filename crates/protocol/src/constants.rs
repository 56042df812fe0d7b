use std::time::Duration;

/// Size of every chunk except possibly the last one (64 KiB).
///
/// Both ends must be built with the same value; it is never negotiated.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Length of the command kind prefix.
pub const KIND_LEN: usize = 1;

/// Length of the fixed header: kind byte + native-endian `i32`.
pub const HEADER_LEN: usize = KIND_LEN + std::mem::size_of::<i32>();

/// Default send and receive timeout for both roles.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Consecutive empty receive cycles the responder tolerates before giving up.
pub const DEFAULT_IDLE_CEILING: u32 = 10;

/// Default port the responder binds.
pub const DEFAULT_PORT: u16 = 5555;

/// Default port for the serving half of relay mode.
pub const DEFAULT_RELAY_PORT: u16 = 5556;
