/// Sizes used when the command line does not give them
pub const DEFAULT_MEMORY_SIZE: usize = 64;
pub const DEFAULT_FRAME_SIZE: usize = 4;
pub const DEFAULT_OS_SIZE: usize = 4;

/// Smallest size a program or segment may request
pub const MIN_UNIT_SIZE: usize = 1;

/// Name of the resident operating system unit (never deletable)
pub const OS_NAME: &str = "OS";

pub const INVALID_ADDRESS: i64 = -1;
