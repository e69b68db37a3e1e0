//! Process exit codes used by the CLI.

/// Command completed successfully.
pub const EXIT_SUCCESS: i32 = 0;

/// Generic failure.
pub const EXIT_ERROR: i32 = 1;

/// Configuration is missing or invalid.
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// A remote provider could not be reached.
pub const EXIT_NETWORK_ERROR: i32 = 3;
