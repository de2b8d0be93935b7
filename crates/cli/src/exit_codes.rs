//! CLI Exit Code Registry
//!
//! Single source of truth for the CLI's exit codes. Exit codes are part of
//! the shell contract — scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Meaning                                                     |
//! |------|-------------------------------------------------------------|
//! | 0    | Success                                                     |
//! | 1    | Value error: input did not parse, fallback text was printed |
//! | 2    | Usage error: bad arguments, pattern outside the allowed set |
//! | 3    | I/O error: slot file or stdio failure                       |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// The value could not be parsed as a date/time. The defensive fallback
/// text was still printed, like a grid cell would show it.
pub const EXIT_VALUE: u8 = 1;

/// Usage error - bad arguments, or a pattern/zone/code outside the
/// allowed set.
pub const EXIT_USAGE: u8 = 2;

/// I/O error - slot file unreadable/unwritable, or stdio failed.
pub const EXIT_IO: u8 = 3;
