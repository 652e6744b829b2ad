/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

/// Module containing the error type used throughout the library.
///
/// Recoverable failures are values of [`YamcsError`]; contract violations panic.
pub mod error;
mod util;

mod logger;

pub use error::YamcsError;
pub use logger::{setup_logger, setup_logger_with_level};
pub use util::{encode_name, parse_timestamp, to_isostring};
pub(crate) use util::{lock, read, write};
