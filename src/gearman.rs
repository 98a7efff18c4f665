//! Gearman admin protocol client.
//!
//! The job server exposes a line-oriented text protocol on its regular port.
//! Two commands are used here:
//!
//! - `version`: one line with the server version
//! - `status`: one tab-separated line per registered function, terminated by
//!   a line containing a single `.`
//!
//! Every call opens its own connection and closes it before returning, so a
//! [`GearmanClient`] can be shared freely between concurrent scrapes.

mod client;
mod error;
mod status;

pub use client::{GearmanClient, GearmanConfig};
pub use error::GearmanError;
pub use status::{FunctionStatus, StatusSnapshot};
