//! Helper functions to deal with serial ports and the device channel.

mod channel;
mod ports;

pub use channel::Channel;
pub(crate) use channel::{read_fixed, write_byte_paced, write_paced};
pub(crate) use ports::{open_and_setup_port, select_port};
