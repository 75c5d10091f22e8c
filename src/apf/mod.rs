//! APF entity/mention files.
//!
//! APF stores `END` inclusive; everything inside the crate is half-open.
//! The reader adds one and the writer subtracts one, nowhere else.

pub mod reader;
pub mod writer;

pub use reader::{read_apf, ApfDocument};
pub use writer::write_apf;
