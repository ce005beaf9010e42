#[macro_use] extern crate log;

pub mod assembler;

pub use assembler::{assemble, compile, Assembly, ErrorRecord};
