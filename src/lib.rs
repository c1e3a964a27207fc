pub mod arch;
pub mod assets;
pub(crate) mod common;

pub mod assembler;

pub mod cli;
