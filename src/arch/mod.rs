//! Architecture facts the front end needs at parse time.

pub mod reg;

pub use reg::{register_index, Register};
