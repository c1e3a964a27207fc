pub mod types;

pub mod merge;
pub mod parse;
pub mod resolve;
pub mod tokenize;

pub use merge::merge;
pub use parse::parse;
pub use resolve::resolve_module;
pub use tokenize::tokenize;
