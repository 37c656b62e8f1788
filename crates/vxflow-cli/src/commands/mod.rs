//! Command implementations

mod generate;

pub use generate::run_generate;
