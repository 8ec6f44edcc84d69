//! External translator processes
//!
//! Runs the source-to-artifact translator as a child process.

pub mod translator;

pub use translator::ProcessTranslator;
