//! Terminal output for scan progress, results and report listings.

pub mod console;

pub use console::ConsoleOutput;
