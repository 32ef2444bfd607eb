//! Error plumbing shared by the fsbot crates.

pub mod error;

pub use error::FromMessage;
