// Application layer - the entry point for presentation code (CLI, HTTP, ...)

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
