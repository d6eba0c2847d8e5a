//! Common utilities and types shared across diagpack crates.

pub mod arch;
pub mod error;
pub mod hash;
pub mod timestamp;

pub use arch::NativeArch;
pub use error::{ArchiveContext, Error, Result};
pub use timestamp::Timestamp;
