//! # vcx-sim
//!
//! A simulated libvcx. It implements [`vcx_core::NativeLibrary`] in-process:
//! calls are validated on the caller's thread, executed on worker threads,
//! and answered through the C callback pointers the bridge hands over, so the
//! whole callback path runs exactly as it does against the real library.

pub mod config;
pub mod engine;
pub mod error;
pub mod objects;
pub mod operations;
pub mod protocol;

pub use config::SimConfig;
pub use engine::{SimLibrary, SimStats};
pub use error::{SimError, SimResult};
pub use objects::{ObjectTable, SimObject};
pub use operations::PROOF_VERIFIED;
