//! # Birdcall Core
//!
//! Shared foundation for the Birdcall workspace: configuration, the error
//! taxonomy, and the traits outer crates implement. Core defines interfaces,
//! it never talks to the network itself.

pub mod config;
pub mod error;
pub mod traits;

pub use config::{BirdcallConfig, PlatformConfig, SchedulerConfig};
pub use error::{BirdcallError, Result};
pub use traits::{PostClient, PostReceipt};
