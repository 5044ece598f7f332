//! # Strata Demos
//!
//! Command-line demos exercising the Strata GPU resource substrate.
//!
//! ## Available Demos
//!
//! - `frame_loop_demo` - shared geometry upload plus a paced frame loop over
//!   mirrored material, object and pass constants

pub mod args;
pub mod shapes;

pub use args::{CliBackend, DemoArgs};

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
