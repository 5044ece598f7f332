//! # Strata Core
//!
//! GPU-agnostic data shared by the Strata crates: math aliases, bounding
//! volumes and index buffer formats.

pub mod bounds;
pub mod math;
pub mod mesh;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the core library.
pub fn init() {
    log::info!("Strata Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
