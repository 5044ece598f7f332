//! Command line arguments shared by the demos.
//!
//! Uses clap for parsing, with help text (`--help`) and validation.

use clap::Parser;
use strata_graphics::{BackendType, FramesInFlight, GraphicsError, InstanceParameters};

/// Graphics backend selection for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliBackend {
    /// Use wgpu when an adapter is available, otherwise the dummy device.
    #[default]
    Auto,
    /// In-memory software device.
    Dummy,
    /// wgpu; fails without an adapter.
    Wgpu,
}

impl From<CliBackend> for BackendType {
    fn from(backend: CliBackend) -> Self {
        match backend {
            CliBackend::Auto => BackendType::Auto,
            CliBackend::Dummy => BackendType::Dummy,
            CliBackend::Wgpu => BackendType::Wgpu,
        }
    }
}

/// Frame loop demo arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "frame_loop_demo",
    about = "Upload geometry and run a paced frame loop over mirrored constants",
    version
)]
pub struct DemoArgs {
    /// Graphics backend to use.
    #[arg(long, default_value = "auto", value_enum)]
    pub backend: CliBackend,

    /// Frames the CPU may run ahead of the GPU.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=16))]
    pub frames_in_flight: u32,

    /// Number of frames to run before exiting.
    #[arg(long, default_value_t = 240)]
    pub frames: u64,

    /// Edit a material every N frames (0 disables edits).
    #[arg(long, default_value_t = 60)]
    pub edit_interval: u64,

    /// Dummy backend only: run submissions when fences are polled.
    #[arg(long)]
    pub deferred: bool,

    /// Log filter, in `env_logger` syntax.
    #[arg(long, default_value = "info")]
    pub log: String,
}

impl DemoArgs {
    /// Instance parameters selected by these arguments.
    pub fn instance_parameters(&self) -> InstanceParameters {
        InstanceParameters::new()
            .with_backend(self.backend.into())
            .with_deferred_completion(self.deferred)
    }

    /// The validated frames-in-flight count.
    pub fn frames_in_flight(&self) -> Result<FramesInFlight, GraphicsError> {
        FramesInFlight::new(self.frames_in_flight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let args = DemoArgs::parse_from(["frame_loop_demo"]);
        assert_eq!(args.backend, CliBackend::Auto);
        assert_eq!(args.frames_in_flight().unwrap().get(), 3);
        assert_eq!(args.frames, 240);
        assert!(!args.instance_parameters().deferred_completion);
    }

    #[rstest]
    #[case("dummy", BackendType::Dummy)]
    #[case("wgpu", BackendType::Wgpu)]
    #[case("auto", BackendType::Auto)]
    fn test_backend_flag(#[case] flag: &str, #[case] expected: BackendType) {
        let args = DemoArgs::parse_from(["frame_loop_demo", "--backend", flag]);
        assert_eq!(args.instance_parameters().backend, expected);
    }

    #[test]
    fn test_zero_frames_in_flight_rejected() {
        assert!(DemoArgs::try_parse_from(["frame_loop_demo", "--frames-in-flight", "0"]).is_err());
    }
}
