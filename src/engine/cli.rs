//! Command-line interface for panorama-viewer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::engine::animation_loop::MotionMode;
use crate::engine::config::Config;

/// CLI values override settings loaded from the config file.
#[derive(Parser, Debug)]
#[command(name = "panorama-viewer", about = "360° panorama and mountain scene viewer")]
pub struct CliArgs {
    /// Path to a RON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for decoration placement.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log filter (error, warn, info, debug, trace, or a full EnvFilter string).
    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    /// Scale motion by elapsed time, expressed against this refresh rate.
    #[arg(long, value_name = "HZ")]
    pub timed_motion: Option<f32>,

    /// Run this many frames without a window, then exit.
    #[arg(long, value_name = "FRAMES")]
    pub headless_frames: Option<u64>,

    #[command(subcommand)]
    pub viewer: ViewerKind,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ViewerKind {
    /// 360° panorama with Previous/Next scene switching.
    Panorama {
        /// Initial scene index.
        #[arg(long)]
        scene: Option<usize>,
    },
    /// Static mountain landscape.
    Mountain,
}

impl Config {
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.seed = Some(seed);
        }
        if let Some(ref level) = args.log_level {
            self.log_level = level.clone();
        }
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(hz) = args.timed_motion {
            self.motion = MotionMode::Timed { reference_hz: hz };
        }
        if let ViewerKind::Panorama { scene: Some(i) } = args.viewer {
            self.panorama.start_index = i;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_panorama_with_scene() {
        let args = CliArgs::try_parse_from(["panorama-viewer", "--seed", "3", "panorama", "--scene", "2"])
            .unwrap();
        assert_eq!(args.seed, Some(3));
        assert_eq!(args.viewer, ViewerKind::Panorama { scene: Some(2) });
    }

    #[test]
    fn subcommand_is_required() {
        assert!(CliArgs::try_parse_from(["panorama-viewer"]).is_err());
    }

    #[test]
    fn overrides_only_touch_given_fields() {
        let args = CliArgs::try_parse_from([
            "panorama-viewer",
            "--width",
            "800",
            "--timed-motion",
            "120",
            "panorama",
            "--scene",
            "3",
        ])
        .unwrap();

        let mut config = Config::default();
        config.apply_cli_overrides(&args);

        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.motion, MotionMode::Timed { reference_hz: 120.0 });
        assert_eq!(config.panorama.start_index, 3);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn mountain_leaves_panorama_start_alone() {
        let args = CliArgs::try_parse_from(["panorama-viewer", "mountain"]).unwrap();
        let mut config = Config::default();
        config.apply_cli_overrides(&args);
        assert_eq!(config, Config::default());
    }
}
