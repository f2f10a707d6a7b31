//! Command line configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Which screen is shown after start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StartScreen {
    #[default]
    Welcome,
    CascadedShadows,
    PointShadows,
}

impl StartScreen {
    /// Index of the demo tile to open, `None` for the grid.
    pub fn demo_index(self) -> Option<usize> {
        match self {
            StartScreen::Welcome => None,
            StartScreen::CascadedShadows => Some(0),
            StartScreen::PointShadows => Some(1),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "render-dojo",
    about = "Real-time shadow rendering demos on wgpu"
)]
pub struct DojoConfig {
    /// Initial window width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Screen shown after start-up
    #[arg(long, value_enum, default_value_t = StartScreen::Welcome)]
    pub start: StartScreen,

    /// Extra models (glTF, GLB or OBJ) placed in the cascaded shadows scene.
    /// Relative paths resolve against the assets directory.
    #[arg(long = "model")]
    pub models: Vec<String>,

    /// Edge length of each cascade layer
    #[arg(long, default_value_t = 1024)]
    pub shadow_resolution: u32,

    /// Edge length of each point light cube face
    #[arg(long, default_value_t = 512)]
    pub cube_shadow_resolution: u32,

    /// Present with vertical sync
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub vsync: bool,

    /// Where screenshots taken with `C` are written
    #[arg(long, default_value = "captures")]
    pub capture_dir: PathBuf,
}

impl Default for DojoConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            start: StartScreen::Welcome,
            models: Vec::new(),
            shadow_resolution: 1024,
            cube_shadow_resolution: 512,
            vsync: true,
            capture_dir: PathBuf::from("captures"),
        }
    }
}

impl DojoConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.width > 0 && self.height > 0,
            "window size must be non-zero, got {}x{}",
            self.width,
            self.height
        );
        anyhow::ensure!(
            self.shadow_resolution.is_power_of_two() && self.shadow_resolution <= 8192,
            "shadow resolution must be a power of two up to 8192, got {}",
            self.shadow_resolution
        );
        anyhow::ensure!(
            self.cube_shadow_resolution.is_power_of_two() && self.cube_shadow_resolution <= 4096,
            "cube shadow resolution must be a power of two up to 4096, got {}",
            self.cube_shadow_resolution
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_defaults_match_default_impl() {
        let parsed = DojoConfig::parse_from(["render-dojo"]);
        let default = DojoConfig::default();
        assert_eq!(parsed.width, default.width);
        assert_eq!(parsed.height, default.height);
        assert_eq!(parsed.start, default.start);
        assert_eq!(parsed.shadow_resolution, default.shadow_resolution);
        assert_eq!(parsed.cube_shadow_resolution, default.cube_shadow_resolution);
        assert_eq!(parsed.vsync, default.vsync);
        assert_eq!(parsed.capture_dir, default.capture_dir);
        assert!(parsed.models.is_empty());
    }

    #[test]
    fn parses_repeated_models_and_start_screen() {
        let parsed = DojoConfig::parse_from([
            "render-dojo",
            "--start",
            "point-shadows",
            "--model",
            "a.glb",
            "--model",
            "b.obj",
            "--vsync",
            "false",
        ]);
        assert_eq!(parsed.start.demo_index(), Some(1));
        assert_eq!(parsed.models, vec!["a.glb".to_string(), "b.obj".to_string()]);
        assert!(!parsed.vsync);
    }

    #[test]
    fn rejects_odd_shadow_resolution() {
        let config = DojoConfig {
            shadow_resolution: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(DojoConfig::default().validate().is_ok());
    }
}
