use anyhow::{ensure, Context};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::pattern::{self, Pattern, UnknownPattern};
use crate::tempo::DEFAULT_BPM;

pub const DEFAULT_CONFIG_PATH: &str = "tap-arp.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Play on the detector task; input waits until the pattern ends.
    #[default]
    Inline,
    /// Play on a separate task; triggers arriving while busy are dropped.
    Decoupled,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input_port: Option<String>,
    pub output_port: Option<String>,
    pub pattern: String,
    pub custom_pattern: Option<Pattern>,
    pub tempo: u32,
    pub tempo_step: u32,
    pub channel: u8,
    pub velocity: u8,
    pub handoff_capacity: usize,
    pub playback_mode: PlaybackMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_port: None,
            output_port: None,
            pattern: pattern::DEFAULT_PATTERN.to_owned(),
            custom_pattern: None,
            tempo: DEFAULT_BPM,
            tempo_step: 5,
            channel: 0,
            velocity: 80,
            handoff_capacity: 0,
            playback_mode: PlaybackMode::Inline,
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = serde_json::from_str(content).context("invalid JSON config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.channel <= 15, "channel must be 0-15, got {}", self.channel);
        ensure!(
            self.velocity <= 127,
            "velocity must be 0-127, got {}",
            self.velocity
        );
        ensure!(self.tempo_step > 0, "tempo_step must be positive");
        self.pattern()?;
        Ok(())
    }

    /// The pattern to play: `custom_pattern` when given, otherwise the named one.
    pub fn pattern(&self) -> Result<Pattern, UnknownPattern> {
        match &self.custom_pattern {
            Some(custom) => Ok(custom.clone()),
            None => pattern::select(&self.pattern),
        }
    }
}

/// Reads the config at `path`. A missing file means all defaults.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    match fs::read_to_string(path) {
        Ok(content) => {
            Config::parse(&content).with_context(|| format!("in {}", path.display()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("{} not found, using defaults", path.display());
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}
