use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::voice::Waveform;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Longest automatic sustain a config may ask for.
pub const MAX_SUSTAIN_SECS: f32 = 60.0;

/// How many voices may sound at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceMode {
    /// One voice per held pitch, each stopped on its own.
    Polyphonic,
    /// A single voice; each new attack replaces whatever is sounding.
    Monophonic,
}

/// When a voice ends.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ReleaseMode {
    /// Voices sound until `stop_pitch`.
    Explicit,
    /// Voices release themselves after `sustain_secs`; stops are ignored.
    Auto { sustain_secs: f32 },
}

impl ReleaseMode {
    pub fn sustain(&self) -> Option<Duration> {
        match self {
            ReleaseMode::Explicit => None,
            ReleaseMode::Auto { sustain_secs } => {
                let secs = if sustain_secs.is_finite() {
                    sustain_secs.clamp(0.0, MAX_SUSTAIN_SECS)
                } else {
                    MAX_SUSTAIN_SECS
                };
                Some(Duration::from_secs_f32(secs))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub voice_mode: VoiceMode,
    pub release: ReleaseMode,
    pub waveform: Waveform,
    pub master_gain: f32,
    pub reverb_mix: f32,
    pub analysis_size: usize,
    pub show_amplitude_circle: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            voice_mode: VoiceMode::Polyphonic,
            release: ReleaseMode::Explicit,
            waveform: Waveform::Square,
            master_gain: 0.166,
            reverb_mix: 0.0,
            analysis_size: 2048,
            show_amplitude_circle: true,
        }
    }
}

impl SynthConfig {
    pub fn from_toml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if let ReleaseMode::Auto { sustain_secs } = self.release {
            if !(0.0..=MAX_SUSTAIN_SECS).contains(&sustain_secs) {
                return Err(format!(
                    "release.sustain_secs must be between 0 and {MAX_SUSTAIN_SECS}, got {sustain_secs}"
                ));
            }
        }
        if !self.master_gain.is_finite() {
            return Err(format!("master_gain must be finite, got {}", self.master_gain));
        }
        if !self.reverb_mix.is_finite() {
            return Err(format!("reverb_mix must be finite, got {}", self.reverb_mix));
        }
        if self.analysis_size == 0 {
            return Err("analysis_size must be at least 1".to_string());
        }
        Ok(())
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                log::info!("loading config from {}", path.display());
                Self::from_toml(path, &contents)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// The first CLI argument, else the per-user config file.
pub fn config_path(cli_arg: Option<String>) -> Option<PathBuf> {
    cli_arg
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|d| d.join("scale-keys").join("config.toml")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> Result<SynthConfig, ConfigError> {
        SynthConfig::from_toml(Path::new("test.toml"), contents)
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse("").expect("parse");
        assert_eq!(config, SynthConfig::default());
        assert_eq!(config.master_gain, 0.166);
        assert_eq!(config.waveform, Waveform::Square);
    }

    #[test]
    fn reads_voice_and_release_modes() {
        let config = parse(
            r#"
            voice_mode = "monophonic"
            waveform = "sine"
            reverb_mix = 0.3

            [release]
            mode = "auto"
            sustain_secs = 1.0
            "#,
        )
        .expect("parse");
        assert_eq!(config.voice_mode, VoiceMode::Monophonic);
        assert_eq!(config.waveform, Waveform::Sine);
        assert_eq!(config.release.sustain(), Some(Duration::from_secs(1)));
        assert_eq!(config.analysis_size, 2048);
    }

    #[test]
    fn rejects_unknown_waveform() {
        let err = parse(r#"waveform = "wobble""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn rejects_sustain_that_cannot_be_a_duration() {
        for value in ["inf", "1e30", "nan", "-1.0"] {
            let err = parse(&format!("[release]\nmode = \"auto\"\nsustain_secs = {value}\n"))
                .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{value}: {err}");
        }
    }

    #[test]
    fn sustain_never_panics_on_out_of_range_values() {
        for sustain_secs in [f32::INFINITY, 1e30, f32::NAN, -3.0] {
            let sustain = ReleaseMode::Auto { sustain_secs }.sustain();
            assert!(sustain.is_some_and(|d| d.as_secs_f32() <= MAX_SUSTAIN_SECS));
        }
    }

    #[test]
    fn rejects_non_finite_gain() {
        let err = parse("master_gain = inf").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("scale-keys-does-not-exist.toml");
        let config = SynthConfig::load(&path).expect("load");
        assert_eq!(config, SynthConfig::default());
    }

    #[test]
    fn cli_argument_wins() {
        let path = config_path(Some("custom.toml".into()));
        assert_eq!(path, Some(PathBuf::from("custom.toml")));
    }
}
