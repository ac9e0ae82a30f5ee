use std::fs;
use std::path::Path;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_SPEED_FACTOR: f64 = 1.0;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Real-time multiplier used to forecast encode time.
    pub speed_factor: f64,
    /// Name of the output root, created inside the scan root.
    pub output_dir_name: String,
    pub output_suffix: String,
    pub container_extension: String,
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
    pub audio_codec: String,
    pub extensions: Vec<String>,
    pub verify_creation_time: bool,
    pub ffmpeg: String,
    pub ffprobe: String,
    pub exiftool: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            speed_factor: DEFAULT_SPEED_FACTOR,
            output_dir_name: String::from("transcoded"),
            output_suffix: String::from(".hevc"),
            container_extension: String::from("mp4"),
            video_codec: String::from("libx265"),
            crf: 25,
            preset: String::from("slower"),
            audio_codec: String::from("aac"),
            extensions: ["mp4", "mkv", "mov", "m4v", "avi", "wmv", "mts", "m2ts", "webm", "mpg", "mpeg"]
                .iter()
                .map(|e| String::from(*e))
                .collect(),
            verify_creation_time: true,
            ffmpeg: String::from("ffmpeg"),
            ffprobe: String::from("ffprobe"),
            exiftool: String::from("exiftool"),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_json(path, &text)
    }

    fn from_json(path: &Path, text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<Config>(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then the optional file, then the command line speed.
    pub fn load(file: Option<&Path>, speed_factor: Option<f64>) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(speed) = speed_factor {
            config.speed_factor = speed;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed_factor.is_finite() {
            return Err(ConfigError::Invalid(format!("speed factor {} is not a number", self.speed_factor)));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid(String::from("no media extensions configured")));
        }
        if self.output_dir_name.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from("output directory name is empty")));
        }
        if self.crf > 51 {
            return Err(ConfigError::Invalid(format!("crf {} is out of range (0-51)", self.crf)));
        }
        Ok(())
    }
}
