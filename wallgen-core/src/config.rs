use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{Result, WallgenError};
use crate::output;
use crate::upscale::ScaleFactor;

pub const DEFAULT_API_URL: &str = "https://api.craiyon.com/draw";
pub const DEFAULT_IMAGE_URL: &str = "https://img.craiyon.com";
pub const DEFAULT_API_VERSION: &str = "35s5hfwn9n78gb06";
pub const MODEL_FILE: &str = "FSRCNN-small_x4.onnx";
pub const DEFAULT_SCALE: u32 = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_PROMPTS: [&str; 7] = [
    "a starwars character in a psychodelic dream, atmospheric, digital art, high definition, realistic, 8k, 85mm, f2.8, star wars",
    "universe, planets, detailed, psychodelic dream, high definition, sharp edges, realistic, 8k, 18mm, f1.4, solar system, milky way",
    "psychodelic dream, digital art, sharp edges, realistic, high definition, 8k, 18mm, f1.4, modern",
    "abstract, sharp edges, detailed, realistic, high definition, 8k, 35mm, f1.4, modern, wall breaking",
    "impressionistic oil painting, by Van Gogh, detailed, high definition, 8k, psychodelic dream, abstract art",
    "cyberpunk, wired, vibrant high contrast, hyperrealistic, photographic, 8k, 85mm, f2.8, octane render, person, spotlight, cyberpunk city, cyberpunk man",
    "hacker, dark, atmospheric, digital art, detailed, high definition, 8k, green bytes floating, zero and ones, hoodie, black",
];

/// Optional overrides read from `settings.json` in the config directory.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: Option<String>,
    pub image_url: Option<String>,
    pub api_version: Option<String>,
    pub model_path: Option<PathBuf>,
    pub scale: Option<u32>,
    pub jpeg_quality: Option<u8>,
    pub request_timeout_secs: Option<u64>,
    pub prompts: Option<Vec<String>>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let config_error = |reason: String| WallgenError::Config(format!("{}: {}", path.display(), reason));
        let content = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| config_error(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    pub history_file: PathBuf,
    pub output_dir: PathBuf,
    pub api_url: String,
    pub image_url: String,
    pub api_version: String,
    pub model_path: PathBuf,
    pub scale: u32,
    pub jpeg_quality: u8,
    pub request_timeout_secs: u64,
    pub prompts: Vec<String>,
}

impl Config {
    pub fn new() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("com", "wallgen", "wallgen").ok_or(WallgenError::HomeDirectoryNotFound)?;
        let config_dir = proj_dirs.config_dir().to_path_buf();
        fs::create_dir_all(&config_dir)?;

        let output_dir = output::resolve_output_dir()?;
        let mut config = Config::with_dirs(config_dir, output_dir);

        if config.settings_file.exists() {
            let settings = Settings::load(&config.settings_file)?;
            config.apply(settings)?;
            log::debug!("Applied settings from {}", config.settings_file.display());
        }

        Ok(config)
    }

    /// Defaults rooted at the given directories, without touching the disk.
    pub fn with_dirs(config_dir: PathBuf, output_dir: PathBuf) -> Self {
        Config {
            settings_file: config_dir.join("settings.json"),
            history_file: config_dir.join("history.conf"),
            config_dir,
            output_dir,
            api_url: DEFAULT_API_URL.to_string(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            model_path: default_model_path(),
            scale: DEFAULT_SCALE,
            jpeg_quality: output::DEFAULT_JPEG_QUALITY,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            prompts: DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn apply(&mut self, settings: Settings) -> Result<()> {
        if let Some(url) = settings.api_url {
            self.api_url = url;
        }
        if let Some(url) = settings.image_url {
            self.image_url = url;
        }
        if let Some(version) = settings.api_version {
            self.api_version = version;
        }
        if let Some(path) = settings.model_path {
            self.model_path = path;
        }
        if let Some(scale) = settings.scale {
            self.scale = ScaleFactor::try_from(scale)?.get();
        }
        if let Some(quality) = settings.jpeg_quality {
            if !(1..=100).contains(&quality) {
                return Err(WallgenError::Config(format!(
                    "jpeg_quality must be within 1..=100, got {}",
                    quality
                )));
            }
            self.jpeg_quality = quality;
        }
        if let Some(secs) = settings.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(prompts) = settings.prompts {
            if prompts.iter().all(|p| p.trim().is_empty()) {
                return Err(WallgenError::Config("prompts must not be empty".to_string()));
            }
            self.prompts = prompts.into_iter().filter(|p| !p.trim().is_empty()).collect();
        }
        Ok(())
    }
}

/// `models/FSRCNN-small_x4.onnx` next to the running executable.
fn default_model_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
        .join("models")
        .join(MODEL_FILE)
}
