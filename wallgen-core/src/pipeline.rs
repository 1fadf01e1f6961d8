//! Prompt to installed wallpaper, one stage after another.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::client::ImageService;
use crate::codec;
use crate::config::Config;
use crate::error::{Result, WallgenError};
use crate::history;
use crate::output;
use crate::reframe::reframe_to_6_4;
use crate::upscale::Upsampler;
use crate::wallpaper::WallpaperSetter;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub scale: u32,
    pub output_dir: PathBuf,
    pub jpeg_quality: u8,
    pub history_file: Option<PathBuf>,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scale: config.scale,
            output_dir: config.output_dir.clone(),
            jpeg_quality: config.jpeg_quality,
            history_file: Some(config.history_file.clone()),
        }
    }
}

/// Borrows its collaborators so the loaded model can be reused across runs.
pub struct Pipeline<'a, S: ?Sized, U: ?Sized, W: ?Sized> {
    service: &'a S,
    upsampler: &'a U,
    setter: &'a W,
    options: PipelineOptions,
}

impl<'a, S, U, W> Pipeline<'a, S, U, W>
where
    S: ImageService + ?Sized,
    U: Upsampler + ?Sized,
    W: WallpaperSetter + ?Sized,
{
    pub fn new(service: &'a S, upsampler: &'a U, setter: &'a W, options: PipelineOptions) -> Self {
        Self {
            service,
            upsampler,
            setter,
            options,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.options.output_dir
    }

    /// Generates, post-processes, saves and installs one wallpaper for `prompt`.
    /// Returns the path of the saved file.
    pub fn run<R: Rng + ?Sized>(&self, prompt: &str, rng: &mut R) -> Result<PathBuf> {
        self.setter.check_supported()?;

        let started = Instant::now();
        log::info!("Generating images for prompt: {}", prompt);
        let batch = self.service.generate(prompt)?;

        log::info!("Decoding {} images", batch.len());
        let frames = codec::decode(batch).collect::<Result<Vec<_>>>()?;
        let frame = frames.choose(rng).ok_or(WallgenError::EmptyBatch)?;

        log::info!("Upscaling {}x{} image by {}", frame.width(), frame.height(), self.options.scale);
        let upscaled = self.upsampler.upscale(frame, self.options.scale)?;

        log::info!("Reframing {}x{} image to 6:4", upscaled.width(), upscaled.height());
        let reframed = reframe_to_6_4(&upscaled);

        let dir = &self.options.output_dir;
        let index = output::allocate_next(dir)?;
        let path = output::save(&reframed, dir, index, self.options.jpeg_quality)?;

        self.setter.set_wallpaper(&path)?;

        if let Some(history_file) = &self.options.history_file {
            if let Err(e) = history::record(history_file, index, prompt) {
                log::warn!("Failed to record history for {}: {}", path.display(), e);
            }
        }
        log::debug!("Pipeline finished in {:.1?}", started.elapsed());
        Ok(path)
    }
}
