pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod history;
pub mod output;
pub mod pipeline;
pub mod reframe;
pub mod upscale;
pub mod wallpaper;

pub use client::{CraiyonClient, ImageService};
pub use codec::{decode, encode, EncodedImage};
pub use config::{Config, Settings};
pub use error::{Result, WallgenError};
pub use image::RgbImage as RasterImage;
pub use output::{allocate_next, prune, save};
pub use pipeline::{Pipeline, PipelineOptions};
pub use reframe::reframe_to_6_4;
pub use upscale::{FsrcnnUpsampler, ScaleFactor, Upsampler};
pub use wallpaper::{Platform, WallpaperSetter};
