use std::path::PathBuf;

/// Every way a wallpaper run can fail.
///
/// None of these are retried; they propagate to the caller and end the run.
#[derive(Debug, thiserror::Error)]
pub enum WallgenError {
    #[error("remote service returned {status}: {body}")]
    RemoteService { status: u16, body: String },

    #[error("http request failed: {0}")]
    Http(#[from] attohttpc::Error),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to load super-resolution model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("super-resolution inference failed: {0}")]
    Inference(#[from] ort::Error),

    #[error("unsupported scale factor {0} (supported: 2, 3, 4)")]
    UnsupportedScale(u32),

    #[error("could not find home directory (USERPROFILE and HOME are unset)")]
    HomeDirectoryNotFound,

    #[error("setting the wallpaper is not supported on {0}")]
    UnsupportedPlatform(String),

    #[error("failed to set wallpaper: {0}")]
    WallpaperSet(String),

    #[error("remote service returned no images")]
    EmptyBatch,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WallgenError>;
