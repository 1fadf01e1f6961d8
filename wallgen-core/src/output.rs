//! Rotating set of saved wallpapers.
//!
//! Files are named `wallpaper_<N>.jpg`. Before a new one is written every slot
//! below the current maximum is deleted, so the directory holds the previous
//! wallpaper plus the new one and never grows past that.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use regex::Regex;

use crate::error::{Result, WallgenError};

pub const PICTURES_DIR: &str = "Pictures";
pub const OUTPUT_DIR: &str = "wallpaper-generator";
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Environment variables consulted for the home directory, in order.
const HOME_VARS: [&str; 2] = ["USERPROFILE", "HOME"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub index: u64,
    pub path: PathBuf,
}

fn slot_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^wallpaper_(\d+)\.(jpe?g|png)$").expect("slot pattern is valid")
    })
}

pub fn slot_file_name(index: u64) -> String {
    format!("wallpaper_{}.jpg", index)
}

/// Parses the slot index out of a file name, if it is one of ours.
pub fn parse_slot_index(file_name: &str) -> Option<u64> {
    slot_pattern()
        .captures(file_name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Home directory from `USERPROFILE`, falling back to `HOME`.
pub fn resolve_home<F>(lookup: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    HOME_VARS
        .into_iter()
        .filter_map(|var| lookup(var))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .ok_or(WallgenError::HomeDirectoryNotFound)
}

/// `<home>/Pictures/wallpaper-generator`, resolved from the process environment.
pub fn resolve_output_dir() -> Result<PathBuf> {
    let home = resolve_home(|var| std::env::var(var).ok())?;
    Ok(output_dir_in(&home))
}

pub fn output_dir_in(home: &Path) -> PathBuf {
    home.join(PICTURES_DIR).join(OUTPUT_DIR)
}

/// Creates the output directory and its parents if they are missing.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        log::info!("Creating output directory {}", dir.display());
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Lists wallpaper slots in `dir`, ordered by index. Files that do not follow
/// the slot naming scheme are skipped.
pub fn scan(dir: &Path) -> Result<Vec<Slot>> {
    let mut slots: Vec<Slot> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let index = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(parse_slot_index)?;
            Some(Slot { index, path })
        })
        .collect();

    slots.sort_by_key(|slot| slot.index);
    Ok(slots)
}

/// Deletes every slot below the highest index and returns that index
/// (0 when the directory holds no slots).
pub fn prune(dir: &Path) -> Result<u64> {
    let slots = scan(dir)?;
    let max_index = slots.iter().map(|slot| slot.index).max().unwrap_or(0);

    for slot in slots.iter().filter(|slot| slot.index < max_index) {
        log::debug!("Removing old wallpaper {}", slot.path.display());
        fs::remove_file(&slot.path)?;
    }

    Ok(max_index)
}

/// Prunes `dir` and returns the index the next wallpaper should be saved under.
pub fn allocate_next(dir: &Path) -> Result<u64> {
    ensure_dir(dir)?;
    let latest = prune(dir)?;
    latest.checked_add(1).ok_or_else(|| {
        WallgenError::Config(format!(
            "no slot index left after {} in {}",
            slot_file_name(latest),
            dir.display()
        ))
    })
}

/// Writes `image` as JPEG into slot `index` of `dir`.
pub fn save(image: &RgbImage, dir: &Path, index: u64, quality: u8) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(slot_file_name(index));

    let file = File::create(&path)?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
    image.write_with_encoder(encoder)?;

    log::info!("Saved wallpaper to {}", path.display());
    Ok(path)
}
