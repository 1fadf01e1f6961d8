use std::path::Path;
#[cfg(target_os = "linux")]
use std::process::Command;

use crate::error::{Result, WallgenError};

/// Installs an image file as the desktop background.
pub trait WallpaperSetter {
    /// Fails with `UnsupportedPlatform` when `set_wallpaper` can never succeed.
    fn check_supported(&self) -> Result<()> {
        Ok(())
    }

    fn set_wallpaper(&self, path: &Path) -> Result<()>;
}

/// The OS-level wallpaper call, one variant per supported platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Unsupported(String),
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Unsupported(std::env::consts::OS.to_string())
        }
    }
}

impl WallpaperSetter for Platform {
    fn check_supported(&self) -> Result<()> {
        match self {
            Platform::Unsupported(os) => Err(WallgenError::UnsupportedPlatform(os.clone())),
            _ => Ok(()),
        }
    }

    fn set_wallpaper(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(WallgenError::WallpaperSet(format!(
                "{} does not exist",
                path.display()
            )));
        }

        match self {
            Platform::Unsupported(os) => Err(WallgenError::UnsupportedPlatform(os.clone())),
            Platform::Windows | Platform::MacOs => set_native(path),
            Platform::Linux => set_native(path).or_else(|e| {
                log::warn!("{}, trying desktop specific tools", e);
                set_wallpaper_linux_fallback(path)
            }),
        }
    }
}

#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
fn set_native(path: &Path) -> Result<()> {
    let file_loc = path.to_string_lossy();
    wallpaper::set_from_path(&file_loc).map_err(|e| WallgenError::WallpaperSet(e.to_string()))?;
    log::info!("Wallpaper set to {}", file_loc);
    Ok(())
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
fn set_native(_path: &Path) -> Result<()> {
    Err(WallgenError::UnsupportedPlatform(std::env::consts::OS.to_string()))
}

/// Desktops the fallback knows how to drive, keyed by `DESKTOP_SESSION`.
#[cfg(target_os = "linux")]
const KNOWN_SESSIONS: [&str; 14] = [
    "gnome", "unity", "cinnamon", "mate", "xfce4", "lxde", "fluxbox", "blackbox", "openbox",
    "icewm", "jwm", "afterstep", "trinity", "kde",
];

/// Session name prefixes used by distribution flavours, checked in order.
#[cfg(target_os = "linux")]
const SESSION_FLAVOURS: [(&str, &str); 5] = [
    ("xubuntu", "xfce4"),
    ("kubuntu", "kde"),
    ("ubuntustudio", "kde"),
    ("lubuntu", "lxde"),
    ("ubuntu", "gnome"),
];

#[cfg(target_os = "linux")]
fn detect_desktop<F>(var: F) -> &'static str
where
    F: Fn(&str) -> Option<String>,
{
    let from_session = var("DESKTOP_SESSION").and_then(|session| {
        let session = session.to_lowercase();
        if let Some(known) = KNOWN_SESSIONS.iter().find(|known| **known == session) {
            return Some(*known);
        }
        if session.contains("xfce") {
            return Some("xfce4");
        }
        SESSION_FLAVOURS
            .iter()
            .find(|(prefix, _)| session.starts_with(prefix))
            .map(|(_, desktop)| *desktop)
    });

    from_session.unwrap_or_else(|| {
        if var("KDE_FULL_SESSION").as_deref() == Some("true") {
            "kde"
        } else if var("GNOME_DESKTOP_SESSION_ID").is_some() {
            "gnome"
        } else {
            "unknown"
        }
    })
}

#[cfg(target_os = "linux")]
fn run(program: &str, args: &[&str]) -> Result<bool> {
    let output = Command::new(program).args(args).output()?;
    Ok(output.status.success())
}

#[cfg(target_os = "linux")]
fn set_wallpaper_linux_fallback(path: &Path) -> Result<()> {
    let file_loc = path.to_string_lossy().into_owned();
    let file = file_loc.as_str();
    let desktop_env = detect_desktop(|name| std::env::var(name).ok());

    let applied = match desktop_env {
        "gnome" | "unity" | "cinnamon" => {
            let uri = format!("file://{}", file);
            let applied = run("gsettings", &["set", "org.gnome.desktop.background", "picture-uri", uri.as_str()])?;
            // only present on newer GNOME releases
            let _ = run("gsettings", &["set", "org.gnome.desktop.background", "picture-uri-dark", uri.as_str()]);
            applied
        }
        "mate" => run("gsettings", &["set", "org.mate.background", "picture-filename", file])?,
        "xfce4" => {
            let listing = Command::new("xfconf-query").args(["-c", "xfce4-desktop", "-l"]).output()?;
            if listing.status.success() {
                let paths = String::from_utf8_lossy(&listing.stdout);
                for monitor_path in paths.lines().map(str::trim).filter(|l| l.contains("workspace0/last-image")) {
                    run("xfconf-query", &["-c", "xfce4-desktop", "-p", monitor_path, "-s", file])?;
                }
            }
            run("xfconf-query", &["-c", "xfce4-desktop", "-p", "/backdrop/screen0/monitor0/image-path", "-s", file])?;
            run("xfdesktop", &["--reload"])?
        }
        "lxde" => run("pcmanfm", &["--set-wallpaper", file, "--wallpaper-mode=scaled"])?,
        "fluxbox" | "jwm" | "openbox" | "afterstep" => run("fbsetbg", &[file])?,
        "icewm" => run("icewmbg", &[file])?,
        "blackbox" => run("bsetbg", &["-full", file])?,
        _ => {
            return Err(WallgenError::WallpaperSet(format!(
                "desktop environment '{}' not supported",
                desktop_env
            )))
        }
    };

    if applied {
        log::info!("Wallpaper set via {} tools", desktop_env);
        Ok(())
    } else {
        Err(WallgenError::WallpaperSet(format!(
            "{} tools reported failure",
            desktop_env
        )))
    }
}

#[cfg(not(target_os = "linux"))]
fn set_wallpaper_linux_fallback(path: &Path) -> Result<()> {
    Err(WallgenError::WallpaperSet(format!("cannot set {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_platform_fails_explicitly() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("wallpaper_1.jpg");
        std::fs::write(&file, b"jpeg").unwrap();

        let platform = Platform::Unsupported("plan9".to_string());
        assert!(platform.check_supported().is_err());
        let err = platform.set_wallpaper(&file).unwrap_err();
        assert!(matches!(err, WallgenError::UnsupportedPlatform(os) if os == "plan9"));
    }

    #[test]
    fn missing_file_is_rejected_before_os_call() {
        let err = Platform::current()
            .set_wallpaper(Path::new("/definitely/not/here.jpg"))
            .unwrap_err();
        assert!(matches!(err, WallgenError::WallpaperSet(_)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn detects_desktop_from_session_variables() {
        use std::collections::HashMap;

        let detect = |pairs: &[(&str, &str)]| {
            let env: HashMap<String, String> =
                pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
            detect_desktop(|name| env.get(name).cloned())
        };

        assert_eq!(detect(&[("DESKTOP_SESSION", "Cinnamon")]), "cinnamon");
        assert_eq!(detect(&[("DESKTOP_SESSION", "xubuntu")]), "xfce4");
        assert_eq!(detect(&[("DESKTOP_SESSION", "xfce-wayland")]), "xfce4");
        assert_eq!(detect(&[("DESKTOP_SESSION", "ubuntu-wayland")]), "gnome");
        assert_eq!(detect(&[("DESKTOP_SESSION", "kubuntu")]), "kde");
        assert_eq!(detect(&[("DESKTOP_SESSION", "lubuntu")]), "lxde");
        assert_eq!(detect(&[("DESKTOP_SESSION", "sway"), ("KDE_FULL_SESSION", "true")]), "kde");
        assert_eq!(detect(&[("GNOME_DESKTOP_SESSION_ID", "this-is-deprecated")]), "gnome");
        assert_eq!(detect(&[]), "unknown");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn current_platform_is_linux_here() {
        assert_eq!(Platform::current(), Platform::Linux);
        assert!(Platform::current().check_supported().is_ok());
    }
}
