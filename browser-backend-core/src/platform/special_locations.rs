use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::BackendError;

/// Well-known locations in the (virtual) file system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialLocation {
    UserHome,
    UserDocuments,
    UserMusic,
    UserMovies,
    UserPictures,
    UserDesktop,
    UserApplicationData,
    CommonDocuments,
    CommonApplicationData,
    GlobalApplications,
    Temp,
    InvokedExecutable,
}

impl SpecialLocation {
    /// Directories created on start-up if missing.
    pub const USER_DIRECTORIES: [SpecialLocation; 6] = [
        Self::UserDocuments,
        Self::UserMusic,
        Self::UserMovies,
        Self::UserPictures,
        Self::UserDesktop,
        Self::UserApplicationData,
    ];

    /// `user-dirs.dirs` key and home-relative fallback.
    fn xdg_entry(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::UserDocuments => Some(("XDG_DOCUMENTS_DIR", "Documents")),
            Self::UserMusic => Some(("XDG_MUSIC_DIR", "Music")),
            Self::UserMovies => Some(("XDG_VIDEOS_DIR", "Videos")),
            Self::UserPictures => Some(("XDG_PICTURES_DIR", "Pictures")),
            Self::UserDesktop => Some(("XDG_DESKTOP_DIR", "Desktop")),
            Self::UserApplicationData => Some(("XDG_CONFIG_HOME", ".config")),
            _ => None,
        }
    }
}

/// Resolves `SpecialLocation`s against a home directory, temp override and
/// argv[0].
#[derive(Debug, Clone, Default)]
pub struct SpecialLocations {
    home: Option<PathBuf>,
    temp: Option<PathBuf>,
    invoked_executable: Option<PathBuf>,
}

impl SpecialLocations {
    pub fn new(home: Option<PathBuf>, temp: Option<PathBuf>, invoked_executable: Option<PathBuf>) -> Self {
        Self {
            home,
            temp,
            invoked_executable,
        }
    }

    /// Read `HOME`, `TMPDIR` and argv[0] from the process environment.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("HOME").map(PathBuf::from),
            std::env::var_os("TMPDIR").map(PathBuf::from),
            std::env::args_os().next().map(PathBuf::from),
        )
    }

    pub fn resolve(&self, location: SpecialLocation) -> Option<PathBuf> {
        if let Some((key, fallback)) = location.xdg_entry() {
            let home = self.home.as_deref()?;
            return Some(resolve_xdg_folder(home, key).unwrap_or_else(|| home.join(fallback)));
        }

        match location {
            SpecialLocation::UserHome => self.home.clone(),
            SpecialLocation::CommonDocuments | SpecialLocation::CommonApplicationData => Some(PathBuf::from("/opt")),
            SpecialLocation::GlobalApplications => Some(PathBuf::from("/usr")),
            SpecialLocation::Temp => Some(self.temp.clone().unwrap_or_else(|| PathBuf::from("/tmp"))),
            SpecialLocation::InvokedExecutable => self.invoked_executable.clone(),
            _ => None,
        }
    }

    /// Create every user directory that does not exist yet; returns the ones
    /// created.
    pub fn ensure_user_directories(&self) -> Result<Vec<PathBuf>, BackendError> {
        let mut created = Vec::new();
        for location in SpecialLocation::USER_DIRECTORIES {
            let Some(dir) = self.resolve(location) else {
                continue;
            };
            if dir.is_dir() {
                continue;
            }
            fs::create_dir_all(&dir)
                .map_err(|e| BackendError::Storage(format!("failed to create {}: {}", dir.display(), e)))?;
            log::debug!("Created {:?} at {}", location, dir.display());
            created.push(dir);
        }
        Ok(created)
    }
}

/// Look `key` up in `~/.config/user-dirs.dirs`, e.g. `XDG_MUSIC_DIR="$HOME/Music"`.
/// Only entries naming an existing directory count.
fn resolve_xdg_folder(home: &Path, key: &str) -> Option<PathBuf> {
    let contents = fs::read_to_string(home.join(".config").join("user-dirs.dirs")).ok()?;
    let home_str = home.to_string_lossy();

    contents
        .lines()
        .map(str::trim_start)
        .filter(|line| line.starts_with(key))
        .filter_map(|line| {
            let line = line.replace("$HOME", &home_str);
            let (_, value) = line.split_once('=')?;
            Some(PathBuf::from(unquote(value.trim())))
        })
        .find(|path| path.is_dir())
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_home(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("special-locations-{}-{}", name, uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn fixed_locations() {
        let locations = SpecialLocations::new(None, None, Some(PathBuf::from("/app/main.wasm")));
        assert_eq!(locations.resolve(SpecialLocation::CommonDocuments), Some(PathBuf::from("/opt")));
        assert_eq!(locations.resolve(SpecialLocation::GlobalApplications), Some(PathBuf::from("/usr")));
        assert_eq!(locations.resolve(SpecialLocation::Temp), Some(PathBuf::from("/tmp")));
        assert_eq!(
            locations.resolve(SpecialLocation::InvokedExecutable),
            Some(PathBuf::from("/app/main.wasm"))
        );
        assert_eq!(locations.resolve(SpecialLocation::UserHome), None);
        assert_eq!(locations.resolve(SpecialLocation::UserMusic), None);
    }

    #[test]
    fn user_directories_fall_back_under_home() {
        let home = scratch_home("fallback");
        let locations = SpecialLocations::new(Some(home.clone()), Some(PathBuf::from("/var/tmp")), None);

        assert_eq!(locations.resolve(SpecialLocation::UserDocuments), Some(home.join("Documents")));
        assert_eq!(locations.resolve(SpecialLocation::UserMovies), Some(home.join("Videos")));
        assert_eq!(locations.resolve(SpecialLocation::UserApplicationData), Some(home.join(".config")));
        assert_eq!(locations.resolve(SpecialLocation::Temp), Some(PathBuf::from("/var/tmp")));

        fs::remove_dir_all(home).unwrap();
    }

    #[test]
    fn xdg_entries_override_fallbacks() {
        let home = scratch_home("xdg");
        fs::create_dir_all(home.join(".config")).unwrap();
        fs::create_dir_all(home.join("Tunes")).unwrap();
        fs::write(
            home.join(".config").join("user-dirs.dirs"),
            "# written by xdg-user-dirs-update\n  XDG_MUSIC_DIR=\"$HOME/Tunes\"\nXDG_DESKTOP_DIR=\"$HOME/Missing\"\n",
        )
        .unwrap();

        let locations = SpecialLocations::new(Some(home.clone()), None, None);
        assert_eq!(locations.resolve(SpecialLocation::UserMusic), Some(home.join("Tunes")));
        assert_eq!(locations.resolve(SpecialLocation::UserDesktop), Some(home.join("Desktop")));

        fs::remove_dir_all(home).unwrap();
    }

    #[test]
    fn ensure_creates_only_missing_directories() {
        let home = scratch_home("ensure");
        fs::create_dir_all(home.join("Documents")).unwrap();
        let locations = SpecialLocations::new(Some(home.clone()), None, None);

        let created = locations.ensure_user_directories().unwrap();
        assert_eq!(created.len(), SpecialLocation::USER_DIRECTORIES.len() - 1);
        assert!(!created.contains(&home.join("Documents")));
        assert!(home.join("Pictures").is_dir());

        assert!(locations.ensure_user_directories().unwrap().is_empty());
        fs::remove_dir_all(home).unwrap();
    }
}
