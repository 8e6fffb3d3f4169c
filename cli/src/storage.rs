//! JSON-file token storage so a CLI login survives between invocations.
//!
//! The file holds a flat string map, the same shape as browser
//! `localStorage`. Read and write failures are logged and treated as an empty
//! store. On unix the file is kept owner-only (`0600`) since it holds a
//! bearer token.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use meal_planner::session::TokenStorage;

const APP_DIR: &str = "meal-planner";
const TOKEN_FILE_NAME: &str = "session.json";

/// Per-user token file: `$XDG_CONFIG_HOME/meal-planner/session.json`, else
/// `$HOME/.config/meal-planner/session.json`.
pub fn default_token_path() -> Option<PathBuf> {
    token_path_from(std::env::var_os("XDG_CONFIG_HOME"), std::env::var_os("HOME"))
}

pub(crate) fn token_path_from(config_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    let base = config_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home.filter(|dir| !dir.is_empty()).map(|dir| PathBuf::from(dir).join(".config")))?;
    Some(base.join(APP_DIR).join(TOKEN_FILE_NAME))
}

#[derive(Clone, Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> BTreeMap<String, String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "token file unreadable");
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "token file is not a JSON string map");
            BTreeMap::new()
        })
    }

    fn save(&self, items: &BTreeMap<String, String>) {
        if let Err(e) = self.try_save(items) {
            tracing::warn!(path = %self.path.display(), error = %e, "token file write failed");
        }
    }

    fn try_save(&self, items: &BTreeMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(items).map_err(std::io::Error::other)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // `mode` only applies on creation; tighten files left by older runs.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(raw.as_bytes())
    }
}

impl TokenStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }

    fn set_item(&self, key: &str, value: &str) {
        let mut items = self.load();
        items.insert(key.to_owned(), value.to_owned());
        self.save(&items);
    }

    fn remove_item(&self, key: &str) {
        let mut items = self.load();
        if items.remove(key).is_some() {
            self.save(&items);
        }
    }
}
