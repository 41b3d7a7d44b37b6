use std::fs;
use std::io;
use std::path::Path;

use crate::models::config::BufferSettings;
use crate::models::error::SettingsError;
use crate::storage::file_sink::write_atomically;

/// Load settings from `path`, falling back to defaults if the file does not exist.
pub fn load_settings(path: &Path) -> Result<BufferSettings, SettingsError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(BufferSettings::default());
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let settings: BufferSettings = serde_json::from_str(&contents)?;
    settings.validate()?;
    Ok(settings)
}

/// Validate and persist settings as pretty JSON, replacing `path` atomically.
pub fn save_settings(path: &Path, settings: &BufferSettings) -> Result<(), SettingsError> {
    settings.validate()?;

    let io_err = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let contents = serde_json::to_string_pretty(settings)?;
    write_atomically(contents.as_bytes(), path).map_err(io_err)?;

    log::debug!("saved settings to {}", path.display());
    Ok(())
}
