//! [`DeviceIdentity`]: a stable per-device identifier for key derivation and MAC keys.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Files checked, in order, when no identifier or path is configured.
pub const DEFAULT_MACHINE_ID_PATHS: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Errors produced while reading the device identifier.
#[derive(Debug, Error)]
pub enum DeviceIdError {
    /// None of the candidate sources exists.
    #[error("no device identifier source found")]
    NotFound,

    /// A source exists but holds only whitespace.
    #[error("device identifier is empty")]
    Empty,

    /// A source exists but could not be read.
    #[error("failed to read device identifier from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Accessor for an identifier that stays the same across restarts of one device.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceIdentity: Send + Sync {
    /// Return the identifier.
    fn device_id(&self) -> Result<String, DeviceIdError>;
}

/// Reads the systemd/D-Bus machine id, or returns a configured override.
#[derive(Debug, Clone)]
pub struct MachineId {
    fixed: Option<String>,
    paths: Vec<PathBuf>,
}

impl MachineId {
    /// Build from configuration.
    ///
    /// `fixed` wins when set. Otherwise `path` is read if set, else
    /// [`DEFAULT_MACHINE_ID_PATHS`] are tried in order.
    pub fn new(fixed: Option<String>, path: Option<String>) -> Self {
        let paths = match path {
            Some(p) => vec![PathBuf::from(p)],
            None => DEFAULT_MACHINE_ID_PATHS.iter().map(PathBuf::from).collect(),
        };
        Self { fixed, paths }
    }

    fn read(path: &Path) -> Result<Option<String>, DeviceIdError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents.trim().to_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DeviceIdError::Io {
                path: path.to_owned(),
                source,
            }),
        }
    }
}

impl DeviceIdentity for MachineId {
    fn device_id(&self) -> Result<String, DeviceIdError> {
        if let Some(fixed) = &self.fixed {
            let trimmed = fixed.trim();
            if trimmed.is_empty() {
                return Err(DeviceIdError::Empty);
            }
            return Ok(trimmed.to_owned());
        }

        let mut saw_empty = false;
        for path in &self.paths {
            match Self::read(path)? {
                Some(id) if !id.is_empty() => return Ok(id),
                Some(_) => saw_empty = true,
                None => {}
            }
        }

        if saw_empty {
            Err(DeviceIdError::Empty)
        } else {
            Err(DeviceIdError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "budgetwise-device-{}-{name}",
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn fixed_value_wins() {
        let id = MachineId::new(Some("  phone-7  ".into()), Some("/nonexistent".into()));
        assert_eq!(id.device_id().unwrap(), "phone-7");
    }

    #[test]
    fn blank_fixed_value_is_empty() {
        let id = MachineId::new(Some("   ".into()), None);
        assert!(matches!(id.device_id(), Err(DeviceIdError::Empty)));
    }

    #[test]
    fn reads_and_trims_file() {
        let path = scratch_file("trim", "4c4c4544004e\n");
        let id = MachineId::new(None, Some(path.to_string_lossy().into_owned()));
        assert_eq!(id.device_id().unwrap(), "4c4c4544004e");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn empty_file_is_reported() {
        let path = scratch_file("empty", "\n");
        let id = MachineId::new(None, Some(path.to_string_lossy().into_owned()));
        assert!(matches!(id.device_id(), Err(DeviceIdError::Empty)));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_is_not_found() {
        let id = MachineId::new(None, Some("/nonexistent/budgetwise/machine-id".into()));
        assert!(matches!(id.device_id(), Err(DeviceIdError::NotFound)));
    }
}
