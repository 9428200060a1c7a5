use std::path::PathBuf;

use crate::error::TransportError;

/// Env var override for the base directory that normally resolves to
/// `<home>/.csd-devtrack`. Not part of the original wire-level
/// interface; an ambient config knob carried the way the teacher
/// resolves `OJ_STATE_DIR`.
const STATE_DIR_ENV: &str = "CSD_DEVTRACK_STATE_DIR";

/// Identifies one daemon instance: a name, and the derived socket and
/// PID-file paths (§3). The empty name is the default instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub base_dir: PathBuf,
    pub socket_path: PathBuf,
    pub pid_path: PathBuf,
}

impl Endpoint {
    pub fn new(name: impl Into<String>) -> Result<Self, TransportError> {
        let name = name.into();
        validate_instance_name(&name)?;
        let base_dir = base_dir()?;
        Ok(Self::from_base_dir(name, base_dir))
    }

    pub fn from_base_dir(name: impl Into<String>, base_dir: PathBuf) -> Self {
        let name = name.into();
        let prefix = if name.is_empty() { String::new() } else { format!("{name}.") };
        Self {
            socket_path: base_dir.join(format!("{prefix}socket")),
            pid_path: base_dir.join(format!("{prefix}daemon.pid")),
            base_dir,
            name,
        }
    }

    /// Displayed name: `(default)` for the empty instance (§4.3 listing).
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "(default)"
        } else {
            &self.name
        }
    }

    /// Sibling file carrying `host:port` text on platforms without Unix
    /// domain sockets (§4.1, §6.1).
    pub fn addr_path(&self) -> PathBuf {
        let mut os_string = self.socket_path.clone().into_os_string();
        os_string.push(".addr");
        PathBuf::from(os_string)
    }
}

/// Resolve `<home>/.csd-devtrack`, or `$CSD_DEVTRACK_STATE_DIR` if set.
pub fn base_dir() -> Result<PathBuf, TransportError> {
    if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or(TransportError::NoHomeDir)?;
    Ok(home.join(".csd-devtrack"))
}

fn validate_instance_name(name: &str) -> Result<(), TransportError> {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Ok(())
    } else {
        Err(TransportError::InvalidInstanceName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_instance_uses_bare_names() {
        let ep = Endpoint::from_base_dir("", PathBuf::from("/home/u/.csd-devtrack"));
        assert_eq!(ep.socket_path, PathBuf::from("/home/u/.csd-devtrack/socket"));
        assert_eq!(ep.pid_path, PathBuf::from("/home/u/.csd-devtrack/daemon.pid"));
        assert_eq!(ep.display_name(), "(default)");
    }

    #[test]
    fn named_instance_prefixes_paths() {
        let ep = Endpoint::from_base_dir("work", PathBuf::from("/home/u/.csd-devtrack"));
        assert_eq!(ep.socket_path, PathBuf::from("/home/u/.csd-devtrack/work.socket"));
        assert_eq!(ep.pid_path, PathBuf::from("/home/u/.csd-devtrack/work.daemon.pid"));
        assert_eq!(ep.display_name(), "work");
    }

    #[test]
    fn addr_path_appends_suffix() {
        let ep = Endpoint::from_base_dir("", PathBuf::from("/home/u/.csd-devtrack"));
        assert_eq!(ep.addr_path(), PathBuf::from("/home/u/.csd-devtrack/socket.addr"));
    }

    #[test]
    fn rejects_invalid_instance_names() {
        assert!(validate_instance_name("ok_name-1").is_ok());
        assert!(validate_instance_name("bad/name").is_err());
        assert!(validate_instance_name("bad name").is_err());
        assert!(validate_instance_name("").is_ok());
    }
}
