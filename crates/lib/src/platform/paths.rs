use crate::consts::{APP_NAME, ENV_DATA_DIR};
use std::path::PathBuf;

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the directory for data files for the application
///
/// `PKGSNAP_DATA_DIR` wins over the platform default.
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
    return PathBuf::from(dir);
  }
  let appdata = std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"));
  appdata.join(APP_NAME)
}

/// Returns the directory for data files for the application
///
/// `PKGSNAP_DATA_DIR` wins over the platform default.
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
    return PathBuf::from(dir);
  }
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

#[cfg(test)]
#[cfg(not(windows))]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn explicit_data_dir_takes_precedence() {
    temp_env::with_vars(
      [
        (ENV_DATA_DIR, Some("/srv/pkgsnap")),
        ("XDG_DATA_HOME", Some("/custom/data")),
      ],
      || {
        assert_eq!(data_dir(), PathBuf::from("/srv/pkgsnap"));
      },
    );
  }

  #[test]
  #[serial]
  fn xdg_data_home_used_without_override() {
    temp_env::with_vars(
      [
        (ENV_DATA_DIR, None::<&str>),
        ("XDG_DATA_HOME", Some("/custom/data")),
      ],
      || {
        assert_eq!(data_dir(), PathBuf::from("/custom/data").join(APP_NAME));
      },
    );
  }

  #[test]
  #[serial]
  fn xdg_fallback_to_home_directories() {
    temp_env::with_vars(
      [
        (ENV_DATA_DIR, None::<&str>),
        ("XDG_DATA_HOME", None::<&str>),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(data_dir(), PathBuf::from("/home/user/.local/share").join(APP_NAME));
      },
    );
  }
}
