use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageAction {
  Install,
  Uninstall,
}

impl PackageAction {
  pub fn as_str(self) -> &'static str {
    match self {
      PackageAction::Install => "install",
      PackageAction::Uninstall => "uninstall",
    }
  }
}

/// The smallest unit of mutation: one installer invocation for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicPackageOperation {
  pub action: PackageAction,
  pub name: String,

  /// Pinned version for installs. `None` means latest; ignored for uninstalls.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
}

impl AtomicPackageOperation {
  pub fn install(name: impl Into<String>, version: Option<String>) -> Self {
    Self {
      action: PackageAction::Install,
      name: name.into(),
      version,
    }
  }

  pub fn uninstall(name: impl Into<String>) -> Self {
    Self {
      action: PackageAction::Uninstall,
      name: name.into(),
      version: None,
    }
  }

  /// Installer argument naming the target (`name==version` or `name`).
  pub fn target(&self) -> String {
    match (&self.action, &self.version) {
      (PackageAction::Install, Some(version)) => format!("{}=={}", self.name, version),
      _ => self.name.clone(),
    }
  }

  /// Equivalent shell command, for previews and logs.
  pub fn command_line(&self, python: &str) -> String {
    match self.action {
      PackageAction::Install if self.version.is_some() => format!("{} -m pip install {}", python, self.target()),
      PackageAction::Install => format!("{} -m pip install --upgrade {}", python, self.name),
      PackageAction::Uninstall => format!("{} -m pip uninstall -y {}", python, self.name),
    }
  }
}

impl std::fmt::Display for AtomicPackageOperation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match (self.action, &self.version) {
      (PackageAction::Install, Some(version)) => write!(f, "install {}=={}", self.name, version),
      (PackageAction::Install, None) => write!(f, "install {} (latest)", self.name),
      (PackageAction::Uninstall, _) => write!(f, "uninstall {}", self.name),
    }
  }
}
