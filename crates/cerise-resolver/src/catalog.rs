use std::path::{Path, PathBuf};

/// Answers whether an invocation target exists.
pub trait TargetCatalog: Send + Sync {
  fn contains(&self, target: &str) -> bool;
}

/// Accepts every target. Existence is left to the invoker.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyTarget;

impl TargetCatalog for AnyTarget {
  fn contains(&self, _target: &str) -> bool {
    true
  }
}

/// Filesystem-backed catalog of command targets.
///
/// Relative targets resolve under `root`:
/// ```text
/// {root}/
/// ├── step1
/// └── reports/
///     └── build-report
/// ```
/// Absolute targets are checked as-is.
#[derive(Debug, Clone)]
pub struct FsTargetCatalog {
  root: PathBuf,
}

impl FsTargetCatalog {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// The path a target refers to.
  pub fn path_of(&self, target: &str) -> PathBuf {
    let path = Path::new(target);
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.root.join(path)
    }
  }
}

impl TargetCatalog for FsTargetCatalog {
  fn contains(&self, target: &str) -> bool {
    self.path_of(target).is_file()
  }
}
