//! Path expansion and resolution

use std::path::{Component, Path, PathBuf};
use tracing::warn;

use crate::traits::FileProbe;

/// Home directory of the current user, if the platform reports one
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Replace a leading `~` component with `home`.
///
/// `~user` forms are left untouched.
pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    let mut components = path.components();
    match (components.next(), home) {
        (Some(Component::Normal(first)), Some(home)) if first == "~" => {
            let rest = components.as_path();
            if rest.as_os_str().is_empty() {
                home.to_path_buf()
            } else {
                home.join(rest)
            }
        }
        _ => path.to_path_buf(),
    }
}

/// Expand `~` and make `path` absolute against the working directory
pub fn absolutize(path: &Path, home: Option<&Path>) -> PathBuf {
    let expanded = expand_home(path, home);
    if expanded.is_absolute() {
        return expanded;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(expanded),
        Err(_) => expanded,
    }
}

/// Resolve `path` to an existing file.
///
/// On success the path is canonical (symlinks expanded); otherwise the
/// absolute but unresolved path is returned as the error so callers can
/// report what was looked up.
pub fn resolve_file(
    path: &Path,
    home: Option<&Path>,
    probe: &dyn FileProbe,
) -> Result<PathBuf, PathBuf> {
    let absolute = absolutize(path, home);
    if !probe.is_file(&absolute) {
        return Err(absolute);
    }
    match probe.canonicalize(&absolute) {
        Ok(canonical) => Ok(canonical),
        Err(e) => {
            warn!(
                path = %absolute.display(),
                error = %e,
                "Could not expand symlinks, using the absolute path"
            );
            Ok(absolute)
        }
    }
}
