use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub(crate) const ROOT_ENV_VAR: &str = "GRABLAB_ROOT";

#[derive(Debug, Clone)]
pub(crate) struct AppPaths {
    pub(crate) root: PathBuf,
    pub(crate) defs_dir: PathBuf,
    pub(crate) scenarios_dir: PathBuf,
}

impl AppPaths {
    pub(crate) fn from_root(root: PathBuf) -> Self {
        let assets = root.join("assets");
        Self {
            defs_dir: assets.join("defs"),
            scenarios_dir: assets.join("scenarios"),
            root,
        }
    }

    /// Bare names resolve inside the scenarios directory.
    pub(crate) fn scenario_path(&self, name: &str) -> PathBuf {
        let candidate = Path::new(name);
        if candidate.components().count() > 1 || candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        self.scenarios_dir.join(candidate)
    }
}

#[derive(Debug, Error)]
pub(crate) enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "GRABLAB_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/grablab\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub(crate) fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    resolve_root().map(AppPaths::from_root)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => root_from_env_value(&value),
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_above(&exe_dir)
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn root_from_env_value(value: &str) -> Result<PathBuf, StartupError> {
    let normalized = normalize_path(Path::new(value));
    if is_repo_marker(&normalized) {
        Ok(normalized)
    } else {
        Err(StartupError::InvalidEnvRoot { path: normalized })
    }
}

fn find_root_above(start_dir: &Path) -> Result<PathBuf, StartupError> {
    start_dir
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
        .ok_or_else(|| StartupError::RootNotFound {
            start_dir: normalize_path(start_dir),
            env_var: ROOT_ENV_VAR,
        })
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_root(dir: &Path) {
        fs::write(dir.join("Cargo.toml"), "[workspace]\n").expect("cargo toml");
        fs::create_dir_all(dir.join("assets")).expect("assets");
    }

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("crates")).expect("crates");
        assert!(!is_repo_marker(temp.path()));
        fs::write(temp.path().join("Cargo.toml"), "").expect("cargo toml");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn walks_up_to_the_nearest_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        make_root(temp.path());
        let nested = temp.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested");

        let root = find_root_above(&nested).expect("root");
        assert_eq!(root, normalize_path(temp.path()));
    }

    #[test]
    fn env_value_must_point_at_a_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let error = root_from_env_value(&temp.path().display().to_string()).expect_err("invalid");
        assert!(matches!(error, StartupError::InvalidEnvRoot { .. }));

        make_root(temp.path());
        let root = root_from_env_value(&temp.path().display().to_string()).expect("valid");
        assert_eq!(root, normalize_path(temp.path()));
    }

    #[test]
    fn scenario_names_resolve_inside_assets() {
        let paths = AppPaths::from_root(PathBuf::from("/grablab"));
        assert_eq!(
            paths.scenario_path("throw_demo.json"),
            PathBuf::from("/grablab/assets/scenarios/throw_demo.json")
        );
        assert_eq!(
            paths.scenario_path("other/custom.json"),
            PathBuf::from("other/custom.json")
        );
        assert_eq!(paths.defs_dir, PathBuf::from("/grablab/assets/defs"));
        assert_eq!(paths.root, PathBuf::from("/grablab"));
    }
}
