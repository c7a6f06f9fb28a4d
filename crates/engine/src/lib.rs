use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod animation;
pub mod app;
pub mod assets;
pub mod fsm;
pub mod physics;
pub mod scene;
pub mod tilemap;

pub use animation::{AnimatedSprite, SpriteAnimation, SpriteSheet};
pub use app::{
    load_loop_config, run_app, run_app_with_metrics, AppError, ConfigError, InputAction,
    InputSnapshot, KeyState, LoopConfig, LoopMetricsSnapshot, MetricsHandle, RenderTarget, Rgba,
    Scene, SceneCommand, ScreenRegion, TextureRegion, PIXELS_PER_WORLD, SLOW_FRAME_ENV_VAR,
};
pub use assets::{AssetCache, AssetError, AssetKeyError, Texture, TextureHandle};
pub use fsm::{FsmError, StateMachine, Transition};
pub use physics::{Circle, Rect, Shape};
pub use scene::{
    Behavior, Camera, DrawCtx, EntityCtx, EntityDesc, EntityId, LayerMask, Transform, Vec2, World,
};
pub use tilemap::{TileLayer, Tilemap, TilemapError};

pub const ROOT_ENV_VAR: &str = "ARBOR_ROOT";

const CONFIG_FILE_NAME: &str = "arbor.json";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub config_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
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
        "ARBOR_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/arbor\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    Ok(app_paths_for_root(resolve_root()?))
}

fn app_paths_for_root(root: PathBuf) -> AppPaths {
    AppPaths {
        assets_dir: root.join("assets"),
        config_path: root.join(CONFIG_FILE_NAME),
        root,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            find_root_above(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
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
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let temp = TempDir::new().expect("temp dir");
        fs::create_dir(temp.path().join("assets")).expect("assets dir");
        assert!(!is_repo_marker(temp.path()));

        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("manifest");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn root_is_found_from_nested_directory() {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path();
        fs::write(root.join("Cargo.toml"), "[workspace]\n").expect("manifest");
        fs::create_dir_all(root.join("crates")).expect("crates dir");
        let nested = root.join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested dir");

        let found = find_root_above(&nested).expect("root");
        assert_eq!(found, normalize_path(root));
    }

    #[test]
    fn app_paths_hang_off_root() {
        let paths = app_paths_for_root(PathBuf::from("/srv/arbor"));
        assert_eq!(paths.assets_dir, PathBuf::from("/srv/arbor/assets"));
        assert_eq!(paths.config_path, PathBuf::from("/srv/arbor/arbor.json"));
    }
}
