use arbor_engine::{load_loop_config, resolve_app_paths, AppError, AppPaths, LoopConfig, Scene};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay;

pub(crate) struct AppWiring {
    pub(crate) paths: AppPaths,
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Arbor Startup ===");

    let paths = resolve_app_paths()?;
    let config = load_loop_config(&paths.config_path)?;
    info!(
        root = %paths.root.display(),
        config = %paths.config_path.display(),
        target_tps = config.target_tps,
        "app_paths_resolved"
    );

    Ok(AppWiring {
        paths,
        config,
        scene: gameplay::build_scene(),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
