mod config;
pub(crate) mod input;
mod keyboard;
mod loop_runner;
mod metrics;
pub mod rendering;
mod scene;
mod timing;

pub use config::{load_loop_config, ConfigError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use input::{InputAction, InputSnapshot, KeyState};
pub use loop_runner::{run_app, run_app_with_metrics, AppError};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{
    FrameBuffer, RenderTarget, Renderer, Rgba, ScreenRegion, TextureRegion, View,
    DEFAULT_CLEAR_COLOR, PIXELS_PER_WORLD,
};
pub use scene::{Scene, SceneCommand};
