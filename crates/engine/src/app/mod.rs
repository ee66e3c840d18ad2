mod draw;
mod geometry;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use draw::{DrawColor, DrawItem, DrawKind, DrawList, DrawRect, ShadowDesc, SpriteCell, TextLine};
pub use geometry::{first_colliding, Rect, DEGENERATE_RECT};
pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{world_to_screen, Renderer, Viewport};
pub use scene::{InputSnapshot, Scene, SceneCommand, Vec2};
