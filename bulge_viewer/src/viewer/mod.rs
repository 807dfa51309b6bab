mod hud;
mod mesh;
mod renderer;
mod shaders;
mod state;

pub use hud::HudText;
pub use renderer::SceneRenderer;
pub use state::ViewerState;
