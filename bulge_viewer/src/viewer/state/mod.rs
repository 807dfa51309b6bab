//! Runtime state for the windowed widget. Owns the wgpu device and surface,
//! the layer renderer, the optional HUD, and the hover controller, and exposes
//! the handful of entry points the event loop in `main.rs` drives. Submodules
//! split the lifecycle: `init` for setup, `layout` for resize handling,
//! `render` for the frame tick, and `input` for keyboard and pointer routing.

use std::sync::Arc;

use anyhow::Result;
use bulge_core::{ControlState, DisplacementController, WidgetSettings};
use glam::Vec2;
use wgpu::SurfaceError;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::KeyEvent,
    window::Window,
};

use super::hud::{HudOverlay, HudText};
use super::renderer::SceneRenderer;
use crate::texture::{LayerTextures, TextureLoader};

pub struct ViewerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    renderer: SceneRenderer,
    hud: Option<HudOverlay>,
    controls: ControlState,
    /// `controls.revision()` the renderer's layers were last built from.
    synced_revision: u64,
    controller: DisplacementController,
    textures: LayerTextures,
    loader: TextureLoader,
    cursor: Option<Vec2>,
    degenerate_warned: bool,
}

mod init;
mod input;
mod layout;
mod render;

impl ViewerState {
    pub async fn new(
        window: Arc<Window>,
        settings: WidgetSettings,
        hud_text: Option<HudText>,
    ) -> Result<Self> {
        init::new(window, settings, hud_text).await
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        layout::resize(self, new_size);
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        render::render(self)
    }

    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        input::handle_key_event(self, event);
    }

    pub fn cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        input::cursor_moved(self, position);
    }

    pub fn cursor_left(&mut self) {
        input::cursor_left(self);
    }
}
