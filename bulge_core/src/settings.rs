//! Widget configuration. `WidgetSettings` is the resolved, always-complete view
//! consumed each frame; `WidgetPreset` mirrors it with every field optional so
//! a JSON file only needs to mention what it overrides.

use std::ops::RangeInclusive;
use std::path::PathBuf;

use glam::{Quat, Vec3};
use serde::Deserialize;
use thiserror::Error;

use crate::bulge::BulgeParameters;
use crate::plane::{MAIN_SEGMENTS, SHADOW_SEGMENTS};
use crate::shading::LayerStyle;

/// Slider range for the bulge radius.
pub const RADIUS_BOUNDS: RangeInclusive<f32> = 0.5..=8.0;
/// Slider range for the bulge height.
pub const HEIGHT_BOUNDS: RangeInclusive<f32> = 0.1..=3.0;
/// Slider granularity for both bulge values.
pub const BULGE_STEP: f32 = 0.1;
/// Allowed camera zoom range.
pub const ZOOM_BOUNDS: RangeInclusive<f32> = 10.0..=1000.0;

pub const DEFAULT_MAIN_TEXTURE: &str = "assets/text-main3.png";
pub const DEFAULT_SHADOW_TEXTURE: &str = "assets/text-shadow3.png";

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be a positive finite number (got {value})")]
    NonPositive { field: &'static str, value: f32 },
    #[error("{field} must be finite (got {value})")]
    NonFinite { field: &'static str, value: f32 },
    #[error("camera near plane {near} must be in front of far plane {far}")]
    InvertedClipRange { near: f32, far: f32 },
    #[error("{field} opacity must be within 0..=1 (got {value})")]
    OpacityOutOfRange { field: &'static str, value: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulgeSettings {
    pub radius: f32,
    pub height: f32,
}

impl Default for BulgeSettings {
    fn default() -> Self {
        Self {
            radius: 1.6,
            height: 0.5,
        }
    }
}

impl BulgeSettings {
    pub fn parameters(&self) -> BulgeParameters {
        BulgeParameters::new(self.radius, self.height)
    }
}

/// Euler rotation of the scene group in radians, intrinsic XYZ order: the
/// composed rotation is `Rx * Ry * Rz`, so a vector turns about Z first, then
/// Y, then X.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneRotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for SceneRotation {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 30.0_f32.to_radians(),
        }
    }
}

impl SceneRotation {
    pub fn quat(&self) -> Quat {
        Quat::from_rotation_x(self.x) * Quat::from_rotation_y(self.y) * Quat::from_rotation_z(self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub zoom: f32,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            zoom: 100.0,
            position: Vec3::new(0.0, -30.0, 20.0),
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneSettings {
    pub width: f32,
    pub height: f32,
    pub main_segments: u32,
    pub shadow_segments: u32,
}

impl Default for PlaneSettings {
    fn default() -> Self {
        Self {
            width: 8.0,
            height: 8.0,
            main_segments: MAIN_SEGMENTS,
            shadow_segments: SHADOW_SEGMENTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureSettings {
    pub main: PathBuf,
    pub shadow: PathBuf,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            main: PathBuf::from(DEFAULT_MAIN_TEXTURE),
            shadow: PathBuf::from(DEFAULT_SHADOW_TEXTURE),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSettings {
    pub bulge: BulgeSettings,
    pub rotation: SceneRotation,
    pub camera: CameraSettings,
    pub plane: PlaneSettings,
    pub main_layer: LayerStyle,
    pub shadow_layer: LayerStyle,
    /// Local offset of the shadow mesh relative to the main mesh.
    pub shadow_offset: Vec3,
    pub textures: TextureSettings,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            bulge: BulgeSettings::default(),
            rotation: SceneRotation::default(),
            camera: CameraSettings::default(),
            plane: PlaneSettings::default(),
            main_layer: LayerStyle::MAIN_INK,
            shadow_layer: LayerStyle::SHADOW,
            shadow_offset: Vec3::ZERO,
            textures: TextureSettings::default(),
        }
    }
}

/// Partial settings as read from a JSON preset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WidgetPreset {
    #[serde(default)]
    pub bulge: Option<BulgePreset>,
    /// Per-axis rotation in degrees; easier to author than radians.
    #[serde(default)]
    pub rotation_degrees: Option<[f32; 3]>,
    #[serde(default)]
    pub camera: Option<CameraPreset>,
    #[serde(default)]
    pub plane: Option<PlanePreset>,
    #[serde(default)]
    pub main_layer: Option<LayerStyle>,
    #[serde(default)]
    pub shadow_layer: Option<LayerStyle>,
    #[serde(default)]
    pub shadow_offset: Option<[f32; 3]>,
    #[serde(default)]
    pub main_texture: Option<PathBuf>,
    #[serde(default)]
    pub shadow_texture: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulgePreset {
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraPreset {
    #[serde(default)]
    pub zoom: Option<f32>,
    #[serde(default)]
    pub position: Option<[f32; 3]>,
    #[serde(default)]
    pub near: Option<f32>,
    #[serde(default)]
    pub far: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanePreset {
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub main_segments: Option<u32>,
    #[serde(default)]
    pub shadow_segments: Option<u32>,
}

impl WidgetPreset {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl WidgetSettings {
    /// Apply a preset over the built-in defaults and validate the result.
    pub fn from_preset(preset: &WidgetPreset) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        if let Some(bulge) = preset.bulge.as_ref() {
            if let Some(radius) = bulge.radius {
                settings.bulge.radius = radius;
            }
            if let Some(height) = bulge.height {
                settings.bulge.height = height;
            }
        }
        if let Some([x, y, z]) = preset.rotation_degrees {
            settings.rotation = SceneRotation {
                x: x.to_radians(),
                y: y.to_radians(),
                z: z.to_radians(),
            };
        }
        if let Some(camera) = preset.camera.as_ref() {
            if let Some(zoom) = camera.zoom {
                settings.camera.zoom = zoom;
            }
            if let Some(position) = camera.position {
                settings.camera.position = Vec3::from_array(position);
            }
            if let Some(near) = camera.near {
                settings.camera.near = near;
            }
            if let Some(far) = camera.far {
                settings.camera.far = far;
            }
        }
        if let Some(plane) = preset.plane.as_ref() {
            if let Some(width) = plane.width {
                settings.plane.width = width;
            }
            if let Some(height) = plane.height {
                settings.plane.height = height;
            }
            if let Some(segments) = plane.main_segments {
                settings.plane.main_segments = segments;
            }
            if let Some(segments) = plane.shadow_segments {
                settings.plane.shadow_segments = segments;
            }
        }
        if let Some(style) = preset.main_layer {
            settings.main_layer = style;
        }
        if let Some(style) = preset.shadow_layer {
            settings.shadow_layer = style;
        }
        if let Some(offset) = preset.shadow_offset {
            settings.shadow_offset = Vec3::from_array(offset);
        }
        if let Some(path) = preset.main_texture.as_ref() {
            settings.textures.main = path.clone();
        }
        if let Some(path) = preset.shadow_texture.as_ref() {
            settings.textures.shadow = path.clone();
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values that would break the camera or geometry. A degenerate
    /// bulge is deliberately not an error: it renders flat.
    pub fn validate(&self) -> Result<(), SettingsError> {
        positive("plane.width", self.plane.width)?;
        positive("plane.height", self.plane.height)?;
        positive("camera.zoom", self.camera.zoom)?;
        positive("camera.near", self.camera.near)?;
        positive("camera.far", self.camera.far)?;
        if self.camera.near >= self.camera.far {
            return Err(SettingsError::InvertedClipRange {
                near: self.camera.near,
                far: self.camera.far,
            });
        }
        for (field, value) in [
            ("camera.position.x", self.camera.position.x),
            ("camera.position.y", self.camera.position.y),
            ("camera.position.z", self.camera.position.z),
            ("rotation.x", self.rotation.x),
            ("rotation.y", self.rotation.y),
            ("rotation.z", self.rotation.z),
            ("shadow_offset.x", self.shadow_offset.x),
            ("shadow_offset.y", self.shadow_offset.y),
            ("shadow_offset.z", self.shadow_offset.z),
        ] {
            finite(field, value)?;
        }
        opacity("main_layer", self.main_layer.opacity)?;
        opacity("shadow_layer", self.shadow_layer.opacity)?;
        Ok(())
    }
}

/// Snap to the slider step and clamp into `bounds`.
pub fn quantize(value: f32, bounds: &RangeInclusive<f32>) -> f32 {
    let stepped = (value / BULGE_STEP).round() * BULGE_STEP;
    stepped.clamp(*bounds.start(), *bounds.end())
}

fn positive(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SettingsError::NonPositive { field, value })
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SettingsError::NonFinite { field, value })
    }
}

fn opacity(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::OpacityOutOfRange { field, value })
    }
}
