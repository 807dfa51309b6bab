use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use bulge_core::{WidgetPreset, WidgetSettings};
use clap::Parser;
use glam::Vec3;

#[derive(Parser, Debug)]
#[command(about = "Interactive bulge text widget rendered with wgpu", version)]
pub struct Args {
    /// Glyph texture for the interactive layer (PNG with alpha)
    #[arg(long)]
    pub main_texture: Option<PathBuf>,

    /// Glyph texture for the static drop shadow (PNG with alpha)
    #[arg(long)]
    pub shadow_texture: Option<PathBuf>,

    /// Optional widget preset JSON; any field it omits keeps its default
    #[arg(long)]
    pub preset: Option<PathBuf>,

    /// Bulge radius in world units (overrides the preset)
    #[arg(long)]
    pub radius: Option<f32>,

    /// Bulge height in world units (overrides the preset)
    #[arg(long)]
    pub height: Option<f32>,

    /// Plane width in world units
    #[arg(long)]
    pub width: Option<f32>,

    /// Plane height in world units
    #[arg(long)]
    pub plane_height: Option<f32>,

    /// Orthographic zoom in pixels per world unit
    #[arg(long)]
    pub zoom: Option<f32>,

    /// TTF used for the control HUD; without it the HUD stays off
    #[arg(long)]
    pub hud_font: Option<PathBuf>,

    /// Validate settings and textures, then exit without opening a window
    #[arg(long)]
    pub headless: bool,

    /// Render one frame offscreen and write it to this PNG
    #[arg(long)]
    pub dump_render: Option<PathBuf>,

    /// Offscreen render size as WIDTHxHEIGHT
    #[arg(long, default_value = "800x600", value_parser = parse_render_size)]
    pub render_size: RenderSize,

    /// World-space pointer position fed to the offscreen render, as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    pub hover: Option<Vec3>,

    /// Controller ticks to run before the offscreen frame is captured
    #[arg(long, default_value_t = 1)]
    pub frames: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

fn parse_render_size(value: &str) -> Result<RenderSize, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|err| format!("invalid width '{width}': {err}"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|err| format!("invalid height '{height}': {err}"))?;
    if width == 0 || height == 0 {
        return Err(format!("render size must be non-zero, got {width}x{height}"));
    }
    Ok(RenderSize { width, height })
}

fn parse_vec3(value: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z, got '{value}'"));
    }
    let mut coords = [0.0f32; 3];
    for (slot, part) in coords.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|err| format!("invalid coordinate '{part}': {err}"))?;
        if !slot.is_finite() {
            return Err(format!("coordinate '{part}' is not finite"));
        }
    }
    Ok(Vec3::from_array(coords))
}

pub fn load_preset(path: &Path) -> Result<WidgetPreset> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading preset {}", path.display()))?;
    let preset: WidgetPreset = serde_json::from_str(&data)
        .with_context(|| format!("parsing preset {}", path.display()))?;
    Ok(preset)
}

/// Defaults, then the preset file, then individual flags.
pub fn resolve_settings(args: &Args) -> Result<WidgetSettings> {
    let preset = match args.preset.as_deref() {
        Some(path) => load_preset(path)?,
        None => WidgetPreset::default(),
    };
    let mut settings = WidgetSettings::from_preset(&preset).context("applying preset")?;

    if let Some(radius) = args.radius {
        settings.bulge.radius = radius;
    }
    if let Some(height) = args.height {
        settings.bulge.height = height;
    }
    if let Some(width) = args.width {
        settings.plane.width = width;
    }
    if let Some(height) = args.plane_height {
        settings.plane.height = height;
    }
    if let Some(zoom) = args.zoom {
        settings.camera.zoom = zoom;
    }
    if let Some(path) = args.main_texture.as_ref() {
        settings.textures.main = path.clone();
    }
    if let Some(path) = args.shadow_texture.as_ref() {
        settings.textures.shadow = path.clone();
    }

    settings
        .validate()
        .context("validating command-line overrides")?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn render_size_parses_both_separators() {
        assert_eq!(
            parse_render_size("640x480"),
            Ok(RenderSize {
                width: 640,
                height: 480
            })
        );
        assert!(parse_render_size("1024X768").is_ok());
        assert!(parse_render_size("0x480").is_err());
        assert!(parse_render_size("640").is_err());
    }

    #[test]
    fn hover_accepts_negative_coordinates() {
        assert_eq!(parse_vec3("1, -2.5, 0"), Ok(Vec3::new(1.0, -2.5, 0.0)));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,nan,0").is_err());
    }

    #[test]
    fn flags_override_preset_values() {
        let temp = tempdir().expect("temp dir");
        let preset_path = temp.path().join("preset.json");
        let preset = json!({
            "bulge": { "radius": 3.0, "height": 0.8 },
            "camera": { "zoom": 60.0 }
        });
        fs::write(
            &preset_path,
            serde_json::to_vec_pretty(&preset).expect("encode preset"),
        )
        .expect("write preset");

        let args = Args::parse_from([
            "bulge_viewer",
            "--preset",
            preset_path.to_str().expect("utf8 path"),
            "--height",
            "1.2",
        ]);
        let settings = resolve_settings(&args).expect("settings resolve");
        assert_eq!(settings.bulge.radius, 3.0);
        assert_eq!(settings.bulge.height, 1.2);
        assert_eq!(settings.camera.zoom, 60.0);
    }

    #[test]
    fn invalid_override_is_reported() {
        let args = Args::parse_from(["bulge_viewer", "--zoom", "0"]);
        let err = resolve_settings(&args).expect_err("zero zoom must fail");
        assert!(format!("{err:#}").contains("camera.zoom"));
    }

    #[test]
    fn missing_preset_names_the_file() {
        let args = Args::parse_from(["bulge_viewer", "--preset", "/nonexistent/preset.json"]);
        let err = resolve_settings(&args).expect_err("missing preset must fail");
        assert!(format!("{err:#}").contains("/nonexistent/preset.json"));
    }
}
