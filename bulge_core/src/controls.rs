//! Control panel semantics: discrete adjustments to the widget settings plus
//! the text the HUD shows for them. Key bindings live in the viewer; this
//! module only knows what each action does.

use log::debug;

use crate::settings::{
    BULGE_STEP, HEIGHT_BOUNDS, RADIUS_BOUNDS, WidgetSettings, ZOOM_BOUNDS, quantize,
};

const ROTATION_STEP_DEGREES: f32 = 5.0;
const ZOOM_FACTOR: f32 = 1.1;
const CAMERA_STEP: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    RadiusUp,
    RadiusDown,
    HeightUp,
    HeightDown,
    /// Restore the bulge values the widget launched with.
    ResetBulge,
    Rotate { axis: Axis, positive: bool },
    ZoomIn,
    ZoomOut,
    MoveCamera { axis: Axis, positive: bool },
    /// Restore launch rotation and camera.
    ResetView,
    ToggleHud,
}

#[derive(Debug, Clone)]
pub struct ControlState {
    settings: WidgetSettings,
    launch: WidgetSettings,
    hud_visible: bool,
    revision: u64,
}

impl ControlState {
    pub fn new(settings: WidgetSettings) -> Self {
        Self {
            launch: settings.clone(),
            settings,
            hud_visible: true,
            revision: 0,
        }
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }

    pub fn hud_visible(&self) -> bool {
        self.hud_visible
    }

    /// Bumped every time an action changes the settings. HUD toggles leave it
    /// alone, so the viewer compares it to skip rebuilding scene resources.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply an action; returns true when anything changed.
    pub fn apply(&mut self, action: ControlAction) -> bool {
        let before = self.settings.clone();
        let hud_before = self.hud_visible;
        match action {
            ControlAction::RadiusUp => self.step_radius(BULGE_STEP),
            ControlAction::RadiusDown => self.step_radius(-BULGE_STEP),
            ControlAction::HeightUp => self.step_height(BULGE_STEP),
            ControlAction::HeightDown => self.step_height(-BULGE_STEP),
            ControlAction::ResetBulge => self.settings.bulge = self.launch.bulge,
            ControlAction::Rotate { axis, positive } => {
                let delta = signed(ROTATION_STEP_DEGREES.to_radians(), positive);
                let rotation = &mut self.settings.rotation;
                match axis {
                    Axis::X => rotation.x += delta,
                    Axis::Y => rotation.y += delta,
                    Axis::Z => rotation.z += delta,
                }
            }
            ControlAction::ZoomIn => self.scale_zoom(ZOOM_FACTOR),
            ControlAction::ZoomOut => self.scale_zoom(1.0 / ZOOM_FACTOR),
            ControlAction::MoveCamera { axis, positive } => {
                let delta = signed(CAMERA_STEP, positive);
                let position = &mut self.settings.camera.position;
                match axis {
                    Axis::X => position.x += delta,
                    Axis::Y => position.y += delta,
                    Axis::Z => position.z += delta,
                }
            }
            ControlAction::ResetView => {
                self.settings.rotation = self.launch.rotation;
                self.settings.camera = self.launch.camera;
            }
            ControlAction::ToggleHud => self.hud_visible = !self.hud_visible,
        }

        let changed = self.settings != before;
        if changed {
            self.revision += 1;
            debug!("{action:?} applied (revision {})", self.revision);
        }
        changed || hud_before != self.hud_visible
    }

    /// Panel text, one value per line.
    pub fn hud_lines(&self) -> Vec<String> {
        let settings = &self.settings;
        let rotation = &settings.rotation;
        let camera = &settings.camera;
        vec![
            String::from("Bulge Effect Controls"),
            format!("Diameter: {:.1}", settings.bulge.radius),
            format!("Height:   {:.1}", settings.bulge.height),
            format!(
                "Rotation: {:.1} {:.1} {:.1}",
                rotation.x.to_degrees(),
                rotation.y.to_degrees(),
                rotation.z.to_degrees()
            ),
            format!(
                "Camera:   {:.1} {:.1} {:.1} zoom {:.1}",
                camera.position.x, camera.position.y, camera.position.z, camera.zoom
            ),
        ]
    }

    fn step_radius(&mut self, delta: f32) {
        let bulge = &mut self.settings.bulge;
        bulge.radius = quantize(bulge.radius + delta, &RADIUS_BOUNDS);
    }

    fn step_height(&mut self, delta: f32) {
        let bulge = &mut self.settings.bulge;
        bulge.height = quantize(bulge.height + delta, &HEIGHT_BOUNDS);
    }

    fn scale_zoom(&mut self, factor: f32) {
        let camera = &mut self.settings.camera;
        camera.zoom = (camera.zoom * factor).clamp(*ZOOM_BOUNDS.start(), *ZOOM_BOUNDS.end());
    }
}

fn signed(value: f32, positive: bool) -> f32 {
    if positive { value } else { -value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_steps_by_a_tenth() {
        let mut controls = ControlState::new(WidgetSettings::default());
        assert!(controls.apply(ControlAction::RadiusUp));
        assert!((controls.settings().bulge.radius - 1.7).abs() < 1e-5);
        assert_eq!(controls.revision(), 1);
    }

    #[test]
    fn radius_clamps_at_upper_bound() {
        let mut controls = ControlState::new(WidgetSettings::default());
        for _ in 0..200 {
            controls.apply(ControlAction::RadiusUp);
        }
        assert_eq!(controls.settings().bulge.radius, 8.0);
        assert!(!controls.apply(ControlAction::RadiusUp));
    }

    #[test]
    fn height_clamps_at_lower_bound() {
        let mut controls = ControlState::new(WidgetSettings::default());
        for _ in 0..50 {
            controls.apply(ControlAction::HeightDown);
        }
        assert_eq!(controls.settings().bulge.height, 0.1);
    }

    #[test]
    fn reset_restores_launch_bulge() {
        let mut settings = WidgetSettings::default();
        settings.bulge.radius = 3.0;
        settings.bulge.height = 0.8;
        let mut controls = ControlState::new(settings);
        controls.apply(ControlAction::RadiusDown);
        controls.apply(ControlAction::HeightUp);
        assert!(controls.apply(ControlAction::ResetBulge));
        assert_eq!(controls.settings().bulge.radius, 3.0);
        assert_eq!(controls.settings().bulge.height, 0.8);
    }

    #[test]
    fn rotation_and_camera_reset_together() {
        let mut controls = ControlState::new(WidgetSettings::default());
        controls.apply(ControlAction::Rotate {
            axis: Axis::Z,
            positive: true,
        });
        controls.apply(ControlAction::MoveCamera {
            axis: Axis::Y,
            positive: false,
        });
        controls.apply(ControlAction::ZoomIn);
        assert!((controls.settings().camera.zoom - 110.0).abs() < 1e-3);
        controls.apply(ControlAction::ResetView);
        let defaults = WidgetSettings::default();
        assert_eq!(controls.settings().rotation, defaults.rotation);
        assert_eq!(controls.settings().camera, defaults.camera);
    }

    #[test]
    fn toggling_hud_does_not_bump_revision() {
        let mut controls = ControlState::new(WidgetSettings::default());
        assert!(controls.apply(ControlAction::ToggleHud));
        assert!(!controls.hud_visible());
        assert_eq!(controls.revision(), 0);
    }

    #[test]
    fn hud_lines_show_one_decimal() {
        let controls = ControlState::new(WidgetSettings::default());
        let lines = controls.hud_lines();
        assert_eq!(lines[1], "Diameter: 1.6");
        assert_eq!(lines[2], "Height:   0.5");
        assert!(lines[3].ends_with("30.0"));
    }
}
