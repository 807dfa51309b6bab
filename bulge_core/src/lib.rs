//! GPU-free half of the bulge widget: the displacement math mirrored from the
//! WGSL programs, the hover controller that drives the displacement uniform,
//! plane tessellation, camera/picking helpers, and the widget settings that
//! the viewer's controls mutate.

pub mod bulge;
pub mod camera;
pub mod controller;
pub mod controls;
pub mod picking;
pub mod plane;
pub mod scene;
pub mod settings;
pub mod shading;

pub use bulge::{BulgeParameters, displace_local, ease_in_out_cubic, map_range, planar_distance};
pub use camera::OrthoCamera;
pub use controller::{
    DisplacementController, HoverPhase, HoverTransition, PointerEvent, SENTINEL_POINT,
    SMOOTHING_FACTOR,
};
pub use controls::{Axis, ControlAction, ControlState};
pub use picking::{PlaneHit, Ray, cursor_ray, hit_test, intersect_plane};
pub use plane::{PlaneGeometry, PlaneVertex};
pub use scene::{DrawItem, LayerKind, MeshNode, SceneGraph, SceneNode};
pub use settings::{CameraSettings, SettingsError, WidgetPreset, WidgetSettings};
pub use shading::{ALPHA_DISCARD_THRESHOLD, LayerStyle};
