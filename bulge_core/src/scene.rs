//! Plain-data scene tree for the widget: a rotated group holding the shadow and
//! main meshes, plus the ambient and directional lights. The viewer walks
//! it whenever settings change and caches the flattened draw list.

use glam::{Mat4, Vec2, Vec3};

use crate::bulge::BulgeParameters;
use crate::settings::WidgetSettings;
use crate::shading::LayerStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Shadow,
    Main,
}

impl LayerKind {
    pub fn label(self) -> &'static str {
        match self {
            LayerKind::Shadow => "shadow",
            LayerKind::Main => "main",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub layer: LayerKind,
    pub transform: Mat4,
    pub size: Vec2,
    pub segments: u32,
    pub style: LayerStyle,
    /// Only interactive meshes receive pointer events or displacement.
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Group {
        transform: Mat4,
        children: Vec<SceneNode>,
    },
    Mesh(MeshNode),
    AmbientLight {
        intensity: f32,
    },
    DirectionalLight {
        position: Vec3,
        intensity: f32,
    },
}

/// A mesh with its accumulated world transform.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub layer: LayerKind,
    pub model: Mat4,
    pub size: Vec2,
    pub segments: u32,
    pub style: LayerStyle,
    pub interactive: bool,
}

impl DrawItem {
    pub fn half_extents(&self) -> Vec2 {
        self.size * 0.5
    }

    /// Bulge parameters this item should be drawn with; static layers stay flat.
    pub fn bulge(&self, params: BulgeParameters) -> BulgeParameters {
        if self.interactive {
            params.sanitized()
        } else {
            BulgeParameters::FLAT
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneGraph {
    root: SceneNode,
}

impl SceneGraph {
    pub fn new(root: SceneNode) -> Self {
        Self { root }
    }

    /// The widget's scene: lights at the root, then a group rotated by the
    /// scene rotation containing the shadow mesh followed by the main mesh.
    pub fn isometric(settings: &WidgetSettings) -> Self {
        let size = Vec2::new(settings.plane.width, settings.plane.height);
        let shadow = SceneNode::Mesh(MeshNode {
            layer: LayerKind::Shadow,
            transform: Mat4::from_translation(settings.shadow_offset),
            size,
            segments: settings.plane.shadow_segments,
            style: settings.shadow_layer,
            interactive: false,
        });
        let main = SceneNode::Mesh(MeshNode {
            layer: LayerKind::Main,
            transform: Mat4::IDENTITY,
            size,
            segments: settings.plane.main_segments,
            style: settings.main_layer,
            interactive: true,
        });
        let group = SceneNode::Group {
            transform: Mat4::from_quat(settings.rotation.quat()),
            children: vec![shadow, main],
        };
        let root = SceneNode::Group {
            transform: Mat4::IDENTITY,
            children: vec![
                SceneNode::AmbientLight { intensity: 0.8 },
                SceneNode::DirectionalLight {
                    position: Vec3::new(10.0, 10.0, 5.0),
                    intensity: 0.5,
                },
                group,
            ],
        };
        Self::new(root)
    }

    /// Depth-first walk collecting meshes in declaration order.
    pub fn draw_items(&self) -> Vec<DrawItem> {
        let mut items = Vec::new();
        collect(&self.root, Mat4::IDENTITY, &mut items);
        items
    }

    pub fn interactive_item(&self) -> Option<DrawItem> {
        self.draw_items().into_iter().find(|item| item.interactive)
    }

    pub fn ambient_intensity(&self) -> f32 {
        let mut total = 0.0_f32;
        visit_lights(&self.root, &mut |node| {
            if let SceneNode::AmbientLight { intensity } = node {
                total += *intensity;
            }
        });
        total
    }
}

fn collect(node: &SceneNode, parent: Mat4, out: &mut Vec<DrawItem>) {
    match node {
        SceneNode::Group {
            transform,
            children,
        } => {
            let world = parent * *transform;
            for child in children {
                collect(child, world, out);
            }
        }
        SceneNode::Mesh(mesh) => out.push(DrawItem {
            layer: mesh.layer,
            model: parent * mesh.transform,
            size: mesh.size,
            segments: mesh.segments,
            style: mesh.style,
            interactive: mesh.interactive,
        }),
        SceneNode::AmbientLight { .. } | SceneNode::DirectionalLight { .. } => {}
    }
}

fn visit_lights(node: &SceneNode, visit: &mut impl FnMut(&SceneNode)) {
    match node {
        SceneNode::Group { children, .. } => {
            for child in children {
                visit_lights(child, visit);
            }
        }
        SceneNode::AmbientLight { .. } | SceneNode::DirectionalLight { .. } => visit(node),
        SceneNode::Mesh(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_is_drawn_before_main() {
        let graph = SceneGraph::isometric(&WidgetSettings::default());
        let layers: Vec<_> = graph.draw_items().iter().map(|item| item.layer).collect();
        assert_eq!(layers, vec![LayerKind::Shadow, LayerKind::Main]);
    }

    #[test]
    fn only_main_layer_is_interactive() {
        let graph = SceneGraph::isometric(&WidgetSettings::default());
        let items = graph.draw_items();
        assert!(!items[0].interactive);
        assert!(items[1].interactive);
        let main = graph.interactive_item().expect("main layer present");
        assert_eq!(main.layer, LayerKind::Main);
        assert_eq!(main.segments, 64);
    }

    #[test]
    fn group_rotation_reaches_meshes() {
        let settings = WidgetSettings::default();
        let graph = SceneGraph::isometric(&settings);
        let main = graph.interactive_item().expect("main layer present");
        let expected = Mat4::from_quat(settings.rotation.quat());
        assert!(main.model.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn shadow_offset_is_local_to_the_group() {
        let mut settings = WidgetSettings::default();
        settings.shadow_offset = Vec3::new(0.1, -0.1, -0.05);
        let graph = SceneGraph::isometric(&settings);
        let shadow = &graph.draw_items()[0];
        let origin = shadow.model.transform_point3(Vec3::ZERO);
        let expected = settings.rotation.quat() * settings.shadow_offset;
        assert!((origin - expected).length() < 1e-6);
    }

    #[test]
    fn shadow_layer_never_bulges() {
        let graph = SceneGraph::isometric(&WidgetSettings::default());
        let items = graph.draw_items();
        let params = BulgeParameters::new(3.0, 0.8);
        assert_eq!(items[0].bulge(params), BulgeParameters::FLAT);
        assert_eq!(items[1].bulge(params), params);
    }

    #[test]
    fn lights_are_carried_as_data() {
        let graph = SceneGraph::isometric(&WidgetSettings::default());
        assert!((graph.ambient_intensity() - 0.8).abs() < 1e-6);
    }
}
