//! Fragment-side rules shared by both layers: tint a glyph texel with a flat
//! colour and fade it by the layer opacity, dropping nearly transparent texels.

use serde::Deserialize;

/// Texels with alpha below this are discarded (no colour or depth write).
pub const ALPHA_DISCARD_THRESHOLD: f32 = 0.1;

/// Flat tint applied to a layer's glyph texture.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LayerStyle {
    pub color: [f32; 3],
    pub opacity: f32,
}

impl LayerStyle {
    /// Opaque black ink for the interactive layer.
    pub const MAIN_INK: Self = Self {
        color: [0.0, 0.0, 0.0],
        opacity: 1.0,
    };

    /// Faded black for the static drop shadow.
    pub const SHADOW: Self = Self {
        color: [0.0, 0.0, 0.0],
        opacity: 0.3,
    };

    /// Returns the output colour for a sampled texel, or `None` when the
    /// fragment is discarded.
    pub fn shade(&self, texel: [f32; 4]) -> Option<[f32; 4]> {
        let alpha = texel[3];
        if !(alpha >= ALPHA_DISCARD_THRESHOLD) {
            return None;
        }
        Some([self.color[0], self.color[1], self.color[2], alpha * self.opacity])
    }

    /// Packs colour and opacity the way the layer uniform expects them.
    pub fn as_uniform(&self) -> [f32; 4] {
        [self.color[0], self.color[1], self.color[2], self.opacity]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faint_texels_are_discarded_whatever_the_opacity() {
        for opacity in [0.0, 0.3, 1.0, 5.0] {
            let style = LayerStyle {
                color: [1.0, 0.0, 0.0],
                opacity,
            };
            assert_eq!(style.shade([1.0, 1.0, 1.0, 0.05]), None);
        }
    }

    #[test]
    fn threshold_texel_is_kept() {
        let shaded = LayerStyle::MAIN_INK.shade([0.2, 0.2, 0.2, 0.1]);
        assert_eq!(shaded, Some([0.0, 0.0, 0.0, 0.1]));
    }

    #[test]
    fn shadow_fades_alpha_and_ignores_texel_colour() {
        let shaded = LayerStyle::SHADOW
            .shade([0.9, 0.4, 0.1, 1.0])
            .expect("opaque texel should survive");
        assert_eq!(&shaded[..3], &[0.0, 0.0, 0.0]);
        assert!((shaded[3] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn nan_alpha_is_discarded() {
        assert_eq!(LayerStyle::MAIN_INK.shade([0.0, 0.0, 0.0, f32::NAN]), None);
    }
}
