use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::shading::ShaderStage;

/// Closed set of surface presets selectable per scene node.
///
/// `None` is the untextured default: white ambient/diffuse/specular with a
/// moderately shiny exponent, so a texture map can supply the actual colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaterialPreset {
    Wood,
    Brass,
    Grass,
    Leather,
    #[default]
    None,
}

impl MaterialPreset {
    /// Uploads the preset's four fields to the shading stage.  Every case
    /// yields a complete (ambient, diffuse, specular, exponent) tuple, so no
    /// preset can inherit values from a neighbouring case.
    pub fn apply(self, stage: &mut dyn ShaderStage) {
        let (ambient, diffuse, specular, exponent) = match self {
            MaterialPreset::Wood => (
                Vec4::new(0.21, 0.13, 0.05, 1.0),
                Vec4::new(0.71, 0.43, 0.18, 1.0),
                Vec4::new(0.30, 0.30, 0.30, 1.0),
                8.0,
            ),
            MaterialPreset::Brass => (
                Vec4::new(0.329_412, 0.223_529, 0.027_451, 1.0),
                Vec4::new(0.780_392, 0.568_627, 0.113_725, 1.0),
                Vec4::new(0.992_157, 0.941_176, 0.807_843, 1.0),
                27.897_4,
            ),
            MaterialPreset::Grass => (
                Vec4::new(0.05, 0.17, 0.03, 1.0),
                Vec4::new(0.18, 0.52, 0.12, 1.0),
                Vec4::new(0.05, 0.05, 0.05, 1.0),
                4.0,
            ),
            MaterialPreset::Leather => (
                Vec4::new(0.15, 0.08, 0.05, 1.0),
                Vec4::new(0.45, 0.26, 0.15, 1.0),
                Vec4::new(0.20, 0.15, 0.10, 1.0),
                16.0,
            ),
            MaterialPreset::None => (
                Vec4::new(1.0, 1.0, 1.0, 1.0),
                Vec4::new(1.0, 1.0, 1.0, 1.0),
                Vec4::new(1.0, 1.0, 1.0, 1.0),
                32.0,
            ),
        };
        stage.set_vec4("matAmbient", ambient);
        stage.set_vec4("matDiffuse", diffuse);
        stage.set_vec4("matSpecularColour", specular);
        stage.set_f32("matSpecularExponent", exponent);
    }

    pub const ALL: [MaterialPreset; 5] = [
        MaterialPreset::Wood,
        MaterialPreset::Brass,
        MaterialPreset::Grass,
        MaterialPreset::Leather,
        MaterialPreset::None,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::StageRecorder;

    #[test]
    fn every_preset_sets_all_four_fields() {
        for preset in MaterialPreset::ALL {
            let mut stage = StageRecorder::new();
            preset.apply(&mut stage);
            assert!(stage.vec4("matAmbient").is_some(), "{preset:?}");
            assert!(stage.vec4("matDiffuse").is_some(), "{preset:?}");
            assert!(stage.vec4("matSpecularColour").is_some(), "{preset:?}");
            assert!(stage.float("matSpecularExponent").is_some(), "{preset:?}");
        }
    }

    #[test]
    fn selected_preset_is_not_overwritten_by_neighbours() {
        // Applying Brass must leave Brass values behind, not whichever case
        // happens to sit last in the enumeration.
        let mut stage = StageRecorder::new();
        MaterialPreset::Brass.apply(&mut stage);
        let diffuse = stage.vec4("matDiffuse").unwrap();
        assert!((diffuse.x - 0.780_392).abs() < 1e-6);
        assert!((stage.float("matSpecularExponent").unwrap() - 27.897_4).abs() < 1e-4);
    }

    #[test]
    fn presets_are_distinct() {
        let mut diffuses = Vec::new();
        for preset in MaterialPreset::ALL {
            let mut stage = StageRecorder::new();
            preset.apply(&mut stage);
            diffuses.push(stage.vec4("matDiffuse").unwrap());
        }
        for i in 0..diffuses.len() {
            for j in (i + 1)..diffuses.len() {
                assert_ne!(diffuses[i], diffuses[j]);
            }
        }
    }

    #[test]
    fn none_is_the_white_texture_passthrough() {
        let mut stage = StageRecorder::new();
        MaterialPreset::None.apply(&mut stage);
        assert_eq!(stage.vec4("matAmbient"), Some(Vec4::ONE));
        assert_eq!(stage.float("matSpecularExponent"), Some(32.0));
    }
}
