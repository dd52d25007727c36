use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shading::ShaderStage;

/// Number of light slots the shading stage declares.  The packed arrays must
/// be exactly this long every frame.
pub const MAX_LIGHTS: usize = 3;

/// Per-light falloff coefficients: constant, linear, quadratic.
pub const ATTENUATION: [f32; 3] = [1.0, 0.10, 0.08];

/// One light as consumed by the shading stage.  The position's `w` component
/// carries point-vs-directional semantics: 1 for a point light, 0 for a
/// directional one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightDescriptor {
    pub ambient: Vec4,
    pub position: Vec4,
    pub color: Vec4,
}

impl LightDescriptor {
    pub fn point(position: Vec3, color: Vec4, ambient: Vec4) -> Self {
        Self {
            ambient,
            position: position.extend(1.0),
            color,
        }
    }

    pub fn directional(direction: Vec3, color: Vec4, ambient: Vec4) -> Self {
        Self {
            ambient,
            position: direction.extend(0.0),
            color,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LightingError {
    #[error("shading stage expects exactly {MAX_LIGHTS} lights, got {0}")]
    CountMismatch(usize),
}

/// Packs the frame's lights into the three parallel uniform arrays the
/// shading stage indexes by slot.  Order is identity: slot `i` of every
/// array belongs to light `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightingUniformPack {
    ambients: [Vec4; MAX_LIGHTS],
    positions: [Vec4; MAX_LIGHTS],
    colors: [Vec4; MAX_LIGHTS],
}

impl LightingUniformPack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repacks the arrays from `lights`, which must hold exactly
    /// [`MAX_LIGHTS`] descriptors.  Any other count is a contract violation
    /// and is rejected rather than truncated or padded.
    pub fn collect(&mut self, lights: &[LightDescriptor]) -> Result<(), LightingError> {
        if lights.len() != MAX_LIGHTS {
            return Err(LightingError::CountMismatch(lights.len()));
        }
        for (slot, light) in lights.iter().enumerate() {
            self.ambients[slot] = light.ambient;
            self.positions[slot] = light.position;
            self.colors[slot] = light.color;
        }
        Ok(())
    }

    /// Writes the packed arrays, the attenuation triple and the camera eye
    /// position to the shading stage.
    pub fn upload_to(&self, stage: &mut dyn ShaderStage, eye_position: Vec3) {
        stage.set_vec4_array("lightAmbArray", &self.ambients);
        stage.set_vec4_array("lightPosArray", &self.positions);
        stage.set_vec4_array("lightColArray", &self.colors);
        stage.set_vec3("lightAttenuation", Vec3::from_array(ATTENUATION));
        stage.set_vec3("eyePos", eye_position);
    }

    pub fn positions(&self) -> &[Vec4; MAX_LIGHTS] {
        &self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::StageRecorder;

    fn light(tag: f32) -> LightDescriptor {
        LightDescriptor {
            ambient: Vec4::splat(tag),
            position: Vec4::new(tag, 0.0, 0.0, 1.0),
            color: Vec4::new(0.0, tag, 0.0, 1.0),
        }
    }

    #[test]
    fn collect_preserves_slot_order() {
        let mut pack = LightingUniformPack::new();
        pack.collect(&[light(1.0), light(2.0), light(3.0)]).unwrap();
        let mut stage = StageRecorder::new();
        pack.upload_to(&mut stage, Vec3::ZERO);
        let positions = stage.vec4_array("lightPosArray").unwrap();
        assert_eq!(positions[0].x, 1.0);
        assert_eq!(positions[1].x, 2.0);
        assert_eq!(positions[2].x, 3.0);
        let colors = stage.vec4_array("lightColArray").unwrap();
        assert_eq!(colors[2].y, 3.0);
    }

    #[test]
    fn wrong_light_count_is_rejected() {
        let mut pack = LightingUniformPack::new();
        assert_eq!(
            pack.collect(&[light(1.0), light(2.0)]),
            Err(LightingError::CountMismatch(2))
        );
        assert_eq!(
            pack.collect(&[light(1.0), light(2.0), light(3.0), light(4.0)]),
            Err(LightingError::CountMismatch(4))
        );
    }

    #[test]
    fn upload_includes_attenuation_and_eye() {
        let mut pack = LightingUniformPack::new();
        pack.collect(&[light(1.0), light(2.0), light(3.0)]).unwrap();
        let mut stage = StageRecorder::new();
        pack.upload_to(&mut stage, Vec3::new(0.0, 4.0, 20.0));
        assert_eq!(
            stage.vec3("lightAttenuation"),
            Some(Vec3::new(1.0, 0.10, 0.08))
        );
        assert_eq!(stage.vec3("eyePos"), Some(Vec3::new(0.0, 4.0, 20.0)));
    }

    #[test]
    fn point_and_directional_differ_in_w() {
        let point = LightDescriptor::point(Vec3::Y, Vec4::ONE, Vec4::ZERO);
        let directional = LightDescriptor::directional(Vec3::Y, Vec4::ONE, Vec4::ZERO);
        assert_eq!(point.position.w, 1.0);
        assert_eq!(directional.position.w, 0.0);
    }
}
