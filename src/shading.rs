//! Seams between the scene core and its rendering collaborators.
//!
//! The core never talks to the GPU directly: it writes named uniforms and
//! issues draws through [`ShaderStage`], and obtains mesh/texture handles
//! through [`AssetStore`].  The wgpu renderer is the production
//! implementation; [`StageRecorder`] and [`OfflineAssets`] back the headless
//! summary mode and the tests.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3, Vec4};

use crate::mesh::MeshData;

/// Opaque handle to a mesh previously uploaded through an [`AssetStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Opaque handle to a loaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Uniform sink plus draw dispatch for one frame of shading work.
///
/// Names follow the shader contract: `view`, `projection`, `model`,
/// `lightAmbArray`, `lightPosArray`, `lightColArray`, `lightAttenuation`,
/// `eyePos`, `matAmbient`, `matDiffuse`, `matSpecularColour`,
/// `matSpecularExponent`.  Writing an unknown name is not an error (the
/// original uniform-location lookup silently returned -1); implementations
/// may log it.
pub trait ShaderStage {
    fn set_mat4(&mut self, name: &str, value: Mat4);
    fn set_vec3(&mut self, name: &str, value: Vec3);
    fn set_vec4(&mut self, name: &str, value: Vec4);
    fn set_vec4_array(&mut self, name: &str, values: &[Vec4]);
    fn set_f32(&mut self, name: &str, value: f32);

    /// Draws `mesh` with the uniform state written so far, sampling
    /// `texture` for diffuse when present.
    fn draw_mesh(&mut self, mesh: MeshHandle, texture: Option<TextureId>);
}

/// A renderable asset: something that can issue its own draw against a stage.
pub trait Drawable {
    fn draw(&self, stage: &mut dyn ShaderStage);
}

/// Upload service for geometry and image data, implemented by the renderer
/// (GPU buffers) and by [`OfflineAssets`] (validation only).
pub trait AssetStore {
    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle;
    fn load_texture(&mut self, path: &Path) -> Result<TextureId>;
}

/// Mesh plus an optionally attached texture.  The mesh itself lives in the
/// asset store and may be shared by many scene nodes.
#[derive(Debug, Clone, Copy)]
pub struct MeshAsset {
    mesh: MeshHandle,
    texture: Option<TextureId>,
}

impl MeshAsset {
    pub fn new(mesh: MeshHandle) -> Self {
        Self {
            mesh,
            texture: None,
        }
    }

    /// Associates a previously loaded texture with this asset for later draws.
    pub fn attach_texture(&mut self, texture: TextureId) {
        self.texture = Some(texture);
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }
}

impl Drawable for MeshAsset {
    fn draw(&self, stage: &mut dyn ShaderStage) {
        stage.draw_mesh(self.mesh, self.texture);
    }
}

/// Everything written to a [`StageRecorder`], in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    Mat4(String, Mat4),
    Vec3(String, Vec3),
    Vec4(String, Vec4),
    Vec4Array(String, Vec<Vec4>),
    Float(String, f32),
    Draw(MeshHandle, Option<TextureId>),
}

/// Stage implementation that records every call instead of touching a GPU.
/// Used by the headless summary mode and by the unit tests.
#[derive(Debug, Default)]
pub struct StageRecorder {
    events: Vec<StageEvent>,
    mat4s: HashMap<String, Mat4>,
    vec3s: HashMap<String, Vec3>,
    vec4s: HashMap<String, Vec4>,
    vec4_arrays: HashMap<String, Vec<Vec4>>,
    floats: HashMap<String, f32>,
}

impl StageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }

    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        self.mat4s.get(name).copied()
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        self.vec3s.get(name).copied()
    }

    pub fn vec4(&self, name: &str) -> Option<Vec4> {
        self.vec4s.get(name).copied()
    }

    pub fn vec4_array(&self, name: &str) -> Option<&[Vec4]> {
        self.vec4_arrays.get(name).map(Vec::as_slice)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        self.floats.get(name).copied()
    }

    pub fn draw_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, StageEvent::Draw(..)))
            .count()
    }

    /// The `model` matrix that was current at each draw, in draw order.
    pub fn models_at_draws(&self) -> Vec<Mat4> {
        let mut current = Mat4::IDENTITY;
        let mut models = Vec::new();
        for event in &self.events {
            match event {
                StageEvent::Mat4(name, value) if name == "model" => current = *value,
                StageEvent::Draw(..) => models.push(current),
                _ => {}
            }
        }
        models
    }
}

impl ShaderStage for StageRecorder {
    fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.mat4s.insert(name.to_string(), value);
        self.events.push(StageEvent::Mat4(name.to_string(), value));
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.vec3s.insert(name.to_string(), value);
        self.events.push(StageEvent::Vec3(name.to_string(), value));
    }

    fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.vec4s.insert(name.to_string(), value);
        self.events.push(StageEvent::Vec4(name.to_string(), value));
    }

    fn set_vec4_array(&mut self, name: &str, values: &[Vec4]) {
        self.vec4_arrays.insert(name.to_string(), values.to_vec());
        self.events
            .push(StageEvent::Vec4Array(name.to_string(), values.to_vec()));
    }

    fn set_f32(&mut self, name: &str, value: f32) {
        self.floats.insert(name.to_string(), value);
        self.events.push(StageEvent::Float(name.to_string(), value));
    }

    fn draw_mesh(&mut self, mesh: MeshHandle, texture: Option<TextureId>) {
        self.events.push(StageEvent::Draw(mesh, texture));
    }
}

/// Asset store for headless runs: meshes get sequential handles, textures
/// are decoded to validate the file and then discarded.
#[derive(Debug, Default)]
pub struct OfflineAssets {
    meshes: u32,
    textures: u32,
}

impl OfflineAssets {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetStore for OfflineAssets {
    fn upload_mesh(&mut self, _mesh: &MeshData) -> MeshHandle {
        let handle = MeshHandle(self.meshes);
        self.meshes += 1;
        handle
    }

    fn load_texture(&mut self, path: &Path) -> Result<TextureId> {
        image::open(path).with_context(|| format!("failed to decode texture {}", path.display()))?;
        let id = TextureId(self.textures);
        self.textures += 1;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_asset_draws_with_attached_texture() {
        let mut asset = MeshAsset::new(MeshHandle(7));
        asset.attach_texture(TextureId(3));
        let mut stage = StageRecorder::new();
        asset.draw(&mut stage);
        assert_eq!(
            stage.events(),
            &[StageEvent::Draw(MeshHandle(7), Some(TextureId(3)))]
        );
    }

    #[test]
    fn recorder_tracks_last_value_and_order() {
        let mut stage = StageRecorder::new();
        stage.set_mat4("model", Mat4::from_scale(Vec3::splat(2.0)));
        stage.draw_mesh(MeshHandle(0), None);
        stage.set_mat4("model", Mat4::IDENTITY);
        stage.draw_mesh(MeshHandle(1), None);
        assert_eq!(stage.draw_count(), 2);
        let models = stage.models_at_draws();
        assert_eq!(models[0], Mat4::from_scale(Vec3::splat(2.0)));
        assert_eq!(models[1], Mat4::IDENTITY);
    }

    #[test]
    fn offline_store_hands_out_sequential_mesh_handles() {
        let mut store = OfflineAssets::new();
        let mesh = MeshData::default();
        assert_eq!(store.upload_mesh(&mesh), MeshHandle(0));
        assert_eq!(store.upload_mesh(&mesh), MeshHandle(1));
    }
}
