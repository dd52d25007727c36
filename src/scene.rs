use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3, Vec4};

use crate::lighting::LightDescriptor;
use crate::material::MaterialPreset;
use crate::mesh::load_obj_from_str;
use crate::shading::{AssetStore, Drawable, MeshAsset, ShaderStage, TextureId};

/// Transform and material wrapper around a renderable asset.
///
/// A node owns its three base transforms but only borrows the asset, which
/// may be shared by any number of sibling nodes using the same geometry.
pub struct SceneNode {
    name: String,
    asset: Arc<dyn Drawable>,
    material: MaterialPreset,
    translation: Mat4,
    rotation: Mat4,
    scale: Mat4,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, asset: Arc<dyn Drawable>, material: MaterialPreset) -> Self {
        Self {
            name: name.into(),
            asset,
            material,
            translation: Mat4::IDENTITY,
            rotation: Mat4::IDENTITY,
            scale: Mat4::IDENTITY,
        }
    }

    pub fn with_translation(mut self, translation: Mat4) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: Mat4) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Mat4) -> Self {
        self.scale = scale;
        self
    }

    pub fn set_translation(&mut self, translation: Mat4) {
        self.translation = translation;
    }

    pub fn set_rotation(&mut self, rotation: Mat4) {
        self.rotation = rotation;
    }

    pub fn set_scale(&mut self, scale: Mat4) {
        self.scale = scale;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn material(&self) -> MaterialPreset {
        self.material
    }

    /// World position taken from the translation matrix.
    pub fn position(&self) -> Vec3 {
        self.translation.w_axis.truncate()
    }

    /// Effective model matrix.  The order is fixed: base translation,
    /// rotation, scale, then the caller-supplied override triple — local
    /// rotation always precedes the hierarchical override.
    pub fn model_matrix(
        &self,
        override_translate: Mat4,
        override_rotate: Mat4,
        override_scale: Mat4,
    ) -> Mat4 {
        self.translation * self.rotation * self.scale
            * override_translate
            * override_rotate
            * override_scale
    }

    /// Renders with identity overrides.
    pub fn render(&self, stage: &mut dyn ShaderStage) {
        self.render_with(stage, Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY);
    }

    /// Uploads the model matrix and material, then delegates drawing to the
    /// asset.  Mutates only shading-stage state, never the node itself.
    pub fn render_with(
        &self,
        stage: &mut dyn ShaderStage,
        override_translate: Mat4,
        override_rotate: Mat4,
        override_scale: Mat4,
    ) {
        let model = self.model_matrix(override_translate, override_rotate, override_scale);
        stage.set_mat4("model", model);
        self.material.apply(stage);
        self.asset.draw(stage);
    }
}

impl std::fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &self.name)
            .field("material", &self.material)
            .finish_non_exhaustive()
    }
}

/// Renders every node with the same override triple, in collection order.
/// This is how a multi-part structure shares one extra transform while each
/// part keeps its own base placement.
pub fn render_group(
    stage: &mut dyn ShaderStage,
    nodes: &[SceneNode],
    override_translate: Mat4,
    override_rotate: Mat4,
    override_scale: Mat4,
) {
    for node in nodes {
        node.render_with(stage, override_translate, override_rotate, override_scale);
    }
}

const PLANE_OBJ: &str = "\
v -1 0 -1
v 1 0 -1
v 1 0 1
v -1 0 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 1 0
f 1/1/1 4/4/1 3/3/1
f 1/1/1 3/3/1 2/2/1
";

const CUBE_OBJ: &str = "\
v -0.5 -0.5 -0.5
v 0.5 -0.5 -0.5
v 0.5 0.5 -0.5
v -0.5 0.5 -0.5
v -0.5 -0.5 0.5
v 0.5 -0.5 0.5
v 0.5 0.5 0.5
v -0.5 0.5 0.5
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 -1
vn 0 0 1
vn -1 0 0
vn 1 0 0
vn 0 -1 0
vn 0 1 0
f 1/1/1 4/4/1 3/3/1
f 1/1/1 3/3/1 2/2/1
f 5/1/2 6/2/2 7/3/2
f 5/1/2 7/3/2 8/4/2
f 1/1/3 5/2/3 8/3/3
f 1/1/3 8/3/3 4/4/3
f 2/1/4 3/4/4 7/3/4
f 2/1/4 7/3/4 6/2/4
f 1/1/5 2/2/5 6/3/5
f 1/1/5 6/3/5 5/4/5
f 4/1/6 8/4/6 7/3/6
f 4/1/6 7/3/6 3/2/6
";

/// The demo arena: a turf/stands group batch-rendered under one shared
/// scale, two counter-spinning boxes, and an orbiting rover that serves as
/// the follow-mode target.
#[derive(Debug)]
pub struct DemoScene {
    pub stadium: Vec<SceneNode>,
    pub stadium_scale: Mat4,
    pub spinners: Vec<SceneNode>,
    pub rover: SceneNode,
    pub lights: Vec<LightDescriptor>,
}

impl DemoScene {
    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.stadium
            .iter()
            .chain(self.spinners.iter())
            .chain(std::iter::once(&self.rover))
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }
}

/// Builds the demo scene, uploading its geometry through `assets`.  An
/// optional texture is attached to the spinning boxes.
pub fn build_demo_scene(
    assets: &mut dyn AssetStore,
    spinner_texture: Option<TextureId>,
) -> Result<DemoScene> {
    let plane = load_obj_from_str(PLANE_OBJ).context("built-in plane mesh is invalid")?;
    let cube = load_obj_from_str(CUBE_OBJ).context("built-in cube mesh is invalid")?;
    let plane_asset = Arc::new(MeshAsset::new(assets.upload_mesh(&plane)));
    let cube_handle = assets.upload_mesh(&cube);
    let cube_asset = Arc::new(MeshAsset::new(cube_handle));
    let spinner_asset = {
        let mut asset = MeshAsset::new(cube_handle);
        if let Some(texture) = spinner_texture {
            asset.attach_texture(texture);
        }
        Arc::new(asset)
    };

    let stadium = vec![
        SceneNode::new("Turf", plane_asset, MaterialPreset::Grass)
            .with_scale(Mat4::from_scale(Vec3::splat(5.0))),
        SceneNode::new("Stands", Arc::clone(&cube_asset) as Arc<dyn Drawable>, MaterialPreset::Wood)
            .with_translation(Mat4::from_translation(Vec3::new(0.0, -2.5, 0.0)))
            .with_scale(Mat4::from_scale(Vec3::new(9.2, 10.0, 10.0))),
    ];

    let spinners = vec![
        SceneNode::new(
            "SpinnerWest",
            Arc::clone(&spinner_asset) as Arc<dyn Drawable>,
            MaterialPreset::Brass,
        )
        .with_translation(Mat4::from_translation(Vec3::new(-3.0, 3.0, 0.0)))
        .with_scale(Mat4::from_scale(Vec3::splat(0.6))),
        SceneNode::new("SpinnerEast", spinner_asset, MaterialPreset::Brass)
            .with_translation(Mat4::from_translation(Vec3::new(3.0, 3.0, 0.0)))
            .with_scale(Mat4::from_scale(Vec3::splat(0.6))),
    ];

    let rover = SceneNode::new("Rover", cube_asset, MaterialPreset::Leather)
        .with_translation(Mat4::from_translation(Vec3::new(12.0, 0.5, 0.0)));

    let white = Vec4::new(1.0, 1.0, 1.0, 1.0);
    let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
    let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);
    let floodlight_ambient = Vec4::new(0.25, 0.25, 0.25, 1.0);
    let corner_ambient = Vec4::new(0.05, 0.05, 0.05, 1.0);
    let lights = vec![
        LightDescriptor::point(Vec3::new(0.0, 8.0, 0.0), white, floodlight_ambient),
        LightDescriptor::point(Vec3::new(20.0, 2.0, 0.0), red, corner_ambient),
        LightDescriptor::point(Vec3::new(-20.0, 2.0, 0.0), blue, corner_ambient),
    ];

    Ok(DemoScene {
        stadium,
        stadium_scale: Mat4::from_scale(Vec3::splat(0.5)),
        spinners,
        rover,
        lights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::MAX_LIGHTS;
    use crate::shading::{MeshHandle, OfflineAssets, StageEvent, StageRecorder};

    fn test_node(name: &str) -> SceneNode {
        SceneNode::new(
            name,
            Arc::new(MeshAsset::new(MeshHandle(0))),
            MaterialPreset::None,
        )
    }

    #[test]
    fn model_matrix_composes_in_fixed_order() {
        let translation = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let rotation = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let scale = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let node = test_node("n")
            .with_translation(translation)
            .with_rotation(rotation)
            .with_scale(scale);

        let override_t = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let override_r = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let override_s = Mat4::from_scale(Vec3::new(1.0, 3.0, 1.0));

        let expected = translation * rotation * scale * override_t * override_r * override_s;
        let actual = node.model_matrix(override_t, override_r, override_s);
        assert!(actual.abs_diff_eq(expected, 1e-6));

        // The override rotation must not commute past the base scale; a
        // reordered product would differ.
        let reordered = translation * rotation * override_r * scale * override_t * override_s;
        assert!(!actual.abs_diff_eq(reordered, 1e-4));
    }

    #[test]
    fn render_uploads_model_and_material_before_drawing() {
        let node = test_node("n").with_translation(Mat4::from_translation(Vec3::X));
        let mut stage = StageRecorder::new();
        node.render(&mut stage);

        let events = stage.events();
        assert!(matches!(&events[0], StageEvent::Mat4(name, _) if name == "model"));
        assert!(matches!(events.last(), Some(StageEvent::Draw(..))));
        assert!(stage.vec4("matAmbient").is_some());
    }

    #[test]
    fn batch_render_applies_shared_override_in_order() {
        let a = test_node("a").with_translation(Mat4::from_translation(Vec3::X));
        let b = test_node("b").with_translation(Mat4::from_translation(Vec3::Y));
        let shared_scale = Mat4::from_scale(Vec3::splat(0.5));

        let mut stage = StageRecorder::new();
        render_group(
            &mut stage,
            &[a, b],
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            shared_scale,
        );

        let models = stage.models_at_draws();
        assert_eq!(models.len(), 2);
        assert!(models[0].abs_diff_eq(Mat4::from_translation(Vec3::X) * shared_scale, 1e-6));
        assert!(models[1].abs_diff_eq(Mat4::from_translation(Vec3::Y) * shared_scale, 1e-6));
    }

    #[test]
    fn demo_scene_builds_with_expected_shape() {
        let mut assets = OfflineAssets::new();
        let scene = build_demo_scene(&mut assets, None).unwrap();
        assert_eq!(scene.node_count(), 5);
        assert_eq!(scene.lights.len(), MAX_LIGHTS);
        assert_eq!(scene.rover.name(), "Rover");
    }

    #[test]
    fn demo_scene_renders_one_draw_per_node() {
        let mut assets = OfflineAssets::new();
        let scene = build_demo_scene(&mut assets, None).unwrap();
        let mut stage = StageRecorder::new();
        render_group(
            &mut stage,
            &scene.stadium,
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            scene.stadium_scale,
        );
        for spinner in &scene.spinners {
            spinner.render(&mut stage);
        }
        scene.rover.render(&mut stage);
        assert_eq!(stage.draw_count(), scene.node_count());
    }
}
