//! Core systems for an interactive 3D scene runtime.
//!
//! The crate exposes high level building blocks: a frame clock, an input
//! router, a free/chase camera, hierarchical scene nodes with material
//! presets, a packed multi-light uniform layer and a per-frame orchestrator.
//! The wgpu renderer implements the same [`shading`] seams as the recording
//! stage used by headless runs and tests, so everything above the GPU stays
//! testable without one.

pub mod app;
pub mod camera;
pub mod clock;
pub mod input;
pub mod lighting;
pub mod material;
pub mod mesh;
pub mod render;
pub mod scene;
pub mod shading;

pub use app::FrameOrchestrator;
pub use camera::{Camera, CameraMode, CameraSettings, MoveDirection};
pub use clock::FrameClock;
pub use input::{InputRouter, InputSnapshot, InputState, KeyBindings, KeyCode, MouseButton, NamedKey};
pub use lighting::{LightDescriptor, LightingUniformPack, MAX_LIGHTS};
pub use material::MaterialPreset;
pub use mesh::{load_obj_from_str, MeshData};
pub use render::{FrameEncoder, Renderer};
pub use scene::{build_demo_scene, render_group, DemoScene, SceneNode};
pub use shading::{AssetStore, Drawable, MeshAsset, OfflineAssets, ShaderStage, StageRecorder};
