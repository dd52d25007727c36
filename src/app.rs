use anyhow::Result;
use glam::{Mat4, Vec2, Vec3};
use log::info;

use crate::camera::{Camera, CameraMode, CameraSettings};
use crate::clock::FrameClock;
use crate::input::{FrameCommands, InputRouter, InputSnapshot};
use crate::lighting::LightingUniformPack;
use crate::scene::{render_group, DemoScene};
use crate::shading::ShaderStage;

const CAMERA_START: Vec3 = Vec3::new(0.0, 4.0, 20.0);
const FOLLOW_OFFSET: Vec3 = Vec3::new(0.0, 2.0, 5.0);
const FOLLOW_ANGLES: Vec2 = Vec2::new(-90.0, -20.0);
const SPIN_RATE_DEGREES: f32 = 720.0;
const ROVER_RADIUS: f32 = 12.0;
const ROVER_HEIGHT: f32 = 0.5;
const ROVER_SPEED: f32 = 0.4;

/// Per-frame driver: samples time, routes input, advances the animation and
/// issues the frame's uniform uploads and draws in a fixed order.
pub struct FrameOrchestrator {
    camera: Camera,
    clock: FrameClock,
    router: InputRouter,
    lighting: LightingUniformPack,
    scene: DemoScene,
    paused: bool,
    spin_direction: f32,
    spin_phase: f32,
    rover_angle: f32,
    should_exit: bool,
}

impl FrameOrchestrator {
    pub fn new(scene: DemoScene) -> Self {
        Self {
            camera: Camera::new(CameraSettings::default(), CAMERA_START),
            clock: FrameClock::new(),
            router: InputRouter::default(),
            lighting: LightingUniformPack::new(),
            scene,
            paused: false,
            spin_direction: 1.0,
            spin_phase: 0.0,
            rover_angle: 0.0,
            should_exit: false,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scene(&self) -> &DemoScene {
        &self.scene
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.update_screen_size(width, height);
    }

    /// Runs one frame: clock, input, animation, then uniforms and draws.
    pub fn advance(
        &mut self,
        snapshot: &InputSnapshot,
        stage: &mut dyn ShaderStage,
    ) -> Result<()> {
        let delta = self.clock.update_delta_time();
        self.clock.tick();

        let commands = self.router.process(snapshot, delta);
        self.apply_commands(&commands);
        self.animate(delta);

        stage.set_mat4("view", self.camera.view_matrix());
        stage.set_mat4("projection", self.camera.projection_matrix());
        self.lighting.collect(&self.scene.lights)?;
        self.lighting.upload_to(stage, self.camera.position());

        render_group(
            stage,
            &self.scene.stadium,
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            self.scene.stadium_scale,
        );
        for spinner in &self.scene.spinners {
            spinner.render(stage);
        }
        self.scene.rover.render(stage);
        Ok(())
    }

    fn apply_commands(&mut self, commands: &FrameCommands) {
        if commands.exit {
            self.should_exit = true;
        }
        if commands.toggle_pause {
            self.paused = !self.paused;
            info!("animation {}", if self.paused { "paused" } else { "running" });
        }
        if commands.toggle_spin {
            self.spin_direction = -self.spin_direction;
        }
        if commands.toggle_mode {
            let next = match self.camera.mode() {
                CameraMode::Free => CameraMode::Following,
                CameraMode::Following => CameraMode::Free,
            };
            self.camera.set_mode(next);
            info!("camera mode: {next:?}");
        }
        for (direction, amount) in &commands.moves {
            self.camera.process_keyboard(*direction, *amount);
        }
        if commands.look != Vec2::ZERO {
            self.camera
                .process_mouse_movement(commands.look.x, commands.look.y);
        }
        if commands.zoom != 0.0 {
            self.camera.process_mouse_scroll(commands.zoom);
        }
    }

    /// Advances the spinning boxes and the orbiting rover, then updates the
    /// chase camera when it is following.  Pause freezes the animation but
    /// leaves camera control untouched.
    fn animate(&mut self, delta: f32) {
        if !self.paused {
            self.spin_phase += self.spin_direction * SPIN_RATE_DEGREES.to_radians() * delta;
            self.rover_angle += ROVER_SPEED * delta;
        }

        // The two boxes counter-rotate around the same axis.
        self.scene.spinners[0].set_rotation(Mat4::from_rotation_y(self.spin_phase));
        self.scene.spinners[1].set_rotation(Mat4::from_rotation_y(-self.spin_phase));

        let rover_position = Vec3::new(
            self.rover_angle.cos() * ROVER_RADIUS,
            ROVER_HEIGHT,
            self.rover_angle.sin() * ROVER_RADIUS,
        );
        self.scene
            .rover
            .set_translation(Mat4::from_translation(rover_position));
        self.scene
            .rover
            .set_rotation(Mat4::from_rotation_y(-self.rover_angle));

        if self.camera.mode() == CameraMode::Following {
            self.camera
                .follow_position(rover_position, FOLLOW_OFFSET, FOLLOW_ANGLES);
        }
    }

    /// Human-readable state dump printed at shutdown and in headless runs.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec!["Final scene state:".to_string()];
        for node in self.scene.nodes() {
            let position = node.position();
            lines.push(format!(
                " - {} pos=({:.2}, {:.2}, {:.2}) material={:?}",
                node.name(),
                position.x,
                position.y,
                position.z,
                node.material()
            ));
        }
        let camera_position = self.camera.position();
        lines.push(format!(
            "camera mode={:?} pos=({:.2}, {:.2}, {:.2}) fov={:.1}",
            self.camera.mode(),
            camera_position.x,
            camera_position.y,
            camera_position.z,
            self.camera.fov()
        ));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyCode, NamedKey};
    use crate::scene::build_demo_scene;
    use crate::shading::{OfflineAssets, StageRecorder};

    fn orchestrator() -> FrameOrchestrator {
        let mut assets = OfflineAssets::new();
        let scene = build_demo_scene(&mut assets, None).unwrap();
        FrameOrchestrator::new(scene)
    }

    #[test]
    fn advance_uploads_camera_and_lights_and_draws_every_node() {
        let mut app = orchestrator();
        let mut stage = StageRecorder::new();
        app.advance(&InputSnapshot::default(), &mut stage).unwrap();

        assert!(stage.mat4("view").is_some());
        assert!(stage.mat4("projection").is_some());
        assert_eq!(stage.vec4_array("lightPosArray").unwrap().len(), 3);
        assert!(stage.vec3("eyePos").is_some());
        assert_eq!(stage.draw_count(), app.scene().node_count());
    }

    #[test]
    fn mode_toggle_held_for_many_frames_flips_once() {
        let mut app = orchestrator();
        let held = InputSnapshot::with_keys(&[KeyCode::Character('F')]);
        for _ in 0..5 {
            let mut stage = StageRecorder::new();
            app.advance(&held, &mut stage).unwrap();
        }
        assert_eq!(app.camera().mode(), CameraMode::Following);
    }

    #[test]
    fn following_camera_sits_at_the_chase_offset() {
        let mut app = orchestrator();
        let toggle = InputSnapshot::with_keys(&[KeyCode::Character('F')]);
        let mut stage = StageRecorder::new();
        app.advance(&toggle, &mut stage).unwrap();

        // First frame has a zero delta, so the rover is still at angle zero.
        let expected = Vec3::new(ROVER_RADIUS, ROVER_HEIGHT, 0.0) + FOLLOW_OFFSET;
        assert!(app.camera().position().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn pause_freezes_the_animation() {
        let mut app = orchestrator();
        app.animate(0.1);
        let phase = app.spin_phase;
        assert!(phase > 0.0);

        let pause = InputSnapshot::with_keys(&[KeyCode::Named(NamedKey::Space)]);
        let mut stage = StageRecorder::new();
        app.advance(&pause, &mut stage).unwrap();
        assert!(app.paused);

        app.animate(0.1);
        assert_eq!(app.spin_phase, phase);
        let angle = app.rover_angle;
        app.animate(0.1);
        assert_eq!(app.rover_angle, angle);
    }

    #[test]
    fn spin_toggle_reverses_direction() {
        let mut app = orchestrator();
        app.animate(0.01);
        let rising = app.spin_phase;

        let toggle = InputSnapshot::with_keys(&[KeyCode::Character('R')]);
        let mut stage = StageRecorder::new();
        app.advance(&toggle, &mut stage).unwrap();
        assert_eq!(app.spin_direction, -1.0);

        app.animate(0.01);
        assert!(app.spin_phase < rising);
    }

    #[test]
    fn escape_requests_exit() {
        let mut app = orchestrator();
        let escape = InputSnapshot::with_keys(&[KeyCode::Named(NamedKey::Escape)]);
        let mut stage = StageRecorder::new();
        app.advance(&escape, &mut stage).unwrap();
        assert!(app.should_exit());
    }

    #[test]
    fn summary_names_every_node_and_the_camera() {
        let app = orchestrator();
        let lines = app.summary_lines();
        assert_eq!(lines.len(), 1 + app.scene().node_count() + 1);
        assert!(lines.iter().any(|line| line.contains("Rover")));
        assert!(lines.last().unwrap().starts_with("camera mode=Free"));
    }
}
