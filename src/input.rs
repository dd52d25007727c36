use std::collections::HashSet;

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::camera::MoveDirection;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
}

/// Friendly names for the non-character keys the runtime cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Escape,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// Live input state fed by window callbacks.
///
/// The frame loop never reads this directly; it calls
/// [`snapshot`](Self::snapshot) once per frame and hands the resulting value
/// object to the router, so callback timing cannot leak into mid-frame
/// state.  Look deltas only accumulate while the left mouse button is held
/// (drag-to-look), and the vertical axis is flipped so dragging up pitches
/// up.
#[derive(Debug, Default)]
pub struct InputState {
    keys: RwLock<HashSet<KeyCode>>,
    mouse_buttons: RwLock<HashSet<MouseButton>>,
    cursor: RwLock<Option<Vec2>>,
    look_delta: RwLock<Vec2>,
    scroll_delta: RwLock<f32>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&self, key: KeyCode) {
        self.keys.write().insert(key);
    }

    pub fn set_key_up(&self, key: KeyCode) {
        self.keys.write().remove(&key);
    }

    pub fn set_mouse_button_down(&self, button: MouseButton) {
        self.mouse_buttons.write().insert(button);
    }

    pub fn set_mouse_button_up(&self, button: MouseButton) {
        self.mouse_buttons.write().remove(&button);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.read().contains(&key)
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.read().contains(&button)
    }

    /// Records a cursor position, accumulating a look delta while the left
    /// button is held.  The first sample only establishes the reference.
    pub fn set_mouse_position(&self, position: Vec2) {
        let mut cursor = self.cursor.write();
        if let Some(previous) = *cursor {
            if self.is_mouse_button_down(MouseButton::LEFT) {
                let delta = Vec2::new(position.x - previous.x, previous.y - position.y);
                *self.look_delta.write() += delta;
            }
        }
        *cursor = Some(position);
    }

    pub fn add_scroll(&self, dy: f32) {
        *self.scroll_delta.write() += dy;
    }

    /// Drops all held keys, e.g. on focus loss.
    pub fn clear_keys(&self) {
        self.keys.write().clear();
    }

    /// Samples the current state into a plain value object, draining the
    /// accumulated look and scroll deltas.
    pub fn snapshot(&self) -> InputSnapshot {
        let look = std::mem::take(&mut *self.look_delta.write());
        let scroll = std::mem::take(&mut *self.scroll_delta.write());
        InputSnapshot {
            keys: self.keys.read().clone(),
            look,
            scroll,
        }
    }
}

/// One frame's worth of input, sampled once and consumed synchronously.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    pub keys: HashSet<KeyCode>,
    pub look: Vec2,
    pub scroll: f32,
}

impl InputSnapshot {
    pub fn is_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    #[cfg(test)]
    pub(crate) fn with_keys(keys: &[KeyCode]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
            ..Self::default()
        }
    }
}

/// Key mapping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub boost: KeyCode,
    pub toggle_mode: KeyCode,
    pub toggle_spin: KeyCode,
    pub toggle_pause: KeyCode,
    pub exit: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::Character('W'),
            backward: KeyCode::Character('S'),
            left: KeyCode::Character('A'),
            right: KeyCode::Character('D'),
            boost: KeyCode::Named(NamedKey::LeftShift),
            toggle_mode: KeyCode::Character('F'),
            toggle_spin: KeyCode::Character('R'),
            toggle_pause: KeyCode::Named(NamedKey::Space),
            exit: KeyCode::Named(NamedKey::Escape),
        }
    }
}

/// Converts a held key into a single event on the not-pressed → pressed
/// transition; resets when the key is released.
#[derive(Debug, Clone, Copy, Default)]
struct EdgeLatch {
    was_down: bool,
}

impl EdgeLatch {
    fn rising(&mut self, down: bool) -> bool {
        let fired = down && !self.was_down;
        self.was_down = down;
        fired
    }
}

/// Commands produced from one input snapshot.
#[derive(Debug, Clone, Default)]
pub struct FrameCommands {
    /// Movement requests, already scaled by `delta_time * speed`.
    pub moves: Vec<(MoveDirection, f32)>,
    pub look: Vec2,
    pub zoom: f32,
    pub toggle_mode: bool,
    pub toggle_spin: bool,
    pub toggle_pause: bool,
    pub exit: bool,
}

/// Translates per-frame input snapshots into continuous movement deltas and
/// edge-triggered one-shot commands.
#[derive(Debug)]
pub struct InputRouter {
    bindings: KeyBindings,
    normal_speed: f32,
    boost_speed: f32,
    mode_latch: EdgeLatch,
    spin_latch: EdgeLatch,
    pause_latch: EdgeLatch,
}

impl InputRouter {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            normal_speed: 2.0,
            boost_speed: 10.0,
            mode_latch: EdgeLatch::default(),
            spin_latch: EdgeLatch::default(),
            pause_latch: EdgeLatch::default(),
        }
    }

    pub fn process(&mut self, snapshot: &InputSnapshot, delta_time: f32) -> FrameCommands {
        let speed = if snapshot.is_down(self.bindings.boost) {
            self.boost_speed
        } else {
            self.normal_speed
        };
        let amount = speed * delta_time;

        let mut moves = Vec::new();
        for (key, direction) in [
            (self.bindings.forward, MoveDirection::Forward),
            (self.bindings.backward, MoveDirection::Backward),
            (self.bindings.left, MoveDirection::Left),
            (self.bindings.right, MoveDirection::Right),
        ] {
            if snapshot.is_down(key) {
                moves.push((direction, amount));
            }
        }

        FrameCommands {
            moves,
            look: snapshot.look,
            zoom: snapshot.scroll,
            toggle_mode: self
                .mode_latch
                .rising(snapshot.is_down(self.bindings.toggle_mode)),
            toggle_spin: self
                .spin_latch
                .rising(snapshot.is_down(self.bindings.toggle_spin)),
            toggle_pause: self
                .pause_latch
                .rising(snapshot.is_down(self.bindings.toggle_pause)),
            exit: snapshot.is_down(self.bindings.exit),
        }
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_state_tracks_keys() {
        let state = InputState::new();
        state.set_key_down(KeyCode::Character('W'));
        assert!(state.is_key_down(KeyCode::Character('W')));
        state.set_key_up(KeyCode::Character('W'));
        assert!(!state.is_key_down(KeyCode::Character('W')));
    }

    #[test]
    fn look_accumulates_only_while_dragging() {
        let state = InputState::new();
        state.set_mouse_position(Vec2::new(100.0, 100.0));
        state.set_mouse_position(Vec2::new(110.0, 90.0));
        assert_eq!(state.snapshot().look, Vec2::ZERO);

        state.set_mouse_button_down(MouseButton::LEFT);
        state.set_mouse_position(Vec2::new(120.0, 80.0));
        // x follows the cursor, y is reversed.
        assert_eq!(state.snapshot().look, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn snapshot_drains_accumulators() {
        let state = InputState::new();
        state.add_scroll(2.0);
        assert_eq!(state.snapshot().scroll, 2.0);
        assert_eq!(state.snapshot().scroll, 0.0);
    }

    #[test]
    fn held_toggle_fires_exactly_once() {
        let mut router = InputRouter::default();
        let held = InputSnapshot::with_keys(&[KeyCode::Character('F')]);
        let mut fired = 0;
        for _ in 0..10 {
            if router.process(&held, 0.016).toggle_mode {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);

        // Release resets the latch; the next press fires again.
        router.process(&InputSnapshot::default(), 0.016);
        assert!(router.process(&held, 0.016).toggle_mode);
    }

    #[test]
    fn movement_is_scaled_by_delta_and_speed() {
        let mut router = InputRouter::default();
        let walk = InputSnapshot::with_keys(&[KeyCode::Character('W')]);
        let commands = router.process(&walk, 0.5);
        assert_eq!(commands.moves, vec![(MoveDirection::Forward, 1.0)]);

        let sprint = InputSnapshot::with_keys(&[
            KeyCode::Character('W'),
            KeyCode::Named(NamedKey::LeftShift),
        ]);
        let commands = router.process(&sprint, 0.5);
        assert_eq!(commands.moves, vec![(MoveDirection::Forward, 5.0)]);
    }

    #[test]
    fn movement_repeats_every_frame_while_held() {
        let mut router = InputRouter::default();
        let held = InputSnapshot::with_keys(&[KeyCode::Character('D')]);
        for _ in 0..3 {
            let commands = router.process(&held, 0.016);
            assert_eq!(commands.moves.len(), 1);
        }
    }

    #[test]
    fn exit_is_level_triggered() {
        let mut router = InputRouter::default();
        let held = InputSnapshot::with_keys(&[KeyCode::Named(NamedKey::Escape)]);
        assert!(router.process(&held, 0.016).exit);
        assert!(router.process(&held, 0.016).exit);
    }
}
