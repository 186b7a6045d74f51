//! Input handling (winit -> engine state).
//!
//! `Windowing` forwards window events here; viewers read the resulting `InputState`
//! once per tick and then call `begin_frame`.

use std::collections::HashSet;

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::Key;

/// Pixels per wheel "line" when a device reports pixel deltas.
const PIXELS_PER_LINE: f32 = 40.0;

/// Input accumulated since the last `begin_frame`.
#[derive(Default, Debug, Clone)]
pub struct InputState {
    pub keys_down: HashSet<Key>,
    pub keys_pressed: HashSet<Key>,

    pub mouse_down: HashSet<MouseButton>,

    /// Cursor position in physical pixels.
    pub cursor_pos: Option<(f32, f32)>,

    /// Cursor travel since the last frame, only counted while a button is held.
    pub drag_delta: (f32, f32),

    /// Wheel lines since the last frame; positive scrolls away from the user.
    pub wheel_delta: f32,
}

impl InputState {
    /// Clears per-frame accumulators.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.drag_delta = (0.0, 0.0);
        self.wheel_delta = 0.0;
    }

    #[inline]
    pub fn key_pressed(&self, key: &Key) -> bool {
        self.keys_pressed.contains(key)
    }

    #[inline]
    pub fn button_down(&self, button: MouseButton) -> bool {
        self.mouse_down.contains(&button)
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.mouse_down.insert(button);
        } else {
            self.mouse_down.remove(&button);
        }
    }

    pub fn on_cursor_moved(&mut self, x: f32, y: f32) {
        if let Some((px, py)) = self.cursor_pos {
            if !self.mouse_down.is_empty() {
                self.drag_delta.0 += x - px;
                self.drag_delta.1 += y - py;
            }
        }
        self.cursor_pos = Some((x, y));
    }

    pub fn on_wheel(&mut self, lines: f32) {
        self.wheel_delta += lines;
    }

    pub fn on_key(&mut self, key: Key, pressed: bool) {
        if pressed {
            if self.keys_down.insert(key.clone()) {
                self.keys_pressed.insert(key);
            }
        } else {
            self.keys_down.remove(&key);
        }
    }
}

/// Stateful input event processor.
#[derive(Default, Debug, Clone)]
pub struct UserInput {
    state: InputState,
}

impl UserInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut InputState {
        &mut self.state
    }

    pub fn begin_frame(&mut self) {
        self.state.begin_frame();
    }

    /// Returns `true` if the event was consumed as input.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                self.state.on_key(
                    event.logical_key.clone(),
                    event.state == ElementState::Pressed,
                );
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.state
                    .on_mouse_button(*button, *state == ElementState::Pressed);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.state
                    .on_cursor_moved(position.x as f32, position.y as f32);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.state.cursor_pos = None;
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                self.state.on_wheel(lines);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::NamedKey;

    #[test]
    fn drag_counts_only_while_a_button_is_held() {
        let mut s = InputState::default();
        s.on_cursor_moved(10.0, 10.0);
        s.on_cursor_moved(20.0, 10.0);
        assert_eq!(s.drag_delta, (0.0, 0.0));

        s.on_mouse_button(MouseButton::Left, true);
        s.on_cursor_moved(25.0, 7.0);
        s.on_cursor_moved(30.0, 5.0);
        assert_eq!(s.drag_delta, (10.0, -5.0));

        s.begin_frame();
        assert_eq!(s.drag_delta, (0.0, 0.0));
        assert!(s.button_down(MouseButton::Left));
    }

    #[test]
    fn key_repeat_is_not_a_new_press() {
        let mut s = InputState::default();
        let right = Key::Named(NamedKey::ArrowRight);

        s.on_key(right.clone(), true);
        assert!(s.key_pressed(&right));
        s.begin_frame();

        s.on_key(right.clone(), true);
        assert!(!s.key_pressed(&right));

        s.on_key(right.clone(), false);
        s.on_key(right.clone(), true);
        assert!(s.key_pressed(&right));
    }
}
