use std::collections::HashSet;

use winit::keyboard::KeyCode;

/// Per-frame input snapshot fed by the window event loop and drained by
/// `App::update`. Mouse motion and scroll accumulate between frames.
#[derive(Debug, Default)]
pub struct InputState {
    pressed: HashSet<KeyCode>,
    mouse_delta: (f32, f32),
    scroll_delta: f32,
    /// Mouse look is active only while a button is held.
    pub look_active: bool,
}

impl InputState {
    pub fn set_key(&mut self, code: KeyCode, pressed: bool) {
        if pressed {
            self.pressed.insert(code);
        } else {
            self.pressed.remove(&code);
        }
    }

    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    pub fn add_mouse_delta(&mut self, dx: f32, dy: f32) {
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }

    pub fn add_scroll_delta(&mut self, dy: f32) {
        self.scroll_delta += dy;
    }

    pub fn take_mouse_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.mouse_delta)
    }

    pub fn take_scroll_delta(&mut self) -> f32 {
        std::mem::take(&mut self.scroll_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_track_press_and_release() {
        let mut input = InputState::default();
        input.set_key(KeyCode::KeyW, true);
        assert!(input.is_pressed(KeyCode::KeyW));
        input.set_key(KeyCode::KeyW, false);
        assert!(!input.is_pressed(KeyCode::KeyW));
    }

    #[test]
    fn mouse_delta_accumulates_and_drains() {
        let mut input = InputState::default();
        input.add_mouse_delta(2.0, -1.0);
        input.add_mouse_delta(1.0, 1.0);
        assert_eq!(input.take_mouse_delta(), (3.0, 0.0));
        assert_eq!(input.take_mouse_delta(), (0.0, 0.0));
    }

    #[test]
    fn scroll_drains_to_zero() {
        let mut input = InputState::default();
        input.add_scroll_delta(1.5);
        assert_eq!(input.take_scroll_delta(), 1.5);
        assert_eq!(input.take_scroll_delta(), 0.0);
    }
}
