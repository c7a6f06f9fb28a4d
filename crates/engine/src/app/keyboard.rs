use std::collections::HashSet;

use winit::event::ElementState;
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::scene::Vec2;

use super::input::{ActionStates, InputAction, InputSnapshot};

/// Window events folded into the state the next fixed tick should see.
///
/// Presses are latched until a tick consumes them, so a tap that lands
/// entirely between two ticks still shows up as `Pressed` once.
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    quit_requested: bool,
    down: HashSet<InputAction>,
    latched: HashSet<InputAction>,
    states: ActionStates,
    cursor_px: Option<Vec2>,
    window_size: (u32, u32),
}

impl InputCollector {
    pub(crate) fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_size: (window_width, window_height),
            ..Self::default()
        }
    }

    pub(crate) fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub(crate) fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    pub(crate) fn key(&mut self, key: PhysicalKey, state: ElementState) {
        let Some(action) = bound_action(key) else {
            return;
        };
        if state == ElementState::Released {
            self.down.remove(&action);
            return;
        }
        // Auto-repeat re-sends Pressed for a key that is already down.
        if self.down.insert(action) {
            self.latched.insert(action);
        }
        if action == InputAction::Quit {
            self.request_quit();
        }
    }

    pub(crate) fn cursor_moved(&mut self, x: f32, y: f32) {
        self.cursor_px = Some(Vec2::new(x, y));
    }

    pub(crate) fn cursor_left(&mut self) {
        self.cursor_px = None;
    }

    pub(crate) fn resized(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
    }

    /// Advances every action one tick and clears the press latch.
    pub(crate) fn next_snapshot(&mut self) -> InputSnapshot {
        for action in InputAction::ALL {
            let previous = self.states.get(action);
            let next = previous.advance(self.down.contains(&action), self.latched.contains(&action));
            self.states.set(action, next);
        }
        self.latched.clear();

        let (width, height) = self.window_size;
        InputSnapshot::new(self.quit_requested, self.states, self.cursor_px, width, height)
    }
}

fn bound_action(key: PhysicalKey) -> Option<InputAction> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let action = match code {
        KeyCode::KeyW | KeyCode::ArrowUp => InputAction::MoveUp,
        KeyCode::KeyS | KeyCode::ArrowDown => InputAction::MoveDown,
        KeyCode::KeyA | KeyCode::ArrowLeft => InputAction::MoveLeft,
        KeyCode::KeyD | KeyCode::ArrowRight => InputAction::MoveRight,
        KeyCode::Space | KeyCode::Enter => InputAction::Action,
        KeyCode::KeyP => InputAction::Pause,
        KeyCode::Escape => InputAction::Quit,
        _ => return None,
    };
    Some(action)
}
