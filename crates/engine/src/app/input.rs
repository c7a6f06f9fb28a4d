use crate::scene::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Action,
    Pause,
    Quit,
}

pub(crate) const ACTION_COUNT: usize = 7;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveUp,
        InputAction::MoveDown,
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Action,
        InputAction::Pause,
        InputAction::Quit,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Action => 4,
            InputAction::Pause => 5,
            InputAction::Quit => 6,
        }
    }
}

/// Per-tick state of one action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    Up,
    /// Went down since the previous tick.
    Pressed,
    Held,
    /// Went up since the previous tick.
    Released,
}

impl KeyState {
    pub fn is_down(self) -> bool {
        matches!(self, KeyState::Pressed | KeyState::Held)
    }

    /// State for the next tick given whether the key is physically down and
    /// whether it was pressed at any point since the last tick.
    pub(crate) fn advance(self, is_down: bool, pressed_since_last_tick: bool) -> KeyState {
        match (self.is_down(), is_down, pressed_since_last_tick) {
            (false, true, _) => KeyState::Pressed,
            // Released and pressed again between two ticks.
            (true, true, true) => KeyState::Pressed,
            (true, true, false) => KeyState::Held,
            (true, false, _) => KeyState::Released,
            // Tapped and released between two ticks.
            (false, false, true) => KeyState::Pressed,
            (false, false, false) => KeyState::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    states: [KeyState; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, state: KeyState) {
        self.states[action.index()] = state;
    }

    pub(crate) fn get(&self, action: InputAction) -> KeyState {
        self.states[action.index()]
    }
}

/// Input as seen by one fixed tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<Vec2>,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        cursor_position_px: Option<Vec2>,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            cursor_position_px,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn key_state(&self, action: InputAction) -> KeyState {
        self.actions.get(action)
    }

    pub fn just_pressed(&self, action: InputAction) -> bool {
        self.key_state(action) == KeyState::Pressed
    }

    /// True on the press tick and every tick after while the key stays down.
    pub fn is_held(&self, action: InputAction) -> bool {
        self.key_state(action).is_down()
    }

    pub fn just_released(&self, action: InputAction) -> bool {
        self.key_state(action) == KeyState::Released
    }

    /// Unit-ish direction from the four move actions, y up.
    pub fn move_axis(&self) -> Vec2 {
        let axis = |negative: InputAction, positive: InputAction| {
            let mut value = 0.0;
            if self.is_held(negative) {
                value -= 1.0;
            }
            if self.is_held(positive) {
                value += 1.0;
            }
            value
        };
        Vec2::new(
            axis(InputAction::MoveLeft, InputAction::MoveRight),
            axis(InputAction::MoveDown, InputAction::MoveUp),
        )
    }

    pub fn with_key_state(mut self, action: InputAction, state: KeyState) -> Self {
        self.actions.set(action, state);
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_state_walks_press_hold_release() {
        let pressed = KeyState::Up.advance(true, true);
        let held = pressed.advance(true, false);
        let released = held.advance(false, false);
        let up = released.advance(false, false);

        assert_eq!(pressed, KeyState::Pressed);
        assert_eq!(held, KeyState::Held);
        assert_eq!(released, KeyState::Released);
        assert_eq!(up, KeyState::Up);
    }

    #[test]
    fn tap_between_ticks_still_reports_press() {
        assert_eq!(KeyState::Up.advance(false, true), KeyState::Pressed);
        assert_eq!(KeyState::Pressed.advance(false, false), KeyState::Released);
        assert_eq!(KeyState::Held.advance(true, true), KeyState::Pressed);
    }

    #[test]
    fn is_held_covers_press_tick() {
        let snapshot = InputSnapshot::empty()
            .with_key_state(InputAction::Action, KeyState::Pressed)
            .with_key_state(InputAction::Pause, KeyState::Held);

        assert!(snapshot.just_pressed(InputAction::Action));
        assert!(snapshot.is_held(InputAction::Action));
        assert!(!snapshot.just_pressed(InputAction::Pause));
        assert!(snapshot.is_held(InputAction::Pause));
        assert!(!snapshot.is_held(InputAction::Quit));
    }

    #[test]
    fn move_axis_cancels_opposites() {
        let snapshot = InputSnapshot::empty()
            .with_key_state(InputAction::MoveLeft, KeyState::Held)
            .with_key_state(InputAction::MoveRight, KeyState::Held)
            .with_key_state(InputAction::MoveUp, KeyState::Pressed);
        assert_eq!(snapshot.move_axis(), Vec2::new(0.0, 1.0));
    }
}
