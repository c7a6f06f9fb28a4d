use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use thiserror::Error;
use tracing::debug;

/// Guard evaluated against caller-supplied context.
pub type Guard<C> = fn(&C) -> bool;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsmError {
    #[error("state {0} is not registered")]
    UnknownState(String),
    #[error("state {0} is already registered")]
    DuplicateState(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
}

struct Edge<S, C> {
    from: S,
    to: S,
    guard: Guard<C>,
}

/// Named states with guarded transitions, checked in registration order.
pub struct StateMachine<S, C> {
    current: S,
    names: HashMap<S, &'static str>,
    edges: Vec<Edge<S, C>>,
    time_in_state: f32,
}

impl<S, C> fmt::Debug for StateMachine<S, C>
where
    S: Copy + Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("state_count", &self.names.len())
            .field("transition_count", &self.edges.len())
            .field("time_in_state", &self.time_in_state)
            .finish()
    }
}

impl<S, C> StateMachine<S, C>
where
    S: Copy + Eq + Hash + fmt::Debug,
{
    pub fn new(initial: S, name: &'static str) -> Self {
        let mut names = HashMap::new();
        names.insert(initial, name);
        Self {
            current: initial,
            names,
            edges: Vec::new(),
            time_in_state: 0.0,
        }
    }

    pub fn add_state(&mut self, state: S, name: &'static str) -> Result<(), FsmError> {
        if self.names.contains_key(&state) {
            return Err(FsmError::DuplicateState(format!("{state:?}")));
        }
        self.names.insert(state, name);
        Ok(())
    }

    pub fn add_transition(&mut self, from: S, to: S, guard: Guard<C>) -> Result<(), FsmError> {
        self.ensure_registered(from)?;
        self.ensure_registered(to)?;
        self.edges.push(Edge { from, to, guard });
        Ok(())
    }

    /// Takes the first transition out of the current state whose guard
    /// passes. At most one transition fires per call.
    pub fn update(&mut self, context: &C) -> Option<Transition<S>> {
        let from = self.current;
        let to = self
            .edges
            .iter()
            .find(|edge| edge.from == from && (edge.guard)(context))
            .map(|edge| edge.to)?;
        self.enter(to);
        Some(Transition { from, to })
    }

    pub fn update_with_dt(&mut self, dt_seconds: f32, context: &C) -> Option<Transition<S>> {
        self.time_in_state += dt_seconds.max(0.0);
        self.update(context)
    }

    /// Jumps to `state` without consulting guards.
    pub fn force(&mut self, state: S) -> Result<(), FsmError> {
        self.ensure_registered(state)?;
        self.enter(state);
        Ok(())
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn current_name(&self) -> &'static str {
        self.names.get(&self.current).copied().unwrap_or("")
    }

    pub fn name_of(&self, state: S) -> Option<&'static str> {
        self.names.get(&state).copied()
    }

    pub fn is_in(&self, state: S) -> bool {
        self.current == state
    }

    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    fn enter(&mut self, state: S) {
        debug!(
            from = self.current_name(),
            to = self.name_of(state).unwrap_or(""),
            "fsm_transition"
        );
        self.current = state;
        self.time_in_state = 0.0;
    }

    fn ensure_registered(&self, state: S) -> Result<(), FsmError> {
        if self.names.contains_key(&state) {
            Ok(())
        } else {
            Err(FsmError::UnknownState(format!("{state:?}")))
        }
    }
}
