//! Motion state machine.
//!
//! An [`Animator`] plays one registered [`Motion`] at a time and moves
//! between them along [`Transition`]s:
//!
//! ```text
//!            condition(motion, local_time)
//!   Playing(a) ───────────────────────────▶ Transitioning(a → b)
//!       ▲                                          │
//!       └──────── elapsed >= duration ─────────────┘  (now Playing(b))
//! ```
//!
//! Time is supplied by the caller on every call (seconds on any monotonic
//! clock). Two timestamps capture the clock state: `motion_start` (local
//! time zero of the playing / outgoing motion) and `state_start` (when the
//! current transition began).

use slotmap::{SecondaryMap, SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::animation::curve::InterpolationCurve;
use crate::animation::motion::Motion;
use crate::errors::{MarionetteError, Result};
use crate::pose::ModelPose;

new_key_type! {
    /// Handle to a registered motion state.
    pub struct StateKey;
    /// Handle to a registered transition.
    pub struct TransitionKey;
}

/// `(source motion, seconds since it started) -> fire?`
pub type TransitionCondition = Box<dyn Fn(&Motion, f32) -> bool + Send + Sync>;

/// Maps normalized transition progress in `[0, 1]` to a blend weight.
pub type TransitionCurve = Box<dyn Fn(f32) -> f32 + Send + Sync>;

/// A directed edge between two states.
pub struct Transition {
    pub from: StateKey,
    pub to: StateKey,
    /// Crossfade length in seconds.
    pub duration: f32,
    pub curve: TransitionCurve,
    pub condition: TransitionCondition,
}

impl Transition {
    /// Linear crossfade that fires once the source motion has played to
    /// its end.
    #[must_use]
    pub fn new(from: StateKey, to: StateKey, duration: f32) -> Self {
        Self {
            from,
            to,
            duration,
            curve: Box::new(|t| t),
            condition: Box::new(Self::motion_finished),
        }
    }

    /// Default condition: the source motion's duration has been exceeded.
    pub fn motion_finished(motion: &Motion, time: f32) -> bool {
        time >= motion.duration()
    }

    #[must_use]
    pub fn with_curve(mut self, curve: impl Fn(f32) -> f32 + Send + Sync + 'static) -> Self {
        self.curve = Box::new(curve);
        self
    }

    #[must_use]
    pub fn with_bezier(self, curve: InterpolationCurve) -> Self {
        self.with_curve(move |t| curve.evaluate(t))
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Fn(&Motion, f32) -> bool + Send + Sync + 'static) -> Self {
        self.condition = Box::new(condition);
        self
    }

    /// Blend weight of the destination after `elapsed` seconds.
    fn weight(&self, elapsed: f32) -> f32 {
        let progress = if self.duration > 0.0 {
            (elapsed / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        (self.curve)(progress)
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorPhase {
    /// No state registered yet.
    Idle,
    Playing(StateKey),
    Transitioning(TransitionKey),
}

/// Plays registered motions and crossfades between them.
#[derive(Debug)]
pub struct Animator {
    states: SlotMap<StateKey, Motion>,
    transitions: SlotMap<TransitionKey, Transition>,
    outgoing: SecondaryMap<StateKey, SmallVec<[TransitionKey; 4]>>,

    phase: AnimatorPhase,
    motion_start: f32,
    state_start: f32,
    paused_at: Option<f32>,

    scratch: Option<ModelPose>,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: SlotMap::with_key(),
            transitions: SlotMap::with_key(),
            outgoing: SecondaryMap::new(),
            phase: AnimatorPhase::Idle,
            motion_start: 0.0,
            state_start: 0.0,
            paused_at: None,
            scratch: None,
        }
    }

    /// Registers a motion. The first registered state becomes the playing
    /// state, starting at time zero.
    pub fn add_state(&mut self, motion: impl Into<Motion>) -> StateKey {
        let key = self.states.insert(motion.into());
        self.outgoing.insert(key, SmallVec::new());
        if self.phase == AnimatorPhase::Idle {
            self.phase = AnimatorPhase::Playing(key);
        }
        key
    }

    /// Registers a transition. Transitions leaving the same state are tested
    /// in registration order.
    pub fn add_transition(&mut self, transition: Transition) -> Result<TransitionKey> {
        if !self.states.contains_key(transition.from) || !self.states.contains_key(transition.to) {
            return Err(MarionetteError::UnknownState);
        }
        let from = transition.from;
        let key = self.transitions.insert(transition);
        if let Some(list) = self.outgoing.get_mut(from) {
            list.push(key);
        }
        Ok(key)
    }

    #[inline]
    pub fn state(&self, key: StateKey) -> Option<&Motion> {
        self.states.get(key)
    }

    #[inline]
    pub fn transition(&self, key: TransitionKey) -> Option<&Transition> {
        self.transitions.get(key)
    }

    #[inline]
    pub fn phase(&self) -> AnimatorPhase {
        self.phase
    }

    #[inline]
    pub fn is_transitioning(&self) -> bool {
        matches!(self.phase, AnimatorPhase::Transitioning(_))
    }

    /// The playing state, or the destination of a running transition.
    pub fn current_state(&self) -> Option<StateKey> {
        match self.phase {
            AnimatorPhase::Idle => None,
            AnimatorPhase::Playing(state) => Some(state),
            AnimatorPhase::Transitioning(t) => Some(self.transitions[t].to),
        }
    }

    /// Jumps to `state` without a crossfade.
    pub fn play(&mut self, state: StateKey, time: f32) -> Result<()> {
        if !self.states.contains_key(state) {
            return Err(MarionetteError::UnknownState);
        }
        let now = self.clock(time);
        self.phase = AnimatorPhase::Playing(state);
        self.motion_start = now;
        self.state_start = now;
        log::debug!("Animator jumped to {state:?}");
        Ok(())
    }

    // ========================================================================
    // Clock
    // ========================================================================

    /// Effective time: frozen while paused.
    #[inline]
    fn clock(&self, time: f32) -> f32 {
        self.paused_at.unwrap_or(time)
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn pause(&mut self, time: f32) {
        if self.paused_at.is_none() {
            self.paused_at = Some(time);
        }
    }

    /// Resumes from where [`pause`](Self::pause) froze the clock.
    pub fn resume(&mut self, time: f32) {
        if let Some(paused_at) = self.paused_at.take() {
            let gap = time - paused_at;
            self.motion_start += gap;
            self.state_start += gap;
        }
    }

    /// Restarts the current state from its beginning. A running transition
    /// is completed immediately.
    pub fn reset(&mut self, time: f32) {
        let now = self.clock(time);
        if let Some(state) = self.current_state() {
            self.phase = AnimatorPhase::Playing(state);
        }
        self.motion_start = now;
        self.state_start = now;
    }

    /// Seconds since the playing (or outgoing) motion started.
    pub fn local_time(&self, time: f32) -> f32 {
        self.clock(time) - self.motion_start
    }

    /// The playing motion has run past its duration and no transition is in
    /// progress. An idle animator is always finished.
    pub fn is_finished(&self, time: f32) -> bool {
        match self.phase {
            AnimatorPhase::Idle => true,
            AnimatorPhase::Playing(state) => self.local_time(time) >= self.states[state].duration(),
            AnimatorPhase::Transitioning(_) => false,
        }
    }

    // ========================================================================
    // Per-frame
    // ========================================================================

    /// Advances the state machine to `time`: commits a finished transition,
    /// or starts the first outgoing transition whose condition holds.
    pub fn update(&mut self, time: f32) {
        let now = self.clock(time);
        match self.phase {
            AnimatorPhase::Idle => {}
            AnimatorPhase::Transitioning(key) => {
                let transition = &self.transitions[key];
                if now - self.state_start >= transition.duration {
                    self.phase = AnimatorPhase::Playing(transition.to);
                    self.motion_start = now;
                    self.state_start = now;
                    log::debug!("Animator committed transition into {:?}", transition.to);
                }
            }
            AnimatorPhase::Playing(state) => {
                let motion = &self.states[state];
                let local_time = now - self.motion_start;
                let fired = self.outgoing[state]
                    .iter()
                    .copied()
                    .find(|&key| (self.transitions[key].condition)(motion, local_time));
                if let Some(key) = fired {
                    self.phase = AnimatorPhase::Transitioning(key);
                    self.state_start = now;
                }
            }
        }
    }

    /// Writes the local pose for `time` into `pose`. While transitioning,
    /// the outgoing motion is sampled at its own local time, the destination
    /// at the time since the transition began, and the two are blended by
    /// the transition curve. An idle animator leaves `pose` untouched.
    pub fn local_pose(&mut self, time: f32, pose: &mut ModelPose) {
        let now = self.clock(time);
        match self.phase {
            AnimatorPhase::Idle => {}
            AnimatorPhase::Playing(state) => {
                self.states[state].sample(now - self.motion_start, pose);
            }
            AnimatorPhase::Transitioning(key) => {
                let transition = &self.transitions[key];
                self.states[transition.from].sample(now - self.motion_start, pose);

                let elapsed = now - self.state_start;
                if elapsed <= 0.0 {
                    return;
                }

                if self.scratch.as_ref().is_none_or(|s| s.check_compatible(pose).is_err()) {
                    self.scratch = Some(ModelPose::new(pose.model()));
                }
                let Some(scratch) = self.scratch.as_mut() else {
                    return;
                };
                scratch.copy_local_from(pose);
                self.states[transition.to].sample(elapsed, scratch);

                pose.blend_with(scratch, transition.weight(elapsed));
            }
        }
    }
}
