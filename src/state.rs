//! Ragdoll state components.
//!
//! [`RagdollState`] is the single record of what a character is currently
//! doing. Every engine reads and writes it; nothing keeps a private copy.

use bevy::prelude::*;

use crate::skeleton::Side;

/// Step cycle state of one leg.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct LegState {
    /// The leg is currently swinging through a step.
    pub stepping: bool,
    /// Time spent in the current step (seconds).
    pub timer: f32,
    /// Alternation latch. Blocks the crossing trigger until the cycle resets.
    pub alert: bool,
}

/// Jump progress.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct JumpState {
    /// A jump was triggered and its velocity is still being driven.
    pub requested: bool,
    /// The root has left the ground under jump velocity.
    pub in_progress: bool,
    /// Time spent driving the jump (seconds).
    pub timer: f32,
}

/// Mutable state of an active ragdoll character.
///
/// Inserted by the controller when the character is initialized.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use active_ragdoll_controller::prelude::*;
///
/// fn report(q: Query<&RagdollState>) {
///     for state in &q {
///         if state.is_ragdoll() {
///             info!("character is down");
///         }
///     }
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
pub struct RagdollState {
    // === Balance ===
    /// Judged stable enough to hold poses.
    pub balanced: bool,
    /// Joint drives are currently off.
    pub is_ragdoll: bool,
    /// In the air after a jump, until the feet touch ground.
    pub airborne: bool,
    pub jump: JumpState,

    // === Arms ===
    /// Per-side reach flags, indexed by [`Side::index`].
    pub reaching: [bool; 2],
    /// Per-side punch flags, indexed by [`Side::index`].
    pub punching: [bool; 2],
    /// Pending return-to-rest after a punch lands.
    #[reflect(ignore)]
    pub punch_return: [Option<Timer>; 2],
    /// Grab coupling currently held by each hand.
    #[reflect(ignore)]
    pub grab_coupling: [Option<Entity>; 2],
    /// Accumulated arm aim while reaching.
    pub arm_aim: f32,
    /// Accumulated torso pitch.
    pub body_aim: f32,

    // === Gait ===
    pub walk_forward: bool,
    pub walk_backward: bool,
    /// Per-leg step state, indexed by [`Side::index`].
    pub legs: [LegState; 2],
    /// A movement key is held.
    pub key_held: bool,
    /// Movement input was consumed for the current press.
    pub move_axis_used: bool,
    /// Jump input was consumed for the current press.
    pub jump_axis_used: bool,

    /// Return the arms and torso to the rest pose on the next physics tick.
    pub reset_pose: bool,
}

impl Default for RagdollState {
    fn default() -> Self {
        Self {
            balanced: true,
            is_ragdoll: false,
            airborne: false,
            jump: JumpState::default(),
            reaching: [false; 2],
            punching: [false; 2],
            punch_return: [None, None],
            grab_coupling: [None; 2],
            arm_aim: 0.0,
            body_aim: 0.0,
            walk_forward: false,
            walk_backward: false,
            legs: [LegState::default(); 2],
            key_held: false,
            move_axis_used: false,
            jump_axis_used: false,
            reset_pose: false,
        }
    }
}

impl RagdollState {
    #[inline]
    pub fn is_airborne(&self) -> bool {
        self.airborne
    }

    #[inline]
    pub fn is_ragdoll(&self) -> bool {
        self.is_ragdoll
    }

    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.balanced
    }

    /// Jump velocity is being driven.
    #[inline]
    pub fn is_jumping(&self) -> bool {
        self.jump.requested || self.jump.in_progress
    }

    #[inline]
    pub fn is_walking(&self) -> bool {
        self.walk_forward || self.walk_backward
    }

    #[inline]
    pub fn is_punching(&self, side: Side) -> bool {
        self.punching[side.index()]
    }

    #[inline]
    pub fn is_reaching(&self, side: Side) -> bool {
        self.reaching[side.index()]
    }

    #[inline]
    pub fn is_grabbing(&self, side: Side) -> bool {
        self.grab_coupling[side.index()].is_some()
    }

    pub fn any_reaching(&self) -> bool {
        self.reaching.iter().any(|r| *r)
    }

    /// The drive configuration disagrees with the balance decision.
    pub fn drives_stale(&self) -> bool {
        self.balanced == self.is_ragdoll
    }

    #[inline]
    pub fn leg(&self, side: Side) -> &LegState {
        &self.legs[side.index()]
    }

    #[inline]
    pub fn leg_mut(&mut self, side: Side) -> &mut LegState {
        &mut self.legs[side.index()]
    }
}

/// Result of the downward ground probe under the root.
///
/// Written by the physics backend before the controller runs each frame.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct GroundSensor {
    pub grounded: bool,
    /// Distance from the root to the ground hit. Zero when not grounded.
    pub distance: f32,
}

impl GroundSensor {
    pub fn hit(distance: f32) -> Self {
        Self {
            grounded: true,
            distance,
        }
    }

    pub fn miss() -> Self {
        Self::default()
    }
}

/// World-space center of mass of a character, refreshed every frame.
///
/// Useful as a camera follow target.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Deref)]
#[reflect(Component)]
pub struct CenterOfMass(pub Vec3);
