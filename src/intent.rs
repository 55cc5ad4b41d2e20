//! Input snapshot.
//!
//! The host writes a [`RagdollIntent`] every frame from whatever input source
//! it uses (keyboard, gamepad, AI). The controller only reads it.

use bevy::prelude::*;

use crate::skeleton::Side;

/// Per-frame control input of a ragdoll character.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use active_ragdoll_controller::prelude::*;
///
/// let mut intent = RagdollIntent::new();
/// intent.set_movement(Vec2::new(0.0, 2.0));
/// assert_eq!(intent.movement.y, 1.0);
///
/// intent.set_grab(Side::Left, 1.0);
/// assert!(intent.is_grabbing(Side::Left));
/// assert!(!intent.is_grabbing(Side::Right));
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct RagdollIntent {
    /// Movement axis. `x` strafes/turns, `y` walks forward (+) or back (-).
    pub movement: Vec2,
    /// Aim axis. `y` pitches the torso and reaching arms.
    pub aim: Vec2,
    /// Jump level. Anything above zero counts as pressed.
    pub jump: f32,
    /// Grab level per side, indexed by [`Side::index`]. Zero means released.
    pub grab: [f32; 2],
    /// Punch button per side, indexed by [`Side::index`].
    pub punch: [bool; 2],
    /// Camera look direction, used for camera-relative steering.
    pub look_direction: Vec3,
}

impl Default for RagdollIntent {
    fn default() -> Self {
        Self {
            movement: Vec2::ZERO,
            aim: Vec2::ZERO,
            jump: 0.0,
            grab: [0.0; 2],
            punch: [false; 2],
            look_direction: Vec3::Z,
        }
    }
}

impl RagdollIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the movement axis, clamping each component to [-1, 1].
    pub fn set_movement(&mut self, movement: Vec2) {
        self.movement = movement.clamp(Vec2::NEG_ONE, Vec2::ONE);
    }

    /// Set the aim axis, clamping each component to [-1, 1].
    pub fn set_aim(&mut self, aim: Vec2) {
        self.aim = aim.clamp(Vec2::NEG_ONE, Vec2::ONE);
    }

    pub fn set_jump(&mut self, pressed: bool) {
        self.jump = if pressed { 1.0 } else { 0.0 };
    }

    pub fn set_grab(&mut self, side: Side, level: f32) {
        self.grab[side.index()] = level;
    }

    pub fn set_punch(&mut self, side: Side, pressed: bool) {
        self.punch[side.index()] = pressed;
    }

    pub fn set_look_direction(&mut self, direction: Vec3) {
        self.look_direction = direction;
    }

    #[inline]
    pub fn grab(&self, side: Side) -> f32 {
        self.grab[side.index()]
    }

    #[inline]
    pub fn punch(&self, side: Side) -> bool {
        self.punch[side.index()]
    }

    #[inline]
    pub fn is_grabbing(&self, side: Side) -> bool {
        self.grab(side) != 0.0
    }

    #[inline]
    pub fn is_jump_pressed(&self) -> bool {
        self.jump > 0.0
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.movement != Vec2::ZERO
    }

    /// Release every input.
    pub fn clear(&mut self) {
        *self = Self {
            look_direction: self.look_direction,
            ..default()
        };
    }
}
