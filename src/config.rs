//! Controller configuration.
//!
//! [`RagdollConfig`] carries every tunable of a character: movement, drive
//! strengths, gait timing, and the punch/knockout switches.

use bevy::prelude::*;

/// Configuration for an active ragdoll character.
///
/// # Example
///
/// ```rust
/// use active_ragdoll_controller::prelude::*;
///
/// let config = RagdollConfig::player()
///     .with_move_speed(12.0)
///     .with_knockout_velocity(30.0);
/// assert_eq!(config.move_speed, 12.0);
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct RagdollConfig {
    // === Movement ===
    /// Steer relative to the camera look direction instead of the body.
    pub camera_relative_movement: bool,
    /// Horizontal root speed at full input.
    pub move_speed: f32,
    /// Turning rate of the root target.
    pub turn_speed: f32,

    // === Jump ===
    /// Vertical root velocity while the jump is being driven.
    pub jump_speed: f32,
    /// How long the jump velocity is driven before the character is airborne (seconds).
    pub jump_window: f32,

    // === Balance ===
    /// Length of the downward ground probe from the root.
    pub balance_height: f32,
    /// Root speed below which the character may get back up.
    pub recovery_speed: f32,
    /// Get back up automatically once the recovery conditions hold.
    pub auto_recover: bool,

    // === Drive strengths ===
    /// Root stiffness while balanced.
    pub balance_strength: f32,
    /// Torso stiffness while reaching.
    pub core_strength: f32,
    /// Limb stiffness while holding a pose.
    pub limb_strength: f32,
    /// Arm stiffness while reaching.
    pub reach_stiffness: f32,

    // === Gait ===
    /// Predict walking from the center of mass relative to the feet.
    pub use_step_prediction: bool,
    /// Duration of a single step (seconds).
    pub step_duration: f32,
    /// Scale of the per-tick leg swing while stepping.
    pub step_height: f32,
    /// Downward force keeping the feet planted.
    pub foot_mount_force: f32,

    // === Arms ===
    /// Aim input divisor for arm and torso pitch.
    pub reach_sensitivity: f32,
    pub can_punch: bool,
    /// Impulse applied along the root's forward axis when a punch lands.
    pub punch_force: f32,
    /// Delay before a thrown arm returns to its rest pose (seconds).
    pub punch_return_delay: f32,

    // === Knockout ===
    pub can_be_knocked_out: bool,
    /// Relative collision speed that knocks the character down.
    pub knockout_velocity: f32,
}

impl Default for RagdollConfig {
    fn default() -> Self {
        Self {
            // Movement
            camera_relative_movement: true,
            move_speed: 10.0,
            turn_speed: 6.0,

            // Jump
            jump_speed: 18.0,
            jump_window: 0.2,

            // Balance
            balance_height: 2.5,
            recovery_speed: 1.0,
            auto_recover: true,

            // Drive strengths
            balance_strength: 5000.0,
            core_strength: 1500.0,
            limb_strength: 500.0,
            reach_stiffness: 2000.0,

            // Gait
            use_step_prediction: true,
            step_duration: 0.2,
            step_height: 1.7,
            foot_mount_force: 25.0,

            // Arms
            reach_sensitivity: 25.0,
            can_punch: true,
            punch_force: 15.0,
            punch_return_delay: 0.3,

            // Knockout
            can_be_knocked_out: true,
            knockout_velocity: 20.0,
        }
    }
}

impl RagdollConfig {
    /// Player-controlled character: camera-relative steering, punching enabled.
    pub fn player() -> Self {
        Self::default()
    }

    /// AI-controlled character: body-relative steering, no punching.
    pub fn npc() -> Self {
        Self {
            camera_relative_movement: false,
            can_punch: false,
            ..default()
        }
    }

    pub fn with_camera_relative_movement(mut self, enabled: bool) -> Self {
        self.camera_relative_movement = enabled;
        self
    }

    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    pub fn with_turn_speed(mut self, speed: f32) -> Self {
        self.turn_speed = speed;
        self
    }

    pub fn with_jump_speed(mut self, speed: f32) -> Self {
        self.jump_speed = speed;
        self
    }

    pub fn with_balance_height(mut self, height: f32) -> Self {
        self.balance_height = height;
        self
    }

    /// Set the four drive stiffnesses at once.
    pub fn with_drive_strengths(
        mut self,
        balance: f32,
        core: f32,
        limb: f32,
        reach: f32,
    ) -> Self {
        self.balance_strength = balance;
        self.core_strength = core;
        self.limb_strength = limb;
        self.reach_stiffness = reach;
        self
    }

    pub fn with_step_prediction(mut self, enabled: bool) -> Self {
        self.use_step_prediction = enabled;
        self
    }

    pub fn with_step_timing(mut self, duration: f32, height: f32) -> Self {
        self.step_duration = duration;
        self.step_height = height;
        self
    }

    pub fn with_punch(mut self, enabled: bool, force: f32) -> Self {
        self.can_punch = enabled;
        self.punch_force = force;
        self
    }

    pub fn with_knockout_velocity(mut self, velocity: f32) -> Self {
        self.knockout_velocity = velocity;
        self
    }

    pub fn with_auto_recover(mut self, enabled: bool) -> Self {
        self.auto_recover = enabled;
        self
    }
}
