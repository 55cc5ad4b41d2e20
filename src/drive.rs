//! Joint drive profiles.
//!
//! Every joint is pulled toward its target by a spring drive. Switching a
//! joint between the profiles below is what makes the body hold a pose or go
//! limp.

use bevy::prelude::*;

use crate::config::RagdollConfig;

/// Stiffness of the "off" profile. Weak enough to yield to external forces.
pub const DRIVE_OFF_STIFFNESS: f32 = 25.0;

/// Spring configuration of a joint's angular drive.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct DriveProfile {
    /// Spring stiffness pulling toward the target orientation.
    pub stiffness: f32,
    /// Spring damping. Zero for every profile the controller builds.
    pub damping: f32,
    /// Maximum drive force. Unbounded for every profile the controller builds.
    pub max_force: f32,
}

impl DriveProfile {
    /// An undamped spring with unbounded force.
    pub fn spring(stiffness: f32) -> Self {
        Self {
            stiffness,
            damping: 0.0,
            max_force: f32::INFINITY,
        }
    }
}

impl Default for DriveProfile {
    fn default() -> Self {
        Self::spring(DRIVE_OFF_STIFFNESS)
    }
}

/// The five drive profiles of a character, built once from its config.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct DriveProfiles {
    /// Root drive while balanced.
    pub balance_on: DriveProfile,
    /// Limb drive while holding a pose.
    pub pose_on: DriveProfile,
    /// Torso drive while an arm is reaching.
    pub core_stiffness: DriveProfile,
    /// Arm drive while reaching.
    pub reach_stiffness: DriveProfile,
    /// Limp drive used while ragdolled.
    pub drive_off: DriveProfile,
}

impl DriveProfiles {
    /// Build the profile table.
    ///
    /// `drive_off` is always strictly weaker than every active profile. When
    /// an active stiffness is at or below [`DRIVE_OFF_STIFFNESS`], the off
    /// stiffness drops to half the weakest active stiffness.
    pub fn from_config(config: &RagdollConfig) -> Self {
        let balance_on = DriveProfile::spring(config.balance_strength);
        let pose_on = DriveProfile::spring(config.limb_strength);
        let core_stiffness = DriveProfile::spring(config.core_strength);
        let reach_stiffness = DriveProfile::spring(config.reach_stiffness);

        let weakest = [balance_on, pose_on, core_stiffness, reach_stiffness]
            .iter()
            .map(|p| p.stiffness)
            .fold(f32::INFINITY, f32::min);

        let off = if DRIVE_OFF_STIFFNESS < weakest {
            DRIVE_OFF_STIFFNESS
        } else {
            let lowered = (weakest * 0.5).max(0.0);
            warn!(
                "active drive stiffness {weakest} does not exceed the off stiffness \
                 {DRIVE_OFF_STIFFNESS}; lowering off stiffness to {lowered}"
            );
            lowered
        };

        Self {
            balance_on,
            pose_on,
            core_stiffness,
            reach_stiffness,
            drive_off: DriveProfile::spring(off),
        }
    }

    fn active(&self) -> [DriveProfile; 4] {
        [
            self.balance_on,
            self.pose_on,
            self.core_stiffness,
            self.reach_stiffness,
        ]
    }

    /// Whether `drive_off` is weaker than every active profile.
    pub fn is_off_weakest(&self) -> bool {
        self.active()
            .iter()
            .all(|p| self.drive_off.stiffness < p.stiffness)
    }
}

impl Default for DriveProfiles {
    fn default() -> Self {
        Self::from_config(&RagdollConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profiles_match_config() {
        let drives = DriveProfiles::default();
        assert_eq!(drives.balance_on.stiffness, 5000.0);
        assert_eq!(drives.core_stiffness.stiffness, 1500.0);
        assert_eq!(drives.pose_on.stiffness, 500.0);
        assert_eq!(drives.reach_stiffness.stiffness, 2000.0);
        assert_eq!(drives.drive_off.stiffness, DRIVE_OFF_STIFFNESS);
    }

    #[test]
    fn profiles_are_undamped_and_unbounded() {
        let drives = DriveProfiles::default();
        for p in drives.active().into_iter().chain([drives.drive_off]) {
            assert_eq!(p.damping, 0.0);
            assert!(p.max_force.is_infinite());
        }
    }

    #[test]
    fn drive_off_is_strictly_weakest_for_positive_configs() {
        let values = [0.001, 0.5, 1.0, 12.0, 24.99, 25.0, 25.01, 300.0, 1.0e6];
        for &limb in &values {
            for &core in &values {
                let config = RagdollConfig {
                    limb_strength: limb,
                    core_strength: core,
                    ..default()
                };
                let drives = DriveProfiles::from_config(&config);
                assert!(
                    drives.is_off_weakest(),
                    "off {} not below limb {limb} / core {core}",
                    drives.drive_off.stiffness
                );
            }
        }
    }

    #[test]
    fn weak_config_lowers_off_stiffness() {
        let config = RagdollConfig {
            limb_strength: 10.0,
            ..default()
        };
        let drives = DriveProfiles::from_config(&config);
        assert_eq!(drives.drive_off.stiffness, 5.0);
    }
}
