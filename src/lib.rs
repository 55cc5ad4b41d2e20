//! # `active_ragdoll_controller`
//!
//! A physics-driven active ragdoll character controller with physics backend
//! abstraction.
//!
//! The character is a thirteen-part ragdoll whose joints are driven toward
//! target orientations. This crate provides the controller that:
//! - Keeps the ragdoll upright while a ground probe finds ground under its root
//! - Goes limp when balance is lost and gets back up once it settles
//! - Walks with an alternating two-leg step cycle predicted from the center of mass
//! - Reaches and grabs with either arm, throws punches, and jumps
//! - Gets knocked out by hard impacts
//! - Abstracts physics backend for easy swapping (Rapier3D included)
//!
//! ## Architecture
//!
//! Every tick runs in two phases:
//! 1. A variable-rate frame phase reads [`RagdollIntent`](intent::RagdollIntent),
//!    steers the arms and decides balance from the ground probe
//! 2. A fixed-rate physics phase blends root velocity, turns the root and
//!    drives the gait and jump
//!
//! The controller never owns physics. It writes joint targets and drives to
//! [`RagdollJoint`](skeleton::RagdollJoint) and requests velocity changes and
//! impulses through a [`RagdollPhysicsBackend`](backend::RagdollPhysicsBackend).
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use active_ragdoll_controller::prelude::*;
//!
//! let mut world = World::new();
//! let mut skeleton = Skeleton::new();
//! for part in BodyPart::ALL {
//!     skeleton.insert(part, world.spawn(RagdollJoint::new(part)).id());
//! }
//! assert!(skeleton.validate().is_ok());
//!
//! // Spawned together, these are picked up by the plugin on the next update
//! let character = (skeleton, RagdollConfig::player(), RagdollIntent::default());
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod balance;
pub mod collision;
pub mod config;
pub mod controller;
pub mod drive;
pub mod grab;
pub mod impact;
pub mod intent;
pub mod jump;
pub mod kinematic;
pub mod locomotion;
pub mod pose;
pub mod punch;
pub mod reach;
pub mod rig;
pub mod skeleton;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

#[cfg(test)]
mod testing;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::RagdollPhysicsBackend;
    pub use crate::collision::{FeetGrounded, Grabbable, Ground, HandContact, RagdollImpact};
    pub use crate::config::RagdollConfig;
    pub use crate::drive::{DriveProfile, DriveProfiles};
    pub use crate::intent::RagdollIntent;
    pub use crate::kinematic::{KinematicBackend, KinematicBody, KinematicEnvironment};
    pub use crate::pose::DefaultPose;
    pub use crate::skeleton::{BodyPart, GrabHand, RagdollJoint, Side, Skeleton, SkeletonError};
    pub use crate::state::{CenterOfMass, GroundSensor, RagdollState};
    pub use crate::{ActiveRagdollPlugin, RagdollSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dPartBundle};
}

/// System sets of the controller.
///
/// The `Update` sets run chained in declaration order. [`RagdollSet::Motion`]
/// runs in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RagdollSet {
    /// New characters are validated and linked to their parts.
    Setup,
    /// Backends write [`GroundSensor`](state::GroundSensor).
    Sensors,
    /// The frame phase.
    Control,
    /// Contact events are applied.
    Contacts,
    /// Backends push joint targets and drives into the physics joints.
    FinalApplication,
    /// The physics phase.
    Motion,
}

/// Main plugin for the active ragdoll controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (velocities, impulses, joint motors, ground probes).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use active_ragdoll_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(ActiveRagdollPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct ActiveRagdollPlugin<B: backend::RagdollPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::RagdollPhysicsBackend> Default for ActiveRagdollPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::RagdollPhysicsBackend> Plugin for ActiveRagdollPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::RagdollConfig>();
        app.register_type::<intent::RagdollIntent>();
        app.register_type::<drive::DriveProfiles>();
        app.register_type::<pose::DefaultPose>();
        app.register_type::<skeleton::RagdollJoint>();
        app.register_type::<skeleton::GrabHand>();
        app.register_type::<state::RagdollState>();
        app.register_type::<state::GroundSensor>();
        app.register_type::<state::CenterOfMass>();
        app.register_type::<collision::Ground>();
        app.register_type::<collision::Grabbable>();

        app.add_event::<collision::RagdollImpact>();
        app.add_event::<collision::FeetGrounded>();
        app.add_event::<collision::HandContact>();

        app.configure_sets(
            Update,
            (
                RagdollSet::Setup,
                RagdollSet::Sensors,
                RagdollSet::Control,
                RagdollSet::Contacts,
                RagdollSet::FinalApplication,
            )
                .chain(),
        );
        app.configure_sets(FixedUpdate, RagdollSet::Motion);

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            Update,
            (
                systems::initialize_ragdolls::<B>.in_set(RagdollSet::Setup),
                systems::run_frame_phase::<B>.in_set(RagdollSet::Control),
                systems::process_contacts::<B>.in_set(RagdollSet::Contacts),
            ),
        );
        app.add_systems(
            FixedUpdate,
            systems::run_physics_phase::<B>.in_set(RagdollSet::Motion),
        );
    }
}
