//! Per-character view over the world.
//!
//! A [`Rig`] pairs a character's [`Skeleton`] with mutable world access and a
//! physics backend. The engines address body parts by [`BodyPart`] through it
//! and never handle entities themselves. Every lookup degrades to a no-op when
//! a part is missing, so one broken limb never stops the rest of the tick.

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::drive::DriveProfile;
use crate::skeleton::{center_of_mass, BodyPart, RagdollJoint, Side, Skeleton};

/// Joint and body access for one character, addressed by [`BodyPart`].
pub struct Rig<'w, B: RagdollPhysicsBackend> {
    world: &'w mut World,
    skeleton: Skeleton,
    _backend: PhantomData<fn() -> B>,
}

impl<'w, B: RagdollPhysicsBackend> Rig<'w, B> {
    pub fn new(world: &'w mut World, skeleton: Skeleton) -> Self {
        Self {
            world,
            skeleton,
            _backend: PhantomData,
        }
    }

    pub fn world(&self) -> &World {
        &*self.world
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    fn joint(&self, part: BodyPart) -> Option<&RagdollJoint> {
        let entity = self.skeleton.get(part)?;
        self.world().get::<RagdollJoint>(entity)
    }

    fn joint_mut(&mut self, part: BodyPart) -> Option<Mut<'_, RagdollJoint>> {
        let entity = self.skeleton.get(part)?;
        self.world.get_mut::<RagdollJoint>(entity)
    }

    // === Joints ===

    pub fn target(&self, part: BodyPart) -> Option<Quat> {
        self.joint(part).map(|j| j.target)
    }

    pub fn set_target(&mut self, part: BodyPart, target: Quat) {
        if let Some(mut joint) = self.joint_mut(part) {
            if joint.target != target {
                joint.target = target;
            }
        }
    }

    /// Add `delta` to the x component of a joint target.
    pub fn displace_target_x(&mut self, part: BodyPart, delta: f32) {
        if delta == 0.0 {
            return;
        }
        if let Some(mut joint) = self.joint_mut(part) {
            joint.target.x += delta;
        }
    }

    pub fn drive(&self, part: BodyPart) -> Option<DriveProfile> {
        self.joint(part).map(|j| j.drive)
    }

    pub fn set_drive(&mut self, part: BodyPart, drive: DriveProfile) {
        if let Some(mut joint) = self.joint_mut(part) {
            if joint.drive != drive {
                joint.drive = drive;
            }
        }
    }

    // === Rigid bodies ===

    pub fn position(&self, part: BodyPart) -> Option<Vec3> {
        let entity = self.skeleton.get(part)?;
        Some(B::get_position(self.world(), entity))
    }

    pub fn rotation(&self, part: BodyPart) -> Option<Quat> {
        let entity = self.skeleton.get(part)?;
        Some(B::get_rotation(self.world(), entity))
    }

    /// The part's forward axis (+Z) in world space.
    pub fn forward(&self, part: BodyPart) -> Option<Vec3> {
        self.rotation(part).map(|r| r * Vec3::Z)
    }

    pub fn velocity(&self, part: BodyPart) -> Option<Vec3> {
        let entity = self.skeleton.get(part)?;
        Some(B::get_velocity(self.world(), entity))
    }

    pub fn set_velocity(&mut self, part: BodyPart, velocity: Vec3) {
        if let Some(entity) = self.skeleton.get(part) {
            B::set_velocity(self.world, entity, velocity);
        }
    }

    pub fn apply_impulse(&mut self, part: BodyPart, impulse: Vec3) {
        if let Some(entity) = self.skeleton.get(part) {
            B::apply_impulse(self.world, entity, impulse);
        }
    }

    /// The hand of a side, falling back to its lower arm.
    pub fn hand_or_lower_arm(&self, side: Side) -> Option<Entity> {
        self.skeleton
            .hand(side)
            .or_else(|| self.skeleton.get(side.lower_arm()))
    }

    pub fn apply_hand_impulse(&mut self, side: Side, impulse: Vec3) {
        if let Some(hand) = self.hand_or_lower_arm(side) {
            B::apply_impulse(self.world, hand, impulse);
        }
    }

    /// Mass-weighted average position of every registered part.
    pub fn center_of_mass(&self) -> Option<Vec3> {
        center_of_mass(self.skeleton.iter().map(|(_, entity)| {
            (
                B::get_mass(self.world(), entity),
                B::get_position(self.world(), entity),
            )
        }))
    }

    // === Grabbing ===

    pub fn attach_grab(&mut self, side: Side, target: Entity) -> Option<Entity> {
        let hand = self.hand_or_lower_arm(side)?;
        B::attach_grab(self.world, hand, target)
    }

    pub fn release_grab(&mut self, coupling: Entity) {
        B::release_grab(self.world, coupling);
    }
}
