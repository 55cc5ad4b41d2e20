//! Skeleton registry.
//!
//! A ragdoll is a closed set of thirteen body parts, each one a rigid body
//! hanging off its parent through an orientation-driven joint. The
//! [`Skeleton`] component lives on the character entity and maps every
//! [`BodyPart`] to the entity simulating it. Each part entity carries a
//! [`RagdollJoint`] holding the joint's mutable drive state.

use std::fmt;
use std::str::FromStr;

use bevy::prelude::*;
use thiserror::Error;

use crate::drive::DriveProfile;

/// Errors raised while resolving skeleton parts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkeletonError {
    /// A single part has no registered entity.
    #[error("body part `{0}` is not registered in the skeleton")]
    MissingPart(BodyPart),
    /// Several parts have no registered entity.
    #[error("skeleton is missing {} body part(s): {}", .0.len(), join_parts(.0))]
    MissingParts(Vec<BodyPart>),
    /// A part name did not match any known body part.
    #[error("unknown body part name `{0}`")]
    UnknownPart(String),
}

fn join_parts(parts: &[BodyPart]) -> String {
    parts
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The thirteen body parts of a ragdoll.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyPart {
    Root,
    Body,
    Head,
    UpperRightArm,
    LowerRightArm,
    UpperLeftArm,
    LowerLeftArm,
    UpperRightLeg,
    LowerRightLeg,
    UpperLeftLeg,
    LowerLeftLeg,
    RightFoot,
    LeftFoot,
}

impl BodyPart {
    /// Number of parts in a complete skeleton.
    pub const COUNT: usize = 13;

    /// Every body part, in registry order.
    pub const ALL: [BodyPart; Self::COUNT] = [
        BodyPart::Root,
        BodyPart::Body,
        BodyPart::Head,
        BodyPart::UpperRightArm,
        BodyPart::LowerRightArm,
        BodyPart::UpperLeftArm,
        BodyPart::LowerLeftArm,
        BodyPart::UpperRightLeg,
        BodyPart::LowerRightLeg,
        BodyPart::UpperLeftLeg,
        BodyPart::LowerLeftLeg,
        BodyPart::RightFoot,
        BodyPart::LeftFoot,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The authoring name of this part.
    pub fn name(self) -> &'static str {
        match self {
            BodyPart::Root => "Root",
            BodyPart::Body => "Body",
            BodyPart::Head => "Head",
            BodyPart::UpperRightArm => "UpperRightArm",
            BodyPart::LowerRightArm => "LowerRightArm",
            BodyPart::UpperLeftArm => "UpperLeftArm",
            BodyPart::LowerLeftArm => "LowerLeftArm",
            BodyPart::UpperRightLeg => "UpperRightLeg",
            BodyPart::LowerRightLeg => "LowerRightLeg",
            BodyPart::UpperLeftLeg => "UpperLeftLeg",
            BodyPart::LowerLeftLeg => "LowerLeftLeg",
            BodyPart::RightFoot => "RightFoot",
            BodyPart::LeftFoot => "LeftFoot",
        }
    }

    /// Whether this part is a foot.
    pub fn is_foot(self) -> bool {
        matches!(self, BodyPart::RightFoot | BodyPart::LeftFoot)
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BodyPart {
    type Err = SkeletonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BodyPart::ALL
            .into_iter()
            .find(|part| part.name() == s)
            .ok_or_else(|| SkeletonError::UnknownPart(s.to_string()))
    }
}

/// Left/right selector for the mirrored limbs.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Right,
    Left,
}

impl Side {
    /// Both sides, right first.
    pub const BOTH: [Side; 2] = [Side::Right, Side::Left];

    /// Mirror multiplier applied to authored poses (+1 right, -1 left).
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Side::Right => 1.0,
            Side::Left => -1.0,
        }
    }

    /// Index into per-side arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::Right => 0,
            Side::Left => 1,
        }
    }

    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Right => Side::Left,
            Side::Left => Side::Right,
        }
    }

    pub fn upper_arm(self) -> BodyPart {
        match self {
            Side::Right => BodyPart::UpperRightArm,
            Side::Left => BodyPart::UpperLeftArm,
        }
    }

    pub fn lower_arm(self) -> BodyPart {
        match self {
            Side::Right => BodyPart::LowerRightArm,
            Side::Left => BodyPart::LowerLeftArm,
        }
    }

    pub fn upper_leg(self) -> BodyPart {
        match self {
            Side::Right => BodyPart::UpperRightLeg,
            Side::Left => BodyPart::UpperLeftLeg,
        }
    }

    pub fn lower_leg(self) -> BodyPart {
        match self {
            Side::Right => BodyPart::LowerRightLeg,
            Side::Left => BodyPart::LowerLeftLeg,
        }
    }

    pub fn foot(self) -> BodyPart {
        match self {
            Side::Right => BodyPart::RightFoot,
            Side::Left => BodyPart::LeftFoot,
        }
    }
}

/// Maps every [`BodyPart`] of a character to the entity simulating it.
///
/// Spawn this on the character entity together with a
/// [`RagdollConfig`](crate::config::RagdollConfig). Membership is fixed once
/// the controller has initialized the character.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use active_ragdoll_controller::prelude::*;
///
/// let mut world = World::new();
/// let root = world.spawn_empty().id();
/// let skeleton = Skeleton::new().with_part(BodyPart::Root, root);
///
/// assert_eq!(skeleton.resolve(BodyPart::Root), Ok(root));
/// assert!(skeleton.resolve(BodyPart::Head).is_err());
/// ```
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Skeleton {
    parts: [Option<Entity>; BodyPart::COUNT],
    hands: [Option<Entity>; 2],
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Skeleton::insert`].
    pub fn with_part(mut self, part: BodyPart, entity: Entity) -> Self {
        self.insert(part, entity);
        self
    }

    /// Register a hand rigid body for one side.
    ///
    /// Hands receive punch impulses and form grab couplings. Without one the
    /// lower arm is used instead.
    pub fn with_hand(mut self, side: Side, entity: Entity) -> Self {
        self.hands[side.index()] = Some(entity);
        self
    }

    pub fn insert(&mut self, part: BodyPart, entity: Entity) {
        self.parts[part.index()] = Some(entity);
    }

    /// Look up a part, logging a diagnostic when it is missing.
    pub fn get(&self, part: BodyPart) -> Option<Entity> {
        let entity = self.parts[part.index()];
        if entity.is_none() {
            debug!("skeleton lookup for unregistered part {part}");
        }
        entity
    }

    pub fn resolve(&self, part: BodyPart) -> Result<Entity, SkeletonError> {
        self.parts[part.index()].ok_or(SkeletonError::MissingPart(part))
    }

    /// Resolve a part by its authoring name, e.g. `"UpperRightArm"`.
    pub fn resolve_named(&self, name: &str) -> Result<Entity, SkeletonError> {
        self.resolve(name.parse()?)
    }

    /// Check that every part is registered.
    pub fn validate(&self) -> Result<(), SkeletonError> {
        let missing: Vec<BodyPart> = BodyPart::ALL
            .into_iter()
            .filter(|part| self.parts[part.index()].is_none())
            .collect();
        match missing.len() {
            0 => Ok(()),
            1 => Err(SkeletonError::MissingPart(missing[0])),
            _ => Err(SkeletonError::MissingParts(missing)),
        }
    }

    /// Iterate over the registered parts.
    pub fn iter(&self) -> impl Iterator<Item = (BodyPart, Entity)> + '_ {
        BodyPart::ALL
            .into_iter()
            .filter_map(|part| self.parts[part.index()].map(|e| (part, e)))
    }

    pub fn hand(&self, side: Side) -> Option<Entity> {
        self.hands[side.index()]
    }

    /// Which part, if any, the given entity simulates.
    pub fn part_of(&self, entity: Entity) -> Option<BodyPart> {
        self.iter().find(|(_, e)| *e == entity).map(|(part, _)| part)
    }
}

/// Mass-weighted average of `(mass, position)` samples.
///
/// Non-positive and non-finite masses are ignored. Returns `None` when no
/// mass remains. A single sample yields its position exactly.
pub fn center_of_mass(samples: impl IntoIterator<Item = (f32, Vec3)>) -> Option<Vec3> {
    let mut total = 0.0;
    let mut center = Vec3::ZERO;
    for (mass, position) in samples {
        if !(mass.is_finite() && mass > 0.0) {
            continue;
        }
        total += mass;
        center += (position - center) * (mass / total);
    }
    (total > 0.0).then_some(center)
}

/// Drive state of a single ragdoll joint.
///
/// Lives on each part entity. Targets are stored exactly as authored and are
/// not normalized; backends normalize when converting to motor angles.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct RagdollJoint {
    /// Which part this joint drives.
    pub part: BodyPart,
    /// Target orientation relative to the parent body.
    pub target: Quat,
    /// Spring drive applied on every angular axis.
    pub drive: DriveProfile,
    /// Character entity owning this part. Filled in during setup.
    pub owner: Option<Entity>,
}

impl RagdollJoint {
    pub fn new(part: BodyPart) -> Self {
        Self {
            part,
            target: Quat::IDENTITY,
            drive: DriveProfile::default(),
            owner: None,
        }
    }

    /// Start from an authored rest target.
    pub fn with_target(mut self, target: Quat) -> Self {
        self.target = target;
        self
    }
}

/// Marks a hand rigid body able to grab [`Grabbable`](crate::collision::Grabbable) objects.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct GrabHand {
    pub side: Side,
    /// Character entity owning this hand. Filled in during setup.
    pub owner: Option<Entity>,
}

impl GrabHand {
    pub fn new(side: Side) -> Self {
        Self { side, owner: None }
    }
}
