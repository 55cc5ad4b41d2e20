//! Contact events and scene markers.
//!
//! Backends translate their physics contacts into these events. The
//! controller consumes them in [`RagdollSet::Contacts`](crate::RagdollSet::Contacts).

use bevy::prelude::*;

use crate::skeleton::{BodyPart, Side};

/// Marks colliders that count as walkable ground for the balance probe.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Ground;

/// Marks bodies that a reaching hand may hold on to.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grabbable;

/// A body part of `character` hit something.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct RagdollImpact {
    pub character: Entity,
    pub part: BodyPart,
    /// Magnitude of the relative velocity at contact.
    pub relative_velocity: f32,
}

impl RagdollImpact {
    pub fn new(character: Entity, part: BodyPart, relative_velocity: f32) -> Self {
        Self {
            character,
            part,
            relative_velocity,
        }
    }
}

/// A foot of `character` touched ground.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeetGrounded {
    pub character: Entity,
}

/// A hand of `character` touched `target`.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandContact {
    pub character: Entity,
    pub side: Side,
    pub target: Entity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_event_fields() {
        let character = Entity::from_raw(7);
        let impact = RagdollImpact::new(character, BodyPart::Head, 22.5);

        assert_eq!(impact.character, character);
        assert_eq!(impact.part, BodyPart::Head);
        assert_eq!(impact.relative_velocity, 22.5);
    }
}
