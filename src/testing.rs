//! Test harness for driving the engines without an `App`.

use bevy::prelude::*;

use crate::balance;
use crate::config::RagdollConfig;
use crate::controller::{self, ControlContext};
use crate::drive::{DriveProfile, DriveProfiles};
use crate::intent::RagdollIntent;
use crate::kinematic::{KinematicBackend, KinematicBody};
use crate::pose::DefaultPose;
use crate::rig::Rig;
use crate::skeleton::{center_of_mass, BodyPart, RagdollJoint, Skeleton};
use crate::state::{GroundSensor, RagdollState};

/// A balanced humanoid standing at the origin, facing +Z.
pub struct TestRagdoll {
    pub world: World,
    pub character: Entity,
    pub skeleton: Skeleton,
    pub config: RagdollConfig,
    pub drives: DriveProfiles,
    pub pose: DefaultPose,
    pub intent: RagdollIntent,
    pub state: RagdollState,
}

fn rest_position(part: BodyPart) -> Vec3 {
    match part {
        BodyPart::Root => Vec3::new(0.0, 1.0, 0.0),
        BodyPart::Body => Vec3::new(0.0, 1.5, 0.0),
        BodyPart::Head => Vec3::new(0.0, 2.0, 0.0),
        BodyPart::UpperRightArm => Vec3::new(0.4, 1.6, 0.0),
        BodyPart::LowerRightArm => Vec3::new(0.7, 1.6, 0.0),
        BodyPart::UpperLeftArm => Vec3::new(-0.4, 1.6, 0.0),
        BodyPart::LowerLeftArm => Vec3::new(-0.7, 1.6, 0.0),
        BodyPart::UpperRightLeg => Vec3::new(0.2, 0.75, 0.0),
        BodyPart::LowerRightLeg => Vec3::new(0.2, 0.35, 0.0),
        BodyPart::RightFoot => Vec3::new(0.2, 0.05, 0.0),
        BodyPart::UpperLeftLeg => Vec3::new(-0.2, 0.75, 0.0),
        BodyPart::LowerLeftLeg => Vec3::new(-0.2, 0.35, 0.0),
        BodyPart::LeftFoot => Vec3::new(-0.2, 0.05, 0.0),
    }
}

impl TestRagdoll {
    pub fn spawn() -> Self {
        let mut world = World::new();
        let character = world.spawn_empty().id();

        let mut skeleton = Skeleton::new();
        for part in BodyPart::ALL {
            let mut joint = RagdollJoint::new(part);
            joint.owner = Some(character);
            let entity = world
                .spawn((
                    Transform::from_translation(rest_position(part)),
                    KinematicBody::with_mass(1.0),
                    joint,
                ))
                .id();
            skeleton.insert(part, entity);
        }

        let config = RagdollConfig::default();
        let drives = DriveProfiles::from_config(&config);
        let pose = DefaultPose::capture(&Rig::<KinematicBackend>::new(&mut world, skeleton));

        let mut rd = Self {
            world,
            character,
            skeleton,
            config,
            drives,
            pose,
            intent: RagdollIntent::default(),
            state: RagdollState::default(),
        };
        rd.with(|rig, state, ctx| {
            balance::deactivate_ragdoll(rig, state, ctx.drives);
            state.reset_pose = false;
        });
        rd
    }

    pub fn rig(&mut self) -> Rig<'_, KinematicBackend> {
        Rig::new(&mut self.world, self.skeleton)
    }

    /// Run `f` with a rig and a context built from the current fields.
    pub fn with<R>(
        &mut self,
        f: impl FnOnce(&mut Rig<KinematicBackend>, &mut RagdollState, &ControlContext) -> R,
    ) -> R {
        let ctx = ControlContext {
            config: &self.config,
            drives: &self.drives,
            pose: &self.pose,
            intent: &self.intent,
        };
        let mut rig = Rig::new(&mut self.world, self.skeleton);
        f(&mut rig, &mut self.state, &ctx)
    }

    pub fn frame(&mut self, sensor: GroundSensor, dt: f32) -> Option<Vec3> {
        self.with(|rig, state, ctx| controller::frame_update(rig, state, ctx, sensor, dt))
    }

    pub fn fixed(&mut self, dt: f32) {
        self.with(|rig, state, ctx| controller::fixed_update(rig, state, ctx, dt));
    }

    fn entity(&self, part: BodyPart) -> Entity {
        self.skeleton.get(part).expect("test skeleton is complete")
    }

    fn joint(&self, part: BodyPart) -> &RagdollJoint {
        self.world
            .get::<RagdollJoint>(self.entity(part))
            .expect("every part has a joint")
    }

    fn body(&self, part: BodyPart) -> &KinematicBody {
        self.world
            .get::<KinematicBody>(self.entity(part))
            .expect("every part has a body")
    }

    fn transform_mut(&mut self, part: BodyPart) -> Mut<'_, Transform> {
        let entity = self.entity(part);
        self.world
            .get_mut::<Transform>(entity)
            .expect("every part has a transform")
    }

    pub fn target(&self, part: BodyPart) -> Quat {
        self.joint(part).target
    }

    pub fn set_target(&mut self, part: BodyPart, target: Quat) {
        self.rig().set_target(part, target);
    }

    pub fn drive(&self, part: BodyPart) -> DriveProfile {
        self.joint(part).drive
    }

    pub fn set_drive(&mut self, part: BodyPart, drive: DriveProfile) {
        self.rig().set_drive(part, drive);
    }

    pub fn velocity(&self, part: BodyPart) -> Vec3 {
        self.body(part).velocity
    }

    pub fn set_velocity(&mut self, part: BodyPart, velocity: Vec3) {
        self.rig().set_velocity(part, velocity);
    }

    /// Impulse accumulated on a part since spawn.
    pub fn impulse(&self, part: BodyPart) -> Vec3 {
        self.body(part).impulse
    }

    pub fn set_position(&mut self, part: BodyPart, position: Vec3) {
        self.transform_mut(part).translation = position;
    }

    pub fn set_rotation(&mut self, part: BodyPart, rotation: Quat) {
        self.transform_mut(part).rotation = rotation;
    }

    /// Center of mass computed straight from the transforms.
    pub fn expected_center_of_mass(&self) -> Vec3 {
        let samples = BodyPart::ALL.map(|part| {
            let entity = self.entity(part);
            let position = self
                .world
                .get::<Transform>(entity)
                .map(|t| t.translation)
                .unwrap_or_default();
            (self.body(part).mass, position)
        });
        center_of_mass(samples).expect("parts have mass")
    }
}
