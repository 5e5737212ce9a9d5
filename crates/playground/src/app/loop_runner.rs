use std::collections::{BTreeMap, HashMap, VecDeque};
use std::process::ExitCode;

use interaction::{
    compile_defs_dir, AvatarRig, CameraPose, ColliderState, ConfigError, DefCompileError,
    InteractableDefDatabase, InteractionEventKind, InteractionWorld, NodeId, ObjectId, Pose,
    Quat, RigidBodyState, SceneObject, Vec3,
};
use thiserror::Error;
use tracing::{debug, error, info};

use super::bootstrap::AppWiring;
use super::paths::{resolve_app_paths, StartupError};
use super::scenario::{
    load_scenario, AvatarSpec, Command, ObjectSpec, Scenario, ScenarioError, ScheduledCommand,
};
use super::sim::BallisticSim;

const COMMAND_TIME_EPSILON: f32 = 1e-4;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Defs(#[from] DefCompileError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("failed to spawn '{object}': {source}")]
    Spawn {
        object: String,
        #[source]
        source: ConfigError,
    },
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_named_scenario(&app.scenario_name) {
        Ok(summary) => {
            info!(
                steps = summary.steps,
                events = summary.total(),
                "playground_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "playground_failed");
            ExitCode::FAILURE
        }
    }
}

fn run_named_scenario(name: &str) -> Result<RunSummary, AppError> {
    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "project_root_resolved");

    let defs = compile_defs_dir(&paths.defs_dir)?;
    info!(defs = defs.defs().len(), "interactable_defs_compiled");

    let scenario_path = paths.scenario_path(name);
    let scenario = load_scenario(&scenario_path)?;
    scenario.validate_against(&defs)?;
    info!(
        scenario = %scenario_path.display(),
        objects = scenario.objects.len(),
        commands = scenario.commands.len(),
        "scenario_loaded"
    );

    let mut playground = Playground::new(&scenario, &defs)?;
    Ok(playground.run())
}

#[derive(Debug, Default)]
pub(crate) struct RunSummary {
    pub(crate) steps: u32,
    events: BTreeMap<(String, &'static str), u32>,
}

impl RunSummary {
    fn record(&mut self, object: &str, kind: InteractionEventKind) {
        *self
            .events
            .entry((object.to_string(), kind.as_token()))
            .or_insert(0) += 1;
    }

    #[cfg(test)]
    pub(crate) fn count(&self, object: &str, kind: InteractionEventKind) -> u32 {
        self.events
            .get(&(object.to_string(), kind.as_token()))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total(&self) -> u32 {
        self.events.values().sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct AvatarMotion {
    from: Vec3,
    to: Vec3,
    elapsed: f32,
    seconds: f32,
}

/// Headless scene adapter: owns the interaction world, plays scripted
/// commands, steps the ballistic sim, and logs every interaction event.
pub(crate) struct Playground {
    world: InteractionWorld,
    sim: BallisticSim,
    object_ids: HashMap<String, ObjectId>,
    object_names: HashMap<ObjectId, String>,
    commands: VecDeque<ScheduledCommand>,
    avatar_motion: Option<AvatarMotion>,
    fixed_dt: f32,
    duration_seconds: f32,
    elapsed: f32,
}

impl Playground {
    pub(crate) fn new(
        scenario: &Scenario,
        defs: &InteractableDefDatabase,
    ) -> Result<Self, AppError> {
        let mut world = InteractionWorld::new();
        world.register_avatar(build_avatar(&scenario.avatar));

        let mut object_ids = HashMap::new();
        let mut object_names = HashMap::new();
        for spec in &scenario.objects {
            let Some(def) = defs.def_by_name(&spec.def) else {
                return Err(ScenarioError::UnknownDef {
                    object: spec.name.clone(),
                    def: spec.def.clone(),
                }
                .into());
            };
            let id = world
                .spawn(def.config.clone(), build_object(spec))
                .map_err(|source| AppError::Spawn {
                    object: spec.name.clone(),
                    source,
                })?;
            debug!(object = id.0, name = %spec.name, def = %def.def_name, "scenario_object_spawned");
            object_ids.insert(spec.name.clone(), id);
            object_names.insert(id, spec.name.clone());
        }

        Ok(Self {
            world,
            sim: BallisticSim::new(scenario.ground),
            object_ids,
            object_names,
            commands: scenario.commands.iter().cloned().collect(),
            avatar_motion: None,
            fixed_dt: scenario.fixed_dt,
            duration_seconds: scenario.duration_seconds,
            elapsed: 0.0,
        })
    }

    pub(crate) fn run(&mut self) -> RunSummary {
        let steps = (self.duration_seconds / self.fixed_dt).ceil() as u32;
        let mut summary = RunSummary::default();
        for _ in 0..steps {
            self.step(&mut summary);
        }
        summary
    }

    fn step(&mut self, summary: &mut RunSummary) {
        self.dispatch_due_commands();
        self.advance_avatar_motion();
        self.sim.step(&mut self.world, self.fixed_dt);
        self.world.tick(self.fixed_dt);

        for event in self.world.drain_events() {
            let name = self
                .object_names
                .get(&event.object)
                .map(String::as_str)
                .unwrap_or("unknown");
            info!(
                t = self.elapsed,
                object = name,
                event = event.kind.as_token(),
                "interaction_event"
            );
            summary.record(name, event.kind);
        }
        summary.steps += 1;
        self.elapsed += self.fixed_dt;
    }

    fn dispatch_due_commands(&mut self) {
        while self
            .commands
            .front()
            .is_some_and(|scheduled| scheduled.at <= self.elapsed + COMMAND_TIME_EPSILON)
        {
            let Some(scheduled) = self.commands.pop_front() else {
                break;
            };
            let accepted = self.execute(&scheduled.command);
            debug!(
                t = self.elapsed,
                command = scheduled.command.as_token(),
                object = scheduled.command.object().unwrap_or(""),
                accepted,
                "command_dispatched"
            );
        }
    }

    fn execute(&mut self, command: &Command) -> bool {
        let id = command
            .object()
            .and_then(|name| self.object_ids.get(name).copied());
        match (command, id) {
            (Command::Grab { .. }, Some(id)) => self.world.try_grab(id),
            (Command::Release { .. }, Some(id)) => self.world.release(id),
            (
                Command::Throw {
                    direction, force, ..
                },
                Some(id),
            ) => self.world.throw_in_direction(id, *direction, *force),
            (Command::Contact { .. }, Some(id)) => self.world.report_contact(id),
            (Command::TriggerEnter { .. }, Some(id)) => self.world.report_trigger_enter(id),
            (Command::TriggerExit { .. }, Some(id)) => self.world.report_trigger_exit(id),
            (Command::MoveAvatar { to, seconds }, _) => self.start_avatar_motion(*to, *seconds),
            (Command::LookAt { target }, _) => {
                let Some(avatar) = self.world.avatar_mut() else {
                    return false;
                };
                let Some(forward) = (*target - avatar.camera.position).try_normalize() else {
                    return false;
                };
                avatar.camera.forward = forward;
                true
            }
            (_, None) => false,
        }
    }

    fn start_avatar_motion(&mut self, to: Vec3, seconds: f32) -> bool {
        let Some(avatar) = self.world.avatar_mut() else {
            return false;
        };
        if seconds <= 0.0 {
            let rotation = avatar.root.rotation;
            avatar.move_root_to(Pose {
                position: to,
                rotation,
            });
            self.avatar_motion = None;
            return true;
        }
        self.avatar_motion = Some(AvatarMotion {
            from: avatar.position(),
            to,
            elapsed: 0.0,
            seconds,
        });
        true
    }

    fn advance_avatar_motion(&mut self) {
        let Some(motion) = self.avatar_motion.as_mut() else {
            return;
        };
        motion.elapsed = (motion.elapsed + self.fixed_dt).min(motion.seconds);
        let progress = motion.elapsed / motion.seconds;
        let position = motion.from + (motion.to - motion.from) * progress;
        let finished = motion.elapsed >= motion.seconds;

        if let Some(avatar) = self.world.avatar_mut() {
            let rotation = avatar.root.rotation;
            avatar.move_root_to(Pose { position, rotation });
        }
        if finished {
            self.avatar_motion = None;
        }
    }

    #[cfg(test)]
    fn world(&self) -> &InteractionWorld {
        &self.world
    }

    #[cfg(test)]
    fn object_id(&self, name: &str) -> Option<ObjectId> {
        self.object_ids.get(name).copied()
    }
}

fn build_avatar(spec: &AvatarSpec) -> AvatarRig {
    let root = Pose {
        position: spec.position,
        rotation: Quat::from_yaw(spec.yaw_degrees.to_radians()),
    };
    let camera = CameraPose {
        position: root.position + Vec3::UP * spec.camera_height,
        forward: root.rotation.forward(),
    };
    let synthesized_anchor_node = NodeId(spec.bones.len() as u64 + 1);
    spec.bones
        .iter()
        .enumerate()
        .fold(AvatarRig::new(root, camera, synthesized_anchor_node), |rig, (index, bone)| {
            rig.with_bone(bone.name.clone(), NodeId(index as u64 + 1), root.child(bone.offset))
        })
}

fn build_object(spec: &ObjectSpec) -> SceneObject {
    let object = SceneObject::new(Pose::from_position(spec.position)).with_collider(ColliderState {
        is_trigger: spec.is_trigger,
        radius: spec.radius,
    });
    if !spec.rigidbody {
        return object;
    }
    object.with_rigidbody(RigidBodyState {
        is_kinematic: spec.kinematic,
        ..RigidBodyState::default()
    })
}
