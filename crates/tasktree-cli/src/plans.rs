//! The pick-and-place demo plan.
//!
//! Each step is an action designator passed as the `self` argument of an
//! instrumented `perform`, so persisted code rows link to a designator row.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tasktree_core::{
    instrument, Argument, Arguments, BindError, Callable, FailureKind, JsonArgument, PlanFailure,
    Signature, TaskError,
};
use tasktree_sim::{Pose, SimWorld};

/// How far from the robot base an arm can place an object, in metres.
pub const ARM_REACH: f64 = 1.0;

const MAX_TORSO_HEIGHT: f64 = 0.35;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigateAction {
    pub target: Pose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveTorsoAction {
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickUpAction {
    pub object: String,
    pub arm: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceAction {
    pub object: String,
    pub target: Pose,
    pub arm: String,
}

macro_rules! designator {
    ($($ty:ident),*) => {
        $(
            impl JsonArgument for $ty {
                fn to_json(&self) -> Value {
                    match serde_json::to_value(self) {
                        Ok(value) => value,
                        Err(err) => {
                            tracing::warn!(
                                designator = stringify!($ty),
                                error = %err,
                                "designator cannot be JSON serialized, recording null"
                            );
                            Value::Null
                        }
                    }
                }

                fn designator_type(&self) -> Option<&str> {
                    Some(stringify!($ty))
                }
            }
        )*
    };
}

designator!(NavigateAction, MoveTorsoAction, PickUpAction, PlaceAction);

fn receiver<T: Any>(args: &Arguments) -> Result<&T, BindError> {
    args.get_ref::<T>("self")
        .ok_or_else(|| BindError::InvalidArgument {
            name: "self".to_string(),
            reason: format!("expected {}", std::any::type_name::<T>()),
        })
}

fn distance(a: &Pose, b: &Pose) -> f64 {
    a.position
        .iter()
        .zip(b.position.iter())
        .take(2)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Instrumented `perform` for each action type, bound to `world`.
#[derive(Clone)]
pub struct Actions {
    navigate: Callable<()>,
    move_torso: Callable<()>,
    pick_up: Callable<()>,
    place: Callable<()>,
}

impl Actions {
    pub fn new(world: &SimWorld) -> Self {
        let w = world.clone();
        let navigate = instrument("perform", Signature::new().param("self"), move |_, args| {
            let action: &NavigateAction = receiver(args)?;
            w.set_robot_pose(action.target);
            Ok(())
        });

        let w = world.clone();
        let move_torso = instrument("perform", Signature::new().param("self"), move |_, args| {
            let action: &MoveTorsoAction = receiver(args)?;
            if !(0.0..=MAX_TORSO_HEIGHT).contains(&action.height) {
                return Err(PlanFailure::generic(format!(
                    "torso height {} outside [0, {MAX_TORSO_HEIGHT}]",
                    action.height
                ))
                .into());
            }
            w.set_torso_height(action.height);
            Ok(())
        });

        let w = world.clone();
        let pick_up = instrument("perform", Signature::new().param("self"), move |_, args| {
            let action: &PickUpAction = receiver(args)?;
            let link = format!("{}_gripper", action.arm);
            if !w.attach(&action.object, link) {
                return Err(PlanFailure::new(
                    FailureKind::ObjectNotFound,
                    format!("{} not found", action.object),
                )
                .into());
            }
            Ok(())
        });

        let w = world.clone();
        let place = instrument("perform", Signature::new().param("self"), move |_, args| {
            let action: &PlaceAction = receiver(args)?;
            if distance(&w.robot_pose(), &action.target) > ARM_REACH {
                return Err(PlanFailure::new(
                    FailureKind::Reachability,
                    format!("{} is out of reach of the {} arm", action.object, action.arm),
                )
                .into());
            }
            if w.attached_link(&action.object).is_none() {
                return Err(PlanFailure::new(
                    FailureKind::GripperClosedCompletely,
                    format!("{} is not in the {} gripper", action.object, action.arm),
                )
                .into());
            }
            w.detach(&action.object);
            w.set_object_pose(&action.object, action.target);
            Ok(())
        });

        Actions {
            navigate,
            move_torso,
            pick_up,
            place,
        }
    }
}

fn perform<T: JsonArgument + 'static>(
    callable: &Callable<()>,
    tree: &mut tasktree_core::TaskTree,
    action: T,
) -> Result<(), TaskError> {
    callable.call(tree, Arguments::new().with("self", Argument::custom(action)))
}

/// A kitchen with milk on the counter and a robot at the origin.
pub fn kitchen() -> SimWorld {
    let world = SimWorld::new();
    world.add_object("milk", Pose::at([2.5, 2.0, 0.95]));
    world
}

/// `pick_and_place(object, target)`: drive to the counter, raise the torso,
/// grab the object, drive to the table and put it down at `target`.
pub fn pick_and_place(world: &SimWorld) -> Callable<()> {
    let actions = Actions::new(world);
    instrument(
        "pick_and_place",
        Signature::new()
            .param("object")
            .param_default("target", serde_json::json!(Pose::at([-1.0, 1.5, 0.8])))
            .param_default("arm", "left"),
        move |tree, args| {
            let object: String = args.value("object")?;
            let target: Pose = args.value("target")?;
            let arm: String = args.value("arm")?;

            perform(
                &actions.navigate,
                tree,
                NavigateAction {
                    target: Pose::at([1.8, 2.0, 0.0]),
                },
            )?;
            perform(&actions.move_torso, tree, MoveTorsoAction { height: 0.25 })?;
            perform(
                &actions.pick_up,
                tree,
                PickUpAction {
                    object: object.clone(),
                    arm: arm.clone(),
                },
            )?;
            perform(
                &actions.navigate,
                tree,
                NavigateAction {
                    target: Pose::at([-1.0, 0.8, 0.0]),
                },
            )?;
            perform(&actions.place, tree, PlaceAction { object, target, arm })
        },
    )
}

/// Arguments for the demo run. `unreachable` puts the place target far out
/// of reach so the place step fails.
pub fn demo_arguments(unreachable: bool) -> Arguments {
    let args = Arguments::new().with("object", "milk");
    if unreachable {
        args.with("target", serde_json::json!(Pose::at([-1.0, 4.0, 0.8])))
    } else {
        args
    }
}
