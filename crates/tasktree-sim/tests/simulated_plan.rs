//! A small pick-and-place plan run both for real and inside a simulation
//! scope, checking tree shape and world restoration.

use tasktree_core::{
    instrument, Arguments, Callable, FailureKind, PlanFailure, Signature, TaskStatus, TaskTree,
};
use tasktree_sim::{NoVisualizer, Pose, SimWorld, SimulatedTaskTree};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Builds `plan(object)`: navigate, move torso, pick up, place.
fn plan(world: &SimWorld) -> Callable<()> {
    let w = world.clone();
    let navigate: Callable<()> =
        instrument("navigate", Signature::new().param("target"), move |_, args| {
            let target: Pose = args.value("target")?;
            w.set_robot_pose(target);
            Ok(())
        });
    let w = world.clone();
    let move_torso: Callable<()> =
        instrument("move_torso", Signature::new().param("height"), move |_, args| {
            w.set_torso_height(args.value("height")?);
            Ok(())
        });
    let w = world.clone();
    let pick_up: Callable<()> = instrument(
        "pick_up",
        Signature::new().param("object").param_default("arm", "left"),
        move |_, args| {
            let object: String = args.value("object")?;
            let arm: String = args.value("arm")?;
            if !w.attach(&object, format!("{arm}_gripper")) {
                return Err(PlanFailure::new(
                    FailureKind::ObjectNotFound,
                    format!("{object} not found"),
                )
                .into());
            }
            Ok(())
        },
    );
    let w = world.clone();
    let place: Callable<()> = instrument(
        "place",
        Signature::new().param("object").param("target"),
        move |_, args| {
            let object: String = args.value("object")?;
            let target: Pose = args.value("target")?;
            w.detach(&object);
            w.set_object_pose(&object, target);
            Ok(())
        },
    );

    instrument("plan", Signature::new().param("object"), move |tree, args| {
        let object: String = args.value("object")?;
        let counter = serde_json::json!(Pose::at([0.6, 0.4, 0.0]));
        navigate.call(tree, Arguments::new().with("target", counter))?;
        move_torso.call(tree, Arguments::new().with("height", 0.3))?;
        pick_up.call(tree, Arguments::new().with("object", object.as_str()))?;
        place.call(
            tree,
            Arguments::new()
                .with("object", object.as_str())
                .with("target", serde_json::json!(Pose::at([1.3, 1.0, 0.9]))),
        )?;
        Ok(())
    })
}

fn operations(tree: &TaskTree) -> Vec<String> {
    tree.preorder(tree.root())
        .into_iter()
        .map(|id| tree.node(id).unwrap().record().operation().to_string())
        .collect()
}

fn kitchen() -> SimWorld {
    let world = SimWorld::new();
    world.add_object("milk", Pose::at([2.5, 2.0, 1.0]));
    world
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn real_plan_builds_tree() {
    let world = kitchen();
    let mut tree = TaskTree::new();
    plan(&world)
        .call(&mut tree, Arguments::new().with("object", "milk"))
        .unwrap();

    assert_eq!(tree.subtree_size(tree.root()), 6);
    assert_eq!(tree.leaves(tree.root()).len(), 4);
    assert_eq!(
        operations(&tree),
        ["no_operation", "plan", "navigate", "move_torso", "pick_up", "place"]
    );
    for id in tree.preorder(tree.root()).into_iter().skip(1) {
        assert_eq!(tree.node(id).unwrap().status(), TaskStatus::Succeeded);
    }
    assert_eq!(world.object_pose("milk"), Some(Pose::at([1.3, 1.0, 0.9])));
    assert_eq!(world.torso_height(), 0.3);
}

#[test]
fn simulated_plan_is_discarded_and_world_restored() {
    let mut world = kitchen();
    let before = world.data();
    let the_plan = plan(&world);
    let mut tree = TaskTree::new();
    let mut viewer = NoVisualizer;

    {
        let mut scope = SimulatedTaskTree::enter(&mut tree, &mut world, &mut viewer);
        the_plan
            .call(&mut scope, Arguments::new().with("object", "milk"))
            .unwrap();
        assert_eq!(scope.subtree_size(scope.root()), 6);
        assert_eq!(
            operations(&scope),
            ["simulation", "plan", "navigate", "move_torso", "pick_up", "place"]
        );
    }

    assert_eq!(tree.subtree_size(tree.root()), 1);
    assert_eq!(world.data(), before);
}

#[test]
fn failing_step_marks_chain_failed() {
    let world = SimWorld::new();
    let mut tree = TaskTree::new();
    let err = plan(&world)
        .call(&mut tree, Arguments::new().with("object", "milk"))
        .unwrap_err();
    assert_eq!(err.to_string(), "milk not found");

    let plan_node = tree.children(tree.root())[0];
    assert_eq!(tree.node(plan_node).unwrap().status(), TaskStatus::Failed);
    let steps = tree.children(plan_node);
    assert_eq!(steps.len(), 3);
    let statuses: Vec<TaskStatus> = steps
        .iter()
        .map(|id| tree.node(*id).unwrap().status())
        .collect();
    assert_eq!(
        statuses,
        [TaskStatus::Succeeded, TaskStatus::Succeeded, TaskStatus::Failed]
    );
    assert_eq!(tree.current(), tree.root());
}

#[test]
fn recorded_leaves_can_be_replayed() {
    let world = kitchen();
    let mut tree = TaskTree::new();
    plan(&world)
        .call(&mut tree, Arguments::new().with("object", "milk"))
        .unwrap();

    world.set_torso_height(0.0);
    let leaves: Vec<_> = tree
        .leaves(tree.root())
        .into_iter()
        .map(|id| tree.node(id).unwrap().record().clone())
        .collect();
    let mut replay_tree = TaskTree::new();
    for record in &leaves {
        record.execute(&mut replay_tree).unwrap();
    }
    assert_eq!(world.torso_height(), 0.3);
}
