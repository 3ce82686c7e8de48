//! Scope guard that swaps in a disposable trace and world.
//!
//! On [`enter`](SimulatedTaskTree::enter) the scope remembers the cursor,
//! snapshots the world, installs a detached `simulation` root as the cursor,
//! and marks the viewer. Dropping the scope restores the cursor and the world
//! and clears the markers, on every exit path including unwinding. The
//! detached subtree is removed unless [`retain`](SimulatedTaskTree::retain)
//! was called. If the tree is reset inside the scope, the simulated subtree
//! is already gone and nothing recorded after the reset is touched.

use std::ops::{Deref, DerefMut};

use tasktree_core::{CallRecord, NodeId, TaskTree};

use crate::visual::Visualizer;
use crate::world::WorldState;

/// A live simulation scope. Derefs to the [`TaskTree`] so instrumented
/// calls made through it record into the simulated tree.
pub struct SimulatedTaskTree<'a, W: WorldState, V: Visualizer + ?Sized> {
    tree: &'a mut TaskTree,
    world: &'a mut W,
    visualizer: &'a mut V,
    suspended: NodeId,
    generation: u64,
    snapshot: Option<W::Snapshot>,
    simulated_root: NodeId,
    retained: bool,
}

impl<'a, W: WorldState, V: Visualizer + ?Sized> SimulatedTaskTree<'a, W, V> {
    pub fn enter(tree: &'a mut TaskTree, world: &'a mut W, visualizer: &'a mut V) -> Self {
        let suspended = tree.current();
        let generation = tree.generation();
        let snapshot = world.save_state();
        let simulated_root = tree.add_root(CallRecord::marker("simulation"));
        tree.rebind(simulated_root);

        if let Err(err) = visualizer.mark_simulating() {
            tracing::warn!(error = %err, "failed to mark simulation");
        }

        SimulatedTaskTree {
            tree,
            world,
            visualizer,
            suspended,
            generation,
            snapshot: Some(snapshot),
            simulated_root,
            retained: false,
        }
    }

    /// Root of the detached simulated tree.
    pub fn simulated_root(&self) -> NodeId {
        self.simulated_root
    }

    /// The cursor that will be restored on exit.
    pub fn suspended(&self) -> NodeId {
        self.suspended
    }

    /// The world being simulated on.
    pub fn world(&mut self) -> &mut W {
        &mut *self.world
    }

    /// Keeps the simulated subtree in the arena after the scope ends, as a
    /// separate root. Returns that root.
    pub fn retain(&mut self) -> NodeId {
        self.retained = true;
        self.simulated_root
    }
}

impl<W: WorldState, V: Visualizer + ?Sized> Deref for SimulatedTaskTree<'_, W, V> {
    type Target = TaskTree;

    fn deref(&self) -> &TaskTree {
        &*self.tree
    }
}

impl<W: WorldState, V: Visualizer + ?Sized> DerefMut for SimulatedTaskTree<'_, W, V> {
    fn deref_mut(&mut self) -> &mut TaskTree {
        &mut *self.tree
    }
}

impl<W: WorldState, V: Visualizer + ?Sized> Drop for SimulatedTaskTree<'_, W, V> {
    fn drop(&mut self) {
        // A reset inside the scope cleared the arena; the saved ids may now
        // name unrelated nodes.
        let reset = self.tree.generation() != self.generation;
        if reset {
            tracing::warn!(
                "task tree was reset during simulation, cursor left at the current root"
            );
            let root = self.tree.root();
            self.tree.rebind(root);
        } else if !self.tree.rebind(self.suspended) {
            tracing::warn!(
                suspended = %self.suspended,
                "suspended node no longer exists, cursor left at the current root"
            );
            let root = self.tree.root();
            self.tree.rebind(root);
        }

        if let Some(snapshot) = self.snapshot.take() {
            self.world.restore_state(snapshot);
        }

        if let Err(err) = self.visualizer.clear_markers() {
            tracing::warn!(error = %err, "failed to clear simulation markers");
        }

        if !reset && !self.retained && self.tree.contains(self.simulated_root) {
            let removed = self.tree.discard(self.simulated_root);
            tracing::debug!(removed, "discarded simulated task tree");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::{NoVisualizer, VisualizationError};
    use crate::world::{Pose, SimWorld};
    use tasktree_core::{instrument, Arguments, Callable, Signature, TaskStatus};

    struct BrokenViewer;

    impl Visualizer for BrokenViewer {
        fn mark_simulating(&mut self) -> Result<(), VisualizationError> {
            Err(VisualizationError::Unavailable("no display".into()))
        }

        fn clear_markers(&mut self) -> Result<(), VisualizationError> {
            Err(VisualizationError::Unavailable("no display".into()))
        }
    }

    #[test]
    fn empty_scope_is_idempotent() {
        let mut tree = TaskTree::new();
        let mut world = SimWorld::new();
        let mut viewer = NoVisualizer;
        world.add_object("milk", Pose::at([1.3, 1.0, 0.9]));
        let cursor_before = tree.current();
        let world_before = world.data();
        let len_before = tree.len();

        {
            let scope = SimulatedTaskTree::enter(&mut tree, &mut world, &mut viewer);
            assert_eq!(scope.current(), scope.simulated_root());
            assert_ne!(scope.current(), cursor_before);
        }

        assert_eq!(tree.current(), cursor_before);
        assert_eq!(tree.len(), len_before);
        assert_eq!(world.data(), world_before);
    }

    #[test]
    fn simulated_calls_do_not_touch_the_real_tree() {
        let move_torso: Callable<()> = {
            let world = SimWorld::new();
            instrument("perform", Signature::new().param("height"), move |_, args| {
                world.set_torso_height(args.value("height")?);
                Ok(())
            })
        };

        let mut tree = TaskTree::new();
        let mut world = SimWorld::new();
        let mut viewer = NoVisualizer;
        {
            let mut scope = SimulatedTaskTree::enter(&mut tree, &mut world, &mut viewer);
            move_torso
                .call(&mut scope, Arguments::new().with("height", 0.3))
                .unwrap();
            let root = scope.root();
            assert_eq!(root, scope.simulated_root());
            assert_eq!(scope.subtree_size(root), 2);
            assert_eq!(scope.node(root).unwrap().record().operation(), "simulation");
        }
        assert_eq!(tree.subtree_size(tree.root()), 1);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn world_is_restored_after_changes() {
        let mut tree = TaskTree::new();
        let mut world = SimWorld::new();
        let mut viewer = NoVisualizer;
        world.add_object("milk", Pose::default());
        let before = world.data();
        {
            let mut scope = SimulatedTaskTree::enter(&mut tree, &mut world, &mut viewer);
            scope.world().attach("milk", "left_gripper");
            scope.world().set_torso_height(0.25);
        }
        assert_eq!(world.data(), before);
    }

    #[test]
    fn retained_subtree_survives_release() {
        let step: Callable<()> = instrument("step", Signature::new(), |_, _| Ok(()));
        let mut tree = TaskTree::new();
        let mut world = SimWorld::new();
        let mut viewer = NoVisualizer;
        let kept = {
            let mut scope = SimulatedTaskTree::enter(&mut tree, &mut world, &mut viewer);
            step.call(&mut scope, Arguments::new()).unwrap();
            scope.retain()
        };
        assert_eq!(tree.subtree_size(kept), 2);
        assert_eq!(tree.subtree_size(tree.root()), 1);
        let child = tree.children(kept)[0];
        assert_eq!(tree.node(child).unwrap().status(), TaskStatus::Succeeded);
    }

    #[test]
    fn visualizer_failures_do_not_abort_scope() {
        let mut tree = TaskTree::new();
        let mut world = SimWorld::new();
        let mut viewer = BrokenViewer;
        let before = tree.current();
        {
            let scope = SimulatedTaskTree::enter(&mut tree, &mut world, &mut viewer);
            assert_eq!(scope.current(), scope.simulated_root());
        }
        assert_eq!(tree.current(), before);
    }

    #[test]
    fn scope_inside_instrumented_call_keeps_stack_balanced() {
        let look: Callable<()> = instrument("look", Signature::new(), |_, _| Ok(()));
        let outer: Callable<()> = instrument("outer", Signature::new(), move |tree, _| {
            let here = tree.current();
            let mut world = SimWorld::new();
            let mut viewer = NoVisualizer;
            {
                let mut scope = SimulatedTaskTree::enter(tree, &mut world, &mut viewer);
                look.call(&mut scope, Arguments::new())?;
            }
            assert_eq!(tree.current(), here);
            Ok(())
        });

        let mut tree = TaskTree::new();
        outer.call(&mut tree, Arguments::new()).unwrap();
        assert_eq!(tree.current(), tree.root());
        assert_eq!(tree.subtree_size(tree.root()), 2);
    }

    #[test]
    fn reset_inside_scope_keeps_nodes_recorded_afterwards() {
        let step: Callable<()> = instrument("step", Signature::new(), |_, _| Ok(()));
        let mut tree = TaskTree::new();
        let mut world = SimWorld::new();
        let mut viewer = NoVisualizer;
        world.add_object("milk", Pose::default());
        let before = world.data();

        let recorded = {
            let mut scope = SimulatedTaskTree::enter(&mut tree, &mut world, &mut viewer);
            let simulated = scope.simulated_root();
            scope.reset();
            step.call(&mut scope, Arguments::new()).unwrap();
            let recorded = scope.children(scope.root())[0];
            // The arena reuses the cleared index.
            assert_eq!(recorded, simulated);
            scope.world().set_torso_height(0.3);
            recorded
        };

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.children(tree.root()), vec![recorded]);
        assert_eq!(tree.node(recorded).unwrap().record().operation(), "step");
        assert_eq!(tree.current(), tree.root());
        assert_eq!(world.data(), before);
    }
}
