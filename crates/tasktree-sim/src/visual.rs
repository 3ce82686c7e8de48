//! Visualization collaborator. Best-effort: failures are logged by the
//! scope, never propagated.

use thiserror::Error;

/// Errors reported by a visualizer.
#[derive(Debug, Error)]
pub enum VisualizationError {
    #[error("visualizer unavailable: {0}")]
    Unavailable(String),
}

/// Marks the simulated state in whatever viewer is attached.
pub trait Visualizer {
    fn mark_simulating(&mut self) -> Result<(), VisualizationError>;

    fn clear_markers(&mut self) -> Result<(), VisualizationError>;
}

/// No viewer attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVisualizer;

impl Visualizer for NoVisualizer {
    fn mark_simulating(&mut self) -> Result<(), VisualizationError> {
        Ok(())
    }

    fn clear_markers(&mut self) -> Result<(), VisualizationError> {
        Ok(())
    }
}

/// Reports markers to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogVisualizer;

impl Visualizer for LogVisualizer {
    fn mark_simulating(&mut self) -> Result<(), VisualizationError> {
        tracing::info!("Simulating...");
        Ok(())
    }

    fn clear_markers(&mut self) -> Result<(), VisualizationError> {
        tracing::info!("simulation markers cleared");
        Ok(())
    }
}
