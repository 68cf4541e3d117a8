//! Read-only projections for the external graph renderer and plotter.

mod graph;
mod scatter;

pub use graph::{GraphEdge, GraphView, GraphViewBuilder};
pub use scatter::{ScatterPoint, ScatterView, ScatterViewBuilder};
