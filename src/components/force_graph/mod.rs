//! Force-directed topology diagram.
//!
//! An incremental-render engine over a live force simulation: nodes and links
//! are added, unlinked, removed and re-styled while the layout keeps running,
//! and every element keeps its identity across render passes.
//!
//! - [`Graph`]: the engine handle (mutations, debounced rendering, drag)
//! - [`ShapeRegistry`]: per-type shape renderers, looked up by id prefix
//! - [`stages`]: the scripted walkthrough driving the demo
//! - [`TopologyCanvas`]: the Leptos component painting it all on a canvas
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//!
//! let scheduler = ManualScheduler::new();
//! let graph = Graph::new(GraphConfig::new(800.0, 600.0), Rc::new(scheduler.clone()));
//! graph.add(GraphData::new(
//!     vec![Node::new("device-0"), Node::new("wifi-0")],
//!     vec![Link::new("device-0", "wifi-0")],
//! ));
//! scheduler.run_until_idle();
//! ```

mod component;
pub mod config;
mod graph;
mod render;
mod scene;
pub mod scheduler;
mod shapes;
mod simulation;
pub mod stages;
mod state;
pub mod theme;
mod types;
mod utils;

pub use component::TopologyCanvas;
pub use config::{AppConfig, ForceConfig, TransitionConfig};
pub use graph::{Graph, GraphConfig};
pub use scheduler::{ManualScheduler, Scheduler, TimeoutScheduler};
pub use shapes::{ShapeRegistry, ShapeRenderer};
pub use stages::{StageConfig, StageScript};
pub use state::GraphState;
pub use theme::Theme;
pub use types::{Endpoint, GraphData, Link, Node};
