//! The engine handle.
//!
//! [`Graph`] is a cheap clone over the shared engine. Mutations update the
//! data set and schedule a render; renders are debounced so that any number
//! of mutations in one turn of the event loop produce a single pass.

use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

use super::config::{ForceConfig, TransitionConfig};
use super::scheduler::Scheduler;
use super::shapes::ShapeRegistry;
use super::state::GraphState;
use super::types::GraphData;

/// Construction parameters of a [`Graph`].
#[derive(Clone)]
pub struct GraphConfig {
	/// Drawing surface size; the layout centers on its middle.
	pub width: f64,
	/// See [`GraphConfig::width`].
	pub height: f64,
	/// Initial data set, added before the first render.
	pub data: Option<GraphData>,
	/// Physics parameters.
	pub forces: ForceConfig,
	/// Scene transition durations.
	pub transitions: TransitionConfig,
	/// Shape renderers by node type.
	pub registry: ShapeRegistry,
}

impl GraphConfig {
	/// Defaults for a `width` x `height` surface, with no initial data.
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			width,
			height,
			data: None,
			forces: ForceConfig::default(),
			transitions: TransitionConfig::default(),
			registry: ShapeRegistry::default(),
		}
	}

	/// Sets the initial data set.
	pub fn with_data(mut self, data: GraphData) -> Self {
		self.data = Some(data);
		self
	}

	/// Replaces the physics parameters.
	pub fn with_forces(mut self, forces: ForceConfig) -> Self {
		self.forces = forces;
		self
	}

	/// Replaces the transition durations.
	pub fn with_transitions(mut self, transitions: TransitionConfig) -> Self {
		self.transitions = transitions;
		self
	}
}

struct Shared {
	state: RefCell<GraphState>,
	scheduler: Rc<dyn Scheduler>,
	render_pending: Cell<bool>,
}

/// Handle to a live graph. Clones share the same engine.
#[derive(Clone)]
pub struct Graph {
	shared: Rc<Shared>,
}

impl Graph {
	/// Builds the engine and runs the first render synchronously.
	pub fn new(config: GraphConfig, scheduler: Rc<dyn Scheduler>) -> Self {
		let mut state = GraphState::new(
			config.width,
			config.height,
			config.forces,
			config.transitions,
			config.registry,
		);
		if let Some(data) = config.data {
			state.add(data);
		}

		let graph = Self {
			shared: Rc::new(Shared {
				state: RefCell::new(state),
				scheduler,
				render_pending: Cell::new(false),
			}),
		};
		render(&graph.shared);
		graph
	}

	/// Adds nodes and links, merging ones that already exist. New nodes
	/// start at the middle of the surface.
	pub fn add(&self, data: GraphData) {
		self.shared.state.borrow_mut().add(data);
		self.schedule_render();
	}

	/// Removes the links between `source` and `target`, in either direction.
	pub fn unlink(&self, source: &str, target: &str) {
		self.shared.state.borrow_mut().unlink(source, target);
		self.schedule_render();
	}

	/// Removes the node `id` and every link touching it.
	pub fn remove(&self, id: &str) {
		self.shared.state.borrow_mut().remove(id);
		self.schedule_render();
	}

	/// Removes everything. Calling it on an empty graph is a no-op.
	pub fn clear(&self) {
		self.shared.state.borrow_mut().clear();
		self.schedule_render();
	}

	/// Current size multiplier.
	pub fn scale(&self) -> f64 {
		self.shared.state.borrow().scale()
	}

	/// Sets the size multiplier. Drawn shapes resize on the next render.
	pub fn set_scale(&self, scale: f64) -> bool {
		let accepted = self.shared.state.borrow_mut().set_scale(scale);
		if accepted {
			self.schedule_render();
		}
		accepted
	}

	/// Sets inline styles on every element currently in the scene that matches
	/// `selector` (`.class`, `.a.b`, `#id`). Returns the number of elements.
	pub fn style(&self, selector: &str, properties: &[(&str, &str)]) -> usize {
		self.shared.state.borrow_mut().style(selector, properties)
	}

	/// Advances one animation frame.
	pub fn tick(&self, elapsed_ms: f64) -> bool {
		self.shared.state.borrow_mut().tick(elapsed_ms)
	}

	/// Id of the topmost draggable node under `(x, y)`.
	pub fn node_at(&self, x: f64, y: f64) -> Option<String> {
		self.shared.state.borrow().node_at(x, y).map(str::to_string)
	}

	/// Pins `id` and reheats the layout. Returns false for unknown nodes.
	pub fn drag_start(&self, id: &str) -> bool {
		self.shared.state.borrow_mut().drag_start(id)
	}

	/// Moves a pinned node.
	pub fn drag_to(&self, id: &str, x: f64, y: f64) -> bool {
		self.shared.state.borrow_mut().drag_to(id, x, y)
	}

	/// Releases `id`. The layout cools once no gesture holds a node.
	pub fn drag_end(&self, id: &str) {
		self.shared.state.borrow_mut().drag_end(id);
	}

	/// Nodes in the data set.
	pub fn node_count(&self) -> usize {
		self.shared.state.borrow().nodes().len()
	}

	/// Links in the data set.
	pub fn link_count(&self) -> usize {
		self.shared.state.borrow().links().len()
	}

	/// Completed render passes, including the initial one.
	pub fn render_count(&self) -> usize {
		self.shared.state.borrow().render_passes()
	}

	/// A render is scheduled but has not run yet.
	pub fn is_render_pending(&self) -> bool {
		self.shared.render_pending.get()
	}

	/// Read access to the engine state, e.g. for painting.
	pub fn with_state<R>(&self, f: impl FnOnce(&GraphState) -> R) -> R {
		f(&self.shared.state.borrow())
	}

	/// Borrows the engine state. Do not hold the guard across mutations.
	pub fn state(&self) -> Ref<'_, GraphState> {
		self.shared.state.borrow()
	}

	fn schedule_render(&self) {
		if self.shared.render_pending.replace(true) {
			return;
		}
		let weak = Rc::downgrade(&self.shared);
		self.shared.scheduler.schedule(Box::new(move || {
			if let Some(shared) = weak.upgrade() {
				render(&shared);
			}
		}));
	}
}

fn render(shared: &Rc<Shared>) {
	shared.render_pending.set(false);
	let measure = {
		let mut state = shared.state.borrow_mut();
		state.render();
		state.has_pending_measure()
	};
	if measure {
		schedule_measure(shared, Rc::downgrade(shared));
	}
}

/// Icon bounding boxes are measured on the macrotask after the render that
/// inserted them.
fn schedule_measure(shared: &Shared, weak: Weak<Shared>) {
	shared.scheduler.schedule(Box::new(move || {
		if let Some(shared) = weak.upgrade() {
			shared.state.borrow_mut().measure_icons();
		}
	}));
}

#[cfg(test)]
mod tests {
	use float_cmp::approx_eq;

	use super::*;
	use crate::components::force_graph::scene::Geometry;
	use crate::components::force_graph::scheduler::ManualScheduler;
	use crate::components::force_graph::types::{Link, Node};

	fn graph() -> (Graph, ManualScheduler) {
		graph_with(GraphConfig::new(800.0, 600.0))
	}

	fn graph_with(config: GraphConfig) -> (Graph, ManualScheduler) {
		let scheduler = ManualScheduler::new();
		(Graph::new(config, Rc::new(scheduler.clone())), scheduler)
	}

	fn data(nodes: &[&str], links: &[(&str, &str)]) -> GraphData {
		GraphData::new(
			nodes.iter().map(|id| Node::new(*id)).collect(),
			links.iter().map(|(s, t)| Link::new(*s, *t)).collect(),
		)
	}

	#[test]
	fn construction_renders_synchronously() {
		let (graph, scheduler) = graph();
		assert_eq!(graph.render_count(), 1);
		assert_eq!(graph.node_count(), 0);
		assert_eq!(scheduler.pending(), 0);

		let (graph, _) = graph_with(
			GraphConfig::new(800.0, 600.0).with_data(data(&["a", "b"], &[("a", "b")])),
		);
		assert_eq!(graph.render_count(), 1);
		graph.with_state(|state| {
			assert_eq!(state.scene().nodes().len(), 2);
			assert_eq!(state.scene().links().len(), 1);
		});
	}

	#[test]
	fn mutations_render_on_a_later_task() {
		let (graph, scheduler) = graph();
		graph.add(data(&["device-0"], &[]));
		assert!(graph.is_render_pending());
		assert_eq!(graph.render_count(), 1);
		assert!(graph.state().scene().nodes().is_empty());

		scheduler.run_until_idle();
		assert!(!graph.is_render_pending());
		assert_eq!(graph.render_count(), 2);
		assert_eq!(graph.state().scene().nodes().len(), 1);
	}

	#[test]
	fn synchronous_mutations_coalesce_into_one_render() {
		let (graph, scheduler) = graph();
		graph.add(data(&["a"], &[]));
		graph.add(data(&["b"], &[("a", "b")]));
		graph.add(data(&["c"], &[("b", "c")]));
		assert_eq!(scheduler.pending(), 1);

		scheduler.run_until_idle();
		assert_eq!(graph.render_count(), 2);
		assert_eq!(graph.state().scene().nodes().len(), 3);

		graph.unlink("a", "b");
		graph.remove("c");
		graph.set_scale(0.5);
		scheduler.run_until_idle();
		assert_eq!(graph.render_count(), 3);
	}

	#[test]
	fn adding_an_existing_id_keeps_one_element() {
		let (graph, scheduler) = graph();
		graph.add(data(&["server-0"], &[]));
		scheduler.run_until_idle();
		graph.add(GraphData::new(
			vec![Node::new("server-0").with_cls("comm erlang")],
			vec![],
		));
		scheduler.run_until_idle();

		assert_eq!(graph.node_count(), 1);
		let state = graph.state();
		let elements: Vec<_> = state
			.scene()
			.nodes()
			.iter()
			.filter(|n| n.key() == "server-0")
			.collect();
		assert_eq!(elements.len(), 1);
		assert!(elements[0].visual.has_class("erlang"));
	}

	#[test]
	fn clear_is_idempotent() {
		let (graph, scheduler) = graph();
		graph.add(data(&["a", "b"], &[("a", "b")]));
		scheduler.run_until_idle();

		graph.clear();
		scheduler.run_until_idle();
		graph.tick(1000.0);
		let once = (graph.node_count(), graph.link_count(), graph.state().scene().nodes().len());

		graph.clear();
		scheduler.run_until_idle();
		graph.tick(1000.0);
		let twice = (graph.node_count(), graph.link_count(), graph.state().scene().nodes().len());

		assert_eq!(once, (0, 0, 0));
		assert_eq!(once, twice);
	}

	#[test]
	fn unlink_is_symmetric() {
		for (a, b) in [("a", "b"), ("b", "a")] {
			let (graph, scheduler) = graph();
			graph.add(data(&["a", "b"], &[("a", "b")]));
			scheduler.run_until_idle();

			graph.unlink(a, b);
			scheduler.run_until_idle();
			assert_eq!(graph.link_count(), 0);
			assert!(graph.state().scene().link("a-b").unwrap().visual.is_exiting());
		}
	}

	#[test]
	fn remove_cascades_to_links() {
		let (graph, scheduler) = graph();
		graph.add(data(
			&["server-0", "db-0", "db-1"],
			&[("server-0", "db-0"), ("db-1", "server-0"), ("db-0", "db-1")],
		));
		scheduler.run_until_idle();

		graph.remove("server-0");
		graph.remove("nobody");
		scheduler.run_until_idle();

		assert_eq!(graph.node_count(), 2);
		assert_eq!(graph.link_count(), 1);
		graph.with_state(|state| {
			assert!(state.links().iter().all(|l| !l.touches("server-0")));
		});
	}

	#[test]
	fn rescale_halves_every_dimension() {
		let sizes = |scale: f64| {
			let (graph, scheduler) = graph();
			graph.set_scale(scale);
			graph.add(data(&["device-0", "wifi-0"], &[("device-0", "wifi-0")]));
			scheduler.run_until_idle();
			graph.tick(500.0);

			let state = graph.state();
			let body = match state.scene().node("device-0").and_then(|n| n.shape("body")) {
				Some(shape) => match shape.target() {
					Geometry::Rect { width, .. } => *width,
					other => panic!("unexpected geometry {other:?}"),
				},
				None => panic!("device without body"),
			};
			body
		};

		assert!(approx_eq!(f64, sizes(0.5), sizes(1.0) * 0.5, epsilon = 1e-9));
	}

	#[test]
	fn settled_layout_shortens_with_scale() {
		let distance = |scale: f64| {
			let (graph, scheduler) = graph_with(GraphConfig::new(800.0, 600.0).with_forces(
				ForceConfig {
					active_alpha_target: 0.0,
					..ForceConfig::default()
				},
			));
			graph.set_scale(scale);
			graph.add(data(&["device-0", "wifi-0"], &[("device-0", "wifi-0")]));
			scheduler.run_until_idle();
			while graph.tick(16.0) {}

			let state = graph.state();
			let (a, b) = (&state.nodes()[0], &state.nodes()[1]);
			((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
		};

		let full = distance(1.0);
		let half = distance(0.5);
		assert!((140.0..165.0).contains(&full), "full {full}");
		assert!((70.0..90.0).contains(&half), "half {half}");
	}

	#[test]
	fn icons_are_centered_on_the_following_task() {
		let (graph, scheduler) = graph();
		graph.add(data(&["db-0"], &[]));

		assert!(scheduler.run_next());
		assert!(graph.state().has_pending_measure());
		assert_eq!(scheduler.pending(), 1);

		scheduler.run_until_idle();
		assert!(!graph.state().has_pending_measure());
	}

	#[test]
	fn style_colours_current_elements() {
		let (graph, scheduler) = graph();
		graph.add(GraphData::new(
			vec![
				Node::new("server-0").with_cls("comm erlang"),
				Node::new("db-0").with_cls("mongo"),
			],
			vec![Link::new("server-0", "db-0").with_cls("mongo")],
		));
		assert_eq!(graph.style(".mongo", &[("color", "#6FAD4F")]), 0);

		scheduler.run_until_idle();
		assert_eq!(graph.style(".mongo", &[("color", "#6FAD4F")]), 2);
		assert_eq!(graph.style("#server-0", &[("color", "#7B1333")]), 1);
		assert_eq!(graph.style("not a selector", &[("color", "red")]), 0);
	}

	#[test]
	fn dropped_engine_cancels_pending_render() {
		let (graph, scheduler) = graph();
		graph.add(data(&["a"], &[]));
		drop(graph);
		assert_eq!(scheduler.run_until_idle(), 1);
	}

	#[test]
	fn scripted_topology_scenario() {
		let (graph, scheduler) = graph();

		graph.set_scale(1.0);
		graph.add(data(&["device-0", "wifi-0"], &[("device-0", "wifi-0")]));
		graph.unlink("device-0", "wifi-0");
		graph.add(GraphData::new(
			vec![Node::new("server-0").with_cls("comm erlang")],
			vec![
				Link::new("server-0", "wifi-0"),
				Link::new("server-0", "device-0").with_cls("http"),
			],
		));
		scheduler.run_until_idle();

		assert_eq!(graph.render_count(), 2);
		assert_eq!(graph.node_count(), 3);
		assert_eq!(graph.link_count(), 2);
		graph.with_state(|state| {
			let scene = state.scene();
			assert!(scene.link("device-0-wifi-0").is_none());
			assert!(scene.link("server-0-wifi-0").is_some());
			assert!(scene.link("server-0-device-0").unwrap().visual.has_class("http"));
			let server = scene.node("server-0").unwrap();
			assert!(server.visual.has_class("comm"));
			assert!(server.visual.has_class("erlang"));
			assert_eq!(server.shapes.len(), 10);
		});
	}
}
