//! Engine state: the data set, the simulation and the scene it is drawn into.
//!
//! Mutations only touch the data set. [`GraphState::render`] reconciles the
//! scene against it by key, and [`GraphState::tick`] advances the layout and
//! copies node positions into the already rendered elements.

use std::collections::{HashMap, HashSet};

use super::config::{ForceConfig, TransitionConfig};
use super::scene::{LinkElement, NodeElement, Scene, Visual};
use super::shapes::{RenderParams, ShapeRegistry, ShapeRenderer, measure_icon};
use super::simulation::Simulation;
use super::types::{GraphData, Link, Node};
use super::utils::{self, remove_where};

/// Tracks in-progress drag gestures.
#[derive(Clone, Debug, Default)]
pub struct DragState {
	/// Gestures currently holding a node.
	pub active: usize,
}

/// Data set, simulation and scene of one graph.
pub struct GraphState {
	nodes: Vec<Node>,
	links: Vec<Link>,
	scene: Scene,
	simulation: Simulation,
	registry: ShapeRegistry,
	transitions: TransitionConfig,
	active_alpha_target: f64,
	hit_radius: f64,
	drag: DragState,
	scale: f64,
	width: f64,
	height: f64,
	render_passes: usize,
}

impl GraphState {
	/// An empty graph laid out around the middle of a `width` x `height`
	/// surface.
	pub fn new(
		width: f64,
		height: f64,
		forces: ForceConfig,
		transitions: TransitionConfig,
		registry: ShapeRegistry,
	) -> Self {
		let active_alpha_target = forces.active_alpha_target;
		let hit_radius = forces.collide_radius;
		Self {
			nodes: Vec::new(),
			links: Vec::new(),
			scene: Scene::default(),
			simulation: Simulation::new(forces, (width / 2.0, height / 2.0)),
			registry,
			transitions,
			active_alpha_target,
			hit_radius,
			drag: DragState::default(),
			scale: 1.0,
			width,
			height,
			render_passes: 0,
		}
	}

	/// Nodes in insertion order.
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// Links in insertion order.
	pub fn links(&self) -> &[Link] {
		&self.links
	}

	/// The node with id `id`.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Elements as of the last render, including ones fading out.
	pub fn scene(&self) -> &Scene {
		&self.scene
	}

	/// The force layout.
	pub fn simulation(&self) -> &Simulation {
		&self.simulation
	}

	/// Size multiplier of the next render.
	pub fn scale(&self) -> f64 {
		self.scale
	}

	/// Surface width.
	pub fn width(&self) -> f64 {
		self.width
	}

	/// Surface height.
	pub fn height(&self) -> f64 {
		self.height
	}

	/// Number of completed render passes.
	pub fn render_passes(&self) -> usize {
		self.render_passes
	}

	/// Appends new nodes and links. Nodes start at the viewport center at
	/// rest. Nodes or links that already exist are merged: the existing entry
	/// keeps its place (and position), provided fields overwrite.
	pub fn add(&mut self, data: GraphData) {
		let center = (self.width / 2.0, self.height / 2.0);

		for node in data.nodes {
			match self.nodes.iter_mut().find(|n| n.id == node.id) {
				Some(existing) => {
					if node.cls.is_some() {
						existing.cls = node.cls;
					}
				}
				None => self.nodes.push(Node {
					x: center.0,
					y: center.1,
					vx: 0.0,
					vy: 0.0,
					fx: None,
					fy: None,
					..node
				}),
			}
		}

		for link in data.links {
			let key = link.key();
			match self.links.iter_mut().find(|l| l.key() == key) {
				Some(existing) => {
					if link.cls.is_some() {
						existing.cls = link.cls;
					}
					if link.distance.is_some() {
						existing.distance = link.distance;
					}
				}
				None => self.links.push(link),
			}
		}
	}

	/// Drops every link between `a` and `b`, in either direction.
	pub fn unlink(&mut self, a: &str, b: &str) -> usize {
		remove_where(&mut self.links, |link| link.connects(a, b))
	}

	/// Drops the node `id` and every link touching it. Returns whether the
	/// node existed.
	pub fn remove(&mut self, id: &str) -> bool {
		let removed = remove_where(&mut self.nodes, |node| node.id == id);
		remove_where(&mut self.links, |link| link.touches(id));
		if removed > 0 {
			self.reindex_links();
		}
		removed > 0
	}

	/// Follows already resolved endpoints to their node's new index. Links
	/// still unresolved wait for the next render.
	fn reindex_links(&mut self) {
		let index = node_index(&self.nodes);
		for link in &mut self.links {
			for endpoint in [&mut link.source, &mut link.target] {
				if endpoint.is_resolved() {
					endpoint.resolve(index.get(endpoint.id()).copied());
				}
			}
		}
	}

	/// Drops every node and link. Their elements fade out on the next render.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.links.clear();
	}

	/// Sets the size multiplier used from the next render on. Rejects values
	/// that are not positive and finite.
	pub fn set_scale(&mut self, scale: f64) -> bool {
		if !(scale.is_finite() && scale > 0.0) {
			log::warn!("topology-graph: rejecting scale {}", scale);
			return false;
		}
		self.scale = scale;
		true
	}

	/// Sets inline styles on current scene elements matching `selector`.
	pub fn style(&mut self, selector: &str, properties: &[(&str, &str)]) -> usize {
		utils::style(&mut self.scene, selector, properties)
	}

	fn render_params(&self) -> RenderParams {
		RenderParams {
			scale: self.scale,
			duration_ms: self.transitions.update_ms,
		}
	}

	/// One reconciliation pass of the scene against the data set.
	pub fn render(&mut self) {
		self.resolve_links();
		self.render_nodes();
		self.render_links();

		for element in self.scene.nodes_mut() {
			element.draggable = !element.visual.is_exiting();
		}

		self.simulation.set_scale(self.scale);
		self.simulation.set_alpha_target(self.active_alpha_target);
		self.simulation.restart();
		self.sync_positions();

		self.render_passes += 1;
		log::debug!(
			"topology-graph: render pass {} ({} nodes, {} links, scale {})",
			self.render_passes,
			self.nodes.len(),
			self.links.len(),
			self.scale
		);
	}

	fn resolve_links(&mut self) {
		let index = node_index(&self.nodes);

		for link in &mut self.links {
			let source = index.get(link.source.id()).copied();
			let target = index.get(link.target.id()).copied();
			link.source.resolve(source);
			link.target.resolve(target);
		}
	}

	fn render_nodes(&mut self) {
		let params = self.render_params();
		let exit_ms = self.transitions.exit_ms;

		let live: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
		for element in self.scene.nodes_mut() {
			if !live.contains(element.key()) {
				element.visual.begin_exit(exit_ms);
			}
		}

		// One renderer per node type and pass.
		let mut renderers: HashMap<&str, Box<dyn ShapeRenderer>> = HashMap::new();
		for node in &self.nodes {
			let kind = node.kind();
			let renderer = renderers
				.entry(kind)
				.or_insert_with(|| self.registry.resolve(kind, &params));

			match self.scene.node_mut(&node.id) {
				Some(element) => {
					element.visual.revive();
					element.visual.classes = Visual::class_list("node", node.cls.as_deref());
					renderer.update(element);
				}
				None => {
					let mut element = NodeElement::new(node.id.clone(), kind, node.cls.as_deref());
					element.x = node.x;
					element.y = node.y;
					renderer.enter(&mut element);
					renderer.update(&mut element);
					self.scene.insert_node(element);
				}
			}
		}
	}

	fn render_links(&mut self) {
		let exit_ms = self.transitions.exit_ms;

		let live: HashSet<String> = self.links.iter().map(Link::key).collect();
		for element in self.scene.links_mut() {
			if !live.contains(element.key()) {
				element.visual.begin_exit(exit_ms);
			}
		}

		for link in &self.links {
			let key = link.key();
			match self.scene.link_mut(&key) {
				Some(element) => {
					element.visual.revive();
					element.visual.classes = Visual::class_list("link", link.cls.as_deref());
				}
				None => self
					.scene
					.insert_link(LinkElement::new(key, link.cls.as_deref())),
			}
		}
	}

	/// True when some icon waits for its bounding box to be measured.
	pub fn has_pending_measure(&self) -> bool {
		self.scene.nodes().iter().any(|n| n.measure.is_some())
	}

	/// Completes pending icon measurements. Returns how many ran.
	pub fn measure_icons(&mut self) -> usize {
		self.scene
			.nodes_mut()
			.map(measure_icon)
			.filter(|&measured| measured)
			.count()
	}

	/// Advances one frame: steps the simulation if it is running, moves the
	/// elements to the new positions and advances transitions. Returns
	/// whether the simulation stepped.
	pub fn tick(&mut self, elapsed_ms: f64) -> bool {
		let stepped = self.simulation.step(&mut self.nodes, &self.links);
		if stepped {
			self.sync_positions();
		}

		let finished = self.scene.advance(elapsed_ms);
		if !finished.is_empty() {
			let params = self.render_params();
			for mut element in finished {
				self.registry
					.resolve(&element.kind, &params)
					.exit(&mut element);
				log::debug!("topology-graph: {} left the scene", element.key());
			}
		}
		stepped
	}

	/// Copies node positions into node translations and link endpoints.
	pub fn sync_positions(&mut self) {
		let positions: HashMap<&str, (f64, f64)> = self
			.nodes
			.iter()
			.map(|n| (n.id.as_str(), (n.x, n.y)))
			.collect();
		for element in self.scene.nodes_mut() {
			if let Some(&(x, y)) = positions.get(element.key()) {
				element.x = x;
				element.y = y;
			}
		}

		let ends: HashMap<String, ((f64, f64), (f64, f64))> = self
			.links
			.iter()
			.filter_map(|link| {
				let source = &self.nodes[link.source.index_in(&self.nodes)?];
				let target = &self.nodes[link.target.index_in(&self.nodes)?];
				Some((link.key(), ((source.x, source.y), (target.x, target.y))))
			})
			.collect();
		for element in self.scene.links_mut() {
			match ends.get(element.key()) {
				Some(&((x1, y1), (x2, y2))) => {
					element.x1 = x1;
					element.y1 = y1;
					element.x2 = x2;
					element.y2 = y2;
					element.attached = true;
				}
				// Exiting links keep their last position while they fade.
				None if element.visual.is_exiting() => {}
				None => element.attached = false,
			}
		}
	}

	/// Topmost draggable node whose collision circle contains `(x, y)`.
	pub fn node_at(&self, x: f64, y: f64) -> Option<&str> {
		let radius = self.hit_radius * self.scale;
		self.nodes
			.iter()
			.rev()
			.filter(|node| {
				self.scene
					.node(&node.id)
					.is_some_and(|element| element.draggable)
			})
			.find(|node| (node.x - x).powi(2) + (node.y - y).powi(2) <= radius * radius)
			.map(|node| node.id.as_str())
	}

	/// Pins `id` where it is and heats the simulation up for the first
	/// concurrent gesture.
	pub fn drag_start(&mut self, id: &str) -> bool {
		let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
			return false;
		};
		node.fx = Some(node.x);
		node.fy = Some(node.y);

		if self.drag.active == 0 {
			self.simulation.set_alpha_target(self.active_alpha_target);
			self.simulation.restart();
		}
		self.drag.active += 1;
		true
	}

	/// Moves the pin of a dragged node.
	pub fn drag_to(&mut self, id: &str, x: f64, y: f64) -> bool {
		match self.nodes.iter_mut().find(|n| n.id == id) {
			Some(node) if node.is_pinned() => {
				node.fx = Some(x);
				node.fy = Some(y);
				true
			}
			_ => false,
		}
	}

	/// Releases `id`. The simulation cools once the last gesture ends.
	pub fn drag_end(&mut self, id: &str) {
		if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
			node.fx = None;
			node.fy = None;
		}

		self.drag.active = self.drag.active.saturating_sub(1);
		if self.drag.active == 0 {
			self.simulation.set_alpha_target(0.0);
		}
	}
}

fn node_index(nodes: &[Node]) -> HashMap<&str, usize> {
	nodes
		.iter()
		.enumerate()
		.map(|(i, node)| (node.id.as_str(), i))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::scene::Geometry;

	fn state() -> GraphState {
		GraphState::new(
			800.0,
			600.0,
			ForceConfig::default(),
			TransitionConfig::default(),
			ShapeRegistry::default(),
		)
	}

	fn data(nodes: &[&str], links: &[(&str, &str)]) -> GraphData {
		GraphData::new(
			nodes.iter().map(|id| Node::new(*id)).collect(),
			links.iter().map(|(s, t)| Link::new(*s, *t)).collect(),
		)
	}

	#[test]
	fn new_nodes_start_at_center_at_rest() {
		let mut state = state();
		let mut node = Node::new("device-0");
		node.x = 5.0;
		node.vx = 3.0;
		state.add(GraphData::new(vec![node], vec![]));

		let node = state.node("device-0").unwrap();
		assert_eq!((node.x, node.y), (400.0, 300.0));
		assert_eq!((node.vx, node.vy), (0.0, 0.0));
	}

	#[test]
	fn duplicate_ids_merge() {
		let mut state = state();
		state.add(data(&["server-0"], &[("server-0", "db-0")]));
		state.nodes[0].x = 10.0;

		state.add(GraphData::new(
			vec![Node::new("server-0").with_cls("comm erlang")],
			vec![Link::new("server-0", "db-0").with_cls("mongo")],
		));

		assert_eq!(state.nodes().len(), 1);
		assert_eq!(state.nodes()[0].x, 10.0);
		assert_eq!(state.nodes()[0].cls.as_deref(), Some("comm erlang"));
		assert_eq!(state.links().len(), 1);
		assert_eq!(state.links()[0].cls.as_deref(), Some("mongo"));

		// No cls given: the old one stays.
		state.add(data(&["server-0"], &[]));
		assert_eq!(state.nodes()[0].cls.as_deref(), Some("comm erlang"));
	}

	#[test]
	fn unlink_and_remove() {
		let mut state = state();
		state.add(data(
			&["a", "b", "c"],
			&[("a", "b"), ("b", "a"), ("b", "c"), ("c", "a")],
		));

		assert_eq!(state.unlink("b", "a"), 2);
		assert_eq!(state.unlink("b", "a"), 0);
		assert!(state.remove("c"));
		assert!(!state.remove("c"));
		assert_eq!(state.nodes().len(), 2);
		assert!(state.links().is_empty());
	}

	#[test]
	fn invalid_scale_is_rejected() {
		let mut state = state();
		assert!(!state.set_scale(0.0));
		assert!(!state.set_scale(-1.0));
		assert!(!state.set_scale(f64::NAN));
		assert!(!state.set_scale(f64::INFINITY));
		assert_eq!(state.scale(), 1.0);
		assert!(state.set_scale(0.5));
		assert_eq!(state.scale(), 0.5);
	}

	#[test]
	fn render_enters_updates_and_exits() {
		let mut state = state();
		state.add(data(&["device-0", "wifi-0"], &[("device-0", "wifi-0")]));
		state.render();

		assert_eq!(state.scene().nodes().len(), 2);
		assert_eq!(state.scene().links().len(), 1);
		assert!(state.scene().nodes().iter().all(|n| n.draggable));
		let link = state.scene().link("device-0-wifi-0").unwrap();
		assert!(link.attached);
		assert_eq!((link.x1, link.y1), (400.0, 300.0));

		state.remove("wifi-0");
		state.render();
		let wifi = state.scene().node("wifi-0").unwrap();
		assert!(wifi.visual.is_exiting());
		assert!(!wifi.draggable);
		assert!(state.scene().link("device-0-wifi-0").unwrap().visual.is_exiting());

		state.tick(1000.0);
		assert!(state.scene().node("wifi-0").is_none());
		assert!(state.scene().links().is_empty());
		assert_eq!(state.scene().nodes().len(), 1);
	}

	#[test]
	fn reappearing_key_revives_element() {
		let mut state = state();
		state.add(data(&["mobile-0"], &[]));
		state.render();
		state.clear();
		state.render();
		state.tick(400.0);

		state.add(data(&["mobile-0"], &[]));
		state.render();
		let element = state.scene().node("mobile-0").unwrap();
		assert!(!element.visual.is_exiting());
		assert_eq!(element.visual.opacity(), 1.0);

		state.tick(1000.0);
		assert_eq!(state.scene().nodes().len(), 1);
	}

	#[test]
	fn dangling_link_attaches_once_its_node_arrives() {
		let mut state = state();
		state.add(data(&["server-1"], &[("server-1", "db-0")]));
		state.render();
		assert!(!state.scene().link("server-1-db-0").unwrap().attached);

		state.add(data(&["db-0"], &[]));
		state.render();
		assert!(state.scene().link("server-1-db-0").unwrap().attached);
	}

	#[test]
	fn removing_a_node_keeps_unrelated_links_attached() {
		let mut state = state();
		state.add(data(
			&["device-0", "server-0", "db-0"],
			&[("server-0", "db-0")],
		));
		state.render();
		state.tick(16.0);
		assert!(state.scene().link("server-0-db-0").unwrap().attached);

		assert!(state.remove("device-0"));
		assert!(state.tick(16.0));
		let link = state.scene().link("server-0-db-0").unwrap();
		assert!(link.attached);
		let db = state.node("db-0").unwrap();
		assert_eq!((link.x2, link.y2), (db.x, db.y));
	}

	#[test]
	fn rescale_applies_on_next_render() {
		let mut state = state();
		state.add(data(&["device-0"], &[]));
		state.render();
		state.tick(500.0);

		state.set_scale(0.5);
		let body = |state: &GraphState| {
			let element = state.scene().node("device-0").unwrap();
			element.shape("body").unwrap().target().clone()
		};
		assert!(matches!(body(&state), Geometry::Rect { width, .. } if width == 50.0));

		state.render();
		assert!(matches!(body(&state), Geometry::Rect { width, .. } if width == 25.0));
		assert_eq!(state.simulation().scale(), 0.5);
	}

	#[test]
	fn icons_are_measured_after_render() {
		let mut state = state();
		state.add(data(&["db-0"], &[]));
		state.render();
		assert!(state.has_pending_measure());
		assert_eq!(state.measure_icons(), 1);
		assert!(!state.has_pending_measure());
		assert_eq!(state.measure_icons(), 0);
	}

	#[test]
	fn drag_pins_and_releases() {
		let mut state = state();
		state.add(data(&["device-0", "wifi-0"], &[("device-0", "wifi-0")]));
		state.render();
		state.drag_end("device-0");
		assert_eq!(state.simulation().alpha_target(), 0.0);

		assert_eq!(state.node_at(400.0, 300.0), Some("wifi-0"));
		assert_eq!(state.node_at(0.0, 0.0), None);

		assert!(state.drag_start("device-0"));
		assert_eq!(state.simulation().alpha_target(), 1.0);
		assert!(state.drag_to("device-0", 100.0, 120.0));
		state.tick(16.0);
		let node = state.node("device-0").unwrap();
		assert_eq!((node.x, node.y), (100.0, 120.0));
		assert_eq!(state.scene().node("device-0").unwrap().x, 100.0);

		// A second gesture keeps the simulation hot until both end.
		assert!(state.drag_start("wifi-0"));
		state.drag_end("device-0");
		assert_eq!(state.simulation().alpha_target(), 1.0);
		state.drag_end("wifi-0");
		assert_eq!(state.simulation().alpha_target(), 0.0);

		assert!(!state.node("device-0").unwrap().is_pinned());
		assert!(!state.drag_to("device-0", 0.0, 0.0));
		assert!(!state.drag_start("ghost"));
	}
}
