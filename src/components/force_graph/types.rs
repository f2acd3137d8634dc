//! Graph data structures: the node and link set owned by the engine.

use serde::Deserialize;

/// A node in the topology.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Node {
	/// Unique identifier. The prefix before the first `-` names the node type
	/// (`device-0` is a device) and selects its shape renderer.
	pub id: String,
	/// Space separated class list, used only for styling.
	#[serde(default)]
	pub cls: Option<String>,
	/// Position. Reset to the surface middle when the node is added.
	#[serde(default)]
	pub x: f64,
	/// See [`Node::x`].
	#[serde(default)]
	pub y: f64,
	/// Velocity, owned by the simulation.
	#[serde(skip)]
	pub vx: f64,
	/// See [`Node::vx`].
	#[serde(skip)]
	pub vy: f64,
	/// Pinned x position, set while the node is dragged.
	#[serde(skip)]
	pub fx: Option<f64>,
	/// Pinned y position, set while the node is dragged.
	#[serde(skip)]
	pub fy: Option<f64>,
}

impl Node {
	/// A node with no class.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			..Self::default()
		}
	}

	/// Sets the class list.
	pub fn with_cls(mut self, cls: impl Into<String>) -> Self {
		self.cls = Some(cls.into());
		self
	}

	/// Type tag encoded in the id, e.g. `server` for `server-1`.
	pub fn kind(&self) -> &str {
		self.id.split('-').next().unwrap_or_default()
	}

	/// Held in place by a drag.
	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() || self.fy.is_some()
	}
}

/// One end of a link.
///
/// Links arrive naming their nodes by id and get resolved against the node
/// list on every render pass. Always compare endpoints through [`Endpoint::id`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Endpoint {
	/// Named by id only.
	Unresolved(String),
	/// Bound to the node at `index` in the node list.
	Resolved {
		/// Node id.
		id: String,
		/// Position in the node list at the last resolution.
		index: usize,
	},
}

impl Endpoint {
	/// Id of the node this end names.
	pub fn id(&self) -> &str {
		match self {
			Endpoint::Unresolved(id) => id,
			Endpoint::Resolved { id, .. } => id,
		}
	}

	/// Bound to a node index.
	pub fn is_resolved(&self) -> bool {
		matches!(self, Endpoint::Resolved { .. })
	}

	/// Index of the endpoint's node in `nodes`, if the endpoint is resolved
	/// and the index still points at the same node.
	pub fn index_in(&self, nodes: &[Node]) -> Option<usize> {
		match self {
			Endpoint::Unresolved(_) => None,
			Endpoint::Resolved { id, index } => nodes
				.get(*index)
				.filter(|node| node.id == *id)
				.map(|_| *index),
		}
	}

	/// Rebind to the node's current position in the node list. An endpoint
	/// whose node is missing falls back to [`Endpoint::Unresolved`].
	pub fn resolve(&mut self, index: Option<usize>) {
		let id = std::mem::take(match self {
			Endpoint::Unresolved(id) => id,
			Endpoint::Resolved { id, .. } => id,
		});
		*self = match index {
			Some(index) => Endpoint::Resolved { id, index },
			None => Endpoint::Unresolved(id),
		};
	}
}

impl From<String> for Endpoint {
	fn from(id: String) -> Self {
		Endpoint::Unresolved(id)
	}
}

impl From<&str> for Endpoint {
	fn from(id: &str) -> Self {
		Endpoint::Unresolved(id.to_string())
	}
}

/// A connection between two nodes. Stored with a direction, matched without one.
#[derive(Clone, Debug, Deserialize)]
pub struct Link {
	/// Start node.
	pub source: Endpoint,
	/// End node.
	pub target: Endpoint,
	/// Space separated class list, used only for styling.
	#[serde(default)]
	pub cls: Option<String>,
	/// Rest length before scaling. Falls back to the configured link distance.
	#[serde(default)]
	pub distance: Option<f64>,
}

impl Link {
	/// A link with the default rest length and no class.
	pub fn new(source: impl Into<Endpoint>, target: impl Into<Endpoint>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			cls: None,
			distance: None,
		}
	}

	/// Sets the class list.
	pub fn with_cls(mut self, cls: impl Into<String>) -> Self {
		self.cls = Some(cls.into());
		self
	}

	/// Sets the rest length.
	pub fn with_distance(mut self, distance: f64) -> Self {
		self.distance = Some(distance);
		self
	}

	/// Identity of the link's visual element: `"{source}-{target}"`.
	pub fn key(&self) -> String {
		format!("{}-{}", self.source.id(), self.target.id())
	}

	/// True when the link joins `a` and `b`, in either direction.
	pub fn connects(&self, a: &str, b: &str) -> bool {
		let (source, target) = (self.source.id(), self.target.id());
		(source == a && target == b) || (source == b && target == a)
	}

	/// True when either end is `id`.
	pub fn touches(&self, id: &str) -> bool {
		self.source.id() == id || self.target.id() == id
	}
}

/// A batch of nodes and links, as passed to `add` or loaded from the page.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphData {
	/// Nodes to add.
	#[serde(default)]
	pub nodes: Vec<Node>,
	/// Links to add. Their ends may name nodes that do not exist yet.
	#[serde(default)]
	pub links: Vec<Link>,
}

impl GraphData {
	/// A batch of `nodes` and `links`.
	pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
		Self { nodes, links }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_is_prefix_before_first_dash() {
		assert_eq!(Node::new("server-0").kind(), "server");
		assert_eq!(Node::new("db-1-replica").kind(), "db");
		assert_eq!(Node::new("router").kind(), "router");
	}

	#[test]
	fn endpoint_resolution_is_validated_against_node_list() {
		let nodes = vec![Node::new("a"), Node::new("b")];
		let mut end = Endpoint::from("b");
		assert_eq!(end.index_in(&nodes), None);

		end.resolve(Some(1));
		assert_eq!(end.index_in(&nodes), Some(1));
		assert_eq!(end.id(), "b");

		// Node "a" removed, so index 1 no longer exists.
		let shifted = vec![Node::new("b")];
		assert_eq!(end.index_in(&shifted), None);

		end.resolve(None);
		assert_eq!(end, Endpoint::Unresolved("b".into()));
	}

	#[test]
	fn link_matching_ignores_direction() {
		let link = Link::new("device-0", "wifi-0");
		assert_eq!(link.key(), "device-0-wifi-0");
		assert!(link.connects("wifi-0", "device-0"));
		assert!(link.connects("device-0", "wifi-0"));
		assert!(!link.connects("device-0", "server-0"));
		assert!(link.touches("wifi-0"));
	}

	#[test]
	fn graph_data_parses_from_page_json() {
		let data: GraphData = serde_json::from_str(
			r#"{
				"nodes": [{ "id": "server-0", "cls": "comm erlang" }, { "id": "db-0" }],
				"links": [{ "source": "server-0", "target": "db-0", "distance": 220 }]
			}"#,
		)
		.unwrap();

		assert_eq!(data.nodes.len(), 2);
		assert_eq!(data.nodes[0].cls.as_deref(), Some("comm erlang"));
		assert_eq!(data.links[0].source, Endpoint::Unresolved("server-0".into()));
		assert_eq!(data.links[0].distance, Some(220.0));
		assert_eq!(data.links[0].cls, None);
	}
}
