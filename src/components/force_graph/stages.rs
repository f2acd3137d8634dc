//! The scripted reveal of the demo topology.
//!
//! Each key press runs the next stage against the graph. Past the last
//! stage the graph is cleared and the script starts over.

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

use super::graph::Graph;
use super::types::{GraphData, Link, Node};
use super::utils::{any_of, rand};

/// Stage script settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StageConfig {
	/// `KeyboardEvent.key` that advances the script.
	pub advance_key: String,
	/// Stages run at startup.
	pub prefill_stages: usize,
	/// Seed of the random choices; random when absent.
	pub seed: Option<u64>,
}

impl Default for StageConfig {
	fn default() -> Self {
		Self {
			advance_key: "x".to_string(),
			prefill_stages: 10,
			seed: None,
		}
	}
}

/// Brand colours applied by the styling stages.
pub fn palette() -> HashMap<&'static str, &'static str> {
	[
		("rheem", "#CD2A39"),
		("websocket", "#E66728"),
		("http", "#455D93"),
		("dart", "#3A77C3"),
		("erlang", "#7B1333"),
		("psql", "#45688C"),
		("mongo", "#6FAD4F"),
	]
	.into_iter()
	.collect()
}

/// One step of the script.
pub type Stage = Box<dyn Fn(&Graph, &mut StdRng)>;

/// Runs the stages in order, one per call to [`StageScript::next`].
pub struct StageScript {
	stages: Vec<Stage>,
	current: usize,
	rng: StdRng,
}

impl StageScript {
	/// The topology walkthrough, with random choices drawn from `seed`.
	pub fn new(seed: u64) -> Self {
		Self::with_stages(topology_stages(), seed)
	}

	/// A script over custom `stages`.
	pub fn with_stages(stages: Vec<Stage>, seed: u64) -> Self {
		Self {
			stages,
			current: 0,
			rng: StdRng::seed_from_u64(seed),
		}
	}

	/// Index of the stage the next call runs.
	pub fn current(&self) -> usize {
		self.current
	}

	/// Number of stages.
	pub fn len(&self) -> usize {
		self.stages.len()
	}

	/// True for a script without stages.
	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}

	/// Runs the current stage, or clears the graph and rewinds once every
	/// stage has run.
	pub fn next(&mut self, graph: &Graph) {
		match self.stages.get(self.current) {
			Some(run) => {
				run(graph, &mut self.rng);
				self.current += 1;
				log::debug!("topology-graph: stage {}/{}", self.current, self.stages.len());
			}
			None => {
				graph.clear();
				self.current = 0;
				log::debug!("topology-graph: stages rewound");
			}
		}
	}

	/// Runs `count` stages back to back.
	pub fn prefill(&mut self, graph: &Graph, count: usize) {
		for _ in 0..count {
			self.next(graph);
		}
	}
}

fn stage(f: impl Fn(&Graph, &mut StdRng) + 'static) -> Stage {
	Box::new(f)
}

fn node(id: &str) -> Node {
	Node::new(id)
}

fn link(source: &str, target: &str) -> Link {
	Link::new(source, target)
}

/// Attaches `count` nodes of random kinds to `hub`, with random rest lengths.
fn swarm(graph: &Graph, rng: &mut StdRng, kinds: &[&str], count: usize, hub: &str, cls: &str) {
	for i in 0..count {
		let Some(kind) = any_of(rng, kinds) else {
			return;
		};
		let id = format!("{kind}-{}", 1 + i);
		let distance = rand(rng, 100, 600) as f64;
		graph.add(GraphData::new(
			vec![node(&id)],
			vec![link(&id, hub).with_distance(distance).with_cls(cls)],
		));
	}
}

fn paint(graph: &Graph, classes: &[&str]) {
	let colours = palette();
	for class in classes {
		// Links of the econet family use the vendor colour.
		let key = if *class == "econet" { "rheem" } else { *class };
		if let Some(&colour) = colours.get(key) {
			graph.style(&format!(".{class}"), &[("color", colour)]);
		}
	}
}

/// The stages of the topology walkthrough.
pub fn topology_stages() -> Vec<Stage> {
	vec![
		stage(|graph, _| {
			graph.set_scale(1.0);
			graph.add(GraphData::new(
				vec![node("device-0"), node("wifi-0")],
				vec![link("device-0", "wifi-0")],
			));
		}),
		stage(|graph, _| {
			graph.unlink("device-0", "wifi-0");
			graph.add(GraphData::new(
				vec![node("server-0").with_cls("comm erlang")],
				vec![
					link("server-0", "wifi-0"),
					link("server-0", "device-0").with_cls("http"),
				],
			));
		}),
		stage(|graph, _| {
			graph.add(GraphData::new(
				vec![node("hpwh-0"), node("ecc-0"), node("ewh-0")],
				vec![
					link("hpwh-0", "wifi-0").with_cls("econet"),
					link("ecc-0", "wifi-0").with_cls("econet"),
					link("ewh-0", "wifi-0").with_cls("econet"),
				],
			));
		}),
		stage(|graph, _| {
			graph.add(GraphData::new(
				vec![node("mobile-0")],
				vec![link("mobile-0", "server-0").with_cls("http")],
			));
		}),
		stage(|graph, _| {
			graph.unlink("server-0", "device-0");
			graph.unlink("server-0", "mobile-0");
			graph.add(GraphData::new(
				vec![node("server-1").with_cls("api-bridge dart")],
				vec![
					link("server-1", "mobile-0").with_cls("http"),
					link("server-1", "device-0").with_cls("http"),
				],
			));
		}),
		stage(|graph, _| {
			graph.add(GraphData::new(
				vec![node("db-0").with_cls("mongo")],
				vec![
					link("server-1", "db-0").with_cls("mongo"),
					link("server-0", "db-0").with_cls("mongo"),
					link("server-1", "server-0").with_cls("http"),
				],
			));
		}),
		stage(|graph, _| {
			graph.add(GraphData::new(
				vec![node("db-1").with_cls("psql")],
				vec![
					link("server-1", "db-1").with_cls("psql"),
					link("server-0", "db-1").with_cls("psql"),
				],
			));
		}),
		stage(|graph, _| {
			graph.unlink("server-0", "wifi-0");
			graph.add(GraphData::new(
				vec![node("server-2").with_cls("gateway dart")],
				vec![
					link("wifi-0", "server-2").with_cls("websocket"),
					link("server-0", "server-2").with_cls("http"),
				],
			));
		}),
		stage(|graph, rng| {
			graph.set_scale(0.5);
			swarm(graph, rng, &["device", "mobile"], 50, "server-1", "http");
		}),
		stage(|graph, rng| {
			graph.set_scale(0.4);
			swarm(graph, rng, &["wifi", "hpwh", "ecc", "ewh"], 100, "server-2", "econet");
		}),
		stage(|graph, _| paint(graph, &["dart", "erlang", "mongo", "psql"])),
		stage(|graph, _| paint(graph, &["econet", "websocket", "http"])),
	]
}
