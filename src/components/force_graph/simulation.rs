//! Force-directed layout simulation.
//!
//! A velocity Verlet integrator with d3-force semantics. Each tick the
//! "energy" `alpha` moves towards `alpha_target`, four forces nudge node
//! velocities in proportion to alpha, and velocities are damped and applied:
//!
//! 1. link: springs pulling linked nodes towards their rest distance,
//! 2. charge: pairwise repulsion,
//! 3. collide: keeps node circles from overlapping,
//! 4. center: translates the layout so its mean sits on the viewport center.
//!
//! The simulation does not own a timer. The owner calls [`Simulation::step`]
//! once per frame; it runs while alpha stays above `alpha_min`. Nodes and
//! links are passed in on every step, so the data set can change between
//! steps without rebinding.

use super::config::ForceConfig;
use super::types::{Link, Node};

/// d3's linear congruential generator, used for jiggle.
#[derive(Clone, Debug)]
struct Lcg(u64);

impl Lcg {
	const A: u64 = 1_664_525;
	const C: u64 = 1_013_904_223;
	const M: u64 = 4_294_967_296;

	fn next(&mut self) -> f64 {
		self.0 = (Self::A * self.0 + Self::C) % Self::M;
		self.0 as f64 / Self::M as f64
	}

	/// A tiny random offset separating coincident nodes.
	fn jiggle(&mut self) -> f64 {
		(self.next() - 0.5) * 1e-6
	}
}

pub struct Simulation {
	config: ForceConfig,
	center: (f64, f64),
	scale: f64,
	alpha: f64,
	alpha_target: f64,
	running: bool,
	random: Lcg,
	degree: Vec<usize>,
	springs: Vec<(usize, usize, f64)>,
}

impl Simulation {
	pub fn new(config: ForceConfig, center: (f64, f64)) -> Self {
		Self {
			config,
			center,
			scale: 1.0,
			alpha: 1.0,
			alpha_target: 0.0,
			running: true,
			random: Lcg(1),
			degree: Vec::new(),
			springs: Vec::new(),
		}
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn alpha_target(&self) -> f64 {
		self.alpha_target
	}

	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target;
	}

	pub fn scale(&self) -> f64 {
		self.scale
	}

	/// Scale applied to link distances and collision radii from now on.
	pub fn set_scale(&mut self, scale: f64) {
		self.scale = scale;
	}

	pub fn restart(&mut self) {
		self.running = true;
	}

	/// Runs one tick if the simulation is active, stopping it once alpha has
	/// decayed below `alpha_min`. Returns whether a tick ran.
	pub fn step(&mut self, nodes: &mut [Node], links: &[Link]) -> bool {
		if !self.running {
			return false;
		}
		self.tick(nodes, links);
		if self.alpha < self.config.alpha_min {
			self.running = false;
			log::debug!("topology-graph: simulation settled");
		}
		true
	}

	/// Advances the layout by one tick regardless of the running state.
	pub fn tick(&mut self, nodes: &mut [Node], links: &[Link]) {
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

		self.apply_links(nodes, links);
		self.apply_charge(nodes);
		self.apply_collide(nodes);
		self.apply_center(nodes);

		let retain = 1.0 - self.config.velocity_decay;
		for node in nodes.iter_mut() {
			match node.fx {
				Some(fx) => {
					node.x = fx;
					node.vx = 0.0;
				}
				None => {
					node.vx *= retain;
					node.x += node.vx;
				}
			}
			match node.fy {
				Some(fy) => {
					node.y = fy;
					node.vy = 0.0;
				}
				None => {
					node.vy *= retain;
					node.y += node.vy;
				}
			}
		}
	}

	fn apply_links(&mut self, nodes: &mut [Node], links: &[Link]) {
		let base = self.config.link_distance;
		let scale = self.scale;
		self.springs.clear();
		self.springs.extend(links.iter().filter_map(|link| {
			let source = link.source.index_in(nodes)?;
			let target = link.target.index_in(nodes)?;
			(source != target).then(|| (source, target, link.distance.unwrap_or(base) * scale))
		}));

		self.degree.clear();
		self.degree.resize(nodes.len(), 0);
		for &(source, target, _) in &self.springs {
			self.degree[source] += 1;
			self.degree[target] += 1;
		}

		let strength = self.config.link_strength * self.alpha;
		for &(s, t, distance) in &self.springs {
			let mut x = nodes[t].x + nodes[t].vx - nodes[s].x - nodes[s].vx;
			let mut y = nodes[t].y + nodes[t].vy - nodes[s].y - nodes[s].vy;
			if x == 0.0 {
				x = self.random.jiggle();
			}
			if y == 0.0 {
				y = self.random.jiggle();
			}
			let l = (x * x + y * y).sqrt();
			let k = (l - distance) / l * strength;
			x *= k;
			y *= k;

			// The better connected end moves less.
			let bias = self.degree[s] as f64 / (self.degree[s] + self.degree[t]) as f64;
			nodes[t].vx -= x * bias;
			nodes[t].vy -= y * bias;
			nodes[s].vx += x * (1.0 - bias);
			nodes[s].vy += y * (1.0 - bias);
		}
	}

	fn apply_charge(&mut self, nodes: &mut [Node]) {
		let strength = self.config.charge_strength * self.alpha;
		let min2 = self.config.charge_distance_min * self.config.charge_distance_min;

		for i in 0..nodes.len() {
			let (xi, yi) = (nodes[i].x, nodes[i].y);
			let (mut dvx, mut dvy) = (0.0, 0.0);
			for (j, other) in nodes.iter().enumerate() {
				if i == j {
					continue;
				}
				let mut x = other.x - xi;
				let mut y = other.y - yi;
				let mut l = x * x + y * y;
				if x == 0.0 {
					x = self.random.jiggle();
					l += x * x;
				}
				if y == 0.0 {
					y = self.random.jiggle();
					l += y * y;
				}
				if l < min2 {
					l = (min2 * l).sqrt();
				}
				dvx += x * strength / l;
				dvy += y * strength / l;
			}
			nodes[i].vx += dvx;
			nodes[i].vy += dvy;
		}
	}

	fn apply_collide(&mut self, nodes: &mut [Node]) {
		let radius = self.config.collide_radius * self.scale;
		let reach = radius * 2.0;
		let strength = self.config.collide_strength;

		for i in 0..nodes.len() {
			let xi = nodes[i].x + nodes[i].vx;
			let yi = nodes[i].y + nodes[i].vy;
			for j in (i + 1)..nodes.len() {
				let mut x = xi - nodes[j].x - nodes[j].vx;
				let mut y = yi - nodes[j].y - nodes[j].vy;
				let mut l = x * x + y * y;
				if l >= reach * reach {
					continue;
				}
				if x == 0.0 {
					x = self.random.jiggle();
					l += x * x;
				}
				if y == 0.0 {
					y = self.random.jiggle();
					l += y * y;
				}
				let d = l.sqrt();
				let k = (reach - d) / d * strength;
				x *= k;
				y *= k;
				// Equal radii: the overlap is split evenly.
				nodes[i].vx += x * 0.5;
				nodes[i].vy += y * 0.5;
				nodes[j].vx -= x * 0.5;
				nodes[j].vy -= y * 0.5;
			}
		}
	}

	fn apply_center(&mut self, nodes: &mut [Node]) {
		if nodes.is_empty() {
			return;
		}
		let n = nodes.len() as f64;
		let (sx, sy) = nodes
			.iter()
			.fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
		let dx = (sx / n - self.center.0) * self.config.center_strength;
		let dy = (sy / n - self.center.1) * self.config.center_strength;
		for node in nodes.iter_mut() {
			node.x -= dx;
			node.y -= dy;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::types::Endpoint;

	fn at(id: &str, x: f64, y: f64) -> Node {
		Node {
			x,
			y,
			..Node::new(id)
		}
	}

	fn resolved(nodes: &[Node], source: &str, target: &str) -> Link {
		let mut link = Link::new(source, target);
		link.source
			.resolve(nodes.iter().position(|n| n.id == source));
		link.target
			.resolve(nodes.iter().position(|n| n.id == target));
		link
	}

	fn distance(a: &Node, b: &Node) -> f64 {
		((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
	}

	#[test]
	fn settles_after_alpha_decays() {
		let mut sim = Simulation::new(ForceConfig::default(), (0.0, 0.0));
		let mut nodes = vec![at("a", 0.0, 0.0)];
		let mut ticks = 0;
		while sim.step(&mut nodes, &[]) {
			ticks += 1;
			assert!(ticks < 1000, "simulation never settled");
		}
		assert!((299..=301).contains(&ticks), "settled after {ticks} ticks");
		assert!(!sim.step(&mut nodes, &[]));
	}

	#[test]
	fn high_alpha_target_keeps_running() {
		let mut sim = Simulation::new(ForceConfig::default(), (0.0, 0.0));
		sim.set_alpha_target(1.0);
		let mut nodes = vec![at("a", 0.0, 0.0)];
		for _ in 0..1000 {
			assert!(sim.step(&mut nodes, &[]));
		}
		assert!(sim.alpha() > 0.99);
	}

	#[test]
	fn linked_pair_relaxes_to_rest_distance() {
		let mut sim = Simulation::new(ForceConfig::default(), (400.0, 300.0));
		let mut nodes = vec![at("device-0", 400.0, 300.0), at("wifi-0", 410.0, 300.0)];
		let links = vec![resolved(&nodes, "device-0", "wifi-0")];

		while sim.step(&mut nodes, &links) {}

		let d = distance(&nodes[0], &nodes[1]);
		assert!((140.0..165.0).contains(&d), "distance {d}");
		let mid_x = (nodes[0].x + nodes[1].x) / 2.0;
		assert!((mid_x - 400.0).abs() < 1e-6);
	}

	#[test]
	fn scale_shortens_links() {
		let mut sim = Simulation::new(ForceConfig::default(), (0.0, 0.0));
		sim.set_scale(0.5);
		let mut nodes = vec![at("a", 0.0, 0.0), at("b", 10.0, 0.0)];
		let links = vec![resolved(&nodes, "a", "b").with_distance(200.0)];

		while sim.step(&mut nodes, &links) {}

		let d = distance(&nodes[0], &nodes[1]);
		assert!((95.0..115.0).contains(&d), "distance {d}");
	}

	#[test]
	fn coincident_nodes_separate() {
		let mut sim = Simulation::new(ForceConfig::default(), (0.0, 0.0));
		let mut nodes = vec![at("a", 0.0, 0.0), at("b", 0.0, 0.0), at("c", 0.0, 0.0)];
		for _ in 0..50 {
			sim.step(&mut nodes, &[]);
		}
		assert!(distance(&nodes[0], &nodes[1]) > 1.0);
		assert!(distance(&nodes[1], &nodes[2]) > 1.0);
		assert!(nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));
	}

	#[test]
	fn pinned_node_holds_position() {
		let mut sim = Simulation::new(ForceConfig::default(), (0.0, 0.0));
		let mut nodes = vec![at("a", 0.0, 0.0), at("b", 5.0, 0.0)];
		nodes[0].fx = Some(-100.0);
		nodes[0].fy = Some(50.0);
		let links = vec![resolved(&nodes, "a", "b")];

		for _ in 0..20 {
			sim.step(&mut nodes, &links);
			assert_eq!((nodes[0].x, nodes[0].y), (-100.0, 50.0));
			assert_eq!((nodes[0].vx, nodes[0].vy), (0.0, 0.0));
		}
	}

	#[test]
	fn stale_and_dangling_links_exert_no_force() {
		let mut sim = Simulation::new(
			ForceConfig {
				charge_strength: 0.0,
				center_strength: 0.0,
				..ForceConfig::default()
			},
			(0.0, 0.0),
		);
		let mut nodes = vec![at("a", 0.0, 0.0), at("b", 500.0, 0.0)];
		let dangling = Link::new("a", "ghost");
		let mut stale = Link::new("a", "b");
		stale.source = Endpoint::Resolved {
			id: "a".into(),
			index: 1,
		};

		sim.step(&mut nodes, &[dangling, stale]);
		assert_eq!(nodes[0].x, 0.0);
		assert_eq!(nodes[1].x, 500.0);
	}
}
