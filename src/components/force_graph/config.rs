//! Tunable parameters for the physics simulation, scene transitions and the
//! stage script.
//!
//! Every field has a default, so a page config only needs to name what it
//! overrides:
//!
//! ```json
//! { "forces": { "link_distance": 180 }, "transitions": { "exit_ms": 400 } }
//! ```

use serde::Deserialize;

use super::stages::StageConfig;

/// Everything the page can configure, read from `<script id="graph-config">`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	/// Physics parameters.
	pub forces: ForceConfig,
	/// Scene transition durations.
	pub transitions: TransitionConfig,
	/// Stage script settings.
	pub stages: StageConfig,
}

/// Force and energy parameters. The defaults reproduce d3-force behaviour.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
	/// Link rest length before scaling, for links without their own distance.
	pub link_distance: f64,
	/// Spring strength applied to every link.
	pub link_strength: f64,
	/// Many-body strength; negative values repel.
	pub charge_strength: f64,
	/// Minimum distance used by the many-body force, avoiding blow-ups for
	/// nearly coincident nodes.
	pub charge_distance_min: f64,
	/// Collision radius before scaling. Also the drag hit radius.
	pub collide_radius: f64,
	/// Fraction of an overlap resolved per tick.
	pub collide_strength: f64,
	/// Pull of the centering force toward the surface middle.
	pub center_strength: f64,
	/// The simulation stops once alpha falls below this.
	pub alpha_min: f64,
	/// Fraction of the gap to the alpha target closed each tick.
	pub alpha_decay: f64,
	/// Fraction of velocity lost each tick.
	pub velocity_decay: f64,
	/// Alpha target set by render passes and drag gestures.
	pub active_alpha_target: f64,
}

impl Default for ForceConfig {
	fn default() -> Self {
		let alpha_min: f64 = 0.001;
		Self {
			link_distance: 150.0,
			link_strength: 0.6,
			charge_strength: -30.0,
			charge_distance_min: 1.0,
			collide_radius: 30.0,
			collide_strength: 1.0,
			center_strength: 1.0,
			alpha_min,
			// Settles in ~300 ticks from alpha = 1.
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			velocity_decay: 0.4,
			active_alpha_target: 1.0,
		}
	}
}

/// Durations of scene transitions, in milliseconds.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
	/// Shape size/position transitions started by renderer updates.
	pub update_ms: f64,
	/// Fade-out of elements whose data was removed.
	pub exit_ms: f64,
}

impl Default for TransitionConfig {
	fn default() -> Self {
		Self {
			update_ms: 500.0,
			exit_ms: 1000.0,
		}
	}
}
