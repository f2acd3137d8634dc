//! Shape renderers: how each node type is drawn.
//!
//! A node's type is the prefix of its id (`server-1` is a `server`). The
//! registry capitalises it and looks up a renderer factory by that name,
//! falling back to a plain circle. Renderers are built per render pass with
//! the engine's current scale baked in, so every size is `base * scale`.
//!
//! Renderers follow an enter/update/exit protocol:
//! - `enter` creates the element's shapes with collapsed geometry,
//! - `update` transitions them to their scaled size (runs on every render),
//! - `exit` tears the element down once its fade-out has finished.

use std::collections::HashMap;

use super::scene::{Geometry, IconMeasure, NodeElement, Paint, Shape};
use super::utils::{Bounds, capitalise, minus_half_of, path_bounds, polygon};

/// Material Design "database" glyph, 24x24 viewbox.
pub const DATABASE_ICON: &str = "M12,3C7.58,3 4,4.79 4,7C4,9.21 7.58,11 12,11C16.42,11 20,9.21 20,7C20,4.79 16.42,3 12,3M4,9V12C4,14.21 7.58,16 12,16C16.42,16 20,14.21 20,12V9C20,11.21 16.42,13 12,13C7.58,13 4,11.21 4,9M4,14V17C4,19.21 7.58,21 12,21C16.42,21 20,19.21 20,17V14C20,16.21 16.42,18 12,18C7.58,18 4,16.21 4,14Z";

/// Inputs every renderer is built from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParams {
	/// Engine scale multiplier.
	pub scale: f64,
	/// Duration of update transitions.
	pub duration_ms: f64,
}

/// Draws one type of node.
pub trait ShapeRenderer {
	/// Creates the element's shapes. Runs once, when the element enters.
	fn enter(&self, element: &mut NodeElement);

	/// Binds sizes and positions. Runs on enter and on every later render.
	fn update(&self, element: &mut NodeElement);

	/// Releases the element after its exit fade.
	fn exit(&self, element: &mut NodeElement) {
		element.shapes.clear();
		element.measure = None;
	}
}

/// Builds a renderer for the given parameters.
pub type RendererFactory = fn(&RenderParams) -> Box<dyn ShapeRenderer>;

/// Maps capitalised node types to renderer factories.
#[derive(Clone)]
pub struct ShapeRegistry {
	renderers: HashMap<String, RendererFactory>,
	fallback: RendererFactory,
}

impl ShapeRegistry {
	/// A registry with no named renderers.
	pub fn empty(fallback: RendererFactory) -> Self {
		Self {
			renderers: HashMap::new(),
			fallback,
		}
	}

	/// Registers `factory` for the capitalised node type `name`.
	pub fn register(&mut self, name: impl Into<String>, factory: RendererFactory) -> &mut Self {
		self.renderers.insert(name.into(), factory);
		self
	}

	/// A factory is registered for `name`.
	pub fn contains(&self, name: &str) -> bool {
		self.renderers.contains_key(name)
	}

	/// Renderer for the node type `kind` (lowercase id prefix).
	pub fn resolve(&self, kind: &str, params: &RenderParams) -> Box<dyn ShapeRenderer> {
		let factory = self
			.renderers
			.get(&capitalise(kind))
			.copied()
			.unwrap_or(self.fallback);
		factory(params)
	}
}

impl Default for ShapeRegistry {
	fn default() -> Self {
		let mut registry = Self::empty(|p| Box::new(DefaultRenderer::new(p)));
		registry
			.register("Device", |p| Box::new(DeviceRenderer::new(p)))
			.register("Mobile", |p| Box::new(MobileRenderer::new(p)))
			.register("Server", |p| Box::new(ServerRenderer::new(p)))
			.register("Wifi", |p| Box::new(WifiRenderer::new(p)))
			.register("Hpwh", |p| Box::new(PolygonRenderer::new(p, 3)))
			.register("Ecc", |p| Box::new(PolygonRenderer::new(p, 5)))
			.register("Ewh", |p| Box::new(PolygonRenderer::new(p, 7)))
			.register("Db", |p| Box::new(IconRenderer::new(p, DATABASE_ICON, 3.0)));
		registry
	}
}

/// Rounded rectangle centered on the origin.
fn centered_rect(width: f64, height: f64, rx: f64) -> Geometry {
	Geometry::Rect {
		x: minus_half_of(width),
		y: minus_half_of(height),
		width,
		height,
		rx,
	}
}

/// Tall rounded body with a home button.
pub struct DeviceRenderer {
	width: f64,
	height: f64,
	duration: f64,
}

impl DeviceRenderer {
	pub fn new(params: &RenderParams) -> Self {
		Self {
			width: 50.0 * params.scale,
			height: 90.0 * params.scale,
			duration: params.duration_ms,
		}
	}
}

impl ShapeRenderer for DeviceRenderer {
	fn enter(&self, element: &mut NodeElement) {
		element.shapes = vec![
			Shape::new("body", Paint::CurrentColor, Geometry::empty_rect()),
			Shape::new("button", Paint::Black, Geometry::empty_circle()),
		];
	}

	fn update(&self, element: &mut NodeElement) {
		let corner = self.width / 10.0;
		element.animate(
			"body",
			centered_rect(self.width, self.height, corner),
			self.duration,
		);
		element.animate(
			"button",
			Geometry::Circle {
				cx: 0.0,
				cy: self.height / 2.0 - self.height / 10.0,
				r: corner,
			},
			self.duration,
		);
	}
}

/// Phone body with a dark screen.
pub struct MobileRenderer {
	width: f64,
	height: f64,
	duration: f64,
}

impl MobileRenderer {
	pub fn new(params: &RenderParams) -> Self {
		Self {
			width: 45.0 * params.scale,
			height: 90.0 * params.scale,
			duration: params.duration_ms,
		}
	}
}

impl ShapeRenderer for MobileRenderer {
	fn enter(&self, element: &mut NodeElement) {
		element.shapes = vec![
			Shape::new("body", Paint::CurrentColor, Geometry::empty_rect()),
			Shape::new("screen", Paint::Black, Geometry::empty_rect()),
		];
	}

	fn update(&self, element: &mut NodeElement) {
		let corner = self.width / 10.0;
		let (screen_width, screen_height) = (self.width * 0.95, self.height * 0.9);
		let screen_left = (self.width - screen_width) / 2.0;
		let screen_top = (self.height - screen_height) / 2.0;

		element.animate(
			"body",
			centered_rect(self.width, self.height, corner),
			self.duration,
		);
		element.animate(
			"screen",
			Geometry::Rect {
				x: minus_half_of(self.width) + screen_left,
				y: minus_half_of(self.height) + screen_top,
				width: screen_width,
				height: screen_height,
				rx: corner,
			},
			self.duration,
		);
	}
}

const SERVER_RACKS: [&str; 3] = ["rack-0", "rack-1", "rack-2"];
const SERVER_DISCS: [&str; 3] = ["disc-0", "disc-1", "disc-2"];
const SERVER_HDDS: [&str; 3] = ["hdd-0", "hdd-1", "hdd-2"];

/// Cabinet with three racks, each with a disc slot and an activity light.
pub struct ServerRenderer {
	width: f64,
	height: f64,
	padding: f64,
	disc_height: f64,
	duration: f64,
}

impl ServerRenderer {
	pub fn new(params: &RenderParams) -> Self {
		Self {
			width: 50.0 * params.scale,
			height: 90.0 * params.scale,
			padding: 5.0 * params.scale,
			disc_height: 3.0 * params.scale,
			duration: params.duration_ms,
		}
	}
}

impl ShapeRenderer for ServerRenderer {
	fn enter(&self, element: &mut NodeElement) {
		element.shapes = vec![Shape::new("body", Paint::CurrentColor, Geometry::empty_rect())];
		for i in 0..SERVER_RACKS.len() {
			element.shapes.extend([
				Shape::new(SERVER_RACKS[i], Paint::Black, Geometry::empty_rect()),
				Shape::new(SERVER_DISCS[i], Paint::CurrentColor, Geometry::empty_rect()),
				Shape::new(SERVER_HDDS[i], Paint::CurrentColor, Geometry::empty_circle()),
			]);
		}
	}

	fn update(&self, element: &mut NodeElement) {
		let rack_width = self.width - self.padding * 2.0;
		let rack_height = self.height / 6.0;

		element.animate(
			"body",
			centered_rect(self.width, self.height, 0.0),
			self.duration,
		);

		for i in 0..SERVER_RACKS.len() {
			let left = minus_half_of(self.width) + self.padding;
			let top = minus_half_of(self.height)
				+ self.padding * (i + 1) as f64
				+ rack_height * i as f64;

			element.animate(
				SERVER_RACKS[i],
				Geometry::Rect {
					x: left,
					y: top,
					width: rack_width,
					height: rack_height,
					rx: 0.0,
				},
				self.duration,
			);
			element.animate(
				SERVER_DISCS[i],
				Geometry::Rect {
					x: left + self.padding,
					y: top + self.padding,
					width: self.width / 3.0,
					height: self.disc_height,
					rx: 0.0,
				},
				self.duration,
			);
			element.animate(
				SERVER_HDDS[i],
				Geometry::Circle {
					cx: left + rack_width - rack_width / 5.0,
					cy: top + self.padding + self.width / 25.0,
					r: self.width / 20.0,
				},
				self.duration,
			);
		}
	}
}

const WIFI_LEDS: [&str; 3] = ["led-0", "led-1", "led-2"];

/// Slim router with a column of leds and a reset button.
pub struct WifiRenderer {
	width: f64,
	height: f64,
	led_radius: f64,
	led_step: f64,
	button_radius: f64,
	duration: f64,
}

impl WifiRenderer {
	pub fn new(params: &RenderParams) -> Self {
		Self {
			width: 30.0 * params.scale,
			height: 90.0 * params.scale,
			led_radius: 2.0 * params.scale,
			led_step: 8.0 * params.scale,
			button_radius: 3.5 * params.scale,
			duration: params.duration_ms,
		}
	}
}

impl ShapeRenderer for WifiRenderer {
	fn enter(&self, element: &mut NodeElement) {
		element.shapes = vec![Shape::new("body", Paint::CurrentColor, Geometry::empty_rect())];
		element.shapes.extend(
			WIFI_LEDS
				.into_iter()
				.map(|led| Shape::new(led, Paint::Black, Geometry::empty_circle())),
		);
		element
			.shapes
			.push(Shape::new("button", Paint::Black, Geometry::empty_circle()));
	}

	fn update(&self, element: &mut NodeElement) {
		element.animate(
			"body",
			centered_rect(self.width, self.height, 0.0),
			self.duration,
		);
		for (i, led) in WIFI_LEDS.into_iter().enumerate() {
			element.animate(
				led,
				Geometry::Circle {
					cx: 0.0,
					cy: self.led_step * i as f64,
					r: self.led_radius,
				},
				self.duration,
			);
		}
		element.animate(
			"button",
			Geometry::Circle {
				cx: 0.0,
				cy: self.height / 2.0 - self.button_radius * 2.0,
				r: self.button_radius,
			},
			self.duration,
		);
	}
}

/// Regular polygon; used for the water heater family.
pub struct PolygonRenderer {
	radius: f64,
	sides: usize,
}

impl PolygonRenderer {
	pub fn new(params: &RenderParams, sides: usize) -> Self {
		Self {
			radius: 25.0 * params.scale,
			sides,
		}
	}
}

impl ShapeRenderer for PolygonRenderer {
	fn enter(&self, element: &mut NodeElement) {
		element.shapes = vec![Shape::new(
			"body",
			Paint::CurrentColor,
			Geometry::empty_polygon(),
		)];
	}

	fn update(&self, element: &mut NodeElement) {
		element.animate(
			"body",
			Geometry::Polygon {
				points: polygon(0.0, 0.0, self.radius, self.sides),
			},
			0.0,
		);
	}
}

/// Embedded vector icon, centered on the node once it can be measured.
pub struct IconRenderer {
	path: &'static str,
	scale: f64,
	duration: f64,
}

impl IconRenderer {
	pub fn new(params: &RenderParams, path: &'static str, scaler: f64) -> Self {
		Self {
			path,
			scale: scaler * params.scale,
			duration: params.duration_ms,
		}
	}
}

impl ShapeRenderer for IconRenderer {
	fn enter(&self, element: &mut NodeElement) {
		element.shapes = vec![Shape::new("icon", Paint::CurrentColor, Geometry::icon(self.path))];
	}

	fn update(&self, element: &mut NodeElement) {
		// The bounding box is only known once the element is in the scene.
		element.measure = Some(IconMeasure {
			scale: self.scale,
			duration_ms: self.duration,
		});
	}
}

/// Completes a pending [`IconMeasure`]: centers the icon's bounding box on
/// the element origin at the requested scale. Returns whether anything was
/// measured.
pub fn measure_icon(element: &mut NodeElement) -> bool {
	let Some(measure) = element.measure.take() else {
		return false;
	};
	let Some(Geometry::Icon { path, .. }) = element.shape("icon").map(|s| s.target().clone())
	else {
		return false;
	};
	let Some(bounds) = path_bounds(path) else {
		log::warn!(
			"topology-graph: icon of {} has unreadable path data",
			element.key()
		);
		return false;
	};

	let (tx, ty) = icon_offset(&bounds);
	element.animate(
		"icon",
		Geometry::Icon {
			path,
			scale: measure.scale,
			tx,
			ty,
		},
		measure.duration_ms,
	);
	true
}

/// Translation (before scaling) that moves the center of `bounds` to the origin.
fn icon_offset(bounds: &Bounds) -> (f64, f64) {
	let (cx, cy) = bounds.center();
	(-cx, -cy)
}

/// Fallback marker for unknown node types.
pub struct DefaultRenderer {
	radius: f64,
	duration: f64,
}

impl DefaultRenderer {
	pub fn new(params: &RenderParams) -> Self {
		Self {
			radius: 40.0 * params.scale,
			duration: params.duration_ms,
		}
	}
}

impl ShapeRenderer for DefaultRenderer {
	fn enter(&self, element: &mut NodeElement) {
		element.shapes = vec![Shape::new("body", Paint::White, Geometry::empty_circle())];
	}

	fn update(&self, element: &mut NodeElement) {
		element.animate(
			"body",
			Geometry::Circle {
				cx: 0.0,
				cy: 0.0,
				r: self.radius,
			},
			self.duration,
		);
	}
}
