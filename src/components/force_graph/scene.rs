//! Retained scene: the visual elements the engine reconciles against.
//!
//! Every node is drawn as a group of [`Shape`]s translated to the node's
//! position; every link is a line. Elements are keyed (node id, link
//! `"{source}-{target}"`) and live across render passes, so a render only
//! touches what changed. Geometry changes animate through transitions, and
//! removed elements fade out before they are dropped.

use std::collections::BTreeMap;

/// Inline style properties of an element (`color`, ...).
pub type Style = BTreeMap<String, String>;

/// d3's default transition easing.
pub fn ease_cubic_in_out(t: f64) -> f64 {
	let t = t.clamp(0.0, 1.0) * 2.0;
	if t <= 1.0 {
		t * t * t / 2.0
	} else {
		let t = t - 2.0;
		(t * t * t + 2.0) / 2.0
	}
}

fn mix(a: f64, b: f64, t: f64) -> f64 {
	a + (b - a) * t
}

/// How a shape is filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Paint {
	/// The element's `color` style, or the theme foreground.
	CurrentColor,
	/// Theme ink.
	Black,
	/// Theme paper.
	White,
}

/// Drawable geometry, in coordinates relative to the element's origin.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
	Rect {
		x: f64,
		y: f64,
		width: f64,
		height: f64,
		/// Corner radius.
		rx: f64,
	},
	Circle {
		cx: f64,
		cy: f64,
		r: f64,
	},
	Polygon {
		points: Vec<(f64, f64)>,
	},
	/// Embedded SVG path drawn with `scale(scale) translate(tx, ty)`.
	Icon {
		path: &'static str,
		scale: f64,
		tx: f64,
		ty: f64,
	},
}

impl Geometry {
	pub fn empty_rect() -> Self {
		Geometry::Rect {
			x: 0.0,
			y: 0.0,
			width: 0.0,
			height: 0.0,
			rx: 0.0,
		}
	}

	pub fn empty_circle() -> Self {
		Geometry::Circle {
			cx: 0.0,
			cy: 0.0,
			r: 0.0,
		}
	}

	pub fn empty_polygon() -> Self {
		Geometry::Polygon { points: Vec::new() }
	}

	/// An untransformed icon.
	pub fn icon(path: &'static str) -> Self {
		Geometry::Icon {
			path,
			scale: 1.0,
			tx: 0.0,
			ty: 0.0,
		}
	}

	/// Interpolates towards `to`. Geometries that cannot be blended (different
	/// kinds, polygons with different vertex counts) jump to `to`.
	pub fn lerp(&self, to: &Geometry, t: f64) -> Geometry {
		use Geometry::*;
		match (self, to) {
			(
				Rect {
					x,
					y,
					width,
					height,
					rx,
				},
				Rect {
					x: x1,
					y: y1,
					width: width1,
					height: height1,
					rx: rx1,
				},
			) => Rect {
				x: mix(*x, *x1, t),
				y: mix(*y, *y1, t),
				width: mix(*width, *width1, t),
				height: mix(*height, *height1, t),
				rx: mix(*rx, *rx1, t),
			},
			(Circle { cx, cy, r }, Circle { cx: cx1, cy: cy1, r: r1 }) => Circle {
				cx: mix(*cx, *cx1, t),
				cy: mix(*cy, *cy1, t),
				r: mix(*r, *r1, t),
			},
			(Polygon { points }, Polygon { points: points1 }) if points.len() == points1.len() => {
				Polygon {
					points: points
						.iter()
						.zip(points1)
						.map(|(a, b)| (mix(a.0, b.0, t), mix(a.1, b.1, t)))
						.collect(),
				}
			}
			(
				Icon { scale, tx, ty, .. },
				Icon {
					path,
					scale: scale1,
					tx: tx1,
					ty: ty1,
				},
			) => Icon {
				path: *path,
				scale: mix(*scale, *scale1, t),
				tx: mix(*tx, *tx1, t),
				ty: mix(*ty, *ty1, t),
			},
			_ => to.clone(),
		}
	}
}

/// Progress of a timed animation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transition {
	pub elapsed: f64,
	pub duration: f64,
}

impl Transition {
	pub fn new(duration: f64) -> Self {
		Self {
			elapsed: 0.0,
			duration,
		}
	}

	pub fn advance(&mut self, elapsed_ms: f64) {
		self.elapsed = (self.elapsed + elapsed_ms).min(self.duration.max(0.0));
	}

	pub fn is_done(&self) -> bool {
		self.elapsed >= self.duration
	}

	/// Eased progress in `[0, 1]`.
	pub fn progress(&self) -> f64 {
		if self.is_done() {
			1.0
		} else {
			ease_cubic_in_out(self.elapsed / self.duration)
		}
	}
}

/// A single primitive inside a node group.
#[derive(Clone, Debug)]
pub struct Shape {
	/// Name renderers use to find the shape again on update.
	pub class: &'static str,
	pub paint: Paint,
	from: Geometry,
	to: Geometry,
	transition: Transition,
}

impl Shape {
	pub fn new(class: &'static str, paint: Paint, geometry: Geometry) -> Self {
		Self {
			class,
			paint,
			from: geometry.clone(),
			to: geometry,
			transition: Transition::default(),
		}
	}

	/// Geometry as currently displayed.
	pub fn geometry(&self) -> Geometry {
		if self.transition.is_done() {
			self.to.clone()
		} else {
			self.from.lerp(&self.to, self.transition.progress())
		}
	}

	/// Geometry the shape is heading to.
	pub fn target(&self) -> &Geometry {
		&self.to
	}

	/// Animates from the current geometry to `geometry`. A zero duration
	/// applies it at once.
	pub fn transition_to(&mut self, geometry: Geometry, duration_ms: f64) {
		self.from = self.geometry();
		self.to = geometry;
		self.transition = Transition::new(duration_ms);
	}

	pub fn is_settled(&self) -> bool {
		self.transition.is_done()
	}

	fn advance(&mut self, elapsed_ms: f64) {
		self.transition.advance(elapsed_ms);
	}
}

/// A compound selector: `.a`, `.a.b`, `#id`, `#id.a`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
	pub id: Option<String>,
	pub classes: Vec<String>,
}

impl Selector {
	pub fn parse(input: &str) -> Option<Self> {
		let mut rest = input.trim();
		if rest.is_empty() {
			return None;
		}

		let mut selector = Selector::default();
		while !rest.is_empty() {
			let mut chars = rest.chars();
			let sigil = chars.next()?;
			let body = chars.as_str();
			let end = body.find(|c| c == '.' || c == '#').unwrap_or(body.len());
			let (name, tail) = body.split_at(end);
			if name.is_empty() || name.contains(char::is_whitespace) {
				return None;
			}
			match sigil {
				'.' => selector.classes.push(name.to_string()),
				'#' if selector.id.is_none() => selector.id = Some(name.to_string()),
				_ => return None,
			}
			rest = tail;
		}
		Some(selector)
	}

	pub fn matches(&self, visual: &Visual) -> bool {
		self.id.as_deref().is_none_or(|id| id == visual.key)
			&& self
				.classes
				.iter()
				.all(|class| visual.has_class(class))
	}
}

/// State shared by node and link elements.
#[derive(Clone, Debug)]
pub struct Visual {
	/// Stable identity used to match the element to its data.
	pub key: String,
	pub classes: Vec<String>,
	pub style: Style,
	exit: Option<Transition>,
}

impl Visual {
	/// `base` plus the space separated tags in `cls`.
	pub fn new(key: String, base: &str, cls: Option<&str>) -> Self {
		Self {
			key,
			classes: Self::class_list(base, cls),
			style: Style::new(),
			exit: None,
		}
	}

	pub fn class_list(base: &str, cls: Option<&str>) -> Vec<String> {
		std::iter::once(base)
			.chain(cls.unwrap_or_default().split_whitespace())
			.map(str::to_string)
			.collect()
	}

	pub fn has_class(&self, class: &str) -> bool {
		self.classes.iter().any(|c| c == class)
	}

	pub fn is_exiting(&self) -> bool {
		self.exit.is_some()
	}

	pub fn opacity(&self) -> f64 {
		self.exit.map_or(1.0, |fade| 1.0 - fade.progress())
	}

	/// Starts fading out. Elements already fading keep their progress.
	pub fn begin_exit(&mut self, duration_ms: f64) {
		if self.exit.is_none() {
			self.exit = Some(Transition::new(duration_ms));
		}
	}

	/// Cancels a pending exit.
	pub fn revive(&mut self) {
		self.exit = None;
	}

	fn advance(&mut self, elapsed_ms: f64) {
		if let Some(fade) = self.exit.as_mut() {
			fade.advance(elapsed_ms);
		}
	}

	fn is_gone(&self) -> bool {
		self.exit.is_some_and(|fade| fade.is_done())
	}
}

/// A request to center an icon once its bounding box can be measured.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IconMeasure {
	/// Final icon scale (renderer scaler times engine scale).
	pub scale: f64,
	pub duration_ms: f64,
}

/// Visual element of a node: a group of shapes at the node's position.
#[derive(Clone, Debug)]
pub struct NodeElement {
	pub visual: Visual,
	/// Node type the element was entered with (id prefix).
	pub kind: String,
	pub x: f64,
	pub y: f64,
	pub shapes: Vec<Shape>,
	/// Drag behaviour attached by the last render pass.
	pub draggable: bool,
	/// Pending bounding-box measurement, see [`IconMeasure`].
	pub measure: Option<IconMeasure>,
}

impl NodeElement {
	pub fn new(key: String, kind: &str, cls: Option<&str>) -> Self {
		Self {
			visual: Visual::new(key, "node", cls),
			kind: kind.to_string(),
			x: 0.0,
			y: 0.0,
			shapes: Vec::new(),
			draggable: false,
			measure: None,
		}
	}

	pub fn key(&self) -> &str {
		&self.visual.key
	}

	pub fn shape(&self, class: &str) -> Option<&Shape> {
		self.shapes.iter().find(|s| s.class == class)
	}

	pub fn shape_mut(&mut self, class: &str) -> Option<&mut Shape> {
		self.shapes.iter_mut().find(|s| s.class == class)
	}

	/// Starts a transition on the shape named `class`, if present.
	pub fn animate(&mut self, class: &str, geometry: Geometry, duration_ms: f64) {
		if let Some(shape) = self.shape_mut(class) {
			shape.transition_to(geometry, duration_ms);
		}
	}
}

/// Visual element of a link: a line between its endpoints.
#[derive(Clone, Debug)]
pub struct LinkElement {
	pub visual: Visual,
	pub x1: f64,
	pub y1: f64,
	pub x2: f64,
	pub y2: f64,
	pub stroke_width: f64,
	/// Both endpoints resolved to live nodes. Detached links are not drawn.
	pub attached: bool,
}

impl LinkElement {
	pub fn new(key: String, cls: Option<&str>) -> Self {
		Self {
			visual: Visual::new(key, "link", cls),
			x1: 0.0,
			y1: 0.0,
			x2: 0.0,
			y2: 0.0,
			stroke_width: 2.0,
			attached: false,
		}
	}

	pub fn key(&self) -> &str {
		&self.visual.key
	}
}

/// All visual elements, links below nodes.
#[derive(Clone, Debug, Default)]
pub struct Scene {
	nodes: Vec<NodeElement>,
	links: Vec<LinkElement>,
}

impl Scene {
	pub fn nodes(&self) -> &[NodeElement] {
		&self.nodes
	}

	pub fn links(&self) -> &[LinkElement] {
		&self.links
	}

	pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut NodeElement> {
		self.nodes.iter_mut()
	}

	pub fn links_mut(&mut self) -> impl Iterator<Item = &mut LinkElement> {
		self.links.iter_mut()
	}

	pub fn node(&self, key: &str) -> Option<&NodeElement> {
		self.nodes.iter().find(|n| n.key() == key)
	}

	pub fn node_mut(&mut self, key: &str) -> Option<&mut NodeElement> {
		self.nodes.iter_mut().find(|n| n.key() == key)
	}

	pub fn link(&self, key: &str) -> Option<&LinkElement> {
		self.links.iter().find(|l| l.key() == key)
	}

	pub fn link_mut(&mut self, key: &str) -> Option<&mut LinkElement> {
		self.links.iter_mut().find(|l| l.key() == key)
	}

	pub fn insert_node(&mut self, element: NodeElement) {
		self.nodes.push(element);
	}

	pub fn insert_link(&mut self, element: LinkElement) {
		self.links.push(element);
	}

	/// Sets inline styles on every element, node or link, matching `selector`.
	pub fn apply_style(&mut self, selector: &Selector, properties: &[(&str, &str)]) -> usize {
		let visuals = self
			.links
			.iter_mut()
			.map(|l| &mut l.visual)
			.chain(self.nodes.iter_mut().map(|n| &mut n.visual));

		let mut matched = 0;
		for visual in visuals.filter(|v| selector.matches(v)) {
			for (name, value) in properties {
				visual.style.insert(name.to_string(), value.to_string());
			}
			matched += 1;
		}
		matched
	}

	/// Advances transitions and fades. Links whose fade finished are dropped;
	/// finished node elements are returned so their renderer can tear them down.
	pub fn advance(&mut self, elapsed_ms: f64) -> Vec<NodeElement> {
		for link in &mut self.links {
			link.visual.advance(elapsed_ms);
		}
		self.links.retain(|l| !l.visual.is_gone());

		for node in &mut self.nodes {
			node.visual.advance(elapsed_ms);
			for shape in node.shapes.iter_mut().filter(|s| !s.is_settled()) {
				shape.advance(elapsed_ms);
			}
		}

		let mut finished = Vec::new();
		let mut i = 0;
		while i < self.nodes.len() {
			if self.nodes[i].visual.is_gone() {
				finished.push(self.nodes.remove(i));
			} else {
				i += 1;
			}
		}
		finished
	}
}
