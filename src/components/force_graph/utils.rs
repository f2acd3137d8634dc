//! Small geometry and collection helpers shared by the renderers and the
//! stage script.

use std::f64::consts::PI;

use rand::Rng;
use svgtypes::{SimplePathSegment, SimplifyingPathParser};

use super::scene::{Scene, Selector};

/// Uppercases the first character: `"wifi"` becomes `"Wifi"`.
pub fn capitalise(s: &str) -> String {
	let mut chars = s.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

/// Offset that centers a span of `value` on the origin.
pub fn minus_half_of(value: f64) -> f64 {
	-value / 2.0
}

/// Vertices of a regular polygon centered on `(x, y)`, first vertex straight
/// up, going clockwise. One side degenerates to the center point.
pub fn polygon(x: f64, y: f64, radius: f64, sides: usize) -> Vec<(f64, f64)> {
	if sides == 1 {
		return vec![(x, y)];
	}

	(0..sides)
		.map(|i| {
			let angle = 2.0 * PI * i as f64 / sides as f64;
			(x + angle.sin() * radius, y - angle.cos() * radius)
		})
		.collect()
}

/// Removes every item matching `selector`, keeping the order of the rest.
/// Returns how many were removed.
pub fn remove_where<T>(items: &mut Vec<T>, mut selector: impl FnMut(&T) -> bool) -> usize {
	let before = items.len();
	items.retain(|item| !selector(item));
	before - items.len()
}

/// Sets `properties` as inline styles on every scene element matching
/// `selector`. Returns the number of elements touched; an unparsable
/// selector matches nothing.
pub fn style(scene: &mut Scene, selector: &str, properties: &[(&str, &str)]) -> usize {
	match Selector::parse(selector) {
		Some(selector) => scene.apply_style(&selector, properties),
		None => {
			log::warn!("topology-graph: ignoring invalid selector {:?}", selector);
			0
		}
	}
}

/// Uniform integer in `[low, high)`. An empty range yields `low`.
pub fn rand<R: Rng + ?Sized>(rng: &mut R, low: i64, high: i64) -> i64 {
	let u: f64 = rng.r#gen();
	(low as f64 + u * (high - low) as f64).floor() as i64
}

/// Uniform integer in `[0, up)`.
pub fn rand_below<R: Rng + ?Sized>(rng: &mut R, up: usize) -> usize {
	rand(rng, 0, up as i64).max(0) as usize
}

/// A uniformly chosen element, or `None` for an empty slice.
pub fn any_of<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
	items.get(rand_below(rng, items.len()))
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl Bounds {
	pub fn center(&self) -> (f64, f64) {
		(self.x + self.width / 2.0, self.y + self.height / 2.0)
	}
}

/// Parameters in `(0, 1)` where a Bézier's derivative vanishes along one
/// axis, given the derivative's coefficients `a·t² + b·t + c`.
fn extrema(a: f64, b: f64, c: f64) -> Vec<f64> {
	let roots = if a.abs() < 1e-12 {
		if b.abs() < 1e-12 { vec![] } else { vec![-c / b] }
	} else {
		let disc = b * b - 4.0 * a * c;
		if disc < 0.0 {
			vec![]
		} else {
			let sq = disc.sqrt();
			vec![(-b + sq) / (2.0 * a), (-b - sq) / (2.0 * a)]
		}
	};
	roots.into_iter().filter(|t| *t > 0.0 && *t < 1.0).collect()
}

fn cubic_at(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
	let u = 1.0 - t;
	u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

fn quadratic_at(p0: f64, p1: f64, p2: f64, t: f64) -> f64 {
	let u = 1.0 - t;
	u * u * p0 + 2.0 * u * t * p1 + t * t * p2
}

/// Points where a cubic segment reaches its extent on either axis.
fn cubic_extremes(
	from: (f64, f64),
	c1: (f64, f64),
	c2: (f64, f64),
	to: (f64, f64),
) -> Vec<(f64, f64)> {
	let coefficients = |p0: f64, p1: f64, p2: f64, p3: f64| {
		(
			-p0 + 3.0 * p1 - 3.0 * p2 + p3,
			2.0 * (p0 - 2.0 * p1 + p2),
			p1 - p0,
		)
	};
	let (ax, bx, cx) = coefficients(from.0, c1.0, c2.0, to.0);
	let (ay, by, cy) = coefficients(from.1, c1.1, c2.1, to.1);
	extrema(ax, bx, cx)
		.into_iter()
		.chain(extrema(ay, by, cy))
		.map(|t| {
			(
				cubic_at(from.0, c1.0, c2.0, to.0, t),
				cubic_at(from.1, c1.1, c2.1, to.1, t),
			)
		})
		.collect()
}

fn quadratic_extremes(from: (f64, f64), c: (f64, f64), to: (f64, f64)) -> Vec<(f64, f64)> {
	let dx = from.0 - 2.0 * c.0 + to.0;
	let dy = from.1 - 2.0 * c.1 + to.1;
	extrema(0.0, 2.0 * dx, 2.0 * (c.0 - from.0))
		.into_iter()
		.chain(extrema(0.0, 2.0 * dy, 2.0 * (c.1 - from.1)))
		.map(|t| {
			(
				quadratic_at(from.0, c.0, to.0, t),
				quadratic_at(from.1, c.1, to.1, t),
			)
		})
		.collect()
}

/// Bounding box of the outline drawn by SVG path data.
///
/// Arcs and shorthand curves are normalised to absolute Béziers by
/// `svgtypes`, and curves contribute their true extremes rather than their
/// control points. Returns `None` for empty or malformed data.
pub fn path_bounds(d: &str) -> Option<Bounds> {
	let mut points: Vec<(f64, f64)> = Vec::new();
	let mut current = (0.0, 0.0);
	let mut start = (0.0, 0.0);

	for segment in SimplifyingPathParser::from(d) {
		match segment.ok()? {
			SimplePathSegment::MoveTo { x, y } => {
				current = (x, y);
				start = current;
				points.push(current);
			}
			SimplePathSegment::LineTo { x, y } => {
				current = (x, y);
				points.push(current);
			}
			SimplePathSegment::Quadratic { x1, y1, x, y } => {
				points.extend(quadratic_extremes(current, (x1, y1), (x, y)));
				current = (x, y);
				points.push(current);
			}
			SimplePathSegment::CurveTo {
				x1,
				y1,
				x2,
				y2,
				x,
				y,
			} => {
				points.extend(cubic_extremes(current, (x1, y1), (x2, y2), (x, y)));
				current = (x, y);
				points.push(current);
			}
			SimplePathSegment::ClosePath => current = start,
		}
	}

	let (first, rest) = points.split_first()?;
	let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
	for &(x, y) in rest {
		min_x = min_x.min(x);
		min_y = min_y.min(y);
		max_x = max_x.max(x);
		max_y = max_y.max(y);
	}

	Some(Bounds {
		x: min_x,
		y: min_y,
		width: max_x - min_x,
		height: max_y - min_y,
	})
}

#[cfg(test)]
mod tests {
	use float_cmp::approx_eq;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	use super::*;

	#[test]
	fn capitalise_first_letter_only() {
		assert_eq!(capitalise("device"), "Device");
		assert_eq!(capitalise("hpwh"), "Hpwh");
		assert_eq!(capitalise(""), "");
	}

	#[test]
	fn polygon_places_vertices_on_circle() {
		let triangle = polygon(0.0, 0.0, 25.0, 3);
		assert_eq!(triangle.len(), 3);
		assert!(approx_eq!(f64, triangle[0].0, 0.0, epsilon = 1e-9));
		assert!(approx_eq!(f64, triangle[0].1, -25.0, epsilon = 1e-9));
		for (x, y) in &triangle {
			assert!(approx_eq!(f64, (x * x + y * y).sqrt(), 25.0, epsilon = 1e-9));
		}

		assert_eq!(polygon(3.0, 4.0, 10.0, 1), vec![(3.0, 4.0)]);
		assert!(polygon(0.0, 0.0, 10.0, 0).is_empty());
	}

	#[test]
	fn remove_where_keeps_order_of_survivors() {
		let mut items = vec![1, 2, 3, 4, 5, 6];
		assert_eq!(remove_where(&mut items, |n| n % 2 == 0), 3);
		assert_eq!(items, vec![1, 3, 5]);
		assert_eq!(remove_where(&mut items, |n| *n > 10), 0);
	}

	#[test]
	fn rand_stays_in_half_open_range() {
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..1000 {
			let n = rand(&mut rng, 100, 600);
			assert!((100..600).contains(&n));
		}
		assert_eq!(rand(&mut rng, 5, 5), 5);
	}

	#[test]
	fn any_of_picks_from_slice() {
		let mut rng = StdRng::seed_from_u64(1);
		let kinds = ["device", "mobile"];
		for _ in 0..100 {
			assert!(kinds.contains(any_of(&mut rng, &kinds).unwrap()));
		}
		let empty: [&str; 0] = [];
		assert!(any_of(&mut rng, &empty).is_none());
	}

	#[test]
	fn path_bounds_of_database_glyph() {
		let bounds = path_bounds(super::super::shapes::DATABASE_ICON).unwrap();
		assert!(approx_eq!(f64, bounds.x, 4.0, epsilon = 1e-9));
		assert!(approx_eq!(f64, bounds.y, 3.0, epsilon = 1e-9));
		assert!(approx_eq!(f64, bounds.width, 16.0, epsilon = 1e-9));
		assert!(approx_eq!(f64, bounds.height, 18.0, epsilon = 1e-9));
		let (cx, cy) = bounds.center();
		assert!(approx_eq!(f64, cx, 12.0, epsilon = 1e-9));
		assert!(approx_eq!(f64, cy, 12.0, epsilon = 1e-9));
	}

	#[test]
	fn path_bounds_follow_arc_bulge() {
		// Two half arcs tracing a circle of radius 10 around (10, 0).
		let bounds = path_bounds("M0,0 A10,10 0 1 0 20,0 A10,10 0 1 0 0,0Z").unwrap();
		assert!(approx_eq!(f64, bounds.x, 0.0, epsilon = 0.05));
		assert!(approx_eq!(f64, bounds.y, -10.0, epsilon = 0.05));
		assert!(approx_eq!(f64, bounds.width, 20.0, epsilon = 0.05));
		assert!(approx_eq!(f64, bounds.height, 20.0, epsilon = 0.05));
	}

	#[test]
	fn path_bounds_use_curve_extremes_not_control_points() {
		// Peak of this quadratic is at y = 5, its control point at y = 10.
		let bounds = path_bounds("M0,0 Q5,10 10,0").unwrap();
		assert!(approx_eq!(f64, bounds.height, 5.0, epsilon = 1e-9));
		assert!(approx_eq!(f64, bounds.width, 10.0, epsilon = 1e-9));
	}

	#[test]
	fn path_bounds_handles_relative_and_compact_numbers() {
		let bounds = path_bounds("m10 10 h5 v-2.5 l-.5.5z").unwrap();
		assert_eq!(bounds.x, 10.0);
		assert_eq!(bounds.y, 7.5);
		assert_eq!(bounds.width, 5.0);
		assert_eq!(bounds.height, 2.5);

		assert!(path_bounds("").is_none());
		assert!(path_bounds("10 10").is_none());
		assert!(path_bounds("M 1").is_none());
	}
}
