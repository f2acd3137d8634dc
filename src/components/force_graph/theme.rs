//! Colors used by the painter.
//!
//! Shapes never pick their own colors: bodies paint with the element's
//! `color` style (CSS `currentColor`), details paint with the theme's ink or
//! paper. The theme only supplies the fallbacks.

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
	/// Opacity in `0.0..=1.0`.
	pub a: f64,
}

impl Color {
	/// An opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// A color with opacity `a`.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// CSS form: `#rrggbb` when opaque, `rgba(..)` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	/// Parses a CSS color string. Supports `#RGB`, `#RRGGBB`, `rgb()`/`rgba()`
	/// and the keywords `black`, `white` and `transparent`.
	pub fn parse(input: &str) -> Option<Color> {
		let input = input.trim();
		if let Some(hex) = input.strip_prefix('#') {
			let channel = |s: &str| u8::from_str_radix(s, 16).ok();
			return match hex.len() {
				6 => Some(Color::rgb(
					channel(hex.get(0..2)?)?,
					channel(hex.get(2..4)?)?,
					channel(hex.get(4..6)?)?,
				)),
				3 => {
					let short = |i: usize| channel(hex.get(i..i + 1)?).map(|v| v * 17);
					Some(Color::rgb(short(0)?, short(1)?, short(2)?))
				}
				_ => None,
			};
		}

		if let Some(args) = input
			.strip_prefix("rgba(")
			.or_else(|| input.strip_prefix("rgb("))
		{
			let nums: Vec<&str> = args.trim_end_matches(')').split(',').collect();
			let channel = |i: usize| nums.get(i).and_then(|s| s.trim().parse::<u8>().ok());
			let alpha = nums
				.get(3)
				.map(|s| s.trim().parse::<f64>().ok())
				.unwrap_or(Some(1.0))?;
			return Some(Color::rgba(channel(0)?, channel(1)?, channel(2)?, alpha));
		}

		match input.to_ascii_lowercase().as_str() {
			"black" => Some(Color::rgb(0, 0, 0)),
			"white" => Some(Color::rgb(255, 255, 255)),
			"transparent" => Some(Color::rgba(0, 0, 0, 0.0)),
			_ => None,
		}
	}
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Fill behind the graph.
	pub background: Color,
	/// `currentColor` of elements without a `color` style.
	pub foreground: Color,
	/// Dark detail color (screens, racks, leds).
	pub ink: Color,
	/// Light detail color (default markers).
	pub paper: Color,
}

impl Theme {
	/// Dark slate background with muted steel shapes (default)
	pub fn default_theme() -> Self {
		Self {
			background: Color::rgb(22, 27, 34),
			foreground: Color::rgb(140, 160, 180),
			ink: Color::rgb(0, 0, 0),
			paper: Color::rgb(255, 255, 255),
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::default_theme()
	}
}
