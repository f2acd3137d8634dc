//! Canvas rendering of the scene.
//!
//! Draws in two passes for correct z-ordering:
//! 1. Background, then link lines
//! 2. Node groups, each translated to its node's position
//!
//! Fading elements are drawn with their exit opacity. Links whose endpoints
//! are not both in the graph are skipped.

use std::f64::consts::PI;

use web_sys::{CanvasRenderingContext2d, Path2d};

use super::scene::{Geometry, LinkElement, NodeElement, Paint, Visual};
use super::state::GraphState;
use super::theme::{Color, Theme};

/// Renders the complete scene to the canvas.
pub fn render(state: &GraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	draw_background(state, ctx, theme);

	for link in state.scene().links() {
		draw_link(ctx, link, theme);
	}
	for node in state.scene().nodes() {
		draw_node(ctx, node, theme);
	}

	ctx.set_global_alpha(1.0);
}

fn draw_background(state: &GraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	ctx.set_fill_style_str(&theme.background.to_css());
	ctx.fill_rect(0.0, 0.0, state.width(), state.height());
}

/// The element's `color` style, or the theme foreground.
fn current_color(visual: &Visual, theme: &Theme) -> Color {
	visual
		.style
		.get("color")
		.and_then(|css| Color::parse(css))
		.unwrap_or(theme.foreground)
}

fn paint_color(paint: Paint, current: Color, theme: &Theme) -> Color {
	match paint {
		Paint::CurrentColor => current,
		Paint::Black => theme.ink,
		Paint::White => theme.paper,
	}
}

fn draw_link(ctx: &CanvasRenderingContext2d, link: &LinkElement, theme: &Theme) {
	if !link.attached {
		return;
	}
	let opacity = link.visual.opacity();
	if opacity <= 0.0 {
		return;
	}

	ctx.set_global_alpha(opacity);
	ctx.set_stroke_style_str(&current_color(&link.visual, theme).to_css());
	ctx.set_line_width(link.stroke_width);
	ctx.begin_path();
	ctx.move_to(link.x1, link.y1);
	ctx.line_to(link.x2, link.y2);
	ctx.stroke();
}

fn draw_node(ctx: &CanvasRenderingContext2d, node: &NodeElement, theme: &Theme) {
	let opacity = node.visual.opacity();
	if opacity <= 0.0 {
		return;
	}
	let current = current_color(&node.visual, theme);

	ctx.save();
	ctx.set_global_alpha(opacity);
	let _ = ctx.translate(node.x, node.y);
	for shape in &node.shapes {
		ctx.set_fill_style_str(&paint_color(shape.paint, current, theme).to_css());
		draw_geometry(ctx, &shape.geometry());
	}
	ctx.restore();
}

fn draw_geometry(ctx: &CanvasRenderingContext2d, geometry: &Geometry) {
	match geometry {
		Geometry::Rect {
			x,
			y,
			width,
			height,
			rx,
		} => {
			if *width <= 0.0 || *height <= 0.0 {
				return;
			}
			rounded_rect(ctx, *x, *y, *width, *height, *rx);
			ctx.fill();
		}
		Geometry::Circle { cx, cy, r } => {
			if *r <= 0.0 {
				return;
			}
			ctx.begin_path();
			let _ = ctx.arc(*cx, *cy, *r, 0.0, 2.0 * PI);
			ctx.fill();
		}
		Geometry::Polygon { points } => {
			let Some(((x0, y0), rest)) = points.split_first() else {
				return;
			};
			ctx.begin_path();
			ctx.move_to(*x0, *y0);
			for (x, y) in rest {
				ctx.line_to(*x, *y);
			}
			ctx.close_path();
			ctx.fill();
		}
		Geometry::Icon {
			path,
			scale,
			tx,
			ty,
		} => {
			let Ok(path) = Path2d::new_with_path_string(path) else {
				return;
			};
			ctx.save();
			let _ = ctx.scale(*scale, *scale);
			let _ = ctx.translate(*tx, *ty);
			ctx.fill_with_path_2d(&path);
			ctx.restore();
		}
	}
}

/// Traces a rectangle with corners rounded to `rx`, clamped to half the
/// shorter side.
fn rounded_rect(ctx: &CanvasRenderingContext2d, x: f64, y: f64, width: f64, height: f64, rx: f64) {
	let r = rx.clamp(0.0, width.min(height) / 2.0);
	ctx.begin_path();
	if r == 0.0 {
		ctx.rect(x, y, width, height);
		return;
	}
	ctx.move_to(x + r, y);
	let _ = ctx.arc_to(x + width, y, x + width, y + height, r);
	let _ = ctx.arc_to(x + width, y + height, x, y + height, r);
	let _ = ctx.arc_to(x, y + height, x, y, r);
	let _ = ctx.arc_to(x, y, x + width, y, r);
	ctx.close_path();
}
