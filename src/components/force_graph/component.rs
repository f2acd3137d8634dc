//! Leptos component wrapping the topology canvas.
//!
//! The component creates an HTML canvas sized to the viewport and wires up
//! mouse handlers for node dragging and a document `keydown` listener that
//! advances the stage script. An animation loop runs via
//! `requestAnimationFrame`, ticking the engine and painting each frame.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, Window};

use super::config::AppConfig;
use super::graph::{Graph, GraphConfig};
use super::render;
use super::scheduler::TimeoutScheduler;
use super::stages::StageScript;
use super::theme::Theme;
use super::types::GraphData;
use crate::error::{Error, Result};

/// Simulated time per animation frame.
const FRAME_MS: f64 = 16.0;

/// A node held by the pointer, with the pointer's offset from its center.
struct Drag {
	id: String,
	dx: f64,
	dy: f64,
}

/// Bundles the engine with the script driving it and the paint theme.
struct GraphContext {
	graph: Graph,
	script: StageScript,
	theme: Theme,
	drag: Option<Drag>,
}

type Context = Rc<RefCell<Option<GraphContext>>>;
type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;
type KeyCallback = Rc<RefCell<Option<Closure<dyn FnMut(KeyboardEvent)>>>>;

/// Renders the staged topology diagram on a full-viewport canvas.
///
/// `data` seeds the graph before the stage script's prefill runs. The canvas
/// is sized once, when it mounts.
#[component]
pub fn TopologyCanvas(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(optional)] config: AppConfig,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let context: Context = Rc::new(RefCell::new(None));
	let animate: FrameCallback = Rc::new(RefCell::new(None));
	let keydown: KeyCallback = Rc::new(RefCell::new(None));
	let (context_init, animate_init, keydown_init) =
		(context.clone(), animate.clone(), keydown.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if context_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let data = data.get_untracked();

		if let Err(err) = mount(
			&canvas,
			&config,
			data,
			&context_init,
			&animate_init,
			&keydown_init,
		) {
			log::error!("topology-graph: failed to start: {}", err);
		}
	});

	let pointer = move |ev: &MouseEvent| -> Option<(f64, f64)> {
		let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
		let rect = canvas.get_bounding_client_rect();
		Some((
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		))
	};

	let context_md = context.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(&ev) else {
			return;
		};
		if let Some(ref mut c) = *context_md.borrow_mut() {
			let Some(id) = c.graph.node_at(x, y) else {
				return;
			};
			let Some((nx, ny)) = c.graph.with_state(|s| s.node(&id).map(|n| (n.x, n.y))) else {
				return;
			};
			if c.graph.drag_start(&id) {
				c.drag = Some(Drag {
					id,
					dx: nx - x,
					dy: ny - y,
				});
			}
		}
	};

	let context_mm = context.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(&ev) else {
			return;
		};
		if let Some(ref c) = *context_mm.borrow() {
			if let Some(drag) = &c.drag {
				c.graph.drag_to(&drag.id, x + drag.dx, y + drag.dy);
			}
		}
	};

	let context_mu = context.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut c) = *context_mu.borrow_mut() {
			if let Some(drag) = c.drag.take() {
				c.graph.drag_end(&drag.id);
			}
		}
	};

	let context_ml = context.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut c) = *context_ml.borrow_mut() {
			if let Some(drag) = c.drag.take() {
				c.graph.drag_end(&drag.id);
			}
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="topology-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			style="display: block; cursor: grab;"
		/>
	}
}

/// Sizes the canvas, builds the engine, runs the prefill stages and starts
/// the key listener and the animation loop.
fn mount(
	canvas: &HtmlCanvasElement,
	config: &AppConfig,
	data: GraphData,
	context: &Context,
	animate: &FrameCallback,
	keydown: &KeyCallback,
) -> Result<()> {
	let window: Window = web_sys::window().ok_or(Error::NoWindow)?;
	let document = window.document().ok_or(Error::NoDocument)?;

	let width = window.inner_width()?.as_f64().unwrap_or(800.0);
	let height = window.inner_height()?.as_f64().unwrap_or(600.0);
	canvas.set_width(width as u32);
	canvas.set_height(height as u32);

	let ctx: CanvasRenderingContext2d = canvas
		.get_context("2d")?
		.ok_or(Error::NoContext)?
		.dyn_into()
		.map_err(|_| Error::NoContext)?;

	let graph = Graph::new(
		GraphConfig::new(width, height)
			.with_data(data)
			.with_forces(config.forces.clone())
			.with_transitions(config.transitions.clone()),
		Rc::new(TimeoutScheduler),
	);
	let seed = config
		.stages
		.seed
		.unwrap_or_else(|| (js_sys::Math::random() * u32::MAX as f64) as u64);
	let mut script = StageScript::new(seed);
	script.prefill(&graph, config.stages.prefill_stages);
	log::info!(
		"topology-graph: {}x{} canvas, {} stages prefilled, press {:?} to advance",
		width,
		height,
		script.current(),
		config.stages.advance_key
	);

	*context.borrow_mut() = Some(GraphContext {
		graph,
		script,
		theme: Theme::default(),
		drag: None,
	});

	let (context_key, advance_key) = (context.clone(), config.stages.advance_key.clone());
	*keydown.borrow_mut() = Some(Closure::new(move |ev: KeyboardEvent| {
		if ev.key() != advance_key {
			return;
		}
		if let Some(ref mut c) = *context_key.borrow_mut() {
			c.script.next(&c.graph);
		}
	}));
	if let Some(ref cb) = *keydown.borrow() {
		document.add_event_listener_with_callback("keydown", cb.as_ref().unchecked_ref())?;
	}

	let (context_anim, animate_inner) = (context.clone(), animate.clone());
	*animate.borrow_mut() = Some(Closure::new(move || {
		if let Some(ref c) = *context_anim.borrow() {
			c.graph.tick(FRAME_MS);
			c.graph
				.with_state(|state| render::render(state, &ctx, &c.theme));
		}
		if let (Some(cb), Some(window)) = (&*animate_inner.borrow(), web_sys::window()) {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	}));
	if let Some(ref cb) = *animate.borrow() {
		window.request_animation_frame(cb.as_ref().unchecked_ref())?;
	}

	Ok(())
}
