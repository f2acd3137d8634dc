//! topology-graph: animated force-directed network topology diagram.
//!
//! This crate provides a WASM-based diagram that reveals a device/server/
//! database topology stage by stage on a canvas, driven by a live force
//! simulation that keeps running while the graph changes.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;
pub mod error;

pub use components::force_graph::{AppConfig, Graph, GraphConfig, GraphData, TopologyCanvas};
pub use error::{Error, Result};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("topology-graph: logging initialized");
}

/// Text of the `<script id="{id}">` element, if the page has one.
fn script_text(id: &str) -> Result<Option<String>> {
	let window: Window = web_sys::window().ok_or(Error::NoWindow)?;
	let document = window.document().ok_or(Error::NoDocument)?;
	let Some(element) = document.get_element_by_id(id) else {
		return Ok(None);
	};
	let script: HtmlScriptElement = element.dyn_into().map_err(|_| Error::MissingElement {
		id: id.to_string(),
	})?;
	Ok(Some(script.text()?))
}

/// Parses the JSON held by `<script id="{id}">`.
fn load_json<T: DeserializeOwned>(id: &'static str) -> Result<Option<T>> {
	let Some(text) = script_text(id)? else {
		return Ok(None);
	};
	serde_json::from_str(&text)
		.map(Some)
		.map_err(|source| Error::Json { what: id, source })
}

/// Loads `T` from the page, falling back to its default when the script tag
/// is absent or unreadable.
fn load_or_default<T: DeserializeOwned + Default>(id: &'static str) -> T {
	match load_json(id) {
		Ok(Some(value)) => value,
		Ok(None) => T::default(),
		Err(e) => {
			warn!("topology-graph: {}", e);
			T::default()
		}
	}
}

/// Main application component.
/// Loads configuration and seed data from the DOM and renders the diagram.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config: AppConfig = load_or_default("graph-config");
	let graph_data: GraphData = load_or_default("graph-data");
	info!(
		"topology-graph: seed data has {} nodes, {} links",
		graph_data.nodes.len(),
		graph_data.links.len()
	);
	let graph_signal = Signal::derive(move || graph_data.clone());

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Network Topology" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<TopologyCanvas data=graph_signal config=config />
			<div class="graph-overlay">
				<h1>"Network Topology"</h1>
				<p class="subtitle">"Press the advance key to reveal the next stage. Drag nodes to reposition."</p>
			</div>
		</div>
	}
}
