//! Deferred task execution.
//!
//! The engine never renders from inside a mutation. It hands a task to a
//! [`Scheduler`], which runs it on a later turn of the event loop. In the
//! browser that is `setTimeout(0)`; tests use [`ManualScheduler`] and drain
//! the queue explicitly.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Runs tasks on a later macrotask, in submission order.
pub trait Scheduler {
	/// Queues `task` to run after the current turn.
	fn schedule(&self, task: Task);
}

/// Browser scheduler backed by `window.setTimeout(task, 0)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
	fn schedule(&self, task: Task) {
		let Some(window) = web_sys::window() else {
			log::warn!("topology-graph: no window, dropping scheduled task");
			return;
		};
		let callback = Closure::once_into_js(task);
		if let Err(err) = window
			.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0)
		{
			log::warn!("topology-graph: setTimeout failed: {:?}", err);
		}
	}
}

/// Queue that only runs tasks when asked to. Clones share the queue.
#[derive(Clone, Default)]
pub struct ManualScheduler {
	queue: Rc<RefCell<VecDeque<Task>>>,
}

impl ManualScheduler {
	/// An empty queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of tasks waiting to run.
	pub fn pending(&self) -> usize {
		self.queue.borrow().len()
	}

	/// Runs the oldest task. Returns false when the queue was empty.
	pub fn run_next(&self) -> bool {
		let task = self.queue.borrow_mut().pop_front();
		match task {
			Some(task) => {
				task();
				true
			}
			None => false,
		}
	}

	/// Runs tasks, including ones scheduled while draining, until the queue
	/// is empty. Returns how many ran.
	pub fn run_until_idle(&self) -> usize {
		let mut ran = 0;
		while self.run_next() {
			ran += 1;
		}
		ran
	}
}

impl Scheduler for ManualScheduler {
	fn schedule(&self, task: Task) {
		self.queue.borrow_mut().push_back(task);
	}
}
