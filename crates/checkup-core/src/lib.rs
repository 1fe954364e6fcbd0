//! Hardware-independent core library for checkup
//!
//! This crate contains all platform-agnostic logic for the checkup sensor
//! health-check firmware: the cooperative run-to-completion scheduler, the
//! sensor reading store, per-sensor acquisition state machines, and the
//! aggregation/render pass that drives the LCD and status LEDs.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app;
pub mod bus;
pub mod button;
pub mod config;
pub mod display;
pub mod health;
pub mod led;
pub mod power;
pub mod render;
pub mod scheduler;
pub mod sensors;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::{BootTasks, Platform, Resources, on_init};
pub use config::AppConfig;
pub use scheduler::{Clock, PlanRequests, Scheduler, Step, Task, TaskContext, TaskId};
pub use store::ReadingStore;
