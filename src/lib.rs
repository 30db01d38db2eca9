//! Vulkan "hello triangle": an ordered GPU bring-up sequence and a frame loop
//! that draws one triangle per frame.
//!
//! [`GpuContext`] owns every GPU object and talks to the driver only through
//! the [`Driver`] trait. [`VulkanDriver`] is the ash-backed implementation.

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod selection;

pub use backend::{Driver, VulkanDriver};
pub use config::Config;
pub use context::{ContextSettings, GpuContext};
pub use error::{Error, PresentationState, Result};
pub use frame::{FrameOutcome, FrameStage, RenderState};
