//! Bindless GPU resource table and automatic barrier insertion for Vulkan.
//!
//! Resources live in a [`gpu_resources`] table that mirrors every buffer, image and
//! sampler into one descriptor set. The [`util::task_list`] tracker consumes a linear
//! list of tasks with declared resource accesses and synthesizes the pipeline barriers
//! and layout transitions they need.

pub mod command_list;
pub mod context;
pub mod core;
pub mod device;
pub mod gpu_resources;
pub mod semaphore;
pub mod types;
pub mod util;
