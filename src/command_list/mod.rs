mod info;
pub use info::*;

use crate::{
    device::{Device, DeviceInternal},
    gpu_resources::{
        GPUResourceId,
        BufferId,
        ImageId,
        SamplerId
    },
};
use anyhow::{bail, Context, Result};
use ash::vk;
use std::{
    slice,
    sync::Arc
};



pub const DEFERRED_DESTRUCTION_BUFFER_INDEX: usize = 0;
pub const DEFERRED_DESTRUCTION_IMAGE_INDEX: usize = 1;
pub const DEFERRED_DESTRUCTION_SAMPLER_INDEX: usize = 2;

pub const COMMAND_LIST_BARRIER_MAX_BATCH_SIZE: usize = 16;



#[derive(Default)]
pub(crate) struct CommandBufferPoolPool {
    pools_and_buffers: Vec<(vk::CommandPool, vk::CommandBuffer)>
}

impl CommandBufferPoolPool {
    pub fn get(&mut self, device: &DeviceInternal) -> Result<(vk::CommandPool, vk::CommandBuffer)> {
        if let Some(pool_and_buffer) = self.pools_and_buffers.pop() {
            return Ok(pool_and_buffer);
        }

        let command_pool_ci = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(device.main_queue_family);

        let command_pool = unsafe {
            device.logical_device.create_command_pool(&command_pool_ci, None)
                .context("CommandPool should be created.")?
        };

        let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = unsafe {
            device.logical_device.allocate_command_buffers(&command_buffer_allocate_info)
                .context("CommandBuffer should be allocated.")?[0]
        };

        Ok((command_pool, command_buffer))
    }

    pub fn put_back(&mut self, pool_and_buffer: (vk::CommandPool, vk::CommandBuffer)) {
        self.pools_and_buffers.push(pool_and_buffer);
    }

    pub fn cleanup(&mut self, device: &DeviceInternal) {
        for (pool, _) in &self.pools_and_buffers {
            unsafe { device.logical_device.destroy_command_pool(*pool, None) };
        }
        self.pools_and_buffers.clear();
    }
}


pub(crate) struct CommandListZombie {
    pub command_buffer: vk::CommandBuffer,
    pub command_pool: vk::CommandPool,
}


pub struct CommandList(pub(crate) CommandListState);

pub(crate) enum CommandListState {
    Recording(Box<CommandListInternal>),
    Completed(Arc<CommandListInternal>)
}

pub(crate) struct CommandListInternal {
    device: Device,
    info: CommandListInfo,
    pub command_buffer: vk::CommandBuffer,
    command_pool: vk::CommandPool,
    memory_barrier_batch: [vk::MemoryBarrier2; COMMAND_LIST_BARRIER_MAX_BATCH_SIZE],
    image_barrier_batch: [vk::ImageMemoryBarrier2; COMMAND_LIST_BARRIER_MAX_BATCH_SIZE],
    memory_barrier_batch_count: usize,
    image_barrier_batch_count: usize,
    pub deferred_destructions: Vec<(GPUResourceId, usize)>
}

// Safety: the raw pointers inside the batched barrier structs are always null,
// every barrier is built without extension chains.
unsafe impl Send for CommandListInternal {}
unsafe impl Sync for CommandListInternal {}

// CommandList creation methods
impl CommandList {
    pub(crate) fn new(
        device: Device,
        command_pool: vk::CommandPool,
        command_buffer: vk::CommandBuffer,
        info: CommandListInfo
    ) -> Result<Self> {
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            device.0.logical_device.begin_command_buffer(command_buffer, &begin_info)
                .context("CommandBuffer should begin recording.")?
        };

        device.0.set_debug_name(command_buffer, format!("{} [Daxa CommandBuffer]", info.debug_name))?;
        device.0.set_debug_name(command_pool, format!("{} [Daxa CommandPool]", info.debug_name))?;

        Ok(Self(CommandListState::Recording(Box::new(CommandListInternal {
            device,
            info,
            command_buffer,
            command_pool,
            memory_barrier_batch: Default::default(),
            image_barrier_batch: Default::default(),
            memory_barrier_batch_count: 0,
            image_barrier_batch_count: 0,
            deferred_destructions: vec![]
        }))))
    }
}

impl Clone for CommandList {
    fn clone(&self) -> Self {
        match &self.0 {
            CommandListState::Recording(_) => {
                panic!("Cannot clone reference to incomplete command list.")
            },
            CommandListState::Completed(internal) => {
                CommandList(CommandListState::Completed(internal.clone()))
            }
        }
    }
}

// CommandList usage methods
impl CommandList {
    fn recording(&mut self) -> &mut CommandListInternal {
        match &mut self.0 {
            CommandListState::Recording(internal) => internal,
            CommandListState::Completed(_) => panic!("CommandList is already completed.")
        }
    }

    pub fn copy_buffer_to_buffer(&mut self, info: BufferCopyInfo) {
        let internal = self.recording();
        internal.flush_barriers();

        let buffer_copy = vk::BufferCopy::builder()
            .src_offset(info.src_offset)
            .dst_offset(info.dst_offset)
            .size(info.size)
            .build();

        unsafe {
            internal.device.0.logical_device.cmd_copy_buffer(
                internal.command_buffer,
                internal.device.0.buffer_slot(info.src_buffer).buffer,
                internal.device.0.buffer_slot(info.dst_buffer).buffer,
                slice::from_ref(&buffer_copy)
            );
        }
    }

    pub fn copy_buffer_to_image(&mut self, info: BufferImageCopyInfo) {
        let internal = self.recording();
        internal.flush_barriers();

        let buffer_image_copy = vk::BufferImageCopy::builder()
            .buffer_offset(info.buffer_offset)
            .image_subresource(info.image_layers)
            .image_offset(info.image_offset)
            .image_extent(info.image_extent)
            .build();

        unsafe {
            internal.device.0.logical_device.cmd_copy_buffer_to_image(
                internal.command_buffer,
                internal.device.0.buffer_slot(info.buffer).buffer,
                internal.device.0.image_slot(info.image).image,
                info.image_layout,
                slice::from_ref(&buffer_image_copy)
            );
        }
    }

    pub fn copy_image_to_buffer(&mut self, info: ImageBufferCopyInfo) {
        let internal = self.recording();
        internal.flush_barriers();

        let buffer_image_copy = vk::BufferImageCopy::builder()
            .buffer_offset(info.buffer_offset)
            .image_subresource(info.image_layers)
            .image_offset(info.image_offset)
            .image_extent(info.image_extent)
            .build();

        unsafe {
            internal.device.0.logical_device.cmd_copy_image_to_buffer(
                internal.command_buffer,
                internal.device.0.image_slot(info.image).image,
                info.image_layout,
                internal.device.0.buffer_slot(info.buffer).buffer,
                slice::from_ref(&buffer_image_copy)
            );
        }
    }

    pub fn clear_buffer(&mut self, info: BufferClearInfo) {
        let internal = self.recording();
        internal.flush_barriers();

        unsafe {
            internal.device.0.logical_device.cmd_fill_buffer(
                internal.command_buffer,
                internal.device.0.buffer_slot(info.buffer).buffer,
                info.offset,
                info.size,
                info.clear_value
            );
        }
    }


    pub fn pipeline_barrier(&mut self, info: MemoryBarrierInfo) {
        let internal = self.recording();
        if internal.memory_barrier_batch_count == COMMAND_LIST_BARRIER_MAX_BATCH_SIZE {
            internal.flush_barriers();
        }

        internal.memory_barrier_batch[internal.memory_barrier_batch_count] = vk::MemoryBarrier2::builder()
            .src_stage_mask(info.src_access.0)
            .src_access_mask(info.src_access.1)
            .dst_stage_mask(info.dst_access.0)
            .dst_access_mask(info.dst_access.1)
            .build();
        internal.memory_barrier_batch_count += 1;
    }

    pub fn pipeline_barrier_image_transition(&mut self, info: ImageBarrierInfo) {
        let internal = self.recording();
        if internal.image_barrier_batch_count == COMMAND_LIST_BARRIER_MAX_BATCH_SIZE {
            internal.flush_barriers();
        }

        let image = internal.device.0.image_slot(info.image).image;
        internal.image_barrier_batch[internal.image_barrier_batch_count] = vk::ImageMemoryBarrier2::builder()
            .src_stage_mask(info.src_access.0)
            .src_access_mask(info.src_access.1)
            .dst_stage_mask(info.dst_access.0)
            .dst_access_mask(info.dst_access.1)
            .old_layout(info.src_layout)
            .new_layout(info.dst_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(info.range)
            .build();
        internal.image_barrier_batch_count += 1;
    }


    fn defer_destruction_helper(&mut self, id: GPUResourceId, index: usize) {
        self.recording().deferred_destructions.push((id, index));
    }

    /// The buffer is destroyed once the device has finished executing this command list.
    pub fn destroy_buffer_deferred(&mut self, id: BufferId) {
        self.defer_destruction_helper(id.into(), DEFERRED_DESTRUCTION_BUFFER_INDEX);
    }

    pub fn destroy_image_deferred(&mut self, id: ImageId) {
        self.defer_destruction_helper(id.into(), DEFERRED_DESTRUCTION_IMAGE_INDEX);
    }

    pub fn destroy_sampler_deferred(&mut self, id: SamplerId) {
        self.defer_destruction_helper(id.into(), DEFERRED_DESTRUCTION_SAMPLER_INDEX);
    }


    pub fn complete(self) -> Result<CommandList> {
        match self.0 {
            CommandListState::Recording(mut internal) => {
                internal.flush_barriers();

                unsafe {
                    internal.device.0.logical_device.end_command_buffer(internal.command_buffer)
                        .context("CommandBuffer should end recording.")?
                };

                Ok(CommandList(CommandListState::Completed(
                    Arc::from(internal)
                )))
            },
            CommandListState::Completed(_) => bail!("CommandList is already completed.")
        }
    }

    pub fn is_complete(&self) -> bool {
        match &self.0 {
            CommandListState::Recording(_) => false,
            CommandListState::Completed(_) => true,
        }
    }

    pub fn device(&self) -> &Device {
        match &self.0 {
            CommandListState::Recording(internal) => &internal.device,
            CommandListState::Completed(internal) => &internal.device,
        }
    }

    pub fn info(&self) -> &CommandListInfo {
        match &self.0 {
            CommandListState::Recording(internal) => &internal.info,
            CommandListState::Completed(internal) => &internal.info,
        }
    }
}

// CommandList internal methods
impl CommandListInternal {
    fn flush_barriers(&mut self) {
        if self.memory_barrier_batch_count == 0 && self.image_barrier_batch_count == 0 {
            return;
        }

        let dependency_info = vk::DependencyInfo::builder()
            .dependency_flags(vk::DependencyFlags::empty())
            .memory_barriers(&self.memory_barrier_batch[0..self.memory_barrier_batch_count])
            .image_memory_barriers(&self.image_barrier_batch[0..self.image_barrier_batch_count]);

        unsafe {
            self.device.0.logical_device.cmd_pipeline_barrier2(self.command_buffer, &dependency_info);
        }

        self.memory_barrier_batch_count = 0;
        self.image_barrier_batch_count = 0;
    }
}

impl Drop for CommandListInternal {
    fn drop(&mut self) {
        let cpu_timeline = self.device.main_queue_cpu_timeline();

        self.device.0.main_queue_zombies.lock()
            .unwrap()
            .command_lists
            .push_front((
                cpu_timeline,
                CommandListZombie {
                    command_buffer: self.command_buffer,
                    command_pool: self.command_pool
                }
            ));
    }
}
