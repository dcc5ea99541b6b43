use crate::{
    gpu_resources::{BufferId, ImageId},
    types::Access,
};

use ash::vk;
use std::borrow::Cow;

// reexport
pub use vk::ImageLayout;



#[derive(Default)]
pub struct CommandListInfo {
    pub debug_name: Cow<'static, str>,
}


/// A global memory barrier between two accesses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryBarrierInfo {
    pub src_access: Access,
    pub dst_access: Access
}

/// A barrier on one image, optionally transitioning its layout.
#[derive(Clone, Copy, Debug)]
pub struct ImageBarrierInfo {
    pub src_access: Access,
    pub dst_access: Access,
    pub src_layout: vk::ImageLayout,
    pub dst_layout: vk::ImageLayout,
    pub range: vk::ImageSubresourceRange,
    pub image: ImageId
}

impl Default for ImageBarrierInfo {
    fn default() -> Self {
        Self {
            src_access: Default::default(),
            dst_access: Default::default(),
            src_layout: vk::ImageLayout::UNDEFINED,
            dst_layout: vk::ImageLayout::UNDEFINED,
            range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1
            },
            image: Default::default()
        }
    }
}


#[derive(Clone, Copy, Default)]
pub struct BufferCopyInfo {
    pub src_buffer: BufferId,
    pub src_offset: vk::DeviceSize,
    pub dst_buffer: BufferId,
    pub dst_offset: vk::DeviceSize,
    pub size: vk::DeviceSize
}


#[derive(Clone, Copy)]
pub struct BufferImageCopyInfo {
    pub buffer: BufferId,
    pub buffer_offset: vk::DeviceSize,
    pub image: ImageId,
    pub image_layout: vk::ImageLayout,
    pub image_layers: vk::ImageSubresourceLayers,
    pub image_offset: vk::Offset3D,
    pub image_extent: vk::Extent3D
}

impl Default for BufferImageCopyInfo {
    fn default() -> Self {
        Self {
            buffer: Default::default(),
            buffer_offset: Default::default(),
            image: Default::default(),
            image_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            image_layers: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1
            },
            image_offset: Default::default(),
            image_extent: Default::default()
        }
    }
}


#[derive(Clone, Copy)]
pub struct ImageBufferCopyInfo {
    pub image: ImageId,
    pub image_layout: vk::ImageLayout,
    pub image_layers: vk::ImageSubresourceLayers,
    pub image_offset: vk::Offset3D,
    pub image_extent: vk::Extent3D,
    pub buffer: BufferId,
    pub buffer_offset: vk::DeviceSize
}

impl Default for ImageBufferCopyInfo {
    fn default() -> Self {
        Self {
            image: Default::default(),
            image_layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            image_layers: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1
            },
            image_offset: Default::default(),
            image_extent: Default::default(),
            buffer: Default::default(),
            buffer_offset: Default::default()
        }
    }
}


#[derive(Clone, Copy)]
pub struct BufferClearInfo {
    pub buffer: BufferId,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
    pub clear_value: u32
}

impl Default for BufferClearInfo {
    fn default() -> Self {
        Self {
            buffer: Default::default(),
            offset: 0,
            size: vk::WHOLE_SIZE,
            clear_value: 0
        }
    }
}
