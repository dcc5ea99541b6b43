mod resource_pool;
mod resource_table;

pub(crate) use resource_pool::*;
pub(crate) use resource_table::*;

use crate::core::ResourceId;

use ash::vk;
use daxa_sync_derive::ResourceId;
use gpu_allocator::MemoryLocation;
use std::borrow::Cow;

// reexport
pub use vk::{
    Filter,
    Format,
    ImageAspectFlags,
    ImageUsageFlags,
    ImageViewType,
    SamplerAddressMode,
    SamplerMipmapMode,
};



pub const BUFFER_BINDING: u32 = 0;
pub const STORAGE_IMAGE_BINDING: u32 = 1;
pub const SAMPLED_IMAGE_BINDING: u32 = 2;
pub const SAMPLER_BINDING: u32 = 3;



#[derive(ResourceId, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GPUResourceId(pub u32);

#[derive(ResourceId, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub u32);

#[derive(ResourceId, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageId(pub u32);

impl ImageId {
    /// Every image owns a view covering all of its mips and layers, sharing the image's slot.
    #[inline]
    pub fn default_view(&self) -> ImageViewId {
        ImageViewId(self.0)
    }
}

#[derive(ResourceId, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageViewId(pub u32);

#[derive(ResourceId, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SamplerId(pub u32);

macro_rules! impl_from_gpu_resource_id {
    ($($id:ident),*) => {
        $(
            impl From<GPUResourceId> for $id {
                fn from(value: GPUResourceId) -> Self {
                    $id(value.0)
                }
            }

            impl From<$id> for GPUResourceId {
                fn from(value: $id) -> Self {
                    GPUResourceId(value.0)
                }
            }
        )*
    };
}

impl_from_gpu_resource_id!(BufferId, ImageId, ImageViewId, SamplerId);



#[derive(Clone, Debug)]
pub struct BufferInfo {
    pub size: u32,
    pub memory_location: MemoryLocation,
    pub debug_name: Cow<'static, str>,
}

impl Default for BufferInfo {
    fn default() -> Self {
        Self {
            size: 0,
            memory_location: MemoryLocation::GpuOnly,
            debug_name: "".into()
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImageInfo {
    pub dimensions: u32,
    pub format: vk::Format,
    pub aspect: vk::ImageAspectFlags,
    pub size: vk::Extent3D,
    pub mip_level_count: u32,
    pub array_layer_count: u32,
    pub sample_count: u32,
    pub usage: vk::ImageUsageFlags,
    pub memory_location: MemoryLocation,
    pub debug_name: Cow<'static, str>,
}

impl Default for ImageInfo {
    fn default() -> Self {
        Self {
            dimensions: 2,
            format: vk::Format::R8G8B8A8_UNORM,
            aspect: vk::ImageAspectFlags::COLOR,
            size: vk::Extent3D { width: 0, height: 0, depth: 0 },
            mip_level_count: 1,
            array_layer_count: 1,
            sample_count: 1,
            usage: vk::ImageUsageFlags::empty(),
            memory_location: MemoryLocation::GpuOnly,
            debug_name: "".into()
        }
    }
}

impl ImageInfo {
    /// Range covering every mip level and array layer of the image.
    pub fn full_slice(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: 0,
            level_count: self.mip_level_count,
            base_array_layer: 0,
            layer_count: self.array_layer_count
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImageViewInfo {
    pub image_view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub image: ImageId,
    pub subresource_range: vk::ImageSubresourceRange,
    pub debug_name: Cow<'static, str>,
}

impl Default for ImageViewInfo {
    fn default() -> Self {
        Self {
            image_view_type: vk::ImageViewType::TYPE_2D,
            format: vk::Format::R8G8B8A8_UNORM,
            image: Default::default(),
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1
            },
            debug_name: "".into()
        }
    }
}

#[derive(Clone, Debug)]
pub struct SamplerInfo {
    pub magnification_filter: vk::Filter,
    pub minification_filter: vk::Filter,
    pub mipmap_filter: vk::SamplerMipmapMode,
    pub address_mode_u: vk::SamplerAddressMode,
    pub address_mode_v: vk::SamplerAddressMode,
    pub address_mode_w: vk::SamplerAddressMode,
    pub mip_lod_bias: f32,
    pub enable_anisotropy: bool,
    pub max_anisotropy: f32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub debug_name: Cow<'static, str>,
}

impl Default for SamplerInfo {
    fn default() -> Self {
        Self {
            magnification_filter: vk::Filter::LINEAR,
            minification_filter: vk::Filter::LINEAR,
            mipmap_filter: vk::SamplerMipmapMode::LINEAR,
            address_mode_u: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_v: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_w: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            mip_lod_bias: 0.0,
            enable_anisotropy: false,
            max_anisotropy: 0.0,
            min_lod: 0.0,
            max_lod: 1000.0,
            debug_name: "".into()
        }
    }
}
