use crate::{
    gpu_resources::{BufferId, ImageId},
    types::{access_consts::ACCESS_READ_WRITE, Access},
};

use ash::vk::{
    self,
    ImageLayout,
    ImageSubresourceRange,
    ImageUsageFlags,
};
use std::{
    borrow::Cow,
    fmt::Display,
};



#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TaskBufferAccess {
    #[default]
    None,
    ShaderRead,
    VertexShaderRead,
    TessellationControlShaderRead,
    TessellationEvaluationShaderRead,
    GeometryShaderRead,
    FragmentShaderRead,
    ComputeShaderRead,
    ShaderWrite,
    VertexShaderWrite,
    TessellationControlShaderWrite,
    TessellationEvaluationShaderWrite,
    GeometryShaderWrite,
    FragmentShaderWrite,
    ComputeShaderWrite,
    ShaderReadWrite,
    VertexShaderReadWrite,
    TessellationControlShaderReadWrite,
    TessellationEvaluationShaderReadWrite,
    GeometryShaderReadWrite,
    FragmentShaderReadWrite,
    ComputeShaderReadWrite,
    IndexRead,
    DrawIndirectInfoRead,
    TransferRead,
    TransferWrite,
    HostTransferRead,
    HostTransferWrite,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TaskImageAccess {
    #[default]
    None,
    ShaderRead,
    VertexShaderRead,
    TessellationControlShaderRead,
    TessellationEvaluationShaderRead,
    GeometryShaderRead,
    FragmentShaderRead,
    ComputeShaderRead,
    ShaderWrite,
    VertexShaderWrite,
    TessellationControlShaderWrite,
    TessellationEvaluationShaderWrite,
    GeometryShaderWrite,
    FragmentShaderWrite,
    ComputeShaderWrite,
    ShaderReadWrite,
    VertexShaderReadWrite,
    TessellationControlShaderReadWrite,
    TessellationEvaluationShaderReadWrite,
    GeometryShaderReadWrite,
    FragmentShaderReadWrite,
    ComputeShaderReadWrite,
    TransferRead,
    TransferWrite,
    ColorAttachment,
    DepthAttachment,
    StencilAttachment,
    DepthStencilAttachment,
    DepthAttachmentRead,
    StencilAttachmentRead,
    DepthStencilAttachmentRead,
    ResolveWrite,
    Present,
}



type TaskResourceIndex = u32;

/// Handle to a buffer tracked by one task list. Index 0 is the empty handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TaskBufferId {
    pub(crate) task_list_index: TaskResourceIndex,
    pub(crate) index: TaskResourceIndex,
}

impl TaskBufferId {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    #[inline]
    pub fn index(&self) -> TaskResourceIndex {
        self.index
    }
}

impl Display for TaskBufferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task_list_index: {}, index: {}", self.task_list_index, self.index)
    }
}

/// Handle to an image tracked by one task list. Index 0 is the empty handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TaskImageId {
    pub(crate) task_list_index: TaskResourceIndex,
    pub(crate) index: TaskResourceIndex,
}

impl TaskImageId {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    #[inline]
    pub fn index(&self) -> TaskResourceIndex {
        self.index
    }
}

impl Display for TaskImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task_list_index: {}, index: {}", self.task_list_index, self.index)
    }
}



#[derive(Clone, Copy, Debug)]
pub struct TaskBufferUse {
    pub id: TaskBufferId,
    pub access: TaskBufferAccess,
}

impl TaskBufferUse {
    pub fn new(id: TaskBufferId, access: TaskBufferAccess) -> Self {
        Self {
            id,
            access
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TaskImageUse {
    pub id: TaskImageId,
    pub access: TaskImageAccess,
}

impl TaskImageUse {
    pub fn new(id: TaskImageId, access: TaskImageAccess) -> Self {
        Self {
            id,
            access
        }
    }
}



pub struct TaskBufferInfo {
    /// Yields the buffer backing this task buffer. Called once at the start of every execution.
    pub fetch_callback: Box<dyn Fn() -> BufferId>,
    /// Access the buffer is left in by work recorded before the first execution.
    pub initial_access: Access,
    pub debug_name: Cow<'static, str>,
}

impl Default for TaskBufferInfo {
    fn default() -> Self {
        Self {
            fetch_callback: Box::new(BufferId::default),
            initial_access: Access::default(),
            debug_name: "".into()
        }
    }
}

pub struct TaskImageInfo {
    pub fetch_callback: Box<dyn Fn() -> ImageId>,
    pub initial_access: Access,
    pub initial_layout: ImageLayout,
    pub slice: ImageSubresourceRange,
    pub debug_name: Cow<'static, str>,
}

impl Default for TaskImageInfo {
    fn default() -> Self {
        Self {
            fetch_callback: Box::new(ImageId::default),
            initial_access: Access::default(),
            initial_layout: ImageLayout::UNDEFINED,
            slice: ImageSubresourceRange {
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

#[derive(Clone, Debug, Default)]
pub struct TaskTransientBufferInfo {
    pub size: u32,
    pub debug_name: Cow<'static, str>,
}

#[derive(Clone, Debug)]
pub struct TaskTransientImageInfo {
    pub dimensions: u32,
    pub format: vk::Format,
    pub aspect: vk::ImageAspectFlags,
    pub size: vk::Extent3D,
    pub mip_level_count: u32,
    pub array_layer_count: u32,
    pub sample_count: u32,
    pub debug_name: Cow<'static, str>,
}

impl Default for TaskTransientImageInfo {
    fn default() -> Self {
        Self {
            dimensions: 2,
            format: vk::Format::R8G8B8A8_UNORM,
            aspect: vk::ImageAspectFlags::COLOR,
            size: vk::Extent3D { width: 0, height: 0, depth: 0 },
            mip_level_count: 1,
            array_layer_count: 1,
            sample_count: 1,
            debug_name: "".into()
        }
    }
}

impl TaskTransientImageInfo {
    pub fn full_slice(&self) -> ImageSubresourceRange {
        ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: 0,
            level_count: self.mip_level_count,
            base_array_layer: 0,
            layer_count: self.array_layer_count
        }
    }
}



/// One synchronization entry recorded before a task. Entries without an image are global memory barriers.
#[derive(Clone, Copy, Debug)]
pub struct TaskPipelineBarrier {
    pub awaited_access: Access,
    pub waiting_access: Access,
    pub before_layout: ImageLayout,
    pub after_layout: ImageLayout,
    pub image_id: Option<TaskImageId>,
    pub image_slice: ImageSubresourceRange,
}

impl Default for TaskPipelineBarrier {
    fn default() -> Self {
        Self {
            awaited_access: Access::default(),
            waiting_access: Access::default(),
            before_layout: ImageLayout::UNDEFINED,
            after_layout: ImageLayout::UNDEFINED,
            image_id: None,
            image_slice: ImageSubresourceRange::default()
        }
    }
}



pub fn task_buffer_access_to_access(access: TaskBufferAccess) -> Access {
    use ash::vk::PipelineStageFlags2 as stage;
    use ash::vk::AccessFlags2 as access;

    match access {
        TaskBufferAccess::None => crate::types::access_consts::NONE,
        TaskBufferAccess::ShaderRead => Access(stage::ALL_GRAPHICS | stage::COMPUTE_SHADER, access::MEMORY_READ),
        TaskBufferAccess::VertexShaderRead => Access(stage::VERTEX_SHADER, access::MEMORY_READ),
        TaskBufferAccess::TessellationControlShaderRead => Access(stage::TESSELLATION_CONTROL_SHADER, access::MEMORY_READ),
        TaskBufferAccess::TessellationEvaluationShaderRead => Access(stage::TESSELLATION_EVALUATION_SHADER, access::MEMORY_READ),
        TaskBufferAccess::GeometryShaderRead => Access(stage::GEOMETRY_SHADER, access::MEMORY_READ),
        TaskBufferAccess::FragmentShaderRead => Access(stage::FRAGMENT_SHADER, access::MEMORY_READ),
        TaskBufferAccess::ComputeShaderRead => Access(stage::COMPUTE_SHADER, access::MEMORY_READ),
        TaskBufferAccess::ShaderWrite => Access(stage::ALL_GRAPHICS | stage::COMPUTE_SHADER, access::MEMORY_WRITE),
        TaskBufferAccess::VertexShaderWrite => Access(stage::VERTEX_SHADER, access::MEMORY_WRITE),
        TaskBufferAccess::TessellationControlShaderWrite => Access(stage::TESSELLATION_CONTROL_SHADER, access::MEMORY_WRITE),
        TaskBufferAccess::TessellationEvaluationShaderWrite => Access(stage::TESSELLATION_EVALUATION_SHADER, access::MEMORY_WRITE),
        TaskBufferAccess::GeometryShaderWrite => Access(stage::GEOMETRY_SHADER, access::MEMORY_WRITE),
        TaskBufferAccess::FragmentShaderWrite => Access(stage::FRAGMENT_SHADER, access::MEMORY_WRITE),
        TaskBufferAccess::ComputeShaderWrite => Access(stage::COMPUTE_SHADER, access::MEMORY_WRITE),
        TaskBufferAccess::ShaderReadWrite => Access(stage::ALL_GRAPHICS | stage::COMPUTE_SHADER, ACCESS_READ_WRITE),
        TaskBufferAccess::VertexShaderReadWrite => Access(stage::VERTEX_SHADER, ACCESS_READ_WRITE),
        TaskBufferAccess::TessellationControlShaderReadWrite => Access(stage::TESSELLATION_CONTROL_SHADER, ACCESS_READ_WRITE),
        TaskBufferAccess::TessellationEvaluationShaderReadWrite => Access(stage::TESSELLATION_EVALUATION_SHADER, ACCESS_READ_WRITE),
        TaskBufferAccess::GeometryShaderReadWrite => Access(stage::GEOMETRY_SHADER, ACCESS_READ_WRITE),
        TaskBufferAccess::FragmentShaderReadWrite => Access(stage::FRAGMENT_SHADER, ACCESS_READ_WRITE),
        TaskBufferAccess::ComputeShaderReadWrite => Access(stage::COMPUTE_SHADER, ACCESS_READ_WRITE),
        TaskBufferAccess::IndexRead => Access(stage::INDEX_INPUT, access::MEMORY_READ),
        TaskBufferAccess::DrawIndirectInfoRead => Access(stage::DRAW_INDIRECT, access::MEMORY_READ),
        TaskBufferAccess::TransferRead => Access(stage::TRANSFER, access::MEMORY_READ),
        TaskBufferAccess::TransferWrite => Access(stage::TRANSFER, access::MEMORY_WRITE),
        TaskBufferAccess::HostTransferRead => Access(stage::HOST, access::MEMORY_READ),
        TaskBufferAccess::HostTransferWrite => Access(stage::HOST, access::MEMORY_WRITE),
    }
}

pub fn task_image_access_to_layout_access(access: TaskImageAccess) -> (ImageLayout, Access) {
    use ash::vk::PipelineStageFlags2 as stage;
    use ash::vk::AccessFlags2 as access;

    match access {
        TaskImageAccess::None => (ImageLayout::UNDEFINED, crate::types::access_consts::NONE),
        TaskImageAccess::ShaderRead => (ImageLayout::READ_ONLY_OPTIMAL, Access(stage::ALL_GRAPHICS | stage::COMPUTE_SHADER, access::MEMORY_READ)),
        TaskImageAccess::VertexShaderRead => (ImageLayout::READ_ONLY_OPTIMAL, Access(stage::VERTEX_SHADER, access::MEMORY_READ)),
        TaskImageAccess::TessellationControlShaderRead => (ImageLayout::READ_ONLY_OPTIMAL, Access(stage::TESSELLATION_CONTROL_SHADER, access::MEMORY_READ)),
        TaskImageAccess::TessellationEvaluationShaderRead => (ImageLayout::READ_ONLY_OPTIMAL, Access(stage::TESSELLATION_EVALUATION_SHADER, access::MEMORY_READ)),
        TaskImageAccess::GeometryShaderRead => (ImageLayout::READ_ONLY_OPTIMAL, Access(stage::GEOMETRY_SHADER, access::MEMORY_READ)),
        TaskImageAccess::FragmentShaderRead => (ImageLayout::READ_ONLY_OPTIMAL, Access(stage::FRAGMENT_SHADER, access::MEMORY_READ)),
        TaskImageAccess::ComputeShaderRead => (ImageLayout::READ_ONLY_OPTIMAL, Access(stage::COMPUTE_SHADER, access::MEMORY_READ)),
        TaskImageAccess::ShaderWrite => (ImageLayout::GENERAL, Access(stage::ALL_GRAPHICS | stage::COMPUTE_SHADER, access::MEMORY_WRITE)),
        TaskImageAccess::VertexShaderWrite => (ImageLayout::GENERAL, Access(stage::VERTEX_SHADER, access::MEMORY_WRITE)),
        TaskImageAccess::TessellationControlShaderWrite => (ImageLayout::GENERAL, Access(stage::TESSELLATION_CONTROL_SHADER, access::MEMORY_WRITE)),
        TaskImageAccess::TessellationEvaluationShaderWrite => (ImageLayout::GENERAL, Access(stage::TESSELLATION_EVALUATION_SHADER, access::MEMORY_WRITE)),
        TaskImageAccess::GeometryShaderWrite => (ImageLayout::GENERAL, Access(stage::GEOMETRY_SHADER, access::MEMORY_WRITE)),
        TaskImageAccess::FragmentShaderWrite => (ImageLayout::GENERAL, Access(stage::FRAGMENT_SHADER, access::MEMORY_WRITE)),
        TaskImageAccess::ComputeShaderWrite => (ImageLayout::GENERAL, Access(stage::COMPUTE_SHADER, access::MEMORY_WRITE)),
        TaskImageAccess::ShaderReadWrite => (ImageLayout::GENERAL, Access(stage::ALL_GRAPHICS | stage::COMPUTE_SHADER, ACCESS_READ_WRITE)),
        TaskImageAccess::VertexShaderReadWrite => (ImageLayout::GENERAL, Access(stage::VERTEX_SHADER, ACCESS_READ_WRITE)),
        TaskImageAccess::TessellationControlShaderReadWrite => (ImageLayout::GENERAL, Access(stage::TESSELLATION_CONTROL_SHADER, ACCESS_READ_WRITE)),
        TaskImageAccess::TessellationEvaluationShaderReadWrite => (ImageLayout::GENERAL, Access(stage::TESSELLATION_EVALUATION_SHADER, ACCESS_READ_WRITE)),
        TaskImageAccess::GeometryShaderReadWrite => (ImageLayout::GENERAL, Access(stage::GEOMETRY_SHADER, ACCESS_READ_WRITE)),
        TaskImageAccess::FragmentShaderReadWrite => (ImageLayout::GENERAL, Access(stage::FRAGMENT_SHADER, ACCESS_READ_WRITE)),
        TaskImageAccess::ComputeShaderReadWrite => (ImageLayout::GENERAL, Access(stage::COMPUTE_SHADER, ACCESS_READ_WRITE)),
        TaskImageAccess::TransferRead => (ImageLayout::TRANSFER_SRC_OPTIMAL, Access(stage::TRANSFER, access::MEMORY_READ)),
        TaskImageAccess::TransferWrite => (ImageLayout::TRANSFER_DST_OPTIMAL, Access(stage::TRANSFER, access::MEMORY_WRITE)),
        TaskImageAccess::ColorAttachment => (ImageLayout::ATTACHMENT_OPTIMAL, Access(stage::COLOR_ATTACHMENT_OUTPUT, ACCESS_READ_WRITE)),
        TaskImageAccess::DepthAttachment |
        TaskImageAccess::StencilAttachment |
        TaskImageAccess::DepthStencilAttachment => (ImageLayout::ATTACHMENT_OPTIMAL, Access(stage::EARLY_FRAGMENT_TESTS | stage::LATE_FRAGMENT_TESTS, ACCESS_READ_WRITE)),
        TaskImageAccess::DepthAttachmentRead |
        TaskImageAccess::StencilAttachmentRead |
        TaskImageAccess::DepthStencilAttachmentRead => (ImageLayout::READ_ONLY_OPTIMAL, Access(stage::EARLY_FRAGMENT_TESTS | stage::LATE_FRAGMENT_TESTS, access::MEMORY_READ)),
        TaskImageAccess::ResolveWrite => (ImageLayout::ATTACHMENT_OPTIMAL, Access(stage::RESOLVE, access::MEMORY_WRITE)),
        TaskImageAccess::Present => (ImageLayout::PRESENT_SRC_KHR, Access(stage::ALL_COMMANDS, access::MEMORY_READ)),
    }
}

pub fn task_image_access_to_usage(access: TaskImageAccess) -> ImageUsageFlags {
    match access {
        TaskImageAccess::ShaderRead |
        TaskImageAccess::VertexShaderRead |
        TaskImageAccess::TessellationControlShaderRead |
        TaskImageAccess::TessellationEvaluationShaderRead |
        TaskImageAccess::GeometryShaderRead |
        TaskImageAccess::FragmentShaderRead |
        TaskImageAccess::ComputeShaderRead => ImageUsageFlags::SAMPLED,
        TaskImageAccess::ShaderWrite |
        TaskImageAccess::VertexShaderWrite |
        TaskImageAccess::TessellationControlShaderWrite |
        TaskImageAccess::TessellationEvaluationShaderWrite |
        TaskImageAccess::GeometryShaderWrite |
        TaskImageAccess::FragmentShaderWrite |
        TaskImageAccess::ComputeShaderWrite |
        TaskImageAccess::ShaderReadWrite |
        TaskImageAccess::VertexShaderReadWrite |
        TaskImageAccess::TessellationControlShaderReadWrite |
        TaskImageAccess::TessellationEvaluationShaderReadWrite |
        TaskImageAccess::GeometryShaderReadWrite |
        TaskImageAccess::FragmentShaderReadWrite |
        TaskImageAccess::ComputeShaderReadWrite => ImageUsageFlags::STORAGE,
        TaskImageAccess::TransferRead => ImageUsageFlags::TRANSFER_SRC,
        TaskImageAccess::TransferWrite => ImageUsageFlags::TRANSFER_DST,
        TaskImageAccess::ResolveWrite |
        TaskImageAccess::ColorAttachment => ImageUsageFlags::COLOR_ATTACHMENT,
        TaskImageAccess::DepthAttachment |
        TaskImageAccess::StencilAttachment |
        TaskImageAccess::DepthStencilAttachment |
        TaskImageAccess::DepthAttachmentRead |
        TaskImageAccess::StencilAttachmentRead |
        TaskImageAccess::DepthStencilAttachmentRead => ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        TaskImageAccess::Present |
        TaskImageAccess::None => ImageUsageFlags::empty()
    }
}
