use crate::{
    command_list::*,
    context::Context,
    core::*,
    gpu_resources::*,
    semaphore::*
};

use anyhow::{bail, Context as _, Result};
use ash::{
    Device as LogicalDevice,
    vk::{self, Handle, PhysicalDevice}
};
use gpu_allocator::{vulkan::*, AllocatorDebugSettings};
use std::{
    borrow::Cow,
    collections::VecDeque,
    ffi::CString,
    mem::ManuallyDrop,
    slice,
    sync::{
        Arc,
        atomic::{
            AtomicU64,
            Ordering
        },
        Mutex
    },
};

// Re-export
pub use ash::vk::{
    PhysicalDeviceType as DeviceType,
    PhysicalDeviceLimits as DeviceLimits,
    PhysicalDeviceProperties as DeviceProperties,
};



type DeviceSelector = fn(&DeviceProperties) -> i32;

pub fn default_device_selector(device_properties: &DeviceProperties) -> i32 {
    let mut score = 0;

    match device_properties.device_type {
        DeviceType::DISCRETE_GPU => score += 10000,
        DeviceType::VIRTUAL_GPU => score += 1000,
        DeviceType::INTEGRATED_GPU => score += 100,
        _ => ()
    }

    score
}

#[derive(Clone)]
pub struct DeviceInfo {
    /// Scores each Vulkan 1.3 capable device. The highest non-negative score wins.
    pub selector: DeviceSelector,
    pub max_allowed_buffers: u32,
    pub max_allowed_images: u32,
    pub max_allowed_samplers: u32,
    pub debug_name: Cow<'static, str>,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            selector: default_device_selector,
            max_allowed_buffers: 10000,
            max_allowed_images: 10000,
            max_allowed_samplers: 400,
            debug_name: "".into()
        }
    }
}

#[derive(Default)]
pub struct CommandSubmitInfo {
    pub command_lists: Vec<CommandList>,
    pub wait_binary_semaphores: Vec<BinarySemaphore>,
    pub signal_binary_semaphores: Vec<BinarySemaphore>,
    pub wait_timeline_semaphores: Vec<(TimelineSemaphore, u64)>,
    pub signal_timeline_semaphores: Vec<(TimelineSemaphore, u64)>,
}



#[derive(Clone)]
pub struct Device(pub(crate) Arc<DeviceInternal>);

pub(crate) struct DeviceInternal {
    context: Context,
    properties: DeviceProperties,
    info: DeviceInfo,

    pub logical_device: LogicalDevice,

    allocator: ManuallyDrop<Mutex<Allocator>>,

    // Main queue
    main_queue: vk::Queue,
    pub main_queue_family: u32,
    pub main_queue_cpu_timeline: AtomicU64,
    main_queue_gpu_timeline_semaphore: vk::Semaphore,

    // GPU resource table
    gpu_shader_resource_table: GPUShaderResourceTable,

    null_sampler: vk::Sampler,

    // Resource recycling
    command_buffer_pool_pool: Mutex<CommandBufferPoolPool>,

    pub main_queue_submits: Mutex<VecDeque<(u64, Vec<CommandList>)>>,
    pub main_queue_zombies: Mutex<MainQueueZombies>,
}

#[derive(Default)]
pub(crate) struct MainQueueZombies {
    pub command_lists: VecDeque<(u64, CommandListZombie)>,
    pub buffers: VecDeque<(u64, BufferId)>,
    pub images: VecDeque<(u64, ImageId)>,
    pub samplers: VecDeque<(u64, SamplerId)>,
    pub semaphores: VecDeque<(u64, SemaphoreZombie)>,
}

fn set_debug_name<H: Handle>(
    context: &Context,
    logical_device: &LogicalDevice,
    handle: H,
    name: String
) -> Result<()> {
    let Some(debug_utils) = context.debug_utils() else {
        return Ok(())
    };

    let name = CString::new(name)?;
    let name_info = vk::DebugUtilsObjectNameInfoEXT::builder()
        .object_type(H::TYPE)
        .object_handle(handle.as_raw())
        .object_name(&name);

    unsafe {
        debug_utils.set_debug_utils_object_name(logical_device.handle(), &name_info)
            .context("Debug name should be set.")
    }
}

// Device creation methods
impl Device {
    pub(crate) fn new(
        device_info: DeviceInfo,
        device_properties: DeviceProperties,
        context: Context,
        physical_device: PhysicalDevice
    ) -> Result<Self> {
        // Select main queue
        let queue_family_properties = unsafe {
            context.get_physical_device_queue_family_properties(physical_device)
        };

        let Some(main_queue_family) = queue_family_properties.iter()
            .position(|properties| {
                properties.queue_flags.contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER)
            })
            .map(|index| index as u32) else {
                bail!("No suitable queue family found.");
            };

        let queue_priorities = [0.0f32];
        let queue_ci = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(main_queue_family)
            .queue_priorities(&queue_priorities)
            .build();

        // Bindless limits are governed by the update-after-bind limits
        let mut descriptor_indexing_properties = vk::PhysicalDeviceDescriptorIndexingProperties::default();
        let mut properties_2 = vk::PhysicalDeviceProperties2::builder()
            .push_next(&mut descriptor_indexing_properties);
        unsafe { context.get_physical_device_properties2(physical_device, &mut properties_2) };

        let max_buffers = descriptor_indexing_properties.max_descriptor_set_update_after_bind_storage_buffers
            .min(device_info.max_allowed_buffers)
            .min(MAX_RESOURCE_COUNT as u32);
        let max_images = descriptor_indexing_properties.max_descriptor_set_update_after_bind_sampled_images
            .min(descriptor_indexing_properties.max_descriptor_set_update_after_bind_storage_images)
            .min(device_info.max_allowed_images)
            .min(MAX_RESOURCE_COUNT as u32);
        let max_samplers = descriptor_indexing_properties.max_descriptor_set_update_after_bind_samplers
            .min(device_info.max_allowed_samplers)
            .min(MAX_RESOURCE_COUNT as u32);

        // Define required device features
        let required_physical_device_features = vk::PhysicalDeviceFeatures::builder()
            .image_cube_array(true)
            .sampler_anisotropy(true)
            .shader_storage_image_read_without_format(true)
            .shader_storage_image_write_without_format(true)
            .build();

        let mut required_physical_device_features_descriptor_indexing = vk::PhysicalDeviceDescriptorIndexingFeatures::builder()
            .shader_sampled_image_array_non_uniform_indexing(true)
            .shader_storage_image_array_non_uniform_indexing(true)
            .shader_storage_buffer_array_non_uniform_indexing(true)
            .descriptor_binding_sampled_image_update_after_bind(true)
            .descriptor_binding_storage_image_update_after_bind(true)
            .descriptor_binding_storage_buffer_update_after_bind(true)
            .descriptor_binding_update_unused_while_pending(true)
            .descriptor_binding_partially_bound(true)
            .runtime_descriptor_array(true)
            .build();

        let mut required_physical_device_features_timeline_semaphore = vk::PhysicalDeviceTimelineSemaphoreFeatures::builder()
            .timeline_semaphore(true)
            .build();

        let mut required_physical_device_features_synchronization_2 = vk::PhysicalDeviceSynchronization2Features::builder()
            .synchronization2(true)
            .build();

        // Freed slots are overwritten with null descriptors
        let mut required_physical_device_features_robustness_2 = vk::PhysicalDeviceRobustness2FeaturesEXT::builder()
            .null_descriptor(true)
            .build();

        let mut physical_device_features_2 = vk::PhysicalDeviceFeatures2::builder()
            .push_next(&mut required_physical_device_features_descriptor_indexing)
            .push_next(&mut required_physical_device_features_timeline_semaphore)
            .push_next(&mut required_physical_device_features_synchronization_2)
            .push_next(&mut required_physical_device_features_robustness_2)
            .features(required_physical_device_features)
            .build();

        let extension_names = [
            vk::ExtRobustness2Fn::name().as_ptr(),
        ];

        // Create logical device
        let device_ci = vk::DeviceCreateInfo::builder()
            .push_next(&mut physical_device_features_2)
            .queue_create_infos(slice::from_ref(&queue_ci))
            .enabled_extension_names(&extension_names);
        let logical_device = unsafe {
            (*context).create_device(physical_device, &device_ci, None)
                .context("Logical device should be created.")?
        };

        // Create allocator
        let allocator = Allocator::new(
            &AllocatorCreateDesc {
                instance: (*context).clone(),
                device: logical_device.clone(),
                physical_device,
                debug_settings: AllocatorDebugSettings {
                    log_leaks_on_shutdown: true,
                    ..Default::default()
                },
                buffer_device_address: false,
                allocation_sizes: Default::default()
            }
        ).context("Allocator should be created.")?;

        // Create main queue
        let main_queue = unsafe {
            logical_device.get_device_queue(main_queue_family, 0)
        };
        let mut semaphore_type_ci = vk::SemaphoreTypeCreateInfo::builder()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(0);
        let main_queue_gpu_timeline_semaphore = unsafe {
            logical_device.create_semaphore(
                &vk::SemaphoreCreateInfo::builder().push_next(&mut semaphore_type_ci),
                None
            ).context("Semaphore should be created.")?
        };

        // Images and buffers can be set to be a null descriptor.
        // Null descriptors are not available for samplers, but we still want to have one to overwrite dead resources with.
        // So we create a default sampler that acts as the "null sampler".
        let sampler_ci = vk::SamplerCreateInfo::default();
        let null_sampler = unsafe {
            logical_device.create_sampler(&sampler_ci, None)
                .context("Sampler should be created.")?
        };

        set_debug_name(&context, &logical_device, logical_device.handle(), format!("{} [Daxa Device]", device_info.debug_name))?;
        set_debug_name(&context, &logical_device, main_queue, format!("{} [Daxa Device Queue]", device_info.debug_name))?;
        set_debug_name(&context, &logical_device, main_queue_gpu_timeline_semaphore, format!("{} [Daxa Device TimelineSemaphore]", device_info.debug_name))?;
        set_debug_name(&context, &logical_device, null_sampler, format!("{} [Daxa Device Null Sampler]", device_info.debug_name))?;

        let gpu_shader_resource_table = GPUShaderResourceTable::new(
            max_buffers as usize,
            max_images as usize,
            max_samplers as usize,
            &logical_device
        ).context("GPUShaderResourceTable should be created.")?;

        tracing::info!(
            device = %device_info.debug_name,
            max_buffers,
            max_images,
            max_samplers,
            "Created device"
        );

        Ok(Self(Arc::new(DeviceInternal {
            context,
            properties: device_properties,
            info: device_info,

            logical_device,

            allocator: ManuallyDrop::new(Mutex::new(allocator)),

            // Main queue
            main_queue,
            main_queue_family,
            main_queue_cpu_timeline: AtomicU64::default(),
            main_queue_gpu_timeline_semaphore,

            // GPU resource table
            gpu_shader_resource_table,

            null_sampler,

            command_buffer_pool_pool: Default::default(),

            main_queue_submits: Default::default(),
            main_queue_zombies: Default::default(),
        })))
    }
}

// Device usage methods
impl Device {
    #[inline]
    pub fn create_buffer(&self, info: BufferInfo) -> Result<BufferId> {
        self.0.new_buffer(info)
    }

    #[inline]
    pub fn create_image(&self, info: ImageInfo) -> Result<ImageId> {
        self.0.new_image(info)
    }

    #[inline]
    pub fn create_sampler(&self, info: SamplerInfo) -> Result<SamplerId> {
        self.0.new_sampler(info)
    }


    /// Destruction is deferred until the GPU has passed every submit issued so far.
    #[inline]
    pub fn destroy_buffer(&self, id: BufferId) {
        self.0.zombify_buffer(id);
    }

    #[inline]
    pub fn destroy_image(&self, id: ImageId) {
        self.0.zombify_image(id);
    }

    #[inline]
    pub fn destroy_sampler(&self, id: SamplerId) {
        self.0.zombify_sampler(id);
    }


    #[inline]
    pub fn info_buffer(&self, id: BufferId) -> BufferInfo {
        self.0.buffer_slot(id).info.clone()
    }

    #[inline]
    pub fn info_image(&self, id: ImageId) -> ImageInfo {
        self.0.image_slot(id).info.clone()
    }

    #[inline]
    pub fn info_image_view(&self, id: ImageViewId) -> ImageViewInfo {
        self.0.image_slot(ImageId(id.0)).view_slot.info.clone()
    }

    #[inline]
    pub fn info_sampler(&self, id: SamplerId) -> SamplerInfo {
        self.0.sampler_slot(id).info.clone()
    }


    #[inline]
    pub fn is_buffer_id_valid(&self, id: BufferId) -> bool {
        !id.is_empty() && self.0.gpu_shader_resource_table.buffer_slots.is_id_valid(&id)
    }

    #[inline]
    pub fn is_image_id_valid(&self, id: ImageId) -> bool {
        !id.is_empty() && self.0.gpu_shader_resource_table.image_slots.is_id_valid(&id)
    }

    #[inline]
    pub fn is_sampler_id_valid(&self, id: SamplerId) -> bool {
        !id.is_empty() && self.0.gpu_shader_resource_table.sampler_slots.is_id_valid(&id)
    }


    /// Pipeline layout with the bindless set at set 0 and a push constant range of `push_constant_size` bytes.
    #[inline]
    pub fn pipeline_layout(&self, push_constant_size: u32) -> vk::PipelineLayout {
        self.0.gpu_shader_resource_table.pipeline_layout(push_constant_size)
    }

    #[inline]
    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.0.gpu_shader_resource_table.descriptor_set()
    }


    pub fn create_command_list(&self, info: CommandListInfo) -> Result<CommandList> {
        let (pool, buffer) = self.0.command_buffer_pool_pool.lock()
            .unwrap()
            .get(&self.0)?;

        CommandList::new(self.clone(), pool, buffer, info)
    }

    #[inline]
    pub fn create_binary_semaphore(&self, info: BinarySemaphoreInfo) -> Result<BinarySemaphore> {
        BinarySemaphore::new(self.clone(), info)
    }

    #[inline]
    pub fn create_timeline_semaphore(&self, info: TimelineSemaphoreInfo) -> Result<TimelineSemaphore> {
        TimelineSemaphore::new(self.clone(), info)
    }


    #[inline]
    pub fn info(&self) -> &DeviceInfo {
        &self.0.info
    }

    #[inline]
    pub fn properties(&self) -> DeviceProperties {
        self.0.properties
    }

    #[inline]
    pub fn wait_idle(&self) -> Result<()> {
        self.0.wait_idle()
    }


    /// Submits completed command lists to the main queue.
    ///
    /// The command lists are kept alive until `collect_garbage` observes that the GPU finished them.
    pub fn submit_commands(&self, info: CommandSubmitInfo) -> Result<()> {
        let internal = self.0.as_ref();

        if info.command_lists.iter().any(|command_list| !command_list.is_complete()) {
            bail!("Command lists must be completed before submission.");
        }

        self.collect_garbage()?;

        let timeline_value = internal.main_queue_cpu_timeline.fetch_add(1, Ordering::AcqRel) + 1;

        let mut submit: (u64, Vec<CommandList>) = (timeline_value, vec![]);
        let mut submit_command_buffers = Vec::with_capacity(info.command_lists.len());

        {
            let mut main_queue_zombies = internal.main_queue_zombies.lock().unwrap();
            for command_list in &info.command_lists {
                let CommandListState::Completed(command_list) = &command_list.0 else {
                    unreachable!("Command lists were checked to be completed.");
                };

                let resource_table = &internal.gpu_shader_resource_table;
                for (id, index) in &command_list.deferred_destructions {
                    match *index {
                        DEFERRED_DESTRUCTION_BUFFER_INDEX => {
                            let id = BufferId(id.0);
                            let slot = resource_table.buffer_slots.dereference_id_mut(&id);
                            debug_assert!(!slot.zombie, "Detected double delete for a resource id.");
                            slot.zombie = true;
                            main_queue_zombies.buffers.push_front((timeline_value, id));
                        },
                        DEFERRED_DESTRUCTION_IMAGE_INDEX => {
                            let id = ImageId(id.0);
                            let slot = resource_table.image_slots.dereference_id_mut(&id);
                            debug_assert!(!slot.zombie, "Detected double delete for a resource id.");
                            slot.zombie = true;
                            slot.view_slot.zombie = true;
                            main_queue_zombies.images.push_front((timeline_value, id));
                        },
                        DEFERRED_DESTRUCTION_SAMPLER_INDEX => {
                            let id = SamplerId(id.0);
                            let slot = resource_table.sampler_slots.dereference_id_mut(&id);
                            debug_assert!(!slot.zombie, "Detected double delete for a resource id.");
                            slot.zombie = true;
                            main_queue_zombies.samplers.push_front((timeline_value, id));
                        },
                        _ => unreachable!("Unknown deferred destruction index.")
                    }
                }

                submit.1.push(CommandList(CommandListState::Completed(command_list.clone())));
                submit_command_buffers.push(command_list.command_buffer);
            }
        }

        // All timeline semaphores come first, then binary semaphores follow.
        // The main queue timeline is always the first signal.
        let mut submit_semaphore_signals = vec![internal.main_queue_gpu_timeline_semaphore];
        let mut submit_semaphore_signal_values = vec![timeline_value];

        for (timeline_semaphore, signal_value) in &info.signal_timeline_semaphores {
            submit_semaphore_signals.push(timeline_semaphore.0.semaphore);
            submit_semaphore_signal_values.push(*signal_value);
        }

        for binary_semaphore in &info.signal_binary_semaphores {
            submit_semaphore_signals.push(binary_semaphore.0.semaphore);
            // Binary semaphores need a dummy value
            submit_semaphore_signal_values.push(0);
        }

        let mut submit_semaphore_waits = vec![];
        let mut submit_semaphore_wait_stage_masks = vec![];
        let mut submit_semaphore_wait_values = vec![];

        for (timeline_semaphore, wait_value) in &info.wait_timeline_semaphores {
            submit_semaphore_waits.push(timeline_semaphore.0.semaphore);
            submit_semaphore_wait_stage_masks.push(vk::PipelineStageFlags::ALL_COMMANDS);
            submit_semaphore_wait_values.push(*wait_value);
        }

        for binary_semaphore in &info.wait_binary_semaphores {
            submit_semaphore_waits.push(binary_semaphore.0.semaphore);
            submit_semaphore_wait_stage_masks.push(vk::PipelineStageFlags::ALL_COMMANDS);
            submit_semaphore_wait_values.push(0);
        }

        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::builder()
            .wait_semaphore_values(&submit_semaphore_wait_values)
            .signal_semaphore_values(&submit_semaphore_signal_values);

        let submit_info = vk::SubmitInfo::builder()
            .push_next(&mut timeline_info)
            .wait_semaphores(&submit_semaphore_waits)
            .wait_dst_stage_mask(&submit_semaphore_wait_stage_masks)
            .command_buffers(&submit_command_buffers)
            .signal_semaphores(&submit_semaphore_signals)
            .build();

        unsafe {
            internal.logical_device.queue_submit(internal.main_queue, slice::from_ref(&submit_info), vk::Fence::null())
                .context("Commands should be submitted.")?
        };

        internal.main_queue_submits.lock()
            .unwrap()
            .push_front(submit);

        Ok(())
    }

    /// Destroys every zombie whose submit the GPU has finished.
    #[inline]
    pub fn collect_garbage(&self) -> Result<()> {
        self.0.main_queue_collect_garbage()
    }

    /// Value of the last submit on the main queue.
    #[inline]
    pub fn main_queue_cpu_timeline(&self) -> u64 {
        self.0.main_queue_cpu_timeline.load(Ordering::Acquire)
    }

    /// Value the GPU has reached on the main queue.
    pub fn main_queue_gpu_timeline(&self) -> Result<u64> {
        self.0.main_queue_gpu_timeline()
    }
}


// Device internal methods
impl DeviceInternal {
    pub(crate) fn set_debug_name<H: Handle>(&self, handle: H, name: String) -> Result<()> {
        set_debug_name(&self.context, &self.logical_device, handle, name)
    }

    fn main_queue_gpu_timeline(&self) -> Result<u64> {
        match unsafe { self.logical_device.get_semaphore_counter_value(self.main_queue_gpu_timeline_semaphore) } {
            Ok(value) => Ok(value),
            Err(vk::Result::ERROR_DEVICE_LOST) => bail!("Device lost."),
            Err(result) => Err(result).context("Main queue timeline should be readable.")
        }
    }

    fn main_queue_collect_garbage(&self) -> Result<()> {
        let gpu_timeline_value = self.main_queue_gpu_timeline()?;

        fn check_and_cleanup_gpu_resource<T>(
            zombies: &mut VecDeque<(u64, T)>,
            mut cleanup_fn: impl FnMut(T) -> Result<()>,
            gpu_timeline_value: u64
        ) -> Result<usize> {
            let mut count = 0;
            while zombies.back().is_some_and(|(timeline_value, _)| *timeline_value <= gpu_timeline_value) {
                if let Some((_, object)) = zombies.pop_back() {
                    cleanup_fn(object)?;
                    count += 1;
                }
            }
            Ok(count)
        }

        // Dropping finished submits can create command list zombies, so this goes first
        let retired_submits = {
            let mut submits = self.main_queue_submits.lock().unwrap();
            let mut retired = vec![];
            check_and_cleanup_gpu_resource(
                &mut submits,
                |command_lists| { retired.push(command_lists); Ok(()) },
                gpu_timeline_value
            )?;
            retired
        };
        drop(retired_submits);

        let mut zombies = self.main_queue_zombies.lock().unwrap();
        check_and_cleanup_gpu_resource(
            &mut zombies.command_lists,
            |zombie| {
                unsafe {
                    self.logical_device.reset_command_pool(zombie.command_pool, vk::CommandPoolResetFlags::empty())
                        .context("CommandPool should be reset.")?
                };
                self.command_buffer_pool_pool.lock()
                    .unwrap()
                    .put_back((zombie.command_pool, zombie.command_buffer));
                Ok(())
            },
            gpu_timeline_value
        )?;
        let buffers = check_and_cleanup_gpu_resource(
            &mut zombies.buffers,
            |id| self.cleanup_buffer(id),
            gpu_timeline_value
        )?;
        let images = check_and_cleanup_gpu_resource(
            &mut zombies.images,
            |id| self.cleanup_image(id),
            gpu_timeline_value
        )?;
        let samplers = check_and_cleanup_gpu_resource(
            &mut zombies.samplers,
            |id| { self.cleanup_sampler(id); Ok(()) },
            gpu_timeline_value
        )?;
        check_and_cleanup_gpu_resource(
            &mut zombies.semaphores,
            |zombie| {
                unsafe { self.logical_device.destroy_semaphore(zombie.semaphore, None) };
                Ok(())
            },
            gpu_timeline_value
        )?;

        if buffers + images + samplers > 0 {
            tracing::debug!(gpu_timeline_value, buffers, images, samplers, "Collected garbage");
        }

        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.logical_device.queue_wait_idle(self.main_queue)
                .context("Main queue should become idle.")?;
            self.logical_device.device_wait_idle()
                .context("Device should become idle.")
        }
    }


    fn new_buffer(&self, info: BufferInfo) -> Result<BufferId> {
        debug_assert!(info.size > 0, "Buffers cannot be created with a size of zero.");

        let usage_flags = vk::BufferUsageFlags::TRANSFER_SRC
            | vk::BufferUsageFlags::TRANSFER_DST
            | vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER
            | vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER
            | vk::BufferUsageFlags::UNIFORM_BUFFER
            | vk::BufferUsageFlags::STORAGE_BUFFER
            | vk::BufferUsageFlags::INDEX_BUFFER
            | vk::BufferUsageFlags::VERTEX_BUFFER
            | vk::BufferUsageFlags::INDIRECT_BUFFER;

        let buffer_ci = vk::BufferCreateInfo::builder()
            .size(info.size as vk::DeviceSize)
            .usage(usage_flags)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(slice::from_ref(&self.main_queue_family));

        let buffer = unsafe {
            self.logical_device.create_buffer(&buffer_ci, None)
                .context("Buffer should be created.")?
        };

        let requirements = unsafe { self.logical_device.get_buffer_memory_requirements(buffer) };
        let allocation = self.allocator
            .lock()
            .unwrap()
            .allocate(&AllocationCreateDesc {
                name: &info.debug_name,
                requirements,
                location: info.memory_location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged
            });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(error) => {
                unsafe { self.logical_device.destroy_buffer(buffer, None) };
                return Err(error).context("Buffer memory should be allocated.");
            }
        };

        unsafe {
            self.logical_device.bind_buffer_memory(
                buffer,
                allocation.memory(),
                allocation.offset()
            ).context("Buffer memory should be bound.")?
        };

        self.set_debug_name(buffer, format!("{} [Daxa Buffer]", info.debug_name))?;

        let (id, slot) = self.gpu_shader_resource_table.buffer_slots.new_slot();
        self.gpu_shader_resource_table.write_descriptor_set_buffer(&self.logical_device, buffer, 0, info.size as vk::DeviceSize, id.index());

        *slot = BufferSlot {
            info,
            buffer,
            allocation: Some(allocation),
            zombie: false
        };

        Ok(BufferId(id.0))
    }

    fn new_image(&self, info: ImageInfo) -> Result<ImageId> {
        debug_assert!(info.dimensions >= 1 && info.dimensions <= 3, "Image dimensions must be 1, 2, or 3.");
        debug_assert!(u32::count_ones(info.sample_count) == 1 && info.sample_count <= 64, "Image samples must be a power of two ranging from 1 to 64.");
        debug_assert!(
            info.size.width > 0 &&
            info.size.height > 0 &&
            info.size.depth > 0,
            "Image size must be greater than 0 in each dimension."
        );
        debug_assert!(info.array_layer_count > 0, "Image array layer count must be greater than 0.");
        debug_assert!(info.mip_level_count > 0, "Image mip level count must be greater than 0.");

        let image_type = vk::ImageType::from_raw((info.dimensions - 1) as i32);

        let mut image_create_flags = vk::ImageCreateFlags::empty();

        const CUBE_FACE_N: u32 = 6u32;
        if info.dimensions == 2 && info.size.width == info.size.height && info.array_layer_count % CUBE_FACE_N == 0 {
            image_create_flags |= vk::ImageCreateFlags::CUBE_COMPATIBLE;
        }
        if info.dimensions == 3 {
            image_create_flags |= vk::ImageCreateFlags::TYPE_2D_ARRAY_COMPATIBLE;
        }

        let image_ci = vk::ImageCreateInfo::builder()
            .flags(image_create_flags)
            .image_type(image_type)
            .format(info.format)
            .extent(info.size)
            .mip_levels(info.mip_level_count)
            .array_layers(info.array_layer_count)
            .samples(vk::SampleCountFlags::from_raw(info.sample_count))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(info.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(slice::from_ref(&self.main_queue_family))
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe {
            self.logical_device.create_image(&image_ci, None)
                .context("Image should be created.")?
        };

        let requirements = unsafe { self.logical_device.get_image_memory_requirements(image) };
        let allocation = self.allocator
            .lock()
            .unwrap()
            .allocate(&AllocationCreateDesc {
                name: &info.debug_name,
                requirements,
                location: info.memory_location,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged
            });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(error) => {
                unsafe { self.logical_device.destroy_image(image, None) };
                return Err(error).context("Image memory should be allocated.");
            }
        };

        unsafe {
            self.logical_device.bind_image_memory(
                image,
                allocation.memory(),
                allocation.offset()
            ).context("Image memory should be bound.")?
        };

        let image_view_type = if info.array_layer_count > 1 {
            debug_assert!((1..=2).contains(&info.dimensions), "Image dimensions must be 1 or 2 for image arrays.");
            vk::ImageViewType::from_raw((info.dimensions + 3) as i32)
        } else {
            vk::ImageViewType::from_raw((info.dimensions - 1) as i32)
        };

        let subresource_range = info.full_slice();

        let image_view_ci = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(image_view_type)
            .format(info.format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY
            })
            .subresource_range(subresource_range);

        let image_view = unsafe {
            self.logical_device.create_image_view(&image_view_ci, None)
                .context("ImageView should be created.")?
        };

        self.set_debug_name(image, format!("{} [Daxa Image]", info.debug_name))?;
        self.set_debug_name(image_view, format!("{} [Daxa ImageView]", info.debug_name))?;

        let (id, slot) = self.gpu_shader_resource_table.image_slots.new_slot();
        self.gpu_shader_resource_table.write_descriptor_set_image(&self.logical_device, image_view, info.usage, id.index());

        *slot = ImageSlot {
            view_slot: ImageViewSlot {
                info: ImageViewInfo {
                    image_view_type,
                    format: info.format,
                    image: ImageId(id.0),
                    subresource_range,
                    debug_name: info.debug_name.clone()
                },
                image_view,
                zombie: false
            },
            info,
            image,
            allocation: Some(allocation),
            zombie: false
        };

        Ok(ImageId(id.0))
    }

    fn new_sampler(&self, info: SamplerInfo) -> Result<SamplerId> {
        let sampler_ci = vk::SamplerCreateInfo::builder()
            .mag_filter(info.magnification_filter)
            .min_filter(info.minification_filter)
            .mipmap_mode(info.mipmap_filter)
            .address_mode_u(info.address_mode_u)
            .address_mode_v(info.address_mode_v)
            .address_mode_w(info.address_mode_w)
            .mip_lod_bias(info.mip_lod_bias)
            .anisotropy_enable(info.enable_anisotropy)
            .max_anisotropy(info.max_anisotropy)
            .min_lod(info.min_lod)
            .max_lod(info.max_lod)
            .border_color(vk::BorderColor::FLOAT_TRANSPARENT_BLACK);

        let sampler = unsafe {
            self.logical_device.create_sampler(&sampler_ci, None)
                .context("Sampler should be created.")?
        };

        self.set_debug_name(sampler, format!("{} [Daxa Sampler]", info.debug_name))?;

        let (id, slot) = self.gpu_shader_resource_table.sampler_slots.new_slot();
        self.gpu_shader_resource_table.write_descriptor_set_sampler(&self.logical_device, sampler, id.index());

        *slot = SamplerSlot {
            info,
            sampler,
            zombie: false
        };

        Ok(SamplerId(id.0))
    }


    pub(crate) fn buffer_slot(&self, id: BufferId) -> &BufferSlot {
        self.gpu_shader_resource_table.buffer_slots.dereference_id(&id)
    }

    pub(crate) fn image_slot(&self, id: ImageId) -> &ImageSlot {
        self.gpu_shader_resource_table.image_slots.dereference_id(&id)
    }

    pub(crate) fn sampler_slot(&self, id: SamplerId) -> &SamplerSlot {
        self.gpu_shader_resource_table.sampler_slots.dereference_id(&id)
    }


    fn zombify_buffer(&self, id: BufferId) {
        let slot = self.gpu_shader_resource_table.buffer_slots.dereference_id_mut(&id);
        debug_assert!(!slot.zombie, "Detected double delete for a resource id.");
        slot.zombie = true;

        let cpu_timeline = self.main_queue_cpu_timeline.load(Ordering::Acquire);
        self.main_queue_zombies.lock()
            .unwrap()
            .buffers
            .push_front((cpu_timeline, id));
    }

    fn zombify_image(&self, id: ImageId) {
        let slot = self.gpu_shader_resource_table.image_slots.dereference_id_mut(&id);
        debug_assert!(!slot.zombie, "Detected double delete for a resource id.");
        slot.zombie = true;
        slot.view_slot.zombie = true;

        let cpu_timeline = self.main_queue_cpu_timeline.load(Ordering::Acquire);
        self.main_queue_zombies.lock()
            .unwrap()
            .images
            .push_front((cpu_timeline, id));
    }

    fn zombify_sampler(&self, id: SamplerId) {
        let slot = self.gpu_shader_resource_table.sampler_slots.dereference_id_mut(&id);
        debug_assert!(!slot.zombie, "Detected double delete for a resource id.");
        slot.zombie = true;

        let cpu_timeline = self.main_queue_cpu_timeline.load(Ordering::Acquire);
        self.main_queue_zombies.lock()
            .unwrap()
            .samplers
            .push_front((cpu_timeline, id));
    }


    fn cleanup_buffer(&self, id: BufferId) -> Result<()> {
        let buffer_slot = std::mem::take(self.gpu_shader_resource_table.buffer_slots.dereference_id_mut(&id));

        self.gpu_shader_resource_table.write_descriptor_set_buffer(&self.logical_device, vk::Buffer::null(), 0, vk::WHOLE_SIZE, id.index());
        if let Some(allocation) = buffer_slot.allocation {
            self.allocator
                .lock()
                .unwrap()
                .free(allocation)
                .context("Buffer memory should be freed.")?;
        }
        unsafe { self.logical_device.destroy_buffer(buffer_slot.buffer, None) };

        self.gpu_shader_resource_table.buffer_slots.return_slot(&id);
        Ok(())
    }

    fn cleanup_image(&self, id: ImageId) -> Result<()> {
        let image_slot = std::mem::take(self.gpu_shader_resource_table.image_slots.dereference_id_mut(&id));

        self.gpu_shader_resource_table.write_descriptor_set_image(&self.logical_device, vk::ImageView::null(), image_slot.info.usage, id.index());
        unsafe { self.logical_device.destroy_image_view(image_slot.view_slot.image_view, None) };
        if let Some(allocation) = image_slot.allocation {
            self.allocator
                .lock()
                .unwrap()
                .free(allocation)
                .context("Image memory should be freed.")?;
        }
        unsafe { self.logical_device.destroy_image(image_slot.image, None) };

        self.gpu_shader_resource_table.image_slots.return_slot(&id);
        Ok(())
    }

    fn cleanup_sampler(&self, id: SamplerId) {
        let sampler_slot = std::mem::take(self.gpu_shader_resource_table.sampler_slots.dereference_id_mut(&id));

        self.gpu_shader_resource_table.write_descriptor_set_sampler(&self.logical_device, self.null_sampler, id.index());
        unsafe { self.logical_device.destroy_sampler(sampler_slot.sampler, None) };

        self.gpu_shader_resource_table.sampler_slots.return_slot(&id);
    }
}

impl Drop for DeviceInternal {
    fn drop(&mut self) {
        if let Err(error) = self.wait_idle().and_then(|_| self.main_queue_collect_garbage()) {
            tracing::error!("Device teardown could not drain the main queue: {:#}", error);
        }

        self.command_buffer_pool_pool
            .lock()
            .unwrap()
            .cleanup(&*self);

        if let Err(error) = self.gpu_shader_resource_table.cleanup(&self.logical_device) {
            tracing::error!("{:#}", error);
        }

        unsafe {
            ManuallyDrop::drop(&mut self.allocator);
            self.logical_device.destroy_sampler(self.null_sampler, None);
            self.logical_device.destroy_semaphore(self.main_queue_gpu_timeline_semaphore, None);
            self.logical_device.destroy_device(None);
        }
    }
}



#[cfg(test)]
mod tests {
    use super::{default_device_selector, DeviceProperties, DeviceType};

    #[test]
    fn selector_prefers_discrete_gpus() {
        let score = |device_type| default_device_selector(&DeviceProperties {
            device_type,
            ..Default::default()
        });

        assert!(score(DeviceType::DISCRETE_GPU) > score(DeviceType::VIRTUAL_GPU));
        assert!(score(DeviceType::VIRTUAL_GPU) > score(DeviceType::INTEGRATED_GPU));
        assert!(score(DeviceType::INTEGRATED_GPU) > score(DeviceType::CPU));
    }
}
