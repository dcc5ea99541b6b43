use crate::core::*;
use super::{
    resource_pool::*,
    BUFFER_BINDING,
    STORAGE_IMAGE_BINDING,
    SAMPLED_IMAGE_BINDING,
    SAMPLER_BINDING,
};

use anyhow::{Context, Result};
use ash::vk;
use std::slice;



/// The global bindless descriptor set and the slot pools backing its bindings.
pub(crate) struct GPUShaderResourceTable {
    pub buffer_slots: GPUShaderResourcePool<BufferSlot>,
    pub image_slots: GPUShaderResourcePool<ImageSlot>,
    pub sampler_slots: GPUShaderResourcePool<SamplerSlot>,

    descriptor_set_layout: vk::DescriptorSetLayout,
    descriptor_set: vk::DescriptorSet,
    descriptor_pool: vk::DescriptorPool,

    // Contains pipeline layouts with varying push constant range size.
    // Layout i has a push constant range of i words.
    pipeline_layouts: Vec<vk::PipelineLayout>,
}

impl GPUShaderResourceTable {
    pub fn new(
        max_buffers: usize,
        max_images: usize,
        max_samplers: usize,
        device: &ash::Device,
    ) -> Result<Self> {
        let buffer_slots = GPUShaderResourcePool::new(max_buffers);
        let image_slots = GPUShaderResourcePool::new(max_images);
        let sampler_slots = GPUShaderResourcePool::new(max_samplers);

        let pool_sizes = [
            vk::DescriptorPoolSize::builder()
                .ty(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(buffer_slots.max_resources as u32)
                .build(),
            vk::DescriptorPoolSize::builder()
                .ty(vk::DescriptorType::STORAGE_IMAGE)
                .descriptor_count(image_slots.max_resources as u32)
                .build(),
            vk::DescriptorPoolSize::builder()
                .ty(vk::DescriptorType::SAMPLED_IMAGE)
                .descriptor_count(image_slots.max_resources as u32)
                .build(),
            vk::DescriptorPoolSize::builder()
                .ty(vk::DescriptorType::SAMPLER)
                .descriptor_count(sampler_slots.max_resources as u32)
                .build(),
        ];

        let descriptor_pool_ci = vk::DescriptorPoolCreateInfo::builder()
            .flags(
                vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET |
                vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND
            )
            .max_sets(1)
            .pool_sizes(&pool_sizes);

        let descriptor_pool = unsafe {
            device.create_descriptor_pool(&descriptor_pool_ci, None)
                .context("DescriptorPool should be created.")?
        };

        let binding = |binding: u32, descriptor_type: vk::DescriptorType, count: usize| {
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(count as u32)
                .stage_flags(vk::ShaderStageFlags::ALL)
                .build()
        };

        let descriptor_set_layout_bindings = [
            binding(BUFFER_BINDING, vk::DescriptorType::STORAGE_BUFFER, buffer_slots.max_resources),
            binding(STORAGE_IMAGE_BINDING, vk::DescriptorType::STORAGE_IMAGE, image_slots.max_resources),
            binding(SAMPLED_IMAGE_BINDING, vk::DescriptorType::SAMPLED_IMAGE, image_slots.max_resources),
            binding(SAMPLER_BINDING, vk::DescriptorType::SAMPLER, sampler_slots.max_resources),
        ];

        // Lets the set be written while commands referencing other slots are in flight.
        let bindless_flags = vk::DescriptorBindingFlags::UPDATE_UNUSED_WHILE_PENDING
            | vk::DescriptorBindingFlags::PARTIALLY_BOUND
            | vk::DescriptorBindingFlags::UPDATE_AFTER_BIND;
        let descriptor_binding_flags = [bindless_flags; 4];

        let mut descriptor_set_layout_binding_flags_ci = vk::DescriptorSetLayoutBindingFlagsCreateInfo::builder()
            .binding_flags(&descriptor_binding_flags);

        let descriptor_set_layout_ci = vk::DescriptorSetLayoutCreateInfo::builder()
            .push_next(&mut descriptor_set_layout_binding_flags_ci)
            .flags(vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL)
            .bindings(&descriptor_set_layout_bindings);

        let descriptor_set_layout = unsafe {
            device.create_descriptor_set_layout(&descriptor_set_layout_ci, None)
                .context("DescriptorSetLayout should be created.")?
        };

        let descriptor_set_allocate_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(descriptor_pool)
            .set_layouts(slice::from_ref(&descriptor_set_layout));

        let descriptor_set = unsafe {
            device.allocate_descriptor_sets(&descriptor_set_allocate_info)
                .context("DescriptorSet should be allocated.")?[0]
        };

        let mut pipeline_layouts = Vec::with_capacity(PIPELINE_LAYOUT_COUNT as usize);
        for words in 0..PIPELINE_LAYOUT_COUNT {
            let push_constant_range = vk::PushConstantRange::builder()
                .stage_flags(vk::ShaderStageFlags::ALL)
                .size(words * 4)
                .build();
            let push_constant_ranges = match words {
                0 => &[][..],
                _ => slice::from_ref(&push_constant_range)
            };

            let pipeline_layout_ci = vk::PipelineLayoutCreateInfo::builder()
                .set_layouts(slice::from_ref(&descriptor_set_layout))
                .push_constant_ranges(push_constant_ranges);

            pipeline_layouts.push(unsafe {
                device.create_pipeline_layout(&pipeline_layout_ci, None)
                    .context("PipelineLayout should be created.")?
            });
        }

        Ok(Self {
            buffer_slots,
            image_slots,
            sampler_slots,
            descriptor_set_layout,
            descriptor_set,
            descriptor_pool,
            pipeline_layouts
        })
    }

    pub fn cleanup(&self, device: &ash::Device) -> Result<()> {
        #[cfg(debug_assertions)]
        {
            fn print_remaining(prefix: &str, survivors: Vec<String>) -> String {
                let mut ret = format!("{}\nThis can happen due to not waiting for the gpu to finish executing, as destruction is deferred. List of survivors:\n", prefix);
                for survivor in survivors {
                    ret += survivor.as_str();
                    ret += "\n";
                }
                ret
            }

            fn describe(debug_name: &str, zombie: bool) -> String {
                match zombie {
                    true => format!("debug name: \"{}\" (destroy was already called)", debug_name),
                    false => format!("debug name: \"{}\"", debug_name)
                }
            }

            debug_assert!(
                self.buffer_slots.live_slot_count() == 0,
                "{}",
                print_remaining(
                    "Not all buffers have been destroyed before destroying the device.",
                    self.buffer_slots.survivors(|slot| (slot.buffer != vk::Buffer::null()).then(|| describe(&slot.info.debug_name, slot.zombie)))
                )
            );
            debug_assert!(
                self.image_slots.live_slot_count() == 0,
                "{}",
                print_remaining(
                    "Not all images have been destroyed before destroying the device.",
                    self.image_slots.survivors(|slot| (slot.image != vk::Image::null()).then(|| describe(&slot.info.debug_name, slot.zombie)))
                )
            );
            debug_assert!(
                self.sampler_slots.live_slot_count() == 0,
                "{}",
                print_remaining(
                    "Not all samplers have been destroyed before destroying the device.",
                    self.sampler_slots.survivors(|slot| (slot.sampler != vk::Sampler::null()).then(|| describe(&slot.info.debug_name, slot.zombie)))
                )
            );
        }

        unsafe {
            for layout in &self.pipeline_layouts {
                device.destroy_pipeline_layout(*layout, None);
            }
            device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
            device.reset_descriptor_pool(self.descriptor_pool, vk::DescriptorPoolResetFlags::empty())
                .context("DescriptorPool should be reset.")?;
            device.destroy_descriptor_pool(self.descriptor_pool, None);
        }

        Ok(())
    }

    #[inline]
    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.descriptor_set
    }

    /// Returns the layout whose push constant range fits `push_constant_size` bytes, rounded up to whole words.
    pub fn pipeline_layout(&self, push_constant_size: u32) -> vk::PipelineLayout {
        debug_assert!(push_constant_size <= MAX_PUSH_CONSTANT_BYTE_SIZE, "{}", MAX_PUSH_CONSTANT_SIZE_ERROR);

        let words = push_constant_size.div_ceil(4).min(MAX_PUSH_CONSTANT_WORD_SIZE);
        self.pipeline_layouts[words as usize]
    }

    pub fn write_descriptor_set_buffer(&self, device: &ash::Device, buffer: vk::Buffer, offset: vk::DeviceSize, range: vk::DeviceSize, index: u32) {
        let descriptor_buffer_info = vk::DescriptorBufferInfo::builder()
            .buffer(buffer)
            .offset(offset)
            .range(range)
            .build();

        let write_descriptor_set = vk::WriteDescriptorSet::builder()
            .dst_set(self.descriptor_set)
            .dst_binding(BUFFER_BINDING)
            .dst_array_element(index)
            .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
            .buffer_info(slice::from_ref(&descriptor_buffer_info))
            .build();

        unsafe {
            device.update_descriptor_sets(slice::from_ref(&write_descriptor_set), &[]);
        }
    }

    pub fn write_descriptor_set_image(&self, device: &ash::Device, image_view: vk::ImageView, usage: vk::ImageUsageFlags, index: u32) {
        let storage_image_info = vk::DescriptorImageInfo::builder()
            .image_view(image_view)
            .image_layout(vk::ImageLayout::GENERAL)
            .build();
        let sampled_image_info = vk::DescriptorImageInfo::builder()
            .image_view(image_view)
            .image_layout(vk::ImageLayout::READ_ONLY_OPTIMAL)
            .build();

        let mut descriptor_set_writes = Vec::with_capacity(2);

        if usage.contains(vk::ImageUsageFlags::STORAGE) {
            descriptor_set_writes.push(vk::WriteDescriptorSet::builder()
                .dst_set(self.descriptor_set)
                .dst_binding(STORAGE_IMAGE_BINDING)
                .dst_array_element(index)
                .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                .image_info(slice::from_ref(&storage_image_info))
                .build());
        }

        if usage.contains(vk::ImageUsageFlags::SAMPLED) {
            descriptor_set_writes.push(vk::WriteDescriptorSet::builder()
                .dst_set(self.descriptor_set)
                .dst_binding(SAMPLED_IMAGE_BINDING)
                .dst_array_element(index)
                .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                .image_info(slice::from_ref(&sampled_image_info))
                .build());
        }

        if descriptor_set_writes.is_empty() {
            return;
        }

        unsafe {
            device.update_descriptor_sets(&descriptor_set_writes, &[]);
        }
    }

    pub fn write_descriptor_set_sampler(&self, device: &ash::Device, sampler: vk::Sampler, index: u32) {
        let descriptor_image_info = vk::DescriptorImageInfo::builder()
            .sampler(sampler)
            .build();

        let write_descriptor_set = vk::WriteDescriptorSet::builder()
            .dst_set(self.descriptor_set)
            .dst_binding(SAMPLER_BINDING)
            .dst_array_element(index)
            .descriptor_type(vk::DescriptorType::SAMPLER)
            .image_info(slice::from_ref(&descriptor_image_info))
            .build();

        unsafe {
            device.update_descriptor_sets(slice::from_ref(&write_descriptor_set), &[]);
        }
    }
}
