use daxa_sync::context::{Context, ContextInfo};
use daxa_sync::device::{DeviceInfo, DeviceType};
use daxa_sync::gpu_resources::*;
use ash::vk;
use std::ffi::CStr;

fn context() -> Context {
    Context::new(ContextInfo::default()).unwrap()
}

#[test]
#[ignore = "requires a Vulkan device"]
fn simplest() {
    let daxa_context = context();

    let device = daxa_context.create_device(DeviceInfo::default());

    assert!(device.is_ok())
}

#[test]
#[ignore = "requires a Vulkan device"]
fn device_selection() {
    let daxa_context = context();

    // Devices are scored from their properties, the highest score wins.
    let device = daxa_context.create_device(DeviceInfo {
        selector: |&properties| {
            match properties.device_type {
                DeviceType::INTEGRATED_GPU => 10,
                DeviceType::CPU => 0,
                _ => 1
            }
        },
        debug_name: "My device".into(),
        ..Default::default()
    });

    assert!(device.is_ok());

    unsafe { println!("{:?}", CStr::from_ptr(device.unwrap().properties().device_name.as_ptr())) }
}

#[test]
#[ignore = "requires a Vulkan device"]
fn rejecting_every_device_fails() {
    let daxa_context = context();

    let device = daxa_context.create_device(DeviceInfo {
        selector: |_| -1,
        ..Default::default()
    });

    assert!(device.is_err());
}

#[test]
#[ignore = "requires a Vulkan device"]
fn resource_ids_are_versioned() {
    let daxa_context = context();
    let device = daxa_context.create_device(DeviceInfo::default()).unwrap();

    let buffer = device.create_buffer(BufferInfo {
        size: 64,
        debug_name: "versioned buffer".into(),
        ..Default::default()
    }).unwrap();
    assert!(device.is_buffer_id_valid(buffer));
    assert_eq!(device.info_buffer(buffer).size, 64);

    device.destroy_buffer(buffer);
    assert!(!device.is_buffer_id_valid(buffer));

    device.wait_idle().unwrap();
    device.collect_garbage().unwrap();

    // The recycled slot hands out a new version, the stale id stays invalid
    let recycled = device.create_buffer(BufferInfo {
        size: 32,
        ..Default::default()
    }).unwrap();
    assert!(device.is_buffer_id_valid(recycled));
    assert!(!device.is_buffer_id_valid(buffer));
    assert_ne!(recycled, buffer);

    device.destroy_buffer(recycled);
}

#[test]
#[ignore = "requires a Vulkan device"]
fn images_share_their_default_view() {
    let daxa_context = context();
    let device = daxa_context.create_device(DeviceInfo::default()).unwrap();

    let image = device.create_image(ImageInfo {
        size: vk::Extent3D { width: 16, height: 16, depth: 1 },
        usage: vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::STORAGE,
        debug_name: "view image".into(),
        ..Default::default()
    }).unwrap();

    let view_info = device.info_image_view(image.default_view());
    assert_eq!(view_info.image, image);
    assert_eq!(view_info.subresource_range, device.info_image(image).full_slice());

    let sampler = device.create_sampler(SamplerInfo::default()).unwrap();
    assert!(device.is_sampler_id_valid(sampler));

    device.destroy_image(image);
    device.destroy_sampler(sampler);
    device.wait_idle().unwrap();
    device.collect_garbage().unwrap();
}
