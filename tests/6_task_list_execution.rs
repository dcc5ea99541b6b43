use daxa_sync::{
    command_list::*,
    context::*,
    device::*,
    gpu_resources::*,
    util::task_list::*,
};
use ash::vk;


const APPNAME: &str = "Daxa Sync Test: TaskList";
const APPNAME_PREFIX: &str = "[Daxa Sync Test: TaskList]";


struct AppContext {
    _context: Context,
    device: Device
}

impl AppContext {
    fn new() -> Self {
        let context = Context::new(ContextInfo {
            application_name: APPNAME.into(),
            application_version: 1,
            ..Default::default()
        }).unwrap();

        let device = context.create_device(DeviceInfo {
            debug_name: format!("{} device", APPNAME_PREFIX).into(),
            ..Default::default()
        }).unwrap();

        Self {
            _context: context,
            device
        }
    }
}



#[test]
#[ignore = "requires a Vulkan device"]
fn write_read_image() {
    let app = AppContext::new();

    let image = app.device.create_image(ImageInfo {
        format: vk::Format::R8G8B8A8_UNORM,
        size: vk::Extent3D { width: 16, height: 16, depth: 1 },
        usage: vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::TRANSFER_SRC,
        debug_name: format!("{} image", APPNAME_PREFIX).into(),
        ..Default::default()
    }).unwrap();
    let readback = app.device.create_buffer(BufferInfo {
        size: 16 * 16 * 4,
        memory_location: gpu_allocator::MemoryLocation::GpuToCpu,
        debug_name: format!("{} readback", APPNAME_PREFIX).into()
    }).unwrap();

    // The task list must drop before the device waits and collects garbage.
    {
        let mut task_list: TaskList = TaskList::new(TaskListInfo {
            debug_name: format!("{} write-read image", APPNAME_PREFIX).into(),
            record_debug_information: true
        });

        let task_image = task_list.create_task_image(TaskImageInfo {
            fetch_callback: Box::new(move || image),
            debug_name: "task image".into(),
            ..Default::default()
        });
        let task_staging = task_list.create_transient_buffer(TaskTransientBufferInfo {
            size: 16 * 16 * 4,
            debug_name: "staging".into()
        });
        let task_readback = task_list.create_task_buffer(TaskBufferInfo {
            fetch_callback: Box::new(move || readback),
            debug_name: "readback".into(),
            ..Default::default()
        });

        task_list.add_task(TaskInfo {
            used_buffers: vec![TaskBufferUse::new(task_staging, TaskBufferAccess::TransferWrite)],
            task: Box::new(move |interface: &mut TaskInterface| {
                let buffer = interface.get_buffer(task_staging);
                interface.recorder().clear_buffer(BufferClearInfo {
                    buffer,
                    clear_value: u32::MAX,
                    ..Default::default()
                });
            }),
            debug_name: "clear staging".into(),
            ..Default::default()
        });
        task_list.add_task(TaskInfo {
            used_buffers: vec![TaskBufferUse::new(task_staging, TaskBufferAccess::TransferRead)],
            used_images: vec![TaskImageUse::new(task_image, TaskImageAccess::TransferWrite)],
            task: Box::new(move |interface: &mut TaskInterface| {
                let buffer = interface.get_buffer(task_staging);
                let image = interface.get_image(task_image);
                interface.recorder().copy_buffer_to_image(BufferImageCopyInfo {
                    buffer,
                    image,
                    image_extent: vk::Extent3D { width: 16, height: 16, depth: 1 },
                    ..Default::default()
                });
            }),
            debug_name: "upload".into()
        });
        task_list.add_task(TaskInfo {
            used_buffers: vec![TaskBufferUse::new(task_readback, TaskBufferAccess::TransferWrite)],
            used_images: vec![TaskImageUse::new(task_image, TaskImageAccess::TransferRead)],
            task: Box::new(move |interface: &mut TaskInterface| {
                let buffer = interface.get_buffer(task_readback);
                let image = interface.get_image(task_image);
                interface.recorder().copy_image_to_buffer(ImageBufferCopyInfo {
                    image,
                    image_extent: vk::Extent3D { width: 16, height: 16, depth: 1 },
                    buffer,
                    ..Default::default()
                });
            }),
            debug_name: "readback".into()
        });
        task_list.compile();

        // Two recordings exercise the synchronization between executions
        for _ in 0..2 {
            let mut command_list = app.device.create_command_list(CommandListInfo {
                debug_name: format!("{} command list", APPNAME_PREFIX).into()
            }).unwrap();
            task_list.execute(&mut command_list).unwrap();

            app.device.submit_commands(CommandSubmitInfo {
                command_lists: vec![command_list.complete().unwrap()],
                ..Default::default()
            }).unwrap();
        }

        println!("{}", task_list.get_debug_string());
    }

    app.device.destroy_image(image);
    app.device.destroy_buffer(readback);
    app.device.wait_idle().unwrap();
    app.device.collect_garbage().unwrap();
}
