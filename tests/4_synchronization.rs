use daxa_sync::{context::*, device::*, command_list::*};
use daxa_sync::core::DEFAULT_WAIT_TIMEOUT;
use daxa_sync::semaphore::{BinarySemaphoreInfo, TimelineSemaphoreInfo};

struct App {
    _daxa_context: Context,
    device: Device
}

impl App {
    fn new() -> App {
        let daxa_context = Context::new(ContextInfo::default()).unwrap();
        let device = daxa_context.create_device(DeviceInfo::default()).unwrap();

        App {
            _daxa_context: daxa_context,
            device
        }
    }

    fn empty_command_list(&self) -> CommandList {
        self.device.create_command_list(CommandListInfo::default())
            .unwrap()
            .complete()
            .unwrap()
    }
}

#[test]
#[ignore = "requires a Vulkan device"]
fn binary_semaphore() {
    let app = App::new();

    let binary_semaphore1 = app.device.create_binary_semaphore(BinarySemaphoreInfo::default()).unwrap();
    let binary_semaphore2 = app.device.create_binary_semaphore(BinarySemaphoreInfo::default()).unwrap();

    app.device.submit_commands(CommandSubmitInfo {
        command_lists: vec![app.empty_command_list()],
        signal_binary_semaphores: vec![binary_semaphore1.clone()],
        ..Default::default()
    }).unwrap();

    app.device.submit_commands(CommandSubmitInfo {
        command_lists: vec![app.empty_command_list()],
        wait_binary_semaphores: vec![binary_semaphore1.clone()],
        signal_binary_semaphores: vec![binary_semaphore2.clone()],
        ..Default::default()
    }).unwrap();

    // Binary semaphores can be reused ONLY after they have been signaled.
    app.device.submit_commands(CommandSubmitInfo {
        command_lists: vec![app.empty_command_list()],
        wait_binary_semaphores: vec![binary_semaphore2.clone()],
        signal_binary_semaphores: vec![binary_semaphore1.clone()],
        ..Default::default()
    }).unwrap();

    app.device.submit_commands(CommandSubmitInfo {
        command_lists: vec![app.empty_command_list()],
        wait_binary_semaphores: vec![binary_semaphore1.clone()],
        ..Default::default()
    }).unwrap();

    app.device.wait_idle().unwrap();
    app.device.collect_garbage().unwrap();
}

#[test]
#[ignore = "requires a Vulkan device"]
fn timeline_semaphore() {
    let app = App::new();

    let timeline = app.device.create_timeline_semaphore(TimelineSemaphoreInfo {
        initial_value: 1,
        debug_name: "timeline".into()
    }).unwrap();
    assert_eq!(timeline.value().unwrap(), 1);

    app.device.submit_commands(CommandSubmitInfo {
        command_lists: vec![app.empty_command_list()],
        wait_timeline_semaphores: vec![(timeline.clone(), 1)],
        signal_timeline_semaphores: vec![(timeline.clone(), 2)],
        ..Default::default()
    }).unwrap();

    assert!(timeline.wait_for_value(2, DEFAULT_WAIT_TIMEOUT).unwrap());

    timeline.set_value(5).unwrap();
    assert_eq!(timeline.value().unwrap(), 5);

    // Nothing signals 6, so the wait times out
    assert!(!timeline.wait_for_value(6, 1_000).unwrap());

    app.device.wait_idle().unwrap();
    app.device.collect_garbage().unwrap();
}

#[test]
#[ignore = "requires a Vulkan device"]
fn main_queue_timeline_advances() {
    let app = App::new();

    let before = app.device.main_queue_cpu_timeline();

    app.device.submit_commands(CommandSubmitInfo {
        command_lists: vec![app.empty_command_list()],
        ..Default::default()
    }).unwrap();

    assert_eq!(app.device.main_queue_cpu_timeline(), before + 1);

    app.device.wait_idle().unwrap();
    assert!(app.device.main_queue_gpu_timeline().unwrap() >= before + 1);

    app.device.collect_garbage().unwrap();
}
