use daxa_sync::{
    command_list::{ImageBarrierInfo, MemoryBarrierInfo},
    core::ResourceId,
    gpu_resources::{BufferId, ImageId, ImageUsageFlags},
    util::task_list::*,
};

use anyhow::{bail, Result};



/// Everything a task list recorded, in order.
#[derive(Debug)]
pub enum Event {
    MemoryBarrier(MemoryBarrierInfo),
    ImageBarrier(ImageBarrierInfo),
    CreateBuffer(BufferId),
    CreateImage(ImageId, ImageUsageFlags),
    DestroyBuffer(BufferId),
    DestroyImage(ImageId),
    Task(&'static str),
    UsedBuffer(BufferId),
    UsedImage(ImageId),
}

#[derive(Default)]
pub struct MockRecorder {
    pub events: Vec<Event>,
    // Makes transient image creation fail, as an out of memory device would
    pub fail_image_creation: bool,
    pub next_index: u32,
}

impl MockRecorder {
    pub fn barrier_count(&self) -> usize {
        self.events.iter()
            .filter(|event| matches!(event, Event::MemoryBarrier(_) | Event::ImageBarrier(_)))
            .count()
    }
}

impl TaskCommandRecorder for MockRecorder {
    fn pipeline_barrier(&mut self, info: MemoryBarrierInfo) {
        self.events.push(Event::MemoryBarrier(info));
    }

    fn pipeline_barrier_image_transition(&mut self, info: ImageBarrierInfo) {
        self.events.push(Event::ImageBarrier(info));
    }

    fn create_transient_buffer(&mut self, _info: &TaskTransientBufferInfo) -> Result<BufferId> {
        self.next_index += 1;
        let id = fake_buffer(1000 + self.next_index);
        self.events.push(Event::CreateBuffer(id));
        Ok(id)
    }

    fn create_transient_image(&mut self, info: &TaskTransientImageInfo, usage: ImageUsageFlags) -> Result<ImageId> {
        if self.fail_image_creation {
            bail!("Transient image \"{}\" could not be created.", info.debug_name);
        }
        self.next_index += 1;
        let id = fake_image(1000 + self.next_index);
        self.events.push(Event::CreateImage(id, usage));
        Ok(id)
    }

    fn destroy_buffer_deferred(&mut self, id: BufferId) {
        self.events.push(Event::DestroyBuffer(id));
    }

    fn destroy_image_deferred(&mut self, id: ImageId) {
        self.events.push(Event::DestroyImage(id));
    }
}



pub fn fake_buffer(index: u32) -> BufferId {
    let mut id = BufferId::default();
    id.set_index(index);
    id.set_version(1);
    id
}

pub fn fake_image(index: u32) -> ImageId {
    let mut id = ImageId::default();
    id.set_index(index);
    id.set_version(1);
    id
}

pub fn persistent_buffer(task_list: &mut TaskList<MockRecorder>, index: u32, name: &'static str) -> TaskBufferId {
    task_list.create_task_buffer(TaskBufferInfo {
        fetch_callback: Box::new(move || fake_buffer(index)),
        debug_name: name.into(),
        ..Default::default()
    })
}

pub fn persistent_image(task_list: &mut TaskList<MockRecorder>, index: u32, name: &'static str) -> TaskImageId {
    task_list.create_task_image(TaskImageInfo {
        fetch_callback: Box::new(move || fake_image(index)),
        debug_name: name.into(),
        ..Default::default()
    })
}

/// A task that records its name when it runs.
pub fn task(
    name: &'static str,
    used_buffers: Vec<TaskBufferUse>,
    used_images: Vec<TaskImageUse>
) -> TaskInfo<MockRecorder> {
    TaskInfo {
        used_buffers,
        used_images,
        task: Box::new(move |interface: &mut TaskInterface<MockRecorder>| {
            interface.recorder().events.push(Event::Task(name));
        }),
        debug_name: name.into()
    }
}

/// Names of the tasks in the order they ran.
pub fn task_order(recorder: &MockRecorder) -> Vec<&'static str> {
    recorder.events.iter()
        .filter_map(|event| match event {
            Event::Task(name) => Some(*name),
            _ => None
        })
        .collect()
}
