mod types;

pub use types::*;

use crate::{
    command_list::{
        CommandList,
        ImageBarrierInfo,
        MemoryBarrierInfo
    },
    core::ResourceId,
    device::Device,
    gpu_resources::{
        BufferId,
        BufferInfo,
        ImageId,
        ImageInfo,
        ImageViewId
    },
    types::Access,
};

use anyhow::{bail, Result};
use ash::vk::{
    ImageLayout,
    ImageSubresourceRange,
    ImageUsageFlags
};
use gpu_allocator::MemoryLocation;
use std::{
    borrow::Cow,
    sync::atomic::{AtomicU32, Ordering},
};



static TASK_LIST_INDEX: AtomicU32 = AtomicU32::new(0);

/// The command recording operations a task list needs while executing.
pub trait TaskCommandRecorder {
    fn pipeline_barrier(&mut self, info: MemoryBarrierInfo);
    fn pipeline_barrier_image_transition(&mut self, info: ImageBarrierInfo);
    fn create_transient_buffer(&mut self, info: &TaskTransientBufferInfo) -> Result<BufferId>;
    fn create_transient_image(&mut self, info: &TaskTransientImageInfo, usage: ImageUsageFlags) -> Result<ImageId>;
    fn destroy_buffer_deferred(&mut self, id: BufferId);
    fn destroy_image_deferred(&mut self, id: ImageId);
}

impl TaskCommandRecorder for CommandList {
    fn pipeline_barrier(&mut self, info: MemoryBarrierInfo) {
        CommandList::pipeline_barrier(self, info);
    }

    fn pipeline_barrier_image_transition(&mut self, info: ImageBarrierInfo) {
        CommandList::pipeline_barrier_image_transition(self, info);
    }

    fn create_transient_buffer(&mut self, info: &TaskTransientBufferInfo) -> Result<BufferId> {
        let device: &Device = self.device();
        device.create_buffer(BufferInfo {
            size: info.size,
            memory_location: MemoryLocation::GpuOnly,
            debug_name: info.debug_name.clone()
        })
    }

    fn create_transient_image(&mut self, info: &TaskTransientImageInfo, usage: ImageUsageFlags) -> Result<ImageId> {
        let device: &Device = self.device();
        device.create_image(ImageInfo {
            dimensions: info.dimensions,
            format: info.format,
            aspect: info.aspect,
            size: info.size,
            mip_level_count: info.mip_level_count,
            array_layer_count: info.array_layer_count,
            sample_count: info.sample_count,
            usage,
            memory_location: MemoryLocation::GpuOnly,
            debug_name: info.debug_name.clone()
        })
    }

    fn destroy_buffer_deferred(&mut self, id: BufferId) {
        CommandList::destroy_buffer_deferred(self, id);
    }

    fn destroy_image_deferred(&mut self, id: ImageId) {
        CommandList::destroy_image_deferred(self, id);
    }
}



/// Handed to every task callback during `execute`.
pub struct TaskInterface<'a, R: TaskCommandRecorder = CommandList> {
    recorder: &'a mut R,
    task_list_index: u32,
    buffers: &'a [TaskBufferSlot],
    images: &'a [TaskImageSlot],
    used_buffers: &'a [TaskBufferUse],
    used_images: &'a [TaskImageUse],
}

impl<'a, R: TaskCommandRecorder> TaskInterface<'a, R> {
    pub fn get_buffer(&self, id: TaskBufferId) -> BufferId {
        debug_assert!(id.task_list_index == self.task_list_index, "Task buffer belongs to a different task list.");
        debug_assert!(
            self.used_buffers.iter().any(|used| used.id == id),
            "Tasks can only access task buffers they declared."
        );

        self.buffers[id.index as usize - 1].runtime_id
    }

    pub fn get_image(&self, id: TaskImageId) -> ImageId {
        debug_assert!(id.task_list_index == self.task_list_index, "Task image belongs to a different task list.");
        debug_assert!(
            self.used_images.iter().any(|used| used.id == id),
            "Tasks can only access task images they declared."
        );

        self.images[id.index as usize - 1].runtime_id
    }

    /// The default view of the image, covering its whole slice.
    pub fn get_image_view(&self, id: TaskImageId) -> ImageViewId {
        self.get_image(id).default_view()
    }

    pub fn recorder(&mut self) -> &mut R {
        self.recorder
    }
}

pub type TaskCallback<R = CommandList> = Box<dyn FnMut(&mut TaskInterface<R>)>;

pub struct TaskInfo<R: TaskCommandRecorder = CommandList> {
    pub used_buffers: Vec<TaskBufferUse>,
    pub used_images: Vec<TaskImageUse>,
    pub task: TaskCallback<R>,
    pub debug_name: Cow<'static, str>,
}

fn empty_task<R: TaskCommandRecorder>(_: &mut TaskInterface<R>) {}

impl<R: TaskCommandRecorder + 'static> Default for TaskInfo<R> {
    fn default() -> Self {
        Self {
            used_buffers: vec![],
            used_images: vec![],
            task: Box::new(empty_task::<R>),
            debug_name: "".into()
        }
    }
}

pub struct TaskListInfo {
    pub debug_name: Cow<'static, str>,
    /// Appends a log of every execution to the debug string.
    pub record_debug_information: bool,
}

impl Default for TaskListInfo {
    fn default() -> Self {
        Self {
            debug_name: "".into(),
            record_debug_information: false
        }
    }
}



/// Synchronization state of one resource while walking the task list.
#[derive(Clone, Copy, Debug)]
struct TrackedState {
    last_access: Access,
    last_layout: ImageLayout,
    // None means the access happened before the first task
    last_access_task_index: Option<usize>,
    // Barrier that started the current read phase, widened by every merged read
    latest_read_barrier: Option<usize>,
    // Every access of the first read phase, what the previous execution has to be synchronized with
    entry_access: Option<Access>,
    entry_phase_open: bool,
}

impl TrackedState {
    fn new(initial_access: Access, initial_layout: ImageLayout) -> Self {
        Self {
            last_access: initial_access,
            last_layout: initial_layout,
            last_access_task_index: None,
            latest_read_barrier: None,
            entry_access: None,
            entry_phase_open: false
        }
    }
}

#[derive(Default)]
struct BarrierSchedule {
    barriers: Vec<TaskPipelineBarrier>,
    task_barriers: Vec<Vec<usize>>,
    last_task_index_with_barrier: Option<usize>,
}

impl BarrierSchedule {
    fn new(task_count: usize) -> Self {
        Self {
            barriers: vec![],
            task_barriers: vec![vec![]; task_count],
            last_task_index_with_barrier: None
        }
    }

    /// Records `new_access` of the resource at `task_index`, scheduling a barrier if it conflicts with the prior access.
    /// Buffers pass `image` as None and never compare layouts.
    fn track(
        &mut self,
        state: &mut TrackedState,
        task_index: usize,
        new_access: Access,
        new_layout: ImageLayout,
        image: Option<(TaskImageId, ImageSubresourceRange)>
    ) {
        let is_first_access = state.entry_access.is_none();
        if is_first_access {
            state.entry_access = Some(new_access);
            state.entry_phase_open = true;
        }

        let prior = state.last_access;
        let need_memory_barrier = prior.has_write();
        let need_execution_barrier = need_memory_barrier || (prior.has_read() && new_access.has_write());
        let need_layout_transition = image.is_some() && new_layout != state.last_layout;

        if need_memory_barrier || need_execution_barrier || need_layout_transition {
            if !is_first_access {
                state.entry_phase_open = false;
            }

            // A pending barrier can be widened if it runs after the prior access.
            let barrier_task_index = match (self.last_task_index_with_barrier, state.last_access_task_index) {
                (Some(last_barrier_task), Some(prior_task)) if prior_task < last_barrier_task => last_barrier_task,
                (Some(last_barrier_task), None) => last_barrier_task,
                _ => task_index
            };

            let (image_id, image_slice, before_layout, after_layout) = match image {
                Some((id, slice)) => (Some(id), slice, state.last_layout, new_layout),
                None => (None, ImageSubresourceRange::default(), ImageLayout::UNDEFINED, ImageLayout::UNDEFINED)
            };

            let barrier_index = self.barriers.len();
            self.barriers.push(TaskPipelineBarrier {
                awaited_access: prior,
                waiting_access: new_access,
                before_layout,
                after_layout,
                image_id,
                image_slice
            });
            self.task_barriers[barrier_task_index].push(barrier_index);
            self.last_task_index_with_barrier = Some(
                self.last_task_index_with_barrier.map_or(barrier_task_index, |last| last.max(barrier_task_index))
            );

            state.last_access = new_access;
            state.last_layout = new_layout;
            state.latest_read_barrier = new_access.is_read_only().then_some(barrier_index);
        } else {
            // Concurrent reads, merge them and let the barrier guarding this read phase wait for all of them
            state.last_access |= new_access;
            if let (true, Some(entry_access)) = (state.entry_phase_open, &mut state.entry_access) {
                *entry_access |= new_access;
            }
            if let Some(barrier_index) = state.latest_read_barrier {
                self.barriers[barrier_index].waiting_access |= new_access;
            }
        }

        state.last_access_task_index = Some(task_index);
    }
}



enum TaskBufferKind {
    Persistent {
        fetch_callback: Box<dyn Fn() -> BufferId>
    },
    Transient {
        info: TaskTransientBufferInfo
    }
}

struct TaskBufferSlot {
    kind: TaskBufferKind,
    debug_name: Cow<'static, str>,
    initial_access: Access,
    state: TrackedState,
    // Access left behind by the previous execution
    execution_access: Access,
    runtime_id: BufferId,
}

enum TaskImageKind {
    Persistent {
        fetch_callback: Box<dyn Fn() -> ImageId>
    },
    Transient {
        info: TaskTransientImageInfo,
        usage: ImageUsageFlags
    }
}

struct TaskImageSlot {
    kind: TaskImageKind,
    debug_name: Cow<'static, str>,
    initial_access: Access,
    initial_layout: ImageLayout,
    slice: ImageSubresourceRange,
    state: TrackedState,
    execution_state: (Access, ImageLayout),
    runtime_id: ImageId,
}

struct Task<R: TaskCommandRecorder> {
    used_buffers: Vec<TaskBufferUse>,
    used_images: Vec<TaskImageUse>,
    callback: TaskCallback<R>,
    debug_name: Cow<'static, str>,
}



/// A linear list of tasks with declared resource accesses.
///
/// `compile` walks the tasks once and decides which barriers and layout transitions go before
/// which task. `execute` then records those barriers and the task callbacks into a recorder,
/// by default a [`CommandList`].
pub struct TaskList<R: TaskCommandRecorder = CommandList> {
    unique_index: u32,
    info: TaskListInfo,
    tasks: Vec<Task<R>>,
    buffers: Vec<TaskBufferSlot>,
    images: Vec<TaskImageSlot>,
    schedule: BarrierSchedule,
    compiled: bool,
    execution_count: usize,
    debug_string_stream: String,
}

// TaskList creation methods
impl<R: TaskCommandRecorder> TaskList<R> {
    pub fn new(info: TaskListInfo) -> Self {
        Self {
            unique_index: TASK_LIST_INDEX.fetch_add(1, Ordering::Relaxed),
            info,
            tasks: vec![],
            buffers: vec![],
            images: vec![],
            schedule: BarrierSchedule::default(),
            compiled: false,
            execution_count: 0,
            debug_string_stream: String::new()
        }
    }

    pub fn create_task_buffer(&mut self, info: TaskBufferInfo) -> TaskBufferId {
        self.add_buffer_slot(TaskBufferSlot {
            kind: TaskBufferKind::Persistent { fetch_callback: info.fetch_callback },
            debug_name: info.debug_name,
            initial_access: info.initial_access,
            state: TrackedState::new(info.initial_access, ImageLayout::UNDEFINED),
            execution_access: info.initial_access,
            runtime_id: BufferId::default()
        })
    }

    pub fn create_task_image(&mut self, info: TaskImageInfo) -> TaskImageId {
        self.add_image_slot(TaskImageSlot {
            kind: TaskImageKind::Persistent { fetch_callback: info.fetch_callback },
            debug_name: info.debug_name,
            initial_access: info.initial_access,
            initial_layout: info.initial_layout,
            slice: info.slice,
            state: TrackedState::new(info.initial_access, info.initial_layout),
            execution_state: (info.initial_access, info.initial_layout),
            runtime_id: ImageId::default()
        })
    }

    /// The buffer is created at the start of every execution and destroyed at its end.
    pub fn create_transient_buffer(&mut self, info: TaskTransientBufferInfo) -> TaskBufferId {
        debug_assert!(info.size > 0, "Transient buffers cannot have a size of zero.");

        self.add_buffer_slot(TaskBufferSlot {
            debug_name: info.debug_name.clone(),
            kind: TaskBufferKind::Transient { info },
            initial_access: Access::default(),
            state: TrackedState::new(Access::default(), ImageLayout::UNDEFINED),
            execution_access: Access::default(),
            runtime_id: BufferId::default()
        })
    }

    /// The image is created at the start of every execution with the usage its accesses need.
    pub fn create_transient_image(&mut self, info: TaskTransientImageInfo) -> TaskImageId {
        self.add_image_slot(TaskImageSlot {
            debug_name: info.debug_name.clone(),
            slice: info.full_slice(),
            kind: TaskImageKind::Transient { info, usage: ImageUsageFlags::empty() },
            initial_access: Access::default(),
            initial_layout: ImageLayout::UNDEFINED,
            state: TrackedState::new(Access::default(), ImageLayout::UNDEFINED),
            execution_state: (Access::default(), ImageLayout::UNDEFINED),
            runtime_id: ImageId::default()
        })
    }

    fn add_buffer_slot(&mut self, slot: TaskBufferSlot) -> TaskBufferId {
        debug_assert!(!self.compiled, "Resources cannot be added to a compiled task list.");

        self.buffers.push(slot);
        TaskBufferId {
            task_list_index: self.unique_index,
            index: self.buffers.len() as u32
        }
    }

    fn add_image_slot(&mut self, slot: TaskImageSlot) -> TaskImageId {
        debug_assert!(!self.compiled, "Resources cannot be added to a compiled task list.");

        self.images.push(slot);
        TaskImageId {
            task_list_index: self.unique_index,
            index: self.images.len() as u32
        }
    }
}

// TaskList usage methods
impl<R: TaskCommandRecorder> TaskList<R> {
    pub fn add_task(&mut self, info: TaskInfo<R>) {
        debug_assert!(!self.compiled, "Tasks cannot be added to a compiled task list.");

        for (i, used) in info.used_buffers.iter().enumerate() {
            self.validate_buffer_id(used.id);
            debug_assert!(
                info.used_buffers[..i].iter().all(|other| other.id != used.id),
                "Task \"{}\" uses task buffer ({}) more than once.", info.debug_name, used.id
            );
        }
        for (i, used) in info.used_images.iter().enumerate() {
            self.validate_image_id(used.id);
            debug_assert!(
                info.used_images[..i].iter().all(|other| other.id != used.id),
                "Task \"{}\" uses task image ({}) more than once.", info.debug_name, used.id
            );
        }

        self.tasks.push(Task {
            used_buffers: info.used_buffers,
            used_images: info.used_images,
            callback: info.task,
            debug_name: info.debug_name
        });
    }

    /// Decides the barriers of every task in one forward pass. Can only run once.
    pub fn compile(&mut self) {
        debug_assert!(!self.compiled, "A task list can only be compiled once.");

        let mut schedule = BarrierSchedule::new(self.tasks.len());

        for (task_index, task) in self.tasks.iter().enumerate() {
            // A None use only grants the task the handle
            for used in task.used_buffers.iter().filter(|used| used.access != TaskBufferAccess::None) {
                let slot = &mut self.buffers[used.id.index as usize - 1];
                let new_access = task_buffer_access_to_access(used.access);

                schedule.track(&mut slot.state, task_index, new_access, ImageLayout::UNDEFINED, None);
            }

            for used in task.used_images.iter().filter(|used| used.access != TaskImageAccess::None) {
                let slot = &mut self.images[used.id.index as usize - 1];
                let (new_layout, new_access) = task_image_access_to_layout_access(used.access);

                if let TaskImageKind::Transient { usage, .. } = &mut slot.kind {
                    *usage |= task_image_access_to_usage(used.access);
                }

                schedule.track(&mut slot.state, task_index, new_access, new_layout, Some((used.id, slot.slice)));
            }
        }

        tracing::debug!(
            task_list = %self.info.debug_name,
            tasks = self.tasks.len(),
            barriers = schedule.barriers.len(),
            barrier_lists = schedule.task_barriers.iter().filter(|list| !list.is_empty()).count(),
            "Compiled task list"
        );

        self.schedule = schedule;
        self.compiled = true;
    }

    /// Records the compiled barriers and every task callback into `recorder`, in task order.
    pub fn execute(&mut self, recorder: &mut R) -> Result<()> {
        if !self.compiled {
            bail!("Task list \"{}\" must be compiled before it is executed.", self.info.debug_name);
        }

        self.create_runtime_resources(recorder)?;
        self.generate_persistent_resource_sync(recorder);

        if self.info.record_debug_information {
            // Only the latest execution is kept
            self.debug_string_stream.clear();
            self.debug_string_stream += format!("Execution {}:\n", self.execution_count).as_str();
        }

        for (task_index, task) in self.tasks.iter_mut().enumerate() {
            for &barrier_index in &self.schedule.task_barriers[task_index] {
                let barrier = &self.schedule.barriers[barrier_index];
                Self::insert_pipeline_barrier(recorder, &self.images, barrier);

                if self.info.record_debug_information {
                    Self::print_task_barrier_to(&mut self.debug_string_stream, "\t", &self.images, barrier);
                }
            }

            if self.info.record_debug_information {
                self.debug_string_stream += format!("\tTask \"{}\"\n", task.debug_name).as_str();
            }

            let mut interface = TaskInterface {
                recorder: &mut *recorder,
                task_list_index: self.unique_index,
                buffers: &self.buffers,
                images: &self.images,
                used_buffers: &task.used_buffers,
                used_images: &task.used_images
            };
            (task.callback)(&mut interface);
        }

        // Persistent resources carry their final state into the next execution
        for slot in &mut self.buffers {
            match slot.kind {
                TaskBufferKind::Persistent { .. } => slot.execution_access = slot.state.last_access,
                TaskBufferKind::Transient { .. } => recorder.destroy_buffer_deferred(slot.runtime_id)
            }
        }
        for slot in &mut self.images {
            match slot.kind {
                TaskImageKind::Persistent { .. } => slot.execution_state = (slot.state.last_access, slot.state.last_layout),
                TaskImageKind::Transient { .. } => recorder.destroy_image_deferred(slot.runtime_id)
            }
        }

        self.execution_count += 1;
        Ok(())
    }

    pub fn info(&self) -> &TaskListInfo {
        &self.info
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of barrier entries, one per detected hazard.
    pub fn barrier_count(&self) -> usize {
        self.schedule.barriers.len()
    }

    /// Number of tasks preceded by at least one barrier.
    pub fn barrier_list_count(&self) -> usize {
        self.schedule.task_barriers.iter().filter(|list| !list.is_empty()).count()
    }

    /// Barriers recorded right before the task at `task_index`.
    pub fn task_barriers(&self, task_index: usize) -> impl Iterator<Item = &TaskPipelineBarrier> + '_ {
        debug_assert!(self.compiled, "Barriers are only known after compile.");

        self.schedule.task_barriers
            .get(task_index)
            .into_iter()
            .flatten()
            .map(move |&barrier_index| &self.schedule.barriers[barrier_index])
    }

    /// Access the buffer is left in after the last task.
    pub fn buffer_last_access(&self, id: TaskBufferId) -> Access {
        self.validate_buffer_id(id);
        self.buffers[id.index as usize - 1].state.last_access
    }

    /// Access and layout the image is left in after the last task.
    pub fn image_last_state(&self, id: TaskImageId) -> (Access, ImageLayout) {
        self.validate_image_id(id);
        let state = &self.images[id.index as usize - 1].state;
        (state.last_access, state.last_layout)
    }

    pub fn get_debug_string(&self) -> String {
        debug_assert!(self.compiled, "The debug string is only available after compile.");

        let mut out = String::new();
        let indent = "\t";

        out += format!("Task list name: \"{}\", id: {}\n", self.info.debug_name, self.unique_index).as_str();
        out += format!("Tasks: {}, barriers: {}, barrier lists: {}\n", self.task_count(), self.barrier_count(), self.barrier_list_count()).as_str();
        for task_index in 0..self.tasks.len() {
            self.print_task_to(&mut out, indent, task_index);
        }

        if self.info.record_debug_information {
            out += self.debug_string_stream.as_str();
        }

        out
    }
}

// TaskList internal methods
impl<R: TaskCommandRecorder> TaskList<R> {
    fn validate_buffer_id(&self, id: TaskBufferId) {
        debug_assert!(!id.is_empty(), "Detected empty task buffer id.");
        debug_assert!(id.task_list_index == self.unique_index, "Task buffer ({}) belongs to a different task list.", id);
        debug_assert!(id.index as usize <= self.buffers.len(), "Detected invalid task buffer id ({}).", id);
    }

    fn validate_image_id(&self, id: TaskImageId) {
        debug_assert!(!id.is_empty(), "Detected empty task image id.");
        debug_assert!(id.task_list_index == self.unique_index, "Task image ({}) belongs to a different task list.", id);
        debug_assert!(id.index as usize <= self.images.len(), "Detected invalid task image id ({}).", id);
    }

    fn create_runtime_resources(&mut self, recorder: &mut R) -> Result<()> {
        // Ids of the previous execution are already destroyed
        for slot in self.buffers.iter_mut().filter(|slot| matches!(slot.kind, TaskBufferKind::Transient { .. })) {
            slot.runtime_id = BufferId::default();
        }
        for slot in self.images.iter_mut().filter(|slot| matches!(slot.kind, TaskImageKind::Transient { .. })) {
            slot.runtime_id = ImageId::default();
        }

        if let Err(error) = self.fetch_runtime_resources(recorder) {
            self.release_transient_resources(recorder);
            return Err(error);
        }

        Ok(())
    }

    /// Hands every transient created so far back to the recorder.
    fn release_transient_resources(&mut self, recorder: &mut R) {
        for slot in &mut self.buffers {
            if matches!(slot.kind, TaskBufferKind::Transient { .. }) && !slot.runtime_id.is_empty() {
                recorder.destroy_buffer_deferred(slot.runtime_id);
                slot.runtime_id = BufferId::default();
            }
        }
        for slot in &mut self.images {
            if matches!(slot.kind, TaskImageKind::Transient { .. }) && !slot.runtime_id.is_empty() {
                recorder.destroy_image_deferred(slot.runtime_id);
                slot.runtime_id = ImageId::default();
            }
        }
    }

    fn fetch_runtime_resources(&mut self, recorder: &mut R) -> Result<()> {
        for slot in &mut self.buffers {
            slot.runtime_id = match &slot.kind {
                TaskBufferKind::Persistent { fetch_callback } => {
                    let id = fetch_callback();
                    debug_assert!(!id.is_empty(), "Task buffer \"{}\" fetched an empty buffer id.", slot.debug_name);
                    id
                },
                TaskBufferKind::Transient { info } => recorder.create_transient_buffer(info)?
            };
        }

        for slot in &mut self.images {
            slot.runtime_id = match &slot.kind {
                TaskImageKind::Persistent { fetch_callback } => {
                    let id = fetch_callback();
                    debug_assert!(!id.is_empty(), "Task image \"{}\" fetched an empty image id.", slot.debug_name);
                    id
                },
                TaskImageKind::Transient { info, usage } => recorder.create_transient_image(info, *usage)?
            };
        }

        Ok(())
    }

    /// Bridges the state a persistent resource was left in by the previous execution to the state the
    /// compiled barriers expect.
    fn generate_persistent_resource_sync(&self, recorder: &mut R) {
        let conflicts = |prior: Access, next: Access| prior.has_write() || (prior.has_read() && next.has_write());

        for slot in &self.buffers {
            let (TaskBufferKind::Persistent { .. }, Some(entry_access)) = (&slot.kind, slot.state.entry_access) else {
                continue
            };
            if slot.execution_access == slot.initial_access || !conflicts(slot.execution_access, entry_access) {
                continue;
            }

            tracing::trace!(task_buffer = %slot.debug_name, "Synchronizing with previous execution");
            recorder.pipeline_barrier(MemoryBarrierInfo {
                src_access: slot.execution_access,
                dst_access: entry_access
            });
        }

        for slot in &self.images {
            let (TaskImageKind::Persistent { .. }, Some(entry_access)) = (&slot.kind, slot.state.entry_access) else {
                continue
            };
            let (previous_access, previous_layout) = slot.execution_state;
            if previous_access == slot.initial_access && previous_layout == slot.initial_layout {
                continue;
            }

            // Compiled barriers starting from UNDEFINED discard the contents, so only execution order matters there.
            if previous_layout != slot.initial_layout && slot.initial_layout != ImageLayout::UNDEFINED {
                tracing::trace!(task_image = %slot.debug_name, "Transitioning to the initial layout of the task list");
                recorder.pipeline_barrier_image_transition(ImageBarrierInfo {
                    src_access: previous_access,
                    dst_access: entry_access,
                    src_layout: previous_layout,
                    dst_layout: slot.initial_layout,
                    range: slot.slice,
                    image: slot.runtime_id
                });
            } else if conflicts(previous_access, entry_access) {
                tracing::trace!(task_image = %slot.debug_name, "Synchronizing with previous execution");
                recorder.pipeline_barrier(MemoryBarrierInfo {
                    src_access: previous_access,
                    dst_access: entry_access
                });
            }
        }
    }

    fn insert_pipeline_barrier(recorder: &mut R, images: &[TaskImageSlot], barrier: &TaskPipelineBarrier) {
        match barrier.image_id {
            Some(image_id) => {
                let image = images[image_id.index as usize - 1].runtime_id;
                tracing::trace!(
                    %image,
                    before = ?barrier.before_layout,
                    after = ?barrier.after_layout,
                    "Inserting image barrier"
                );
                recorder.pipeline_barrier_image_transition(ImageBarrierInfo {
                    src_access: barrier.awaited_access,
                    dst_access: barrier.waiting_access,
                    src_layout: barrier.before_layout,
                    dst_layout: barrier.after_layout,
                    range: barrier.image_slice,
                    image
                });
            },
            None => {
                tracing::trace!(src = %barrier.awaited_access, dst = %barrier.waiting_access, "Inserting memory barrier");
                recorder.pipeline_barrier(MemoryBarrierInfo {
                    src_access: barrier.awaited_access,
                    dst_access: barrier.waiting_access
                });
            }
        }
    }

    fn print_task_buffer_to(&self, out: &mut String, indent: &str, id: TaskBufferId) {
        let slot = &self.buffers[id.index as usize - 1];
        let kind = match slot.kind {
            TaskBufferKind::Persistent { .. } => "persistent",
            TaskBufferKind::Transient { .. } => "transient"
        };
        *out += format!("{}Task buffer name: \"{}\", id: ({}), {}\n", indent, slot.debug_name, id, kind).as_str();
        if !slot.runtime_id.is_empty() {
            *out += format!("{}Runtime buffer: ({})\n", indent, slot.runtime_id).as_str();
        }
    }

    fn print_task_image_to(&self, out: &mut String, indent: &str, id: TaskImageId) {
        let slot = &self.images[id.index as usize - 1];
        let kind = match slot.kind {
            TaskImageKind::Persistent { .. } => "persistent",
            TaskImageKind::Transient { .. } => "transient"
        };
        *out += format!("{}Task image name: \"{}\", id: ({}), {}\n", indent, slot.debug_name, id, kind).as_str();
        if !slot.runtime_id.is_empty() {
            *out += format!("{}Runtime image: ({})\n", indent, slot.runtime_id).as_str();
        }
    }

    fn print_task_barrier_to(out: &mut String, indent: &str, images: &[TaskImageSlot], barrier: &TaskPipelineBarrier) {
        *out += format!("{}Awaited: ({})\n", indent, barrier.awaited_access).as_str();
        *out += format!("{}Waiting: ({})\n", indent, barrier.waiting_access).as_str();
        if let Some(image_id) = barrier.image_id {
            let slot = &images[image_id.index as usize - 1];
            *out += format!("{}Image: \"{}\", id: ({})\n", indent, slot.debug_name, image_id).as_str();
            *out += format!("{}Range: ({:?})\n", indent, barrier.image_slice).as_str();
            *out += format!("{}Layout: ({:?}) -> ({:?})\n", indent, barrier.before_layout, barrier.after_layout).as_str();
        }
    }

    fn print_task_to(&self, out: &mut String, indent: &str, task_index: usize) {
        let task = &self.tasks[task_index];
        *out += format!("Task name: \"{}\", id: {}\n", task.debug_name, task_index).as_str();

        let barriers = self.schedule.task_barriers.get(task_index).map_or(&[][..], Vec::as_slice);
        if !barriers.is_empty() {
            *out += format!("{}Barriers:\n", indent).as_str();
            for &barrier_index in barriers {
                Self::print_task_barrier_to(out, indent, &self.images, &self.schedule.barriers[barrier_index]);
                *out += format!("{}--------------------------------\n", indent).as_str();
            }
        }

        *out += format!("{}Task arguments:\n", indent).as_str();
        for used in &task.used_buffers {
            let access = task_buffer_access_to_access(used.access);
            *out += format!("{}Buffer argument:\n", indent).as_str();
            *out += format!("{}Access: ({})\n", indent, access).as_str();
            self.print_task_buffer_to(out, indent, used.id);
            *out += format!("{}--------------------------------\n", indent).as_str();
        }
        for used in &task.used_images {
            let (layout, access) = task_image_access_to_layout_access(used.access);
            *out += format!("{}Image argument:\n", indent).as_str();
            *out += format!("{}Access: ({})\n", indent, access).as_str();
            *out += format!("{}Layout: {:?}\n", indent, layout).as_str();
            self.print_task_image_to(out, indent, used.id);
            *out += format!("{}--------------------------------\n", indent).as_str();
        }
    }
}



#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::access_consts::*;

    fn image() -> Option<(TaskImageId, ImageSubresourceRange)> {
        Some((TaskImageId { task_list_index: 0, index: 1 }, ImageSubresourceRange::default()))
    }

    #[test]
    fn read_after_read_needs_no_barrier() {
        let mut schedule = BarrierSchedule::new(2);
        let mut state = TrackedState::new(NONE, ImageLayout::UNDEFINED);

        schedule.track(&mut state, 0, VERTEX_SHADER_READ, ImageLayout::UNDEFINED, None);
        schedule.track(&mut state, 1, FRAGMENT_SHADER_READ, ImageLayout::UNDEFINED, None);

        assert!(schedule.barriers.is_empty());
        assert_eq!(state.last_access, VERTEX_SHADER_READ | FRAGMENT_SHADER_READ);
        assert_eq!(state.last_access_task_index, Some(1));
    }

    #[test]
    fn write_after_write_is_synchronized() {
        let mut schedule = BarrierSchedule::new(2);
        let mut state = TrackedState::new(NONE, ImageLayout::UNDEFINED);

        schedule.track(&mut state, 0, TRANSFER_WRITE, ImageLayout::UNDEFINED, None);
        schedule.track(&mut state, 1, COMPUTE_SHADER_WRITE, ImageLayout::UNDEFINED, None);

        assert_eq!(schedule.barriers.len(), 1);
        assert_eq!(schedule.task_barriers[1], vec![0]);
        assert_eq!(schedule.barriers[0].awaited_access, TRANSFER_WRITE);
        assert_eq!(schedule.barriers[0].waiting_access, COMPUTE_SHADER_WRITE);
        assert!(schedule.barriers[0].image_id.is_none());
    }

    #[test]
    fn merged_reads_widen_their_barrier() {
        let mut schedule = BarrierSchedule::new(3);
        let mut state = TrackedState::new(NONE, ImageLayout::UNDEFINED);

        schedule.track(&mut state, 0, COMPUTE_SHADER_WRITE, ImageLayout::UNDEFINED, None);
        schedule.track(&mut state, 1, VERTEX_SHADER_READ, ImageLayout::UNDEFINED, None);
        schedule.track(&mut state, 2, FRAGMENT_SHADER_READ, ImageLayout::UNDEFINED, None);

        assert_eq!(schedule.barriers.len(), 1);
        assert_eq!(schedule.barriers[0].waiting_access, VERTEX_SHADER_READ | FRAGMENT_SHADER_READ);
        assert_eq!(state.latest_read_barrier, Some(0));
    }

    #[test]
    fn same_layout_reads_do_not_transition() {
        let mut schedule = BarrierSchedule::new(2);
        let mut state = TrackedState::new(NONE, ImageLayout::READ_ONLY_OPTIMAL);

        schedule.track(&mut state, 0, FRAGMENT_SHADER_READ, ImageLayout::READ_ONLY_OPTIMAL, image());
        schedule.track(&mut state, 1, COMPUTE_SHADER_READ, ImageLayout::READ_ONLY_OPTIMAL, image());

        assert!(schedule.barriers.is_empty());
        assert_eq!(state.entry_access, Some(FRAGMENT_SHADER_READ | COMPUTE_SHADER_READ));
    }

    #[test]
    fn entry_access_stops_at_the_first_barrier() {
        let mut schedule = BarrierSchedule::new(4);
        let mut state = TrackedState::new(NONE, ImageLayout::UNDEFINED);

        schedule.track(&mut state, 0, COMPUTE_SHADER_READ, ImageLayout::UNDEFINED, None);
        schedule.track(&mut state, 1, FRAGMENT_SHADER_READ, ImageLayout::UNDEFINED, None);
        schedule.track(&mut state, 2, TRANSFER_WRITE, ImageLayout::UNDEFINED, None);
        schedule.track(&mut state, 3, VERTEX_SHADER_READ, ImageLayout::UNDEFINED, None);

        assert_eq!(state.entry_access, Some(COMPUTE_SHADER_READ | FRAGMENT_SHADER_READ));
        assert!(!state.entry_phase_open);
    }

    #[test]
    fn barrier_is_not_reused_before_the_prior_access() {
        let mut schedule = BarrierSchedule::new(3);
        let mut first = TrackedState::new(NONE, ImageLayout::UNDEFINED);
        let mut second = TrackedState::new(NONE, ImageLayout::UNDEFINED);

        schedule.track(&mut first, 0, TRANSFER_WRITE, ImageLayout::UNDEFINED, None);
        schedule.track(&mut first, 1, TRANSFER_READ, ImageLayout::UNDEFINED, None);
        // Written at task 1, the barrier before task 1 would run too early
        schedule.track(&mut second, 1, TRANSFER_WRITE, ImageLayout::UNDEFINED, None);
        schedule.track(&mut second, 2, TRANSFER_READ, ImageLayout::UNDEFINED, None);

        assert_eq!(schedule.task_barriers[1], vec![0]);
        assert_eq!(schedule.task_barriers[2], vec![1]);
        assert_eq!(schedule.last_task_index_with_barrier, Some(2));
    }
}
