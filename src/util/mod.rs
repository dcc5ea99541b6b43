#[cfg(feature = "task_list")]
pub mod task_list;
