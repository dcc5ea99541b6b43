pub const MAX_PUSH_CONSTANT_WORD_SIZE: u32 = 32;
pub const MAX_PUSH_CONSTANT_BYTE_SIZE: u32 = MAX_PUSH_CONSTANT_WORD_SIZE * 4;
pub const PIPELINE_LAYOUT_COUNT: u32 = MAX_PUSH_CONSTANT_WORD_SIZE + 1;
pub const MAX_PUSH_CONSTANT_SIZE_ERROR: &str = "Push constant size is limited to 128 bytes / 32 device words";

/// Timeout in nanoseconds used for blocking waits on the main queue timeline.
pub const DEFAULT_WAIT_TIMEOUT: u64 = 10_000_000_000;



/// Packed handle into one of the resource pools.
///
/// Implemented with `#[derive(ResourceId)]`, which stores the slot index in the low 24 bits
/// and the slot version in the high 8 bits. A version of 0 is never handed out.
pub trait ResourceId {
    fn index(&self) -> u32;
    fn set_index(&mut self, value: u32);
    fn version(&self) -> u8;
    fn set_version(&mut self, value: u8);
    fn is_empty(&self) -> bool;
}

/// A resource pool entry. Zombies are destroyed but not yet reclaimed.
pub trait Slot {
    fn is_zombie(&self) -> bool;
}
