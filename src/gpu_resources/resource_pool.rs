use crate::core::{ResourceId, Slot};
use super::{
    GPUResourceId,
    BufferInfo,
    ImageInfo,
    ImageViewInfo,
    SamplerInfo
};

use ash::vk;
use daxa_sync_derive::Slot;
use gpu_allocator::vulkan::Allocation;
use std::{
    cell::UnsafeCell,
    sync::Mutex,
};



#[derive(Slot, Debug, Default)]
pub(crate) struct BufferSlot {
    pub info: BufferInfo,
    pub buffer: vk::Buffer,
    pub allocation: Option<Allocation>,
    pub zombie: bool,
}

#[derive(Slot, Debug, Default)]
pub(crate) struct ImageViewSlot {
    pub info: ImageViewInfo,
    pub image_view: vk::ImageView,
    pub zombie: bool,
}

#[derive(Slot, Debug, Default)]
pub(crate) struct ImageSlot {
    pub view_slot: ImageViewSlot,
    pub info: ImageInfo,
    pub image: vk::Image,
    pub allocation: Option<Allocation>,
    pub zombie: bool
}

#[derive(Slot, Debug, Default)]
pub(crate) struct SamplerSlot {
    pub info: SamplerInfo,
    pub sampler: vk::Sampler,
    pub zombie: bool
}



pub(crate) const MAX_RESOURCE_COUNT: usize = 1 << 20;
const PAGE_BITS: usize = 12;
pub(super) const PAGE_SIZE: usize = 1 << PAGE_BITS;
const PAGE_MASK: usize = PAGE_SIZE - 1;
pub(super) const PAGE_COUNT: usize = MAX_RESOURCE_COUNT / PAGE_SIZE;

type Page<ResourceT> = Box<[(ResourceT, u8)]>;

/// [`GPUShaderResourcePool`] is intended to be used akin to a specialized memory allocator, specific to gpu resource types (like image views).
/// 
/// This struct is threadsafe if the following assumptions are met:
/// * never dereference a deleted resource
/// * never delete a resource twice
/// That means `dereference_id` can be used without synchronization, even calling `new_slot` or `return_slot` in parallel is safe.
/// 
/// To check if these assumptions are met at runtime, enable the `gpu_id_validation` feature.
/// It enables runtime checking to detect use after free and double free at the cost of performance.
pub(crate) struct GPUShaderResourcePool<ResourceT: Slot + Default> {
    pub max_resources: usize,
    #[cfg(feature = "gpu_id_validation")]
    use_after_free_check_mtx: Mutex<()>,
    page_alloc_mtx: Mutex<IndexStack>,
    pages: UnsafeCell<Vec<Option<Page<ResourceT>>>>
}

// Safety: page allocation and slot recycling are serialized by `page_alloc_mtx`.
// Pages are never freed or moved while the pool is alive, so references into live slots stay valid.
unsafe impl<ResourceT: Slot + Default + Send> Send for GPUShaderResourcePool<ResourceT> {}
unsafe impl<ResourceT: Slot + Default + Send + Sync> Sync for GPUShaderResourcePool<ResourceT> {}

#[derive(Default)]
pub(crate) struct IndexStack {
    pub free_index_stack: Vec<u32>,
    pub next_index: u32,
}

impl<ResourceT: Slot + Default> GPUShaderResourcePool<ResourceT> {
    pub fn new(max_resources: usize) -> Self {
        debug_assert!(max_resources <= MAX_RESOURCE_COUNT, "Exceeded max resource count.");

        Self {
            max_resources,
            #[cfg(feature = "gpu_id_validation")]
            use_after_free_check_mtx: Mutex::default(),
            page_alloc_mtx: Mutex::default(),
            pages: UnsafeCell::new((0..PAGE_COUNT).map(|_| None).collect())
        }
    }

    #[inline]
    fn split_index(index: u32) -> (usize, usize) {
        ((index as usize) >> PAGE_BITS, (index as usize) & PAGE_MASK)
    }

    #[cfg(feature = "gpu_id_validation")]
    fn verify_resource_id(&self, id: &dyn ResourceId) {
        let (page, _) = Self::split_index(id.index());
        let pages = unsafe { &*self.pages.get() };
        debug_assert!(page < pages.len(), "Detected invalid resource id.");
        debug_assert!(pages[page].is_some(), "Detected invalid resource id.");
        debug_assert!(id.version() != 0, "Detected invalid resource id.");
    }

    #[cfg(feature = "gpu_id_validation")]
    fn slot_version(&self, id: &dyn ResourceId) -> Option<u8> {
        let (page, offset) = Self::split_index(id.index());
        let pages = unsafe { &*self.pages.get() };
        pages.get(page)?.as_ref().map(|page| page[offset].1)
    }

    #[allow(clippy::mut_from_ref)]
    pub fn new_slot(&self) -> (GPUResourceId, &mut ResourceT) {
        #[cfg(feature = "gpu_id_validation")]
        let _use_after_free_check_lock = self.use_after_free_check_mtx.lock().unwrap();

        // Lock to ensure we have thread safe access to the pool
        let mut page_alloc_lock = self.page_alloc_mtx.lock().unwrap();
        let pages = unsafe { &mut *self.pages.get() };

        let index = match page_alloc_lock.free_index_stack.pop() {
            Some(index) => index,
            None => {
                let index = page_alloc_lock.next_index;
                debug_assert!((index as usize) < MAX_RESOURCE_COUNT, "Exceeded max resource count.");
                debug_assert!((index as usize) < self.max_resources, "Exceeded max resource count.");
                page_alloc_lock.next_index += 1;
                index
            }
        };

        let (page, offset) = Self::split_index(index);

        let page = pages[page].get_or_insert_with(|| {
            (0..PAGE_SIZE)
                .map(|_| (ResourceT::default(), 0u8))
                .collect()
        });

        // Make sure the version is at least 1
        let (resource, version) = &mut page[offset];
        *version = (*version).max(1);

        let mut id = GPUResourceId(0);
        id.set_index(index);
        id.set_version(*version);

        (id, resource)
    }

    pub fn return_slot(&self, id: &dyn ResourceId) {
        let (page, offset) = Self::split_index(id.index());

        #[cfg(feature = "gpu_id_validation")]
        {
            let _use_after_free_check_lock = self.use_after_free_check_mtx.lock().unwrap();
            self.verify_resource_id(id);
            debug_assert!(
                self.slot_version(id) == Some(id.version()),
                "Detected double delete for a resource id."
            );
        }

        let mut page_alloc_lock = self.page_alloc_mtx.lock().unwrap();
        let pages = unsafe { &mut *self.pages.get() };

        if let Some(page) = pages[page].as_mut() {
            let (resource, version) = &mut page[offset];
            *resource = ResourceT::default();
            // the max is needed, as version = 0 is invalid
            *version = version.wrapping_add(1).max(1);
        }

        page_alloc_lock.free_index_stack.push(id.index());
    }

    pub fn is_id_valid(&self, id: &dyn ResourceId) -> bool {
        let (page, offset) = Self::split_index(id.index());

        let pages = unsafe { &*self.pages.get() };
        let Some(Some(page)) = pages.get(page) else {
            return false
        };
        let (resource, version) = &page[offset];

        id.version() != 0 && *version == id.version() && !resource.is_zombie()
    }

    pub fn dereference_id(&self, id: &dyn ResourceId) -> &ResourceT {
        let (page, offset) = Self::split_index(id.index());

        #[cfg(feature = "gpu_id_validation")]
        {
            let _use_after_free_check_lock = self.use_after_free_check_mtx.lock().unwrap();
            self.verify_resource_id(id);
            debug_assert!(self.slot_version(id) == Some(id.version()), "Detected use after free for a resource id.");
        }

        let pages = unsafe { &*self.pages.get() };
        match &pages[page] {
            Some(page) => &page[offset].0,
            None => panic!("Detected invalid resource id.")
        }
    }

    #[allow(clippy::mut_from_ref)]
    pub fn dereference_id_mut(&self, id: &dyn ResourceId) -> &mut ResourceT {
        let (page, offset) = Self::split_index(id.index());

        #[cfg(feature = "gpu_id_validation")]
        {
            let _use_after_free_check_lock = self.use_after_free_check_mtx.lock().unwrap();
            self.verify_resource_id(id);
            debug_assert!(self.slot_version(id) == Some(id.version()), "Detected use after free for a resource id.");
        }

        let pages = unsafe { &mut *self.pages.get() };
        match &mut pages[page] {
            Some(page) => &mut page[offset].0,
            None => panic!("Detected invalid resource id.")
        }
    }

    /// Number of slots handed out and not yet returned.
    pub fn live_slot_count(&self) -> usize {
        let page_alloc_lock = self.page_alloc_mtx.lock().unwrap();
        page_alloc_lock.next_index as usize - page_alloc_lock.free_index_stack.len()
    }

    /// Describes every live slot accepted by `describe`. Used to report leaks on teardown.
    pub fn survivors(&self, describe: impl Fn(&ResourceT) -> Option<String>) -> Vec<String> {
        let _page_alloc_lock = self.page_alloc_mtx.lock().unwrap();
        let pages = unsafe { &*self.pages.get() };

        pages.iter()
            .flatten()
            .flat_map(|page| page.iter())
            .filter_map(|(resource, _)| describe(resource))
            .collect()
    }
}



#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Slot, Debug, Default)]
    struct TestSlot {
        value: u32,
        zombie: bool
    }

    #[test]
    fn slots_are_recycled_with_new_version() {
        let pool = GPUShaderResourcePool::<TestSlot>::new(16);

        let (first, slot) = pool.new_slot();
        slot.value = 5;
        assert_eq!(first.index(), 0);
        assert_eq!(first.version(), 1);
        assert!(pool.is_id_valid(&first));
        assert_eq!(pool.dereference_id(&first).value, 5);

        pool.return_slot(&first);
        assert!(!pool.is_id_valid(&first));

        let (second, slot) = pool.new_slot();
        assert_eq!(slot.value, 0);
        assert_eq!(second.index(), first.index());
        assert_eq!(second.version(), 2);
        assert_ne!(first, second);
        assert!(!pool.is_id_valid(&first));
        assert!(pool.is_id_valid(&second));
    }

    #[test]
    fn fresh_indices_are_sequential() {
        let pool = GPUShaderResourcePool::<TestSlot>::new(8);

        let ids: Vec<_> = (0..4).map(|_| pool.new_slot().0).collect();
        assert_eq!(ids.iter().map(|id| id.index()).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(pool.live_slot_count(), 4);

        pool.return_slot(&ids[1]);
        assert_eq!(pool.live_slot_count(), 3);
        assert_eq!(pool.new_slot().0.index(), 1);
    }

    #[test]
    fn version_skips_zero_on_wrap() {
        let pool = GPUShaderResourcePool::<TestSlot>::new(1);

        let mut id = pool.new_slot().0;
        for _ in 0..300 {
            pool.return_slot(&id);
            id = pool.new_slot().0;
            assert_ne!(id.version(), 0);
        }
        assert!(pool.is_id_valid(&id));
    }

    #[test]
    fn zombies_are_not_valid() {
        let pool = GPUShaderResourcePool::<TestSlot>::new(4);

        let (id, slot) = pool.new_slot();
        slot.zombie = true;
        assert!(!pool.is_id_valid(&id));
    }

    #[test]
    fn unknown_ids_are_not_valid() {
        let pool = GPUShaderResourcePool::<TestSlot>::new(4);

        assert!(!pool.is_id_valid(&GPUResourceId(0)));
        let mut far_away = GPUResourceId(0);
        far_away.set_index(5000);
        far_away.set_version(1);
        assert!(!pool.is_id_valid(&far_away));
    }

    #[test]
    fn survivors_lists_live_slots() {
        let pool = GPUShaderResourcePool::<TestSlot>::new(4);

        pool.new_slot().1.value = 3;
        let survivors = pool.survivors(|slot| (slot.value != 0).then(|| format!("value {}", slot.value)));
        assert_eq!(survivors, vec!["value 3".to_string()]);
    }

    #[cfg(all(feature = "gpu_id_validation", debug_assertions))]
    #[test]
    #[should_panic(expected = "Detected double delete for a resource id.")]
    fn double_delete_is_detected() {
        let pool = GPUShaderResourcePool::<TestSlot>::new(4);

        let (id, _) = pool.new_slot();
        pool.return_slot(&id);
        pool.return_slot(&id);
    }

    #[cfg(all(feature = "gpu_id_validation", debug_assertions))]
    #[test]
    #[should_panic(expected = "Detected use after free for a resource id.")]
    fn use_after_free_is_detected() {
        let pool = GPUShaderResourcePool::<TestSlot>::new(4);

        let (id, _) = pool.new_slot();
        pool.return_slot(&id);
        let _ = pool.dereference_id(&id);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "Exceeded max resource count.")]
    fn capacity_is_enforced() {
        let pool = GPUShaderResourcePool::<TestSlot>::new(2);

        for _ in 0..3 {
            let _ = pool.new_slot();
        }
    }
}
