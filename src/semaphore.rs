use crate::device::Device;

use anyhow::{bail, Context, Result};
use ash::vk;
use std::{
    borrow::Cow,
    slice,
    sync::Arc
};



#[derive(Clone, Default)]
pub struct BinarySemaphoreInfo {
    pub debug_name: Cow<'static, str>,
}

#[derive(Clone, Default)]
pub struct TimelineSemaphoreInfo {
    pub initial_value: u64,
    pub debug_name: Cow<'static, str>,
}


pub(crate) struct SemaphoreZombie {
    pub semaphore: vk::Semaphore
}


#[derive(Clone)]
pub struct BinarySemaphore(pub(crate) Arc<BinarySemaphoreInternal>);

pub(crate) struct BinarySemaphoreInternal {
    device: Device,
    pub semaphore: vk::Semaphore,
    info: BinarySemaphoreInfo,
}

// BinarySemaphore creation methods
impl BinarySemaphore {
    pub(crate) fn new(
        device: Device,
        info: BinarySemaphoreInfo
    ) -> Result<Self> {
        let semaphore_ci = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device.0.logical_device.create_semaphore(&semaphore_ci, None)
                .context("Semaphore should be created.")?
        };

        device.0.set_debug_name(semaphore, format!("{} [Daxa BinarySemaphore]", info.debug_name))?;

        Ok(Self(Arc::new(BinarySemaphoreInternal {
            device,
            semaphore,
            info
        })))
    }
}

// BinarySemaphore usage methods
impl BinarySemaphore {
    #[inline]
    pub fn info(&self) -> &BinarySemaphoreInfo {
        &self.0.info
    }
}

impl Drop for BinarySemaphoreInternal {
    fn drop(&mut self) {
        let timeline = self.device.main_queue_cpu_timeline();

        self.device.0.main_queue_zombies.lock()
            .unwrap()
            .semaphores.push_front((
                timeline,
                SemaphoreZombie {
                    semaphore: self.semaphore
                }
            ));
    }
}



#[derive(Clone)]
pub struct TimelineSemaphore(pub(crate) Arc<TimelineSemaphoreInternal>);

pub(crate) struct TimelineSemaphoreInternal {
    device: Device,
    pub semaphore: vk::Semaphore,
    info: TimelineSemaphoreInfo
}

// TimelineSemaphore creation methods
impl TimelineSemaphore {
    pub(crate) fn new(
        device: Device,
        info: TimelineSemaphoreInfo
    ) -> Result<Self> {
        let mut semaphore_type_ci = vk::SemaphoreTypeCreateInfo::builder()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(info.initial_value);

        let semaphore_ci = vk::SemaphoreCreateInfo::builder()
            .push_next(&mut semaphore_type_ci);

        let semaphore = unsafe {
            device.0.logical_device.create_semaphore(&semaphore_ci, None)
                .context("Semaphore should be created.")?
        };

        device.0.set_debug_name(semaphore, format!("{} [Daxa TimelineSemaphore]", info.debug_name))?;

        Ok(Self(Arc::new(TimelineSemaphoreInternal {
            device,
            semaphore,
            info
        })))
    }
}

// TimelineSemaphore usage methods
impl TimelineSemaphore {
    #[inline]
    pub fn info(&self) -> &TimelineSemaphoreInfo {
        &self.0.info
    }

    pub fn value(&self) -> Result<u64> {
        unsafe {
            self.0.device.0.logical_device.get_semaphore_counter_value(self.0.semaphore)
                .context("Semaphore counter value should be readable.")
        }
    }

    pub fn set_value(&self, value: u64) -> Result<()> {
        let signal_info = vk::SemaphoreSignalInfo::builder()
            .semaphore(self.0.semaphore)
            .value(value);

        unsafe {
            self.0.device.0.logical_device.signal_semaphore(&signal_info)
                .context("Semaphore should be signaled.")
        }
    }

    /// Blocks until the semaphore reaches `value`. Returns `false` if `timeout` nanoseconds pass first.
    pub fn wait_for_value(
        &self,
        value: u64,
        timeout: u64
    ) -> Result<bool> {
        let wait_info = vk::SemaphoreWaitInfo::builder()
            .semaphores(slice::from_ref(&self.0.semaphore))
            .values(slice::from_ref(&value));

        match unsafe { self.0.device.0.logical_device.wait_semaphores(&wait_info, timeout) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(vk::Result::ERROR_DEVICE_LOST) => bail!("Device lost while waiting on a timeline semaphore."),
            Err(result) => Err(result).context("Semaphore wait should succeed.")
        }
    }
}

impl Drop for TimelineSemaphoreInternal {
    fn drop(&mut self) {
        let timeline = self.device.main_queue_cpu_timeline();

        self.device.0.main_queue_zombies.lock()
            .unwrap()
            .semaphores.push_front((
                timeline,
                SemaphoreZombie {
                    semaphore: self.semaphore
                }
            ));
    }
}
