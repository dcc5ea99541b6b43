use ash::vk;

use std::{
    fmt::Display,
    ops::{BitOr, BitOrAssign},
};

// reexport
pub use {
    vk::Extent3D,
    vk::ImageLayout,
    vk::ImageSubresourceRange,
    vk::Offset3D,
};



/// A pair of pipeline stages and memory access kinds.
///
/// Only `MEMORY_READ` and `MEMORY_WRITE` are used as access kinds, which is all the
/// hazard tracking needs to classify an access as read, write or read-write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Access(pub(crate) vk::PipelineStageFlags2, pub(crate) vk::AccessFlags2);

impl Default for Access {
    fn default() -> Self {
        access_consts::NONE
    }
}

impl Access {
    pub const fn new(stages: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        Self(stages, access)
    }

    #[inline]
    pub fn stages(&self) -> vk::PipelineStageFlags2 {
        self.0
    }

    #[inline]
    pub fn access(&self) -> vk::AccessFlags2 {
        self.1
    }

    #[inline]
    pub fn has_read(&self) -> bool {
        self.1.contains(vk::AccessFlags2::MEMORY_READ)
    }

    #[inline]
    pub fn has_write(&self) -> bool {
        self.1.contains(vk::AccessFlags2::MEMORY_WRITE)
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.has_read() && !self.has_write()
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.0.is_empty() && self.1.is_empty()
    }
}

impl BitOr for Access {
    type Output = Access;

    fn bitor(self, rhs: Self) -> Self::Output {
        Access(self.0 | rhs.0, self.1 | rhs.1)
    }
}

impl BitOrAssign for Access {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match (self.has_read(), self.has_write()) {
            (false, false) => "NONE",
            (true, false) => "READ",
            (false, true) => "WRITE",
            (true, true) => "READ_WRITE",
        };
        if self.0.is_empty() {
            write!(f, "stages: NONE, access: {}", kind)
        } else {
            write!(f, "stages: {:?}, access: {}", self.0, kind)
        }
    }
}

pub mod access_consts {
    use super::Access;
    use ash::vk;

    pub(crate) const ACCESS_READ_WRITE: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
        vk::AccessFlags2::MEMORY_READ.as_raw() | vk::AccessFlags2::MEMORY_WRITE.as_raw()
    );

    pub const NONE: Access = Access(vk::PipelineStageFlags2::NONE, vk::AccessFlags2::NONE);

    pub const VERTEX_SHADER_READ: Access = Access(vk::PipelineStageFlags2::VERTEX_SHADER, vk::AccessFlags2::MEMORY_READ);
    pub const FRAGMENT_SHADER_READ: Access = Access(vk::PipelineStageFlags2::FRAGMENT_SHADER, vk::AccessFlags2::MEMORY_READ);
    pub const COMPUTE_SHADER_READ: Access = Access(vk::PipelineStageFlags2::COMPUTE_SHADER, vk::AccessFlags2::MEMORY_READ);
    pub const TRANSFER_READ: Access = Access(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::MEMORY_READ);
    pub const HOST_READ: Access = Access(vk::PipelineStageFlags2::HOST, vk::AccessFlags2::MEMORY_READ);

    pub const COMPUTE_SHADER_WRITE: Access = Access(vk::PipelineStageFlags2::COMPUTE_SHADER, vk::AccessFlags2::MEMORY_WRITE);
    pub const COLOR_ATTACHMENT_OUTPUT_WRITE: Access = Access(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, vk::AccessFlags2::MEMORY_WRITE);
    pub const TRANSFER_WRITE: Access = Access(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::MEMORY_WRITE);
    pub const HOST_WRITE: Access = Access(vk::PipelineStageFlags2::HOST, vk::AccessFlags2::MEMORY_WRITE);

    pub const COMPUTE_SHADER_READ_WRITE: Access = Access(vk::PipelineStageFlags2::COMPUTE_SHADER, ACCESS_READ_WRITE);
    pub const ALL_GRAPHICS_READ_WRITE: Access = Access(vk::PipelineStageFlags2::ALL_GRAPHICS, ACCESS_READ_WRITE);
    pub const ALL_COMMANDS_READ_WRITE: Access = Access(vk::PipelineStageFlags2::ALL_COMMANDS, ACCESS_READ_WRITE);
}



#[cfg(test)]
mod tests {
    use super::{access_consts::*, Access};
    use ash::vk;

    #[test]
    fn access_kinds() {
        assert!(NONE.is_none());
        assert!(TRANSFER_READ.is_read_only());
        assert!(!TRANSFER_WRITE.has_read());
        assert!(TRANSFER_WRITE.has_write());
        assert!(COMPUTE_SHADER_READ_WRITE.has_read() && COMPUTE_SHADER_READ_WRITE.has_write());
    }

    #[test]
    fn merged_reads_stay_reads() {
        let mut access = VERTEX_SHADER_READ;
        access |= FRAGMENT_SHADER_READ;

        assert!(access.is_read_only());
        assert_eq!(access.stages(), vk::PipelineStageFlags2::VERTEX_SHADER | vk::PipelineStageFlags2::FRAGMENT_SHADER);
        assert_eq!(access | TRANSFER_WRITE, Access(
            vk::PipelineStageFlags2::VERTEX_SHADER | vk::PipelineStageFlags2::FRAGMENT_SHADER | vk::PipelineStageFlags2::TRANSFER,
            vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE
        ));
    }

    #[test]
    fn display_names_empty_stages() {
        assert_eq!(NONE.to_string(), "stages: NONE, access: NONE");
        let transfer_write = TRANSFER_WRITE.to_string();
        assert!(transfer_write.contains("TRANSFER") && transfer_write.ends_with("access: WRITE"));
    }
}
