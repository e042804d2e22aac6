//! The abstract graphics-device collaborator.
//!
//! Generated host modules drive a device through this trait; the toolchain
//! itself never implements it against real hardware.

use crate::enums::{BufferType, ResourceUsage};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

impl BufferHandle {
    pub const INVALID: Self = Self(u32::MAX);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

#[derive(Copy, Clone, Debug)]
pub struct BufferDesc<'a> {
    pub kind: BufferType,
    pub usage: ResourceUsage,
    pub size: u32,
    pub name: &'a str,
}

pub trait GpuDevice {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> BufferHandle;
    fn destroy_buffer(&mut self, handle: BufferHandle);
    fn update_buffer(&mut self, handle: BufferHandle, data: &[u8]);
}
