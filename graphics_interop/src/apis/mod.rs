pub mod dxgi;
pub mod metal;
pub mod opengl;
pub mod vulkan;
