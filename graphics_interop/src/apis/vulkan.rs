use std::ffi::CStr;

use ash::{prelude::VkResult, vk, Device, Instance};

use crate::{ImageCreateInfo, ImageFormat};

lazy_static::lazy_static! {
    static ref VK_FORMATS: bimap::BiHashMap<ImageFormat, vk::Format> = {
        use vk::Format;
        [
            (ImageFormat::Rgba8Unorm, Format::R8G8B8A8_UNORM),
            (ImageFormat::Rgba8UnormSrgb, Format::R8G8B8A8_SRGB),
            (ImageFormat::Bgra8Unorm, Format::B8G8R8A8_UNORM),
            (ImageFormat::Bgra8UnormSrgb, Format::B8G8R8A8_SRGB),

            (ImageFormat::Rgba16Float, Format::R16G16B16A16_SFLOAT),
        ]
        .into_iter()
        .collect::<bimap::BiHashMap<_, _>>()
    };
}

/// Device extensions required to import host memory. Empty where no import path exists.
pub fn external_memory_device_extensions() -> Vec<&'static CStr> {
    vec![
        #[cfg(target_os = "windows")]
        vk::KhrExternalMemoryWin32Fn::name(),
        #[cfg(target_os = "linux")]
        vk::KhrExternalMemoryFdFn::name(),
    ]
}

/// A host visible buffer used to stream CPU pixels into device images.
pub struct StagingBuffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
    pub mapped: *mut u8,
}

pub struct VulkanInterop {
    device_memory_properties: vk::PhysicalDeviceMemoryProperties,
    device: Device,
}

impl VulkanInterop {
    pub fn new(instance: &Instance, physical_device: vk::PhysicalDevice, device: &Device) -> Self {
        let device_memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };

        Self {
            device_memory_properties,
            device: device.clone(),
        }
    }

    /// Creates an image backed by memory exported from another API.
    ///
    /// Ownership of `handle` passes to the driver only when this succeeds; on failure an fd
    /// is closed here.
    #[cfg(any(target_os = "windows", target_os = "linux"))]
    pub fn import_image(
        &self,
        image_create_info: &ImageCreateInfo,
        handle: crate::InteropHandle,
        allocation_size: vk::DeviceSize,
    ) -> VkResult<(vk::Image, vk::DeviceMemory)> {
        #[cfg(target_os = "windows")]
        let handle_type = vk::ExternalMemoryHandleTypeFlags::OPAQUE_WIN32;
        #[cfg(target_os = "linux")]
        let handle_type = vk::ExternalMemoryHandleTypeFlags::OPAQUE_FD;

        let result = unsafe {
            self.create_external_image(image_create_info, handle_type)
                .and_then(|image| {
                    match self.bind_imported_memory(image, handle, handle_type, allocation_size) {
                        Ok(memory) => Ok((image, memory)),
                        Err(err) => {
                            self.device.destroy_image(image, None);
                            Err(err)
                        }
                    }
                })
        };

        #[cfg(target_os = "linux")]
        if result.is_err() {
            unsafe { libc::close(handle) };
        }

        result
    }

    unsafe fn create_external_image(
        &self,
        image_create_info: &ImageCreateInfo,
        handle_types: vk::ExternalMemoryHandleTypeFlags,
    ) -> VkResult<vk::Image> {
        let format = image_create_info
            .format
            .to_vk()
            .ok_or(vk::Result::ERROR_FORMAT_NOT_SUPPORTED)?;

        let mut external_info =
            vk::ExternalMemoryImageCreateInfo::builder().handle_types(handle_types);

        let create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: image_create_info.width,
                height: image_create_info.height,
                depth: 1,
            })
            .mip_levels(image_create_info.mip_count)
            .array_layers(image_create_info.layers)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .push_next(&mut external_info);

        self.device.create_image(&create_info, None)
    }

    #[cfg(any(target_os = "windows", target_os = "linux"))]
    unsafe fn bind_imported_memory(
        &self,
        image: vk::Image,
        handle: crate::InteropHandle,
        handle_type: vk::ExternalMemoryHandleTypeFlags,
        allocation_size: vk::DeviceSize,
    ) -> VkResult<vk::DeviceMemory> {
        let memory_req = self.device.get_image_memory_requirements(image);
        let memory_index = self
            .find_memory_type_index(&memory_req, vk::MemoryPropertyFlags::DEVICE_LOCAL)
            .ok_or(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)?;

        #[cfg(target_os = "windows")]
        let mut import_info = vk::ImportMemoryWin32HandleInfoKHR::builder()
            .handle_type(handle_type)
            .handle(handle);
        #[cfg(target_os = "linux")]
        let mut import_info = vk::ImportMemoryFdInfoKHR::builder()
            .handle_type(handle_type)
            .fd(handle);

        let allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(allocation_size.max(memory_req.size))
            .memory_type_index(memory_index)
            .push_next(&mut import_info);

        let memory = self.device.allocate_memory(&allocate_info, None)?;
        if let Err(err) = self.device.bind_image_memory(image, memory, 0) {
            self.device.free_memory(memory, None);
            return Err(err);
        }
        Ok(memory)
    }

    pub fn create_staging_buffer(&self, size: vk::DeviceSize) -> VkResult<StagingBuffer> {
        unsafe {
            let create_info = vk::BufferCreateInfo::builder()
                .size(size)
                .usage(vk::BufferUsageFlags::TRANSFER_SRC)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let buffer = self.device.create_buffer(&create_info, None)?;

            let memory_req = self.device.get_buffer_memory_requirements(buffer);
            let memory_index = match self.find_memory_type_index(
                &memory_req,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            ) {
                Some(index) => index,
                None => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
                }
            };

            let allocate_info = vk::MemoryAllocateInfo::builder()
                .allocation_size(memory_req.size)
                .memory_type_index(memory_index);

            let memory = match self.device.allocate_memory(&allocate_info, None) {
                Ok(memory) => memory,
                Err(err) => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(err);
                }
            };

            let mapped = self
                .device
                .bind_buffer_memory(buffer, memory, 0)
                .and_then(|_| {
                    self.device
                        .map_memory(memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
                });

            match mapped {
                Ok(mapped) => Ok(StagingBuffer {
                    buffer,
                    memory,
                    size,
                    mapped: mapped as *mut u8,
                }),
                Err(err) => {
                    self.device.free_memory(memory, None);
                    self.device.destroy_buffer(buffer, None);
                    Err(err)
                }
            }
        }
    }

    pub fn destroy_staging_buffer(&self, staging: StagingBuffer) {
        unsafe {
            self.device.unmap_memory(staging.memory);
            self.device.free_memory(staging.memory, None);
            self.device.destroy_buffer(staging.buffer, None);
        }
    }

    fn find_memory_type_index(
        &self,
        memory_req: &vk::MemoryRequirements,
        flags: vk::MemoryPropertyFlags,
    ) -> Option<u32> {
        self.device_memory_properties.memory_types
            [..self.device_memory_properties.memory_type_count as _]
            .iter()
            .enumerate()
            .find(|(index, memory_type)| {
                (1 << index) & memory_req.memory_type_bits != 0
                    && memory_type.property_flags & flags == flags
            })
            .map(|(index, _memory_type)| index as _)
    }
}

impl ImageFormat {
    pub fn to_vk(&self) -> Option<vk::Format> {
        VK_FORMATS.get_by_left(self).copied()
    }

    pub fn from_vk(vk_format: vk::Format) -> Option<Self> {
        VK_FORMATS.get_by_right(&vk_format).copied()
    }
}
