use core::slice;
use std::borrow::Cow;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::sync::Arc;

use ash::{
    extensions::ext::DebugUtils,
    prelude::VkResult,
    vk::{self, Handle},
    Device, Entry, Instance,
};
use graphics_interop::apis::vulkan::{StagingBuffer, VulkanInterop};
use graphics_interop::ImageFormat;
use log::{error, info, warn};
use openxr::sys as xr;

use super::{
    check_cpu_pixels, choose_swapchain_format, graphics_error, unsupported_submission,
    ChosenFormat, GraphicsBinding,
};
use crate::config::GraphicsBindingType;
use crate::error::{ResultExt, XrError, XrResult};
use crate::runtime::{call_enumerate, out_struct, InnerInstance};
use crate::types::{
    DrawViewInfo, HostGraphicsContext, RenderedView, SwapchainImage, TransferMode,
    VulkanDeviceIdentity,
};
use crate::{ToResult, ENGINE_NAME};

const CANDIDATE_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Rgba16Float,
    ImageFormat::Rgba8Unorm,
    ImageFormat::Bgra8Unorm,
    ImageFormat::Rgba8UnormSrgb,
    ImageFormat::Bgra8UnormSrgb,
];

const COLOR_SUBRESOURCE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

const COLOR_LAYERS: vk::ImageSubresourceLayers = vk::ImageSubresourceLayers {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    mip_level: 0,
    base_array_layer: 0,
    layer_count: 1,
};

pub struct VulkanBinding {
    instance: Arc<InnerInstance>,
    backend: Option<VkBackend>,
    session_binding: Option<Box<xr::GraphicsBindingVulkanKHR>>,
}

impl VulkanBinding {
    pub fn new(instance: Arc<InnerInstance>) -> Self {
        Self {
            instance,
            backend: None,
            session_binding: None,
        }
    }

    fn backend(&mut self) -> XrResult<&mut VkBackend> {
        self.backend.as_mut().ok_or_else(|| {
            XrError::Usage("The Vulkan binding was used before its requirements were checked".to_owned())
        })
    }
}

impl GraphicsBinding for VulkanBinding {
    fn binding_type(&self) -> GraphicsBindingType {
        GraphicsBindingType::Vulkan
    }

    fn check_version_requirements(
        &mut self,
        host: &HostGraphicsContext,
        system: xr::SystemId,
    ) -> XrResult<()> {
        if !matches!(host, HostGraphicsContext::Vulkan(_)) {
            return Err(XrError::Usage(
                "The Vulkan binding needs a Vulkan host context".to_owned(),
            ));
        }
        if self.backend.is_none() {
            self.backend = Some(unsafe { VkBackend::new_openxr(&self.instance, system)? });
        }
        Ok(())
    }

    fn init_from_host_context(
        &mut self,
        host: &HostGraphicsContext,
        system: xr::SystemId,
    ) -> XrResult<()> {
        if self.backend.is_none() {
            self.check_version_requirements(host, system)?;
        }
        let backend = self.backend()?;

        if let HostGraphicsContext::Vulkan(identity) = host {
            backend.zero_copy =
                zero_copy_transfer(backend.external_memory, &backend.identity, identity)
                    == TransferMode::ZeroCopy;
        }
        info!(
            "Vulkan swapchain uploads use {}",
            if backend.zero_copy {
                "imported device memory"
            } else {
                "CPU staging"
            }
        );

        let binding = xr::GraphicsBindingVulkanKHR {
            ty: xr::GraphicsBindingVulkanKHR::TYPE,
            next: std::ptr::null(),
            instance: backend.instance.handle().as_raw() as _,
            physical_device: backend.physical_device.as_raw() as _,
            device: backend.device.handle().as_raw() as _,
            queue_family_index: backend.graphics_queue_family,
            queue_index: 0,
        };
        self.session_binding = Some(Box::new(binding));
        Ok(())
    }

    fn session_create_next(&self) -> *const c_void {
        self.session_binding
            .as_deref()
            .map_or(std::ptr::null(), |binding| binding as *const _ as *const c_void)
    }

    fn choose_swapchain_format(&self, runtime_formats: &[i64]) -> Option<ChosenFormat> {
        choose_swapchain_format(&CANDIDATE_FORMATS, runtime_formats, |format| {
            format.to_vk().map(|format| format.as_raw() as i64)
        })
    }

    fn swapchain_usage(&self) -> xr::SwapchainUsageFlags {
        xr::SwapchainUsageFlags::COLOR_ATTACHMENT | xr::SwapchainUsageFlags::TRANSFER_DST
    }

    fn create_swapchain_images(
        &mut self,
        swapchain: xr::Swapchain,
    ) -> XrResult<Vec<SwapchainImage>> {
        let core = &self.instance.core;
        let images = unsafe {
            call_enumerate(
                |capacity, count, out: *mut xr::SwapchainImageVulkanKHR| {
                    (core.enumerate_swapchain_images)(swapchain, capacity, count, out as _)
                },
                out_struct!(xr::SwapchainImageVulkanKHR),
            )
        }
        .or_fail("Failed to get swapchain image data.")?;

        Ok(images
            .into_iter()
            .map(|image| SwapchainImage { raw: image.image })
            .collect())
    }

    fn submit_to_swapchain_image(
        &mut self,
        image: &SwapchainImage,
        draw_info: &DrawViewInfo,
        rendered: &RenderedView,
    ) -> XrResult<()> {
        let backend = self.backend()?;
        let target = vk::Image::from_raw(image.raw);

        match rendered {
            RenderedView::CpuPixels {
                data,
                width,
                height,
            } => {
                check_cpu_pixels(draw_info, data, *width, *height)?;
                unsafe { backend.upload_pixels(target, draw_info, data, *width, *height) }
                    .map_err(|err| graphics_error("Failed to upload into the swapchain image", err))
            }
            #[cfg(target_os = "linux")]
            RenderedView::ExportedMemory {
                fd,
                allocation_size,
                width,
                height,
            } => {
                if !backend.zero_copy {
                    return Err(unsupported_submission(
                        rendered,
                        "The host's Vulkan device cannot share memory with the OpenXR runtime's device",
                    ));
                }
                let image_info = graphics_interop::ImageCreateInfo {
                    width: *width,
                    height: *height,
                    layers: 1,
                    mip_count: 1,
                    sample_count: 1,
                    format: draw_info.image_format,
                };
                unsafe { backend.copy_imported(target, draw_info, &image_info, *fd, *allocation_size) }
                    .map_err(|err| graphics_error("Failed to copy into the swapchain image", err))
            }
            _ => Err(unsupported_submission(
                rendered,
                "The Vulkan binding accepts CPU pixel or exported memory submissions only",
            )),
        }
    }

    fn needs_upside_down_drawing(&self, _host: &HostGraphicsContext) -> bool {
        false
    }

    fn transfer_mode(&self) -> TransferMode {
        match &self.backend {
            Some(backend) if backend.zero_copy => TransferMode::ZeroCopy,
            _ => TransferMode::Cpu,
        }
    }
}

/// Imported fds only exist on Linux, and only between the same physical device and driver.
fn zero_copy_transfer(
    external_memory: bool,
    runtime: &VulkanDeviceIdentity,
    host: &VulkanDeviceIdentity,
) -> TransferMode {
    if cfg!(target_os = "linux") && external_memory && runtime == host {
        TransferMode::ZeroCopy
    } else {
        TransferMode::Cpu
    }
}

/// The Vulkan device the runtime asked for, created through `XR_KHR_vulkan_enable2`.
struct VkBackend {
    _entry: Entry,
    instance: Instance,
    device: Device,
    debug_messenger: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,

    physical_device: vk::PhysicalDevice,
    identity: VulkanDeviceIdentity,
    graphics_queue_family: u32,
    graphics_queue: vk::Queue,

    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,

    interop: VulkanInterop,
    staging: Option<StagingBuffer>,
    external_memory: bool,
    zero_copy: bool,
}

fn vk_error(what: &str, result: vk::Result) -> XrError {
    XrError::Graphics(format!("{}: {}", what, result))
}

impl VkBackend {
    unsafe fn new_openxr(inner: &InnerInstance, system_id: xr::SystemId) -> XrResult<VkBackend> {
        let vulkan = inner
            .exts
            .khr_vulkan_enable2
            .as_ref()
            .ok_or(XrError::NoGraphicsBinding)?;
        let xr_instance = inner.handle;

        let entry = Entry::load()
            .map_err(|err| XrError::Requirements(format!("Failed to load Vulkan: {}", err)))?;

        let mut reqs = out_struct!(xr::GraphicsRequirementsVulkanKHR);
        (vulkan.get_vulkan_graphics_requirements2)(xr_instance, system_id, &mut reqs)
            .result()
            .or_fail("Failed to get Vulkan graphics requirements of the OpenXR runtime.")?;

        let min = reqs.min_api_version_supported;
        let api_version = if (min.major(), min.minor()) > (1, 1) {
            vk::make_api_version(0, min.major() as u32, min.minor() as u32, 0)
        } else {
            vk::make_api_version(0, 1, 1, 0)
        };
        let loader_version = entry
            .try_enumerate_instance_version()
            .ok()
            .flatten()
            .unwrap_or(vk::API_VERSION_1_0);
        if loader_version < api_version {
            return Err(XrError::Requirements(format!(
                "The OpenXR runtime requires Vulkan {}.{}, the Vulkan loader supports {}.{}.",
                vk::api_version_major(api_version),
                vk::api_version_minor(api_version),
                vk::api_version_major(loader_version),
                vk::api_version_minor(loader_version)
            )));
        }

        let instance_extensions: Vec<*const c_char> = if inner.debug {
            vec![DebugUtils::name().as_ptr()]
        } else {
            Vec::new()
        };

        let engine_name = CString::new(ENGINE_NAME).unwrap_or_default();
        let app_info = vk::ApplicationInfo::builder()
            .engine_name(&engine_name)
            .application_version(0)
            .api_version(api_version);

        let instance_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&instance_extensions);

        let vk_instance = {
            let mut vk_instance = vk::Instance::null();
            let mut vk_result = vk::Result::default();

            (vulkan.create_vulkan_instance)(
                xr_instance,
                &xr::VulkanInstanceCreateInfoKHR {
                    ty: xr::VulkanInstanceCreateInfoKHR::TYPE,
                    next: std::ptr::null_mut(),
                    system_id,
                    create_flags: xr::VulkanInstanceCreateFlagsKHR::EMPTY,
                    pfn_get_instance_proc_addr: Some(std::mem::transmute(
                        entry.static_fn().get_instance_proc_addr,
                    )),
                    vulkan_create_info: &*instance_info as *const _ as _,
                    vulkan_allocator: std::ptr::null(),
                },
                &mut vk_instance as *mut _ as _,
                &mut vk_result as *mut _ as _,
            )
            .result()
            .or_fail("Failed to create a Vulkan instance through the OpenXR runtime.")?;
            vk_result
                .result()
                .map_err(|err| vk_error("Failed to create a Vulkan instance", err))?;

            Instance::load(entry.static_fn(), vk_instance)
        };

        let debug_messenger = if inner.debug {
            match create_debug_callback(&entry, &vk_instance) {
                Ok(messenger) => Some(messenger),
                Err(err) => {
                    warn!("Failed to create Vulkan debug messenger: {}", err);
                    None
                }
            }
        } else {
            None
        };

        let destroy_instance = |debug_messenger: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>| {
            if let Some((debug_utils, messenger)) = debug_messenger {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            vk_instance.destroy_instance(None);
        };

        let mut physical_device = vk::PhysicalDevice::null();
        if let Err(result) = (vulkan.get_vulkan_graphics_device2)(
            xr_instance,
            &xr::VulkanGraphicsDeviceGetInfoKHR {
                ty: xr::VulkanGraphicsDeviceGetInfoKHR::TYPE,
                next: std::ptr::null(),
                system_id,
                vulkan_instance: vk_instance.handle().as_raw() as _,
            },
            &mut physical_device as *mut _ as _,
        )
        .result()
        {
            destroy_instance(debug_messenger);
            return Err(XrError::runtime(
                "Failed to get the Vulkan device of the OpenXR runtime.",
                result,
            ));
        }

        let identity = device_identity(&vk_instance, physical_device);

        let graphics_queue_family = match vk_instance
            .get_physical_device_queue_family_properties(physical_device)
            .into_iter()
            .enumerate()
            .find_map(|(queue_family_index, info)| {
                if info.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                    Some(queue_family_index as u32)
                } else {
                    None
                }
            }) {
            Some(family) => family,
            None => {
                destroy_instance(debug_messenger);
                return Err(XrError::Requirements(
                    "Vulkan device has no graphics queue".to_owned(),
                ));
            }
        };

        let available = vk_instance
            .enumerate_device_extension_properties(physical_device)
            .unwrap_or_default()
            .iter()
            .map(|properties| CStr::from_ptr(properties.extension_name.as_ptr()).to_owned())
            .collect::<Vec<_>>();
        let wanted = graphics_interop::apis::vulkan::external_memory_device_extensions();
        let external_memory = wanted
            .iter()
            .all(|name| available.iter().any(|available| available.as_c_str() == *name));
        let device_extension_names: Vec<*const c_char> = if external_memory {
            wanted.iter().map(|name| name.as_ptr()).collect()
        } else {
            Vec::new()
        };

        let queue_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(graphics_queue_family)
            .queue_priorities(&[1.0]);

        let features = vk::PhysicalDeviceFeatures::default();

        let device_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(slice::from_ref(&queue_info))
            .enabled_extension_names(&device_extension_names[..])
            .enabled_features(&features);

        let device = {
            let mut device = vk::Device::null();
            let mut vk_result = vk::Result::default();

            let xr_result = (vulkan.create_vulkan_device)(
                xr_instance,
                &xr::VulkanDeviceCreateInfoKHR {
                    ty: xr::VulkanDeviceCreateInfoKHR::TYPE,
                    next: std::ptr::null_mut(),
                    system_id,
                    create_flags: xr::VulkanDeviceCreateFlagsKHR::EMPTY,
                    pfn_get_instance_proc_addr: std::mem::transmute(
                        entry.static_fn().get_instance_proc_addr,
                    ),
                    vulkan_physical_device: physical_device.as_raw() as _,
                    vulkan_create_info: &*device_info as *const _ as _,
                    vulkan_allocator: std::ptr::null_mut(),
                },
                &mut device as *mut _ as _,
                &mut vk_result as *mut _ as _,
            );

            if let Err(result) = xr_result.result() {
                destroy_instance(debug_messenger);
                return Err(XrError::runtime(
                    "Failed to create a Vulkan device through the OpenXR runtime.",
                    result,
                ));
            } else if let Err(err) = vk_result.result() {
                destroy_instance(debug_messenger);
                return Err(vk_error("Failed to create a Vulkan device", err));
            }

            Device::load(vk_instance.fp_v1_0(), device)
        };

        let graphics_queue = device.get_device_queue(graphics_queue_family, 0);
        let command_objects = create_command_pool(&device, graphics_queue_family).and_then(|pool| {
            match device.allocate_command_buffers(
                &vk::CommandBufferAllocateInfo::builder()
                    .command_pool(pool)
                    .level(vk::CommandBufferLevel::PRIMARY)
                    .command_buffer_count(1),
            ) {
                Ok(buffers) => Ok((pool, buffers[0])),
                Err(err) => {
                    device.destroy_command_pool(pool, None);
                    Err(err)
                }
            }
        });
        let (command_pool, command_buffer) = match command_objects {
            Ok(objects) => objects,
            Err(err) => {
                device.destroy_device(None);
                destroy_instance(debug_messenger);
                return Err(vk_error("Failed to create a Vulkan command pool", err));
            }
        };

        let interop = VulkanInterop::new(&vk_instance, physical_device, &device);

        Ok(VkBackend {
            _entry: entry,
            instance: vk_instance,
            device,
            debug_messenger,
            physical_device,
            identity,
            graphics_queue_family,
            graphics_queue,
            command_pool,
            command_buffer,
            interop,
            staging: None,
            external_memory,
            zero_copy: false,
        })
    }

    fn staging_buffer(&mut self, size: vk::DeviceSize) -> VkResult<&StagingBuffer> {
        if self.staging.as_ref().map_or(true, |staging| staging.size < size) {
            if let Some(staging) = self.staging.take() {
                self.interop.destroy_staging_buffer(staging);
            }
            self.staging = Some(self.interop.create_staging_buffer(size)?);
        }
        self.staging.as_ref().ok_or(vk::Result::ERROR_OUT_OF_HOST_MEMORY)
    }

    unsafe fn upload_pixels(
        &mut self,
        target: vk::Image,
        draw_info: &DrawViewInfo,
        data: &[u8],
        width: u32,
        height: u32,
    ) -> VkResult<()> {
        let size = width as usize * height as usize * draw_info.image_format.bytes_per_pixel();
        let staging = self.staging_buffer(size as vk::DeviceSize)?;
        std::ptr::copy_nonoverlapping(data.as_ptr(), staging.mapped, size);
        let buffer = staging.buffer;

        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: COLOR_LAYERS,
            image_offset: vk::Offset3D {
                x: draw_info.offset_x,
                y: draw_info.offset_y,
                z: 0,
            },
            image_extent: vk::Extent3D {
                width,
                height,
                depth: 1,
            },
        };

        self.record_and_submit(target, |device, command_buffer| {
            device.cmd_copy_buffer_to_image(
                command_buffer,
                buffer,
                target,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                slice::from_ref(&region),
            );
        })
    }

    #[cfg(target_os = "linux")]
    unsafe fn copy_imported(
        &mut self,
        target: vk::Image,
        draw_info: &DrawViewInfo,
        image_info: &graphics_interop::ImageCreateInfo,
        fd: i32,
        allocation_size: u64,
    ) -> VkResult<()> {
        let (source, memory) = self.interop.import_image(image_info, fd, allocation_size)?;

        let region = vk::ImageCopy {
            src_subresource: COLOR_LAYERS,
            src_offset: vk::Offset3D::default(),
            dst_subresource: COLOR_LAYERS,
            dst_offset: vk::Offset3D {
                x: draw_info.offset_x,
                y: draw_info.offset_y,
                z: 0,
            },
            extent: vk::Extent3D {
                width: image_info.width.min(draw_info.width),
                height: image_info.height.min(draw_info.height),
                depth: 1,
            },
        };

        let result = self.record_and_submit(target, |device, command_buffer| {
            device.cmd_copy_image(
                command_buffer,
                source,
                vk::ImageLayout::GENERAL,
                target,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                slice::from_ref(&region),
            );
        });

        self.device.destroy_image(source, None);
        self.device.free_memory(memory, None);
        result
    }

    /// Moves `target` into a transfer layout around `record` and waits for completion.
    /// Swapchain images are handed out and returned in `COLOR_ATTACHMENT_OPTIMAL`.
    unsafe fn record_and_submit(
        &self,
        target: vk::Image,
        record: impl FnOnce(&Device, vk::CommandBuffer),
    ) -> VkResult<()> {
        let device = &self.device;
        let command_buffer = self.command_buffer;

        device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;
        device.begin_command_buffer(
            command_buffer,
            &vk::CommandBufferBeginInfo::builder()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
        )?;

        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[vk::ImageMemoryBarrier {
                src_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                dst_access_mask: vk::AccessFlags::TRANSFER_WRITE,
                old_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                image: target,
                subresource_range: COLOR_SUBRESOURCE,
                ..Default::default()
            }],
        );

        record(device, command_buffer);

        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[vk::ImageMemoryBarrier {
                src_access_mask: vk::AccessFlags::TRANSFER_WRITE,
                dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                new_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                image: target,
                subresource_range: COLOR_SUBRESOURCE,
                ..Default::default()
            }],
        );

        device.end_command_buffer(command_buffer)?;
        device.queue_submit(
            self.graphics_queue,
            &[vk::SubmitInfo::builder()
                .command_buffers(slice::from_ref(&command_buffer))
                .build()],
            vk::Fence::null(),
        )?;
        device.queue_wait_idle(self.graphics_queue)
    }
}

impl Drop for VkBackend {
    fn drop(&mut self) {
        unsafe {
            if let Err(err) = self.device.device_wait_idle() {
                error!("vkDeviceWaitIdle failed: {}", err);
            }
            if let Some(staging) = self.staging.take() {
                self.interop.destroy_staging_buffer(staging);
            }
            self.device.destroy_command_pool(self.command_pool, None);
            self.device.destroy_device(None);
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

unsafe fn device_identity(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
) -> VulkanDeviceIdentity {
    let mut id_properties = vk::PhysicalDeviceIDProperties::default();
    let mut properties = vk::PhysicalDeviceProperties2::builder().push_next(&mut id_properties);
    instance.get_physical_device_properties2(physical_device, &mut properties);

    VulkanDeviceIdentity {
        device_uuid: id_properties.device_uuid,
        driver_uuid: id_properties.driver_uuid,
        device_luid: id_properties.device_luid,
        device_node_mask: id_properties.device_node_mask,
        device_luid_valid: id_properties.device_luid_valid == vk::TRUE,
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let callback_data = *p_callback_data;

    let message_id_name = if callback_data.p_message_id_name.is_null() {
        Cow::from("")
    } else {
        CStr::from_ptr(callback_data.p_message_id_name).to_string_lossy()
    };

    let message = if callback_data.p_message.is_null() {
        Cow::from("")
    } else {
        CStr::from_ptr(callback_data.p_message).to_string_lossy()
    };

    let level = if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else {
        log::Level::Debug
    };

    log::log!(
        level,
        "{:?} [{} ({})] : {}",
        message_type,
        message_id_name,
        callback_data.message_id_number,
        message,
    );

    vk::FALSE
}

unsafe fn create_debug_callback(
    entry: &Entry,
    instance: &Instance,
) -> VkResult<(DebugUtils, vk::DebugUtilsMessengerEXT)> {
    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    let debug_utils_loader = DebugUtils::new(entry, instance);
    let messenger = debug_utils_loader.create_debug_utils_messenger(&debug_info, None)?;
    Ok((debug_utils_loader, messenger))
}

unsafe fn create_command_pool(device: &Device, queue_family: u32) -> VkResult<vk::CommandPool> {
    let pool_create_info = vk::CommandPoolCreateInfo::builder()
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
        .queue_family_index(queue_family);

    device.create_command_pool(&pool_create_info, None)
}
