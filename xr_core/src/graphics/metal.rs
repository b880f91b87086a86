use std::ffi::{c_void, CStr};
use std::sync::Arc;

use foreign_types::ForeignTypeRef;
use graphics_interop::ImageFormat;
use log::info;
use metal::{CommandQueue, CommandQueueRef, MTLOrigin, MTLRegion, MTLSize, TextureRef};
use openxr::sys as xr;

use super::{
    check_cpu_pixels, choose_swapchain_format, unsupported_submission, ChosenFormat,
    GraphicsBinding,
};
use crate::config::GraphicsBindingType;
use crate::error::{ResultExt, XrError, XrResult};
use crate::runtime::{call_enumerate, InnerInstance};
use crate::types::{DrawViewInfo, HostGraphicsContext, RenderedView, SwapchainImage};
use crate::ToResult;

const CANDIDATE_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Rgba16Float,
    ImageFormat::Rgba8Unorm,
    ImageFormat::Bgra8Unorm,
    ImageFormat::Rgba8UnormSrgb,
    ImageFormat::Bgra8UnormSrgb,
];

const TYPE_GRAPHICS_BINDING_METAL: xr::StructureType = xr::StructureType::from_raw(1000029000);
const TYPE_SWAPCHAIN_IMAGE_METAL: xr::StructureType = xr::StructureType::from_raw(1000029001);
const TYPE_GRAPHICS_REQUIREMENTS_METAL: xr::StructureType =
    xr::StructureType::from_raw(1000029002);

#[repr(C)]
struct GraphicsBindingMetal {
    ty: xr::StructureType,
    next: *const c_void,
    command_queue: *mut c_void,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct SwapchainImageMetal {
    ty: xr::StructureType,
    next: *mut c_void,
    texture: *mut c_void,
}

#[repr(C)]
struct GraphicsRequirementsMetal {
    ty: xr::StructureType,
    next: *mut c_void,
    metal_device: *mut c_void,
}

type GetMetalGraphicsRequirements = unsafe extern "system" fn(
    xr::Instance,
    xr::SystemId,
    *mut GraphicsRequirementsMetal,
) -> xr::Result;

pub struct MetalBinding {
    instance: Arc<InnerInstance>,
    get_requirements: GetMetalGraphicsRequirements,
    queue: Option<CommandQueue>,
    session_binding: Option<Box<GraphicsBindingMetal>>,
}

impl MetalBinding {
    pub fn new(instance: Arc<InnerInstance>) -> XrResult<Self> {
        let name = CStr::from_bytes_with_nul(b"xrGetMetalGraphicsRequirementsKHR\0")
            .map_err(|err| XrError::Usage(err.to_string()))?;
        let get_requirements = unsafe { instance.get_instance_proc_addr(name) }
            .or_fail("Failed to load xrGetMetalGraphicsRequirementsKHR.")?;

        Ok(Self {
            instance,
            get_requirements: unsafe { std::mem::transmute(get_requirements) },
            queue: None,
            session_binding: None,
        })
    }

    fn host_queue(host: &HostGraphicsContext) -> XrResult<CommandQueue> {
        match host {
            HostGraphicsContext::Metal { command_queue } if !command_queue.is_null() => {
                Ok(unsafe { CommandQueueRef::from_ptr(*command_queue as _) }.to_owned())
            }
            _ => Err(XrError::Usage(
                "The Metal binding needs the host's Metal command queue".to_owned(),
            )),
        }
    }

    fn queue(&self) -> XrResult<&CommandQueue> {
        self.queue.as_ref().ok_or_else(|| {
            XrError::Usage("The Metal binding was used before it was initialized".to_owned())
        })
    }
}

impl GraphicsBinding for MetalBinding {
    fn binding_type(&self) -> GraphicsBindingType {
        GraphicsBindingType::Metal
    }

    fn check_version_requirements(
        &mut self,
        host: &HostGraphicsContext,
        system: xr::SystemId,
    ) -> XrResult<()> {
        let queue = Self::host_queue(host)?;

        let mut requirements = GraphicsRequirementsMetal {
            ty: TYPE_GRAPHICS_REQUIREMENTS_METAL,
            next: std::ptr::null_mut(),
            metal_device: std::ptr::null_mut(),
        };
        unsafe { (self.get_requirements)(self.instance.handle, system, &mut requirements) }
            .result()
            .or_fail("Failed to get Metal graphics requirements of the OpenXR runtime.")?;

        let device = queue.device();
        if device.as_ptr() as *mut c_void != requirements.metal_device {
            return Err(XrError::Requirements(format!(
                "The OpenXR runtime requires a different Metal device than the host's \"{}\".",
                device.name()
            )));
        }
        info!("Using Metal device {}", device.name());

        self.queue = Some(queue);
        Ok(())
    }

    fn init_from_host_context(
        &mut self,
        host: &HostGraphicsContext,
        _system: xr::SystemId,
    ) -> XrResult<()> {
        if self.queue.is_none() {
            self.queue = Some(Self::host_queue(host)?);
        }
        let queue = self.queue()?;
        let binding = GraphicsBindingMetal {
            ty: TYPE_GRAPHICS_BINDING_METAL,
            next: std::ptr::null(),
            command_queue: queue.as_ptr() as *mut c_void,
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
            format.to_mtl().map(|format| format as i64)
        })
    }

    fn create_swapchain_images(
        &mut self,
        swapchain: xr::Swapchain,
    ) -> XrResult<Vec<SwapchainImage>> {
        let core = &self.instance.core;
        let images = unsafe {
            call_enumerate(
                |capacity, count, out: *mut SwapchainImageMetal| {
                    (core.enumerate_swapchain_images)(swapchain, capacity, count, out as _)
                },
                SwapchainImageMetal {
                    ty: TYPE_SWAPCHAIN_IMAGE_METAL,
                    next: std::ptr::null_mut(),
                    texture: std::ptr::null_mut(),
                },
            )
        }
        .or_fail("Failed to get swapchain image data.")?;

        Ok(images
            .into_iter()
            .map(|image| SwapchainImage {
                raw: image.texture as u64,
            })
            .collect())
    }

    fn submit_to_swapchain_image(
        &mut self,
        image: &SwapchainImage,
        draw_info: &DrawViewInfo,
        rendered: &RenderedView,
    ) -> XrResult<()> {
        let queue = self.queue()?;
        if image.raw == 0 {
            return Err(XrError::Graphics("Invalid swapchain texture".to_owned()));
        }
        let target = unsafe { TextureRef::from_ptr(image.raw as _) };
        let origin = MTLOrigin {
            x: draw_info.offset_x.max(0) as u64,
            y: draw_info.offset_y.max(0) as u64,
            z: 0,
        };

        match rendered {
            RenderedView::Texture(source) if !source.is_null() => {
                let source = unsafe { TextureRef::from_ptr(*source as _) };
                let size = MTLSize {
                    width: u64::from(draw_info.width),
                    height: u64::from(draw_info.height),
                    depth: 1,
                };

                let command_buffer = queue.new_command_buffer();
                let blit = command_buffer.new_blit_command_encoder();
                blit.copy_from_texture(
                    source,
                    0,
                    0,
                    MTLOrigin { x: 0, y: 0, z: 0 },
                    size,
                    target,
                    0,
                    0,
                    origin,
                );
                blit.end_encoding();
                command_buffer.commit();
                command_buffer.wait_until_completed();
                Ok(())
            }
            RenderedView::CpuPixels {
                data,
                width,
                height,
            } => {
                check_cpu_pixels(draw_info, data, *width, *height)?;
                let region = MTLRegion {
                    origin,
                    size: MTLSize {
                        width: u64::from(*width),
                        height: u64::from(*height),
                        depth: 1,
                    },
                };
                let bytes_per_row = u64::from(*width) * draw_info.image_format.bytes_per_pixel() as u64;
                target.replace_region(region, 0, data.as_ptr() as *const c_void, bytes_per_row);
                Ok(())
            }
            _ => Err(unsupported_submission(
                rendered,
                "The Metal binding accepts texture or CPU pixel submissions only",
            )),
        }
    }

    fn needs_upside_down_drawing(&self, _host: &HostGraphicsContext) -> bool {
        false
    }
}
