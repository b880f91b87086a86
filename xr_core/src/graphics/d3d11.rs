use std::ffi::{c_void, CStr};
use std::sync::Arc;

use graphics_interop::ImageFormat;
use log::{debug, info};
use openxr::sys as xr;
use windows::Win32::Graphics::Direct3D11::{
    ID3D11Device, ID3D11DeviceContext, ID3D11Texture2D, D3D11_BOX,
};

use super::{
    check_cpu_pixels, choose_swapchain_format, graphics_error, unsupported_submission,
    ChosenFormat, GraphicsBinding,
};
use crate::config::GraphicsBindingType;
use crate::error::{ResultExt, XrError, XrResult};
use crate::runtime::{call_enumerate, InnerInstance};
use crate::types::{DrawViewInfo, HostGraphicsContext, RenderedView, SwapchainImage};
use crate::ToResult;

const CANDIDATE_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Rgba16Float,
    ImageFormat::Rgba8Unorm,
    ImageFormat::Rgba8UnormSrgb,
    ImageFormat::Bgra8Unorm,
    ImageFormat::Bgra8UnormSrgb,
];

const TYPE_GRAPHICS_BINDING_D3D11: xr::StructureType = xr::StructureType::from_raw(1000027000);
const TYPE_SWAPCHAIN_IMAGE_D3D11: xr::StructureType = xr::StructureType::from_raw(1000027001);
const TYPE_GRAPHICS_REQUIREMENTS_D3D11: xr::StructureType =
    xr::StructureType::from_raw(1000027002);

#[repr(C)]
struct GraphicsBindingD3D11 {
    ty: xr::StructureType,
    next: *const c_void,
    device: *mut c_void,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct SwapchainImageD3D11 {
    ty: xr::StructureType,
    next: *mut c_void,
    texture: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct Luid {
    low_part: u32,
    high_part: i32,
}

#[repr(C)]
struct GraphicsRequirementsD3D11 {
    ty: xr::StructureType,
    next: *mut c_void,
    adapter_luid: Luid,
    min_feature_level: i32,
}

type GetD3D11GraphicsRequirements = unsafe extern "system" fn(
    xr::Instance,
    xr::SystemId,
    *mut GraphicsRequirementsD3D11,
) -> xr::Result;

pub struct D3D11Binding {
    instance: Arc<InnerInstance>,
    get_requirements: GetD3D11GraphicsRequirements,
    device: Option<ID3D11Device>,
    context: Option<ID3D11DeviceContext>,
    session_binding: Option<Box<GraphicsBindingD3D11>>,
}

impl D3D11Binding {
    pub fn new(instance: Arc<InnerInstance>) -> XrResult<Self> {
        let name = CStr::from_bytes_with_nul(b"xrGetD3D11GraphicsRequirementsKHR\0")
            .map_err(|err| XrError::Usage(err.to_string()))?;
        let get_requirements = unsafe { instance.get_instance_proc_addr(name) }
            .or_fail("Failed to load xrGetD3D11GraphicsRequirementsKHR.")?;

        Ok(Self {
            instance,
            get_requirements: unsafe { std::mem::transmute(get_requirements) },
            device: None,
            context: None,
            session_binding: None,
        })
    }

    fn host_device(host: &HostGraphicsContext) -> XrResult<ID3D11Device> {
        let HostGraphicsContext::D3D11 { device } = host else {
            return Err(XrError::Usage(
                "The D3D11 binding needs a D3D11 host device".to_owned(),
            ));
        };
        unsafe { windows::core::from_raw_borrowed::<ID3D11Device>(device) }
            .cloned()
            .ok_or_else(|| XrError::Usage("The host did not provide a D3D11 device".to_owned()))
    }

    fn context(&self) -> XrResult<&ID3D11DeviceContext> {
        self.context.as_ref().ok_or_else(|| {
            XrError::Usage("The D3D11 binding was used before it was initialized".to_owned())
        })
    }
}

impl GraphicsBinding for D3D11Binding {
    fn binding_type(&self) -> GraphicsBindingType {
        GraphicsBindingType::D3D11
    }

    fn check_version_requirements(
        &mut self,
        host: &HostGraphicsContext,
        system: xr::SystemId,
    ) -> XrResult<()> {
        let device = Self::host_device(host)?;

        let mut requirements = GraphicsRequirementsD3D11 {
            ty: TYPE_GRAPHICS_REQUIREMENTS_D3D11,
            next: std::ptr::null_mut(),
            adapter_luid: Luid::default(),
            min_feature_level: 0,
        };
        unsafe { (self.get_requirements)(self.instance.handle, system, &mut requirements) }
            .result()
            .or_fail("Failed to get D3D11 graphics requirements of the OpenXR runtime.")?;
        debug!(
            "OpenXR runtime requires D3D11 adapter {:?}",
            requirements.adapter_luid
        );

        let feature_level = unsafe { device.GetFeatureLevel() }.0;
        if feature_level < requirements.min_feature_level {
            return Err(XrError::Requirements(format!(
                "The OpenXR runtime requires D3D feature level {:#x}, the host device has {:#x}.",
                requirements.min_feature_level, feature_level
            )));
        }
        info!("Using D3D11 feature level {:#x}", feature_level);

        self.device = Some(device);
        Ok(())
    }

    fn init_from_host_context(
        &mut self,
        host: &HostGraphicsContext,
        _system: xr::SystemId,
    ) -> XrResult<()> {
        let device = match self.device.take() {
            Some(device) => device,
            None => Self::host_device(host)?,
        };
        let context = unsafe { device.GetImmediateContext() }
            .map_err(|err| graphics_error("Failed to get the D3D11 immediate context", err))?;

        self.session_binding = Some(Box::new(GraphicsBindingD3D11 {
            ty: TYPE_GRAPHICS_BINDING_D3D11,
            next: std::ptr::null(),
            device: windows::core::Interface::as_raw(&device),
        }));
        self.device = Some(device);
        self.context = Some(context);
        Ok(())
    }

    fn session_create_next(&self) -> *const c_void {
        self.session_binding
            .as_deref()
            .map_or(std::ptr::null(), |binding| binding as *const _ as *const c_void)
    }

    fn choose_swapchain_format(&self, runtime_formats: &[i64]) -> Option<ChosenFormat> {
        choose_swapchain_format(&CANDIDATE_FORMATS, runtime_formats, |format| {
            format.to_dxgi().map(i64::from)
        })
    }

    fn create_swapchain_images(
        &mut self,
        swapchain: xr::Swapchain,
    ) -> XrResult<Vec<SwapchainImage>> {
        let core = &self.instance.core;
        let images = unsafe {
            call_enumerate(
                |capacity, count, out: *mut SwapchainImageD3D11| {
                    (core.enumerate_swapchain_images)(swapchain, capacity, count, out as _)
                },
                SwapchainImageD3D11 {
                    ty: TYPE_SWAPCHAIN_IMAGE_D3D11,
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
        let context = self.context()?;
        let target_raw = image.raw as *mut c_void;
        let target = unsafe { windows::core::from_raw_borrowed::<ID3D11Texture2D>(&target_raw) }
            .ok_or_else(|| XrError::Graphics("Invalid swapchain texture".to_owned()))?;

        let dst_x = draw_info.offset_x.max(0) as u32;
        let dst_y = draw_info.offset_y.max(0) as u32;

        match rendered {
            RenderedView::Texture(source) => {
                let source = unsafe { windows::core::from_raw_borrowed::<ID3D11Texture2D>(source) }
                    .ok_or_else(|| XrError::Usage("The host submitted a null texture".to_owned()))?;
                let src_box = D3D11_BOX {
                    left: 0,
                    top: 0,
                    front: 0,
                    right: draw_info.width,
                    bottom: draw_info.height,
                    back: 1,
                };
                unsafe {
                    context.CopySubresourceRegion(target, 0, dst_x, dst_y, 0, source, 0, Some(&src_box));
                }
                Ok(())
            }
            RenderedView::CpuPixels {
                data,
                width,
                height,
            } => {
                check_cpu_pixels(draw_info, data, *width, *height)?;
                let dst_box = D3D11_BOX {
                    left: dst_x,
                    top: dst_y,
                    front: 0,
                    right: dst_x + width,
                    bottom: dst_y + height,
                    back: 1,
                };
                let row_pitch = *width * draw_info.image_format.bytes_per_pixel() as u32;
                unsafe {
                    context.UpdateSubresource(
                        target,
                        0,
                        Some(&dst_box),
                        data.as_ptr() as *const c_void,
                        row_pitch,
                        0,
                    );
                }
                Ok(())
            }
            _ => Err(unsupported_submission(
                rendered,
                "The D3D11 binding accepts texture or CPU pixel submissions only",
            )),
        }
    }

    fn needs_upside_down_drawing(&self, _host: &HostGraphicsContext) -> bool {
        true
    }
}
