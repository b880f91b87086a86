mod platform;

use std::ffi::c_void;
use std::sync::Arc;

use graphics_interop::apis::opengl::{OpenGLInterop, Region};
use graphics_interop::ImageFormat;
use log::{info, warn};
use openxr::sys as xr;

use self::platform::{GlContext, SessionBinding};
use super::{
    check_cpu_pixels, choose_swapchain_format, graphics_error, unsupported_submission,
    ChosenFormat, GraphicsBinding,
};
use crate::config::GraphicsBindingType;
use crate::error::{ResultExt, XrError, XrResult};
use crate::runtime::{call_enumerate, out_struct, InnerInstance};
use crate::types::{DrawViewInfo, HostGraphicsContext, RenderedView, SwapchainImage};
use crate::ToResult;

const CANDIDATE_FORMATS: [ImageFormat; 3] = [
    ImageFormat::Rgba16Float,
    ImageFormat::Rgba8Unorm,
    ImageFormat::Rgba8UnormSrgb,
];

pub struct OpenGlBinding {
    instance: Arc<InnerInstance>,
    context: Option<GlContext>,
    interop: Option<OpenGLInterop>,
    session_binding: Option<Box<SessionBinding>>,
}

impl OpenGlBinding {
    pub fn new(instance: Arc<InnerInstance>) -> Self {
        Self {
            instance,
            context: None,
            interop: None,
            session_binding: None,
        }
    }

    fn platform_context(host: &HostGraphicsContext) -> XrResult<GlContext> {
        match host {
            HostGraphicsContext::OpenGl { platform, .. } => GlContext::from_host(platform),
            _ => Err(XrError::Usage(
                "The OpenGL binding needs an OpenGL host context".to_owned(),
            )),
        }
    }

    fn interop(&mut self) -> XrResult<&mut OpenGLInterop> {
        self.interop.as_mut().ok_or_else(|| {
            XrError::Usage("The OpenGL binding was used before its requirements were checked".to_owned())
        })
    }
}

impl GraphicsBinding for OpenGlBinding {
    fn binding_type(&self) -> GraphicsBindingType {
        GraphicsBindingType::OpenGl
    }

    fn check_version_requirements(
        &mut self,
        host: &HostGraphicsContext,
        system: xr::SystemId,
    ) -> XrResult<()> {
        let opengl = self
            .instance
            .exts
            .khr_opengl_enable
            .as_ref()
            .ok_or(XrError::NoGraphicsBinding)?;

        let mut requirements = out_struct!(xr::GraphicsRequirementsOpenGLKHR);
        unsafe {
            (opengl.get_open_gl_graphics_requirements)(
                self.instance.handle,
                system,
                &mut requirements,
            )
        }
        .result()
        .or_fail("Failed to get OpenGL graphics requirements of the OpenXR runtime.")?;

        let context = Self::platform_context(host)?;
        context.make_current()?;
        let interop = OpenGLInterop::new(|name| context.get_proc_address(name));

        let (major, minor) = interop.version();
        let version = openxr::Version::new(major as u16, minor as u16, 0);
        let min = requirements.min_api_version_supported;
        let max = requirements.max_api_version_supported;

        if version.into_raw() < min.into_raw() {
            return Err(XrError::Requirements(format!(
                "The OpenXR runtime requires OpenGL {}.{} or newer, the host context is {}.{}.",
                min.major(),
                min.minor(),
                major,
                minor
            )));
        }
        if version.major() > max.major() {
            warn!(
                "The host OpenGL context ({}.{}) is newer than the runtime's tested maximum {}.{}",
                major,
                minor,
                max.major(),
                max.minor()
            );
        }
        info!("Using OpenGL {}.{}", major, minor);

        self.context = Some(context);
        self.interop = Some(interop);
        Ok(())
    }

    fn init_from_host_context(
        &mut self,
        host: &HostGraphicsContext,
        _system: xr::SystemId,
    ) -> XrResult<()> {
        if self.context.is_none() {
            self.context = Some(Self::platform_context(host)?);
        }
        let binding = self
            .context
            .as_ref()
            .map(|context| Box::new(context.session_binding()));
        self.session_binding = binding;
        Ok(())
    }

    fn session_create_next(&self) -> *const c_void {
        self.session_binding
            .as_deref()
            .map_or(std::ptr::null(), |binding| binding as *const _ as *const c_void)
    }

    fn choose_swapchain_format(&self, runtime_formats: &[i64]) -> Option<ChosenFormat> {
        choose_swapchain_format(&CANDIDATE_FORMATS, runtime_formats, |format| {
            format.to_gl().map(i64::from)
        })
    }

    fn create_swapchain_images(
        &mut self,
        swapchain: xr::Swapchain,
    ) -> XrResult<Vec<SwapchainImage>> {
        let core = &self.instance.core;
        let images = unsafe {
            call_enumerate(
                |capacity, count, out: *mut xr::SwapchainImageOpenGLKHR| {
                    (core.enumerate_swapchain_images)(swapchain, capacity, count, out as _)
                },
                out_struct!(xr::SwapchainImageOpenGLKHR),
            )
        }
        .or_fail("Failed to get swapchain image data.")?;

        Ok(images
            .into_iter()
            .map(|image| SwapchainImage {
                raw: image.image as u64,
            })
            .collect())
    }

    fn submit_to_swapchain_image(
        &mut self,
        image: &SwapchainImage,
        draw_info: &DrawViewInfo,
        rendered: &RenderedView,
    ) -> XrResult<()> {
        let texture = image.raw as u32;
        let region = Region {
            x: draw_info.offset_x,
            y: draw_info.offset_y,
            width: draw_info.width as i32,
            height: draw_info.height as i32,
        };
        let format = draw_info.swapchain_format;
        let interop = self.interop()?;

        match rendered {
            RenderedView::BoundFramebuffer => interop
                .blit_read_framebuffer(texture, region)
                .map_err(|err| graphics_error("Failed to blit into the swapchain image", err)),
            RenderedView::CpuPixels {
                data,
                width,
                height,
            } => {
                check_cpu_pixels(draw_info, data, *width, *height)?;
                let region = Region {
                    width: *width as i32,
                    height: *height as i32,
                    ..region
                };
                interop
                    .upload_pixels(texture, region, format, data)
                    .map_err(|err| graphics_error("Failed to upload into the swapchain image", err))
            }
            _ => Err(unsupported_submission(
                rendered,
                "The OpenGL binding accepts framebuffer or CPU pixel submissions only",
            )),
        }
    }

    fn needs_upside_down_drawing(&self, host: &HostGraphicsContext) -> bool {
        match host {
            HostGraphicsContext::OpenGl { upside_down, .. } => *upside_down,
            _ => false,
        }
    }
}
