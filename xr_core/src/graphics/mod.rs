#[cfg(target_os = "windows")]
mod d3d11;
#[cfg(target_os = "macos")]
mod metal;
#[cfg(any(target_os = "linux", target_os = "windows"))]
mod opengl;
#[cfg(any(target_os = "linux", target_os = "windows"))]
mod vulkan;

use std::ffi::c_void;
use std::sync::Arc;

use graphics_interop::{ImageFormat, SwapchainFormat};
use log::warn;
use openxr::sys as xr;

use crate::config::GraphicsBindingType;
use crate::error::{XrError, XrResult};
use crate::runtime::InnerInstance;
use crate::types::{DrawViewInfo, HostGraphicsContext, RenderedView, SwapchainImage, TransferMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChosenFormat {
    /// The runtime's native format code.
    pub raw: i64,
    pub format: ImageFormat,
}

impl ChosenFormat {
    pub fn swapchain_format(&self) -> SwapchainFormat {
        self.format.swapchain_format()
    }

    pub fn is_srgb(&self) -> bool {
        self.format.is_srgb()
    }
}

/// One graphics API as seen by a session.
///
/// The binding is created after the host bound its graphics context and lives exactly as
/// long as the runtime session.
pub trait GraphicsBinding {
    fn binding_type(&self) -> GraphicsBindingType;

    /// Fails with [`XrError::Requirements`] naming what the host context lacks.
    fn check_version_requirements(
        &mut self,
        host: &HostGraphicsContext,
        system: xr::SystemId,
    ) -> XrResult<()>;

    fn init_from_host_context(
        &mut self,
        host: &HostGraphicsContext,
        system: xr::SystemId,
    ) -> XrResult<()>;

    /// The `XrGraphicsBinding*` struct to chain into session creation. Valid until the
    /// binding is dropped.
    fn session_create_next(&self) -> *const c_void;

    fn choose_swapchain_format(&self, runtime_formats: &[i64]) -> Option<ChosenFormat>;

    fn swapchain_usage(&self) -> xr::SwapchainUsageFlags {
        xr::SwapchainUsageFlags::SAMPLED | xr::SwapchainUsageFlags::COLOR_ATTACHMENT
    }

    fn create_swapchain_images(&mut self, swapchain: xr::Swapchain)
        -> XrResult<Vec<SwapchainImage>>;

    fn submit_to_swapchain_image(
        &mut self,
        image: &SwapchainImage,
        draw_info: &DrawViewInfo,
        rendered: &RenderedView,
    ) -> XrResult<()>;

    fn needs_upside_down_drawing(&self, host: &HostGraphicsContext) -> bool;

    /// Decided once the host context is known. Handed to the host with every view.
    fn transfer_mode(&self) -> TransferMode {
        TransferMode::ZeroCopy
    }
}

/// Picks the first candidate, in the binding's priority order, the runtime supports.
pub fn choose_swapchain_format(
    candidates: &[ImageFormat],
    runtime_formats: &[i64],
    to_raw: impl Fn(ImageFormat) -> Option<i64>,
) -> Option<ChosenFormat> {
    let candidates = candidates
        .iter()
        .filter_map(|format| to_raw(*format).map(|raw| (raw, *format)))
        .collect::<Vec<_>>();
    let raw_candidates = candidates.iter().map(|(raw, _)| *raw).collect::<Vec<_>>();

    let raw = graphics_interop::choose_format(&raw_candidates, runtime_formats)?;
    candidates
        .into_iter()
        .find(|(candidate, _)| *candidate == raw)
        .map(|(raw, format)| ChosenFormat { raw, format })
}

pub(crate) fn create_binding(
    binding_type: GraphicsBindingType,
    instance: &Arc<InnerInstance>,
) -> XrResult<Box<dyn GraphicsBinding>> {
    if !instance.is_extension_enabled(binding_type.extension_name()) {
        return Err(XrError::NoGraphicsBinding);
    }

    match binding_type {
        #[cfg(any(target_os = "linux", target_os = "windows"))]
        GraphicsBindingType::OpenGl => Ok(Box::new(opengl::OpenGlBinding::new(instance.clone()))),
        #[cfg(any(target_os = "linux", target_os = "windows"))]
        GraphicsBindingType::Vulkan => Ok(Box::new(vulkan::VulkanBinding::new(instance.clone()))),
        #[cfg(target_os = "windows")]
        GraphicsBindingType::D3D11 => Ok(Box::new(d3d11::D3D11Binding::new(instance.clone())?)),
        #[cfg(target_os = "macos")]
        GraphicsBindingType::Metal => Ok(Box::new(metal::MetalBinding::new(instance.clone())?)),
        #[allow(unreachable_patterns)]
        _ => Err(XrError::NoGraphicsBinding),
    }
}

pub(crate) fn graphics_error(what: &str, err: impl std::fmt::Display) -> XrError {
    XrError::Graphics(format!("{}: {}", what, err))
}

/// The error for a submission the binding cannot take. An exported fd is closed on the way.
pub(crate) fn unsupported_submission(rendered: &RenderedView, message: &str) -> XrError {
    if let RenderedView::ExportedMemory { fd, .. } = rendered {
        close_exported_fd(*fd);
    }
    XrError::Graphics(message.to_owned())
}

pub(crate) fn close_exported_fd(fd: i32) {
    if fd < 0 {
        return;
    }
    if unsafe { libc::close(fd) } != 0 {
        warn!("Failed to close exported memory fd {}", fd);
    }
}

/// CPU submissions must cover the whole view and fit the swapchain.
pub(crate) fn check_cpu_pixels(
    draw_info: &DrawViewInfo,
    data: &[u8],
    width: u32,
    height: u32,
) -> XrResult<()> {
    if width > draw_info.width || height > draw_info.height {
        return Err(XrError::Usage(format!(
            "Submitted pixels ({}x{}) exceed the view size ({}x{})",
            width, height, draw_info.width, draw_info.height
        )));
    }
    let expected = width as usize * height as usize * draw_info.image_format.bytes_per_pixel();
    if data.len() < expected {
        return Err(XrError::Usage(format!(
            "Submitted {} bytes of pixels, {} are needed",
            data.len(),
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VK_R8G8B8A8_UNORM: i64 = 37;
    const VK_B8G8R8A8_UNORM: i64 = 44;
    const VK_R16G16B16A16_SFLOAT: i64 = 97;

    fn vk_code(format: ImageFormat) -> Option<i64> {
        match format {
            ImageFormat::Rgba8Unorm => Some(VK_R8G8B8A8_UNORM),
            ImageFormat::Bgra8Unorm => Some(VK_B8G8R8A8_UNORM),
            ImageFormat::Rgba16Float => Some(VK_R16G16B16A16_SFLOAT),
            _ => None,
        }
    }

    #[test]
    fn first_supported_candidate_wins() {
        let candidates = [
            ImageFormat::Rgba16Float,
            ImageFormat::Rgba8Unorm,
            ImageFormat::Bgra8Unorm,
        ];
        let chosen = choose_swapchain_format(&candidates, &[VK_B8G8R8A8_UNORM, 9], vk_code)
            .unwrap();

        assert_eq!(chosen.raw, VK_B8G8R8A8_UNORM);
        assert_eq!(chosen.format, ImageFormat::Bgra8Unorm);
        assert_eq!(chosen.swapchain_format(), SwapchainFormat::Rgba8);
        assert!(!chosen.is_srgb());
    }

    #[test]
    fn priority_follows_candidates_not_runtime_order() {
        let candidates = [ImageFormat::Rgba16Float, ImageFormat::Rgba8Unorm];
        let chosen = choose_swapchain_format(
            &candidates,
            &[VK_R8G8B8A8_UNORM, VK_R16G16B16A16_SFLOAT],
            vk_code,
        )
        .unwrap();
        assert_eq!(chosen.format, ImageFormat::Rgba16Float);
    }

    #[cfg(unix)]
    #[test]
    fn rejected_exported_memory_closes_its_fd() {
        let mut fds = [0; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);

        let rendered = RenderedView::ExportedMemory {
            fd: fds[0],
            allocation_size: 64,
            width: 4,
            height: 4,
        };
        let err = unsupported_submission(&rendered, "no exported memory here");
        assert!(matches!(err, XrError::Graphics(_)));

        assert_eq!(unsafe { libc::fcntl(fds[0], libc::F_GETFD) }, -1);
        assert_ne!(unsafe { libc::fcntl(fds[1], libc::F_GETFD) }, -1);
        unsafe { libc::close(fds[1]) };
    }

    #[test]
    fn cpu_pixels_are_not_consumed_by_a_rejection() {
        let rendered = RenderedView::CpuPixels {
            data: vec![0; 16],
            width: 2,
            height: 2,
        };
        let err = unsupported_submission(&rendered, "no pixels here");
        assert_eq!(err.to_string(), XrError::Graphics("no pixels here".to_owned()).to_string());
    }

    #[test]
    fn disjoint_formats_choose_nothing() {
        let candidates = [ImageFormat::Rgba16Float, ImageFormat::Rgba8UnormSrgb];
        assert_eq!(
            choose_swapchain_format(&candidates, &[VK_B8G8R8A8_UNORM], vk_code),
            None
        );
    }
}
