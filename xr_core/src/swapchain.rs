use std::sync::Arc;

use graphics_interop::{ImageFormat, SwapchainFormat};
use log::{debug, warn};
use openxr::sys as xr;

use crate::error::{ResultExt, XrError, XrResult};
use crate::graphics::{ChosenFormat, GraphicsBinding};
use crate::runtime::{Runtime, SwapchainCreateInfo, ViewConfigView};
use crate::types::SwapchainImage;

/// One runtime swapchain and its images.
///
/// The runtime handle is destroyed exactly once, when the value is dropped.
pub struct Swapchain {
    runtime: Arc<dyn Runtime>,
    handle: xr::Swapchain,
    images: Vec<SwapchainImage>,
    format: ChosenFormat,
    width: u32,
    height: u32,
    acquired: Option<u32>,
}

impl Swapchain {
    pub fn new(
        runtime: Arc<dyn Runtime>,
        binding: &mut dyn GraphicsBinding,
        session: xr::Session,
        view: &ViewConfigView,
    ) -> XrResult<Self> {
        let runtime_formats = runtime
            .enumerate_swapchain_formats(session)
            .or_fail("Failed to get swapchain image formats.")?;

        let format = binding.choose_swapchain_format(&runtime_formats).ok_or_else(|| {
            XrError::Graphics(
                "No format matching OpenXR runtime supported swapchain formats found.".to_owned(),
            )
        })?;

        let create_info = SwapchainCreateInfo {
            usage_flags: binding.swapchain_usage(),
            format: format.raw,
            sample_count: view.recommended_sample_count.max(1),
            width: view.recommended_width,
            height: view.recommended_height,
        };
        let handle = runtime
            .create_swapchain(session, &create_info)
            .or_fail("Failed to create swapchain.")?;

        let images = match binding.create_swapchain_images(handle) {
            Ok(images) => images,
            Err(err) => {
                runtime.destroy_swapchain(handle);
                return Err(err);
            }
        };
        debug!(
            "Created {}x{} swapchain with {} images, format {:?} ({})",
            create_info.width,
            create_info.height,
            images.len(),
            format.format,
            format.raw
        );

        Ok(Self {
            runtime,
            handle,
            images,
            format,
            width: create_info.width,
            height: create_info.height,
            acquired: None,
        })
    }

    /// Acquires the next image and blocks until the runtime hands it out.
    pub fn acquire_drawable_image(&mut self) -> XrResult<SwapchainImage> {
        let index = self
            .runtime
            .acquire_swapchain_image(self.handle)
            .or_fail("Failed to acquire swapchain image.")?;
        self.acquired = Some(index);

        self.runtime
            .wait_swapchain_image(self.handle, xr::Duration::INFINITE)
            .or_fail("Failed to wait for swapchain image.")?;

        self.images.get(index as usize).copied().ok_or_else(|| {
            XrError::Graphics(format!(
                "The runtime acquired image {} of a swapchain with {} images",
                index,
                self.images.len()
            ))
        })
    }

    pub fn release_image(&mut self) -> XrResult<()> {
        if self.acquired.take().is_none() {
            return Ok(());
        }
        self.runtime
            .release_swapchain_image(self.handle)
            .or_fail("Failed to release swapchain image.")
    }

    /// The whole swapchain image as a composition layer sub image.
    pub fn sub_image(&self) -> xr::SwapchainSubImage {
        xr::SwapchainSubImage {
            swapchain: self.handle,
            image_rect: xr::Rect2Di {
                offset: xr::Offset2Di { x: 0, y: 0 },
                extent: xr::Extent2Di {
                    width: self.width as i32,
                    height: self.height as i32,
                },
            },
            image_array_index: 0,
        }
    }

    pub fn handle(&self) -> xr::Swapchain {
        self.handle
    }

    pub fn images(&self) -> &[SwapchainImage] {
        &self.images
    }

    pub fn format(&self) -> SwapchainFormat {
        self.format.swapchain_format()
    }

    pub fn image_format(&self) -> ImageFormat {
        self.format.format
    }

    pub fn is_buffer_srgb(&self) -> bool {
        self.format.is_srgb()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        if self.acquired.is_some() {
            if let Err(result) = self.runtime.release_swapchain_image(self.handle) {
                warn!("Failed to release an acquired swapchain image: {:?}", result);
            }
        }
        self.runtime.destroy_swapchain(self.handle);
    }
}
