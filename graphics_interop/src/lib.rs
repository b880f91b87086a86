pub mod apis;

#[derive(Debug, Clone, Copy)]
pub struct ImageCreateInfo {
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub mip_count: u32,
    pub sample_count: u32,
    pub format: ImageFormat,
}

/// Color formats a host can render into and a runtime swapchain can be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    // Normal 32 bit formats
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,

    // Normal 64 bit formats
    Rgba16Float,
}

/// The backend-neutral buffer layout the host renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapchainFormat {
    Rgba8,
    Rgba16F,
}

impl ImageFormat {
    pub fn swapchain_format(&self) -> SwapchainFormat {
        match self {
            ImageFormat::Rgba16Float => SwapchainFormat::Rgba16F,
            _ => SwapchainFormat::Rgba8,
        }
    }

    pub fn is_srgb(&self) -> bool {
        matches!(self, ImageFormat::Rgba8UnormSrgb | ImageFormat::Bgra8UnormSrgb)
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self.swapchain_format() {
            SwapchainFormat::Rgba8 => 4,
            SwapchainFormat::Rgba16F => 8,
        }
    }
}

/// Picks the first of `candidates` (in priority order) that the runtime reports.
pub fn choose_format<T: PartialEq + Copy>(candidates: &[T], runtime_formats: &[T]) -> Option<T> {
    candidates
        .iter()
        .find(|candidate| runtime_formats.contains(candidate))
        .copied()
}

#[cfg(target_os = "windows")]
pub type InteropHandle = std::os::windows::raw::HANDLE;

#[cfg(not(target_os = "windows"))]
pub type InteropHandle = i32;
