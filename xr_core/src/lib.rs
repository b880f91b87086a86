pub mod actions;
pub mod config;
pub mod context;
pub mod controller_model;
pub mod error;
pub mod gltf;
pub mod graphics;
pub mod runtime;
pub mod session;
pub mod swapchain;
pub mod types;

use openxr::sys as xr;

pub use config::{ContextCreateInfo, GpuVendor, GraphicsBindingType};
pub use context::{Context, ContextCallbacks, SessionBeginInfo};
pub use error::{set_error_handler, ErrorInfo, XrError, XrResult};
pub use graphics_interop::{ImageFormat, SwapchainFormat};
pub use session::Session;
pub use types::{DrawViewInfo, Fov, HostGraphicsContext, Pose, RenderedView, TransferMode};

pub const ENGINE_NAME: &str = "xr_core";

pub trait ToResult {
    fn result(self) -> Result<Self, Self>
    where
        Self: Sized + Copy,
    {
        ToResult::result2(self, self)
    }

    fn result2<T>(self, ok: T) -> Result<T, Self>
    where
        Self: Sized + Copy;
}

impl ToResult for xr::Result {
    fn result2<T>(self, ok: T) -> Result<T, Self> {
        if self.into_raw() >= 0 {
            Ok(ok)
        } else {
            Err(self)
        }
    }
}
