use std::ffi::c_void;

use graphics_interop::{ImageFormat, SwapchainFormat};
use openxr::sys as xr;

/// A rigid transform. `orientation` is a unit quaternion stored as `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: [0.0; 3],
        orientation: [0.0, 0.0, 0.0, 1.0],
    };
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<xr::Posef> for Pose {
    fn from(pose: xr::Posef) -> Self {
        Self {
            position: [pose.position.x, pose.position.y, pose.position.z],
            orientation: [
                pose.orientation.x,
                pose.orientation.y,
                pose.orientation.z,
                pose.orientation.w,
            ],
        }
    }
}

impl From<Pose> for xr::Posef {
    fn from(pose: Pose) -> Self {
        xr::Posef {
            orientation: xr::Quaternionf {
                x: pose.orientation[0],
                y: pose.orientation[1],
                z: pose.orientation[2],
                w: pose.orientation[3],
            },
            position: xr::Vector3f {
                x: pose.position[0],
                y: pose.position[1],
                z: pose.position[2],
            },
        }
    }
}

/// Field of view half-angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Fov {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

impl From<xr::Fovf> for Fov {
    fn from(fov: xr::Fovf) -> Self {
        Self {
            angle_left: fov.angle_left,
            angle_right: fov.angle_right,
            angle_up: fov.angle_up,
            angle_down: fov.angle_down,
        }
    }
}

/// Everything the host needs to render one view of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawViewInfo {
    pub view_index: usize,
    pub swapchain_format: SwapchainFormat,
    pub image_format: ImageFormat,
    /// The swapchain expects sRGB encoded values.
    pub expects_srgb_buffer: bool,
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: u32,
    pub height: u32,
    /// Eye pose in the reference space.
    pub eye_pose: Pose,
    /// Eye pose in the view space.
    pub local_pose: Pose,
    pub fov: Fov,
    pub foveation_active: bool,
    /// The host has to flip its output vertically for this binding.
    pub upside_down: bool,
    /// The submission kind the binding can take for this view.
    pub transfer_mode: TransferMode,
}

/// How the graphics binding wants rendered views handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// GPU side: the bound framebuffer, exported memory or a native texture.
    ZeroCopy,
    /// Only [`RenderedView::CpuPixels`].
    Cpu,
}

/// How the host hands a rendered view to the graphics binding.
#[derive(Debug)]
pub enum RenderedView {
    /// The result is in the read framebuffer bound on the host's OpenGL context.
    BoundFramebuffer,
    /// Tightly packed pixels in the swapchain's image format.
    CpuPixels {
        data: Vec<u8>,
        width: u32,
        height: u32,
    },
    /// Device memory exported by the host renderer as an opaque fd. The fd belongs to the
    /// binding from here on, it is closed when the submission is rejected.
    ExportedMemory {
        fd: i32,
        allocation_size: u64,
        width: u32,
        height: u32,
    },
    /// A native texture: `ID3D11Texture2D*` or `id<MTLTexture>`.
    Texture(*mut c_void),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlPlatform {
    Xlib {
        x_display: *mut c_void,
        visualid: u32,
        glx_fb_config: *mut c_void,
        glx_drawable: u64,
        glx_context: *mut c_void,
    },
    Win32 {
        h_dc: *mut c_void,
        h_glrc: *mut c_void,
    },
}

/// Identity of the host's Vulkan device, used to pick the zero-copy path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VulkanDeviceIdentity {
    pub device_uuid: [u8; 16],
    pub driver_uuid: [u8; 16],
    pub device_luid: [u8; 8],
    pub device_node_mask: u32,
    pub device_luid_valid: bool,
}

/// The graphics context the host binds for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostGraphicsContext {
    OpenGl {
        platform: GlPlatform,
        /// The host renders OpenGL output upside down.
        upside_down: bool,
    },
    Vulkan(VulkanDeviceIdentity),
    D3D11 {
        device: *mut c_void,
    },
    Metal {
        command_queue: *mut c_void,
    },
}

/// A runtime owned swapchain image: a GL texture name, `VkImage`, `ID3D11Texture2D*` or
/// `id<MTLTexture>` depending on the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainImage {
    pub raw: u64,
}
