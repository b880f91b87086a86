use std::ffi::{c_char, c_void};
use std::ptr;

use xr_core::actions::{ActionKind, ActionState, AxisFlags};
use xr_core::types::{GlPlatform, VulkanDeviceIdentity};
use xr_core::{
    DrawViewInfo, GpuVendor, GraphicsBindingType, HostGraphicsContext, ImageFormat, Pose,
    RenderedView, SwapchainFormat, TransferMode,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrCoreResult {
    Success = 0,
    /// The call failed. The error handler already received the details.
    Failure = -1,
    InvalidHandle = -2,
    InvalidArgument = -3,
    /// Not available yet, e.g. a controller model that is still loading.
    NotReady = -4,
    Panicked = -5,
}

impl From<bool> for XrCoreResult {
    fn from(ok: bool) -> Self {
        if ok {
            XrCoreResult::Success
        } else {
            XrCoreResult::Failure
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrCoreGraphicsBinding {
    OpenGl = 0,
    Vulkan = 1,
    Metal = 2,
    D3D11 = 3,
}

impl From<XrCoreGraphicsBinding> for GraphicsBindingType {
    fn from(binding: XrCoreGraphicsBinding) -> Self {
        match binding {
            XrCoreGraphicsBinding::OpenGl => GraphicsBindingType::OpenGl,
            XrCoreGraphicsBinding::Vulkan => GraphicsBindingType::Vulkan,
            XrCoreGraphicsBinding::Metal => GraphicsBindingType::Metal,
            XrCoreGraphicsBinding::D3D11 => GraphicsBindingType::D3D11,
        }
    }
}

impl From<GraphicsBindingType> for XrCoreGraphicsBinding {
    fn from(binding: GraphicsBindingType) -> Self {
        match binding {
            GraphicsBindingType::OpenGl => XrCoreGraphicsBinding::OpenGl,
            GraphicsBindingType::Vulkan => XrCoreGraphicsBinding::Vulkan,
            GraphicsBindingType::Metal => XrCoreGraphicsBinding::Metal,
            GraphicsBindingType::D3D11 => XrCoreGraphicsBinding::D3D11,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrCoreGpuVendor {
    Unknown = 0,
    Amd = 1,
    Intel = 2,
    Nvidia = 3,
    Apple = 4,
    Other = 5,
}

impl XrCoreGpuVendor {
    pub fn to_vendor(self) -> Option<GpuVendor> {
        match self {
            XrCoreGpuVendor::Unknown => None,
            XrCoreGpuVendor::Amd => Some(GpuVendor::Amd),
            XrCoreGpuVendor::Intel => Some(GpuVendor::Intel),
            XrCoreGpuVendor::Nvidia => Some(GpuVendor::Nvidia),
            XrCoreGpuVendor::Apple => Some(GpuVendor::Apple),
            XrCoreGpuVendor::Other => Some(GpuVendor::Other),
        }
    }
}

#[repr(C)]
pub struct XrCoreContextCreateInfo {
    pub application_name: *const c_char,
    pub application_version: u32,
    /// Most preferred first.
    pub binding_candidates: *const XrCoreGraphicsBinding,
    pub binding_candidate_count: u32,
    pub debug: bool,
    pub debug_time: bool,
    pub gpu_vendor: XrCoreGpuVendor,
    pub disable_opengl: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XrCorePose {
    pub position: [f32; 3],
    /// x, y, z, w
    pub orientation: [f32; 4],
}

impl From<Pose> for XrCorePose {
    fn from(pose: Pose) -> Self {
        Self {
            position: pose.position,
            orientation: pose.orientation,
        }
    }
}

impl From<XrCorePose> for Pose {
    fn from(pose: XrCorePose) -> Self {
        Self {
            position: pose.position,
            orientation: pose.orientation,
        }
    }
}

/// The host graphics context. Only the fields of `binding` are read.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrCoreHostContext {
    pub binding: XrCoreGraphicsBinding,

    pub gl_x_display: *mut c_void,
    pub gl_visualid: u32,
    pub gl_glx_fb_config: *mut c_void,
    pub gl_glx_drawable: u64,
    pub gl_glx_context: *mut c_void,
    pub gl_h_dc: *mut c_void,
    pub gl_h_glrc: *mut c_void,
    pub gl_upside_down: bool,

    pub vk_device_uuid: [u8; 16],
    pub vk_driver_uuid: [u8; 16],
    pub vk_device_luid: [u8; 8],
    pub vk_device_node_mask: u32,
    pub vk_device_luid_valid: bool,

    /// `ID3D11Device*` or `id<MTLCommandQueue>`.
    pub native_device: *mut c_void,
}

impl XrCoreHostContext {
    pub fn empty(binding: XrCoreGraphicsBinding) -> Self {
        Self {
            binding,
            gl_x_display: ptr::null_mut(),
            gl_visualid: 0,
            gl_glx_fb_config: ptr::null_mut(),
            gl_glx_drawable: 0,
            gl_glx_context: ptr::null_mut(),
            gl_h_dc: ptr::null_mut(),
            gl_h_glrc: ptr::null_mut(),
            gl_upside_down: false,
            vk_device_uuid: [0; 16],
            vk_driver_uuid: [0; 16],
            vk_device_luid: [0; 8],
            vk_device_node_mask: 0,
            vk_device_luid_valid: false,
            native_device: ptr::null_mut(),
        }
    }

    pub fn to_host(&self) -> HostGraphicsContext {
        match self.binding {
            XrCoreGraphicsBinding::OpenGl => HostGraphicsContext::OpenGl {
                platform: if self.gl_h_dc.is_null() {
                    GlPlatform::Xlib {
                        x_display: self.gl_x_display,
                        visualid: self.gl_visualid,
                        glx_fb_config: self.gl_glx_fb_config,
                        glx_drawable: self.gl_glx_drawable,
                        glx_context: self.gl_glx_context,
                    }
                } else {
                    GlPlatform::Win32 {
                        h_dc: self.gl_h_dc,
                        h_glrc: self.gl_h_glrc,
                    }
                },
                upside_down: self.gl_upside_down,
            },
            XrCoreGraphicsBinding::Vulkan => HostGraphicsContext::Vulkan(VulkanDeviceIdentity {
                device_uuid: self.vk_device_uuid,
                driver_uuid: self.vk_driver_uuid,
                device_luid: self.vk_device_luid,
                device_node_mask: self.vk_device_node_mask,
                device_luid_valid: self.vk_device_luid_valid,
            }),
            XrCoreGraphicsBinding::D3D11 => HostGraphicsContext::D3D11 {
                device: self.native_device,
            },
            XrCoreGraphicsBinding::Metal => HostGraphicsContext::Metal {
                command_queue: self.native_device,
            },
        }
    }

    pub fn from_host(host: &HostGraphicsContext) -> Self {
        match *host {
            HostGraphicsContext::OpenGl {
                platform,
                upside_down,
            } => {
                let mut out = Self::empty(XrCoreGraphicsBinding::OpenGl);
                out.gl_upside_down = upside_down;
                match platform {
                    GlPlatform::Xlib {
                        x_display,
                        visualid,
                        glx_fb_config,
                        glx_drawable,
                        glx_context,
                    } => {
                        out.gl_x_display = x_display;
                        out.gl_visualid = visualid;
                        out.gl_glx_fb_config = glx_fb_config;
                        out.gl_glx_drawable = glx_drawable;
                        out.gl_glx_context = glx_context;
                    }
                    GlPlatform::Win32 { h_dc, h_glrc } => {
                        out.gl_h_dc = h_dc;
                        out.gl_h_glrc = h_glrc;
                    }
                }
                out
            }
            HostGraphicsContext::Vulkan(identity) => {
                let mut out = Self::empty(XrCoreGraphicsBinding::Vulkan);
                out.vk_device_uuid = identity.device_uuid;
                out.vk_driver_uuid = identity.driver_uuid;
                out.vk_device_luid = identity.device_luid;
                out.vk_device_node_mask = identity.device_node_mask;
                out.vk_device_luid_valid = identity.device_luid_valid;
                out
            }
            HostGraphicsContext::D3D11 { device } => {
                let mut out = Self::empty(XrCoreGraphicsBinding::D3D11);
                out.native_device = device;
                out
            }
            HostGraphicsContext::Metal { command_queue } => {
                let mut out = Self::empty(XrCoreGraphicsBinding::Metal);
                out.native_device = command_queue;
                out
            }
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrCoreImageFormat {
    Rgba8Unorm = 0,
    Rgba8UnormSrgb = 1,
    Bgra8Unorm = 2,
    Bgra8UnormSrgb = 3,
    Rgba16Float = 4,
}

impl From<ImageFormat> for XrCoreImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Rgba8Unorm => XrCoreImageFormat::Rgba8Unorm,
            ImageFormat::Rgba8UnormSrgb => XrCoreImageFormat::Rgba8UnormSrgb,
            ImageFormat::Bgra8Unorm => XrCoreImageFormat::Bgra8Unorm,
            ImageFormat::Bgra8UnormSrgb => XrCoreImageFormat::Bgra8UnormSrgb,
            ImageFormat::Rgba16Float => XrCoreImageFormat::Rgba16Float,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrCoreSwapchainFormat {
    Rgba8 = 0,
    Rgba16F = 1,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XrCoreDrawViewInfo {
    pub view_index: u32,
    pub swapchain_format: XrCoreSwapchainFormat,
    pub image_format: XrCoreImageFormat,
    pub expects_srgb_buffer: bool,
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: u32,
    pub height: u32,
    pub eye_pose: XrCorePose,
    pub local_pose: XrCorePose,
    /// Left, right, up, down in radians.
    pub fov: [f32; 4],
    pub foveation_active: bool,
    pub upside_down: bool,
    /// Which `XrCoreRenderedViewKind` the binding takes for this view.
    pub transfer_mode: XrCoreTransferMode,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrCoreTransferMode {
    /// Framebuffer, exported memory or texture.
    ZeroCopy = 0,
    /// CPU pixels only.
    Cpu = 1,
}

impl From<TransferMode> for XrCoreTransferMode {
    fn from(mode: TransferMode) -> Self {
        match mode {
            TransferMode::ZeroCopy => XrCoreTransferMode::ZeroCopy,
            TransferMode::Cpu => XrCoreTransferMode::Cpu,
        }
    }
}

impl From<&DrawViewInfo> for XrCoreDrawViewInfo {
    fn from(info: &DrawViewInfo) -> Self {
        Self {
            view_index: info.view_index as u32,
            swapchain_format: match info.swapchain_format {
                SwapchainFormat::Rgba8 => XrCoreSwapchainFormat::Rgba8,
                SwapchainFormat::Rgba16F => XrCoreSwapchainFormat::Rgba16F,
            },
            image_format: info.image_format.into(),
            expects_srgb_buffer: info.expects_srgb_buffer,
            offset_x: info.offset_x,
            offset_y: info.offset_y,
            width: info.width,
            height: info.height,
            eye_pose: info.eye_pose.into(),
            local_pose: info.local_pose.into(),
            fov: [
                info.fov.angle_left,
                info.fov.angle_right,
                info.fov.angle_up,
                info.fov.angle_down,
            ],
            foveation_active: info.foveation_active,
            upside_down: info.upside_down,
            transfer_mode: info.transfer_mode.into(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrCoreRenderedViewKind {
    BoundFramebuffer = 0,
    CpuPixels = 1,
    ExportedMemory = 2,
    Texture = 3,
}

/// Filled by the draw callback. Only the fields of `kind` are read.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrCoreRenderedView {
    pub kind: XrCoreRenderedViewKind,
    pub width: u32,
    pub height: u32,
    /// CPU pixels, copied before the callback's caller returns.
    pub pixels: *const u8,
    pub pixels_len: usize,
    /// Ownership passes to the library.
    pub memory_fd: i32,
    pub memory_size: u64,
    pub texture: *mut c_void,
}

impl XrCoreRenderedView {
    pub fn empty() -> Self {
        Self {
            kind: XrCoreRenderedViewKind::BoundFramebuffer,
            width: 0,
            height: 0,
            pixels: ptr::null(),
            pixels_len: 0,
            memory_fd: -1,
            memory_size: 0,
            texture: ptr::null_mut(),
        }
    }

    /// # Safety
    /// `pixels` must point to `pixels_len` readable bytes when `kind` is `CpuPixels`.
    pub unsafe fn to_rendered(&self) -> RenderedView {
        match self.kind {
            XrCoreRenderedViewKind::BoundFramebuffer => RenderedView::BoundFramebuffer,
            XrCoreRenderedViewKind::CpuPixels => RenderedView::CpuPixels {
                data: if self.pixels.is_null() {
                    Vec::new()
                } else {
                    std::slice::from_raw_parts(self.pixels, self.pixels_len).to_vec()
                },
                width: self.width,
                height: self.height,
            },
            XrCoreRenderedViewKind::ExportedMemory => RenderedView::ExportedMemory {
                fd: self.memory_fd,
                allocation_size: self.memory_size,
                width: self.width,
                height: self.height,
            },
            XrCoreRenderedViewKind::Texture => RenderedView::Texture(self.texture),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrCoreActionKind {
    Boolean = 0,
    Float = 1,
    Vector2f = 2,
    Pose = 3,
    VibrationOutput = 4,
}

impl From<XrCoreActionKind> for ActionKind {
    fn from(kind: XrCoreActionKind) -> Self {
        match kind {
            XrCoreActionKind::Boolean => ActionKind::Boolean,
            XrCoreActionKind::Float => ActionKind::Float,
            XrCoreActionKind::Vector2f => ActionKind::Vector2f,
            XrCoreActionKind::Pose => ActionKind::Pose,
            XrCoreActionKind::VibrationOutput => ActionKind::VibrationOutput,
        }
    }
}

#[repr(C)]
pub struct XrCoreActionBindingInfo {
    pub action_name: *const c_char,
    pub profile_path: *const c_char,
    pub count: u32,
    pub subaction_paths: *const *const c_char,
    pub component_paths: *const *const c_char,
    /// Optional, `count` entries.
    pub float_thresholds: *const f32,
    /// Optional, `count` entries of `XR_CORE_AXIS_*` bits.
    pub axis_flags: *const u32,
    /// Optional, `count` entries.
    pub poses: *const XrCorePose,
}

/// State of one subaction path after the last sync.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XrCoreActionState {
    pub kind: XrCoreActionKind,
    pub boolean_value: bool,
    pub float_value: f32,
    pub vector2f_value: [f32; 2],
    pub pose_active: bool,
    pub pose: XrCorePose,
    pub float_threshold: f32,
    pub axis_flags: u32,
}

impl XrCoreActionState {
    pub fn new(kind: ActionKind, state: ActionState, float_threshold: f32, axis_flags: AxisFlags) -> Self {
        let mut out = Self {
            kind: match kind {
                ActionKind::Boolean => XrCoreActionKind::Boolean,
                ActionKind::Float => XrCoreActionKind::Float,
                ActionKind::Vector2f => XrCoreActionKind::Vector2f,
                ActionKind::Pose => XrCoreActionKind::Pose,
                ActionKind::VibrationOutput => XrCoreActionKind::VibrationOutput,
            },
            boolean_value: false,
            float_value: 0.0,
            vector2f_value: [0.0; 2],
            pose_active: false,
            pose: Pose::IDENTITY.into(),
            float_threshold,
            axis_flags: axis_flags.bits(),
        };
        match state {
            ActionState::Boolean(value) => out.boolean_value = value,
            ActionState::Float(value) => out.float_value = value,
            ActionState::Vector2f(value) => out.vector2f_value = value,
            ActionState::Pose { is_active, pose } => {
                out.pose_active = is_active;
                out.pose = pose.into();
            }
            ActionState::None => {}
        }
        out
    }
}

/// Borrowed controller model geometry, valid until the next call for the same model.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrCoreControllerModelData {
    /// Interleaved position and normal, six floats per vertex.
    pub vertices: *const f32,
    pub vertex_count: u32,
    pub indices: *const u32,
    pub index_count: u32,
    pub components: *const XrCoreControllerModelComponent,
    pub component_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XrCoreControllerModelComponent {
    pub transform: [f32; 16],
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    pub index_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrCoreErrorInfo {
    pub user_message: *const c_char,
    /// Raw `XrResult`, 0 when the error did not come from the runtime.
    pub result: i32,
    /// Null when the error did not come from the runtime.
    pub result_string: *const c_char,
}

#[cfg(test)]
mod tests {
    use super::*;
    use xr_core::Fov;

    #[test]
    fn draw_info_carries_the_transfer_mode() {
        let info = DrawViewInfo {
            view_index: 1,
            swapchain_format: SwapchainFormat::Rgba8,
            image_format: ImageFormat::Rgba8Unorm,
            expects_srgb_buffer: false,
            offset_x: 0,
            offset_y: 0,
            width: 32,
            height: 16,
            eye_pose: Pose::IDENTITY,
            local_pose: Pose::IDENTITY,
            fov: Fov {
                angle_left: -0.5,
                angle_right: 0.5,
                angle_up: 0.4,
                angle_down: -0.4,
            },
            foveation_active: false,
            upside_down: false,
            transfer_mode: TransferMode::Cpu,
        };
        let c_info = XrCoreDrawViewInfo::from(&info);
        assert_eq!(c_info.transfer_mode, XrCoreTransferMode::Cpu);
        assert_eq!(c_info.fov, [-0.5, 0.5, 0.4, -0.4]);
        assert_eq!(c_info.view_index, 1);
    }

    #[test]
    fn host_context_survives_the_c_layout() {
        let host = HostGraphicsContext::Vulkan(VulkanDeviceIdentity {
            device_uuid: [3; 16],
            device_node_mask: 1,
            device_luid_valid: true,
            ..Default::default()
        });
        assert_eq!(XrCoreHostContext::from_host(&host).to_host(), host);

        let gl = HostGraphicsContext::OpenGl {
            platform: GlPlatform::Win32 {
                h_dc: 0x10 as *mut c_void,
                h_glrc: 0x20 as *mut c_void,
            },
            upside_down: true,
        };
        assert_eq!(XrCoreHostContext::from_host(&gl).to_host(), gl);
    }

    #[test]
    fn cpu_pixels_are_copied() {
        let pixels = [1u8, 2, 3, 4];
        let view = XrCoreRenderedView {
            kind: XrCoreRenderedViewKind::CpuPixels,
            width: 1,
            height: 1,
            pixels: pixels.as_ptr(),
            pixels_len: pixels.len(),
            ..XrCoreRenderedView::empty()
        };
        match unsafe { view.to_rendered() } {
            RenderedView::CpuPixels { data, width, height } => {
                assert_eq!(data, pixels);
                assert_eq!((width, height), (1, 1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn pose_state_keeps_activity() {
        let state = XrCoreActionState::new(
            ActionKind::Pose,
            ActionState::Pose {
                is_active: true,
                pose: Pose::IDENTITY,
            },
            0.0,
            AxisFlags::empty(),
        );
        assert!(state.pose_active);
        assert_eq!(state.pose.orientation, [0.0, 0.0, 0.0, 1.0]);
    }
}
