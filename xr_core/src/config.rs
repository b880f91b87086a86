use std::env;

pub const ENV_DEBUG: &str = "XR_CORE_DEBUG";
pub const ENV_DEBUG_TIME: &str = "XR_CORE_DEBUG_TIME";
pub const ENV_DISABLE_OPENGL: &str = "XR_CORE_DISABLE_OPENGL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsBindingType {
    OpenGl,
    Vulkan,
    Metal,
    D3D11,
}

impl GraphicsBindingType {
    pub fn extension_name(&self) -> &'static str {
        match self {
            GraphicsBindingType::OpenGl => "XR_KHR_opengl_enable",
            GraphicsBindingType::Vulkan => "XR_KHR_vulkan_enable2",
            GraphicsBindingType::Metal => "XR_KHR_metal_enable",
            GraphicsBindingType::D3D11 => "XR_KHR_D3D11_enable",
        }
    }

    pub fn is_supported_on_platform(&self) -> bool {
        match self {
            GraphicsBindingType::OpenGl => cfg!(any(target_os = "linux", target_os = "windows")),
            GraphicsBindingType::Vulkan => cfg!(any(target_os = "linux", target_os = "windows")),
            GraphicsBindingType::Metal => cfg!(target_os = "macos"),
            GraphicsBindingType::D3D11 => cfg!(target_os = "windows"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuVendor {
    Amd,
    Intel,
    Nvidia,
    Apple,
    Other,
}

#[derive(Debug, Clone)]
pub struct ContextCreateInfo {
    pub application_name: String,
    pub application_version: u32,
    /// Graphics bindings the host can work with, most preferred first.
    pub binding_candidates: Vec<GraphicsBindingType>,
    pub debug: bool,
    pub debug_time: bool,
    pub gpu_vendor: Option<GpuVendor>,
    pub disable_opengl: bool,
}

impl Default for ContextCreateInfo {
    fn default() -> Self {
        Self {
            application_name: String::from("xr_core application"),
            application_version: 1,
            binding_candidates: Vec::new(),
            debug: false,
            debug_time: false,
            gpu_vendor: None,
            disable_opengl: false,
        }
    }
}

impl ContextCreateInfo {
    /// Lets `XR_CORE_DEBUG`, `XR_CORE_DEBUG_TIME` and `XR_CORE_DISABLE_OPENGL` switch
    /// the matching flags on.
    pub fn with_env_overrides(mut self) -> Self {
        self.debug |= env_flag(ENV_DEBUG);
        self.debug_time |= env_flag(ENV_DEBUG_TIME);
        self.disable_opengl |= env_flag(ENV_DISABLE_OPENGL);
        self
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).map_or(false, |value| parse_flag(&value))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
