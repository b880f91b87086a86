mod openxr_runtime;

use std::ffi::c_char;
use std::sync::Arc;

use openxr::sys as xr;

use crate::config::GraphicsBindingType;
use crate::error::XrResult;
use crate::graphics::GraphicsBinding;
use crate::ToResult;

pub(crate) use openxr_runtime::out_struct;
pub use openxr_runtime::{InnerInstance, OpenXrLoader, OpenXrRuntime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeId {
    Monado,
    Oculus,
    SteamVR,
    Wmr,
    Varjo,
    Other(String),
}

impl RuntimeId {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Monado(XRT) by Collabora et al" => RuntimeId::Monado,
            "Oculus" => RuntimeId::Oculus,
            "SteamVR/OpenXR" => RuntimeId::SteamVR,
            "Windows Mixed Reality Runtime" => RuntimeId::Wmr,
            "Varjo OpenXR Runtime" => RuntimeId::Varjo,
            _ if name.starts_with("Monado") => RuntimeId::Monado,
            _ => RuntimeId::Other(name.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeProperties {
    pub id: RuntimeId,
    pub name: String,
    pub version: xr::Version,
}

pub struct InstanceCreateInfo<'a> {
    pub application_name: &'a str,
    pub application_version: u32,
    pub layers: &'a [String],
    pub extensions: &'a [String],
    /// Forward runtime debug messages to the log. Requires `XR_EXT_debug_utils` in
    /// `extensions`.
    pub debug_messenger: bool,
}

/// Everything that happens before an instance exists.
pub trait RuntimeLoader {
    fn enumerate_api_layers(&self) -> openxr::Result<Vec<String>>;

    /// Extensions of the runtime itself (`None`) or of the API layer `layer`.
    fn enumerate_extensions(&self, layer: Option<&str>) -> openxr::Result<Vec<String>>;

    fn create_instance(&self, info: &InstanceCreateInfo) -> openxr::Result<Arc<dyn Runtime>>;
}

#[derive(Debug)]
pub enum RuntimeEvent {
    SessionStateChanged {
        session: xr::Session,
        state: xr::SessionState,
    },
    InstanceLossPending,
    InteractionProfileChanged,
    Other(xr::StructureType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewConfigView {
    pub recommended_width: u32,
    pub recommended_height: u32,
    pub recommended_sample_count: u32,
    pub max_width: u32,
    pub max_height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct LocatedView {
    pub pose: xr::Posef,
    pub fov: xr::Fovf,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameTiming {
    pub predicted_display_time: xr::Time,
    pub predicted_display_period: xr::Duration,
    pub should_render: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SpaceLocation {
    pub flags: xr::SpaceLocationFlags,
    pub pose: xr::Posef,
}

impl SpaceLocation {
    pub fn is_pose_valid(&self) -> bool {
        self.flags.contains(
            xr::SpaceLocationFlags::POSITION_VALID | xr::SpaceLocationFlags::ORIENTATION_VALID,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionStateReading<T> {
    pub current_state: T,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SwapchainCreateInfo {
    pub usage_flags: xr::SwapchainUsageFlags,
    pub format: i64,
    pub sample_count: u32,
    pub width: u32,
    pub height: u32,
}

pub struct ActionCreateInfo<'a> {
    pub name: &'a str,
    pub localized_name: &'a str,
    pub action_type: xr::ActionType,
    pub subaction_paths: &'a [xr::Path],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestedBinding {
    pub action: xr::Action,
    pub binding: xr::Path,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HapticVibration {
    pub duration: xr::Duration,
    /// Hz, `0.0` lets the runtime pick.
    pub frequency: f32,
    pub amplitude: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeProperty {
    pub parent_node_name: String,
    pub node_name: String,
}

pub struct ProjectionLayer<'a> {
    pub space: xr::Space,
    pub flags: xr::CompositionLayerFlags,
    pub views: &'a [xr::CompositionLayerProjectionView],
}

/// Every call made against a live instance.
///
/// Implementations own the instance; dropping the last reference destroys it.
pub trait Runtime: Send + Sync {
    fn properties(&self) -> &RuntimeProperties;

    fn result_to_string(&self, result: xr::Result) -> String;

    fn get_system(&self, form_factor: xr::FormFactor) -> openxr::Result<xr::SystemId>;

    fn supports_foveated_rendering(&self, system: xr::SystemId) -> openxr::Result<bool>;

    fn enumerate_view_configuration_views(
        &self,
        system: xr::SystemId,
        view_type: xr::ViewConfigurationType,
        foveated: bool,
    ) -> openxr::Result<Vec<ViewConfigView>>;

    fn enumerate_environment_blend_modes(
        &self,
        system: xr::SystemId,
        view_type: xr::ViewConfigurationType,
    ) -> openxr::Result<Vec<xr::EnvironmentBlendMode>>;

    fn create_graphics_binding(
        &self,
        binding_type: GraphicsBindingType,
    ) -> XrResult<Box<dyn GraphicsBinding>>;

    // Session

    fn create_session(
        &self,
        system: xr::SystemId,
        graphics_binding: *const std::ffi::c_void,
    ) -> openxr::Result<xr::Session>;

    fn destroy_session(&self, session: xr::Session);

    fn begin_session(
        &self,
        session: xr::Session,
        view_type: xr::ViewConfigurationType,
    ) -> openxr::Result<()>;

    fn end_session(&self, session: xr::Session) -> openxr::Result<()>;

    fn request_exit_session(&self, session: xr::Session) -> openxr::Result<()>;

    fn poll_event(&self) -> openxr::Result<Option<RuntimeEvent>>;

    // Spaces

    fn create_reference_space(
        &self,
        session: xr::Session,
        space_type: xr::ReferenceSpaceType,
        pose: xr::Posef,
    ) -> openxr::Result<xr::Space>;

    fn get_reference_space_bounds_rect(
        &self,
        session: xr::Session,
        space_type: xr::ReferenceSpaceType,
    ) -> openxr::Result<xr::Extent2Df>;

    fn create_action_space(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
        pose: xr::Posef,
    ) -> openxr::Result<xr::Space>;

    fn locate_space(
        &self,
        space: xr::Space,
        base_space: xr::Space,
        time: xr::Time,
    ) -> openxr::Result<SpaceLocation>;

    fn destroy_space(&self, space: xr::Space);

    // Swapchains

    fn enumerate_swapchain_formats(&self, session: xr::Session) -> openxr::Result<Vec<i64>>;

    fn create_swapchain(
        &self,
        session: xr::Session,
        info: &SwapchainCreateInfo,
    ) -> openxr::Result<xr::Swapchain>;

    fn destroy_swapchain(&self, swapchain: xr::Swapchain);

    fn acquire_swapchain_image(&self, swapchain: xr::Swapchain) -> openxr::Result<u32>;

    fn wait_swapchain_image(
        &self,
        swapchain: xr::Swapchain,
        timeout: xr::Duration,
    ) -> openxr::Result<()>;

    fn release_swapchain_image(&self, swapchain: xr::Swapchain) -> openxr::Result<()>;

    // Frames

    fn wait_frame(&self, session: xr::Session) -> openxr::Result<FrameTiming>;

    fn begin_frame(&self, session: xr::Session) -> openxr::Result<()>;

    fn locate_views(
        &self,
        session: xr::Session,
        view_type: xr::ViewConfigurationType,
        display_time: xr::Time,
        space: xr::Space,
        foveated: bool,
    ) -> openxr::Result<Vec<LocatedView>>;

    fn end_frame(
        &self,
        session: xr::Session,
        display_time: xr::Time,
        blend_mode: xr::EnvironmentBlendMode,
        layer: Option<&ProjectionLayer>,
    ) -> openxr::Result<()>;

    // Actions

    fn string_to_path(&self, path: &str) -> openxr::Result<xr::Path>;

    fn path_to_string(&self, path: xr::Path) -> openxr::Result<String>;

    fn create_action_set(
        &self,
        name: &str,
        localized_name: &str,
        priority: u32,
    ) -> openxr::Result<xr::ActionSet>;

    fn destroy_action_set(&self, action_set: xr::ActionSet);

    fn create_action(
        &self,
        action_set: xr::ActionSet,
        info: &ActionCreateInfo,
    ) -> openxr::Result<xr::Action>;

    fn destroy_action(&self, action: xr::Action);

    fn suggest_interaction_profile_bindings(
        &self,
        profile: xr::Path,
        bindings: &[SuggestedBinding],
    ) -> openxr::Result<()>;

    fn attach_session_action_sets(
        &self,
        session: xr::Session,
        action_sets: &[xr::ActionSet],
    ) -> openxr::Result<()>;

    fn get_current_interaction_profile(
        &self,
        session: xr::Session,
        top_level_user_path: xr::Path,
    ) -> openxr::Result<xr::Path>;

    fn sync_actions(
        &self,
        session: xr::Session,
        active_action_sets: &[xr::ActiveActionSet],
    ) -> openxr::Result<()>;

    fn get_action_state_boolean(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<ActionStateReading<bool>>;

    fn get_action_state_float(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<ActionStateReading<f32>>;

    fn get_action_state_vector2f(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<ActionStateReading<[f32; 2]>>;

    /// Returns whether the pose action is active.
    fn get_action_state_pose(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<bool>;

    fn apply_haptic_feedback(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
        vibration: &HapticVibration,
    ) -> openxr::Result<()>;

    fn stop_haptic_feedback(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<()>;

    // Controller models

    /// `0` means the runtime has no model for `user_path`.
    fn get_controller_model_key(
        &self,
        session: xr::Session,
        user_path: xr::Path,
    ) -> openxr::Result<u64>;

    /// Two-call idiom: an empty `buffer` only reports the required size.
    fn load_controller_model(
        &self,
        session: xr::Session,
        model_key: u64,
        buffer: &mut [u8],
    ) -> openxr::Result<usize>;

    fn get_controller_model_properties(
        &self,
        session: xr::Session,
        model_key: u64,
    ) -> openxr::Result<Vec<NodeProperty>>;

    fn get_controller_model_state(
        &self,
        session: xr::Session,
        model_key: u64,
    ) -> openxr::Result<Vec<xr::Posef>>;
}

/// Runs the two-call enumeration idiom around `f(capacity, count_output, out)`.
pub(crate) unsafe fn call_enumerate<T: Copy>(
    mut f: impl FnMut(u32, *mut u32, *mut T) -> xr::Result,
    default: T,
) -> openxr::Result<Vec<T>> {
    let mut count = 0;

    f(0, &mut count, std::ptr::null_mut()).result()?;

    let mut vec = vec![default; count as usize];

    f(count, &mut count, vec.as_mut_ptr()).result()?;
    vec.truncate(count as usize);
    Ok(vec)
}

pub(crate) fn c_chars_to_string(chars: &[c_char]) -> String {
    let bytes = chars
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect::<Vec<_>>();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Copies `value` into a fixed size C string field, truncating if needed.
pub(crate) fn place_c_chars(out: &mut [c_char], value: &str) {
    let len = value.len().min(out.len().saturating_sub(1));
    for (dst, src) in out.iter_mut().zip(value.as_bytes()[..len].iter()) {
        *dst = *src as c_char;
    }
    if let Some(terminator) = out.get_mut(len) {
        *terminator = 0;
    }
}
