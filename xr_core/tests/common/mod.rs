#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::ffi::c_void;
use std::sync::{Arc, Mutex, MutexGuard};

use openxr::sys as xr;
use serde_json::json;
use xr_core::config::GraphicsBindingType;
use xr_core::graphics::{self, ChosenFormat, GraphicsBinding};
use xr_core::runtime::{
    ActionCreateInfo, ActionStateReading, FrameTiming, HapticVibration, InstanceCreateInfo,
    LocatedView, NodeProperty, ProjectionLayer, Runtime, RuntimeEvent, RuntimeId, RuntimeLoader,
    RuntimeProperties, SpaceLocation, SuggestedBinding, SwapchainCreateInfo, ViewConfigView,
};
use xr_core::types::{
    DrawViewInfo, HostGraphicsContext, RenderedView, SwapchainImage, TransferMode,
    VulkanDeviceIdentity,
};
use xr_core::{Context, ContextCreateInfo, ImageFormat, SessionBeginInfo, XrError, XrResult};

pub const FORMAT_RGBA8: i64 = 37;
pub const FORMAT_BGRA8: i64 = 44;
pub const FORMAT_RGBA16F: i64 = 97;
pub const FORMAT_R8: i64 = 9;

pub fn fake_format_code(format: ImageFormat) -> Option<i64> {
    match format {
        ImageFormat::Rgba8Unorm => Some(FORMAT_RGBA8),
        ImageFormat::Bgra8Unorm => Some(FORMAT_BGRA8),
        ImageFormat::Rgba16Float => Some(FORMAT_RGBA16F),
        _ => None,
    }
}

#[derive(Clone, Copy)]
pub struct EndedFrame {
    pub display_time: xr::Time,
    pub blend_mode: xr::EnvironmentBlendMode,
    pub layer_flags: Option<xr::CompositionLayerFlags>,
    pub layer_views: Option<usize>,
}

/// Everything the fake runtime reports and everything it was asked to do.
pub struct FakeState {
    next_handle: u64,
    paths: Vec<String>,
    pub calls: Vec<&'static str>,

    // Scripted answers
    pub fail_instance: bool,
    pub view_count: usize,
    pub foveation: bool,
    pub blend_modes: Vec<xr::EnvironmentBlendMode>,
    pub stage_unsupported: bool,
    pub stage_bounds: (f32, f32),
    pub swapchain_formats: Vec<i64>,
    pub unmet_requirement: Option<String>,
    pub transfer_mode: TransferMode,
    pub fail_submit: bool,
    pub fail_release: bool,
    pub should_render: bool,
    pub display_time: i64,
    pub events: VecDeque<RuntimeEvent>,
    pub current_profiles: HashMap<u64, xr::Path>,
    pub boolean_states: HashMap<(u64, u64), ActionStateReading<bool>>,
    pub float_states: HashMap<(u64, u64), ActionStateReading<f32>>,
    pub vector2f_states: HashMap<(u64, u64), ActionStateReading<[f32; 2]>>,
    pub pose_active: bool,
    pub space_location: SpaceLocation,
    pub reject_suggestions: bool,
    pub controller_model_key: u64,
    pub controller_model: Vec<u8>,
    pub node_properties: Vec<NodeProperty>,
    pub node_states: Vec<xr::Posef>,

    // Recorded requests
    pub requested_layers: Vec<String>,
    pub requested_extensions: Vec<String>,
    pub debug_messenger: bool,
    pub reference_spaces: Vec<(xr::ReferenceSpaceType, xr::Space)>,
    pub action_spaces: Vec<(xr::Action, xr::Path, xr::Posef)>,
    pub destroyed_spaces: Vec<xr::Space>,
    pub swapchains: Vec<SwapchainCreateInfo>,
    pub destroyed_swapchains: Vec<xr::Swapchain>,
    pub acquired: usize,
    pub released: usize,
    pub suggested: Vec<(xr::Path, Vec<SuggestedBinding>)>,
    pub attached: Vec<Vec<xr::ActionSet>>,
    pub synced: Vec<Vec<xr::ActiveActionSet>>,
    pub destroyed_actions: Vec<xr::Action>,
    pub destroyed_action_sets: Vec<xr::ActionSet>,
    pub haptics: Vec<(xr::Action, xr::Path, HapticVibration)>,
    pub stopped_haptics: Vec<(xr::Action, xr::Path)>,
    pub submitted: Vec<(u64, DrawViewInfo)>,
    pub ended_frames: Vec<EndedFrame>,
    pub model_loads: usize,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            next_handle: 1,
            paths: Vec::new(),
            calls: Vec::new(),
            fail_instance: false,
            view_count: 2,
            foveation: false,
            blend_modes: vec![xr::EnvironmentBlendMode::OPAQUE],
            stage_unsupported: false,
            stage_bounds: (2.0, 3.0),
            swapchain_formats: vec![FORMAT_BGRA8, FORMAT_R8],
            unmet_requirement: None,
            transfer_mode: TransferMode::ZeroCopy,
            fail_submit: false,
            fail_release: false,
            should_render: true,
            display_time: 1_000,
            events: VecDeque::new(),
            current_profiles: HashMap::new(),
            boolean_states: HashMap::new(),
            float_states: HashMap::new(),
            vector2f_states: HashMap::new(),
            pose_active: true,
            space_location: SpaceLocation {
                flags: xr::SpaceLocationFlags::POSITION_VALID
                    | xr::SpaceLocationFlags::ORIENTATION_VALID
                    | xr::SpaceLocationFlags::ORIENTATION_TRACKED,
                pose: pose([1.0, 2.0, 3.0]),
            },
            reject_suggestions: false,
            controller_model_key: 0,
            controller_model: Vec::new(),
            node_properties: Vec::new(),
            node_states: Vec::new(),
            requested_layers: Vec::new(),
            requested_extensions: Vec::new(),
            debug_messenger: false,
            reference_spaces: Vec::new(),
            action_spaces: Vec::new(),
            destroyed_spaces: Vec::new(),
            swapchains: Vec::new(),
            destroyed_swapchains: Vec::new(),
            acquired: 0,
            released: 0,
            suggested: Vec::new(),
            attached: Vec::new(),
            synced: Vec::new(),
            destroyed_actions: Vec::new(),
            destroyed_action_sets: Vec::new(),
            haptics: Vec::new(),
            stopped_haptics: Vec::new(),
            submitted: Vec::new(),
            ended_frames: Vec::new(),
            model_loads: 0,
        }
    }
}

impl FakeState {
    fn handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    pub fn intern(&mut self, path: &str) -> xr::Path {
        let index = match self.paths.iter().position(|known| known == path) {
            Some(index) => index,
            None => {
                self.paths.push(path.to_owned());
                self.paths.len() - 1
            }
        };
        xr::Path::from_raw(index as u64 + 1)
    }

    pub fn reference_space_types(&self) -> Vec<xr::ReferenceSpaceType> {
        self.reference_spaces.iter().map(|(ty, _)| *ty).collect()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|made| **made == call).count()
    }
}

pub fn pose(position: [f32; 3]) -> xr::Posef {
    xr::Posef {
        orientation: xr::Quaternionf {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        },
        position: xr::Vector3f {
            x: position[0],
            y: position[1],
            z: position[2],
        },
    }
}

pub struct FakeRuntime {
    properties: RuntimeProperties,
    state: Arc<Mutex<FakeState>>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Self::with_id(RuntimeId::Monado)
    }

    pub fn with_id(id: RuntimeId) -> Arc<Self> {
        Arc::new(Self {
            properties: RuntimeProperties {
                name: format!("{:?}", id),
                id,
                version: xr::Version::new(1, 2, 3),
            },
            state: Arc::new(Mutex::new(FakeState::default())),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn path(&self, path: &str) -> xr::Path {
        self.state().intern(path)
    }

    /// Scripts the boolean state of `action` on `subaction_path`.
    pub fn set_boolean(&self, action: xr::Action, subaction_path: &str, current_state: bool, is_active: bool) {
        let path = self.path(subaction_path);
        self.state().boolean_states.insert(
            (action.into_raw(), path.into_raw()),
            ActionStateReading {
                current_state,
                is_active,
            },
        );
    }

    pub fn set_current_profile(&self, subaction_path: &str, profile_path: &str) {
        let subaction = self.path(subaction_path);
        let profile = self.path(profile_path);
        self.state()
            .current_profiles
            .insert(subaction.into_raw(), profile);
    }

    fn record(&self, call: &'static str) -> MutexGuard<'_, FakeState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }
}

impl Runtime for FakeRuntime {
    fn properties(&self) -> &RuntimeProperties {
        &self.properties
    }

    fn result_to_string(&self, result: xr::Result) -> String {
        format!("{:?}", result)
    }

    fn get_system(&self, _form_factor: xr::FormFactor) -> openxr::Result<xr::SystemId> {
        self.record("get_system");
        Ok(xr::SystemId::from_raw(7))
    }

    fn supports_foveated_rendering(&self, _system: xr::SystemId) -> openxr::Result<bool> {
        Ok(self.state().foveation)
    }

    fn enumerate_view_configuration_views(
        &self,
        _system: xr::SystemId,
        view_type: xr::ViewConfigurationType,
        _foveated: bool,
    ) -> openxr::Result<Vec<ViewConfigView>> {
        let count = if view_type == xr::ViewConfigurationType::PRIMARY_QUAD_VARJO {
            4
        } else {
            self.state().view_count
        };
        Ok(vec![
            ViewConfigView {
                recommended_width: 64,
                recommended_height: 32,
                recommended_sample_count: 1,
                max_width: 128,
                max_height: 64,
            };
            count
        ])
    }

    fn enumerate_environment_blend_modes(
        &self,
        _system: xr::SystemId,
        _view_type: xr::ViewConfigurationType,
    ) -> openxr::Result<Vec<xr::EnvironmentBlendMode>> {
        Ok(self.state().blend_modes.clone())
    }

    fn create_graphics_binding(
        &self,
        binding_type: GraphicsBindingType,
    ) -> XrResult<Box<dyn GraphicsBinding>> {
        self.record("create_graphics_binding");
        Ok(Box::new(FakeBinding {
            binding_type,
            state: self.state.clone(),
        }))
    }

    fn create_session(
        &self,
        _system: xr::SystemId,
        _graphics_binding: *const c_void,
    ) -> openxr::Result<xr::Session> {
        let mut state = self.record("create_session");
        Ok(xr::Session::from_raw(state.handle()))
    }

    fn destroy_session(&self, _session: xr::Session) {
        self.record("destroy_session");
    }

    fn begin_session(
        &self,
        _session: xr::Session,
        _view_type: xr::ViewConfigurationType,
    ) -> openxr::Result<()> {
        self.record("begin_session");
        Ok(())
    }

    fn end_session(&self, _session: xr::Session) -> openxr::Result<()> {
        self.record("end_session");
        Ok(())
    }

    fn request_exit_session(&self, _session: xr::Session) -> openxr::Result<()> {
        self.record("request_exit_session");
        Ok(())
    }

    fn poll_event(&self) -> openxr::Result<Option<RuntimeEvent>> {
        Ok(self.state().events.pop_front())
    }

    fn create_reference_space(
        &self,
        _session: xr::Session,
        space_type: xr::ReferenceSpaceType,
        _pose: xr::Posef,
    ) -> openxr::Result<xr::Space> {
        let mut state = self.record("create_reference_space");
        if space_type == xr::ReferenceSpaceType::STAGE && state.stage_unsupported {
            return Err(xr::Result::ERROR_REFERENCE_SPACE_UNSUPPORTED);
        }
        let space = xr::Space::from_raw(state.handle());
        state.reference_spaces.push((space_type, space));
        Ok(space)
    }

    fn get_reference_space_bounds_rect(
        &self,
        _session: xr::Session,
        _space_type: xr::ReferenceSpaceType,
    ) -> openxr::Result<xr::Extent2Df> {
        let (width, height) = self.state().stage_bounds;
        Ok(xr::Extent2Df { width, height })
    }

    fn create_action_space(
        &self,
        _session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
        pose: xr::Posef,
    ) -> openxr::Result<xr::Space> {
        let mut state = self.record("create_action_space");
        let space = xr::Space::from_raw(state.handle());
        state.action_spaces.push((action, subaction_path, pose));
        Ok(space)
    }

    fn locate_space(
        &self,
        _space: xr::Space,
        _base_space: xr::Space,
        _time: xr::Time,
    ) -> openxr::Result<SpaceLocation> {
        Ok(self.record("locate_space").space_location)
    }

    fn destroy_space(&self, space: xr::Space) {
        self.record("destroy_space").destroyed_spaces.push(space);
    }

    fn enumerate_swapchain_formats(&self, _session: xr::Session) -> openxr::Result<Vec<i64>> {
        Ok(self.state().swapchain_formats.clone())
    }

    fn create_swapchain(
        &self,
        _session: xr::Session,
        info: &SwapchainCreateInfo,
    ) -> openxr::Result<xr::Swapchain> {
        let mut state = self.record("create_swapchain");
        state.swapchains.push(*info);
        Ok(xr::Swapchain::from_raw(state.handle()))
    }

    fn destroy_swapchain(&self, swapchain: xr::Swapchain) {
        self.record("destroy_swapchain")
            .destroyed_swapchains
            .push(swapchain);
    }

    fn acquire_swapchain_image(&self, _swapchain: xr::Swapchain) -> openxr::Result<u32> {
        let mut state = self.record("acquire_swapchain_image");
        state.acquired += 1;
        Ok((state.acquired % 3) as u32)
    }

    fn wait_swapchain_image(
        &self,
        _swapchain: xr::Swapchain,
        timeout: xr::Duration,
    ) -> openxr::Result<()> {
        assert!(timeout == xr::Duration::INFINITE);
        self.record("wait_swapchain_image");
        Ok(())
    }

    fn release_swapchain_image(&self, _swapchain: xr::Swapchain) -> openxr::Result<()> {
        let mut state = self.record("release_swapchain_image");
        if state.fail_release {
            return Err(xr::Result::ERROR_CALL_ORDER_INVALID);
        }
        state.released += 1;
        Ok(())
    }

    fn wait_frame(&self, _session: xr::Session) -> openxr::Result<FrameTiming> {
        let state = self.record("wait_frame");
        Ok(FrameTiming {
            predicted_display_time: xr::Time::from_nanos(state.display_time),
            predicted_display_period: xr::Duration::from_nanos(11_111_111),
            should_render: state.should_render,
        })
    }

    fn begin_frame(&self, _session: xr::Session) -> openxr::Result<()> {
        self.record("begin_frame");
        Ok(())
    }

    fn locate_views(
        &self,
        _session: xr::Session,
        view_type: xr::ViewConfigurationType,
        _display_time: xr::Time,
        _space: xr::Space,
        _foveated: bool,
    ) -> openxr::Result<Vec<LocatedView>> {
        let count = if view_type == xr::ViewConfigurationType::PRIMARY_QUAD_VARJO {
            4
        } else {
            self.state().view_count
        };
        Ok((0..count)
            .map(|i| LocatedView {
                pose: pose([i as f32 * 0.1, 1.6, 0.0]),
                fov: xr::Fovf {
                    angle_left: -0.8,
                    angle_right: 0.8,
                    angle_up: 0.7,
                    angle_down: -0.7,
                },
            })
            .collect())
    }

    fn end_frame(
        &self,
        _session: xr::Session,
        display_time: xr::Time,
        blend_mode: xr::EnvironmentBlendMode,
        layer: Option<&ProjectionLayer>,
    ) -> openxr::Result<()> {
        self.record("end_frame").ended_frames.push(EndedFrame {
            display_time,
            blend_mode,
            layer_flags: layer.map(|layer| layer.flags),
            layer_views: layer.map(|layer| layer.views.len()),
        });
        Ok(())
    }

    fn string_to_path(&self, path: &str) -> openxr::Result<xr::Path> {
        if !path.starts_with('/') || path.contains(' ') {
            return Err(xr::Result::ERROR_PATH_FORMAT_INVALID);
        }
        Ok(self.path(path))
    }

    fn path_to_string(&self, path: xr::Path) -> openxr::Result<String> {
        let index = path.into_raw() as usize;
        self.state()
            .paths
            .get(index.wrapping_sub(1))
            .cloned()
            .ok_or(xr::Result::ERROR_PATH_INVALID)
    }

    fn create_action_set(
        &self,
        name: &str,
        _localized_name: &str,
        _priority: u32,
    ) -> openxr::Result<xr::ActionSet> {
        if name.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(xr::Result::ERROR_NAME_INVALID);
        }
        let mut state = self.record("create_action_set");
        Ok(xr::ActionSet::from_raw(state.handle()))
    }

    fn destroy_action_set(&self, action_set: xr::ActionSet) {
        self.record("destroy_action_set")
            .destroyed_action_sets
            .push(action_set);
    }

    fn create_action(
        &self,
        _action_set: xr::ActionSet,
        info: &ActionCreateInfo,
    ) -> openxr::Result<xr::Action> {
        if info.name.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(xr::Result::ERROR_NAME_INVALID);
        }
        let mut state = self.record("create_action");
        Ok(xr::Action::from_raw(state.handle()))
    }

    fn destroy_action(&self, action: xr::Action) {
        self.record("destroy_action").destroyed_actions.push(action);
    }

    fn suggest_interaction_profile_bindings(
        &self,
        profile: xr::Path,
        bindings: &[SuggestedBinding],
    ) -> openxr::Result<()> {
        let mut state = self.record("suggest_interaction_profile_bindings");
        if state.reject_suggestions {
            return Err(xr::Result::ERROR_PATH_UNSUPPORTED);
        }
        state.suggested.push((profile, bindings.to_vec()));
        Ok(())
    }

    fn attach_session_action_sets(
        &self,
        _session: xr::Session,
        action_sets: &[xr::ActionSet],
    ) -> openxr::Result<()> {
        self.record("attach_session_action_sets")
            .attached
            .push(action_sets.to_vec());
        Ok(())
    }

    fn get_current_interaction_profile(
        &self,
        _session: xr::Session,
        top_level_user_path: xr::Path,
    ) -> openxr::Result<xr::Path> {
        Ok(self
            .state()
            .current_profiles
            .get(&top_level_user_path.into_raw())
            .copied()
            .unwrap_or(xr::Path::NULL))
    }

    fn sync_actions(
        &self,
        _session: xr::Session,
        active_action_sets: &[xr::ActiveActionSet],
    ) -> openxr::Result<()> {
        self.record("sync_actions")
            .synced
            .push(active_action_sets.to_vec());
        Ok(())
    }

    fn get_action_state_boolean(
        &self,
        _session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<ActionStateReading<bool>> {
        Ok(self
            .state()
            .boolean_states
            .get(&(action.into_raw(), subaction_path.into_raw()))
            .copied()
            .unwrap_or(ActionStateReading {
                current_state: false,
                is_active: false,
            }))
    }

    fn get_action_state_float(
        &self,
        _session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<ActionStateReading<f32>> {
        Ok(self
            .state()
            .float_states
            .get(&(action.into_raw(), subaction_path.into_raw()))
            .copied()
            .unwrap_or(ActionStateReading {
                current_state: 0.0,
                is_active: false,
            }))
    }

    fn get_action_state_vector2f(
        &self,
        _session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<ActionStateReading<[f32; 2]>> {
        Ok(self
            .state()
            .vector2f_states
            .get(&(action.into_raw(), subaction_path.into_raw()))
            .copied()
            .unwrap_or(ActionStateReading {
                current_state: [0.0; 2],
                is_active: false,
            }))
    }

    fn get_action_state_pose(
        &self,
        _session: xr::Session,
        _action: xr::Action,
        _subaction_path: xr::Path,
    ) -> openxr::Result<bool> {
        Ok(self.state().pose_active)
    }

    fn apply_haptic_feedback(
        &self,
        _session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
        vibration: &HapticVibration,
    ) -> openxr::Result<()> {
        self.record("apply_haptic_feedback")
            .haptics
            .push((action, subaction_path, *vibration));
        Ok(())
    }

    fn stop_haptic_feedback(
        &self,
        _session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<()> {
        self.record("stop_haptic_feedback")
            .stopped_haptics
            .push((action, subaction_path));
        Ok(())
    }

    fn get_controller_model_key(
        &self,
        _session: xr::Session,
        _user_path: xr::Path,
    ) -> openxr::Result<u64> {
        Ok(self.record("get_controller_model_key").controller_model_key)
    }

    fn load_controller_model(
        &self,
        _session: xr::Session,
        _model_key: u64,
        buffer: &mut [u8],
    ) -> openxr::Result<usize> {
        let mut state = self.record("load_controller_model");
        let size = state.controller_model.len();
        if buffer.is_empty() {
            return Ok(size);
        }
        if buffer.len() < size {
            return Err(xr::Result::ERROR_SIZE_INSUFFICIENT);
        }
        buffer[..size].copy_from_slice(&state.controller_model);
        state.model_loads += 1;
        Ok(size)
    }

    fn get_controller_model_properties(
        &self,
        _session: xr::Session,
        _model_key: u64,
    ) -> openxr::Result<Vec<NodeProperty>> {
        Ok(self.state().node_properties.clone())
    }

    fn get_controller_model_state(
        &self,
        _session: xr::Session,
        _model_key: u64,
    ) -> openxr::Result<Vec<xr::Posef>> {
        Ok(self.state().node_states.clone())
    }
}

/// Records submissions instead of copying pixels.
pub struct FakeBinding {
    binding_type: GraphicsBindingType,
    state: Arc<Mutex<FakeState>>,
}

impl GraphicsBinding for FakeBinding {
    fn binding_type(&self) -> GraphicsBindingType {
        self.binding_type
    }

    fn check_version_requirements(
        &mut self,
        _host: &HostGraphicsContext,
        _system: xr::SystemId,
    ) -> XrResult<()> {
        match self.state.lock().unwrap().unmet_requirement.clone() {
            Some(requirement) => Err(XrError::Requirements(requirement)),
            None => Ok(()),
        }
    }

    fn init_from_host_context(
        &mut self,
        _host: &HostGraphicsContext,
        _system: xr::SystemId,
    ) -> XrResult<()> {
        Ok(())
    }

    fn session_create_next(&self) -> *const c_void {
        std::ptr::null()
    }

    fn choose_swapchain_format(&self, runtime_formats: &[i64]) -> Option<ChosenFormat> {
        graphics::choose_swapchain_format(
            &[
                ImageFormat::Rgba16Float,
                ImageFormat::Rgba8Unorm,
                ImageFormat::Bgra8Unorm,
            ],
            runtime_formats,
            fake_format_code,
        )
    }

    fn create_swapchain_images(
        &mut self,
        swapchain: xr::Swapchain,
    ) -> XrResult<Vec<SwapchainImage>> {
        let base = swapchain.into_raw() * 100;
        Ok((0..3).map(|i| SwapchainImage { raw: base + i }).collect())
    }

    fn submit_to_swapchain_image(
        &mut self,
        image: &SwapchainImage,
        draw_info: &DrawViewInfo,
        _rendered: &RenderedView,
    ) -> XrResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_submit {
            return Err(XrError::Graphics("scripted submission failure".to_owned()));
        }
        state.submitted.push((image.raw, *draw_info));
        Ok(())
    }

    fn needs_upside_down_drawing(&self, _host: &HostGraphicsContext) -> bool {
        false
    }

    fn transfer_mode(&self) -> TransferMode {
        self.state.lock().unwrap().transfer_mode
    }
}

pub struct FakeLoader {
    pub runtime: Arc<FakeRuntime>,
    pub layers: Vec<String>,
    pub extensions: Vec<String>,
    pub layer_extensions: HashMap<String, Vec<String>>,
}

impl FakeLoader {
    pub fn new(runtime: Arc<FakeRuntime>, extensions: &[&str]) -> Self {
        Self {
            runtime,
            layers: Vec::new(),
            extensions: extensions.iter().map(|name| name.to_string()).collect(),
            layer_extensions: HashMap::new(),
        }
    }
}

impl RuntimeLoader for FakeLoader {
    fn enumerate_api_layers(&self) -> openxr::Result<Vec<String>> {
        Ok(self.layers.clone())
    }

    fn enumerate_extensions(&self, layer: Option<&str>) -> openxr::Result<Vec<String>> {
        match layer {
            None => Ok(self.extensions.clone()),
            Some(layer) => Ok(self
                .layer_extensions
                .get(layer)
                .cloned()
                .unwrap_or_default()),
        }
    }

    fn create_instance(&self, info: &InstanceCreateInfo) -> openxr::Result<Arc<dyn Runtime>> {
        let mut state = self.runtime.state();
        if state.fail_instance {
            return Err(xr::Result::ERROR_RUNTIME_FAILURE);
        }
        state.requested_layers = info.layers.to_vec();
        state.requested_extensions = info.extensions.to_vec();
        state.debug_messenger = info.debug_messenger;
        drop(state);
        Ok(self.runtime.clone())
    }
}

/// A binding type the current platform can use.
pub fn platform_binding() -> GraphicsBindingType {
    if GraphicsBindingType::Vulkan.is_supported_on_platform() {
        GraphicsBindingType::Vulkan
    } else {
        GraphicsBindingType::Metal
    }
}

pub fn create_info() -> ContextCreateInfo {
    ContextCreateInfo {
        application_name: "tests".to_owned(),
        binding_candidates: vec![platform_binding()],
        ..Default::default()
    }
}

/// A context with every host callback installed. Draws hand back a tiny CPU image.
pub fn context(runtime: &Arc<FakeRuntime>, extensions: &[&str]) -> Context {
    let mut available = vec![platform_binding().extension_name()];
    available.extend_from_slice(extensions);
    let loader = FakeLoader::new(runtime.clone(), &available);

    let mut context = Context::new(&loader, create_info()).unwrap();
    context.set_graphics_context_bind_funcs(
        Box::new(|_| Some(HostGraphicsContext::Vulkan(VulkanDeviceIdentity::default()))),
        Box::new(|_| {}),
    );
    context.set_draw_view_func(Box::new(|info: &DrawViewInfo| RenderedView::CpuPixels {
        data: vec![0; info.width as usize * info.height as usize * 4],
        width: info.width,
        height: info.height,
    }));
    context
}

pub fn started_context(runtime: &Arc<FakeRuntime>, extensions: &[&str]) -> Context {
    let mut context = context(runtime, extensions);
    context.start_session(SessionBeginInfo::default()).unwrap();
    context
}

/// Moves the session through READY to FOCUSED.
pub fn run_session(runtime: &FakeRuntime, context: &mut Context) {
    let session = context.session().unwrap().handle();
    for state in [
        xr::SessionState::READY,
        xr::SessionState::SYNCHRONIZED,
        xr::SessionState::VISIBLE,
        xr::SessionState::FOCUSED,
    ] {
        runtime
            .state()
            .events
            .push_back(RuntimeEvent::SessionStateChanged { session, state });
    }
    assert!(context.poll_events().unwrap());
}

/// GLB with the chain `root -> a -> b`. `b` carries a single triangle.
pub fn chain_glb() -> Vec<u8> {
    let mut bin = Vec::new();
    for position in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        for value in position {
            bin.extend_from_slice(&value.to_le_bytes());
        }
    }
    for index in [0u16, 1, 2] {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let json = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "root", "children": [1] },
            { "name": "a", "translation": [1.0, 0.0, 0.0], "children": [2] },
            { "name": "b", "translation": [0.0, 1.0, 0.0], "mesh": 0 }
        ],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "buffers": [{ "byteLength": bin.len() }],
        "images": [{ "uri": "data:image/png;base64,AAAA" }]
    });
    glb(&serde_json::to_vec(&json).unwrap(), &bin)
}

pub fn glb(json: &[u8], bin: &[u8]) -> Vec<u8> {
    let mut json = json.to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(bin);
    out
}
