use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use openxr::sys as xr;

use crate::actions::{Action, ActionBindingInfo, ActionInfo, ActionSet, ActionSetInfo, ProfileBindings};
use crate::config::GraphicsBindingType;
use crate::context::{Capabilities, ContextCallbacks, SessionBeginInfo};
use crate::controller_model::{ControllerModel, ControllerModelData};
use crate::error::{ResultExt, XrError, XrResult};
use crate::graphics::GraphicsBinding;
use crate::runtime::{ProjectionLayer, Runtime, ViewConfigView};
use crate::swapchain::Swapchain;
use crate::types::{DrawViewInfo, HostGraphicsContext, Pose};

const FRAME_TIME_SAMPLES: usize = 8;

/// What the owner should do with a session after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeExpectancy {
    KeepAlive,
    Destroy,
}

/// Frame loop state, present once drawing was prepared.
struct DrawInfo {
    swapchains: Vec<Swapchain>,
    projection_views: Vec<xr::CompositionLayerProjectionView>,
    foveation_supported: bool,
    foveation_active: bool,
    blend_modes: Vec<xr::EnvironmentBlendMode>,
    blend_mode: xr::EnvironmentBlendMode,
    predicted_display_time: xr::Time,
    frame_begin: Option<Instant>,
    frame_times: VecDeque<Duration>,
}

struct Spaces {
    reference_type: xr::ReferenceSpaceType,
    reference: xr::Space,
    view: xr::Space,
    combined_eye: Option<xr::Space>,
}

pub struct Session {
    runtime: Arc<dyn Runtime>,
    capabilities: Capabilities,
    debug_time: bool,

    system: xr::SystemId,
    handle: xr::Session,
    state: xr::SessionState,
    view_type: xr::ViewConfigurationType,

    host_context: Option<HostGraphicsContext>,
    binding: Option<Box<dyn GraphicsBinding>>,
    spaces: Option<Spaces>,
    draw_info: Option<DrawInfo>,

    action_sets: BTreeMap<String, ActionSet>,
    controller_models: BTreeMap<String, ControllerModel>,
}

fn identity_pose() -> xr::Posef {
    Pose::IDENTITY.into()
}

impl Session {
    pub(crate) fn new(runtime: Arc<dyn Runtime>, capabilities: Capabilities, debug_time: bool) -> Self {
        Self {
            runtime,
            capabilities,
            debug_time,
            system: xr::SystemId::from_raw(0),
            handle: xr::Session::NULL,
            state: xr::SessionState::UNKNOWN,
            view_type: xr::ViewConfigurationType::PRIMARY_STEREO,
            host_context: None,
            binding: None,
            spaces: None,
            draw_info: None,
            action_sets: BTreeMap::new(),
            controller_models: BTreeMap::new(),
        }
    }

    pub(crate) fn start(
        &mut self,
        callbacks: &mut ContextCallbacks,
        begin_info: &mut SessionBeginInfo,
    ) -> XrResult<()> {
        if self.handle != xr::Session::NULL {
            return Err(XrError::Usage("The session was already started.".to_owned()));
        }
        let bind = callbacks.bind_graphics_context.as_mut().ok_or_else(|| {
            XrError::Usage(
                "Invalid API usage: No way to bind graphics context to the XR session. Set the graphics context bind functions before starting the session.".to_owned(),
            )
        })?;

        self.system = self
            .runtime
            .get_system(xr::FormFactor::HEAD_MOUNTED_DISPLAY)
            .or_fail("Failed to get device information. Is a device plugged in?")?;

        let binding_type = self.capabilities.binding_type;
        let host = bind(binding_type).ok_or_else(|| {
            XrError::Usage(format!(
                "Failed to bind a {:?} graphics context for the XR session.",
                binding_type
            ))
        })?;
        self.host_context = Some(host);

        let mut binding = self.runtime.create_graphics_binding(binding_type)?;
        binding.check_version_requirements(&host, self.system)?;
        binding.init_from_host_context(&host, self.system)?;

        self.handle = self
            .runtime
            .create_session(self.system, binding.session_create_next())
            .or_fail("Failed to create VR session. The OpenXR runtime may have additional requirements for the graphics driver that are not met.")?;
        self.binding = Some(binding);
        debug!("Created session {:?}", self.handle);

        self.prepare_drawing()?;
        self.create_reference_spaces()?;

        if let Some(create) = begin_info.create.take() {
            create(self);
        }
        Ok(())
    }

    fn prepare_drawing(&mut self) -> XrResult<()> {
        self.view_type = if self.capabilities.is_extension_enabled("XR_VARJO_quad_views") {
            xr::ViewConfigurationType::PRIMARY_QUAD_VARJO
        } else {
            xr::ViewConfigurationType::PRIMARY_STEREO
        };

        let foveation_supported = self
            .capabilities
            .is_extension_enabled("XR_VARJO_foveated_rendering")
            && self
                .runtime
                .supports_foveated_rendering(self.system)
                .or_fail("Failed to get foveated rendering properties.")?;

        let views: Vec<ViewConfigView> = self
            .runtime
            .enumerate_view_configuration_views(self.system, self.view_type, foveation_supported)
            .or_fail("Failed to get count of view configurations.")?;

        let blend_modes = self
            .runtime
            .enumerate_environment_blend_modes(self.system, self.view_type)
            .or_fail("Failed to get environment blend modes.")?;
        let blend_mode = if blend_modes.contains(&xr::EnvironmentBlendMode::OPAQUE) {
            xr::EnvironmentBlendMode::OPAQUE
        } else {
            blend_modes
                .first()
                .copied()
                .unwrap_or(xr::EnvironmentBlendMode::OPAQUE)
        };

        let binding = self
            .binding
            .as_deref_mut()
            .ok_or_else(|| XrError::Usage("The session has no graphics binding.".to_owned()))?;

        let mut swapchains = Vec::with_capacity(views.len());
        for view in &views {
            swapchains.push(Swapchain::new(
                self.runtime.clone(),
                binding,
                self.handle,
                view,
            )?);
        }
        let projection_views = swapchains
            .iter()
            .map(|swapchain| xr::CompositionLayerProjectionView {
                ty: xr::CompositionLayerProjectionView::TYPE,
                next: std::ptr::null(),
                pose: identity_pose(),
                fov: xr::Fovf {
                    angle_left: 0.0,
                    angle_right: 0.0,
                    angle_up: 0.0,
                    angle_down: 0.0,
                },
                sub_image: swapchain.sub_image(),
            })
            .collect();

        debug!(
            "Prepared {} views for {:?}, foveation supported: {}",
            views.len(),
            self.view_type,
            foveation_supported
        );

        self.draw_info = Some(DrawInfo {
            swapchains,
            projection_views,
            foveation_supported,
            foveation_active: false,
            blend_modes,
            blend_mode,
            predicted_display_time: xr::Time::from_nanos(0),
            frame_begin: None,
            frame_times: VecDeque::with_capacity(FRAME_TIME_SAMPLES),
        });
        Ok(())
    }

    /// Stage space, or local when the runtime lacks stage support or stage bounds.
    fn create_reference_spaces(&mut self) -> XrResult<()> {
        let runtime = &self.runtime;
        let session = self.handle;

        let (reference_type, reference) = match runtime
            .create_reference_space(session, xr::ReferenceSpaceType::STAGE, identity_pose())
            .or_fail("Failed to create stage reference space.")
        {
            Ok(stage) => {
                let bounds = match runtime
                    .get_reference_space_bounds_rect(session, xr::ReferenceSpaceType::STAGE)
                    .or_fail("Failed to get stage reference space bounds.")
                {
                    Ok(bounds) => bounds,
                    Err(err) => {
                        runtime.destroy_space(stage);
                        return Err(err);
                    }
                };
                if bounds.width == 0.0 || bounds.height == 0.0 {
                    warn!("XR runtime does not have valid bounds for stage reference space, falling back to local reference space.");
                    runtime.destroy_space(stage);
                    (
                        xr::ReferenceSpaceType::LOCAL,
                        runtime
                            .create_reference_space(session, xr::ReferenceSpaceType::LOCAL, identity_pose())
                            .or_fail("Failed to create local reference space.")?,
                    )
                } else {
                    (xr::ReferenceSpaceType::STAGE, stage)
                }
            }
            Err(err) if err.is_tolerated_space_error() => {
                warn!("XR runtime does not support stage reference space, falling back to local reference space.");
                (
                    xr::ReferenceSpaceType::LOCAL,
                    runtime
                        .create_reference_space(session, xr::ReferenceSpaceType::LOCAL, identity_pose())
                        .or_fail("Failed to create local reference space.")?,
                )
            }
            Err(err) => return Err(err),
        };

        let view = match runtime
            .create_reference_space(session, xr::ReferenceSpaceType::VIEW, identity_pose())
            .or_fail("Failed to create view reference space.")
        {
            Ok(view) => view,
            Err(err) => {
                runtime.destroy_space(reference);
                return Err(err);
            }
        };

        let foveation_supported = self
            .draw_info
            .as_ref()
            .map_or(false, |draw_info| draw_info.foveation_supported);
        let combined_eye = if foveation_supported {
            match runtime
                .create_reference_space(
                    session,
                    xr::ReferenceSpaceType::COMBINED_EYE_VARJO,
                    identity_pose(),
                )
                .or_fail("Failed to create combined eye reference space.")
            {
                Ok(space) => Some(space),
                Err(err) => {
                    runtime.destroy_space(view);
                    runtime.destroy_space(reference);
                    return Err(err);
                }
            }
        } else {
            None
        };

        debug!("Using {:?} reference space", reference_type);
        self.spaces = Some(Spaces {
            reference_type,
            reference,
            view,
            combined_eye,
        });
        Ok(())
    }

    pub fn handle_state_change(&mut self, state: xr::SessionState) -> XrResult<LifeExpectancy> {
        debug!("Session state {:?} -> {:?}", self.state, state);
        self.state = state;

        match state {
            xr::SessionState::READY => self
                .runtime
                .begin_session(self.handle, self.view_type)
                .or_fail("Failed to cleanly begin the VR session.")?,
            xr::SessionState::STOPPING => self
                .runtime
                .end_session(self.handle)
                .or_fail("Failed to cleanly end the VR session.")?,
            xr::SessionState::EXITING | xr::SessionState::LOSS_PENDING => {
                return Ok(LifeExpectancy::Destroy)
            }
            _ => {}
        }
        Ok(LifeExpectancy::KeepAlive)
    }

    pub fn is_running(&self) -> bool {
        self.handle != xr::Session::NULL
            && matches!(
                self.state,
                xr::SessionState::READY
                    | xr::SessionState::SYNCHRONIZED
                    | xr::SessionState::VISIBLE
                    | xr::SessionState::FOCUSED
            )
    }

    /// Asks the runtime to wind the session down. The state change events do the rest.
    pub fn request_end(&self) -> XrResult<()> {
        if self.handle == xr::Session::NULL {
            return Ok(());
        }
        self.runtime
            .request_exit_session(self.handle)
            .or_fail("Failed to request the end of the VR session.")
    }

    /// Renders one frame: wait, begin, draw every view, end.
    pub fn draw(&mut self, callbacks: &mut ContextCallbacks) -> XrResult<()> {
        let runtime = &self.runtime;
        let session = self.handle;
        let draw_info = self
            .draw_info
            .as_mut()
            .ok_or_else(|| XrError::Usage("The session is not prepared for drawing.".to_owned()))?;
        let spaces = self
            .spaces
            .as_ref()
            .ok_or_else(|| XrError::Usage("The session has no reference space.".to_owned()))?;
        let binding = self
            .binding
            .as_deref_mut()
            .ok_or_else(|| XrError::Usage("The session has no graphics binding.".to_owned()))?;
        let host = self
            .host_context
            .ok_or_else(|| XrError::Usage("The session has no graphics context.".to_owned()))?;

        if self.debug_time {
            draw_info.frame_begin = Some(Instant::now());
        }

        let timing = runtime
            .wait_frame(session)
            .or_fail("Failed to synchronize frame rates between the application and the device.")?;
        draw_info.predicted_display_time = timing.predicted_display_time;

        draw_info.foveation_active = match spaces.combined_eye {
            Some(combined_eye) => runtime
                .locate_space(combined_eye, spaces.view, timing.predicted_display_time)
                .or_fail("Failed to locate combined eye space.")?
                .flags
                .contains(xr::SpaceLocationFlags::ORIENTATION_TRACKED),
            None => false,
        };

        runtime
            .begin_frame(session)
            .or_fail("Failed to submit frame rendering start state.")?;

        let mut layer_flags = xr::CompositionLayerFlags::EMPTY;
        let mut blend_mode = draw_info.blend_mode;
        let passthrough = callbacks
            .passthrough_enabled
            .as_mut()
            .map_or(false, |enabled| enabled());
        if passthrough {
            if draw_info
                .blend_modes
                .contains(&xr::EnvironmentBlendMode::ALPHA_BLEND)
            {
                layer_flags |= xr::CompositionLayerFlags::BLEND_TEXTURE_SOURCE_ALPHA;
                blend_mode = xr::EnvironmentBlendMode::ALPHA_BLEND;
            } else if let Some(disable) = callbacks.disable_passthrough.as_mut() {
                warn!("XR runtime does not support alpha blending, disabling passthrough.");
                disable();
            }
        }

        let drew = if timing.should_render {
            let draw_view = callbacks.draw_view.as_mut().ok_or_else(|| {
                XrError::Usage(
                    "Invalid API usage: No way to draw views. Set the draw view function before drawing.".to_owned(),
                )
            })?;

            let views = runtime
                .locate_views(
                    session,
                    self.view_type,
                    timing.predicted_display_time,
                    spaces.reference,
                    draw_info.foveation_active,
                )
                .or_fail("Failed to query frame view and projection state.")?;
            let local_views = runtime
                .locate_views(
                    session,
                    self.view_type,
                    timing.predicted_display_time,
                    spaces.view,
                    draw_info.foveation_active,
                )
                .or_fail("Failed to query frame view and projection state.")?;

            if views.len() != draw_info.swapchains.len() || local_views.len() != views.len() {
                return Err(XrError::Graphics(format!(
                    "The runtime located {} views for {} swapchains",
                    views.len(),
                    draw_info.swapchains.len()
                )));
            }

            let upside_down = binding.needs_upside_down_drawing(&host);
            let transfer_mode = binding.transfer_mode();
            for (view_index, ((view, local_view), swapchain)) in views
                .iter()
                .zip(&local_views)
                .zip(draw_info.swapchains.iter_mut())
                .enumerate()
            {
                let image = swapchain.acquire_drawable_image()?;

                let info = DrawViewInfo {
                    view_index,
                    swapchain_format: swapchain.format(),
                    image_format: swapchain.image_format(),
                    expects_srgb_buffer: swapchain.is_buffer_srgb(),
                    offset_x: 0,
                    offset_y: 0,
                    width: swapchain.width(),
                    height: swapchain.height(),
                    eye_pose: view.pose.into(),
                    local_pose: local_view.pose.into(),
                    fov: view.fov.into(),
                    foveation_active: draw_info.foveation_active,
                    upside_down,
                    transfer_mode,
                };
                let rendered = draw_view(&info);
                binding.submit_to_swapchain_image(&image, &info, &rendered)?;
                swapchain.release_image()?;

                let projection_view = &mut draw_info.projection_views[view_index];
                projection_view.pose = view.pose;
                projection_view.fov = view.fov;
                projection_view.sub_image = swapchain.sub_image();
            }
            true
        } else {
            false
        };

        let layer = ProjectionLayer {
            space: spaces.reference,
            flags: layer_flags,
            views: &draw_info.projection_views,
        };
        runtime
            .end_frame(
                session,
                timing.predicted_display_time,
                blend_mode,
                drew.then_some(&layer),
            )
            .or_fail("Failed to submit rendered frame.")?;

        if let Some(begin) = draw_info.frame_begin.take() {
            log_frame_time(&mut draw_info.frame_times, begin.elapsed());
        }
        Ok(())
    }

    // Actions

    pub fn create_action_set(&mut self, info: ActionSetInfo) -> XrResult<bool> {
        if self.action_sets.contains_key(&info.name) {
            warn!("Action set \"{}\" already exists", info.name);
            return Ok(false);
        }
        let name = info.name.clone();
        let action_set = ActionSet::new(self.runtime.clone(), info)?;
        self.action_sets.insert(name, action_set);
        Ok(true)
    }

    pub fn destroy_action_set(&mut self, name: &str) -> bool {
        self.action_sets.remove(name).is_some()
    }

    /// Creates every action in `infos`. `Ok(false)` when at least one name was taken.
    pub fn create_actions(&mut self, action_set_name: &str, infos: Vec<ActionInfo>) -> XrResult<bool> {
        let action_set = self.action_set_mut_or_err(action_set_name)?;
        let mut all_created = true;
        for info in infos {
            all_created &= action_set.create_action(info)?;
        }
        Ok(all_created)
    }

    pub fn destroy_actions(&mut self, action_set_name: &str, action_names: &[&str]) -> XrResult<()> {
        let action_set = self.action_set_mut_or_err(action_set_name)?;
        for name in action_names {
            if !action_set.destroy_action(name) {
                debug!("No action \"{}\" to destroy in \"{}\"", name, action_set_name);
            }
        }
        Ok(())
    }

    pub fn create_action_bindings(
        &mut self,
        action_set_name: &str,
        infos: &[ActionBindingInfo],
    ) -> XrResult<()> {
        let session = self.handle;
        let action_set = self.action_set_mut_or_err(action_set_name)?;
        for info in infos {
            let action = action_set.find_action_mut(&info.action_name).ok_or_else(|| {
                XrError::Usage(format!(
                    "Action \"{}\" not found in action set \"{}\"",
                    info.action_name, action_set_name
                ))
            })?;
            action.create_binding(session, info)?;
        }
        Ok(())
    }

    /// Removes `(action name, profile path)` bindings.
    pub fn destroy_action_bindings(
        &mut self,
        action_set_name: &str,
        bindings: &[(&str, &str)],
    ) -> XrResult<()> {
        let action_set = self.action_set_mut_or_err(action_set_name)?;
        for (action_name, profile_path) in bindings {
            if let Some(action) = action_set.find_action_mut(action_name) {
                action.destroy_binding(profile_path);
            }
        }
        Ok(())
    }

    /// Suggests every binding of every action set per profile, then attaches all sets at once.
    pub fn attach_action_sets(&mut self) -> XrResult<()> {
        let mut profile_bindings = ProfileBindings::new();
        for action_set in self.action_sets.values() {
            action_set.get_bindings(&mut profile_bindings);
        }

        for (profile, bindings) in &profile_bindings {
            if bindings.is_empty() {
                continue;
            }
            self.runtime
                .suggest_interaction_profile_bindings(xr::Path::from_raw(*profile), bindings)
                .or_fail("Failed to suggest interaction profile bindings.")?;
        }

        let handles = self
            .action_sets
            .values()
            .map(ActionSet::handle)
            .collect::<Vec<_>>();
        self.runtime
            .attach_session_action_sets(self.handle, &handles)
            .or_fail("Failed to attach XR action sets.")?;
        debug!("Attached {} action sets", handles.len());
        Ok(())
    }

    /// Syncs one action set, or all of them with `None`, and refreshes their states.
    pub fn sync_actions(&mut self, action_set_name: Option<&str>) -> XrResult<()> {
        let names = match action_set_name {
            Some(name) => {
                if !self.action_sets.contains_key(name) {
                    return Err(XrError::Usage(format!("Action set \"{}\" not found", name)));
                }
                vec![name.to_owned()]
            }
            None => self.action_sets.keys().cloned().collect(),
        };
        if names.is_empty() {
            return Err(XrError::Usage("No action sets to sync.".to_owned()));
        }

        let active = names
            .iter()
            .filter_map(|name| self.action_sets.get(name))
            .map(|action_set| xr::ActiveActionSet {
                action_set: action_set.handle(),
                subaction_path: xr::Path::NULL,
            })
            .collect::<Vec<_>>();
        self.runtime
            .sync_actions(self.handle, &active)
            .or_fail("Failed to synchronize XR actions.")?;

        let reference_space = self
            .spaces
            .as_ref()
            .map_or(xr::Space::NULL, |spaces| spaces.reference);
        let predicted_display_time = self
            .draw_info
            .as_ref()
            .map_or(xr::Time::from_nanos(0), |draw_info| draw_info.predicted_display_time);

        for name in &names {
            if let Some(action_set) = self.action_sets.get_mut(name) {
                action_set.update_states(self.handle, reference_space, predicted_display_time)?;
            }
        }
        Ok(())
    }

    pub fn apply_haptic_action(
        &self,
        action_set_name: &str,
        action_name: &str,
        subaction_path: Option<&str>,
        duration_ns: i64,
        frequency: f32,
        amplitude: f32,
    ) -> XrResult<()> {
        self.action_or_err(action_set_name, action_name)?.apply_haptic_feedback(
            self.handle,
            duration_ns,
            frequency,
            amplitude,
            subaction_path,
        )
    }

    pub fn stop_haptic_action(
        &self,
        action_set_name: &str,
        action_name: &str,
        subaction_path: Option<&str>,
    ) -> XrResult<()> {
        self.action_or_err(action_set_name, action_name)?
            .stop_haptic_feedback(self.handle, subaction_path)
    }

    pub fn action_set(&self, name: &str) -> Option<&ActionSet> {
        self.action_sets.get(name)
    }

    pub fn action_set_mut(&mut self, name: &str) -> Option<&mut ActionSet> {
        self.action_sets.get_mut(name)
    }

    pub fn action(&self, action_set_name: &str, action_name: &str) -> Option<&Action> {
        self.action_sets
            .get(action_set_name)
            .and_then(|action_set| action_set.find_action(action_name))
    }

    pub fn action_mut(&mut self, action_set_name: &str, action_name: &str) -> Option<&mut Action> {
        self.action_sets
            .get_mut(action_set_name)
            .and_then(|action_set| action_set.find_action_mut(action_name))
    }

    pub fn action_set_custom_data(&self, action_set_name: &str) -> Option<&dyn Any> {
        self.action_sets.get(action_set_name)?.custom_data()
    }

    pub fn action_custom_data(&self, action_set_name: &str, action_name: &str) -> Option<&dyn Any> {
        self.action(action_set_name, action_name)?.custom_data()
    }

    fn action_set_mut_or_err(&mut self, name: &str) -> XrResult<&mut ActionSet> {
        self.action_sets
            .get_mut(name)
            .ok_or_else(|| XrError::Usage(format!("Action set \"{}\" not found", name)))
    }

    fn action_or_err(&self, action_set_name: &str, action_name: &str) -> XrResult<&Action> {
        self.action(action_set_name, action_name).ok_or_else(|| {
            XrError::Usage(format!(
                "Action \"{}\" not found in action set \"{}\"",
                action_name, action_set_name
            ))
        })
    }

    // Controller models

    /// `Ok(false)` when the runtime does not offer controller models.
    pub fn load_controller_model(&mut self, subaction_path: &str) -> XrResult<bool> {
        if !self
            .capabilities
            .is_extension_enabled("XR_MSFT_controller_model")
        {
            return Ok(false);
        }
        let runtime = self.runtime.clone();
        self.controller_models
            .entry(subaction_path.to_owned())
            .or_insert_with(|| ControllerModel::new(runtime, subaction_path))
            .load(self.handle)?;
        Ok(true)
    }

    pub fn unload_controller_model(&mut self, subaction_path: &str) -> bool {
        self.controller_models.remove(subaction_path).is_some()
    }

    /// `Ok(false)` when no model was requested for `subaction_path`.
    pub fn update_controller_model_components(&mut self, subaction_path: &str) -> XrResult<bool> {
        match self.controller_models.get_mut(subaction_path) {
            Some(model) => model.update_components(self.handle).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn controller_model_data(
        &mut self,
        subaction_path: &str,
    ) -> XrResult<Option<ControllerModelData<'_>>> {
        match self.controller_models.get_mut(subaction_path) {
            Some(model) => model.data(),
            None => Ok(None),
        }
    }

    // Accessors

    pub fn handle(&self) -> xr::Session {
        self.handle
    }

    pub fn state(&self) -> xr::SessionState {
        self.state
    }

    pub fn system(&self) -> xr::SystemId {
        self.system
    }

    pub fn view_type(&self) -> xr::ViewConfigurationType {
        self.view_type
    }

    pub fn binding_type(&self) -> Option<GraphicsBindingType> {
        self.binding.as_ref().map(|binding| binding.binding_type())
    }

    pub fn reference_space_type(&self) -> Option<xr::ReferenceSpaceType> {
        self.spaces.as_ref().map(|spaces| spaces.reference_type)
    }

    pub fn view_count(&self) -> usize {
        self.draw_info
            .as_ref()
            .map_or(0, |draw_info| draw_info.swapchains.len())
    }

    pub fn is_foveation_supported(&self) -> bool {
        self.draw_info
            .as_ref()
            .map_or(false, |draw_info| draw_info.foveation_supported)
    }

    pub fn environment_blend_mode(&self) -> Option<xr::EnvironmentBlendMode> {
        self.draw_info.as_ref().map(|draw_info| draw_info.blend_mode)
    }

    pub(crate) fn take_host_context(&mut self) -> Option<HostGraphicsContext> {
        self.host_context.take()
    }
}

fn log_frame_time(frame_times: &mut VecDeque<Duration>, frame_time: Duration) {
    if frame_times.len() == FRAME_TIME_SAMPLES {
        frame_times.pop_front();
    }
    frame_times.push_back(frame_time);

    let total: Duration = frame_times.iter().sum();
    let average = total.as_secs_f64() / frame_times.len() as f64;
    info!(
        "VR frame time: {:.1}ms ({:.2} FPS avg)",
        frame_time.as_secs_f64() * 1000.0,
        if average > 0.0 { 1.0 / average } else { 0.0 }
    );
}

impl Drop for Session {
    fn drop(&mut self) {
        self.controller_models.clear();
        self.action_sets.clear();
        self.draw_info = None;

        if let Some(spaces) = self.spaces.take() {
            if let Some(combined_eye) = spaces.combined_eye {
                self.runtime.destroy_space(combined_eye);
            }
            self.runtime.destroy_space(spaces.view);
            self.runtime.destroy_space(spaces.reference);
        }

        if self.handle != xr::Session::NULL {
            self.runtime.destroy_session(self.handle);
            self.handle = xr::Session::NULL;
        }
        self.state = xr::SessionState::UNKNOWN;
        self.binding = None;
    }
}
