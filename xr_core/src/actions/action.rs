use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use bitflags::bitflags;
use openxr::sys as xr;

use super::{ActionBindingInfo, ActionProfile, ProfileBindings};
use crate::error::{ResultExt, XrError, XrResult};
use crate::runtime::{ActionCreateInfo, HapticVibration, Runtime};
use crate::types::Pose;

bitflags! {
    /// Which half axes of a 2D input a button-like binding reacts to.
    #[derive(Default)]
    pub struct AxisFlags: u32 {
        const AXIS0_POS = 1 << 0;
        const AXIS0_NEG = 1 << 1;
        const AXIS1_POS = 1 << 2;
        const AXIS1_NEG = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Boolean,
    Float,
    Vector2f,
    Pose,
    VibrationOutput,
}

impl ActionKind {
    pub fn action_type(&self) -> xr::ActionType {
        match self {
            ActionKind::Boolean => xr::ActionType::BOOLEAN_INPUT,
            ActionKind::Float => xr::ActionType::FLOAT_INPUT,
            ActionKind::Vector2f => xr::ActionType::VECTOR2F_INPUT,
            ActionKind::Pose => xr::ActionType::POSE_INPUT,
            ActionKind::VibrationOutput => xr::ActionType::VIBRATION_OUTPUT,
        }
    }

    fn initial_state(&self) -> ActionState {
        match self {
            ActionKind::Boolean => ActionState::Boolean(false),
            ActionKind::Float => ActionState::Float(0.0),
            ActionKind::Vector2f => ActionState::Vector2f([0.0; 2]),
            ActionKind::Pose => ActionState::Pose {
                is_active: false,
                pose: Pose::IDENTITY,
            },
            ActionKind::VibrationOutput => ActionState::None,
        }
    }
}

/// Last synced state of one subaction path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionState {
    Boolean(bool),
    Float(f32),
    Vector2f([f32; 2]),
    Pose { is_active: bool, pose: Pose },
    None,
}

pub struct ActionInfo {
    pub name: String,
    pub kind: ActionKind,
    pub subaction_paths: Vec<String>,
    pub custom_data: Option<Box<dyn Any>>,
}

pub struct Action {
    runtime: Arc<dyn Runtime>,
    handle: xr::Action,
    name: String,
    kind: ActionKind,
    subaction_paths: Vec<(String, xr::Path)>,
    states: Vec<ActionState>,
    float_thresholds: Vec<f32>,
    axis_flags: Vec<AxisFlags>,
    custom_data: Option<Box<dyn Any>>,
    profiles: BTreeMap<String, ActionProfile>,
}

impl Action {
    pub(crate) fn new(
        runtime: Arc<dyn Runtime>,
        action_set: xr::ActionSet,
        info: ActionInfo,
    ) -> XrResult<Self> {
        let subaction_paths = info
            .subaction_paths
            .iter()
            .map(|path| {
                runtime
                    .string_to_path(path)
                    .map(|handle| (path.clone(), handle))
                    .or_fail(&format!("Failed to get user path \"{}\".", path))
            })
            .collect::<XrResult<Vec<_>>>()?;
        let subaction_handles = subaction_paths
            .iter()
            .map(|(_, handle)| *handle)
            .collect::<Vec<_>>();

        let handle = runtime
            .create_action(
                action_set,
                &ActionCreateInfo {
                    name: &info.name,
                    localized_name: &info.name,
                    action_type: info.kind.action_type(),
                    subaction_paths: &subaction_handles,
                },
            )
            .or_fail(&format!(
                "Failed to create action \"{}\". Action name and/or paths are invalid. Name must not contain upper case letters or special characters other than '-', '_', or '.'.",
                info.name
            ))?;

        let count = subaction_paths.len();
        Ok(Self {
            runtime,
            handle,
            name: info.name,
            kind: info.kind,
            subaction_paths,
            states: vec![info.kind.initial_state(); count],
            float_thresholds: vec![0.0; count],
            axis_flags: vec![AxisFlags::empty(); count],
            custom_data: info.custom_data,
            profiles: BTreeMap::new(),
        })
    }

    /// Binds the action for `info.profile_path`, extending an existing profile.
    pub fn create_binding(&mut self, session: xr::Session, info: &ActionBindingInfo) -> XrResult<()> {
        if !self.profiles.contains_key(&info.profile_path) {
            let profile = ActionProfile::new(&self.runtime, &info.profile_path)?;
            self.profiles.insert(info.profile_path.clone(), profile);
        }
        let profile = self
            .profiles
            .get_mut(&info.profile_path)
            .ok_or_else(|| XrError::Usage(format!("Unknown profile \"{}\"", info.profile_path)))?;

        profile.add_bindings(
            &self.runtime,
            session,
            self.handle,
            self.kind,
            &self.subaction_paths,
            info,
        )
    }

    pub fn destroy_binding(&mut self, profile_path: &str) -> bool {
        self.profiles.remove(profile_path).is_some()
    }

    /// Refreshes every subaction state from the runtime.
    ///
    /// Input states are only written while the runtime reports them active. Poses also
    /// need a display time and a space for the current interaction profile.
    pub fn update_state(
        &mut self,
        session: xr::Session,
        reference_space: xr::Space,
        predicted_display_time: xr::Time,
    ) -> XrResult<()> {
        for (i, (subaction_path, subaction_handle)) in self.subaction_paths.iter().enumerate() {
            let mut pose_space = None;

            let current_profile = self
                .runtime
                .get_current_interaction_profile(session, *subaction_handle)
                .or_fail("Failed to get current interaction profile.")?;

            if current_profile != xr::Path::NULL {
                let profile_path = self
                    .runtime
                    .path_to_string(current_profile)
                    .or_fail("Failed to get interaction profile path string.")?;

                if let Some(data) = self
                    .profiles
                    .get(&profile_path)
                    .and_then(|profile| profile.subaction_data(subaction_path))
                {
                    self.float_thresholds[i] = data.float_threshold;
                    self.axis_flags[i] = data.axis_flags;
                    pose_space = data.space.as_ref().map(|space| space.handle());
                }
            }

            let runtime = &self.runtime;
            let action = self.handle;
            let subaction = *subaction_handle;
            match self.kind {
                ActionKind::Boolean => {
                    let reading = runtime
                        .get_action_state_boolean(session, action, subaction)
                        .or_fail("Failed to get action state.")?;
                    if reading.is_active {
                        self.states[i] = ActionState::Boolean(reading.current_state);
                    }
                }
                ActionKind::Float => {
                    let reading = runtime
                        .get_action_state_float(session, action, subaction)
                        .or_fail("Failed to get action state.")?;
                    if reading.is_active {
                        self.states[i] = ActionState::Float(reading.current_state);
                    }
                }
                ActionKind::Vector2f => {
                    let reading = runtime
                        .get_action_state_vector2f(session, action, subaction)
                        .or_fail("Failed to get action state.")?;
                    if reading.is_active {
                        self.states[i] = ActionState::Vector2f(reading.current_state);
                    }
                }
                ActionKind::Pose => {
                    let is_active = runtime
                        .get_action_state_pose(session, action, subaction)
                        .or_fail("Failed to get action state.")?;

                    let mut pose = match self.states[i] {
                        ActionState::Pose { pose, .. } => pose,
                        _ => Pose::IDENTITY,
                    };

                    if predicted_display_time.as_nanos() > 0 {
                        if let Some(space) = pose_space {
                            let location = runtime
                                .locate_space(space, reference_space, predicted_display_time)
                                .or_fail("Failed to query pose space.")?;
                            if location.is_pose_valid() {
                                pose = location.pose.into();
                            }
                        }
                    }

                    self.states[i] = ActionState::Pose { is_active, pose };
                }
                ActionKind::VibrationOutput => {}
            }
        }
        Ok(())
    }

    /// Vibrates `subaction_path`, or every subaction path of the action when `None`.
    pub fn apply_haptic_feedback(
        &self,
        session: xr::Session,
        duration_ns: i64,
        frequency: f32,
        amplitude: f32,
        subaction_path: Option<&str>,
    ) -> XrResult<()> {
        let vibration = HapticVibration {
            duration: xr::Duration::from_nanos(duration_ns),
            frequency,
            amplitude,
        };
        for subaction in self.targets(subaction_path)? {
            self.runtime
                .apply_haptic_feedback(session, self.handle, subaction, &vibration)
                .or_fail("Failed to apply haptic action.")?;
        }
        Ok(())
    }

    pub fn stop_haptic_feedback(
        &self,
        session: xr::Session,
        subaction_path: Option<&str>,
    ) -> XrResult<()> {
        for subaction in self.targets(subaction_path)? {
            self.runtime
                .stop_haptic_feedback(session, self.handle, subaction)
                .or_fail("Failed to stop haptic action.")?;
        }
        Ok(())
    }

    fn targets(&self, subaction_path: Option<&str>) -> XrResult<Vec<xr::Path>> {
        match subaction_path {
            None => Ok(self.subaction_paths.iter().map(|(_, handle)| *handle).collect()),
            Some(wanted) => self
                .subaction_paths
                .iter()
                .find(|(path, _)| path == wanted)
                .map(|(_, handle)| vec![*handle])
                .ok_or_else(|| {
                    XrError::Usage(format!(
                        "Action \"{}\" has no subaction path \"{}\"",
                        self.name, wanted
                    ))
                }),
        }
    }

    pub(crate) fn get_bindings(&self, out: &mut ProfileBindings) {
        for profile in self.profiles.values() {
            profile.get_bindings(self.handle, out);
        }
    }

    pub fn handle(&self) -> xr::Action {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn subaction_paths(&self) -> impl Iterator<Item = &str> {
        self.subaction_paths.iter().map(|(path, _)| path.as_str())
    }

    pub fn states(&self) -> &[ActionState] {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut [ActionState] {
        &mut self.states
    }

    pub fn float_thresholds(&self) -> &[f32] {
        &self.float_thresholds
    }

    pub fn axis_flags(&self) -> &[AxisFlags] {
        &self.axis_flags
    }

    pub fn profile(&self, profile_path: &str) -> Option<&ActionProfile> {
        self.profiles.get(profile_path)
    }

    pub fn custom_data(&self) -> Option<&dyn Any> {
        self.custom_data.as_deref()
    }
}

impl Drop for Action {
    fn drop(&mut self) {
        // Spaces go before the action they follow.
        self.profiles.clear();
        self.runtime.destroy_action(self.handle);
    }
}
