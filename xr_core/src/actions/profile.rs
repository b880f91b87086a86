use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use openxr::sys as xr;

use super::{ActionKind, ActionSpace, AxisFlags, ProfileBindings};
use crate::error::{ResultExt, XrError, XrResult};
use crate::runtime::{Runtime, SuggestedBinding};
use crate::types::Pose;

/// Bindings of one action for one interaction profile.
///
/// `subaction_paths[i]` is bound to `subaction_paths[i] + component_paths[i]`. The per
/// subaction vectors are either empty or as long as `subaction_paths`.
#[derive(Debug, Clone, Default)]
pub struct ActionBindingInfo {
    pub action_name: String,
    pub profile_path: String,
    pub subaction_paths: Vec<String>,
    pub component_paths: Vec<String>,
    pub float_thresholds: Vec<f32>,
    pub axis_flags: Vec<AxisFlags>,
    /// Pose offsets for pose actions.
    pub poses: Vec<Pose>,
}

impl ActionBindingInfo {
    fn validate(&self) -> XrResult<()> {
        let count = self.subaction_paths.len();
        let matches = |len: usize| len == 0 || len == count;

        if self.component_paths.len() != count
            || !matches(self.float_thresholds.len())
            || !matches(self.axis_flags.len())
            || !matches(self.poses.len())
        {
            return Err(XrError::Usage(format!(
                "Binding of action \"{}\" for \"{}\" has {} subaction paths but {} component paths, {} thresholds, {} axis flags and {} poses",
                self.action_name,
                self.profile_path,
                count,
                self.component_paths.len(),
                self.float_thresholds.len(),
                self.axis_flags.len(),
                self.poses.len()
            )));
        }
        Ok(())
    }
}

/// What a subaction path uses while its profile is the current one.
pub struct SubactionData {
    pub float_threshold: f32,
    pub axis_flags: AxisFlags,
    pub space: Option<ActionSpace>,
}

pub struct ActionProfile {
    profile: xr::Path,
    /// Interaction path to its runtime path.
    bindings: BTreeMap<String, xr::Path>,
    subaction_data: BTreeMap<String, SubactionData>,
}

impl ActionProfile {
    pub(crate) fn new(runtime: &Arc<dyn Runtime>, profile_path: &str) -> XrResult<Self> {
        let profile = runtime
            .string_to_path(profile_path)
            .or_fail(&format!("Failed to get interaction profile path \"{}\".", profile_path))?;

        Ok(Self {
            profile,
            bindings: BTreeMap::new(),
            subaction_data: BTreeMap::new(),
        })
    }

    /// Adds the bindings of `info` not already part of this profile. Each new binding is
    /// suggested to the runtime on its own so a bad path fails here instead of at attach time.
    pub(crate) fn add_bindings(
        &mut self,
        runtime: &Arc<dyn Runtime>,
        session: xr::Session,
        action: xr::Action,
        kind: ActionKind,
        subaction_handles: &[(String, xr::Path)],
        info: &ActionBindingInfo,
    ) -> XrResult<()> {
        info.validate()?;

        for (i, (subaction_path, component_path)) in info
            .subaction_paths
            .iter()
            .zip(info.component_paths.iter())
            .enumerate()
        {
            let subaction_handle = subaction_handles
                .iter()
                .find(|(path, _)| path == subaction_path)
                .map(|(_, handle)| *handle)
                .ok_or_else(|| {
                    XrError::Usage(format!(
                        "Action \"{}\" has no subaction path \"{}\"",
                        info.action_name, subaction_path
                    ))
                })?;

            let interaction_path = format!("{}{}", subaction_path, component_path);
            if !self.bindings.contains_key(&interaction_path) {
                let binding = runtime
                    .string_to_path(&interaction_path)
                    .or_fail(&format!("Failed to get interaction path \"{}\".", interaction_path))?;

                runtime
                    .suggest_interaction_profile_bindings(
                        self.profile,
                        &[SuggestedBinding { action, binding }],
                    )
                    .or_fail(&format!(
                        "Failed to create binding for profile \"{}\" and action \"{}\". Are the profile and action paths correct?",
                        info.profile_path, info.action_name
                    ))?;

                debug!(
                    "Bound \"{}\" to \"{}\" for profile \"{}\"",
                    info.action_name, interaction_path, info.profile_path
                );
                self.bindings.insert(interaction_path, binding);
            }

            if self.subaction_data.contains_key(subaction_path) {
                continue;
            }

            let data = match kind {
                ActionKind::Pose => {
                    let offset = info.poses.get(i).copied().unwrap_or_default();
                    SubactionData {
                        float_threshold: 0.0,
                        axis_flags: AxisFlags::empty(),
                        space: Some(ActionSpace::new(
                            runtime.clone(),
                            session,
                            action,
                            subaction_handle,
                            offset,
                        )?),
                    }
                }
                _ => SubactionData {
                    float_threshold: info.float_thresholds.get(i).copied().unwrap_or(0.0),
                    axis_flags: info.axis_flags.get(i).copied().unwrap_or_else(AxisFlags::empty),
                    space: None,
                },
            };
            self.subaction_data.insert(subaction_path.clone(), data);
        }

        Ok(())
    }

    pub fn profile(&self) -> xr::Path {
        self.profile
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn subaction_data(&self, subaction_path: &str) -> Option<&SubactionData> {
        self.subaction_data.get(subaction_path)
    }

    pub(crate) fn get_bindings(&self, action: xr::Action, out: &mut ProfileBindings) {
        let bindings = out.entry(self.profile.into_raw()).or_default();
        bindings.extend(
            self.bindings
                .values()
                .map(|&binding| SuggestedBinding { action, binding }),
        );
    }
}
