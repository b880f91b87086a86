use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use log::warn;
use openxr::sys as xr;

use super::{Action, ActionInfo, ProfileBindings};
use crate::error::{ResultExt, XrResult};
use crate::runtime::Runtime;

pub struct ActionSetInfo {
    pub name: String,
    pub priority: u32,
    pub custom_data: Option<Box<dyn Any>>,
}

pub struct ActionSet {
    runtime: Arc<dyn Runtime>,
    handle: xr::ActionSet,
    name: String,
    actions: BTreeMap<String, Action>,
    custom_data: Option<Box<dyn Any>>,
}

impl ActionSet {
    pub(crate) fn new(runtime: Arc<dyn Runtime>, info: ActionSetInfo) -> XrResult<Self> {
        let handle = runtime
            .create_action_set(&info.name, &info.name, info.priority)
            .or_fail(&format!(
                "Failed to create action set \"{}\". Name must not contain upper case letters or special characters other than '-', '_', or '.'.",
                info.name
            ))?;

        Ok(Self {
            runtime,
            handle,
            name: info.name,
            actions: BTreeMap::new(),
            custom_data: info.custom_data,
        })
    }

    /// Returns `false` without touching the runtime when the name is taken.
    pub fn create_action(&mut self, info: ActionInfo) -> XrResult<bool> {
        if self.actions.contains_key(&info.name) {
            warn!(
                "Action \"{}\" already exists in action set \"{}\"",
                info.name, self.name
            );
            return Ok(false);
        }
        let name = info.name.clone();
        let action = Action::new(self.runtime.clone(), self.handle, info)?;
        self.actions.insert(name, action);
        Ok(true)
    }

    pub fn destroy_action(&mut self, name: &str) -> bool {
        self.actions.remove(name).is_some()
    }

    pub fn find_action(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    pub fn find_action_mut(&mut self, name: &str) -> Option<&mut Action> {
        self.actions.get_mut(name)
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    pub fn update_states(
        &mut self,
        session: xr::Session,
        reference_space: xr::Space,
        predicted_display_time: xr::Time,
    ) -> XrResult<()> {
        for action in self.actions.values_mut() {
            action.update_state(session, reference_space, predicted_display_time)?;
        }
        Ok(())
    }

    pub(crate) fn get_bindings(&self, out: &mut ProfileBindings) {
        for action in self.actions.values() {
            action.get_bindings(out);
        }
    }

    pub fn handle(&self) -> xr::ActionSet {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn custom_data(&self) -> Option<&dyn Any> {
        self.custom_data.as_deref()
    }
}

impl Drop for ActionSet {
    fn drop(&mut self) {
        self.actions.clear();
        self.runtime.destroy_action_set(self.handle);
    }
}
