use std::sync::Arc;

use openxr::sys as xr;

use crate::error::{ResultExt, XrResult};
use crate::runtime::Runtime;
use crate::types::Pose;

/// A runtime space following a pose action on one subaction path.
pub struct ActionSpace {
    runtime: Arc<dyn Runtime>,
    handle: xr::Space,
}

impl ActionSpace {
    pub fn new(
        runtime: Arc<dyn Runtime>,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
        offset: Pose,
    ) -> XrResult<Self> {
        let handle = runtime
            .create_action_space(session, action, subaction_path, offset.into())
            .or_fail("Failed to create space.")?;
        Ok(Self { runtime, handle })
    }

    pub fn handle(&self) -> xr::Space {
        self.handle
    }
}

impl Drop for ActionSpace {
    fn drop(&mut self) {
        self.runtime.destroy_space(self.handle);
    }
}
