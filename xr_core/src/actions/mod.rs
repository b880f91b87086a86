//! The input binding graph: action sets own actions, actions own one profile per
//! interaction profile they are bound to, and pose bindings own their action spaces.

mod action;
mod action_set;
mod profile;
mod space;

pub use action::{Action, ActionInfo, ActionKind, ActionState, AxisFlags};
pub use action_set::{ActionSet, ActionSetInfo};
pub use profile::{ActionBindingInfo, ActionProfile, SubactionData};
pub use space::ActionSpace;

use std::collections::BTreeMap;

use crate::runtime::SuggestedBinding;

/// Suggested bindings grouped by raw interaction profile path.
pub type ProfileBindings = BTreeMap<u64, Vec<SuggestedBinding>>;
