//! Action and controller model entry points. All of them need a started session.

use std::any::Any;
use std::ffi::{c_char, c_void};
use std::ptr;

use xr_core::actions::{ActionBindingInfo, ActionInfo, ActionSetInfo, AxisFlags};
use xr_core::{Pose, XrError};

use crate::types::{
    XrCoreActionBindingInfo, XrCoreActionKind, XrCoreActionState, XrCoreControllerModelComponent,
    XrCoreControllerModelData, XrCoreResult,
};
use crate::{c_slice, c_str, c_strings, run, run_or, status, XrCoreContext, XrCoreNotifyFn};

macro_rules! arg {
    ($value:expr) => {
        match $value {
            Some(value) => value,
            None => return XrCoreResult::InvalidArgument,
        }
    };
}

/// Host data attached to an action set or action. `free` runs when it is dropped.
struct HostCustomData {
    data: *mut c_void,
    free: Option<XrCoreNotifyFn>,
}

impl Drop for HostCustomData {
    fn drop(&mut self) {
        if let Some(free) = self.free {
            free(self.data);
        }
    }
}

/// Null `data` attaches nothing.
fn host_custom_data(data: *mut c_void, free: Option<XrCoreNotifyFn>) -> Option<Box<dyn Any>> {
    if data.is_null() {
        return None;
    }
    Some(Box::new(HostCustomData { data, free }))
}

fn host_data_ptr(data: Option<&dyn Any>) -> *mut c_void {
    data.and_then(|data| data.downcast_ref::<HostCustomData>())
        .map_or(ptr::null_mut(), |data| data.data)
}

/// `Failure` when an action set with that name already exists.
///
/// `custom_data` belongs to the library from here on. `free_custom_data` runs on it when
/// the action set is destroyed, or right away when the call fails.
///
/// # Safety
/// `context` must be null or a live context handle, `name` a C string.
#[no_mangle]
pub unsafe extern "C" fn xr_core_create_action_set(
    context: *mut XrCoreContext,
    name: *const c_char,
    priority: u32,
    custom_data: *mut c_void,
    free_custom_data: Option<XrCoreNotifyFn>,
) -> XrCoreResult {
    let custom_data = host_custom_data(custom_data, free_custom_data);
    let name = arg!(c_str(name));
    run(context, |context| {
        let created = context.with_session(|session| {
            session.create_action_set(ActionSetInfo {
                name: name.to_owned(),
                priority,
                custom_data,
            })
        });
        match created {
            Ok(created) => created.into(),
            Err(_) => XrCoreResult::Failure,
        }
    })
}

/// # Safety
/// `context` must be null or a live context handle, `name` a C string.
#[no_mangle]
pub unsafe extern "C" fn xr_core_destroy_action_set(
    context: *mut XrCoreContext,
    name: *const c_char,
) -> XrCoreResult {
    let name = arg!(c_str(name));
    run(context, |context| {
        match context.with_session(|session| Ok(session.destroy_action_set(name))) {
            Ok(destroyed) => destroyed.into(),
            Err(_) => XrCoreResult::Failure,
        }
    })
}

/// `Failure` when the action set already has an action with that name. `custom_data` is
/// handled as in [`xr_core_create_action_set`], freed with the action.
///
/// # Safety
/// `context` must be null or a live context handle. `subaction_paths` must hold
/// `subaction_path_count` C strings.
#[no_mangle]
pub unsafe extern "C" fn xr_core_create_action(
    context: *mut XrCoreContext,
    action_set_name: *const c_char,
    name: *const c_char,
    kind: XrCoreActionKind,
    subaction_paths: *const *const c_char,
    subaction_path_count: u32,
    custom_data: *mut c_void,
    free_custom_data: Option<XrCoreNotifyFn>,
) -> XrCoreResult {
    let custom_data = host_custom_data(custom_data, free_custom_data);
    let action_set_name = arg!(c_str(action_set_name));
    let name = arg!(c_str(name));
    let subaction_paths = arg!(c_strings(subaction_paths, subaction_path_count));
    run(context, |context| {
        let info = ActionInfo {
            name: name.to_owned(),
            kind: kind.into(),
            subaction_paths,
            custom_data,
        };
        match context.with_session(|session| session.create_actions(action_set_name, vec![info])) {
            Ok(created) => created.into(),
            Err(_) => XrCoreResult::Failure,
        }
    })
}

/// # Safety
/// `context` must be null or a live context handle, the names C strings.
#[no_mangle]
pub unsafe extern "C" fn xr_core_destroy_action(
    context: *mut XrCoreContext,
    action_set_name: *const c_char,
    name: *const c_char,
) -> XrCoreResult {
    let action_set_name = arg!(c_str(action_set_name));
    let name = arg!(c_str(name));
    run(context, |context| {
        status(context.with_session(|session| session.destroy_actions(action_set_name, &[name])))
    })
}

/// The `custom_data` given when the action set was created, or null.
///
/// # Safety
/// `context` must be null or a live context handle, `action_set_name` a C string.
#[no_mangle]
pub unsafe extern "C" fn xr_core_get_action_set_custom_data(
    context: *mut XrCoreContext,
    action_set_name: *const c_char,
) -> *mut c_void {
    let Some(action_set_name) = c_str(action_set_name) else {
        return ptr::null_mut();
    };
    run_or(context, ptr::null_mut(), ptr::null_mut(), |context| {
        host_data_ptr(
            context
                .session()
                .and_then(|session| session.action_set_custom_data(action_set_name)),
        )
    })
}

/// The `custom_data` given when the action was created, or null.
///
/// # Safety
/// `context` must be null or a live context handle, the names C strings.
#[no_mangle]
pub unsafe extern "C" fn xr_core_get_action_custom_data(
    context: *mut XrCoreContext,
    action_set_name: *const c_char,
    action_name: *const c_char,
) -> *mut c_void {
    let (Some(action_set_name), Some(action_name)) = (c_str(action_set_name), c_str(action_name))
    else {
        return ptr::null_mut();
    };
    run_or(context, ptr::null_mut(), ptr::null_mut(), |context| {
        host_data_ptr(
            context
                .session()
                .and_then(|session| session.action_custom_data(action_set_name, action_name)),
        )
    })
}

/// # Safety
/// `context` must be null or a live context handle. Every array in `info` must be null or
/// hold `info.count` entries.
#[no_mangle]
pub unsafe extern "C" fn xr_core_create_action_binding(
    context: *mut XrCoreContext,
    action_set_name: *const c_char,
    info: *const XrCoreActionBindingInfo,
) -> XrCoreResult {
    let action_set_name = arg!(c_str(action_set_name));
    let info = arg!(info.as_ref());
    let binding = ActionBindingInfo {
        action_name: arg!(c_str(info.action_name)).to_owned(),
        profile_path: arg!(c_str(info.profile_path)).to_owned(),
        subaction_paths: arg!(c_strings(info.subaction_paths, info.count)),
        component_paths: arg!(c_strings(info.component_paths, info.count)),
        float_thresholds: c_slice(info.float_thresholds, info.count).to_vec(),
        axis_flags: c_slice(info.axis_flags, info.count)
            .iter()
            .map(|bits| AxisFlags::from_bits_truncate(*bits))
            .collect(),
        poses: c_slice(info.poses, info.count)
            .iter()
            .map(|pose| Pose::from(*pose))
            .collect(),
    };
    run(context, |context| {
        status(context.with_session(|session| {
            session.create_action_bindings(action_set_name, std::slice::from_ref(&binding))
        }))
    })
}

/// # Safety
/// `context` must be null or a live context handle, the names C strings.
#[no_mangle]
pub unsafe extern "C" fn xr_core_destroy_action_binding(
    context: *mut XrCoreContext,
    action_set_name: *const c_char,
    action_name: *const c_char,
    profile_path: *const c_char,
) -> XrCoreResult {
    let action_set_name = arg!(c_str(action_set_name));
    let action_name = arg!(c_str(action_name));
    let profile_path = arg!(c_str(profile_path));
    run(context, |context| {
        status(context.with_session(|session| {
            session.destroy_action_bindings(action_set_name, &[(action_name, profile_path)])
        }))
    })
}

/// # Safety
/// `context` must be null or a live context handle.
#[no_mangle]
pub unsafe extern "C" fn xr_core_attach_action_sets(context: *mut XrCoreContext) -> XrCoreResult {
    run(context, |context| {
        status(context.with_session(|session| session.attach_action_sets()))
    })
}

/// Syncs `action_set_name`, or every action set when it is null.
///
/// # Safety
/// `context` must be null or a live context handle, `action_set_name` null or a C string.
#[no_mangle]
pub unsafe extern "C" fn xr_core_sync_actions(
    context: *mut XrCoreContext,
    action_set_name: *const c_char,
) -> XrCoreResult {
    let action_set_name = if action_set_name.is_null() {
        None
    } else {
        Some(arg!(c_str(action_set_name)))
    };
    run(context, |context| {
        status(context.with_session(|session| session.sync_actions(action_set_name)))
    })
}

/// State of the subaction path at `subaction_index` after the last sync.
///
/// # Safety
/// `context` must be null or a live context handle, the names C strings and `state`
/// writable.
#[no_mangle]
pub unsafe extern "C" fn xr_core_get_action_state(
    context: *mut XrCoreContext,
    action_set_name: *const c_char,
    action_name: *const c_char,
    subaction_index: u32,
    state: *mut XrCoreActionState,
) -> XrCoreResult {
    let action_set_name = arg!(c_str(action_set_name));
    let action_name = arg!(c_str(action_name));
    let state = arg!(state.as_mut());
    run(context, |context| {
        let read = context.with_session(|session| {
            let action = session.action(action_set_name, action_name).ok_or_else(|| {
                XrError::Usage(format!(
                    "Action \"{}\" not found in action set \"{}\"",
                    action_name, action_set_name
                ))
            })?;
            let index = subaction_index as usize;
            let value = action.states().get(index).copied().ok_or_else(|| {
                XrError::Usage(format!(
                    "Action \"{}\" has no subaction path {}",
                    action_name, subaction_index
                ))
            })?;
            Ok(XrCoreActionState::new(
                action.kind(),
                value,
                action.float_thresholds().get(index).copied().unwrap_or(0.0),
                action
                    .axis_flags()
                    .get(index)
                    .copied()
                    .unwrap_or_else(AxisFlags::empty),
            ))
        });
        match read {
            Ok(read) => {
                *state = read;
                XrCoreResult::Success
            }
            Err(_) => XrCoreResult::Failure,
        }
    })
}

/// Vibrates `subaction_path`, or every subaction path of the action when it is null.
///
/// # Safety
/// `context` must be null or a live context handle, the names C strings and
/// `subaction_path` null or a C string.
#[no_mangle]
pub unsafe extern "C" fn xr_core_apply_haptic_action(
    context: *mut XrCoreContext,
    action_set_name: *const c_char,
    action_name: *const c_char,
    subaction_path: *const c_char,
    duration_ns: i64,
    frequency: f32,
    amplitude: f32,
) -> XrCoreResult {
    let action_set_name = arg!(c_str(action_set_name));
    let action_name = arg!(c_str(action_name));
    let subaction_path = if subaction_path.is_null() {
        None
    } else {
        Some(arg!(c_str(subaction_path)))
    };
    run(context, |context| {
        status(context.with_session(|session| {
            session.apply_haptic_action(
                action_set_name,
                action_name,
                subaction_path,
                duration_ns,
                frequency,
                amplitude,
            )
        }))
    })
}

/// # Safety
/// Same as [`xr_core_apply_haptic_action`].
#[no_mangle]
pub unsafe extern "C" fn xr_core_stop_haptic_action(
    context: *mut XrCoreContext,
    action_set_name: *const c_char,
    action_name: *const c_char,
    subaction_path: *const c_char,
) -> XrCoreResult {
    let action_set_name = arg!(c_str(action_set_name));
    let action_name = arg!(c_str(action_name));
    let subaction_path = if subaction_path.is_null() {
        None
    } else {
        Some(arg!(c_str(subaction_path)))
    };
    run(context, |context| {
        status(context.with_session(|session| {
            session.stop_haptic_action(action_set_name, action_name, subaction_path)
        }))
    })
}

/// Starts loading the model in the background. `Failure` when the runtime has no
/// controller models.
///
/// # Safety
/// `context` must be null or a live context handle, `subaction_path` a C string.
#[no_mangle]
pub unsafe extern "C" fn xr_core_load_controller_model(
    context: *mut XrCoreContext,
    subaction_path: *const c_char,
) -> XrCoreResult {
    let subaction_path = arg!(c_str(subaction_path));
    run(context, |context| {
        match context.with_session(|session| session.load_controller_model(subaction_path)) {
            Ok(supported) => supported.into(),
            Err(_) => XrCoreResult::Failure,
        }
    })
}

/// # Safety
/// `context` must be null or a live context handle, `subaction_path` a C string.
#[no_mangle]
pub unsafe extern "C" fn xr_core_unload_controller_model(
    context: *mut XrCoreContext,
    subaction_path: *const c_char,
) -> XrCoreResult {
    let subaction_path = arg!(c_str(subaction_path));
    run(context, |context| {
        match context.with_session(|session| Ok(session.unload_controller_model(subaction_path))) {
            Ok(unloaded) => unloaded.into(),
            Err(_) => XrCoreResult::Failure,
        }
    })
}

/// # Safety
/// `context` must be null or a live context handle, `subaction_path` a C string.
#[no_mangle]
pub unsafe extern "C" fn xr_core_update_controller_model_components(
    context: *mut XrCoreContext,
    subaction_path: *const c_char,
) -> XrCoreResult {
    let subaction_path = arg!(c_str(subaction_path));
    run(context, |context| {
        match context
            .with_session(|session| session.update_controller_model_components(subaction_path))
        {
            Ok(requested) => requested.into(),
            Err(_) => XrCoreResult::Failure,
        }
    })
}

/// `NotReady` while the model is loading or when the runtime has none for the path.
///
/// # Safety
/// `context` must be null or a live context handle, `subaction_path` a C string and `data`
/// writable. The returned pointers stay valid until the next call for the same model.
#[no_mangle]
pub unsafe extern "C" fn xr_core_get_controller_model_data(
    context: *mut XrCoreContext,
    subaction_path: *const c_char,
    data: *mut XrCoreControllerModelData,
) -> XrCoreResult {
    let subaction_path = arg!(c_str(subaction_path));
    let data = arg!(data.as_mut());
    run(context, |context| {
        let fetched = context.with_session(|session| {
            Ok(session
                .controller_model_data(subaction_path)?
                .map(|model| XrCoreControllerModelData {
                    vertices: model.vertices.as_ptr().cast::<f32>(),
                    vertex_count: model.vertices.len() as u32,
                    indices: model.indices.as_ptr(),
                    index_count: model.indices.len() as u32,
                    components: model
                        .components
                        .as_ptr()
                        .cast::<XrCoreControllerModelComponent>(),
                    component_count: model.components.len() as u32,
                }))
        });
        match fetched {
            Ok(Some(fetched)) => {
                *data = fetched;
                XrCoreResult::Success
            }
            Ok(None) => XrCoreResult::NotReady,
            Err(_) => XrCoreResult::Failure,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::atomic::{AtomicUsize, Ordering};

    extern "C" fn count_free(data: *mut c_void) {
        unsafe { &*(data as *const AtomicUsize) }.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn dropping_custom_data_frees_it_once() {
        let freed = AtomicUsize::new(0);
        let data = host_custom_data(&freed as *const _ as *mut c_void, Some(count_free));
        assert_eq!(
            host_data_ptr(data.as_deref()),
            &freed as *const _ as *mut c_void
        );
        drop(data);
        assert_eq!(freed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn null_custom_data_attaches_nothing() {
        assert!(host_custom_data(ptr::null_mut(), Some(count_free)).is_none());
        assert!(host_data_ptr(None).is_null());
        assert!(host_data_ptr(Some(&7u32 as &dyn Any)).is_null());
    }

    #[test]
    fn rejected_action_set_frees_its_custom_data() {
        let freed = AtomicUsize::new(0);
        let name = CString::new("gameplay").unwrap();
        let result = unsafe {
            xr_core_create_action_set(
                ptr::null_mut(),
                name.as_ptr(),
                0,
                &freed as *const _ as *mut c_void,
                Some(count_free),
            )
        };
        assert_eq!(result, XrCoreResult::InvalidHandle);
        assert_eq!(freed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_name_still_frees_custom_data() {
        let freed = AtomicUsize::new(0);
        let result = unsafe {
            xr_core_create_action(
                ptr::null_mut(),
                ptr::null(),
                ptr::null(),
                XrCoreActionKind::Boolean,
                ptr::null(),
                0,
                &freed as *const _ as *mut c_void,
                Some(count_free),
            )
        };
        assert_eq!(result, XrCoreResult::InvalidArgument);
        assert_eq!(freed.load(Ordering::SeqCst), 1);
    }
}
