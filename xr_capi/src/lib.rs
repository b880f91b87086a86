//! C ABI for hosts that drive `xr_core` through function pointers.
//!
//! Every context belongs to the thread that created it. Callbacks must not call back into
//! the context that invoked them, except the session created callback.

pub mod actions;
pub mod types;

use std::env;
use std::ffi::{c_char, c_void, CStr, CString};
use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use lazy_static::lazy_static;
use log::{error, info, warn};
use simplelog::*;
use xr_core::runtime::OpenXrLoader;
use xr_core::{Context, ContextCreateInfo, SessionBeginInfo, XrResult};

pub use types::*;

pub const ENV_LOG_LEVEL: &str = "XR_CORE_LOG";
pub const ENV_LOG_FILE: &str = "XR_CORE_LOG_FILE";

pub type XrCoreBindFn =
    extern "C" fn(XrCoreGraphicsBinding, *mut XrCoreHostContext, *mut c_void) -> bool;
pub type XrCoreUnbindFn = extern "C" fn(*const XrCoreHostContext, *mut c_void);
pub type XrCoreDrawViewFn =
    extern "C" fn(*const XrCoreDrawViewInfo, *mut XrCoreRenderedView, *mut c_void);
pub type XrCoreQueryFn = extern "C" fn(*mut c_void) -> bool;
pub type XrCoreNotifyFn = extern "C" fn(*mut c_void);
pub type XrCoreSessionCreatedFn = extern "C" fn(*mut XrCoreContext, *mut c_void);
pub type XrCoreErrorFn = extern "C" fn(*const XrCoreErrorInfo, *mut c_void);

/// Opaque to C.
pub struct XrCoreContext {
    context: Context,
}

lazy_static! {
    /// Live context handles and their owning threads.
    static ref CONTEXTS: DashMap<usize, ThreadId> = DashMap::new();
}

static LOGGER_LOADED: AtomicBool = AtomicBool::new(false);

/// Host userdata handed back to its callbacks untouched.
#[derive(Clone, Copy)]
struct UserData(*mut c_void);

// The library never dereferences it.
unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

impl UserData {
    fn ptr(self) -> *mut c_void {
        self.0
    }
}

/// Logs to the terminal at `XR_CORE_LOG` (default `info`) and, when `XR_CORE_LOG_FILE` is
/// set, everything down to trace into that file. Only the first call installs a logger.
#[no_mangle]
pub extern "C" fn xr_core_logging_init() -> bool {
    if LOGGER_LOADED.swap(true, Ordering::SeqCst) {
        return false;
    }

    let level = env::var(ENV_LOG_LEVEL)
        .ok()
        .and_then(|value| LevelFilter::from_str(value.trim()).ok())
        .unwrap_or(LevelFilter::Info);

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    let mut file_error = None;
    if let Ok(path) = env::var(ENV_LOG_FILE) {
        match File::create(&path) {
            Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Trace, Config::default(), file)),
            Err(err) => file_error = Some((path, err)),
        }
    }

    if CombinedLogger::init(loggers).is_err() {
        return false;
    }
    if let Some((path, err)) = file_error {
        warn!("Could not create log file {}: {}", path, err);
    }
    info!("Logging initialized at {}", level);
    true
}

/// Installs the process wide error handler. Returns `false` when one is already set.
#[no_mangle]
pub extern "C" fn xr_core_set_error_handler(
    handler: Option<XrCoreErrorFn>,
    userdata: *mut c_void,
) -> bool {
    let Some(handler) = handler else {
        return false;
    };
    let userdata = UserData(userdata);
    xr_core::set_error_handler(move |info| {
        let message = c_string(info.user_message);
        let result_string = info.result_string.map(c_string);
        let c_info = XrCoreErrorInfo {
            user_message: message.as_ptr(),
            result: info.result.map_or(0, |result| result.into_raw()),
            result_string: result_string
                .as_ref()
                .map_or(ptr::null(), |string| string.as_ptr()),
        };
        handler(&c_info, userdata.ptr());
    })
}

/// Connects to the active OpenXR runtime. Null on failure.
///
/// # Safety
/// `info` must be null or point to a valid create info whose pointers are valid for the
/// duration of the call.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_create(
    info: *const XrCoreContextCreateInfo,
) -> *mut XrCoreContext {
    if info.is_null() {
        return ptr::null_mut();
    }
    let info = &*info;
    let context = match panic::catch_unwind(AssertUnwindSafe(|| create_context(info))) {
        Ok(context) => context,
        Err(_) => {
            error!("Panicked while creating the XR context");
            None
        }
    };
    match context {
        Some(context) => {
            let handle = Box::into_raw(Box::new(XrCoreContext { context }));
            CONTEXTS.insert(handle as usize, thread::current().id());
            handle
        }
        None => ptr::null_mut(),
    }
}

unsafe fn create_context(info: &XrCoreContextCreateInfo) -> Option<Context> {
    let defaults = ContextCreateInfo::default();
    let create_info = ContextCreateInfo {
        application_name: c_str(info.application_name)
            .map_or(defaults.application_name.clone(), str::to_owned),
        application_version: info.application_version,
        binding_candidates: c_slice(info.binding_candidates, info.binding_candidate_count)
            .iter()
            .map(|binding| (*binding).into())
            .collect(),
        debug: info.debug,
        debug_time: info.debug_time,
        gpu_vendor: info.gpu_vendor.to_vendor(),
        disable_opengl: info.disable_opengl,
    }
    .with_env_overrides();

    let loader = match OpenXrLoader::load() {
        Ok(loader) => loader,
        Err(err) => {
            error!("{}", err);
            return None;
        }
    };
    Context::new(&loader, create_info).ok()
}

/// Ends any running session and frees the context.
///
/// # Safety
/// `context` must be null or a handle returned by [`xr_core_context_create`].
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_destroy(context: *mut XrCoreContext) -> XrCoreResult {
    if let Err(result) = check_handle(context) {
        return result;
    }
    CONTEXTS.remove(&(context as usize));
    match panic::catch_unwind(AssertUnwindSafe(|| drop(Box::from_raw(context)))) {
        Ok(()) => XrCoreResult::Success,
        Err(_) => {
            error!("Panicked while destroying the XR context");
            XrCoreResult::Panicked
        }
    }
}

/// # Safety
/// `context` must be null or a live context handle.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_set_graphics_context_bind_funcs(
    context: *mut XrCoreContext,
    bind: Option<XrCoreBindFn>,
    unbind: Option<XrCoreUnbindFn>,
    userdata: *mut c_void,
) -> XrCoreResult {
    let Some(bind) = bind else {
        return XrCoreResult::InvalidArgument;
    };
    let userdata = UserData(userdata);
    run(context, |context| {
        context.set_graphics_context_bind_funcs(
            Box::new(move |binding_type| {
                let binding = XrCoreGraphicsBinding::from(binding_type);
                let mut host = XrCoreHostContext::empty(binding);
                if !bind(binding, &mut host, userdata.ptr()) {
                    return None;
                }
                host.binding = binding;
                Some(host.to_host())
            }),
            Box::new(move |host| {
                if let Some(unbind) = unbind {
                    let host = XrCoreHostContext::from_host(&host);
                    unbind(&host, userdata.ptr());
                }
            }),
        );
        XrCoreResult::Success
    })
}

/// # Safety
/// `context` must be null or a live context handle. The draw callback must fill in a
/// rendered view whose pointers stay valid until it returns.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_set_draw_view_func(
    context: *mut XrCoreContext,
    draw_view: Option<XrCoreDrawViewFn>,
    userdata: *mut c_void,
) -> XrCoreResult {
    let Some(draw_view) = draw_view else {
        return XrCoreResult::InvalidArgument;
    };
    let userdata = UserData(userdata);
    run(context, |context| {
        context.set_draw_view_func(Box::new(move |info| {
            let info = XrCoreDrawViewInfo::from(info);
            let mut rendered = XrCoreRenderedView::empty();
            draw_view(&info, &mut rendered, userdata.ptr());
            unsafe { rendered.to_rendered() }
        }));
        XrCoreResult::Success
    })
}

/// # Safety
/// `context` must be null or a live context handle.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_set_passthrough_funcs(
    context: *mut XrCoreContext,
    enabled: Option<XrCoreQueryFn>,
    disable: Option<XrCoreNotifyFn>,
    userdata: *mut c_void,
) -> XrCoreResult {
    let userdata = UserData(userdata);
    run(context, |context| {
        if let Some(enabled) = enabled {
            context.set_passthrough_enabled_func(Box::new(move || enabled(userdata.ptr())));
        }
        if let Some(disable) = disable {
            context.set_disable_passthrough_func(Box::new(move || disable(userdata.ptr())));
        }
        XrCoreResult::Success
    })
}

/// Starts the session. `created` runs once the session exists, before this returns, and
/// may call back into `context` to set up its action sets.
///
/// # Safety
/// `context` must be null or a live context handle.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_start_session(
    context: *mut XrCoreContext,
    created: Option<XrCoreSessionCreatedFn>,
    exit: Option<XrCoreNotifyFn>,
    userdata: *mut c_void,
) -> XrCoreResult {
    let userdata = UserData(userdata);
    let started = run(context, |context| {
        let begin_info = SessionBeginInfo {
            create: None,
            exit: exit.map(|exit| Box::new(move || exit(userdata.ptr())) as Box<dyn FnMut()>),
        };
        status(context.start_session(begin_info))
    });
    // Outside `run` so the callback can borrow the context again.
    if let (XrCoreResult::Success, Some(created)) = (started, created) {
        created(context, userdata.ptr());
    }
    started
}

/// # Safety
/// `context` must be null or a live context handle.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_end_session(context: *mut XrCoreContext) -> XrCoreResult {
    run(context, |context| {
        context.end_session();
        XrCoreResult::Success
    })
}

/// Asks the runtime to wind the session down through its usual state changes.
///
/// # Safety
/// `context` must be null or a live context handle.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_request_session_end(
    context: *mut XrCoreContext,
) -> XrCoreResult {
    run(context, |context| {
        status(context.with_session(|session| session.request_end()))
    })
}

/// # Safety
/// `context` must be null or a live context handle. `handled` may be null.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_poll_events(
    context: *mut XrCoreContext,
    handled: *mut bool,
) -> XrCoreResult {
    run(context, |context| match context.poll_events() {
        Ok(any) => {
            if !handled.is_null() {
                *handled = any;
            }
            XrCoreResult::Success
        }
        Err(_) => XrCoreResult::Failure,
    })
}

/// # Safety
/// `context` must be null or a live context handle.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_is_session_running(context: *mut XrCoreContext) -> bool {
    run_or(context, false, false, |context| context.is_session_running())
}

/// # Safety
/// `context` must be null or a live context handle.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_is_debug_time_mode(context: *mut XrCoreContext) -> bool {
    run_or(context, false, false, |context| context.is_debug_time_mode())
}

/// # Safety
/// `context` must be null or a live context handle.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_draw_session_views(
    context: *mut XrCoreContext,
) -> XrCoreResult {
    run(context, |context| status(context.draw_session_views()))
}

/// # Safety
/// `context` must be null or a live context handle. `binding` must be writable.
#[no_mangle]
pub unsafe extern "C" fn xr_core_context_get_graphics_binding(
    context: *mut XrCoreContext,
    binding: *mut XrCoreGraphicsBinding,
) -> XrCoreResult {
    if binding.is_null() {
        return XrCoreResult::InvalidArgument;
    }
    run(context, |context| {
        *binding = context.capabilities().binding_type.into();
        XrCoreResult::Success
    })
}

fn check_handle(context: *mut XrCoreContext) -> Result<(), XrCoreResult> {
    let owner = CONTEXTS.get(&(context as usize)).map(|owner| *owner);
    match owner {
        None => {
            error!("Invalid XR context handle {:p}", context);
            Err(XrCoreResult::InvalidHandle)
        }
        Some(owner) if owner != thread::current().id() => {
            error!(
                "XR context {:p} used from a thread other than the one that created it",
                context
            );
            Err(XrCoreResult::InvalidHandle)
        }
        Some(_) => Ok(()),
    }
}

pub(crate) fn run_or<T>(
    context: *mut XrCoreContext,
    invalid: T,
    panicked: T,
    f: impl FnOnce(&mut Context) -> T,
) -> T {
    if check_handle(context).is_err() {
        return invalid;
    }
    // Registered handles are live boxes owned by this thread.
    let context = unsafe { &mut (*context).context };
    match panic::catch_unwind(AssertUnwindSafe(|| f(context))) {
        Ok(value) => value,
        Err(_) => {
            error!("Panicked inside an XR context call");
            panicked
        }
    }
}

pub(crate) fn run(
    context: *mut XrCoreContext,
    f: impl FnOnce(&mut Context) -> XrCoreResult,
) -> XrCoreResult {
    run_or(context, XrCoreResult::InvalidHandle, XrCoreResult::Panicked, f)
}

pub(crate) fn status<T>(result: XrResult<T>) -> XrCoreResult {
    match result {
        Ok(_) => XrCoreResult::Success,
        Err(_) => XrCoreResult::Failure,
    }
}

pub(crate) unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(string) => Some(string),
        Err(_) => {
            warn!("Ignoring a string that is not UTF-8");
            None
        }
    }
}

pub(crate) unsafe fn c_strings(ptr: *const *const c_char, count: u32) -> Option<Vec<String>> {
    c_slice(ptr, count)
        .iter()
        .map(|string| c_str(*string).map(str::to_owned))
        .collect()
}

pub(crate) unsafe fn c_slice<'a, T>(ptr: *const T, count: u32) -> &'a [T] {
    if ptr.is_null() || count == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, count as usize)
    }
}

fn c_string(string: &str) -> CString {
    CString::new(string.replace('\0', " ")).unwrap_or_default()
}
