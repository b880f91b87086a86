mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{context, create_info, platform_binding, started_context, FakeLoader, FakeRuntime};
use openxr::sys as xr;
use xr_core::runtime::{RuntimeEvent, RuntimeId};
use xr_core::types::VulkanDeviceIdentity;
use xr_core::{Context, ContextCreateInfo, HostGraphicsContext, SessionBeginInfo, XrError};

const CONTROLLER_MODEL: &str = "XR_MSFT_controller_model";
const DEBUG_UTILS: &str = "XR_EXT_debug_utils";
const VALIDATION: &str = "XR_APILAYER_LUNARG_core_validation";

#[test]
fn only_known_extensions_are_requested() {
    let runtime = FakeRuntime::new();
    let binding = platform_binding().extension_name();
    let loader = FakeLoader::new(
        runtime.clone(),
        &[binding, CONTROLLER_MODEL, DEBUG_UTILS, "XR_FB_display_refresh_rate"],
    );
    let context = Context::new(&loader, create_info()).unwrap();

    let expected = vec![CONTROLLER_MODEL.to_owned(), binding.to_owned()];
    let state = runtime.state();
    assert_eq!(state.requested_extensions, expected);
    assert!(state.requested_layers.is_empty());
    assert!(!state.debug_messenger);

    let capabilities = context.capabilities();
    assert_eq!(capabilities.enabled_extensions, expected);
    assert_eq!(capabilities.binding_type, platform_binding());
    assert_eq!(capabilities.runtime.id, RuntimeId::Monado);
    assert!(!context.is_debug_time_mode());
}

#[test]
fn debug_mode_adds_validation_and_messenger() {
    let runtime = FakeRuntime::new();
    let mut loader = FakeLoader::new(
        runtime.clone(),
        &[platform_binding().extension_name(), DEBUG_UTILS],
    );
    loader.layers = vec![VALIDATION.to_owned()];
    loader
        .layer_extensions
        .insert(VALIDATION.to_owned(), vec![CONTROLLER_MODEL.to_owned()]);

    let context = Context::new(
        &loader,
        ContextCreateInfo {
            debug: true,
            debug_time: true,
            ..create_info()
        },
    )
    .unwrap();

    let state = runtime.state();
    assert_eq!(state.requested_layers, vec![VALIDATION.to_owned()]);
    assert_eq!(state.requested_extensions[0], DEBUG_UTILS);
    assert!(state
        .requested_extensions
        .iter()
        .any(|extension| extension == CONTROLLER_MODEL));
    assert!(state.debug_messenger);
    assert!(context.is_debug_time_mode());
}

#[test]
fn debug_without_debug_utils_has_no_messenger() {
    let runtime = FakeRuntime::new();
    let loader = FakeLoader::new(runtime.clone(), &[platform_binding().extension_name()]);
    Context::new(
        &loader,
        ContextCreateInfo {
            debug: true,
            ..create_info()
        },
    )
    .unwrap();

    assert!(!runtime.state().debug_messenger);
}

#[test]
fn no_usable_binding_fails() {
    let runtime = FakeRuntime::new();
    let loader = FakeLoader::new(runtime, &[CONTROLLER_MODEL]);
    assert!(matches!(
        Context::new(&loader, create_info()),
        Err(XrError::NoGraphicsBinding)
    ));
}

#[cfg(any(target_os = "linux", target_os = "windows"))]
#[test]
fn opengl_is_skipped_for_mixed_reality_on_amd() {
    use xr_core::{GpuVendor, GraphicsBindingType};

    let candidates = vec![GraphicsBindingType::OpenGl, GraphicsBindingType::Vulkan];
    let extensions = [
        GraphicsBindingType::OpenGl.extension_name(),
        GraphicsBindingType::Vulkan.extension_name(),
    ];

    let runtime = FakeRuntime::with_id(RuntimeId::Wmr);
    let loader = FakeLoader::new(runtime, &extensions);
    let context = Context::new(
        &loader,
        ContextCreateInfo {
            binding_candidates: candidates.clone(),
            gpu_vendor: Some(GpuVendor::Amd),
            ..create_info()
        },
    )
    .unwrap();
    assert_eq!(context.capabilities().binding_type, GraphicsBindingType::Vulkan);

    let runtime = FakeRuntime::with_id(RuntimeId::SteamVR);
    let loader = FakeLoader::new(runtime, &extensions);
    let context = Context::new(
        &loader,
        ContextCreateInfo {
            binding_candidates: candidates,
            gpu_vendor: Some(GpuVendor::Amd),
            ..create_info()
        },
    )
    .unwrap();
    assert_eq!(context.capabilities().binding_type, GraphicsBindingType::OpenGl);
}

#[test]
fn instance_failure_is_a_runtime_error() {
    let runtime = FakeRuntime::new();
    runtime.state().fail_instance = true;
    let loader = FakeLoader::new(runtime.clone(), &[platform_binding().extension_name()]);

    let err = Context::new(&loader, create_info()).err().unwrap();
    assert_eq!(err.result(), Some(xr::Result::ERROR_RUNTIME_FAILURE));
}

#[test]
fn exiting_destroys_the_session() {
    let runtime = FakeRuntime::new();
    let mut context = context(&runtime, &[]);

    let unbound = Rc::new(Cell::new(0));
    let exited = Rc::new(Cell::new(0));
    let (unbind_count, exit_count) = (unbound.clone(), exited.clone());
    context.set_graphics_context_bind_funcs(
        Box::new(|_| Some(HostGraphicsContext::Vulkan(VulkanDeviceIdentity::default()))),
        Box::new(move |_| unbind_count.set(unbind_count.get() + 1)),
    );
    context
        .start_session(SessionBeginInfo {
            create: None,
            exit: Some(Box::new(move || exit_count.set(exit_count.get() + 1))),
        })
        .unwrap();

    let session = context.session().unwrap().handle();
    runtime
        .state()
        .events
        .extend([
            RuntimeEvent::SessionStateChanged {
                session,
                state: xr::SessionState::STOPPING,
            },
            RuntimeEvent::SessionStateChanged {
                session,
                state: xr::SessionState::EXITING,
            },
        ]);
    assert!(context.poll_events().unwrap());

    assert!(context.session().is_none());
    assert_eq!(unbound.get(), 1);
    assert_eq!(exited.get(), 1);
    assert_eq!(runtime.state().count("destroy_session"), 1);

    drop(context);
    assert_eq!(exited.get(), 1);
}

#[test]
fn empty_event_queue_reports_nothing_handled() {
    let runtime = FakeRuntime::new();
    let mut context = started_context(&runtime, &[]);
    assert!(!context.poll_events().unwrap());
}

#[test]
fn events_for_other_sessions_are_ignored() {
    let runtime = FakeRuntime::new();
    let mut context = started_context(&runtime, &[]);
    runtime
        .state()
        .events
        .push_back(RuntimeEvent::SessionStateChanged {
            session: xr::Session::from_raw(9_999),
            state: xr::SessionState::EXITING,
        });

    assert!(context.poll_events().unwrap());
    assert!(context.session().is_some());
}

#[test]
fn instance_loss_ends_the_session() {
    let runtime = FakeRuntime::new();
    let mut context = started_context(&runtime, &[]);
    runtime
        .state()
        .events
        .push_back(RuntimeEvent::InstanceLossPending);

    let err = context.poll_events().unwrap_err();
    assert_eq!(err.result(), Some(xr::Result::ERROR_INSTANCE_LOST));
    assert!(context.session().is_none());
}

#[test]
fn with_session_needs_a_session() {
    let runtime = FakeRuntime::new();
    let mut context = context(&runtime, &[]);
    assert!(matches!(
        context.with_session(|session| Ok(session.view_count())),
        Err(XrError::Usage(_))
    ));

    context.start_session(SessionBeginInfo::default()).unwrap();
    assert_eq!(
        context.with_session(|session| Ok(session.view_count())).unwrap(),
        2
    );
}
