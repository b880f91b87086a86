mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use common::{
    context, create_info, platform_binding, run_session, started_context, FakeLoader, FakeRuntime,
    FORMAT_BGRA8,
};
use openxr::sys as xr;
use xr_core::actions::ActionSetInfo;
use xr_core::types::VulkanDeviceIdentity;
use xr_core::{
    Context, HostGraphicsContext, ImageFormat, RenderedView, Session, SessionBeginInfo,
    SwapchainFormat, TransferMode, XrError,
};

/// A context whose unbind callback shows up in the runtime call log.
fn tracked_context(runtime: &Arc<FakeRuntime>, extensions: &[&str]) -> Context {
    let mut context = context(runtime, extensions);
    let tracker = runtime.clone();
    context.set_graphics_context_bind_funcs(
        Box::new(|_| Some(HostGraphicsContext::Vulkan(VulkanDeviceIdentity::default()))),
        Box::new(move |_| tracker.state().calls.push("unbind")),
    );
    context
}

#[test]
fn start_prepares_one_swapchain_per_view() {
    let runtime = FakeRuntime::new();
    let context = started_context(&runtime, &[]);
    let session = context.session().unwrap();

    assert_eq!(session.view_type(), xr::ViewConfigurationType::PRIMARY_STEREO);
    assert_eq!(session.view_count(), 2);
    assert_eq!(session.binding_type(), Some(platform_binding()));
    assert_eq!(
        session.environment_blend_mode(),
        Some(xr::EnvironmentBlendMode::OPAQUE)
    );
    assert!(!session.is_foveation_supported());
    assert!(!session.is_running());

    let state = runtime.state();
    assert_eq!(state.swapchains.len(), 2);
    for swapchain in &state.swapchains {
        assert_eq!(swapchain.format, FORMAT_BGRA8);
        assert_eq!((swapchain.width, swapchain.height), (64, 32));
        assert_eq!(swapchain.sample_count, 1);
    }
}

#[test]
fn stage_space_is_preferred() {
    let runtime = FakeRuntime::new();
    let context = started_context(&runtime, &[]);

    assert_eq!(
        context.session().unwrap().reference_space_type(),
        Some(xr::ReferenceSpaceType::STAGE)
    );
    assert_eq!(
        runtime.state().reference_space_types(),
        vec![xr::ReferenceSpaceType::STAGE, xr::ReferenceSpaceType::VIEW]
    );
}

#[test]
fn unsupported_stage_falls_back_to_local() {
    let runtime = FakeRuntime::new();
    runtime.state().stage_unsupported = true;
    let context = started_context(&runtime, &[]);

    assert_eq!(
        context.session().unwrap().reference_space_type(),
        Some(xr::ReferenceSpaceType::LOCAL)
    );
    assert_eq!(
        runtime.state().reference_space_types(),
        vec![xr::ReferenceSpaceType::LOCAL, xr::ReferenceSpaceType::VIEW]
    );
}

#[test]
fn empty_stage_bounds_fall_back_to_local() {
    let runtime = FakeRuntime::new();
    runtime.state().stage_bounds = (0.0, 3.0);
    let context = started_context(&runtime, &[]);

    assert_eq!(
        context.session().unwrap().reference_space_type(),
        Some(xr::ReferenceSpaceType::LOCAL)
    );
    let state = runtime.state();
    let stage = state.reference_spaces[0].1;
    assert_eq!(state.reference_spaces[0].0, xr::ReferenceSpaceType::STAGE);
    assert_eq!(state.destroyed_spaces, vec![stage]);
}

#[test]
fn quad_views_when_the_extension_is_enabled() {
    let runtime = FakeRuntime::new();
    let context = started_context(&runtime, &["XR_VARJO_quad_views"]);
    let session = context.session().unwrap();

    assert_eq!(
        session.view_type(),
        xr::ViewConfigurationType::PRIMARY_QUAD_VARJO
    );
    assert_eq!(session.view_count(), 4);
    assert_eq!(runtime.state().swapchains.len(), 4);
}

#[test]
fn foveation_needs_extension_and_runtime_support() {
    let runtime = FakeRuntime::new();
    let context = started_context(&runtime, &["XR_VARJO_foveated_rendering"]);
    assert!(!context.session().unwrap().is_foveation_supported());
    drop(context);

    let runtime = FakeRuntime::new();
    runtime.state().foveation = true;
    let mut context = started_context(&runtime, &["XR_VARJO_foveated_rendering"]);
    assert!(context.session().unwrap().is_foveation_supported());
    assert!(runtime
        .state()
        .reference_space_types()
        .contains(&xr::ReferenceSpaceType::COMBINED_EYE_VARJO));

    run_session(&runtime, &mut context);
    context.draw_session_views().unwrap();
    assert!(runtime
        .state()
        .submitted
        .iter()
        .all(|(_, info)| info.foveation_active));
}

#[test]
fn session_runs_between_ready_and_stopping() {
    let runtime = FakeRuntime::new();
    let mut context = started_context(&runtime, &[]);
    assert!(!context.is_session_running());

    run_session(&runtime, &mut context);
    assert!(context.is_session_running());
    assert_eq!(runtime.state().count("begin_session"), 1);

    let session = context.session().unwrap().handle();
    context
        .handle_session_state_change(session, xr::SessionState::STOPPING)
        .unwrap();
    assert!(!context.is_session_running());
    assert!(context.session().is_some());
    assert_eq!(runtime.state().count("end_session"), 1);
}

#[test]
fn draw_submits_every_view() {
    let runtime = FakeRuntime::new();
    let mut context = started_context(&runtime, &[]);
    run_session(&runtime, &mut context);
    context.draw_session_views().unwrap();

    let state = runtime.state();
    assert_eq!(state.acquired, 2);
    assert_eq!(state.released, 2);
    assert_eq!(state.count("wait_swapchain_image"), 2);

    assert_eq!(state.submitted.len(), 2);
    for (i, (_, info)) in state.submitted.iter().enumerate() {
        assert_eq!(info.view_index, i);
        assert_eq!(info.image_format, ImageFormat::Bgra8Unorm);
        assert_eq!(info.swapchain_format, SwapchainFormat::Rgba8);
        assert!(!info.expects_srgb_buffer);
        assert_eq!((info.width, info.height), (64, 32));
        assert!(!info.foveation_active);
        assert!(!info.upside_down);
        assert_eq!(info.transfer_mode, TransferMode::ZeroCopy);
    }
    let (_, right) = state.submitted[1];
    assert!((right.eye_pose.position[0] - 0.1).abs() < 1e-6);
    assert_eq!(right.local_pose.position[1], 1.6);
    assert_eq!(right.fov.angle_left, -0.8);

    assert_eq!(state.ended_frames.len(), 1);
    let frame = state.ended_frames[0];
    assert_eq!(frame.display_time.as_nanos(), 1_000);
    assert_eq!(frame.blend_mode, xr::EnvironmentBlendMode::OPAQUE);
    assert_eq!(frame.layer_views, Some(2));
    assert_eq!(frame.layer_flags, Some(xr::CompositionLayerFlags::EMPTY));
}

#[test]
fn host_is_told_to_send_cpu_pixels() {
    let runtime = FakeRuntime::new();
    runtime.state().transfer_mode = TransferMode::Cpu;
    let mut context = started_context(&runtime, &[]);

    let seen = Rc::new(Cell::new(None));
    let seen_by_host = seen.clone();
    context.set_draw_view_func(Box::new(move |info| {
        seen_by_host.set(Some(info.transfer_mode));
        let size = (info.width * info.height) as usize * info.image_format.bytes_per_pixel();
        RenderedView::CpuPixels {
            data: vec![0; size],
            width: info.width,
            height: info.height,
        }
    }));
    run_session(&runtime, &mut context);
    context.draw_session_views().unwrap();

    assert_eq!(seen.get(), Some(TransferMode::Cpu));
    assert_eq!(runtime.state().submitted.len(), 2);
}

#[test]
fn frames_the_runtime_skips_end_without_layers() {
    let runtime = FakeRuntime::new();
    runtime.state().should_render = false;
    let mut context = started_context(&runtime, &[]);
    run_session(&runtime, &mut context);
    context.draw_session_views().unwrap();

    let state = runtime.state();
    assert_eq!(state.acquired, 0);
    assert_eq!(state.count("begin_frame"), 1);
    assert_eq!(state.ended_frames.len(), 1);
    assert_eq!(state.ended_frames[0].layer_views, None);
}

#[test]
fn idle_session_does_not_draw() {
    let runtime = FakeRuntime::new();
    let mut context = started_context(&runtime, &[]);
    context.draw_session_views().unwrap();
    assert_eq!(runtime.state().count("wait_frame"), 0);
}

#[test]
fn drawing_without_a_session_is_a_usage_error() {
    let runtime = FakeRuntime::new();
    let mut context = context(&runtime, &[]);
    assert!(matches!(
        context.draw_session_views(),
        Err(XrError::Usage(_))
    ));
}

#[test]
fn passthrough_uses_alpha_blending() {
    let runtime = FakeRuntime::new();
    runtime.state().blend_modes = vec![
        xr::EnvironmentBlendMode::OPAQUE,
        xr::EnvironmentBlendMode::ALPHA_BLEND,
    ];
    let mut context = started_context(&runtime, &[]);
    context.set_passthrough_enabled_func(Box::new(|| true));
    run_session(&runtime, &mut context);
    context.draw_session_views().unwrap();

    assert_eq!(
        context.session().unwrap().environment_blend_mode(),
        Some(xr::EnvironmentBlendMode::OPAQUE)
    );
    let frame = runtime.state().ended_frames[0];
    assert_eq!(frame.blend_mode, xr::EnvironmentBlendMode::ALPHA_BLEND);
    assert_eq!(
        frame.layer_flags,
        Some(xr::CompositionLayerFlags::BLEND_TEXTURE_SOURCE_ALPHA)
    );
}

#[test]
fn passthrough_is_disabled_without_alpha_blending() {
    let runtime = FakeRuntime::new();
    let mut context = started_context(&runtime, &[]);
    let disabled = Rc::new(Cell::new(false));
    let flag = disabled.clone();
    context.set_passthrough_enabled_func(Box::new(|| true));
    context.set_disable_passthrough_func(Box::new(move || flag.set(true)));
    run_session(&runtime, &mut context);
    context.draw_session_views().unwrap();

    assert!(disabled.get());
    let frame = runtime.state().ended_frames[0];
    assert_eq!(frame.blend_mode, xr::EnvironmentBlendMode::OPAQUE);
    assert_eq!(frame.layer_flags, Some(xr::CompositionLayerFlags::EMPTY));
}

#[test]
fn drawing_needs_a_draw_callback() {
    let runtime = FakeRuntime::new();
    let loader = FakeLoader::new(runtime.clone(), &[platform_binding().extension_name()]);
    let mut context = Context::new(&loader, create_info()).unwrap();
    context.set_graphics_context_bind_funcs(
        Box::new(|_| Some(HostGraphicsContext::Vulkan(VulkanDeviceIdentity::default()))),
        Box::new(|_| {}),
    );
    context.start_session(SessionBeginInfo::default()).unwrap();
    run_session(&runtime, &mut context);

    assert!(matches!(
        context.draw_session_views(),
        Err(XrError::Usage(_))
    ));
}

#[test]
fn starting_needs_a_bind_callback() {
    let runtime = FakeRuntime::new();
    let loader = FakeLoader::new(runtime.clone(), &[platform_binding().extension_name()]);
    let mut context = Context::new(&loader, create_info()).unwrap();

    assert!(matches!(
        context.start_session(SessionBeginInfo::default()),
        Err(XrError::Usage(_))
    ));
    assert!(context.session().is_none());
    assert_eq!(runtime.state().count("create_session"), 0);
}

#[test]
fn unmet_requirements_abort_the_start() {
    let runtime = FakeRuntime::new();
    runtime.state().unmet_requirement = Some("Vulkan 1.1".to_owned());
    let mut context = tracked_context(&runtime, &[]);

    let exited = Rc::new(Cell::new(false));
    let flag = exited.clone();
    let err = context
        .start_session(SessionBeginInfo {
            create: None,
            exit: Some(Box::new(move || flag.set(true))),
        })
        .unwrap_err();

    assert!(matches!(err, XrError::Requirements(_)));
    assert!(context.session().is_none());
    assert!(exited.get());
    let state = runtime.state();
    assert_eq!(state.count("create_session"), 0);
    assert_eq!(state.count("unbind"), 1);
}

#[test]
fn a_second_start_is_rejected() {
    let runtime = FakeRuntime::new();
    let mut context = started_context(&runtime, &[]);
    assert!(matches!(
        context.start_session(SessionBeginInfo::default()),
        Err(XrError::Usage(_))
    ));
    assert_eq!(runtime.state().count("create_session"), 1);
}

#[test]
fn create_callback_sees_the_started_session() {
    let runtime = FakeRuntime::new();
    let mut context = context(&runtime, &[]);
    context
        .start_session(SessionBeginInfo {
            create: Some(Box::new(|session: &mut Session| {
                assert_eq!(session.view_count(), 2);
                session
                    .create_action_set(ActionSetInfo {
                        name: "gameplay".to_owned(),
                        priority: 0,
                        custom_data: None,
                    })
                    .unwrap();
            })),
            exit: None,
        })
        .unwrap();

    assert!(context.session().unwrap().action_set("gameplay").is_some());
}

#[test]
fn request_end_asks_the_runtime() {
    let runtime = FakeRuntime::new();
    let context = started_context(&runtime, &[]);
    context.session().unwrap().request_end().unwrap();
    assert_eq!(runtime.state().count("request_exit_session"), 1);
    assert!(context.session().is_some());
}

#[test]
fn image_held_by_a_failed_draw_is_released_on_end() {
    let runtime = FakeRuntime::new();
    let mut context = started_context(&runtime, &[]);
    run_session(&runtime, &mut context);
    {
        let mut state = runtime.state();
        state.fail_submit = true;
        state.fail_release = true;
    }
    assert!(matches!(
        context.draw_session_views(),
        Err(XrError::Graphics(_))
    ));
    assert_eq!(runtime.state().count("release_swapchain_image"), 0);

    context.end_session();

    let state = runtime.state();
    assert_eq!(state.count("release_swapchain_image"), 1);
    assert_eq!(state.released, 0);
    assert_eq!(state.destroyed_swapchains.len(), 2);
}

#[test]
fn ending_destroys_runtime_objects_before_unbinding() {
    let runtime = FakeRuntime::new();
    let mut context = tracked_context(&runtime, &[]);
    context.start_session(SessionBeginInfo::default()).unwrap();
    context
        .session_mut()
        .unwrap()
        .create_action_set(ActionSetInfo {
            name: "gameplay".to_owned(),
            priority: 0,
            custom_data: None,
        })
        .unwrap();

    runtime.state().calls.clear();
    context.end_session();

    let state = runtime.state();
    assert_eq!(
        state.calls,
        vec![
            "destroy_action_set",
            "destroy_swapchain",
            "destroy_swapchain",
            "destroy_space",
            "destroy_space",
            "destroy_session",
            "unbind",
        ]
    );
    assert_eq!(state.destroyed_swapchains.len(), 2);
    drop(state);
    assert!(context.session().is_none());
}
