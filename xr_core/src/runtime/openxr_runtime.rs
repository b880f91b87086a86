use std::borrow::Cow;
use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;
use std::sync::Arc;

use log::{debug, error, info, trace, warn};
use openxr::sys::{self as xr, pfn};
use openxr::{ExtensionSet, InstanceExtensions};

use super::{
    c_chars_to_string, call_enumerate, place_c_chars, ActionCreateInfo, ActionStateReading,
    FrameTiming, HapticVibration, InstanceCreateInfo, LocatedView, NodeProperty,
    ProjectionLayer, Runtime, RuntimeEvent, RuntimeId, RuntimeLoader, RuntimeProperties,
    SpaceLocation, SuggestedBinding, SwapchainCreateInfo, ViewConfigView,
};
use crate::config::GraphicsBindingType;
use crate::error::{XrError, XrResult};
use crate::graphics::{self, GraphicsBinding};
use crate::ToResult;

/// Zero initialises an output struct and stamps its structure type.
macro_rules! out_struct {
    ($ty:ty) => {{
        let mut value: $ty = unsafe { std::mem::zeroed() };
        value.ty = <$ty>::TYPE;
        value
    }};
}
pub(crate) use out_struct;

/// Loads the system OpenXR loader.
pub struct OpenXrLoader {
    entry: openxr::Entry,
}

impl OpenXrLoader {
    pub fn load() -> XrResult<Self> {
        let entry = unsafe { openxr::Entry::load() }.map_err(|err| XrError::Loader(err.to_string()))?;
        Ok(Self { entry })
    }
}

impl RuntimeLoader for OpenXrLoader {
    fn enumerate_api_layers(&self) -> openxr::Result<Vec<String>> {
        let fp = self.entry.fp();
        let layers = unsafe {
            call_enumerate(
                |capacity, count, out| (fp.enumerate_api_layer_properties)(capacity, count, out),
                out_struct!(xr::ApiLayerProperties),
            )
        }?;
        Ok(layers
            .iter()
            .map(|layer| c_chars_to_string(&layer.layer_name))
            .collect())
    }

    fn enumerate_extensions(&self, layer: Option<&str>) -> openxr::Result<Vec<String>> {
        let layer_name = layer
            .map(CString::new)
            .transpose()
            .map_err(|_| xr::Result::ERROR_VALIDATION_FAILURE)?;
        let layer_ptr = layer_name.as_ref().map_or(ptr::null(), |name| name.as_ptr());

        let fp = self.entry.fp();
        let extensions = unsafe {
            call_enumerate(
                |capacity, count, out| {
                    (fp.enumerate_instance_extension_properties)(layer_ptr, capacity, count, out)
                },
                out_struct!(xr::ExtensionProperties),
            )
        }?;
        Ok(extensions
            .iter()
            .map(|extension| c_chars_to_string(&extension.extension_name))
            .collect())
    }

    fn create_instance(&self, info: &InstanceCreateInfo) -> openxr::Result<Arc<dyn Runtime>> {
        let to_c_strings = |names: &[String]| {
            names
                .iter()
                .map(|name| CString::new(name.as_str()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| xr::Result::ERROR_VALIDATION_FAILURE)
        };
        let layer_names = to_c_strings(info.layers)?;
        let extension_names = to_c_strings(info.extensions)?;
        let layer_ptrs = layer_names.iter().map(|name| name.as_ptr()).collect::<Vec<_>>();
        let extension_ptrs = extension_names
            .iter()
            .map(|name| name.as_ptr())
            .collect::<Vec<_>>();

        let mut application_info: xr::ApplicationInfo = unsafe { std::mem::zeroed() };
        place_c_chars(&mut application_info.application_name, info.application_name);
        place_c_chars(&mut application_info.engine_name, crate::ENGINE_NAME);
        application_info.application_version = info.application_version;
        application_info.engine_version = 1;
        application_info.api_version = xr::Version::new(1, 0, 0);

        let create_info = xr::InstanceCreateInfo {
            ty: xr::InstanceCreateInfo::TYPE,
            next: ptr::null(),
            create_flags: xr::InstanceCreateFlags::EMPTY,
            application_info,
            enabled_api_layer_count: layer_ptrs.len() as u32,
            enabled_api_layer_names: layer_ptrs.as_ptr(),
            enabled_extension_count: extension_ptrs.len() as u32,
            enabled_extension_names: extension_ptrs.as_ptr(),
        };

        let mut handle = xr::Instance::NULL;
        unsafe { (self.entry.fp().create_instance)(&create_info, &mut handle) }.result()?;

        debug!("Instance created with {} extensions", info.extensions.len());

        let runtime = unsafe { OpenXrRuntime::load(self.entry.clone(), handle, info) }?;
        Ok(Arc::new(runtime))
    }
}

/// The instance and its resolved function tables.
pub struct InnerInstance {
    pub handle: xr::Instance,
    pub entry: openxr::Entry,
    pub core: openxr::raw::Instance,
    pub exts: InstanceExtensions,
    pub enabled_extensions: Vec<String>,
    pub debug: bool,
    debug_messenger: Option<xr::DebugUtilsMessengerEXT>,
}

impl InnerInstance {
    pub fn is_extension_enabled(&self, name: &str) -> bool {
        self.enabled_extensions.iter().any(|enabled| enabled == name)
    }

    /// Resolves an entry point the `openxr` crate has no table for.
    pub unsafe fn get_instance_proc_addr(&self, name: &CStr) -> openxr::Result<pfn::VoidFunction> {
        let mut function = None;
        (self.core.get_instance_proc_addr)(self.handle, name.as_ptr(), &mut function).result()?;
        function.ok_or(xr::Result::ERROR_FUNCTION_UNSUPPORTED)
    }
}

impl Drop for InnerInstance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(messenger), Some(debug_utils)) =
                (self.debug_messenger, self.exts.ext_debug_utils.as_ref())
            {
                (debug_utils.destroy_debug_utils_messenger)(messenger);
            }
            (self.core.destroy_instance)(self.handle);
        }
        debug!("Instance destroyed");
    }
}

pub struct OpenXrRuntime {
    inner: Arc<InnerInstance>,
    properties: RuntimeProperties,
}

impl OpenXrRuntime {
    unsafe fn load(
        entry: openxr::Entry,
        handle: xr::Instance,
        info: &InstanceCreateInfo,
    ) -> openxr::Result<Self> {
        let core = match openxr::raw::Instance::load(&entry, handle) {
            Ok(core) => core,
            Err(err) => {
                error!("Failed to load instance functions: {}", err);
                return Err(err);
            }
        };
        let exts = match InstanceExtensions::load(&entry, handle, &extension_set(info.extensions))
        {
            Ok(exts) => exts,
            Err(err) => {
                error!("Failed to load extension functions: {}", err);
                (core.destroy_instance)(handle);
                return Err(err);
            }
        };

        let mut inner = InnerInstance {
            handle,
            entry,
            core,
            exts,
            enabled_extensions: info.extensions.to_vec(),
            debug: info.debug_messenger,
            debug_messenger: None,
        };

        if info.debug_messenger {
            inner.debug_messenger = create_debug_messenger(&inner);
        }

        let mut instance_properties = out_struct!(xr::InstanceProperties);
        (inner.core.get_instance_properties)(handle, &mut instance_properties).result()?;
        let name = c_chars_to_string(&instance_properties.runtime_name);
        let version = instance_properties.runtime_version;

        info!(
            "Connected to OpenXR runtime: {} (Version {}.{}.{})",
            name,
            version.major(),
            version.minor(),
            version.patch()
        );

        Ok(Self {
            inner: Arc::new(inner),
            properties: RuntimeProperties {
                id: RuntimeId::from_name(&name),
                name,
                version,
            },
        })
    }

    pub fn inner(&self) -> &Arc<InnerInstance> {
        &self.inner
    }

    fn controller_model_fns(&self) -> openxr::Result<&openxr::raw::ControllerModelMSFT> {
        self.inner
            .exts
            .msft_controller_model
            .as_ref()
            .ok_or(xr::Result::ERROR_EXTENSION_NOT_PRESENT)
    }
}

fn extension_set(names: &[String]) -> ExtensionSet {
    let mut set = ExtensionSet::default();
    for name in names {
        match name.as_str() {
            "XR_KHR_opengl_enable" => set.khr_opengl_enable = true,
            "XR_KHR_vulkan_enable2" => set.khr_vulkan_enable2 = true,
            "XR_EXT_debug_utils" => set.ext_debug_utils = true,
            "XR_MSFT_controller_model" => set.msft_controller_model = true,
            _ => set.other.push(name.clone()),
        }
    }
    set
}

unsafe fn create_debug_messenger(inner: &InnerInstance) -> Option<xr::DebugUtilsMessengerEXT> {
    let debug_utils = inner.exts.ext_debug_utils.as_ref()?;

    let create_info = xr::DebugUtilsMessengerCreateInfoEXT {
        ty: xr::DebugUtilsMessengerCreateInfoEXT::TYPE,
        next: ptr::null(),
        message_severities: xr::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            | xr::DebugUtilsMessageSeverityFlagsEXT::INFO
            | xr::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | xr::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_types: xr::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | xr::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | xr::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            | xr::DebugUtilsMessageTypeFlagsEXT::CONFORMANCE,
        user_callback: Some(debug_messenger_callback),
        user_data: ptr::null_mut(),
    };

    let mut messenger = xr::DebugUtilsMessengerEXT::NULL;
    match (debug_utils.create_debug_utils_messenger)(inner.handle, &create_info, &mut messenger)
        .result()
    {
        Ok(_) => Some(messenger),
        Err(err) => {
            warn!("Failed to create OpenXR debug messenger: {}", err);
            None
        }
    }
}

unsafe extern "system" fn debug_messenger_callback(
    severity: xr::DebugUtilsMessageSeverityFlagsEXT,
    _message_types: xr::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const xr::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut c_void,
) -> xr::Bool32 {
    let message = if callback_data.is_null() || (*callback_data).message.is_null() {
        Cow::from("")
    } else {
        CStr::from_ptr((*callback_data).message).to_string_lossy()
    };

    if severity.contains(xr::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!("OpenXR: {}", message);
    } else if severity.contains(xr::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!("OpenXR: {}", message);
    } else if severity.contains(xr::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        info!("OpenXR: {}", message);
    } else {
        trace!("OpenXR: {}", message);
    }

    xr::FALSE
}

impl Runtime for OpenXrRuntime {
    fn properties(&self) -> &RuntimeProperties {
        &self.properties
    }

    fn result_to_string(&self, result: xr::Result) -> String {
        let mut buffer = [0 as c_char; xr::MAX_RESULT_STRING_SIZE];
        match unsafe { (self.inner.core.result_to_string)(self.inner.handle, result, buffer.as_mut_ptr()) }
            .result()
        {
            Ok(_) => c_chars_to_string(&buffer),
            Err(_) => result.to_string(),
        }
    }

    fn get_system(&self, form_factor: xr::FormFactor) -> openxr::Result<xr::SystemId> {
        let get_info = xr::SystemGetInfo {
            ty: xr::SystemGetInfo::TYPE,
            next: ptr::null(),
            form_factor,
        };
        let mut system = xr::SystemId::NULL;
        unsafe { (self.inner.core.get_system)(self.inner.handle, &get_info, &mut system) }
            .result()?;
        Ok(system)
    }

    fn supports_foveated_rendering(&self, system: xr::SystemId) -> openxr::Result<bool> {
        if !self.inner.is_extension_enabled("XR_VARJO_foveated_rendering") {
            return Ok(false);
        }

        let mut foveated = out_struct!(xr::SystemFoveatedRenderingPropertiesVARJO);
        let mut properties = out_struct!(xr::SystemProperties);
        properties.next = &mut foveated as *mut _ as *mut c_void;

        unsafe {
            (self.inner.core.get_system_properties)(self.inner.handle, system, &mut properties)
        }
        .result()?;
        Ok(foveated.supports_foveated_rendering.into())
    }

    fn enumerate_view_configuration_views(
        &self,
        system: xr::SystemId,
        view_type: xr::ViewConfigurationType,
        foveated: bool,
    ) -> openxr::Result<Vec<ViewConfigView>> {
        let core = &self.inner.core;
        let instance = self.inner.handle;

        let mut count = 0;
        unsafe {
            (core.enumerate_view_configuration_views)(
                instance,
                system,
                view_type,
                0,
                &mut count,
                ptr::null_mut(),
            )
        }
        .result()?;

        let mut foveated_views = (0..count)
            .map(|_| {
                let mut view = out_struct!(xr::FoveatedViewConfigurationViewVARJO);
                view.foveated_rendering_active = xr::TRUE;
                view
            })
            .collect::<Vec<_>>();
        let mut views = foveated_views
            .iter_mut()
            .map(|foveated_view| {
                let mut view = out_struct!(xr::ViewConfigurationView);
                if foveated {
                    view.next = foveated_view as *mut _ as *mut c_void;
                }
                view
            })
            .collect::<Vec<_>>();

        unsafe {
            (core.enumerate_view_configuration_views)(
                instance,
                system,
                view_type,
                count,
                &mut count,
                views.as_mut_ptr(),
            )
        }
        .result()?;
        views.truncate(count as usize);

        Ok(views
            .iter()
            .map(|view| ViewConfigView {
                recommended_width: view.recommended_image_rect_width,
                recommended_height: view.recommended_image_rect_height,
                recommended_sample_count: view.recommended_swapchain_sample_count,
                max_width: view.max_image_rect_width,
                max_height: view.max_image_rect_height,
            })
            .collect())
    }

    fn enumerate_environment_blend_modes(
        &self,
        system: xr::SystemId,
        view_type: xr::ViewConfigurationType,
    ) -> openxr::Result<Vec<xr::EnvironmentBlendMode>> {
        let core = &self.inner.core;
        let instance = self.inner.handle;
        unsafe {
            call_enumerate(
                |capacity, count, out| {
                    (core.enumerate_environment_blend_modes)(
                        instance, system, view_type, capacity, count, out,
                    )
                },
                xr::EnvironmentBlendMode::OPAQUE,
            )
        }
    }

    fn create_graphics_binding(
        &self,
        binding_type: GraphicsBindingType,
    ) -> XrResult<Box<dyn GraphicsBinding>> {
        graphics::create_binding(binding_type, &self.inner)
    }

    fn create_session(
        &self,
        system: xr::SystemId,
        graphics_binding: *const c_void,
    ) -> openxr::Result<xr::Session> {
        let create_info = xr::SessionCreateInfo {
            ty: xr::SessionCreateInfo::TYPE,
            next: graphics_binding,
            create_flags: xr::SessionCreateFlags::EMPTY,
            system_id: system,
        };
        let mut session = xr::Session::NULL;
        unsafe { (self.inner.core.create_session)(self.inner.handle, &create_info, &mut session) }
            .result()?;
        Ok(session)
    }

    fn destroy_session(&self, session: xr::Session) {
        if let Err(err) = unsafe { (self.inner.core.destroy_session)(session) }.result() {
            warn!("Failed to destroy session: {}", err);
        }
    }

    fn begin_session(
        &self,
        session: xr::Session,
        view_type: xr::ViewConfigurationType,
    ) -> openxr::Result<()> {
        let begin_info = xr::SessionBeginInfo {
            ty: xr::SessionBeginInfo::TYPE,
            next: ptr::null(),
            primary_view_configuration_type: view_type,
        };
        unsafe { (self.inner.core.begin_session)(session, &begin_info) }.result2(())
    }

    fn end_session(&self, session: xr::Session) -> openxr::Result<()> {
        unsafe { (self.inner.core.end_session)(session) }.result2(())
    }

    fn request_exit_session(&self, session: xr::Session) -> openxr::Result<()> {
        unsafe { (self.inner.core.request_exit_session)(session) }.result2(())
    }

    fn poll_event(&self) -> openxr::Result<Option<RuntimeEvent>> {
        let mut buffer = out_struct!(xr::EventDataBuffer);
        let result =
            unsafe { (self.inner.core.poll_event)(self.inner.handle, &mut buffer) }.result()?;
        if result == xr::Result::EVENT_UNAVAILABLE {
            return Ok(None);
        }

        let event = match buffer.ty {
            xr::StructureType::EVENT_DATA_SESSION_STATE_CHANGED => {
                let changed = unsafe {
                    &*(&buffer as *const xr::EventDataBuffer
                        as *const xr::EventDataSessionStateChanged)
                };
                RuntimeEvent::SessionStateChanged {
                    session: changed.session,
                    state: changed.state,
                }
            }
            xr::StructureType::EVENT_DATA_INSTANCE_LOSS_PENDING => {
                RuntimeEvent::InstanceLossPending
            }
            xr::StructureType::EVENT_DATA_INTERACTION_PROFILE_CHANGED => {
                RuntimeEvent::InteractionProfileChanged
            }
            other => RuntimeEvent::Other(other),
        };
        Ok(Some(event))
    }

    fn create_reference_space(
        &self,
        session: xr::Session,
        space_type: xr::ReferenceSpaceType,
        pose: xr::Posef,
    ) -> openxr::Result<xr::Space> {
        let create_info = xr::ReferenceSpaceCreateInfo {
            ty: xr::ReferenceSpaceCreateInfo::TYPE,
            next: ptr::null(),
            reference_space_type: space_type,
            pose_in_reference_space: pose,
        };
        let mut space = xr::Space::NULL;
        unsafe { (self.inner.core.create_reference_space)(session, &create_info, &mut space) }
            .result()?;
        Ok(space)
    }

    fn get_reference_space_bounds_rect(
        &self,
        session: xr::Session,
        space_type: xr::ReferenceSpaceType,
    ) -> openxr::Result<xr::Extent2Df> {
        let mut bounds = xr::Extent2Df {
            width: 0.0,
            height: 0.0,
        };
        // SPACE_BOUNDS_UNAVAILABLE is a success code and leaves the extent zeroed.
        unsafe {
            (self.inner.core.get_reference_space_bounds_rect)(session, space_type, &mut bounds)
        }
        .result()?;
        Ok(bounds)
    }

    fn create_action_space(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
        pose: xr::Posef,
    ) -> openxr::Result<xr::Space> {
        let create_info = xr::ActionSpaceCreateInfo {
            ty: xr::ActionSpaceCreateInfo::TYPE,
            next: ptr::null(),
            action,
            subaction_path,
            pose_in_action_space: pose,
        };
        let mut space = xr::Space::NULL;
        unsafe { (self.inner.core.create_action_space)(session, &create_info, &mut space) }
            .result()?;
        Ok(space)
    }

    fn locate_space(
        &self,
        space: xr::Space,
        base_space: xr::Space,
        time: xr::Time,
    ) -> openxr::Result<SpaceLocation> {
        let mut location = out_struct!(xr::SpaceLocation);
        unsafe { (self.inner.core.locate_space)(space, base_space, time, &mut location) }
            .result()?;
        Ok(SpaceLocation {
            flags: location.location_flags,
            pose: location.pose,
        })
    }

    fn destroy_space(&self, space: xr::Space) {
        if let Err(err) = unsafe { (self.inner.core.destroy_space)(space) }.result() {
            warn!("Failed to destroy space: {}", err);
        }
    }

    fn enumerate_swapchain_formats(&self, session: xr::Session) -> openxr::Result<Vec<i64>> {
        let core = &self.inner.core;
        unsafe {
            call_enumerate(
                |capacity, count, out| (core.enumerate_swapchain_formats)(session, capacity, count, out),
                0,
            )
        }
    }

    fn create_swapchain(
        &self,
        session: xr::Session,
        info: &SwapchainCreateInfo,
    ) -> openxr::Result<xr::Swapchain> {
        let create_info = xr::SwapchainCreateInfo {
            ty: xr::SwapchainCreateInfo::TYPE,
            next: ptr::null(),
            create_flags: xr::SwapchainCreateFlags::EMPTY,
            usage_flags: info.usage_flags,
            format: info.format,
            sample_count: info.sample_count,
            width: info.width,
            height: info.height,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
        };
        let mut swapchain = xr::Swapchain::NULL;
        unsafe { (self.inner.core.create_swapchain)(session, &create_info, &mut swapchain) }
            .result()?;
        Ok(swapchain)
    }

    fn destroy_swapchain(&self, swapchain: xr::Swapchain) {
        if let Err(err) = unsafe { (self.inner.core.destroy_swapchain)(swapchain) }.result() {
            warn!("Failed to destroy swapchain: {}", err);
        }
    }

    fn acquire_swapchain_image(&self, swapchain: xr::Swapchain) -> openxr::Result<u32> {
        let acquire_info = xr::SwapchainImageAcquireInfo {
            ty: xr::SwapchainImageAcquireInfo::TYPE,
            next: ptr::null(),
        };
        let mut index = 0;
        unsafe {
            (self.inner.core.acquire_swapchain_image)(swapchain, &acquire_info, &mut index)
        }
        .result()?;
        Ok(index)
    }

    fn wait_swapchain_image(
        &self,
        swapchain: xr::Swapchain,
        timeout: xr::Duration,
    ) -> openxr::Result<()> {
        let wait_info = xr::SwapchainImageWaitInfo {
            ty: xr::SwapchainImageWaitInfo::TYPE,
            next: ptr::null(),
            timeout,
        };
        unsafe { (self.inner.core.wait_swapchain_image)(swapchain, &wait_info) }.result2(())
    }

    fn release_swapchain_image(&self, swapchain: xr::Swapchain) -> openxr::Result<()> {
        let release_info = xr::SwapchainImageReleaseInfo {
            ty: xr::SwapchainImageReleaseInfo::TYPE,
            next: ptr::null(),
        };
        unsafe { (self.inner.core.release_swapchain_image)(swapchain, &release_info) }.result2(())
    }

    fn wait_frame(&self, session: xr::Session) -> openxr::Result<FrameTiming> {
        let wait_info = xr::FrameWaitInfo {
            ty: xr::FrameWaitInfo::TYPE,
            next: ptr::null(),
        };
        let mut frame_state = out_struct!(xr::FrameState);
        unsafe { (self.inner.core.wait_frame)(session, &wait_info, &mut frame_state) }.result()?;
        Ok(FrameTiming {
            predicted_display_time: frame_state.predicted_display_time,
            predicted_display_period: frame_state.predicted_display_period,
            should_render: frame_state.should_render.into(),
        })
    }

    fn begin_frame(&self, session: xr::Session) -> openxr::Result<()> {
        let begin_info = xr::FrameBeginInfo {
            ty: xr::FrameBeginInfo::TYPE,
            next: ptr::null(),
        };
        unsafe { (self.inner.core.begin_frame)(session, &begin_info) }.result2(())
    }

    fn locate_views(
        &self,
        session: xr::Session,
        view_type: xr::ViewConfigurationType,
        display_time: xr::Time,
        space: xr::Space,
        foveated: bool,
    ) -> openxr::Result<Vec<LocatedView>> {
        let mut foveated_info = out_struct!(xr::ViewLocateFoveatedRenderingVARJO);
        foveated_info.foveated_rendering_active = foveated.into();

        let locate_info = xr::ViewLocateInfo {
            ty: xr::ViewLocateInfo::TYPE,
            next: if foveated {
                &foveated_info as *const _ as *const c_void
            } else {
                ptr::null()
            },
            view_configuration_type: view_type,
            display_time,
            space,
        };

        let core = &self.inner.core;
        let mut view_state = out_struct!(xr::ViewState);
        let views = unsafe {
            call_enumerate(
                |capacity, count, out| {
                    (core.locate_views)(session, &locate_info, &mut view_state, capacity, count, out)
                },
                out_struct!(xr::View),
            )
        }?;

        Ok(views
            .iter()
            .map(|view| LocatedView {
                pose: view.pose,
                fov: view.fov,
            })
            .collect())
    }

    fn end_frame(
        &self,
        session: xr::Session,
        display_time: xr::Time,
        blend_mode: xr::EnvironmentBlendMode,
        layer: Option<&ProjectionLayer>,
    ) -> openxr::Result<()> {
        let projection = layer.map(|layer| xr::CompositionLayerProjection {
            ty: xr::CompositionLayerProjection::TYPE,
            next: ptr::null(),
            layer_flags: layer.flags,
            space: layer.space,
            view_count: layer.views.len() as u32,
            views: layer.views.as_ptr(),
        });
        let layers = projection
            .iter()
            .map(|projection| projection as *const _ as *const xr::CompositionLayerBaseHeader)
            .collect::<Vec<_>>();

        let end_info = xr::FrameEndInfo {
            ty: xr::FrameEndInfo::TYPE,
            next: ptr::null(),
            display_time,
            environment_blend_mode: blend_mode,
            layer_count: layers.len() as u32,
            layers: layers.as_ptr(),
        };
        unsafe { (self.inner.core.end_frame)(session, &end_info) }.result2(())
    }

    fn string_to_path(&self, path: &str) -> openxr::Result<xr::Path> {
        let path = CString::new(path).map_err(|_| xr::Result::ERROR_PATH_FORMAT_INVALID)?;
        let mut out = xr::Path::NULL;
        unsafe { (self.inner.core.string_to_path)(self.inner.handle, path.as_ptr(), &mut out) }
            .result()?;
        Ok(out)
    }

    fn path_to_string(&self, path: xr::Path) -> openxr::Result<String> {
        let core = &self.inner.core;
        let instance = self.inner.handle;
        let chars = unsafe {
            call_enumerate(
                |capacity, count, out| (core.path_to_string)(instance, path, capacity, count, out),
                0 as c_char,
            )
        }?;
        Ok(c_chars_to_string(&chars))
    }

    fn create_action_set(
        &self,
        name: &str,
        localized_name: &str,
        priority: u32,
    ) -> openxr::Result<xr::ActionSet> {
        let mut create_info = out_struct!(xr::ActionSetCreateInfo);
        place_c_chars(&mut create_info.action_set_name, name);
        place_c_chars(&mut create_info.localized_action_set_name, localized_name);
        create_info.priority = priority;

        let mut action_set = xr::ActionSet::NULL;
        unsafe {
            (self.inner.core.create_action_set)(self.inner.handle, &create_info, &mut action_set)
        }
        .result()?;
        Ok(action_set)
    }

    fn destroy_action_set(&self, action_set: xr::ActionSet) {
        if let Err(err) = unsafe { (self.inner.core.destroy_action_set)(action_set) }.result() {
            warn!("Failed to destroy action set: {}", err);
        }
    }

    fn create_action(
        &self,
        action_set: xr::ActionSet,
        info: &ActionCreateInfo,
    ) -> openxr::Result<xr::Action> {
        let mut create_info = out_struct!(xr::ActionCreateInfo);
        place_c_chars(&mut create_info.action_name, info.name);
        place_c_chars(&mut create_info.localized_action_name, info.localized_name);
        create_info.action_type = info.action_type;
        create_info.count_subaction_paths = info.subaction_paths.len() as u32;
        create_info.subaction_paths = info.subaction_paths.as_ptr();

        let mut action = xr::Action::NULL;
        unsafe { (self.inner.core.create_action)(action_set, &create_info, &mut action) }
            .result()?;
        Ok(action)
    }

    fn destroy_action(&self, action: xr::Action) {
        if let Err(err) = unsafe { (self.inner.core.destroy_action)(action) }.result() {
            warn!("Failed to destroy action: {}", err);
        }
    }

    fn suggest_interaction_profile_bindings(
        &self,
        profile: xr::Path,
        bindings: &[SuggestedBinding],
    ) -> openxr::Result<()> {
        let suggested = bindings
            .iter()
            .map(|binding| xr::ActionSuggestedBinding {
                action: binding.action,
                binding: binding.binding,
            })
            .collect::<Vec<_>>();
        let suggestion = xr::InteractionProfileSuggestedBinding {
            ty: xr::InteractionProfileSuggestedBinding::TYPE,
            next: ptr::null(),
            interaction_profile: profile,
            count_suggested_bindings: suggested.len() as u32,
            suggested_bindings: suggested.as_ptr(),
        };
        unsafe {
            (self.inner.core.suggest_interaction_profile_bindings)(self.inner.handle, &suggestion)
        }
        .result2(())
    }

    fn attach_session_action_sets(
        &self,
        session: xr::Session,
        action_sets: &[xr::ActionSet],
    ) -> openxr::Result<()> {
        let attach_info = xr::SessionActionSetsAttachInfo {
            ty: xr::SessionActionSetsAttachInfo::TYPE,
            next: ptr::null(),
            count_action_sets: action_sets.len() as u32,
            action_sets: action_sets.as_ptr(),
        };
        unsafe { (self.inner.core.attach_session_action_sets)(session, &attach_info) }.result2(())
    }

    fn get_current_interaction_profile(
        &self,
        session: xr::Session,
        top_level_user_path: xr::Path,
    ) -> openxr::Result<xr::Path> {
        let mut profile_state = out_struct!(xr::InteractionProfileState);
        unsafe {
            (self.inner.core.get_current_interaction_profile)(
                session,
                top_level_user_path,
                &mut profile_state,
            )
        }
        .result()?;
        Ok(profile_state.interaction_profile)
    }

    fn sync_actions(
        &self,
        session: xr::Session,
        active_action_sets: &[xr::ActiveActionSet],
    ) -> openxr::Result<()> {
        let sync_info = xr::ActionsSyncInfo {
            ty: xr::ActionsSyncInfo::TYPE,
            next: ptr::null(),
            count_active_action_sets: active_action_sets.len() as u32,
            active_action_sets: active_action_sets.as_ptr(),
        };
        unsafe { (self.inner.core.sync_actions)(session, &sync_info) }.result2(())
    }

    fn get_action_state_boolean(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<ActionStateReading<bool>> {
        let get_info = action_state_get_info(action, subaction_path);
        let mut state = out_struct!(xr::ActionStateBoolean);
        unsafe { (self.inner.core.get_action_state_boolean)(session, &get_info, &mut state) }
            .result()?;
        Ok(ActionStateReading {
            current_state: state.current_state.into(),
            is_active: state.is_active.into(),
        })
    }

    fn get_action_state_float(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<ActionStateReading<f32>> {
        let get_info = action_state_get_info(action, subaction_path);
        let mut state = out_struct!(xr::ActionStateFloat);
        unsafe { (self.inner.core.get_action_state_float)(session, &get_info, &mut state) }
            .result()?;
        Ok(ActionStateReading {
            current_state: state.current_state,
            is_active: state.is_active.into(),
        })
    }

    fn get_action_state_vector2f(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<ActionStateReading<[f32; 2]>> {
        let get_info = action_state_get_info(action, subaction_path);
        let mut state = out_struct!(xr::ActionStateVector2f);
        unsafe { (self.inner.core.get_action_state_vector2f)(session, &get_info, &mut state) }
            .result()?;
        Ok(ActionStateReading {
            current_state: [state.current_state.x, state.current_state.y],
            is_active: state.is_active.into(),
        })
    }

    fn get_action_state_pose(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<bool> {
        let get_info = action_state_get_info(action, subaction_path);
        let mut state = out_struct!(xr::ActionStatePose);
        unsafe { (self.inner.core.get_action_state_pose)(session, &get_info, &mut state) }
            .result()?;
        Ok(state.is_active.into())
    }

    fn apply_haptic_feedback(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
        vibration: &HapticVibration,
    ) -> openxr::Result<()> {
        let action_info = haptic_action_info(action, subaction_path);
        let vibration = xr::HapticVibration {
            ty: xr::HapticVibration::TYPE,
            next: ptr::null(),
            duration: vibration.duration,
            frequency: vibration.frequency,
            amplitude: vibration.amplitude,
        };
        unsafe {
            (self.inner.core.apply_haptic_feedback)(
                session,
                &action_info,
                &vibration as *const xr::HapticVibration as *const xr::HapticBaseHeader,
            )
        }
        .result2(())
    }

    fn stop_haptic_feedback(
        &self,
        session: xr::Session,
        action: xr::Action,
        subaction_path: xr::Path,
    ) -> openxr::Result<()> {
        let action_info = haptic_action_info(action, subaction_path);
        unsafe { (self.inner.core.stop_haptic_feedback)(session, &action_info) }.result2(())
    }

    fn get_controller_model_key(
        &self,
        session: xr::Session,
        user_path: xr::Path,
    ) -> openxr::Result<u64> {
        let fns = self.controller_model_fns()?;
        let mut key_state = out_struct!(xr::ControllerModelKeyStateMSFT);
        unsafe { (fns.get_controller_model_key)(session, user_path, &mut key_state) }.result()?;
        Ok(key_state.model_key.into_raw())
    }

    fn load_controller_model(
        &self,
        session: xr::Session,
        model_key: u64,
        buffer: &mut [u8],
    ) -> openxr::Result<usize> {
        let fns = self.controller_model_fns()?;
        let mut count = 0;
        let out = if buffer.is_empty() {
            ptr::null_mut()
        } else {
            buffer.as_mut_ptr()
        };
        unsafe {
            (fns.load_controller_model)(
                session,
                xr::ControllerModelKeyMSFT::from_raw(model_key),
                buffer.len() as u32,
                &mut count,
                out,
            )
        }
        .result()?;
        Ok(count as usize)
    }

    fn get_controller_model_properties(
        &self,
        session: xr::Session,
        model_key: u64,
    ) -> openxr::Result<Vec<NodeProperty>> {
        let fns = self.controller_model_fns()?;
        let key = xr::ControllerModelKeyMSFT::from_raw(model_key);

        let mut properties = out_struct!(xr::ControllerModelPropertiesMSFT);
        unsafe { (fns.get_controller_model_properties)(session, key, &mut properties) }
            .result()?;

        let mut nodes = vec![out_struct!(xr::ControllerModelNodePropertiesMSFT); properties.node_count_output as usize];
        properties.node_capacity_input = nodes.len() as u32;
        properties.node_properties = nodes.as_mut_ptr();
        unsafe { (fns.get_controller_model_properties)(session, key, &mut properties) }
            .result()?;
        nodes.truncate(properties.node_count_output as usize);

        Ok(nodes
            .iter()
            .map(|node| NodeProperty {
                parent_node_name: c_chars_to_string(&node.parent_node_name),
                node_name: c_chars_to_string(&node.node_name),
            })
            .collect())
    }

    fn get_controller_model_state(
        &self,
        session: xr::Session,
        model_key: u64,
    ) -> openxr::Result<Vec<xr::Posef>> {
        let fns = self.controller_model_fns()?;
        let key = xr::ControllerModelKeyMSFT::from_raw(model_key);

        let mut state = out_struct!(xr::ControllerModelStateMSFT);
        unsafe { (fns.get_controller_model_state)(session, key, &mut state) }.result()?;

        let mut nodes =
            vec![out_struct!(xr::ControllerModelNodeStateMSFT); state.node_count_output as usize];
        state.node_capacity_input = nodes.len() as u32;
        state.node_states = nodes.as_mut_ptr();
        unsafe { (fns.get_controller_model_state)(session, key, &mut state) }.result()?;
        nodes.truncate(state.node_count_output as usize);

        Ok(nodes.iter().map(|node| node.node_pose).collect())
    }
}

fn action_state_get_info(action: xr::Action, subaction_path: xr::Path) -> xr::ActionStateGetInfo {
    xr::ActionStateGetInfo {
        ty: xr::ActionStateGetInfo::TYPE,
        next: ptr::null(),
        action,
        subaction_path,
    }
}

fn haptic_action_info(action: xr::Action, subaction_path: xr::Path) -> xr::HapticActionInfo {
    xr::HapticActionInfo {
        ty: xr::HapticActionInfo::TYPE,
        next: ptr::null(),
        action,
        subaction_path,
    }
}
