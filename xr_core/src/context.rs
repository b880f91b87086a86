use std::sync::Arc;

use log::{debug, info, warn};
use openxr::sys as xr;

use crate::config::{ContextCreateInfo, GpuVendor, GraphicsBindingType};
use crate::error::{self, ResultExt, XrError, XrResult};
use crate::runtime::{InstanceCreateInfo, Runtime, RuntimeEvent, RuntimeId, RuntimeLoader, RuntimeProperties};
use crate::session::{LifeExpectancy, Session};
use crate::types::{DrawViewInfo, HostGraphicsContext, RenderedView};

const VALIDATION_LAYER: &str = "XR_APILAYER_LUNARG_core_validation";
const DEBUG_UTILS_EXTENSION: &str = "XR_EXT_debug_utils";

/// Requested whenever the runtime reports them.
const OPTIONAL_EXTENSIONS: &[&str] = &[
    "XR_MSFT_controller_model",
    "XR_VARJO_quad_views",
    "XR_VARJO_foveated_rendering",
    "XR_EXT_hp_mixed_reality_controller",
    "XR_HTC_vive_cosmos_controller_interaction",
    "XR_HTC_vive_focus3_controller_interaction",
    "XR_EXT_samsung_odyssey_controller",
];

/// What was negotiated with the runtime when the context was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub runtime: RuntimeProperties,
    pub enabled_layers: Vec<String>,
    pub enabled_extensions: Vec<String>,
    pub binding_type: GraphicsBindingType,
}

impl Capabilities {
    pub fn is_extension_enabled(&self, name: &str) -> bool {
        self.enabled_extensions.iter().any(|extension| extension == name)
    }
}

pub type BindGraphicsContextFn = Box<dyn FnMut(GraphicsBindingType) -> Option<HostGraphicsContext>>;
pub type UnbindGraphicsContextFn = Box<dyn FnMut(HostGraphicsContext)>;
pub type DrawViewFn = Box<dyn FnMut(&DrawViewInfo) -> RenderedView>;

/// Host callbacks the context invokes during the session lifecycle and the frame loop.
#[derive(Default)]
pub struct ContextCallbacks {
    pub bind_graphics_context: Option<BindGraphicsContextFn>,
    pub unbind_graphics_context: Option<UnbindGraphicsContextFn>,
    pub draw_view: Option<DrawViewFn>,
    pub passthrough_enabled: Option<Box<dyn FnMut() -> bool>>,
    pub disable_passthrough: Option<Box<dyn FnMut()>>,
}

#[derive(Default)]
pub struct SessionBeginInfo {
    /// Called once the session is ready for action set setup.
    pub create: Option<Box<dyn FnOnce(&mut Session)>>,
    /// Called after the session was destroyed, whatever the cause.
    pub exit: Option<Box<dyn FnMut()>>,
}

/// The connection to an OpenXR runtime and the session running on it.
pub struct Context {
    session: Option<Session>,
    session_exit: Option<Box<dyn FnMut()>>,
    callbacks: ContextCallbacks,
    runtime: Arc<dyn Runtime>,
    capabilities: Capabilities,
    debug_time: bool,
}

impl Context {
    /// Connects to the runtime. Failures are passed to the error handler before returning.
    pub fn new(loader: &dyn RuntimeLoader, create_info: ContextCreateInfo) -> XrResult<Self> {
        Self::create(loader, create_info).map_err(|err| {
            error::dispatch(&err, None);
            err
        })
    }

    fn create(loader: &dyn RuntimeLoader, create_info: ContextCreateInfo) -> XrResult<Self> {
        const QUERY_FAILED: &str =
            "Failed to query OpenXR runtime information. Do you have an active runtime set up?";

        let layers = loader.enumerate_api_layers().or_fail(QUERY_FAILED)?;
        let mut extensions = loader.enumerate_extensions(None).or_fail(QUERY_FAILED)?;
        for layer in &layers {
            for extension in loader.enumerate_extensions(Some(layer)).or_fail(QUERY_FAILED)? {
                if !extensions.contains(&extension) {
                    extensions.push(extension);
                }
            }
        }
        if create_info.debug {
            info!("Available OpenXR API-layers/extensions:");
            for layer in &layers {
                info!("Layer: {}", layer);
            }
            for extension in &extensions {
                info!("Extension: {}", extension);
            }
        }

        let enabled_layers = layers_to_enable(&layers, create_info.debug);
        let mut enabled_extensions = extensions_to_enable(&extensions, create_info.debug);

        let mut enabled_bindings = Vec::new();
        for candidate in &create_info.binding_candidates {
            let name = candidate.extension_name();
            if extensions.iter().any(|extension| extension == name) {
                enabled_bindings.push(*candidate);
                if !enabled_extensions.iter().any(|extension| extension == name) {
                    enabled_extensions.push(name.to_owned());
                }
            }
        }

        if create_info.debug {
            for layer in &enabled_layers {
                info!("Enabling OpenXR API-Layer: {}", layer);
            }
            for extension in &enabled_extensions {
                info!("Enabling OpenXR Extension: {}", extension);
            }
        }

        let debug_messenger = create_info.debug
            && enabled_extensions
                .iter()
                .any(|extension| extension == DEBUG_UTILS_EXTENSION);
        let runtime = loader
            .create_instance(&InstanceCreateInfo {
                application_name: &create_info.application_name,
                application_version: create_info.application_version,
                layers: &enabled_layers,
                extensions: &enabled_extensions,
                debug_messenger,
            })
            .or_fail("Failed to connect to an OpenXR runtime.")?;

        let properties = runtime.properties().clone();
        info!(
            "Connected to OpenXR runtime: {} (Version {}.{}.{})",
            properties.name,
            properties.version.major(),
            properties.version.minor(),
            properties.version.patch()
        );

        let binding_type = enabled_bindings
            .iter()
            .copied()
            .find(|binding_type| is_binding_type_usable(*binding_type, &properties.id, &create_info))
            .ok_or(XrError::NoGraphicsBinding)?;
        debug!("Using {:?} graphics binding", binding_type);

        Ok(Self {
            session: None,
            session_exit: None,
            callbacks: ContextCallbacks::default(),
            runtime,
            capabilities: Capabilities {
                runtime: properties,
                enabled_layers,
                enabled_extensions,
                binding_type,
            },
            debug_time: create_info.debug_time,
        })
    }

    pub fn set_graphics_context_bind_funcs(
        &mut self,
        bind: BindGraphicsContextFn,
        unbind: UnbindGraphicsContextFn,
    ) {
        if self.session.is_some() {
            warn!("Graphics context functions changed while a session is running");
        }
        self.callbacks.bind_graphics_context = Some(bind);
        self.callbacks.unbind_graphics_context = Some(unbind);
    }

    pub fn set_draw_view_func(&mut self, draw_view: DrawViewFn) {
        self.callbacks.draw_view = Some(draw_view);
    }

    pub fn set_passthrough_enabled_func(&mut self, enabled: Box<dyn FnMut() -> bool>) {
        self.callbacks.passthrough_enabled = Some(enabled);
    }

    pub fn set_disable_passthrough_func(&mut self, disable: Box<dyn FnMut()>) {
        self.callbacks.disable_passthrough = Some(disable);
    }

    pub fn start_session(&mut self, mut begin_info: SessionBeginInfo) -> XrResult<()> {
        if self.session.is_some() {
            return Err(self.report(XrError::Usage(
                "Invalid API usage: A session is already running.".to_owned(),
            )));
        }

        let mut session = Session::new(
            self.runtime.clone(),
            self.capabilities.clone(),
            self.debug_time,
        );
        self.session_exit = begin_info.exit.take();

        match session.start(&mut self.callbacks, &mut begin_info) {
            Ok(()) => {
                self.session = Some(session);
                Ok(())
            }
            Err(err) => {
                let err = self.report(err);
                self.session = Some(session);
                self.end_session();
                Err(err)
            }
        }
    }

    /// Destroys the session, then unbinds the host graphics context and notifies the host.
    pub fn end_session(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let host_context = session.take_host_context();
        drop(session);

        if let (Some(unbind), Some(host_context)) =
            (self.callbacks.unbind_graphics_context.as_mut(), host_context)
        {
            unbind(host_context);
        }
        if let Some(mut exit) = self.session_exit.take() {
            exit();
        }
    }

    /// Drains the runtime event queue. Returns whether any event was handled.
    pub fn poll_events(&mut self) -> XrResult<bool> {
        let mut handled = false;
        loop {
            let event = self
                .runtime
                .poll_event()
                .or_fail("Failed to poll OpenXR events.")
                .map_err(|err| self.report(err))?;

            match event {
                None => return Ok(handled),
                Some(RuntimeEvent::SessionStateChanged { session, state }) => {
                    self.handle_session_state_change(session, state)?;
                }
                Some(RuntimeEvent::InstanceLossPending) => {
                    self.end_session();
                    return Err(self.report(XrError::runtime(
                        "The OpenXR runtime is about to lose the instance.",
                        xr::Result::ERROR_INSTANCE_LOST,
                    )));
                }
                Some(RuntimeEvent::InteractionProfileChanged) => {
                    debug!("Interaction profile changed");
                }
                Some(RuntimeEvent::Other(ty)) => {
                    debug!("Unhandled OpenXR event {:?}", ty);
                }
            }
            handled = true;
        }
    }

    /// Forwards a session state change and destroys the session when it asks for it.
    pub fn handle_session_state_change(
        &mut self,
        session: xr::Session,
        state: xr::SessionState,
    ) -> XrResult<()> {
        let result = match self.session.as_mut() {
            Some(current) if current.handle() == session => current.handle_state_change(state),
            _ => {
                debug!("State change for unknown session {:?}", session);
                return Ok(());
            }
        };
        let life_expectancy = result.map_err(|err| self.report(err))?;

        if life_expectancy == LifeExpectancy::Destroy {
            self.end_session();
        }
        Ok(())
    }

    pub fn is_session_running(&self) -> bool {
        self.session.as_ref().map_or(false, Session::is_running)
    }

    /// Draws a frame when the session is running.
    pub fn draw_session_views(&mut self) -> XrResult<()> {
        let Some(session) = self.session.as_mut() else {
            return Err(self.report(XrError::Usage(
                "Invalid API usage: No session to draw.".to_owned(),
            )));
        };
        if !session.is_running() {
            return Ok(());
        }
        let result = session.draw(&mut self.callbacks);
        result.map_err(|err| self.report(err))
    }

    /// Runs `f` on the session, passing its failure to the error handler.
    pub fn with_session<T>(&mut self, f: impl FnOnce(&mut Session) -> XrResult<T>) -> XrResult<T> {
        let result = match self.session.as_mut() {
            Some(session) => f(session),
            None => Err(XrError::Usage(
                "Invalid API usage: No session running.".to_owned(),
            )),
        };
        result.map_err(|err| self.report(err))
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    pub fn is_debug_time_mode(&self) -> bool {
        self.debug_time
    }

    fn report(&self, err: XrError) -> XrError {
        error::dispatch(&err, Some(self.runtime.as_ref()));
        err
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.end_session();
    }
}

fn layers_to_enable(available: &[String], debug: bool) -> Vec<String> {
    if debug && available.iter().any(|layer| layer == VALIDATION_LAYER) {
        vec![VALIDATION_LAYER.to_owned()]
    } else {
        Vec::new()
    }
}

fn extensions_to_enable(available: &[String], debug: bool) -> Vec<String> {
    let is_available = |name: &str| available.iter().any(|extension| extension == name);

    let mut enabled = Vec::new();
    if debug && is_available(DEBUG_UTILS_EXTENSION) {
        enabled.push(DEBUG_UTILS_EXTENSION.to_owned());
    }
    enabled.extend(
        OPTIONAL_EXTENSIONS
            .iter()
            .filter(|name| is_available(name))
            .map(|name| (*name).to_owned()),
    );
    enabled
}

/// Platform support plus known broken runtime and driver combinations.
pub fn is_binding_type_usable(
    binding_type: GraphicsBindingType,
    runtime: &RuntimeId,
    create_info: &ContextCreateInfo,
) -> bool {
    if !binding_type.is_supported_on_platform() {
        return false;
    }
    if binding_type == GraphicsBindingType::OpenGl {
        if create_info.disable_opengl {
            debug!("OpenGL binding disabled by configuration");
            return false;
        }
        if *runtime == RuntimeId::Wmr && create_info.gpu_vendor == Some(GpuVendor::Amd) {
            warn!("Skipping OpenGL binding, it is known to fail with Windows Mixed Reality on AMD GPUs");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn debug_extensions_need_debug() {
        let available = names(&[DEBUG_UTILS_EXTENSION, "XR_MSFT_controller_model", "XR_FB_unknown"]);
        assert_eq!(
            extensions_to_enable(&available, false),
            names(&["XR_MSFT_controller_model"])
        );
        assert_eq!(
            extensions_to_enable(&available, true),
            names(&[DEBUG_UTILS_EXTENSION, "XR_MSFT_controller_model"])
        );
    }

    #[test]
    fn validation_layer_only_when_present() {
        assert!(layers_to_enable(&[], true).is_empty());
        assert!(layers_to_enable(&names(&[VALIDATION_LAYER]), false).is_empty());
        assert_eq!(
            layers_to_enable(&names(&[VALIDATION_LAYER]), true),
            names(&[VALIDATION_LAYER])
        );
    }

    #[test]
    fn opengl_veto() {
        let amd = ContextCreateInfo {
            gpu_vendor: Some(GpuVendor::Amd),
            ..Default::default()
        };
        let supported = GraphicsBindingType::OpenGl.is_supported_on_platform();

        assert!(!is_binding_type_usable(GraphicsBindingType::OpenGl, &RuntimeId::Wmr, &amd));
        assert_eq!(
            is_binding_type_usable(GraphicsBindingType::OpenGl, &RuntimeId::Monado, &amd),
            supported
        );

        let disabled = ContextCreateInfo {
            disable_opengl: true,
            ..Default::default()
        };
        assert!(!is_binding_type_usable(
            GraphicsBindingType::OpenGl,
            &RuntimeId::Monado,
            &disabled
        ));
    }
}
