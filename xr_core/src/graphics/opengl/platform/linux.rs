use std::ffi::{c_void, CString};
use std::ptr;

use glutin_glx_sys::glx as glx_sys;
use lazy_static::lazy_static;
use openxr::sys as xr;

use crate::error::{XrError, XrResult};
use crate::types::GlPlatform;

pub type SessionBinding = xr::GraphicsBindingOpenGLXlibKHR;

struct Glx {
    inner: glx_sys::Glx,
    _lib: libloading::Library,
}

impl std::ops::Deref for Glx {
    type Target = glx_sys::Glx;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

unsafe impl Sync for Glx {}

lazy_static! {
    static ref GLX: Option<Glx> = {
        ["libGL.so.1", "libGL.so"]
            .iter()
            .find_map(|path| unsafe { libloading::Library::new(path).ok() })
            .map(|lib| {
                let glx = glx_sys::Glx::load_with(|name| unsafe {
                    CString::new(name.as_bytes())
                        .ok()
                        .and_then(|addr| lib.get(addr.as_bytes_with_nul()).ok().map(|ptr| *ptr))
                        .unwrap_or(ptr::null())
                });
                Glx {
                    inner: glx,
                    _lib: lib,
                }
            })
    };
}

fn glx() -> XrResult<&'static Glx> {
    GLX.as_ref()
        .ok_or_else(|| XrError::Requirements("Failed to load libGL for GLX".to_owned()))
}

/// The host's GLX context.
pub struct GlContext {
    x_display: *mut glx_sys::types::Display,
    visualid: u32,
    glx_fb_config: glx_sys::types::GLXFBConfig,
    glx_drawable: glx_sys::types::GLXDrawable,
    glx_context: glx_sys::types::GLXContext,
}

impl GlContext {
    pub fn from_host(platform: &GlPlatform) -> XrResult<Self> {
        match *platform {
            GlPlatform::Xlib {
                x_display,
                visualid,
                glx_fb_config,
                glx_drawable,
                glx_context,
            } => {
                if x_display.is_null() || glx_context.is_null() {
                    return Err(XrError::Requirements(
                        "The host did not provide an X display and GLX context".to_owned(),
                    ));
                }
                Ok(Self {
                    x_display: x_display as _,
                    visualid,
                    glx_fb_config: glx_fb_config as _,
                    glx_drawable: glx_drawable as _,
                    glx_context: glx_context as _,
                })
            }
            GlPlatform::Win32 { .. } => Err(XrError::Requirements(
                "A WGL context cannot be used on this platform".to_owned(),
            )),
        }
    }

    pub fn make_current(&self) -> XrResult<()> {
        let glx = glx()?;
        if unsafe { glx.MakeCurrent(self.x_display, self.glx_drawable, self.glx_context) } != 0 {
            Ok(())
        } else {
            Err(XrError::Graphics(
                "glXMakeCurrent failed for the host context".to_owned(),
            ))
        }
    }

    pub fn get_proc_address(&self, name: &str) -> *const c_void {
        let (Ok(glx), Ok(addr)) = (glx(), CString::new(name.as_bytes())) else {
            return ptr::null();
        };
        unsafe { glx.GetProcAddress(addr.as_ptr() as _) as _ }
    }

    pub fn session_binding(&self) -> SessionBinding {
        SessionBinding {
            ty: SessionBinding::TYPE,
            next: ptr::null(),
            x_display: self.x_display as _,
            visualid: self.visualid,
            glx_fb_config: self.glx_fb_config as _,
            glx_drawable: self.glx_drawable as _,
            glx_context: self.glx_context as _,
        }
    }
}
