use std::ffi::{c_void, CString, OsStr};
use std::os::windows::prelude::OsStrExt;
use std::ptr;

use openxr::sys::{self as xr, platform::*};
use winapi::shared::minwindef::HMODULE;

use crate::error::{XrError, XrResult};
use crate::types::GlPlatform;

pub type SessionBinding = xr::GraphicsBindingOpenGLWin32KHR;

/// The host's WGL context.
#[derive(Debug)]
pub struct GlContext {
    h_dc: HDC,
    h_glrc: HGLRC,
    gl_library: HMODULE,
}

impl GlContext {
    pub fn from_host(platform: &GlPlatform) -> XrResult<Self> {
        match *platform {
            GlPlatform::Win32 { h_dc, h_glrc } => unsafe { Self::load(h_dc as _, h_glrc as _) },
            GlPlatform::Xlib { .. } => Err(XrError::Requirements(
                "A GLX context cannot be used on this platform".to_owned(),
            )),
        }
    }

    unsafe fn load(h_dc: HDC, h_glrc: HGLRC) -> XrResult<Self> {
        use winapi::um::libloaderapi::*;

        let name = OsStr::new("opengl32.dll")
            .encode_wide()
            .chain(Some(0))
            .collect::<Vec<_>>();

        let gl_library = LoadLibraryW(name.as_ptr());

        if gl_library.is_null() {
            return Err(XrError::Requirements(
                "Failed to load opengl32.dll".to_owned(),
            ));
        }

        Ok(Self {
            h_dc,
            h_glrc,
            gl_library,
        })
    }

    pub fn make_current(&self) -> XrResult<()> {
        unsafe {
            if glutin_wgl_sys::wgl::MakeCurrent(self.h_dc as _, self.h_glrc as _) != 0 {
                Ok(())
            } else {
                Err(XrError::Graphics(format!(
                    "wglMakeCurrent failed for the host context ({})",
                    winapi::um::errhandlingapi::GetLastError()
                )))
            }
        }
    }

    pub fn get_proc_address(&self, name: &str) -> *const c_void {
        let Ok(addr) = CString::new(name.as_bytes()) else {
            return ptr::null();
        };
        unsafe {
            let p = glutin_wgl_sys::wgl::GetProcAddress(addr.as_ptr()) as *const c_void;
            if !p.is_null() {
                p
            } else {
                winapi::um::libloaderapi::GetProcAddress(self.gl_library, addr.as_ptr()) as *const _
            }
        }
    }

    pub fn session_binding(&self) -> SessionBinding {
        SessionBinding {
            ty: SessionBinding::TYPE,
            next: ptr::null(),
            h_dc: self.h_dc,
            h_glrc: self.h_glrc,
        }
    }
}

impl Drop for GlContext {
    fn drop(&mut self) {
        unsafe { winapi::um::libloaderapi::FreeLibrary(self.gl_library) };
    }
}
