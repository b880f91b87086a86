use std::ffi::c_void;

use crate::{ImageFormat, SwapchainFormat};

pub(crate) mod bindings {
    include!(concat!(env!("OUT_DIR"), "/gl_bindings.rs"));
}

lazy_static::lazy_static! {
    static ref GL_FORMATS: bimap::BiHashMap<ImageFormat, u32> = {
        [
            (ImageFormat::Rgba8Unorm, bindings::RGBA8),
            (ImageFormat::Rgba8UnormSrgb, bindings::SRGB8_ALPHA8),

            (ImageFormat::Rgba16Float, bindings::RGBA16F),
        ]
        .into_iter()
        .collect::<bimap::BiHashMap<_, _>>()
    };
}

pub type GlError = u32;
pub type GlResult<T> = Result<T, GlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

pub struct OpenGLInterop {
    gl: bindings::Gl,
    framebuffer: u32,
}

impl OpenGLInterop {
    /// Loads the entry points through `f`. The owning context must be current.
    pub fn new<F: Fn(&str) -> *const c_void>(f: F) -> Self {
        Self {
            gl: bindings::Gl::load_with(f),
            framebuffer: 0,
        }
    }

    pub fn version(&self) -> (u32, u32) {
        let mut major = 0;
        let mut minor = 0;
        unsafe {
            self.gl.GetIntegerv(bindings::MAJOR_VERSION, &mut major);
            self.gl.GetIntegerv(bindings::MINOR_VERSION, &mut minor);
        }
        (major.max(0) as u32, minor.max(0) as u32)
    }

    /// Copies `region` of the currently bound read framebuffer into `texture` at the same
    /// offset. The previous draw framebuffer binding is restored.
    pub fn blit_read_framebuffer(&mut self, texture: u32, region: Region) -> GlResult<()> {
        unsafe {
            if self.framebuffer == 0 {
                self.gl.GenFramebuffers(1, &mut self.framebuffer);
            }

            let mut previous = 0;
            self.gl
                .GetIntegerv(bindings::DRAW_FRAMEBUFFER_BINDING, &mut previous);

            self.gl
                .BindFramebuffer(bindings::DRAW_FRAMEBUFFER, self.framebuffer);
            self.gl.FramebufferTexture2D(
                bindings::DRAW_FRAMEBUFFER,
                bindings::COLOR_ATTACHMENT0,
                bindings::TEXTURE_2D,
                texture,
                0,
            );
            let status = self.gl.CheckFramebufferStatus(bindings::DRAW_FRAMEBUFFER);
            if status != bindings::FRAMEBUFFER_COMPLETE {
                self.gl
                    .BindFramebuffer(bindings::DRAW_FRAMEBUFFER, previous as u32);
                return Err(status);
            }

            let x1 = region.x + region.width;
            let y1 = region.y + region.height;
            self.gl.BlitFramebuffer(
                region.x,
                region.y,
                x1,
                y1,
                region.x,
                region.y,
                x1,
                y1,
                bindings::COLOR_BUFFER_BIT,
                bindings::LINEAR,
            );

            self.gl
                .BindFramebuffer(bindings::DRAW_FRAMEBUFFER, previous as u32);
        }
        self.check_error()
    }

    /// Uploads tightly packed pixels in the layout of `format` into `texture`.
    pub fn upload_pixels(
        &self,
        texture: u32,
        region: Region,
        format: SwapchainFormat,
        pixels: &[u8],
    ) -> GlResult<()> {
        let pixel_type = match format {
            SwapchainFormat::Rgba8 => bindings::UNSIGNED_BYTE,
            SwapchainFormat::Rgba16F => bindings::HALF_FLOAT,
        };

        unsafe {
            let mut previous = 0;
            self.gl
                .GetIntegerv(bindings::TEXTURE_BINDING_2D, &mut previous);

            self.gl.BindTexture(bindings::TEXTURE_2D, texture);
            self.gl.PixelStorei(bindings::UNPACK_ALIGNMENT, 1);
            self.gl.TexSubImage2D(
                bindings::TEXTURE_2D,
                0,
                region.x,
                region.y,
                region.width,
                region.height,
                bindings::RGBA,
                pixel_type,
                pixels.as_ptr() as *const c_void,
            );
            self.gl.BindTexture(bindings::TEXTURE_2D, previous as u32);
        }
        self.check_error()
    }

    pub fn finish(&self) {
        unsafe { self.gl.Finish() }
    }

    fn check_error(&self) -> GlResult<()> {
        match unsafe { self.gl.GetError() } {
            bindings::NO_ERROR => Ok(()),
            err => Err(err),
        }
    }
}

impl Drop for OpenGLInterop {
    fn drop(&mut self) {
        if self.framebuffer != 0 {
            unsafe { self.gl.DeleteFramebuffers(1, &self.framebuffer) };
        }
    }
}

impl ImageFormat {
    pub fn to_gl(&self) -> Option<u32> {
        GL_FORMATS.get_by_left(self).copied()
    }

    pub fn from_gl(gl_format: u32) -> Option<Self> {
        GL_FORMATS.get_by_right(&gl_format).copied()
    }
}
