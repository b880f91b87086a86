#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
pub use linux::{GlContext, SessionBinding};
#[cfg(target_os = "windows")]
pub use windows::{GlContext, SessionBinding};
