use std::sync::OnceLock;

use openxr::sys as xr;
use thiserror::Error;

use crate::runtime::Runtime;

pub type XrResult<T> = Result<T, XrError>;

#[derive(Debug, Error)]
pub enum XrError {
    /// A runtime call failed. Fatal unless the caller explicitly tolerates `result`.
    #[error("{message}")]
    Runtime { message: String, result: xr::Result },
    /// The host used the API out of order or with inconsistent arguments.
    #[error("{0}")]
    Usage(String),
    /// The host graphics context does not satisfy the runtime's requirements.
    #[error("{0}")]
    Requirements(String),
    #[error("No usable graphics binding available. Make sure a supported XR runtime is installed and the graphics backend is supported by it.")]
    NoGraphicsBinding,
    #[error("Invalid controller model: {0}")]
    InvalidModel(String),
    #[error("Failed to parse glTF: {0}")]
    Gltf(String),
    #[error("{0}")]
    Graphics(String),
    #[error("Failed to load the OpenXR loader: {0}")]
    Loader(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl XrError {
    pub fn runtime(message: impl Into<String>, result: xr::Result) -> Self {
        XrError::Runtime {
            message: message.into(),
            result,
        }
    }

    pub fn result(&self) -> Option<xr::Result> {
        match self {
            XrError::Runtime { result, .. } => Some(*result),
            _ => None,
        }
    }

    pub fn is_tolerated_space_error(&self) -> bool {
        self.result() == Some(xr::Result::ERROR_REFERENCE_SPACE_UNSUPPORTED)
    }
}

pub trait ResultExt<T> {
    fn or_fail(self, message: &str) -> XrResult<T>;
}

impl<T> ResultExt<T> for Result<T, xr::Result> {
    fn or_fail(self, message: &str) -> XrResult<T> {
        self.map_err(|result| XrError::runtime(message, result))
    }
}

/// What the host's error handler receives.
#[derive(Debug, Clone, Copy)]
pub struct ErrorInfo<'a> {
    pub user_message: &'a str,
    pub result: Option<xr::Result>,
    pub result_string: Option<&'a str>,
}

type ErrorHandler = Box<dyn Fn(&ErrorInfo) + Send + Sync>;

static ERROR_HANDLER: OnceLock<ErrorHandler> = OnceLock::new();

/// Installs the process-wide error handler. Returns `false` when one is already set.
pub fn set_error_handler(handler: impl Fn(&ErrorInfo) + Send + Sync + 'static) -> bool {
    ERROR_HANDLER.set(Box::new(handler)).is_ok()
}

pub(crate) fn dispatch(error: &XrError, runtime: Option<&dyn Runtime>) {
    let user_message = error.to_string();
    let result = error.result();
    let result_string = result.map(|result| match runtime {
        Some(runtime) => runtime.result_to_string(result),
        None => result.to_string(),
    });

    match (&result_string, result) {
        (Some(name), Some(result)) => log::error!(
            "{}\nOpenXR error value: {} ({})",
            user_message,
            result.into_raw(),
            name
        ),
        _ => log::error!("{}", user_message),
    }

    if let Some(handler) = ERROR_HANDLER.get() {
        handler(&ErrorInfo {
            user_message: &user_message,
            result,
            result_string: result_string.as_deref(),
        });
    }
}
