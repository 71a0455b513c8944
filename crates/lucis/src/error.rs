//! Errors reported by the library.
//!
//! Everything here is fatal for the operation that returned it. Degraded but
//! usable results are reported as [QualityWarning](crate::integrators::QualityWarning)
//! instead.

use thiserror::Error;

use crate::math::bounds::Bounds;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ConfigError {
    pub fn invalid(name: &'static str, value: impl std::fmt::Display, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Name of the offending parameter
    pub fn parameter(&self) -> &'static str {
        match self {
            Self::InvalidParameter { name, .. } => name,
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum SceneError {
    #[error("a child reported malformed bounds {0:?}")]
    MalformedBounds(Bounds),
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    #[error("invalid transform: {0}")]
    InvalidTransform(&'static str),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("the integrator must be preprocessed before rendering")]
    IntegratorNotReady,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("could not start the worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("could not start the render watchdog")]
    Watchdog(#[source] std::io::Error),
}
