use strix_dom::PatchError;
use thiserror::Error;

/// Developer-time compilation failure. Never recovered at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("invalid expression `{src}`: {reason}")]
    Expr { src: String, reason: String },
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),
}

/// Render-time failure umbrella. `Clone` because fiber cascades and
/// completion cells fan the same error out to several listeners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Reconcile(#[from] PatchError),
    #[error("setup of `{component}` failed: {reason}")]
    Setup { component: String, reason: String },
    #[error("component `{0}` is not defined")]
    UnknownComponent(String),
    #[error("invalid mount target: {0}")]
    Target(String),
}
