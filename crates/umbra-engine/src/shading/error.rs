use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::{Attribute, ProgramKind};

/// Program load failure. Treated as fatal by callers.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader source {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{program} program: {stage} source has no `fn {entry}`")]
    MissingEntryPoint {
        program: ProgramKind,
        stage: &'static str,
        entry: &'static str,
    },

    #[error("{program} program failed to compile:\n{log}")]
    Compile { program: ProgramKind, log: String },

    #[error("{program} program: vertex input `{}` not found", attribute.name())]
    MissingAttribute {
        program: ProgramKind,
        attribute: Attribute,
    },
}
