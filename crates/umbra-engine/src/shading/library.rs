use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ProgramKind, ShaderError};

/// Uniform block and bind group declarations shared by every program.
///
/// Always the built-in copy: its layout must match [`super::DrawUniforms`].
pub const PRELUDE: &str = include_str!("shaders/common.wgsl");

/// Where program sources come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ShaderLibrary {
    /// Sources compiled into the binary.
    #[default]
    Embedded,
    /// `<dir>/<name>_vertex.wgsl` and `<dir>/<name>_fragment.wgsl`.
    Directory(PathBuf),
}

impl ShaderLibrary {
    pub const ENV_VAR: &'static str = "UMBRA_SHADER_DIR";

    /// `Directory` when `UMBRA_SHADER_DIR` is set, otherwise `Embedded`.
    pub fn from_env() -> Self {
        match std::env::var_os(Self::ENV_VAR) {
            Some(dir) if !dir.is_empty() => Self::Directory(PathBuf::from(dir)),
            _ => Self::Embedded,
        }
    }

    /// Reads the vertex/fragment pair for `kind`.
    pub fn sources(&self, kind: ProgramKind) -> Result<ProgramSource, ShaderError> {
        match self {
            Self::Embedded => {
                let (vertex, fragment) = embedded(kind);
                Ok(ProgramSource::new(vertex, fragment))
            }
            Self::Directory(dir) => {
                let vertex = read(&dir.join(format!("{}_vertex.wgsl", kind.name())))?;
                let fragment = read(&dir.join(format!("{}_fragment.wgsl", kind.name())))?;
                Ok(ProgramSource::new(&vertex, &fragment))
            }
        }
    }
}

/// Vertex + fragment source of one program.
#[derive(Debug, Clone)]
pub struct ProgramSource {
    pub vertex: Arc<str>,
    pub fragment: Arc<str>,
}

impl ProgramSource {
    pub fn new(vertex: &str, fragment: &str) -> Self {
        Self {
            vertex: Arc::from(vertex),
            fragment: Arc::from(fragment),
        }
    }

    /// Single WGSL module: prelude, vertex stage, fragment stage.
    pub fn module_source(&self) -> String {
        let mut src = String::with_capacity(PRELUDE.len() + self.vertex.len() + self.fragment.len() + 2);
        src.push_str(PRELUDE);
        src.push('\n');
        src.push_str(&self.vertex);
        src.push('\n');
        src.push_str(&self.fragment);
        src
    }
}

fn read(path: &Path) -> Result<String, ShaderError> {
    log::debug!("reading shader source {}", path.display());
    std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn embedded(kind: ProgramKind) -> (&'static str, &'static str) {
    match kind {
        ProgramKind::Geometry => (
            include_str!("shaders/geometry_vertex.wgsl"),
            include_str!("shaders/geometry_fragment.wgsl"),
        ),
        ProgramKind::Shadow => (
            include_str!("shaders/shadow_vertex.wgsl"),
            include_str!("shaders/shadow_fragment.wgsl"),
        ),
        ProgramKind::Light => (
            include_str!("shaders/light_vertex.wgsl"),
            include_str!("shaders/light_fragment.wgsl"),
        ),
        ProgramKind::Ui => (
            include_str!("shaders/default_vertex.wgsl"),
            include_str!("shaders/default_fragment.wgsl"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_sources_exist_for_every_program() {
        for kind in ProgramKind::ALL {
            let src = ShaderLibrary::Embedded.sources(kind).unwrap();
            assert!(src.vertex.contains("fn vs_main"), "{kind}");
            assert!(src.fragment.contains("fn fs_main"), "{kind}");
        }
    }

    #[test]
    fn module_source_starts_with_prelude() {
        let src = ShaderLibrary::Embedded.sources(ProgramKind::Light).unwrap();
        assert!(src.module_source().starts_with(PRELUDE));
    }

    #[test]
    fn missing_directory_is_io_error() {
        let lib = ShaderLibrary::Directory(PathBuf::from("/nonexistent/umbra/shaders"));
        let err = lib.sources(ProgramKind::Geometry).unwrap_err();
        assert!(matches!(err, ShaderError::Io { .. }));
    }

    #[test]
    fn directory_sources_are_read_by_name() {
        let dir = std::env::temp_dir().join(format!("umbra-shaders-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("shadow_vertex.wgsl"), "fn vs_main() {}").unwrap();
        std::fs::write(dir.join("shadow_fragment.wgsl"), "fn fs_main() {}").unwrap();

        let src = ShaderLibrary::Directory(dir.clone()).sources(ProgramKind::Shadow).unwrap();
        assert_eq!(&*src.vertex, "fn vs_main() {}");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
