use super::{Attribute, ProgramDesc, ProgramKind, ProgramSource, ShaderError, Uniform};

/// Uniforms and vertex inputs a loaded program actually reads.
///
/// Resolved once at load; never looked up by name afterwards.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ProgramLayout {
    kind: ProgramKind,
    uniforms: u32,
    attributes: [Option<u32>; 3],
}

impl ProgramLayout {
    /// Checks entry points and resolves every requested uniform and attribute.
    ///
    /// A requested uniform the source never reads is logged and left
    /// unresolved; writes to it are ignored. A requested attribute that is not
    /// a vertex input is an error.
    pub fn resolve(desc: &ProgramDesc, source: &ProgramSource) -> Result<Self, ShaderError> {
        let program = desc.kind;
        let (vertex, fragment) = (strip_comments(&source.vertex), strip_comments(&source.fragment));
        if !vertex.contains("fn vs_main") {
            return Err(ShaderError::MissingEntryPoint { program, stage: "vertex", entry: "vs_main" });
        }
        if !fragment.contains("fn fs_main") {
            return Err(ShaderError::MissingEntryPoint { program, stage: "fragment", entry: "fs_main" });
        }

        let mut uniforms = 0;
        for &u in desc.uniforms {
            if reads_field(&vertex, u.name()) || reads_field(&fragment, u.name()) {
                log::debug!("{program}: uniform {} resolved", u.name());
                uniforms |= u.bit();
            } else {
                log::warn!("{program}: uniform {} is not read by the program", u.name());
            }
        }

        let mut attributes = [None; 3];
        for &a in desc.attributes {
            let location = input_location(&vertex, a.name())
                .ok_or(ShaderError::MissingAttribute { program, attribute: a })?;
            attributes[a.index()] = Some(location);
        }

        Ok(Self { kind: program, uniforms, attributes })
    }

    #[inline]
    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    #[inline]
    pub fn has(&self, uniform: Uniform) -> bool {
        self.uniforms & uniform.bit() != 0
    }

    /// Shader location of a vertex input, if the program takes it.
    #[inline]
    pub fn attribute(&self, attribute: Attribute) -> Option<u32> {
        self.attributes[attribute.index()]
    }

    /// Vertex inputs in stream order with their shader locations.
    pub fn attributes(&self) -> impl Iterator<Item = (Attribute, u32)> + '_ {
        Attribute::ALL
            .into_iter()
            .filter_map(|a| self.attribute(a).map(|loc| (a, loc)))
    }
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// WGSL source with line and (nested) block comments blanked out.
fn strip_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut depth = 0u32;
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('*')) => {
                chars.next();
                depth += 1;
                out.push(' ');
            }
            ('*', Some('/')) if depth > 0 => {
                chars.next();
                depth -= 1;
            }
            ('/', Some('/')) if depth == 0 => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('\n', _) => out.push('\n'),
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }
    out
}

/// `u.<field>` with identifier boundaries on both sides.
fn reads_field(src: &str, field: &str) -> bool {
    src.match_indices("u.").any(|(at, _)| {
        let before_ok = src[..at].chars().next_back().is_none_or(|c| !is_ident(c));
        let rest = &src[at + 2..];
        before_ok
            && rest.starts_with(field)
            && rest[field.len()..].chars().next().is_none_or(|c| !is_ident(c))
    })
}

/// Location `N` of a vertex input declared as `@location(N) <name>`.
fn input_location(src: &str, name: &str) -> Option<u32> {
    src.match_indices("@location(").find_map(|(at, tag)| {
        let rest = &src[at + tag.len()..];
        let close = rest.find(')')?;
        let location = rest[..close].trim().parse().ok()?;
        let ident: String = rest[close + 1..]
            .trim_start()
            .chars()
            .take_while(|c| is_ident(*c))
            .collect();
        (ident == name).then_some(location)
    })
}
