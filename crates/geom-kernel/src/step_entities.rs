//! Entity index over the DATA section of an ISO-10303-21 document.
//!
//! Face surface types are read back by their ISO 10303-42 entity names
//! (`PLANE`, `CYLINDRICAL_SURFACE`, ...), which the exchange format fixes.

use std::collections::HashMap;

use crate::types::SurfaceKind;

/// One `#id = ...;` instance.
#[derive(Debug, Clone, Default)]
struct Instance {
    /// Entity names, uppercase. Complex instances carry several.
    names: Vec<String>,
    /// Parameter text of a simple instance, without the outer parentheses.
    params: String,
}

impl Instance {
    fn is(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Instances of a STEP document keyed by entity id.
#[derive(Debug, Default)]
pub(crate) struct EntityIndex {
    instances: HashMap<u64, Instance>,
}

impl EntityIndex {
    /// Index every instance of the DATA section. Malformed statements are skipped.
    pub fn parse(text: &str) -> Self {
        let Some(start) = text.find("DATA;") else {
            return Self::default();
        };
        let instances = statements(&text[start + "DATA;".len()..])
            .iter()
            .filter_map(|stmt| parse_instance(stmt))
            .collect();
        Self { instances }
    }

    /// Surface kind of every face of shell `#shell`, in the shell's face order.
    pub fn face_kinds(&self, shell: u64) -> Option<Vec<SurfaceKind>> {
        let inst = self.instances.get(&shell)?;
        if !(inst.is("CLOSED_SHELL") || inst.is("OPEN_SHELL")) {
            return None;
        }
        let faces = split_top_level(&inst.params).get(1).map(|f| refs(f))?;
        Some(faces.into_iter().map(|id| self.face_kind(id)).collect())
    }

    fn face_kind(&self, face: u64) -> SurfaceKind {
        let Some(inst) = self.instances.get(&face) else {
            return SurfaceKind::Other;
        };
        if inst.is("ORIENTED_FACE") {
            // Oriented faces wrap exactly one face; no chains.
            return match third_ref(inst).and_then(|id| self.instances.get(&id)) {
                Some(target) => self.face_surface(target),
                None => SurfaceKind::Other,
            };
        }
        self.face_surface(inst)
    }

    fn face_surface(&self, inst: &Instance) -> SurfaceKind {
        if !(inst.is("ADVANCED_FACE") || inst.is("FACE_SURFACE")) {
            return SurfaceKind::Other;
        }
        third_ref(inst).map_or(SurfaceKind::Other, |id| self.surface_kind(id))
    }

    fn surface_kind(&self, surface: u64) -> SurfaceKind {
        self.instances
            .get(&surface)
            .map_or(SurfaceKind::Other, |inst| SurfaceKind::from_step_entity(&inst.names))
    }
}

/// Face instances carry their face or surface reference as the third argument.
fn third_ref(inst: &Instance) -> Option<u64> {
    split_top_level(&inst.params)
        .get(2)
        .and_then(|arg| refs(arg).first().copied())
}

// ── Lexing ──────────────────────────────────────────────────────────────

/// Split the section into `;`-terminated statements, honoring strings and comments.
fn statements(data: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut chars = data.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            current.push(c);
            if c == '\'' {
                in_string = false;
            }
            continue;
        }
        match c {
            '\'' => {
                in_string = true;
                current.push(c);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            ';' => {
                let stmt = current.trim();
                if stmt == "ENDSEC" {
                    break;
                }
                if !stmt.is_empty() {
                    out.push(stmt.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    out
}

fn parse_instance(stmt: &str) -> Option<(u64, Instance)> {
    let (id, body) = stmt.strip_prefix('#')?.split_once('=')?;
    let id = id.trim().parse().ok()?;
    let body = body.trim();

    let inst = if body.starts_with('(') {
        Instance {
            names: complex_names(body),
            params: String::new(),
        }
    } else {
        let open = body.find('(')?;
        let close = body.rfind(')')?;
        Instance {
            names: vec![body[..open].trim().to_ascii_uppercase()],
            params: body.get(open + 1..close)?.to_string(),
        }
    };
    Some((id, inst))
}

/// Names of the partial records of a complex instance `( A(..) B(..) )`.
fn complex_names(body: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut word = String::new();

    for c in body.chars() {
        if in_string {
            in_string = c != '\'';
            continue;
        }
        match c {
            '\'' => in_string = true,
            '(' => {
                if depth == 1 && !word.is_empty() {
                    names.push(word.to_ascii_uppercase());
                }
                word.clear();
                depth += 1;
            }
            ')' => depth = depth.saturating_sub(1),
            c if depth == 1 && (c.is_ascii_alphanumeric() || c == '_') => word.push(c),
            _ => word.clear(),
        }
    }
    names
}

/// Split parameters at commas that are not nested in lists or strings.
fn split_top_level(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start = 0;

    for (i, c) in params.char_indices() {
        if in_string {
            in_string = c != '\'';
            continue;
        }
        match c {
            '\'' => in_string = true,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(params[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(params[start..].trim());
    parts
}

/// Entity references (`#12`) in order of appearance, outside strings.
fn refs(text: &str) -> Vec<u64> {
    let mut out = Vec::new();
    let mut in_string = false;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if in_string {
            in_string = c != '\'';
            continue;
        }
        match c {
            '\'' => in_string = true,
            '#' => {
                let digits_start = i + 1;
                let mut end = digits_start;
                while let Some(&(j, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    end = j + 1;
                    chars.next();
                }
                if let Ok(id) = text[digits_start..end].parse() {
                    out.push(id);
                }
            }
            _ => {}
        }
    }
    out
}
