//! Registers and `%` macro expansion for command templates.

use std::collections::HashMap;
use std::path::Path;

use dirpilot_ops::normalize;

use crate::view::FileView;

/// Register that swallows everything written to it.
pub const BLACKHOLE_REGISTER: char = '_';

/// Named lists of stored paths.
#[derive(Debug, Clone, Default)]
pub struct Registers {
    contents: HashMap<char, Vec<String>>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid_name(name: char) -> bool {
        name.is_ascii_alphanumeric() || name == '"' || name == BLACKHOLE_REGISTER
    }

    /// Append a path to register `name`.
    ///
    /// Returns `false` for an unknown register name. Appending an already
    /// stored value is a no-op.
    pub fn append(&mut self, name: char, value: impl Into<String>) -> bool {
        if !Self::is_valid_name(name) {
            return false;
        }
        if name == BLACKHOLE_REGISTER {
            return true;
        }
        let value = value.into();
        let slot = self.contents.entry(name).or_default();
        if !slot.contains(&value) {
            slot.push(value);
        }
        true
    }

    pub fn get(&self, name: char) -> &[String] {
        self.contents.get(&name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear(&mut self, name: char) {
        self.contents.remove(&name);
    }

    pub fn clear_all(&mut self) {
        self.contents.clear();
    }
}

/// Expand `%` macros in `template`.
///
/// - `%d` / `%D`: anchor directory of the current / other view
/// - `%r<x>`: contents of register `x`, space separated
/// - `%r<x>:p`: the same, each made absolute against the current anchor
/// - `%%`: a literal `%`
///
/// Anything else is copied through unchanged.
pub fn expand_macros(
    template: &str,
    current: &FileView,
    other: &FileView,
    registers: &Registers,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('d') => out.push_str(&current.anchor().to_string_lossy()),
            Some('D') => out.push_str(&other.anchor().to_string_lossy()),
            Some('%') => out.push('%'),
            Some('r') => {
                let Some(name) = chars.next() else {
                    out.push_str("%r");
                    break;
                };
                let full_paths = {
                    let mut lookahead = chars.clone();
                    if lookahead.next() == Some(':') && lookahead.next() == Some('p') {
                        chars.next();
                        chars.next();
                        true
                    } else {
                        false
                    }
                };
                let values = registers.get(name).iter().map(|value| {
                    if full_paths {
                        absolute_from(current.anchor(), value)
                    } else {
                        value.clone()
                    }
                });
                out.push_str(&values.collect::<Vec<_>>().join(" "));
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

fn absolute_from(anchor: &Path, value: &str) -> String {
    normalize(&anchor.join(value)).to_string_lossy().into_owned()
}
