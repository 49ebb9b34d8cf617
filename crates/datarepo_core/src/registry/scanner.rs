//! Path-template scanner for filesystem registries.
//!
//! A template uses `%(name)<fmt>` substitution fields, e.g.
//! `raw/raw_v%(visit)d_f%(filter)s.fits.gz`. The scanner compiles the
//! template into an anchored regex with typed captures and walks a root for
//! matching relative paths.

use crate::error::{RepoError, RepoResult};
use crate::model::{DataValue, KeyKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// %(name) plus optional width/precision and a conversion letter.
static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%\((\w+)\)[0-9.]*([dioueEfFgGcrs])").expect("field pattern is valid")
});

#[derive(Debug, Clone)]
struct TemplateField {
    name: String,
    kind: KeyKind,
}

/// Compiled path template.
#[derive(Debug)]
pub struct PathTemplate {
    fields: Vec<TemplateField>,
    matcher: Regex,
}

impl PathTemplate {
    pub fn parse(template: &str) -> RepoResult<Self> {
        // A trailing bracketed suffix addresses a section inside the file,
        // not the filename; drop it before matching paths.
        let template = if template.ends_with(']') {
            match template.rfind('[') {
                Some(index) => &template[..index],
                None => template,
            }
        } else {
            template
        };

        let mut fields: Vec<TemplateField> = Vec::new();
        let mut pattern = String::from("^");
        let mut last = 0;
        for captures in FIELD_RE.captures_iter(template) {
            let whole = captures.get(0).ok_or_else(|| {
                RepoError::Configuration(format!("malformed template `{template}`"))
            })?;
            let mut name = captures[1].to_string();
            // Repeat appearances get a disambiguating suffix; they are
            // expected to capture identical values.
            if fields.iter().any(|field| field.name == name) {
                name = format!("{name}_{}", fields.len());
            }
            let kind = match &captures[2] {
                "c" | "r" | "s" => KeyKind::Text,
                "e" | "E" | "f" | "F" | "g" | "G" => KeyKind::Float,
                _ => KeyKind::Int,
            };

            pattern.push_str(&regex::escape(&template[last..whole.start()]));
            match kind {
                KeyKind::Text => pattern.push_str(&format!("(?P<{name}>[^/]+)")),
                KeyKind::Float => pattern.push_str(&format!(r"(?P<{name}>[\d.eE+-]+)")),
                KeyKind::Int => pattern.push_str(&format!(r"(?P<{name}>[+-]?\d+)")),
            }
            fields.push(TemplateField { name, kind });
            last = whole.end();
        }
        pattern.push_str(&regex::escape(&template[last..]));
        pattern.push('$');

        let matcher = Regex::new(&pattern).map_err(|err| {
            RepoError::Configuration(format!("template `{template}` compiles to bad pattern: {err}"))
        })?;
        Ok(Self { fields, matcher })
    }

    /// Field names in template order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    /// Typed captures for one relative path, or `None` when it does not
    /// match the template.
    pub fn captures(&self, relative: &str) -> Option<BTreeMap<String, DataValue>> {
        let captures = self.matcher.captures(relative)?;
        let mut found = BTreeMap::new();
        for field in &self.fields {
            let raw = captures.name(&field.name)?.as_str();
            let value = match field.kind {
                KeyKind::Int => DataValue::Int(raw.parse().ok()?),
                KeyKind::Float => DataValue::Float(raw.parse().ok()?),
                KeyKind::Text => DataValue::Text(raw.to_string()),
            };
            found.insert(field.name.clone(), value);
        }
        Some(found)
    }

    /// Walks `root` and returns relative path -> typed captures for every
    /// file matching the template.
    pub fn scan(&self, root: &Path) -> RepoResult<BTreeMap<String, BTreeMap<String, DataValue>>> {
        let mut matches = BTreeMap::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let relative = match path.strip_prefix(root) {
                    Ok(relative) => relative.to_string_lossy().into_owned(),
                    Err(_) => continue,
                };
                if let Some(found) = self.captures(&relative) {
                    matches.insert(relative, found);
                }
            }
        }
        Ok(matches)
    }
}
