//! `${key}` property interpolation
//!
//! Lookup order: `project.*`/`pom.*` built-ins derived from the merged model,
//! then the model's own properties, then the ambient property set supplied by
//! the caller. Values are expanded recursively. A placeholder that is unknown,
//! refers back to itself or nests too deeply is left verbatim.

use std::collections::{BTreeMap, HashSet};

use super::descriptor::{Descriptor, EffectiveDescriptor};

/// How many property values may expand inside one another
pub const MAX_EXPANSION_DEPTH: usize = 64;

/// A flat property scope
pub type Properties = BTreeMap<String, String>;

/// Builds an ambient property set from process environment variables
/// (`env.NAME`) overlaid with explicit properties.
pub fn ambient_properties<I, K, V>(env: I, extra: &Properties) -> Properties
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut props: Properties = env
        .into_iter()
        .map(|(k, v)| (format!("env.{}", k.as_ref()), v.into()))
        .collect();
    props.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    props
}

/// Expands placeholders against one merged descriptor
pub struct Interpolator<'a> {
    builtins: Properties,
    model: &'a Properties,
    ambient: &'a Properties,
}

impl<'a> Interpolator<'a> {
    pub fn new(descriptor: &'a Descriptor, ambient: &'a Properties) -> Self {
        let mut builtins = Properties::new();
        let mut put = |field: &str, value: Option<&str>| {
            if let Some(value) = value {
                builtins.insert(format!("project.{}", field), value.to_string());
                builtins.insert(format!("pom.{}", field), value.to_string());
            }
        };

        put("groupId", descriptor.effective_group_id());
        put("artifactId", descriptor.artifact_id.as_deref());
        put("version", descriptor.effective_version());
        put("name", descriptor.name.as_deref());
        put("description", descriptor.description.as_deref());
        put("url", descriptor.url.as_deref());
        put("packaging", descriptor.packaging.as_deref());
        if let Some(parent) = &descriptor.parent {
            put("parent.groupId", parent.group_id.as_deref());
            put("parent.artifactId", parent.artifact_id.as_deref());
            put("parent.version", parent.version.as_deref());
        }

        Self {
            builtins,
            model: &descriptor.properties,
            ambient,
        }
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        self.builtins
            .get(key)
            .or_else(|| self.model.get(key))
            .or_else(|| self.ambient.get(key))
            .map(String::as_str)
    }

    /// Expands every `${key}` in `input`
    pub fn interpolate(&self, input: &str) -> String {
        let mut active = HashSet::new();
        self.expand(input, &mut active)
    }

    fn expand(&self, input: &str, active: &mut HashSet<String>) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };

            let key = &after[..end];
            let placeholder = &rest[start..start + end + 3];
            match self.lookup(key) {
                Some(_) if active.len() >= MAX_EXPANSION_DEPTH => {
                    tracing::warn!(placeholder, "Expression too deep, leaving it unexpanded");
                    out.push_str(placeholder);
                }
                Some(value) if !active.contains(key) => {
                    active.insert(key.to_string());
                    let expanded = self.expand(value, active);
                    active.remove(key);
                    out.push_str(&expanded);
                }
                _ => out.push_str(placeholder),
            }
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        out
    }

    /// Applies a single interpolation pass to every string of `descriptor`
    pub fn apply(&self, descriptor: &Descriptor) -> EffectiveDescriptor {
        EffectiveDescriptor::from_model(descriptor.map_strings(|s| self.interpolate(s)))
    }
}

/// Merged descriptor → effective descriptor in one pass
pub fn interpolate_descriptor(merged: &Descriptor, ambient: &Properties) -> EffectiveDescriptor {
    Interpolator::new(merged, ambient).apply(merged)
}
