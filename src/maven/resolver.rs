//! Effective descriptor resolution
//!
//! [`resolve_effective`] loads a descriptor, walks its parent chain through
//! the caller's [`DescriptorSource`], merges the layers (child wins),
//! interpolates once against the merged scope, then folds in BOM imports.
//! There is no resolver object: every call takes the source and the ambient
//! properties explicitly.

use std::collections::HashSet;
use thiserror::Error;

use crate::domain::{
    interpolate_descriptor, ComponentId, DependencyRef, Descriptor, EffectiveDescriptor,
    Interpolator, ParentRef, Properties,
};

use super::pom::{parse_pom, PomError};
use super::source::{DescriptorFile, DescriptorSource, FetchError};

/// Referrer named in errors for descriptors requested by the graph itself
pub const GRAPH_REFERRER: &str = "the resolution graph";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Could not fetch descriptor {id} referenced from {referrer}")]
    Fetch {
        id: ComponentId,
        referrer: String,
        #[source]
        source: FetchError,
    },

    #[error("Could not parse descriptor {origin}")]
    Parse {
        origin: String,
        #[source]
        source: PomError,
    },

    #[error("Parents of {origin} form a cycle: {chain}")]
    ParentCycle { origin: String, chain: String },
}

/// Resolves the effective form of `file`
pub fn resolve_effective<S>(
    file: &DescriptorFile,
    source: &S,
    ambient: &Properties,
) -> Result<EffectiveDescriptor, ResolveError>
where
    S: DescriptorSource + ?Sized,
{
    let mut active = Vec::new();
    resolve_in(file, source, ambient, &mut active)
}

/// Fetches the descriptor of `id` and resolves it
pub fn resolve_component<S>(
    id: &ComponentId,
    source: &S,
    ambient: &Properties,
) -> Result<EffectiveDescriptor, ResolveError>
where
    S: DescriptorSource + ?Sized,
{
    let file = source.fetch(id).map_err(|e| ResolveError::Fetch {
        id: id.clone(),
        referrer: GRAPH_REFERRER.to_string(),
        source: e,
    })?;
    resolve_effective(&file, source, ambient)
}

/// `active` holds the identities currently being resolved, for import cycles
fn resolve_in<S>(
    file: &DescriptorFile,
    source: &S,
    ambient: &Properties,
    active: &mut Vec<ComponentId>,
) -> Result<EffectiveDescriptor, ResolveError>
where
    S: DescriptorSource + ?Sized,
{
    let raw = parse(file)?;
    let merged = merge_parent_chain(raw, file.origin(), source, ambient)?;
    let effective = interpolate_descriptor(&merged, ambient);

    let id = effective.component_id();
    if let Some(id) = &id {
        active.push(id.clone());
    }
    let result = import_boms(effective, file.origin(), source, ambient, active);
    if id.is_some() {
        active.pop();
    }
    result
}

fn parse(file: &DescriptorFile) -> Result<Descriptor, ResolveError> {
    parse_pom(file.contents()).map_err(|source| ResolveError::Parse {
        origin: file.origin().to_string(),
        source,
    })
}

/// Collects self → parent → grandparent … then folds from the top down
fn merge_parent_chain<S>(
    raw: Descriptor,
    origin: &str,
    source: &S,
    ambient: &Properties,
) -> Result<Descriptor, ResolveError>
where
    S: DescriptorSource + ?Sized,
{
    let mut seen: Vec<ComponentId> = raw.component_id().into_iter().collect();
    let mut layers = vec![raw];
    let mut referrer = origin.to_string();

    loop {
        let Some(current) = layers.last_mut() else {
            break;
        };
        let Some(parent_ref) = current.parent.as_ref() else {
            break;
        };

        // Parent coordinates may use the child's own properties (e.g. ${revision})
        let parent_ref = interpolate_parent(parent_ref, current, ambient);
        current.parent = Some(parent_ref.clone());

        let Some(parent_id) = parent_ref.component_id() else {
            tracing::warn!(descriptor = %referrer, "Ignoring parent reference with incomplete coordinates");
            break;
        };

        if seen.contains(&parent_id) {
            let chain = seen
                .iter()
                .chain(std::iter::once(&parent_id))
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ResolveError::ParentCycle {
                origin: origin.to_string(),
                chain,
            });
        }

        let file = source.fetch(&parent_id).map_err(|e| ResolveError::Fetch {
            id: parent_id.clone(),
            referrer: referrer.clone(),
            source: e,
        })?;
        tracing::debug!(parent = %parent_id, child = %referrer, "Fetched parent descriptor");

        layers.push(parse(&file)?);
        referrer = file.origin().to_string();
        seen.push(parent_id);
    }

    let mut top_down = layers.into_iter().rev();
    let mut merged = top_down.next().unwrap_or_default();
    for child in top_down {
        merged = child.inherit(&merged);
    }
    Ok(merged)
}

fn interpolate_parent(parent: &ParentRef, child: &Descriptor, ambient: &Properties) -> ParentRef {
    let interp = Interpolator::new(child, ambient);
    let expand = |v: &Option<String>| v.as_deref().map(|s| interp.interpolate(s));
    ParentRef {
        group_id: expand(&parent.group_id),
        artifact_id: expand(&parent.artifact_id),
        version: expand(&parent.version),
        relative_path: parent.relative_path.clone(),
    }
}

/// Replaces `scope=import` entries with the managed dependencies they import
fn import_boms<S>(
    effective: EffectiveDescriptor,
    origin: &str,
    source: &S,
    ambient: &Properties,
    active: &mut Vec<ComponentId>,
) -> Result<EffectiveDescriptor, ResolveError>
where
    S: DescriptorSource + ?Sized,
{
    if !effective
        .model()
        .dependency_management
        .iter()
        .any(DependencyRef::is_import)
    {
        return Ok(effective);
    }

    let mut model = effective.into_model();
    let (imports, mut managed): (Vec<_>, Vec<_>) = std::mem::take(&mut model.dependency_management)
        .into_iter()
        .partition(DependencyRef::is_import);
    let mut keys: HashSet<_> = managed.iter().map(DependencyRef::key).collect();

    for import in imports {
        let Some(id) = import.component_id() else {
            tracing::warn!(descriptor = %origin, "Ignoring BOM import with incomplete coordinates");
            continue;
        };
        if active.contains(&id) {
            tracing::warn!(descriptor = %origin, import = %id, "Skipping cyclic BOM import");
            continue;
        }

        let file = source.fetch(&id).map_err(|e| ResolveError::Fetch {
            id: id.clone(),
            referrer: origin.to_string(),
            source: e,
        })?;
        let imported = resolve_in(&file, source, ambient, active)?;

        for dep in imported.into_model().dependency_management {
            if keys.insert(dep.key()) {
                managed.push(dep);
            }
        }
    }

    model.dependency_management = managed;
    Ok(EffectiveDescriptor::from_model(model))
}
