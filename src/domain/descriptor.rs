//! Build descriptor (POM) model
//!
//! A [`Descriptor`] is one parsed descriptor file: only what that file
//! states. Inheritance is an explicit layered merge, [`Descriptor::inherit`],
//! which returns a new record with the child layer winning per field and
//! keyed collections concatenated child-first.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::id::ComponentId;

/// Reference to a parent descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub relative_path: Option<String>,
}

impl ParentRef {
    /// Returns the parent's identity, or None if any coordinate is missing
    pub fn component_id(&self) -> Option<ComponentId> {
        match (&self.group_id, &self.artifact_id, &self.version) {
            (Some(g), Some(a), Some(v)) if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                Some(ComponentId::new(g.as_str(), a.as_str(), v.as_str()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub name: Option<String>,
    pub url: Option<String>,
    pub distribution: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Developer {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scm {
    pub url: Option<String>,
    pub connection: Option<String>,
    pub tag: Option<String>,
}

/// A `<dependency>` entry, either managed or direct
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRef {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "type")]
    pub dep_type: Option<String>,
    pub classifier: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<String>,
}

impl DependencyRef {
    /// Management key: (groupId, artifactId, type, classifier)
    pub fn key(&self) -> (String, String, String, String) {
        (
            self.group_id.clone().unwrap_or_default(),
            self.artifact_id.clone().unwrap_or_default(),
            self.dep_type.clone().unwrap_or_else(|| "jar".to_string()),
            self.classifier.clone().unwrap_or_default(),
        )
    }

    /// Returns true for a `scope=import`, `type=pom` BOM import
    pub fn is_import(&self) -> bool {
        self.scope.as_deref() == Some("import") && self.dep_type.as_deref() == Some("pom")
    }

    pub fn component_id(&self) -> Option<ComponentId> {
        match (&self.group_id, &self.artifact_id, &self.version) {
            (Some(g), Some(a), Some(v)) if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                Some(ComponentId::new(g.as_str(), a.as_str(), v.as_str()))
            }
            _ => None,
        }
    }
}

/// One build descriptor, either raw (as parsed) or merged with its ancestors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub licenses: Vec<License>,
    pub organization: Option<Organization>,
    pub developers: Vec<Developer>,
    pub scm: Option<Scm>,
    pub dependency_management: Vec<DependencyRef>,
    pub dependencies: Vec<DependencyRef>,
}

impl Descriptor {
    /// Group ID, falling back to the parent block's
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    /// Version, falling back to the parent block's
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }

    /// Returns this descriptor's identity, if its coordinates are complete
    pub fn component_id(&self) -> Option<ComponentId> {
        match (
            self.effective_group_id(),
            self.artifact_id.as_deref(),
            self.effective_version(),
        ) {
            (Some(g), Some(a), Some(v)) => Some(ComponentId::new(g, a, v)),
            _ => None,
        }
    }

    /// Merges this (child) layer over `parent`, returning the combined record.
    ///
    /// Scalars: child wins when set; `artifactId`, `name` and `packaging` are
    /// never inherited. Nested records (organization, scm):
    /// merged field by field. Keyed collections: child entries first, parent
    /// entries appended unless their key is already present. Properties:
    /// child scope shadows parent scope.
    pub fn inherit(&self, parent: &Descriptor) -> Descriptor {
        let mut properties = parent.properties.clone();
        properties.extend(self.properties.iter().map(|(k, v)| (k.clone(), v.clone())));

        Descriptor {
            group_id: self
                .effective_group_id()
                .map(str::to_string)
                .or_else(|| parent.group_id.clone()),
            artifact_id: self.artifact_id.clone(),
            version: self
                .effective_version()
                .map(str::to_string)
                .or_else(|| parent.version.clone()),
            packaging: self.packaging.clone(),
            name: self.name.clone(),
            description: self
                .description
                .clone()
                .or_else(|| parent.description.clone()),
            url: self.url.clone().or_else(|| parent.url.clone()),
            parent: self.parent.clone(),
            properties,
            licenses: concat_keyed(&self.licenses, &parent.licenses, |l| {
                (l.name.clone(), l.url.clone())
            }),
            organization: merge_nested(&self.organization, &parent.organization, |c, p| {
                Organization {
                    name: c.name.clone().or_else(|| p.name.clone()),
                    url: c.url.clone().or_else(|| p.url.clone()),
                }
            }),
            developers: concat_keyed(&self.developers, &parent.developers, developer_key),
            scm: merge_nested(&self.scm, &parent.scm, |c, p| Scm {
                url: c.url.clone().or_else(|| p.url.clone()),
                connection: c.connection.clone().or_else(|| p.connection.clone()),
                tag: c.tag.clone().or_else(|| p.tag.clone()),
            }),
            dependency_management: concat_keyed(
                &self.dependency_management,
                &parent.dependency_management,
                DependencyRef::key,
            ),
            dependencies: concat_keyed(&self.dependencies, &parent.dependencies, DependencyRef::key),
        }
    }

    /// Returns a copy with `f` applied to every string value
    pub fn map_strings(&self, f: impl Fn(&str) -> String) -> Descriptor {
        let opt = |v: &Option<String>| v.as_deref().map(&f);
        let dep = |d: &DependencyRef| DependencyRef {
            group_id: opt(&d.group_id),
            artifact_id: opt(&d.artifact_id),
            version: opt(&d.version),
            dep_type: opt(&d.dep_type),
            classifier: opt(&d.classifier),
            scope: opt(&d.scope),
            optional: opt(&d.optional),
        };

        Descriptor {
            group_id: opt(&self.group_id),
            artifact_id: opt(&self.artifact_id),
            version: opt(&self.version),
            packaging: opt(&self.packaging),
            name: opt(&self.name),
            description: opt(&self.description),
            url: opt(&self.url),
            parent: self.parent.as_ref().map(|p| ParentRef {
                group_id: opt(&p.group_id),
                artifact_id: opt(&p.artifact_id),
                version: opt(&p.version),
                relative_path: p.relative_path.clone(),
            }),
            properties: self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), f(v.as_str())))
                .collect(),
            licenses: self
                .licenses
                .iter()
                .map(|l| License {
                    name: opt(&l.name),
                    url: opt(&l.url),
                    distribution: opt(&l.distribution),
                    comments: opt(&l.comments),
                })
                .collect(),
            organization: self.organization.as_ref().map(|o| Organization {
                name: opt(&o.name),
                url: opt(&o.url),
            }),
            developers: self
                .developers
                .iter()
                .map(|d| Developer {
                    id: opt(&d.id),
                    name: opt(&d.name),
                    email: opt(&d.email),
                    organization: opt(&d.organization),
                })
                .collect(),
            scm: self.scm.as_ref().map(|s| Scm {
                url: opt(&s.url),
                connection: opt(&s.connection),
                tag: opt(&s.tag),
            }),
            dependency_management: self.dependency_management.iter().map(dep).collect(),
            dependencies: self.dependencies.iter().map(dep).collect(),
        }
    }
}

fn developer_key(d: &Developer) -> (Option<String>, Option<String>, Option<String>) {
    match &d.id {
        Some(id) => (Some(id.clone()), None, None),
        None => (None, d.name.clone(), d.email.clone()),
    }
}

/// Child entries first, then parent entries whose key the child lacks
fn concat_keyed<T, K>(child: &[T], parent: &[T], key: impl Fn(&T) -> K) -> Vec<T>
where
    T: Clone,
    K: Eq + std::hash::Hash,
{
    let mut seen = HashSet::new();
    child
        .iter()
        .chain(parent.iter())
        .filter(|item| seen.insert(key(*item)))
        .cloned()
        .collect()
}

fn merge_nested<T: Clone>(
    child: &Option<T>,
    parent: &Option<T>,
    merge: impl Fn(&T, &T) -> T,
) -> Option<T> {
    match (child, parent) {
        (Some(c), Some(p)) => Some(merge(c, p)),
        (Some(c), None) => Some(c.clone()),
        (None, Some(p)) => Some(p.clone()),
        (None, None) => None,
    }
}

/// The fully merged, property-substituted form of one descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EffectiveDescriptor {
    model: Descriptor,
}

impl EffectiveDescriptor {
    /// Wraps a model that has already been merged and interpolated
    pub fn from_model(model: Descriptor) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Descriptor {
        &self.model
    }

    pub fn into_model(self) -> Descriptor {
        self.model
    }

    pub fn component_id(&self) -> Option<ComponentId> {
        self.model.component_id()
    }
}
