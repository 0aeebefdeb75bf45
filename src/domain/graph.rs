//! Resolved dependency graph
//!
//! The host resolver hands over one [`Resolution`] per configuration: an
//! arena of nodes with integer child references. [`DependencyGraph::flatten`]
//! merges them into one node per [`ComponentId`] plus parent → child edges.
//! Uses petgraph for graph storage.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;

use super::id::ComponentId;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Resolution '{configuration}' references missing node {index}")]
    DanglingNode { configuration: String, index: usize },
}

/// Where a component came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentOrigin {
    /// Build path when the component is a project of this build
    pub project: Option<String>,
    /// Resolved artifact file
    pub artifact: Option<PathBuf>,
    /// Descriptor (POM) file, when the host already fetched it
    pub descriptor: Option<PathBuf>,
    /// Name of the repository the component was resolved from
    pub repository: Option<String>,
}

impl ComponentOrigin {
    pub fn is_project(&self) -> bool {
        self.project.is_some()
    }
}

/// One node of a host resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNode {
    pub id: ComponentId,
    #[serde(flatten)]
    pub origin: ComponentOrigin,
    #[serde(default)]
    pub children: Vec<usize>,
}

impl ResolvedNode {
    pub fn new(id: ComponentId) -> Self {
        Self {
            id,
            origin: ComponentOrigin::default(),
            children: Vec::new(),
        }
    }
}

/// The resolved graph of one configuration (e.g., `runtimeClasspath`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub configuration: String,
    pub root: usize,
    pub nodes: Vec<ResolvedNode>,
}

impl Resolution {
    /// Checks that the root and every child index refer to a node
    fn validate(&self) -> Result<(), GraphError> {
        let len = self.nodes.len();
        let dangling = std::iter::once(self.root)
            .chain(self.nodes.iter().flat_map(|n| n.children.iter().copied()))
            .find(|&index| index >= len);

        match dangling {
            Some(index) => Err(GraphError::DanglingNode {
                configuration: self.configuration.clone(),
                index,
            }),
            None => Ok(()),
        }
    }
}

/// Deduplicated components and their dependency edges
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph, edges point parent → child
    graph: DiGraph<ComponentId, ()>,

    /// Map from ComponentId to node index
    node_map: HashMap<ComponentId, NodeIndex>,

    /// First-seen origin of every component
    origins: HashMap<ComponentId, ComponentOrigin>,

    /// Root components in first-seen order, without duplicates
    roots: Vec<ComponentId>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattens one or more resolutions into a single graph
    pub fn flatten<'a>(
        resolutions: impl IntoIterator<Item = &'a Resolution>,
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for resolution in resolutions {
            let expanded = graph.add_resolution(resolution)?;
            tracing::debug!(
                configuration = %resolution.configuration,
                arena = resolution.nodes.len(),
                expanded,
                "Walked resolution"
            );
        }
        Ok(graph)
    }

    /// Walks one resolution depth-first from its root.
    ///
    /// Every parent → child edge is recorded, but a component whose identity
    /// was already visited in this walk is not descended into again. Returns
    /// the number of nodes expanded, at most one per distinct identity.
    pub fn add_resolution(&mut self, resolution: &Resolution) -> Result<usize, GraphError> {
        resolution.validate()?;

        let root = &resolution.nodes[resolution.root];
        self.add_component(root);
        if !self.roots.contains(&root.id) {
            self.roots.push(root.id.clone());
        }

        let mut visited = HashSet::new();
        visited.insert(root.id.clone());
        let mut stack = vec![resolution.root];
        let mut expanded = 0;

        while let Some(index) = stack.pop() {
            expanded += 1;
            let node = &resolution.nodes[index];
            let parent_idx = self.add_component(node);

            for &child_index in &node.children {
                let child = &resolution.nodes[child_index];
                let child_idx = self.add_component(child);

                if child.id != node.id {
                    self.graph.update_edge(parent_idx, child_idx, ());
                }
                if visited.insert(child.id.clone()) {
                    stack.push(child_index);
                }
            }
        }

        Ok(expanded)
    }

    /// Adds a component if unseen and returns its node
    fn add_component(&mut self, node: &ResolvedNode) -> NodeIndex {
        if let Some(idx) = self.node_map.get(&node.id) {
            return *idx;
        }
        let idx = self.graph.add_node(node.id.clone());
        self.node_map.insert(node.id.clone(), idx);
        self.origins.insert(node.id.clone(), node.origin.clone());
        idx
    }

    /// Root components, one per distinct root identity
    pub fn roots(&self) -> &[ComponentId] {
        &self.roots
    }

    /// All components in identity order
    pub fn components(&self) -> Vec<&ComponentId> {
        let mut ids: Vec<_> = self.node_map.keys().collect();
        ids.sort();
        ids
    }

    /// Origin of a component
    pub fn origin(&self, id: &ComponentId) -> Option<&ComponentOrigin> {
        self.origins.get(id)
    }

    /// Components with their origins, in identity order
    pub fn origins(&self) -> BTreeMap<&ComponentId, &ComponentOrigin> {
        self.origins.iter().collect()
    }

    /// All (parent, child) edges in order
    pub fn edges(&self) -> Vec<(ComponentId, ComponentId)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| (self.graph[e.source()].clone(), self.graph[e.target()].clone()))
            .collect();
        edges.sort();
        edges
    }

    /// Returns true if the host handed over a cyclic graph
    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Returns the number of components in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
