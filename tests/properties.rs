//! Property tests for document generation.
//!
//! Random acyclic component graphs are laid out as host resolutions (some
//! identities appear at two arena indices, as happens when a resolver
//! reports a shared dependency twice) and run through the full pipeline.
//!
//! # Coverage
//!
//! - **Dedup**: one package per reachable identity, whatever the arena layout
//! - **No dangling edges**: every relationship endpoint is a package or the document
//! - **Edge completeness**: one DEPENDS_ON per distinct reachable parent/child pair
//! - **Determinism**: worker count and arena order do not change the output bytes

use std::collections::{BTreeSet, VecDeque};

use proptest::prelude::*;

use spdx_sbom::domain::{
    ComponentId, Descriptor, DocumentGraph, Interpolator, ProjectInfo, Properties,
    RelationshipType, Resolution, ResolvedNode, SpdxId,
};
use spdx_sbom::maven::MemorySource;
use spdx_sbom::pipeline::{creation_info, generate};
use spdx_sbom::storage::{spdx, ResolutionFile, SbomConfig};

const MAX_COMPONENTS: usize = 12;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Identity 0 is the project; the rest are libraries
fn identity(i: usize) -> ComponentId {
    if i == 0 {
        ComponentId::new("com.example", "app", "1.0")
    } else {
        ComponentId::new("org.lib", format!("lib{}", i), "1.0")
    }
}

#[derive(Debug, Clone)]
struct Scenario {
    /// Children of each identity, all with a higher index
    children: Vec<Vec<usize>>,
    /// Identities that get a second arena node
    duplicated: Vec<bool>,
}

fn arb_scenario() -> impl Strategy<Value = Scenario> {
    (
        2..=MAX_COMPONENTS,
        prop::collection::vec(prop::collection::vec(any::<bool>(), MAX_COMPONENTS), MAX_COMPONENTS),
        prop::collection::vec(any::<bool>(), MAX_COMPONENTS),
    )
        .prop_map(|(n, matrix, duplicated)| Scenario {
            children: (0..n)
                .map(|i| ((i + 1)..n).filter(|&j| matrix[i][j]).collect())
                .collect(),
            duplicated: (0..n).map(|i| i > 0 && duplicated[i]).collect(),
        })
}

impl Scenario {
    fn len(&self) -> usize {
        self.children.len()
    }

    /// Host resolution; `reverse` flips the arena order
    fn resolution(&self, reverse: bool) -> Resolution {
        let n = self.len();

        // Arena slots: primary node per identity, then the duplicates
        let mut slots: Vec<usize> = (0..n).collect();
        slots.extend((0..n).filter(|&i| self.duplicated[i]));
        let copy_slot = |i: usize| {
            n + (0..i).filter(|&k| self.duplicated[k]).count()
        };

        let arena_index = |slot: usize| if reverse { slots.len() - 1 - slot } else { slot };

        let mut nodes: Vec<Option<ResolvedNode>> = vec![None; slots.len()];
        for (slot, &i) in slots.iter().enumerate() {
            let mut node = ResolvedNode::new(identity(i));
            if i == 0 {
                node.origin.project = Some(":".into());
            }
            node.children = self.children[i]
                .iter()
                .map(|&j| {
                    let target = if self.duplicated[j] && (i + j) % 2 == 1 {
                        copy_slot(j)
                    } else {
                        j
                    };
                    arena_index(target)
                })
                .collect();
            nodes[arena_index(slot)] = Some(node);
        }

        Resolution {
            configuration: "runtimeClasspath".into(),
            root: arena_index(0),
            nodes: nodes.into_iter().flatten().collect(),
        }
    }

    fn reachable(&self) -> BTreeSet<usize> {
        let mut seen = BTreeSet::from([0]);
        let mut queue = VecDeque::from([0]);
        while let Some(i) = queue.pop_front() {
            for &j in &self.children[i] {
                if seen.insert(j) {
                    queue.push_back(j);
                }
            }
        }
        seen
    }

    fn source(&self) -> MemorySource {
        let mut source = MemorySource::new();
        for i in 1..self.len() {
            source.insert(
                identity(i),
                format!(
                    "<project><groupId>org.lib</groupId><artifactId>lib{i}</artifactId>\
                     <version>1.0</version><url>https://lib.example/{i}</url>\
                     <licenses><license><name>License {}</name></license></licenses></project>",
                    i % 3
                ),
            );
        }
        source
    }
}

fn config(jobs: usize) -> SbomConfig {
    let mut config = SbomConfig::default();
    config.projects.push(ProjectInfo {
        path: ":".into(),
        name: "app".into(),
        group: "com.example".into(),
        version: "1.0".into(),
        ..Default::default()
    });
    config.resolver.jobs = jobs;
    config
}

fn run(scenario: &Scenario, jobs: usize, reverse: bool) -> DocumentGraph {
    let graphs = ResolutionFile {
        resolutions: vec![scenario.resolution(reverse)],
    };
    generate(
        &config(jobs),
        &graphs,
        "main",
        &scenario.source(),
        &Properties::new(),
        creation_info(Some("0")),
    )
    .expect("generation should succeed")
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Exactly one package per reachable identity.
    #[test]
    fn one_package_per_identity(scenario in arb_scenario()) {
        let doc = run(&scenario, 2, false);

        let expected: BTreeSet<ComponentId> =
            scenario.reachable().into_iter().map(identity).collect();
        let actual: BTreeSet<ComponentId> =
            doc.packages.values().map(|p| p.component.clone()).collect();

        prop_assert_eq!(doc.packages.len(), expected.len());
        prop_assert_eq!(actual, expected);
    }

    /// Every relationship endpoint exists; edges are complete and unique.
    #[test]
    fn relationships_are_closed_and_complete(scenario in arb_scenario()) {
        let doc = run(&scenario, 2, false);
        let document = SpdxId::document();

        for rel in &doc.relationships {
            prop_assert!(rel.from == document || doc.packages.contains_key(&rel.from));
            prop_assert!(doc.packages.contains_key(&rel.to));
        }

        let expected_edges: usize = scenario
            .reachable()
            .iter()
            .map(|&i| scenario.children[i].len())
            .sum();
        prop_assert_eq!(doc.relationships_of(RelationshipType::DependsOn).count(), expected_edges);
        prop_assert_eq!(doc.relationships_of(RelationshipType::Describes).count(), 1);
    }

    /// Worker count and arena order do not change the serialized document.
    #[test]
    fn output_is_deterministic(scenario in arb_scenario()) {
        let baseline = spdx::render(&run(&scenario, 1, false)).unwrap();
        let parallel = spdx::render(&run(&scenario, 4, false)).unwrap();
        let reversed = spdx::render(&run(&scenario, 3, true)).unwrap();

        prop_assert_eq!(&baseline, &parallel);
        prop_assert_eq!(&baseline, &reversed);
    }

    /// Text without placeholders passes through interpolation unchanged.
    #[test]
    fn interpolation_leaves_plain_text_alone(text in "[^$]{0,40}") {
        let descriptor = Descriptor::default();
        let ambient = Properties::new();
        let interp = Interpolator::new(&descriptor, &ambient);
        prop_assert_eq!(interp.interpolate(&text), text);
    }

    /// Unknown placeholders are left verbatim.
    #[test]
    fn unknown_placeholders_are_kept(key in "[a-z]{1,10}\\.[a-z]{1,10}") {
        let descriptor = Descriptor::default();
        let ambient = Properties::new();
        let interp = Interpolator::new(&descriptor, &ambient);
        let placeholder = format!("${{{}}}", key);
        prop_assume!(!key.starts_with("project.") && !key.starts_with("pom."));
        prop_assert_eq!(interp.interpolate(&placeholder), placeholder);
    }
}
