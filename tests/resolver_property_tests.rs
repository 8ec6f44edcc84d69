//! Property tests for dependency resolution over random acyclic graphs

use modhost::module::{Module, ModuleDependencies, ModuleError};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

mod common;
use common::module;

/// Edge lists where module `i` only depends on lower indices
fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..12).prop_flat_map(|n| {
        (0..n)
            .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(3)))
            .collect::<Vec<_>>()
    })
}

fn name(i: usize) -> String {
    format!("m{}", i)
}

fn build_module(i: usize, deps: &[usize]) -> Module {
    let mut targets: Vec<String> = deps.iter().filter(|&&d| d != i).map(|&d| name(d)).collect();
    targets.sort();
    targets.dedup();
    let pairs: Vec<(&str, &str)> = targets.iter().map(|t| (t.as_str(), ">=1.0.0")).collect();
    module(&name(i), "1.0.0", &pairs)
}

fn modules(edges: &[Vec<usize>]) -> Vec<Module> {
    edges
        .iter()
        .enumerate()
        .map(|(i, deps)| build_module(i, deps))
        .collect()
}

proptest! {
    #[test]
    fn dependencies_precede_dependents(
        edges in dag(),
        picks in proptest::collection::vec(any::<bool>(), 12),
    ) {
        let mut selected = Vec::new();
        let mut additional = Vec::new();
        for (module, picked) in modules(&edges).into_iter().zip(&picks) {
            if *picked {
                selected.push(module);
            } else {
                additional.push(module);
            }
        }

        let resolution = ModuleDependencies::resolve(&selected, &additional).unwrap();
        let position: HashMap<&str, usize> = resolution
            .build_order
            .iter()
            .enumerate()
            .map(|(i, m)| (m.unique_name.as_str(), i))
            .collect();

        prop_assert_eq!(position.len(), resolution.build_order.len());
        for m in &selected {
            prop_assert!(position.contains_key(m.unique_name.as_str()));
        }
        for m in &resolution.build_order {
            for dep in &m.dependencies {
                prop_assert!(position[dep.target_name.as_str()] < position[m.unique_name.as_str()]);
            }
        }

        let needed: HashSet<String> = selected
            .iter()
            .flat_map(|m| resolution.transitive_dependencies(&m.unique_name))
            .collect();
        for m in &additional {
            prop_assert_eq!(
                position.contains_key(m.unique_name.as_str()),
                needed.contains(&m.unique_name)
            );
        }
    }

    #[test]
    fn back_edge_is_reported_as_cycle(edges in dag(), from in 0usize..12) {
        let n = edges.len();
        let from = from % n;
        prop_assume!(from != n - 1);

        let all = modules(&edges);
        let top = name(n - 1);
        let reaches = ModuleDependencies::resolve(&all[n - 1..], &all[..n - 1])
            .unwrap()
            .transitive_dependencies(&top)
            .contains(&name(from));
        prop_assume!(reaches);

        // m{from} -> m{n-1} closes the loop
        let mut looped = edges.clone();
        looped[from].push(n - 1);
        let all = modules(&looped);

        let result = ModuleDependencies::resolve(&all[n - 1..], &all[..n - 1]);
        prop_assert!(matches!(result, Err(ModuleError::CyclicDependency(_))));
    }
}
