//! Registry priority order
//!
//! Selected modules are indexed in the order the caller gave them. Modules
//! pulled in only as dependencies are left out, or slotted in right after a
//! selected module that needs them, depending on the [`InclusionStrategy`].

use serde::{Deserialize, Serialize};

use crate::module::registry::dependencies::DependencyResolution;
use crate::module::traits::Module;

/// Where non-selected dependencies go in the registry priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionStrategy {
    /// Dependencies are only available at build time
    #[default]
    None,
    /// After the first selected module depending on them
    AfterFirst,
    /// After the last selected module depending on them
    AfterLast,
}

impl InclusionStrategy {
    /// Module names in registry priority order, highest first
    ///
    /// Dependencies placed after the same selected module go in reverse build
    /// order, so a dependency always ranks below the modules built on it.
    pub fn priority_order(&self, selected: &[Module], resolution: &DependencyResolution<'_>) -> Vec<String> {
        let selected_names: Vec<&str> = selected.iter().map(|m| m.unique_name.as_str()).collect();
        if *self == InclusionStrategy::None {
            return selected_names.iter().map(|n| n.to_string()).collect();
        }

        let closures: Vec<_> = selected_names
            .iter()
            .map(|name| resolution.transitive_dependencies(name))
            .collect();

        let mut anchored: Vec<Vec<&str>> = vec![Vec::new(); selected_names.len()];
        for name in resolution.names().into_iter().rev() {
            if selected_names.contains(&name) {
                continue;
            }
            let mut dependents = closures
                .iter()
                .enumerate()
                .filter(|(_, deps)| deps.contains(name))
                .map(|(index, _)| index);
            let anchor = match self {
                InclusionStrategy::AfterFirst => dependents.next(),
                InclusionStrategy::AfterLast => dependents.last(),
                InclusionStrategy::None => None,
            };
            if let Some(index) = anchor {
                anchored[index].push(name);
            }
        }

        selected_names
            .iter()
            .zip(anchored)
            .flat_map(|(name, deps)| std::iter::once(*name).chain(deps))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::registry::dependencies::ModuleDependencies;
    use crate::module::registry::version::Dependency;
    use semver::Version;

    fn module(name: &str, deps: &[&str]) -> Module {
        deps.iter().fold(Module::new(name, Version::new(1, 0, 0)), |m, d| {
            m.with_dependency(Dependency::parse(*d, ">=1.0.0").unwrap())
        })
    }

    fn order(strategy: InclusionStrategy, selected: &[Module], additional: &[Module]) -> Vec<String> {
        let resolution = ModuleDependencies::resolve(selected, additional).unwrap();
        strategy.priority_order(selected, &resolution)
    }

    #[test]
    fn test_strategies() {
        // C and B both build on A; base sits under A
        let selected = vec![module("C", &["A"]), module("B", &["A"])];
        let additional = vec![module("A", &["base"]), module("base", &[])];

        assert_eq!(order(InclusionStrategy::None, &selected, &additional), vec!["C", "B"]);
        assert_eq!(
            order(InclusionStrategy::AfterFirst, &selected, &additional),
            vec!["C", "A", "base", "B"]
        );
        assert_eq!(
            order(InclusionStrategy::AfterLast, &selected, &additional),
            vec!["C", "B", "A", "base"]
        );
    }

    #[test]
    fn test_selected_dependency_not_duplicated() {
        let selected = vec![module("C", &["A"]), module("A", &[])];
        assert_eq!(
            order(InclusionStrategy::AfterFirst, &selected, &[]),
            vec!["C", "A"]
        );
    }

    #[test]
    fn test_serde_names() {
        let parsed: InclusionStrategy = serde_json::from_str("\"after_first\"").unwrap();
        assert_eq!(parsed, InclusionStrategy::AfterFirst);
        assert_eq!(InclusionStrategy::default(), InclusionStrategy::None);
    }
}
