//! Module dependency resolution
//!
//! Computes the build order for a set of selected modules plus whatever
//! additional modules they transitively require.
//!
//! Ordering is a depth-first post-order: selected modules are visited in the
//! order given, each visit first walks the module's dependencies in declared
//! order, then emits the module. A module is emitted once, at the earliest
//! point any visited module needs it. Modules without an ordering constraint
//! between them therefore keep their input order.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::module::traits::{Module, ModuleError};

/// Dependency resolution result
#[derive(Debug, Clone)]
pub struct DependencyResolution<'a> {
    /// Modules in build order (dependencies first)
    pub build_order: Vec<&'a Module>,
    /// Direct dependency names per resolved module
    pub dependencies: HashMap<String, Vec<String>>,
}

impl<'a> DependencyResolution<'a> {
    /// Names in build order
    pub fn names(&self) -> Vec<&'a str> {
        self.build_order
            .iter()
            .map(|m| m.unique_name.as_str())
            .collect()
    }

    /// Every module `name` depends on, directly or transitively
    pub fn transitive_dependencies(&self, name: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = vec![name];
        while let Some(current) = stack.pop() {
            if let Some(deps) = self.dependencies.get(current) {
                for dep in deps {
                    if seen.insert(dep.clone()) {
                        stack.push(dep);
                    }
                }
            }
        }
        seen
    }
}

/// Visit state for the depth-first walk
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Dependency resolver
pub struct ModuleDependencies;

impl ModuleDependencies {
    /// Resolve module dependencies and determine build order
    ///
    /// Every `selected` module appears in the result; `additional` modules only
    /// when some required module depends on them. Validation runs in a fixed
    /// order: duplicate names, missing dependencies, version constraints, then
    /// cycles.
    pub fn resolve<'a>(
        selected: &'a [Module],
        additional: &'a [Module],
    ) -> Result<DependencyResolution<'a>, ModuleError> {
        let mut module_map: HashMap<&'a str, &'a Module> = HashMap::new();
        for module in selected.iter().chain(additional) {
            if module_map
                .insert(module.unique_name.as_str(), module)
                .is_some()
            {
                return Err(ModuleError::DuplicateModule(module.unique_name.clone()));
            }
        }

        let required = Self::required_closure(selected, &module_map)?;
        Self::check_versions(&required, &module_map)?;

        let mut marks: HashMap<&'a str, Mark> = HashMap::new();
        let mut path: Vec<&'a str> = Vec::new();
        let mut build_order = Vec::with_capacity(required.len());
        for module in selected {
            Self::visit(module, &module_map, &mut marks, &mut path, &mut build_order)?;
        }

        let dependencies = build_order
            .iter()
            .map(|m| {
                (
                    m.unique_name.clone(),
                    m.dependencies
                        .iter()
                        .map(|d| d.target_name.clone())
                        .collect(),
                )
            })
            .collect();

        let resolution = DependencyResolution {
            build_order,
            dependencies,
        };
        debug!("Dependency resolution complete: {:?}", resolution.names());
        Ok(resolution)
    }

    /// Breadth-first walk from the selected modules collecting every module
    /// reachable through dependency edges, in discovery order
    fn required_closure<'a>(
        selected: &'a [Module],
        module_map: &HashMap<&'a str, &'a Module>,
    ) -> Result<Vec<&'a Module>, ModuleError> {
        let mut seen: HashSet<&str> = selected.iter().map(|m| m.unique_name.as_str()).collect();
        let mut required: Vec<&'a Module> = selected.iter().collect();
        let mut index = 0;

        while index < required.len() {
            let module = required[index];
            index += 1;
            for dep in &module.dependencies {
                let target = module_map
                    .get(dep.target_name.as_str())
                    .copied()
                    .ok_or_else(|| ModuleError::DependencyMissing {
                        module: module.unique_name.clone(),
                        dependency: dep.to_string(),
                    })?;
                if seen.insert(target.unique_name.as_str()) {
                    required.push(target);
                }
            }
        }

        Ok(required)
    }

    fn check_versions(
        required: &[&Module],
        module_map: &HashMap<&str, &Module>,
    ) -> Result<(), ModuleError> {
        for module in required {
            for dep in &module.dependencies {
                // presence was established by required_closure
                if let Some(target) = module_map.get(dep.target_name.as_str()) {
                    if !dep.is_satisfied_by(&target.version) {
                        return Err(ModuleError::VersionIncompatible {
                            module: module.unique_name.clone(),
                            requirement: dep.to_string(),
                            found: target.version.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn visit<'a>(
        module: &'a Module,
        module_map: &HashMap<&'a str, &'a Module>,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        build_order: &mut Vec<&'a Module>,
    ) -> Result<(), ModuleError> {
        let name = module.unique_name.as_str();
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<&str> = path[start..].to_vec();
                cycle.push(name);
                return Err(ModuleError::CyclicDependency(cycle.join(" -> ")));
            }
            None => {}
        }

        marks.insert(name, Mark::Visiting);
        path.push(name);
        for dep in &module.dependencies {
            if let Some(target) = module_map.get(dep.target_name.as_str()).copied() {
                Self::visit(target, module_map, marks, path, build_order)?;
            }
        }
        path.pop();
        marks.insert(name, Mark::Done);
        build_order.push(module);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::registry::version::Dependency;
    use semver::Version;

    fn module(name: &str, version: &str, deps: &[(&str, &str)]) -> Module {
        let mut m = Module::new(name, Version::parse(version).unwrap());
        for (target, req) in deps {
            m = m.with_dependency(Dependency::parse(*target, req).unwrap());
        }
        m
    }

    #[test]
    fn test_dependency_first_order() {
        let selected = vec![module("C", "1.0.0", &[("A", "==1.0.0")]), module("B", "1.0.0", &[])];
        let additional = vec![module("A", "1.0.0", &[])];

        let resolution = ModuleDependencies::resolve(&selected, &additional).unwrap();
        assert_eq!(resolution.names(), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_unreferenced_additional_excluded() {
        let selected = vec![module("B", "1.0.0", &[])];
        let additional = vec![module("A", "1.0.0", &[]), module("D", "2.0.0", &[])];

        let resolution = ModuleDependencies::resolve(&selected, &additional).unwrap();
        assert_eq!(resolution.names(), vec!["B"]);
    }

    #[test]
    fn test_unconstrained_modules_keep_input_order() {
        let selected = vec![
            module("Z", "1.0.0", &[]),
            module("M", "1.0.0", &[]),
            module("A", "1.0.0", &[]),
        ];
        let resolution = ModuleDependencies::resolve(&selected, &[]).unwrap();
        assert_eq!(resolution.names(), vec!["Z", "M", "A"]);
    }

    #[test]
    fn test_dependencies_walked_in_declared_order() {
        let selected = vec![module(
            "app",
            "1.0.0",
            &[("y", ">=1.0.0"), ("x", ">=1.0.0")],
        )];
        let additional = vec![
            module("x", "1.0.0", &[]),
            module("y", "1.0.0", &[("x", "==1.0.0")]),
        ];
        let resolution = ModuleDependencies::resolve(&selected, &additional).unwrap();
        assert_eq!(resolution.names(), vec!["x", "y", "app"]);
    }

    #[test]
    fn test_missing_dependency() {
        let selected = vec![module("C", "1.0.0", &[("A", "==1.0.0")])];
        let err = ModuleDependencies::resolve(&selected, &[]).unwrap_err();
        assert!(matches!(err, ModuleError::DependencyMissing { ref module, .. } if module == "C"));
    }

    #[test]
    fn test_version_constraint_violation() {
        let selected = vec![module("C", "1.0.0", &[("A", ">=2.0.0")])];
        let additional = vec![module("A", "1.0.0", &[])];
        let err = ModuleDependencies::resolve(&selected, &additional).unwrap_err();
        assert!(matches!(err, ModuleError::VersionIncompatible { .. }));
    }

    #[test]
    fn test_missing_reported_before_version() {
        // C's version problem comes first in traversal, D's missing target later
        let selected = vec![
            module("C", "1.0.0", &[("A", ">=2.0.0")]),
            module("D", "1.0.0", &[("nope", "==1.0.0")]),
        ];
        let additional = vec![module("A", "1.0.0", &[])];
        let err = ModuleDependencies::resolve(&selected, &additional).unwrap_err();
        assert!(matches!(err, ModuleError::DependencyMissing { .. }));
    }

    #[test]
    fn test_mutual_dependency_is_cycle() {
        let selected = vec![
            module("A", "1.0.0", &[("B", "==1.0.0")]),
            module("B", "1.0.0", &[("A", "==1.0.0")]),
        ];
        match ModuleDependencies::resolve(&selected, &[]) {
            Err(ModuleError::CyclicDependency(path)) => assert_eq!(path, "A -> B -> A"),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let selected = vec![module("A", "1.0.0", &[("A", "==1.0.0")])];
        let err = ModuleDependencies::resolve(&selected, &[]).unwrap_err();
        assert!(matches!(err, ModuleError::CyclicDependency(_)));
    }

    #[test]
    fn test_cycle_outside_required_set_ignored() {
        let selected = vec![module("A", "1.0.0", &[])];
        let additional = vec![
            module("X", "1.0.0", &[("Y", "==1.0.0")]),
            module("Y", "1.0.0", &[("X", "==1.0.0")]),
        ];
        let resolution = ModuleDependencies::resolve(&selected, &additional).unwrap();
        assert_eq!(resolution.names(), vec!["A"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let selected = vec![module("A", "1.0.0", &[])];
        let additional = vec![module("A", "2.0.0", &[])];
        let err = ModuleDependencies::resolve(&selected, &additional).unwrap_err();
        assert!(matches!(err, ModuleError::DuplicateModule(name) if name == "A"));
    }

    #[test]
    fn test_transitive_dependencies() {
        let selected = vec![module("app", "1.0.0", &[("mid", ">=1.0.0")])];
        let additional = vec![
            module("mid", "1.0.0", &[("base", ">=1.0.0")]),
            module("base", "1.0.0", &[]),
        ];
        let resolution = ModuleDependencies::resolve(&selected, &additional).unwrap();
        let deps = resolution.transitive_dependencies("app");
        assert!(deps.contains("mid"));
        assert!(deps.contains("base"));
        assert_eq!(deps.len(), 2);
    }
}
