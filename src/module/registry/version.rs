//! Version constraints between modules
//!
//! A dependency names another module and a single comparison against that
//! module's version, e.g. `content-a >=1.2.0`.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::module::traits::ModuleError;

/// Comparison applied between a candidate version and the required one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl Comparator {
    /// Longest operators first so `<=` is not read as `<`
    const OPERATORS: [(&'static str, Comparator); 6] = [
        ("==", Comparator::Eq),
        ("!=", Comparator::Ne),
        ("<=", Comparator::Le),
        (">=", Comparator::Ge),
        ("<", Comparator::Lt),
        (">", Comparator::Gt),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }

    /// Does `found <op> required` hold
    ///
    /// Versions compare by SemVer precedence, so build metadata is ignored.
    pub fn matches(&self, found: &Version, required: &Version) -> bool {
        let ordering = found.cmp_precedence(required);
        match self {
            Comparator::Eq => ordering == Ordering::Equal,
            Comparator::Ne => ordering != Ordering::Equal,
            Comparator::Lt => ordering == Ordering::Less,
            Comparator::Le => ordering != Ordering::Greater,
            Comparator::Gt => ordering == Ordering::Greater,
            Comparator::Ge => ordering != Ordering::Less,
        }
    }

    /// Split `">=1.2.0"` into its comparator and version; a bare version is `==`
    pub fn parse_requirement(requirement: &str) -> Result<(Comparator, Version), ModuleError> {
        let requirement = requirement.trim();
        let (comparator, rest) = Self::OPERATORS
            .iter()
            .find_map(|(op, cmp)| requirement.strip_prefix(op).map(|rest| (*cmp, rest)))
            .unwrap_or((Comparator::Eq, requirement));

        let version = Version::parse(rest.trim()).map_err(|e| {
            ModuleError::InvalidManifest(format!(
                "Invalid version requirement '{}': {}",
                requirement, e
            ))
        })?;
        Ok((comparator, version))
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::OPERATORS
            .iter()
            .find(|(op, _)| *op == s)
            .map(|(_, cmp)| *cmp)
            .ok_or_else(|| ModuleError::InvalidManifest(format!("Unknown comparator: {}", s)))
    }
}

/// Dependency of one module on another
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// Unique name of the required module
    pub target_name: String,
    pub comparator: Comparator,
    pub required_version: Version,
}

impl Dependency {
    pub fn new(target_name: impl Into<String>, comparator: Comparator, required_version: Version) -> Self {
        Self {
            target_name: target_name.into(),
            comparator,
            required_version,
        }
    }

    /// Parse a dependency from its target and a requirement such as `"==1.0.0"`
    pub fn parse(target_name: impl Into<String>, requirement: &str) -> Result<Self, ModuleError> {
        let (comparator, required_version) = Comparator::parse_requirement(requirement)?;
        Ok(Self::new(target_name, comparator, required_version))
    }

    pub fn is_satisfied_by(&self, version: &Version) -> bool {
        self.comparator.matches(version, &self.required_version)
    }

    /// Requirement text without the target, e.g. `>=1.2.0`
    pub fn requirement(&self) -> String {
        format!("{}{}", self.comparator, self.required_version)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.target_name, self.comparator, self.required_version)
    }
}
