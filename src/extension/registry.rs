//! Capability registry
//!
//! Indexes tagged types from an ordered list of catalogs. Position in that
//! list is the priority: catalog 0 wins over catalog 1 for the same key.
//! The registry is built once and is read-only afterwards.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::config::RegistryConfig;
use crate::extension::catalog::{
    Args, BuildFn, CapabilityId, ExposedType, ParamType, TagId, TypeCatalog, UpcastFn,
};
use crate::extension::error::RegistryError;
use crate::module::build::Artifact;
use crate::module::loader::ArtifactLoader;

/// Creates a boxed `Box<dyn Capability>` from arguments
pub(crate) type Factory = Arc<dyn Fn(&Args) -> anyhow::Result<Box<dyn Any>> + Send + Sync>;

/// Host-supplied description of one capability
#[derive(Debug, Clone)]
pub struct CapabilityDescriptor {
    pub capability: CapabilityId,
    /// Marker type that opts a concrete type into this capability
    pub tag: TagId,
    /// Constructor parameters every implementation must accept
    pub signature: Vec<ParamType>,
}

impl CapabilityDescriptor {
    /// Describe capability `C` selected by tag `Tag`
    pub fn of<C: ?Sized + 'static, Tag: ?Sized + 'static>(signature: Vec<ParamType>) -> Self {
        Self {
            capability: CapabilityId::of::<C>(),
            tag: TagId::of::<Tag>(),
            signature,
        }
    }
}

/// One loadable implementation of a capability
#[derive(Clone)]
pub struct ExtensionDescriptor {
    pub capability: CapabilityId,
    pub key: String,
    pub type_name: &'static str,
    /// Catalog (artifact) the type came from
    pub artifact: String,
    /// Position of the artifact in priority order, 0 is highest
    pub rank: usize,
    pub(crate) factory: Factory,
}

impl fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("capability", &self.capability)
            .field("key", &self.key)
            .field("type_name", &self.type_name)
            .field("artifact", &self.artifact)
            .field("rank", &self.rank)
            .finish()
    }
}

type LookupTable = HashMap<CapabilityId, BTreeMap<String, Vec<ExtensionDescriptor>>>;

/// Immutable capability index
pub struct CapabilityRegistry {
    descriptors: Vec<CapabilityDescriptor>,
    table: LookupTable,
    artifacts: Vec<String>,
    // dropped last: factories may point into retained code
    retained: Vec<Arc<dyn Any + Send + Sync>>,
}

impl CapabilityRegistry {
    /// Index `catalogs`, given in priority order
    pub fn new(
        catalogs: Vec<TypeCatalog>,
        descriptors: Vec<CapabilityDescriptor>,
        config: &RegistryConfig,
    ) -> Result<Self, RegistryError> {
        Self::check_descriptors(&descriptors)?;
        debug!(
            "Registering capabilities: {:?}",
            descriptors
                .iter()
                .map(|d| format!("{} <- {} {:?}", d.capability, d.tag, d.signature))
                .collect::<Vec<_>>()
        );

        let by_tag: HashMap<TagId, &CapabilityDescriptor> =
            descriptors.iter().map(|d| (d.tag, d)).collect();

        let mut table: LookupTable = HashMap::new();
        let mut artifacts = Vec::with_capacity(catalogs.len());
        let mut retained = Vec::new();

        for (rank, catalog) in catalogs.into_iter().enumerate() {
            let (artifact, types, retain) = catalog.into_parts();
            let mut seen = HashSet::new();
            for exposed in &types {
                if !seen.insert(exposed.type_id()) {
                    return Err(RegistryError::DuplicateType {
                        artifact,
                        type_name: exposed.type_name().to_string(),
                    });
                }
                if let Some(extension) =
                    Self::describe(exposed, &artifact, rank, &by_tag, config)?
                {
                    table
                        .entry(extension.capability)
                        .or_default()
                        .entry(extension.key.clone())
                        .or_default()
                        .push(extension);
                }
            }
            artifacts.push(artifact);
            retained.extend(retain);
        }

        let registry = Self {
            descriptors,
            table,
            artifacts,
            retained,
        };
        registry.log_summary();
        Ok(registry)
    }

    /// Index the catalogs of built artifacts, in the given order
    pub fn from_artifacts<'a, I>(
        artifacts: I,
        loader: &dyn ArtifactLoader,
        descriptors: Vec<CapabilityDescriptor>,
        config: &RegistryConfig,
    ) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = &'a Artifact>,
    {
        let mut catalogs = Vec::new();
        for artifact in artifacts {
            if !artifact.success || artifact.path.is_none() {
                return Err(RegistryError::ArtifactUnavailable(artifact.name().to_string()));
            }
            catalogs.push(loader.load(artifact)?);
        }
        Self::new(catalogs, descriptors, config)
    }

    fn check_descriptors(descriptors: &[CapabilityDescriptor]) -> Result<(), RegistryError> {
        let mut capabilities = HashSet::new();
        let mut tags = HashSet::new();
        for descriptor in descriptors {
            if !capabilities.insert(descriptor.capability) {
                return Err(RegistryError::DuplicateCapability(
                    descriptor.capability.to_string(),
                ));
            }
            if !tags.insert(descriptor.tag) {
                return Err(RegistryError::DuplicateTag(descriptor.tag.to_string()));
            }
        }
        Ok(())
    }

    /// Descriptor for one exposed type, if it qualifies for any capability
    fn describe(
        exposed: &ExposedType,
        artifact: &str,
        rank: usize,
        by_tag: &HashMap<TagId, &CapabilityDescriptor>,
        config: &RegistryConfig,
    ) -> Result<Option<ExtensionDescriptor>, RegistryError> {
        let mut candidates: Vec<(TagId, &str, &CapabilityDescriptor)> = Vec::new();
        for (tag, key) in exposed.tags() {
            let Some(descriptor) = by_tag.get(tag) else {
                continue;
            };
            if exposed.implements(descriptor.capability) {
                candidates.push((*tag, key.as_str(), *descriptor));
            } else {
                warn!(
                    "{} in {} carries tag {} but does not implement {}; ignoring the tag",
                    exposed.type_name(),
                    artifact,
                    tag,
                    descriptor.capability
                );
            }
        }

        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        let Some(&(tag, key, descriptor)) = candidates.first() else {
            trace!("{} in {} has no registered tag", exposed.type_name(), artifact);
            return Ok(None);
        };
        if candidates.len() > 1 {
            debug!(
                "{} in {} carries {} registered tags, using {}",
                exposed.type_name(),
                artifact,
                candidates.len(),
                tag
            );
        }

        let capability = descriptor.capability;
        let Some(constructor) = exposed.constructor_for(&descriptor.signature) else {
            if config.fail_on_missing_constructor {
                return Err(RegistryError::MissingConstructor {
                    artifact: artifact.to_string(),
                    type_name: exposed.type_name().to_string(),
                    capability: capability.to_string(),
                });
            }
            debug!(
                "Skipping {} in {}: no constructor matching {:?}",
                exposed.type_name(),
                artifact,
                descriptor.signature
            );
            return Ok(None);
        };

        // implements() held above, so the upcast exists
        let Some(upcast) = exposed.upcast_for(capability) else {
            return Ok(None);
        };

        Ok(Some(ExtensionDescriptor {
            capability,
            key: key.to_string(),
            type_name: exposed.type_name(),
            artifact: artifact.to_string(),
            rank,
            factory: compose(constructor.build.clone(), upcast.clone(), exposed.type_name()),
        }))
    }

    fn log_summary(&self) {
        for descriptor in &self.descriptors {
            let keys = self.table.get(&descriptor.capability);
            let count: usize = keys.map(|k| k.values().map(Vec::len).sum::<usize>()).unwrap_or(0);
            info!(
                "Capability {}: {} extension(s) across {} key(s)",
                descriptor.capability,
                count,
                keys.map(BTreeMap::len).unwrap_or(0)
            );
            for (key, extensions) in keys.into_iter().flatten() {
                trace!(
                    "  {} -> {:?}",
                    key,
                    extensions
                        .iter()
                        .map(|e| format!("{}@{}", e.type_name, e.artifact))
                        .collect::<Vec<_>>()
                );
            }
        }
    }

    /// Registered capabilities, in registration order
    pub fn supported_capabilities(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.descriptors.iter()
    }

    pub fn descriptor(&self, capability: CapabilityId) -> Option<&CapabilityDescriptor> {
        self.descriptors.iter().find(|d| d.capability == capability)
    }

    pub fn is_registered(&self, capability: CapabilityId) -> bool {
        self.descriptor(capability).is_some()
    }

    /// Implementations under `key`, highest priority first
    pub fn extensions(&self, capability: CapabilityId, key: &str) -> &[ExtensionDescriptor] {
        self.table
            .get(&capability)
            .and_then(|keys| keys.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every key of a capability with its implementations, keys sorted
    pub fn keyed(
        &self,
        capability: CapabilityId,
    ) -> impl Iterator<Item = (&str, &[ExtensionDescriptor])> {
        self.table
            .get(&capability)
            .into_iter()
            .flatten()
            .map(|(key, extensions)| (key.as_str(), extensions.as_slice()))
    }

    pub fn keys(&self, capability: CapabilityId) -> Vec<&str> {
        self.keyed(capability).map(|(key, _)| key).collect()
    }

    /// Total number of indexed implementations
    pub fn extension_count(&self) -> usize {
        self.table
            .values()
            .flat_map(|keys| keys.values())
            .map(Vec::len)
            .sum()
    }

    /// Artifact names in priority order
    pub fn artifacts(&self) -> &[String] {
        &self.artifacts
    }

    /// Number of retained artifact handles
    pub fn retained_handles(&self) -> usize {
        self.retained.len()
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("descriptors", &self.descriptors)
            .field("artifacts", &self.artifacts)
            .field("extensions", &self.extension_count())
            .finish()
    }
}

/// Constructor followed by upcast, fixed at registration time
fn compose(build: BuildFn, upcast: UpcastFn, type_name: &'static str) -> Factory {
    Arc::new(move |args: &Args| {
        let value = build(args)?;
        upcast(value).ok_or_else(|| {
            anyhow::anyhow!("constructor of {} returned a different type", type_name)
        })
    })
}
