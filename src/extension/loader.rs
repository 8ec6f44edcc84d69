//! Extension lookup and instantiation
//!
//! Every query checks, in order, that the capability is registered and that
//! the argument types equal its signature. Nothing is constructed before
//! both checks pass.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

use crate::extension::catalog::{Args, CapabilityId, ParamType};
use crate::extension::error::LoaderError;
use crate::extension::registry::{CapabilityRegistry, ExtensionDescriptor};

/// Query handle over a shared registry
#[derive(Debug, Clone)]
pub struct ExtensionLoader {
    registry: Arc<CapabilityRegistry>,
}

impl ExtensionLoader {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn from_shared(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Highest-priority implementation of `C` under `key`
    pub fn load<C: ?Sized + 'static>(&self, key: &str, args: &Args) -> Result<Box<C>, LoaderError> {
        let capability = self.check::<C>(args)?;
        debug!("load {} '{}'", capability, key);
        let descriptor = self
            .registry
            .extensions(capability, key)
            .first()
            .ok_or_else(|| LoaderError::NotFound {
                capability: capability.to_string(),
                key: key.to_string(),
            })?;
        instantiate::<C>(descriptor, args)
    }

    /// Every implementation of `C` under `key`, highest priority first
    ///
    /// Nothing is constructed until the sequence is iterated; an unknown key
    /// yields an empty sequence.
    pub fn deep_load<'a, C: ?Sized + 'static>(
        &'a self,
        key: &str,
        args: &'a Args,
    ) -> Result<DeepLoad<'a, C>, LoaderError> {
        let capability = self.check::<C>(args)?;
        debug!("deep_load {} '{}'", capability, key);
        Ok(DeepLoad {
            descriptors: self.registry.extensions(capability, key),
            args,
            _marker: PhantomData,
        })
    }

    /// [`deep_load`](Self::deep_load), constructed up front
    pub fn deep_eager_load<C: ?Sized + 'static>(
        &self,
        key: &str,
        args: &Args,
    ) -> Result<Vec<Box<C>>, LoaderError> {
        self.deep_load::<C>(key, args)?.iter().collect()
    }

    /// Highest-priority implementation of `C` for every key
    pub fn load_all<C: ?Sized + 'static>(
        &self,
        args: &Args,
    ) -> Result<BTreeMap<String, Box<C>>, LoaderError> {
        let capability = self.check::<C>(args)?;
        debug!("load_all {}", capability);
        let mut loaded = BTreeMap::new();
        for (key, descriptors) in self.registry.keyed(capability) {
            if let Some(descriptor) = descriptors.first() {
                loaded.insert(key.to_string(), instantiate::<C>(descriptor, args)?);
            }
        }
        Ok(loaded)
    }

    /// Every implementation of `C` for every key, highest priority first
    pub fn deep_load_all<C: ?Sized + 'static>(
        &self,
        args: &Args,
    ) -> Result<BTreeMap<String, Vec<Box<C>>>, LoaderError> {
        let capability = self.check::<C>(args)?;
        debug!("deep_load_all {}", capability);
        let mut loaded = BTreeMap::new();
        for (key, descriptors) in self.registry.keyed(capability) {
            let instances = descriptors
                .iter()
                .map(|d| instantiate::<C>(d, args))
                .collect::<Result<Vec<_>, _>>()?;
            loaded.insert(key.to_string(), instances);
        }
        Ok(loaded)
    }

    fn check<C: ?Sized + 'static>(&self, args: &Args) -> Result<CapabilityId, LoaderError> {
        let capability = CapabilityId::of::<C>();
        let descriptor = self
            .registry
            .descriptor(capability)
            .ok_or_else(|| LoaderError::UnknownCapability(capability.to_string()))?;

        if !args.matches(&descriptor.signature) {
            return Err(LoaderError::ArgumentType {
                capability: capability.to_string(),
                expected: type_list(&descriptor.signature),
                found: type_list(&args.types()),
            });
        }
        Ok(capability)
    }
}

fn type_list(types: &[ParamType]) -> String {
    types
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn instantiate<C: ?Sized + 'static>(
    descriptor: &ExtensionDescriptor,
    args: &Args,
) -> Result<Box<C>, LoaderError> {
    let value = (descriptor.factory)(args)?;
    value.downcast::<Box<C>>().map(|boxed| *boxed).map_err(|_| {
        LoaderError::Construction(anyhow::anyhow!(
            "{} from {} did not produce a {}",
            descriptor.type_name,
            descriptor.artifact,
            descriptor.capability
        ))
    })
}

/// Lazy, restartable sequence of instances across priorities
///
/// Each pass constructs fresh instances.
pub struct DeepLoad<'a, C: ?Sized> {
    descriptors: &'a [ExtensionDescriptor],
    args: &'a Args,
    _marker: PhantomData<fn() -> Box<C>>,
}

impl<'a, C: ?Sized + 'static> DeepLoad<'a, C> {
    pub fn iter(&self) -> DeepLoadIter<'a, C> {
        DeepLoadIter {
            descriptors: self.descriptors.iter(),
            args: self.args,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptors in the order instances are produced
    pub fn descriptors(&self) -> &'a [ExtensionDescriptor] {
        self.descriptors
    }
}

impl<'a, C: ?Sized + 'static> IntoIterator for DeepLoad<'a, C> {
    type Item = Result<Box<C>, LoaderError>;
    type IntoIter = DeepLoadIter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, 'b, C: ?Sized + 'static> IntoIterator for &'b DeepLoad<'a, C> {
    type Item = Result<Box<C>, LoaderError>;
    type IntoIter = DeepLoadIter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`DeepLoad`]
pub struct DeepLoadIter<'a, C: ?Sized> {
    descriptors: std::slice::Iter<'a, ExtensionDescriptor>,
    args: &'a Args,
    _marker: PhantomData<fn() -> Box<C>>,
}

impl<'a, C: ?Sized + 'static> Iterator for DeepLoadIter<'a, C> {
    type Item = Result<Box<C>, LoaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.descriptors
            .next()
            .map(|descriptor| instantiate::<C>(descriptor, self.args))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.descriptors.size_hint()
    }
}
