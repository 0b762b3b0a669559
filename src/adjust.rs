use ash::vk;

use std::ffi::CStr;

use crate::{
    chain::{self, ChainNode},
    DeviceDescriptor, Feature, FeatureStruct, UsageSet, EXTENSIONS,
};

/// Everything [`UsageSet::adjust_device`] removed from a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Adjustments {
    /// Cleared feature fields, by their Vulkan names.
    pub features: Vec<&'static str>,
    /// Dropped extensions.
    pub extensions: Vec<&'static CStr>,
    /// Extensions whose feature structs were unlinked from the chain.
    pub chain: Vec<&'static CStr>,
}

impl Adjustments {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.extensions.is_empty() && self.chain.is_empty()
    }
}

impl UsageSet {
    /// Clears every tracked field of `features` that is requested but was
    /// never observed, along with any dependent field left without its
    /// prerequisite. Never sets a field.
    ///
    /// Returns the names of the cleared fields in table order.
    pub fn adjust_features<S: FeatureStruct>(&self, features: &mut S) -> Vec<&'static str> {
        let mut cleared = Vec::new();
        for &feature in Feature::ALL {
            if feature.generation() != S::GENERATION || self.features.contains(feature) {
                continue;
            }
            if let Some(field) = features.field_mut(feature) {
                if *field != vk::FALSE {
                    *field = vk::FALSE;
                    log::debug!("Disabled unused feature {}", feature);
                    cleared.push(feature.name());
                }
            }
        }
        for dependent in S::dependents() {
            let requested = features
                .field_mut(dependent.requires)
                .map_or(false, |field| *field != vk::FALSE);
            let field = (dependent.field)(features);
            if !requested && *field != vk::FALSE {
                *field = vk::FALSE;
                log::debug!(
                    "Disabled {} along with {}",
                    dependent.name,
                    dependent.requires
                );
                cleared.push(dependent.name);
            }
        }
        cleared
    }

    /// Removes every known extension whose behavior was never observed.
    /// Other names are kept in their original order.
    pub fn adjust_extensions<N: AsRef<CStr>>(&self, names: &mut Vec<N>) -> Vec<&'static CStr> {
        let mut removed = Vec::new();
        for info in EXTENSIONS {
            if self.extensions.contains(info.flag) {
                continue;
            }
            let before = names.len();
            names.retain(|name| name.as_ref() != info.name);
            if names.len() != before {
                log::debug!("Disabled unused extension {:?}", info.name);
                removed.push(info.name);
            }
        }
        removed
    }

    /// Narrows a whole device creation request.
    ///
    /// The core feature block, then every chained core feature struct, then
    /// the extension list, and finally the chained feature structs of the
    /// extensions that were dropped.
    pub fn adjust_device(&self, desc: &mut DeviceDescriptor) -> Adjustments {
        let mut adjustments = Adjustments::default();

        if let Some(ref mut features) = desc.enabled_features {
            adjustments.features.extend(self.adjust_features(features));
        }
        for node in desc.chain.iter_mut() {
            let cleared = match *node {
                ChainNode::Features2(ref mut features) => self.adjust_features(features),
                ChainNode::Vulkan11Features(ref mut features) => self.adjust_features(features),
                ChainNode::Vulkan12Features(ref mut features) => self.adjust_features(features),
                ChainNode::Vulkan13Features(ref mut features) => self.adjust_features(features),
                _ => continue,
            };
            adjustments.features.extend(cleared);
        }

        adjustments.extensions = self.adjust_extensions(&mut desc.enabled_extensions);
        adjustments.chain = chain::prune(&mut desc.chain, &desc.enabled_extensions);
        adjustments
    }
}
