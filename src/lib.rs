/*! Runtime detection of the optional Vulkan features an application really uses.
 *
 *  An interception layer reports every successful call to a
 *  [`FeatureRegistry`] through its `check_*` methods, and every created shader
 *  module through [`FeatureRegistry::check_shader_module`]. The registry only
 *  ever accumulates: a feature, once seen, stays seen until the registry is
 *  reset.
 *
 *  Before a device request is forwarded or written out for replay, a
 *  [`UsageSet`] snapshot of the registry narrows it:
 *  - feature structs lose every tracked bit that was requested but never used,
 *  - extension lists lose extensions whose behavior was never observed,
 *  - `pNext` chains lose the feature structs of extensions no longer enabled.
 *
 *  Nothing here blocks or fails. Absent structures, absent fields and
 *  unknown capabilities are ordinary inputs.
 */

#![allow(
    // Explicit lifetimes are often easier to reason about.
    clippy::needless_lifetimes,
    // Vulkan field names are matched verbatim.
    clippy::upper_case_acronyms,
)]
#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_qualifications,
    // We don't match on a reference, unless required.
    clippy::pattern_type_mismatch,
)]

mod adjust;
pub mod chain;
mod check;
mod conv;
mod feature;
pub mod registry;
pub mod scan;

pub use adjust::Adjustments;
pub use chain::{ChainNode, Parent};
pub use feature::{
    Dependent, ExtensionInfo, Extensions, Feature, FeatureSet, FeatureStruct, Generation,
    EXTENSIONS, SUBGROUP_ROTATE_FEATURES,
};
pub use registry::FeatureRegistry;
pub use scan::ScanError;

use ash::vk;

use std::ffi::CString;

/// Usage observed by a registry, or declared by a shader module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsageSet {
    pub features: FeatureSet,
    pub extensions: Extensions,
}

impl UsageSet {
    pub fn from_features(features: &[Feature]) -> Self {
        Self {
            features: features.iter().copied().collect(),
            extensions: Extensions::empty(),
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            features: self.features.union(other.features),
            extensions: self.extensions | other.extensions,
        }
    }
}

/// `VkPipelineColorBlendStateCreateInfo`.
#[derive(Clone, Debug)]
pub struct ColorBlendDescriptor<'a> {
    pub logic_op_enable: bool,
    pub attachments: &'a [vk::PipelineColorBlendAttachmentState],
}

/// `VkPipelineShaderStageCreateInfo`.
#[derive(Clone, Debug)]
pub struct ShaderStageDescriptor<'a> {
    pub stage: vk::ShaderStageFlags,
    pub flags: vk::PipelineShaderStageCreateFlags,
    pub chain: &'a [ChainNode],
}

/// `VkDescriptorSetLayoutCreateInfo`.
#[derive(Clone, Debug)]
pub struct DescriptorSetLayoutDescriptor<'a> {
    pub flags: vk::DescriptorSetLayoutCreateFlags,
    pub bindings: &'a [vk::DescriptorSetLayoutBinding],
    pub chain: &'a [ChainNode],
}

/// `VkDeviceCreateInfo`, as far as feature selection goes.
///
/// Owns its chain, so the adjusters can unlink from it.
#[derive(Clone, Debug, Default)]
pub struct DeviceDescriptor {
    pub enabled_extensions: Vec<CString>,
    pub enabled_features: Option<vk::PhysicalDeviceFeatures>,
    pub chain: Vec<ChainNode>,
}
