//! Extension structure chains.
//!
//! Vulkan threads optional structures behind a base create-info through raw
//! `pNext` pointers. Here the chain is an explicit sequence owned by the head
//! structure: position `0` is the structure pointed at by the head's `pNext`,
//! and so on. The head itself is never part of the sequence, so every chained
//! node has a predecessor and can be unlinked.
//!
//! The `p_next` fields of the `ash` structs carried by [`ChainNode`] are never
//! read; chain order is the order of the sequence.

use ash::vk;

use std::ffi::CStr;

use crate::feature::{EXTENSIONS, SUBGROUP_ROTATE_FEATURES};

/// Mirror of `VkPhysicalDeviceShaderSubgroupRotateFeaturesKHR`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubgroupRotateFeatures {
    pub shader_subgroup_rotate: vk::Bool32,
    pub shader_subgroup_rotate_clustered: vk::Bool32,
}

/// A structure linked into a `pNext` chain.
#[derive(Clone, Debug)]
pub enum ChainNode {
    /// `VkPhysicalDeviceFeatures2`, carrying the core feature block.
    Features2(vk::PhysicalDeviceFeatures),
    Vulkan11Features(vk::PhysicalDeviceVulkan11Features),
    Vulkan12Features(vk::PhysicalDeviceVulkan12Features),
    Vulkan13Features(vk::PhysicalDeviceVulkan13Features),
    ShaderAtomicInt64Features(vk::PhysicalDeviceShaderAtomicInt64Features),
    ShaderSubgroupRotateFeatures(SubgroupRotateFeatures),
    IndexTypeUint8Features(vk::PhysicalDeviceIndexTypeUint8FeaturesEXT),
    ShaderDemoteToHelperInvocationFeatures(vk::PhysicalDeviceShaderDemoteToHelperInvocationFeatures),
    SemaphoreTypeCreateInfo(vk::SemaphoreTypeCreateInfo),
    SamplerReductionModeCreateInfo(vk::SamplerReductionMode),
    SamplerYcbcrConversionInfo(vk::SamplerYcbcrConversion),
    /// One entry per binding of the owning descriptor set layout.
    DescriptorSetLayoutBindingFlagsCreateInfo(Vec<vk::DescriptorBindingFlags>),
    /// One view mask per subpass.
    RenderPassMultiviewCreateInfo(Vec<u32>),
    PipelineShaderStageRequiredSubgroupSizeCreateInfo(u32),
    /// A structure this crate does not interpret.
    Other(vk::StructureType),
}

impl ChainNode {
    pub fn tag(&self) -> vk::StructureType {
        use vk::StructureType as St;
        match *self {
            Self::Features2(_) => St::PHYSICAL_DEVICE_FEATURES_2,
            Self::Vulkan11Features(_) => St::PHYSICAL_DEVICE_VULKAN_1_1_FEATURES,
            Self::Vulkan12Features(_) => St::PHYSICAL_DEVICE_VULKAN_1_2_FEATURES,
            Self::Vulkan13Features(_) => St::PHYSICAL_DEVICE_VULKAN_1_3_FEATURES,
            Self::ShaderAtomicInt64Features(_) => St::PHYSICAL_DEVICE_SHADER_ATOMIC_INT64_FEATURES,
            Self::ShaderSubgroupRotateFeatures(_) => SUBGROUP_ROTATE_FEATURES,
            Self::IndexTypeUint8Features(_) => St::PHYSICAL_DEVICE_INDEX_TYPE_UINT8_FEATURES_EXT,
            Self::ShaderDemoteToHelperInvocationFeatures(_) => {
                St::PHYSICAL_DEVICE_SHADER_DEMOTE_TO_HELPER_INVOCATION_FEATURES
            }
            Self::SemaphoreTypeCreateInfo(_) => St::SEMAPHORE_TYPE_CREATE_INFO,
            Self::SamplerReductionModeCreateInfo(_) => St::SAMPLER_REDUCTION_MODE_CREATE_INFO,
            Self::SamplerYcbcrConversionInfo(_) => St::SAMPLER_YCBCR_CONVERSION_INFO,
            Self::DescriptorSetLayoutBindingFlagsCreateInfo(_) => {
                St::DESCRIPTOR_SET_LAYOUT_BINDING_FLAGS_CREATE_INFO
            }
            Self::RenderPassMultiviewCreateInfo(_) => St::RENDER_PASS_MULTIVIEW_CREATE_INFO,
            Self::PipelineShaderStageRequiredSubgroupSizeCreateInfo(_) => {
                St::PIPELINE_SHADER_STAGE_REQUIRED_SUBGROUP_SIZE_CREATE_INFO
            }
            Self::Other(tag) => tag,
        }
    }
}

/// Predecessor of a chained node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parent {
    /// The head structure owning the chain.
    Head,
    /// The node at this position of the chain.
    Node(usize),
}

/// First node with the given tag.
pub fn find(chain: &[ChainNode], tag: vk::StructureType) -> Option<&ChainNode> {
    chain.iter().find(|node| node.tag() == tag)
}

pub fn find_mut(chain: &mut [ChainNode], tag: vk::StructureType) -> Option<&mut ChainNode> {
    chain.iter_mut().find(|node| node.tag() == tag)
}

/// The predecessor of the first node with the given tag.
pub fn find_parent(chain: &[ChainNode], tag: vk::StructureType) -> Option<Parent> {
    let position = chain.iter().position(|node| node.tag() == tag)?;
    Some(match position.checked_sub(1) {
        Some(index) => Parent::Node(index),
        None => Parent::Head,
    })
}

/// Removes the first node with the given tag, relinking its predecessor to
/// its successor. Returns whether a node was removed.
pub fn unlink(chain: &mut Vec<ChainNode>, tag: vk::StructureType) -> bool {
    match chain.iter().position(|node| node.tag() == tag) {
        Some(position) => {
            chain.remove(position);
            true
        }
        None => false,
    }
}

/// Removes every node with the given tag. Returns the number removed.
pub fn purge_all(chain: &mut Vec<ChainNode>, tag: vk::StructureType) -> usize {
    let before = chain.len();
    chain.retain(|node| node.tag() != tag);
    before - chain.len()
}

/// Drops the feature structs of extensions that are not enabled.
///
/// A device request may only chain the feature struct of an extension it also
/// enables. Returns the names of the extensions whose structs were removed.
pub fn prune<N: AsRef<CStr>>(
    chain: &mut Vec<ChainNode>,
    known_extensions: &[N],
) -> Vec<&'static CStr> {
    let mut removed = Vec::new();
    for info in EXTENSIONS {
        if known_extensions.iter().any(|name| name.as_ref() == info.name) {
            continue;
        }
        if purge_all(chain, info.feature_struct) != 0 {
            log::debug!(
                "Unlinked the feature struct of disabled extension {:?}",
                info.name
            );
            removed.push(info.name);
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn other(raw: i32) -> ChainNode {
        ChainNode::Other(vk::StructureType::from_raw(raw))
    }

    fn tags(chain: &[ChainNode]) -> Vec<i32> {
        chain.iter().map(|node| node.tag().as_raw()).collect()
    }

    #[test]
    fn find_each_node() {
        let chain: Vec<_> = (1..=5).map(other).collect();
        for raw in 1..=5 {
            let tag = vk::StructureType::from_raw(raw);
            assert_eq!(find(&chain, tag).map(ChainNode::tag), Some(tag));
        }
        assert!(find(&chain, vk::StructureType::from_raw(6)).is_none());
        assert!(find(&[], vk::StructureType::from_raw(1)).is_none());
    }

    #[test]
    fn parent_of_nodes() {
        let chain: Vec<_> = (1..=3).map(other).collect();
        let tag = vk::StructureType::from_raw;
        assert_eq!(find_parent(&chain, tag(1)), Some(Parent::Head));
        assert_eq!(find_parent(&chain, tag(3)), Some(Parent::Node(1)));
        assert_eq!(find_parent(&chain, tag(4)), None);
    }

    #[test]
    fn unlink_keeps_order() {
        for removed in 1..=5 {
            let mut chain: Vec<_> = (1..=5).map(other).collect();
            assert!(unlink(&mut chain, vk::StructureType::from_raw(removed)));
            let expected: Vec<_> = (1..=5).filter(|&raw| raw != removed).collect();
            assert_eq!(tags(&chain), expected);
        }
    }

    #[test]
    fn unlink_missing() {
        let mut chain: Vec<_> = (1..=3).map(other).collect();
        assert!(!unlink(&mut chain, vk::StructureType::from_raw(9)));
        assert_eq!(tags(&chain), [1, 2, 3]);
    }

    #[test]
    fn unlink_removes_first_only() {
        let mut chain = vec![other(1), other(2), other(1)];
        assert!(unlink(&mut chain, vk::StructureType::from_raw(1)));
        assert_eq!(tags(&chain), [2, 1]);
    }

    #[test]
    fn purge_every_copy() {
        let mut chain = vec![other(1), other(2), other(1), other(3), other(1)];
        assert_eq!(purge_all(&mut chain, vk::StructureType::from_raw(1)), 3);
        assert_eq!(tags(&chain), [2, 3]);
        assert_eq!(purge_all(&mut chain, vk::StructureType::from_raw(1)), 0);
    }

    #[test]
    fn edit_in_place() {
        let mut chain = vec![
            other(1),
            ChainNode::Vulkan13Features(Default::default()),
        ];
        match find_mut(&mut chain, vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_3_FEATURES) {
            Some(&mut ChainNode::Vulkan13Features(ref mut features)) => {
                features.synchronization2 = vk::TRUE;
            }
            _ => panic!("Vulkan 1.3 features not found"),
        }
        match chain[1] {
            ChainNode::Vulkan13Features(ref features) => {
                assert_eq!(features.synchronization2, vk::TRUE)
            }
            _ => unreachable!(),
        }
        assert!(find_mut(&mut chain, vk::StructureType::from_raw(2)).is_none());
    }

    #[test]
    fn typed_nodes_report_their_tag() {
        let chain = vec![
            ChainNode::Vulkan12Features(Default::default()),
            ChainNode::ShaderSubgroupRotateFeatures(Default::default()),
        ];
        assert!(find(&chain, vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_2_FEATURES).is_some());
        assert_eq!(
            find_parent(&chain, SUBGROUP_ROTATE_FEATURES),
            Some(Parent::Node(0))
        );
    }

    #[test]
    fn prune_disabled_extensions() {
        let mut chain = vec![
            ChainNode::Vulkan12Features(Default::default()),
            ChainNode::ShaderAtomicInt64Features(Default::default()),
            ChainNode::IndexTypeUint8Features(Default::default()),
            other(7),
        ];
        let enabled = [c"VK_EXT_index_type_uint8", c"VK_KHR_swapchain"];
        assert_eq!(prune(&mut chain, &enabled), [c"VK_KHR_shader_atomic_int64"]);
        assert_eq!(
            tags(&chain),
            [
                vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_2_FEATURES.as_raw(),
                vk::StructureType::PHYSICAL_DEVICE_INDEX_TYPE_UINT8_FEATURES_EXT.as_raw(),
                7,
            ]
        );
        assert!(prune(&mut chain, &enabled).is_empty());
    }

    #[test]
    fn prune_reports_only_removals() {
        let mut chain = vec![other(1)];
        let enabled: [&CStr; 0] = [];
        assert!(prune(&mut chain, &enabled).is_empty());
        assert_eq!(tags(&chain), [1]);
    }
}
