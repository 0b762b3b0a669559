//! The table of tracked capabilities.
//!
//! Every optional Vulkan feature bit this crate knows how to observe is listed
//! exactly once in [`tracked_features!`] below, together with the feature
//! struct generation it lives in, its field in the `ash` mirror of that struct,
//! and its name as spelled by the Vulkan specification. Checkers mark entries
//! of this table and adjusters walk it, so both sides always agree on the
//! field set.

use ash::vk;
use bitflags::bitflags;

use std::{ffi::CStr, fmt};

/// Versioned grouping of feature bits, mirroring Vulkan's feature structs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Generation {
    /// `VkPhysicalDeviceFeatures`, always available.
    Core10,
    /// `VkPhysicalDeviceVulkan11Features`.
    Core11,
    /// `VkPhysicalDeviceVulkan12Features`.
    Core12,
    /// `VkPhysicalDeviceVulkan13Features`.
    Core13,
}

/// A feature struct whose fields can be narrowed against observed usage.
pub trait FeatureStruct: 'static {
    const GENERATION: Generation;

    /// Mutable access to the field backing `feature`, or `None` if the
    /// feature belongs to another generation.
    fn field_mut(&mut self, feature: Feature) -> Option<&mut vk::Bool32>;

    /// Untracked fields that are only valid while a tracked field is enabled.
    fn dependents() -> &'static [Dependent<Self>]
    where
        Self: Sized,
    {
        &[]
    }
}

/// An untracked field that must be cleared together with its prerequisite.
pub struct Dependent<S> {
    pub name: &'static str,
    pub requires: Feature,
    pub field: fn(&mut S) -> &mut vk::Bool32,
}

macro_rules! tracked_features {
    ($(
        $generation:ident => $ty:ty {
            $( $variant:ident : $field:ident = $name:literal, )*
        }
    )*) => {
        /// A tracked optional capability.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Feature {
            $( $( $variant, )* )*
        }

        impl Feature {
            /// Every tracked feature, in table order.
            pub const ALL: &'static [Feature] = &[ $( $( Feature::$variant, )* )* ];
            pub const COUNT: usize = Self::ALL.len();

            pub fn generation(self) -> Generation {
                match self {
                    $( $( Feature::$variant )|* => Generation::$generation, )*
                }
            }

            /// Field name as spelled by the Vulkan specification.
            pub fn name(self) -> &'static str {
                match self {
                    $( $( Feature::$variant => $name, )* )*
                }
            }
        }

        $(
            impl FeatureStruct for $ty {
                const GENERATION: Generation = Generation::$generation;

                #[allow(unreachable_patterns)]
                fn field_mut(&mut self, feature: Feature) -> Option<&mut vk::Bool32> {
                    match feature {
                        $( Feature::$variant => Some(&mut self.$field), )*
                        _ => None,
                    }
                }

                fn dependents() -> &'static [Dependent<Self>] {
                    dependents::$generation
                }
            }
        )*
    };
}

tracked_features! {
    Core10 => vk::PhysicalDeviceFeatures {
        ImageCubeArray: image_cube_array = "imageCubeArray",
        IndependentBlend: independent_blend = "independentBlend",
        GeometryShader: geometry_shader = "geometryShader",
        TessellationShader: tessellation_shader = "tessellationShader",
        SampleRateShading: sample_rate_shading = "sampleRateShading",
        DualSrcBlend: dual_src_blend = "dualSrcBlend",
        LogicOp: logic_op = "logicOp",
        MultiDrawIndirect: multi_draw_indirect = "multiDrawIndirect",
        DepthClamp: depth_clamp = "depthClamp",
        DepthBiasClamp: depth_bias_clamp = "depthBiasClamp",
        FillModeNonSolid: fill_mode_non_solid = "fillModeNonSolid",
        DepthBounds: depth_bounds = "depthBounds",
        WideLines: wide_lines = "wideLines",
        AlphaToOne: alpha_to_one = "alphaToOne",
        MultiViewport: multi_viewport = "multiViewport",
        SamplerAnisotropy: sampler_anisotropy = "samplerAnisotropy",
        TextureCompressionEtc2: texture_compression_etc2 = "textureCompressionETC2",
        TextureCompressionAstcLdr: texture_compression_astc_ldr = "textureCompressionASTC_LDR",
        TextureCompressionBc: texture_compression_bc = "textureCompressionBC",
        OcclusionQueryPrecise: occlusion_query_precise = "occlusionQueryPrecise",
        PipelineStatisticsQuery: pipeline_statistics_query = "pipelineStatisticsQuery",
        ShaderTessellationAndGeometryPointSize: shader_tessellation_and_geometry_point_size = "shaderTessellationAndGeometryPointSize",
        ShaderImageGatherExtended: shader_image_gather_extended = "shaderImageGatherExtended",
        ShaderStorageImageExtendedFormats: shader_storage_image_extended_formats = "shaderStorageImageExtendedFormats",
        ShaderStorageImageMultisample: shader_storage_image_multisample = "shaderStorageImageMultisample",
        ShaderStorageImageReadWithoutFormat: shader_storage_image_read_without_format = "shaderStorageImageReadWithoutFormat",
        ShaderStorageImageWriteWithoutFormat: shader_storage_image_write_without_format = "shaderStorageImageWriteWithoutFormat",
        ShaderUniformBufferArrayDynamicIndexing: shader_uniform_buffer_array_dynamic_indexing = "shaderUniformBufferArrayDynamicIndexing",
        ShaderSampledImageArrayDynamicIndexing: shader_sampled_image_array_dynamic_indexing = "shaderSampledImageArrayDynamicIndexing",
        ShaderStorageBufferArrayDynamicIndexing: shader_storage_buffer_array_dynamic_indexing = "shaderStorageBufferArrayDynamicIndexing",
        ShaderStorageImageArrayDynamicIndexing: shader_storage_image_array_dynamic_indexing = "shaderStorageImageArrayDynamicIndexing",
        ShaderClipDistance: shader_clip_distance = "shaderClipDistance",
        ShaderCullDistance: shader_cull_distance = "shaderCullDistance",
        ShaderFloat64: shader_float64 = "shaderFloat64",
        ShaderInt64: shader_int64 = "shaderInt64",
        ShaderInt16: shader_int16 = "shaderInt16",
        ShaderResourceResidency: shader_resource_residency = "shaderResourceResidency",
        ShaderResourceMinLod: shader_resource_min_lod = "shaderResourceMinLod",
        SparseBinding: sparse_binding = "sparseBinding",
        SparseResidencyBuffer: sparse_residency_buffer = "sparseResidencyBuffer",
        SparseResidencyImage2D: sparse_residency_image2_d = "sparseResidencyImage2D",
        SparseResidencyImage3D: sparse_residency_image3_d = "sparseResidencyImage3D",
        SparseResidency2Samples: sparse_residency2_samples = "sparseResidency2Samples",
        SparseResidency4Samples: sparse_residency4_samples = "sparseResidency4Samples",
        SparseResidency8Samples: sparse_residency8_samples = "sparseResidency8Samples",
        SparseResidency16Samples: sparse_residency16_samples = "sparseResidency16Samples",
        SparseResidencyAliased: sparse_residency_aliased = "sparseResidencyAliased",
        InheritedQueries: inherited_queries = "inheritedQueries",
    }
    Core11 => vk::PhysicalDeviceVulkan11Features {
        StorageBuffer16BitAccess: storage_buffer16_bit_access = "storageBuffer16BitAccess",
        UniformAndStorageBuffer16BitAccess: uniform_and_storage_buffer16_bit_access = "uniformAndStorageBuffer16BitAccess",
        StoragePushConstant16: storage_push_constant16 = "storagePushConstant16",
        StorageInputOutput16: storage_input_output16 = "storageInputOutput16",
        Multiview: multiview = "multiview",
        VariablePointersStorageBuffer: variable_pointers_storage_buffer = "variablePointersStorageBuffer",
        VariablePointers: variable_pointers = "variablePointers",
        ProtectedMemory: protected_memory = "protectedMemory",
        SamplerYcbcrConversion: sampler_ycbcr_conversion = "samplerYcbcrConversion",
        ShaderDrawParameters: shader_draw_parameters = "shaderDrawParameters",
    }
    Core12 => vk::PhysicalDeviceVulkan12Features {
        SamplerMirrorClampToEdge: sampler_mirror_clamp_to_edge = "samplerMirrorClampToEdge",
        DrawIndirectCount: draw_indirect_count = "drawIndirectCount",
        StorageBuffer8BitAccess: storage_buffer8_bit_access = "storageBuffer8BitAccess",
        UniformAndStorageBuffer8BitAccess: uniform_and_storage_buffer8_bit_access = "uniformAndStorageBuffer8BitAccess",
        StoragePushConstant8: storage_push_constant8 = "storagePushConstant8",
        ShaderFloat16: shader_float16 = "shaderFloat16",
        ShaderInt8: shader_int8 = "shaderInt8",
        ShaderInputAttachmentArrayDynamicIndexing: shader_input_attachment_array_dynamic_indexing = "shaderInputAttachmentArrayDynamicIndexing",
        ShaderUniformTexelBufferArrayDynamicIndexing: shader_uniform_texel_buffer_array_dynamic_indexing = "shaderUniformTexelBufferArrayDynamicIndexing",
        ShaderStorageTexelBufferArrayDynamicIndexing: shader_storage_texel_buffer_array_dynamic_indexing = "shaderStorageTexelBufferArrayDynamicIndexing",
        ShaderUniformBufferArrayNonUniformIndexing: shader_uniform_buffer_array_non_uniform_indexing = "shaderUniformBufferArrayNonUniformIndexing",
        ShaderSampledImageArrayNonUniformIndexing: shader_sampled_image_array_non_uniform_indexing = "shaderSampledImageArrayNonUniformIndexing",
        ShaderStorageBufferArrayNonUniformIndexing: shader_storage_buffer_array_non_uniform_indexing = "shaderStorageBufferArrayNonUniformIndexing",
        ShaderStorageImageArrayNonUniformIndexing: shader_storage_image_array_non_uniform_indexing = "shaderStorageImageArrayNonUniformIndexing",
        ShaderInputAttachmentArrayNonUniformIndexing: shader_input_attachment_array_non_uniform_indexing = "shaderInputAttachmentArrayNonUniformIndexing",
        ShaderUniformTexelBufferArrayNonUniformIndexing: shader_uniform_texel_buffer_array_non_uniform_indexing = "shaderUniformTexelBufferArrayNonUniformIndexing",
        ShaderStorageTexelBufferArrayNonUniformIndexing: shader_storage_texel_buffer_array_non_uniform_indexing = "shaderStorageTexelBufferArrayNonUniformIndexing",
        DescriptorBindingUniformBufferUpdateAfterBind: descriptor_binding_uniform_buffer_update_after_bind = "descriptorBindingUniformBufferUpdateAfterBind",
        DescriptorBindingSampledImageUpdateAfterBind: descriptor_binding_sampled_image_update_after_bind = "descriptorBindingSampledImageUpdateAfterBind",
        DescriptorBindingStorageImageUpdateAfterBind: descriptor_binding_storage_image_update_after_bind = "descriptorBindingStorageImageUpdateAfterBind",
        DescriptorBindingStorageBufferUpdateAfterBind: descriptor_binding_storage_buffer_update_after_bind = "descriptorBindingStorageBufferUpdateAfterBind",
        DescriptorBindingUniformTexelBufferUpdateAfterBind: descriptor_binding_uniform_texel_buffer_update_after_bind = "descriptorBindingUniformTexelBufferUpdateAfterBind",
        DescriptorBindingStorageTexelBufferUpdateAfterBind: descriptor_binding_storage_texel_buffer_update_after_bind = "descriptorBindingStorageTexelBufferUpdateAfterBind",
        DescriptorBindingUpdateUnusedWhilePending: descriptor_binding_update_unused_while_pending = "descriptorBindingUpdateUnusedWhilePending",
        DescriptorBindingPartiallyBound: descriptor_binding_partially_bound = "descriptorBindingPartiallyBound",
        DescriptorBindingVariableDescriptorCount: descriptor_binding_variable_descriptor_count = "descriptorBindingVariableDescriptorCount",
        RuntimeDescriptorArray: runtime_descriptor_array = "runtimeDescriptorArray",
        SamplerFilterMinmax: sampler_filter_minmax = "samplerFilterMinmax",
        ImagelessFramebuffer: imageless_framebuffer = "imagelessFramebuffer",
        HostQueryReset: host_query_reset = "hostQueryReset",
        TimelineSemaphore: timeline_semaphore = "timelineSemaphore",
        BufferDeviceAddress: buffer_device_address = "bufferDeviceAddress",
        BufferDeviceAddressCaptureReplay: buffer_device_address_capture_replay = "bufferDeviceAddressCaptureReplay",
        VulkanMemoryModel: vulkan_memory_model = "vulkanMemoryModel",
        VulkanMemoryModelDeviceScope: vulkan_memory_model_device_scope = "vulkanMemoryModelDeviceScope",
        ShaderOutputViewportIndex: shader_output_viewport_index = "shaderOutputViewportIndex",
        ShaderOutputLayer: shader_output_layer = "shaderOutputLayer",
    }
    Core13 => vk::PhysicalDeviceVulkan13Features {
        InlineUniformBlock: inline_uniform_block = "inlineUniformBlock",
        DescriptorBindingInlineUniformBlockUpdateAfterBind: descriptor_binding_inline_uniform_block_update_after_bind = "descriptorBindingInlineUniformBlockUpdateAfterBind",
        PipelineCreationCacheControl: pipeline_creation_cache_control = "pipelineCreationCacheControl",
        PrivateData: private_data = "privateData",
        ShaderDemoteToHelperInvocation: shader_demote_to_helper_invocation = "shaderDemoteToHelperInvocation",
        SubgroupSizeControl: subgroup_size_control = "subgroupSizeControl",
        ComputeFullSubgroups: compute_full_subgroups = "computeFullSubgroups",
        Synchronization2: synchronization2 = "synchronization2",
        TextureCompressionAstcHdr: texture_compression_astc_hdr = "textureCompressionASTC_HDR",
        DynamicRendering: dynamic_rendering = "dynamicRendering",
        ShaderIntegerDotProduct: shader_integer_dot_product = "shaderIntegerDotProduct",
    }
}

// `FeatureSet` packs the table into a single word.
const _: () = assert!(Feature::COUNT <= 128);

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[allow(non_upper_case_globals)]
mod dependents {
    use super::{Dependent, Feature};
    use ash::vk;

    fn multiview_geometry_shader(f: &mut vk::PhysicalDeviceVulkan11Features) -> &mut vk::Bool32 {
        &mut f.multiview_geometry_shader
    }

    fn multiview_tessellation_shader(
        f: &mut vk::PhysicalDeviceVulkan11Features,
    ) -> &mut vk::Bool32 {
        &mut f.multiview_tessellation_shader
    }

    fn buffer_device_address_multi_device(
        f: &mut vk::PhysicalDeviceVulkan12Features,
    ) -> &mut vk::Bool32 {
        &mut f.buffer_device_address_multi_device
    }

    fn vulkan_memory_model_availability_visibility_chains(
        f: &mut vk::PhysicalDeviceVulkan12Features,
    ) -> &mut vk::Bool32 {
        &mut f.vulkan_memory_model_availability_visibility_chains
    }

    pub(super) const Core10: &[Dependent<vk::PhysicalDeviceFeatures>] = &[];

    pub(super) const Core11: &[Dependent<vk::PhysicalDeviceVulkan11Features>] = &[
        Dependent {
            name: "multiviewGeometryShader",
            requires: Feature::Multiview,
            field: multiview_geometry_shader,
        },
        Dependent {
            name: "multiviewTessellationShader",
            requires: Feature::Multiview,
            field: multiview_tessellation_shader,
        },
    ];

    pub(super) const Core12: &[Dependent<vk::PhysicalDeviceVulkan12Features>] = &[
        Dependent {
            name: "bufferDeviceAddressMultiDevice",
            requires: Feature::BufferDeviceAddress,
            field: buffer_device_address_multi_device,
        },
        Dependent {
            name: "vulkanMemoryModelAvailabilityVisibilityChains",
            requires: Feature::VulkanMemoryModel,
            field: vulkan_memory_model_availability_visibility_chains,
        },
    ];

    pub(super) const Core13: &[Dependent<vk::PhysicalDeviceVulkan13Features>] = &[];
}

/// A set of [`Feature`]s.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureSet(u128);

impl FeatureSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    fn bit(feature: Feature) -> u128 {
        1 << feature as u32
    }

    pub fn insert(&mut self, feature: Feature) {
        self.0 |= Self::bit(feature);
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.0 & Self::bit(feature) != 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.iter().copied().filter(move |&f| self.contains(f))
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut set = Self::empty();
        set.extend(iter);
        set
    }
}

impl Extend<Feature> for FeatureSet {
    fn extend<I: IntoIterator<Item = Feature>>(&mut self, iter: I) {
        for feature in iter {
            self.insert(feature);
        }
    }
}

bitflags! {
    /// Extensions whose behavior was observed, independent of any core
    /// feature bit they alias.
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[repr(transparent)]
    pub struct Extensions: u32 {
        const SHADER_ATOMIC_INT64 = 1 << 0;
        const SHADER_SUBGROUP_ROTATE = 1 << 1;
        const INDEX_TYPE_UINT8 = 1 << 2;
        const SHADER_DEMOTE_TO_HELPER_INVOCATION = 1 << 3;
    }
}

impl Default for Extensions {
    fn default() -> Self {
        Self::empty()
    }
}

/// `VK_STRUCTURE_TYPE_PHYSICAL_DEVICE_SHADER_SUBGROUP_ROTATE_FEATURES_KHR`
pub const SUBGROUP_ROTATE_FEATURES: vk::StructureType = vk::StructureType::from_raw(1_000_416_000);

/// An entry of the extension table.
#[derive(Clone, Copy, Debug)]
pub struct ExtensionInfo {
    pub flag: Extensions,
    pub name: &'static CStr,
    /// Tag of the feature struct the extension adds to device creation.
    pub feature_struct: vk::StructureType,
}

pub const EXTENSIONS: &[ExtensionInfo] = &[
    ExtensionInfo {
        flag: Extensions::SHADER_ATOMIC_INT64,
        name: c"VK_KHR_shader_atomic_int64",
        feature_struct: vk::StructureType::PHYSICAL_DEVICE_SHADER_ATOMIC_INT64_FEATURES,
    },
    ExtensionInfo {
        flag: Extensions::SHADER_SUBGROUP_ROTATE,
        name: c"VK_KHR_shader_subgroup_rotate",
        feature_struct: SUBGROUP_ROTATE_FEATURES,
    },
    ExtensionInfo {
        flag: Extensions::INDEX_TYPE_UINT8,
        name: c"VK_EXT_index_type_uint8",
        feature_struct: vk::StructureType::PHYSICAL_DEVICE_INDEX_TYPE_UINT8_FEATURES_EXT,
    },
    ExtensionInfo {
        flag: Extensions::SHADER_DEMOTE_TO_HELPER_INVOCATION,
        name: c"VK_EXT_shader_demote_to_helper_invocation",
        feature_struct: vk::StructureType::PHYSICAL_DEVICE_SHADER_DEMOTE_TO_HELPER_INVOCATION_FEATURES,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn field_exists(feature: Feature) -> bool {
        match feature.generation() {
            Generation::Core10 => vk::PhysicalDeviceFeatures::default()
                .field_mut(feature)
                .is_some(),
            Generation::Core11 => vk::PhysicalDeviceVulkan11Features::default()
                .field_mut(feature)
                .is_some(),
            Generation::Core12 => vk::PhysicalDeviceVulkan12Features::default()
                .field_mut(feature)
                .is_some(),
            Generation::Core13 => vk::PhysicalDeviceVulkan13Features::default()
                .field_mut(feature)
                .is_some(),
        }
    }

    #[test]
    fn every_feature_has_a_field() {
        for &feature in Feature::ALL {
            assert!(field_exists(feature), "{} has no field", feature);
        }
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = Feature::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), Feature::COUNT);
    }

    #[test]
    fn generations_are_contiguous() {
        let generations: Vec<_> = Feature::ALL.iter().map(|f| f.generation()).collect();
        let mut sorted = generations.clone();
        sorted.sort();
        assert_eq!(generations, sorted);
    }

    #[test]
    fn field_mut_rejects_other_generations() {
        let mut core = vk::PhysicalDeviceFeatures::default();
        assert!(core.field_mut(Feature::TimelineSemaphore).is_none());
        *core.field_mut(Feature::LogicOp).unwrap() = vk::TRUE;
        assert_eq!(core.logic_op, vk::TRUE);
    }

    #[test]
    fn feature_set() {
        let mut set = FeatureSet::empty();
        assert!(set.is_empty());
        set.insert(Feature::LogicOp);
        set.insert(Feature::ShaderIntegerDotProduct);
        set.insert(Feature::LogicOp);
        assert_eq!(set.len(), 2);
        assert!(set.contains(Feature::ShaderIntegerDotProduct));
        assert!(!set.contains(Feature::WideLines));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            [Feature::LogicOp, Feature::ShaderIntegerDotProduct]
        );
    }

    #[test]
    fn extension_table_is_complete() {
        let all = EXTENSIONS
            .iter()
            .fold(Extensions::empty(), |acc, info| acc | info.flag);
        assert_eq!(all, Extensions::all());
    }
}
