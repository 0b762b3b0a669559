//! Observation of successful calls.
//!
//! Each checker inspects the arguments of one entry point, or one structure
//! handed to the driver, and marks the features that the arguments actually
//! engage. The layer must only report calls that succeeded.

use ash::vk;

use crate::{
    chain::{self, ChainNode},
    conv, ColorBlendDescriptor, DescriptorSetLayoutDescriptor, DeviceDescriptor, Extensions,
    Feature, FeatureRegistry, ShaderStageDescriptor,
};

impl FeatureRegistry {
    fn mark_if(&self, condition: bool, feature: Feature) {
        if condition {
            self.mark(feature);
        }
    }

    pub fn check_color_blend_state(&self, desc: &ColorBlendDescriptor) {
        self.mark_if(desc.logic_op_enable, Feature::LogicOp);
        if let Some((first, rest)) = desc.attachments.split_first() {
            self.mark_if(
                rest.iter().any(|other| !conv::blend_attachments_equal(first, other)),
                Feature::IndependentBlend,
            );
        }
        // Factors are validated even while blending is off.
        let dual_source = desc.attachments.iter().any(|at| {
            [
                at.src_color_blend_factor,
                at.dst_color_blend_factor,
                at.src_alpha_blend_factor,
                at.dst_alpha_blend_factor,
            ]
            .iter()
            .any(|&factor| conv::is_dual_source_factor(factor))
        });
        self.mark_if(dual_source, Feature::DualSrcBlend);
    }

    pub fn check_rasterization_state(&self, info: &vk::PipelineRasterizationStateCreateInfo) {
        self.mark_if(info.depth_clamp_enable != vk::FALSE, Feature::DepthClamp);
        self.mark_if(info.depth_bias_clamp != 0.0, Feature::DepthBiasClamp);
        self.mark_if(
            info.polygon_mode != vk::PolygonMode::FILL,
            Feature::FillModeNonSolid,
        );
        self.mark_if(info.line_width != 1.0, Feature::WideLines);
    }

    pub fn check_multisample_state(&self, info: &vk::PipelineMultisampleStateCreateInfo) {
        self.mark_if(
            info.sample_shading_enable != vk::FALSE,
            Feature::SampleRateShading,
        );
        self.mark_if(info.alpha_to_one_enable != vk::FALSE, Feature::AlphaToOne);
    }

    pub fn check_depth_stencil_state(&self, info: &vk::PipelineDepthStencilStateCreateInfo) {
        self.mark_if(
            info.depth_bounds_test_enable != vk::FALSE,
            Feature::DepthBounds,
        );
    }

    pub fn check_viewport_state(&self, info: &vk::PipelineViewportStateCreateInfo) {
        self.mark_if(
            info.viewport_count > 1 || info.scissor_count > 1,
            Feature::MultiViewport,
        );
    }

    pub fn check_shader_stage(&self, desc: &ShaderStageDescriptor) {
        use ash::vk::PipelineShaderStageCreateFlags as Pssf;
        use ash::vk::ShaderStageFlags as Ss;

        self.mark_if(desc.stage.contains(Ss::GEOMETRY), Feature::GeometryShader);
        self.mark_if(
            desc.stage
                .intersects(Ss::TESSELLATION_CONTROL | Ss::TESSELLATION_EVALUATION),
            Feature::TessellationShader,
        );
        let required_size = chain::find(
            desc.chain,
            vk::StructureType::PIPELINE_SHADER_STAGE_REQUIRED_SUBGROUP_SIZE_CREATE_INFO,
        );
        self.mark_if(
            desc.flags.contains(Pssf::ALLOW_VARYING_SUBGROUP_SIZE) || required_size.is_some(),
            Feature::SubgroupSizeControl,
        );
        self.mark_if(
            desc.flags.contains(Pssf::REQUIRE_FULL_SUBGROUPS),
            Feature::ComputeFullSubgroups,
        );
    }

    /// Flags of any graphics, compute or ray tracing pipeline.
    pub fn check_pipeline_flags(&self, flags: vk::PipelineCreateFlags) {
        self.mark_if(
            flags.intersects(
                vk::PipelineCreateFlags::FAIL_ON_PIPELINE_COMPILE_REQUIRED
                    | vk::PipelineCreateFlags::EARLY_RETURN_ON_FAILURE,
            ),
            Feature::PipelineCreationCacheControl,
        );
    }

    pub fn check_cmd_bind_index_buffer(&self, index_type: vk::IndexType) {
        if index_type == vk::IndexType::UINT8_EXT {
            self.mark_extensions(Extensions::INDEX_TYPE_UINT8);
        }
    }

    pub fn check_cmd_set_viewport(&self, first_viewport: u32, viewport_count: u32) {
        self.mark_if(
            first_viewport != 0 || viewport_count > 1,
            Feature::MultiViewport,
        );
    }

    pub fn check_cmd_set_scissor(&self, first_scissor: u32, scissor_count: u32) {
        self.mark_if(
            first_scissor != 0 || scissor_count > 1,
            Feature::MultiViewport,
        );
    }

    pub fn check_cmd_set_line_width(&self, line_width: f32) {
        self.mark_if(line_width != 1.0, Feature::WideLines);
    }

    /// `vkCmdDrawIndirect` and `vkCmdDrawIndexedIndirect`.
    pub fn check_cmd_draw_indirect(&self, draw_count: u32) {
        self.mark_if(draw_count > 1, Feature::MultiDrawIndirect);
    }

    /// `vkCmdDrawIndirectCount` and `vkCmdDrawIndexedIndirectCount`.
    pub fn check_cmd_draw_indirect_count(&self) {
        self.mark(Feature::DrawIndirectCount);
    }

    pub fn check_cmd_begin_query(&self, flags: vk::QueryControlFlags) {
        self.mark_if(
            flags.contains(vk::QueryControlFlags::PRECISE),
            Feature::OcclusionQueryPrecise,
        );
    }

    pub fn check_query_pool(&self, info: &vk::QueryPoolCreateInfo) {
        self.mark_if(
            info.query_type == vk::QueryType::PIPELINE_STATISTICS,
            Feature::PipelineStatisticsQuery,
        );
    }

    /// `vkResetQueryPool`, the host-side reset.
    pub fn check_reset_query_pool(&self) {
        self.mark(Feature::HostQueryReset);
    }

    pub fn check_sampler(&self, info: &vk::SamplerCreateInfo, chain: &[ChainNode]) {
        self.mark_if(
            info.anisotropy_enable != vk::FALSE,
            Feature::SamplerAnisotropy,
        );
        self.mark_if(
            [info.address_mode_u, info.address_mode_v, info.address_mode_w]
                .contains(&vk::SamplerAddressMode::MIRROR_CLAMP_TO_EDGE),
            Feature::SamplerMirrorClampToEdge,
        );
        // A chained reduction mode only matters if it asks for min or max.
        if let Some(&ChainNode::SamplerReductionModeCreateInfo(mode)) = chain::find(
            chain,
            vk::StructureType::SAMPLER_REDUCTION_MODE_CREATE_INFO,
        ) {
            self.mark_if(
                mode != vk::SamplerReductionMode::WEIGHTED_AVERAGE,
                Feature::SamplerFilterMinmax,
            );
        }
        self.mark_if(
            chain::find(chain, vk::StructureType::SAMPLER_YCBCR_CONVERSION_INFO).is_some(),
            Feature::SamplerYcbcrConversion,
        );
    }

    pub fn check_sampler_ycbcr_conversion(&self) {
        self.mark(Feature::SamplerYcbcrConversion);
    }

    pub fn check_image(&self, info: &vk::ImageCreateInfo) {
        use ash::vk::ImageCreateFlags as Icf;

        self.mark_if(info.flags.contains(Icf::SPARSE_BINDING), Feature::SparseBinding);
        if info.flags.contains(Icf::SPARSE_RESIDENCY) {
            if let Some(feature) = conv::sparse_residency_feature(info.image_type, info.samples) {
                self.mark(feature);
            }
        }
        self.mark_if(
            info.flags.contains(Icf::SPARSE_ALIASED),
            Feature::SparseResidencyAliased,
        );
        self.mark_if(info.flags.contains(Icf::PROTECTED), Feature::ProtectedMemory);
        self.mark_if(
            info.usage.contains(vk::ImageUsageFlags::STORAGE)
                && info.samples != vk::SampleCountFlags::TYPE_1,
            Feature::ShaderStorageImageMultisample,
        );
        if let Some(feature) = conv::compressed_format_feature(info.format) {
            self.mark(feature);
        }
    }

    pub fn check_image_view(&self, info: &vk::ImageViewCreateInfo) {
        self.mark_if(
            info.view_type == vk::ImageViewType::CUBE_ARRAY,
            Feature::ImageCubeArray,
        );
        if let Some(feature) = conv::compressed_format_feature(info.format) {
            self.mark(feature);
        }
    }

    pub fn check_buffer(&self, info: &vk::BufferCreateInfo) {
        use ash::vk::BufferCreateFlags as Bcf;

        self.mark_if(info.flags.contains(Bcf::SPARSE_BINDING), Feature::SparseBinding);
        self.mark_if(
            info.flags.contains(Bcf::SPARSE_RESIDENCY),
            Feature::SparseResidencyBuffer,
        );
        self.mark_if(
            info.flags.contains(Bcf::SPARSE_ALIASED),
            Feature::SparseResidencyAliased,
        );
        self.mark_if(info.flags.contains(Bcf::PROTECTED), Feature::ProtectedMemory);
        self.mark_if(
            info.usage
                .contains(vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS),
            Feature::BufferDeviceAddress,
        );
        if info.flags.contains(Bcf::DEVICE_ADDRESS_CAPTURE_REPLAY) {
            self.mark(Feature::BufferDeviceAddressCaptureReplay);
            self.mark(Feature::BufferDeviceAddress);
        }
    }

    /// `vkGetBufferDeviceAddress`.
    pub fn check_buffer_device_address(&self) {
        self.mark(Feature::BufferDeviceAddress);
    }

    pub fn check_command_pool(&self, info: &vk::CommandPoolCreateInfo) {
        self.mark_if(
            info.flags.contains(vk::CommandPoolCreateFlags::PROTECTED),
            Feature::ProtectedMemory,
        );
    }

    /// `vkBeginCommandBuffer`.
    ///
    /// The inheritance info of a begin info is only meaningful for secondary
    /// command buffers, and the level cannot be recovered from the call
    /// itself: the caller must pass the level the command buffer was
    /// allocated with.
    pub fn check_begin_command_buffer(
        &self,
        inheritance: Option<&vk::CommandBufferInheritanceInfo>,
        level: vk::CommandBufferLevel,
    ) {
        if level != vk::CommandBufferLevel::SECONDARY {
            return;
        }
        if let Some(inheritance) = inheritance {
            self.mark_if(
                inheritance.occlusion_query_enable != vk::FALSE,
                Feature::InheritedQueries,
            );
            self.mark_if(
                !inheritance.pipeline_statistics.is_empty(),
                Feature::PipelineStatisticsQuery,
            );
        }
    }

    /// `vkCreateSemaphore`, given the chain of its create info.
    pub fn check_semaphore(&self, chain: &[ChainNode]) {
        if let Some(&ChainNode::SemaphoreTypeCreateInfo(ref info)) =
            chain::find(chain, vk::StructureType::SEMAPHORE_TYPE_CREATE_INFO)
        {
            self.mark_if(
                info.semaphore_type == vk::SemaphoreType::TIMELINE,
                Feature::TimelineSemaphore,
            );
        }
    }

    pub fn check_framebuffer(&self, info: &vk::FramebufferCreateInfo) {
        self.mark_if(
            info.flags.contains(vk::FramebufferCreateFlags::IMAGELESS),
            Feature::ImagelessFramebuffer,
        );
    }

    /// `vkCreateRenderPass`, given the chain of its create info.
    pub fn check_render_pass(&self, chain: &[ChainNode]) {
        if let Some(&ChainNode::RenderPassMultiviewCreateInfo(ref view_masks)) =
            chain::find(chain, vk::StructureType::RENDER_PASS_MULTIVIEW_CREATE_INFO)
        {
            self.mark_if(view_masks.iter().any(|&mask| mask != 0), Feature::Multiview);
        }
    }

    /// `vkCmdBeginRendering`.
    pub fn check_cmd_begin_rendering(&self, view_mask: u32) {
        self.mark(Feature::DynamicRendering);
        self.mark_if(view_mask != 0, Feature::Multiview);
    }

    pub fn check_descriptor_set_layout(&self, desc: &DescriptorSetLayoutDescriptor) {
        use ash::vk::DescriptorBindingFlags as Dbf;

        self.mark_if(
            desc.bindings
                .iter()
                .any(|binding| binding.descriptor_type == vk::DescriptorType::INLINE_UNIFORM_BLOCK),
            Feature::InlineUniformBlock,
        );

        let binding_flags = match chain::find(
            desc.chain,
            vk::StructureType::DESCRIPTOR_SET_LAYOUT_BINDING_FLAGS_CREATE_INFO,
        ) {
            Some(&ChainNode::DescriptorSetLayoutBindingFlagsCreateInfo(ref flags)) => flags,
            _ => return,
        };
        // Flags are matched to bindings by position.
        for (binding, &flags) in desc.bindings.iter().zip(binding_flags.iter()) {
            self.mark_if(
                flags.contains(Dbf::PARTIALLY_BOUND),
                Feature::DescriptorBindingPartiallyBound,
            );
            self.mark_if(
                flags.contains(Dbf::VARIABLE_DESCRIPTOR_COUNT),
                Feature::DescriptorBindingVariableDescriptorCount,
            );
            self.mark_if(
                flags.contains(Dbf::UPDATE_UNUSED_WHILE_PENDING),
                Feature::DescriptorBindingUpdateUnusedWhilePending,
            );
            if flags.contains(Dbf::UPDATE_AFTER_BIND) {
                if let Some(feature) = conv::update_after_bind_feature(binding.descriptor_type) {
                    self.mark(feature);
                }
            }
        }
    }

    /// `vkCmdPipelineBarrier2`.
    pub fn check_cmd_pipeline_barrier2(&self) {
        self.mark(Feature::Synchronization2);
    }

    /// `vkQueueSubmit2`.
    pub fn check_queue_submit2(&self) {
        self.mark(Feature::Synchronization2);
    }

    /// `vkCreatePrivateDataSlot`.
    pub fn check_private_data_slot(&self) {
        self.mark(Feature::PrivateData);
    }

    /// `vkCreateDevice`.
    ///
    /// Chaining an extension's feature struct does not by itself engage the
    /// extension; one of its bits has to be enabled as well.
    pub fn check_device(&self, desc: &DeviceDescriptor) {
        if let Some(&ChainNode::ShaderAtomicInt64Features(ref features)) = chain::find(
            &desc.chain,
            vk::StructureType::PHYSICAL_DEVICE_SHADER_ATOMIC_INT64_FEATURES,
        ) {
            if features.shader_buffer_int64_atomics != vk::FALSE
                || features.shader_shared_int64_atomics != vk::FALSE
            {
                self.mark_extensions(Extensions::SHADER_ATOMIC_INT64);
            }
        }
    }
}
