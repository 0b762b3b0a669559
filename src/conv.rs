use ash::vk;

use crate::Feature;

/// The texture compression feature required to create images of `format`.
pub fn compressed_format_feature(format: vk::Format) -> Option<Feature> {
    use ash::vk::Format as F;
    let raw = format.as_raw();
    let within = |first: F, last: F| (first.as_raw()..=last.as_raw()).contains(&raw);
    if within(F::BC1_RGB_UNORM_BLOCK, F::BC7_SRGB_BLOCK) {
        Some(Feature::TextureCompressionBc)
    } else if within(F::ETC2_R8G8B8_UNORM_BLOCK, F::EAC_R11G11_SNORM_BLOCK) {
        Some(Feature::TextureCompressionEtc2)
    } else if within(F::ASTC_4X4_UNORM_BLOCK, F::ASTC_12X12_SRGB_BLOCK) {
        Some(Feature::TextureCompressionAstcLdr)
    } else if within(F::ASTC_4X4_SFLOAT_BLOCK, F::ASTC_12X12_SFLOAT_BLOCK) {
        Some(Feature::TextureCompressionAstcHdr)
    } else {
        None
    }
}

/// Whether the factor reads the second color output of the fragment shader.
pub fn is_dual_source_factor(factor: vk::BlendFactor) -> bool {
    use ash::vk::BlendFactor as Bf;
    match factor {
        Bf::SRC1_COLOR | Bf::ONE_MINUS_SRC1_COLOR | Bf::SRC1_ALPHA | Bf::ONE_MINUS_SRC1_ALPHA => {
            true
        }
        _ => false,
    }
}

/// Member-wise equality. Without `independentBlend` every attachment must
/// be identical, including the equations of attachments that do not blend.
pub fn blend_attachments_equal(
    a: &vk::PipelineColorBlendAttachmentState,
    b: &vk::PipelineColorBlendAttachmentState,
) -> bool {
    a.blend_enable == b.blend_enable
        && a.color_write_mask == b.color_write_mask
        && a.src_color_blend_factor == b.src_color_blend_factor
        && a.dst_color_blend_factor == b.dst_color_blend_factor
        && a.color_blend_op == b.color_blend_op
        && a.src_alpha_blend_factor == b.src_alpha_blend_factor
        && a.dst_alpha_blend_factor == b.dst_alpha_blend_factor
        && a.alpha_blend_op == b.alpha_blend_op
}

/// The update-after-bind feature covering descriptors of type `ty`.
pub fn update_after_bind_feature(ty: vk::DescriptorType) -> Option<Feature> {
    use ash::vk::DescriptorType as Dt;
    Some(match ty {
        Dt::UNIFORM_BUFFER => Feature::DescriptorBindingUniformBufferUpdateAfterBind,
        Dt::SAMPLER | Dt::SAMPLED_IMAGE | Dt::COMBINED_IMAGE_SAMPLER => {
            Feature::DescriptorBindingSampledImageUpdateAfterBind
        }
        Dt::STORAGE_IMAGE => Feature::DescriptorBindingStorageImageUpdateAfterBind,
        Dt::STORAGE_BUFFER => Feature::DescriptorBindingStorageBufferUpdateAfterBind,
        Dt::UNIFORM_TEXEL_BUFFER => Feature::DescriptorBindingUniformTexelBufferUpdateAfterBind,
        Dt::STORAGE_TEXEL_BUFFER => Feature::DescriptorBindingStorageTexelBufferUpdateAfterBind,
        Dt::INLINE_UNIFORM_BLOCK => Feature::DescriptorBindingInlineUniformBlockUpdateAfterBind,
        _ => return None,
    })
}

/// The sparse residency feature needed by an image of the given shape.
pub fn sparse_residency_feature(
    image_type: vk::ImageType,
    samples: vk::SampleCountFlags,
) -> Option<Feature> {
    use ash::vk::SampleCountFlags as Sc;
    match image_type {
        vk::ImageType::TYPE_3D => Some(Feature::SparseResidencyImage3D),
        vk::ImageType::TYPE_2D => match samples {
            Sc::TYPE_1 => Some(Feature::SparseResidencyImage2D),
            Sc::TYPE_2 => Some(Feature::SparseResidency2Samples),
            Sc::TYPE_4 => Some(Feature::SparseResidency4Samples),
            Sc::TYPE_8 => Some(Feature::SparseResidency8Samples),
            Sc::TYPE_16 => Some(Feature::SparseResidency16Samples),
            _ => None,
        },
        _ => None,
    }
}
