/*! SPIR-V capability scanner.

A SPIR-V module starts with a five word header (magic, version, generator,
bound, schema) followed by instructions. Each instruction's first word packs
the word count into the high half and the opcode into the low half.

All `OpCapability` declarations come before the module's single
`OpMemoryModel`, so the scan stops there and never visits the bulk of the
module.
!*/

use num_traits::cast::FromPrimitive;
use thiserror::Error;

use crate::{Extensions, Feature, FeatureRegistry, UsageSet};

pub const HEADER_WORDS: usize = 5;

// Capabilities newer than the grammar bundled with the `spirv` crate.
const CAPABILITY_DEMOTE_TO_HELPER_INVOCATION: spirv::Word = 5379;
const CAPABILITY_DOT_PRODUCT_INPUT_ALL: spirv::Word = 6016;
const CAPABILITY_DOT_PRODUCT: spirv::Word = 6019;
const CAPABILITY_GROUP_NON_UNIFORM_ROTATE: spirv::Word = 6026;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ScanError {
    #[error("module length {0} is not a multiple of the word size")]
    UnalignedLength(usize),
    #[error("module of {0} words is too short for a header")]
    MissingHeader(usize),
    #[error("invalid magic number {0:#010x}")]
    InvalidMagic(u32),
}

/// Reassemble the words of a module stored as bytes, in either endianness.
pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<spirv::Word>, ScanError> {
    if bytes.len() % 4 != 0 {
        return Err(ScanError::UnalignedLength(bytes.len()));
    }
    let mut words: Vec<_> = bytes
        .chunks_exact(4)
        .map(|c| spirv::Word::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if words.len() < HEADER_WORDS {
        return Err(ScanError::MissingHeader(words.len()));
    }
    match words[0] {
        spirv::MAGIC_NUMBER => {}
        magic if magic.swap_bytes() == spirv::MAGIC_NUMBER => {
            for word in words.iter_mut() {
                *word = word.swap_bytes();
            }
        }
        magic => return Err(ScanError::InvalidMagic(magic)),
    }
    Ok(words)
}

/// Collect the usage declared by the capabilities of a module.
///
/// Scanning stops at `OpMemoryModel`, at the end of `words`, or at an
/// instruction that is malformed or truncated.
pub fn scan(words: &[spirv::Word]) -> UsageSet {
    let mut usage = UsageSet::default();
    let mut cursor = HEADER_WORDS;
    while let Some(&word) = words.get(cursor) {
        let (word_count, opcode) = ((word >> 16) as usize, (word & 0xffff) as u16);
        if word_count == 0 {
            log::warn!("Zero word count at offset {}, stopping scan", cursor);
            break;
        }
        if opcode == spirv::Op::MemoryModel as u16 {
            break;
        }
        if opcode == spirv::Op::Capability as u16 {
            match words.get(cursor + 1) {
                Some(&capability) if word_count >= 2 => {
                    let (features, extensions) = capability_usage(capability);
                    usage.features.extend(features.iter().copied());
                    usage.extensions |= extensions;
                }
                _ => {
                    log::warn!("Truncated OpCapability at offset {}", cursor);
                    break;
                }
            }
        }
        cursor += word_count;
    }
    usage
}

/// Features and extension behavior implied by declaring `capability`.
fn capability_usage(capability: spirv::Word) -> (&'static [Feature], Extensions) {
    use spirv::Capability as C;
    use Feature as F;

    match capability {
        CAPABILITY_DEMOTE_TO_HELPER_INVOCATION => {
            return (
                &[F::ShaderDemoteToHelperInvocation],
                Extensions::SHADER_DEMOTE_TO_HELPER_INVOCATION,
            )
        }
        CAPABILITY_DOT_PRODUCT_INPUT_ALL..=CAPABILITY_DOT_PRODUCT => {
            return (&[F::ShaderIntegerDotProduct], Extensions::empty())
        }
        CAPABILITY_GROUP_NON_UNIFORM_ROTATE => {
            return (&[], Extensions::SHADER_SUBGROUP_ROTATE)
        }
        _ => {}
    }

    let capability = match C::from_u32(capability) {
        Some(capability) => capability,
        None => return (&[], Extensions::empty()),
    };
    let features: &'static [Feature] = match capability {
        C::Geometry => &[F::GeometryShader],
        C::Tessellation => &[F::TessellationShader],
        C::Float64 => &[F::ShaderFloat64],
        C::Int64 => &[F::ShaderInt64],
        C::Int64Atomics => return (&[F::ShaderInt64], Extensions::SHADER_ATOMIC_INT64),
        C::Int16 => &[F::ShaderInt16],
        C::TessellationPointSize | C::GeometryPointSize => {
            &[F::ShaderTessellationAndGeometryPointSize]
        }
        C::ImageGatherExtended => &[F::ShaderImageGatherExtended],
        C::StorageImageMultisample => &[F::ShaderStorageImageMultisample],
        C::UniformBufferArrayDynamicIndexing => &[F::ShaderUniformBufferArrayDynamicIndexing],
        C::SampledImageArrayDynamicIndexing => &[F::ShaderSampledImageArrayDynamicIndexing],
        C::StorageBufferArrayDynamicIndexing => &[F::ShaderStorageBufferArrayDynamicIndexing],
        C::StorageImageArrayDynamicIndexing => &[F::ShaderStorageImageArrayDynamicIndexing],
        C::ClipDistance => &[F::ShaderClipDistance],
        C::CullDistance => &[F::ShaderCullDistance],
        C::ImageCubeArray | C::SampledCubeArray => &[F::ImageCubeArray],
        C::SampleRateShading => &[F::SampleRateShading],
        C::SparseResidency => &[F::ShaderResourceResidency],
        C::MinLod => &[F::ShaderResourceMinLod],
        C::StorageImageExtendedFormats => &[F::ShaderStorageImageExtendedFormats],
        C::StorageImageReadWithoutFormat => &[F::ShaderStorageImageReadWithoutFormat],
        C::StorageImageWriteWithoutFormat => &[F::ShaderStorageImageWriteWithoutFormat],
        C::MultiViewport => &[F::MultiViewport],
        C::Float16 => &[F::ShaderFloat16],
        C::Int8 => &[F::ShaderInt8],
        C::ShaderLayer => &[F::ShaderOutputLayer],
        C::ShaderViewportIndex => &[F::ShaderOutputViewportIndex],
        C::DrawParameters => &[F::ShaderDrawParameters],
        C::StorageBuffer16BitAccess => &[F::StorageBuffer16BitAccess],
        C::UniformAndStorageBuffer16BitAccess => &[F::UniformAndStorageBuffer16BitAccess],
        C::StoragePushConstant16 => &[F::StoragePushConstant16],
        C::StorageInputOutput16 => &[F::StorageInputOutput16],
        C::MultiView => &[F::Multiview],
        C::VariablePointersStorageBuffer => &[F::VariablePointersStorageBuffer],
        C::VariablePointers => &[F::VariablePointers, F::VariablePointersStorageBuffer],
        C::StorageBuffer8BitAccess => &[F::StorageBuffer8BitAccess],
        C::UniformAndStorageBuffer8BitAccess => &[F::UniformAndStorageBuffer8BitAccess],
        C::StoragePushConstant8 => &[F::StoragePushConstant8],
        C::RuntimeDescriptorArray => &[F::RuntimeDescriptorArray],
        C::InputAttachmentArrayDynamicIndexing => &[F::ShaderInputAttachmentArrayDynamicIndexing],
        C::UniformTexelBufferArrayDynamicIndexing => {
            &[F::ShaderUniformTexelBufferArrayDynamicIndexing]
        }
        C::StorageTexelBufferArrayDynamicIndexing => {
            &[F::ShaderStorageTexelBufferArrayDynamicIndexing]
        }
        C::UniformBufferArrayNonUniformIndexing => {
            &[F::ShaderUniformBufferArrayNonUniformIndexing]
        }
        C::SampledImageArrayNonUniformIndexing => &[F::ShaderSampledImageArrayNonUniformIndexing],
        C::StorageBufferArrayNonUniformIndexing => {
            &[F::ShaderStorageBufferArrayNonUniformIndexing]
        }
        C::StorageImageArrayNonUniformIndexing => &[F::ShaderStorageImageArrayNonUniformIndexing],
        C::InputAttachmentArrayNonUniformIndexing => {
            &[F::ShaderInputAttachmentArrayNonUniformIndexing]
        }
        C::UniformTexelBufferArrayNonUniformIndexing => {
            &[F::ShaderUniformTexelBufferArrayNonUniformIndexing]
        }
        C::StorageTexelBufferArrayNonUniformIndexing => {
            &[F::ShaderStorageTexelBufferArrayNonUniformIndexing]
        }
        C::VulkanMemoryModel => &[F::VulkanMemoryModel],
        C::VulkanMemoryModelDeviceScope => {
            &[F::VulkanMemoryModelDeviceScope, F::VulkanMemoryModel]
        }
        _ => &[],
    };
    (features, Extensions::empty())
}

impl FeatureRegistry {
    /// Record the capabilities declared by a shader module.
    pub fn check_shader_module(&self, words: &[spirv::Word]) -> UsageSet {
        let usage = scan(words);
        self.record(&usage);
        usage
    }

    /// Like [`check_shader_module`](Self::check_shader_module), for a module
    /// still in its byte representation.
    pub fn check_shader_module_bytes(&self, bytes: &[u8]) -> Result<UsageSet, ScanError> {
        let words = words_from_bytes(bytes)?;
        Ok(self.check_shader_module(&words))
    }
}
