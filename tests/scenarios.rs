//! End-to-end runs of an interception layer: observe calls, then narrow the
//! device request before it is forwarded.

use ash::vk;
use vk_feature_detect::{
    chain, ChainNode, ColorBlendDescriptor, DeviceDescriptor, Extensions, Feature,
    FeatureRegistry, UsageSet,
};

use std::{ffi::CString, sync::Arc, thread};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn blend_state(logic_op_enable: bool) -> ColorBlendDescriptor<'static> {
    ColorBlendDescriptor {
        logic_op_enable,
        attachments: &[],
    }
}

#[test]
fn logic_op_follows_usage() {
    init_logger();
    let registry = FeatureRegistry::new();

    registry.check_color_blend_state(&blend_state(false));
    assert!(!registry.is_used(Feature::LogicOp));

    let mut request = vk::PhysicalDeviceFeatures {
        logic_op: vk::TRUE,
        ..Default::default()
    };
    let cleared = registry.snapshot().adjust_features(&mut request);
    assert_eq!(request.logic_op, vk::FALSE);
    assert!(cleared.contains(&"logicOp"));

    registry.check_color_blend_state(&blend_state(true));
    let mut request = vk::PhysicalDeviceFeatures {
        logic_op: vk::TRUE,
        ..Default::default()
    };
    let cleared = registry.snapshot().adjust_features(&mut request);
    assert_eq!(request.logic_op, vk::TRUE);
    assert!(!cleared.contains(&"logicOp"));
}

#[test]
fn disabled_atomic_int64_struct_is_dropped() {
    init_logger();
    let registry = FeatureRegistry::new();
    let atomic_int64 = c"VK_KHR_shader_atomic_int64";

    let mut desc = DeviceDescriptor {
        enabled_extensions: vec![CString::from(atomic_int64)],
        enabled_features: None,
        chain: vec![ChainNode::ShaderAtomicInt64Features(
            vk::PhysicalDeviceShaderAtomicInt64Features::default(),
        )],
    };
    registry.check_device(&desc);
    assert!(!registry.extensions().contains(Extensions::SHADER_ATOMIC_INT64));

    let usage = registry.snapshot();
    let removed = usage.adjust_extensions(&mut desc.enabled_extensions);
    assert_eq!(removed, [atomic_int64]);
    assert!(desc.enabled_extensions.is_empty());

    let unlinked = chain::prune(&mut desc.chain, &desc.enabled_extensions);
    assert_eq!(unlinked, [atomic_int64]);
    assert!(desc.chain.is_empty());
}

#[test]
fn enabled_atomic_int64_struct_is_kept() {
    init_logger();
    let registry = FeatureRegistry::new();
    let mut desc = DeviceDescriptor {
        enabled_extensions: vec![CString::from(c"VK_KHR_shader_atomic_int64")],
        enabled_features: None,
        chain: vec![ChainNode::ShaderAtomicInt64Features(
            vk::PhysicalDeviceShaderAtomicInt64Features {
                shader_buffer_int64_atomics: vk::TRUE,
                ..Default::default()
            },
        )],
    };
    registry.check_device(&desc);

    let adjustments = registry.snapshot().adjust_device(&mut desc);
    assert!(adjustments.is_empty());
    assert_eq!(desc.enabled_extensions.len(), 1);
    assert_eq!(desc.chain.len(), 1);
}

#[test]
fn shader_declarations_narrow_the_device() {
    init_logger();
    let registry = FeatureRegistry::new();

    let capability = |cap: spirv::Capability| [(2 << 16) | spirv::Op::Capability as u32, cap as u32];
    let mut module = vec![spirv::MAGIC_NUMBER, 0x0001_0500, 0, 16, 0];
    module.extend(capability(spirv::Capability::Shader));
    module.extend(capability(spirv::Capability::Int64));
    module.extend(capability(spirv::Capability::Int64Atomics));
    module.extend([(3 << 16) | spirv::Op::MemoryModel as u32, 0, 1]);
    registry.check_shader_module(&module);

    let mut desc = DeviceDescriptor {
        enabled_extensions: vec![
            CString::from(c"VK_KHR_swapchain"),
            CString::from(c"VK_KHR_shader_atomic_int64"),
            CString::from(c"VK_EXT_index_type_uint8"),
        ],
        enabled_features: Some(vk::PhysicalDeviceFeatures {
            shader_int64: vk::TRUE,
            shader_float64: vk::TRUE,
            ..Default::default()
        }),
        chain: vec![
            ChainNode::ShaderAtomicInt64Features(Default::default()),
            ChainNode::IndexTypeUint8Features(Default::default()),
        ],
    };
    let adjustments = registry.snapshot().adjust_device(&mut desc);

    assert_eq!(adjustments.features, ["shaderFloat64"]);
    assert_eq!(adjustments.extensions, [c"VK_EXT_index_type_uint8"]);
    assert_eq!(adjustments.chain, [c"VK_EXT_index_type_uint8"]);
    assert_eq!(
        desc.enabled_extensions,
        [
            CString::from(c"VK_KHR_swapchain"),
            CString::from(c"VK_KHR_shader_atomic_int64"),
        ]
    );
    assert_eq!(desc.chain.len(), 1);
}

#[test]
fn recording_threads_share_a_registry() {
    init_logger();
    let registry = Arc::new(FeatureRegistry::new());
    let workers: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..100 {
                    registry.check_cmd_set_line_width(1.0 + i as f32);
                    registry.check_cmd_draw_indirect_count();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let usage = registry.snapshot();
    assert_eq!(
        usage,
        UsageSet::from_features(&[Feature::WideLines, Feature::DrawIndirectCount])
    );
}
