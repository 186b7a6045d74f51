use std::collections::BTreeMap;
use std::sync::Arc;

use vulkano::descriptor_set::layout::{
    DescriptorSetLayout, DescriptorSetLayoutBinding, DescriptorSetLayoutCreateInfo, DescriptorType,
};
use vulkano::device::Device;
use vulkano::shader::ShaderStages;

pub struct PipelineDescriptorSetLayouts {
    /// Set 0: per-frame data (camera, environment, lights).
    pub global: Arc<DescriptorSetLayout>,

    /// Set 1: per-draw material params and base colour texture.
    pub material: Arc<DescriptorSetLayout>,
}

fn binding(ty: DescriptorType, stages: ShaderStages) -> DescriptorSetLayoutBinding {
    let mut b = DescriptorSetLayoutBinding::descriptor_type(ty);
    b.descriptor_count = 1;
    b.stages = stages;
    b
}

impl PipelineDescriptorSetLayouts {
    pub fn new(device: Arc<Device>) -> Result<Self, Box<dyn std::error::Error>> {
        // Set 0:
        // - binding 0: Globals UBO (read in both stages)
        // - binding 1: Lights UBO
        let mut global_bindings = BTreeMap::new();
        global_bindings.insert(
            0,
            binding(
                DescriptorType::UniformBuffer,
                ShaderStages::VERTEX | ShaderStages::FRAGMENT,
            ),
        );
        global_bindings.insert(
            1,
            binding(DescriptorType::UniformBuffer, ShaderStages::FRAGMENT),
        );

        let global = DescriptorSetLayout::new(
            device.clone(),
            DescriptorSetLayoutCreateInfo {
                bindings: global_bindings,
                ..Default::default()
            },
        )?;

        // Set 1:
        // - binding 0: Material UBO
        // - binding 1: combined image sampler
        let mut material_bindings = BTreeMap::new();
        material_bindings.insert(
            0,
            binding(DescriptorType::UniformBuffer, ShaderStages::FRAGMENT),
        );
        material_bindings.insert(
            1,
            binding(DescriptorType::CombinedImageSampler, ShaderStages::FRAGMENT),
        );

        let material = DescriptorSetLayout::new(
            device,
            DescriptorSetLayoutCreateInfo {
                bindings: material_bindings,
                ..Default::default()
            },
        )?;

        Ok(Self { global, material })
    }
}
