//! Vertex format for chunk meshes.

/// A single vertex of a chunk mesh, laid out to match the shader's vertex
/// inputs.
///
/// `texture_id` names a tile in the block atlas and travels as a float so
/// the fragment shader can recognize the animated water range without an
/// integer attribute. `debug_flag` is spare capacity for visual debugging
/// and is always written as zero by the mesher.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VoxelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    pub texture_id: f32,
    pub debug_flag: f32,
}

impl VoxelVertex {
    /// The vertex buffer layout matching [`VoxelVertex`]'s memory layout.
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
            3 => Float32,
            4 => Float32,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<VoxelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_tightly_packed() {
        // Ten floats; the GPU layout in desc() assumes no padding.
        assert_eq!(std::mem::size_of::<VoxelVertex>(), 40);
    }
}
