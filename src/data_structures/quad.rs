//! The unit quad shared by every sprite.

use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

/// Two counter-clockwise triangles spanning -0.5..0.5 on both axes.
///
/// Texture rows are uploaded top row first, so the bottom edge samples `v = 1`.
pub const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex {
        position: [-0.5, -0.5],
        tex_coords: [0.0, 1.0],
    },
    QuadVertex {
        position: [0.5, -0.5],
        tex_coords: [1.0, 1.0],
    },
    QuadVertex {
        position: [0.5, 0.5],
        tex_coords: [1.0, 0.0],
    },
    QuadVertex {
        position: [-0.5, -0.5],
        tex_coords: [0.0, 1.0],
    },
    QuadVertex {
        position: [0.5, 0.5],
        tex_coords: [1.0, 0.0],
    },
    QuadVertex {
        position: [-0.5, 0.5],
        tex_coords: [0.0, 0.0],
    },
];

impl QuadVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// The quad uploaded once and bound at vertex slot 0 for every sprite.
#[derive(Debug)]
pub struct QuadBuffer {
    pub vertex: wgpu::Buffer,
    pub vertex_count: u32,
}

impl QuadBuffer {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            vertex,
            vertex_count: QUAD_VERTICES.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_area(a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> f32 {
        (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])
    }

    #[test]
    fn triangles_wind_counter_clockwise() {
        for tri in QUAD_VERTICES.chunks(3) {
            let area = signed_area(tri[0].position, tri[1].position, tri[2].position);
            assert!(area > 0.0, "triangle {:?} is not CCW", tri);
        }
    }

    #[test]
    fn top_edge_samples_first_texture_row() {
        for v in QUAD_VERTICES.iter() {
            let expected_v = if v.position[1] > 0.0 { 0.0 } else { 1.0 };
            let expected_u = if v.position[0] > 0.0 { 1.0 } else { 0.0 };
            assert_eq!(v.tex_coords, [expected_u, expected_v]);
        }
    }

    #[test]
    fn layout_matches_vertex_size() {
        let layout = QuadVertex::desc();
        assert_eq!(layout.array_stride, 16);
        assert_eq!(layout.attributes.len(), 2);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&QUAD_VERTICES).len(), 6 * 16);
    }
}
