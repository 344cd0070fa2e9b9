/// One attribute of an interleaved vertex buffer: where the shader expects
/// it (location), how wide it is, and where it sits inside one vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferAttribute {
    pub location: u32,
    pub component_count: u32,
    /// Byte offset inside one vertex.
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub attributes: Vec<VertexBufferAttribute>,
    /// Bytes per vertex.
    pub stride: u32,
}

impl VertexBufferLayout {
    /// Append a float attribute at the current end of the vertex, growing
    /// the stride. Keeps offsets monotonically increasing by construction.
    pub fn push(&mut self, location: u32, component_count: u32) {
        self.attributes.push(VertexBufferAttribute {
            location,
            component_count,
            offset: self.stride,
        });
        self.stride += component_count * std::mem::size_of::<f32>() as u32;
    }

    pub fn find_attribute(&self, location: u32) -> Option<&VertexBufferAttribute> {
        self.attributes.iter().find(|a| a.location == location)
    }
}

/// A VAO built for one (submesh, program) pair.
#[derive(Debug, Clone, Copy)]
pub struct Vao {
    pub handle: glow::VertexArray,
    pub program_handle: glow::Program,
}

#[derive(Debug)]
pub struct Submesh {
    pub vertex_buffer_layout: VertexBufferLayout,
    /// Interleaved staging data, kept around after upload for index counts
    /// and re-uploads.
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    /// Byte offset of this submesh inside the mesh's shared vertex buffer.
    pub vertex_offset: u32,
    /// Byte offset of this submesh inside the mesh's shared index buffer.
    pub index_offset: u32,
    /// One entry per program this submesh has been drawn with.
    pub vaos: Vec<Vao>,
}

impl Submesh {
    pub fn new(vertex_buffer_layout: VertexBufferLayout, vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            vertex_buffer_layout,
            vertices,
            indices,
            vertex_offset: 0,
            index_offset: 0,
            vaos: Vec::new(),
        }
    }

    pub fn vertex_byte_len(&self) -> u32 {
        (self.vertices.len() * std::mem::size_of::<f32>()) as u32
    }

    pub fn index_byte_len(&self) -> u32 {
        (self.indices.len() * std::mem::size_of::<u32>()) as u32
    }

    pub fn cached_vao(&self, program_handle: glow::Program) -> Option<glow::VertexArray> {
        self.vaos
            .iter()
            .find(|vao| vao.program_handle == program_handle)
            .map(|vao| vao.handle)
    }
}

/// All submeshes of a mesh share one vertex buffer and one index buffer;
/// the buffer handles are filled in when the staging data is uploaded.
#[derive(Debug, Default)]
pub struct Mesh {
    pub submeshes: Vec<Submesh>,
    pub vertex_buffer_handle: Option<glow::Buffer>,
    pub index_buffer_handle: Option<glow::Buffer>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    pub mesh_index: u32,
    /// One material table index per submesh, same ordering.
    pub material_indices: Vec<u32>,
}

/// Assign each submesh its byte range inside the shared buffers and return
/// the total (vertex, index) byte sizes the buffers must be allocated with.
pub fn assign_buffer_ranges(mesh: &mut Mesh) -> (u32, u32) {
    let mut vertex_offset = 0u32;
    let mut index_offset = 0u32;
    for submesh in &mut mesh.submeshes {
        submesh.vertex_offset = vertex_offset;
        submesh.index_offset = index_offset;
        vertex_offset += submesh.vertex_byte_len();
        index_offset += submesh.index_byte_len();
    }
    (vertex_offset, index_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    fn layout_pos_normal_uv() -> VertexBufferLayout {
        let mut layout = VertexBufferLayout::default();
        layout.push(0, 3);
        layout.push(1, 3);
        layout.push(2, 2);
        layout
    }

    fn submesh_with_vertices(vertex_count: usize, layout: VertexBufferLayout) -> Submesh {
        let floats_per_vertex = layout.stride as usize / 4;
        Submesh::new(
            layout,
            vec![0.0; vertex_count * floats_per_vertex],
            (0..vertex_count as u32).collect(),
        )
    }

    fn fake_vao(id: u32) -> glow::VertexArray {
        glow::NativeVertexArray(NonZeroU32::new(id).unwrap())
    }

    fn fake_program(id: u32) -> glow::Program {
        glow::NativeProgram(NonZeroU32::new(id).unwrap())
    }

    #[test]
    fn push_extends_stride_and_offsets() {
        let layout = layout_pos_normal_uv();
        assert_eq!(layout.stride, 32);
        assert_eq!(layout.attributes[0].offset, 0);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[2].offset, 24);
    }

    #[test]
    fn layout_offsets_are_monotonic_and_within_stride() {
        let mut layout = layout_pos_normal_uv();
        layout.push(3, 3);
        layout.push(4, 3);
        let mut previous_end = 0;
        for attribute in &layout.attributes {
            assert!(attribute.offset >= previous_end);
            previous_end = attribute.offset + attribute.component_count * 4;
        }
        assert_eq!(previous_end, layout.stride);
    }

    #[test]
    fn buffer_ranges_do_not_overlap_and_sum_to_totals() {
        let mut mesh = Mesh::new();
        mesh.submeshes.push(submesh_with_vertices(100, layout_pos_normal_uv()));
        mesh.submeshes.push(submesh_with_vertices(50, layout_pos_normal_uv()));
        let (vertex_total, index_total) = assign_buffer_ranges(&mut mesh);

        // The two-submesh scenario: 150 vertices of 8 floats each, and the
        // second submesh starts right after the first one's 100 vertices.
        assert_eq!(vertex_total, 150 * 8 * 4);
        assert_eq!(index_total, 150 * 4);
        assert_eq!(mesh.submeshes[0].vertex_offset, 0);
        assert_eq!(mesh.submeshes[1].vertex_offset, 100 * 8 * 4);
        assert_eq!(mesh.submeshes[1].index_offset, 100 * 4);

        let end_of_first = mesh.submeshes[0].vertex_offset + mesh.submeshes[0].vertex_byte_len();
        assert!(end_of_first <= mesh.submeshes[1].vertex_offset);
        let byte_sum: u32 = mesh.submeshes.iter().map(Submesh::vertex_byte_len).sum();
        assert_eq!(byte_sum, vertex_total);
    }

    #[test]
    fn cached_vao_is_keyed_by_program() {
        let mut submesh = submesh_with_vertices(3, layout_pos_normal_uv());
        let program_a = fake_program(1);
        let program_b = fake_program(2);
        submesh.vaos.push(Vao { handle: fake_vao(10), program_handle: program_a });
        submesh.vaos.push(Vao { handle: fake_vao(11), program_handle: program_b });

        assert_eq!(submesh.cached_vao(program_a), Some(fake_vao(10)));
        assert_eq!(submesh.cached_vao(program_b), Some(fake_vao(11)));
        assert_ne!(submesh.cached_vao(program_a), submesh.cached_vao(program_b));
        assert_eq!(submesh.cached_vao(fake_program(3)), None);
        // Asking again returns the identical handle, not a new one.
        assert_eq!(submesh.cached_vao(program_a), submesh.cached_vao(program_a));
    }
}
