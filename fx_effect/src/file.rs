//! The binary effect container: wire records shared by writer and reader,
//! and the read-side typed views.
//!
//! All multi-byte integers are little-endian and records are packed
//! field-by-field; the `*_SIZE` constants below are the single source of
//! truth for both sides. Pass offsets are file-absolute;
//! `shader_list_offset`, `resource_table_offset` and chunk `start`s are
//! pass-relative.

use bytes::{Buf, BufMut};
use fx_graphics::{
    from_fixed_str, BlendState, DepthStencilState, RasterizationState, ResourceBinding,
    ShaderStage, VertexAttribute, VertexStream, BINDING_SIZE, RENDER_STATE_SIZE,
    VERTEX_ATTRIBUTE_SIZE, VERTEX_STREAM_SIZE,
};
use fx_graphics::{Decode, Encode, EofError};

use crate::ast::PropertyKind;
use crate::EffectError;

pub const EFFECT_HEADER_SIZE: usize = 108;
pub const PASS_HEADER_SIZE: usize = 76;
pub const CHUNK_HEADER_SIZE: usize = 5;
pub const SHADER_CHUNK_SIZE: usize = 8;
pub const MATERIAL_PROPERTY_SIZE: usize = 70;

/// File header at offset zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectHeader {
    pub num_passes: u32,
    pub resource_defaults_offset: u32,
    pub properties_offset: u32,
    pub name: [u8; 32],
    pub binary_header_magic: [u8; 32],
    pub pipeline_name: [u8; 32],
}

impl EffectHeader {
    pub fn name_str(&self) -> &str {
        from_fixed_str(&self.name)
    }

    pub fn pipeline_name_str(&self) -> &str {
        from_fixed_str(&self.pipeline_name)
    }
}

impl Encode for EffectHeader {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        self.num_passes.encode(&mut buf);
        self.resource_defaults_offset.encode(&mut buf);
        self.properties_offset.encode(&mut buf);
        self.name.encode(&mut buf);
        self.binary_header_magic.encode(&mut buf);
        self.pipeline_name.encode(&mut buf);
    }
}

impl Decode for EffectHeader {
    type Error = EofError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        Ok(Self {
            num_passes: u32::decode(&mut buf)?,
            resource_defaults_offset: u32::decode(&mut buf)?,
            properties_offset: u32::decode(&mut buf)?,
            name: <[u8; 32]>::decode(&mut buf)?,
            binary_header_magic: <[u8; 32]>::decode(&mut buf)?,
            pipeline_name: <[u8; 32]>::decode(&mut buf)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassHeader {
    pub num_shader_chunks: u8,
    pub num_vertex_streams: u8,
    pub num_vertex_attributes: u8,
    pub num_resource_layouts: u8,
    pub has_resource_state: u16,
    pub shader_list_offset: u16,
    pub resource_table_offset: u32,
    pub name: [u8; 32],
    pub stage_name: [u8; 32],
}

impl PassHeader {
    pub fn name_str(&self) -> &str {
        from_fixed_str(&self.name)
    }

    pub fn stage_name_str(&self) -> &str {
        from_fixed_str(&self.stage_name)
    }
}

impl Encode for PassHeader {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        self.num_shader_chunks.encode(&mut buf);
        self.num_vertex_streams.encode(&mut buf);
        self.num_vertex_attributes.encode(&mut buf);
        self.num_resource_layouts.encode(&mut buf);
        self.has_resource_state.encode(&mut buf);
        self.shader_list_offset.encode(&mut buf);
        self.resource_table_offset.encode(&mut buf);
        self.name.encode(&mut buf);
        self.stage_name.encode(&mut buf);
    }
}

impl Decode for PassHeader {
    type Error = EofError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        Ok(Self {
            num_shader_chunks: u8::decode(&mut buf)?,
            num_vertex_streams: u8::decode(&mut buf)?,
            num_vertex_attributes: u8::decode(&mut buf)?,
            num_resource_layouts: u8::decode(&mut buf)?,
            has_resource_state: u16::decode(&mut buf)?,
            shader_list_offset: u16::decode(&mut buf)?,
            resource_table_offset: u32::decode(&mut buf)?,
            name: <[u8; 32]>::decode(&mut buf)?,
            stage_name: <[u8; 32]>::decode(&mut buf)?,
        })
    }
}

/// One entry of the shader chunk list: pass-relative start of the chunk's
/// header and the full chunk byte count.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShaderChunk {
    pub start: u32,
    pub size: u32,
}

impl Encode for ShaderChunk {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        self.start.encode(&mut buf);
        self.size.encode(&mut buf);
    }
}

impl Decode for ShaderChunk {
    type Error = EofError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        Ok(Self {
            start: u32::decode(&mut buf)?,
            size: u32::decode(&mut buf)?,
        })
    }
}

/// Prefix of every embedded shader body. `code_size` covers the body
/// including the trailing NUL.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub code_size: u32,
    pub shader_stage: i8,
}

impl ChunkHeader {
    pub fn stage(&self) -> ShaderStage {
        ShaderStage::from_u32(self.shader_stage as u32).unwrap_or(ShaderStage::Count)
    }
}

impl Encode for ChunkHeader {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        self.code_size.encode(&mut buf);
        self.shader_stage.encode(&mut buf);
    }
}

impl Decode for ChunkHeader {
    type Error = EofError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        Ok(Self {
            code_size: u32::decode(&mut buf)?,
            shader_stage: i8::decode(&mut buf)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialProperty {
    pub kind: u32,
    pub offset: u16,
    pub name: [u8; 64],
}

impl MaterialProperty {
    pub fn name_str(&self) -> &str {
        from_fixed_str(&self.name)
    }

    pub fn property_kind(&self) -> PropertyKind {
        PropertyKind::from_u32(self.kind).unwrap_or(PropertyKind::Unknown)
    }
}

impl Encode for MaterialProperty {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        self.kind.encode(&mut buf);
        self.offset.encode(&mut buf);
        self.name.encode(&mut buf);
    }
}

impl Decode for MaterialProperty {
    type Error = EofError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        Ok(Self {
            kind: u32::decode(&mut buf)?,
            offset: u16::decode(&mut buf)?,
            name: <[u8; 64]>::decode(&mut buf)?,
        })
    }
}

/// One shader stage resolved out of a pass section.
#[derive(Copy, Clone, Debug)]
pub struct ShaderChunkView<'a> {
    pub stage: ShaderStage,
    pub code_size: u32,
    /// Body bytes including the trailing NUL.
    pub code: &'a [u8],
}

impl<'a> ShaderChunkView<'a> {
    /// The body as text, NUL stripped.
    pub fn code_str(&self) -> &'a str {
        let bytes = match self.code.split_last() {
            Some((0, rest)) => rest,
            _ => self.code,
        };
        std::str::from_utf8(bytes).unwrap_or("")
    }
}

#[derive(Clone, Debug, Default)]
pub struct VertexInputView {
    pub attributes: Vec<VertexAttribute>,
    pub streams: Vec<VertexStream>,
}

/// Everything needed to build a pipeline out of one pass.
#[derive(Clone, Debug)]
pub struct PipelineSpec<'a> {
    pub name: String,
    pub stages: Vec<ShaderChunkView<'a>>,
    pub vertex_input: VertexInputView,
    pub rasterization: Option<RasterizationState>,
    pub depth_stencil: Option<DepthStencilState>,
    pub blend: Option<BlendState>,
    pub num_active_layouts: u8,
}

/// Read-side view over a complete effect file.
///
/// Accessors are bounds-checked: out-of-range indices and corrupt offsets
/// produce `None` or empty views, never a panic.
pub struct EffectFile<'a> {
    memory: &'a [u8],
    header: EffectHeader,
    num_resource_defaults: u32,
    local_constants_size: u32,
    local_constants_defaults: &'a [u8],
    num_properties: u32,
    properties_data: &'a [u8],
}

impl<'a> EffectFile<'a> {
    pub fn parse(memory: &'a [u8]) -> Result<Self, EffectError> {
        let header = EffectHeader::decode(memory)
            .map_err(|err| EffectError::MalformedEffectFile(err.to_string()))?;

        let defaults_offset = header.resource_defaults_offset as usize;
        let properties_offset = header.properties_offset as usize;

        if defaults_offset > memory.len()
            || properties_offset > memory.len()
            || defaults_offset > properties_offset
        {
            return Err(EffectError::MalformedEffectFile(format!(
                "section offsets out of range: defaults {defaults_offset}, properties {properties_offset}, file {}",
                memory.len()
            )));
        }

        // Defaults section: count, then one (kind, size, bytes) record in
        // v1. A property-less effect stores a bare zero placeholder.
        let defaults_section = &memory[defaults_offset..properties_offset];
        let mut num_resource_defaults = 0;
        let mut local_constants_size = 0;
        let mut local_constants_defaults: &[u8] = &[];

        if defaults_section.len() >= 4 {
            num_resource_defaults = u32::decode(defaults_section).unwrap_or(0);

            if defaults_section.len() >= 12 {
                let size = u32::decode(&defaults_section[8..]).unwrap_or(0) as usize;
                let data_start = 12;
                if data_start + size <= defaults_section.len() {
                    local_constants_size = size as u32;
                    local_constants_defaults = &defaults_section[data_start..data_start + size];
                }
            }
        }

        // Properties section: count then packed records.
        let properties_section = &memory[properties_offset..];
        let mut num_properties = 0;
        let mut properties_data: &[u8] = &[];

        if properties_section.len() >= 4 {
            num_properties = u32::decode(properties_section).unwrap_or(0);
            properties_data = &properties_section[4..];
        }

        Ok(Self {
            memory,
            header,
            num_resource_defaults,
            local_constants_size,
            local_constants_defaults,
            num_properties,
            properties_data,
        })
    }

    pub fn header(&self) -> &EffectHeader {
        &self.header
    }

    pub fn num_passes(&self) -> u32 {
        self.header.num_passes
    }

    pub fn num_resource_defaults(&self) -> u32 {
        self.num_resource_defaults
    }

    pub fn num_properties(&self) -> u32 {
        self.num_properties
    }

    /// Byte size of the std140 local-constants block.
    pub fn local_constants_size(&self) -> u32 {
        self.local_constants_size
    }

    pub fn local_constants_defaults(&self) -> &'a [u8] {
        self.local_constants_defaults
    }

    /// Default values as f32s, in declaration order with tail padding.
    pub fn local_constants_default_floats(&self) -> Vec<f32> {
        self.local_constants_defaults
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect()
    }

    pub fn pass(&self, index: u32) -> Option<PassView<'a>> {
        if index >= self.header.num_passes {
            return None;
        }

        let entry = EFFECT_HEADER_SIZE + index as usize * 4;
        let offset = u32::decode(self.memory.get(entry..)?).ok()? as usize;

        let header = PassHeader::decode(self.memory.get(offset..)?).ok()?;

        Some(PassView {
            memory: self.memory,
            offset,
            header,
        })
    }

    pub fn property(&self, index: u32) -> Option<MaterialProperty> {
        if index >= self.num_properties {
            return None;
        }

        let start = index as usize * MATERIAL_PROPERTY_SIZE;
        MaterialProperty::decode(self.properties_data.get(start..)?).ok()
    }
}

pub struct PassView<'a> {
    memory: &'a [u8],
    offset: usize,
    header: PassHeader,
}

impl<'a> PassView<'a> {
    pub fn header(&self) -> &PassHeader {
        &self.header
    }

    pub fn name_str(&self) -> &str {
        self.header.name_str()
    }

    fn chunk_entry(&self, index: u32) -> Option<ShaderChunk> {
        if index >= u32::from(self.header.num_shader_chunks) {
            return None;
        }

        let list_start = self.offset
            + PASS_HEADER_SIZE
            + self.header.shader_list_offset as usize
            + index as usize * SHADER_CHUNK_SIZE;

        ShaderChunk::decode(self.memory.get(list_start..)?).ok()
    }

    /// The `index`-th shader stage of this pass.
    pub fn shader_chunk(&self, index: u32) -> Option<ShaderChunkView<'a>> {
        let entry = self.chunk_entry(index)?;

        let chunk_start = self.offset + entry.start as usize;
        let header = ChunkHeader::decode(self.memory.get(chunk_start..)?).ok()?;

        let code_start = chunk_start + CHUNK_HEADER_SIZE;
        let code = self
            .memory
            .get(code_start..code_start + header.code_size as usize)?;

        Some(ShaderChunkView {
            stage: header.stage(),
            code_size: header.code_size,
            code,
        })
    }

    /// Render state triple, present only when the pass declared one.
    pub fn render_states(
        &self,
    ) -> Option<(RasterizationState, DepthStencilState, BlendState)> {
        if self.header.has_resource_state == 0 {
            return None;
        }

        let start = self.offset + PASS_HEADER_SIZE;
        let bytes = self.memory.get(start..start + RENDER_STATE_SIZE)?;

        let rasterization = RasterizationState::decode(bytes).ok()?;
        let depth_stencil =
            DepthStencilState::decode(&bytes[fx_graphics::state::RASTERIZATION_STATE_SIZE..])
                .ok()?;
        let blend = BlendState::decode(
            &bytes[fx_graphics::state::RASTERIZATION_STATE_SIZE
                + fx_graphics::state::DEPTH_STENCIL_STATE_SIZE..],
        )
        .ok()?;

        Some((rasterization, depth_stencil, blend))
    }

    /// Vertex attributes and streams; empty when the pass has none.
    pub fn vertex_input(&self) -> VertexInputView {
        let mut view = VertexInputView::default();

        let attribute_count = self.header.num_vertex_attributes as usize;
        if attribute_count == 0 {
            return view;
        }

        let render_state_size = if self.header.has_resource_state != 0 {
            RENDER_STATE_SIZE
        } else {
            0
        };
        let mut cursor = self.offset + PASS_HEADER_SIZE + render_state_size;

        for _ in 0..attribute_count {
            let Some(bytes) = self.memory.get(cursor..) else {
                return view;
            };
            let Ok(attribute) = VertexAttribute::decode(bytes) else {
                return view;
            };
            view.attributes.push(attribute);
            cursor += VERTEX_ATTRIBUTE_SIZE;
        }

        for _ in 0..self.header.num_vertex_streams {
            let Some(bytes) = self.memory.get(cursor..) else {
                return view;
            };
            let Ok(stream) = VertexStream::decode(bytes) else {
                return view;
            };
            view.streams.push(stream);
            cursor += VERTEX_STREAM_SIZE;
        }

        view
    }

    /// Bindings of the `layout_index`-th resource layout.
    pub fn layout_bindings(&self, layout_index: u32) -> Option<Vec<ResourceBinding>> {
        if layout_index >= u32::from(self.header.num_resource_layouts) {
            return None;
        }

        let mut cursor = self.offset + self.header.resource_table_offset as usize;

        // Each layout is a count byte followed by packed bindings.
        for _ in 0..layout_index {
            let count = *self.memory.get(cursor)? as usize;
            cursor += 1 + count * BINDING_SIZE;
        }

        let count = *self.memory.get(cursor)? as usize;
        cursor += 1;

        let mut bindings = Vec::with_capacity(count);
        for _ in 0..count {
            let binding = ResourceBinding::decode(self.memory.get(cursor..)?).ok()?;
            bindings.push(binding);
            cursor += BINDING_SIZE;
        }

        Some(bindings)
    }

    /// Assembles the full pipeline description for this pass.
    pub fn pipeline(&self) -> PipelineSpec<'a> {
        let mut stages = Vec::new();
        for index in 0..u32::from(self.header.num_shader_chunks) {
            if let Some(chunk) = self.shader_chunk(index) {
                stages.push(chunk);
            }
        }

        let (rasterization, depth_stencil, blend) = match self.render_states() {
            Some((rasterization, depth_stencil, blend)) => {
                (Some(rasterization), Some(depth_stencil), Some(blend))
            }
            None => (None, None, None),
        };

        PipelineSpec {
            name: self.name_str().to_owned(),
            stages,
            vertex_input: self.vertex_input(),
            rasterization,
            depth_stencil,
            blend,
            num_active_layouts: self.header.num_resource_layouts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ChunkHeader, EffectFile, EffectHeader, MaterialProperty, PassHeader, ShaderChunk,
        CHUNK_HEADER_SIZE, EFFECT_HEADER_SIZE, MATERIAL_PROPERTY_SIZE, PASS_HEADER_SIZE,
        SHADER_CHUNK_SIZE,
    };
    use fx_graphics::{to_fixed_str, Decode, Encode, ShaderStage};

    #[test]
    fn record_sizes_are_exact() {
        let mut buf = Vec::new();
        EffectHeader {
            num_passes: 0,
            resource_defaults_offset: 0,
            properties_offset: 0,
            name: [0; 32],
            binary_header_magic: [0; 32],
            pipeline_name: [0; 32],
        }
        .encode(&mut buf);
        assert_eq!(buf.len(), EFFECT_HEADER_SIZE);

        buf.clear();
        PassHeader {
            num_shader_chunks: 0,
            num_vertex_streams: 0,
            num_vertex_attributes: 0,
            num_resource_layouts: 0,
            has_resource_state: 0,
            shader_list_offset: 0,
            resource_table_offset: 0,
            name: [0; 32],
            stage_name: [0; 32],
        }
        .encode(&mut buf);
        assert_eq!(buf.len(), PASS_HEADER_SIZE);

        buf.clear();
        ChunkHeader {
            code_size: 0,
            shader_stage: 0,
        }
        .encode(&mut buf);
        assert_eq!(buf.len(), CHUNK_HEADER_SIZE);

        buf.clear();
        ShaderChunk { start: 0, size: 0 }.encode(&mut buf);
        assert_eq!(buf.len(), SHADER_CHUNK_SIZE);

        buf.clear();
        MaterialProperty {
            kind: 0,
            offset: 0,
            name: [0; 64],
        }
        .encode(&mut buf);
        assert_eq!(buf.len(), MATERIAL_PROPERTY_SIZE);
    }

    #[test]
    fn header_roundtrip() {
        let header = EffectHeader {
            num_passes: 3,
            resource_defaults_offset: 400,
            properties_offset: 500,
            name: to_fixed_str("simple"),
            binary_header_magic: [7; 32],
            pipeline_name: to_fixed_str("forward"),
        };

        let mut buf = Vec::new();
        header.encode(&mut buf);

        let decoded = EffectHeader::decode(&buf[..]).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.name_str(), "simple");
        assert_eq!(decoded.pipeline_name_str(), "forward");
    }

    #[test]
    fn chunk_header_stage() {
        let header = ChunkHeader {
            code_size: 10,
            shader_stage: ShaderStage::Compute as u32 as i8,
        };
        assert_eq!(header.stage(), ShaderStage::Compute);
    }

    #[test]
    fn truncated_file_is_malformed() {
        assert!(EffectFile::parse(&[0u8; 10]).is_err());
    }

    #[test]
    fn out_of_range_offsets_are_malformed() {
        let header = EffectHeader {
            num_passes: 0,
            resource_defaults_offset: 9999,
            properties_offset: 9999,
            name: [0; 32],
            binary_header_magic: [0; 32],
            pipeline_name: [0; 32],
        };

        let mut buf = Vec::new();
        header.encode(&mut buf);

        assert!(EffectFile::parse(&buf).is_err());
    }

    #[test]
    fn out_of_range_pass_is_none() {
        let header = EffectHeader {
            num_passes: 0,
            resource_defaults_offset: EFFECT_HEADER_SIZE as u32,
            properties_offset: EFFECT_HEADER_SIZE as u32,
            name: [0; 32],
            binary_header_magic: [0; 32],
            pipeline_name: [0; 32],
        };

        let mut buf = Vec::new();
        header.encode(&mut buf);

        let file = EffectFile::parse(&buf).unwrap();
        assert!(file.pass(0).is_none());
        assert!(file.property(0).is_none());
        assert_eq!(file.local_constants_size(), 0);
    }
}
