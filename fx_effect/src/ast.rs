//! The shader AST built by the HFX parser.
//!
//! All cross-references are typed indices into vectors owned by [`Shader`];
//! includes append to those vectors while parsing, so ids stay stable where
//! raw references would not.

use fx_graphics::{
    BlendState, DepthStencilState, RasterizationState, ResourceBinding, ResourceKind, SamplerDesc,
    ShaderStage, VertexAttribute, VertexStream, SHADER_STAGE_COUNT,
};
use fx_lexer::INVALID_NUMBER_INDEX;

macro_rules! id_types {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
            pub struct $name(pub u32);

            impl $name {
                pub fn index(&self) -> usize {
                    self.0 as usize
                }
            }
        )+
    };
}

id_types!(
    CodeFragmentId,
    ResourceListId,
    VertexLayoutId,
    RenderStateId,
    SamplerStateId,
);

/// Marks an include as referring to a code fragment of this HFX file rather
/// than a file on disk. The low nibble of the flag word holds the stage.
pub const INCLUDE_FLAG_LOCAL: u32 = 0x10;
pub const INCLUDE_STAGE_MASK: u32 = 0xf;

/// "Not inside a stage ifdef" marker for `stage_ifdef_depth`.
pub const UNSET_IFDEF_DEPTH: u32 = 0xffff_ffff;

pub fn include_stage(flags: u32) -> ShaderStage {
    ShaderStage::from_u32(flags & INCLUDE_STAGE_MASK).unwrap_or(ShaderStage::Count)
}

pub fn include_is_local(flags: u32) -> bool {
    flags & INCLUDE_FLAG_LOCAL != 0
}

/// A resource discovered by scanning `uniform` declarations inside a code
/// fragment; feeds the automatic binding table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentResource {
    pub kind: ResourceKind,
    pub name: String,
}

/// A named verbatim block of shader source captured from `glsl name { … }`.
#[derive(Clone, Debug)]
pub struct CodeFragment {
    pub includes: Vec<String>,
    pub include_flags: Vec<u32>,
    pub resources: Vec<FragmentResource>,
    pub name: String,
    pub code: String,
    pub current_stage: ShaderStage,
    pub ifdef_depth: u32,
    pub stage_ifdef_depth: [u32; SHADER_STAGE_COUNT],
}

impl CodeFragment {
    pub fn new(name: &str) -> Self {
        Self {
            includes: Vec::new(),
            include_flags: Vec::new(),
            resources: Vec::new(),
            name: name.to_owned(),
            code: String::new(),
            current_stage: ShaderStage::Count,
            ifdef_depth: 0,
            stage_ifdef_depth: [UNSET_IFDEF_DEPTH; SHADER_STAGE_COUNT],
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum PropertyKind {
    Float,
    Int,
    Range,
    Color,
    Vector,
    Texture1D,
    Texture2D,
    Texture3D,
    TextureVolume,
    Unknown,
}

impl PropertyKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        const VARIANTS: &[PropertyKind] = &[
            PropertyKind::Float,
            PropertyKind::Int,
            PropertyKind::Range,
            PropertyKind::Color,
            PropertyKind::Vector,
            PropertyKind::Texture1D,
            PropertyKind::Texture2D,
            PropertyKind::Texture3D,
            PropertyKind::TextureVolume,
            PropertyKind::Unknown,
        ];
        VARIANTS.get(value as usize).copied()
    }
}

/// A material property declared inside `properties { … }`.
///
/// Scalar defaults are referenced through the number buffer via
/// `data_index`; texture defaults keep the string literal. Color and vector
/// defaults are parsed but unused.
#[derive(Clone, Debug)]
pub struct Property {
    pub name: String,
    pub ui_name: String,
    pub ui_arguments: String,
    pub default_value: String,
    pub kind: PropertyKind,
    pub data_index: u32,
}

impl Property {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ui_name: String::new(),
            ui_arguments: String::new(),
            default_value: String::new(),
            kind: PropertyKind::Unknown,
            data_index: INVALID_NUMBER_INDEX,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResourceList {
    pub name: String,
    pub resources: Vec<ResourceBinding>,
    pub flags: Vec<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct VertexLayout {
    pub name: String,
    pub streams: Vec<VertexStream>,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Clone, Debug, Default)]
pub struct RenderState {
    pub name: String,
    pub rasterization: RasterizationState,
    pub depth_stencil: DepthStencilState,
    pub blend: BlendState,
}

#[derive(Clone, Debug, Default)]
pub struct SamplerState {
    pub name: String,
    pub sampler: SamplerDesc,
}

#[derive(Copy, Clone, Debug)]
pub struct PassStage {
    pub code: CodeFragmentId,
    pub stage: ShaderStage,
}

#[derive(Clone, Debug, Default)]
pub struct Pass {
    pub name: String,
    pub stage_name: String,
    pub stages: Vec<PassStage>,
    pub resource_lists: Vec<ResourceListId>,
    pub vertex_layout: Option<VertexLayoutId>,
    pub render_state: Option<RenderStateId>,
}

impl Pass {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    /// A pass with no declared resource lists gets an automatic layout
    /// synthesized from the local constants plus scanned uniforms.
    pub fn is_resource_layout_automatic(&self) -> bool {
        self.resource_lists.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Shader {
    pub name: String,
    pub pipeline_name: String,
    pub passes: Vec<Pass>,
    pub properties: Vec<Property>,
    pub resource_lists: Vec<ResourceList>,
    pub vertex_layouts: Vec<VertexLayout>,
    pub render_states: Vec<RenderState>,
    pub sampler_states: Vec<SamplerState>,
    pub code_fragments: Vec<CodeFragment>,
    pub has_local_resource_list: bool,
}

impl Shader {
    pub fn code_fragment(&self, id: CodeFragmentId) -> &CodeFragment {
        &self.code_fragments[id.index()]
    }

    pub fn resource_list(&self, id: ResourceListId) -> &ResourceList {
        &self.resource_lists[id.index()]
    }

    pub fn vertex_layout(&self, id: VertexLayoutId) -> &VertexLayout {
        &self.vertex_layouts[id.index()]
    }

    pub fn render_state(&self, id: RenderStateId) -> &RenderState {
        &self.render_states[id.index()]
    }

    pub fn find_code_fragment(&self, name: &str) -> Option<CodeFragmentId> {
        self.code_fragments
            .iter()
            .position(|fragment| fragment.name == name)
            .map(|index| CodeFragmentId(index as u32))
    }

    pub fn find_resource_list(&self, name: &str) -> Option<ResourceListId> {
        self.resource_lists
            .iter()
            .position(|list| list.name == name)
            .map(|index| ResourceListId(index as u32))
    }

    pub fn find_property(&self, name: &str) -> Option<usize> {
        self.properties
            .iter()
            .position(|property| property.name == name)
    }

    pub fn find_vertex_layout(&self, name: &str) -> Option<VertexLayoutId> {
        self.vertex_layouts
            .iter()
            .position(|layout| layout.name == name)
            .map(|index| VertexLayoutId(index as u32))
    }

    pub fn find_render_state(&self, name: &str) -> Option<RenderStateId> {
        self.render_states
            .iter()
            .position(|state| state.name == name)
            .map(|index| RenderStateId(index as u32))
    }

    pub fn find_sampler_state(&self, name: &str) -> Option<SamplerStateId> {
        self.sampler_states
            .iter()
            .position(|state| state.name == name)
            .map(|index| SamplerStateId(index as u32))
    }
}
