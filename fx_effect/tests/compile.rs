use std::path::PathBuf;

use fx_effect::ast::PropertyKind;
use fx_effect::file::EffectFile;
use fx_effect::{compile_hfx, generate_hfx_permutations, hash_source, EffectError, Parser};
use fx_graphics::{
    ComparisonFunction, CullMode, ResourceKind, ShaderStage, RENDER_STATE_SIZE,
};
use fx_lexer::Lexer;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fx_effect_{name}_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

const SIMPLE_HFX: &str = r##"
shader simple {
    properties {
        scale("Scale", Float) = 2.0;
    }

    glsl main_fragment {
        #if defined FRAGMENT
        layout (location = 0) out vec4 color;
        #endif

        void main() {
            color = vec4(scale);
        }
    }

    pass p0 {
        fragment = main_fragment
    }
}
"##;

#[test]
fn compile_single_property_single_pass() {
    let dir = temp_dir("simple");
    let input = dir.join("simple.hfx");
    std::fs::write(&input, SIMPLE_HFX).unwrap();

    compile_hfx(&input, &dir, "simple.bfx").unwrap();

    let bytes = std::fs::read(dir.join("simple.bfx")).unwrap();
    let file = EffectFile::parse(&bytes).unwrap();

    assert_eq!(file.num_passes(), 1);
    assert_eq!(file.header().name_str(), "simple");

    // Staleness stamp: the seeded source hash sits at bytes 16..24.
    let magic = &file.header().binary_header_magic;
    let hash = u64::from_le_bytes(magic[16..24].try_into().unwrap());
    assert_eq!(hash, hash_source(SIMPLE_HFX, fx_effect::SOURCE_HASH_SEED));

    let pass = file.pass(0).unwrap();
    assert_eq!(pass.name_str(), "p0");
    assert_eq!(pass.header().num_shader_chunks, 1);
    assert_eq!(pass.header().num_resource_layouts, 1);
    assert_eq!(pass.header().has_resource_state, 0);

    let chunk = pass.shader_chunk(0).unwrap();
    assert_eq!(chunk.stage, ShaderStage::Fragment);
    assert!(chunk.code_size > 0);

    let code = chunk.code_str();
    assert!(code.contains("#define FRAGMENT"));
    assert!(code.contains("layout (std140, binding=7) uniform LocalConstants {"));
    assert!(code.contains("scale;"));
    assert!(code.contains("pad_tail[3];"));
    assert!(code.contains("color = vec4(scale);"));

    // The automatic layout starts with the local constants binding.
    let bindings = pass.layout_bindings(0).unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].kind, ResourceKind::Constants);
    assert_eq!(bindings[0].name_str(), "LocalConstants");

    // Defaults blob: (Constants, 16, 2.0, 0, 0, 0).
    assert_eq!(file.num_resource_defaults(), 1);
    assert_eq!(file.local_constants_size(), 16);
    assert_eq!(file.local_constants_default_floats(), [2.0, 0.0, 0.0, 0.0]);

    // Properties block mirrors the emitted offsets.
    assert_eq!(file.num_properties(), 1);
    let property = file.property(0).unwrap();
    assert_eq!(property.property_kind(), PropertyKind::Float);
    assert_eq!(property.offset, 0);
    assert_eq!(property.name_str(), "scale");

    let pipeline = pass.pipeline();
    assert_eq!(pipeline.name, "p0");
    assert_eq!(pipeline.stages.len(), 1);
    assert_eq!(pipeline.num_active_layouts, 1);
    assert!(pipeline.rasterization.is_none());
}

#[test]
fn permutations_emit_stage_sources() {
    let dir = temp_dir("permutations");
    let input = dir.join("simple.hfx");
    std::fs::write(&input, SIMPLE_HFX).unwrap();

    generate_hfx_permutations(&input, &dir).unwrap();

    let text = std::fs::read_to_string(dir.join("simple_main_fragment.frag")).unwrap();
    assert!(text.contains("#define FRAGMENT"));
    assert!(text.contains("float\t\t\t\t\tscale;"));
    assert!(text.contains("float\t\t\t\t\tpad_tail[3];"));
    assert!(text.contains("color = vec4(scale);"));
}

#[test]
fn include_hfx_inlines_fragment_before_stage_define() {
    let dir = temp_dir("include_hfx");
    let input = dir.join("inlined.hfx");
    std::fs::write(
        &input,
        r##"
shader inlined {
    glsl shared_lib {
        float helper() { return 1.0; }
    }

    glsl main_fragment {
        #if defined FRAGMENT
        #pragma include_hfx "shared_lib"
        #endif
        void main() { }
    }

    pass p0 {
        fragment = main_fragment
    }
}
"##,
    )
    .unwrap();

    generate_hfx_permutations(&input, &dir).unwrap();

    let text = std::fs::read_to_string(dir.join("inlined_main_fragment.frag")).unwrap();
    let helper = text.find("float helper()").unwrap();
    let define = text.find("#define FRAGMENT").unwrap();
    assert!(helper < define, "inlined include must precede the define");
}

#[test]
fn includes_merge_renames_lists_and_fragments() {
    let dir = temp_dir("includes_merge");
    std::fs::write(
        dir.join("lib.hfx"),
        r##"
shader lib {
    glsl lib_fragment {
        void main() { }
    }

    layout {
        list lib_resources {
            cbuffer SharedConstants
        }
    }
}
"##,
    )
    .unwrap();

    let parent_source = r##"
shader parent {
    includes { "lib.hfx" }

    pass p0 {
        fragment = parent.lib_fragment
    }
}
"##;

    let mut parser = Parser::new(Lexer::new(parent_source), &dir);
    parser.generate_ast();
    assert!(!parser.has_error());

    let shader = parser.shader();
    assert!(shader.find_code_fragment("parent.lib_fragment").is_some());
    assert!(shader.find_code_fragment("lib_fragment").is_none());
    assert!(shader.find_resource_list("parent.lib_resources").is_some());
    assert!(shader.find_resource_list("lib_resources").is_none());

    // Merged fragments resolve from passes like local ones.
    assert_eq!(shader.passes[0].stages.len(), 1);
}

#[test]
fn missing_pragma_include_logs_and_continues() {
    let dir = temp_dir("missing_include");
    let input = dir.join("holey.hfx");
    std::fs::write(
        &input,
        r##"
shader holey {
    glsl main_fragment {
        #pragma include "does_not_exist.glsl"
        void main() { }
    }

    pass p0 { fragment = main_fragment }
}
"##,
    )
    .unwrap();

    compile_hfx(&input, &dir, "holey.bfx").unwrap();

    let bytes = std::fs::read(dir.join("holey.bfx")).unwrap();
    let file = EffectFile::parse(&bytes).unwrap();
    let chunk = file.pass(0).unwrap().shader_chunk(0).unwrap();
    assert!(chunk.code_str().contains("void main() { }"));
}

#[test]
fn missing_input_file_is_an_error() {
    let dir = temp_dir("missing_input");
    let result = compile_hfx(&dir.join("nope.hfx"), &dir, "out.bfx");
    assert!(matches!(result, Err(EffectError::IncludeNotFound { .. })));
}

const FULL_HFX: &str = r##"
shader full {
    pipeline = forward

    properties {
        scale("Scale", Float) = 1.5;
    }

    glsl surface {
        #if defined VERTEX
        void vs() { }
        #endif
        #if defined FRAGMENT
        void fs() { }
        #endif
        void main() { }
    }

    glsl post {
        uniform sampler2D source_texture;
        void main() { }
    }

    layout {
        list main_res {
            cbuffer LocalConstants
            texture2D albedo
        }

        vertex basic {
            attribute float3 position 0 0 0 vertex
            attribute float2 uv 0 1 12 vertex
            binding 0 20
        }
    }

    render_states {
        state opaque {
            Cull Back
            ZTest LEqual
            ZWrite On
        }
    }

    pass geometry {
        stage = gbuffer
        vertex = surface
        fragment = surface
        resources = main_res
        vertex_layout = basic
        render_states = opaque
    }

    pass postprocess {
        fragment = post
    }
}
"##;

#[test]
fn pack_unpack_roundtrip_matches_ast() {
    let dir = temp_dir("roundtrip");
    let input = dir.join("full.hfx");
    std::fs::write(&input, FULL_HFX).unwrap();

    compile_hfx(&input, &dir, "full.bfx").unwrap();

    let bytes = std::fs::read(dir.join("full.bfx")).unwrap();
    let file = EffectFile::parse(&bytes).unwrap();

    assert_eq!(file.num_passes(), 2);
    assert_eq!(file.header().name_str(), "full");
    assert_eq!(file.header().pipeline_name_str(), "forward");

    // Pass 0: both stages, declared resources, vertex input, render state.
    let pass = file.pass(0).unwrap();
    assert_eq!(pass.name_str(), "geometry");
    assert_eq!(pass.header().stage_name_str(), "gbuffer");
    assert_eq!(pass.header().num_shader_chunks, 2);
    assert_eq!(pass.header().num_vertex_attributes, 2);
    assert_eq!(pass.header().num_vertex_streams, 1);
    assert_eq!(pass.header().has_resource_state, 1);
    assert_eq!(pass.header().num_resource_layouts, 1);

    // shader_list_offset skips the render-state triple and vertex input.
    let expected_list_offset = RENDER_STATE_SIZE + 2 * 16 + 8;
    assert_eq!(
        pass.header().shader_list_offset as usize,
        expected_list_offset
    );

    let vertex_chunk = pass.shader_chunk(0).unwrap();
    let fragment_chunk = pass.shader_chunk(1).unwrap();
    assert_eq!(vertex_chunk.stage, ShaderStage::Vertex);
    assert_eq!(fragment_chunk.stage, ShaderStage::Fragment);
    assert!(vertex_chunk.code_str().contains("#define VERTEX"));
    assert!(fragment_chunk.code_str().contains("#define FRAGMENT"));
    assert!(vertex_chunk.code_str().contains("void main() { }"));

    let (rasterization, depth_stencil, blend) = pass.render_states().unwrap();
    assert_eq!(rasterization.cull_mode, CullMode::Back);
    assert_eq!(depth_stencil.depth_comparison, ComparisonFunction::LessEqual);
    assert!(depth_stencil.depth_enable);
    assert!(depth_stencil.depth_write_enable);
    assert_eq!(blend.active_states, 0);

    let vertex_input = pass.vertex_input();
    assert_eq!(vertex_input.attributes.len(), 2);
    assert_eq!(vertex_input.attributes[0].location, 0);
    assert_eq!(vertex_input.attributes[1].location, 1);
    assert_eq!(vertex_input.attributes[1].offset, 12);
    assert_eq!(vertex_input.streams.len(), 1);
    assert_eq!(vertex_input.streams[0].stride, 20);

    let bindings = pass.layout_bindings(0).unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].kind, ResourceKind::Constants);
    assert_eq!(bindings[0].name_str(), "LocalConstants");
    assert_eq!(bindings[1].kind, ResourceKind::Texture);
    assert_eq!(bindings[1].name_str(), "albedo");
    assert!(pass.layout_bindings(1).is_none());

    // Pass 1: automatic layout from the scanned uniform.
    let pass = file.pass(1).unwrap();
    assert_eq!(pass.name_str(), "postprocess");
    assert_eq!(pass.header().num_shader_chunks, 1);
    assert_eq!(pass.header().has_resource_state, 0);
    assert_eq!(pass.header().num_resource_layouts, 1);

    let bindings = pass.layout_bindings(0).unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].kind, ResourceKind::Constants);
    assert_eq!(bindings[0].name_str(), "LocalConstants");
    assert_eq!(bindings[1].kind, ResourceKind::Texture);
    assert_eq!(bindings[1].name_str(), "source_texture");

    let pipeline = pass.pipeline();
    assert_eq!(pipeline.stages.len(), 1);
    assert!(pipeline.rasterization.is_none());
    assert_eq!(pipeline.num_active_layouts, 1);

    // std140: the constants block size stays 16-byte aligned.
    assert_eq!(file.local_constants_size() % 16, 0);
    assert_eq!(file.local_constants_default_floats()[0], 1.5);

    assert!(file.pass(2).is_none());
}

#[test]
fn host_module_mirrors_constants() {
    let dir = temp_dir("host_module");
    let input = dir.join("simple.hfx");
    std::fs::write(&input, SIMPLE_HFX).unwrap();

    compile_hfx(&input, &dir, "simple.bfx").unwrap();

    let text = std::fs::read_to_string(dir.join("simple.rs")).unwrap();
    assert!(text.contains("pub mod simple {"));
    assert!(text.contains("pub struct LocalConstants {"));
    assert!(text.contains("pub scale: f32,"));
    assert!(text.contains("pub pad_tail: [f32; 3],"));
    assert!(text.contains("scale: 2.0,"));
    assert!(text.contains("pub struct LocalConstantsUI {"));
    assert!(text.contains("pub fn reflect_members(&mut self, ui: &mut egui::Ui)"));
    assert!(text.contains("pub struct LocalConstantsBuffer {"));
    assert!(text.contains("device.update_buffer(buffer, bytemuck::bytes_of(&self.constants));"));
}
