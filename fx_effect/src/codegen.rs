//! HFX code generation: per-stage shader sources, the binary effect
//! container, and the host-side constants module.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use fx_graphics::{
    to_fixed_str, Encode, ResourceBinding, ResourceKind, ShaderStage, RENDER_STATE_SIZE,
    VERTEX_ATTRIBUTE_SIZE, VERTEX_STREAM_SIZE,
};
use fx_lexer::{NumberBuffer, StringArray, StringBuffer, INVALID_NUMBER_INDEX};

use crate::ast::{
    include_is_local, include_stage, CodeFragment, Pass, PropertyKind, Shader,
};
use crate::file::{
    ChunkHeader, EffectHeader, MaterialProperty, PassHeader, ShaderChunk, CHUNK_HEADER_SIZE,
    EFFECT_HEADER_SIZE, PASS_HEADER_SIZE, SHADER_CHUNK_SIZE,
};
use crate::EffectError;

/// Output file extension per stage; the trailing entry is the
/// stage-agnostic one.
pub const STAGE_EXTENSIONS: [&str; 7] = [
    ".vert", ".frag", ".geom", ".comp", ".tesc", ".tese", ".h",
];

/// Define prepended to each stage's source.
pub const STAGE_DEFINES: [&str; 7] = [
    "#define VERTEX\r\n",
    "#define FRAGMENT\r\n",
    "#define GEOMETRY\r\n",
    "#define COMPUTE\r\n",
    "#define HULL\r\n",
    "#define DOMAIN\r\n",
    "\r\n",
];

/// Capacity of the scratch arena one finalized shader is assembled in.
const CODE_BUFFER_CAPACITY: usize = 1024 * 1024;

/// The synthesized std140 block plus everything derived from it.
struct ConstantsLayout {
    /// GLSL uniform block, empty when the shader has no properties.
    glsl: String,
    /// `(kind, size, values…)` record for the defaults section, or a bare
    /// zero placeholder when there are no properties.
    defaults: Vec<u8>,
    /// Byte offset inside `LocalConstants` per property; zero for
    /// non-scalar kinds.
    offsets: Vec<u16>,
    /// Total std140 block size in bytes, tail padding included.
    buffer_size: u32,
}

pub struct CodeGenerator<'a> {
    shader: &'a Shader,
    numbers: &'a NumberBuffer,
    input_dir: PathBuf,
    binary_magic: [u8; 32],
}

impl<'a> CodeGenerator<'a> {
    pub fn new(
        shader: &'a Shader,
        numbers: &'a NumberBuffer,
        input_dir: &Path,
        binary_magic: [u8; 32],
    ) -> Self {
        Self {
            shader,
            numbers,
            input_dir: input_dir.to_owned(),
            binary_magic,
        }
    }

    /// Walks the properties once, emitting the GLSL block, the defaults
    /// record and per-property offsets in lockstep so they cannot drift.
    fn local_constants(&self) -> ConstantsLayout {
        let properties = &self.shader.properties;
        let mut offsets = vec![0u16; properties.len()];
        let mut defaults = Vec::new();

        if properties.is_empty() {
            0u32.encode(&mut defaults);
            return ConstantsLayout {
                glsl: String::new(),
                defaults,
                offsets,
                buffer_size: 0,
            };
        }

        let mut glsl = String::new();
        glsl.push_str("\n\t\tlayout (std140, binding=7) uniform LocalConstants {\n\n");

        ResourceKind::Constants.encode(&mut defaults);
        // Size is known only after the walk; patched below.
        let size_slot = defaults.len();
        0u32.encode(&mut defaults);

        // The GPU block must stay 16-byte aligned; track in 4-byte units.
        let mut gpu_alignment = 0u32;

        for (index, property) in properties.iter().enumerate() {
            match property.kind {
                PropertyKind::Float => {
                    let _ = writeln!(glsl, "\t\t\tfloat\t\t\t\t\t{};", property.name);

                    let value = if property.data_index != INVALID_NUMBER_INDEX {
                        self.numbers.get_f32(property.data_index)
                    } else {
                        0.0
                    };
                    value.encode(&mut defaults);

                    offsets[index] = (gpu_alignment * 4) as u16;
                    gpu_alignment += 1;
                }
                // Int, Range, Color, Vector and the texture kinds are
                // reserved; they occupy no constant storage in v1.
                _ => {}
            }
        }

        let tail_padding = 4 - gpu_alignment % 4;
        let _ = writeln!(glsl, "\t\t\tfloat\t\t\t\t\tpad_tail[{tail_padding}];\n");
        glsl.push_str("\t\t} local_constants;\n\n");

        for _ in 0..tail_padding {
            0.0f32.encode(&mut defaults);
        }

        let buffer_size = (gpu_alignment + tail_padding) * 4;
        defaults[size_slot..size_slot + 4].copy_from_slice(&buffer_size.to_le_bytes());

        ConstantsLayout {
            glsl,
            defaults,
            offsets,
            buffer_size,
        }
    }

    /// Assembles one stage's final source into `code_buffer`: resolved
    /// includes, the stage define, the constants block and the fragment
    /// body. Embedded chunks get a backpatched [`ChunkHeader`] prefix and a
    /// NUL terminator.
    fn append_finalized_code(
        &self,
        stage: ShaderStage,
        fragment: &CodeFragment,
        code_buffer: &mut StringBuffer,
        embedded: bool,
        constants_glsl: &str,
    ) {
        let header_span = embedded.then(|| code_buffer.reserve(CHUNK_HEADER_SIZE));
        let body_start = code_buffer.len();

        for (include, &flags) in fragment.includes.iter().zip(&fragment.include_flags) {
            let tagged_stage = include_stage(flags);
            if tagged_stage != stage && tagged_stage != ShaderStage::Count {
                continue;
            }

            if include_is_local(flags) {
                if let Some(id) = self.shader.find_code_fragment(include) {
                    code_buffer.append_str(&self.shader.code_fragment(id).code);
                }
            } else {
                let path = self.input_dir.join(include);
                match std::fs::read_to_string(&path) {
                    Ok(text) => {
                        code_buffer.append_str(&text);
                    }
                    Err(_) => {
                        tracing::warn!("cannot find include file {}", path.display());
                    }
                }
            }

            code_buffer.append_str("\n\n");
        }

        code_buffer.append_str("\n\t\t");
        code_buffer.append_str(STAGE_DEFINES[stage as usize]);
        code_buffer.append_str(constants_glsl);
        code_buffer.append_str("\r\n\t\t");
        code_buffer.append_str(&fragment.code);

        if let Some(span) = header_span {
            code_buffer.append_bytes(&[0]);

            let header = ChunkHeader {
                code_size: (code_buffer.len() - body_start) as u32,
                shader_stage: stage as u32 as i8,
            };
            let mut bytes = Vec::with_capacity(CHUNK_HEADER_SIZE);
            header.encode(&mut bytes);
            code_buffer.patch(span, &bytes);
        }
    }

    /// Writes one `<shader>_<fragment><ext>` file per shader stage of every
    /// pass. A fragment shared by several passes is emitted once.
    pub fn generate_permutations(&self, out_dir: &Path) -> Result<(), EffectError> {
        let constants = self.local_constants();
        let mut emitted = StringArray::new(16 * 1024);

        for pass in &self.shader.passes {
            for stage in &pass.stages {
                let fragment = self.shader.code_fragment(stage.code);

                let filename = format!(
                    "{}_{}{}",
                    self.shader.name,
                    fragment.name,
                    STAGE_EXTENSIONS[stage.stage as usize]
                );

                let (_, first_emission) = emitted.intern(&filename);
                if !first_emission {
                    continue;
                }

                let mut code_buffer = StringBuffer::new(CODE_BUFFER_CAPACITY);
                self.append_finalized_code(
                    stage.stage,
                    fragment,
                    &mut code_buffer,
                    false,
                    &constants.glsl,
                );

                let path = out_dir.join(&filename);
                std::fs::write(&path, code_buffer.as_bytes()).map_err(|source| {
                    EffectError::BinaryWriteFailed {
                        path: path.clone(),
                        source,
                    }
                })?;

                tracing::info!("wrote {}", path.display());
            }
        }

        Ok(())
    }

    /// Synthesized layout for a pass without declared resource lists: the
    /// local constants buffer plus every scanned uniform.
    fn automatic_layout_bindings(&self, pass: &Pass) -> Vec<ResourceBinding> {
        let mut bindings = vec![ResourceBinding::new(
            ResourceKind::Constants,
            "LocalConstants",
        )];

        for stage in &pass.stages {
            let fragment = self.shader.code_fragment(stage.code);
            for resource in &fragment.resources {
                match resource.kind {
                    ResourceKind::Texture | ResourceKind::TextureRW => {
                        bindings.push(ResourceBinding::new(resource.kind, &resource.name));
                    }
                    _ => {}
                }
            }
        }

        bindings
    }

    /// Writes the binary effect container to `out_dir/out_filename`.
    pub fn compile_effect(&self, out_dir: &Path, out_filename: &str) -> Result<(), EffectError> {
        let constants = self.local_constants();

        let pass_count = self.shader.passes.len();
        let offsets_base = EFFECT_HEADER_SIZE + pass_count * 4;

        let mut pass_offsets: Vec<u8> = Vec::with_capacity(pass_count * 4);
        let mut pass_sections: Vec<u8> = Vec::new();

        for pass in &self.shader.passes {
            ((offsets_base + pass_sections.len()) as u32).encode(&mut pass_offsets);

            let vertex_input_size = pass
                .vertex_layout
                .map(|id| {
                    let layout = self.shader.vertex_layout(id);
                    layout.attributes.len() * VERTEX_ATTRIBUTE_SIZE
                        + layout.streams.len() * VERTEX_STREAM_SIZE
                })
                .unwrap_or(0);
            let render_state_size = if pass.render_state.is_some() {
                RENDER_STATE_SIZE
            } else {
                0
            };

            // Chunk offsets are pass-relative and start after the header,
            // the optional state blocks and the chunk list itself.
            let shader_list_offset = render_state_size + vertex_input_size;
            let code_start_offset = PASS_HEADER_SIZE
                + shader_list_offset
                + pass.stages.len() * SHADER_CHUNK_SIZE;

            let mut code_buffer = StringBuffer::new(CODE_BUFFER_CAPACITY);
            let mut chunk_list: Vec<u8> = Vec::with_capacity(pass.stages.len() * SHADER_CHUNK_SIZE);

            for stage in &pass.stages {
                let fragment = self.shader.code_fragment(stage.code);
                let chunk_start = code_buffer.len();

                self.append_finalized_code(
                    stage.stage,
                    fragment,
                    &mut code_buffer,
                    true,
                    &constants.glsl,
                );

                ShaderChunk {
                    start: (code_start_offset + chunk_start) as u32,
                    size: (code_buffer.len() - chunk_start) as u32,
                }
                .encode(&mut chunk_list);
            }

            let automatic_layout = pass.is_resource_layout_automatic();
            let num_resource_layouts = pass.resource_lists.len() + usize::from(automatic_layout);

            let (num_vertex_attributes, num_vertex_streams) = pass
                .vertex_layout
                .map(|id| {
                    let layout = self.shader.vertex_layout(id);
                    (layout.attributes.len() as u8, layout.streams.len() as u8)
                })
                .unwrap_or((0, 0));

            let header = PassHeader {
                num_shader_chunks: pass.stages.len() as u8,
                num_vertex_streams,
                num_vertex_attributes,
                num_resource_layouts: num_resource_layouts as u8,
                has_resource_state: u16::from(pass.render_state.is_some()),
                shader_list_offset: shader_list_offset as u16,
                resource_table_offset: (code_start_offset + code_buffer.len()) as u32,
                name: to_fixed_str(&pass.name),
                stage_name: to_fixed_str(&pass.stage_name),
            };
            header.encode(&mut pass_sections);

            if let Some(id) = pass.render_state {
                let state = self.shader.render_state(id);
                state.rasterization.encode(&mut pass_sections);
                state.depth_stencil.encode(&mut pass_sections);
                state.blend.encode(&mut pass_sections);
            }

            if let Some(id) = pass.vertex_layout {
                let layout = self.shader.vertex_layout(id);
                for attribute in &layout.attributes {
                    attribute.encode(&mut pass_sections);
                }
                for stream in &layout.streams {
                    stream.encode(&mut pass_sections);
                }
            }

            pass_sections.extend_from_slice(&chunk_list);
            pass_sections.extend_from_slice(code_buffer.as_bytes());

            // Declared lists first, in declaration order, then the
            // synthesized one.
            for &list_id in &pass.resource_lists {
                let list = self.shader.resource_list(list_id);
                (list.resources.len() as u8).encode(&mut pass_sections);
                for binding in &list.resources {
                    binding.encode(&mut pass_sections);
                }
            }

            if automatic_layout {
                let bindings = self.automatic_layout_bindings(pass);
                (bindings.len() as u8).encode(&mut pass_sections);
                for binding in &bindings {
                    binding.encode(&mut pass_sections);
                }
            }
        }

        // Defaults section: v1 writes exactly one record.
        let mut defaults_section = Vec::with_capacity(4 + constants.defaults.len());
        1u32.encode(&mut defaults_section);
        defaults_section.extend_from_slice(&constants.defaults);

        let mut properties_section = Vec::new();
        (self.shader.properties.len() as u32).encode(&mut properties_section);
        for (property, &offset) in self.shader.properties.iter().zip(&constants.offsets) {
            MaterialProperty {
                kind: property.kind as u32,
                offset,
                name: to_fixed_str(&property.name),
            }
            .encode(&mut properties_section);
        }

        let resource_defaults_offset = (offsets_base + pass_sections.len()) as u32;
        let header = EffectHeader {
            num_passes: pass_count as u32,
            resource_defaults_offset,
            properties_offset: resource_defaults_offset + defaults_section.len() as u32,
            name: to_fixed_str(&self.shader.name),
            binary_header_magic: self.binary_magic,
            pipeline_name: to_fixed_str(&self.shader.pipeline_name),
        };

        let mut file_bytes = Vec::with_capacity(
            EFFECT_HEADER_SIZE
                + pass_offsets.len()
                + pass_sections.len()
                + defaults_section.len()
                + properties_section.len(),
        );
        header.encode(&mut file_bytes);
        file_bytes.extend_from_slice(&pass_offsets);
        file_bytes.extend_from_slice(&pass_sections);
        file_bytes.extend_from_slice(&defaults_section);
        file_bytes.extend_from_slice(&properties_section);

        let path = out_dir.join(out_filename);
        std::fs::write(&path, &file_bytes).map_err(|source| EffectError::BinaryWriteFailed {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            "wrote {} ({} passes, {} bytes)",
            path.display(),
            pass_count,
            file_bytes.len()
        );
        Ok(())
    }

    /// Emits `<shader>.rs`: the host-side mirror of the local constants
    /// block plus an egui editing surface and a device-facing buffer
    /// wrapper.
    pub fn generate_host_module(&self, out_dir: &Path) -> Result<(), EffectError> {
        let constants = self.local_constants();

        let floats: Vec<(&str, f32)> = self
            .shader
            .properties
            .iter()
            .filter(|property| property.kind == PropertyKind::Float)
            .map(|property| {
                let value = if property.data_index != INVALID_NUMBER_INDEX {
                    self.numbers.get_f32(property.data_index)
                } else {
                    0.0
                };
                (property.name.as_str(), value)
            })
            .collect();
        let tail_padding = 4 - (floats.len() as u32) % 4;

        let mut out = String::new();
        out.push_str("// Generated by fxc. Do not edit.\n\n");
        let _ = writeln!(out, "pub mod {} {{", self.shader.name);
        out.push_str(
            "    use fx_graphics::{BufferDesc, BufferHandle, BufferType, GpuDevice, ResourceUsage};\n\n",
        );

        // GPU-visible constants, std140-compatible.
        out.push_str("    #[repr(C)]\n");
        out.push_str("    #[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]\n");
        out.push_str("    pub struct LocalConstants {\n");
        for (name, _) in &floats {
            let _ = writeln!(out, "        pub {name}: f32,");
        }
        let _ = writeln!(out, "        pub pad_tail: [f32; {tail_padding}],");
        out.push_str("    }\n\n");

        out.push_str("    impl Default for LocalConstants {\n");
        out.push_str("        fn default() -> Self {\n");
        out.push_str("            Self {\n");
        for (name, value) in &floats {
            let _ = writeln!(out, "                {name}: {value:?},");
        }
        let _ = writeln!(out, "                pad_tail: [0.0; {tail_padding}],");
        out.push_str("            }\n");
        out.push_str("        }\n");
        out.push_str("    }\n\n");

        // Editing copy reflected through egui.
        out.push_str("    #[derive(Copy, Clone, Debug)]\n");
        out.push_str("    pub struct LocalConstantsUI {\n");
        for (name, _) in &floats {
            let _ = writeln!(out, "        pub {name}: f32,");
        }
        out.push_str("    }\n\n");

        out.push_str("    impl Default for LocalConstantsUI {\n");
        out.push_str("        fn default() -> Self {\n");
        out.push_str("            Self {\n");
        for (name, value) in &floats {
            let _ = writeln!(out, "                {name}: {value:?},");
        }
        out.push_str("            }\n");
        out.push_str("        }\n");
        out.push_str("    }\n\n");

        out.push_str("    impl LocalConstantsUI {\n");
        out.push_str("        pub fn reflect_members(&mut self, ui: &mut egui::Ui) {\n");
        for property in &self.shader.properties {
            if property.kind != PropertyKind::Float {
                continue;
            }
            let _ = writeln!(
                out,
                "            ui.add(egui::DragValue::new(&mut self.{}).prefix(\"{}: \"));",
                property.name, property.ui_name
            );
        }
        out.push_str("        }\n\n");
        out.push_str("        pub fn reflect_ui(&mut self, ctx: &egui::Context) {\n");
        out.push_str("            egui::Window::new(\"LocalConstants\").show(ctx, |ui| {\n");
        out.push_str("                self.reflect_members(ui);\n");
        out.push_str("            });\n");
        out.push_str("        }\n");
        out.push_str("    }\n\n");

        // Device-facing wrapper.
        out.push_str("    #[derive(Debug, Default)]\n");
        out.push_str("    pub struct LocalConstantsBuffer {\n");
        out.push_str("        pub buffer: Option<BufferHandle>,\n");
        out.push_str("        pub constants: LocalConstants,\n");
        out.push_str("        pub constants_ui: LocalConstantsUI,\n");
        out.push_str("    }\n\n");

        out.push_str("    impl LocalConstantsBuffer {\n");
        out.push_str("        pub fn create<D: GpuDevice>(&mut self, device: &mut D) {\n");
        out.push_str("            let desc = BufferDesc {\n");
        out.push_str("                kind: BufferType::Constant,\n");
        out.push_str("                usage: ResourceUsage::Dynamic,\n");
        out.push_str(
            "                size: std::mem::size_of::<LocalConstants>() as u32,\n",
        );
        out.push_str("                name: \"LocalConstants\",\n");
        out.push_str("            };\n");
        out.push_str("            self.buffer = Some(device.create_buffer(&desc));\n");
        out.push_str("        }\n\n");
        out.push_str("        pub fn destroy<D: GpuDevice>(&mut self, device: &mut D) {\n");
        out.push_str("            if let Some(buffer) = self.buffer.take() {\n");
        out.push_str("                device.destroy_buffer(buffer);\n");
        out.push_str("            }\n");
        out.push_str("        }\n\n");
        out.push_str(
            "        pub fn update_ui<D: GpuDevice>(&mut self, device: &mut D, ctx: &egui::Context) {\n",
        );
        out.push_str("            self.constants_ui.reflect_ui(ctx);\n");
        for (name, _) in &floats {
            let _ = writeln!(
                out,
                "            self.constants.{name} = self.constants_ui.{name};"
            );
        }
        out.push_str("            if let Some(buffer) = self.buffer {\n");
        out.push_str(
            "                device.update_buffer(buffer, bytemuck::bytes_of(&self.constants));\n",
        );
        out.push_str("            }\n");
        out.push_str("        }\n");
        out.push_str("    }\n");
        out.push_str("}\n");

        let path = out_dir.join(format!("{}.rs", self.shader.name));
        std::fs::write(&path, out).map_err(|source| EffectError::BinaryWriteFailed {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            "wrote {} (local constants {} bytes)",
            path.display(),
            constants.buffer_size
        );
        Ok(())
    }
}
