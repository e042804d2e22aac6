//! HFX parser: consumes tokens and builds the [`Shader`] AST.
//!
//! Top-level dispatch is a keyword `match`; declarations share the uniform
//! shape `keyword [name] { body }`. A token mismatch latches the lexer's
//! sticky error, the current declaration is abandoned, and parsing resumes
//! at the top level.

use std::path::{Path, PathBuf};

use fx_graphics::{
    ResourceBinding, ResourceKind, ShaderStage, TextureAddressMode, TextureFilter,
    TextureMipFilter, VertexAttribute, VertexComponentFormat, VertexInputRate, VertexStream,
};
use fx_lexer::{Lexer, NumberBuffer, Token, TokenKind};

use crate::ast::{
    CodeFragment, FragmentResource, Pass, PassStage, Property, PropertyKind, RenderState,
    ResourceList, SamplerState, Shader, VertexLayout, INCLUDE_FLAG_LOCAL,
};
use crate::EffectError;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    shader: Shader,
    input_dir: PathBuf,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>, input_dir: &Path) -> Self {
        Self {
            lexer,
            shader: Shader::default(),
            input_dir: input_dir.to_owned(),
        }
    }

    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    pub fn numbers(&self) -> &NumberBuffer {
        self.lexer.numbers()
    }

    pub fn has_error(&self) -> bool {
        self.lexer.has_error()
    }

    /// The sticky error as a diagnostic, if one was latched.
    pub fn error(&self) -> Option<EffectError> {
        if !self.lexer.has_error() {
            return None;
        }

        let (expected, actual) = self
            .lexer
            .error_detail()
            .unwrap_or((TokenKind::Unknown, TokenKind::Unknown));

        Some(EffectError::UnexpectedToken {
            expected,
            actual,
            line: self.lexer.error_line(),
        })
    }

    pub fn finish(self) -> (Shader, NumberBuffer) {
        (self.shader, self.lexer.take_numbers())
    }

    /// Consumes the whole token stream into the shader AST.
    pub fn generate_ast(&mut self) {
        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::Identifier => self.identifier(token.text),
                TokenKind::EndOfStream => break,
                _ => {}
            }
        }
    }

    fn identifier(&mut self, keyword: &str) {
        match keyword {
            "shader" => self.declaration_shader(),
            "sampler_states" => self.declaration_sampler_states(),
            "glsl" => self.declaration_glsl(),
            "pass" => self.declaration_pass(),
            "properties" => self.declaration_properties(),
            "pipeline" => self.declaration_pipeline(),
            "layout" => self.declaration_layout(),
            "includes" => self.declaration_includes(),
            "render_states" => self.declaration_render_states(),
            _ => {}
        }
    }

    fn declaration_shader(&mut self) {
        let Some(name) = self.lexer.expect_token(TokenKind::Identifier) else {
            return;
        };
        self.shader.name = name.text.to_owned();

        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier => self.identifier(token.text),
                _ => {}
            }
        }
    }

    /// Captures the raw body of `glsl name { … }` by tracking brace depth.
    /// The body is still tokenized, which drives the `#` directive scan and
    /// implicit `uniform` resource detection.
    fn declaration_glsl(&mut self) {
        let Some(name) = self.lexer.expect_token(TokenKind::Identifier) else {
            return;
        };
        let mut fragment = CodeFragment::new(name.text);

        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        let mut token = self.lexer.next_token();
        let code_start = self.lexer.source_offset(&token);
        let mut open_braces = 1u32;

        while open_braces > 0 {
            match token.kind {
                TokenKind::OpenBrace => open_braces += 1,
                TokenKind::CloseBrace => open_braces -= 1,
                TokenKind::EndOfStream => break,
                TokenKind::Hash => {
                    let directive = self.lexer.next_token();
                    self.directive_identifier(&directive, &mut fragment);
                }
                TokenKind::Identifier if token.text == "uniform" => {
                    let uniform = self.lexer.next_token();
                    self.uniform_identifier(&uniform, &mut fragment);
                }
                _ => {}
            }

            // Do not step past the closing brace; the token after it
            // belongs to the enclosing body.
            if open_braces > 0 {
                token = self.lexer.next_token();
            }
        }

        let code_end = self.lexer.source_offset(&token);
        fragment.code = self.lexer.source()[code_start..code_end].to_owned();

        self.shader.code_fragments.push(fragment);
    }

    /// `#if defined <STAGE>` / `#pragma include[_hfx] "path"` / `#endif`.
    fn directive_identifier(&mut self, token: &Token<'a>, fragment: &mut CodeFragment) {
        match token.text {
            "if" => {
                let defined = self.lexer.next_token();
                if defined.text != "defined" {
                    return;
                }

                let symbol = self.lexer.next_token();
                fragment.ifdef_depth += 1;

                let stage = match symbol.text {
                    "VERTEX" => Some(ShaderStage::Vertex),
                    "FRAGMENT" => Some(ShaderStage::Fragment),
                    "COMPUTE" => Some(ShaderStage::Compute),
                    _ => None,
                };

                if let Some(stage) = stage {
                    fragment.stage_ifdef_depth[stage as usize] = fragment.ifdef_depth;
                    fragment.current_stage = stage;
                }
            }
            "pragma" => {
                let directive = self.lexer.next_token();
                match directive.text {
                    "include" => {
                        let path = self.lexer.next_token();
                        fragment.includes.push(path.text.to_owned());
                        fragment.include_flags.push(fragment.current_stage as u32);
                    }
                    "include_hfx" => {
                        let path = self.lexer.next_token();
                        fragment.includes.push(path.text.to_owned());
                        fragment
                            .include_flags
                            .push(fragment.current_stage as u32 | INCLUDE_FLAG_LOCAL);
                    }
                    _ => {}
                }
            }
            "endif" => {
                for stage in [
                    ShaderStage::Vertex,
                    ShaderStage::Fragment,
                    ShaderStage::Compute,
                ] {
                    if fragment.stage_ifdef_depth[stage as usize] == fragment.ifdef_depth {
                        fragment.stage_ifdef_depth[stage as usize] = crate::ast::UNSET_IFDEF_DEPTH;
                        fragment.current_stage = ShaderStage::Count;
                        break;
                    }
                }

                fragment.ifdef_depth = fragment.ifdef_depth.wrapping_sub(1);
            }
            _ => {}
        }
    }

    /// `uniform image2D name` / `uniform sampler2D name` add implicit
    /// resources for automatic binding-table construction.
    fn uniform_identifier(&mut self, token: &Token<'a>, fragment: &mut CodeFragment) {
        let kind = match token.text {
            "image2D" => ResourceKind::TextureRW,
            "sampler2D" => ResourceKind::Texture,
            _ => return,
        };

        let name = self.lexer.next_token();
        fragment.resources.push(FragmentResource {
            kind,
            name: name.text.to_owned(),
        });
    }

    fn declaration_pass(&mut self) {
        let Some(name) = self.lexer.expect_token(TokenKind::Identifier) else {
            return;
        };
        let mut pass = Pass::new(name.text);

        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier => self.pass_identifier(token.text, &mut pass),
                _ => {}
            }
        }

        self.shader.passes.push(pass);
    }

    fn pass_identifier(&mut self, keyword: &str, pass: &mut Pass) {
        match keyword {
            "compute" => self.declaration_shader_stage(ShaderStage::Compute, pass),
            "vertex" => self.declaration_shader_stage(ShaderStage::Vertex, pass),
            "fragment" => self.declaration_shader_stage(ShaderStage::Fragment, pass),
            "resources" => self.declaration_pass_resources(pass),
            "vertex_layout" => self.declaration_pass_vertex_layout(pass),
            "render_states" => self.declaration_pass_render_states(pass),
            "stage" => self.declaration_pass_stage(pass),
            _ => {}
        }
    }

    /// `<stage-keyword> = fragment-name`.
    fn declaration_shader_stage(&mut self, stage: ShaderStage, pass: &mut Pass) {
        if self.lexer.expect_token(TokenKind::Equals).is_none() {
            return;
        }

        let Some(name) = self.lexer.expect_token(TokenKind::Identifier) else {
            return;
        };

        match self.shader.find_code_fragment(name.text) {
            Some(code) => pass.stages.push(PassStage { code, stage }),
            None => tracing::warn!(
                "pass `{}`: {}",
                pass.name,
                EffectError::UnknownIdentifier {
                    name: name.text.to_owned(),
                    line: name.line,
                }
            ),
        }
    }

    fn declaration_pass_resources(&mut self, pass: &mut Pass) {
        if self.lexer.expect_token(TokenKind::Equals).is_none() {
            return;
        }

        let name = self.lexer.next_token();
        match self.shader.find_resource_list(name.text) {
            Some(list) => pass.resource_lists.push(list),
            None => tracing::warn!(
                "pass `{}`: {}",
                pass.name,
                EffectError::UnknownIdentifier {
                    name: name.text.to_owned(),
                    line: name.line,
                }
            ),
        }
    }

    fn declaration_pass_vertex_layout(&mut self, pass: &mut Pass) {
        if self.lexer.expect_token(TokenKind::Equals).is_none() {
            return;
        }

        let name = self.lexer.next_token();
        match self.shader.find_vertex_layout(name.text) {
            Some(layout) => pass.vertex_layout = Some(layout),
            None => tracing::warn!(
                "pass `{}`: {}",
                pass.name,
                EffectError::UnknownIdentifier {
                    name: name.text.to_owned(),
                    line: name.line,
                }
            ),
        }
    }

    fn declaration_pass_render_states(&mut self, pass: &mut Pass) {
        if self.lexer.expect_token(TokenKind::Equals).is_none() {
            return;
        }

        let name = self.lexer.next_token();
        match self.shader.find_render_state(name.text) {
            Some(state) => pass.render_state = Some(state),
            None => tracing::warn!(
                "pass `{}`: {}",
                pass.name,
                EffectError::UnknownIdentifier {
                    name: name.text.to_owned(),
                    line: name.line,
                }
            ),
        }
    }

    fn declaration_pass_stage(&mut self, pass: &mut Pass) {
        if self.lexer.expect_token(TokenKind::Equals).is_none() {
            return;
        }

        let Some(name) = self.lexer.expect_token(TokenKind::Identifier) else {
            return;
        };
        pass.stage_name = name.text.to_owned();
    }

    fn declaration_pipeline(&mut self) {
        if self.lexer.expect_token(TokenKind::Equals).is_none() {
            return;
        }

        let Some(name) = self.lexer.expect_token(TokenKind::Identifier) else {
            return;
        };
        self.shader.pipeline_name = name.text.to_owned();
    }

    fn declaration_properties(&mut self) {
        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        let mut open_braces = 1u32;
        let mut token = self.lexer.next_token();

        while open_braces > 0 {
            match token.kind {
                TokenKind::OpenBrace => open_braces += 1,
                TokenKind::CloseBrace => open_braces -= 1,
                TokenKind::EndOfStream => break,
                TokenKind::Identifier => self.declaration_property(token.text),
                _ => {}
            }

            if open_braces > 0 {
                token = self.lexer.next_token();
            }
        }
    }

    /// `name("ui name", Type[(ui_args)]) [= default] ;`
    fn declaration_property(&mut self, name: &str) {
        let mut property = Property::new(name);

        if self.lexer.expect_token(TokenKind::OpenParen).is_none() {
            return;
        }

        let Some(ui_name) = self.lexer.expect_token(TokenKind::String) else {
            return;
        };
        property.ui_name = ui_name.text.to_owned();

        if self.lexer.expect_token(TokenKind::Comma).is_none() {
            return;
        }

        // The type is either one identifier or a number joined with the
        // following identifier (`2D`, `3D`, …).
        let mut token = self.lexer.next_token();
        let type_text;
        if token.kind == TokenKind::Number {
            let number = token;
            token = self.lexer.next_token();

            let start = self.lexer.source_offset(&number);
            let end = self.lexer.source_offset(&token) + token.text.len();
            type_text = &self.lexer.source()[start..end];
        } else {
            type_text = token.text;
        }

        if token.kind != TokenKind::Identifier {
            return;
        }

        property.kind = property_type_identifier(type_text);

        // Optional UI arguments in parentheses; captured verbatim.
        let mut token = self.lexer.next_token();
        if token.kind == TokenKind::OpenParen {
            let args_start = self.lexer.source_offset(&token);

            loop {
                let inner = self.lexer.next_token();
                if matches!(inner.kind, TokenKind::CloseParen | TokenKind::EndOfStream) {
                    break;
                }
            }

            token = self.lexer.next_token();
            let args_end = self.lexer.source_offset(&token);
            property.ui_arguments = self.lexer.source()[args_start..args_end].to_owned();
        }

        if !self.lexer.check_token(&token, TokenKind::CloseParen) {
            return;
        }

        // Optional default. Backtrack one token if it is not there.
        let state = self.lexer.state();
        let token = self.lexer.next_token();
        if token.kind == TokenKind::Equals {
            let value = self.lexer.next_token();
            match value.kind {
                TokenKind::Number => {
                    property.data_index = self.lexer.numbers().last_index();
                }
                TokenKind::OpenParen => {
                    // Color and vector groups: consumed by the outer
                    // properties loop, unused in v1.
                }
                TokenKind::String => {
                    property.default_value = value.text.to_owned();
                }
                _ => {}
            }
        } else {
            self.lexer.restore(state);
        }

        self.shader.properties.push(property);
    }

    fn declaration_layout(&mut self) {
        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier if token.text == "list" => {
                    let name = self.lexer.next_token();
                    let mut list = ResourceList {
                        name: name.text.to_owned(),
                        ..ResourceList::default()
                    };

                    self.declaration_resource_list(&mut list);
                    self.shader.resource_lists.push(list);

                    // At least one declared list disables automatic layout
                    // generation for the shader.
                    self.shader.has_local_resource_list = true;
                }
                TokenKind::Identifier if token.text == "vertex" => {
                    let name = self.lexer.next_token();
                    let mut layout = VertexLayout {
                        name: name.text.to_owned(),
                        ..VertexLayout::default()
                    };

                    self.declaration_vertex_layout(&mut layout);
                    self.shader.vertex_layouts.push(layout);
                }
                _ => {}
            }
        }
    }

    fn declaration_resource_list(&mut self, list: &mut ResourceList) {
        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier => {
                    if let Some((binding, flags)) = self.resource_binding_identifier(token.text) {
                        list.resources.push(binding);
                        list.flags.push(flags);
                    }
                }
                _ => {}
            }
        }
    }

    /// `cbuffer name | texture2D name | texture2Drw _ name | sampler2D name`.
    /// The flag marks bindings whose name matches a declared property.
    fn resource_binding_identifier(&mut self, keyword: &str) -> Option<(ResourceBinding, u32)> {
        let kind = match keyword {
            "cbuffer" => ResourceKind::Constants,
            "texture2D" => ResourceKind::Texture,
            "texture2Drw" => {
                // Skip the format placeholder between keyword and name.
                self.lexer.next_token();
                ResourceKind::TextureRW
            }
            "sampler2D" => ResourceKind::Sampler,
            _ => return None,
        };

        let name = self.lexer.next_token();
        let binding = ResourceBinding::new(kind, name.text);
        let flags = u32::from(self.shader.find_property(name.text).is_some());

        Some((binding, flags))
    }

    fn declaration_vertex_layout(&mut self, layout: &mut VertexLayout) {
        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier if token.text == "attribute" => {
                    let format = self.lexer.next_token();
                    let attribute = self.vertex_attribute_identifier(format.text);
                    layout.attributes.push(attribute);
                }
                TokenKind::Identifier if token.text == "binding" => {
                    self.lexer.next_token();
                    let stream = self.vertex_binding_identifier();
                    layout.streams.push(stream);
                }
                _ => {}
            }
        }
    }

    /// `attribute <format> <name> <binding> <location> <offset> <rate>`.
    fn vertex_attribute_identifier(&mut self, format_text: &str) -> VertexAttribute {
        let format = match format_text {
            "float" => VertexComponentFormat::Float,
            "float2" => VertexComponentFormat::Float2,
            "float3" => VertexComponentFormat::Float3,
            "float4" => VertexComponentFormat::Float4,
            "byte" => VertexComponentFormat::Byte,
            "byte4n" => VertexComponentFormat::Byte4N,
            "ubyte" => VertexComponentFormat::UByte,
            "ubyte4n" => VertexComponentFormat::UByte4N,
            "short2" => VertexComponentFormat::Short2,
            "short2n" => VertexComponentFormat::Short2N,
            "short4" => VertexComponentFormat::Short4,
            "short4n" => VertexComponentFormat::Short4N,
            _ => {
                tracing::warn!("unknown vertex attribute format `{format_text}`");
                VertexComponentFormat::Count
            }
        };

        // Skip the attribute name.
        self.lexer.next_token();

        self.lexer.next_token();
        let binding = self.last_number() as u16;

        self.lexer.next_token();
        let location = self.last_number() as u16;

        self.lexer.next_token();
        let offset = self.last_number() as u32;

        let rate = self.lexer.next_token();
        let input_rate = match rate.text {
            "vertex" => VertexInputRate::PerVertex,
            "instance" => VertexInputRate::PerInstance,
            _ => VertexInputRate::PerVertex,
        };

        VertexAttribute {
            location,
            binding,
            offset,
            format,
            input_rate,
        }
    }

    /// `binding <index> <stride>`; the index token is already consumed.
    fn vertex_binding_identifier(&mut self) -> VertexStream {
        let binding = self.last_number() as u16;

        self.lexer.next_token();
        let stride = self.last_number() as u16;

        VertexStream {
            binding,
            stride,
            ..VertexStream::default()
        }
    }

    fn last_number(&self) -> f32 {
        self.lexer.numbers().get_f32(self.lexer.numbers().last_index())
    }

    fn declaration_render_states(&mut self) {
        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier if token.text == "state" => {
                    let name = self.lexer.next_token();
                    let mut state = RenderState {
                        name: name.text.to_owned(),
                        ..RenderState::default()
                    };

                    self.declaration_render_state(&mut state);
                    self.shader.render_states.push(state);
                }
                _ => {}
            }
        }
    }

    fn declaration_render_state(&mut self, state: &mut RenderState) {
        use fx_graphics::{ComparisonFunction, CullMode};

        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier => match token.text {
                    "Cull" => {
                        let value = self.lexer.next_token();
                        state.rasterization.cull_mode = match value.text {
                            "Back" => CullMode::Back,
                            "Front" => CullMode::Front,
                            _ => CullMode::None,
                        };
                    }
                    "ZTest" => {
                        let value = self.lexer.next_token();
                        state.depth_stencil.depth_comparison = match value.text {
                            "Less" => ComparisonFunction::Less,
                            "Greater" => ComparisonFunction::Greater,
                            "LEqual" => ComparisonFunction::LessEqual,
                            "GEqual" => ComparisonFunction::GreaterEqual,
                            "Equal" => ComparisonFunction::Equal,
                            "NotEqual" => ComparisonFunction::NotEqual,
                            _ => ComparisonFunction::Always,
                        };
                        state.depth_stencil.depth_enable = true;
                    }
                    "ZWrite" => {
                        let value = self.lexer.next_token();
                        state.depth_stencil.depth_write_enable = value.text == "On";
                    }
                    "BlendMode" => {
                        let value = self.lexer.next_token();
                        // Premultiplied and Additive are reserved; the
                        // state slot still counts.
                        if value.text == "Alpha" {
                            state.blend.push_alpha();
                        }
                        state.blend.active_states += 1;
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    fn declaration_sampler_states(&mut self) {
        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier if token.text == "state" => {
                    let name = self.lexer.next_token();
                    let mut state = SamplerState {
                        name: name.text.to_owned(),
                        ..SamplerState::default()
                    };

                    self.declaration_sampler_state(&mut state);
                    self.shader.sampler_states.push(state);
                }
                _ => {}
            }
        }
    }

    fn declaration_sampler_state(&mut self, state: &mut SamplerState) {
        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier => match token.text {
                    "Filter" => {
                        let value = self.lexer.next_token();
                        if value.text == "MinMagMipLinear" {
                            state.sampler.min_filter = TextureFilter::Linear;
                            state.sampler.mag_filter = TextureFilter::Linear;
                            state.sampler.mip_filter = TextureMipFilter::Linear;
                        }
                    }
                    "AddressU" => {
                        let value = self.lexer.next_token();
                        if value.text == "Clamp" {
                            state.sampler.address_mode_u = TextureAddressMode::ClampBorder;
                        }
                    }
                    "AddressV" => {
                        let value = self.lexer.next_token();
                        if value.text == "Clamp" {
                            state.sampler.address_mode_v = TextureAddressMode::ClampBorder;
                        }
                    }
                    "AddressW" => {
                        let value = self.lexer.next_token();
                        if value.text == "Clamp" {
                            state.sampler.address_mode_w = TextureAddressMode::ClampBorder;
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    /// `includes { "path" … }`: each path is parsed with a fresh lexer and
    /// parser, then its resource lists and code fragments are merged into
    /// this shader under `<parent>.<original>` names. Properties, passes,
    /// vertex layouts and render/sampler states of the include are not
    /// merged.
    fn declaration_includes(&mut self) {
        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::String => self.parse_include(token.text),
                _ => {}
            }
        }
    }

    fn parse_include(&mut self, relative: &str) {
        let path = self.input_dir.join(relative);

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!("cannot find include file {}", path.display());
                return;
            }
        };

        let mut child = Parser::new(Lexer::new(&text), &self.input_dir);
        child.generate_ast();

        if let Some(error) = child.error() {
            tracing::warn!("{}: {error}", path.display());
        }

        let (child_shader, _) = child.finish();
        let parent = self.shader.name.clone();

        for mut list in child_shader.resource_lists {
            list.name = format!("{parent}.{}", list.name);
            self.shader.resource_lists.push(list);
        }

        for mut fragment in child_shader.code_fragments {
            fragment.name = format!("{parent}.{}", fragment.name);
            self.shader.code_fragments.push(fragment);
        }
    }
}

fn property_type_identifier(text: &str) -> PropertyKind {
    match text {
        "Float" => PropertyKind::Float,
        "Int" => PropertyKind::Int,
        "Range" => PropertyKind::Range,
        "Color" => PropertyKind::Color,
        "Vector" => PropertyKind::Vector,
        "1D" => PropertyKind::Texture1D,
        "2D" => PropertyKind::Texture2D,
        "3D" => PropertyKind::Texture3D,
        "Volume" => PropertyKind::TextureVolume,
        _ => PropertyKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::Parser;
    use crate::ast::{PropertyKind, UNSET_IFDEF_DEPTH};
    use fx_graphics::{ComparisonFunction, CullMode, ResourceKind, ShaderStage};
    use fx_lexer::Lexer;
    use std::path::Path;

    fn parse(source: &str) -> Parser<'_> {
        let mut parser = Parser::new(Lexer::new(source), Path::new("."));
        parser.generate_ast();
        parser
    }

    #[test]
    fn parses_shader_with_pass_and_fragment() {
        let parser = parse(
            "shader simple {\n\
             glsl main { void main() { gl_FragColor = vec4(1.0); } }\n\
             pass p0 { fragment = main }\n\
             }",
        );

        let shader = parser.shader();
        assert_eq!(shader.name, "simple");
        assert_eq!(shader.code_fragments.len(), 1);
        assert_eq!(shader.passes.len(), 1);

        let pass = &shader.passes[0];
        assert_eq!(pass.name, "p0");
        assert_eq!(pass.stages.len(), 1);
        assert_eq!(pass.stages[0].stage, ShaderStage::Fragment);

        let fragment = shader.code_fragment(pass.stages[0].code);
        assert!(fragment.code.contains("gl_FragColor"));
    }

    #[test]
    fn glsl_capture_preserves_nested_braces() {
        let parser = parse("glsl body { if (x) { y(); } else { z(); } }");

        let fragment = &parser.shader().code_fragments[0];
        assert!(fragment.code.contains("{ y(); }"));
        assert!(fragment.code.contains("{ z(); }"));
        // The outermost closing brace is not part of the code.
        assert!(!fragment.code.trim_end().ends_with("} }"));
    }

    #[test]
    fn property_with_default_records_number_index() {
        let parser = parse("properties { scale(\"Scale\", Float) = 2.0; }");

        let shader = parser.shader();
        assert_eq!(shader.properties.len(), 1);

        let property = &shader.properties[0];
        assert_eq!(property.name, "scale");
        assert_eq!(property.ui_name, "Scale");
        assert_eq!(property.kind, PropertyKind::Float);
        assert_eq!(parser.numbers().get(property.data_index), 2.0);
    }

    #[test]
    fn property_without_default_backtracks() {
        let parser = parse(
            "properties {\n\
             scale(\"Scale\", Float);\n\
             tint(\"Tint\", Color) = (1, 0, 0, 1);\n\
             albedo(\"Albedo\", 2D) = \"white.png\";\n\
             }",
        );

        let shader = parser.shader();
        assert_eq!(shader.properties.len(), 3);
        assert_eq!(
            shader.properties[0].data_index,
            fx_lexer::INVALID_NUMBER_INDEX
        );
        assert_eq!(shader.properties[1].kind, PropertyKind::Color);
        assert_eq!(shader.properties[2].kind, PropertyKind::Texture2D);
        assert_eq!(shader.properties[2].default_value, "white.png");
    }

    #[test]
    fn property_ui_arguments_are_captured() {
        let parser = parse("properties { power(\"Power\", Range(0, 10)) = 5; }");

        let property = &parser.shader().properties[0];
        assert_eq!(property.kind, PropertyKind::Range);
        assert!(property.ui_arguments.starts_with('('));
        assert!(property.ui_arguments.contains("0, 10"));
    }

    #[test]
    fn ifdef_tracking_balances_and_tags_includes() {
        let parser = parse(
            "glsl staged {\n\
             #pragma include \"common.glsl\"\n\
             #if defined VERTEX\n\
             #pragma include \"vs.glsl\"\n\
             #endif\n\
             #if defined FRAGMENT\n\
             #pragma include_hfx \"shared\"\n\
             #endif\n\
             void main() {}\n\
             }",
        );

        let fragment = &parser.shader().code_fragments[0];

        assert_eq!(fragment.ifdef_depth, 0);
        assert!(fragment
            .stage_ifdef_depth
            .iter()
            .all(|&depth| depth == UNSET_IFDEF_DEPTH));

        assert_eq!(fragment.includes, ["common.glsl", "vs.glsl", "shared"]);
        assert_eq!(
            crate::ast::include_stage(fragment.include_flags[0]),
            ShaderStage::Count
        );
        assert_eq!(
            crate::ast::include_stage(fragment.include_flags[1]),
            ShaderStage::Vertex
        );
        assert_eq!(
            crate::ast::include_stage(fragment.include_flags[2]),
            ShaderStage::Fragment
        );
        assert!(crate::ast::include_is_local(fragment.include_flags[2]));
        assert!(!crate::ast::include_is_local(fragment.include_flags[1]));
    }

    #[test]
    fn uniform_scan_collects_implicit_resources() {
        let parser = parse(
            "glsl compute_main {\n\
             layout(rgba8) uniform image2D destination;\n\
             uniform sampler2D albedo;\n\
             void main() {}\n\
             }",
        );

        let fragment = &parser.shader().code_fragments[0];
        assert_eq!(fragment.resources.len(), 2);
        assert_eq!(fragment.resources[0].kind, ResourceKind::TextureRW);
        assert_eq!(fragment.resources[0].name, "destination");
        assert_eq!(fragment.resources[1].kind, ResourceKind::Texture);
        assert_eq!(fragment.resources[1].name, "albedo");
    }

    #[test]
    fn layout_lists_and_vertex_layouts() {
        let parser = parse(
            "layout {\n\
             list main_resources {\n\
             cbuffer LocalConstants\n\
             texture2D albedo\n\
             sampler2D default_sampler\n\
             }\n\
             vertex basic {\n\
             attribute float3 position 0 0 0 vertex\n\
             attribute float2 uv 0 1 12 vertex\n\
             binding 0 20\n\
             }\n\
             }",
        );

        let shader = parser.shader();
        assert!(shader.has_local_resource_list);

        let list = &shader.resource_lists[0];
        assert_eq!(list.name, "main_resources");
        assert_eq!(list.resources.len(), 3);
        assert_eq!(list.resources[0].kind, ResourceKind::Constants);
        assert_eq!(list.resources[0].name_str(), "LocalConstants");
        assert_eq!(list.resources[2].kind, ResourceKind::Sampler);

        let layout = &shader.vertex_layouts[0];
        assert_eq!(layout.attributes.len(), 2);
        assert_eq!(layout.attributes[1].location, 1);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.streams.len(), 1);
        assert_eq!(layout.streams[0].stride, 20);
    }

    #[test]
    fn render_state_fields() {
        let parser = parse(
            "render_states {\n\
             state opaque {\n\
             Cull Back\n\
             ZTest LEqual\n\
             ZWrite On\n\
             }\n\
             state transparent {\n\
             BlendMode Alpha\n\
             ZWrite Off\n\
             }\n\
             }",
        );

        let shader = parser.shader();
        assert_eq!(shader.render_states.len(), 2);

        let opaque = &shader.render_states[0];
        assert_eq!(opaque.rasterization.cull_mode, CullMode::Back);
        assert_eq!(
            opaque.depth_stencil.depth_comparison,
            ComparisonFunction::LessEqual
        );
        assert!(opaque.depth_stencil.depth_enable);
        assert!(opaque.depth_stencil.depth_write_enable);

        let transparent = &shader.render_states[1];
        assert_eq!(transparent.blend.active_states, 1);
        assert!(transparent.blend.blocks[0].blend_enabled);
        assert!(!transparent.depth_stencil.depth_write_enable);
    }

    #[test]
    fn sampler_state_fields() {
        let parser = parse(
            "sampler_states {\n\
             state linear_clamp {\n\
             Filter MinMagMipLinear\n\
             AddressU Clamp\n\
             AddressV Clamp\n\
             }\n\
             }",
        );

        let state = &parser.shader().sampler_states[0];
        assert_eq!(state.name, "linear_clamp");
        assert_eq!(state.sampler.min_filter, fx_graphics::TextureFilter::Linear);
        assert_eq!(
            state.sampler.address_mode_u,
            fx_graphics::TextureAddressMode::ClampBorder
        );
        assert_eq!(
            state.sampler.address_mode_w,
            fx_graphics::TextureAddressMode::Repeat
        );
    }

    #[test]
    fn pass_references_resolve_by_name() {
        let parser = parse(
            "shader full {\n\
             glsl main { void main() {} }\n\
             layout { list res { cbuffer Constants } vertex basic { binding 0 16 } }\n\
             render_states { state opaque { Cull Back } }\n\
             pass p0 {\n\
             stage = geometry\n\
             vertex = main\n\
             fragment = main\n\
             resources = res\n\
             vertex_layout = basic\n\
             render_states = opaque\n\
             }\n\
             }",
        );

        let shader = parser.shader();
        let pass = &shader.passes[0];

        assert_eq!(pass.stage_name, "geometry");
        assert_eq!(pass.stages.len(), 2);
        assert_eq!(pass.resource_lists.len(), 1);
        assert!(pass.vertex_layout.is_some());
        assert!(pass.render_state.is_some());
        assert!(!pass.is_resource_layout_automatic());
    }

    #[test]
    fn unknown_references_are_dropped() {
        let parser = parse(
            "shader broken {\n\
             pass p0 { fragment = missing resources = nothing }\n\
             }",
        );

        let pass = &parser.shader().passes[0];
        assert!(pass.stages.is_empty());
        assert!(pass.resource_lists.is_empty());
        assert!(pass.is_resource_layout_automatic());
    }

    #[test]
    fn sticky_error_reports_first_line() {
        let mut parser = Parser::new(Lexer::new("pass {\n fragment = x }"), Path::new("."));
        parser.generate_ast();

        assert!(parser.has_error());
        let error = parser.error().unwrap();
        assert!(error.to_string().contains("line 1"));
    }
}
