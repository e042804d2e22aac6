//! Render and sampler state blocks as they appear inside a pass section.
//!
//! A pass that carries render state stores the triple
//! Rasterization ∥ DepthStencil ∥ BlendState back to back, packed
//! field-by-field with no implicit padding.

use bytes::{Buf, BufMut};

use crate::enums::{
    Blend, BlendOperation, ColorWriteMask, ComparisonFunction, CullMode, FillMode, FrontClockwise,
    StencilOp, TextureAddressMode, TextureFilter, TextureMipFilter,
};
use crate::{Decode, Encode, EnumDecodeError};

pub const STENCIL_OP_STATE_SIZE: usize = 16;
pub const DEPTH_STENCIL_STATE_SIZE: usize = STENCIL_OP_STATE_SIZE * 2 + 8;
pub const BLEND_BLOCK_SIZE: usize = 28;
pub const MAX_BLEND_TARGETS: usize = 8;
pub const BLEND_STATE_SIZE: usize = BLEND_BLOCK_SIZE * MAX_BLEND_TARGETS + 4;
pub const RASTERIZATION_STATE_SIZE: usize = 12;

/// Byte size of the full render-state triple in a pass section.
pub const RENDER_STATE_SIZE: usize =
    RASTERIZATION_STATE_SIZE + DEPTH_STENCIL_STATE_SIZE + BLEND_STATE_SIZE;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StencilOpState {
    pub fail: StencilOp,
    pub pass: StencilOp,
    pub depth_fail: StencilOp,
    pub compare: ComparisonFunction,
}

impl Default for StencilOpState {
    fn default() -> Self {
        Self {
            fail: StencilOp::Keep,
            pass: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            compare: ComparisonFunction::Always,
        }
    }
}

impl Encode for StencilOpState {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        self.fail.encode(&mut buf);
        self.pass.encode(&mut buf);
        self.depth_fail.encode(&mut buf);
        self.compare.encode(&mut buf);
    }
}

impl Decode for StencilOpState {
    type Error = EnumDecodeError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        Ok(Self {
            fail: StencilOp::decode(&mut buf)?,
            pass: StencilOp::decode(&mut buf)?,
            depth_fail: StencilOp::decode(&mut buf)?,
            compare: ComparisonFunction::decode(&mut buf)?,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DepthStencilState {
    pub front: StencilOpState,
    pub back: StencilOpState,
    pub depth_comparison: ComparisonFunction,
    pub depth_enable: bool,
    pub depth_write_enable: bool,
    pub stencil_enable: bool,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            front: StencilOpState::default(),
            back: StencilOpState::default(),
            depth_comparison: ComparisonFunction::Less,
            depth_enable: false,
            depth_write_enable: false,
            stencil_enable: false,
        }
    }
}

impl Encode for DepthStencilState {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        self.front.encode(&mut buf);
        self.back.encode(&mut buf);
        self.depth_comparison.encode(&mut buf);
        u8::from(self.depth_enable).encode(&mut buf);
        u8::from(self.depth_write_enable).encode(&mut buf);
        u8::from(self.stencil_enable).encode(&mut buf);
        0u8.encode(&mut buf);
    }
}

impl Decode for DepthStencilState {
    type Error = EnumDecodeError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        let front = StencilOpState::decode(&mut buf)?;
        let back = StencilOpState::decode(&mut buf)?;
        let depth_comparison = ComparisonFunction::decode(&mut buf)?;
        let depth_enable = u8::decode(&mut buf).map_err(EnumDecodeError::Eof)? != 0;
        let depth_write_enable = u8::decode(&mut buf).map_err(EnumDecodeError::Eof)? != 0;
        let stencil_enable = u8::decode(&mut buf).map_err(EnumDecodeError::Eof)? != 0;
        let _pad = u8::decode(&mut buf).map_err(EnumDecodeError::Eof)?;

        Ok(Self {
            front,
            back,
            depth_comparison,
            depth_enable,
            depth_write_enable,
            stencil_enable,
        })
    }
}

/// Blend configuration for one color target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlendBlock {
    pub source_color: Blend,
    pub destination_color: Blend,
    pub color_operation: BlendOperation,
    pub source_alpha: Blend,
    pub destination_alpha: Blend,
    pub alpha_operation: BlendOperation,
    pub color_write_mask: ColorWriteMask,
    pub blend_enabled: bool,
    pub separate_blend: bool,
}

impl Default for BlendBlock {
    fn default() -> Self {
        Self {
            source_color: Blend::One,
            destination_color: Blend::One,
            color_operation: BlendOperation::Add,
            source_alpha: Blend::One,
            destination_alpha: Blend::One,
            alpha_operation: BlendOperation::Add,
            color_write_mask: ColorWriteMask::ALL,
            blend_enabled: false,
            separate_blend: false,
        }
    }
}

impl Encode for BlendBlock {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        self.source_color.encode(&mut buf);
        self.destination_color.encode(&mut buf);
        self.color_operation.encode(&mut buf);
        self.source_alpha.encode(&mut buf);
        self.destination_alpha.encode(&mut buf);
        self.alpha_operation.encode(&mut buf);
        self.color_write_mask.bits().encode(&mut buf);
        u8::from(self.blend_enabled).encode(&mut buf);
        u8::from(self.separate_blend).encode(&mut buf);
        0u8.encode(&mut buf);
    }
}

impl Decode for BlendBlock {
    type Error = EnumDecodeError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        let source_color = Blend::decode(&mut buf)?;
        let destination_color = Blend::decode(&mut buf)?;
        let color_operation = BlendOperation::decode(&mut buf)?;
        let source_alpha = Blend::decode(&mut buf)?;
        let destination_alpha = Blend::decode(&mut buf)?;
        let alpha_operation = BlendOperation::decode(&mut buf)?;
        let mask = u8::decode(&mut buf).map_err(EnumDecodeError::Eof)?;
        let blend_enabled = u8::decode(&mut buf).map_err(EnumDecodeError::Eof)? != 0;
        let separate_blend = u8::decode(&mut buf).map_err(EnumDecodeError::Eof)? != 0;
        let _pad = u8::decode(&mut buf).map_err(EnumDecodeError::Eof)?;

        Ok(Self {
            source_color,
            destination_color,
            color_operation,
            source_alpha,
            destination_alpha,
            alpha_operation,
            color_write_mask: ColorWriteMask::from_bits_truncate(mask),
            blend_enabled,
            separate_blend,
        })
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BlendState {
    pub blocks: [BlendBlock; MAX_BLEND_TARGETS],
    pub active_states: u32,
}

impl BlendState {
    /// Enables standard alpha blending on the next free target.
    pub fn push_alpha(&mut self) {
        if let Some(block) = self.blocks.get_mut(self.active_states as usize) {
            block.blend_enabled = true;
            block.color_operation = BlendOperation::Add;
            block.source_color = Blend::SrcAlpha;
            block.destination_color = Blend::InvSrcAlpha;
        }
    }
}

impl Encode for BlendState {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        for block in &self.blocks {
            block.encode(&mut buf);
        }
        self.active_states.encode(&mut buf);
    }
}

impl Decode for BlendState {
    type Error = EnumDecodeError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        let mut blocks = [BlendBlock::default(); MAX_BLEND_TARGETS];
        for block in &mut blocks {
            *block = BlendBlock::decode(&mut buf)?;
        }
        let active_states = u32::decode(&mut buf).map_err(EnumDecodeError::Eof)?;

        Ok(Self {
            blocks,
            active_states,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front: FrontClockwise,
    pub fill: FillMode,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::None,
            front: FrontClockwise::False,
            fill: FillMode::Solid,
        }
    }
}

impl Encode for RasterizationState {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        self.cull_mode.encode(&mut buf);
        self.front.encode(&mut buf);
        self.fill.encode(&mut buf);
    }
}

impl Decode for RasterizationState {
    type Error = EnumDecodeError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        Ok(Self {
            cull_mode: CullMode::decode(&mut buf)?,
            front: FrontClockwise::decode(&mut buf)?,
            fill: FillMode::decode(&mut buf)?,
        })
    }
}

/// Sampler configuration declared by `sampler_states { … }`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SamplerDesc {
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub mip_filter: TextureMipFilter,
    pub address_mode_u: TextureAddressMode,
    pub address_mode_v: TextureAddressMode,
    pub address_mode_w: TextureAddressMode,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            min_filter: TextureFilter::Nearest,
            mag_filter: TextureFilter::Nearest,
            mip_filter: TextureMipFilter::Nearest,
            address_mode_u: TextureAddressMode::Repeat,
            address_mode_v: TextureAddressMode::Repeat,
            address_mode_w: TextureAddressMode::Repeat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BlendState, DepthStencilState, RasterizationState, BLEND_STATE_SIZE,
        DEPTH_STENCIL_STATE_SIZE, RASTERIZATION_STATE_SIZE, RENDER_STATE_SIZE,
    };
    use crate::{Decode, Encode};

    #[test]
    fn encoded_sizes_match_constants() {
        let mut buf = Vec::new();
        RasterizationState::default().encode(&mut buf);
        assert_eq!(buf.len(), RASTERIZATION_STATE_SIZE);

        buf.clear();
        DepthStencilState::default().encode(&mut buf);
        assert_eq!(buf.len(), DEPTH_STENCIL_STATE_SIZE);

        buf.clear();
        BlendState::default().encode(&mut buf);
        assert_eq!(buf.len(), BLEND_STATE_SIZE);

        assert_eq!(RENDER_STATE_SIZE, 280);
    }

    #[test]
    fn depth_stencil_roundtrip() {
        let mut state = DepthStencilState::default();
        state.depth_enable = true;
        state.depth_write_enable = true;
        state.depth_comparison = crate::ComparisonFunction::LessEqual;

        let mut buf = Vec::new();
        state.encode(&mut buf);

        assert_eq!(DepthStencilState::decode(&buf[..]).unwrap(), state);
    }

    #[test]
    fn blend_state_roundtrip() {
        let mut state = BlendState::default();
        state.push_alpha();
        state.active_states = 1;

        let mut buf = Vec::new();
        state.encode(&mut buf);

        let decoded = BlendState::decode(&buf[..]).unwrap();
        assert_eq!(decoded, state);
        assert!(decoded.blocks[0].blend_enabled);
    }
}
