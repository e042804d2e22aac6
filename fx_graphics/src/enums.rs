//! The frozen enum vocabulary. Wire-facing enums encode at `u32` width.

use bitflags::bitflags;
use bytes::{Buf, BufMut};

use crate::{Decode, Encode, EnumDecodeError};

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }

            pub fn from_u32(value: u32) -> Option<Self> {
                const VARIANTS: &[$name] = &[$($name::$variant),+];
                VARIANTS.get(value as usize).copied()
            }
        }

        impl Encode for $name {
            fn encode<B>(&self, buf: B)
            where
                B: BufMut,
            {
                (*self as u32).encode(buf);
            }
        }

        impl Decode for $name {
            type Error = EnumDecodeError;

            fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
            where
                B: Buf,
            {
                let value = u32::decode(&mut buf)?;
                Self::from_u32(value).ok_or(EnumDecodeError::InvalidValue {
                    name: stringify!($name),
                    value,
                })
            }
        }
    };
}

wire_enum! {
    /// Shader pipeline stages. `Count` doubles as "stage-agnostic" in the
    /// HFX front-end.
    ShaderStage {
        Vertex,
        Fragment,
        Geometry,
        Compute,
        Hull,
        Domain,
        Count,
    }
}

/// Number of real stages, excluding the `Count` sentinel.
pub const SHADER_STAGE_COUNT: usize = ShaderStage::Count as usize;

wire_enum! {
    /// What a resource binding points at.
    ResourceKind {
        Sampler,
        Texture,
        TextureRW,
        Constants,
        Buffer,
        BufferRW,
        Count,
    }
}

wire_enum! {
    TextureFilter {
        Nearest,
        Linear,
        Count,
    }
}

wire_enum! {
    TextureMipFilter {
        Nearest,
        Linear,
        Count,
    }
}

wire_enum! {
    TextureAddressMode {
        Repeat,
        MirroredRepeat,
        ClampEdge,
        ClampBorder,
        Count,
    }
}

wire_enum! {
    VertexComponentFormat {
        Float,
        Float2,
        Float3,
        Float4,
        Byte,
        Byte4N,
        UByte,
        UByte4N,
        Short2,
        Short2N,
        Short4,
        Short4N,
        Count,
    }
}

wire_enum! {
    VertexInputRate {
        PerVertex,
        PerInstance,
        Count,
    }
}

wire_enum! {
    CullMode {
        None,
        Front,
        Back,
        Count,
    }
}

wire_enum! {
    FillMode {
        Wireframe,
        Solid,
        Point,
        Count,
    }
}

wire_enum! {
    FrontClockwise {
        True,
        False,
        Count,
    }
}

wire_enum! {
    ComparisonFunction {
        Never,
        Less,
        Equal,
        LessEqual,
        Greater,
        NotEqual,
        GreaterEqual,
        Always,
        Count,
    }
}

wire_enum! {
    StencilOp {
        Keep,
        Zero,
        Replace,
        IncrSat,
        DecrSat,
        Invert,
        Incr,
        Decr,
        Count,
    }
}

wire_enum! {
    DepthWriteMask {
        Zero,
        All,
        Count,
    }
}

wire_enum! {
    Blend {
        Zero,
        One,
        SrcColor,
        InvSrcColor,
        SrcAlpha,
        InvSrcAlpha,
        DestAlpha,
        InvDestAlpha,
        DestColor,
        InvDestColor,
        SrcAlphaSat,
        Src1Color,
        InvSrc1Color,
        Src1Alpha,
        InvSrc1Alpha,
        Count,
    }
}

wire_enum! {
    BlendOperation {
        Add,
        Subtract,
        RevSubtract,
        Min,
        Max,
        Count,
    }
}

wire_enum! {
    TopologyType {
        Unknown,
        Point,
        Line,
        Triangle,
        Patch,
        Count,
    }
}

wire_enum! {
    BufferType {
        Vertex,
        Index,
        Constant,
        Indirect,
        Count,
    }
}

wire_enum! {
    ResourceUsage {
        Immutable,
        Dynamic,
        Stream,
        Count,
    }
}

wire_enum! {
    IndexKind {
        Uint16,
        Uint32,
        Count,
    }
}

wire_enum! {
    TextureKind {
        Texture1D,
        Texture2D,
        Texture3D,
        Texture1DArray,
        Texture2DArray,
        TextureCubeArray,
        Count,
    }
}

wire_enum! {
    LogicOp {
        Clear,
        Set,
        Copy,
        CopyInverted,
        Noop,
        Invert,
        And,
        Nand,
        Or,
        Nor,
        Xor,
        Equiv,
        AndReverse,
        AndInverted,
        OrReverse,
        OrInverted,
        Count,
    }
}

wire_enum! {
    QueueKind {
        Graphics,
        Compute,
        CopyTransfer,
        Count,
    }
}

wire_enum! {
    TextureFormat {
        Unknown,
        R32G32B32A32Typeless,
        R32G32B32A32Float,
        R32G32B32A32Uint,
        R32G32B32A32Sint,
        R32G32B32Typeless,
        R32G32B32Float,
        R32G32B32Uint,
        R32G32B32Sint,
        R16G16B16A16Typeless,
        R16G16B16A16Float,
        R16G16B16A16Unorm,
        R16G16B16A16Uint,
        R16G16B16A16Snorm,
        R16G16B16A16Sint,
        R32G32Typeless,
        R32G32Float,
        R32G32Uint,
        R32G32Sint,
        R10G10B10A2Typeless,
        R10G10B10A2Unorm,
        R10G10B10A2Uint,
        R11G11B10Float,
        R8G8B8A8Typeless,
        R8G8B8A8Unorm,
        R8G8B8A8UnormSrgb,
        R8G8B8A8Uint,
        R8G8B8A8Snorm,
        R8G8B8A8Sint,
        R16G16Typeless,
        R16G16Float,
        R16G16Unorm,
        R16G16Uint,
        R16G16Snorm,
        R16G16Sint,
        R32Typeless,
        R32Float,
        R32Uint,
        R32Sint,
        R8G8Typeless,
        R8G8Unorm,
        R8G8Uint,
        R8G8Snorm,
        R8G8Sint,
        R16Typeless,
        R16Float,
        R16Unorm,
        R16Uint,
        R16Snorm,
        R16Sint,
        R8Typeless,
        R8Unorm,
        R8Uint,
        R8Snorm,
        R8Sint,
        R9G9B9E5SharedExp,
        D32FloatS8X24Uint,
        D24UnormS8Uint,
        D32Float,
        D24UnormX8Uint,
        D16Unorm,
        S8Uint,
        Bc1Typeless,
        Bc1Unorm,
        Bc1UnormSrgb,
        Bc2Typeless,
        Bc2Unorm,
        Bc2UnormSrgb,
        Bc3Typeless,
        Bc3Unorm,
        Bc3UnormSrgb,
        Bc4Typeless,
        Bc4Unorm,
        Bc4Snorm,
        Bc5Typeless,
        Bc5Unorm,
        Bc5Snorm,
        B5G6R5Unorm,
        B5G5R5A1Unorm,
        B8G8R8A8Unorm,
        B8G8R8X8Unorm,
        R10G10B10XrBiasA2Unorm,
        B8G8R8A8Typeless,
        B8G8R8A8UnormSrgb,
        B8G8R8X8Typeless,
        B8G8R8X8UnormSrgb,
        Bc6hTypeless,
        Bc6hUf16,
        Bc6hSf16,
        Bc7Typeless,
        Bc7Unorm,
        Bc7UnormSrgb,
        Count,
    }
}

bitflags! {
    /// Which color channels a blend target writes.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const GEOMETRY = 1 << 2;
        const COMPUTE = 1 << 3;
        const HULL = 1 << 4;
        const DOMAIN = 1 << 5;
    }
}

impl From<ShaderStage> for ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Fragment => Self::FRAGMENT,
            ShaderStage::Geometry => Self::GEOMETRY,
            ShaderStage::Compute => Self::COMPUTE,
            ShaderStage::Hull => Self::HULL,
            ShaderStage::Domain => Self::DOMAIN,
            ShaderStage::Count => Self::empty(),
        }
    }
}
