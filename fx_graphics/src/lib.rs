//! Graphics vocabulary shared between the HFX front-end and its consumers.
//!
//! The toolchain never talks to a GPU; it only describes one. This crate
//! holds the enum-and-record vocabulary both sides agree on, plus the
//! little-endian wire traits used by the binary effect container.

pub mod binding;
pub mod device;
pub mod enums;
pub mod state;
pub mod vertex;

use bytes::{Buf, BufMut};
use thiserror::Error;

pub use binding::{ResourceBinding, BINDING_SIZE};
pub use device::{BufferDesc, BufferHandle, GpuDevice};
pub use enums::*;
pub use state::{
    BlendBlock, BlendState, DepthStencilState, RasterizationState, SamplerDesc, StencilOpState,
    RENDER_STATE_SIZE,
};
pub use vertex::{VertexAttribute, VertexStream, VERTEX_ATTRIBUTE_SIZE, VERTEX_STREAM_SIZE};

pub trait Encode {
    fn encode<B>(&self, buf: B)
    where
        B: BufMut;
}

pub trait Decode: Sized {
    type Error;

    fn decode<B>(buf: B) -> Result<Self, Self::Error>
    where
        B: Buf;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("unexpected eof reading {on}: consumed {consumed} but expected {expected} bytes")]
pub struct EofError {
    pub on: &'static str,
    pub consumed: usize,
    pub expected: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
pub enum EnumDecodeError {
    #[error(transparent)]
    Eof(#[from] EofError),
    #[error("invalid {name} value: {value}")]
    InvalidValue { name: &'static str, value: u32 },
}

macro_rules! int_impls {
    ($($id:ident),*$(,)?) => {
        $(
            impl Encode for $id {
                #[inline]
                fn encode<B>(&self, buf: B)
                    where B: BufMut,
                {
                    self.to_le_bytes().encode(buf);
                }
            }

            impl Decode for $id {
                type Error = EofError;

                #[inline]
                fn decode<B>(buf: B) -> Result<Self, Self::Error>
                    where B: Buf,
                {
                    let bytes = <[u8; std::mem::size_of::<Self>()]>::decode(buf)
                        .map_err(|err| EofError {
                            on: stringify!($id),
                            consumed: err.consumed,
                            expected: err.expected,
                        })?;

                    Ok(Self::from_le_bytes(bytes))
                }
            }
        )*
    };
}

int_impls! {
    u8,
    u16,
    u32,
    u64,
    u128,
    i8,
    i16,
    i32,
    i64,
    f32,
    f64,
}

impl<const N: usize> Encode for [u8; N] {
    #[inline]
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        buf.put_slice(self);
    }
}

impl<const N: usize> Decode for [u8; N] {
    type Error = EofError;

    #[inline]
    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        let mut bytes = [0; N];
        let mut cursor = 0;

        while buf.remaining() > 0 && cursor < N {
            let chunk = buf.chunk();
            let count = chunk.len().min(N - cursor);
            bytes[cursor..cursor + count].copy_from_slice(&chunk[..count]);
            buf.advance(count);
            cursor += count;
        }

        if cursor != N {
            Err(EofError {
                on: "[u8; N]",
                consumed: cursor,
                expected: N,
            })
        } else {
            Ok(bytes)
        }
    }
}

/// Copies `text` into a fixed-width, NUL-padded name field, truncating if
/// needed.
pub fn to_fixed_str<const N: usize>(text: &str) -> [u8; N] {
    let mut bytes = [0; N];
    let count = text.len().min(N);
    bytes[..count].copy_from_slice(&text.as_bytes()[..count]);
    bytes
}

/// Reads a fixed-width name field back up to its first NUL.
pub fn from_fixed_str(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::{from_fixed_str, to_fixed_str, Decode, Encode};

    #[test]
    fn int_roundtrip() {
        let mut buf = Vec::new();
        0xdead_beefu32.encode(&mut buf);
        (-5i8).encode(&mut buf);

        assert_eq!(u32::decode(&buf[..]).unwrap(), 0xdead_beef);
        assert_eq!(i8::decode(&buf[4..]).unwrap(), -5);
    }

    #[test]
    fn short_read_reports_eof() {
        let buf = [0u8; 2];
        let err = u32::decode(&buf[..]).unwrap_err();
        assert_eq!(err.consumed, 2);
        assert_eq!(err.expected, 4);
    }

    #[test]
    fn fixed_str_truncates_and_pads() {
        let bytes: [u8; 8] = to_fixed_str("scale");
        assert_eq!(&bytes[..6], b"scale\0");
        assert_eq!(from_fixed_str(&bytes), "scale");

        let bytes: [u8; 4] = to_fixed_str("LocalConstants");
        assert_eq!(from_fixed_str(&bytes), "Loca");
    }
}
