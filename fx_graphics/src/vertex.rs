//! Vertex input descriptions declared by `layout { vertex … }`.

use bytes::{Buf, BufMut};

use crate::enums::{VertexComponentFormat, VertexInputRate};
use crate::{Decode, Encode, EnumDecodeError};

pub const VERTEX_ATTRIBUTE_SIZE: usize = 16;
pub const VERTEX_STREAM_SIZE: usize = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u16,
    pub binding: u16,
    pub offset: u32,
    pub format: VertexComponentFormat,
    pub input_rate: VertexInputRate,
}

impl Default for VertexAttribute {
    fn default() -> Self {
        Self {
            location: 0,
            binding: 0,
            offset: 0,
            format: VertexComponentFormat::Count,
            input_rate: VertexInputRate::PerVertex,
        }
    }
}

impl Encode for VertexAttribute {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        self.location.encode(&mut buf);
        self.binding.encode(&mut buf);
        self.offset.encode(&mut buf);
        self.format.encode(&mut buf);
        self.input_rate.encode(&mut buf);
    }
}

impl Decode for VertexAttribute {
    type Error = EnumDecodeError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        Ok(Self {
            location: u16::decode(&mut buf).map_err(EnumDecodeError::Eof)?,
            binding: u16::decode(&mut buf).map_err(EnumDecodeError::Eof)?,
            offset: u32::decode(&mut buf).map_err(EnumDecodeError::Eof)?,
            format: VertexComponentFormat::decode(&mut buf)?,
            input_rate: VertexInputRate::decode(&mut buf)?,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VertexStream {
    pub binding: u16,
    pub stride: u16,
    pub input_rate: VertexInputRate,
}

impl Default for VertexStream {
    fn default() -> Self {
        Self {
            binding: 0,
            stride: 0,
            input_rate: VertexInputRate::Count,
        }
    }
}

impl Encode for VertexStream {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        self.binding.encode(&mut buf);
        self.stride.encode(&mut buf);
        self.input_rate.encode(&mut buf);
    }
}

impl Decode for VertexStream {
    type Error = EnumDecodeError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        Ok(Self {
            binding: u16::decode(&mut buf).map_err(EnumDecodeError::Eof)?,
            stride: u16::decode(&mut buf).map_err(EnumDecodeError::Eof)?,
            input_rate: VertexInputRate::decode(&mut buf)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{VertexAttribute, VertexStream, VERTEX_ATTRIBUTE_SIZE, VERTEX_STREAM_SIZE};
    use crate::enums::{VertexComponentFormat, VertexInputRate};
    use crate::{Decode, Encode};

    #[test]
    fn attribute_roundtrip() {
        let attribute = VertexAttribute {
            location: 2,
            binding: 0,
            offset: 12,
            format: VertexComponentFormat::Float3,
            input_rate: VertexInputRate::PerVertex,
        };

        let mut buf = Vec::new();
        attribute.encode(&mut buf);

        assert_eq!(buf.len(), VERTEX_ATTRIBUTE_SIZE);
        assert_eq!(VertexAttribute::decode(&buf[..]).unwrap(), attribute);
    }

    #[test]
    fn stream_roundtrip() {
        let stream = VertexStream {
            binding: 1,
            stride: 32,
            input_rate: VertexInputRate::PerInstance,
        };

        let mut buf = Vec::new();
        stream.encode(&mut buf);

        assert_eq!(buf.len(), VERTEX_STREAM_SIZE);
        assert_eq!(VertexStream::decode(&buf[..]).unwrap(), stream);
    }
}
