//! Resource-binding records as stored in the container's layout tables.

use bytes::{Buf, BufMut};

use crate::enums::ResourceKind;
use crate::{from_fixed_str, to_fixed_str, Decode, Encode, EnumDecodeError};

pub const BINDING_SIZE: usize = 40;
pub const BINDING_NAME_LEN: usize = 32;

/// One binding inside a resource layout. `kind` is stored at `u16` width on
/// the wire; `set` is reserved for multi-set backends and written as zero by
/// the front-end.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResourceBinding {
    pub kind: ResourceKind,
    pub start: u16,
    pub count: u16,
    pub set: u16,
    pub name: [u8; BINDING_NAME_LEN],
}

impl ResourceBinding {
    pub fn new(kind: ResourceKind, name: &str) -> Self {
        Self {
            kind,
            start: 0,
            count: 1,
            set: 0,
            name: to_fixed_str(name),
        }
    }

    pub fn name_str(&self) -> &str {
        from_fixed_str(&self.name)
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = to_fixed_str(name);
    }
}

impl Default for ResourceBinding {
    fn default() -> Self {
        Self {
            kind: ResourceKind::Buffer,
            start: 0,
            count: 0,
            set: 0,
            name: [0; BINDING_NAME_LEN],
        }
    }
}

impl Encode for ResourceBinding {
    fn encode<B>(&self, mut buf: B)
    where
        B: BufMut,
    {
        (self.kind as u32 as u16).encode(&mut buf);
        self.start.encode(&mut buf);
        self.count.encode(&mut buf);
        self.set.encode(&mut buf);
        self.name.encode(&mut buf);
    }
}

impl Decode for ResourceBinding {
    type Error = EnumDecodeError;

    fn decode<B>(mut buf: B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        let kind = u16::decode(&mut buf).map_err(EnumDecodeError::Eof)?;
        let kind = ResourceKind::from_u32(u32::from(kind)).ok_or(
            EnumDecodeError::InvalidValue {
                name: "ResourceKind",
                value: u32::from(kind),
            },
        )?;

        Ok(Self {
            kind,
            start: u16::decode(&mut buf).map_err(EnumDecodeError::Eof)?,
            count: u16::decode(&mut buf).map_err(EnumDecodeError::Eof)?,
            set: u16::decode(&mut buf).map_err(EnumDecodeError::Eof)?,
            name: <[u8; BINDING_NAME_LEN]>::decode(&mut buf).map_err(EnumDecodeError::Eof)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ResourceBinding, BINDING_SIZE};
    use crate::enums::ResourceKind;
    use crate::{Decode, Encode};

    #[test]
    fn binding_roundtrip() {
        let binding = ResourceBinding::new(ResourceKind::Constants, "LocalConstants");

        let mut buf = Vec::new();
        binding.encode(&mut buf);

        assert_eq!(buf.len(), BINDING_SIZE);

        let decoded = ResourceBinding::decode(&buf[..]).unwrap();
        assert_eq!(decoded, binding);
        assert_eq!(decoded.name_str(), "LocalConstants");
        assert_eq!(decoded.count, 1);
    }
}
