//! Fixed-capacity text arenas used by the code generators.

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::hash::{Hash, Hasher};

/// A region inside a [`StringBuffer`]. Spans stay valid for the lifetime of
/// the buffer; the backing storage never moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub len: u32,
}

impl Span {
    pub const EMPTY: Self = Self { start: 0, len: 0 };

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Append-only byte arena with a fixed capacity.
///
/// The buffer never reallocates, so spans returned by the `append_*` and
/// [`reserve`](Self::reserve) methods remain stable until [`clear`](Self::clear).
/// Appends that do not fit are silently truncated to the remaining capacity.
#[derive(Clone, Debug)]
pub struct StringBuffer {
    data: Box<[u8]>,
    len: usize,
}

impl StringBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends raw bytes, truncating to the remaining capacity.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> Span {
        let start = self.len;
        let count = bytes.len().min(self.data.len() - self.len);
        self.data[start..start + count].copy_from_slice(&bytes[..count]);
        self.len += count;

        Span {
            start: start as u32,
            len: count as u32,
        }
    }

    pub fn append_str(&mut self, text: &str) -> Span {
        self.append_bytes(text.as_bytes())
    }

    pub fn append_char(&mut self, c: char) -> Span {
        let mut utf8 = [0u8; 4];
        self.append_bytes(c.encode_utf8(&mut utf8).as_bytes())
    }

    /// Appends formatted text. Output that does not fit is dropped.
    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) -> Span {
        let start = self.len;

        struct Sink<'a> {
            buffer: &'a mut StringBuffer,
        }

        impl Write for Sink<'_> {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                self.buffer.append_str(s);
                Ok(())
            }
        }

        let _ = (Sink {
            buffer: &mut *self,
        })
        .write_fmt(args);

        Span {
            start: start as u32,
            len: (self.len - start) as u32,
        }
    }

    /// Reserves `count` zeroed bytes for later backpatching.
    pub fn reserve(&mut self, count: usize) -> Span {
        let start = self.len;
        let count = count.min(self.data.len() - self.len);
        self.data[start..start + count].fill(0);
        self.len += count;

        Span {
            start: start as u32,
            len: count as u32,
        }
    }

    /// Overwrites a previously returned span. Excess bytes are dropped.
    pub fn patch(&mut self, span: Span, bytes: &[u8]) {
        let count = bytes.len().min(span.len as usize);
        let start = span.start as usize;
        self.data[start..start + count].copy_from_slice(&bytes[..count]);
    }

    pub fn get_bytes(&self, span: Span) -> &[u8] {
        let start = (span.start as usize).min(self.len);
        let end = (start + span.len as usize).min(self.len);
        &self.data[start..end]
    }

    pub fn get_str(&self, span: Span) -> &str {
        std::str::from_utf8(self.get_bytes(span)).unwrap_or("")
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or("")
    }
}

/// A [`StringBuffer`] with an intern index: the same byte sequence always
/// resolves to the same span.
#[derive(Clone, Debug)]
pub struct StringArray {
    buffer: StringBuffer,
    index: HashMap<u64, Vec<Span>>,
}

impl StringArray {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: StringBuffer::new(capacity),
            index: HashMap::new(),
        }
    }

    /// Interns `text`, returning its span and whether this call inserted it.
    pub fn intern(&mut self, text: &str) -> (Span, bool) {
        let hash = hash_bytes(text.as_bytes());

        if let Some(spans) = self.index.get(&hash) {
            for &span in spans {
                if self.buffer.get_str(span) == text {
                    return (span, false);
                }
            }
        }

        let span = self.buffer.append_str(text);
        self.index.entry(hash).or_default().push(span);
        (span, true)
    }

    pub fn contains(&self, text: &str) -> bool {
        let hash = hash_bytes(text.as_bytes());
        self.index
            .get(&hash)
            .is_some_and(|spans| spans.iter().any(|&s| self.buffer.get_str(s) == text))
    }

    pub fn get(&self, span: Span) -> &str {
        self.buffer.get_str(span)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.index.clear();
    }
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::{StringArray, StringBuffer};

    #[test]
    fn append_returns_stable_spans() {
        let mut buffer = StringBuffer::new(64);
        let a = buffer.append_str("hello");
        let b = buffer.append_str(" world");

        assert_eq!(buffer.get_str(a), "hello");
        assert_eq!(buffer.get_str(b), " world");
        assert_eq!(buffer.as_str(), "hello world");
    }

    #[test]
    fn overflow_is_truncated() {
        let mut buffer = StringBuffer::new(8);
        buffer.append_str("12345");
        let span = buffer.append_str("67890");

        assert_eq!(span.len, 3);
        assert_eq!(buffer.as_str(), "12345678");

        // Completely full: further appends are dropped.
        let empty = buffer.append_str("x");
        assert!(empty.is_empty());
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn reserve_and_patch() {
        let mut buffer = StringBuffer::new(32);
        buffer.append_str("size=");
        let slot = buffer.reserve(4);
        buffer.append_str(";");

        buffer.patch(slot, &16u32.to_le_bytes());

        assert_eq!(buffer.get_bytes(slot), 16u32.to_le_bytes());
        assert_eq!(buffer.len(), 10);
    }

    #[test]
    fn append_fmt_writes_formatted_text() {
        let mut buffer = StringBuffer::new(64);
        let span = buffer.append_fmt(format_args!("pad_tail[{}]", 3));
        assert_eq!(buffer.get_str(span), "pad_tail[3]");
    }

    #[test]
    fn intern_dedupes() {
        let mut strings = StringArray::new(64);
        let (a, inserted_a) = strings.intern("LocalConstants");
        let (b, inserted_b) = strings.intern("LocalConstants");
        let (c, _) = strings.intern("albedo");

        assert!(inserted_a);
        assert!(!inserted_b);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(strings.get(c), "albedo");
        assert!(strings.contains("albedo"));
        assert!(!strings.contains("normal"));
    }
}
