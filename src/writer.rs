//! Append-only byte writer.
//!
//! `SectionWriter` builds a section payload front to back: varints, raw
//! bytes, and nested length-prefixed subsections. Subsection lengths are
//! not known until their contents are written, so `start_subsection`
//! reserves a maximal-width varint placeholder that `end_subsection`
//! overwrites in place; the overwrite never shifts later bytes.

/// Width reserved for a subsection length field. Five padded LEB128
/// bytes hold any value below 2^35, which covers every possible
/// subsection length.
const LENGTH_FIELD_WIDTH: usize = 5;

/// Append an unsigned LEB128 value.
fn push_uleb128(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            buf.push(byte | 0x80);
        } else {
            buf.push(byte);
            break;
        }
    }
}

/// Append an unsigned LEB128 value padded with continuation bytes to
/// exactly `pad_to` bytes.
fn push_uleb128_padded(buf: &mut Vec<u8>, mut value: u64, pad_to: usize) {
    let mut count = 0;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        count += 1;
        let more = value != 0 || count < pad_to;
        if more {
            byte |= 0x80;
        }
        buf.push(byte);
        if !more {
            break;
        }
    }
}

/// Append a signed LEB128 value.
fn push_sleb128(buf: &mut Vec<u8>, mut value: i64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// A strictly append-oriented byte-sequence builder.
#[derive(Debug, Default)]
pub struct SectionWriter {
    buffer: Vec<u8>,
    /// Positions of pending subsection length placeholders, innermost last.
    subsections: Vec<usize>,
}

impl SectionWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes appended so far.
    pub fn cursor(&self) -> usize {
        self.buffer.len()
    }

    pub fn write_unsigned_varint(&mut self, value: u64) {
        push_uleb128(&mut self.buffer, value);
    }

    /// Write an unsigned varint padded to a fixed byte width. Used for
    /// size fields whose width must match the original encoding.
    pub fn write_unsigned_varint_padded(&mut self, value: u64, pad_to: usize) {
        push_uleb128_padded(&mut self.buffer, value, pad_to);
    }

    pub fn write_signed_varint(&mut self, value: i64) {
        push_sleb128(&mut self.buffer, value);
    }

    pub fn write_byte(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Open a subsection: append the tag byte and reserve a fixed-width
    /// placeholder for the subsection's byte length.
    pub fn start_subsection(&mut self, tag: u8) {
        self.buffer.push(tag);
        self.subsections.push(self.buffer.len());
        push_uleb128_padded(&mut self.buffer, 0, LENGTH_FIELD_WIDTH);
    }

    /// Close the innermost open subsection, patching its length field.
    /// Returns the subsection's content length for diagnostic use.
    pub fn end_subsection(&mut self) -> usize {
        let placeholder = self
            .subsections
            .pop()
            .expect("end_subsection without a matching start_subsection");
        let length = self.buffer.len() - placeholder - LENGTH_FIELD_WIDTH;

        let mut patch = Vec::with_capacity(LENGTH_FIELD_WIDTH);
        push_uleb128_padded(&mut patch, length as u64, LENGTH_FIELD_WIDTH);
        self.buffer[placeholder..placeholder + LENGTH_FIELD_WIDTH].copy_from_slice(&patch);

        length
    }

    /// Return the completed buffer. Panics if a subsection is still open;
    /// that is a bug in the caller, not a recoverable condition.
    pub fn finalize(self) -> Vec<u8> {
        assert!(
            self.subsections.is_empty(),
            "unclosed subsections are still pending"
        );
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_varints_use_minimal_encoding() {
        let mut w = SectionWriter::new();
        w.write_unsigned_varint(0);
        w.write_unsigned_varint(127);
        w.write_unsigned_varint(128);
        w.write_unsigned_varint(624_485);
        assert_eq!(
            w.finalize(),
            vec![0x00, 0x7f, 0x80, 0x01, 0xe5, 0x8e, 0x26]
        );
    }

    #[test]
    fn signed_varints_carry_the_sign_bit() {
        let mut w = SectionWriter::new();
        w.write_signed_varint(-123_456);
        w.write_signed_varint(64);
        w.write_signed_varint(-1);
        assert_eq!(
            w.finalize(),
            vec![0xc0, 0xbb, 0x78, 0xc0, 0x00, 0x7f]
        );
    }

    #[test]
    fn padded_varints_have_fixed_width() {
        let mut w = SectionWriter::new();
        w.write_unsigned_varint_padded(3, 5);
        assert_eq!(w.finalize(), vec![0x83, 0x80, 0x80, 0x80, 0x00]);
    }

    #[test]
    fn subsection_length_covers_contents_only() {
        let mut w = SectionWriter::new();
        w.start_subsection(8);
        w.write_bytes(&[1, 2, 3]);
        assert_eq!(w.end_subsection(), 3);

        let bytes = w.finalize();
        // tag, 5-byte padded length, 3 content bytes
        assert_eq!(bytes[0], 8);
        assert_eq!(&bytes[1..6], &[0x83, 0x80, 0x80, 0x80, 0x00]);
        assert_eq!(&bytes[6..], &[1, 2, 3]);
    }

    #[test]
    fn subsections_nest_with_stack_discipline() {
        let mut w = SectionWriter::new();
        w.start_subsection(1);
        w.write_byte(0xaa);
        w.start_subsection(2);
        w.write_bytes(&[0xbb, 0xcc]);
        let inner = w.end_subsection();
        let outer = w.end_subsection();

        assert_eq!(inner, 2);
        // tag + length field + two content bytes of the inner subsection,
        // plus the 0xaa byte before it
        assert_eq!(outer, 1 + 1 + LENGTH_FIELD_WIDTH + 2);
        w.finalize();
    }

    #[test]
    #[should_panic(expected = "unclosed subsections")]
    fn finalize_rejects_unclosed_subsections() {
        let mut w = SectionWriter::new();
        w.start_subsection(5);
        w.finalize();
    }
}
