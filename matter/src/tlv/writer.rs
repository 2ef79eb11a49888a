/*
 *
 *    Copyright (c) 2020-2022 Project CHIP Authors
 *
 *    Licensed under the Apache License, Version 2.0 (the "License");
 *    you may not use this file except in compliance with the License.
 *    You may obtain a copy of the License at
 *
 *        http://www.apache.org/licenses/LICENSE-2.0
 *
 *    Unless required by applicable law or agreed to in writing, software
 *    distributed under the License is distributed on an "AS IS" BASIS,
 *    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *    See the License for the specific language governing permissions and
 *    limitations under the License.
 */

use super::{
    control_octet, min_length_width, min_signed_width, min_unsigned_width, split_control_octet,
    ElementType, TagType, TlvError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Struct,
    Array,
    List,
}

/// Writes a Matter TLV stream into an owned, growable buffer.
///
/// Single-owner, not thread-safe (spec §5): callers pass `&mut TLVWriter`
/// through, never share it across tasks.
pub struct TLVWriter {
    buf: Vec<u8>,
    stack: Vec<ContainerKind>,
}

impl Default for TLVWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TLVWriter {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
            stack: Vec::new(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    /// Current write position; pairs with `rewind_to` so a caller can discard
    /// a partially-written element on error without leaving a half-baked
    /// buffer (used by the IM layer's wildcard-read rewind behavior).
    pub fn get_tail(&self) -> usize {
        self.buf.len()
    }

    pub fn rewind_to(&mut self, pos: usize) {
        self.buf.truncate(pos);
    }

    fn check_tag_placement(&self, tag: &TagType) -> Result<(), TlvError> {
        match self.stack.last() {
            None | Some(ContainerKind::Array) => {
                if tag.is_tagged() {
                    return Err(TlvError::TaggedElementInArray);
                }
            }
            Some(ContainerKind::Struct) | Some(ContainerKind::List) => {}
        }
        Ok(())
    }

    fn push_control_and_tag(&mut self, tag: TagType, elem: ElementType) -> Result<(), TlvError> {
        self.check_tag_placement(&tag)?;
        self.buf.push(control_octet(&tag, &elem));
        tag.encode(&mut self.buf);
        Ok(())
    }

    pub fn put_bool(&mut self, tag: TagType, v: bool) -> Result<(), TlvError> {
        let elem = if v { ElementType::BoolTrue } else { ElementType::BoolFalse };
        self.push_control_and_tag(tag, elem)
    }

    pub fn put_null(&mut self, tag: TagType) -> Result<(), TlvError> {
        self.push_control_and_tag(tag, ElementType::Null)
    }

    pub fn put_float32(&mut self, tag: TagType, v: f32) -> Result<(), TlvError> {
        self.push_control_and_tag(tag, ElementType::Float32)?;
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    pub fn put_float64(&mut self, tag: TagType, v: f64) -> Result<(), TlvError> {
        self.push_control_and_tag(tag, ElementType::Float64)?;
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    /// Auto-selects the minimum signed width that holds `v`.
    pub fn put_int(&mut self, tag: TagType, v: i64) -> Result<(), TlvError> {
        self.put_int_with_width(tag, v, min_signed_width(v))
    }

    /// Auto-selects the minimum unsigned width that holds `v`.
    pub fn put_uint(&mut self, tag: TagType, v: u64) -> Result<(), TlvError> {
        self.put_uint_with_width(tag, v, min_unsigned_width(v))
    }

    pub fn put_int_with_width(&mut self, tag: TagType, v: i64, width: u8) -> Result<(), TlvError> {
        let elem = match width {
            1 => ElementType::Int8,
            2 => ElementType::Int16,
            4 => ElementType::Int32,
            8 => ElementType::Int64,
            _ => return Err(TlvError::InvalidElementType),
        };
        self.push_control_and_tag(tag, elem)?;
        match width {
            1 => self.buf.push(v as i8 as u8),
            2 => self.buf.extend_from_slice(&(v as i16).to_le_bytes()),
            4 => self.buf.extend_from_slice(&(v as i32).to_le_bytes()),
            8 => self.buf.extend_from_slice(&v.to_le_bytes()),
            _ => unreachable!(),
        }
        Ok(())
    }

    pub fn put_uint_with_width(&mut self, tag: TagType, v: u64, width: u8) -> Result<(), TlvError> {
        let elem = match width {
            1 => ElementType::UInt8,
            2 => ElementType::UInt16,
            4 => ElementType::UInt32,
            8 => ElementType::UInt64,
            _ => return Err(TlvError::InvalidElementType),
        };
        self.push_control_and_tag(tag, elem)?;
        match width {
            1 => self.buf.push(v as u8),
            2 => self.buf.extend_from_slice(&(v as u16).to_le_bytes()),
            4 => self.buf.extend_from_slice(&(v as u32).to_le_bytes()),
            8 => self.buf.extend_from_slice(&v.to_le_bytes()),
            _ => unreachable!(),
        }
        Ok(())
    }

    pub fn put_string(&mut self, tag: TagType, s: &str) -> Result<(), TlvError> {
        // s is already guaranteed valid UTF-8 by the type system; re-validate
        // the byte form anyway so the InvalidUTF8 path is exercised the same
        // way it would be for a byte-oriented caller (spec §4.1.2/§4.1.4).
        std::str::from_utf8(s.as_bytes()).map_err(|_| TlvError::InvalidUTF8)?;
        let width = min_length_width(s.len());
        let elem = match width {
            1 => ElementType::Utf8String1,
            2 => ElementType::Utf8String2,
            4 => ElementType::Utf8String4,
            _ => ElementType::Utf8String8,
        };
        self.push_control_and_tag(tag, elem)?;
        self.put_length(width, s.len());
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    pub fn put_bytes(&mut self, tag: TagType, bytes: &[u8]) -> Result<(), TlvError> {
        let width = min_length_width(bytes.len());
        let elem = match width {
            1 => ElementType::OctetString1,
            2 => ElementType::OctetString2,
            4 => ElementType::OctetString4,
            _ => ElementType::OctetString8,
        };
        self.push_control_and_tag(tag, elem)?;
        self.put_length(width, bytes.len());
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn put_length(&mut self, width: u8, len: usize) {
        match width {
            1 => self.buf.push(len as u8),
            2 => self.buf.extend_from_slice(&(len as u16).to_le_bytes()),
            4 => self.buf.extend_from_slice(&(len as u32).to_le_bytes()),
            _ => self.buf.extend_from_slice(&(len as u64).to_le_bytes()),
        }
    }

    /// Splices a pre-encoded element (as returned by `TLVElement::raw_bytes`)
    /// into this writer under a new tag, preserving the original element
    /// type and value bytes (spec §4.1.2).
    pub fn put_raw(&mut self, tag: TagType, pre_encoded: &[u8]) -> Result<(), TlvError> {
        if pre_encoded.is_empty() {
            return Err(TlvError::UnexpectedEOF);
        }
        let (control_bits, elem) = split_control_octet(pre_encoded[0])?;
        let old_tag_len = TagType::byte_len(control_bits)?;
        if pre_encoded.len() < 1 + old_tag_len {
            return Err(TlvError::UnexpectedEOF);
        }
        self.check_tag_placement(&tag)?;
        self.buf.push(control_octet(&tag, &elem));
        tag.encode(&mut self.buf);
        self.buf.extend_from_slice(&pre_encoded[1 + old_tag_len..]);
        Ok(())
    }

    fn start_container(&mut self, tag: TagType, kind: ContainerKind, elem: ElementType) -> Result<(), TlvError> {
        self.push_control_and_tag(tag, elem)?;
        self.stack.push(kind);
        Ok(())
    }

    pub fn start_struct(&mut self, tag: TagType) -> Result<(), TlvError> {
        self.start_container(tag, ContainerKind::Struct, ElementType::Struct)
    }

    pub fn start_array(&mut self, tag: TagType) -> Result<(), TlvError> {
        self.start_container(tag, ContainerKind::Array, ElementType::Array)
    }

    pub fn start_list(&mut self, tag: TagType) -> Result<(), TlvError> {
        self.start_container(tag, ContainerKind::List, ElementType::List)
    }

    pub fn end_container(&mut self) -> Result<(), TlvError> {
        if self.stack.pop().is_none() {
            return Err(TlvError::NotInContainer);
        }
        self.buf.push(control_octet(&TagType::Anonymous, &ElementType::EndOfContainer));
        Ok(())
    }

    /// Current container nesting depth (0 at the top level).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Convenience used by IM code that buffers a nested writer's output and
    /// splices it back via `put_raw` (spec §4.2.1, opaque TLV-in-TLV).
    pub fn put_object<T: super::ToTLV>(&mut self, tag: TagType, v: &T) -> Result<(), crate::error::Error> {
        v.to_tlv(self, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_primitives_table_125() {
        let mut tw = TLVWriter::new();
        tw.put_bool(TagType::Anonymous, false).unwrap();
        assert_eq!(tw.as_slice(), &[0x08]);
    }

    #[test]
    fn int_auto_width_table_125() {
        let mut tw = TLVWriter::new();
        tw.put_int(TagType::Anonymous, 42).unwrap();
        assert_eq!(tw.as_slice(), &[0x00, 0x2A]);

        let mut tw = TLVWriter::new();
        tw.put_int(TagType::Anonymous, -170000).unwrap();
        assert_eq!(tw.as_slice(), &[0x02, 0xF0, 0x67, 0xFD, 0xFF]);
    }

    #[test]
    fn string_table_125() {
        let mut tw = TLVWriter::new();
        tw.put_string(TagType::Anonymous, "Hello!").unwrap();
        assert_eq!(
            tw.as_slice(),
            &[0x0C, 0x06, 0x48, 0x65, 0x6C, 0x6C, 0x6F, 0x21]
        );
    }

    #[test]
    fn null_table_125() {
        let mut tw = TLVWriter::new();
        tw.put_null(TagType::Anonymous).unwrap();
        assert_eq!(tw.as_slice(), &[0x14]);
    }

    #[test]
    fn struct_table_126() {
        let mut tw = TLVWriter::new();
        tw.start_struct(TagType::Anonymous).unwrap();
        tw.put_int(TagType::Context(0), 42).unwrap();
        tw.put_int(TagType::Context(1), -17).unwrap();
        tw.end_container().unwrap();
        assert_eq!(
            tw.as_slice(),
            &[0x15, 0x20, 0x00, 0x2A, 0x20, 0x01, 0xEF, 0x18]
        );
    }

    #[test]
    fn fully_qualified_tag_table_127() {
        let mut tw = TLVWriter::new();
        tw.put_uint(TagType::FullyQual48(0xFFF1, 0xDEED, 1), 42)
            .unwrap();
        assert_eq!(
            tw.as_slice(),
            &[0xC4, 0xF1, 0xFF, 0xED, 0xDE, 0x01, 0x00, 0x2A]
        );
    }

    #[test]
    fn end_container_without_open_fails() {
        let mut tw = TLVWriter::new();
        assert_eq!(tw.end_container(), Err(TlvError::NotInContainer));
    }

    #[test]
    fn nested_container_depth_restored() {
        let mut tw = TLVWriter::new();
        tw.start_struct(TagType::Anonymous).unwrap();
        tw.start_array(TagType::Context(0)).unwrap();
        assert_eq!(tw.depth(), 2);
        tw.end_container().unwrap();
        assert_eq!(tw.depth(), 1);
        tw.end_container().unwrap();
        assert_eq!(tw.depth(), 0);
    }

    #[test]
    fn put_raw_rewrites_tag_preserves_value() {
        let mut src = TLVWriter::new();
        src.put_uint(TagType::Context(5), 42).unwrap();
        let pre_encoded = src.as_slice().to_vec();

        let mut dst = TLVWriter::new();
        dst.put_raw(TagType::Context(9), &pre_encoded).unwrap();
        assert_eq!(dst.as_slice(), &[0x21, 0x09, 0x2A]);
    }
}
