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

use std::convert::TryFrom;

use super::{split_control_octet, ElementType, TagType, TlvError};

fn element_header(buf: &[u8], start: usize) -> Result<(TagType, ElementType, usize), TlvError> {
    let ctrl = *buf.get(start).ok_or(TlvError::UnexpectedEOF)?;
    let (control_bits, elem_type) = split_control_octet(ctrl)?;
    let tag_len = TagType::byte_len(control_bits)?;
    let tag_bytes = buf
        .get(start + 1..start + 1 + tag_len)
        .ok_or(TlvError::UnexpectedEOF)?;
    let (tag, _) = TagType::decode(control_bits, tag_bytes)?;
    Ok((tag, elem_type, 1 + tag_len))
}

fn value_len(buf: &[u8], value_start: usize, elem_type: ElementType) -> Result<usize, TlvError> {
    Ok(match elem_type {
        ElementType::BoolFalse
        | ElementType::BoolTrue
        | ElementType::Null
        | ElementType::EndOfContainer => 0,
        ElementType::Int8 | ElementType::UInt8 => 1,
        ElementType::Int16 | ElementType::UInt16 => 2,
        ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
        ElementType::Int64 | ElementType::UInt64 | ElementType::Float64 => 8,
        ElementType::Utf8String1 | ElementType::OctetString1 => {
            let l = *buf.get(value_start).ok_or(TlvError::UnexpectedEOF)? as usize;
            1 + l
        }
        ElementType::Utf8String2 | ElementType::OctetString2 => {
            let b = buf
                .get(value_start..value_start + 2)
                .ok_or(TlvError::UnexpectedEOF)?;
            2 + u16::from_le_bytes([b[0], b[1]]) as usize
        }
        ElementType::Utf8String4 | ElementType::OctetString4 => {
            let b = buf
                .get(value_start..value_start + 4)
                .ok_or(TlvError::UnexpectedEOF)?;
            4 + u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize
        }
        ElementType::Utf8String8 | ElementType::OctetString8 => {
            let b = buf
                .get(value_start..value_start + 8)
                .ok_or(TlvError::UnexpectedEOF)?;
            8 + u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as usize
        }
        ElementType::Struct | ElementType::Array | ElementType::List => {
            unreachable!("containers are walked by skip_element, not value_len")
        }
    })
}

/// Returns the offset one-past-the-end of the element starting at `start`
/// (recursing through nested containers so the caller never has to).
fn skip_element(buf: &[u8], start: usize) -> Result<usize, TlvError> {
    let (_, elem_type, header_len) = element_header(buf, start)?;
    let value_start = start + header_len;
    if elem_type.is_container() {
        let mut pos = value_start;
        loop {
            let (_, child_type, child_header_len) = element_header(buf, pos)?;
            if child_type == ElementType::EndOfContainer {
                return Ok(pos + child_header_len);
            }
            pos = skip_element(buf, pos)?;
        }
    } else if elem_type == ElementType::EndOfContainer {
        Ok(value_start)
    } else {
        Ok(value_start + value_len(buf, value_start, elem_type)?)
    }
}

macro_rules! accessor_unsigned {
    ($t:ident, $wide:ident, $err:ident) => {
        pub fn $t(&mut self) -> Result<$t, TlvError> {
            let v = self.$wide()?;
            $t::try_from(v).map_err(|_| TlvError::$err)
        }
    };
}
macro_rules! accessor_signed {
    ($t:ident, $wide:ident) => {
        pub fn $t(&mut self) -> Result<$t, TlvError> {
            let v = self.$wide()?;
            $t::try_from(v).map_err(|_| TlvError::Overflow)
        }
    };
}

/// A cursor over a TLV byte stream (spec §4.1.3).
///
/// `next()` must be called before any accessor; accessors consume the
/// current value and may only be called once per `next()`. `enter_container`
/// / `exit_container` manage a stack of in-progress containers so nested
/// Structs/Arrays/Lists can be walked without losing the parent's position —
/// `exit_container` implements the "subtle exit rule" from spec §4.1.3: if
/// the cursor already sits on the container's own End-of-Container marker
/// (because the caller iterated there explicitly), exiting must not consume
/// any further bytes.
pub struct TLVElement<'a> {
    buf: &'a [u8],
    next_pos: usize,
    cur_start: Option<usize>,
    cur_value_start: Option<usize>,
    cur_end: Option<usize>,
    cur_tag: Option<TagType>,
    cur_type: Option<ElementType>,
    consumed: bool,
    container_end_stack: Vec<usize>,
}

impl<'a> TLVElement<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            next_pos: 0,
            cur_start: None,
            cur_value_start: None,
            cur_end: None,
            cur_tag: None,
            cur_type: None,
            consumed: false,
            container_end_stack: Vec::new(),
        }
    }

    /// Advances to the next element; `Ok(false)` signals end-of-input.
    pub fn next(&mut self) -> Result<bool, TlvError> {
        let start = self.next_pos;
        if start >= self.buf.len() {
            self.cur_start = None;
            self.cur_value_start = None;
            self.cur_end = None;
            self.cur_tag = None;
            self.cur_type = None;
            return Ok(false);
        }
        let (tag, elem_type, header_len) = element_header(self.buf, start)?;
        let end = skip_element(self.buf, start)?;
        self.cur_start = Some(start);
        self.cur_value_start = Some(start + header_len);
        self.cur_end = Some(end);
        self.cur_tag = Some(tag);
        self.cur_type = Some(elem_type);
        self.consumed = false;
        self.next_pos = end;
        Ok(true)
    }

    pub fn tag(&self) -> Result<TagType, TlvError> {
        self.cur_tag.ok_or(TlvError::NoElement)
    }

    /// Element-type discriminant of the current element (spec names this
    /// `type()`; `type` is a reserved word, hence the raw identifier).
    pub fn r#type(&self) -> Result<ElementType, TlvError> {
        self.cur_type.ok_or(TlvError::NoElement)
    }

    pub fn is_end_of_container(&self) -> bool {
        self.cur_type == Some(ElementType::EndOfContainer)
    }

    fn ensure_unread(&self) -> Result<ElementType, TlvError> {
        self.cur_start.ok_or(TlvError::NoElement)?;
        if self.consumed {
            return Err(TlvError::ValueAlreadyRead);
        }
        self.cur_type.ok_or(TlvError::NoElement)
    }

    pub fn int(&mut self) -> Result<i64, TlvError> {
        let t = self.ensure_unread()?;
        let vs = self.cur_value_start.unwrap();
        let v = match t {
            ElementType::Int8 => self.buf[vs] as i8 as i64,
            ElementType::Int16 => i16::from_le_bytes([self.buf[vs], self.buf[vs + 1]]) as i64,
            ElementType::Int32 => {
                i32::from_le_bytes(self.buf[vs..vs + 4].try_into().unwrap()) as i64
            }
            ElementType::Int64 => i64::from_le_bytes(self.buf[vs..vs + 8].try_into().unwrap()),
            _ => return Err(TlvError::TypeMismatch),
        };
        self.consumed = true;
        Ok(v)
    }

    pub fn uint(&mut self) -> Result<u64, TlvError> {
        let t = self.ensure_unread()?;
        let vs = self.cur_value_start.unwrap();
        let v = match t {
            ElementType::UInt8 => self.buf[vs] as u64,
            ElementType::UInt16 => u16::from_le_bytes([self.buf[vs], self.buf[vs + 1]]) as u64,
            ElementType::UInt32 => {
                u32::from_le_bytes(self.buf[vs..vs + 4].try_into().unwrap()) as u64
            }
            ElementType::UInt64 => u64::from_le_bytes(self.buf[vs..vs + 8].try_into().unwrap()),
            _ => return Err(TlvError::TypeMismatch),
        };
        self.consumed = true;
        Ok(v)
    }

    accessor_unsigned!(u8, uint, Overflow);
    accessor_unsigned!(u16, uint, Overflow);
    accessor_unsigned!(u32, uint, Overflow);

    pub fn u64(&mut self) -> Result<u64, TlvError> {
        self.uint()
    }

    accessor_signed!(i8, int);
    accessor_signed!(i16, int);
    accessor_signed!(i32, int);

    pub fn i64(&mut self) -> Result<i64, TlvError> {
        self.int()
    }

    pub fn bool(&mut self) -> Result<bool, TlvError> {
        let t = self.ensure_unread()?;
        let v = match t {
            ElementType::BoolFalse => false,
            ElementType::BoolTrue => true,
            _ => return Err(TlvError::TypeMismatch),
        };
        self.consumed = true;
        Ok(v)
    }

    pub fn float32(&mut self) -> Result<f32, TlvError> {
        let t = self.ensure_unread()?;
        if t != ElementType::Float32 {
            return Err(TlvError::TypeMismatch);
        }
        let vs = self.cur_value_start.unwrap();
        let v = f32::from_le_bytes(self.buf[vs..vs + 4].try_into().unwrap());
        self.consumed = true;
        Ok(v)
    }

    pub fn float64(&mut self) -> Result<f64, TlvError> {
        let t = self.ensure_unread()?;
        if t != ElementType::Float64 {
            return Err(TlvError::TypeMismatch);
        }
        let vs = self.cur_value_start.unwrap();
        let v = f64::from_le_bytes(self.buf[vs..vs + 8].try_into().unwrap());
        self.consumed = true;
        Ok(v)
    }

    pub fn null(&mut self) -> Result<(), TlvError> {
        let t = self.ensure_unread()?;
        if t != ElementType::Null {
            return Err(TlvError::TypeMismatch);
        }
        self.consumed = true;
        Ok(())
    }

    fn length_prefixed(&mut self, str_kind: bool) -> Result<&'a [u8], TlvError> {
        let t = self.ensure_unread()?;
        let vs = self.cur_value_start.unwrap();
        let (len_width, ok) = match t {
            ElementType::Utf8String1 | ElementType::OctetString1 => (1usize, true),
            ElementType::Utf8String2 | ElementType::OctetString2 => (2, true),
            ElementType::Utf8String4 | ElementType::OctetString4 => (4, true),
            ElementType::Utf8String8 | ElementType::OctetString8 => (8, true),
            _ => (0, false),
        };
        if !ok {
            return Err(TlvError::TypeMismatch);
        }
        let is_string = matches!(
            t,
            ElementType::Utf8String1
                | ElementType::Utf8String2
                | ElementType::Utf8String4
                | ElementType::Utf8String8
        );
        if str_kind && !is_string {
            return Err(TlvError::TypeMismatch);
        }
        if !str_kind && is_string {
            return Err(TlvError::TypeMismatch);
        }
        let len = match len_width {
            1 => self.buf[vs] as usize,
            2 => u16::from_le_bytes([self.buf[vs], self.buf[vs + 1]]) as usize,
            4 => u32::from_le_bytes(self.buf[vs..vs + 4].try_into().unwrap()) as usize,
            _ => u64::from_le_bytes(self.buf[vs..vs + 8].try_into().unwrap()) as usize,
        };
        let data_start = vs + len_width;
        self.consumed = true;
        Ok(&self.buf[data_start..data_start + len])
    }

    pub fn string(&mut self) -> Result<&'a str, TlvError> {
        let bytes = self.length_prefixed(true)?;
        std::str::from_utf8(bytes).map_err(|_| TlvError::InvalidUTF8)
    }

    pub fn bytes(&mut self) -> Result<&'a [u8], TlvError> {
        self.length_prefixed(false)
    }

    /// Complete wire bytes of the current element (control octet + tag +
    /// value, recursively for containers) — feedable straight into
    /// `TLVWriter::put_raw`.
    pub fn raw_bytes(&self) -> Result<&'a [u8], TlvError> {
        let s = self.cur_start.ok_or(TlvError::NoElement)?;
        let e = self.cur_end.ok_or(TlvError::NoElement)?;
        Ok(&self.buf[s..e])
    }

    /// Consumes the current element, recursively for containers (spec
    /// §4.1.3). Since `next()` already precomputes the element's full span,
    /// this is just a consumption-tracking no-op over the cursor.
    pub fn skip(&mut self) -> Result<(), TlvError> {
        self.cur_start.ok_or(TlvError::NoElement)?;
        self.consumed = true;
        Ok(())
    }

    pub fn enter_container(&mut self) -> Result<(), TlvError> {
        let t = self.cur_type.ok_or(TlvError::NoElement)?;
        if !t.is_container() {
            return Err(TlvError::TypeMismatch);
        }
        let end = self.cur_end.ok_or(TlvError::NoElement)?;
        self.container_end_stack.push(end - 1);
        self.next_pos = self.cur_value_start.unwrap();
        self.cur_start = None;
        self.cur_value_start = None;
        self.cur_end = None;
        self.cur_tag = None;
        self.cur_type = None;
        self.consumed = true;
        Ok(())
    }

    pub fn exit_container(&mut self) -> Result<(), TlvError> {
        let end_byte_pos = self
            .container_end_stack
            .pop()
            .ok_or(TlvError::NotInContainer)?;

        if self.cur_start == Some(end_byte_pos) && self.is_end_of_container() {
            self.next_pos = end_byte_pos + 1;
            self.cur_start = None;
            self.cur_value_start = None;
            self.cur_end = None;
            self.cur_tag = None;
            self.cur_type = None;
            return Ok(());
        }

        loop {
            if !self.next()? {
                return Err(TlvError::UnexpectedEndOfContainer);
            }
            if self.cur_start == Some(end_byte_pos) {
                self.next_pos = end_byte_pos + 1;
                self.cur_start = None;
                self.cur_value_start = None;
                self.cur_end = None;
                self.cur_tag = None;
                self.cur_type = None;
                return Ok(());
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.container_end_stack.len()
    }

    /// An independent cursor over the same span as the current element,
    /// freshly positioned (as if `next()` had just been called on a new
    /// reader). Used to stash an opaque TLV-in-TLV payload (`EncodeValue`)
    /// without entangling its lifetime with the enclosing decode loop's
    /// cursor state.
    pub fn clone_unread(&self) -> Result<TLVElement<'a>, TlvError> {
        let start = self.cur_start.ok_or(TlvError::NoElement)?;
        let mut fresh = TLVElement::new(self.buf);
        fresh.next_pos = start;
        fresh.next()?;
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::TLVWriter;

    #[test]
    fn int_roundtrip() {
        let mut tw = TLVWriter::new();
        tw.put_int(TagType::Anonymous, 42).unwrap();
        let mut el = TLVElement::new(tw.as_slice());
        assert!(el.next().unwrap());
        assert_eq!(el.tag().unwrap(), TagType::Anonymous);
        assert_eq!(el.int().unwrap(), 42);
    }

    #[test]
    fn value_already_read() {
        let mut tw = TLVWriter::new();
        tw.put_int(TagType::Anonymous, 1).unwrap();
        let mut el = TLVElement::new(tw.as_slice());
        el.next().unwrap();
        el.int().unwrap();
        assert_eq!(el.int(), Err(TlvError::ValueAlreadyRead));
    }

    #[test]
    fn no_element_before_next() {
        let tw = TLVWriter::new();
        let el = TLVElement::new(tw.as_slice());
        assert_eq!(el.tag(), Err(TlvError::NoElement));
    }

    #[test]
    fn struct_roundtrip_and_sibling_after_exit() {
        let mut tw = TLVWriter::new();
        tw.start_struct(TagType::Anonymous).unwrap();
        tw.put_int(TagType::Context(0), 42).unwrap();
        tw.start_array(TagType::Context(1)).unwrap();
        tw.put_int(TagType::Anonymous, 1).unwrap();
        tw.put_int(TagType::Anonymous, 2).unwrap();
        tw.end_container().unwrap();
        tw.put_int(TagType::Context(2), 7).unwrap();
        tw.end_container().unwrap();

        let mut el = TLVElement::new(tw.as_slice());
        assert!(el.next().unwrap());
        el.enter_container().unwrap();

        assert!(el.next().unwrap());
        assert_eq!(el.tag().unwrap(), TagType::Context(0));
        assert_eq!(el.int().unwrap(), 42);

        assert!(el.next().unwrap());
        assert_eq!(el.tag().unwrap(), TagType::Context(1));
        el.enter_container().unwrap();
        assert!(el.next().unwrap());
        assert_eq!(el.int().unwrap(), 1);
        assert!(el.next().unwrap());
        assert_eq!(el.int().unwrap(), 2);
        // explicit iteration onto the array's own End marker, then exit:
        // must not consume further bytes (the "subtle exit rule").
        assert!(el.next().unwrap());
        assert!(el.is_end_of_container());
        el.exit_container().unwrap();

        // sibling after the nested container must still be reachable
        assert!(el.next().unwrap());
        assert_eq!(el.tag().unwrap(), TagType::Context(2));
        assert_eq!(el.int().unwrap(), 7);

        assert!(el.next().unwrap());
        assert!(el.is_end_of_container());
        el.exit_container().unwrap();
        assert!(!el.next().unwrap());
    }

    #[test]
    fn exit_container_without_iterating_skips_remaining_siblings() {
        let mut tw = TLVWriter::new();
        tw.start_struct(TagType::Anonymous).unwrap();
        tw.put_int(TagType::Context(0), 1).unwrap();
        tw.put_int(TagType::Context(1), 2).unwrap();
        tw.end_container().unwrap();
        tw.put_int(TagType::Context(2), 3).unwrap();

        let mut el = TLVElement::new(tw.as_slice());
        el.next().unwrap();
        el.enter_container().unwrap();
        el.next().unwrap(); // only reads the first field
        el.int().unwrap();
        el.exit_container().unwrap(); // must skip field 1 on our behalf

        assert!(el.next().unwrap());
        assert_eq!(el.tag().unwrap(), TagType::Context(2));
        assert_eq!(el.int().unwrap(), 3);
    }

    #[test]
    fn string_and_bytes() {
        let mut tw = TLVWriter::new();
        tw.put_string(TagType::Anonymous, "Hello!").unwrap();
        let mut el = TLVElement::new(tw.as_slice());
        el.next().unwrap();
        assert_eq!(el.string().unwrap(), "Hello!");

        let mut tw = TLVWriter::new();
        tw.put_bytes(TagType::Anonymous, &[1, 2, 3]).unwrap();
        let mut el = TLVElement::new(tw.as_slice());
        el.next().unwrap();
        assert_eq!(el.bytes().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn raw_bytes_feeds_put_raw() {
        let mut tw = TLVWriter::new();
        tw.put_uint(TagType::Context(5), 42).unwrap();
        let mut el = TLVElement::new(tw.as_slice());
        el.next().unwrap();
        let raw = el.raw_bytes().unwrap().to_vec();

        let mut dst = TLVWriter::new();
        dst.put_raw(TagType::Context(9), &raw).unwrap();
        let mut check = TLVElement::new(dst.as_slice());
        check.next().unwrap();
        assert_eq!(check.tag().unwrap(), TagType::Context(9));
        assert_eq!(check.uint().unwrap(), 42);
    }
}
