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

//! The Matter TLV (Tag-Length-Value) wire codec, per Matter 1.5 Appendix A.
//!
//! A stream is a sequence of elements. Each element is one control octet,
//! followed by a tag (0, 1, 2, 4, 6 or 8 bytes depending on tag control),
//! followed by the value bytes (for container types, the value is the
//! recursively nested elements up to a matching End-of-Container octet).

mod array;
mod element;
mod encode_value;
mod nullable;
mod writer;

pub use array::TLVArray;
pub use element::TLVElement;
pub use encode_value::EncodeValue;
pub use nullable::Nullable;
pub use writer::TLVWriter;

pub use matter_macro_derive::{FromTLV, ToTLV};

/// Codec error taxonomy (spec §4.1.4 / §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvError {
    UnexpectedEOF,
    InvalidElementType,
    InvalidTagControl,
    TypeMismatch,
    NotInContainer,
    UnexpectedEndOfContainer,
    ContainerNotClosed,
    InvalidUTF8,
    AnonymousTagInStruct,
    TaggedElementInArray,
    ContextTagOutsideStruct,
    NoElement,
    ValueAlreadyRead,
    Overflow,
}

/// One of the 8 tag-control variants (upper 3 bits of the control octet).
///
/// Anonymous tags are legal anywhere. Context-specific tags are legal only
/// directly inside a Struct or a List (never inside an Array, and never at
/// the top level). The four profile-tag variants and the two fully-qualified
/// variants round out the Matter tag space; this crate treats profile tags
/// as opaque numbers (it does not resolve vendor/profile registries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    Anonymous,
    Context(u8),
    CommonPrf16(u16),
    CommonPrf32(u32),
    ImplPrf16(u16),
    ImplPrf32(u32),
    FullyQual48(u16, u16, u16),
    FullyQual64(u16, u16, u32),
}

impl TagType {
    /// Upper 3 bits of the control octet for this tag variant.
    fn control_bits(&self) -> u8 {
        match self {
            TagType::Anonymous => 0,
            TagType::Context(_) => 1,
            TagType::CommonPrf16(_) => 2,
            TagType::CommonPrf32(_) => 3,
            TagType::ImplPrf16(_) => 4,
            TagType::ImplPrf32(_) => 5,
            TagType::FullyQual48(..) => 6,
            TagType::FullyQual64(..) => 7,
        }
    }

    /// Whether this tag is legal directly inside a Struct/List (anything but
    /// Anonymous) — spec invariant "context-specific tag appears only inside
    /// a Struct or List"; profile tags share the same placement rule.
    pub fn is_tagged(&self) -> bool {
        !matches!(self, TagType::Anonymous)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match *self {
            TagType::Anonymous => {}
            TagType::Context(t) => out.push(t),
            TagType::CommonPrf16(t) | TagType::ImplPrf16(t) => out.extend_from_slice(&t.to_le_bytes()),
            TagType::CommonPrf32(t) | TagType::ImplPrf32(t) => out.extend_from_slice(&t.to_le_bytes()),
            TagType::FullyQual48(vendor, profile, tag) => {
                out.extend_from_slice(&vendor.to_le_bytes());
                out.extend_from_slice(&profile.to_le_bytes());
                out.extend_from_slice(&tag.to_le_bytes());
            }
            TagType::FullyQual64(vendor, profile, tag) => {
                out.extend_from_slice(&vendor.to_le_bytes());
                out.extend_from_slice(&profile.to_le_bytes());
                out.extend_from_slice(&tag.to_le_bytes());
            }
        }
    }

    /// Number of tag-number bytes following the control octet.
    fn byte_len(control_bits: u8) -> Result<usize, TlvError> {
        Ok(match control_bits {
            0 => 0,
            1 => 1,
            2 | 4 => 2,
            3 | 5 => 4,
            6 => 6,
            7 => 8,
            _ => return Err(TlvError::InvalidTagControl),
        })
    }

    fn decode(control_bits: u8, buf: &[u8]) -> Result<(Self, usize), TlvError> {
        let len = Self::byte_len(control_bits)?;
        if buf.len() < len {
            return Err(TlvError::UnexpectedEOF);
        }
        let tag = match control_bits {
            0 => TagType::Anonymous,
            1 => TagType::Context(buf[0]),
            2 => TagType::CommonPrf16(u16::from_le_bytes([buf[0], buf[1]])),
            3 => TagType::CommonPrf32(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
            4 => TagType::ImplPrf16(u16::from_le_bytes([buf[0], buf[1]])),
            5 => TagType::ImplPrf32(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
            6 => TagType::FullyQual48(
                u16::from_le_bytes([buf[0], buf[1]]),
                u16::from_le_bytes([buf[2], buf[3]]),
                u16::from_le_bytes([buf[4], buf[5]]),
            ),
            7 => TagType::FullyQual64(
                u16::from_le_bytes([buf[0], buf[1]]),
                u16::from_le_bytes([buf[2], buf[3]]),
                u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            ),
            _ => return Err(TlvError::InvalidTagControl),
        };
        Ok((tag, len))
    }
}

/// The 5-bit element-type discriminant (lower 5 bits of the control octet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    BoolFalse,
    BoolTrue,
    Float32,
    Float64,
    Utf8String1,
    Utf8String2,
    Utf8String4,
    Utf8String8,
    OctetString1,
    OctetString2,
    OctetString4,
    OctetString8,
    Null,
    Struct,
    Array,
    List,
    EndOfContainer,
}

impl ElementType {
    fn discriminant(&self) -> u8 {
        match self {
            ElementType::Int8 => 0x00,
            ElementType::Int16 => 0x01,
            ElementType::Int32 => 0x02,
            ElementType::Int64 => 0x03,
            ElementType::UInt8 => 0x04,
            ElementType::UInt16 => 0x05,
            ElementType::UInt32 => 0x06,
            ElementType::UInt64 => 0x07,
            ElementType::BoolFalse => 0x08,
            ElementType::BoolTrue => 0x09,
            ElementType::Float32 => 0x0A,
            ElementType::Float64 => 0x0B,
            ElementType::Utf8String1 => 0x0C,
            ElementType::Utf8String2 => 0x0D,
            ElementType::Utf8String4 => 0x0E,
            ElementType::Utf8String8 => 0x0F,
            ElementType::OctetString1 => 0x10,
            ElementType::OctetString2 => 0x11,
            ElementType::OctetString4 => 0x12,
            ElementType::OctetString8 => 0x13,
            ElementType::Null => 0x14,
            ElementType::Struct => 0x15,
            ElementType::Array => 0x16,
            ElementType::List => 0x17,
            ElementType::EndOfContainer => 0x18,
        }
    }

    fn from_discriminant(d: u8) -> Result<Self, TlvError> {
        Ok(match d {
            0x00 => ElementType::Int8,
            0x01 => ElementType::Int16,
            0x02 => ElementType::Int32,
            0x03 => ElementType::Int64,
            0x04 => ElementType::UInt8,
            0x05 => ElementType::UInt16,
            0x06 => ElementType::UInt32,
            0x07 => ElementType::UInt64,
            0x08 => ElementType::BoolFalse,
            0x09 => ElementType::BoolTrue,
            0x0A => ElementType::Float32,
            0x0B => ElementType::Float64,
            0x0C => ElementType::Utf8String1,
            0x0D => ElementType::Utf8String2,
            0x0E => ElementType::Utf8String4,
            0x0F => ElementType::Utf8String8,
            0x10 => ElementType::OctetString1,
            0x11 => ElementType::OctetString2,
            0x12 => ElementType::OctetString4,
            0x13 => ElementType::OctetString8,
            0x14 => ElementType::Null,
            0x15 => ElementType::Struct,
            0x16 => ElementType::Array,
            0x17 => ElementType::List,
            0x18 => ElementType::EndOfContainer,
            _ => return Err(TlvError::InvalidElementType),
        })
    }

    pub fn is_container(&self) -> bool {
        matches!(self, ElementType::Struct | ElementType::Array | ElementType::List)
    }

    fn length_width(&self) -> usize {
        match self {
            ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
            ElementType::Int64 | ElementType::UInt64 | ElementType::Float64 => 8,
            ElementType::Utf8String1 | ElementType::OctetString1 => 1,
            ElementType::Utf8String2 | ElementType::OctetString2 => 2,
            ElementType::Utf8String4 | ElementType::OctetString4 => 4,
            ElementType::Utf8String8 | ElementType::OctetString8 => 8,
            _ => 0,
        }
    }
}

pub(crate) fn control_octet(tag: &TagType, elem: &ElementType) -> u8 {
    (tag.control_bits() << 5) | elem.discriminant()
}

pub(crate) fn split_control_octet(byte: u8) -> Result<(u8, ElementType), TlvError> {
    let control_bits = byte >> 5;
    let elem = ElementType::from_discriminant(byte & 0x1F)?;
    Ok((control_bits, elem))
}

/// Minimum signed-width (in bytes) needed to hold `v`.
pub(crate) fn min_signed_width(v: i64) -> u8 {
    if v >= i8::MIN as i64 && v <= i8::MAX as i64 {
        1
    } else if v >= i16::MIN as i64 && v <= i16::MAX as i64 {
        2
    } else if v >= i32::MIN as i64 && v <= i32::MAX as i64 {
        4
    } else {
        8
    }
}

/// Minimum unsigned-width (in bytes) needed to hold `v`.
pub(crate) fn min_unsigned_width(v: u64) -> u8 {
    if v <= u8::MAX as u64 {
        1
    } else if v <= u16::MAX as u64 {
        2
    } else if v <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

pub(crate) fn min_length_width(len: usize) -> u8 {
    if len <= 0xFF {
        1
    } else if len <= 0xFFFF {
        2
    } else if len <= 0xFFFF_FFFF {
        4
    } else {
        8
    }
}

/// Implemented by every type that can be written as a single TLV element.
pub trait ToTLV {
    fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), crate::error::Error>;
}

/// Implemented by every type that can be parsed back out of a TLV element.
///
/// Takes `&mut TLVElement` (not `&TLVElement`) because the reader is a
/// consuming cursor (spec §4.1.3: a value accessor may be called only once
/// per `next()`) — decoding a field necessarily advances/consumes it.
pub trait FromTLV<'a>: Sized {
    fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, crate::error::Error>;
}

macro_rules! impl_totlv_uint {
    ($t:ty) => {
        impl ToTLV for $t {
            fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), crate::error::Error> {
                tw.put_uint(tag_type, *self as u64)?;
                Ok(())
            }
        }
    };
}
macro_rules! impl_totlv_int {
    ($t:ty) => {
        impl ToTLV for $t {
            fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), crate::error::Error> {
                tw.put_int(tag_type, *self as i64)?;
                Ok(())
            }
        }
    };
}

impl_totlv_uint!(u8);
impl_totlv_uint!(u16);
impl_totlv_uint!(u32);
impl_totlv_uint!(u64);
impl_totlv_int!(i8);
impl_totlv_int!(i16);
impl_totlv_int!(i32);
impl_totlv_int!(i64);

impl ToTLV for bool {
    fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), crate::error::Error> {
        tw.put_bool(tag_type, *self)?;
        Ok(())
    }
}

impl<T: ToTLV> ToTLV for Option<T> {
    fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), crate::error::Error> {
        match self {
            Some(v) => v.to_tlv(tw, tag_type),
            None => Ok(()),
        }
    }
}

impl<'a> FromTLV<'a> for u8 {
    fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, crate::error::Error> {
        Ok(element.u8()?)
    }
}
impl<'a> FromTLV<'a> for u16 {
    fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, crate::error::Error> {
        Ok(element.u16()?)
    }
}
impl<'a> FromTLV<'a> for u32 {
    fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, crate::error::Error> {
        Ok(element.u32()?)
    }
}
impl<'a> FromTLV<'a> for u64 {
    fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, crate::error::Error> {
        Ok(element.u64()?)
    }
}
impl<'a> FromTLV<'a> for bool {
    fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, crate::error::Error> {
        Ok(element.bool()?)
    }
}
impl<'a, T: FromTLV<'a>> FromTLV<'a> for Option<T> {
    fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, crate::error::Error> {
        Ok(Some(T::from_tlv(element)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_octet_roundtrip() {
        let tag = TagType::Context(3);
        let elem = ElementType::UInt8;
        let byte = control_octet(&tag, &elem);
        let (bits, decoded_elem) = split_control_octet(byte).unwrap();
        assert_eq!(bits, 1);
        assert_eq!(decoded_elem, ElementType::UInt8);
        let (decoded_tag, len) = TagType::decode(bits, &[3]).unwrap();
        assert_eq!(decoded_tag, tag);
        assert_eq!(len, 1);
    }

    #[test]
    fn width_selection() {
        assert_eq!(min_signed_width(42), 1);
        assert_eq!(min_signed_width(-170000), 4);
        assert_eq!(min_unsigned_width(42), 1);
        assert_eq!(min_unsigned_width(1_000_000), 4);
        assert_eq!(min_length_width(6), 1);
    }
}
