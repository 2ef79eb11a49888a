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

use super::{FromTLV, TLVElement, TLVWriter, TagType, ToTLV};
use crate::error::Error;

/// Opaque TLV-in-TLV payload carried by `AttrData::data`, `CmdData::data` and
/// `EventData::data` (spec §4.2.1, §9).
///
/// Two ways to produce one: hand the encoder already-decoded bytes (`Tlv`,
/// borrowed straight out of a reader via `TLVElement::raw_bytes`), or a
/// callback that receives a fresh writer and streams its own nested elements
/// (`Closure`) — the encoder buffers the closure's output and splices it in
/// with `TLVWriter::put_raw`.
pub enum EncodeValue<'a> {
    Tlv(TLVElement<'a>),
    Closure(&'a dyn Fn(TagType, &mut TLVWriter) -> Result<(), Error>),
}

impl<'a> Clone for EncodeValue<'a> {
    fn clone(&self) -> Self {
        match self {
            EncodeValue::Tlv(_) => panic!("EncodeValue::Tlv cannot be cloned (reader has mutable cursor state)"),
            EncodeValue::Closure(c) => EncodeValue::Closure(*c),
        }
    }
}
impl<'a> Copy for EncodeValue<'a> {}

impl<'a> PartialEq for EncodeValue<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EncodeValue::Tlv(a), EncodeValue::Tlv(b)) => {
                matches!((a.raw_bytes(), b.raw_bytes()), (Ok(x), Ok(y)) if x == y)
            }
            _ => false,
        }
    }
}

impl<'a> std::fmt::Debug for EncodeValue<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeValue::Tlv(_) => write!(f, "EncodeValue::Tlv(..)"),
            EncodeValue::Closure(_) => write!(f, "EncodeValue::Closure(..)"),
        }
    }
}

impl<'a> ToTLV for EncodeValue<'a> {
    fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), Error> {
        match self {
            EncodeValue::Tlv(element) => {
                let raw = element.raw_bytes()?;
                tw.put_raw(tag_type, raw)?;
                Ok(())
            }
            EncodeValue::Closure(cb) => cb(tag_type, tw),
        }
    }
}

impl<'a> FromTLV<'a> for EncodeValue<'a> {
    fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, Error> {
        // The caller already positioned `element` on the opaque payload via
        // `next()`. We snapshot an independent cursor over the same span so
        // the higher layer can re-serialize or walk it lazily, then mark the
        // original consumed so the enclosing decode loop moves on.
        let snapshot = element.clone_unread()?;
        element.skip()?;
        Ok(EncodeValue::Tlv(snapshot))
    }
}
