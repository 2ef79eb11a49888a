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

/// Distinguishes "explicitly Null" from "absent" (`Option::None`).
///
/// Per spec §3/§9, today only `AttrPath::list_index` needs this; every other
/// optional field uses a plain `Option<T>` and omits the tag entirely when
/// unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullable<T> {
    Null,
    NotNull(T),
}

impl<T> Nullable<T> {
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Nullable::Null => None,
            Nullable::NotNull(v) => Some(v),
        }
    }
}

impl<T: ToTLV> ToTLV for Nullable<T> {
    fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), Error> {
        match self {
            Nullable::Null => tw.put_null(tag_type).map_err(Error::from),
            Nullable::NotNull(v) => v.to_tlv(tw, tag_type),
        }
    }
}

impl<'a, T: FromTLV<'a>> FromTLV<'a> for Nullable<T> {
    fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, Error> {
        if element.r#type().map_err(Error::from)? == super::ElementType::Null {
            element.null().map_err(Error::from)?;
            Ok(Nullable::Null)
        } else {
            Ok(Nullable::NotNull(T::from_tlv(element)?))
        }
    }
}
