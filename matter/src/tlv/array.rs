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

/// A TLV Array (every item anonymous-tagged), used for every
/// `*Requests`/`*Reports`/`*Responses` list in the IM layer.
///
/// A message a caller builds to send borrows its items (`new`); a message
/// decoded off the wire owns them, since nothing upstream of the decode
/// holds a `Vec` for it to borrow from. Both sides iterate the same way.
#[derive(Debug, Clone)]
pub enum TLVArray<'a, T> {
    Borrowed(&'a [T]),
    Owned(Vec<T>),
}

impl<'a, T> TLVArray<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self::Borrowed(items)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            TLVArray::Borrowed(s) => s.iter(),
            TLVArray::Owned(v) => v.iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TLVArray::Borrowed(s) => s.len(),
            TLVArray::Owned(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a, T> Default for TLVArray<'a, T> {
    fn default() -> Self {
        Self::Borrowed(&[])
    }
}

impl<'a, T: ToTLV> ToTLV for TLVArray<'a, T> {
    fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), Error> {
        tw.start_array(tag_type)?;
        for item in self.iter() {
            item.to_tlv(tw, TagType::Anonymous)?;
        }
        tw.end_container()?;
        Ok(())
    }
}

impl<'a, T: FromTLV<'a>> FromTLV<'a> for TLVArray<'a, T> {
    fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, Error> {
        element.enter_container()?;
        let mut items = Vec::new();
        while element.next()? {
            if element.is_end_of_container() {
                break;
            }
            items.push(T::from_tlv(element)?);
        }
        element.exit_container()?;
        Ok(TLVArray::Owned(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::TLVWriter;

    #[test]
    fn round_trips_through_owned_decode() {
        let items = [1u8, 2, 3];
        let borrowed = TLVArray::new(&items[..]);
        let mut tw = TLVWriter::new();
        borrowed.to_tlv(&mut tw, TagType::Anonymous).unwrap();

        let mut element = TLVElement::new(tw.as_slice());
        element.next().unwrap();
        let decoded: TLVArray<u8> = TLVArray::from_tlv(&mut element).unwrap();
        assert_eq!(decoded.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
