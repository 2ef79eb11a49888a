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

use bitflags::bitflags;

use crate::error::Error;
use crate::interaction_model::core::IMStatusCode;
use crate::tlv::{Nullable, TLVWriter, TagType, ToTLV};

pub use crate::tlv::EncodeValue;

pub type EndptId = u16;
pub type ClusterId = u32;
pub type AttrId = u16;
pub type CmdId = u16;
pub type EventId = u32;

bitflags! {
    /// Attribute/command access privileges (spec glossary: Attribute, Command).
    pub struct Access: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const FAB_SCOPED = 0x04;
        const FAB_SENSITIVE = 0x08;
        const TIMED = 0x10;
        /// Ordinary readable-and-viewable attribute: the common case for
        /// root-endpoint mandatory-cluster attributes such as Descriptor's.
        const RV = Self::READ.bits;
        const RW = Self::READ.bits | Self::WRITE.bits;
    }
}

bitflags! {
    pub struct Quality: u8 {
        const NONE = 0x00;
        const NULLABLE = 0x01;
        const FIXED = 0x02;
        const SCENE = 0x04;
        const REPORTABLE = 0x08;
    }
}

/// An attribute's in-memory value. `Custom` defers encoding to
/// `ClusterType::read_custom_attribute`, for values too structured (lists,
/// computed state) to hold inline.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Utf8(String),
    Custom,
}

impl ToTLV for AttrValue {
    fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), Error> {
        match self {
            AttrValue::Bool(v) => tw.put_bool(tag_type, *v),
            AttrValue::Uint8(v) => tw.put_uint(tag_type, *v as u64),
            AttrValue::Uint16(v) => tw.put_uint(tag_type, *v as u64),
            AttrValue::Uint32(v) => tw.put_uint(tag_type, *v as u64),
            AttrValue::Uint64(v) => tw.put_uint(tag_type, *v),
            AttrValue::Int8(v) => tw.put_int(tag_type, *v as i64),
            AttrValue::Int16(v) => tw.put_int(tag_type, *v as i64),
            AttrValue::Int32(v) => tw.put_int(tag_type, *v as i64),
            AttrValue::Int64(v) => tw.put_int(tag_type, *v),
            AttrValue::Utf8(s) => tw.put_string(tag_type, s),
            AttrValue::Custom => return Err(Error::Invalid),
        }
        .map_err(Error::from)
    }
}

/// A single attribute slot in a cluster.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub id: AttrId,
    pub value: AttrValue,
    pub access: Access,
    pub quality: Quality,
}

impl Attribute {
    pub fn new(id: AttrId, value: AttrValue, access: Access, quality: Quality) -> Self {
        Self {
            id,
            value,
            access,
            quality,
        }
    }
}

/// Addressing and request context handed to a cluster on attribute read/write
/// (spec §4.2.1's `list_index`/`fab_filtered` plumbing).
#[derive(Debug, Clone, Copy)]
pub struct AttrDetails {
    pub endpoint_id: EndptId,
    pub cluster_id: ClusterId,
    pub attr_id: AttrId,
    pub list_index: Option<Nullable<u16>>,
    pub fab_idx: u8,
    pub fab_filter: bool,
}

/// Sink a cluster writes its attribute value (or a status in place of a
/// value) into, decoupling `ClusterType::read_custom_attribute` from the
/// concrete `AttrResp`/`TLVWriter` plumbing the IM engine assembles it into.
pub trait Encoder {
    fn encode(&mut self, value: EncodeValue<'_>);
    fn encode_status(&mut self, status: IMStatusCode, cluster_status: u16);
}

/// One cluster instance attached to an endpoint.
pub struct Cluster {
    id: ClusterId,
    data_ver: u32,
    attributes: Vec<Attribute>,
}

impl Cluster {
    pub fn new(id: ClusterId) -> Result<Self, Error> {
        Ok(Self {
            id,
            data_ver: rand::random(),
            attributes: Vec::new(),
        })
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn data_ver(&self) -> u32 {
        self.data_ver
    }

    pub fn bump_data_ver(&mut self) {
        self.data_ver = self.data_ver.wrapping_add(1);
    }

    pub fn add_attributes(&mut self, attrs: &[Attribute]) -> Result<(), Error> {
        self.attributes.extend_from_slice(attrs);
        Ok(())
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn attribute(&self, id: AttrId) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == id)
    }

    pub fn attribute_mut(&mut self, id: AttrId) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.id == id)
    }
}

/// Behaviour every cluster implementation provides. Defaults reject writes
/// and commands so minimal (read-only) clusters need not override them.
pub trait ClusterType {
    fn base(&self) -> &Cluster;
    fn base_mut(&mut self) -> &mut Cluster;

    fn read_custom_attribute(&self, _encoder: &mut dyn Encoder, _attr: &AttrDetails) {}

    fn write_attribute(&mut self, _attr: &AttrDetails, _data: &mut crate::tlv::TLVElement) -> Result<(), IMStatusCode> {
        Err(IMStatusCode::UnsupportedWrite)
    }

    fn handle_command(
        &mut self,
        _cmd_path: &crate::interaction_model::messages::ib::CmdPath,
        _data: &mut crate::tlv::TLVElement,
        _encoder: &mut dyn Encoder,
    ) -> Result<(), IMStatusCode> {
        Err(IMStatusCode::UnsupportedCommand)
    }
}

/// A device type identifier/revision pair, reported in the Descriptor
/// cluster's `DeviceTypeList`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceType {
    pub dtype: u32,
    pub drev: u16,
}

impl ToTLV for DeviceType {
    fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), Error> {
        tw.start_struct(tag_type)?;
        tw.put_uint(TagType::Context(0), self.dtype as u64)?;
        tw.put_uint(TagType::Context(1), self.drev as u64)?;
        tw.end_container()?;
        Ok(())
    }
}

/// An endpoint: a fixed, immutable-after-registration set of clusters (spec
/// §4.3.2). Clusters are looked up by id; mutation of the cluster set itself
/// only happens through `Node::add_endpoint`/`remove_endpoint`.
pub struct Endpoint {
    id: EndptId,
    dev_type: DeviceType,
    clusters: Vec<Box<dyn ClusterType + Send + Sync>>,
}

impl Endpoint {
    pub fn new(id: EndptId, dev_type: DeviceType) -> Self {
        Self {
            id,
            dev_type,
            clusters: Vec::new(),
        }
    }

    pub fn id(&self) -> EndptId {
        self.id
    }

    pub fn get_dev_type(&self) -> DeviceType {
        self.dev_type
    }

    pub fn add_cluster(&mut self, cluster: Box<dyn ClusterType + Send + Sync>) -> Result<(), Error> {
        if self.clusters.iter().any(|c| c.base().id() == cluster.base().id()) {
            return Err(Error::Invalid);
        }
        self.clusters.push(cluster);
        Ok(())
    }

    pub fn has_cluster(&self, id: ClusterId) -> bool {
        self.clusters.iter().any(|c| c.base().id() == id)
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&(dyn ClusterType + Send + Sync)> {
        self.clusters.iter().find(|c| c.base().id() == id).map(|c| c.as_ref())
    }

    pub fn cluster_mut(&mut self, id: ClusterId) -> Option<&mut (dyn ClusterType + Send + Sync)> {
        self.clusters
            .iter_mut()
            .find(|c| c.base().id() == id)
            .map(|c| c.as_mut())
    }

    pub fn clusters(&self) -> impl Iterator<Item = &(dyn ClusterType + Send + Sync)> {
        self.clusters.iter().map(|c| c.as_ref())
    }
}
