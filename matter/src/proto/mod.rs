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

//! Protocol adaptation (spec §4.4): dispatches a decoded exchange payload to
//! the Secure Channel or Interaction Model layer and sends the reply.
//!
//! An adapter always computes `(response_opcode, response_bytes)`, sends it
//! itself via `ExchangeSender`, then returns `None` — the caller on the
//! exchange must never send again for the same request.

use log::warn;

use crate::data_model::core::DataModel;
use crate::data_model::objects::{Access, AttrDetails, AttrId, AttrValue, ClusterType, Encoder, EncodeValue};
use crate::error::Error;
use crate::interaction_model::core::{IMStatusCode, OpCode};
use crate::interaction_model::messages::ib::{self, AttrData, AttrResp};
use crate::interaction_model::messages::msg::{self, InvReq, ReadReq, StatusResp, SubscribeReq, SubscribeResp, TimedReq, WriteReq};
use crate::interaction_model::messages::GenericPath;
use crate::node::state::NodeState;
use crate::tlv::{FromTLV, TLVElement, TLVWriter, TagType, ToTLV};

/// Sends a complete reply directly on the exchange the request arrived on.
pub trait ExchangeSender {
    fn send(&mut self, opcode: OpCode, payload: &[u8], reliable: bool) -> Result<(), Error>;
}

/// Common entry point the exchange layer demuxes onto by protocol id. Every
/// implementor computes and sends its own reply, then returns `None` so the
/// caller never sends a second response for the same request.
pub trait ProtoHandler {
    fn handle_proto_id(&mut self, opcode: u8, payload: &[u8], exchange: &mut dyn ExchangeSender) -> Result<Option<Vec<u8>>, Error>;
}

/// Handles the Secure Channel protocol's non-cryptographic message plumbing
/// (status reports, standalone acks). PASE/CASE key establishment itself is
/// an external collaborator supplying session keys; this trait only carries
/// the bytes to the channel, it never derives them.
pub trait SecureChannelManager {
    fn handle(&mut self, opcode: u8, payload: &[u8]) -> Result<Vec<u8>, Error>;
}

pub struct SecureChannelAdapter<M> {
    manager: M,
}

impl<M: SecureChannelManager> SecureChannelAdapter<M> {
    pub fn new(manager: M) -> Self {
        Self { manager }
    }

    pub fn dispatch(
        &mut self,
        opcode: u8,
        payload: &[u8],
        exchange: &mut dyn ExchangeSender,
    ) -> Result<Option<Vec<u8>>, Error> {
        let response_bytes = self.manager.handle(opcode, payload)?;
        exchange.send(OpCode::StatusResponse, &response_bytes, true)?;
        Ok(None)
    }
}

impl<M: SecureChannelManager> ProtoHandler for SecureChannelAdapter<M> {
    fn handle_proto_id(&mut self, opcode: u8, payload: &[u8], exchange: &mut dyn ExchangeSender) -> Result<Option<Vec<u8>>, Error> {
        self.dispatch(opcode, payload, exchange)
    }
}

/// Dispatches Interaction Model opcodes against a `DataModel`'s node
/// registry (spec §4.2, §4.4).
pub struct ImAdapter {
    data_model: DataModel,
}

impl ImAdapter {
    pub fn new(data_model: DataModel) -> Self {
        Self { data_model }
    }

    /// Computes and sends the response for one decoded IM opcode, per the
    /// dispatch contract above.
    pub fn dispatch(
        &mut self,
        opcode: OpCode,
        payload: &[u8],
        exchange: &mut dyn ExchangeSender,
    ) -> Result<Option<Vec<u8>>, Error> {
        let (response_opcode, response_bytes) = match opcode {
            OpCode::ReadRequest => (OpCode::ReportData, self.handle_read(payload)?),
            OpCode::SubscribeRequest => (OpCode::SubscribeResponse, self.handle_subscribe(payload, exchange)?),
            OpCode::WriteRequest => (OpCode::WriteResponse, self.handle_write(payload)?),
            OpCode::InvokeRequest => (OpCode::InvokeResponse, self.handle_invoke(payload)?),
            OpCode::TimedRequest => (OpCode::StatusResponse, self.handle_timed(payload)?),
            other => (other.response_opcode(), payload.to_vec()),
        };
        exchange.send(response_opcode, &response_bytes, true)?;
        Ok(None)
    }

    fn handle_read(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        let mut element = TLVElement::new(payload);
        element.next()?;
        let req = ReadReq::from_tlv(&mut element)?;
        self.build_report_data(&req)
    }

    fn build_report_data(&self, req: &ReadReq) -> Result<Vec<u8>, Error> {
        if req.fabric_filtered {
            warn!("fabric-scoped attribute read not yet supported");
        }
        if req.dataver_filters.is_some() {
            warn!("data version filters not yet supported");
        }

        let node = self.data_model.node.read().unwrap();
        let mut tw = TLVWriter::new();
        tw.start_struct(TagType::Anonymous)?;
        if let Some(attr_requests) = &req.attr_requests {
            tw.start_array(TagType::Context(msg::ReportDataTag::AttributeReports as u8))?;
            for attr_path in attr_requests.iter() {
                Self::handle_read_attr_path(&node, *attr_path, &mut tw);
            }
            tw.end_container()?;
        }
        tw.end_container()?;
        Ok(tw.into_vec())
    }

    /// Reads one (possibly wildcard) attribute path. A non-wildcard path
    /// reports its own error as an `AttrStatus`; a wildcard path silently
    /// skips clusters/attributes that don't match rather than spraying
    /// `UnsupportedRead`/`UnsupportedAttribute` across every endpoint.
    fn handle_read_attr_path(node: &NodeState, attr_path: ib::AttrPath, tw: &mut TLVWriter) {
        let gen_path = attr_path.to_gp();
        if let Ok((e, c, a)) = gen_path.not_wildcard() {
            match node.endpoints.get(&e).and_then(|ep| ep.cluster(c)) {
                Some(cluster) => Self::handle_read_attr_data(cluster, tw, attr_path, a as AttrId),
                None => Self::write_attr_status(tw, &gen_path, IMStatusCode::UnsupportedCluster),
            }
        } else {
            for (ep_id, ep) in &node.endpoints {
                if gen_path.endpoint.is_some() && gen_path.endpoint != Some(*ep_id) {
                    continue;
                }
                for cluster in ep.clusters() {
                    if gen_path.cluster.is_some() && gen_path.cluster != Some(cluster.base().id()) {
                        continue;
                    }
                    let attr_id = attr_path.attr.unwrap_or(0);
                    let path = ib::AttrPath::new(&GenericPath::new(Some(*ep_id), Some(cluster.base().id()), Some(attr_id as u32)));
                    Self::handle_read_attr_data(cluster, tw, path, attr_id);
                }
            }
        }
    }

    fn handle_read_attr_data(cluster: &dyn ClusterType, tw: &mut TLVWriter, path: ib::AttrPath, attr_id: AttrId) {
        let anchor = tw.get_tail();
        let data_ver = cluster.base().data_ver();
        match cluster.base().attribute(attr_id) {
            None => Self::write_attr_status(tw, &path.to_gp(), IMStatusCode::UnsupportedAttribute),
            Some(attr) if !attr.access.contains(Access::READ) => {
                Self::write_attr_status(tw, &path.to_gp(), IMStatusCode::UnsupportedRead)
            }
            Some(attr) if matches!(attr.value, AttrValue::Custom) => {
                let details = AttrDetails {
                    endpoint_id: path.endpoint.unwrap_or_default(),
                    cluster_id: path.cluster.unwrap_or_default(),
                    attr_id,
                    list_index: None,
                    fab_idx: 0,
                    fab_filter: false,
                };
                let mut encoder = AttrReadEncoder { tw, path, data_ver };
                cluster.read_custom_attribute(&mut encoder, &details);
            }
            Some(attr) => {
                let value = attr.value.clone();
                let write_value = move |tag: TagType, tw: &mut TLVWriter| value.to_tlv(tw, tag).map_err(Error::from);
                let resp = AttrResp::Data(AttrData::new(Some(data_ver), path, EncodeValue::Closure(&write_value)));
                if resp.to_tlv(tw, TagType::Anonymous).is_err() {
                    tw.rewind_to(anchor);
                    Self::write_attr_status(tw, &path.to_gp(), IMStatusCode::Failure);
                }
            }
        }
    }

    fn write_attr_status(tw: &mut TLVWriter, path: &GenericPath, status: IMStatusCode) {
        let resp = AttrResp::Status(ib::AttrStatus::new(path, status, 0));
        let _ = resp.to_tlv(tw, TagType::Anonymous);
    }

    fn handle_write(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        let mut element = TLVElement::new(payload);
        element.next()?;
        let req = WriteReq::from_tlv(&mut element)?;
        let mut node = self.data_model.node.write().unwrap();

        let mut tw = TLVWriter::new();
        tw.start_struct(TagType::Anonymous)?;
        tw.start_array(TagType::Context(msg::WriteRespTag::WriteResponses as u8))?;
        for item in req.write_requests.iter() {
            let mut item = *item;
            Self::handle_write_attr_path(&mut node, &mut item, &mut tw);
        }
        tw.end_container()?;
        tw.end_container()?;
        Ok(tw.into_vec())
    }

    fn handle_write_attr_path(node: &mut NodeState, attr_data: &mut AttrData, tw: &mut TLVWriter) {
        let gen_path = attr_data.path.to_gp();
        match gen_path.not_wildcard() {
            Ok((e, c, a)) => match node.endpoints.get_mut(&e).and_then(|ep| ep.cluster_mut(c)) {
                Some(cluster) => Self::handle_write_attr_data(cluster, tw, &gen_path, &mut attr_data.data, a as AttrId),
                None => Self::write_attr_status(tw, &gen_path, IMStatusCode::UnsupportedCluster),
            },
            Err(_) => Self::write_attr_status(tw, &gen_path, IMStatusCode::UnsupportedAttribute),
        }
    }

    fn handle_write_attr_data(cluster: &mut dyn ClusterType, tw: &mut TLVWriter, path: &GenericPath, data: &mut EncodeValue, attr_id: AttrId) {
        let status = match data {
            EncodeValue::Tlv(el) => {
                let details = AttrDetails {
                    endpoint_id: path.endpoint.unwrap_or_default(),
                    cluster_id: path.cluster.unwrap_or_default(),
                    attr_id,
                    list_index: None,
                    fab_idx: 0,
                    fab_filter: false,
                };
                cluster.write_attribute(&details, el).err().unwrap_or(IMStatusCode::Success)
            }
            EncodeValue::Closure(_) => IMStatusCode::Failure,
        };
        Self::write_attr_status(tw, path, status);
    }

    fn handle_invoke(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        let mut element = TLVElement::new(payload);
        element.next()?;
        let req = InvReq::from_tlv(&mut element)?;
        let mut node = self.data_model.node.write().unwrap();

        let mut tw = TLVWriter::new();
        tw.start_struct(TagType::Anonymous)?;
        tw.put_bool(
            TagType::Context(msg::InvRespTag::SuppressResponse as u8),
            req.suppress_response.unwrap_or(false),
        )?;
        tw.start_array(TagType::Context(msg::InvRespTag::InvokeResponses as u8))?;
        if let Some(inv_requests) = &req.inv_requests {
            for cmd_data in inv_requests.iter() {
                let mut cmd_data = *cmd_data;
                Self::handle_invoke_path(&mut node, &mut cmd_data, &mut tw);
            }
        }
        tw.end_container()?;
        tw.end_container()?;
        Ok(tw.into_vec())
    }

    fn handle_invoke_path(node: &mut NodeState, cmd_data: &mut ib::CmdData, tw: &mut TLVWriter) {
        let cmd_path = cmd_data.path;
        let gen_path = cmd_path.path;
        let cluster = gen_path
            .endpoint
            .zip(gen_path.cluster)
            .and_then(|(e, c)| node.endpoints.get_mut(&e).and_then(|ep| ep.cluster_mut(c)));

        let cluster = match cluster {
            Some(cluster) => cluster,
            None => {
                let resp = ib::InvResp::status_new(cmd_path, IMStatusCode::UnsupportedCluster, 0);
                let _ = resp.to_tlv(tw, TagType::Anonymous);
                return;
            }
        };

        let el = match &mut cmd_data.data {
            EncodeValue::Tlv(el) => el,
            EncodeValue::Closure(_) => {
                let resp = ib::InvResp::status_new(cmd_path, IMStatusCode::Failure, 0);
                let _ = resp.to_tlv(tw, TagType::Anonymous);
                return;
            }
        };

        let mut encoder = InvokeEncoder { tw, path: cmd_path };
        if let Err(status) = cluster.handle_command(&cmd_path, el, &mut encoder) {
            let resp = ib::InvResp::status_new(cmd_path, status, 0);
            let _ = resp.to_tlv(tw, TagType::Anonymous);
        }
    }

    fn handle_subscribe(&mut self, payload: &[u8], exchange: &mut dyn ExchangeSender) -> Result<Vec<u8>, Error> {
        let mut element = TLVElement::new(payload);
        element.next()?;
        let req = SubscribeReq::from_tlv(&mut element)?;

        let report_bytes = self.build_report_data(&req.to_read_req())?;
        exchange.send(OpCode::ReportData, &report_bytes, true)?;

        let subs_id: u32 = rand::random();
        let resp = SubscribeResp::new(subs_id, req.max_int_ceil);
        let mut tw = TLVWriter::new();
        resp.to_tlv(&mut tw, TagType::Anonymous)?;
        Ok(tw.into_vec())
    }

    fn handle_timed(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        let mut element = TLVElement::new(payload);
        element.next()?;
        let _req = TimedReq::from_tlv(&mut element)?;

        let resp = StatusResp::new(IMStatusCode::Success);
        let mut tw = TLVWriter::new();
        resp.to_tlv(&mut tw, TagType::Anonymous)?;
        Ok(tw.into_vec())
    }
}

impl ProtoHandler for ImAdapter {
    fn handle_proto_id(&mut self, opcode: u8, payload: &[u8], exchange: &mut dyn ExchangeSender) -> Result<Option<Vec<u8>>, Error> {
        let opcode = OpCode::from_u8(opcode).ok_or(Error::Invalid)?;
        self.dispatch(opcode, payload, exchange)
    }
}

/// Writes each read response straight into the outer `ReportDataMsg`'s
/// attribute-reports array as it is produced, rather than collecting into an
/// intermediate `Vec` whose `EncodeValue` borrows would outlive the closures
/// that produced them.
struct AttrReadEncoder<'w> {
    tw: &'w mut TLVWriter,
    path: ib::AttrPath,
    data_ver: u32,
}

impl<'w> Encoder for AttrReadEncoder<'w> {
    fn encode(&mut self, value: EncodeValue<'_>) {
        let resp = AttrResp::Data(AttrData::new(Some(self.data_ver), self.path, value));
        let _ = resp.to_tlv(self.tw, TagType::Anonymous);
    }

    fn encode_status(&mut self, status: IMStatusCode, cluster_status: u16) {
        let resp = AttrResp::Status(ib::AttrStatus::new(&self.path.to_gp(), status, cluster_status));
        let _ = resp.to_tlv(self.tw, TagType::Anonymous);
    }
}

struct InvokeEncoder<'w> {
    tw: &'w mut TLVWriter,
    path: ib::CmdPath,
}

impl<'w> Encoder for InvokeEncoder<'w> {
    fn encode(&mut self, value: EncodeValue<'_>) {
        let resp = ib::InvResp::Cmd(ib::CmdData::new(self.path, value));
        let _ = resp.to_tlv(self.tw, TagType::Anonymous);
    }

    fn encode_status(&mut self, status: IMStatusCode, cluster_status: u16) {
        let resp = ib::InvResp::status_new(self.path, status, cluster_status);
        let _ = resp.to_tlv(self.tw, TagType::Anonymous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::objects::{DeviceType, Endpoint};
    use crate::data_model::sdm::basic_information::BasicInfoCluster;
    use crate::data_model::system_model::descriptor;
    use crate::data_model::system_model::descriptor::DescriptorCluster;
    use crate::node::acl::AclStore;
    use crate::node::counters::CounterState;
    use crate::node::fabric::FabricTable;
    use std::sync::{Arc, RwLock};

    struct CollectingSender {
        sent: Vec<(OpCode, Vec<u8>)>,
    }

    impl ExchangeSender for CollectingSender {
        fn send(&mut self, opcode: OpCode, payload: &[u8], _reliable: bool) -> Result<(), Error> {
            self.sent.push((opcode, payload.to_vec()));
            Ok(())
        }
    }

    fn test_data_model() -> DataModel {
        let _ = env_logger::try_init();

        let state = NodeState::new(FabricTable::default(), AclStore::default(), CounterState::default());
        let node = Arc::new(RwLock::new(state));
        let data_model = DataModel::new(node.clone());

        let mut root = Endpoint::new(0, DeviceType { dtype: 0x0016, drev: 1 });
        let descriptor = DescriptorCluster::new(0, data_model.clone()).unwrap();
        let basic_info = BasicInfoCluster::new(0xFFF1, 0x8000, 1, 1, "1234").unwrap();
        root.add_cluster(descriptor).unwrap();
        root.add_cluster(basic_info).unwrap();
        node.write().unwrap().endpoints.insert(0, root);

        data_model
    }

    fn encode_read_req(attr_requests: &[ib::AttrPath]) -> Vec<u8> {
        let req = ReadReq::default().set_attr_requests(attr_requests);
        let mut tw = TLVWriter::new();
        req.to_tlv(&mut tw, TagType::Anonymous).unwrap();
        tw.into_vec()
    }

    #[test]
    fn read_request_reports_descriptor_device_type_list() {
        let mut adapter = ImAdapter::new(test_data_model());
        let path = ib::AttrPath::new(&GenericPath::new(Some(0), Some(descriptor::ID), None));
        let payload = encode_read_req(&[path]);

        let mut sender = CollectingSender { sent: Vec::new() };
        adapter.dispatch(OpCode::ReadRequest, &payload, &mut sender).unwrap();

        assert_eq!(sender.sent.len(), 1);
        assert_eq!(sender.sent[0].0, OpCode::ReportData);
        assert!(!sender.sent[0].1.is_empty());
    }

    #[test]
    fn read_of_unknown_cluster_reports_unsupported_cluster() {
        let mut adapter = ImAdapter::new(test_data_model());
        let path = ib::AttrPath::new(&GenericPath::new(Some(0), Some(0xFFFF_FFFF), Some(0)));
        let payload = encode_read_req(&[path]);

        let mut sender = CollectingSender { sent: Vec::new() };
        adapter.dispatch(OpCode::ReadRequest, &payload, &mut sender).unwrap();

        let mut element = TLVElement::new(&sender.sent[0].1);
        element.next().unwrap();
        let report = crate::interaction_model::messages::msg::ReportDataMsg::from_tlv(&mut element).unwrap();
        let reports = report.attr_reports.unwrap();
        match reports.iter().next().unwrap() {
            AttrResp::Status(status) => assert_eq!(status.status.status, IMStatusCode::UnsupportedCluster),
            AttrResp::Data(_) => panic!("expected a status, not data"),
        }
    }

    #[test]
    fn timed_request_acknowledges_success() {
        let mut adapter = ImAdapter::new(test_data_model());
        let mut tw = TLVWriter::new();
        TimedReq { timeout: 500 }.to_tlv(&mut tw, TagType::Anonymous).unwrap();

        let mut sender = CollectingSender { sent: Vec::new() };
        adapter.dispatch(OpCode::TimedRequest, tw.as_slice(), &mut sender).unwrap();

        assert_eq!(sender.sent[0].0, OpCode::StatusResponse);
        let mut element = TLVElement::new(&sender.sent[0].1);
        element.next().unwrap();
        let resp = StatusResp::from_tlv(&mut element).unwrap();
        assert_eq!(resp.status, IMStatusCode::Success);
    }

    #[test]
    fn unknown_opcode_echoes_request_bytes() {
        let mut adapter = ImAdapter::new(test_data_model());
        let mut sender = CollectingSender { sent: Vec::new() };
        adapter.dispatch(OpCode::StatusResponse, &[1, 2, 3], &mut sender).unwrap();
        assert_eq!(sender.sent[0], (OpCode::StatusResponse, vec![1, 2, 3]));
    }
}
