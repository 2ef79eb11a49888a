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

use crate::{
    data_model::objects::{ClusterId, EndptId},
    error::Error,
    tlv::{FromTLV, TLVElement, TLVWriter, TagType, ToTLV},
};

/// A generic path with endpoint, cluster, and a leaf (attribute, command or
/// event id). The leaf could be a command, attribute, or event.
#[derive(Default, Clone, Copy, Debug, PartialEq, FromTLV, ToTLV)]
#[tlvargs(datatype = "list")]
pub struct GenericPath {
    pub endpoint: Option<EndptId>,
    pub cluster: Option<ClusterId>,
    pub leaf: Option<u32>,
}

impl GenericPath {
    pub fn new(endpoint: Option<EndptId>, cluster: Option<ClusterId>, leaf: Option<u32>) -> Self {
        Self {
            endpoint,
            cluster,
            leaf,
        }
    }

    /// Returns the fully-specified triple if this path names no wildcards.
    pub fn not_wildcard(&self) -> Result<(EndptId, ClusterId, u32), Error> {
        match *self {
            GenericPath {
                endpoint: Some(e),
                cluster: Some(c),
                leaf: Some(l),
            } => Ok((e, c, l)),
            _ => Err(Error::Invalid),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        !matches!(
            *self,
            GenericPath {
                endpoint: Some(_),
                cluster: Some(_),
                leaf: Some(_),
            }
        )
    }
}

pub mod msg {
    use crate::{
        error::Error,
        interaction_model::core::IMStatusCode,
        tlv::{FromTLV, TLVArray, TLVElement, TLVWriter, TagType, ToTLV},
    };

    use super::ib::{
        self, AttrData, AttrPath, AttrResp, AttrStatus, CmdData, DataVersionFilter, EventFilter,
        EventPath, EventReport,
    };

    #[derive(Default, FromTLV, ToTLV)]
    #[tlvargs(lifetime = "'a")]
    pub struct SubscribeReq<'a> {
        pub keep_subs: bool,
        pub min_int_floor: u16,
        pub max_int_ceil: u16,
        pub attr_requests: Option<TLVArray<'a, AttrPath>>,
        pub event_requests: Option<TLVArray<'a, EventPath>>,
        pub event_filters: Option<TLVArray<'a, EventFilter>>,
        _dummy: Option<bool>,
        pub fabric_filtered: bool,
        pub dataver_filters: Option<TLVArray<'a, DataVersionFilter>>,
    }

    impl<'a> SubscribeReq<'a> {
        pub fn new(fabric_filtered: bool, min_int_floor: u16, max_int_ceil: u16) -> Self {
            Self {
                fabric_filtered,
                min_int_floor,
                max_int_ceil,
                ..Default::default()
            }
        }

        pub fn set_attr_requests(mut self, requests: &'a [AttrPath]) -> Self {
            self.attr_requests = Some(TLVArray::new(requests));
            self
        }

        pub fn to_read_req(&self) -> ReadReq<'a> {
            ReadReq {
                attr_requests: self.attr_requests,
                event_requests: self.event_requests,
                event_filters: self.event_filters,
                fabric_filtered: self.fabric_filtered,
                dataver_filters: self.dataver_filters,
            }
        }
    }

    /// Tag 1 is reserved on the wire (spec §9): this must keep writing
    /// `subs_id` at tag 0 and `max_int` at tag 2 directly, never tag 1.
    #[derive(Debug, FromTLV, ToTLV)]
    pub struct SubscribeResp {
        pub subs_id: u32,
        _dummy: Option<u32>,
        pub max_int: u16,
    }

    impl SubscribeResp {
        pub fn new(subs_id: u32, max_int: u16) -> Self {
            Self {
                subs_id,
                _dummy: None,
                max_int,
            }
        }
    }

    #[derive(FromTLV, ToTLV)]
    pub struct TimedReq {
        pub timeout: u16,
    }

    #[derive(FromTLV, ToTLV)]
    pub struct StatusResp {
        pub status: IMStatusCode,
    }

    impl StatusResp {
        pub fn new(status: IMStatusCode) -> Self {
            Self { status }
        }
    }

    pub enum InvReqTag {
        SuppressResponse = 0,
        TimedReq = 1,
        InvokeRequests = 2,
    }

    #[derive(FromTLV, ToTLV)]
    #[tlvargs(lifetime = "'a")]
    pub struct InvReq<'a> {
        pub suppress_response: Option<bool>,
        pub timed_request: Option<bool>,
        pub inv_requests: Option<TLVArray<'a, CmdData<'a>>>,
    }

    pub enum InvRespTag {
        SuppressResponse = 0,
        InvokeResponses = 1,
    }

    #[derive(FromTLV, ToTLV, Debug)]
    #[tlvargs(lifetime = "'a")]
    pub struct InvResp<'a> {
        pub suppress_response: Option<bool>,
        pub inv_responses: Option<TLVArray<'a, ib::InvResp<'a>>>,
    }

    #[derive(Default, ToTLV, FromTLV)]
    #[tlvargs(lifetime = "'a")]
    pub struct ReadReq<'a> {
        pub attr_requests: Option<TLVArray<'a, AttrPath>>,
        pub event_requests: Option<TLVArray<'a, EventPath>>,
        pub event_filters: Option<TLVArray<'a, EventFilter>>,
        pub fabric_filtered: bool,
        pub dataver_filters: Option<TLVArray<'a, DataVersionFilter>>,
    }

    impl<'a> ReadReq<'a> {
        pub fn new(fabric_filtered: bool) -> Self {
            Self {
                fabric_filtered,
                ..Default::default()
            }
        }

        pub fn set_attr_requests(mut self, requests: &'a [AttrPath]) -> Self {
            self.attr_requests = Some(TLVArray::new(requests));
            self
        }
    }

    #[derive(ToTLV, FromTLV)]
    #[tlvargs(lifetime = "'a")]
    pub struct WriteReq<'a> {
        pub suppress_response: Option<bool>,
        pub timed_request: Option<bool>,
        pub write_requests: TLVArray<'a, AttrData<'a>>,
        pub more_chunked: Option<bool>,
    }

    impl<'a> WriteReq<'a> {
        pub fn new(suppress_response: bool, write_requests: &'a [AttrData<'a>]) -> Self {
            Self {
                suppress_response: if suppress_response { Some(true) } else { None },
                write_requests: TLVArray::new(write_requests),
                timed_request: None,
                more_chunked: None,
            }
        }
    }

    #[derive(FromTLV, ToTLV)]
    #[tlvargs(lifetime = "'a")]
    pub struct ReportDataMsg<'a> {
        pub subscription_id: Option<u32>,
        pub attr_reports: Option<TLVArray<'a, AttrResp<'a>>>,
        pub event_reports: Option<TLVArray<'a, EventReport<'a>>>,
        pub more_chunks: Option<bool>,
        pub suppress_response: Option<bool>,
    }

    pub enum ReportDataTag {
        SubscriptionId = 0,
        AttributeReports = 1,
        EventReports = 2,
        MoreChunkedMsgs = 3,
        SuppressResponse = 4,
    }

    #[derive(ToTLV, FromTLV)]
    #[tlvargs(lifetime = "'a")]
    pub struct WriteResp<'a> {
        pub write_responses: TLVArray<'a, AttrStatus>,
    }

    pub enum WriteRespTag {
        WriteResponses = 0,
    }
}

pub mod ib {
    use std::fmt::Debug;

    use crate::{
        data_model::objects::{AttrDetails, AttrId, ClusterId, EncodeValue, EndptId},
        error::Error,
        interaction_model::core::IMStatusCode,
        tlv::{FromTLV, Nullable, TLVElement, TLVWriter, TagType, ToTLV},
    };
    use log::error;

    use super::GenericPath;

    // ---- Invoke (command) IBs ----

    #[derive(Clone, Copy, FromTLV, ToTLV, Debug)]
    #[tlvargs(lifetime = "'a")]
    pub enum InvResp<'a> {
        Cmd(CmdData<'a>),
        Status(CmdStatus),
    }

    impl<'a> InvResp<'a> {
        pub fn cmd_new(endpoint: EndptId, cluster: ClusterId, cmd: u16, data: EncodeValue<'a>) -> Self {
            Self::Cmd(CmdData::new(CmdPath::new(Some(endpoint), Some(cluster), Some(cmd)), data))
        }

        pub fn status_new(cmd_path: CmdPath, status: IMStatusCode, cluster_status: u16) -> Self {
            Self::Status(CmdStatus {
                path: cmd_path,
                status: Status::new(status, cluster_status),
            })
        }
    }

    #[derive(FromTLV, ToTLV, Copy, Clone, PartialEq, Debug)]
    pub struct CmdStatus {
        pub path: CmdPath,
        pub status: Status,
    }

    impl CmdStatus {
        pub fn new(path: CmdPath, status: IMStatusCode, cluster_status: u16) -> Self {
            Self {
                path,
                status: Status { status, cluster_status },
            }
        }
    }

    #[derive(Debug, Clone, Copy, FromTLV, ToTLV)]
    #[tlvargs(lifetime = "'a")]
    pub struct CmdData<'a> {
        pub path: CmdPath,
        pub data: EncodeValue<'a>,
    }

    impl<'a> CmdData<'a> {
        pub fn new(path: CmdPath, data: EncodeValue<'a>) -> Self {
            Self { path, data }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, FromTLV, ToTLV)]
    pub struct Status {
        pub status: IMStatusCode,
        pub cluster_status: u16,
    }

    impl Status {
        pub fn new(status: IMStatusCode, cluster_status: u16) -> Status {
            Status { status, cluster_status }
        }
    }

    // ---- Attribute IBs ----

    #[derive(Clone, Copy, FromTLV, ToTLV, PartialEq, Debug)]
    #[tlvargs(lifetime = "'a")]
    pub enum AttrResp<'a> {
        Status(AttrStatus),
        Data(AttrData<'a>),
    }

    impl<'a> AttrResp<'a> {
        pub fn new(data_ver: u32, path: &AttrPath, data: EncodeValue<'a>) -> Self {
            AttrResp::Data(AttrData::new(Some(data_ver), *path, data))
        }

        pub fn unwrap_data(self) -> AttrData<'a> {
            match self {
                AttrResp::Data(d) => d,
                _ => panic!("No data exists"),
            }
        }
    }

    #[derive(Clone, Copy, PartialEq, FromTLV, ToTLV, Debug)]
    #[tlvargs(lifetime = "'a")]
    pub struct AttrData<'a> {
        pub data_ver: Option<u32>,
        pub path: AttrPath,
        pub data: EncodeValue<'a>,
    }

    impl<'a> AttrData<'a> {
        pub fn new(data_ver: Option<u32>, path: AttrPath, data: EncodeValue<'a>) -> Self {
            Self { data_ver, path, data }
        }
    }

    #[derive(Debug)]
    /// Operations on an Interaction Model List
    pub enum ListOperation {
        AddItem,
        EditItem(u16),
        DeleteItem(u16),
        DeleteList,
    }

    /// Attribute Lists in Attribute Data are special. Infer the correct meaning using this function.
    pub fn attr_list_write<F>(attr: &AttrDetails, data: &mut TLVElement, mut f: F) -> Result<(), IMStatusCode>
    where
        F: FnMut(ListOperation, &mut TLVElement) -> Result<(), IMStatusCode>,
    {
        if let Some(Nullable::NotNull(index)) = attr.list_index {
            if data.null().is_ok() {
                f(ListOperation::DeleteItem(index), data)
            } else {
                f(ListOperation::EditItem(index), data)
            }
        } else if data.r#type() == Ok(crate::tlv::ElementType::Array) {
            f(ListOperation::DeleteList, data)?;
            data.enter_container().map_err(|_| IMStatusCode::InvalidAction)?;
            while data.next().map_err(|_| IMStatusCode::InvalidAction)? && !data.is_end_of_container() {
                f(ListOperation::AddItem, data)?;
            }
            data.exit_container().map_err(|_| IMStatusCode::InvalidAction)?;
            Ok(())
        } else {
            f(ListOperation::AddItem, data)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, FromTLV, ToTLV)]
    pub struct AttrStatus {
        pub path: AttrPath,
        pub status: Status,
    }

    impl AttrStatus {
        pub fn new(path: &GenericPath, status: IMStatusCode, cluster_status: u16) -> Self {
            Self {
                path: AttrPath::new(path),
                status: Status::new(status, cluster_status),
            }
        }
    }

    #[derive(Default, Clone, Copy, Debug, PartialEq, FromTLV, ToTLV)]
    #[tlvargs(datatype = "list")]
    pub struct AttrPath {
        pub tag_compression: Option<bool>,
        pub node: Option<u64>,
        pub endpoint: Option<EndptId>,
        pub cluster: Option<ClusterId>,
        pub attr: Option<AttrId>,
        pub list_index: Option<Nullable<u16>>,
    }

    impl AttrPath {
        pub fn new(path: &GenericPath) -> Self {
            Self {
                endpoint: path.endpoint,
                cluster: path.cluster,
                attr: path.leaf.map(|x| x as u16),
                ..Default::default()
            }
        }

        pub fn to_gp(&self) -> GenericPath {
            GenericPath::new(self.endpoint, self.cluster, self.attr.map(|x| x as u32))
        }
    }

    #[derive(Default, Debug, Copy, Clone, PartialEq)]
    pub struct CmdPath {
        pub path: GenericPath,
    }

    #[macro_export]
    macro_rules! cmd_path_ib {
        ($endpoint:literal,$cluster:ident,$command:expr) => {{
            use $crate::interaction_model::messages::{ib::CmdPath, GenericPath};
            CmdPath {
                path: GenericPath {
                    endpoint: Some($endpoint),
                    cluster: Some($cluster),
                    leaf: Some($command as u32),
                },
            }
        }};
    }

    impl CmdPath {
        pub fn new(endpoint: Option<EndptId>, cluster: Option<ClusterId>, command: Option<u16>) -> Self {
            Self {
                path: GenericPath {
                    endpoint,
                    cluster,
                    leaf: command.map(|a| a as u32),
                },
            }
        }
    }

    /// A command path has no wildcards: all three components are required
    /// (spec §3 invariant), so this can't be the plain derived `GenericPath`
    /// decode — it has to additionally reject an incomplete path.
    impl<'a> FromTLV<'a> for CmdPath {
        fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, Error> {
            let c = CmdPath {
                path: GenericPath::from_tlv(element)?,
            };
            if c.path.leaf.is_none() || c.path.endpoint.is_none() || c.path.cluster.is_none() {
                error!("Wildcard command path not supported");
                Err(Error::CommandNotFound)
            } else {
                Ok(c)
            }
        }
    }

    impl ToTLV for CmdPath {
        fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), Error> {
            self.path.to_tlv(tw, tag_type)
        }
    }

    #[derive(FromTLV, ToTLV, Copy, Clone)]
    #[tlvargs(datatype = "list")]
    pub struct ClusterPath {
        pub node: Option<u64>,
        pub endpoint: Option<EndptId>,
        pub cluster: Option<ClusterId>,
    }

    #[derive(FromTLV, ToTLV, Copy, Clone)]
    pub struct DataVersionFilter {
        pub path: ClusterPath,
        pub data_ver: u32,
    }

    #[derive(FromTLV, ToTLV, Copy, Clone)]
    #[tlvargs(datatype = "list")]
    pub struct EventPath {
        pub node: Option<u64>,
        pub endpoint: Option<EndptId>,
        pub cluster: Option<ClusterId>,
        pub event: Option<u32>,
        pub is_urgent: Option<bool>,
    }

    #[derive(FromTLV, ToTLV, Copy, Clone)]
    pub struct EventFilter {
        pub node: Option<u64>,
        pub event_min: Option<u64>,
    }

    // ---- Event IBs ----

    #[derive(Debug, Clone, Copy, PartialEq, FromTLV, ToTLV)]
    pub struct EventStatus {
        pub path: EventDataPath,
        pub status: Status,
    }

    /// An `EventDataIB.path` is a fully-specified (non-wildcard) node/endpoint/
    /// cluster/event quadruple, distinct from the wildcard-capable `EventPath`
    /// used in subscribe/read requests.
    #[derive(Debug, Clone, Copy, PartialEq, FromTLV, ToTLV)]
    pub struct EventDataPath {
        pub node: Option<u64>,
        pub endpoint: EndptId,
        pub cluster: ClusterId,
        pub event: u32,
    }

    #[derive(Debug, Clone, Copy, FromTLV, ToTLV)]
    #[tlvargs(lifetime = "'a")]
    pub struct EventData<'a> {
        pub path: EventDataPath,
        pub event_number: u64,
        pub priority: u8,
        pub epoch_ts: Option<u64>,
        pub system_ts: Option<u64>,
        pub delta_epoch_ts: Option<u64>,
        pub delta_system_ts: Option<u64>,
        pub data: EncodeValue<'a>,
    }

    /// Matter epoch timestamps are seconds since 2000-01-01T00:00:00Z, not
    /// the Unix epoch.
    const MATTER_EPOCH_OFFSET_SECS: i64 = 946_684_800;

    impl<'a> EventData<'a> {
        pub fn new(path: EventDataPath, event_number: u64, priority: u8, data: EncodeValue<'a>) -> Self {
            Self {
                path,
                event_number,
                priority,
                epoch_ts: None,
                system_ts: None,
                delta_epoch_ts: None,
                delta_system_ts: None,
                data,
            }
        }

        /// Stamps `epoch_ts` with the current wall-clock time converted to
        /// the Matter epoch.
        pub fn stamp_epoch_now(mut self) -> Self {
            let unix_secs = chrono::Utc::now().timestamp();
            self.epoch_ts = Some((unix_secs - MATTER_EPOCH_OFFSET_SECS).max(0) as u64);
            self
        }
    }

    #[derive(Clone, Copy, FromTLV, ToTLV, Debug)]
    #[tlvargs(lifetime = "'a")]
    pub enum EventReport<'a> {
        Status(EventStatus),
        Data(EventData<'a>),
    }
}

#[cfg(test)]
mod tests {
    use super::ib::{AttrPath, CmdData, CmdPath};
    use super::msg::InvReq;
    use super::GenericPath;
    use crate::data_model::objects::EncodeValue;
    use crate::error::Error;
    use crate::tlv::{FromTLV, TLVElement, TLVWriter, TagType, ToTLV};

    #[test]
    fn generic_path_round_trips() {
        let path = GenericPath::new(Some(1), Some(6), Some(0));
        let mut tw = TLVWriter::new();
        path.to_tlv(&mut tw, TagType::Anonymous).unwrap();

        let mut element = TLVElement::new(tw.as_slice());
        element.next().unwrap();
        let decoded = GenericPath::from_tlv(&mut element).unwrap();
        assert_eq!(decoded, path);
    }

    #[test]
    fn attr_path_wildcard_attribute_round_trips() {
        let path = AttrPath::new(&GenericPath::new(Some(1), Some(6), None));
        let mut tw = TLVWriter::new();
        path.to_tlv(&mut tw, TagType::Anonymous).unwrap();

        let mut element = TLVElement::new(tw.as_slice());
        element.next().unwrap();
        let decoded = AttrPath::from_tlv(&mut element).unwrap();
        assert_eq!(decoded, path);
        assert!(decoded.to_gp().is_wildcard());
    }

    #[test]
    fn event_data_stamp_epoch_now_uses_matter_epoch_not_unix_epoch() {
        use super::ib::{EventData, EventDataPath};

        let path = EventDataPath { node: None, endpoint: 1, cluster: 6, event: 0 };
        let write_nothing: &dyn Fn(TagType, &mut TLVWriter) -> Result<(), Error> =
            &|tag, tw| tw.put_bool(tag, true);
        let event = EventData::new(path, 1, 1, EncodeValue::Closure(write_nothing)).stamp_epoch_now();

        let unix_now = chrono::Utc::now().timestamp() as u64;
        let epoch_ts = event.epoch_ts.unwrap();
        assert!(epoch_ts < unix_now, "matter epoch timestamp must be smaller than the unix one");
    }

    #[test]
    fn cmd_path_rejects_wildcard_command() {
        let incomplete = GenericPath::new(Some(1), Some(6), None);
        let mut tw = TLVWriter::new();
        incomplete.to_tlv(&mut tw, TagType::Anonymous).unwrap();

        let mut element = TLVElement::new(tw.as_slice());
        element.next().unwrap();
        assert_eq!(CmdPath::from_tlv(&mut element).unwrap_err(), Error::CommandNotFound);
    }

    /// Matter 1.5 §8, scenario 4: an `InvokeRequestMessage` with
    /// `SuppressResponse`/`TimedRequest` both true and a single invoke
    /// request (`Endpoint=1, Cluster=3, Command=4`, `Fields={1: true}`)
    /// round-trips byte-for-byte.
    #[test]
    fn invoke_request_message_round_trips_byte_for_byte() {
        let write_fields: &dyn Fn(TagType, &mut TLVWriter) -> Result<(), Error> = &|tag, tw| {
            tw.start_struct(tag)?;
            tw.put_bool(TagType::Context(1), true)?;
            tw.end_container()?;
            Ok(())
        };

        let cmd_path = CmdPath::new(Some(1), Some(3), Some(4));
        let cmd_data = CmdData::new(cmd_path, EncodeValue::Closure(write_fields));
        let requests = [cmd_data];
        let req = InvReq {
            suppress_response: Some(true),
            timed_request: Some(true),
            inv_requests: Some(crate::tlv::TLVArray::new(&requests)),
        };

        let mut first = TLVWriter::new();
        req.to_tlv(&mut first, TagType::Anonymous).unwrap();

        let mut element = TLVElement::new(first.as_slice());
        element.next().unwrap();
        let decoded = InvReq::from_tlv(&mut element).unwrap();

        assert_eq!(decoded.suppress_response, Some(true));
        assert_eq!(decoded.timed_request, Some(true));
        let decoded_requests = decoded.inv_requests.unwrap();
        let mut iter = decoded_requests.iter();
        let first_cmd = iter.next().unwrap();
        assert_eq!(first_cmd.path.path, GenericPath::new(Some(1), Some(3), Some(4)));
        assert!(iter.next().is_none());

        let mut second = TLVWriter::new();
        decoded.to_tlv(&mut second, TagType::Anonymous).unwrap();
        assert_eq!(first.as_slice(), second.as_slice());
    }
}
