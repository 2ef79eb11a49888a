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

use crate::error::Error;
use crate::tlv::{FromTLV, TLVElement, TLVWriter, TagType, ToTLV};

/// Interaction Model opcodes (spec §3, §6.3). Values are normative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    StatusResponse = 0x01,
    ReadRequest = 0x02,
    SubscribeRequest = 0x03,
    SubscribeResponse = 0x04,
    ReportData = 0x05,
    WriteRequest = 0x06,
    WriteResponse = 0x07,
    InvokeRequest = 0x08,
    InvokeResponse = 0x09,
    TimedRequest = 0x0A,
}

impl OpCode {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x01 => OpCode::StatusResponse,
            0x02 => OpCode::ReadRequest,
            0x03 => OpCode::SubscribeRequest,
            0x04 => OpCode::SubscribeResponse,
            0x05 => OpCode::ReportData,
            0x06 => OpCode::WriteRequest,
            0x07 => OpCode::WriteResponse,
            0x08 => OpCode::InvokeRequest,
            0x09 => OpCode::InvokeResponse,
            0x0A => OpCode::TimedRequest,
            _ => return None,
        })
    }

    /// The response opcode for a request opcode, per spec §4.4.2. Opcodes
    /// that are themselves responses (or unrecognised) echo back unchanged.
    pub fn response_opcode(self) -> OpCode {
        match self {
            OpCode::ReadRequest => OpCode::ReportData,
            OpCode::WriteRequest => OpCode::WriteResponse,
            OpCode::InvokeRequest => OpCode::InvokeResponse,
            OpCode::SubscribeRequest => OpCode::SubscribeResponse,
            OpCode::TimedRequest => OpCode::StatusResponse,
            other => other,
        }
    }
}

/// The one-byte Interaction Model status enumeration (spec §4.2.4). Only
/// `Success`/`Failure` and the codes this node actually produces internally
/// are given dedicated names; every other byte value round-trips exactly via
/// `Unknown` rather than guessing at a name the wire format doesn't carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IMStatusCode {
    Success,
    Failure,
    InvalidSubscription,
    UnsupportedAccess,
    UnsupportedEndpoint,
    InvalidAction,
    UnsupportedCommand,
    InvalidCommand,
    UnsupportedAttribute,
    ConstraintError,
    UnsupportedWrite,
    ResourceExhausted,
    NotFound,
    UnreportableAttribute,
    InvalidDataType,
    UnsupportedRead,
    DataVersionMismatch,
    Timeout,
    Busy,
    AccessRestricted,
    UnsupportedCluster,
    NoUpstreamSubscription,
    NeedsTimedInteraction,
    UnsupportedEvent,
    PathsExhausted,
    TimedRequestMismatch,
    FailsafeRequired,
    InvalidInState,
    NoCommandResponse,
    Unknown(u8),
}

impl IMStatusCode {
    pub fn to_u8(self) -> u8 {
        match self {
            IMStatusCode::Success => 0x00,
            IMStatusCode::Failure => 0x01,
            IMStatusCode::InvalidSubscription => 0x7D,
            IMStatusCode::UnsupportedAccess => 0x7E,
            IMStatusCode::UnsupportedEndpoint => 0x7F,
            IMStatusCode::InvalidAction => 0x80,
            IMStatusCode::UnsupportedCommand => 0x81,
            IMStatusCode::InvalidCommand => 0x85,
            IMStatusCode::UnsupportedAttribute => 0x86,
            IMStatusCode::ConstraintError => 0x87,
            IMStatusCode::UnsupportedWrite => 0x88,
            IMStatusCode::ResourceExhausted => 0x89,
            IMStatusCode::NotFound => 0x8B,
            IMStatusCode::UnreportableAttribute => 0x8C,
            IMStatusCode::InvalidDataType => 0x8D,
            IMStatusCode::UnsupportedRead => 0x8F,
            IMStatusCode::DataVersionMismatch => 0x92,
            IMStatusCode::Timeout => 0x94,
            IMStatusCode::Busy => 0x9C,
            IMStatusCode::AccessRestricted => 0x9D,
            IMStatusCode::UnsupportedCluster => 0xC3,
            IMStatusCode::NoUpstreamSubscription => 0xC5,
            IMStatusCode::NeedsTimedInteraction => 0xC6,
            IMStatusCode::UnsupportedEvent => 0xC7,
            IMStatusCode::PathsExhausted => 0xC8,
            IMStatusCode::TimedRequestMismatch => 0xC9,
            IMStatusCode::FailsafeRequired => 0xCA,
            IMStatusCode::InvalidInState => 0xCB,
            IMStatusCode::NoCommandResponse => 0xCC,
            IMStatusCode::Unknown(v) => v,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            0x00 => IMStatusCode::Success,
            0x01 => IMStatusCode::Failure,
            0x7D => IMStatusCode::InvalidSubscription,
            0x7E => IMStatusCode::UnsupportedAccess,
            0x7F => IMStatusCode::UnsupportedEndpoint,
            0x80 => IMStatusCode::InvalidAction,
            0x81 => IMStatusCode::UnsupportedCommand,
            0x85 => IMStatusCode::InvalidCommand,
            0x86 => IMStatusCode::UnsupportedAttribute,
            0x87 => IMStatusCode::ConstraintError,
            0x88 => IMStatusCode::UnsupportedWrite,
            0x89 => IMStatusCode::ResourceExhausted,
            0x8B => IMStatusCode::NotFound,
            0x8C => IMStatusCode::UnreportableAttribute,
            0x8D => IMStatusCode::InvalidDataType,
            0x8F => IMStatusCode::UnsupportedRead,
            0x92 => IMStatusCode::DataVersionMismatch,
            0x94 => IMStatusCode::Timeout,
            0x9C => IMStatusCode::Busy,
            0x9D => IMStatusCode::AccessRestricted,
            0xC3 => IMStatusCode::UnsupportedCluster,
            0xC5 => IMStatusCode::NoUpstreamSubscription,
            0xC6 => IMStatusCode::NeedsTimedInteraction,
            0xC7 => IMStatusCode::UnsupportedEvent,
            0xC8 => IMStatusCode::PathsExhausted,
            0xC9 => IMStatusCode::TimedRequestMismatch,
            0xCA => IMStatusCode::FailsafeRequired,
            0xCB => IMStatusCode::InvalidInState,
            0xCC => IMStatusCode::NoCommandResponse,
            other => IMStatusCode::Unknown(other),
        }
    }
}

impl std::fmt::Display for IMStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IMStatusCode::Unknown(v) => write!(f, "Unknown(0x{:02X})", v),
            other => write!(f, "{:?}", other),
        }
    }
}

impl ToTLV for IMStatusCode {
    fn to_tlv(&self, tw: &mut TLVWriter, tag_type: TagType) -> Result<(), Error> {
        tw.put_uint(tag_type, self.to_u8() as u64).map_err(Error::from)
    }
}

impl<'a> FromTLV<'a> for IMStatusCode {
    fn from_tlv(element: &mut TLVElement<'a>) -> Result<Self, Error> {
        let v = element.u8().map_err(Error::from)?;
        Ok(IMStatusCode::from_u8(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_values_are_normative() {
        assert_eq!(OpCode::StatusResponse as u8, 0x01);
        assert_eq!(OpCode::ReadRequest as u8, 0x02);
        assert_eq!(OpCode::SubscribeRequest as u8, 0x03);
        assert_eq!(OpCode::SubscribeResponse as u8, 0x04);
        assert_eq!(OpCode::ReportData as u8, 0x05);
        assert_eq!(OpCode::WriteRequest as u8, 0x06);
        assert_eq!(OpCode::WriteResponse as u8, 0x07);
        assert_eq!(OpCode::InvokeRequest as u8, 0x08);
        assert_eq!(OpCode::InvokeResponse as u8, 0x09);
        assert_eq!(OpCode::TimedRequest as u8, 0x0A);
    }

    #[test]
    fn response_opcode_mapping() {
        assert_eq!(OpCode::ReadRequest.response_opcode(), OpCode::ReportData);
        assert_eq!(OpCode::WriteRequest.response_opcode(), OpCode::WriteResponse);
        assert_eq!(OpCode::InvokeRequest.response_opcode(), OpCode::InvokeResponse);
        assert_eq!(OpCode::SubscribeRequest.response_opcode(), OpCode::SubscribeResponse);
        assert_eq!(OpCode::TimedRequest.response_opcode(), OpCode::StatusResponse);
        assert_eq!(OpCode::StatusResponse.response_opcode(), OpCode::StatusResponse);
    }

    #[test]
    fn unknown_status_round_trips_raw_byte() {
        assert_eq!(IMStatusCode::from_u8(0xEE).to_u8(), 0xEE);
        assert_eq!(IMStatusCode::from_u8(0x00), IMStatusCode::Success);
    }
}
