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

use std::fmt;

use crate::interaction_model::core::IMStatusCode;
use crate::node::NodeError;
use crate::tlv::TlvError;

/// The single error type threaded through the whole crate.
///
/// Codec and IM-decode failures are folded in via `From`, so call sites that
/// cross layers (the protocol adapter mapping a decode error onto a wire
/// status, a cluster read calling into the TLV writer) can use `?` without
/// caring which layer produced the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Tlv(TlvError),
    Im(ImError),
    Node(NodeError),
    /// Catch-all for conditions that don't deserve their own variant
    /// (matches the teacher's liberal use of a generic `Invalid`).
    Invalid,
    NoSpace,
    CommandNotFound,
    AttributeNotFound,
    ClusterNotFound,
    EndpointNotFound,
}

/// IM decode errors (spec §7: `InvalidType`, `MissingField`, `InvalidTag`,
/// `MalformedPath`, `InvalidStatus`, `UnexpectedEnd`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImError {
    InvalidType,
    MissingField,
    InvalidTag,
    MalformedPath,
    InvalidStatus,
    UnexpectedEnd,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Tlv(e) => write!(f, "TLV error: {:?}", e),
            Error::Im(e) => write!(f, "IM decode error: {:?}", e),
            Error::Node(e) => write!(f, "node error: {:?}", e),
            Error::Invalid => write!(f, "invalid"),
            Error::NoSpace => write!(f, "no space left in output buffer"),
            Error::CommandNotFound => write!(f, "command not found"),
            Error::AttributeNotFound => write!(f, "attribute not found"),
            Error::ClusterNotFound => write!(f, "cluster not found"),
            Error::EndpointNotFound => write!(f, "endpoint not found"),
        }
    }
}

impl std::error::Error for Error {}

impl From<TlvError> for Error {
    fn from(e: TlvError) -> Self {
        Error::Tlv(e)
    }
}

impl From<ImError> for Error {
    fn from(e: ImError) -> Self {
        Error::Im(e)
    }
}

impl From<NodeError> for Error {
    fn from(e: NodeError) -> Self {
        Error::Node(e)
    }
}

/// Maps an internal `Error` to the most specific applicable wire status, per
/// spec §7 ("A malformed request from a peer elicits a StatusResponse with
/// the most specific applicable IM status"). Internal errors never leak a
/// stack trace to the peer; anything not explicitly mapped becomes `Failure`.
impl From<Error> for IMStatusCode {
    fn from(e: Error) -> Self {
        match e {
            Error::Tlv(_) => IMStatusCode::InvalidAction,
            Error::Im(ImError::MissingField) | Error::Im(ImError::MalformedPath) => {
                IMStatusCode::InvalidAction
            }
            Error::Im(_) => IMStatusCode::InvalidAction,
            Error::CommandNotFound => IMStatusCode::UnsupportedCommand,
            Error::AttributeNotFound => IMStatusCode::UnsupportedAttribute,
            Error::ClusterNotFound => IMStatusCode::UnsupportedCluster,
            Error::EndpointNotFound => IMStatusCode::UnsupportedEndpoint,
            _ => IMStatusCode::Failure,
        }
    }
}
