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

//! Native Rust implementation of a Matter (Connected Home over IP) node:
//! the TLV wire codec, the Interaction Model message layer and the node
//! lifecycle/data model that ties them together.

pub mod data_model;
pub mod error;
pub mod interaction_model;
pub mod node;
pub mod proto;
pub mod tlv;

pub use error::Error;
pub use node::Node;
