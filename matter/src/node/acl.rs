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

use crate::data_model::objects::{ClusterId, EndptId};

/// Privilege levels an ACL entry can grant (Matter access control model).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    View,
    Operate,
    Manage,
    Administer,
}

/// One access-control-list entry: which subjects, on which fabric, get
/// `privilege` over which targets. Subject/target matching against a given
/// request is the IM engine's job; this module only owns storage.
#[derive(Debug, Clone, PartialEq)]
pub struct AclEntry {
    pub fabric_index: u8,
    pub privilege: Privilege,
    pub subjects: Vec<u64>,
    pub targets: Vec<AclTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclTarget {
    pub endpoint: Option<EndptId>,
    pub cluster: Option<ClusterId>,
}

#[derive(Debug, Clone, Default)]
pub struct AclStore {
    entries: Vec<AclEntry>,
}

impl AclStore {
    pub fn new(entries: Vec<AclEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AclEntry] {
        &self.entries
    }

    pub fn set_entries(&mut self, entries: Vec<AclEntry>) {
        self.entries = entries;
    }

    pub fn for_fabric(&self, fabric_index: u8) -> impl Iterator<Item = &AclEntry> {
        self.entries.iter().filter(move |e| e.fabric_index == fabric_index)
    }
}
