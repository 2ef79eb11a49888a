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

use std::sync::Mutex;

use crate::node::acl::AclEntry;
use crate::node::counters::CounterState;
use crate::node::fabric::FabricInfo;
use crate::node::NodeError;

/// A persisted group key entry (spec §6.5). Key material is an opaque blob;
/// group-key derivation is out of scope for the core.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupKeyEntry {
    pub group_id: u32,
    pub key: Vec<u8>,
}

/// Everything the node persists across restarts (spec §4.3.4, §6.5). The
/// core does not prescribe a file format or backend; only the contract.
pub trait Storage: Send + Sync {
    fn load_fabrics(&self) -> Result<Vec<FabricInfo>, NodeError>;
    fn save_fabric(&self, info: &FabricInfo) -> Result<(), NodeError>;
    fn delete_fabric(&self, index: u8) -> Result<(), NodeError>;

    fn load_acls(&self) -> Result<Vec<AclEntry>, NodeError>;
    fn save_acls(&self, entries: &[AclEntry]) -> Result<(), NodeError>;

    fn load_counters(&self) -> Result<CounterState, NodeError>;
    fn save_counters(&self, state: &CounterState) -> Result<(), NodeError>;

    fn load_group_keys(&self) -> Result<Vec<GroupKeyEntry>, NodeError>;
    fn save_group_keys(&self, keys: &[GroupKeyEntry]) -> Result<(), NodeError>;
}

/// In-memory reference `Storage`. Deep-clones on every load and save so a
/// caller holding onto a returned `Vec`/`CounterState` can never mutate the
/// persisted copy through it (spec §4.3.4).
#[derive(Default)]
pub struct MemStorage {
    fabrics: Mutex<Vec<FabricInfo>>,
    acls: Mutex<Vec<AclEntry>>,
    counters: Mutex<CounterState>,
    group_keys: Mutex<Vec<GroupKeyEntry>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemStorage {
    fn load_fabrics(&self) -> Result<Vec<FabricInfo>, NodeError> {
        Ok(self.fabrics.lock().unwrap().clone())
    }

    fn save_fabric(&self, info: &FabricInfo) -> Result<(), NodeError> {
        let mut fabrics = self.fabrics.lock().unwrap();
        if let Some(existing) = fabrics.iter_mut().find(|f| f.fabric_index == info.fabric_index) {
            *existing = info.clone();
        } else {
            fabrics.push(info.clone());
        }
        Ok(())
    }

    fn delete_fabric(&self, index: u8) -> Result<(), NodeError> {
        self.fabrics.lock().unwrap().retain(|f| f.fabric_index != index);
        Ok(())
    }

    fn load_acls(&self) -> Result<Vec<AclEntry>, NodeError> {
        Ok(self.acls.lock().unwrap().clone())
    }

    fn save_acls(&self, entries: &[AclEntry]) -> Result<(), NodeError> {
        *self.acls.lock().unwrap() = entries.to_vec();
        Ok(())
    }

    fn load_counters(&self) -> Result<CounterState, NodeError> {
        Ok(self.counters.lock().unwrap().clone())
    }

    fn save_counters(&self, state: &CounterState) -> Result<(), NodeError> {
        *self.counters.lock().unwrap() = state.clone();
        Ok(())
    }

    fn load_group_keys(&self) -> Result<Vec<GroupKeyEntry>, NodeError> {
        Ok(self.group_keys.lock().unwrap().clone())
    }

    fn save_group_keys(&self, keys: &[GroupKeyEntry]) -> Result<(), NodeError> {
        *self.group_keys.lock().unwrap() = keys.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_deep_clones() {
        let storage = MemStorage::new();
        let mut info = FabricInfo {
            fabric_index: 1,
            fabric_id: 42,
            node_id: 7,
            vendor_id: 0xFFF1,
            root_public_key: vec![1, 2, 3],
            label: "home".into(),
        };
        storage.save_fabric(&info).unwrap();
        info.label = "mutated-after-save".into();

        let loaded = storage.load_fabrics().unwrap();
        assert_eq!(loaded[0].label, "home");
    }
}
