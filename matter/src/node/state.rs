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

use std::collections::BTreeMap;

use crate::data_model::objects::{ClusterType, Endpoint, EndptId};
use crate::error::Error;
use crate::interaction_model::messages::GenericPath;
use crate::node::acl::AclStore;
use crate::node::counters::CounterState;
use crate::node::fabric::FabricTable;
use crate::node::pase::PaseInfo;

/// Lifecycle states of a node (spec §4.3.1). Reachability is given by
/// `can_start`/`can_stop`/`is_running` below rather than scattering `matches!`
/// calls through the transition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initialized,
    Starting,
    Uncommissioned,
    CommissioningOpen,
    Commissioned,
    Stopping,
    Stopped,
}

impl Lifecycle {
    pub fn can_start(self) -> bool {
        matches!(self, Lifecycle::Initialized)
    }

    pub fn can_stop(self) -> bool {
        matches!(
            self,
            Lifecycle::Starting | Lifecycle::Uncommissioned | Lifecycle::CommissioningOpen | Lifecycle::Commissioned
        )
    }

    pub fn is_running(self) -> bool {
        matches!(
            self,
            Lifecycle::Uncommissioned | Lifecycle::CommissioningOpen | Lifecycle::Commissioned
        )
    }
}

/// Everything the node mutates behind its single read-write lock: lifecycle,
/// endpoint registry, fabrics, ACLs and counters. Endpoint mutation is
/// serialized by this lock; cluster callbacks that only read state may run
/// concurrently with other readers (spec §4.3.2, §5).
pub struct NodeState {
    pub lifecycle: Lifecycle,
    pub endpoints: BTreeMap<EndptId, Endpoint>,
    pub fabrics: FabricTable,
    pub acls: AclStore,
    pub counters: CounterState,
    pub pase: Option<PaseInfo>,
    pub commissioning_window_open: bool,
}

impl NodeState {
    pub fn new(fabrics: FabricTable, acls: AclStore, counters: CounterState) -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            endpoints: BTreeMap::new(),
            fabrics,
            acls,
            counters,
            pase: None,
            commissioning_window_open: false,
        }
    }

    /// Invoke `f` for every endpoint matching `path`'s endpoint component
    /// (wildcard when `None`), passing the single-endpoint path a reader
    /// would see alongside the matched endpoint.
    pub fn for_each_endpoint<F>(&self, path: &GenericPath, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&GenericPath, &Endpoint) -> Result<(), Error>,
    {
        for (id, ep) in &self.endpoints {
            if path.endpoint.is_some() && path.endpoint != Some(*id) {
                continue;
            }
            let current = GenericPath::new(Some(*id), None, None);
            f(&current, ep)?;
        }
        Ok(())
    }

    /// Invoke `f` for every cluster matching `path`'s endpoint/cluster
    /// components (wildcard when `None`).
    pub fn for_each_cluster<F>(&self, path: &GenericPath, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&GenericPath, &dyn ClusterType) -> Result<(), Error>,
    {
        for (ep_id, ep) in &self.endpoints {
            if path.endpoint.is_some() && path.endpoint != Some(*ep_id) {
                continue;
            }
            for cluster in ep.clusters() {
                if path.cluster.is_some() && path.cluster != Some(cluster.base().id()) {
                    continue;
                }
                let current = GenericPath::new(Some(*ep_id), Some(cluster.base().id()), None);
                f(&current, cluster)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reachability_matrix() {
        assert!(Lifecycle::Initialized.can_start());
        assert!(!Lifecycle::Uninitialized.can_start());
        assert!(Lifecycle::Commissioned.can_stop());
        assert!(Lifecycle::Commissioned.is_running());
        assert!(!Lifecycle::Stopped.can_stop());
        assert!(!Lifecycle::Stopped.is_running());
    }
}
