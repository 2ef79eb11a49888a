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

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{info, warn};

use crate::data_model::core::DataModel;
use crate::data_model::objects::{DeviceType, Endpoint};
use crate::data_model::sdm::basic_information::BasicInfoCluster;
use crate::data_model::sdm::general_commissioning::GeneralCommissioningCluster;
use crate::data_model::system_model::descriptor::DescriptorCluster;
use crate::node::acl::AclStore;
use crate::node::config::NodeConfig;
use crate::node::counters::CounterState;
use crate::node::fabric::{FabricInfo, FabricTable};
use crate::node::pase::{PaseInfo, PasePrimitives};
use crate::node::state::{Lifecycle, NodeState};
use crate::node::NodeError;

/// Automatic commissioning-window duration `Start` opens when the node has
/// no fabrics (spec §4.3.1).
pub const DEFAULT_COMMISSIONING_WINDOW: Duration = Duration::from_secs(3 * 60);

const ROOT_ENDPOINT: u16 = 0;
const ROOT_DEVICE_TYPE: DeviceType = DeviceType { dtype: 0x0016, drev: 1 };

/// Owns all Matter node state: config, lifecycle, endpoint registry, fabric
/// table, ACLs, counters and PASE parameters (spec §3, §4.3). Endpoint and
/// lifecycle mutation is serialized by the single `state` lock; cloning a
/// `Node` shares that lock (it wraps an `Arc`).
pub struct Node {
    config: NodeConfig,
    state: Arc<RwLock<NodeState>>,
    window_cancel: RwLock<Option<async_channel::Sender<()>>>,
}

impl Node {
    /// Validates `config`, derives the PASE verifier, loads persisted
    /// fabrics/ACLs/counters, builds the Root endpoint, and enters
    /// `Initialized` (spec §4.3.1).
    pub fn new_node(config: NodeConfig, pase_primitives: &dyn PasePrimitives) -> Result<Self, NodeError> {
        config.validate()?;

        let fabrics = FabricTable::new(config.storage.load_fabrics()?);
        let acls = AclStore::new(config.storage.load_acls()?);
        let counters = CounterState::load_or_init(config.storage.load_counters()?);

        let salt: Vec<u8> = (0..16).map(|_| rand::random()).collect();
        let pase_info = PaseInfo::derive(config.passcode, salt, pase_primitives)?;

        let mut node_state = NodeState::new(fabrics, acls, counters);
        node_state.pase = Some(pase_info);
        node_state.lifecycle = Lifecycle::Initialized;

        let node = Self {
            config,
            state: Arc::new(RwLock::new(node_state)),
            window_cancel: RwLock::new(None),
        };

        node.build_root_endpoint()?;
        info!("node initialized (vendor=0x{:04X}, product=0x{:04X})", node.config.vendor_id, node.config.product_id);
        Ok(node)
    }

    fn build_root_endpoint(&self) -> Result<(), NodeError> {
        let mut root = Endpoint::new(ROOT_ENDPOINT, ROOT_DEVICE_TYPE);
        let data_model = DataModel::new(self.state.clone());

        let descriptor = DescriptorCluster::new(ROOT_ENDPOINT, data_model).map_err(|_| NodeError::InvalidConfig)?;
        let basic_info = BasicInfoCluster::new(
            self.config.vendor_id,
            self.config.product_id,
            self.config.hardware_version,
            self.config.software_version,
            self.config.serial_number.as_deref().unwrap_or(""),
        )
        .map_err(|_| NodeError::InvalidConfig)?;
        let general_commissioning = GeneralCommissioningCluster::new().map_err(|_| NodeError::InvalidConfig)?;

        root.add_cluster(descriptor).map_err(|_| NodeError::InvalidConfig)?;
        root.add_cluster(basic_info).map_err(|_| NodeError::InvalidConfig)?;
        root.add_cluster(general_commissioning).map_err(|_| NodeError::InvalidConfig)?;

        self.state.write().unwrap().endpoints.insert(ROOT_ENDPOINT, root);
        Ok(())
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.read().unwrap().lifecycle
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle().is_running()
    }

    pub fn is_commissioned(&self) -> bool {
        !self.state.read().unwrap().fabrics.is_empty()
    }

    pub fn fabric_count(&self) -> usize {
        self.state.read().unwrap().fabrics.len()
    }

    pub fn data_model(&self) -> DataModel {
        DataModel::new(self.state.clone())
    }

    fn notify_state(&self, lifecycle: Lifecycle) {
        if let Some(cb) = &self.config.on_state_changed {
            cb(lifecycle);
        }
    }

    /// Registers an application endpoint (spec §4.3.2). Endpoint 0 is
    /// reserved for the node-owned Root endpoint.
    pub fn add_endpoint(&self, endpoint: Endpoint) -> Result<(), NodeError> {
        if endpoint.id() == ROOT_ENDPOINT {
            return Err(NodeError::RootEndpointReserved);
        }
        let mut state = self.state.write().unwrap();
        if state.endpoints.contains_key(&endpoint.id()) {
            return Err(NodeError::EndpointExists);
        }
        let id = endpoint.id();
        state.endpoints.insert(id, endpoint);
        if let Some(ep) = state.endpoints.get_mut(&id) {
            if !ep.has_cluster(crate::data_model::system_model::descriptor::ID) {
                let data_model = DataModel::new(self.state.clone());
                if let Ok(descriptor) = DescriptorCluster::new(id, data_model) {
                    let _ = ep.add_cluster(descriptor);
                }
            }
        }
        Ok(())
    }

    pub fn remove_endpoint(&self, id: u16) -> Result<(), NodeError> {
        if id == ROOT_ENDPOINT {
            return Err(NodeError::RootEndpointReserved);
        }
        let mut state = self.state.write().unwrap();
        state.endpoints.remove(&id).map(|_| ()).ok_or(NodeError::EndpointNotFound)
    }

    /// Runs `f` against the endpoint registered at `id` under the node's
    /// shared lock, since a bare `&Endpoint` can't outlive the guard.
    pub fn with_endpoint<R>(&self, id: u16, f: impl FnOnce(&Endpoint) -> R) -> Result<R, NodeError> {
        let state = self.state.read().unwrap();
        state.endpoints.get(&id).map(f).ok_or(NodeError::EndpointNotFound)
    }

    /// `Starting → Uncommissioned|CommissioningOpen` or `Commissioned`
    /// (spec §4.3.1). Callbacks fire only after the lock is released.
    pub fn start(&self) -> Result<(), NodeError> {
        {
            let mut state = self.state.write().unwrap();
            if !state.lifecycle.can_start() {
                return Err(if state.lifecycle == Lifecycle::Uninitialized {
                    NodeError::NotInitialized
                } else {
                    NodeError::AlreadyStarted
                });
            }
            state.lifecycle = Lifecycle::Starting;
        }
        self.notify_state(Lifecycle::Starting);

        let fabric_count = self.fabric_count();
        if fabric_count > 0 {
            self.state.write().unwrap().lifecycle = Lifecycle::Commissioned;
            self.notify_state(Lifecycle::Commissioned);
        } else {
            self.state.write().unwrap().lifecycle = Lifecycle::Uncommissioned;
            self.notify_state(Lifecycle::Uncommissioned);
            self.open_commissioning_window(DEFAULT_COMMISSIONING_WINDOW)?;
        }
        Ok(())
    }

    /// `Stopping → Stopped`: closes an open window, persists counters,
    /// cancels background tasks (spec §4.3.1, §5).
    pub fn stop(&self) -> Result<(), NodeError> {
        {
            let state = self.state.read().unwrap();
            if !state.lifecycle.can_stop() {
                if state.lifecycle == Lifecycle::Stopped {
                    return Err(NodeError::AlreadyStopped);
                }
                return Err(NodeError::NotStarted);
            }
        }
        if self.state.read().unwrap().commissioning_window_open {
            let _ = self.close_commissioning_window();
        }

        self.state.write().unwrap().lifecycle = Lifecycle::Stopping;
        self.notify_state(Lifecycle::Stopping);

        if let Some(tx) = self.window_cancel.write().unwrap().take() {
            let _ = tx.try_send(());
        }

        let counters = self.state.read().unwrap().counters.clone();
        if self.config.storage.save_counters(&counters).is_err() {
            warn!("failed to persist counters on stop");
        }

        self.state.write().unwrap().lifecycle = Lifecycle::Stopped;
        self.notify_state(Lifecycle::Stopped);
        Ok(())
    }

    /// Opens a commissioning window for `timeout`, spawning the background
    /// timer task that closes it again (spec §4.3.1, §5). The timer's
    /// self-close races `Stop`'s explicit close via a try-lock: if `Stop`
    /// already holds the lock, the timer callback backs off and lets `Stop`
    /// finish the cleanup.
    pub fn open_commissioning_window(&self, timeout: Duration) -> Result<(), NodeError> {
        {
            let mut state = self.state.write().unwrap();
            if !state.lifecycle.is_running() {
                return Err(NodeError::NotStarted);
            }
            if state.commissioning_window_open {
                return Err(NodeError::CommissioningWindowOpen);
            }
            state.commissioning_window_open = true;
            state.lifecycle = Lifecycle::CommissioningOpen;
        }
        self.notify_state(Lifecycle::CommissioningOpen);
        if let Some(cb) = &self.config.on_commissioning_start {
            cb();
        }

        let (tx, rx) = async_channel::bounded::<()>(1);
        *self.window_cancel.write().unwrap() = Some(tx);

        let state = self.state.clone();
        let on_state_changed = self.config.on_state_changed.clone();
        smol::spawn(async move {
            let timer = smol::Timer::after(timeout);
            futures_lite::future::or(async { rx.recv().await.ok(); }, async { timer.await; }).await;

            match state.try_write() {
                Ok(mut guard) => {
                    if guard.commissioning_window_open {
                        guard.commissioning_window_open = false;
                        guard.lifecycle = if guard.fabrics.is_empty() {
                            Lifecycle::Uncommissioned
                        } else {
                            Lifecycle::Commissioned
                        };
                        let reached = guard.lifecycle;
                        drop(guard);
                        if let Some(cb) = &on_state_changed {
                            cb(reached);
                        }
                    }
                }
                Err(_) => {
                    // `Stop` holds the lock; it owns finishing the cleanup.
                }
            }
        })
        .detach();

        Ok(())
    }

    /// Manual window close (spec §4.3.1): restores `Commissioned` or
    /// `Uncommissioned` depending on fabric count.
    pub fn close_commissioning_window(&self) -> Result<(), NodeError> {
        let mut state = self.state.write().unwrap();
        if !state.commissioning_window_open {
            return Err(NodeError::CommissioningWindowClosed);
        }
        state.commissioning_window_open = false;
        state.lifecycle = if state.fabrics.is_empty() {
            Lifecycle::Uncommissioned
        } else {
            Lifecycle::Commissioned
        };
        let reached = state.lifecycle;
        drop(state);
        self.notify_state(reached);
        if let Some(tx) = self.window_cancel.write().unwrap().take() {
            let _ = tx.try_send(());
        }
        Ok(())
    }

    /// Adds the just-established fabric, closes the commissioning window,
    /// and reports the **real** assigned fabric index through
    /// `on_commissioning_complete` — the upstream placeholder-`1` bug (spec
    /// §9) is deliberately not reproduced here.
    pub fn complete_commissioning(&self, fabric: FabricInfo) -> Result<u8, NodeError> {
        let fabric_index = {
            let mut state = self.state.write().unwrap();
            let idx = state.fabrics.add(fabric.clone())?;
            state.commissioning_window_open = false;
            state.lifecycle = Lifecycle::Commissioned;
            idx
        };

        let mut persisted = fabric;
        persisted.fabric_index = fabric_index;
        let _ = self.config.storage.save_fabric(&persisted);

        self.notify_state(Lifecycle::Commissioned);
        if let Some(cb) = &self.config.on_commissioning_complete {
            cb(fabric_index);
        }
        Ok(fabric_index)
    }

    /// Removes a fabric (spec §5): a node-level mutating operation, so it
    /// takes the same exclusive lock as `add_endpoint`/`start`/`stop`.
    pub fn remove_fabric(&self, fabric_index: u8) -> Result<(), NodeError> {
        self.state.write().unwrap().fabrics.remove(fabric_index)?;
        let _ = self.config.storage.delete_fabric(fabric_index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::storage::MemStorage;

    struct TestPase;
    impl PasePrimitives for TestPase {
        fn derive(&self, _passcode: u32, _salt: &[u8], _iterations: u32) -> Result<Vec<u8>, NodeError> {
            Ok(vec![0u8; 32])
        }
    }

    fn test_config() -> NodeConfig {
        NodeConfig::new(0xFFF1, 0x8000, 3840, 20202021, Arc::new(MemStorage::new()))
    }

    #[test]
    fn new_node_starts_initialized() {
        let node = Node::new_node(test_config(), &TestPase).unwrap();
        assert_eq!(node.lifecycle(), Lifecycle::Initialized);
    }

    #[test]
    fn start_with_no_fabrics_opens_commissioning_window() {
        let node = Node::new_node(test_config(), &TestPase).unwrap();
        node.start().unwrap();
        assert_eq!(node.lifecycle(), Lifecycle::CommissioningOpen);
        assert!(node.is_running());
    }

    #[test]
    fn add_root_endpoint_is_rejected() {
        let node = Node::new_node(test_config(), &TestPase).unwrap();
        let err = node.add_endpoint(Endpoint::new(0, ROOT_DEVICE_TYPE)).unwrap_err();
        assert_eq!(err, NodeError::RootEndpointReserved);
    }

    #[test]
    fn adding_same_endpoint_twice_fails() {
        let node = Node::new_node(test_config(), &TestPase).unwrap();
        node.add_endpoint(Endpoint::new(1, ROOT_DEVICE_TYPE)).unwrap();
        let err = node.add_endpoint(Endpoint::new(1, ROOT_DEVICE_TYPE)).unwrap_err();
        assert_eq!(err, NodeError::EndpointExists);
    }

    #[test]
    fn complete_commissioning_reports_real_fabric_index() {
        let node = Node::new_node(test_config(), &TestPase).unwrap();
        node.start().unwrap();
        let idx = node
            .complete_commissioning(FabricInfo {
                fabric_index: 0,
                fabric_id: 1,
                node_id: 1,
                vendor_id: 0xFFF1,
                root_public_key: vec![],
                label: String::new(),
            })
            .unwrap();
        assert_eq!(idx, 1);
        assert_eq!(node.lifecycle(), Lifecycle::Commissioned);
    }

    #[test]
    fn stopping_twice_reports_already_stopped_not_not_started() {
        let node = Node::new_node(test_config(), &TestPase).unwrap();
        node.start().unwrap();
        node.stop().unwrap();
        let err = node.stop().unwrap_err();
        assert_eq!(err, NodeError::AlreadyStopped);
    }

    #[test]
    fn stopping_before_start_reports_not_started() {
        let node = Node::new_node(test_config(), &TestPase).unwrap();
        let err = node.stop().unwrap_err();
        assert_eq!(err, NodeError::NotStarted);
    }

    #[test]
    fn remove_fabric_removes_a_commissioned_fabric_and_rejects_unknown_index() {
        let node = Node::new_node(test_config(), &TestPase).unwrap();
        node.start().unwrap();
        let idx = node
            .complete_commissioning(FabricInfo {
                fabric_index: 0,
                fabric_id: 1,
                node_id: 1,
                vendor_id: 0xFFF1,
                root_public_key: vec![],
                label: String::new(),
            })
            .unwrap();
        assert_eq!(node.fabric_count(), 1);

        node.remove_fabric(idx).unwrap();
        assert_eq!(node.fabric_count(), 0);

        let err = node.remove_fabric(idx).unwrap_err();
        assert_eq!(err, NodeError::FabricNotFound);
    }
}
