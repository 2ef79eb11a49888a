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

use crate::node::state::NodeState;

/// A weak, non-owning handle a cluster uses to query the node registry (spec
/// §9: "model this as a weak, non-owning reference... never an owning
/// pointer into the Node"). Cloning is cheap; every clone shares the same
/// underlying lock.
#[derive(Clone)]
pub struct DataModel {
    pub node: Arc<RwLock<NodeState>>,
}

impl DataModel {
    pub fn new(node: Arc<RwLock<NodeState>>) -> Self {
        Self { node }
    }
}
