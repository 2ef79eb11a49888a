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

use std::collections::HashMap;

use rand::RngCore;

/// Message-counter bookkeeping (spec §4.3.5, §4.6.1.1). The core only reads
/// peer counters for replay protection; advancing them belongs to the
/// session/transport layer.
#[derive(Debug, Clone, Default)]
pub struct CounterState {
    pub local_counter: u32,
    pub peer_counters: HashMap<(u8, u64), u32>,
    pub group_counters: HashMap<u32, u32>,
}

impl CounterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads persisted state, seeding `local_counter` from a random u32 the
    /// first time the node is ever constructed (counter was never persisted).
    pub fn load_or_init(persisted: CounterState) -> Self {
        if persisted.local_counter == 0 {
            Self {
                local_counter: rand::rngs::OsRng.next_u32(),
                ..persisted
            }
        } else {
            persisted
        }
    }

    pub fn peer_counter(&self, fabric_index: u8, node_id: u64) -> Option<u32> {
        self.peer_counters.get(&(fabric_index, node_id)).copied()
    }
}
