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

use std::sync::Arc;
use std::time::Duration;

use crate::node::state::Lifecycle;
use crate::node::storage::Storage;
use crate::node::NodeError;

/// Passcodes Matter forbids outright regardless of range (spec §4.3.3).
const FORBIDDEN_PASSCODES: [u32; 12] = [
    0, 11111111, 22222222, 33333333, 44444444, 55555555, 66666666, 77777777, 88888888, 99999999, 12345678, 87654321,
];

pub fn is_valid_passcode(passcode: u32) -> bool {
    (1..=99_999_998).contains(&passcode) && !FORBIDDEN_PASSCODES.contains(&passcode)
}

pub fn is_valid_discriminator(discriminator: u16) -> bool {
    discriminator <= 0x0FFF
}

/// Message Reliability Protocol retransmission parameters (spec §6.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MrpParams {
    pub idle_retrans_interval: Duration,
    pub active_retrans_interval: Duration,
    pub active_threshold: Duration,
}

impl Default for MrpParams {
    fn default() -> Self {
        Self {
            idle_retrans_interval: Duration::from_millis(500),
            active_retrans_interval: Duration::from_millis(300),
            active_threshold: Duration::from_secs(4),
        }
    }
}

pub type OnStateChanged = Arc<dyn Fn(Lifecycle) + Send + Sync>;
pub type OnSessionEstablished = Arc<dyn Fn(u64) + Send + Sync>;
pub type OnSessionClosed = Arc<dyn Fn(u64) + Send + Sync>;
pub type OnCommissioningStart = Arc<dyn Fn() + Send + Sync>;
/// Invoked with the real, just-assigned fabric index — see spec §9's
/// note on the placeholder-`1` bug this implementation must not repeat.
pub type OnCommissioningComplete = Arc<dyn Fn(u8) + Send + Sync>;

/// Immutable-after-validation node configuration (spec §6.4).
#[derive(Clone)]
pub struct NodeConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub discriminator: u16,
    pub passcode: u32,
    pub storage: Arc<dyn Storage>,

    pub device_name: Option<String>,
    pub serial_number: Option<String>,
    pub hardware_version: u16,
    pub software_version: u32,
    pub ipv6_only: bool,
    pub port: u16,
    pub mrp: MrpParams,

    pub on_state_changed: Option<OnStateChanged>,
    pub on_session_established: Option<OnSessionEstablished>,
    pub on_session_closed: Option<OnSessionClosed>,
    pub on_commissioning_start: Option<OnCommissioningStart>,
    pub on_commissioning_complete: Option<OnCommissioningComplete>,
}

impl NodeConfig {
    pub fn new(vendor_id: u16, product_id: u16, discriminator: u16, passcode: u32, storage: Arc<dyn Storage>) -> Self {
        Self {
            vendor_id,
            product_id,
            discriminator,
            passcode,
            storage,
            device_name: None,
            serial_number: None,
            hardware_version: 0,
            software_version: 0,
            ipv6_only: false,
            port: 5540,
            mrp: MrpParams::default(),
            on_state_changed: None,
            on_session_established: None,
            on_session_closed: None,
            on_commissioning_start: None,
            on_commissioning_complete: None,
        }
    }

    pub fn with_device_name(mut self, name: &str) -> Self {
        self.device_name = Some(name.chars().take(32).collect());
        self
    }

    /// Validates every required field per spec §6.4, returning the most
    /// specific applicable error.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.vendor_id == 0 {
            return Err(NodeError::InvalidVendorID);
        }
        if self.product_id == 0 {
            return Err(NodeError::InvalidProductID);
        }
        if !is_valid_discriminator(self.discriminator) {
            return Err(NodeError::InvalidDiscriminator);
        }
        if !is_valid_passcode(self.passcode) {
            return Err(NodeError::InvalidPasscode);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passcode_validator_matches_normative_cases() {
        assert!(is_valid_passcode(20202021));
        assert!(!is_valid_passcode(12345678));
        assert!(!is_valid_passcode(0));
        assert!(!is_valid_passcode(99999999));
    }

    #[test]
    fn discriminator_must_fit_12_bits() {
        assert!(is_valid_discriminator(4095));
        assert!(!is_valid_discriminator(4096));
    }

    #[test]
    fn device_name_truncates_to_32_chars_not_bytes() {
        let config = NodeConfig::new(0xFFF1, 0x8000, 0, 20202021, Arc::new(crate::node::storage::MemStorage::new()))
            .with_device_name("x".repeat(40).as_str());
        assert_eq!(config.device_name.unwrap().chars().count(), 32);
    }

    #[test]
    fn device_name_truncation_does_not_panic_on_multibyte_chars() {
        let name: String = "é".repeat(40);
        let config = NodeConfig::new(0xFFF1, 0x8000, 0, 20202021, Arc::new(crate::node::storage::MemStorage::new()))
            .with_device_name(&name);
        assert_eq!(config.device_name.unwrap().chars().count(), 32);
    }
}
