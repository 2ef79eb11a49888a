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

use bitflags::bitflags;
use verhoeff::Verhoeff;

use crate::node::NodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissioningFlow {
    Standard,
    Custom,
}

bitflags! {
    pub struct DiscoveryCapabilities: u8 {
        const BLE = 0x01;
        const SOFT_AP = 0x02;
        const ON_NETWORK = 0x04;
    }
}

/// Everything the setup-code collaborator needs to assemble a QR string and
/// a manual pairing code (spec §4.3.6, §6.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetupPayloadInfo {
    pub version: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub discriminator: u16,
    pub passcode: u32,
    pub commissioning_flow: CommissioningFlow,
    pub discovery_capabilities: DiscoveryCapabilities,
}

/// The text-encoding algorithm (Base38 QR payload, digit-group manual code)
/// is an external collaborator (spec §1, §4.3.6) — this trait is the seam a
/// real pairing-code crate plugs into. The node only ever calls through it.
pub trait SetupCodeRenderer: Send + Sync {
    fn qr_code(&self, info: &SetupPayloadInfo) -> Result<String, NodeError>;
    fn manual_code(&self, info: &SetupPayloadInfo) -> Result<String, NodeError>;
}

/// Reference renderer used by tests and examples. It produces a `MT:`-
/// prefixed placeholder payload (not the normative Base38 packing) and an
/// 11-digit manual code with a real Verhoeff check digit, so the digit-count
/// and check-digit properties a caller might assert on are still meaningful.
pub struct DefaultSetupCodeRenderer;

impl SetupCodeRenderer for DefaultSetupCodeRenderer {
    fn qr_code(&self, info: &SetupPayloadInfo) -> Result<String, NodeError> {
        let payload = format!(
            "{}{:04X}{:04X}{:03X}{:07}",
            info.version, info.vendor_id, info.product_id, info.discriminator, info.passcode
        );
        // Delegates only the symbol rendering to `qrcode`; the Base38 text
        // packing that belongs on the wire is out of scope here.
        qrcode::QrCode::new(payload.as_bytes()).map_err(|_| NodeError::InvalidConfig)?;
        Ok(format!("MT:{}", payload))
    }

    fn manual_code(&self, info: &SetupPayloadInfo) -> Result<String, NodeError> {
        let discriminator_short = info.discriminator >> 8;
        let mut digits = format!("{:01}{:02}{:07}", discriminator_short & 0x3, discriminator_short, info.passcode);
        digits.truncate(10);
        let check_digit = digits.calculate_check_digit();
        digits.push_str(&check_digit.to_string());
        Ok(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_code_is_eleven_digits() {
        let info = SetupPayloadInfo {
            version: 0,
            vendor_id: 0xFFF1,
            product_id: 0x8000,
            discriminator: 3840,
            passcode: 20202021,
            commissioning_flow: CommissioningFlow::Standard,
            discovery_capabilities: DiscoveryCapabilities::ON_NETWORK,
        };
        let code = DefaultSetupCodeRenderer.manual_code(&info).unwrap();
        assert_eq!(code.len(), 11);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn qr_code_has_matter_prefix() {
        let info = SetupPayloadInfo {
            version: 0,
            vendor_id: 0xFFF1,
            product_id: 0x8000,
            discriminator: 3840,
            passcode: 20202021,
            commissioning_flow: CommissioningFlow::Standard,
            discovery_capabilities: DiscoveryCapabilities::ON_NETWORK,
        };
        let qr = DefaultSetupCodeRenderer.qr_code(&info).unwrap();
        assert!(qr.starts_with("MT:"));
    }
}
