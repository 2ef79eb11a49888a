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

use subtle::ConstantTimeEq;

use crate::node::NodeError;

/// SPAKE2+ verifier/salt/iteration-count bundle the PASE responder programs
/// itself with. The cryptography that produces and consumes these bytes is
/// an external collaborator (spec §1); the core only derives and stores
/// them alongside the passcode they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaseInfo {
    pub verifier: Vec<u8>,
    pub salt: Vec<u8>,
    pub iterations: u32,
}

/// Seam the core calls through to derive PASE parameters from a passcode,
/// without depending on a concrete SPAKE2+ implementation.
pub trait PasePrimitives: Send + Sync {
    fn derive(&self, passcode: u32, salt: &[u8], iterations: u32) -> Result<Vec<u8>, NodeError>;
}

/// Default iteration count `NewNode` derives the verifier with (spec
/// §4.3.1).
pub const PASE_ITERATIONS: u32 = 1000;

impl PaseInfo {
    pub fn derive(passcode: u32, salt: Vec<u8>, primitives: &dyn PasePrimitives) -> Result<Self, NodeError> {
        let verifier = primitives.derive(passcode, &salt, PASE_ITERATIONS)?;
        Ok(Self {
            verifier,
            salt,
            iterations: PASE_ITERATIONS,
        })
    }

    /// Compares `candidate` against the stored verifier in constant time, so
    /// a PASE handshake attempt can't be timed to learn how many leading
    /// bytes of the verifier it got right.
    pub fn verifier_matches(&self, candidate: &[u8]) -> bool {
        if candidate.len() != self.verifier.len() {
            return false;
        }
        self.verifier.as_slice().ct_eq(candidate).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPrimitives;
    impl PasePrimitives for FixedPrimitives {
        fn derive(&self, _passcode: u32, _salt: &[u8], _iterations: u32) -> Result<Vec<u8>, NodeError> {
            Ok(vec![0xAB; 32])
        }
    }

    #[test]
    fn verifier_matches_accepts_the_derived_bytes_and_rejects_others() {
        let info = PaseInfo::derive(20202021, vec![1, 2, 3, 4], &FixedPrimitives).unwrap();
        assert!(info.verifier_matches(&[0xAB; 32]));
        assert!(!info.verifier_matches(&[0xCD; 32]));
        assert!(!info.verifier_matches(&[0xAB; 31]));
    }
}
