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

use log::debug;
use num_derive::FromPrimitive;

use crate::data_model::objects::*;
use crate::error::Error;
use crate::interaction_model::core::IMStatusCode;
use crate::interaction_model::messages::ib::CmdPath;
use crate::tlv::TLVElement;

pub const ID: u32 = 0x0030;

#[derive(FromPrimitive)]
#[allow(clippy::enum_variant_names)]
pub enum Attributes {
    Breadcrumb = 0,
    RegulatoryConfig = 2,
}

#[derive(FromPrimitive)]
#[allow(clippy::enum_variant_names)]
pub enum Commands {
    ArmFailSafe = 0x00,
    SetRegulatoryConfig = 0x02,
    CommissioningComplete = 0x04,
}

/// Root-endpoint mandatory General Commissioning cluster. The node's
/// commissioning-window state machine, not this cluster, owns deciding when
/// commissioning is actually complete; this cluster only ack's the
/// commands with `Success` so a controller's commissioning flow can proceed.
///
/// `CommissioningComplete` is acked here but does NOT call
/// `Node::complete_commissioning` — this cluster only sees the invoke
/// payload, not the PASE/CASE session that negotiated the fabric's root
/// public key and node id, so it has no `FabricInfo` to build. Wiring the
/// two together needs a protocol-adapter change that threads the
/// established session down to the invoke dispatch, still open.
pub struct GeneralCommissioningCluster {
    base: Cluster,
}

impl GeneralCommissioningCluster {
    pub fn new() -> Result<Box<Self>, Error> {
        let mut c = Box::new(Self { base: Cluster::new(ID)? });
        let attrs = [
            Attribute::new(Attributes::Breadcrumb as u16, AttrValue::Uint64(0), Access::RW, Quality::NONE),
            Attribute::new(Attributes::RegulatoryConfig as u16, AttrValue::Uint8(0), Access::RV, Quality::NONE),
        ];
        c.base.add_attributes(&attrs[..])?;
        Ok(c)
    }
}

impl ClusterType for GeneralCommissioningCluster {
    fn base(&self) -> &Cluster {
        &self.base
    }
    fn base_mut(&mut self) -> &mut Cluster {
        &mut self.base
    }

    fn handle_command(
        &mut self,
        cmd_path: &CmdPath,
        _data: &mut TLVElement,
        encoder: &mut dyn Encoder,
    ) -> Result<(), IMStatusCode> {
        let cmd = cmd_path.path.leaf.unwrap_or(u32::MAX) as u16;
        match num::FromPrimitive::from_u16(cmd) {
            Some(Commands::CommissioningComplete) => {
                debug!("CommissioningComplete acked; node-level fabric transition deferred, see cluster doc comment");
                encoder.encode_status(IMStatusCode::Success, 0);
                Ok(())
            }
            Some(Commands::ArmFailSafe) | Some(Commands::SetRegulatoryConfig) => {
                encoder.encode_status(IMStatusCode::Success, 0);
                Ok(())
            }
            None => Err(IMStatusCode::UnsupportedCommand),
        }
    }
}
