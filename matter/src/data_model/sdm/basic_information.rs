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

use num_derive::FromPrimitive;

use crate::data_model::objects::*;
use crate::error::Error;

pub const ID: u32 = 0x0028;

#[derive(FromPrimitive)]
#[allow(clippy::enum_variant_names)]
pub enum Attributes {
    DataModelRevision = 0,
    VendorId = 2,
    ProductId = 4,
    HardwareVersion = 7,
    SoftwareVersion = 9,
    SerialNumber = 15,
}

/// Root-endpoint mandatory Basic Information cluster. Only the handful of
/// fields the node config and lifecycle care about are modelled; the full
/// attribute set (location, part numbers, product labels...) is
/// cluster-specific behavior the core doesn't own.
pub struct BasicInfoCluster {
    base: Cluster,
}

impl BasicInfoCluster {
    pub fn new(vendor_id: u16, product_id: u16, hw_version: u16, sw_version: u32, serial_no: &str) -> Result<Box<Self>, Error> {
        let mut c = Box::new(Self { base: Cluster::new(ID)? });
        let attrs = [
            Attribute::new(Attributes::DataModelRevision as u16, AttrValue::Uint16(17), Access::RV, Quality::FIXED),
            Attribute::new(Attributes::VendorId as u16, AttrValue::Uint16(vendor_id), Access::RV, Quality::FIXED),
            Attribute::new(Attributes::ProductId as u16, AttrValue::Uint16(product_id), Access::RV, Quality::FIXED),
            Attribute::new(Attributes::HardwareVersion as u16, AttrValue::Uint16(hw_version), Access::RV, Quality::FIXED),
            Attribute::new(Attributes::SoftwareVersion as u16, AttrValue::Uint32(sw_version), Access::RV, Quality::FIXED),
            Attribute::new(Attributes::SerialNumber as u16, AttrValue::Utf8(serial_no.to_string()), Access::RV, Quality::FIXED),
        ];
        c.base.add_attributes(&attrs[..])?;
        Ok(c)
    }
}

impl ClusterType for BasicInfoCluster {
    fn base(&self) -> &Cluster {
        &self.base
    }
    fn base_mut(&mut self) -> &mut Cluster {
        &mut self.base
    }
}
