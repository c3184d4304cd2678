//! Service bootstrap
//!
//! Builds the GATT database exactly once per transport: the Generic Access
//! service carrying the device name, and the serial-port service with its
//! single data characteristic.

use sppble_core::protocol::{
    device_name_with_suffix, DEVICE_NAME_CHARACTERISTIC_UUID, GENERIC_ACCESS_SERVICE_UUID,
    SPP_DATA_CHARACTERISTIC_UUID, SPP_SERVICE_UUID,
};
use sppble_core::{
    AttributeHandle, AttributeUuid, BdAddr, CharacteristicProperties, CharacteristicSpec,
    GattSessionId, LinkError, LinkStack, ServiceSpec, SppError,
};

use crate::hooks::GattDbHook;

/// Handles allocated while building the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHandles {
    pub session: GattSessionId,
    pub generic_access_service: AttributeHandle,
    pub device_name_characteristic: AttributeHandle,
    pub spp_service: AttributeHandle,
    pub data_channel: AttributeHandle,
}

/// Device naming plus the handles of the committed database
#[derive(Debug, Clone)]
pub struct GattDescriptor {
    device_name: String,
    name_shows_identifier: bool,
    identity: Option<BdAddr>,
    handles: Option<ServiceHandles>,
}

impl GattDescriptor {
    pub fn new(device_name: impl Into<String>, name_shows_identifier: bool) -> Self {
        Self {
            device_name: device_name.into(),
            name_shows_identifier,
            identity: None,
            handles: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.handles.is_some()
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn name_shows_identifier(&self) -> bool {
        self.name_shows_identifier
    }

    pub fn set_name_shows_identifier(&mut self, enabled: bool) {
        self.name_shows_identifier = enabled;
    }

    /// Name as it appears in the device-name characteristic
    pub fn full_name(&self) -> String {
        let identity = if self.name_shows_identifier {
            self.identity.as_ref()
        } else {
            None
        };
        device_name_with_suffix(&self.device_name, identity)
    }

    /// Change the base name; once the database exists the characteristic is
    /// rewritten with the bare name
    pub fn set_device_name(
        &mut self,
        link: &dyn LinkStack,
        name: impl Into<String>,
    ) -> Result<(), LinkError> {
        self.device_name = name.into();
        if let Some(handles) = self.handles {
            link.write_attribute_value(
                handles.device_name_characteristic,
                0,
                self.device_name.as_bytes(),
            )?;
        }
        Ok(())
    }

    /// Build and commit the database; later calls return the existing handles
    ///
    /// `hook` runs after both services are started and before the commit, so
    /// embedders can add their own services to the same session.
    pub fn bootstrap(
        &mut self,
        link: &dyn LinkStack,
        mtu: usize,
        hook: Option<&mut GattDbHook>,
    ) -> Result<ServiceHandles, SppError> {
        if let Some(handles) = self.handles {
            return Ok(handles);
        }

        if self.name_shows_identifier {
            let (address, _) = link
                .identity_address()
                .map_err(step("identity_address"))?;
            self.identity = Some(address);
        }
        let full_name = self.full_name();

        let session = link.gattdb_new_session().map_err(step("new_session"))?;

        let generic_access_service = link
            .gattdb_add_service(
                session,
                &ServiceSpec {
                    uuid: AttributeUuid::Short(GENERIC_ACCESS_SERVICE_UUID),
                    primary: true,
                    advertised: true,
                },
            )
            .map_err(step("add_generic_access_service"))?;

        let device_name_characteristic = link
            .gattdb_add_characteristic(
                session,
                generic_access_service,
                &CharacteristicSpec {
                    uuid: AttributeUuid::Short(DEVICE_NAME_CHARACTERISTIC_UUID),
                    properties: CharacteristicProperties::READ,
                    fixed_length: true,
                    max_length: full_name.len(),
                    initial_value: full_name.into_bytes(),
                },
            )
            .map_err(step("add_device_name_characteristic"))?;

        link.gattdb_start_service(session, generic_access_service)
            .map_err(step("start_generic_access_service"))?;

        let spp_service = link
            .gattdb_add_service(
                session,
                &ServiceSpec {
                    uuid: AttributeUuid::Long(SPP_SERVICE_UUID),
                    primary: true,
                    advertised: false,
                },
            )
            .map_err(step("add_spp_service"))?;

        let data_channel = link
            .gattdb_add_characteristic(
                session,
                spp_service,
                &CharacteristicSpec {
                    uuid: AttributeUuid::Long(SPP_DATA_CHARACTERISTIC_UUID),
                    properties: CharacteristicProperties::WRITE_NO_RESPONSE_NOTIFY,
                    fixed_length: true,
                    max_length: mtu,
                    initial_value: vec![0],
                },
            )
            .map_err(step("add_data_characteristic"))?;

        link.gattdb_start_service(session, spp_service)
            .map_err(step("start_spp_service"))?;

        if let Some(hook) = hook {
            hook(link, session);
        }

        link.gattdb_commit(session).map_err(step("commit"))?;

        let handles = ServiceHandles {
            session,
            generic_access_service,
            device_name_characteristic,
            spp_service,
            data_channel,
        };
        self.handles = Some(handles);
        Ok(handles)
    }
}

fn step(step: &'static str) -> impl Fn(LinkError) -> SppError {
    move |source| SppError::Bootstrap { step, source }
}
