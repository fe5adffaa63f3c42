//! Request dispatch and wire-level validation.

use crate::control::ControlService;
use crate::error::{ServiceError, ServiceResult};
use crate::management::ManagementService;
use mdm_core::{DeviceId, DeviceType};
use mdm_protocol::{
    DeviceFeaturesItem, DeviceFeaturesListResponse, DeviceFeaturesResponse, DeviceInfoItem,
    DeviceInfoListResponse, DeviceInfoResponse, DeviceListResponse, DevicePingResponse,
    DeviceRegisterResponse, DeviceStateResponse, DeviceStatusItem, DeviceStatusListResponse,
    DeviceStatusResponse, Reply, Request, Response, SetDeviceFeatureStateResponse, Status,
};
use std::sync::Arc;
use tracing::{error, warn};

/// Which caller population a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Management,
    Control,
}

/// Decodes wire values, dispatches to the services and maps failures to
/// status codes.
pub struct RequestHandler {
    management: Arc<ManagementService>,
    control: ControlService,
}

impl RequestHandler {
    /// Creates a request handler.
    pub fn new(management: Arc<ManagementService>, control: ControlService) -> Self {
        Self { management, control }
    }

    /// Handles one request.
    pub fn handle(&self, request: Request) -> Reply {
        let surface = if request.is_management() {
            Surface::Management
        } else {
            Surface::Control
        };
        let name = request.name();

        self.dispatch(request)
            .map_err(|err| to_status(name, surface, err))
    }

    fn dispatch(&self, request: Request) -> ServiceResult<Response> {
        match request {
            Request::DeviceRegister(req) => {
                let id = parse_id(&req.device_id)?;
                let device_type = parse_type(req.device_type)?;
                self.management.register(&id, device_type)?;
                Ok(Response::DeviceRegister(DeviceRegisterResponse { success: true }))
            }
            Request::DevicePing(req) => {
                let id = parse_id(&req.device_id)?;
                let state_changed = self.management.ping(&id, &req.location, req.battery)?;
                Ok(Response::DevicePing(DevicePingResponse { state_changed }))
            }
            Request::DeviceState(req) => {
                let id = parse_id(&req.device_id)?;
                let state = self.management.fetch_state(&id)?;
                Ok(Response::DeviceState(DeviceStateResponse {
                    features: state.features,
                }))
            }
            Request::DeviceList(_) => {
                let device_ids = self
                    .control
                    .device_ids()?
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                Ok(Response::DeviceList(DeviceListResponse { device_ids }))
            }
            Request::DeviceInfo(req) => {
                let id = parse_id(&req.device_id)?;
                let device_type = self.control.device_info(&id)?;
                Ok(Response::DeviceInfo(DeviceInfoResponse {
                    device_type: device_type.as_i32(),
                }))
            }
            Request::DeviceStatus(req) => {
                let id = parse_id(&req.device_id)?;
                let status = self.control.device_status(&id)?;
                Ok(Response::DeviceStatus(DeviceStatusResponse {
                    location: status.location,
                    battery: i32::from(status.battery),
                }))
            }
            Request::DeviceFeatures(req) => {
                let id = parse_id(&req.device_id)?;
                let features = self.control.device_features(&id)?;
                Ok(Response::DeviceFeatures(DeviceFeaturesResponse {
                    features: features.features,
                }))
            }
            Request::DeviceInfoList(_) => {
                let items = self
                    .control
                    .device_info_list()?
                    .into_iter()
                    .map(|d| DeviceInfoItem {
                        device_id: d.id.to_string(),
                        device_type: d.device_type.as_i32(),
                    })
                    .collect();
                Ok(Response::DeviceInfoList(DeviceInfoListResponse { items }))
            }
            Request::DeviceStatusList(_) => {
                let items = self
                    .control
                    .device_status_list()?
                    .into_iter()
                    .map(|s| DeviceStatusItem {
                        device_id: s.id.to_string(),
                        location: s.location,
                        battery: i32::from(s.battery),
                    })
                    .collect();
                Ok(Response::DeviceStatusList(DeviceStatusListResponse { items }))
            }
            Request::DeviceFeaturesList(_) => {
                let items = self
                    .control
                    .device_features_list()?
                    .into_iter()
                    .map(|f| DeviceFeaturesItem {
                        device_id: f.id.to_string(),
                        features: f.features,
                    })
                    .collect();
                Ok(Response::DeviceFeaturesList(DeviceFeaturesListResponse { items }))
            }
            Request::SetDeviceFeatureState(req) => {
                let id = parse_id(&req.device_id)?;
                self.control
                    .set_feature_state(&id, &req.feature, req.state)?;
                Ok(Response::SetDeviceFeatureState(SetDeviceFeatureStateResponse {
                    success: true,
                }))
            }
        }
    }
}

fn parse_id(raw: &str) -> ServiceResult<DeviceId> {
    Ok(DeviceId::parse(raw)?)
}

fn parse_type(raw: i32) -> ServiceResult<DeviceType> {
    Ok(DeviceType::try_from(raw)?)
}

/// Maps a service failure to a wire status.
///
/// Operators only ever see a generic message for server-side failures;
/// agents get the underlying detail.
fn to_status(rpc: &str, surface: Surface, err: ServiceError) -> Status {
    match err {
        ServiceError::Validation(message) => {
            warn!(rpc, %message, "rejected request");
            Status::invalid_argument(message)
        }
        ServiceError::NotFound(message) => Status::not_found(message),
        ServiceError::Store(source) => {
            error!(rpc, error = %source, "request failed");
            match surface {
                Surface::Management => Status::internal(source.to_string()),
                Surface::Control => Status::internal("internal error"),
            }
        }
    }
}
