//! Operator query commands.

use crate::Format;
use mdm_agent::{AgentTransport, TcpTransport};
use mdm_core::DeviceType;
use mdm_protocol::{
    DeviceFeaturesListRequest, DeviceFeaturesRequest, DeviceInfoListRequest, DeviceInfoRequest,
    DeviceListRequest, DeviceStatusListRequest, DeviceStatusRequest, Request, Response,
    SetDeviceFeatureStateRequest,
};
use std::collections::BTreeMap;
use std::fmt::Write;

/// One operator RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// List device ids.
    List,
    /// Type of one device.
    Info(String),
    /// Status of one device.
    Status(String),
    /// Features of one device.
    Features(String),
    /// Type of every device.
    InfoList,
    /// Status of every device.
    StatusList,
    /// Features of every device.
    FeaturesList,
    /// Change one feature.
    SetFeature {
        /// Device UUID.
        device_id: String,
        /// Feature name.
        feature: String,
        /// New state.
        state: bool,
    },
}

impl Query {
    /// Builds the wire request.
    pub fn into_request(self) -> Request {
        match self {
            Query::List => Request::DeviceList(DeviceListRequest {}),
            Query::Info(device_id) => Request::DeviceInfo(DeviceInfoRequest { device_id }),
            Query::Status(device_id) => Request::DeviceStatus(DeviceStatusRequest { device_id }),
            Query::Features(device_id) => {
                Request::DeviceFeatures(DeviceFeaturesRequest { device_id })
            }
            Query::InfoList => Request::DeviceInfoList(DeviceInfoListRequest {}),
            Query::StatusList => Request::DeviceStatusList(DeviceStatusListRequest {}),
            Query::FeaturesList => Request::DeviceFeaturesList(DeviceFeaturesListRequest {}),
            Query::SetFeature {
                device_id,
                feature,
                state,
            } => Request::SetDeviceFeatureState(SetDeviceFeatureStateRequest {
                device_id,
                feature,
                state,
            }),
        }
    }
}

/// Sends the query to `server` and prints the result.
pub async fn run(
    server: &str,
    format: Format,
    query: Query,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport = TcpTransport::new(server);
    let response = transport.call(query.into_request()).await?;
    print!("{}", render(&response, format)?);
    Ok(())
}

/// Renders a response in the requested format.
pub fn render(response: &Response, format: Format) -> Result<String, serde_json::Error> {
    match format {
        Format::Json => render_json(response).map(|mut s| {
            s.push('\n');
            s
        }),
        Format::Text => Ok(render_text(response)),
    }
}

fn render_json(response: &Response) -> Result<String, serde_json::Error> {
    match response {
        Response::DeviceList(r) => serde_json::to_string_pretty(r),
        Response::DeviceInfo(r) => serde_json::to_string_pretty(r),
        Response::DeviceStatus(r) => serde_json::to_string_pretty(r),
        Response::DeviceFeatures(r) => serde_json::to_string_pretty(r),
        Response::DeviceInfoList(r) => serde_json::to_string_pretty(r),
        Response::DeviceStatusList(r) => serde_json::to_string_pretty(r),
        Response::DeviceFeaturesList(r) => serde_json::to_string_pretty(r),
        Response::SetDeviceFeatureState(r) => serde_json::to_string_pretty(r),
        other => serde_json::to_string_pretty(other),
    }
}

fn type_name(ordinal: i32) -> String {
    match DeviceType::try_from(ordinal) {
        Ok(device_type) => device_type.to_string(),
        Err(_) => format!("unknown({ordinal})"),
    }
}

fn write_features(out: &mut String, indent: &str, features: &BTreeMap<String, bool>) {
    for (name, state) in features {
        let _ = writeln!(out, "{indent}{name}: {state}");
    }
}

fn render_text(response: &Response) -> String {
    let mut out = String::new();
    match response {
        Response::DeviceList(r) => {
            for id in &r.device_ids {
                let _ = writeln!(out, "{id}");
            }
        }
        Response::DeviceInfo(r) => {
            let _ = writeln!(out, "type: {}", type_name(r.device_type));
        }
        Response::DeviceStatus(r) => {
            let _ = writeln!(out, "location: {}", r.location);
            let _ = writeln!(out, "battery: {}%", r.battery);
        }
        Response::DeviceFeatures(r) => write_features(&mut out, "", &r.features),
        Response::DeviceInfoList(r) => {
            for item in &r.items {
                let _ = writeln!(out, "{}  {}", item.device_id, type_name(item.device_type));
            }
        }
        Response::DeviceStatusList(r) => {
            for item in &r.items {
                let _ = writeln!(
                    out,
                    "{}  {}  {}%",
                    item.device_id, item.location, item.battery
                );
            }
        }
        Response::DeviceFeaturesList(r) => {
            for item in &r.items {
                let _ = writeln!(out, "{}", item.device_id);
                write_features(&mut out, "  ", &item.features);
            }
        }
        Response::SetDeviceFeatureState(r) => {
            let _ = writeln!(out, "{}", if r.success { "ok" } else { "not applied" });
        }
        other => {
            let _ = writeln!(out, "{other:?}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdm_protocol::{
        DeviceFeaturesItem, DeviceFeaturesListResponse, DeviceInfoResponse,
        DeviceStatusResponse,
    };

    fn features() -> BTreeMap<String, bool> {
        [("camera".to_string(), true), ("storage".to_string(), false)]
            .into_iter()
            .collect()
    }

    #[test]
    fn set_feature_request() {
        let query = Query::SetFeature {
            device_id: "abc".into(),
            feature: "camera".into(),
            state: true,
        };
        let request = query.into_request();
        assert_eq!(request.name(), "SetDeviceFeatureState");
        assert!(!request.is_management());
    }

    #[test]
    fn info_text_uses_type_name() {
        let text = render(
            &Response::DeviceInfo(DeviceInfoResponse { device_type: 1 }),
            Format::Text,
        )
        .unwrap();
        assert_eq!(text, "type: Ios\n");
    }

    #[test]
    fn status_text() {
        let text = render(
            &Response::DeviceStatus(DeviceStatusResponse {
                location: "room-1".into(),
                battery: 80,
            }),
            Format::Text,
        )
        .unwrap();
        assert_eq!(text, "location: room-1\nbattery: 80%\n");
    }

    #[test]
    fn features_list_text_groups_by_device() {
        let response = Response::DeviceFeaturesList(DeviceFeaturesListResponse {
            items: vec![DeviceFeaturesItem {
                device_id: "d1".into(),
                features: features(),
            }],
        });
        let text = render(&response, Format::Text).unwrap();
        assert_eq!(text, "d1\n  camera: true\n  storage: false\n");
    }

    #[test]
    fn json_is_the_payload() {
        let response = Response::DeviceStatus(DeviceStatusResponse {
            location: "dock".into(),
            battery: 5,
        });
        let json = render(&response, Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["location"], "dock");
        assert_eq!(value["battery"], 5);
    }
}
