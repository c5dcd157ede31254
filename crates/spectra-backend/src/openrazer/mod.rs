// OpenRazer adapter over the D-Bus session bus.
//
// Service: org.razer
// Root:    /org/razer                    (razer.devices)
// Devices: /org/razer/device/{serial}    (razer.device.misc, razer.device.lighting.*)

mod capabilities;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use zbus::Connection;
use zbus::proxy::CacheProperties;
use zbus::zvariant::{DynamicType, Type};

use self::capabilities::{Args, Introspection};
use crate::Backend;
use crate::error::Error;
use crate::types::{Frame, MatrixDimensions, RawDeviceDescriptor, RawZoneState, StateChange};

const SERVICE: &str = "org.razer";
const ROOT_PATH: &str = "/org/razer";
const DEVICES_INTERFACE: &str = "razer.devices";
const MISC_INTERFACE: &str = "razer.device.misc";
const CHROMA_INTERFACE: &str = "razer.device.lighting.chroma";

fn device_path(serial: &str) -> String {
    format!("/org/razer/device/{serial}")
}

/// Adapter for the OpenRazer daemon.
///
/// Device uids are the daemon's serial numbers.
pub struct OpenRazerBackend {
    id: String,
    conn: Connection,
}

impl OpenRazerBackend {
    /// Connect to the session bus.
    ///
    /// Fails with [`Error::Unavailable`] when there is no session bus; a
    /// missing daemon is only detected by [`Backend::probe`].
    pub async fn connect(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        let conn = Connection::session()
            .await
            .map_err(|e| Error::unavailable(&id, format!("no D-Bus session bus: {e}")))?;
        Ok(Self { id, conn })
    }

    // ── D-Bus plumbing ───────────────────────────────────────────────

    fn map_err(&self, uid: Option<&str>, e: zbus::Error) -> Error {
        let service_gone = match e {
            zbus::Error::MethodError(ref name, _, _) => {
                matches!(
                    name.as_str(),
                    "org.freedesktop.DBus.Error.ServiceUnknown"
                        | "org.freedesktop.DBus.Error.NameHasNoOwner"
                        | "org.freedesktop.DBus.Error.NoReply"
                )
            }
            zbus::Error::FDO(ref fdo) => matches!(
                **fdo,
                zbus::fdo::Error::ServiceUnknown(_)
                    | zbus::fdo::Error::NameHasNoOwner(_)
                    | zbus::fdo::Error::NoReply(_)
            ),
            zbus::Error::InputOutput(_) => true,
            _ => false,
        };

        match uid {
            _ if service_gone => Error::unavailable(&self.id, e.to_string()),
            Some(uid) => Error::device(&self.id, uid, e.to_string()),
            None => Error::invalid_response(&self.id, e.to_string()),
        }
    }

    async fn proxy(
        &self,
        path: &str,
        interface: &str,
    ) -> Result<zbus::Proxy<'static>, zbus::Error> {
        zbus::Proxy::new(&self.conn, SERVICE, path.to_owned(), interface.to_owned()).await
    }

    async fn call<B, R>(
        &self,
        path: &str,
        interface: &str,
        method: &str,
        body: &B,
    ) -> Result<R, zbus::Error>
    where
        B: serde::Serialize + DynamicType + Sync,
        R: DeserializeOwned + Type,
    {
        debug!(backend = %self.id, path, interface, method, "dbus call");
        self.proxy(path, interface)
            .await?
            .call(method, body)
            .await
    }

    async fn call_unit<B>(
        &self,
        path: &str,
        interface: &str,
        method: &str,
        body: &B,
    ) -> Result<(), zbus::Error>
    where
        B: serde::Serialize + DynamicType + Sync,
    {
        debug!(backend = %self.id, path, interface, method, "dbus call");
        self.proxy(path, interface)
            .await?
            .call_method(method, body)
            .await
            .map(drop)
    }

    async fn serials(&self) -> Result<Vec<String>, zbus::Error> {
        self.call(ROOT_PATH, DEVICES_INTERFACE, "getDevices", &())
            .await
    }

    async fn introspect(&self, path: &str) -> Result<Introspection, zbus::Error> {
        let proxy = zbus::fdo::IntrospectableProxy::builder(&self.conn)
            .destination(SERVICE)?
            .path(path.to_owned())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        let xml = proxy.introspect().await?;
        Introspection::parse(&xml)
            .map_err(|e| zbus::Error::Failure(format!("unreadable introspection data: {e}")))
    }

    async fn dimensions(&self, path: &str) -> Result<Option<MatrixDimensions>, zbus::Error> {
        let has_matrix: bool = self.call(path, MISC_INTERFACE, "hasMatrix", &()).await?;
        if !has_matrix {
            return Ok(None);
        }
        let dims: Vec<i32> = self
            .call(path, MISC_INTERFACE, "getMatrixDimensions", &())
            .await?;
        Ok(match dims.as_slice() {
            [rows, cols] => match (usize::try_from(*rows), usize::try_from(*cols)) {
                (Ok(rows), Ok(cols)) if rows > 0 && cols > 0 => {
                    Some(MatrixDimensions::new(rows, cols))
                }
                _ => None,
            },
            _ => None,
        })
    }

    /// Build a descriptor from the device object's misc interface and its
    /// introspected lighting interfaces.
    async fn describe(&self, serial: &str) -> Result<RawDeviceDescriptor, zbus::Error> {
        let path = device_path(serial);
        let name: String = self.call(&path, MISC_INTERFACE, "getDeviceName", &()).await?;
        let form_factor: String = self.call(&path, MISC_INTERFACE, "getDeviceType", &()).await?;
        let firmware: Option<String> = self
            .call(&path, MISC_INTERFACE, "getFirmware", &())
            .await
            .ok();
        let keyboard_layout: Option<String> = if form_factor == "keyboard" {
            self.call(&path, MISC_INTERFACE, "getKeyboardLayout", &())
                .await
                .ok()
        } else {
            None
        };
        let matrix = self.dimensions(&path).await.unwrap_or(None);

        let intro = self.introspect(&path).await?;
        let mut zones = capabilities::zones(&intro);
        for zone in &mut zones {
            zone.state = self.zone_state(&path, &zone.id).await;
        }

        Ok(RawDeviceDescriptor {
            uid: serial.to_owned(),
            name,
            serial: Some(serial.to_owned()),
            form_factor: Some(form_factor),
            zones,
            matrix,
            keyboard_layout,
            firmware,
            ..RawDeviceDescriptor::default()
        })
    }

    /// Current brightness of a zone; the daemon does not report effects.
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    async fn zone_state(&self, path: &str, zone: &str) -> RawZoneState {
        let Some(spec) = capabilities::zone_spec(zone) else {
            return RawZoneState::default();
        };
        let (iface, method) = spec.brightness_getter();
        let brightness: Option<f64> = self.call(path, iface, &method, &()).await.ok();
        RawZoneState {
            // 0.0-100.0 on the wire
            brightness: brightness.map(|b| b.round().clamp(0.0, 100.0) as i64),
            ..RawZoneState::default()
        }
    }

    async fn invoke(&self, path: &str, plan: &capabilities::Plan) -> Result<(), zbus::Error> {
        let (iface, method) = (plan.interface, plan.method.as_str());
        match plan.args {
            Args::Unit => self.call_unit(path, iface, method, &()).await,
            Args::Direction(d) => self.call_unit(path, iface, method, &(d,)).await,
            Args::Brightness(level) => self.call_unit(path, iface, method, &(level,)).await,
            Args::Reactive([r, g, b, speed]) => {
                self.call_unit(path, iface, method, &(r, g, b, speed)).await
            }
            Args::Colours(ref bytes) => match bytes.as_slice() {
                &[r, g, b] => self.call_unit(path, iface, method, &(r, g, b)).await,
                &[r1, g1, b1, r2, g2, b2] => {
                    self.call_unit(path, iface, method, &(r1, g1, b1, r2, g2, b2))
                        .await
                }
                &[r1, g1, b1, r2, g2, b2, r3, g3, b3] => {
                    self.call_unit(path, iface, method, &(r1, g1, b1, r2, g2, b2, r3, g3, b3))
                        .await
                }
                _ => Err(zbus::Error::Failure(format!(
                    "{method} does not take {} colour bytes",
                    bytes.len()
                ))),
            },
        }
    }
}

/// Encode a frame as the daemon's `setKeyRow` payload: for every row,
/// `[row, first_col, last_col, r, g, b, …]`.
fn key_row_payload(frame: &Frame) -> Option<Vec<u8>> {
    let last_col = u8::try_from(frame.cols.checked_sub(1)?).ok()?;
    let capacity = frame.pixels.len().saturating_add(frame.rows).saturating_mul(3);
    let mut payload = Vec::with_capacity(capacity);
    for (row, pixels) in frame.rows().enumerate() {
        payload.extend([u8::try_from(row).ok()?, 0, last_col]);
        payload.extend(pixels.iter().flat_map(|px| px.to_array()));
    }
    Some(payload)
}

#[async_trait]
impl Backend for OpenRazerBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn probe(&self) -> Result<(), Error> {
        self.serials()
            .await
            .map(drop)
            .map_err(|e| self.map_err(None, e))
    }

    async fn discover(&self) -> Result<Vec<RawDeviceDescriptor>, Error> {
        let serials = self.serials().await.map_err(|e| self.map_err(None, e))?;
        let mut devices = Vec::with_capacity(serials.len());
        for serial in serials {
            match self.describe(&serial).await {
                Ok(device) => devices.push(device),
                Err(e) => {
                    let err = self.map_err(Some(&serial), e);
                    if err.is_unavailable() {
                        return Err(err);
                    }
                    warn!(
                        backend = %self.id,
                        serial,
                        error = %err,
                        "skipping undescribable device"
                    );
                }
            }
        }
        Ok(devices)
    }

    async fn get_device(&self, uid: &str) -> Result<RawDeviceDescriptor, Error> {
        let serials = self.serials().await.map_err(|e| self.map_err(None, e))?;
        if !serials.iter().any(|s| s == uid) {
            return Err(Error::not_found(&self.id, uid));
        }
        self.describe(uid)
            .await
            .map_err(|e| self.map_err(Some(uid), e))
    }

    async fn set_state(&self, uid: &str, change: &StateChange) -> Result<(), Error> {
        let zone = capabilities::zone_spec(&change.zone)
            .ok_or_else(|| Error::unsupported(&self.id, uid, &format!("zone {}", change.zone)))?;
        let plan = capabilities::plan(zone, change).map_err(|m| Error::device(&self.id, uid, m))?;
        self.invoke(&device_path(uid), &plan)
            .await
            .map_err(|e| self.map_err(Some(uid), e))
    }

    async fn get_matrix(&self, uid: &str) -> Result<MatrixDimensions, Error> {
        self.dimensions(&device_path(uid))
            .await
            .map_err(|e| self.map_err(Some(uid), e))?
            .ok_or_else(|| Error::unsupported(&self.id, uid, "matrix"))
    }

    async fn draw_matrix(&self, uid: &str, frame: &Frame) -> Result<(), Error> {
        let payload = key_row_payload(frame)
            .ok_or_else(|| Error::device(&self.id, uid, "frame too large for setKeyRow"))?;
        let path = device_path(uid);
        self.call_unit(&path, CHROMA_INTERFACE, "setKeyRow", &(payload,))
            .await
            .map_err(|e| self.map_err(Some(uid), e))?;
        self.call_unit(&path, CHROMA_INTERFACE, "setCustom", &())
            .await
            .map_err(|e| self.map_err(Some(uid), e))
    }

    fn supports_concurrent_requests(&self) -> bool {
        false
    }
}
