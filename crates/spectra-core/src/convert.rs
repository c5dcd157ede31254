// ── Backend-to-domain conversion ──
//
// Bridges loose `spectra_backend` descriptors into the canonical
// `spectra_core::model` types. Fills defaults for missing optional data,
// synthesizes an implicit zone for single-zone devices, and normalizes
// colour strings.

use indexmap::IndexMap;
use spectra_backend::{RawDeviceDescriptor, RawZoneState, Rgb};
use tracing::debug;

use crate::model::{Device, DeviceKey, FormFactor, FormFactorKind, ZoneState};

/// Zone id used when a backend reports no zones.
pub const IMPLICIT_ZONE: &str = "main";

/// Layout assumed for keyboards whose backend does not report one.
pub const DEFAULT_KEYBOARD_LAYOUT: &str = "en_US";

const UNKNOWN_NAME: &str = "Unknown Device";

// ── Helpers ────────────────────────────────────────────────────────

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

/// Clamp a reported brightness into 0-100.
fn clamp_brightness(raw: i64) -> u8 {
    u8::try_from(raw.clamp(0, 100)).unwrap_or(100)
}

fn zone_state(device: &str, raw: RawZoneState) -> ZoneState {
    let colours = raw
        .colours
        .iter()
        .filter_map(|c| {
            let parsed = Rgb::from_hex(c);
            if parsed.is_none() {
                debug!(device, colour = %c, "dropping unparseable colour from reported state");
            }
            parsed
        })
        .collect();

    ZoneState {
        effect: non_empty(raw.effect),
        parameter: raw.parameter,
        colours,
        brightness: raw.brightness.map(clamp_brightness),
    }
}

// ── Device ─────────────────────────────────────────────────────────

/// Normalize a backend report into a [`Device`] owned by `backend`.
pub fn normalize(backend: &str, raw: RawDeviceDescriptor) -> Device {
    let key = DeviceKey::new(backend, raw.uid);
    let label = key.to_string();

    let form_factor = raw
        .form_factor
        .as_deref()
        .map_or_else(|| FormFactor::from(FormFactorKind::Accessory), FormFactor::from_id);
    let icon = non_empty(raw.icon).unwrap_or_else(|| form_factor.icon.clone());

    let mut zones = IndexMap::new();
    let mut capabilities = IndexMap::new();
    let mut state = IndexMap::new();

    if raw.zones.is_empty() {
        zones.insert(IMPLICIT_ZONE.to_owned(), "Main".to_owned());
        capabilities.insert(IMPLICIT_ZONE.to_owned(), raw.effects);
        state.insert(IMPLICIT_ZONE.to_owned(), zone_state(&label, raw.state));
    } else {
        for zone in raw.zones {
            if zones.contains_key(&zone.id) {
                debug!(device = %label, zone = %zone.id, "ignoring duplicate zone");
                continue;
            }
            let zone_label = non_empty(zone.label).unwrap_or_else(|| zone.id.clone());
            zones.insert(zone.id.clone(), zone_label);
            capabilities.insert(zone.id.clone(), zone.effects);
            state.insert(zone.id, zone_state(&label, zone.state));
        }
    }

    let matrix = raw.matrix.filter(|m| {
        let usable = m.is_addressable();
        if !usable && m.rows > 0 && m.cols > 0 {
            debug!(device = %label, rows = m.rows, cols = m.cols, "ignoring oversized matrix");
        }
        usable
    });

    let keyboard_layout = (form_factor.kind() == FormFactorKind::Keyboard).then(|| {
        non_empty(raw.keyboard_layout).unwrap_or_else(|| DEFAULT_KEYBOARD_LAYOUT.to_owned())
    });

    Device {
        key,
        name: non_empty(Some(raw.name)).unwrap_or_else(|| UNKNOWN_NAME.to_owned()),
        serial: non_empty(raw.serial),
        form_factor,
        icon,
        zones,
        capabilities,
        state,
        keyboard_layout,
        matrix,
        firmware: non_empty(raw.firmware),
    }
}
