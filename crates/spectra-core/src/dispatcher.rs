// ── Effect dispatcher ──
//
// Validates state-change requests against the cached capabilities of the
// target zone, forwards them to the owning backend and, on success,
// mirrors the change into the cache. Rejected requests never reach a
// backend and never touch the cache.

use std::sync::Arc;

use futures_util::future::join_all;
use spectra_backend::{
    BRIGHTNESS_EFFECT, EffectDescriptor, ParameterKind, ParameterOption, ParameterValue, Rgb,
    StateChange,
};
use tracing::{debug, warn};

use crate::batch::BatchReport;
use crate::catalog::DeviceCatalog;
use crate::error::CoreError;
use crate::model::{Device, ZoneState};
use crate::request::SetStateRequest;

/// Validates and applies [`SetStateRequest`]s.
pub struct EffectDispatcher {
    catalog: Arc<DeviceCatalog>,
}

impl EffectDispatcher {
    pub fn new(catalog: Arc<DeviceCatalog>) -> Self {
        Self { catalog }
    }

    /// Apply one state change.
    ///
    /// # Errors
    ///
    /// Validation failures ([`CoreError::is_validation`]) are raised before
    /// any backend call. Backend failures propagate with the cache untouched.
    pub async fn set_device_state(&self, request: SetStateRequest) -> Result<(), CoreError> {
        let unknown = || CoreError::UnknownDevice {
            backend: request.backend.clone(),
            uid: request.uid.clone(),
        };

        let device = self
            .catalog
            .get_device(&request.backend, &request.uid)
            .await
            .ok_or_else(unknown)?;

        if let Some(ref serial) = request.serial {
            if device.serial.as_deref() != Some(serial.as_str()) {
                debug!(device = %device.key, %serial, "serial mismatch");
                return Err(unknown());
            }
        }

        let change = validate(&device, &request)?;

        let handle = self
            .catalog
            .registry()
            .get_backend(&request.backend)
            .ok_or_else(unknown)?;
        let Some(adapter) = handle.adapter().await else {
            return Err(CoreError::BackendUnavailable {
                backend: request.backend.clone(),
                reason: handle
                    .availability()
                    .reason()
                    .unwrap_or("adapter not constructed")
                    .to_owned(),
            });
        };

        if let Err(e) = adapter.set_state(&request.uid, &change).await {
            if e.is_unavailable() {
                handle.mark_unavailable(e.to_string());
            }
            return Err(e.into());
        }
        handle.mark_available();

        debug!(device = %device.key, zone = %change.zone, effect = %change.effect, "state applied");
        let zone = change.zone.clone();
        self.catalog
            .update_zone_state(&device.key, &zone, move |state| apply(state, change))
            .await;
        Ok(())
    }

    /// Apply several state changes concurrently.
    ///
    /// Every request runs to completion; failures are collected per device.
    pub async fn set_many(&self, requests: Vec<SetStateRequest>) -> BatchReport {
        let outcomes = join_all(requests.into_iter().map(|request| async move {
            let key = request.key();
            (key, self.set_device_state(request).await)
        }))
        .await;

        let mut report = BatchReport::default();
        for (key, outcome) in outcomes {
            if let Err(ref e) = outcome {
                warn!(device = %key, error = %e, "state change failed");
            }
            report.record(key, outcome);
        }
        report
    }
}

// ── Validation ───────────────────────────────────────────────────────

/// Check `request` against the capabilities cached for `device`.
pub(crate) fn validate(
    device: &Device,
    request: &SetStateRequest,
) -> Result<StateChange, CoreError> {
    if !device.has_zone(&request.zone) {
        return Err(CoreError::InvalidZone {
            device: device.key.to_string(),
            zone: request.zone.clone(),
        });
    }

    let effect = device
        .effect(&request.zone, &request.effect)
        .ok_or_else(|| CoreError::UnsupportedEffect {
            zone: request.zone.clone(),
            effect: request.effect.clone(),
        })?;

    let option = check_parameter(effect, request.parameter.as_ref())?;

    // Brightness carries its level in the parameter; any colours are dropped.
    if effect.id == BRIGHTNESS_EFFECT {
        return Ok(StateChange {
            zone: request.zone.clone(),
            effect: effect.id.clone(),
            parameter: request.parameter.clone(),
            colours: Vec::new(),
        });
    }

    let required = option.and_then(|o| o.colours).unwrap_or(effect.colours);
    if !required.accepts(request.colours.len()) {
        return Err(CoreError::InvalidColourCount {
            effect: effect.id.clone(),
            expected: required.to_string(),
            got: request.colours.len(),
        });
    }

    let colours = request
        .colours
        .iter()
        .map(|raw| {
            Rgb::from_hex(raw).ok_or_else(|| CoreError::InvalidColour { value: raw.clone() })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StateChange {
        zone: request.zone.clone(),
        effect: effect.id.clone(),
        parameter: request.parameter.clone(),
        colours,
    })
}

/// Returns the chosen option for enumerated parameters.
fn check_parameter<'a>(
    effect: &'a EffectDescriptor,
    value: Option<&ParameterValue>,
) -> Result<Option<&'a ParameterOption>, CoreError> {
    let invalid = |reason: String| CoreError::InvalidParameter {
        effect: effect.id.clone(),
        reason,
    };

    match (&effect.parameter, value) {
        (ParameterKind::None, None) => Ok(None),
        (ParameterKind::None, Some(v)) => Err(invalid(format!("takes no parameter, got {v:?}"))),

        (ParameterKind::Enumerated { options }, Some(ParameterValue::Enumerated(id))) => options
            .iter()
            .find(|o| o.id == *id)
            .map(Some)
            .ok_or_else(|| {
                invalid(format!(
                    "unknown option {id:?}, expected one of {}",
                    option_list(options)
                ))
            }),
        (ParameterKind::Enumerated { options }, Some(ParameterValue::Integer(n))) => Err(invalid(
            format!("expected one of {}, got {n}", option_list(options)),
        )),
        (ParameterKind::Enumerated { options }, None) => Err(invalid(format!(
            "requires one of {}",
            option_list(options)
        ))),

        (ParameterKind::Integer { min, max }, Some(ParameterValue::Integer(n))) => {
            if (*min..=*max).contains(n) {
                Ok(None)
            } else {
                Err(invalid(format!("{n} is outside {min}..={max}")))
            }
        }
        (ParameterKind::Integer { min, max }, Some(ParameterValue::Enumerated(s))) => Err(invalid(
            format!("expected an integer in {min}..={max}, got {s:?}"),
        )),
        (ParameterKind::Integer { min, max }, None) => {
            Err(invalid(format!("requires an integer in {min}..={max}")))
        }
    }
}

fn option_list(options: &[ParameterOption]) -> String {
    options
        .iter()
        .map(|o| o.id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Cache update ─────────────────────────────────────────────────────

fn apply(state: &mut ZoneState, change: StateChange) {
    if change.effect == BRIGHTNESS_EFFECT {
        if let Some(ParameterValue::Integer(level)) = change.parameter {
            state.brightness = u8::try_from(level.clamp(0, 100)).ok();
        }
        return;
    }
    state.effect = Some(change.effect);
    state.parameter = change.parameter;
    state.colours = change.colours;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use spectra_backend::{Backend, MemoryBackend, RawDeviceDescriptor};

    use super::*;
    use crate::convert::normalize;

    async fn keyboard() -> Device {
        let raw = MemoryBackend::demo("mem").get_device("kbd-0001").await.unwrap();
        normalize("mem", raw)
    }

    fn request(zone: &str, effect: &str) -> SetStateRequest {
        SetStateRequest::new("mem", "kbd-0001", zone, effect)
    }

    #[tokio::test]
    async fn static_needs_exactly_one_colour() {
        let device = keyboard().await;
        assert!(validate(&device, &request("main", "static").with_colour("#ff0000")).is_ok());

        let err = validate(&device, &request("main", "static")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidColourCount { got: 0, .. }));

        let err = validate(
            &device,
            &request("main", "static")
                .with_colour("#ff0000")
                .with_colour("#00ff00"),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidColourCount { got: 2, .. }));
    }

    #[tokio::test]
    async fn option_colour_count_overrides_effect() {
        let device = keyboard().await;
        let dual = request("main", "breath")
            .with_parameter(ParameterValue::Enumerated("dual".into()))
            .with_colour("#ff0000")
            .with_colour("#0000ff");
        assert!(validate(&device, &dual).is_ok());

        let random = request("main", "breath")
            .with_parameter(ParameterValue::Enumerated("random".into()))
            .with_colour("#ff0000");
        let err = validate(&device, &random).unwrap_err();
        assert_eq!(err.to_string(), "Effect 'breath' takes 0 colour(s), got 1");
    }

    #[tokio::test]
    async fn parameters_are_type_checked() {
        let device = keyboard().await;

        let ok = request("main", "wave").with_parameter(ParameterValue::Integer(2));
        assert!(validate(&device, &ok).is_ok());

        for bad in [
            request("main", "wave").with_parameter(ParameterValue::Integer(3)),
            request("main", "wave").with_parameter(ParameterValue::Enumerated("left".into())),
            request("main", "wave"),
            request("main", "spectrum").with_parameter(ParameterValue::Integer(1)),
            request("main", "breath").with_parameter(ParameterValue::Enumerated("quad".into())),
        ] {
            let err = validate(&device, &bad).unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidParameter { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn zone_and_effect_must_exist() {
        let device = keyboard().await;
        assert!(matches!(
            validate(&device, &request("underglow", "static")).unwrap_err(),
            CoreError::InvalidZone { .. }
        ));
        assert!(matches!(
            validate(&device, &request("logo", "wave")).unwrap_err(),
            CoreError::UnsupportedEffect { .. }
        ));
    }

    #[tokio::test]
    async fn bad_hex_is_rejected() {
        let device = keyboard().await;
        let err = validate(&device, &request("main", "static").with_colour("green")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidColour { ref value } if value == "green"));
    }

    #[test]
    fn variable_needs_at_least_one_colour() {
        let device = normalize(
            "mem",
            RawDeviceDescriptor {
                uid: "strip".into(),
                effects: vec![spectra_backend::effects::gradient()],
                ..RawDeviceDescriptor::default()
            },
        );
        let empty = SetStateRequest::new("mem", "strip", "main", "gradient");
        assert!(matches!(
            validate(&device, &empty).unwrap_err(),
            CoreError::InvalidColourCount { .. }
        ));
        let three = empty
            .clone()
            .with_colour("#ff0000")
            .with_colour("#00ff00")
            .with_colour("#0000ff");
        assert_eq!(validate(&device, &three).unwrap().colours.len(), 3);
    }

    #[tokio::test]
    async fn brightness_ignores_colours() {
        let device = keyboard().await;
        let change = validate(
            &device,
            &request("main", BRIGHTNESS_EFFECT)
                .with_parameter(ParameterValue::Integer(50))
                .with_colour("#00FF00"),
        )
        .unwrap();
        assert_eq!(change.parameter, Some(ParameterValue::Integer(50)));
        assert!(change.colours.is_empty());

        let err = validate(
            &device,
            &request("main", BRIGHTNESS_EFFECT).with_parameter(ParameterValue::Integer(101)),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter { .. }));
    }

    #[test]
    fn brightness_only_touches_brightness() {
        let mut state = ZoneState {
            effect: Some("static".into()),
            parameter: None,
            colours: vec![Rgb::new(0, 255, 0)],
            brightness: Some(100),
        };
        apply(
            &mut state,
            StateChange {
                zone: "main".into(),
                effect: BRIGHTNESS_EFFECT.into(),
                parameter: Some(ParameterValue::Integer(40)),
                colours: Vec::new(),
            },
        );
        assert_eq!(state.effect.as_deref(), Some("static"));
        assert_eq!(state.colours, vec![Rgb::new(0, 255, 0)]);
        assert_eq!(state.brightness, Some(40));
    }
}
