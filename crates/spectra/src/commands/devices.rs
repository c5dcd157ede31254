//! Device command handlers.

use std::sync::Arc;

use tabled::Tabled;

use spectra_core::{
    Broker, ColourCount, Device, DeviceSummary, FormFactor, ParameterKind, ParameterValue,
    SetStateRequest, ZoneState,
};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts, SetArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Backend")]
    backend: String,
    #[tabled(rename = "UID")]
    uid: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    form_factor: String,
    #[tabled(rename = "Zones")]
    zones: String,
    #[tabled(rename = "Matrix")]
    matrix: String,
}

impl From<&DeviceSummary> for DeviceRow {
    fn from(d: &DeviceSummary) -> Self {
        Self {
            backend: d.backend.clone(),
            uid: d.uid.clone(),
            name: d.name.clone(),
            form_factor: d.form_factor.label.clone(),
            zones: d.zones.join(", "),
            matrix: if d.has_matrix {
                "yes".into()
            } else {
                "-".into()
            },
        }
    }
}

fn describe_state(state: &ZoneState) -> String {
    let mut parts = vec![state.effect.clone().unwrap_or_else(|| "-".into())];
    if let Some(ref p) = state.parameter {
        parts.push(format!("({p})"));
    }
    if !state.colours.is_empty() {
        let colours: Vec<String> = state.colours.iter().map(ToString::to_string).collect();
        parts.push(colours.join(" "));
    }
    if let Some(b) = state.brightness {
        parts.push(format!("@ {b}%"));
    }
    parts.join(" ")
}

fn describe_parameter(kind: &ParameterKind) -> Option<String> {
    match kind {
        ParameterKind::None => None,
        ParameterKind::Integer { min, max } => Some(format!("{min}..{max}")),
        ParameterKind::Enumerated { options } => Some(
            options
                .iter()
                .map(|o| match o.colours {
                    Some(ColourCount::Exact(n)) => format!("{} ({n})", o.id),
                    Some(ColourCount::Variable) => format!("{} (n)", o.id),
                    None => o.id.clone(),
                })
                .collect::<Vec<_>>()
                .join("|"),
        ),
    }
}

fn detail(d: &Arc<Device>) -> String {
    let mut lines = vec![
        format!("Device:   {}", d.key),
        format!("Name:     {}", d.name),
        format!("Serial:   {}", d.serial.as_deref().unwrap_or("-")),
        format!("Type:     {}", d.form_factor.label),
        format!("Firmware: {}", d.firmware.as_deref().unwrap_or("-")),
        format!(
            "Matrix:   {}",
            d.matrix
                .map_or_else(|| "-".into(), |m| format!("{}x{}", m.rows, m.cols))
        ),
    ];
    if let Some(ref layout) = d.keyboard_layout {
        lines.push(format!("Layout:   {layout}"));
    }

    for (zone, label) in &d.zones {
        lines.push(String::new());
        let state = d
            .state
            .get(zone)
            .map_or_else(|| "-".into(), describe_state);
        lines.push(format!("Zone {zone} ({label}): {state}"));
        for effect in d.capabilities.get(zone).into_iter().flatten() {
            let mut line = format!("  {:<12}", effect.id);
            if let Some(param) = describe_parameter(&effect.parameter) {
                line.push_str(&format!(" param {param}"));
            }
            if effect.colours != ColourCount::Exact(0) {
                line.push_str(&format!(" colours {}", effect.colours));
            }
            lines.push(line.trim_end().to_owned());
        }
    }
    lines.join("\n")
}

fn check_form_factor(id: &str) -> Result<(), CliError> {
    let known = FormFactor::all();
    if known.iter().any(|f| f.id.eq_ignore_ascii_case(id)) {
        return Ok(());
    }
    Err(CliError::Validation {
        field: "--form-factor".into(),
        reason: format!(
            "unknown form factor '{id}', expected one of {}",
            known
                .iter()
                .map(|f| f.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    broker: &Broker,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { form_factor } => {
            let devices = match form_factor {
                Some(ref ff) => {
                    check_form_factor(ff)?;
                    broker.filtered_device_list(ff).await
                }
                None => broker.device_list().await,
            };
            let out = output::render_list(
                util::format(global),
                &devices,
                |d| DeviceRow::from(d),
                |d| d.key().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { backend, uid } => {
            let device = broker
                .get_device(&backend, &uid)
                .await
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "device".into(),
                    identifier: format!("{backend}:{uid}"),
                    list_command: "devices list".into(),
                })?;
            let out = output::render_single(util::format(global), &device, detail, |d| {
                d.key.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Set(set) => apply(broker, set, global).await,
    }
}

async fn apply(broker: &Broker, args: SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let SetArgs {
        backend,
        uid,
        zone,
        effect,
        param,
        colours,
        serial,
    } = args;

    let mut request = SetStateRequest::new(&backend, &uid, &zone, &effect);
    request.serial = serial;
    request.parameter = param.as_deref().map(ParameterValue::parse);
    request.colours = colours;

    broker.set_device_state(request).await?;
    util::confirm(
        global,
        &format!("Applied {effect} to {backend}:{uid} zone {zone}"),
    );
    Ok(())
}
