//! Matrix command handlers.

use serde::Serialize;
use tabled::Tabled;

use spectra_core::{BatchReport, Broker};

use crate::cli::{GlobalOpts, MatrixArgs, MatrixCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct DrawResult {
    device: String,
    result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Tabled)]
struct DrawRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Error")]
    error: String,
}

fn results(report: &BatchReport) -> Vec<DrawResult> {
    let ok = report.succeeded.iter().map(|key| DrawResult {
        device: key.to_string(),
        result: "ok",
        error: None,
    });
    let failed = report.failed.iter().map(|f| DrawResult {
        device: f.device.to_string(),
        result: "failed",
        error: Some(f.error.to_string()),
    });
    let mut rows: Vec<DrawResult> = ok.chain(failed).collect();
    rows.sort_by(|a, b| a.device.cmp(&b.device));
    rows
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    broker: &Broker,
    args: MatrixArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        MatrixCommand::Fill {
            backend,
            uid,
            colour,
        } => {
            let colour = util::parse_colour(&colour)?;
            util::require_device(broker, &backend, &uid).await?;

            let mut handle = broker
                .get_device_object(&backend, &uid)
                .await?
                .ok_or_else(|| CliError::Unsupported {
                    operation: "matrix".into(),
                    device: format!("{backend}:{uid}"),
                })?;
            handle.fill(colour);
            handle.draw().await?;

            let dims = handle.dimensions();
            util::confirm(
                global,
                &format!(
                    "Filled {backend}:{uid} ({}x{}) with {colour}",
                    dims.rows, dims.cols
                ),
            );
            Ok(())
        }

        MatrixCommand::Test { colour } => {
            let colour = util::parse_colour(&colour)?;
            let report = broker.fan_out(|handle| handle.fill(colour)).await;

            let rows = results(&report);
            let color = util::color(global);
            let out = output::render_list(
                util::format(global),
                &rows,
                |r| DrawRow {
                    device: r.device.clone(),
                    result: output::paint_status(r.result, Some(r.error.is_none()), color),
                    error: r.error.clone().unwrap_or_default(),
                },
                |r| format!("{} {}", r.device, r.result),
            );
            output::print_output(&out, global.quiet);

            if report.is_success() {
                Ok(())
            } else {
                Err(CliError::PartialFailure {
                    failed: report.failed.len(),
                    total: report.total(),
                })
            }
        }
    }
}
