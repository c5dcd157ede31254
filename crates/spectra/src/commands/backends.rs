//! Backend command handlers.

use serde::Serialize;
use tabled::Tabled;

use spectra_core::{Availability, Broker};

use crate::cli::{BackendsArgs, BackendsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct BackendStatus {
    id: String,
    kind: &'static str,
    availability: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Tabled)]
struct BackendRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn status(id: String, kind: &'static str, state: &Availability) -> BackendStatus {
    BackendStatus {
        id,
        kind,
        availability: state.to_string(),
        reason: state.reason().map(str::to_owned),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    broker: &Broker,
    args: BackendsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        BackendsCommand::List => {
            let mut rows = Vec::new();
            for id in broker.list_backends() {
                let Some(handle) = broker.get_backend(&id) else {
                    continue;
                };
                let state = handle.probe().await;
                rows.push(status(id, handle.kind(), &state));
            }

            let color = util::color(global);
            let out = output::render_list(
                util::format(global),
                &rows,
                |s| BackendRow {
                    id: s.id.clone(),
                    kind: s.kind.to_owned(),
                    status: output::paint_status(
                        &s.availability,
                        match s.availability.as_str() {
                            "available" => Some(true),
                            "unknown" => None,
                            _ => Some(false),
                        },
                        color,
                    ),
                    detail: s.reason.clone().unwrap_or_default(),
                },
                |s| s.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
