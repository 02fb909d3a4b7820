use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "rota_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "rota_query_duration_seconds";

/// Counter: mutations refused by a validation gate. Labels: kind.
pub const REJECTIONS_TOTAL: &str = "rota_rejections_total";

/// Counter: days overwritten by pastes.
pub const PASTE_DAYS_TOTAL: &str = "rota_paste_days_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "rota_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "rota_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "rota_connections_rejected_total";

/// Gauge: number of active tenants (loaded engines).
pub const TENANTS_ACTIVE: &str = "rota_tenants_active";

/// Counter: logins with an unknown user name.
pub const AUTH_FAILURES_TOTAL: &str = "rota_auth_failures_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "rota_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "rota_wal_flush_batch_size";

/// Install the Prometheus exporter on `port`. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertShift { .. } => "insert_shift",
        Command::UpdateShift { .. } => "update_shift",
        Command::DeleteShift { .. } => "delete_shift",
        Command::InsertLeave { .. } => "insert_leave",
        Command::DeleteLeave { .. } => "delete_leave",
        Command::InsertMember { .. } => "insert_member",
        Command::UpdateMember { .. } => "update_member",
        Command::DeleteMember { .. } => "delete_member",
        Command::InsertAssignmentLabels { .. } => "insert_assignment_labels",
        Command::InsertLeaveReasons { .. } => "insert_leave_reasons",
        Command::Paste { .. } => "paste",
        Command::SelectShifts { .. } => "select_shifts",
        Command::SelectLeave { .. } => "select_leave",
        Command::SelectSchedules { .. } => "select_schedules",
        Command::SelectMembers { .. } => "select_members",
        Command::SelectAssignmentLabels => "select_assignment_labels",
        Command::SelectLeaveReasons => "select_leave_reasons",
        Command::SelectFreeSlots { .. } => "select_free_slots",
        Command::SelectEmptyShifts { .. } => "select_empty_shifts",
        Command::SelectBookedMembers { .. } => "select_booked_members",
        Command::SelectShiftCatalog => "select_shift_catalog",
    }
}
