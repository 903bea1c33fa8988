use std::fmt::Write;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use kick_core::SchedulerState;

use crate::state::AppState;

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = render(&state).await;
    (
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        body,
    )
}

/// Render the tracker state in the OpenMetrics text format.
pub async fn render(state: &AppState) -> String {
    let mut out = String::with_capacity(2048);
    // Writing into a String cannot fail.
    let _ = write_metrics(&mut out, state).await;
    out
}

async fn write_metrics(out: &mut String, state: &AppState) -> std::fmt::Result {
    let scheduler = &state.scheduler;
    let tracker = state.tracker();
    let snapshot = tracker.snapshot();
    let settings = tracker.settings();
    let stats = tracker.dispatcher().stats();

    writeln!(out, "# TYPE kick_tracker_info info")?;
    writeln!(out, "# HELP kick_tracker_info Information about the tracker")?;
    writeln!(
        out,
        "kick_tracker_info{{created=\"{}\"}} 1",
        tracker.created_at().to_rfc3339()
    )?;

    writeln!(out, "# TYPE kick_tracker_state stateset")?;
    writeln!(out, "# HELP kick_tracker_state Whether an update cycle is running")?;
    let current = scheduler.state();
    for variant in [SchedulerState::Idle, SchedulerState::Running] {
        writeln!(
            out,
            "kick_tracker_state{{state=\"{}\"}} {}",
            variant,
            u8::from(current == variant)
        )?;
    }

    writeln!(out, "# TYPE kick_tracker_channels gauge")?;
    writeln!(out, "# HELP kick_tracker_channels Channels in the latest snapshot")?;
    writeln!(out, "kick_tracker_channels {}", snapshot.total_count())?;

    writeln!(out, "# TYPE kick_tracker_live_channels gauge")?;
    writeln!(out, "# HELP kick_tracker_live_channels Channels currently live")?;
    writeln!(out, "kick_tracker_live_channels {}", snapshot.live_count())?;

    writeln!(out, "# TYPE kick_tracker_failed_fetches gauge")?;
    writeln!(
        out,
        "# HELP kick_tracker_failed_fetches Channels whose last lookup failed"
    )?;
    writeln!(out, "kick_tracker_failed_fetches {}", snapshot.failed_count())?;

    writeln!(out, "# TYPE kick_tracker_channel_live gauge")?;
    writeln!(out, "# HELP kick_tracker_channel_live Live status per channel")?;
    for c in snapshot.channels() {
        writeln!(
            out,
            "kick_tracker_channel_live{{channel=\"{}\"}} {}",
            escape_label(&c.identifier),
            u8::from(c.is_live)
        )?;
    }

    writeln!(out, "# TYPE kick_tracker_snapshot_version gauge")?;
    writeln!(
        out,
        "# HELP kick_tracker_snapshot_version Version of the latest published snapshot"
    )?;
    writeln!(out, "kick_tracker_snapshot_version {}", snapshot.version())?;

    writeln!(out, "# TYPE kick_tracker_last_update_timestamp_seconds gauge")?;
    writeln!(
        out,
        "# HELP kick_tracker_last_update_timestamp_seconds Unix timestamp of the latest snapshot"
    )?;
    if snapshot.version() > 0 {
        let t = snapshot.generated_at();
        let secs = t.timestamp() as f64 + (t.timestamp_subsec_millis() as f64 / 1000.0);
        writeln!(out, "kick_tracker_last_update_timestamp_seconds {:.3}", secs)?;
    }

    writeln!(out, "# TYPE kick_tracker_refresh_interval_seconds gauge")?;
    writeln!(
        out,
        "# HELP kick_tracker_refresh_interval_seconds Effective refresh interval"
    )?;
    writeln!(
        out,
        "kick_tracker_refresh_interval_seconds {:.3}",
        settings.effective_interval().as_secs_f64()
    )?;

    writeln!(out, "# TYPE kick_tracker_cycles counter")?;
    writeln!(out, "# HELP kick_tracker_cycles Update cycles started")?;
    writeln!(out, "kick_tracker_cycles_total {}", scheduler.cycles_started())?;

    writeln!(out, "# TYPE kick_tracker_skipped_ticks counter")?;
    writeln!(
        out,
        "# HELP kick_tracker_skipped_ticks Ticks skipped because a cycle was still running"
    )?;
    writeln!(
        out,
        "kick_tracker_skipped_ticks_total {}",
        scheduler.cycles_skipped()
    )?;

    writeln!(out, "# TYPE kick_tracker_notifications counter")?;
    writeln!(out, "# HELP kick_tracker_notifications Webhook deliveries by result")?;
    writeln!(
        out,
        "kick_tracker_notifications_total{{result=\"delivered\"}} {}",
        stats.delivered()
    )?;
    writeln!(
        out,
        "kick_tracker_notifications_total{{result=\"failed\"}} {}",
        stats.failed()
    )?;

    writeln!(out, "# TYPE kick_tracker_uptime_seconds gauge")?;
    writeln!(out, "# HELP kick_tracker_uptime_seconds Time since the tracker was created")?;
    let uptime = (chrono::Utc::now() - tracker.created_at()).num_milliseconds() as f64 / 1000.0;
    writeln!(out, "kick_tracker_uptime_seconds {:.3}", uptime)?;

    writeln!(out, "# EOF")
}
