//! Dashboard statistics handler

use anyhow::Result;
use async_nats::{Client, Subscriber};
use chrono::{Duration, NaiveDate, Utc};
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::db::queries;
use crate::types::{DashboardStatsRequest, ErrorResponse, Request, SuccessResponse};

const DEFAULT_RANGE_DAYS: i64 = 30;

fn parse_day(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("{} must be YYYY-MM-DD, got '{}'", field, value))
}

/// Resolve the requested range; missing bounds default to the last 30 days
pub fn resolve_date_range(
    request: &DashboardStatsRequest,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), String> {
    let end = match request.end_date.as_deref() {
        Some(value) => parse_day("endDate", value)?,
        None => today,
    };
    let start = match request.start_date.as_deref() {
        Some(value) => parse_day("startDate", value)?,
        None => end - Duration::days(DEFAULT_RANGE_DAYS),
    };
    if start > end {
        return Err(format!("startDate {} is after endDate {}", start, end));
    }
    Ok((start, end))
}

/// Handle swissairdry.stats.dashboard
pub async fn handle_dashboard(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received stats.dashboard message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<DashboardStatsRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let (start, end) = match resolve_date_range(&request.payload, Utc::now().date_naive()) {
            Ok(range) => range,
            Err(message) => {
                let error = ErrorResponse::new(request.id, "INVALID_REQUEST", message);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match queries::stats::dashboard_stats(&pool, start, end).await {
            Ok(stats) => {
                let success = SuccessResponse::new(request.id, stats);
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;
            }
            Err(e) => {
                error!("Failed to compute dashboard stats: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
