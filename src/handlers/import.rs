//! CSV import handlers: batch submission and import log queries

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::services::import::ImportLogStore;
use crate::services::import_processor::ImportProcessor;
use crate::types::{
    CsvImportSubmitRequest, ErrorResponse, ImportLogGetRequest, ImportLogListRequest,
    ImportLogListResponse, ImportLogSummary, Request, SuccessResponse,
};

/// Logs returned when the request names no limit
pub const DEFAULT_LOG_LIMIT: i64 = 10;

/// Requested limit, defaulted and clamped to `1..=max`
pub fn effective_limit(requested: Option<i64>, max: i64) -> i64 {
    requested.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, max.max(1))
}

/// Handle swissairdry.import.csv.submit
pub async fn handle_submit(
    client: Client,
    mut subscriber: Subscriber,
    processor: Arc<ImportProcessor>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received import.csv.submit message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CsvImportSubmitRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse CSV import submit request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match processor.submit(request.payload).await {
            Ok(response) => {
                let success = SuccessResponse::new(request.id, response);
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;
            }
            Err(e) => {
                warn!("CSV import rejected: {}", e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle swissairdry.import.logs.list
pub async fn handle_logs_list(
    client: Client,
    mut subscriber: Subscriber,
    logs: Arc<dyn ImportLogStore>,
    limit_max: i64,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received import.logs.list message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ImportLogListRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let limit = effective_limit(request.payload.limit, limit_max);
        match logs.list_import_logs(limit).await {
            Ok(records) => {
                let logs: Vec<ImportLogSummary> = records.into_iter().map(Into::into).collect();
                let response = ImportLogListResponse {
                    count: logs.len(),
                    logs,
                };
                let success = SuccessResponse::new(request.id, response);
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;
            }
            Err(e) => {
                error!("Failed to list import logs: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle swissairdry.import.logs.get
pub async fn handle_logs_get(
    client: Client,
    mut subscriber: Subscriber,
    logs: Arc<dyn ImportLogStore>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received import.logs.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ImportLogGetRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match logs.get_import_log(request.payload.id).await {
            Ok(Some(log)) => {
                let success = SuccessResponse::new(request.id, log);
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;
            }
            Ok(None) => {
                let error = ErrorResponse::new(
                    request.id,
                    "NOT_FOUND",
                    format!("Import log {} not found", request.payload.id),
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to get import log: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit_defaults_to_ten() {
        assert_eq!(effective_limit(None, 100), 10);
    }

    #[test]
    fn test_effective_limit_is_clamped() {
        assert_eq!(effective_limit(Some(500), 100), 100);
        assert_eq!(effective_limit(Some(0), 100), 1);
        assert_eq!(effective_limit(Some(-3), 100), 1);
        assert_eq!(effective_limit(Some(25), 100), 25);
    }
}
