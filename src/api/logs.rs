use super::{ApiError, BotClient};
use crate::domain::log_entry::sort_newest_first;
use crate::domain::LogEntry;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LogsReply {
    #[serde(default)]
    logs: Option<Vec<LogEntry>>,
    #[serde(default)]
    error: Option<String>,
}

impl BotClient {
    /// `GET /api/logs`, newest entry first.
    pub async fn list_logs(&self) -> Result<Vec<LogEntry>, ApiError> {
        let reply: LogsReply = self.get(self.endpoint(&["logs"])).await?;
        let mut logs = match reply {
            LogsReply { logs: Some(logs), .. } => logs,
            LogsReply { error: Some(error), .. } => return Err(ApiError::Rejected(error)),
            _ => return Err(ApiError::MissingField("logs")),
        };
        sort_newest_first(&mut logs);
        Ok(logs)
    }
}
