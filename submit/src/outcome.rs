use crate::ui::NotificationKind;
use crate::ui::Ui;
use clientkit_transport::Response;
use clientkit_transport::TransportError;
use http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use std::fmt;

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Opaque identity of one submitted row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub String);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Why one request did not produce a usable response.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RowFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_id: Option<RowId>,
    /// Zero when no response arrived at all.
    pub status: u16,
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RowFailure {
    pub fn from_transport_error(row_id: Option<RowId>, err: &TransportError) -> Self {
        match err {
            TransportError::Http {
                status, url, body, ..
            } => Self {
                row_id,
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
                message: body.as_deref().and_then(server_message),
                url: url.clone(),
                body: body.clone(),
            },
            TransportError::Timeout => Self::without_response(row_id, "timeout"),
            other => Self::without_response(row_id, &other.to_string()),
        }
    }

    fn without_response(row_id: Option<RowId>, status_text: &str) -> Self {
        Self {
            row_id,
            status: 0,
            status_text: status_text.to_string(),
            message: None,
            url: None,
            body: None,
        }
    }

    fn malformed(row_id: Option<RowId>, response: &Response, err: &serde_json::Error) -> Self {
        let body = String::from_utf8_lossy(&response.body).into_owned();
        Self {
            row_id,
            status: response.status.as_u16(),
            status_text: "Malformed response".to_string(),
            message: Some(err.to_string()),
            url: None,
            body: Some(body),
        }
    }

    /// What to tell the user for statuses that carry a server explanation.
    pub fn display_message(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.status_text)
    }
}

/// Pulls a human readable message out of an error body.
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["Message", "message", "ExceptionMessage"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

/// Result of one request, reduced to the arguments its callbacks receive.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Succeeded(Vec<Value>),
    Failed {
        args: Vec<Value>,
        failure: RowFailure,
    },
}

impl Outcome {
    /// Success arguments are `[data]`, or `[data, [row id]]` for batch rows.
    /// Failure arguments are `[[failure]]`, or `[[failure], [row id]]`.
    pub fn classify(row_id: Option<RowId>, result: Result<Response, TransportError>) -> Self {
        let failure = match result {
            Ok(response) => match response.json::<Value>() {
                Ok(data) => {
                    let mut args = vec![data];
                    if let Some(row_id) = row_id {
                        args.push(json!([row_id]));
                    }
                    return Outcome::Succeeded(args);
                }
                Err(err) => RowFailure::malformed(row_id, &response, &err),
            },
            Err(err) => RowFailure::from_transport_error(row_id, &err),
        };
        let mut args = vec![json!([failure])];
        if let Some(row_id) = &failure.row_id {
            args.push(json!([row_id]));
        }
        Outcome::Failed { args, failure }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }
}

/// Standard reaction to a failed request, used unless a caller supplies its
/// own error handler.
pub fn default_error_response(ui: &dyn Ui, failure: &RowFailure) {
    tracing::debug!(
        status = failure.status,
        status_text = %failure.status_text,
        row_id = ?failure.row_id,
        "Request failed"
    );
    let status = StatusCode::from_u16(failure.status).ok();
    match status {
        // No response: the transport already logged it and there is nothing to show.
        None => {}
        Some(StatusCode::BAD_REQUEST)
        | Some(StatusCode::INTERNAL_SERVER_ERROR)
        | Some(StatusCode::SERVICE_UNAVAILABLE) => {
            ui.notify(failure.display_message(), NotificationKind::Error);
        }
        Some(StatusCode::UNAUTHORIZED) => {
            ui.notify(SESSION_EXPIRED_MESSAGE, NotificationKind::Error);
        }
        Some(_) => ui.notify(&failure.status_text, NotificationKind::Error),
    }
}
