use serde::{Deserialize, Serialize};

/// Body the server sends alongside a non-2xx status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorResponse {
    /// Most specific human readable reason carried by the body, if any.
    pub fn reason(&self) -> Option<&str> {
        self.error_message
            .as_deref()
            .or(self.detail.as_deref())
            .or(self.response.as_deref())
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
    }
}
