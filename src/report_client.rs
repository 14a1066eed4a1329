use crate::config::Config;
use crate::errors::ReportError;
use crate::models::{ReportArtifact, ReportRequest};
use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use std::sync::OnceLock;
use std::time::Duration;

/// File name used when the service does not suggest one.
pub const DEFAULT_REPORT_FILENAME: &str = "AyurSutra_Report.pdf";

/// Client for the external report-rendering service.
#[derive(Clone)]
pub struct ReportServiceClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ReportServiceClient {
    /// Creates a client with the given request timeout.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Full URL of the report endpoint.
    /// * `timeout` - Upper bound on one whole exchange.
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::Transport(format!("Failed to create report client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &Config) -> Result<Self, ReportError> {
        Self::new(config.report_endpoint(), config.report_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Requests a report for `request`.
    ///
    /// # Returns
    ///
    /// * `Result<ReportArtifact, ReportError>` - The binary report and its suggested file name.
    pub async fn generate(&self, request: &ReportRequest) -> Result<ReportArtifact, ReportError> {
        tracing::info!(
            "Requesting report for {} from {}",
            request.user_data.name,
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Report service returned {}: {}", status, error_text);
            return Err(ReportError::Service {
                status: status.as_u16(),
                detail: service_detail(&error_text),
            });
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| DEFAULT_REPORT_FILENAME.to_string());
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReportError::Malformed(format!("failed to read report body: {}", e)))?;
        if bytes.is_empty() {
            return Err(ReportError::Malformed(
                "report service returned an empty document".to_string(),
            ));
        }

        tracing::info!("✓ Report received: {} ({} bytes)", file_name, bytes.len());
        Ok(ReportArtifact {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

/// Pulls a human-readable explanation out of an error body.
///
/// Understands `{"detail": "..."}`, `{"error": "..."}` and `{"message": "..."}`;
/// anything else yields `None` so the caller falls back to the generic reason.
fn service_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "error", "message"]
        .iter()
        .filter_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn quoted_filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*"([^"]*)""#).unwrap())
}

fn token_filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*([^";\s]+)"#).unwrap())
}

/// Extracts the suggested file name from a `Content-Disposition` value.
///
/// Returns `None` when the header has no usable name; the result is always a bare
/// file name with no directory components.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let raw = quoted_filename_regex()
        .captures(header)
        .or_else(|| token_filename_regex().captures(header))?
        .get(1)?
        .as_str();
    sanitize_filename(raw)
}

/// Reduces a suggested name to something safe to create in the download directory.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return None;
    }
    Some(cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ReportServiceClient::new(
            "https://example.com/api/pdf/generate".to_string(),
            Duration::from_secs(5),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_quoted_filename() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="Report_123.pdf""#),
            Some("Report_123.pdf".to_string())
        );
    }

    #[test]
    fn test_token_filename() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=Report_123.pdf"),
            Some("Report_123.pdf".to_string())
        );
    }

    #[test]
    fn test_extended_filename_alone_is_ignored() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"),
            None
        );
    }

    #[test]
    fn test_malformed_header() {
        assert_eq!(filename_from_content_disposition("attachment"), None);
        assert_eq!(filename_from_content_disposition(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_path_components_are_stripped() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="../../etc/passwd""#),
            Some("passwd".to_string())
        );
        assert_eq!(sanitize_filename(r"C:\reports\Asha.pdf"), Some("Asha.pdf".to_string()));
        assert_eq!(sanitize_filename(".."), None);
    }

    #[test]
    fn test_service_detail_extraction() {
        assert_eq!(
            service_detail(r#"{"detail": "dosha_results missing"}"#),
            Some("dosha_results missing".to_string())
        );
        assert_eq!(service_detail(r#"{"error": "  "}"#), None);
        assert_eq!(service_detail("Internal Server Error"), None);
    }
}
