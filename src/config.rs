use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Path of the report endpoint on the report service.
pub const REPORT_ENDPOINT_PATH: &str = "/api/pdf/generate";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub report_service_url: String,
    pub report_timeout_secs: u64,
    pub download_dir: PathBuf,
    /// Where the "no result" and "restart" actions send the user.
    pub assessment_entry_point: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            report_service_url: "http://127.0.0.1:8000".to_string(),
            report_timeout_secs: 60,
            download_dir: PathBuf::from("./reports"),
            assessment_entry_point: "/chat".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            port: match std::env::var("PORT") {
                Ok(port) => port
                    .parse()
                    .ok()
                    .filter(|p: &u16| *p > 0)
                    .ok_or_else(|| {
                        anyhow::anyhow!("PORT must be a valid number between 1-65535")
                    })?,
                Err(_) => defaults.port,
            },
            report_service_url: std::env::var("REPORT_SERVICE_URL")
                .map_or(Ok(defaults.report_service_url), validate_service_url)?,
            report_timeout_secs: match std::env::var("REPORT_TIMEOUT_SECS") {
                Ok(secs) => secs
                    .parse()
                    .ok()
                    .filter(|s: &u64| *s > 0)
                    .ok_or_else(|| {
                        anyhow::anyhow!("REPORT_TIMEOUT_SECS must be a positive number of seconds")
                    })?,
                Err(_) => defaults.report_timeout_secs,
            },
            download_dir: match std::env::var("REPORT_DOWNLOAD_DIR") {
                Ok(dir) => {
                    if dir.trim().is_empty() {
                        anyhow::bail!("REPORT_DOWNLOAD_DIR cannot be empty");
                    }
                    PathBuf::from(dir)
                }
                Err(_) => defaults.download_dir,
            },
            assessment_entry_point: std::env::var("ASSESSMENT_ENTRY_POINT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.assessment_entry_point),
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Report service URL: {}", config.report_service_url);
        tracing::debug!("Report timeout: {}s", config.report_timeout_secs);
        tracing::debug!("Download directory: {}", config.download_dir.display());
        tracing::debug!("Assessment entry point: {}", config.assessment_entry_point);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }

    /// Full URL of the report endpoint.
    pub fn report_endpoint(&self) -> String {
        format!(
            "{}{}",
            self.report_service_url.trim_end_matches('/'),
            REPORT_ENDPOINT_PATH
        )
    }
}

fn validate_service_url(raw: String) -> anyhow::Result<String> {
    if raw.trim().is_empty() {
        anyhow::bail!("REPORT_SERVICE_URL cannot be empty");
    }
    if !raw.starts_with("http://") && !raw.starts_with("https://") {
        anyhow::bail!("REPORT_SERVICE_URL must start with http:// or https://");
    }
    url::Url::parse(&raw)
        .map_err(|e| anyhow::anyhow!("REPORT_SERVICE_URL is not a valid URL: {}", e))?;
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_endpoint_joins_path() {
        let config = Config {
            report_service_url: "http://localhost:8000/".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.report_endpoint(),
            "http://localhost:8000/api/pdf/generate"
        );
    }

    #[test]
    fn test_url_validation() {
        assert!(validate_service_url("https://reports.example.com".to_string()).is_ok());
        assert!(validate_service_url("ftp://reports.example.com".to_string()).is_err());
        assert!(validate_service_url("   ".to_string()).is_err());
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(Config::default().report_timeout(), Duration::from_secs(60));
    }
}
