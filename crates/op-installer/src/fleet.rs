//! Fleet enrollment flags.

use op_common::config::FleetSettings;

/// Everything needed to enroll an agent into fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentConfig {
    /// Enrollment token issued for the agent policy.
    pub token: String,
    /// Fleet server the agent connects to.
    pub fleet: FleetSettings,
}

impl EnrollmentConfig {
    /// Creates an enrollment configuration for `token`.
    pub fn new(token: impl Into<String>, fleet: FleetSettings) -> Self {
        Self {
            token: token.into(),
            fleet,
        }
    }

    /// URL of the fleet server.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.fleet.host, self.fleet.port)
    }

    /// Command-line flags for `elastic-agent install` or `enroll`.
    ///
    /// Enrollment is forced and non-interactive, logs go to stderr, and
    /// the plain-HTTP fleet server is accepted.
    #[must_use]
    pub fn flags(&self) -> Vec<String> {
        vec![
            "-e".into(),
            "-v".into(),
            "--force".into(),
            "--insecure".into(),
            format!("--enrollment-token={}", self.token),
            format!("--url={}", self.url()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_carry_token_and_url() {
        let cfg = EnrollmentConfig::new("s3cr3t", FleetSettings::default());
        assert_eq!(
            cfg.flags(),
            vec![
                "-e",
                "-v",
                "--force",
                "--insecure",
                "--enrollment-token=s3cr3t",
                "--url=http://fleet-server:8220",
            ]
        );
    }

    #[test]
    fn url_uses_custom_settings() {
        let cfg = EnrollmentConfig::new(
            "t",
            FleetSettings {
                host: "localhost".into(),
                port: 9999,
            },
        );
        assert_eq!(cfg.url(), "http://localhost:9999");
    }
}
