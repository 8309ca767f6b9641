use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    pub app_id: u64,
    pub private_key: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// Semgrep App token. Configuring one selects Pro mode; the token is
    /// handed to the scanner process, never logged.
    #[serde(default)]
    pub app_token: Option<String>,
}

/// Scanner profile, decided once at config load and passed down
/// explicitly rather than sniffed from the process environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Pro,
    Oss,
}

impl ScannerConfig {
    /// Token handed to the scanner process. An empty string counts as
    /// absent, so mode selection and the exported token always agree.
    pub fn token(&self) -> Option<&str> {
        self.app_token.as_deref().filter(|token| !token.is_empty())
    }

    pub fn mode(&self) -> ScanMode {
        if self.token().is_some() { ScanMode::Pro } else { ScanMode::Oss }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).expect("config should parse")
    }

    #[test]
    fn test_scan_mode_from_config() {
        let config = parse(
            "server:\n  port: 8080\ngithub:\n  app_id: 1\n  private_key: key\n  webhook_secret: secret\nscanner:\n  app_token: sgp_example\n",
        );
        assert_eq!(config.scanner.mode(), ScanMode::Pro);

        let config = parse(
            "server:\n  port: 8080\ngithub:\n  app_id: 1\n  private_key: key\n  webhook_secret: secret\n",
        );
        assert_eq!(config.scanner.mode(), ScanMode::Oss);
    }

    #[test]
    fn test_empty_token_is_oss() {
        let scanner = ScannerConfig { app_token: Some(String::new()) };
        assert_eq!(scanner.mode(), ScanMode::Oss);
        // The child process must not receive an empty token either.
        assert_eq!(scanner.token(), None);
    }

    #[test]
    fn test_token_matches_mode() {
        let scanner = ScannerConfig { app_token: Some("sgp_example".to_string()) };
        assert_eq!(scanner.mode(), ScanMode::Pro);
        assert_eq!(scanner.token(), Some("sgp_example"));
    }

    #[test]
    fn test_scanner_section_optional() {
        let config = parse(
            "server:\n  port: 8080\ngithub:\n  app_id: 1\n  private_key: key\n  webhook_secret: secret\n",
        );
        assert!(config.scanner.app_token.is_none());
    }
}
