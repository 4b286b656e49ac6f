use std::env;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_LOG_FILE: &str = "settings_tui.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub api_key: Option<String>,
    pub debug: bool,
    pub log_file: String,
}

impl Config {
    /// Reads `.env`, then the environment, then command-line flags (later wins).
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        let args: Vec<String> = env::args().skip(1).collect();
        Self::from_sources(
            env::var("SETTINGS_API_URL").ok(),
            env::var("SETTINGS_API_KEY").ok(),
            &args,
        )
    }

    pub fn from_sources(api_url: Option<String>, api_key: Option<String>, args: &[String]) -> Self {
        let mut config = Config {
            api_url: api_url
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: api_key.filter(|k| !k.is_empty()),
            debug: false,
            log_file: DEFAULT_LOG_FILE.to_string(),
        };

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--debug" => config.debug = true,
                "--url" => {
                    if let Some(url) = iter.next() {
                        config.api_url = url.clone();
                    }
                }
                "--log-file" => {
                    if let Some(path) = iter.next() {
                        config.log_file = path.clone();
                    }
                }
                _ => {}
            }
        }
        config
    }

    pub fn integrations_url(&self) -> String {
        format!("{}/settings/integrations", self.api_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(None, None, &[]);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.api_key, None);
        assert!(!config.debug);
        assert_eq!(config.log_file, DEFAULT_LOG_FILE);
    }

    #[test]
    fn test_flags_override_env() {
        let config = Config::from_sources(
            Some("http://env:3000".into()),
            Some("".into()),
            &args(&["--debug", "--url", "https://app.example.com/", "--log-file", "x.log"]),
        );
        assert_eq!(config.api_url, "https://app.example.com/");
        assert_eq!(config.api_key, None);
        assert!(config.debug);
        assert_eq!(config.log_file, "x.log");
        assert_eq!(
            config.integrations_url(),
            "https://app.example.com/settings/integrations"
        );
    }
}
