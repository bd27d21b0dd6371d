use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use chrono_tz::Tz;
use tracing::info;

#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("Invalid config line {}: {}", idx + 1, line));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value.to_string());
        }
        Ok(Self { values })
    }

    // Config file entries win over the process environment.
    pub fn get_prop(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| env::var(key).ok())
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub mail_provider: String,
    pub mail_api_key: String,
    pub from_email: String,
    pub from_name: String,
    pub default_recipient: String,
    pub copy_recipient: Option<String>,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub s3_bucket: String,
    pub places_file: PathBuf,
    pub cors_origins: Vec<String>,
    pub event_timezone: Tz,
}

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:5500,http://127.0.0.1:5500,http://localhost:3000";

impl Settings {
    pub fn load(config: &AppConfig) -> Result<Self, String> {
        let optional = |key: &str| config.get_prop(key);
        let required =
            |key: &str| config.get_prop(key).ok_or_else(|| format!("{} must be set", key));
        let defaulted = |key: &str, default: &str| {
            config.get_prop(key).unwrap_or_else(|| {
                info!("{} not set, using default: {}", key, default);
                default.to_string()
            })
        };

        let port = defaulted("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT value: {}", e))?;

        let mail_provider = defaulted("MAIL_PROVIDER", "unisender");
        let mail_api_key = match mail_provider.as_str() {
            "unisender" => required("UNISENDER_API_KEY")?,
            "sendgrid" => required("SENDGRID_API_KEY")?,
            "resend" => required("RESEND_API_KEY")?,
            other => return Err(format!("Unknown MAIL_PROVIDER: {}", other)),
        };

        let event_timezone = defaulted("EVENT_TIMEZONE", "Europe/Moscow")
            .parse::<Tz>()
            .map_err(|e| format!("Invalid EVENT_TIMEZONE: {}", e))?;

        let cors_origins = defaulted("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Settings {
            port,
            mail_provider,
            mail_api_key,
            from_email: required("MAIL_FROM_EMAIL")?,
            from_name: defaulted("MAIL_FROM_NAME", "Memories"),
            default_recipient: required("DEFAULT_RECIPIENT")?,
            copy_recipient: optional("COPY_RECIPIENT"),
            s3_endpoint: defaulted("S3_ENDPOINT", "https://storage.yandexcloud.net"),
            s3_region: defaulted("S3_REGION", "ru-central1"),
            s3_access_key: required("S3_ACCESS_KEY")?,
            s3_secret_key: required("S3_SECRET_KEY")?,
            s3_bucket: required("S3_BUCKET")?,
            places_file: PathBuf::from(defaulted("PLACES_FILE", "./data/places.json")),
            cors_origins,
            event_timezone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(lines: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.env");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(lines.as_bytes()).unwrap();
        (dir, path.to_string_lossy().to_string())
    }

    #[test]
    fn from_file_parses_exports_quotes_and_comments() {
        let (_dir, path) = write_config(
            "# comment\n\
             export S3_BUCKET=\"my-bucket\"\n\
             MAIL_FROM_EMAIL='from@example.com'\n\
             \n\
             PORT=8080\n",
        );
        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.get_prop("S3_BUCKET").unwrap(), "my-bucket");
        assert_eq!(config.get_prop("MAIL_FROM_EMAIL").unwrap(), "from@example.com");
        assert_eq!(config.get_prop("PORT").unwrap(), "8080");
    }

    #[test]
    fn from_file_rejects_invalid_lines() {
        let (_dir, path) = write_config("NOT A PAIR\n");
        assert!(AppConfig::from_file(&path).is_err());
    }

    #[test]
    fn settings_require_provider_key_and_s3_credentials() {
        let (_dir, path) = write_config(
            "UNISENDER_API_KEY=key\n\
             MAIL_FROM_EMAIL=from@example.com\n\
             DEFAULT_RECIPIENT=to@example.com\n\
             S3_ACCESS_KEY=ak\n\
             S3_SECRET_KEY=sk\n\
             S3_BUCKET=photos\n",
        );
        let config = AppConfig::from_file(&path).unwrap();
        let settings = Settings::load(&config).unwrap();

        assert_eq!(settings.port, 3000);
        assert_eq!(settings.mail_provider, "unisender");
        assert_eq!(settings.event_timezone, chrono_tz::Europe::Moscow);
        assert_eq!(settings.s3_bucket, "photos");
        assert!(settings.copy_recipient.is_none());
        assert!(settings.cors_origins.contains(&"http://localhost:5500".to_string()));
    }

    #[test]
    fn settings_reject_unknown_mail_provider() {
        let (_dir, path) = write_config(
            "MAIL_PROVIDER=pigeon\n\
             MAIL_FROM_EMAIL=from@example.com\n\
             DEFAULT_RECIPIENT=to@example.com\n\
             S3_ACCESS_KEY=ak\n\
             S3_SECRET_KEY=sk\n\
             S3_BUCKET=photos\n",
        );
        let config = AppConfig::from_file(&path).unwrap();
        let err = Settings::load(&config).unwrap_err();

        assert!(err.contains("MAIL_PROVIDER"));
    }
}
