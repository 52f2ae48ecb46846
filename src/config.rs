use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub production: bool,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub inference: InferenceConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let production = std::env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            username: std::env::var("EMAIL_USER")?,
            password: std::env::var("EMAIL_PASS")?,
            from_address: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "PLANTIDEN <noreply@plantiden.com>".into()),
        };
        let inference = InferenceConfig {
            api_key: std::env::var("TOGETHER_API_KEY")?,
            base_url: std::env::var("TOGETHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.together.xyz".into()),
            model: std::env::var("TOGETHER_MODEL")
                .unwrap_or_else(|_| "meta-llama/Llama-3.2-11B-Vision-Instruct-Turbo".into()),
            timeout_secs: std::env::var("TOGETHER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };
        Ok(Self {
            database_url,
            production,
            jwt,
            smtp,
            inference,
        })
    }
}
