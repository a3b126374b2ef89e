use serde::Deserialize;

/// Longest accepted `JWT_TTL_MINUTES`: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

const DEFAULT_TTL_MINUTES: i64 = 60 * 24;

/// Deployment environment. Controls the `Secure` cookie flag and whether
/// raw error details are echoed to clients.
///
/// An unset or unrecognised `APP_ENV` is `Unspecified`: cookies are not
/// marked `Secure`, and error details stay hidden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    #[default]
    Unspecified,
}

impl Environment {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "development" | "dev" => Environment::Development,
            _ => Environment::Unspecified,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    /// Only an explicit development deployment echoes 5xx causes.
    pub fn exposes_error_detail(self) -> bool {
        self == Environment::Development
    }
}

/// Parses `JWT_TTL_MINUTES`. Missing, malformed or non-positive values fall
/// back to a day; large values are capped at [`MAX_TTL_MINUTES`].
pub fn parse_ttl_minutes(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v.min(MAX_TTL_MINUTES))
        .unwrap_or(DEFAULT_TTL_MINUTES)
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

impl JwtConfig {
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_minutes.clamp(0, MAX_TTL_MINUTES) * 60
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub environment: Environment,
    pub frontend_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "kodbank".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "kodbank-web".into()),
            ttl_minutes: parse_ttl_minutes(std::env::var("JWT_TTL_MINUTES").ok().as_deref()),
        };
        let environment = std::env::var("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or_default();
        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".into());
        Ok(Self {
            database_url,
            jwt,
            environment,
            frontend_url,
        })
    }

    /// Lifetime of both the signed token and the cookie carrying it.
    pub fn session_ttl_secs(&self) -> i64 {
        self.jwt.ttl_secs()
    }
}
