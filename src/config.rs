use std::env;

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt_secret: String,
    /// Token lifetime in minutes.
    pub jwt_maxage: i64,
    pub token_header: String,
    /// Origins allowed by CORS; `*` allows any.
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = env::var("SERVER_PORT")
            .or_else(|_| env::var("PORT"))
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8000);

        let sqlite_path = env::var("SQLITE_PATH").unwrap_or_else(|_| "./data/blog.sqlite".to_string());
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(10);

        let jwt_secret = env::var("JWT_SECRET")
            .or_else(|_| env::var("JWT_SECRET_KEY"))
            .unwrap_or_else(|_| "dev-only-blog-secret".to_string());

        let jwt_maxage = env::var("JWT_MAXAGE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(60);

        let token_header = env::var("TOKEN_HEADER").unwrap_or_else(|_| "Authorization".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();

        Self {
            server_port,
            sqlite_path,
            database_url,
            max_connections,
            jwt_secret,
            jwt_maxage,
            token_header,
            cors_origins,
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}", path)
    }

    pub fn is_sqlite(&self) -> bool {
        self.database_url().starts_with("sqlite:")
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        self.lists_origin(origin) || self.cors_origins.iter().any(|o| o == "*")
    }

    /// True only for an origin named explicitly; a `*` entry does not count.
    pub fn lists_origin(&self, origin: &str) -> bool {
        self.cors_origins.iter().any(|o| o == origin)
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            server_port: 0,
            sqlite_path: String::new(),
            database_url: Some("sqlite::memory:".to_string()),
            max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            jwt_maxage: 60,
            token_header: "Authorization".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_path_becomes_url() {
        let mut config = AppConfig::for_tests();
        config.database_url = None;
        config.sqlite_path = "/tmp/blog.sqlite".to_string();
        assert_eq!(config.database_url(), "sqlite:///tmp/blog.sqlite");
        assert!(config.is_sqlite());
    }

    #[test]
    fn explicit_url_wins() {
        let mut config = AppConfig::for_tests();
        config.database_url = Some("postgres://blog@localhost/blog".to_string());
        assert_eq!(config.database_url(), "postgres://blog@localhost/blog");
        assert!(!config.is_sqlite());
    }

    #[test]
    fn origin_allow_list() {
        let mut config = AppConfig::for_tests();
        assert!(config.allows_origin("http://localhost:3000"));
        assert!(!config.allows_origin("http://evil.example"));
        config.cors_origins = vec!["*".to_string()];
        assert!(config.allows_origin("http://evil.example"));
        assert!(!config.lists_origin("http://evil.example"));
    }
}
