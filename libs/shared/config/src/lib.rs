use std::env;
use tracing::warn;

/// Which persistence backend the appointment store runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Supabase,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" | "in-memory" => Some(StoreBackend::Memory),
            "supabase" | "postgrest" => Some(StoreBackend::Supabase),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub store_backend: StoreBackend,
    pub meeting_base_url: String,
    pub meeting_generation_attempts: u32,
    pub server_port: u16,
}

pub const DEFAULT_MEETING_BASE_URL: &str = "https://amae-clinic.video";
pub const DEFAULT_GENERATION_ATTEMPTS: u32 = 5;
pub const DEFAULT_SERVER_PORT: u16 = 3000;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            store_backend: StoreBackend::Memory,
            meeting_base_url: DEFAULT_MEETING_BASE_URL.to_string(),
            meeting_generation_attempts: DEFAULT_GENERATION_ATTEMPTS,
            server_port: DEFAULT_SERVER_PORT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            store_backend: env::var("APPOINTMENT_STORE")
                .ok()
                .and_then(|value| {
                    let parsed = StoreBackend::parse(&value);
                    if parsed.is_none() {
                        warn!("APPOINTMENT_STORE '{}' not recognised, using memory", value);
                    }
                    parsed
                })
                .unwrap_or(StoreBackend::Memory),
            meeting_base_url: env::var("MEETING_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("MEETING_BASE_URL not set, using default");
                    DEFAULT_MEETING_BASE_URL.to_string()
                }),
            meeting_generation_attempts: parse_or_default(
                "MEETING_GENERATION_ATTEMPTS",
                DEFAULT_GENERATION_ATTEMPTS,
            )
            .max(1),
            server_port: parse_or_default("SERVER_PORT", DEFAULT_SERVER_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
            && (self.store_backend == StoreBackend::Memory || self.is_supabase_configured())
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_or_default<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} '{}' is not valid, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_are_case_insensitive() {
        assert_eq!(StoreBackend::parse("Memory"), Some(StoreBackend::Memory));
        assert_eq!(StoreBackend::parse(" SUPABASE "), Some(StoreBackend::Supabase));
        assert_eq!(StoreBackend::parse("redis"), None);
    }

    #[test]
    fn memory_backend_only_needs_jwt_secret() {
        let config = AppConfig {
            supabase_jwt_secret: "secret".to_string(),
            ..AppConfig::default()
        };
        assert!(config.is_configured());

        let supabase = AppConfig {
            store_backend: StoreBackend::Supabase,
            ..config
        };
        assert!(!supabase.is_configured());
    }
}
