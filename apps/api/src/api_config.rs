use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use carelog_core::AppError;
use carelog_infrastructure::AuditRecorderSettings;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub environment: String,
    pub audit: AuditRecorderSettings,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let api_host = non_empty_env("API_HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let api_port = non_empty_env("API_PORT")
            .map(|value| {
                value
                    .parse::<u16>()
                    .map_err(|error| AppError::Configuration(format!("invalid API_PORT: {error}")))
            })
            .transpose()?
            .unwrap_or(8000);
        let environment = non_empty_env("ENVIRONMENT").unwrap_or_else(|| "development".to_owned());
        let audit = AuditRecorderSettings::from_env()?;

        Ok(Self {
            api_host,
            api_port,
            environment,
            audit,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Configuration(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use carelog_core::AppError;
    use carelog_infrastructure::AuditRecorderSettings;

    use super::ApiConfig;

    fn config(api_host: &str, api_port: u16) -> ApiConfig {
        ApiConfig {
            api_host: api_host.to_owned(),
            api_port,
            environment: "test".to_owned(),
            audit: AuditRecorderSettings::default(),
        }
    }

    #[test]
    fn socket_address_combines_host_and_port() {
        let address = config("127.0.0.1", 8000).socket_address();
        assert!(address.is_ok());
        assert_eq!(
            address.unwrap_or_else(|_| unreachable!()).to_string(),
            "127.0.0.1:8000"
        );
    }

    #[test]
    fn socket_address_rejects_hostnames() {
        let address = config("localhost", 8000).socket_address();
        assert!(matches!(address, Err(AppError::Configuration(_))));
    }
}
