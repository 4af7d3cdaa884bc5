use tracing::warn;

use super::defaults::{
    default_max_body_bytes, default_request_timeout_ms, default_shutdown_timeout_ms, DEFAULT_IP,
    UNBOUNDED,
};
use super::types::{Config, ConsoleSettings, HttpConfig};

pub trait Validate {
    fn validate(&mut self);
}

impl Validate for ConsoleSettings {
    fn validate(&mut self) {
        if self.log_history_capacity < UNBOUNDED {
            warn!(
                "Invalid log_history_capacity: {}. Using unbounded (-1)",
                self.log_history_capacity
            );
            self.log_history_capacity = UNBOUNDED;
        }

        if self.command_history_capacity < UNBOUNDED {
            warn!(
                "Invalid command_history_capacity: {}. Using unbounded (-1)",
                self.command_history_capacity
            );
            self.command_history_capacity = UNBOUNDED;
        }
    }
}

impl Validate for HttpConfig {
    fn validate(&mut self) {
        if self.ip.trim().is_empty() || self.ip.parse::<std::net::IpAddr>().is_err() {
            warn!("Invalid http ip: '{}'. Using default: {}", self.ip, DEFAULT_IP);
            self.ip = DEFAULT_IP.to_string();
        }

        if self.request_timeout_ms == 0 {
            warn!("Invalid request_timeout_ms: 0. Using default: {}", default_request_timeout_ms());
            self.request_timeout_ms = default_request_timeout_ms();
        }

        if self.max_body_bytes == 0 {
            warn!("Invalid max_body_bytes: 0. Using default: {}", default_max_body_bytes());
            self.max_body_bytes = default_max_body_bytes();
        }

        if self.shutdown_timeout_ms == 0 {
            warn!(
                "Invalid shutdown_timeout_ms: 0. Using default: {}",
                default_shutdown_timeout_ms()
            );
            self.shutdown_timeout_ms = default_shutdown_timeout_ms();
        }
    }
}

impl Validate for Config {
    fn validate(&mut self) {
        self.console.validate();
        self.http.validate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repairs_bad_capacities() {
        let mut settings = ConsoleSettings {
            log_history_capacity: -7,
            command_history_capacity: -2,
            ..Default::default()
        };
        settings.validate();
        assert_eq!(settings.log_history_capacity, -1);
        assert_eq!(settings.command_history_capacity, -1);
    }

    #[test]
    fn test_keeps_valid_capacities() {
        let mut settings = ConsoleSettings {
            log_history_capacity: 500,
            command_history_capacity: 0,
            ..Default::default()
        };
        settings.validate();
        assert_eq!(settings.log_history_capacity, 500);
        assert_eq!(settings.command_history_capacity, 0);
    }

    #[test]
    fn test_repairs_http_values() {
        let mut http = HttpConfig {
            ip: "not an ip".to_string(),
            request_timeout_ms: 0,
            max_body_bytes: 0,
            ..Default::default()
        };
        http.validate();
        assert_eq!(http.ip, "0.0.0.0");
        assert_eq!(http.request_timeout_ms, 5_000);
        assert_eq!(http.max_body_bytes, 64 * 1024);
    }
}
