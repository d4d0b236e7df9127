use std::env;

use chrono::NaiveTime;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expire_hours: i64,
    pub host: String,
    pub port: u16,
    /// Local wall-clock time of the daily plan sweep.
    pub daily_plan_time: NaiveTime,
    /// Users rebuilt concurrently during a sweep (1 = sequential).
    pub plan_sweep_concurrency: usize,
    /// Lowercased emails allowed to upload puzzles.
    pub admin_emails: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            jwt_secret: env::var("JWT_SECRET_KEY")
                .unwrap_or_else(|_| "dev-secret-key-change-in-production".to_string()),
            jwt_expire_hours: env::var("JWT_EXPIRE_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(168), // 7 days
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            daily_plan_time: env::var("DAILY_PLAN_TIME")
                .ok()
                .and_then(|v| parse_plan_time(&v))
                .unwrap_or_else(default_plan_time),
            plan_sweep_concurrency: env::var("PLAN_SWEEP_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(4),
            admin_emails: env::var("ADMIN_EMAILS")
                .map(|v| parse_admin_emails(&v))
                .unwrap_or_default(),
        }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }
}

/// Comma-separated list; blanks dropped, case folded.
pub fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// "HH:MM" in local time.
pub fn parse_plan_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

fn default_plan_time() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 5, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_time() {
        assert_eq!(parse_plan_time("00:05"), NaiveTime::from_hms_opt(0, 5, 0));
        assert_eq!(parse_plan_time(" 23:30 "), NaiveTime::from_hms_opt(23, 30, 0));
        assert_eq!(parse_plan_time("25:00"), None);
        assert_eq!(parse_plan_time("noon"), None);
        assert_eq!(default_plan_time(), NaiveTime::from_hms_opt(0, 5, 0).unwrap());
    }

    #[test]
    fn test_admin_emails() {
        assert_eq!(
            parse_admin_emails(" Admin@Woodpecker.dev, ,ops@woodpecker.dev"),
            vec!["admin@woodpecker.dev", "ops@woodpecker.dev"]
        );
        assert!(parse_admin_emails("").is_empty());

        let config = Config {
            database_url: String::new(),
            database_max_connections: 1,
            jwt_secret: String::new(),
            jwt_expire_hours: 1,
            host: String::new(),
            port: 0,
            daily_plan_time: default_plan_time(),
            plan_sweep_concurrency: 1,
            admin_emails: parse_admin_emails("admin@woodpecker.dev"),
        };
        assert!(config.is_admin("ADMIN@woodpecker.dev "));
        assert!(!config.is_admin("someone@woodpecker.dev"));
    }
}
