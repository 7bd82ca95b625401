use std::time::Duration;

pub const CONFIG_PATH: &str = "env.json";
pub const ENV_CONFIG_PATH: &str = "NOTES_CONFIG";
pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

// how often the refresh task looks at the session, and how early it refreshes
pub const REFRESH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
pub const REFRESH_MARGIN_SECS: i64 = 60;

pub static ALERT_DELETE_FAILED: &'static str = "Delete failed: ";
pub static ALERT_CHECK_EMAIL: &'static str = "Check your email for the login link!";
