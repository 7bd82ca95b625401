
pub static ROOT_AUTH: &'static str = "auth/v1";
pub static ROOT_REST: &'static str = "rest/v1";
pub static ROOT_REALTIME: &'static str = "realtime/v1/websocket";

pub static API_OTP: &'static str = "otp";
pub static API_VERIFY: &'static str = "verify";
pub static API_TOKEN: &'static str = "token";
pub static API_LOGOUT: &'static str = "logout";

pub static TABLE_NOTES: &'static str = "notes";
pub static TABLE_SCHEMA: &'static str = "public";

pub static COLUMN_ID: &'static str = "id";
pub static COLUMN_USER_ID: &'static str = "user_id";
pub static COLUMN_INSERTED_AT: &'static str = "inserted_at";

pub static HEADER_API_KEY: &'static str = "apikey";
pub static HEADER_PREFER: &'static str = "Prefer";
pub static PREFER_REPRESENTATION: &'static str = "return=representation";

pub static CHANNEL_NOTES: &'static str = "realtime:notes";
pub static CHANNEL_PHOENIX: &'static str = "phoenix";

pub static EVENT_JOIN: &'static str = "phx_join";
pub static EVENT_LEAVE: &'static str = "phx_leave";
pub static EVENT_REPLY: &'static str = "phx_reply";
pub static EVENT_ERROR: &'static str = "phx_error";
pub static EVENT_CLOSE: &'static str = "phx_close";
pub static EVENT_HEARTBEAT: &'static str = "heartbeat";
pub static EVENT_CHANGES: &'static str = "postgres_changes";
pub static EVENT_SYSTEM: &'static str = "system";

pub const REALTIME_VSN: &str = "1.0.0";
