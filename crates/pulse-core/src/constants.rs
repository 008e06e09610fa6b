//! Package-level constants.

/// Current version of the Pulse client (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "pulse";

/// Path of the notification endpoint, appended to the derived host.
pub const NOTIFICATION_PATH: &str = "/api/ws/notifications";

/// Query parameter carrying the auth token.
pub const TOKEN_QUERY_PARAM: &str = "token";
