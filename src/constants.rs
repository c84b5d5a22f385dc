// -
// Wire protocol

/// Separates fields inside one probe or response line
pub const WORD_SEPARATOR: char = '\u{2}';

/// Terminates one probe or response line
pub const LINE_SEPARATOR: char = '\u{1}';

/// Joins key, group and namespace into a group key
pub const GROUP_KEY_DELIMITER: char = '+';

/// Fingerprint of an entry whose content was never fetched
pub const NULL_FINGERPRINT: &str = "NULL";

/// Result code the server uses for success
pub const SUCCESS_CODE: &str = "0";

/// Result code the server uses for an unknown instance
pub const NOT_FOUND_CODE: &str = "A000404";

/// Result code used locally when a call could not be completed
pub const SERVICE_ERROR_CODE: &str = "B000001";

/// Health probe answer meaning the server is serving
pub const HEALTH_UP: &str = "UP";

// -
// Request fields

pub const PROBE_MODIFY_REQUEST: &str = "Listening-Configs";
pub const WEIGHT_CONFIGS: &str = "weightConfigs";

pub const LONG_PULLING_TIMEOUT: &str = "Long-Pulling-Timeout";
pub const LONG_PULLING_TIMEOUT_NO_HANGUP: &str = "Long-Pulling-Timeout-No-Hangup";
pub const LONG_PULLING_CLIENT_IDENTIFICATION: &str = "Long-Pulling-Client-Identification";

// -
// Paths, relative to the configured base path

pub const LISTENER_PATH: &str = "/configs/listener";
pub const CONFIG_CONTROLLER_PATH: &str = "/configs";
pub const REGISTER_PATH: &str = "/apps/register/";
pub const RENEW_PATH: &str = "/apps/renew";
pub const CLIENT_CLOSE_PATH: &str = "/client/close";
pub const HEALTH_CHECK_PATH: &str = "/health/check";
