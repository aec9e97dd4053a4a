/// Shared constants

/// Prefix for environment overrides, e.g. `LEADFLOW__APOLLO__API_KEY`
pub const ENV_PREFIX: &str = "LEADFLOW";

/// Path of the open-tracking pixel endpoint
pub const TRACK_OPEN_PATH: &str = "/api/track/open";

/// Path of the click-tracking redirect endpoint
pub const TRACK_CLICK_PATH: &str = "/api/track/click";

/// Organization search endpoint, relative to the Apollo base URL
pub const APOLLO_SEARCH_PATH: &str = "/api/v1/organizations/search";

/// Upstream hard limit for page size
pub const APOLLO_MAX_PER_PAGE: u32 = 100;

/// Seconds in a UTC day; windows never adjust for DST
pub const SECONDS_PER_DAY: i64 = 86_400;
