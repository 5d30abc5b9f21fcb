//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `surtidor_core::defaults`.

use surtidor_core::defaults;

/// Generate default value functions that forward to surtidor_core::defaults
/// constants.
macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

default_fns! {
    default_input_timeout_secs       => DEFAULT_INPUT_TIMEOUT_SECS: u64,
    default_dispense_max_secs        => DEFAULT_DISPENSE_MAX_SECS: u64,
    default_validating_max_secs      => DEFAULT_VALIDATING_MAX_SECS: u64,
    default_notice_ms                => DEFAULT_NOTICE_MS: u64,
    default_format_notice_ms         => DEFAULT_FORMAT_NOTICE_MS: u64,
    default_tick_ms                  => DEFAULT_TICK_MS: u64,
    default_max_users                => DEFAULT_MAX_USERS: usize,
    default_sync_interval_secs       => DEFAULT_SYNC_INTERVAL_SECS: u64,
    default_sync_startup_delay_secs  => DEFAULT_SYNC_STARTUP_DELAY_SECS: u64,
    default_snapshot_timeout_secs    => DEFAULT_SNAPSHOT_HTTP_TIMEOUT_SECS: u64,
    default_version_timeout_secs     => DEFAULT_VERSION_HTTP_TIMEOUT_SECS: u64,
    default_utc_offset_mins          => DEFAULT_UTC_OFFSET_MINS: i32,
}
