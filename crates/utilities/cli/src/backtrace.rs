//! Helper to set the backtrace env var.

use std::sync::Once;

static INIT: Once = Once::new();

/// Sets `RUST_BACKTRACE=1` unless a value is already set.
///
/// Must be called at the very start of `main`, before any other thread is spawned.
pub fn enable() {
    INIT.call_once(|| {
        if std::env::var_os("RUST_BACKTRACE").is_none() {
            // SAFETY: called once before the runtime and any other thread start.
            unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_keeps_a_set_value() {
        let before = std::env::var_os("RUST_BACKTRACE");
        enable();
        let after = std::env::var_os("RUST_BACKTRACE");
        match before {
            Some(value) => assert_eq!(after, Some(value)),
            None => assert_eq!(after.as_deref(), Some("1".as_ref())),
        }
    }
}
