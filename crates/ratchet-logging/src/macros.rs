//! ---
//! ratchet_section: "05-observability"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Context-enriched logging macros."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
#[doc(hidden)]
#[macro_export]
macro_rules! __ratchet_event {
    ($lvl:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $lvl,
            run_id = ctx.run_id.unwrap_or(""),
            script = ctx.script.unwrap_or(""),
            run_order = ctx.run_order.unwrap_or_default(),
            mode = ctx.mode.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with run context.
#[macro_export]
macro_rules! ratchet_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ratchet_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ratchet_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with run context.
#[macro_export]
macro_rules! ratchet_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ratchet_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ratchet_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with run context.
#[macro_export]
macro_rules! ratchet_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ratchet_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ratchet_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with run context.
#[macro_export]
macro_rules! ratchet_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ratchet_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ratchet_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
