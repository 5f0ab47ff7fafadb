// Extra timer logging
#[macro_export]
#[cfg(feature = "detailed_timers")]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        saying::say!($msg, Green #$time.elapsed());
    };
}

#[macro_export]
#[cfg(not(feature = "detailed_timers"))]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        // Nothing
    };
}

// SCHEMA LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_schema")]
macro_rules! schema_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_schema"))]
macro_rules! schema_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// DATAFLOW LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_dataflow")]
macro_rules! dataflow_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_dataflow"))]
macro_rules! dataflow_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}
