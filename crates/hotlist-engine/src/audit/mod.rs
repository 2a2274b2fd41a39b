pub mod hold_log;
