mod append_log_test;
mod flush_test;
mod snapshot_test;
