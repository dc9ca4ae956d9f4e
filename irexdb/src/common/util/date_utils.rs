/// Milliseconds since the Unix epoch.
pub fn current_time_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
