/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Whole minutes elapsed from `since` to `now` (both Unix millis), never negative
pub fn elapsed_minutes(since: i64, now: i64) -> i64 {
    ((now - since) / 60_000).max(0)
}

/// Whole minutes from `now` until `until` (both Unix millis); negative if already past
pub fn minutes_until(until: i64, now: i64) -> i64 {
    (until - now).div_euclid(60_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_minutes_floors_and_clamps() {
        assert_eq!(elapsed_minutes(0, 22 * 60_000 + 59_000), 22);
        assert_eq!(elapsed_minutes(60_000, 0), 0);
    }

    #[test]
    fn test_minutes_until() {
        assert_eq!(minutes_until(30 * 60_000, 0), 30);
        assert_eq!(minutes_until(0, 90_000), -2);
    }
}
