use chrono::NaiveDateTime;
use tally_core::ScopeKey;

/// `ddMMyy` followed by `HHmmss`.
pub const ADJUSTMENT_STAMP_FORMAT: &str = "%d%m%y%H%M%S";

/// Timestamp-based stock-adjustment code. No uniqueness check is made; two adjustments
/// under the same prefix within one second collide.
pub fn adjustment_code(key: &ScopeKey, at: NaiveDateTime) -> String {
    format!("{}{}", key.prefix(), at.format(ADJUSTMENT_STAMP_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn stamps_day_month_year_then_time() {
        let at = NaiveDate::from_ymd_opt(2025, 5, 1)
            .and_then(|day| day.and_hms_opt(14, 5, 32))
            .unwrap();
        let key = ScopeKey::scoped("H", 25, "ADJ");
        assert_eq!(adjustment_code(&key, at), "H25ADJ010525140532");
    }

    #[test]
    fn single_digit_fields_are_zero_padded() {
        let at = NaiveDate::from_ymd_opt(2026, 1, 9)
            .and_then(|day| day.and_hms_opt(3, 4, 5))
            .unwrap();
        let key = ScopeKey::scoped("K", 26, "ADJ");
        assert_eq!(adjustment_code(&key, at), "K26ADJ090126030405");
    }
}
