//! Support and utility functions shared by the engine and the server.

use chrono::{DateTime, Duration, Utc};

/// How long a customer has to settle a gateway payment before it expires.
pub const PAYMENT_WINDOW_MINUTES: i64 = 60;

/// Builds the merchant order id sent to the payment gateway. The tenant id and transaction number make it unique
/// across cafés; the time suffix makes a retried payment for the same transaction distinguishable from the
/// original attempt.
pub fn new_merchant_order_id(tenant_id: i64, transaction_number: &str, now: DateTime<Utc>) -> String {
    format!("{tenant_id}-{transaction_number}-{}", now.format("%H%M%S"))
}

/// The deadline by which a payment created at `now` must be settled.
pub fn payment_deadline(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(PAYMENT_WINDOW_MINUTES)
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn merchant_order_id_format() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 14, 30, 5).unwrap();
        let id = new_merchant_order_id(3, "TRX-20240601-007", now);
        assert_eq!(id, "3-TRX-20240601-007-143005");
    }

    #[test]
    fn deadline_is_one_hour_out() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 14, 30, 5).unwrap();
        let deadline = payment_deadline(now);
        assert_eq!((deadline - now).num_minutes(), 60);
    }
}
