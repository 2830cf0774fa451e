use chrono::{DateTime, Utc};
use service_core::models::CurrentPaymentCode;
use service_core::store::PaymentStore;
use service_core::surface::ConfigSurface;

/// Resolves the single "current" payment code.
///
/// The store is the source of truth: the newest pending record wins, provided
/// its expiry has not elapsed. Only that newest candidate is inspected; an
/// expired newest record means no store result, never a fall-through to an
/// older one. Store failures and misses fall back to the locally cached
/// current-code block and are never propagated to the caller.
#[derive(Clone)]
pub struct CodeResolver {
    store: PaymentStore,
    surface: ConfigSurface,
}

impl CodeResolver {
    pub fn new(store: PaymentStore, surface: ConfigSurface) -> Self {
        Self { store, surface }
    }

    pub async fn current_code(&self) -> Option<CurrentPaymentCode> {
        match self.store.newest_pending().await {
            Ok(Some(record)) => {
                if is_expired(&record.expiry_time, Utc::now()) {
                    tracing::warn!(unique_id = %record.unique_id, "Newest pending payment code has expired");
                    self.fallback().await
                } else {
                    tracing::info!(unique_id = %record.unique_id, "Found active payment code in the store");
                    Some(CurrentPaymentCode::from(&record))
                }
            }
            Ok(None) => {
                tracing::warn!("No pending payment codes in the store");
                self.fallback().await
            }
            Err(e) => {
                tracing::error!("Store unreachable while resolving payment code: {}", e);
                self.fallback().await
            }
        }
    }

    async fn fallback(&self) -> Option<CurrentPaymentCode> {
        match self.surface.read_current_code().await {
            Ok(Some(code)) => {
                tracing::info!(unique_id = %code.unique_id, "Using cached payment code from the config surface");
                Some(code)
            }
            Ok(None) => {
                tracing::warn!("No cached payment code on the config surface");
                None
            }
            Err(e) => {
                tracing::error!("Failed to read the config surface: {}", e);
                None
            }
        }
    }
}

/// Whether an RFC 3339 expiry lies strictly in the past. Unparseable or empty
/// values never expire a code; the caption still surfaces them verbatim.
pub fn is_expired(expiry_time: &str, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(expiry_time) {
        Ok(expiry) => now.with_timezone(expiry.offset()) > expiry,
        Err(e) => {
            if !expiry_time.is_empty() {
                tracing::warn!(expiry_time = %expiry_time, "Could not parse expiry time: {}", e);
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn future_expiry_is_not_expired() {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap();
        assert!(!is_expired("2026-08-01T10:30:00Z", now));
    }

    #[test]
    fn past_expiry_is_expired() {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 11, 0, 0).unwrap();
        assert!(is_expired("2026-08-01T10:30:00Z", now));
    }

    #[test]
    fn offset_timestamps_compare_as_instants() {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 5, 31, 0).unwrap();
        // 11:00 IST == 05:30 UTC, one minute in the past.
        assert!(is_expired("2026-08-01T11:00:00+05:30", now));
        // 11:02 IST == 05:32 UTC, one minute ahead.
        assert!(!is_expired("2026-08-01T11:02:00+05:30", now));
    }

    #[test]
    fn unparseable_or_empty_expiry_never_expires() {
        let now = Utc::now();
        assert!(!is_expired("", now));
        assert!(!is_expired("next tuesday", now));
    }
}
