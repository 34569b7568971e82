//! Admin dashboard and sales reports.

use chrono::{DateTime, Days, NaiveDate, Utc};
use sqlx::PgPool;

use festiv_core::{ProductCategory, ReportPeriod};

use super::ServiceError;
use crate::db::reports;
use crate::models::report::{Dashboard, SalesReport};

/// Report service.
pub struct ReportService<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn dashboard(&self) -> Result<Dashboard, ServiceError> {
        Ok(reports::dashboard(self.pool, Utc::now()).await?)
    }

    /// Sales from `start` through `end`, both inclusive, as `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for unparseable dates or `end < start`.
    pub async fn sales_between(&self, start: &str, end: &str) -> Result<SalesReport, ServiceError> {
        let (from, to) = date_range(start, end)?;
        Ok(reports::sales(self.pool, from, to, None).await?)
    }

    /// Sales over the period ending now, optionally for one category.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn sales_for_period(
        &self,
        period: ReportPeriod,
        category: Option<ProductCategory>,
    ) -> Result<SalesReport, ServiceError> {
        let now = Utc::now();
        Ok(reports::sales(self.pool, period.start(now), now, category).await?)
    }
}

/// Turn an inclusive day range into a half-open UTC instant range.
fn date_range(start: &str, end: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    let parse = |s: &str| {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| ServiceError::Invalid(format!("invalid date {s:?}, expected YYYY-MM-DD")))
    };
    let start = parse(start)?;
    let end = parse(end)?;
    if end < start {
        return Err(ServiceError::Invalid("end date is before start date".to_owned()));
    }

    let end_exclusive = end
        .checked_add_days(Days::new(1))
        .ok_or_else(|| ServiceError::Invalid("end date out of range".to_owned()))?;

    Ok((
        start.and_time(chrono::NaiveTime::MIN).and_utc(),
        end_exclusive.and_time(chrono::NaiveTime::MIN).and_utc(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_date_range_is_inclusive_of_end_day() {
        let (from, to) = date_range("2024-03-01", "2024-03-31").unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_date_range_single_day() {
        let (from, to) = date_range("2024-12-31", "2024-12-31").unwrap();
        assert_eq!(to - from, chrono::Duration::days(1));
    }

    #[test]
    fn test_date_range_rejects_bad_input() {
        assert!(date_range("2024-13-01", "2024-12-31").is_err());
        assert!(date_range("01/03/2024", "2024-03-31").is_err());
        assert!(date_range("2024-03-31", "2024-03-01").is_err());
    }
}
