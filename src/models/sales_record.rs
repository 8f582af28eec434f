use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Seller;

/// Billing state of a sale. Stored as its integer discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleStatus {
    Pending = 0,
    Billed = 1,
    Canceled = 2,
}

impl TryFrom<i64> for SaleStatus {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SaleStatus::Pending),
            1 => Ok(SaleStatus::Billed),
            2 => Ok(SaleStatus::Canceled),
            other => Err(other),
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaleStatus::Pending => "Pending",
            SaleStatus::Billed => "Billed",
            SaleStatus::Canceled => "Canceled",
        };
        f.write_str(name)
    }
}

impl ToSql for SaleStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(*self as i64))
    }
}

impl FromSql for SaleStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        SaleStatus::try_from(raw).map_err(FromSqlError::OutOfRange)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    pub status: SaleStatus,
    pub seller_id: i64,
    #[serde(skip)]
    pub seller: Option<Seller>,
}

impl SalesRecord {
    pub fn new(id: i64, date: NaiveDate, amount: f64, status: SaleStatus, seller_id: i64) -> Self {
        Self {
            id,
            date,
            amount,
            status,
            seller_id,
            seller: None,
        }
    }

    pub fn within(&self, initial: NaiveDate, final_date: NaiveDate) -> bool {
        self.date >= initial && self.date <= final_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_discriminant() {
        for status in [SaleStatus::Pending, SaleStatus::Billed, SaleStatus::Canceled] {
            assert_eq!(SaleStatus::try_from(status as i64), Ok(status));
        }
        assert_eq!(SaleStatus::try_from(7), Err(7));
    }

    #[test]
    fn within_is_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2018, 9, day).unwrap();
        let record = SalesRecord::new(1, d(10), 100.0, SaleStatus::Billed, 1);
        assert!(record.within(d(10), d(10)));
        assert!(record.within(d(1), d(30)));
        assert!(!record.within(d(11), d(30)));
    }
}
