use axum::extract::Query;
use axum::response::Response;
use chrono::{Datelike, Local, NaiveDate};
use serde::Deserialize;

use crate::error::AppError;
use crate::services::SalesRecordService;
use crate::templates::{
    input_date, render, GroupingSearchTemplate, SalesGroupView, SalesRecordRow,
    SalesRecordsIndexTemplate, SimpleSearchTemplate, ViewContext, INPUT_DATE_FORMAT,
};

/// `minDate` / `maxDate` query values. Blank or malformed dates count as
/// missing.
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    #[serde(rename = "minDate")]
    min_date: Option<String>,
    #[serde(rename = "maxDate")]
    max_date: Option<String>,
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, INPUT_DATE_FORMAT).ok())
}

impl DateRangeQuery {
    /// Missing `minDate` is January 1 of `today`'s year, missing `maxDate`
    /// is `today`.
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let min = parse_date(self.min_date.as_deref())
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today));
        let max = parse_date(self.max_date.as_deref()).unwrap_or(today);
        (min, max)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn index(view: ViewContext) -> Result<Response, AppError> {
    let (min, max) = DateRangeQuery::default().resolve(today());
    render(SalesRecordsIndexTemplate {
        page: view.page("Sales Records"),
        min_date: input_date(min),
        max_date: input_date(max),
    })
}

pub async fn simple_search(
    view: ViewContext,
    service: SalesRecordService,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, AppError> {
    let (min, max) = query.resolve(today());
    let records = service.find_by_date(Some(min), Some(max)).await?;
    let total: f64 = records.iter().map(|r| r.amount).sum();
    render(SimpleSearchTemplate {
        page: view.page("Simple Search"),
        min_date: input_date(min),
        max_date: input_date(max),
        records: records.iter().map(|r| SalesRecordRow::new(r, &view)).collect(),
        total: view.total(total),
    })
}

pub async fn grouping_search(
    view: ViewContext,
    service: SalesRecordService,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, AppError> {
    let (min, max) = query.resolve(today());
    let groups = service.find_by_date_grouping(Some(min), Some(max)).await?;
    let groups = groups
        .iter()
        .map(|g| SalesGroupView {
            department: g.department.name.clone(),
            total: view.total(g.total()),
            records: g.records.iter().map(|r| SalesRecordRow::new(r, &view)).collect(),
        })
        .collect();
    render(GroupingSearchTemplate {
        page: view.page("Grouping Search"),
        generated_at: view.culture.format_datetime(Local::now().naive_local()),
        min_date: input_date(min),
        max_date: input_date(max),
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn missing_bounds_default_to_current_year() {
        let today = date(2024, 6, 15);
        let query = DateRangeQuery::default();
        assert_eq!(query.resolve(today), (date(2024, 1, 1), today));
    }

    #[test]
    fn blank_or_bad_dates_are_ignored() {
        let today = date(2024, 6, 15);
        let query = DateRangeQuery {
            min_date: Some("".into()),
            max_date: Some("not-a-date".into()),
        };
        assert_eq!(query.resolve(today), (date(2024, 1, 1), today));

        let query = DateRangeQuery {
            min_date: Some("2018-09-01".into()),
            max_date: Some("2018-09-30".into()),
        };
        assert_eq!(query.resolve(today), (date(2018, 9, 1), date(2018, 9, 30)));
    }
}
