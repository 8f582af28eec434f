//! Request localization: resolves the culture for each request and formats
//! numbers for display.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::LocalizationSettings;
use crate::error::{Result, SalesWebError};

/// Display format for dates in seller and sales pages (`dd/MM/yyyy`).
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Culture {
    pub name: &'static str,
    pub decimal_separator: char,
    pub group_separator: char,
    pub short_date_pattern: &'static str,
}

impl Culture {
    pub const EN_US: Culture = Culture {
        name: "en-US",
        decimal_separator: '.',
        group_separator: ',',
        short_date_pattern: "%m/%d/%Y",
    };

    pub const PT_BR: Culture = Culture {
        name: "pt-BR",
        decimal_separator: ',',
        group_separator: '.',
        short_date_pattern: "%d/%m/%Y",
    };

    /// Looks up a known culture by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Culture> {
        [Culture::EN_US, Culture::PT_BR]
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Fixed-point format without grouping, like `F2`.
    pub fn format_fixed(&self, value: f64, decimals: usize) -> String {
        let raw = format!("{value:.decimals$}");
        if self.decimal_separator == '.' {
            raw
        } else {
            raw.replace('.', &self.decimal_separator.to_string())
        }
    }

    /// Grouped number format, like `N2`.
    pub fn format_number(&self, value: f64, decimals: usize) -> String {
        let raw = format!("{:.decimals$}", value.abs());
        let (integer, fraction) = match raw.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (raw.as_str(), None),
        };

        let mut grouped = String::with_capacity(raw.len() + integer.len() / 3 + 1);
        if value < 0.0 && raw.chars().any(|c| c != '0' && c != '.') {
            grouped.push('-');
        }
        for (i, digit) in integer.chars().enumerate() {
            if i > 0 && (integer.len() - i) % 3 == 0 {
                grouped.push(self.group_separator);
            }
            grouped.push(digit);
        }
        if let Some(fraction) = fraction {
            grouped.push(self.decimal_separator);
            grouped.push_str(fraction);
        }
        grouped
    }

    /// Short date followed by a 24h time.
    pub fn format_datetime(&self, value: NaiveDateTime) -> String {
        format!("{} {}", value.format(self.short_date_pattern), value.format("%H:%M:%S"))
    }
}

impl Default for Culture {
    fn default() -> Self {
        Culture::EN_US
    }
}

/// Culture selected for the current request, stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestCulture {
    pub culture: Culture,
    pub ui_culture: Culture,
}

#[derive(Debug, Clone)]
pub struct RequestLocalizationOptions {
    pub default_culture: Culture,
    pub supported_cultures: Vec<Culture>,
    pub supported_ui_cultures: Vec<Culture>,
}

impl RequestLocalizationOptions {
    /// One culture used as default and as the only supported culture.
    pub fn single(culture: Culture) -> Self {
        Self {
            default_culture: culture.clone(),
            supported_cultures: vec![culture.clone()],
            supported_ui_cultures: vec![culture],
        }
    }

    pub fn from_settings(settings: &LocalizationSettings) -> Result<Self> {
        let lookup = |name: &str| {
            Culture::from_name(name)
                .ok_or_else(|| SalesWebError::Config(format!("Unknown culture '{name}'")))
        };
        let default_culture = lookup(&settings.default_culture)?;
        let supported = settings
            .supported_cultures
            .iter()
            .map(|name| lookup(name))
            .collect::<Result<Vec<_>>>()?;
        if !supported.contains(&default_culture) {
            return Err(SalesWebError::Config(format!(
                "Default culture '{}' is not in the supported cultures",
                default_culture.name
            )));
        }
        Ok(Self {
            default_culture,
            supported_cultures: supported.clone(),
            supported_ui_cultures: supported,
        })
    }

    /// Picks the culture for a request: the `culture` query value, then the
    /// `Accept-Language` entries in order, each only if supported; otherwise
    /// the default.
    pub fn resolve(&self, query_culture: Option<&str>, accept_language: Option<&str>) -> RequestCulture {
        let requested = query_culture
            .into_iter()
            .map(str::to_string)
            .chain(accept_language.into_iter().flat_map(parse_accept_language));

        let supported = |candidates: &[Culture], name: &str| {
            candidates
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
                .cloned()
        };

        let mut culture = None;
        let mut ui_culture = None;
        for name in requested {
            if culture.is_none() {
                culture = supported(&self.supported_cultures, &name);
            }
            if ui_culture.is_none() {
                ui_culture = supported(&self.supported_ui_cultures, &name);
            }
            if culture.is_some() && ui_culture.is_some() {
                break;
            }
        }

        RequestCulture {
            culture: culture.unwrap_or_else(|| self.default_culture.clone()),
            ui_culture: ui_culture.unwrap_or_else(|| self.default_culture.clone()),
        }
    }
}

/// Language tags from an `Accept-Language` header, highest quality first.
fn parse_accept_language(header: &str) -> Vec<String> {
    let mut tags: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = parts
                .find_map(|p| p.trim().strip_prefix("q=").and_then(|q| q.parse::<f32>().ok()))
                .unwrap_or(1.0);
            Some((tag.to_string(), quality))
        })
        .collect();
    tags.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    tags.into_iter().map(|(tag, _)| tag).collect()
}

#[derive(Debug, Deserialize)]
pub struct CultureQuery {
    culture: Option<String>,
}

/// Middleware: stores the resolved [`RequestCulture`] in the request and
/// reports it through `Content-Language`.
pub async fn localize(
    State(options): State<Arc<RequestLocalizationOptions>>,
    query: Option<Query<CultureQuery>>,
    mut req: Request<Body>,
    next: Next<Body>,
) -> Response {
    let accept_language = req
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let query_culture = query.and_then(|Query(q)| q.culture);

    let resolved = options.resolve(query_culture.as_deref(), accept_language.as_deref());
    let content_language = HeaderValue::from_static(resolved.ui_culture.name);
    req.extensions_mut().insert(resolved);

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .entry(header::CONTENT_LANGUAGE)
        .or_insert(content_language);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_amounts_like_en_us() {
        let c = Culture::EN_US;
        assert_eq!(c.format_fixed(3500.0, 2), "3500.00");
        assert_eq!(c.format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(c.format_number(999.0, 2), "999.00");
        assert_eq!(c.format_number(-1000.5, 2), "-1,000.50");
        assert_eq!(c.format_number(0.0, 0), "0");
    }

    #[test]
    fn formats_amounts_like_pt_br() {
        let c = Culture::PT_BR;
        assert_eq!(c.format_fixed(3500.0, 2), "3500,00");
        assert_eq!(c.format_number(1234567.891, 2), "1.234.567,89");
    }

    #[test]
    fn dates_follow_display_and_culture_patterns() {
        let date = NaiveDate::from_ymd_opt(2018, 9, 4).unwrap();
        assert_eq!(format_date(date), "04/09/2018");
        let at = date.and_hms_opt(14, 5, 0).unwrap();
        assert_eq!(Culture::EN_US.format_datetime(at), "09/04/2018 14:05:00");
        assert_eq!(Culture::PT_BR.format_datetime(at), "04/09/2018 14:05:00");
    }

    #[test]
    fn single_culture_ignores_requests_for_others() {
        let options = RequestLocalizationOptions::single(Culture::EN_US);
        let resolved = options.resolve(Some("pt-BR"), Some("pt-BR,pt;q=0.9"));
        assert_eq!(resolved.culture, Culture::EN_US);
        assert_eq!(resolved.ui_culture, Culture::EN_US);
    }

    #[test]
    fn picks_first_supported_requested_culture() {
        let options = RequestLocalizationOptions {
            default_culture: Culture::EN_US,
            supported_cultures: vec![Culture::EN_US, Culture::PT_BR],
            supported_ui_cultures: vec![Culture::EN_US, Culture::PT_BR],
        };
        let resolved = options.resolve(None, Some("fr-FR;q=1.0, pt-BR;q=0.8, en-US;q=0.5"));
        assert_eq!(resolved.culture, Culture::PT_BR);

        let resolved = options.resolve(Some("en-us"), Some("pt-BR"));
        assert_eq!(resolved.culture, Culture::EN_US);
    }

    #[test]
    fn settings_must_include_default_culture() {
        let settings = LocalizationSettings {
            default_culture: "pt-BR".into(),
            supported_cultures: vec!["en-US".into()],
        };
        assert!(RequestLocalizationOptions::from_settings(&settings).is_err());

        let settings = LocalizationSettings {
            default_culture: "en-US".into(),
            supported_cultures: vec!["en-US".into()],
        };
        let options = RequestLocalizationOptions::from_settings(&settings).unwrap();
        assert_eq!(options.supported_cultures, vec![Culture::EN_US]);
    }
}
