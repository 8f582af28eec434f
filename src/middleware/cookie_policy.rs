//! Cookie consent and SameSite enforcement.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

pub const CONSENT_COOKIE_NAME: &str = ".AspNet.Consent";
/// Cookie written by the consent banner script once the user accepts.
pub const CONSENT_COOKIE_STRING: &str = ".AspNet.Consent=yes; max-age=31536000; path=/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SameSiteMode {
    None,
    Lax,
    Strict,
}

impl SameSiteMode {
    fn attribute(self) -> &'static str {
        match self {
            SameSiteMode::None => "none",
            SameSiteMode::Lax => "lax",
            SameSiteMode::Strict => "strict",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(SameSiteMode::None),
            "lax" => Some(SameSiteMode::Lax),
            "strict" => Some(SameSiteMode::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CookiePolicyOptions {
    pub check_consent_needed: bool,
    pub minimum_same_site: SameSiteMode,
}

impl CookiePolicyOptions {
    /// Consent state for a request carrying `headers`.
    pub fn consent_for(&self, headers: &HeaderMap) -> CookieConsent {
        CookieConsent {
            needed: self.check_consent_needed,
            granted: has_consent_cookie(headers),
        }
    }
}

impl Default for CookiePolicyOptions {
    fn default() -> Self {
        Self {
            check_consent_needed: true,
            minimum_same_site: SameSiteMode::None,
        }
    }
}

/// Consent state of the current request, stored in request extensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CookieConsent {
    pub needed: bool,
    pub granted: bool,
}

impl CookieConsent {
    pub fn can_track(&self) -> bool {
        !self.needed || self.granted
    }
}

fn has_consent_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(name, value)| name == CONSENT_COOKIE_NAME && value == "yes")
}

fn cookie_name(set_cookie: &str) -> &str {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(name, _)| name.trim())
        .unwrap_or_default()
}

fn is_essential(set_cookie: &str) -> bool {
    cookie_name(set_cookie) == CONSENT_COOKIE_NAME
}

/// Raises the `SameSite` attribute of a `Set-Cookie` value to `minimum`.
/// A `None` minimum leaves the cookie as it is.
pub fn enforce_same_site(set_cookie: &str, minimum: SameSiteMode) -> String {
    if minimum == SameSiteMode::None {
        return set_cookie.to_string();
    }

    let mut found = false;
    let parts: Vec<String> = set_cookie
        .split(';')
        .map(|part| {
            let trimmed = part.trim();
            match trimmed.split_once('=') {
                Some((key, value)) if key.trim().eq_ignore_ascii_case("samesite") => {
                    found = true;
                    match SameSiteMode::parse(value) {
                        Some(current) if current >= minimum => trimmed.to_string(),
                        _ => format!("samesite={}", minimum.attribute()),
                    }
                }
                _ => trimmed.to_string(),
            }
        })
        .collect();

    let mut cookie = parts.join("; ");
    if !found {
        cookie.push_str("; samesite=");
        cookie.push_str(minimum.attribute());
    }
    cookie
}

fn apply_policy(headers: &mut HeaderMap, options: &CookiePolicyOptions, consent: CookieConsent) {
    let cookies: Vec<HeaderValue> = headers.get_all(header::SET_COOKIE).iter().cloned().collect();
    if cookies.is_empty() {
        return;
    }
    headers.remove(header::SET_COOKIE);

    for value in cookies {
        let Ok(raw) = value.to_str() else {
            headers.append(header::SET_COOKIE, value);
            continue;
        };
        if !consent.can_track() && !is_essential(raw) {
            debug!(cookie = cookie_name(raw), "Dropping non-essential cookie without consent");
            continue;
        }
        let enforced = enforce_same_site(raw, options.minimum_same_site);
        match HeaderValue::from_str(&enforced) {
            Ok(v) => headers.append(header::SET_COOKIE, v),
            Err(_) => headers.append(header::SET_COOKIE, value),
        };
    }
}

/// Middleware: resolves [`CookieConsent`] for the request and filters the
/// cookies the response tries to set.
pub async fn cookie_policy(
    State(options): State<CookiePolicyOptions>,
    mut req: Request<Body>,
    next: Next<Body>,
) -> Response {
    let consent = options.consent_for(req.headers());
    req.extensions_mut().insert(consent);

    let mut response = next.run(req).await;
    apply_policy(response.headers_mut(), &options, consent);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_cookies(headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn detects_consent_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; .AspNet.Consent=yes"));
        assert!(has_consent_cookie(&headers));

        headers.insert(header::COOKIE, HeaderValue::from_static(".AspNet.Consent=no"));
        assert!(!has_consent_cookie(&headers));
    }

    #[test]
    fn consent_follows_options_and_cookie() {
        let mut headers = HeaderMap::new();
        let options = CookiePolicyOptions::default();
        assert_eq!(options.consent_for(&headers), CookieConsent { needed: true, granted: false });

        headers.insert(header::COOKIE, HeaderValue::from_static(".AspNet.Consent=yes"));
        assert!(options.consent_for(&headers).can_track());

        let relaxed = CookiePolicyOptions {
            check_consent_needed: false,
            ..CookiePolicyOptions::default()
        };
        assert!(relaxed.consent_for(&HeaderMap::new()).can_track());
    }

    #[test]
    fn strips_tracking_cookies_until_consent() {
        let options = CookiePolicyOptions::default();
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("tracker=1; path=/"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static(CONSENT_COOKIE_STRING));

        let mut without = headers.clone();
        apply_policy(&mut without, &options, CookieConsent { needed: true, granted: false });
        assert_eq!(set_cookies(&without), vec![CONSENT_COOKIE_STRING.to_string()]);

        apply_policy(&mut headers, &options, CookieConsent { needed: true, granted: true });
        assert_eq!(set_cookies(&headers).len(), 2);
    }

    #[test]
    fn same_site_is_raised_to_minimum() {
        assert_eq!(enforce_same_site("a=1; path=/", SameSiteMode::None), "a=1; path=/");
        assert_eq!(
            enforce_same_site("a=1; path=/", SameSiteMode::Lax),
            "a=1; path=/; samesite=lax"
        );
        assert_eq!(
            enforce_same_site("a=1; SameSite=None", SameSiteMode::Strict),
            "a=1; samesite=strict"
        );
        assert_eq!(
            enforce_same_site("a=1; SameSite=Strict", SameSiteMode::Lax),
            "a=1; SameSite=Strict"
        );
    }
}
