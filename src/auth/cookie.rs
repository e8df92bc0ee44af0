//! Session cookie transport

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use time::OffsetDateTime;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "session_id";

/// Cookie value of the current request's session, if any
pub fn session_id_from(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
}

/// Cookie binding the browser to a new session
///
/// Expires together with the server-side session.
pub fn build_session_cookie(
    session_id: &str,
    expires_at: DateTime<Utc>,
    secure: bool,
) -> Cookie<'static> {
    let expires = OffsetDateTime::from_unix_timestamp(expires_at.timestamp())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);

    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .expires(expires)
        .build()
}

/// Empty cookie with an expiry in the past
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, String::new()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(0))
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn session_cookie_attributes() {
        let expires_at = Utc::now() + Duration::days(14);
        let cookie = build_session_cookie("abc", expires_at, true);

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(
            cookie.expires_datetime().map(|t| t.unix_timestamp()),
            Some(expires_at.timestamp())
        );
    }

    #[test]
    fn cleared_cookie_is_empty_and_expired() {
        let cookie = clear_session_cookie(false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert!(
            cookie
                .expires_datetime()
                .is_some_and(|t| t < OffsetDateTime::now_utc())
        );
    }

    #[test]
    fn empty_cookie_value_is_no_session() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, ""));
        assert_eq!(session_id_from(&jar), None);

        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "abc"));
        assert_eq!(session_id_from(&jar).as_deref(), Some("abc"));
    }
}
