//! Session cookie construction

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const DEFAULT_COOKIE_NAME: &str = "auth_session";

/// How the session id is carried to the client
#[derive(Debug, Clone)]
pub struct CookieSettings {
    name: String,
    secure: bool,
}

impl CookieSettings {
    pub fn new(name: impl Into<String>, secure: bool) -> Self {
        Self {
            name: name.into(),
            secure,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session id presented by the client, if any
    pub fn session_id<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        jar.get(&self.name)
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
    }

    /// Cookie carrying a freshly issued session id
    pub fn session_cookie(&self, session_id: &str) -> Cookie<'static> {
        Cookie::build((self.name.clone(), session_id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }

    /// Clear the session cookie if the client sent one
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build((self.name.clone(), String::new())).path("/"))
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self::new(DEFAULT_COOKIE_NAME, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = CookieSettings::new("auth_session", true).session_cookie("abc123");
        assert_eq!(cookie.name(), "auth_session");
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_session_id_from_jar() {
        let settings = CookieSettings::default();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; auth_session=deadbeef"),
        );
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(settings.session_id(&jar), Some("deadbeef"));

        let empty = CookieJar::from_headers(&HeaderMap::new());
        assert_eq!(settings.session_id(&empty), None);
    }
}
