use crate::auth::claims::Claims;

/// What the caller presented in the `Authorization` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credential {
    #[default]
    Missing,
    /// Header present but not `Bearer <token>`
    Malformed,
    Bearer(String),
}

impl Credential {
    /// Parse an `Authorization` header value.
    pub fn from_header(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Credential::Missing;
        };

        match value.trim().split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
                let token = token.trim();
                if token.is_empty() || token.contains(char::is_whitespace) {
                    Credential::Malformed
                } else {
                    Credential::Bearer(token.to_string())
                }
            }
            _ => Credential::Malformed,
        }
    }
}

/// Per-call authentication state threaded through every service layer.
///
/// Built by the transport with only a [`Credential`]; the authentication
/// layer hands a copy with resolved [`Claims`] to the layers below it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    credential: Credential,
    claims: Option<Claims>,
    request_id: Option<String>,
}

impl RequestContext {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            ..Self::default()
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(Credential::Bearer(token.into()))
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Copy of this context with validated claims attached.
    pub fn authenticated(&self, claims: Claims) -> Self {
        Self {
            claims: Some(claims),
            ..self.clone()
        }
    }

    /// Client id of the validated caller, if any.
    pub fn client_id(&self) -> Option<&str> {
        self.claims.as_ref().map(|c| c.client_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer_header() {
        assert_eq!(
            Credential::from_header(Some("Bearer abc.def.ghi")),
            Credential::Bearer("abc.def.ghi".to_string())
        );
        assert_eq!(
            Credential::from_header(Some("bearer   abc")),
            Credential::Bearer("abc".to_string())
        );
    }

    #[test]
    fn test_parse_missing_and_malformed() {
        assert_eq!(Credential::from_header(None), Credential::Missing);
        assert_eq!(Credential::from_header(Some("Bearer")), Credential::Malformed);
        assert_eq!(Credential::from_header(Some("Bearer ")), Credential::Malformed);
        assert_eq!(Credential::from_header(Some("Basic dXNlcjpwYXNz")), Credential::Malformed);
        assert_eq!(Credential::from_header(Some("Bearer a b")), Credential::Malformed);
    }

    #[test]
    fn test_authenticated_keeps_request_id() {
        let ctx = RequestContext::bearer("t").with_request_id("req-1");
        let claims = Claims::new("c1", None, 0, 240);
        let authed = ctx.authenticated(claims);

        assert_eq!(authed.client_id(), Some("c1"));
        assert_eq!(authed.request_id(), Some("req-1"));
        assert!(ctx.claims().is_none());
    }
}
