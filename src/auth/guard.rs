use std::ops::Deref;

use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use rocket_okapi::{
    gen::OpenApiGenerator,
    okapi::openapi3,
    request::{OpenApiFromRequest, RequestHeaderInput},
};

use crate::{auth::JwtService, db::models::UserProfile};

/// Request guard for an authenticated user. The profile comes from the
/// access token, sent as `Authorization: Bearer <token>` or as a `token`
/// query parameter (for WebSocket clients that can't set headers).
#[derive(Debug)]
pub struct CurrentUser(pub UserProfile);

impl Deref for CurrentUser {
    type Target = UserProfile;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Extract the raw token from a bearer `Authorization` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn request_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    if let Some(header) = req.headers().get_one("Authorization") {
        return bearer_token(header);
    }
    req.query_value::<&str>("token").and_then(Result::ok)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = &'r str;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(jwt) = req.rocket().state::<JwtService>() else {
            rocket::error!("Auth guard: token service not initialized");
            return Outcome::Error((Status::InternalServerError, "Server error"));
        };
        let Some(token) = request_token(req) else {
            return Outcome::Error((Status::Unauthorized, "Unauthorized"));
        };

        match jwt.verify(token) {
            Ok(profile) if profile.disabled => Outcome::Error((Status::Forbidden, "User disabled")),
            Ok(profile) => Outcome::Success(CurrentUser(profile)),
            Err(e) => {
                rocket::debug!("Auth guard: invalid token: {}", e);
                Outcome::Error((Status::Unauthorized, "Invalid token"))
            }
        }
    }
}

/// OpenAPI documentation for bearer token authentication
impl<'a> OpenApiFromRequest<'a> for CurrentUser {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        let security_scheme = openapi3::SecurityScheme {
            description: Some("Requires an access token from login or registration.".to_owned()),
            data: openapi3::SecuritySchemeData::Http {
                scheme: "bearer".to_owned(),
                bearer_format: Some("JWT".to_owned()),
            },
            extensions: openapi3::Object::default(),
        };
        let mut security_req = openapi3::SecurityRequirement::new();
        security_req.insert("Bearer".to_owned(), Vec::new());
        Ok(RequestHeaderInput::Security(
            "Bearer".to_owned(),
            security_scheme,
            security_req,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::bearer_token;

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(bearer_token("Basic dXNlcjpwdw=="), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token(""), None);
    }
}
