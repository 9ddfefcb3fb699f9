use rocket::serde::json::Json;
use schemars::JsonSchema;
use serde::Serialize;

use crate::utils::Paginated;

/// Success envelope returned by every endpoint
#[derive(Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntity<T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

pub type ApiResult<T> = Json<ResultEntity<T>>;

impl<T> ResultEntity<T> {
    fn new(data: Option<T>) -> Self {
        Self {
            status: "SUCCESS",
            data,
            msg: None,
            total: None,
            token: None,
        }
    }

    pub fn success(data: T) -> Json<Self> {
        Json(Self::new(Some(data)))
    }

    /// Data together with a freshly issued access token
    pub fn with_token(data: T, token: String) -> Json<Self> {
        Json(Self {
            token: Some(token),
            ..Self::new(Some(data))
        })
    }

    pub fn message(msg: impl Into<String>) -> Json<Self> {
        Json(Self {
            msg: Some(msg.into()),
            ..Self::new(None)
        })
    }
}

impl<T> ResultEntity<Vec<T>> {
    pub fn page(page: Paginated<T>) -> Json<Self> {
        Json(Self {
            total: Some(page.total),
            ..Self::new(Some(page.items))
        })
    }

    pub fn list(items: Vec<T>) -> Json<Self> {
        Json(Self {
            total: Some(items.len() as i64),
            ..Self::new(Some(items))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope() {
        let json = serde_json::to_value(ResultEntity::success(1).into_inner()).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "SUCCESS", "data": 1 }));
    }

    #[test]
    fn page_envelope_has_total() {
        let page = Paginated {
            items: vec!["a", "b"],
            total: 7,
        };
        let json = serde_json::to_value(ResultEntity::page(page).into_inner()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "SUCCESS", "data": ["a", "b"], "total": 7 })
        );
    }

    #[test]
    fn token_envelope() {
        let json =
            serde_json::to_value(ResultEntity::with_token("user", "jwt".into()).into_inner())
                .unwrap();
        assert_eq!(json["token"], "jwt");
        assert_eq!(json["data"], "user");
    }

    #[test]
    fn message_envelope_has_no_data() {
        let json = serde_json::to_value(ResultEntity::<()>::message("ok").into_inner()).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "SUCCESS", "msg": "ok" }));
    }
}
