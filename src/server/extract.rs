use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::RelayError;

/// Query string as ordered key/value pairs. Repeated keys are kept, and
/// lookups return the first occurrence.
#[derive(Debug, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn first(&self, key: &str) -> Option<String> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = RelayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) =
            Query::<Vec<(String, String)>>::from_request_parts(parts, state).await?;
        Ok(QueryParams(pairs))
    }
}

/// `Path` whose rejections render as JSON errors.
#[derive(Debug)]
pub struct SessionPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for SessionPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RelayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(SessionPath(value))
    }
}

#[cfg(test)]
mod tests {
    use super::QueryParams;

    #[test]
    fn first_value_wins() {
        let params = QueryParams(vec![
            ("sdp".to_string(), "a".to_string()),
            ("mid".to_string(), "0".to_string()),
            ("sdp".to_string(), "b".to_string()),
        ]);
        assert_eq!(params.first("sdp").as_deref(), Some("a"));
        assert_eq!(params.first("mid").as_deref(), Some("0"));
        assert_eq!(params.first("candidate"), None);
    }
}
