//! Extractor giving plain axum handlers access to the container.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::HttpError;
use crate::container::{Container, RequestScope};
use crate::error::DiResult;
use crate::key::Key;

/// Request-scoped container access for handlers outside the controller table.
///
/// Requires the container to be installed as an `Extension<Container>` layer,
/// which [`Application`](crate::Application) does.
pub struct DiScope {
    scope: RequestScope,
}

impl DiScope {
    pub fn resolve<T: Send + Sync + 'static>(&self, key: impl Into<Key>) -> DiResult<Arc<T>> {
        self.scope.resolve(key)
    }

    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for DiScope
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let container = parts
            .extensions
            .get::<Container>()
            .ok_or_else(|| HttpError::internal("Container not found in request extensions"))?;
        Ok(DiScope {
            scope: container.create_scope(),
        })
    }
}
