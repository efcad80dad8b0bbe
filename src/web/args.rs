//! Positional handler arguments assembled from parameter bindings.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use smallvec::SmallVec;
use validator::Validate;

use super::error::HttpError;
use super::reply::Reply;
use crate::metadata::{ParameterBinding, ParameterSource};

/// One bound handler argument.
#[derive(Clone)]
pub enum Arg {
    Path(String),
    Body(Value),
    Context(Reply),
}

impl std::fmt::Debug for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Path(v) => f.debug_tuple("Path").field(v).finish(),
            Arg::Body(v) => f.debug_tuple("Body").field(v).finish(),
            Arg::Context(_) => f.write_str("Context"),
        }
    }
}

/// Argument list passed to a controller handler.
///
/// Positions without a binding, and path parameters the request did not
/// carry, are empty.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use lightspring::metadata::MethodMetadata;
/// use lightspring::web::HandlerArgs;
/// use serde_json::json;
///
/// let meta = MethodMetadata::default().param("id", 0).body(1);
/// let params = HashMap::from([("id".to_string(), "abc".to_string())]);
/// let args = HandlerArgs::assemble(&meta.bindings(), &params, &json!({"title": "x"}), None);
///
/// assert_eq!(args.path(0).unwrap(), "abc");
/// assert_eq!(args.body_value(1), Some(&json!({"title": "x"})));
/// ```
#[derive(Debug, Default, Clone)]
pub struct HandlerArgs {
    values: SmallVec<[Option<Arg>; 4]>,
}

impl HandlerArgs {
    /// Applies `bindings` in order. Later bindings for the same index win.
    pub fn assemble(
        bindings: &[ParameterBinding],
        path_params: &HashMap<String, String>,
        body: &Value,
        reply: Option<&Reply>,
    ) -> Self {
        let mut values: SmallVec<[Option<Arg>; 4]> = SmallVec::new();
        for binding in bindings {
            if values.len() <= binding.index {
                values.resize(binding.index + 1, None);
            }
            values[binding.index] = match &binding.source {
                ParameterSource::Path(name) => path_params.get(name).cloned().map(Arg::Path),
                ParameterSource::Body => Some(Arg::Body(body.clone())),
                ParameterSource::Context => reply.cloned().map(Arg::Context),
            };
        }
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn path_opt(&self, index: usize) -> Option<&str> {
        match self.get(index) {
            Some(Arg::Path(value)) => Some(value),
            _ => None,
        }
    }

    pub fn path(&self, index: usize) -> Result<&str, HttpError> {
        self.path_opt(index)
            .ok_or_else(|| HttpError::bad_request(format!("Missing path parameter at position {}", index)))
    }

    pub fn body_value(&self, index: usize) -> Option<&Value> {
        match self.get(index) {
            Some(Arg::Body(value)) => Some(value),
            _ => None,
        }
    }

    /// Deserializes the body argument at `index`.
    pub fn body<T: DeserializeOwned>(&self, index: usize) -> Result<T, HttpError> {
        let value = self.body_value(index).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|err| HttpError::bad_request(err.to_string()))
    }

    /// Deserializes and validates the body argument at `index`.
    pub fn validated<T: DeserializeOwned + Validate>(&self, index: usize) -> Result<T, HttpError> {
        let body: T = self.body(index)?;
        body.validate()
            .map_err(|errors| HttpError::bad_request(errors.to_string()))?;
        Ok(body)
    }

    pub fn context(&self, index: usize) -> Result<Reply, HttpError> {
        match self.get(index) {
            Some(Arg::Context(reply)) => Ok(reply.clone()),
            _ => Err(HttpError::internal(format!("No reply bound at position {}", index))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MethodMetadata;
    use serde_json::json;

    #[test]
    fn unbound_positions_are_empty() {
        let meta = MethodMetadata::default().param("id", 2);
        let args = HandlerArgs::assemble(&meta.bindings(), &HashMap::new(), &Value::Null, None);
        assert_eq!(args.len(), 3);
        assert!(args.get(0).is_none());
        assert!(args.path_opt(2).is_none());
        assert_eq!(args.path(2).unwrap_err().status().as_u16(), 400);
    }

    #[test]
    fn body_wins_over_param_at_same_index() {
        let meta = MethodMetadata::default().param("id", 0).body(0);
        let params = HashMap::from([("id".to_string(), "7".to_string())]);
        let args = HandlerArgs::assemble(&meta.bindings(), &params, &json!(1), None);
        assert_eq!(args.body_value(0), Some(&json!(1)));
    }

    #[test]
    fn typed_body_rejects_wrong_shape() {
        #[derive(serde::Deserialize)]
        #[allow(dead_code)]
        struct Todo {
            title: String,
        }
        let meta = MethodMetadata::default().body(0);
        let args = HandlerArgs::assemble(&meta.bindings(), &HashMap::new(), &json!({"title": 3}), None);
        assert!(args.body::<Todo>(0).is_err());
    }
}
