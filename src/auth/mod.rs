//! Token authentication: JWT issuing, user validation, request guards.

use thiserror::Error;

mod controller;
mod middleware;
mod model;
mod service;
mod token;

pub use controller::{AuthController, LoginDto, TOKEN_TTL};
pub use middleware::{authenticate, authorize, blocklist_key, AuthState, LOGIN_PAGE, TOKEN_COOKIE};
pub use model::{MemoryUserModel, ModelRegistry, UserModel, UserRecord};
pub use service::{
    compare_password, generate_random_password, hash_password, AuthService, ADMIN_PASSWORD_LENGTH,
    DEFAULT_ADMIN_USERNAME,
};
pub use token::{Claims, TokenService};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("user model error: {0}")]
    Model(String),
    #[error("background task failed: {0}")]
    Task(String),
}

/// A user that passed credential validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub roles: Option<Vec<String>>,
}
