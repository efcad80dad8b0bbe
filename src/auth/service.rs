use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, error, info, warn};

use super::model::{ModelRegistry, UserModel};
use super::{AuthError, AuthUser};
use crate::config::Settings;
use crate::constructor::{Constructor, Injectable, ParamSpec};
use crate::key::Key;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD_LENGTH: usize = 12;
pub const BCRYPT_COST: u32 = 10;

const INTERNAL_ADMIN_ID: &str = "internal-admin";
const PASSWORD_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()";

/// Credential checks against the configured user model.
///
/// When no model is registered under the configured name, a single in-memory
/// admin account stands in for it.
pub struct AuthService {
    model: Option<Arc<dyn UserModel>>,
    settings: Arc<Settings>,
    internal_admin_hash: Mutex<Option<String>>,
}

impl Injectable for AuthService {
    fn constructor() -> Constructor {
        Constructor::of::<Self>(|args| {
            let registry = args.take::<ModelRegistry>(0)?;
            let settings = args.take::<Settings>(1)?;
            Ok(AuthService::new(&registry, settings))
        })
        .param(ParamSpec::class::<ModelRegistry>())
        .param(ParamSpec::class::<Settings>())
        .inject(0, Key::of::<ModelRegistry>())
        .inject(1, Key::of::<Settings>())
    }
}

impl AuthService {
    pub fn new(registry: &ModelRegistry, settings: Arc<Settings>) -> Self {
        let model = registry.get(&settings.auth_model_name);
        match &model {
            Some(_) => info!(model = %settings.auth_model_name, "using configured authentication model"),
            None => warn!(
                model = %settings.auth_model_name,
                "authentication model not registered, falling back to internal admin user"
            ),
        }
        Self {
            model,
            settings,
            internal_admin_hash: Mutex::new(None),
        }
    }

    pub fn uses_model(&self) -> bool {
        self.model.is_some()
    }

    /// Creates the default admin account if none exists.
    ///
    /// Returns the generated password when an account was created.
    pub async fn bootstrap_admin_user(&self) -> Result<Option<String>, AuthError> {
        let Some(model) = &self.model else {
            return self.bootstrap_internal_admin().await;
        };

        match self.bootstrap_with_model(model.as_ref()).await {
            Ok(created) => Ok(created),
            Err(err) => {
                error!(model = %self.settings.auth_model_name, error = %err, "admin bootstrap with configured model failed");
                self.bootstrap_internal_admin().await
            }
        }
    }

    async fn bootstrap_with_model(&self, model: &dyn UserModel) -> Result<Option<String>, AuthError> {
        let count = model.count().await?;
        info!(model = %self.settings.auth_model_name, count, "current user count");
        if count > 0 {
            return Ok(None);
        }

        let password = generate_random_password(ADMIN_PASSWORD_LENGTH);
        let hashed = hash_password(&password).await?;
        let fields = BTreeMap::from([
            (self.settings.auth_username_field.clone(), DEFAULT_ADMIN_USERNAME.to_string()),
            (self.settings.auth_password_field.clone(), hashed),
        ]);
        model.create(fields, vec!["admin".to_string()]).await?;
        warn!(username = DEFAULT_ADMIN_USERNAME, password = %password, "admin user created (for development only)");
        Ok(Some(password))
    }

    async fn bootstrap_internal_admin(&self) -> Result<Option<String>, AuthError> {
        if self.internal_admin_hash.lock().is_some() {
            info!("internal admin user already bootstrapped");
            return Ok(None);
        }

        let password = generate_random_password(ADMIN_PASSWORD_LENGTH);
        let hashed = hash_password(&password).await?;
        {
            let mut slot = self.internal_admin_hash.lock();
            if slot.is_some() {
                return Ok(None);
            }
            *slot = Some(hashed);
        }
        warn!(username = DEFAULT_ADMIN_USERNAME, password = %password, "internal admin user created (fallback)");
        Ok(Some(password))
    }

    /// Returns the user when `password` matches the stored hash for `username`.
    pub async fn validate_user(&self, username: &str, password: &str) -> Result<Option<AuthUser>, AuthError> {
        debug!(username, "validating user");
        if let Some(model) = &self.model {
            let Some(record) = model.find_one(&self.settings.auth_username_field, username).await? else {
                return Ok(None);
            };
            let Some(hashed) = record.get(&self.settings.auth_password_field) else {
                return Ok(None);
            };
            if !compare_password(password, hashed).await {
                return Ok(None);
            }
            let roles = (!record.roles.is_empty()).then(|| record.roles.clone());
            return Ok(Some(AuthUser {
                id: record.id.clone(),
                username: record
                    .get(&self.settings.auth_username_field)
                    .unwrap_or(username)
                    .to_string(),
                roles,
            }));
        }

        let hashed = self.internal_admin_hash.lock().clone();
        match hashed {
            Some(hashed) if username == DEFAULT_ADMIN_USERNAME => {
                if compare_password(password, &hashed).await {
                    Ok(Some(AuthUser {
                        id: INTERNAL_ADMIN_ID.to_string(),
                        username: DEFAULT_ADMIN_USERNAME.to_string(),
                        roles: Some(vec!["admin".to_string()]),
                    }))
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }
}

/// Random password drawn from letters, digits and `!@#$%^&*()`.
pub fn generate_random_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| PASSWORD_CHARS[rng.gen_range(0..PASSWORD_CHARS.len())] as char)
        .collect()
}

pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|err| AuthError::Task(err.to_string()))?
        .map_err(AuthError::from)
}

/// `false` on mismatch and on any hashing error.
pub async fn compare_password(password: &str, hashed: &str) -> bool {
    let password = password.to_string();
    let hashed = hashed.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed)).await {
        Ok(Ok(valid)) => valid,
        Ok(Err(err)) => {
            error!(error = %err, "password comparison failed");
            false
        }
        Err(err) => {
            error!(error = %err, "password comparison task failed");
            false
        }
    }
}
