use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use validator::Validate;

use super::middleware::{blocklist_key, TOKEN_COOKIE};
use super::{AuthService, TokenService};
use crate::cache::CacheHandle;
use crate::config::Settings;
use crate::constructor::{Constructor, ParamSpec};
use crate::controller::{json, unknown_handler, Controller, HandlerResult};
use crate::metadata::{ClassMetadata, RouteOptions};
use crate::web::{HandlerArgs, HttpError};

pub const TOKEN_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize, Validate)]
pub struct LoginDto {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Login and logout endpoints under `/auth`.
pub struct AuthController {
    auth: Arc<AuthService>,
    tokens: Arc<TokenService>,
    cache: Arc<CacheHandle>,
    settings: Arc<Settings>,
}

impl AuthController {
    async fn login(&self, args: HandlerArgs) -> HandlerResult {
        let dto: LoginDto = args.body(0)?;
        let reply = args.context(1)?;

        let user = self
            .auth
            .validate_user(&dto.username, &dto.password)
            .await
            .map_err(|err| HttpError::internal(err.to_string()))?
            .ok_or_else(|| HttpError::unauthorized("Invalid credentials"))?;

        let token = self
            .tokens
            .sign(&user, TOKEN_TTL)
            .map_err(|err| HttpError::internal(err.to_string()))?;

        let cookie = Cookie::build((TOKEN_COOKIE, token))
            .http_only(true)
            .secure(self.settings.is_production())
            .path("/")
            .same_site(SameSite::Strict)
            .build();
        reply.set_cookie(cookie);
        info!(username = %user.username, "login successful");

        json(json!({ "message": "Login successful" }))
    }

    async fn logout(&self, args: HandlerArgs) -> HandlerResult {
        let reply = args.context(0)?;

        if let (Some(token), Some(client)) = (reply.request().cookie(TOKEN_COOKIE), self.cache.client()) {
            match self.tokens.verify(&token) {
                Ok(claims) => {
                    let ttl = claims.remaining();
                    if ttl > 0 {
                        if let Err(err) = client
                            .set_ex(&blocklist_key(&token), Duration::from_secs(ttl), "blocked".to_string())
                            .await
                        {
                            error!(error = %err, "adding token to blocklist failed");
                        }
                    }
                }
                Err(err) => error!(error = %err, "adding token to blocklist failed"),
            }
        }

        reply.clear_cookie(TOKEN_COOKIE, "/");
        json(json!({ "message": "Logout successful" }))
    }
}

#[async_trait]
impl Controller for AuthController {
    fn metadata() -> ClassMetadata {
        ClassMetadata::of::<Self>()
            .controller("/auth")
            .post_with(
                "/login",
                "login",
                RouteOptions::new().summary("User login").tags(["Auth"]).body("LoginDto"),
            )
            .post_with("/logout", "logout", RouteOptions::new().summary("User logout").tags(["Auth"]))
            .method("login", |m| m.body_typed::<LoginDto>(0).validated::<LoginDto>(0).ctx(1))
            .method("logout", |m| m.ctx(0))
    }

    fn constructor() -> Constructor {
        Constructor::of::<Self>(|args| {
            Ok(AuthController {
                auth: args.take(0)?,
                tokens: args.take(1)?,
                cache: args.take(2)?,
                settings: args.take(3)?,
            })
        })
        .param(ParamSpec::class::<AuthService>())
        .param(ParamSpec::class::<TokenService>())
        .param(ParamSpec::class::<CacheHandle>())
        .param(ParamSpec::class::<Settings>())
    }

    async fn invoke(&self, handler: &str, args: HandlerArgs) -> HandlerResult {
        match handler {
            "login" => self.login(args).await,
            "logout" => self.logout(args).await,
            other => Err(unknown_handler("AuthController", other)),
        }
    }
}
