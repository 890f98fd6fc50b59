use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;
use crate::store;

/// The caller behind a valid token, loaded fresh from the store.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub user: user::Model,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let db = match req.app_data::<web::Data<DatabaseConnection>>() {
            Some(db) => db.clone(),
            None => {
                return Box::pin(async { Err(AppError::system_exception().into()) });
            }
        };
        let config = match req.app_data::<web::Data<AppConfig>>() {
            Some(cfg) => cfg.clone(),
            None => {
                return Box::pin(async { Err(AppError::system_exception().into()) });
            }
        };
        let token = extract_token(req, &config);

        Box::pin(async move {
            let token = token.ok_or_else(AppError::need_login)?;
            let user_id = decode_token(&config, &token)?;
            let user = store::user::find_by_id(db.get_ref(), user_id)
                .await
                .map_err(AppError::from)?
                .ok_or_else(AppError::need_login)?;
            Ok(AuthUser { user_id, user })
        })
    }
}

fn extract_token(req: &HttpRequest, config: &AppConfig) -> Option<String> {
    req.headers()
        .get(config.token_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn create_token(config: &AppConfig, user_id: Uuid) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::minutes(config.jwt_maxage)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|_| AppError::system_exception())
}

fn decode_token(config: &AppConfig, token: &str) -> Result<Uuid, AppError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    let claims = decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::need_login())?;
    Uuid::parse_str(&claims.sub).map_err(|_| AppError::need_login())
}
