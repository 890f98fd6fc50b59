use actix_web::{web, HttpResponse};
use log::info;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::create_token;
use crate::config::AppConfig;
use crate::error::{AppError, StoreError};
use crate::password::{compare_password, hash_password};
use crate::response::ok;
use crate::routes::{require_email, require_text};
use crate::routes::user::UserDto;
use crate::store;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/register").route(web::post().to(register)))
        .service(web::resource("/login").route(web::post().to(login)));
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    name: String,
    username: String,
    email: String,
    bio: Option<String>,
    password: String,
    password_confirm: String,
}

/// Either `email` or `username` identifies the account.
#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    username: Option<String>,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    user_id: Uuid,
    username: String,
}

async fn register(
    db: web::Data<DatabaseConnection>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    require_text(&payload.name, "name")?;
    if payload.username.trim().chars().count() < 3 {
        return Err(AppError::param_error("username must be at least 3 characters"));
    }
    require_email(&payload.email)?;
    if payload.password != payload.password_confirm {
        return Err(AppError::param_error("passwords do not match"));
    }
    let password = hash_password(&payload.password)?;

    let new_user = store::user::NewUser {
        name: payload.name.trim().to_string(),
        username: payload.username.trim().to_string(),
        email: payload.email.trim().to_string(),
        bio: payload.bio.filter(|b| !b.trim().is_empty()),
        password,
    };
    let user = store::user::create(db.get_ref(), new_user)
        .await
        .map_err(|e| match e {
            StoreError::UniqueConstraintViolation(_) => AppError::conflict("username or email already exists"),
            other => other.into(),
        })?;
    info!("registered user {}", user.id);

    Ok(ok(UserDto::from(user)))
}

async fn login(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let user = match (payload.email.as_deref(), payload.username.as_deref()) {
        (Some(email), _) => {
            require_email(email)?;
            store::user::find_by_email(db.get_ref(), email.trim()).await?
        }
        (None, Some(username)) => store::user::find_by_username(db.get_ref(), username.trim()).await?,
        (None, None) => return Err(AppError::param_error("email or username is required")),
    }
    .ok_or_else(|| AppError::fail("wrong email or password"))?;

    if !compare_password(&payload.password, &user.password)? {
        return Err(AppError::fail("wrong email or password"));
    }

    let token = create_token(&config, user.id)?;
    Ok(ok(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
    }))
}
