use actix_web::{web, HttpResponse};
use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entity::user;
use crate::error::{AppError, StoreError};
use crate::password::{compare_password, hash_password};
use crate::response::{ok, ok_empty};
use crate::routes::post::PostDto;
use crate::routes::{require_email, require_text, PageQuery};
use crate::store;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(list_users)))
        .service(
            web::resource("/me")
                .route(web::get().to(get_me))
                .route(web::delete().to(delete_me)),
        )
        .service(web::resource("/me/posts").route(web::get().to(my_posts)))
        .service(web::resource("/name").route(web::put().to(update_name)))
        .service(web::resource("/profile").route(web::put().to(update_profile)))
        .service(web::resource("/password").route(web::put().to(update_password)));
}

/// A user as the API exposes it. The stored credential never leaves the server.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    id: Uuid,
    name: String,
    username: String,
    email: String,
    bio: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<user::Model> for UserDto {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            username: model.username,
            email: model.email,
            bio: model.bio,
            created_at: to_rfc3339(model.created_at),
            updated_at: to_rfc3339(model.updated_at),
        }
    }
}

#[derive(Deserialize)]
struct NameUpdateRequest {
    name: String,
}

#[derive(Deserialize)]
struct ProfileUpdateRequest {
    name: Option<String>,
    email: Option<String>,
    bio: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordUpdateRequest {
    old_password: String,
    new_password: String,
    new_password_confirm: String,
}

async fn get_me(auth: AuthUser) -> Result<HttpResponse, AppError> {
    Ok(ok(UserDto::from(auth.user)))
}

async fn my_posts(db: web::Data<DatabaseConnection>, auth: AuthUser) -> Result<HttpResponse, AppError> {
    let posts = store::post::list_by_author(db.get_ref(), auth.user_id).await?;
    let list: Vec<PostDto> = posts.into_iter().map(PostDto::from).collect();
    Ok(ok(list))
}

async fn list_users(
    db: web::Data<DatabaseConnection>,
    _auth: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let (page, limit) = query.bounds()?;
    let users = store::user::list(db.get_ref(), page, limit).await?;
    let list: Vec<UserDto> = users.into_iter().map(UserDto::from).collect();
    Ok(ok(list))
}

async fn update_name(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<NameUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    require_text(&payload.name, "name")?;
    let user = store::user::update_name(db.get_ref(), auth.user_id, payload.name.trim()).await?;
    Ok(ok(UserDto::from(user)))
}

async fn update_profile(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<ProfileUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    if let Some(name) = &payload.name {
        require_text(name, "name")?;
    }
    if let Some(email) = &payload.email {
        require_email(email)?;
    }
    let changes = store::user::UserChanges {
        name: payload.name.map(|v| v.trim().to_string()),
        email: payload.email.map(|v| v.trim().to_string()),
        bio: payload.bio,
    };
    let user = store::user::update_profile(db.get_ref(), auth.user_id, changes)
        .await
        .map_err(|e| match e {
            StoreError::UniqueConstraintViolation(_) => AppError::conflict("email already in use"),
            other => other.into(),
        })?;
    Ok(ok(UserDto::from(user)))
}

async fn update_password(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<PasswordUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    if payload.new_password != payload.new_password_confirm {
        return Err(AppError::param_error("new passwords do not match"));
    }
    if !compare_password(&payload.old_password, &auth.user.password)? {
        return Err(AppError::fail("wrong credentials"));
    }
    let hashed = hash_password(&payload.new_password)?;
    store::user::update_password(db.get_ref(), auth.user_id, hashed).await?;
    Ok(ok_empty())
}

async fn delete_me(db: web::Data<DatabaseConnection>, auth: AuthUser) -> Result<HttpResponse, AppError> {
    store::user::delete(db.get_ref(), auth.user_id).await?;
    info!("user {} deleted their account", auth.user_id);
    Ok(ok_empty())
}

pub(crate) fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, false)
}
