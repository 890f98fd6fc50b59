use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entity::post;
use crate::error::{AppError, StoreError};
use crate::response::{ok, ok_empty};
use crate::routes::comment::CommentDto;
use crate::routes::user::to_rfc3339;
use crate::routes::{parse_id, require_text, PageQuery};
use crate::store;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list_posts))
            .route(web::post().to(create_post)),
    )
    .service(
        web::resource("/{id}")
            .route(web::get().to(get_post))
            .route(web::put().to(update_post))
            .route(web::delete().to(delete_post)),
    )
    .service(
        web::resource("/{id}/comments")
            .route(web::get().to(list_comments))
            .route(web::post().to(create_comment)),
    )
    .service(
        web::resource("/{id}/like")
            .route(web::post().to(like_post))
            .route(web::delete().to(unlike_post)),
    );
}

#[derive(Deserialize)]
struct PostRequest {
    title: String,
    content: String,
}

#[derive(Deserialize)]
struct CommentRequest {
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    id: Uuid,
    author_id: Uuid,
    title: String,
    content: String,
    created_at: String,
    updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    like_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    liked_by_me: Option<bool>,
}

impl From<post::Model> for PostDto {
    fn from(model: post::Model) -> Self {
        Self {
            id: model.id,
            author_id: model.author_id,
            title: model.title,
            content: model.content,
            created_at: to_rfc3339(model.created_at),
            updated_at: to_rfc3339(model.updated_at),
            like_count: None,
            liked_by_me: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostListResponse {
    results: usize,
    posts: Vec<PostDto>,
}

impl PostRequest {
    fn check(&self) -> Result<(), AppError> {
        require_text(&self.title, "title")?;
        require_text(&self.content, "content")
    }
}

async fn create_post(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<PostRequest>,
) -> Result<HttpResponse, AppError> {
    payload.check()?;
    let post = store::post::create(db.get_ref(), auth.user_id, payload.title.as_str(), payload.content.as_str()).await?;
    Ok(ok(PostDto::from(post)))
}

async fn list_posts(
    db: web::Data<DatabaseConnection>,
    _auth: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let (page, limit) = query.bounds()?;
    let posts: Vec<PostDto> = store::post::list(db.get_ref(), page, limit)
        .await?
        .into_iter()
        .map(PostDto::from)
        .collect();
    Ok(ok(PostListResponse {
        results: posts.len(),
        posts,
    }))
}

async fn get_post(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "post")?;
    let post = store::post::find(db.get_ref(), id)
        .await?
        .ok_or_else(|| AppError::not_found("post not found"))?;
    let likes = store::like::count_for_post(db.get_ref(), id).await?;
    let liked = store::like::find(db.get_ref(), auth.user_id, id).await?.is_some();
    let mut dto = PostDto::from(post);
    dto.like_count = Some(likes);
    dto.liked_by_me = Some(liked);
    Ok(ok(dto))
}

async fn update_post(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
    payload: web::Json<PostRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "post")?;
    payload.check()?;
    let post = store::post::update(
        db.get_ref(),
        id,
        auth.user_id,
        payload.title.as_str(),
        payload.content.as_str(),
    )
    .await?;
    Ok(ok(PostDto::from(post)))
}

async fn delete_post(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "post")?;
    store::post::delete(db.get_ref(), id, Some(auth.user_id)).await?;
    Ok(ok_empty())
}

async fn list_comments(
    db: web::Data<DatabaseConnection>,
    _auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "post")?;
    if store::post::find(db.get_ref(), id).await?.is_none() {
        return Err(AppError::not_found("post not found"));
    }
    let list: Vec<CommentDto> = store::comment::list_for_post(db.get_ref(), id)
        .await?
        .into_iter()
        .map(CommentDto::from)
        .collect();
    Ok(ok(list))
}

async fn create_comment(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
    payload: web::Json<CommentRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "post")?;
    require_text(&payload.content, "content")?;
    let comment = store::comment::create(db.get_ref(), id, auth.user_id, payload.content.as_str()).await?;
    Ok(ok(CommentDto::from(comment)))
}

async fn like_post(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "post")?;
    store::like::create(db.get_ref(), auth.user_id, id)
        .await
        .map_err(|e| match e {
            StoreError::UniqueConstraintViolation(_) => AppError::conflict("post already liked"),
            other => other.into(),
        })?;
    Ok(ok_empty())
}

async fn unlike_post(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "post")?;
    store::like::delete(db.get_ref(), auth.user_id, id).await?;
    Ok(ok_empty())
}
