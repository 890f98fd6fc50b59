use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entity::comment;
use crate::error::AppError;
use crate::response::{ok, ok_empty};
use crate::routes::user::to_rfc3339;
use crate::routes::{parse_id, require_text};
use crate::store;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/{id}")
            .route(web::put().to(update))
            .route(web::delete().to(remove)),
    );
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    id: Uuid,
    post_id: Uuid,
    user_id: Uuid,
    content: String,
    created_at: String,
    updated_at: String,
}

impl From<comment::Model> for CommentDto {
    fn from(model: comment::Model) -> Self {
        Self {
            id: model.id,
            post_id: model.post_id,
            user_id: model.user_id,
            content: model.content,
            created_at: to_rfc3339(model.created_at),
            updated_at: to_rfc3339(model.updated_at),
        }
    }
}

#[derive(Deserialize)]
struct UpdateCommentRequest {
    content: String,
}

async fn update(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
    payload: web::Json<UpdateCommentRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "comment")?;
    require_text(&payload.content, "content")?;
    let comment = store::comment::update(db.get_ref(), id, auth.user_id, payload.content.as_str()).await?;
    Ok(ok(CommentDto::from(comment)))
}

/// The comment's author and the author of the post it sits on may remove it.
async fn remove(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "comment")?;
    let comment = store::comment::find(db.get_ref(), id)
        .await?
        .ok_or_else(|| AppError::not_found("comment not found"))?;

    if comment.user_id != auth.user_id {
        let post_author = store::post::find(db.get_ref(), comment.post_id)
            .await?
            .map(|p| p.author_id);
        if post_author != Some(auth.user_id) {
            return Err(AppError::fail("only the comment or post author can delete a comment"));
        }
    }

    store::comment::delete(db.get_ref(), id).await?;
    Ok(ok_empty())
}
