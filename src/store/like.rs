use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entity::like;
use crate::error::StoreError;

/// Records that `user_id` likes `post_id`. The composite primary key turns a
/// second like on the same pair into `UniqueConstraintViolation`, and the
/// foreign keys reject an unknown user or post.
pub async fn create(db: &DatabaseConnection, user_id: Uuid, post_id: Uuid) -> Result<like::Model, StoreError> {
    let now = Utc::now();
    let model = like::ActiveModel {
        user_id: Set(user_id),
        post_id: Set(post_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

pub async fn find(db: &DatabaseConnection, user_id: Uuid, post_id: Uuid) -> Result<Option<like::Model>, StoreError> {
    Ok(like::Entity::find_by_id((user_id, post_id)).one(db).await?)
}

pub async fn count_for_post(db: &DatabaseConnection, post_id: Uuid) -> Result<u64, StoreError> {
    Ok(like::Entity::find()
        .filter(like::Column::PostId.eq(post_id))
        .count(db)
        .await?)
}

pub async fn delete(db: &DatabaseConnection, user_id: Uuid, post_id: Uuid) -> Result<(), StoreError> {
    let result = like::Entity::delete_by_id((user_id, post_id)).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(StoreError::NotFound("like"));
    }
    Ok(())
}
