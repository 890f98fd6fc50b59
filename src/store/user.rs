use chrono::Utc;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entity::{comment, like, post, user};
use crate::error::StoreError;
use crate::store;

pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    /// Stored as given; hashing is the caller's concern.
    pub password: String,
}

#[derive(Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

/// Inserts a user. Username and email uniqueness is left to the unique
/// indexes so that concurrent registrations race inside the database.
pub async fn create(db: &DatabaseConnection, new: NewUser) -> Result<user::Model, StoreError> {
    let now = Utc::now();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(new.name),
        username: Set(new.username),
        email: Set(new.email),
        bio: Set(new.bio),
        password: Set(new.password),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<user::Model>, StoreError> {
    Ok(user::Entity::find_by_id(id).one(db).await?)
}

pub async fn find_by_username(db: &DatabaseConnection, username: &str) -> Result<Option<user::Model>, StoreError> {
    Ok(user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?)
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>, StoreError> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?)
}

/// Newest first. `page` is zero-based.
pub async fn list(db: &DatabaseConnection, page: u64, limit: u64) -> Result<Vec<user::Model>, StoreError> {
    Ok(user::Entity::find()
        .order_by_desc(user::Column::CreatedAt)
        .paginate(db, limit)
        .fetch_page(page)
        .await?)
}

pub async fn update_profile(
    db: &DatabaseConnection,
    id: Uuid,
    changes: UserChanges,
) -> Result<user::Model, StoreError> {
    let mut active = user::ActiveModel {
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(email) = changes.email {
        active.email = Set(email);
    }
    if let Some(bio) = changes.bio {
        active.bio = Set(Some(bio));
    }
    apply(db, id, active).await
}

pub async fn update_name(db: &DatabaseConnection, id: Uuid, name: impl Into<String>) -> Result<user::Model, StoreError> {
    let changes = UserChanges {
        name: Some(name.into()),
        ..Default::default()
    };
    update_profile(db, id, changes).await
}

pub async fn update_password(
    db: &DatabaseConnection,
    id: Uuid,
    password: impl Into<String>,
) -> Result<user::Model, StoreError> {
    let active = user::ActiveModel {
        password: Set(password.into()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    apply(db, id, active).await
}

/// Writes the set columns of `active` to user `id` and reads the row back in
/// the same transaction. The update runs first so SQLite takes its write
/// lock before anything is read.
async fn apply(db: &DatabaseConnection, id: Uuid, active: user::ActiveModel) -> Result<user::Model, StoreError> {
    let updated = db
        .transaction::<_, user::Model, StoreError>(|txn| {
            Box::pin(async move {
                let result = user::Entity::update_many()
                    .set(active)
                    .filter(user::Column::Id.eq(id))
                    .exec(txn)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(StoreError::NotFound("user"));
                }
                user::Entity::find_by_id(id)
                    .one(txn)
                    .await?
                    .ok_or(StoreError::NotFound("user"))
            })
        })
        .await?;
    Ok(updated)
}

/// Deletes the user with every post, comment and like that depends on it,
/// including comments and likes left by other users on the deleted posts.
pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), StoreError> {
    db.transaction::<_, (), StoreError>(|txn| {
        Box::pin(async move {
            let likes = like::Entity::delete_many()
                .filter(like::Column::UserId.eq(id))
                .exec(txn)
                .await?;

            let post_ids: Vec<Uuid> = post::Entity::find()
                .filter(post::Column::AuthorId.eq(id))
                .all(txn)
                .await?
                .into_iter()
                .map(|p| p.id)
                .collect();
            store::post::purge_dependents(txn, &post_ids).await?;
            post::Entity::delete_many()
                .filter(post::Column::AuthorId.eq(id))
                .exec(txn)
                .await?;

            let comments = comment::Entity::delete_many()
                .filter(comment::Column::UserId.eq(id))
                .exec(txn)
                .await?;
            if user::Entity::delete_by_id(id).exec(txn).await?.rows_affected == 0 {
                return Err(StoreError::NotFound("user"));
            }

            debug!(
                "user {} deleted with {} posts, {} own comments, {} own likes",
                id,
                post_ids.len(),
                comments.rows_affected,
                likes.rows_affected
            );
            Ok(())
        })
    })
    .await?;
    Ok(())
}
