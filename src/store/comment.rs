use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::comment;
use crate::error::StoreError;

pub async fn create(
    db: &DatabaseConnection,
    post_id: Uuid,
    user_id: Uuid,
    content: impl Into<String>,
) -> Result<comment::Model, StoreError> {
    let now = Utc::now();
    let model = comment::ActiveModel {
        id: Set(Uuid::new_v4()),
        post_id: Set(post_id),
        user_id: Set(user_id),
        content: Set(content.into()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

pub async fn find(db: &DatabaseConnection, id: Uuid) -> Result<Option<comment::Model>, StoreError> {
    Ok(comment::Entity::find_by_id(id).one(db).await?)
}

/// Oldest first, the order a thread is read in.
pub async fn list_for_post(db: &DatabaseConnection, post_id: Uuid) -> Result<Vec<comment::Model>, StoreError> {
    Ok(comment::Entity::find()
        .filter(comment::Column::PostId.eq(post_id))
        .order_by_asc(comment::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Only the comment's author may edit it; anyone else gets `NotFound`.
pub async fn update(
    db: &DatabaseConnection,
    id: Uuid,
    user_id: Uuid,
    content: impl Into<String>,
) -> Result<comment::Model, StoreError> {
    let changes = comment::ActiveModel {
        content: Set(content.into()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    let updated = db
        .transaction::<_, comment::Model, StoreError>(|txn| {
            Box::pin(async move {
                let result = comment::Entity::update_many()
                    .set(changes)
                    .filter(comment::Column::Id.eq(id))
                    .filter(comment::Column::UserId.eq(user_id))
                    .exec(txn)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(StoreError::NotFound("comment"));
                }
                comment::Entity::find_by_id(id)
                    .one(txn)
                    .await?
                    .ok_or(StoreError::NotFound("comment"))
            })
        })
        .await?;
    Ok(updated)
}

pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), StoreError> {
    let result = comment::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(StoreError::NotFound("comment"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::future::join_all;
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::db::{file_db, memory_db};
    use crate::store::{self, fixtures};

    #[actix_web::test]
    async fn create_checks_both_references() {
        let db = memory_db().await;
        let alice = fixtures::user(&db, "alice").await;
        let post = fixtures::post(&db, &alice, "p").await;

        let err = create(&db, Uuid::new_v4(), alice.id, "x").await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
        let err = create(&db, post.id, Uuid::new_v4(), "x").await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
        assert_eq!(comment::Entity::find().count(&db).await.unwrap(), 0);

        let c = create(&db, post.id, alice.id, "first").await.unwrap();
        assert_eq!(c.post_id, post.id);
        assert_eq!(c.user_id, alice.id);
    }

    #[actix_web::test]
    async fn thread_reads_oldest_first() {
        let db = memory_db().await;
        let alice = fixtures::user(&db, "alice").await;
        let bob = fixtures::user(&db, "bob").await;
        let post = fixtures::post(&db, &alice, "p").await;
        create(&db, post.id, bob.id, "first").await.unwrap();
        actix_web::rt::time::sleep(Duration::from_millis(2)).await;
        create(&db, post.id, alice.id, "second").await.unwrap();

        let thread: Vec<_> = list_for_post(&db, post.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(thread, vec!["first", "second"]);
    }

    #[actix_web::test]
    async fn only_author_edits() {
        let db = memory_db().await;
        let alice = fixtures::user(&db, "alice").await;
        let bob = fixtures::user(&db, "bob").await;
        let post = fixtures::post(&db, &alice, "p").await;
        let c = create(&db, post.id, bob.id, "typo").await.unwrap();
        actix_web::rt::time::sleep(Duration::from_millis(5)).await;

        assert!(matches!(
            update(&db, c.id, alice.id, "nope").await.unwrap_err(),
            StoreError::NotFound("comment")
        ));
        let fixed = update(&db, c.id, bob.id, "fixed").await.unwrap();
        assert_eq!(fixed.content, "fixed");
        assert_eq!(fixed.created_at, c.created_at);
        assert!(fixed.updated_at > c.updated_at);
    }

    #[actix_web::test]
    async fn delete_removes_only_that_comment() {
        let db = memory_db().await;
        let alice = fixtures::user(&db, "alice").await;
        let post = fixtures::post(&db, &alice, "p").await;
        let a = create(&db, post.id, alice.id, "a").await.unwrap();
        let b = create(&db, post.id, alice.id, "b").await.unwrap();

        delete(&db, a.id).await.unwrap();
        assert!(find(&db, a.id).await.unwrap().is_none());
        assert!(find(&db, b.id).await.unwrap().is_some());
        assert!(store::post::find(&db, post.id).await.unwrap().is_some());
        assert!(matches!(delete(&db, a.id).await.unwrap_err(), StoreError::NotFound("comment")));
    }

    #[actix_web::test]
    async fn deleting_author_removes_comments_on_other_posts() {
        let db = memory_db().await;
        let alice = fixtures::user(&db, "alice").await;
        let bob = fixtures::user(&db, "bob").await;
        let post = fixtures::post(&db, &alice, "p").await;
        let c = create(&db, post.id, bob.id, "hi").await.unwrap();

        store::user::delete(&db, bob.id).await.unwrap();
        assert!(find(&db, c.id).await.unwrap().is_none());
        assert!(store::post::find(&db, post.id).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn concurrent_comments_on_one_post_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(dir.path()).await;
        let alice = fixtures::user(&db, "alice").await;
        let bob = fixtures::user(&db, "bob").await;
        let post = fixtures::post(&db, &alice, "busy thread").await;

        let results = join_all((0..20).map(|i| {
            let author = if i % 2 == 0 { alice.id } else { bob.id };
            create(&db, post.id, author, format!("comment {i}"))
        }))
        .await;
        assert!(results.iter().all(Result::is_ok), "{results:?}");
        assert_eq!(list_for_post(&db, post.id).await.unwrap().len(), 20);

        let c = results[1].as_ref().unwrap();
        let edits = join_all((0..6).map(|i| update(&db, c.id, bob.id, format!("edit {i}")))).await;
        assert!(edits.iter().all(Result::is_ok), "{edits:?}");
    }
}
