use chrono::Utc;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::{comment, like, post};
use crate::error::StoreError;

pub async fn create<T: Into<String>>(
    db: &DatabaseConnection,
    author_id: Uuid,
    title: T,
    content: T,
) -> Result<post::Model, StoreError> {
    let now = Utc::now();
    let model = post::ActiveModel {
        id: Set(Uuid::new_v4()),
        author_id: Set(author_id),
        title: Set(title.into()),
        content: Set(content.into()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

pub async fn find(db: &DatabaseConnection, id: Uuid) -> Result<Option<post::Model>, StoreError> {
    Ok(post::Entity::find_by_id(id).one(db).await?)
}

/// Newest first. `page` is zero-based.
pub async fn list(db: &DatabaseConnection, page: u64, limit: u64) -> Result<Vec<post::Model>, StoreError> {
    Ok(post::Entity::find()
        .order_by_desc(post::Column::CreatedAt)
        .paginate(db, limit)
        .fetch_page(page)
        .await?)
}

pub async fn list_by_author(db: &DatabaseConnection, author_id: Uuid) -> Result<Vec<post::Model>, StoreError> {
    Ok(post::Entity::find()
        .filter(post::Column::AuthorId.eq(author_id))
        .order_by_desc(post::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Rewrites title and content. A post owned by someone else is reported as
/// missing.
pub async fn update<T: Into<String>>(
    db: &DatabaseConnection,
    id: Uuid,
    author_id: Uuid,
    title: T,
    content: T,
) -> Result<post::Model, StoreError> {
    let changes = post::ActiveModel {
        title: Set(title.into()),
        content: Set(content.into()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    let updated = db
        .transaction::<_, post::Model, StoreError>(|txn| {
            Box::pin(async move {
                // the write goes first so SQLite takes the write lock before any read
                let result = post::Entity::update_many()
                    .set(changes)
                    .filter(post::Column::Id.eq(id))
                    .filter(post::Column::AuthorId.eq(author_id))
                    .exec(txn)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(StoreError::NotFound("post"));
                }
                post::Entity::find_by_id(id)
                    .one(txn)
                    .await?
                    .ok_or(StoreError::NotFound("post"))
            })
        })
        .await?;
    Ok(updated)
}

/// Removes a post with its comments and likes. When `author_id` is given the
/// post must belong to that author, otherwise nothing is removed.
pub async fn delete(db: &DatabaseConnection, id: Uuid, author_id: Option<Uuid>) -> Result<(), StoreError> {
    db.transaction::<_, (), StoreError>(|txn| {
        Box::pin(async move {
            let mut query = post::Entity::delete_many().filter(post::Column::Id.eq(id));
            if let Some(author_id) = author_id {
                query = query.filter(post::Column::AuthorId.eq(author_id));
            }
            if query.exec(txn).await?.rows_affected == 0 {
                return Err(StoreError::NotFound("post"));
            }
            purge_dependents(txn, &[id]).await?;
            Ok(())
        })
    })
    .await?;
    Ok(())
}

/// Deletes the comments and likes hanging off `post_ids`. A no-op where the
/// engine already cascaded them.
pub(super) async fn purge_dependents<C: ConnectionTrait>(txn: &C, post_ids: &[Uuid]) -> Result<(), StoreError> {
    let likes = like::Entity::delete_many()
        .filter(like::Column::PostId.is_in(post_ids.iter().copied()))
        .exec(txn)
        .await?;
    let comments = comment::Entity::delete_many()
        .filter(comment::Column::PostId.is_in(post_ids.iter().copied()))
        .exec(txn)
        .await?;
    debug!(
        "purged {} comments, {} likes under {} posts",
        comments.rows_affected,
        likes.rows_affected,
        post_ids.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::future::join_all;

    use super::*;
    use crate::db::{file_db, memory_db};
    use crate::store::{self, fixtures};

    #[actix_web::test]
    async fn create_requires_existing_author() {
        let db = memory_db().await;
        let err = create(&db, Uuid::new_v4(), "t", "c").await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)), "{err:?}");
        assert_eq!(post::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn author_can_update_others_cannot() {
        let db = memory_db().await;
        let alice = fixtures::user(&db, "alice").await;
        let bob = fixtures::user(&db, "bob").await;
        let post = fixtures::post(&db, &alice, "draft").await;
        actix_web::rt::time::sleep(Duration::from_millis(5)).await;

        let err = update(&db, post.id, bob.id, "hijacked", "x").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("post")));

        let updated = update(&db, post.id, alice.id, "final", "done").await.unwrap();
        assert_eq!(updated.title, "final");
        assert_eq!(updated.content, "done");
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.updated_at > post.updated_at);
    }

    #[actix_web::test]
    async fn delete_cascades_to_comments_and_likes() {
        let db = memory_db().await;
        let alice = fixtures::user(&db, "alice").await;
        let bob = fixtures::user(&db, "bob").await;
        let post = fixtures::post(&db, &alice, "hello").await;
        let other = fixtures::post(&db, &alice, "keep me").await;
        let c = store::comment::create(&db, post.id, bob.id, "hi").await.unwrap();
        store::like::create(&db, bob.id, post.id).await.unwrap();
        store::like::create(&db, bob.id, other.id).await.unwrap();

        delete(&db, post.id, None).await.unwrap();

        assert!(find(&db, post.id).await.unwrap().is_none());
        assert!(store::comment::find(&db, c.id).await.unwrap().is_none());
        assert!(store::like::find(&db, bob.id, post.id).await.unwrap().is_none());
        assert!(store::like::find(&db, bob.id, other.id).await.unwrap().is_some());
        assert!(store::user::find_by_id(&db, alice.id).await.unwrap().is_some());

        assert!(matches!(delete(&db, post.id, None).await.unwrap_err(), StoreError::NotFound("post")));
    }

    #[actix_web::test]
    async fn delete_with_author_checks_ownership() {
        let db = memory_db().await;
        let alice = fixtures::user(&db, "alice").await;
        let bob = fixtures::user(&db, "bob").await;
        let post = fixtures::post(&db, &alice, "mine").await;

        assert!(matches!(
            delete(&db, post.id, Some(bob.id)).await.unwrap_err(),
            StoreError::NotFound("post")
        ));
        delete(&db, post.id, Some(alice.id)).await.unwrap();
        assert!(find(&db, post.id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn listing_is_newest_first() {
        let db = memory_db().await;
        let alice = fixtures::user(&db, "alice").await;
        let bob = fixtures::user(&db, "bob").await;
        for (author, title) in [(&alice, "one"), (&bob, "two"), (&alice, "three")] {
            fixtures::post(&db, author, title).await;
            actix_web::rt::time::sleep(Duration::from_millis(2)).await;
        }

        let titles: Vec<_> = list(&db, 0, 10).await.unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["three", "two", "one"]);

        let mine: Vec<_> = list_by_author(&db, alice.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(mine, vec!["three", "one"]);
    }

    #[actix_web::test]
    async fn concurrent_writes_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(dir.path()).await;
        let alice = fixtures::user(&db, "alice").await;

        let created = join_all((0..20).map(|i| create(&db, alice.id, format!("t{i}"), "c".to_string()))).await;
        let posts: Vec<post::Model> = created.into_iter().collect::<Result<_, _>>().unwrap();
        assert_eq!(post::Entity::find().count(&db).await.unwrap(), 20);

        let target = posts[0].id;
        let updates = join_all((0..8).map(|i| update(&db, target, alice.id, format!("v{i}"), "c".to_string()))).await;
        assert!(updates.iter().all(Result::is_ok), "{updates:?}");

        let deletes = join_all(posts[1..].iter().map(|p| delete(&db, p.id, Some(alice.id)))).await;
        assert!(deletes.iter().all(Result::is_ok), "{deletes:?}");
        assert_eq!(post::Entity::find().count(&db).await.unwrap(), 1);
    }
}
