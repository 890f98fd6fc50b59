//! Typed operations over the `users`, `posts`, `comments` and `likes` tables.
//!
//! Inserts are single statements; the schema's keys and constraints reject
//! duplicates and dangling references. Updates and deletes run in one
//! transaction whose first statement is a write, so SQLite takes the write
//! lock up front and concurrent writers wait on the busy timeout. Deletes
//! also remove dependents explicitly in that transaction, so a cascade is
//! never observed half-applied even with foreign-key enforcement off.

pub mod comment;
pub mod like;
pub mod post;
pub mod user;

/// Default and maximum page sizes for list operations.
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 50;

/// Clamps a 1-based page request into a zero-based page index and a page size.
pub fn page_bounds(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1) - 1;
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    (page, limit)
}
