pub mod auth;
pub mod comment;
pub mod cors;
pub mod post;
pub mod user;

use actix_web::web;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern"));

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/auth").configure(auth::config))
        .service(web::scope("/users").configure(user::config))
        .service(web::scope("/posts").configure(post::config))
        .service(web::scope("/comments").configure(comment::config));
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    /// Rejects out-of-range values instead of clamping them.
    pub fn bounds(&self) -> Result<(u64, u64), AppError> {
        if self.page == Some(0) {
            return Err(AppError::param_error("page must be at least 1"));
        }
        if let Some(limit) = self.limit {
            if limit == 0 || limit > crate::store::MAX_LIMIT {
                return Err(AppError::param_error(format!(
                    "limit must be between 1 and {}",
                    crate::store::MAX_LIMIT
                )));
            }
        }
        Ok(crate::store::page_bounds(self.page, self.limit))
    }
}

pub fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::param_error(format!("{} cannot be empty", field)));
    }
    Ok(())
}

pub fn require_email(value: &str) -> Result<(), AppError> {
    if !EMAIL_RE.is_match(value) {
        return Err(AppError::param_error("invalid email format"));
    }
    Ok(())
}

pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::param_error(format!("invalid {} id", what)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(require_email("a@x.com").is_ok());
        assert!(require_email("a@x").is_err());
        assert!(require_email("no-at.com").is_err());
        assert!(require_email("a b@x.com").is_err());
    }

    #[test]
    fn page_query_rejects_out_of_range() {
        let q = PageQuery { page: Some(0), limit: None };
        assert!(q.bounds().is_err());
        let q = PageQuery { page: Some(2), limit: Some(51) };
        assert!(q.bounds().is_err());
        let q = PageQuery { page: Some(2), limit: Some(5) };
        assert_eq!(q.bounds().unwrap(), (1, 5));
    }
}
