use bcrypt::{hash, verify};

use crate::error::AppError;

const MAX_PASSWORD: usize = 64;
const MIN_PASSWORD: usize = 6;
#[cfg(not(test))]
const HASH_COST: u32 = 10;
#[cfg(test)]
const HASH_COST: u32 = 4;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    check_length(password)?;
    if password.chars().count() < MIN_PASSWORD {
        return Err(AppError::param_error(format!(
            "password must be at least {} characters",
            MIN_PASSWORD
        )));
    }
    hash(password, HASH_COST).map_err(|_| AppError::system_exception())
}

/// Checks `password` against a stored bcrypt hash. A stored value that is not
/// a bcrypt hash never matches.
pub fn compare_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    check_length(password)?;
    Ok(verify(password, hashed).unwrap_or(false))
}

fn check_length(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::param_error("password cannot be empty"));
    }
    if password.chars().count() > MAX_PASSWORD {
        return Err(AppError::param_error(format!(
            "password must be at most {} characters",
            MAX_PASSWORD
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = hash_password("secret-1").unwrap();
        assert_ne!(hashed, "secret-1");
        assert!(compare_password("secret-1", &hashed).unwrap());
        assert!(!compare_password("secret-2", &hashed).unwrap());
    }

    #[test]
    fn length_limits() {
        assert_eq!(hash_password("").unwrap_err().code(), 1);
        assert_eq!(hash_password("short").unwrap_err().code(), 1);
        assert_eq!(hash_password(&"x".repeat(65)).unwrap_err().code(), 1);
        assert!(compare_password("", "whatever").is_err());
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!compare_password("secret-1", "plaintext").unwrap());
    }
}
