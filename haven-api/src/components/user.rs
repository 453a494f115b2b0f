//! User component implementation.
//!
//! Passwords are hashed with Argon2id before they reach the database and
//! the hash column is never mapped back into [`User`].

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};

use haven_core::{RecordId, User};

use crate::component::{require_text, Columns, Component, Listable, UniqueKey};
use crate::error::{ApiError, ApiResult};
use crate::types::{CreateUserRequest, UpdateUserRequest};

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> ApiResult<String> {
    if password.is_empty() {
        return Err(ApiError::missing_field("password"));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            ApiError::internal_error("Failed to hash password")
        })
}

impl Listable for User {
    const ENTITY_NAME: &'static str = "User";
    const TABLE: &'static str = "\"User\"";
    const PK_FIELD: &'static str = "id_user";
    const SEARCH_FIELDS: &'static [&'static str] =
        &["login", "mail", "first_name", "last_name", "telephone"];
    const ORDER_FIELD: Option<&'static str> = Some("login");
}

impl Component for User {
    type Create = CreateUserRequest;
    type Update = UpdateUserRequest;

    const EVENT_PREFIX: &'static str = "user";

    fn entity_id(&self) -> RecordId {
        self.id_user
    }

    fn create_columns(req: &CreateUserRequest) -> ApiResult<Columns> {
        require_text("login", &req.login)?;
        require_text("mail", &req.mail)?;
        Ok(Columns::new()
            .set("role_id", req.role_id)
            .set("login", req.login.trim())
            .set("mail", req.mail.trim())
            .set("password", hash_password(&req.password)?)
            .set("first_name", req.first_name.clone())
            .set("last_name", req.last_name.clone())
            .set("telephone", req.telephone.clone())
            .set("shelter_id", req.shelter_id)
            .set("creator", req.creator))
    }

    fn update_columns(req: &UpdateUserRequest) -> ApiResult<Columns> {
        let password = match req.password.as_deref() {
            Some(p) if !p.is_empty() => Some(hash_password(p)?),
            _ => None,
        };
        Ok(Columns::new()
            .set_some("role_id", req.role_id)
            .set_some("login", req.login.as_deref().map(str::trim))
            .set_some("mail", req.mail.as_deref().map(str::trim))
            .set_some("password", password)
            .set_some("first_name", req.first_name.clone())
            .set_some("last_name", req.last_name.clone())
            .set_some("telephone", req.telephone.clone())
            .set_some("shelter_id", req.shelter_id)
            .set_some("creator", req.creator))
    }

    fn create_unique_keys(req: &CreateUserRequest) -> Vec<UniqueKey> {
        vec![
            UniqueKey::single("mail", req.mail.trim()),
            UniqueKey::single("login", req.login.trim()),
        ]
    }

    fn update_unique_keys(req: &UpdateUserRequest) -> Vec<UniqueKey> {
        let mut keys = Vec::new();
        if let Some(mail) = &req.mail {
            keys.push(UniqueKey::single("mail", mail.trim()));
        }
        if let Some(login) = &req.login {
            keys.push(UniqueKey::single("login", login.trim()));
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::SqlParam;
    use argon2::{PasswordHash, PasswordVerifier};

    #[test]
    fn test_hash_verifies() {
        let hash = hash_password("correct horse").expect("hash");
        assert!(hash.starts_with("$argon2"));
        let parsed = PasswordHash::new(&hash).expect("phc");
        assert!(Argon2::default()
            .verify_password(b"correct horse", &parsed)
            .is_ok());
    }

    #[test]
    fn test_create_never_stores_plaintext() {
        let req = CreateUserRequest {
            role_id: 3,
            login: "keeper".to_string(),
            mail: "keeper@example.org".to_string(),
            password: "plain-secret".to_string(),
            first_name: None,
            last_name: None,
            telephone: None,
            shelter_id: Some(1),
            creator: None,
        };
        let columns = User::create_columns(&req).expect("columns");
        match columns.get("password") {
            Some(SqlParam::String(stored)) => assert_ne!(stored, "plain-secret"),
            other => panic!("unexpected password column: {:?}", other),
        }
        assert_eq!(User::create_unique_keys(&req).len(), 2);
    }

    #[test]
    fn test_empty_password_on_update_is_ignored() {
        let req = UpdateUserRequest {
            password: Some(String::new()),
            ..UpdateUserRequest::default()
        };
        assert!(User::update_columns(&req).expect("columns").is_empty());
    }
}
