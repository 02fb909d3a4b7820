use std::sync::Arc;

use async_trait::async_trait;
use pgwire::api::auth::{AuthSource, LoginInfo, Password};
use pgwire::error::{PgWireError, PgWireResult};

use crate::config::Users;
use crate::observability;

/// Cleartext password lookup against the configured users.
#[derive(Debug)]
pub struct RotaAuthSource {
    users: Arc<Users>,
}

impl RotaAuthSource {
    pub fn new(users: Arc<Users>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl AuthSource for RotaAuthSource {
    async fn get_password(&self, login: &LoginInfo) -> PgWireResult<Password> {
        let name = login.user().unwrap_or_default();
        match self.users.get(name) {
            Some(user) => Ok(Password::new(None, user.password.as_bytes().to_vec())),
            None => {
                metrics::counter!(observability::AUTH_FAILURES_TOTAL).increment(1);
                Err(PgWireError::InvalidPassword(name.to_string()))
            }
        }
    }
}
