use std::sync::Arc;

use crate::auth::password::SecuredPassword;
use crate::database::{QueryService, Statement};
use crate::services::storage::{avatar_key, ObjectStore, StorageError};
use crate::services::DataService;

/// Account records and their avatars
pub struct AccountsService {
    queries: QueryService,
    storage: Arc<dyn ObjectStore>,
}

impl AccountsService {
    pub fn new(queries: QueryService, storage: Arc<dyn ObjectStore>) -> Self {
        Self { queries, storage }
    }

    /// New accounts start with their display name as preferred name and a placeholder bio
    pub fn create_account(display_name: &str, secured: SecuredPassword) -> Statement {
        Statement::CreateAccount {
            display_name: display_name.to_string(),
            biography: format!("{} hasn't added a bio.", display_name),
            password_hash: secured.password_hash,
            salt_value: secured.salt_value,
        }
    }

    pub fn fetch_authentication_information(display_name: &str) -> Statement {
        Statement::FetchAuthentication { display_name: display_name.to_string() }
    }

    pub fn fetch_profile(display_name: &str) -> Statement {
        Statement::FetchProfile { display_name: display_name.to_string() }
    }

    pub async fn share_avatar(&self, display_name: &str) -> Result<String, StorageError> {
        self.storage.share(&avatar_key(display_name)).await
    }
}

impl DataService for AccountsService {
    fn queries(&mut self) -> &mut QueryService {
        &mut self.queries
    }
}
