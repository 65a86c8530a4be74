// handlers/factory.rs - builds handlers with exactly the providers their endpoint declares

use std::sync::Arc;

use tracing::debug;

use crate::auth::TokenAuthority;
use crate::database::{MemoryStore, QueryService, SessionFactory};
use crate::handlers::guard::AuthorizationGuard;
use crate::handlers::lifecycle::{Endpoint, EndpointHandler};
use crate::models::Authorized;
use crate::services::{
    AccountsService, ConceptsService, EngagementService, MemoryObjectStore, ObjectStore, ServiceBox, ServiceName,
};

/// Process-wide source of handlers. Holds the shared session factory, object
/// store and token authority; every handler it creates gets fresh providers.
#[derive(Clone)]
pub struct HandlerFactory {
    sessions: Arc<dyn SessionFactory>,
    storage: Arc<dyn ObjectStore>,
    tokens: Arc<TokenAuthority>,
    lineage_depth: u32,
}

impl HandlerFactory {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        storage: Arc<dyn ObjectStore>,
        tokens: Arc<TokenAuthority>,
        lineage_depth: u32,
    ) -> Self {
        Self { sessions, storage, tokens, lineage_depth }
    }

    /// Everything in memory, for tests and local experiments
    pub fn in_memory(tokens: TokenAuthority, lineage_depth: u32) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryObjectStore::new()),
            Arc::new(tokens),
            lineage_depth,
        )
    }

    pub fn sessions(&self) -> &Arc<dyn SessionFactory> {
        &self.sessions
    }

    pub fn tokens(&self) -> &Arc<TokenAuthority> {
        &self.tokens
    }

    pub fn lineage_depth(&self) -> u32 {
        self.lineage_depth
    }

    fn queries(&self) -> QueryService {
        QueryService::new(self.sessions.clone())
    }

    /// A fresh provider for `name`
    pub fn provider(&self, name: ServiceName) -> ServiceBox {
        match name {
            ServiceName::Accounts => ServiceBox::Accounts(AccountsService::new(self.queries(), self.storage.clone())),
            ServiceName::Concepts => ServiceBox::Concepts(ConceptsService::new(self.queries(), self.storage.clone())),
            ServiceName::Engagement => ServiceBox::Engagement(EngagementService::new(self.queries())),
            ServiceName::RawQuery => ServiceBox::RawQuery(self.queries()),
            ServiceName::ObjectStorage => ServiceBox::ObjectStorage(self.storage.clone()),
        }
    }

    pub fn create_handler<E: Endpoint>(&self, endpoint: E) -> EndpointHandler<E> {
        let mut handler = EndpointHandler::new(endpoint);
        for name in E::SERVICES {
            handler.use_service(*name, self.provider(*name));
        }
        debug!("Created {} handler with {} service(s)", E::NAME, E::SERVICES.len());
        handler
    }

    pub fn create_guarded<E>(&self, endpoint: E) -> AuthorizationGuard<EndpointHandler<E>>
    where
        E: Endpoint,
        E::Request: Authorized,
    {
        AuthorizationGuard::new(self.create_handler(endpoint), self.tokens.clone())
    }
}
