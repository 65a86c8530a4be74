use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::database::QueryService;
use crate::handlers::HandlerError;
use crate::services::{AccountsService, ConceptsService, EngagementService, ObjectStore};

/// Logical names handlers use to ask for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceName {
    Accounts,
    Concepts,
    Engagement,
    RawQuery,
    ObjectStorage,
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceName::Accounts => "accounts",
            ServiceName::Concepts => "concepts",
            ServiceName::Engagement => "engagement",
            ServiceName::RawQuery => "raw query",
            ServiceName::ObjectStorage => "object storage",
        };
        f.write_str(name)
    }
}

/// Concrete provider for each service category
pub enum ServiceBox {
    Accounts(AccountsService),
    Concepts(ConceptsService),
    Engagement(EngagementService),
    RawQuery(QueryService),
    ObjectStorage(Arc<dyn ObjectStore>),
}

impl ServiceBox {
    /// The service name this provider can satisfy
    pub fn name(&self) -> ServiceName {
        match self {
            ServiceBox::Accounts(_) => ServiceName::Accounts,
            ServiceBox::Concepts(_) => ServiceName::Concepts,
            ServiceBox::Engagement(_) => ServiceName::Engagement,
            ServiceBox::RawQuery(_) => ServiceName::RawQuery,
            ServiceBox::ObjectStorage(_) => ServiceName::ObjectStorage,
        }
    }
}

impl fmt::Debug for ServiceBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceBox({})", self.name())
    }
}

/// Providers bound to one handler instance.
///
/// Binding is unchecked and last-write-wins; a provider bound under the wrong
/// name is reported as misconfigured the first time it is looked up.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    providers: HashMap<ServiceName, ServiceBox>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: ServiceName, provider: ServiceBox) {
        tracing::debug!("Binding {:?} provider under '{}'", provider.name(), name);
        self.providers.insert(name, provider);
    }

    pub fn contains(&self, name: ServiceName) -> bool {
        self.providers.contains_key(&name)
    }

    pub fn get(&self, name: ServiceName) -> Result<&ServiceBox, HandlerError> {
        let provider = self.providers.get(&name).ok_or(HandlerError::NoProvider(name))?;
        if provider.name() != name {
            return Err(HandlerError::Misconfigured { expected: name, found: provider.name() });
        }
        Ok(provider)
    }

    pub fn get_mut(&mut self, name: ServiceName) -> Result<&mut ServiceBox, HandlerError> {
        let provider = self.providers.get_mut(&name).ok_or(HandlerError::NoProvider(name))?;
        if provider.name() != name {
            return Err(HandlerError::Misconfigured { expected: name, found: provider.name() });
        }
        Ok(provider)
    }

    pub fn accounts(&mut self) -> Result<&mut AccountsService, HandlerError> {
        match self.get_mut(ServiceName::Accounts)? {
            ServiceBox::Accounts(service) => Ok(service),
            other => Err(HandlerError::Misconfigured { expected: ServiceName::Accounts, found: other.name() }),
        }
    }

    pub fn concepts(&mut self) -> Result<&mut ConceptsService, HandlerError> {
        match self.get_mut(ServiceName::Concepts)? {
            ServiceBox::Concepts(service) => Ok(service),
            other => Err(HandlerError::Misconfigured { expected: ServiceName::Concepts, found: other.name() }),
        }
    }

    pub fn engagement(&mut self) -> Result<&mut EngagementService, HandlerError> {
        match self.get_mut(ServiceName::Engagement)? {
            ServiceBox::Engagement(service) => Ok(service),
            other => Err(HandlerError::Misconfigured { expected: ServiceName::Engagement, found: other.name() }),
        }
    }

    pub fn raw_query(&mut self) -> Result<&mut QueryService, HandlerError> {
        match self.get_mut(ServiceName::RawQuery)? {
            ServiceBox::RawQuery(service) => Ok(service),
            other => Err(HandlerError::Misconfigured { expected: ServiceName::RawQuery, found: other.name() }),
        }
    }

    pub fn object_storage(&self) -> Result<Arc<dyn ObjectStore>, HandlerError> {
        match self.get(ServiceName::ObjectStorage)? {
            ServiceBox::ObjectStorage(store) => Ok(store.clone()),
            other => Err(HandlerError::Misconfigured { expected: ServiceName::ObjectStorage, found: other.name() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::services::MemoryObjectStore;

    fn query_service() -> QueryService {
        QueryService::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn missing_providers_are_reported() {
        let mut registry = ServiceRegistry::new();
        let err = registry.accounts().err().unwrap();
        assert!(matches!(err, HandlerError::NoProvider(ServiceName::Accounts)));
    }

    #[test]
    fn wrong_provider_type_is_detected_on_lookup() {
        let mut registry = ServiceRegistry::new();
        registry.bind(ServiceName::Accounts, ServiceBox::RawQuery(query_service()));

        assert!(registry.contains(ServiceName::Accounts));
        let err = registry.accounts().err().unwrap();
        assert!(matches!(
            err,
            HandlerError::Misconfigured { expected: ServiceName::Accounts, found: ServiceName::RawQuery }
        ));
    }

    #[test]
    fn last_binding_wins() {
        let mut registry = ServiceRegistry::new();
        registry.bind(ServiceName::RawQuery, ServiceBox::ObjectStorage(Arc::new(MemoryObjectStore::new())));
        registry.bind(ServiceName::RawQuery, ServiceBox::RawQuery(query_service()));

        assert!(registry.raw_query().is_ok());
    }
}
