use std::sync::Arc;

use serde_json::{Map, Value};

use crate::database::{QueryService, Statement};
use crate::services::storage::{thumbnail_key, ObjectStore, StorageError};
use crate::services::DataService;

/// Concepts, the links between them, and their thumbnails
pub struct ConceptsService {
    queries: QueryService,
    storage: Arc<dyn ObjectStore>,
}

impl ConceptsService {
    pub fn new(queries: QueryService, storage: Arc<dyn ObjectStore>) -> Self {
        Self { queries, storage }
    }

    pub fn create_concept(author: &str, title: &str, description: &str, diagram: Map<String, Value>) -> Statement {
        Statement::CreateConcept {
            author: author.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            diagram: Value::Object(diagram),
        }
    }

    pub fn find_exact_concept(author: &str, title: &str) -> Statement {
        Statement::FindConcept { author: author.to_string(), title: title.to_string() }
    }

    pub fn link_existing_concept(ancestor: &str, descendant: &str) -> Statement {
        Statement::LinkConcepts { ancestor: ancestor.to_string(), descendant: descendant.to_string() }
    }

    pub fn ancestors_of(identifier: &str, max_depth: u32) -> Statement {
        Statement::Ancestors { identifier: identifier.to_string(), max_depth }
    }

    pub fn descendants_of(identifier: &str, max_depth: u32) -> Statement {
        Statement::Descendants { identifier: identifier.to_string(), max_depth }
    }

    pub async fn share_thumbnail(&self, identifier: &str) -> Result<String, StorageError> {
        self.storage.share(&thumbnail_key(identifier)).await
    }
}

impl DataService for ConceptsService {
    fn queries(&mut self) -> &mut QueryService {
        &mut self.queries
    }
}
