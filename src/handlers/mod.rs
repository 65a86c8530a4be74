pub mod factory;
pub mod guard;
pub mod lifecycle;
pub mod protected;
pub mod public;

use crate::database::{QueryError, QueryResults, QueryService, Statement};

pub use factory::HandlerFactory;
pub use guard::AuthorizationGuard;
pub use lifecycle::{
    unclassified, Endpoint, EndpointError, EndpointHandler, Fault, HandlerError, HandlerStatus, Lifecycle,
};

/// Run one statement in its own transaction and hand back its rows
pub(crate) async fn execute_single(
    queries: &mut QueryService,
    statement: Statement,
) -> Result<QueryResults, QueryError> {
    queries
        .transaction(move |tx| {
            Box::pin(async move {
                tx.add_query(statement);
                tx.exec_next().await?;
                Ok::<_, QueryError>(tx.results().cloned().unwrap_or_default())
            })
        })
        .await
}
