use serde_json::{json, Value};

/// Rendered SQL text plus positional parameters ($1, $2, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

/// A single unit of work queued on a query service.
///
/// Providers build these; backends execute them. Every variant yields rows that
/// decode into the models under `database::models`.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateAccount {
        display_name: String,
        biography: String,
        password_hash: String,
        salt_value: String,
    },
    FetchAuthentication {
        display_name: String,
    },
    FetchProfile {
        display_name: String,
    },
    CreateConcept {
        author: String,
        title: String,
        description: String,
        diagram: Value,
    },
    FindConcept {
        author: String,
        title: String,
    },
    LinkConcepts {
        ancestor: String,
        descendant: String,
    },
    Ancestors {
        identifier: String,
        max_depth: u32,
    },
    Descendants {
        identifier: String,
        max_depth: u32,
    },
    InsertLiking {
        display_name: String,
        concept_id: String,
    },
    RevokeLiking {
        display_name: String,
        concept_id: String,
    },
    CheckLiking {
        display_name: String,
        concept_id: String,
    },
    InsertFollowing {
        follower: String,
        followee: String,
    },
    RevokeFollowing {
        follower: String,
        followee: String,
    },
    CheckFollowing {
        follower: String,
        followee: String,
    },
    CreateComment {
        author: String,
        concept_id: String,
        free_text: String,
        response_to: Option<i64>,
    },
    CommentsOn {
        concept_id: String,
        response_to: Option<i64>,
    },
    Ping,
    Raw(SqlResult),
}

const ANCESTORS_SQL: &str = "\
WITH RECURSIVE lineage (ancestor, descendant, depth) AS (
    SELECT ancestor, descendant, 1 FROM concept_links WHERE descendant = $1
    UNION
    SELECT l.ancestor, l.descendant, lineage.depth + 1
    FROM concept_links l JOIN lineage ON l.descendant = lineage.ancestor
    WHERE lineage.depth < $2
)
SELECT ancestor, descendant, depth FROM lineage";

const DESCENDANTS_SQL: &str = "\
WITH RECURSIVE lineage (ancestor, descendant, depth) AS (
    SELECT ancestor, descendant, 1 FROM concept_links WHERE ancestor = $1
    UNION
    SELECT l.ancestor, l.descendant, lineage.depth + 1
    FROM concept_links l JOIN lineage ON l.ancestor = lineage.descendant
    WHERE lineage.depth < $2
)
SELECT ancestor, descendant, depth FROM lineage";

impl Statement {
    /// Hand-written SQL for the raw query service. Only the Postgres backend runs these.
    pub fn raw(query: impl Into<String>, params: Vec<Value>) -> Self {
        Statement::Raw(SqlResult { query: query.into(), params })
    }

    /// Short label used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Statement::CreateAccount { .. } => "create_account",
            Statement::FetchAuthentication { .. } => "fetch_authentication",
            Statement::FetchProfile { .. } => "fetch_profile",
            Statement::CreateConcept { .. } => "create_concept",
            Statement::FindConcept { .. } => "find_concept",
            Statement::LinkConcepts { .. } => "link_concepts",
            Statement::Ancestors { .. } => "ancestors",
            Statement::Descendants { .. } => "descendants",
            Statement::InsertLiking { .. } => "insert_liking",
            Statement::RevokeLiking { .. } => "revoke_liking",
            Statement::CheckLiking { .. } => "check_liking",
            Statement::InsertFollowing { .. } => "insert_following",
            Statement::RevokeFollowing { .. } => "revoke_following",
            Statement::CheckFollowing { .. } => "check_following",
            Statement::CreateComment { .. } => "create_comment",
            Statement::CommentsOn { .. } => "comments_on",
            Statement::Ping => "ping",
            Statement::Raw(_) => "raw",
        }
    }

    /// Writes are wrapped in a CTE so their RETURNING rows can be projected as JSON
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Statement::CreateAccount { .. }
                | Statement::CreateConcept { .. }
                | Statement::LinkConcepts { .. }
                | Statement::InsertLiking { .. }
                | Statement::RevokeLiking { .. }
                | Statement::InsertFollowing { .. }
                | Statement::RevokeFollowing { .. }
                | Statement::CreateComment { .. }
        )
    }

    fn order_by(&self) -> Option<&'static str> {
        match self {
            Statement::Ancestors { .. } | Statement::Descendants { .. } => {
                Some("q.depth, q.ancestor, q.descendant")
            }
            Statement::CommentsOn { .. } => Some("q.created_at, q.comment_id"),
            _ => None,
        }
    }

    pub fn to_sql(&self) -> SqlResult {
        let (query, params): (&str, Vec<Value>) = match self {
            Statement::CreateAccount { display_name, biography, password_hash, salt_value } => (
                "INSERT INTO accounts (display_name, preferred_name, biography, password_hash, salt_value) \
                 VALUES ($1, $1, $2, $3, $4) RETURNING display_name",
                vec![json!(display_name), json!(biography), json!(password_hash), json!(salt_value)],
            ),
            Statement::FetchAuthentication { display_name } => (
                "SELECT display_name, password_hash, salt_value FROM accounts WHERE display_name = $1",
                vec![json!(display_name)],
            ),
            Statement::FetchProfile { display_name } => (
                "SELECT display_name, preferred_name, biography FROM accounts WHERE display_name = $1",
                vec![json!(display_name)],
            ),
            Statement::CreateConcept { author, title, description, diagram } => (
                "INSERT INTO concepts (author, title, description, diagram) \
                 VALUES ($1, $2, $3, $4::jsonb) RETURNING identifier",
                vec![json!(author), json!(title), json!(description), diagram.clone()],
            ),
            Statement::FindConcept { author, title } => (
                "SELECT identifier, author, title, description, diagram FROM concepts \
                 WHERE author = $1 AND title = $2",
                vec![json!(author), json!(title)],
            ),
            Statement::LinkConcepts { ancestor, descendant } => (
                "INSERT INTO concept_links (ancestor, descendant) VALUES ($1, $2) \
                 RETURNING ancestor, descendant",
                vec![json!(ancestor), json!(descendant)],
            ),
            Statement::Ancestors { identifier, max_depth } => {
                (ANCESTORS_SQL, vec![json!(identifier), json!(max_depth)])
            }
            Statement::Descendants { identifier, max_depth } => {
                (DESCENDANTS_SQL, vec![json!(identifier), json!(max_depth)])
            }
            Statement::InsertLiking { display_name, concept_id } => (
                "INSERT INTO likes (display_name, concept_id) VALUES ($1, $2) \
                 RETURNING display_name, concept_id",
                vec![json!(display_name), json!(concept_id)],
            ),
            Statement::RevokeLiking { display_name, concept_id } => (
                "DELETE FROM likes WHERE display_name = $1 AND concept_id = $2 \
                 RETURNING display_name, concept_id",
                vec![json!(display_name), json!(concept_id)],
            ),
            Statement::CheckLiking { display_name, concept_id } => (
                "SELECT display_name, concept_id FROM likes WHERE display_name = $1 AND concept_id = $2",
                vec![json!(display_name), json!(concept_id)],
            ),
            Statement::InsertFollowing { follower, followee } => (
                "INSERT INTO follows (follower, followee) VALUES ($1, $2) RETURNING follower, followee",
                vec![json!(follower), json!(followee)],
            ),
            Statement::RevokeFollowing { follower, followee } => (
                "DELETE FROM follows WHERE follower = $1 AND followee = $2 RETURNING follower, followee",
                vec![json!(follower), json!(followee)],
            ),
            Statement::CheckFollowing { follower, followee } => (
                "SELECT follower, followee FROM follows WHERE follower = $1 AND followee = $2",
                vec![json!(follower), json!(followee)],
            ),
            Statement::CreateComment { author, concept_id, free_text, response_to } => (
                "INSERT INTO comments (comment_on, comment_by, free_text, parent) \
                 VALUES ($1, $2, $3, $4::bigint) RETURNING comment_id",
                vec![json!(concept_id), json!(author), json!(free_text), json!(response_to)],
            ),
            Statement::CommentsOn { concept_id, response_to } => (
                "SELECT comment_id, comment_on, comment_by, free_text, parent, created_at FROM comments \
                 WHERE comment_on = $1 AND parent IS NOT DISTINCT FROM $2::bigint",
                vec![json!(concept_id), json!(response_to)],
            ),
            Statement::Ping => ("SELECT 1 AS ok", vec![]),
            Statement::Raw(sql) => return sql.clone(),
        };

        SqlResult { query: query.to_string(), params }
    }

    /// Render the statement so that each result row comes back as a single JSON column named `row`
    pub fn to_row_query(&self) -> SqlResult {
        let SqlResult { query, params } = self.to_sql();
        let order = self
            .order_by()
            .map(|columns| format!(" ORDER BY {}", columns))
            .unwrap_or_default();

        let query = if self.is_write() {
            format!("WITH q AS ({}) SELECT row_to_json(q) AS row FROM q{}", query, order)
        } else {
            format!("SELECT row_to_json(q) AS row FROM ({}) q{}", query, order)
        };

        SqlResult { query, params }
    }
}
