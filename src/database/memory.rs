use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::database::models::{
    AccountCreated, AuthenticationInfo, CommentCreated, CommentRow, ConceptCreated, ConceptRow,
    FollowRow, LikeRow, LinkRow, ProfileRow,
};
use crate::database::query::{QueryError, QueryResults, Session, SessionFactory};
use crate::database::statement::Statement;
use crate::lineage::LineageEdge;

#[derive(Debug, Clone)]
struct AccountEntry {
    preferred_name: String,
    biography: String,
    password_hash: String,
    salt_value: String,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    accounts: BTreeMap<String, AccountEntry>,
    concepts: BTreeMap<String, ConceptRow>,
    links: BTreeSet<(String, String)>,
    likes: BTreeSet<(String, String)>,
    follows: BTreeSet<(String, String)>,
    comments: Vec<CommentRow>,
    next_comment_id: i64,
}

/// In-process relational store with the same keys, references and checks as the
/// Postgres schema.
///
/// Sessions are serialised: a session holds the store lock from open until it is
/// committed, rolled back or dropped, and works on a private copy of the tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    opened: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions opened since construction
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for MemoryStore {
    async fn open(&self) -> Result<Box<dyn Session>, QueryError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession { guard: Some(guard), working }))
    }
}

struct MemorySession {
    guard: Option<OwnedMutexGuard<Tables>>,
    working: Tables,
}

#[async_trait]
impl Session for MemorySession {
    async fn execute(&mut self, statement: &Statement) -> Result<QueryResults, QueryError> {
        if self.guard.is_none() {
            return Err(QueryError::NoSession);
        }
        self.working.apply(statement)
    }

    async fn commit(&mut self) -> Result<(), QueryError> {
        let mut guard = self.guard.take().ok_or(QueryError::NoSession)?;
        *guard = std::mem::take(&mut self.working);
        debug!("Memory session committed");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), QueryError> {
        self.guard.take().ok_or(QueryError::NoSession)?;
        self.working = Tables::default();
        Ok(())
    }
}

fn rows<T: Serialize>(items: impl IntoIterator<Item = T>) -> Result<QueryResults, QueryError> {
    let rows = items
        .into_iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(QueryResults::new(rows))
}

fn walk(links: &BTreeSet<(String, String)>, from: &str, max_depth: u32, upward: bool) -> Vec<LineageEdge> {
    let mut found: BTreeSet<(i64, String, String)> = BTreeSet::new();
    let mut frontier = vec![from.to_string()];

    for depth in 1..=i64::from(max_depth) {
        let mut next = Vec::new();
        for node in &frontier {
            for (ancestor, descendant) in links {
                let (near, far) = if upward { (descendant, ancestor) } else { (ancestor, descendant) };
                if near == node && found.insert((depth, ancestor.clone(), descendant.clone())) {
                    next.push(far.clone());
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    found
        .into_iter()
        .map(|(depth, ancestor, descendant)| LineageEdge { ancestor, descendant, depth })
        .collect()
}

impl Tables {
    fn apply(&mut self, statement: &Statement) -> Result<QueryResults, QueryError> {
        match statement {
            Statement::CreateAccount { display_name, biography, password_hash, salt_value } => {
                if self.accounts.contains_key(display_name) {
                    return Err(QueryError::Duplicate(format!("accounts({})", display_name)));
                }
                self.accounts.insert(
                    display_name.clone(),
                    AccountEntry {
                        preferred_name: display_name.clone(),
                        biography: biography.clone(),
                        password_hash: password_hash.clone(),
                        salt_value: salt_value.clone(),
                    },
                );
                rows([AccountCreated { display_name: display_name.clone() }])
            }
            Statement::FetchAuthentication { display_name } => rows(self.accounts.get(display_name).map(|a| {
                AuthenticationInfo {
                    display_name: display_name.clone(),
                    password_hash: a.password_hash.clone(),
                    salt_value: a.salt_value.clone(),
                }
            })),
            Statement::FetchProfile { display_name } => rows(self.accounts.get(display_name).map(|a| ProfileRow {
                display_name: display_name.clone(),
                preferred_name: a.preferred_name.clone(),
                biography: a.biography.clone(),
            })),
            Statement::CreateConcept { author, title, description, diagram } => {
                let identifier = format!("{}/{}", author, title);
                if self.concepts.contains_key(&identifier) {
                    return Err(QueryError::Duplicate(format!("concepts({})", identifier)));
                }
                if !self.accounts.contains_key(author) {
                    return Err(QueryError::InvalidReference(format!("accounts({})", author)));
                }
                self.concepts.insert(
                    identifier.clone(),
                    ConceptRow {
                        identifier: identifier.clone(),
                        author: author.clone(),
                        title: title.clone(),
                        description: description.clone(),
                        diagram: diagram.clone(),
                    },
                );
                rows([ConceptCreated { identifier }])
            }
            Statement::FindConcept { author, title } => {
                rows(self.concepts.get(&format!("{}/{}", author, title)).cloned())
            }
            Statement::LinkConcepts { ancestor, descendant } => {
                if ancestor == descendant {
                    return Err(QueryError::Constraint("concept_links_check".to_string()));
                }
                let key = (ancestor.clone(), descendant.clone());
                if self.links.contains(&key) {
                    return Err(QueryError::Duplicate(format!("concept_links({}, {})", ancestor, descendant)));
                }
                for end in [ancestor, descendant] {
                    if !self.concepts.contains_key(end) {
                        return Err(QueryError::InvalidReference(format!("concepts({})", end)));
                    }
                }
                self.links.insert(key);
                rows([LinkRow { ancestor: ancestor.clone(), descendant: descendant.clone() }])
            }
            Statement::Ancestors { identifier, max_depth } => rows(walk(&self.links, identifier, *max_depth, true)),
            Statement::Descendants { identifier, max_depth } => {
                rows(walk(&self.links, identifier, *max_depth, false))
            }
            Statement::InsertLiking { display_name, concept_id } => {
                let key = (display_name.clone(), concept_id.clone());
                if self.likes.contains(&key) {
                    return Err(QueryError::Duplicate(format!("likes({}, {})", display_name, concept_id)));
                }
                if !self.accounts.contains_key(display_name) {
                    return Err(QueryError::InvalidReference(format!("accounts({})", display_name)));
                }
                if !self.concepts.contains_key(concept_id) {
                    return Err(QueryError::InvalidReference(format!("concepts({})", concept_id)));
                }
                self.likes.insert(key);
                rows([LikeRow { display_name: display_name.clone(), concept_id: concept_id.clone() }])
            }
            Statement::RevokeLiking { display_name, concept_id } => {
                let key = (display_name.clone(), concept_id.clone());
                let removed = self.likes.remove(&key);
                rows(removed.then(|| LikeRow { display_name: key.0, concept_id: key.1 }))
            }
            Statement::CheckLiking { display_name, concept_id } => {
                let key = (display_name.clone(), concept_id.clone());
                let exists = self.likes.contains(&key);
                rows(exists.then(|| LikeRow { display_name: key.0, concept_id: key.1 }))
            }
            Statement::InsertFollowing { follower, followee } => {
                if follower == followee {
                    return Err(QueryError::Constraint("follows_check".to_string()));
                }
                let key = (follower.clone(), followee.clone());
                if self.follows.contains(&key) {
                    return Err(QueryError::Duplicate(format!("follows({}, {})", follower, followee)));
                }
                for account in [follower, followee] {
                    if !self.accounts.contains_key(account) {
                        return Err(QueryError::InvalidReference(format!("accounts({})", account)));
                    }
                }
                self.follows.insert(key);
                rows([FollowRow { follower: follower.clone(), followee: followee.clone() }])
            }
            Statement::RevokeFollowing { follower, followee } => {
                let key = (follower.clone(), followee.clone());
                let removed = self.follows.remove(&key);
                rows(removed.then(|| FollowRow { follower: key.0, followee: key.1 }))
            }
            Statement::CheckFollowing { follower, followee } => {
                let key = (follower.clone(), followee.clone());
                let exists = self.follows.contains(&key);
                rows(exists.then(|| FollowRow { follower: key.0, followee: key.1 }))
            }
            Statement::CreateComment { author, concept_id, free_text, response_to } => {
                if !self.accounts.contains_key(author) {
                    return Err(QueryError::InvalidReference(format!("accounts({})", author)));
                }
                if !self.concepts.contains_key(concept_id) {
                    return Err(QueryError::InvalidReference(format!("concepts({})", concept_id)));
                }
                if let Some(parent) = response_to {
                    // A reply must sit on the same concept as its parent
                    if !self.comments.iter().any(|c| c.comment_id == *parent && &c.comment_on == concept_id) {
                        return Err(QueryError::InvalidReference(format!("comments({})", parent)));
                    }
                }
                self.next_comment_id += 1;
                let comment_id = self.next_comment_id;
                self.comments.push(CommentRow {
                    comment_id,
                    comment_on: concept_id.clone(),
                    comment_by: author.clone(),
                    free_text: free_text.clone(),
                    parent: *response_to,
                    created_at: Utc::now(),
                });
                rows([CommentCreated { comment_id }])
            }
            Statement::CommentsOn { concept_id, response_to } => {
                let mut thread: Vec<&CommentRow> = self
                    .comments
                    .iter()
                    .filter(|c| &c.comment_on == concept_id && c.parent == *response_to)
                    .collect();
                thread.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.comment_id.cmp(&b.comment_id)));
                rows(thread)
            }
            Statement::Ping => Ok(QueryResults::new(vec![json!({ "ok": 1 })])),
            Statement::Raw(_) => Err(QueryError::Unsupported(statement.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(store: &MemoryStore, statements: Vec<Statement>) -> Result<QueryResults, QueryError> {
        let mut session = store.open().await?;
        let mut last = QueryResults::default();
        for statement in &statements {
            match session.execute(statement).await {
                Ok(results) => last = results,
                Err(e) => {
                    session.rollback().await?;
                    return Err(e);
                }
            }
        }
        session.commit().await?;
        Ok(last)
    }

    fn account(name: &str) -> Statement {
        Statement::CreateAccount {
            display_name: name.into(),
            biography: String::new(),
            password_hash: "h".into(),
            salt_value: "s".into(),
        }
    }

    fn concept(author: &str, title: &str) -> Statement {
        Statement::CreateConcept {
            author: author.into(),
            title: title.into(),
            description: String::new(),
            diagram: json!({}),
        }
    }

    fn link(a: &str, d: &str) -> Statement {
        Statement::LinkConcepts { ancestor: a.into(), descendant: d.into() }
    }

    #[tokio::test]
    async fn duplicate_keys_are_reported_as_duplicates() {
        let store = MemoryStore::new();
        run(&store, vec![account("alice")]).await.unwrap();

        let err = run(&store, vec![account("alice")]).await.unwrap_err();
        assert!(matches!(err, QueryError::Duplicate(_)));
    }

    #[tokio::test]
    async fn links_require_both_concepts() {
        let store = MemoryStore::new();
        run(&store, vec![account("alice"), concept("alice", "one")]).await.unwrap();

        let err = run(&store, vec![link("alice/one", "alice/two")]).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn rolled_back_sessions_leave_no_trace() {
        let store = MemoryStore::new();
        let err = run(&store, vec![account("alice"), account("alice")]).await.unwrap_err();
        assert!(matches!(err, QueryError::Duplicate(_)));

        let found = run(&store, vec![Statement::FetchProfile { display_name: "alice".into() }])
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn walks_stop_at_the_depth_cap() {
        let store = MemoryStore::new();
        let mut setup = vec![account("a")];
        for title in ["1", "2", "3", "4"] {
            setup.push(concept("a", title));
        }
        setup.extend([link("a/1", "a/2"), link("a/2", "a/3"), link("a/3", "a/4")]);
        run(&store, setup).await.unwrap();

        let down = run(&store, vec![Statement::Descendants { identifier: "a/1".into(), max_depth: 2 }])
            .await
            .unwrap()
            .all::<LineageEdge>()
            .unwrap();
        assert_eq!(down.len(), 2);
        assert_eq!(down.last().map(|e| e.descendant.as_str()), Some("a/3"));

        let up = run(&store, vec![Statement::Ancestors { identifier: "a/4".into(), max_depth: 10 }])
            .await
            .unwrap()
            .all::<LineageEdge>()
            .unwrap();
        assert_eq!(up.iter().map(|e| e.depth).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn comment_threads_follow_their_parent() {
        let store = MemoryStore::new();
        run(&store, vec![account("alice"), concept("alice", "idea")]).await.unwrap();

        let top = |text: &str| Statement::CreateComment {
            author: "alice".into(),
            concept_id: "alice/idea".into(),
            free_text: text.into(),
            response_to: None,
        };
        let first: CommentCreated = run(&store, vec![top("first")]).await.unwrap().one().unwrap();
        run(&store, vec![top("second")]).await.unwrap();
        run(
            &store,
            vec![Statement::CreateComment {
                author: "alice".into(),
                concept_id: "alice/idea".into(),
                free_text: "reply".into(),
                response_to: Some(first.comment_id),
            }],
        )
        .await
        .unwrap();

        let thread = run(&store, vec![Statement::CommentsOn { concept_id: "alice/idea".into(), response_to: None }])
            .await
            .unwrap()
            .all::<CommentRow>()
            .unwrap();
        assert_eq!(thread.iter().map(|c| c.free_text.as_str()).collect::<Vec<_>>(), vec!["first", "second"]);

        let replies = run(
            &store,
            vec![Statement::CommentsOn { concept_id: "alice/idea".into(), response_to: Some(first.comment_id) }],
        )
        .await
        .unwrap();
        assert_eq!(replies.len(), 1);
    }

    #[tokio::test]
    async fn replies_cannot_cross_concepts() {
        let store = MemoryStore::new();
        run(&store, vec![account("alice"), concept("alice", "idea"), concept("alice", "other")])
            .await
            .unwrap();

        let comment = |concept_id: &str, response_to: Option<i64>| Statement::CreateComment {
            author: "alice".into(),
            concept_id: concept_id.into(),
            free_text: "text".into(),
            response_to,
        };
        let parent: CommentCreated = run(&store, vec![comment("alice/idea", None)]).await.unwrap().one().unwrap();

        let err = run(&store, vec![comment("alice/other", Some(parent.comment_id))]).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidReference(_)));

        run(&store, vec![comment("alice/idea", Some(parent.comment_id))]).await.unwrap();
    }
}
