use crate::database::{QueryService, Statement};
use crate::services::DataService;

/// Likes, follows and comments
pub struct EngagementService {
    queries: QueryService,
}

impl EngagementService {
    pub fn new(queries: QueryService) -> Self {
        Self { queries }
    }

    pub fn insert_liking(display_name: &str, concept_id: &str) -> Statement {
        Statement::InsertLiking { display_name: display_name.to_string(), concept_id: concept_id.to_string() }
    }

    pub fn revoke_liking(display_name: &str, concept_id: &str) -> Statement {
        Statement::RevokeLiking { display_name: display_name.to_string(), concept_id: concept_id.to_string() }
    }

    pub fn check_liking(display_name: &str, concept_id: &str) -> Statement {
        Statement::CheckLiking { display_name: display_name.to_string(), concept_id: concept_id.to_string() }
    }

    pub fn insert_following(follower: &str, followee: &str) -> Statement {
        Statement::InsertFollowing { follower: follower.to_string(), followee: followee.to_string() }
    }

    pub fn revoke_following(follower: &str, followee: &str) -> Statement {
        Statement::RevokeFollowing { follower: follower.to_string(), followee: followee.to_string() }
    }

    pub fn check_following(follower: &str, followee: &str) -> Statement {
        Statement::CheckFollowing { follower: follower.to_string(), followee: followee.to_string() }
    }

    pub fn create_comment(author: &str, concept_id: &str, free_text: &str, response_to: Option<i64>) -> Statement {
        Statement::CreateComment {
            author: author.to_string(),
            concept_id: concept_id.to_string(),
            free_text: free_text.to_string(),
            response_to,
        }
    }

    /// Direct replies to `response_to`, or top-level comments when it is `None`
    pub fn comments_on(concept_id: &str, response_to: Option<i64>) -> Statement {
        Statement::CommentsOn { concept_id: concept_id.to_string(), response_to }
    }
}

impl DataService for EngagementService {
    fn queries(&mut self) -> &mut QueryService {
        &mut self.queries
    }
}
