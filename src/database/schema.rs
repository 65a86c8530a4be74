// database/schema.rs - relational layout backing the Postgres session factory

/// DDL applied in order by `PgSessionFactory::apply_schema`
pub const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS accounts (
    display_name VARCHAR(64) PRIMARY KEY,
    preferred_name VARCHAR(255) NOT NULL,
    biography TEXT NOT NULL,
    password_hash CHAR(64) NOT NULL,
    salt_value CHAR(64) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)"#,
    r#"CREATE TABLE IF NOT EXISTS concepts (
    author VARCHAR(64) NOT NULL REFERENCES accounts (display_name),
    title VARCHAR(128) NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    diagram JSONB NOT NULL DEFAULT '{}'::jsonb,
    identifier VARCHAR(193) GENERATED ALWAYS AS (author || '/' || title) STORED UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (author, title)
)"#,
    r#"CREATE TABLE IF NOT EXISTS concept_links (
    ancestor VARCHAR(193) NOT NULL REFERENCES concepts (identifier),
    descendant VARCHAR(193) NOT NULL REFERENCES concepts (identifier),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (ancestor, descendant),
    CHECK (ancestor <> descendant)
)"#,
    r#"CREATE TABLE IF NOT EXISTS likes (
    display_name VARCHAR(64) NOT NULL REFERENCES accounts (display_name),
    concept_id VARCHAR(193) NOT NULL REFERENCES concepts (identifier),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (display_name, concept_id)
)"#,
    r#"CREATE TABLE IF NOT EXISTS follows (
    follower VARCHAR(64) NOT NULL REFERENCES accounts (display_name),
    followee VARCHAR(64) NOT NULL REFERENCES accounts (display_name),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (follower, followee),
    CHECK (follower <> followee)
)"#,
    r#"CREATE TABLE IF NOT EXISTS comments (
    comment_id BIGSERIAL PRIMARY KEY,
    comment_on VARCHAR(193) NOT NULL REFERENCES concepts (identifier),
    comment_by VARCHAR(64) NOT NULL REFERENCES accounts (display_name),
    free_text TEXT NOT NULL,
    parent BIGINT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (comment_id, comment_on),
    FOREIGN KEY (parent, comment_on) REFERENCES comments (comment_id, comment_on)
)"#,
    "CREATE INDEX IF NOT EXISTS concept_links_descendant_idx ON concept_links (descendant)",
    "CREATE INDEX IF NOT EXISTS comments_thread_idx ON comments (comment_on, parent)",
];

/// Full script, for printing
pub fn script() -> String {
    STATEMENTS.iter().map(|s| format!("{};\n", s)).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_created_before_they_are_referenced() {
        let position = |table: &str| {
            STATEMENTS
                .iter()
                .position(|s| s.starts_with(&format!("CREATE TABLE IF NOT EXISTS {} ", table)))
                .unwrap()
        };
        assert!(position("accounts") < position("concepts"));
        assert!(position("concepts") < position("concept_links"));
        assert!(position("concepts") < position("comments"));
    }

    #[test]
    fn self_links_and_self_follows_are_checked() {
        let script = script();
        assert!(script.contains("CHECK (ancestor <> descendant)"));
        assert!(script.contains("CHECK (follower <> followee)"));
    }

    #[test]
    fn replies_are_keyed_to_their_parents_concept() {
        assert!(script().contains("FOREIGN KEY (parent, comment_on) REFERENCES comments (comment_id, comment_on)"));
    }
}
