use chrono::NaiveDateTime;
use serde::Serialize;

/// Local record tying an entity (user, organization, ...) to a remote billing
/// account. At most one mapping per (entity_type, entity_id) and at most one
/// per account_code.
#[derive(Debug, Clone, Serialize)]
pub struct AccountMapping {
    pub entity_type: String,
    pub entity_id: i64,
    pub account_code: String,
    /// Set when the remote side of this mapping could not be reached or no
    /// longer exists. Orphaned mappings keep local pages working but block
    /// remote updates.
    pub orphaned: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl AccountMapping {
    /// A fresh, non-orphaned mapping. Timestamps are filled in by the
    /// database on insert.
    pub fn new(entity_type: &str, entity_id: i64, account_code: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            entity_id,
            account_code: account_code.to_string(),
            orphaned: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// The conventional account code for an entity: `"{entity_type}-{id}"`.
    pub fn code_for(entity_type: &str, entity_id: i64) -> String {
        format!("{}-{}", entity_type, entity_id)
    }

    /// Reverse of [`AccountMapping::code_for`]: splits an account code into
    /// its entity type and numeric id, if it follows the convention.
    pub fn parse_code(account_code: &str) -> Option<(&str, i64)> {
        let (entity_type, id) = account_code.rsplit_once('-')?;
        if entity_type.is_empty() {
            return None;
        }
        let entity_id = id.parse::<i64>().ok()?;
        Some((entity_type, entity_id))
    }
}
