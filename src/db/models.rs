mod chat;
mod document;
mod prompt;
mod tenant;
mod user;

use super::schema;

pub use chat::*;
pub use document::*;
pub use prompt::*;
pub use tenant::*;
pub use user::*;

/// New 32-character hex identifier for string primary keys
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use diesel::{debug_query, pg::Pg, prelude::*};

    use super::*;

    #[test]
    fn models_select_from_their_tables() {
        let sql = debug_query::<Pg, _>(&schema::users::table.select(User::as_select())).to_string();
        assert!(sql.contains(r#"FROM "users""#));

        let sql = debug_query::<Pg, _>(
            &schema::chat_history::table.select(ChatHistory::as_select()),
        )
        .to_string();
        assert!(sql.contains(r#""chat_history"."think_content""#));

        let sql = debug_query::<Pg, _>(
            &schema::tenant_users::table.select(TenantUser::as_select()),
        )
        .to_string();
        assert!(sql.contains(r#""tenant_users"."role_type""#));
    }

    #[test]
    fn new_ids_are_simple_uuids() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_id());
    }
}
