mod chat;
mod document;
mod model_config;
mod prompt;
mod tenant;
mod user;

pub use chat::ChatDbService;
pub use document::DocumentDbService;
pub use model_config::ModelConfigDbService;
pub use prompt::PromptDbService;
pub use tenant::TenantDbService;
pub use user::UserDbService;

/// `ILIKE` pattern matching `keyword` anywhere, with wildcards in the keyword escaped
pub(crate) fn contains_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
