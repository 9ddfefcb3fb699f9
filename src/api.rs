mod chat;
mod prompt;
pub mod result;
mod tenant;
mod user;

pub use chat::get_routes as chat_routes;
pub use prompt::get_routes as prompt_routes;
pub use tenant::get_routes as tenant_routes;
pub use user::get_routes as user_routes;
