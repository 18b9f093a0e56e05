mod reference;
mod user;

pub use reference::{cmd_add_ingredient, cmd_add_tag};
pub use user::{cmd_create_user, cmd_token};
