pub mod authorization;
pub mod client;
pub mod principal;
pub mod role;
pub mod user;

pub use authorization::{Authorization, GrantType, TokenRecord};
pub use client::RegisteredClient;
pub use principal::UserPrincipal;
pub use role::Role;
pub use user::User;
