pub mod auth_client;
pub mod error;
pub mod verifier;

pub use auth_client::AuthServiceClient;
pub use error::GatewayError;
pub use verifier::{AuthenticatedPrincipal, ClaimsResolver, TokenVerifier};
