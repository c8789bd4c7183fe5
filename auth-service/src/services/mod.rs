pub mod database;
pub mod error;
pub mod grant;
pub mod issuance;
pub mod jwt;
pub mod organization_client;
pub mod store;

pub use database::Database;
pub use error::ServiceError;
pub use grant::{
    GrantProvider, GrantProviderRegistry, PasswordGrantProvider, RefreshTokenGrantProvider,
    TokenRequest,
};
pub use issuance::{
    GeneratedToken, JwtTokenGenerator, TokenContext, TokenGenerator, TokenIssuer, TokenResponse,
};
pub use jwt::JwtService;
pub use organization_client::OrganizationClient;
pub use store::{
    AuthorizationStore, ClientStore, CredentialStore, InMemoryAuthorizationStore,
    OrganizationResolver,
};
