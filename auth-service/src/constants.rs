//! Reserved attribute, claim and metadata keys shared across the token
//! issuance pipeline and its consumers.

/// Organization-context id: reserved Authorization attribute key and the
/// access-token claim it propagates into, verbatim.
pub const ORGANIZATION_ID_KEY: &str = "org_id";

/// Numeric user-id access-token claim.
pub const USER_ID_KEY: &str = "user_id";

/// List-of-strings role access-token claim.
pub const ROLE_KEY: &str = "role";

/// Authorization attribute holding the authenticated principal.
pub const PRINCIPAL_KEY: &str = "principal";

/// Token metadata flag: set to `false` at issuance, flipped on revocation.
pub const INVALIDATED_METADATA_KEY: &str = "invalidated";

/// Token metadata entry carrying the generated claims, if any.
pub const CLAIMS_METADATA_KEY: &str = "claims";
