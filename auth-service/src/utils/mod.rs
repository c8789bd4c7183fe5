pub mod password;
pub mod validation;

#[cfg(test)]
pub mod test_keys;

pub use password::{hash_password, verify_password, Password, PasswordHashString};
pub use validation::ValidatedJson;
