pub mod config;
pub mod login;
pub mod logout;
pub mod password_reset;
pub mod refresh;
pub mod tokens;
pub mod validate_access;

pub use config::AuthConfig;
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use password_reset::PasswordResetUseCase;
pub use refresh::{RefreshOutput, RefreshUseCase};
pub use tokens::{AccessClaims, RefreshClaims, TokenCodec, TokenRejection};
pub use validate_access::{AuthContext, ValidateAccessUseCase};
