//! Registration and login, independent of the transport serving them.

use tracing::{info, warn};

use super::{
    dto::{LoginHint, LoginRequest, LoginResponse, PublicUser, RegisterRequest, RegisterResponse},
    jwt::{JwtKeys, SignedToken},
    password,
};
use crate::{
    error::{ApiError, ApiResult},
    store::{
        types::is_valid_email, CredentialStore, IssuedToken, LoginIdentifier, NewUser, Role,
    },
};

/// Result of a successful login: the token still has to be handed to the
/// client by the adapter (cookie).
#[derive(Debug)]
pub struct LoginOutcome {
    pub token: SignedToken,
    pub response: LoginResponse,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

pub async fn register(
    store: &dyn CredentialStore,
    req: RegisterRequest,
) -> ApiResult<RegisterResponse> {
    let (Some(uname), Some(plain), Some(email), Some(phone)) = (
        present(req.uname),
        present(req.password),
        present(req.email),
        present(req.phone),
    ) else {
        return Err(ApiError::Validation(
            "Username, password, email, and phone are required".into(),
        ));
    };

    if present(req.role).is_some_and(|role| role != Role::Customer.as_str()) {
        warn!(username = %uname, "registration with non-customer role");
        return Err(ApiError::Validation(
            "Only Customer role is allowed during registration".into(),
        ));
    }

    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email format".into()));
    }

    let password_hash = password::hash(plain).await?;

    let user_id = store
        .create_user(NewUser {
            username: uname.clone(),
            email: email.clone(),
            password_hash,
            phone,
            role: Role::Customer,
        })
        .await?;

    info!(%user_id, username = %uname, "user registered");
    Ok(RegisterResponse {
        success: true,
        message: "User registered successfully",
        login_hint: LoginHint {
            username: uname,
            email,
        },
    })
}

/// Unknown identifier and wrong password fail identically.
pub async fn login(
    store: &dyn CredentialStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> ApiResult<LoginOutcome> {
    let identifier = req.identifier().map(str::to_owned);
    let (Some(identifier), Some(plain)) = (identifier, present(req.password)) else {
        return Err(ApiError::Validation(
            "Username/email and password are required".into(),
        ));
    };

    let lookup = LoginIdentifier::classify(&identifier);
    let Some(user) = store.find_by_identifier(&lookup).await? else {
        warn!(?lookup, "login for unknown user");
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify(plain, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = keys.issue(&user.username, user.role).map_err(ApiError::internal)?;

    store
        .record_issued_token(&IssuedToken {
            token: token.token.clone(),
            user_id: user.id,
            expires_at: token.expires_at,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, role = %user.role, "user logged in");
    Ok(LoginOutcome {
        token,
        response: LoginResponse {
            success: true,
            message: "Login successful",
            user: PublicUser {
                username: user.username,
                email: user.email,
                role: user.role,
            },
        },
    })
}
