use axum::{Extension, Json, extract::State};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
        UserResponse,
    },
    queries::user_queries,
    utils::{extractors::extract_user_id, jwt, jwt::Claims},
};

const MIN_PASSWORD_LENGTH: usize = 6;

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    validate_registration(&payload)?;

    if user_queries::find_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Already registered, please login".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

    let user = user_queries::create_user(&state.db, &payload, &password_hash).await?;

    let token = jwt::generate_token(user.id, &user.email, user.role)?;

    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

fn validate_registration(payload: &RegisterRequest) -> Result<()> {
    if payload.username.trim().is_empty() {
        return Err(AppError::BadRequest("Username is required".to_string()));
    }

    if payload.email.is_empty() || !payload.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    if payload.phone.trim().is_empty() {
        return Err(AppError::BadRequest("Phone is required".to_string()));
    }

    if payload.address.trim().is_empty() {
        return Err(AppError::BadRequest("Address is required".to_string()));
    }

    if payload.answer.trim().is_empty() {
        return Err(AppError::BadRequest("Answer is required".to_string()));
    }

    Ok(())
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = user_queries::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let is_valid = bcrypt::verify(&payload.password, &user.password)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {}", e)))?;

    if !is_valid {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = jwt::generate_token(user.id, &user.email, user.role)?;

    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    if payload.email.is_empty() {
        return Err(AppError::BadRequest("Email is required".to_string()));
    }

    if payload.answer.is_empty() {
        return Err(AppError::BadRequest("Answer is required".to_string()));
    }

    if payload.new_password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(
            "New password must be at least 6 characters".to_string(),
        ));
    }

    let user = user_queries::find_by_email_and_answer(&state.db, &payload.email, &payload.answer)
        .await?
        .ok_or_else(|| AppError::NotFound("Wrong email or answer".to_string()))?;

    let password_hash = bcrypt::hash(&payload.new_password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

    user_queries::update_password(&state.db, user.id, &password_hash).await?;

    Ok(Json(
        serde_json::json!({ "message": "Password reset successfully" }),
    ))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    let user_id = extract_user_id(&claims)?;

    let user = user_queries::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let password_hash = match &payload.password {
        Some(password) => {
            if password.len() < MIN_PASSWORD_LENGTH {
                return Err(AppError::BadRequest(
                    "Password must be at least 6 characters".to_string(),
                ));
            }
            bcrypt::hash(password, bcrypt::DEFAULT_COST)
                .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?
        }
        None => user.password.clone(),
    };

    let updated = user_queries::update_profile(
        &state.db,
        user_id,
        payload.username.as_deref().unwrap_or(&user.username),
        &password_hash,
        payload.phone.as_deref().unwrap_or(&user.phone),
        payload.address.as_deref().unwrap_or(&user.address),
        payload.answer.as_deref().unwrap_or(&user.answer),
    )
    .await?;

    Ok(Json(updated.into()))
}

/// Probe used by the client to confirm a valid customer session.
pub async fn user_auth() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Probe used by the client to confirm a valid admin session.
pub async fn admin_auth() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(password: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: "buyer".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            phone: "555-0100".to_string(),
            address: "1 Main St".to_string(),
            answer: "blue".to_string(),
        }
    }

    #[test]
    fn registration_rejects_short_passwords() {
        let err = validate_registration(&request("abc", "a@b.c")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn registration_rejects_malformed_email() {
        let err = validate_registration(&request("secret-pw", "not-an-email")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn registration_accepts_complete_payload() {
        assert!(validate_registration(&request("secret-pw", "a@b.c")).is_ok());
    }
}
