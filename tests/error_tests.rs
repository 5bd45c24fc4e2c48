use axum::http::StatusCode;
use axum::response::IntoResponse;
use petfolio::error::AppError;

fn status_of(err: AppError) -> StatusCode {
    err.into_response().status()
}

#[test]
fn test_status_mapping() {
    assert_eq!(status_of(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
    assert_eq!(status_of(AppError::InvalidToken), StatusCode::UNAUTHORIZED);
    assert_eq!(
        status_of(AppError::NotFound("x".to_string())),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status_of(AppError::BadRequest("x".to_string())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_of(AppError::Conflict("x".to_string())),
        StatusCode::CONFLICT
    );
    assert_eq!(
        status_of(AppError::Assistant("x".to_string())),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        status_of(AppError::Places("x".to_string())),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        status_of(AppError::Database("x".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_of(AppError::Internal(anyhow::anyhow!("boom"))),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_is_unconfigured_matches() {
    let err = AppError::Assistant(AppError::UNCONFIGURED.to_string());
    assert!(err.is_unconfigured());

    let err = AppError::Places(AppError::UNCONFIGURED.to_string());
    assert!(err.is_unconfigured());

    let err = AppError::Assistant("Rate limit exceeded".to_string());
    assert!(!err.is_unconfigured());

    let err = AppError::Database(AppError::UNCONFIGURED.to_string());
    assert!(!err.is_unconfigured());
}
