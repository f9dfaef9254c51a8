use crate::{config::AppConfig, errors::ServiceError, ApiResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use validator::Validate;

/// Standard success response wrapped in the API envelope
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response wrapped in the API envelope
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(ServiceError::from)
}

/// Pagination parameters for list operations. Defaults and the upper bound
/// come from configuration, so both are resolved against [`AppConfig`].
#[derive(Debug, Default, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number
    pub page: Option<u64>,
    /// Items per page, capped at the configured maximum
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Resolve `(page, per_page)` against the configured default and cap.
    pub fn resolve(&self, cfg: &AppConfig) -> Result<(u64, u64), ServiceError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "page must be greater than zero".to_string(),
            ));
        }

        let per_page = self.per_page.unwrap_or(cfg.api_default_page_size as u64);
        if per_page == 0 {
            return Err(ServiceError::ValidationError(
                "per_page must be greater than zero".to_string(),
            ));
        }

        Ok((page, per_page.min(cfg.api_max_page_size as u64)))
    }
}

/// Comma-separated id list used by bulk admin actions ("1,2,3").
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, ServiceError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|_| {
                ServiceError::ValidationError(format!("'{}' is not a valid id", part))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one id is required".to_string(),
        ));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".to_string(),
            "x".repeat(64),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            8080,
            "test".to_string(),
        )
    }

    #[test]
    fn pagination_defaults_come_from_config() {
        let cfg = test_config();
        let params = PaginationParams::default();
        let (page, per_page) = params.resolve(&cfg).expect("defaults resolve");
        assert_eq!(page, 1);
        assert_eq!(per_page, cfg.api_default_page_size as u64);
    }

    #[test]
    fn pagination_caps_at_configured_maximum() {
        let cfg = test_config();
        let params = PaginationParams {
            page: Some(2),
            per_page: Some(10_000),
        };
        let (page, per_page) = params.resolve(&cfg).expect("resolves");
        assert_eq!(page, 2);
        assert_eq!(per_page, cfg.api_max_page_size as u64);
    }

    #[test]
    fn pagination_rejects_zero_values() {
        let cfg = test_config();
        assert!(PaginationParams {
            page: Some(0),
            per_page: None,
        }
        .resolve(&cfg)
        .is_err());
        assert!(PaginationParams {
            page: None,
            per_page: Some(0),
        }
        .resolve(&cfg)
        .is_err());
    }

    #[test]
    fn id_list_parses_and_trims() {
        assert_eq!(parse_id_list("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_id_list("1,x").is_err());
        assert!(parse_id_list(" , ").is_err());
    }
}
