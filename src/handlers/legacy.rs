use crate::{errors::ServiceError, AppState};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Offset between the retired storefront's product numbering and the ids
/// carried over into the current catalog.
const LEGACY_ID_OFFSET: i64 = 1000;

/// Redirects product links from the retired storefront.
///
/// A numeric id is shifted by [`LEGACY_ID_OFFSET`] and, when the mapped
/// product exists, answered with a permanent redirect to its canonical API
/// path. Everything else gets a temporary redirect to the tech type listing
/// so stale links still land somewhere useful.
pub async fn old_product_redirect(
    State(state): State<AppState>,
    Path(old_id): Path<String>,
) -> Result<Response, ServiceError> {
    if let Some(id) = map_old_id(&old_id) {
        match state.services.products.get_product(id).await {
            Ok(product) => {
                return Ok(redirect(
                    StatusCode::MOVED_PERMANENTLY,
                    format!("/api/v1/products/{}", product.id),
                ));
            }
            Err(ServiceError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
    }

    Ok(redirect(StatusCode::FOUND, "/api/v1/tech-types".to_string()))
}

fn map_old_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok()?.checked_add(LEGACY_ID_OFFSET)
}

fn redirect(status: StatusCode, location: String) -> Response {
    (status, [(header::LOCATION, location)]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("5", Some(1005); "regular id")]
    #[test_case("0", Some(1000); "zero id")]
    #[test_case("abc", None; "letters")]
    #[test_case("", None; "empty")]
    #[test_case("12abc", None; "trailing letters")]
    fn old_ids_map_through_the_offset(raw: &str, expected: Option<i64>) {
        assert_eq!(map_old_id(raw), expected);
    }

    #[test]
    fn overflow_does_not_map() {
        assert_eq!(map_old_id(&i64::MAX.to_string()), None);
    }
}
