use serde::{Serialize, de::DeserializeOwned};

use crate::http::HttpMethod;
use crate::session::UserProfile;

/// A trait that defines the request-response relationship and metadata for an API endpoint.
pub trait ApiRequest: Serialize {
    /// The response type returned by this request.
    type Response: DeserializeOwned;
    /// The URL path (or suffix).
    const PATH: &'static str;
    /// The HTTP method.
    const METHOD: HttpMethod;
}

// =========================================================
// Request Definitions
// =========================================================

/// Profile of the signed-in user
#[derive(Debug, Serialize)]
pub struct CurrentUserRequest;

impl ApiRequest for CurrentUserRequest {
    type Response = UserProfile;
    const PATH: &'static str = "/api/me";
    const METHOD: HttpMethod = HttpMethod::Get;
}
