//! Error codes carried in the `code` field of an error [`Envelope`](crate::Envelope).
//!
//! | `code` | Raised when |
//! |--------|-------------|
//! | `TOKEN_ERROR` | The bearer token could not be decoded or looked up |
//! | `INVALID_PARAMS` | Endpoint params did not match the query's parameter type |
//! | `UNAUTHORIZED` | The operation needs a logged-in caller |
//! | `FORBIDDEN` | The caller may not act on the target |
//! | `NOT_FOUND` | The target, or the route, does not exist |
//! | `STALE_CHANGE` | The `changeId` sent with an update is not the stored one |
//! | `INVALID_SUB_DOMAIN` | The sub-domain is not a valid DNS label |
//! | `SUB_DOMAIN_TAKEN` | Another site already uses the sub-domain |
//! | `UPSTREAM_ERROR` | A third-party service failed |
//! | `INTERNAL_ERROR` | Anything unexpected |

/// Well-known error codes.
pub mod codes {
    pub const TOKEN_ERROR: &str = "TOKEN_ERROR";
    pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const STALE_CHANGE: &str = "STALE_CHANGE";
    pub const INVALID_SUB_DOMAIN: &str = "INVALID_SUB_DOMAIN";
    pub const SUB_DOMAIN_TAKEN: &str = "SUB_DOMAIN_TAKEN";
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}
