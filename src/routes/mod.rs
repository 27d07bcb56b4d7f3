/// Router Module Index
///
/// Splits the routing table by access level. The authentication layer is
/// applied in `create_router` to the authenticated and admin routers; the
/// public router is never wrapped.

/// Routes open to anonymous clients: health check, registration, login.
pub mod public;

/// Routes for any user with a valid session.
pub mod authenticated;

/// Routes reserved for the ADMIN role. The role itself is checked in the
/// post service, after the authentication layer has resolved the caller.
pub mod admin;
