/// Router Module Index
///
/// Splits the API into routers by access tier. Authentication is attached per router
/// (via Axum layers or extractors), so a route's tier is decided by the file it lives in.

/// Routes open to anyone: the registration, paper and contact forms, their lookups
/// and statistics, and the admin login/refresh exchange.
pub mod public;

/// Routes behind the access-token middleware. Any admin role may call them.
pub mod authenticated;

/// The `/admin` back office. Each handler authenticates through the `AuthUser`
/// extractor; account and settings writes additionally demand the `admin` role.
pub mod admin;
