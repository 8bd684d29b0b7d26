// handlers/protected/mod.rs - Protected handlers (JWT or API key required)
//
// Every handler here receives the caller as `Extension<AuthUser>`, injected
// by `middleware::auth_middleware`.

pub mod accounts;
pub mod api_keys;
pub mod auth;
pub mod dimensions;
pub mod fx_rates;
pub mod metrics;
pub mod milestones;
pub mod net_worth;
pub mod scores;
pub mod streaks;
pub mod tasks;
pub mod transactions;
