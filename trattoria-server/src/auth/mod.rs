//! Request guards for public routes

pub mod rate_limit;

pub use rate_limit::RateLimiter;
