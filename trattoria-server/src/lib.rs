//! trattoria-server - restaurant site backend
//!
//! Serves the public site's API:
//! - Menu, gallery and home content (revalidating cache)
//! - Email verification codes gating reservations and ticket sales
//! - Table reservations with slot availability
//! - Ticketed events and online pickup orders paid through Stripe Checkout
//! - Image proxy in front of the S3 bucket

pub mod api;
pub mod auth;
pub mod availability;
pub mod cache;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod otp;
pub mod state;
pub mod storage;
pub mod stripe;
pub mod util;
