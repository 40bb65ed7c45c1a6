//! REST API module
//!
//! HTTP endpoints for the classification dialogue, case chat and catalog
//! browsing. Handlers only decode requests and pick status codes; all
//! behavior lives in [`crate::dialogue`] and [`crate::case_chat`].

pub mod routes;

pub use routes::{create_router, AppState};
