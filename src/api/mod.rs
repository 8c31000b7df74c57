//! HTTP surface.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `POST /convert-image` | multipart image → `{raw_text, beautified_text[, error]}` |
//! | `POST /compile-latex` | `{latex_content}` → `application/pdf` |
//! | `GET /latex-status` | compiler probe |
//! | `POST /auth/register`, `POST /auth/login`, `GET /auth/me` | demo accounts |
//! | `GET /health` | liveness |
//!
//! Errors are rendered as `{"detail": "..."}` by [`ApiError`].

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiJson};
pub use routes::{router, serve};
pub use state::AppState;
