//! # tomb-rewrite
//!
//! Soft-delete filter injection for SQL `SELECT` statements.
//!
//! Tables listed in a [`SoftDeleteRegistry`] never lose rows; a row is
//! "deleted" when its flag column is set. This crate rewrites queries so that
//! such rows disappear without the caller writing the filter by hand:
//!
//! **Before:**
//! ```sql
//! SELECT * FROM adm_clients c LEFT JOIN adm_locations l ON l.client_id = c.id
//! ```
//!
//! **After:**
//! ```sql
//! SELECT * FROM adm_clients c LEFT JOIN adm_locations l
//!   ON (l.deleted = 0 OR l.deleted IS NULL) AND (l.client_id = c.id)
//!   WHERE (c.deleted = 0 OR c.deleted IS NULL)
//! ```
//!
//! ## Placement
//!
//! | Table position | Filter goes to |
//! |----------------|----------------|
//! | Only table in `FROM` | `WHERE` |
//! | Either side of a comma/`INNER`/`CROSS` join | that join's `ON` |
//! | Preserved side of a `LEFT`/`RIGHT` join | next inner or `RIGHT` join's `ON`, else `WHERE` |
//! | Sub-select | rewritten on its own, at its own level |
//!
//! Comma joins that receive a filter are rewritten to `INNER JOIN ... ON`.
//!
//! ## Failing open
//!
//! Anything outside the supported grammar leaves the statement unchanged.
//! [`SoftDeleteRewriter::rewrite`] reports why; [`SoftDeleteRewriter::rewrite_query`]
//! only returns the text. Statements that already compare the flag column are
//! never touched.

pub mod error;
pub mod guard;
pub mod lexer;
pub mod matcher;
pub mod placement;
pub mod rebuild;
pub mod registry;
pub mod report;
pub mod rewriter;

mod frame;
mod statement;
mod subquery;
mod verify;

pub use error::RewriteError;
pub use placement::{JoinCategory, PlacementState, Transition, transition};
pub use rebuild::soft_delete_condition;
pub use registry::SoftDeleteRegistry;
pub use report::{Diagnostic, Outcome, RewriteReport};
pub use rewriter::{RewriteOptions, SoftDeleteRewriter};
