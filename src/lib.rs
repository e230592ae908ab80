//! # CMS Harness
//!
//! Schema inference and content vectorization for CMS migrations.
//!
//! A site's bulk export is sampled to infer a field schema, which is stored
//! per site in SQLite. The same export is then cleaned and written, item by
//! item, to a vector store for semantic search.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Source CMS  │──▶│ Schema infer │──▶│  SQLite  │
//! │ bulk export │   │ + persist    │   │ schemas  │
//! └──────┬──────┘   └──────────────┘   └──────────┘
//!        │          ┌──────────────┐   ┌──────────┐
//!        └─────────▶│  Vectorizer  │──▶│ Weaviate │
//!                   └──────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cmsh init
//! cmsh site add --name blog --url blog.example.org --cms-id 7
//! cmsh site onboard 1 --created-by alice
//! cmsh vectorize 1
//! cmsh serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Crate error type |
//! | [`models`] | Core data types |
//! | [`coerce`] | Numeric coercion helpers |
//! | [`text`] | Body text cleaning |
//! | [`schema`] | Type inference and schema building |
//! | [`schema_store`] | Schema persistence |
//! | [`sites`] | Site registry and onboarding |
//! | [`source`] | Source CMS client |
//! | [`vector_store`] | Vector-store client |
//! | [`vectorize`] | Content vectorization |
//! | [`progress`] | Progress reporting |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod coerce;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod schema;
pub mod schema_store;
pub mod server;
pub mod sites;
pub mod source;
pub mod text;
pub mod vector_store;
pub mod vectorize;
