//! Database access for the pipeline stages
//!
//! Entity-level query helpers over the schema owned by
//! `gengap_common::db`. Ingestion writes (which need per-publication
//! transactions) live in `workflow::ingest`.

pub mod authors;
pub mod journals;
pub mod positions;
pub mod publications;
