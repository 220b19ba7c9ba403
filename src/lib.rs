//! Support ticket service: a SQLite-backed ticket store, an LLM triage
//! adapter and the HTTP API that ties them together.

pub mod api;
pub mod classify;
pub mod db;
pub mod models;
