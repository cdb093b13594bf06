//! services/api/src/lib.rs
//!
//! The QuickRev File API service: Appwrite-backed file storage and
//! cataloguing, document-to-text conversion, and LLM-generated study
//! artifacts, behind an axum web layer.

pub mod adapters;
pub mod cleaner;
pub mod config;
pub mod convert;
pub mod error;
pub mod generator;
pub mod prompts;
pub mod web;
