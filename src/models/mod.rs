//! Core data models for the exam archive.
//!
//! An [`UploadDescriptor`](descriptor::UploadDescriptor) is built per request
//! from form fields and consumed once to derive an
//! [`ObjectKey`](object_key::ObjectKey). Neither is persisted; only the uploaded
//! bytes end up in the store.

pub mod descriptor;
pub mod object_key;
