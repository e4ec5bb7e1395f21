//! URL handling module for Site-Harvest
//!
//! This module provides link normalization against a parent page, seed URL
//! validation and domain extraction. All same-domain decisions made by the
//! crawler go through [`normalize`].

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, is_same_domain};
pub use normalize::{is_valid_url, normalize};
