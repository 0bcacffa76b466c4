//! Domain layer: algorithm descriptions, secrets and CMS value types.

pub mod cms;
pub mod constants;
pub mod crypto;
pub mod der_util;
pub mod types;
