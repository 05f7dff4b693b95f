pub mod correct_key;
pub mod pdl;
pub mod sigma_dlog;
