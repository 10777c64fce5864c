pub mod diagnostics_helpers;
pub mod editor_helpers;
pub mod link_helpers;
pub mod nesting_helpers;
pub mod paragraph_helpers;
pub mod policy_helpers;
pub mod sanitization_helpers;
pub mod text_helpers;
