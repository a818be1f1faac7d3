//! Authentication: token issuing/verification and request extractors.

pub mod extractor;
pub mod token;

pub use extractor::{CurrentUser, DjUser};
pub use token::TokenIssuer;
