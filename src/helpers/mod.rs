//! Helper functions shared by the generator and layout filters

mod url;

pub use url::*;
