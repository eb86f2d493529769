pub mod codec;
pub mod validation;
