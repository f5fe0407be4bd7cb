pub mod envelope;
pub mod translator;

pub use envelope::ErrorEnvelope;
pub use translator::{ErrorRule, ErrorTranslator, GENERIC_MESSAGE, RawFailure};
