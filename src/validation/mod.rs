//! Validation of generated OpenAPI documents.
//!
//! Every validator answers with a `ValidationOutcome`; only a validator that
//! cannot run at all returns an error.

pub mod command;
pub mod openapi;
pub mod traits;

use crate::config::{RefineConfig, ValidatorKind};

pub use command::{CommandConfig, CommandValidator};
pub use openapi::OpenApiValidator;
pub use traits::{DocumentValidator, ValidationOutcome};

/// Build the validator selected in the refine config. A zero step timeout
/// leaves the command unbounded, as it does for the refine loop.
pub fn from_config(config: &RefineConfig) -> Box<dyn DocumentValidator> {
    match config.validator {
        ValidatorKind::Builtin => Box::new(OpenApiValidator::new()),
        ValidatorKind::Command => Box::new(CommandValidator::new(
            "openapi command validator",
            CommandConfig::new(&config.validator_command).timeout_ms(config.step_timeout_ms),
        )),
    }
}
