use serde::Deserialize;
use validator::Validate;

use crate::utils::validation::validate_not_empty;

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(custom = "validate_not_empty", length(max = 2000))]
    pub text: String,
}
