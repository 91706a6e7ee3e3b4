use serde::Deserialize;
use validator::Validate;

use crate::models::client::ClientProfileChanges;
use crate::utils::validation::validate_phone;

#[derive(Debug, Deserialize, Validate)]
pub struct PhoneRequest {
    #[validate(custom = "validate_phone")]
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyClientRequest {
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(length(equal = 6))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientProfileRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 255))]
    pub home_address: Option<String>,
    #[validate(length(max = 255))]
    pub work_address: Option<String>,
    #[validate(url)]
    pub profile_photo: Option<String>,
}

impl From<UpdateClientProfileRequest> for ClientProfileChanges {
    fn from(request: UpdateClientProfileRequest) -> Self {
        ClientProfileChanges {
            name: request.name,
            email: request.email,
            home_address: request.home_address,
            work_address: request.work_address,
            profile_photo: request.profile_photo,
        }
    }
}
