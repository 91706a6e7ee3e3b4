use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::rider::RiderProfileChanges;
use crate::utils::validation::{validate_not_empty, validate_number_plate, validate_phone};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRiderRequest {
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom = "validate_not_empty", length(max = 80))]
    pub first_name: String,
    #[validate(custom = "validate_not_empty", length(max = 80))]
    pub last_name: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RiderRegistered {
    pub rider_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyRiderRequest {
    pub rider_id: Uuid,
    #[validate(length(equal = 6))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RiderLoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRiderProfileRequest {
    #[validate(length(min = 1, max = 80))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub last_name: Option<String>,
    #[validate(length(min = 2, max = 40))]
    pub vehicle_type: Option<String>,
    #[validate(custom = "validate_number_plate")]
    pub number_plate: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    #[validate(url)]
    pub vehicle_image: Option<String>,
    #[validate(length(min = 5, max = 20))]
    pub national_id_number: Option<String>,
    #[validate(url)]
    pub national_id_image: Option<String>,
    #[validate(length(min = 5, max = 30))]
    pub driving_license_number: Option<String>,
    #[validate(url)]
    pub driving_license_image: Option<String>,
    pub emergency_contact: Option<String>,
    #[validate(custom = "validate_phone")]
    pub emergency_phone: Option<String>,
}

impl From<UpdateRiderProfileRequest> for RiderProfileChanges {
    fn from(request: UpdateRiderProfileRequest) -> Self {
        RiderProfileChanges {
            first_name: request.first_name,
            last_name: request.last_name,
            vehicle_type: request.vehicle_type,
            number_plate: request.number_plate.map(|p| p.trim().to_uppercase()),
            vehicle_make: request.vehicle_make,
            vehicle_model: request.vehicle_model,
            vehicle_image: request.vehicle_image,
            national_id_number: request.national_id_number,
            national_id_image: request.national_id_image,
            driving_license_number: request.driving_license_number,
            driving_license_image: request.driving_license_image,
            emergency_contact: request.emergency_contact,
            emergency_phone: request.emergency_phone,
        }
    }
}
