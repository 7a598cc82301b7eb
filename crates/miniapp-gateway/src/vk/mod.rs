//! VK platform integration: launch-parameter signature verification and the
//! community messages permission API.

pub mod api;
pub mod sign;

pub use api::{MessagesPermissionCheck, VkApiError, VkClient};
pub use sign::{extract_identity, verify_launch_params, VerifyFailure};
