use serde_json::json;

use super::{rejected, Backend};
use crate::auth::Capability;
use crate::client::operations::{self, extract, UserMutationPayload};
use crate::error::{AppError, ValidationErrorBuilder};
use crate::models::{Id, Role, User};
use crate::validation;

/// Administrative operations on other accounts
pub struct UserAdminService {
    backend: Backend,
}

impl UserAdminService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Change the role of `user_id`. Admins cannot change their own role.
    pub async fn set_role(&self, user_id: &Id, role: &str) -> Result<User, AppError> {
        let admin = self.backend.require(Capability::Admin).await?;

        let mut errors = ValidationErrorBuilder::new();
        errors.check("userId", validation::validate_id(user_id));
        let parsed = match role.parse::<Role>() {
            Ok(r) => Some(r),
            Err(e) => {
                errors.add("role", e);
                None
            }
        };
        errors.finish()?;
        let role = parsed.ok_or_else(|| AppError::validation_field("role", "Invalid role"))?;

        if &admin.id == user_id {
            return Err(AppError::forbidden("You cannot change your own role"));
        }

        let data = self
            .backend
            .mutate(
                &operations::UPDATE_USER_ROLE,
                json!({ "userId": user_id.as_key(), "role": role.as_str() }),
            )
            .await?;
        let payload: UserMutationPayload = extract(data, "updateUserRole")?;
        let user = match (payload.success, payload.user) {
            (Some(false), _) | (_, None) => {
                return Err(rejected(payload.errors.as_ref(), "The role could not be changed"))
            }
            (_, Some(user)) => user,
        };

        tracing::info!(
            admin_id = %admin.id,
            user_id = %user_id,
            role = %role,
            "User role changed"
        );
        Ok(user)
    }
}
