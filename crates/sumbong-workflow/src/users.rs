//! Profile self-service and admin user management.
//!
//! Admin accounts are invisible here: they never appear in listings and
//! cannot be fetched or deleted through these operations.

use sumbong_auth::AdminPrincipal;
use sumbong_core::error::{SumbongError, SumbongResult};
use sumbong_core::models::user::{UpdateUser, User};
use sumbong_core::repository::{PaginatedResult, Pagination, UserRepository};
use sumbong_core::validation::{PHONE_HINT, is_valid_phone, optional_text, required};
use tracing::info;
use uuid::Uuid;

pub struct UserService<U> {
    users: U,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(users: U) -> Self {
        Self { users }
    }

    pub async fn me(&self, user_id: Uuid) -> SumbongResult<User> {
        self.users.get_by_id(user_id).await
    }

    pub async fn update_me(&self, user_id: Uuid, mut input: UpdateUser) -> SumbongResult<User> {
        if let Some(first) = input.first_name.take() {
            input.first_name = Some(required("first name", &first)?);
        }
        if let Some(last) = input.last_name.take() {
            input.last_name = Some(required("last name", &last)?);
        }
        if let Some(address) = input.address.take() {
            input.address = Some(required("address", &address)?);
        }
        if let Some(phone) = input.phone.take() {
            let phone = phone.trim().to_string();
            if !is_valid_phone(&phone) {
                return Err(SumbongError::validation(PHONE_HINT));
            }
            input.phone = Some(phone);
        }
        if let Some(avatar) = input.avatar_url.take() {
            input.avatar_url = Some(optional_text(avatar));
        }

        self.users.update(user_id, input).await
    }

    pub async fn list_residents(
        &self,
        _admin: &AdminPrincipal,
        pagination: Pagination,
    ) -> SumbongResult<PaginatedResult<User>> {
        self.users.list_residents(pagination).await
    }

    pub async fn get(&self, _admin: &AdminPrincipal, id: Uuid) -> SumbongResult<User> {
        let user = self.users.get_by_id(id).await?;
        if user.is_admin() {
            return Err(SumbongError::not_found("user", id));
        }
        Ok(user)
    }

    pub async fn delete(&self, admin: &AdminPrincipal, id: Uuid) -> SumbongResult<()> {
        self.get(admin, id).await?;
        self.users.delete(id).await?;
        info!(user_id = %id, admin_id = %admin.id(), "user deleted");
        Ok(())
    }
}
