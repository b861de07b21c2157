use super::model::{InviteUserRequest, User};
use crate::error::Result;
use async_trait::async_trait;

/// Remote operations of the user service.
#[async_trait]
pub trait UserGateway: Send + Sync {
    async fn list(&self) -> Result<Vec<User>>;

    /// Sets the enabled flag to an explicit target state.
    async fn set_status(&self, user_id: &str, enabled: bool) -> Result<()>;

    /// Sends invitations. The response body is not interpreted.
    async fn invite_bulk(&self, invites: &[InviteUserRequest]) -> Result<()>;
}
