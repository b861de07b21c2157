//! REST gateway for the user service.

use crate::http::ApiClient;
use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use taskdesk_core::error::Result;
use taskdesk_core::user::{InviteUserRequest, User, UserGateway};

/// Characters escaped in a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// [`UserGateway`] over `/realms/{realm}/users-services`.
#[derive(Clone)]
pub struct HttpUserGateway {
    api: ApiClient,
    service_path: String,
}

impl HttpUserGateway {
    pub fn new(api: ApiClient, realm: &str) -> Self {
        Self {
            api,
            service_path: format!("/realms/{realm}/users-services"),
        }
    }
}

#[async_trait]
impl UserGateway for HttpUserGateway {
    async fn list(&self) -> Result<Vec<User>> {
        self.api
            .get(&format!("{}/users", self.service_path), &[])
            .await
    }

    async fn set_status(&self, user_id: &str, enabled: bool) -> Result<()> {
        self.api
            .put_unit(
                &format!(
                    "{}/users/{}/status",
                    self.service_path,
                    utf8_percent_encode(user_id, PATH_SEGMENT)
                ),
                &[("enabled", enabled.to_string())],
            )
            .await
    }

    async fn invite_bulk(&self, invites: &[InviteUserRequest]) -> Result<()> {
        self.api
            .post_unit(&format!("{}/invite-users-bulk", self.service_path), invites)
            .await
    }
}
