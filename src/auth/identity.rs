use uuid::Uuid;

use super::Actor;

/// The authenticated caller of a request, resolved from its session cookie.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub session_token: String,
}

impl Identity {
    pub fn actor(&self) -> Actor {
        Actor::Authenticated(self.id)
    }
}
