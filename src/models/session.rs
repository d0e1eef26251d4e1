/// The authenticated identity attached to a request by the auth middleware.
///
/// Identity-provider claims are trusted as-is; the owner id is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub owner_id: String,
    pub email: String,
}

impl Session {
    /// Display name fallback: the local part of the email.
    pub fn email_local_part(&self) -> Option<&str> {
        self.email.split('@').next().filter(|s| !s.is_empty())
    }
}
