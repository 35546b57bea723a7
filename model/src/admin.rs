use anyhow::Result;

use api::Unauthorized;

use crate::backend::AdminCheck;
use crate::storage::Storage;

/// The session key holding the admin credential.
pub const ADMIN_SECRET_KEY: &str = "admin_secret";

/// Remembers the admin credential for this session, once the backend has accepted it.
pub struct AdminSession {
    storage: Box<dyn Storage>,
}

impl AdminSession {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn login(&mut self, secret: &str, check: &dyn AdminCheck) -> Result<()> {
        let secret = secret.trim();
        if secret.is_empty() {
            bail!("The admin secret can't be blank");
        }
        if !check.admin_check(secret).await? {
            bail!("The backend rejected that admin secret");
        }
        self.storage.save(ADMIN_SECRET_KEY, secret)?;
        info!("Logged in as admin");
        Ok(())
    }

    pub fn secret(&self) -> Option<String> {
        match self.storage.load(ADMIN_SECRET_KEY) {
            Ok(secret) => secret,
            Err(err) => {
                warn!("Couldn't read the admin session: {err:#}");
                None
            }
        }
    }

    /// The credential for an admin action, or `Unauthorized` if nobody logged in.
    pub fn ensure(&self) -> Result<String> {
        match self.secret() {
            Some(secret) => Ok(secret),
            None => Err(Unauthorized.into()),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.secret().is_some()
    }

    pub fn logout(&mut self) {
        if let Err(err) = self.storage.remove(ADMIN_SECRET_KEY) {
            warn!("Couldn't clear the admin session: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::storage::MemoryStorage;

    struct OnlyHunter2;

    #[async_trait]
    impl AdminCheck for OnlyHunter2 {
        async fn admin_check(&self, secret: &str) -> Result<bool> {
            Ok(secret == "hunter2")
        }
    }

    #[tokio::test]
    async fn login_keeps_only_accepted_secrets() {
        let mut session = AdminSession::new(Box::new(MemoryStorage::new()));
        assert!(session.ensure().unwrap_err().is::<Unauthorized>());

        assert!(session.login("guess", &OnlyHunter2).await.is_err());
        assert!(!session.is_logged_in());
        assert!(session.login("  ", &OnlyHunter2).await.is_err());

        session.login(" hunter2 ", &OnlyHunter2).await.unwrap();
        assert_eq!(session.ensure().unwrap(), "hunter2");

        session.logout();
        assert!(!session.is_logged_in());
    }
}
