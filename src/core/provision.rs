use crate::domain::model::PathOwnership;
use crate::domain::ports::Accounts;
use crate::utils::error::Result;
use std::future::Future;

/// Makes sure users, groups and directory ownership are right around a block of work.
pub struct ProvisioningGuard<'a> {
    accounts: &'a dyn Accounts,
    paths: &'a [PathOwnership],
}

impl<'a> ProvisioningGuard<'a> {
    pub fn new(accounts: &'a dyn Accounts, paths: &'a [PathOwnership]) -> Self {
        Self { accounts, paths }
    }

    pub async fn ensure(&self) -> Result<()> {
        for entry in self.paths {
            std::fs::create_dir_all(&entry.path)?;

            if !self.accounts.group_exists(entry.group).await? {
                tracing::info!("Creating system group {}", entry.group);
                self.accounts.add_group(entry.group).await?;
            }

            if !self.accounts.user_exists(entry.user).await? {
                tracing::info!("Creating system user {}", entry.user);
                self.accounts.add_user(entry.user, entry.group).await?;
            }

            self.accounts
                .chown_recursive(&entry.path, entry.user, entry.group)
                .await?;
        }
        Ok(())
    }

    /// Runs `body` between two ownership passes. The closing pass runs even
    /// when `body` fails; the body's error wins over a closing failure.
    pub async fn scope<F, Fut, T>(&self, body: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.ensure().await?;
        let outcome = body().await;
        let settled = self.ensure().await;

        match outcome {
            Ok(value) => settled.map(|_| value),
            Err(e) => {
                if let Err(closing) = settled {
                    tracing::warn!("Ownership repair after failed step also failed: {}", closing);
                }
                Err(e)
            }
        }
    }
}
