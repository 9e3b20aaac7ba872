//! Identity registry: idempotent upsert of player identity records.

use tracing::{debug, info, instrument};

use crate::GameError;
use crate::db::{GameRepository, NewUser, User};

/// Display name assigned when a player is first seen without one.
const UNKNOWN_NAME: &str = "unknown";

/// Service layer for player identity operations.
#[derive(Debug, Clone)]
pub struct IdentityService {
    repository: GameRepository,
}

impl IdentityService {
    /// Creates a new identity service backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: GameRepository) -> Self {
        info!("Creating IdentityService");
        Self { repository }
    }

    /// Idempotent upsert of a player identity.
    ///
    /// Creates the record on first sight (with a placeholder name when none
    /// is supplied). Updates the display name only when a non-empty name is
    /// supplied; an existing name is never overwritten with empty/unknown.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Storage`] on database failure.
    #[instrument(skip(self))]
    pub fn sync_user(
        &self,
        external_id: i64,
        display_name: Option<&str>,
    ) -> Result<User, GameError> {
        let name = display_name.map(str::trim).filter(|n| !n.is_empty());

        match self.repository.find_user(external_id)? {
            Some(user) => match name {
                Some(n) if n != user.display_name() => {
                    debug!(external_id, name = %n, "Updating display name");
                    Ok(self.repository.update_display_name(*user.id(), n)?)
                }
                _ => {
                    debug!(external_id, "User already synced");
                    Ok(user)
                }
            },
            None => {
                info!(external_id, "Registering new user");
                let new_user =
                    NewUser::new(external_id, name.unwrap_or(UNKNOWN_NAME).to_string());
                Ok(self.repository.create_user(new_user)?)
            }
        }
    }

    /// Resolves an external platform id to an identity record, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Storage`] on database failure.
    #[instrument(skip(self))]
    pub fn resolve(&self, external_id: i64) -> Result<Option<User>, GameError> {
        Ok(self.repository.find_user(external_id)?)
    }

    /// Lists all registered users, ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Storage`] on database failure.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<User>, GameError> {
        Ok(self.repository.list_users()?)
    }
}
