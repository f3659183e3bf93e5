//! Single-session persistence rules.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use quill_core::error::AppError;
use quill_core::result::AppResult;
use quill_core::types::{SessionId, UserId};
use quill_database::repositories::SessionRepository;
use quill_entity::session::{NewSession, Session};

/// Message returned whenever a session cannot back a request.
const SESSION_INVALID: &str = "Session expired or invalid";

/// Enforces the "at most one session per user" rule on top of a
/// [`SessionRepository`].
#[derive(Clone)]
pub struct SessionService {
    /// Session storage.
    repo: Arc<dyn SessionRepository>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").finish_non_exhaustive()
    }
}

impl SessionService {
    /// Creates a session service over the given repository.
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self { repo }
    }

    /// Replaces every existing session of the user with a new one.
    ///
    /// If the replacement fails, the user's sessions are deleted so that a
    /// failed login never leaves an older session usable.
    pub async fn create_session_for_login_user(&self, new: NewSession) -> AppResult<Session> {
        let user_id = new.user_id;
        let session = Session::from_new(new);

        match self.repo.replace_for_user(&session).await {
            Ok(created) => {
                info!(
                    user_id = %user_id,
                    session_id = %created.id,
                    "Session created, previous sessions invalidated"
                );
                Ok(created)
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to create session");
                if let Err(cleanup) = self.repo.delete_by_user_id(user_id).await {
                    error!(
                        user_id = %user_id,
                        error = %cleanup,
                        "Failed to clear sessions after failed login"
                    );
                }
                Err(e)
            }
        }
    }

    /// Returns the user's current session, if any.
    pub async fn get_session_by_user_id(&self, user_id: UserId) -> AppResult<Option<Session>> {
        self.repo.find_by_user_id(user_id).await
    }

    /// Swaps the token pair of an existing session.
    ///
    /// Fails with `Forbidden` if the session was deleted in the meantime.
    pub async fn update_session(
        &self,
        session_id: SessionId,
        access_token: &str,
        refresh_token: &str,
    ) -> AppResult<Session> {
        let updated = self
            .repo
            .update_tokens(session_id, access_token, refresh_token)
            .await?
            .ok_or_else(|| {
                warn!(session_id = %session_id, "Refresh raced with session removal");
                AppError::forbidden(SESSION_INVALID)
            })?;

        debug!(session_id = %session_id, "Session tokens rotated");
        Ok(updated)
    }

    /// Rotates the pair of a session that still holds `presented_refresh_token`.
    ///
    /// The check and the swap happen in one repository call, so a refresh
    /// token can be redeemed once. A lost race or a deleted session fails
    /// with `Forbidden`.
    pub async fn rotate_session(
        &self,
        session_id: SessionId,
        presented_refresh_token: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> AppResult<Session> {
        let rotated = self
            .repo
            .rotate_tokens(session_id, presented_refresh_token, access_token, refresh_token)
            .await?
            .ok_or_else(|| {
                warn!(session_id = %session_id, "Refresh token already redeemed or session removed");
                AppError::forbidden(SESSION_INVALID)
            })?;

        debug!(session_id = %session_id, "Session tokens rotated");
        Ok(rotated)
    }

    /// Deletes every session of the user. Returns how many were removed.
    pub async fn invalidate_all_sessions_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
        let removed = self.repo.delete_by_user_id(user_id).await?;
        info!(user_id = %user_id, removed, "Sessions invalidated");
        Ok(removed)
    }

    /// Returns the user's session if it still holds `refresh_token`.
    ///
    /// A refresh token from a superseded login, or from a session that was
    /// logged out, fails with `Forbidden`.
    pub async fn require_active_session(
        &self,
        user_id: UserId,
        refresh_token: &str,
    ) -> AppResult<Session> {
        match self.repo.find_by_user_id(user_id).await? {
            Some(session) if session.holds_refresh_token(refresh_token) => Ok(session),
            Some(_) => {
                warn!(user_id = %user_id, "Refresh token does not match the current session");
                Err(AppError::forbidden(SESSION_INVALID))
            }
            None => {
                debug!(user_id = %user_id, "No session for refresh");
                Err(AppError::forbidden(SESSION_INVALID))
            }
        }
    }
}
