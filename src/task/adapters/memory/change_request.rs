//! Recording source-host client.

use crate::task::{
    domain::{BranchName, Credentials, RepositoryRef},
    ports::{
        ChangeRequest, ChangeRequestClient, ChangeRequestError, ChangeRequestResult,
        OpenedChangeRequest,
    },
};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

/// Branch deletion observed by [`RecordingChangeRequestClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDeletion {
    /// Repository the branch belongs to.
    pub repository: RepositoryRef,
    /// Deleted branch.
    pub branch: BranchName,
}

/// Source-host client that records calls and answers from configuration.
///
/// Opened change requests get sequential numbers and a URL shaped like the
/// host's browser URL.
#[derive(Debug, Clone, Default)]
pub struct RecordingChangeRequestClient {
    state: Arc<RwLock<ClientState>>,
}

#[derive(Debug, Default)]
struct ClientState {
    opened: Vec<ChangeRequest>,
    deleted: Vec<RecordedDeletion>,
    credentials_seen: Vec<Credentials>,
    open_failure: Option<ChangeRequestError>,
    delete_failure: Option<ChangeRequestError>,
}

impl RecordingChangeRequestClient {
    /// Creates a client on which every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `open_change_request` call fail with `err`.
    pub fn fail_open_with(&self, err: ChangeRequestError) {
        self.write_state().open_failure = Some(err);
    }

    /// Makes every later `delete_branch` call fail with `err`.
    pub fn fail_delete_with(&self, err: ChangeRequestError) {
        self.write_state().delete_failure = Some(err);
    }

    /// Returns every change request passed to `open_change_request`.
    #[must_use]
    pub fn opened(&self) -> Vec<ChangeRequest> {
        self.read_state(|state| state.opened.clone())
    }

    /// Returns every branch passed to `delete_branch`.
    #[must_use]
    pub fn deleted(&self) -> Vec<RecordedDeletion> {
        self.read_state(|state| state.deleted.clone())
    }

    /// Returns the credentials presented on each call, in call order.
    #[must_use]
    pub fn credentials_seen(&self) -> Vec<Credentials> {
        self.read_state(|state| state.credentials_seen.clone())
    }

    /// Returns the total number of host calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.read_state(|state| state.opened.len() + state.deleted.len())
    }

    fn read_state<T>(&self, read: impl FnOnce(&ClientState) -> T) -> T {
        read(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_for_call(&self) -> ChangeRequestResult<std::sync::RwLockWriteGuard<'_, ClientState>> {
        self.state
            .write()
            .map_err(|err| ChangeRequestError::transport(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl ChangeRequestClient for RecordingChangeRequestClient {
    async fn open_change_request(
        &self,
        request: &ChangeRequest,
        credentials: &Credentials,
    ) -> ChangeRequestResult<OpenedChangeRequest> {
        let mut state = self.lock_for_call()?;
        state.opened.push(request.clone());
        state.credentials_seen.push(credentials.clone());
        if let Some(err) = state.open_failure.clone() {
            return Err(err);
        }

        let number = u64::try_from(state.opened.len()).unwrap_or(u64::MAX);
        let repository = &request.repository;
        Ok(OpenedChangeRequest {
            url: format!(
                "https://{}/{}/pull/{number}",
                repository.host(),
                repository.full_name()
            ),
            number: Some(number),
        })
    }

    async fn delete_branch(
        &self,
        repository: &RepositoryRef,
        branch: &BranchName,
        credentials: &Credentials,
    ) -> ChangeRequestResult<()> {
        let mut state = self.lock_for_call()?;
        state.deleted.push(RecordedDeletion {
            repository: repository.clone(),
            branch: branch.clone(),
        });
        state.credentials_seen.push(credentials.clone());
        state.delete_failure.clone().map_or(Ok(()), Err)
    }
}
