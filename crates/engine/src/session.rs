//! Transfer session lifecycle.

use std::sync::Arc;

use cowput_protocol::TransferSession;
use cowput_transfer::ProgressHook;
use tracing::{info, warn};

use crate::api::ManagementApi;
use crate::error::TransferError;

/// Opens and finalizes transfer sessions.
pub struct SessionManager {
    management: Arc<dyn ManagementApi>,
    hook: Arc<dyn ProgressHook>,
    passcode: Option<String>,
}

impl SessionManager {
    pub fn new(
        management: Arc<dyn ManagementApi>,
        hook: Arc<dyn ProgressHook>,
        passcode: Option<String>,
    ) -> Self {
        Self {
            management,
            hook,
            passcode: passcode.filter(|p| !p.is_empty()),
        }
    }

    /// Declares a batch of `total_size` bytes and binds the passcode, if
    /// one is configured.
    ///
    /// A passcode the server does not acknowledge fails the whole batch.
    pub async fn open(&self, total_size: u64) -> Result<TransferSession, TransferError> {
        let resp = self.management.create_session(total_size).await?;
        if resp.error {
            return Err(TransferError::Remote {
                message: resp.error_message,
            });
        }
        if resp.transfer_guid.is_empty() || resp.upload_token.is_empty() {
            return Err(TransferError::Protocol(
                "session response without transfer id or upload token".into(),
            ));
        }
        let mut session = TransferSession::from_response(resp);

        if let Some(passcode) = &self.passcode {
            let bound = self
                .management
                .bind_passcode(&session.transfer_id, passcode)
                .await?;
            if !bound {
                return Err(TransferError::Protocol(format!(
                    "passcode not accepted for transfer {}",
                    session.transfer_id
                )));
            }
            session.passcode = Some(passcode.clone());
        }

        info!(
            transfer = %session.transfer_id,
            url = %session.unique_url,
            total_bytes = total_size,
            "session opened"
        );
        self.hook.session_opened(&session);
        Ok(session)
    }

    /// Finalizes `session` and returns its temporary share code.
    ///
    /// `session` is only updated on success. When the server reports the
    /// session as incomplete, the code it sent is carried in the error.
    pub async fn finish(&self, session: &mut TransferSession) -> Result<String, TransferError> {
        if session.is_finished() {
            return Err(TransferError::Validation(format!(
                "session {} already finished",
                session.transfer_id
            )));
        }
        let resp = self.management.finish_session(&session.transfer_id).await?;
        if !resp.complete {
            warn!(transfer = %session.transfer_id, "server did not complete session");
            return Err(TransferError::SessionIncomplete {
                temp_code: resp.temp_download_code,
            });
        }

        session.temp_code = Some(resp.temp_download_code.clone());
        info!(transfer = %session.transfer_id, "session finished");
        self.hook.session_finished(session);
        Ok(resp.temp_download_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{MockManagement, RecordingHook, SHARE_URL};

    fn manager(mock: MockManagement, passcode: Option<&str>) -> (SessionManager, Arc<MockManagement>, Arc<RecordingHook>) {
        let mock = Arc::new(mock);
        let hook = Arc::new(RecordingHook::default());
        let manager = SessionManager::new(mock.clone(), hook.clone(), passcode.map(String::from));
        (manager, mock, hook)
    }

    #[tokio::test]
    async fn open_without_passcode() {
        let (manager, mock, hook) = manager(MockManagement::default(), None);

        let session = manager.open(42).await.unwrap();
        assert_eq!(session.transfer_id, "tg");
        assert_eq!(session.unique_url, SHARE_URL);
        assert!(session.passcode.is_none());
        assert_eq!(mock.calls(), vec!["create_session:42"]);

        let sessions = hook.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].0, "opened");
    }

    #[tokio::test]
    async fn open_binds_passcode() {
        let (manager, mock, _) = manager(MockManagement::default(), Some("secret"));

        let session = manager.open(1).await.unwrap();
        assert_eq!(session.passcode.as_deref(), Some("secret"));
        assert_eq!(
            mock.calls(),
            vec!["create_session:1", "bind_passcode:tg:secret"]
        );
    }

    #[tokio::test]
    async fn rejected_passcode_aborts() {
        let mock = MockManagement {
            bind_ack: false,
            ..Default::default()
        };
        let (manager, _, hook) = manager(mock, Some("secret"));

        let err = manager.open(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(hook.sessions().is_empty());
    }

    #[tokio::test]
    async fn empty_passcode_is_not_bound() {
        let (manager, mock, _) = manager(MockManagement::default(), Some(""));
        manager.open(1).await.unwrap();
        assert!(mock.calls_to("bind_passcode").is_empty());
    }

    #[tokio::test]
    async fn remote_error_surfaces_message() {
        let mock = MockManagement {
            session_error: Some("quota exceeded".into()),
            ..Default::default()
        };
        let (manager, mock, _) = manager(mock, Some("secret"));

        let err = manager.open(1).await.unwrap_err();
        assert!(matches!(err, TransferError::Remote { ref message } if message == "quota exceeded"));
        assert!(mock.calls_to("bind_passcode").is_empty());
    }

    #[tokio::test]
    async fn finish_sets_temp_code() {
        let (manager, mock, hook) = manager(MockManagement::default(), None);
        let mut session = manager.open(1).await.unwrap();

        let code = manager.finish(&mut session).await.unwrap();
        assert_eq!(code, "654321");
        assert_eq!(session.temp_code.as_deref(), Some("654321"));
        assert!(session.is_finished());
        assert_eq!(mock.calls_to("finish_session"), vec!["finish_session:tg"]);

        let sessions = hook.sessions();
        assert_eq!(sessions[1].0, "finished");
        assert_eq!(sessions[1].1.temp_code.as_deref(), Some("654321"));
    }

    #[tokio::test]
    async fn finished_session_is_not_finished_again() {
        let (manager, mock, hook) = manager(MockManagement::default(), None);
        let mut session = manager.open(1).await.unwrap();
        manager.finish(&mut session).await.unwrap();

        let err = manager.finish(&mut session).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(mock.calls_to("finish_session").len(), 1);
        assert_eq!(hook.sessions().len(), 2);
    }

    #[tokio::test]
    async fn incomplete_finish_reports_code() {
        let mock = MockManagement {
            complete: false,
            ..Default::default()
        };
        let (manager, _, _) = manager(mock, None);
        let mut session = manager.open(1).await.unwrap();

        let err = manager.finish(&mut session).await.unwrap_err();
        match err {
            TransferError::SessionIncomplete { temp_code } => assert_eq!(temp_code, "654321"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!session.is_finished());
    }
}
