//! Session registry for coordinating multiple exec sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use docker_exec_mcp_core::{Error, Result, ServerConfig, SessionId, SessionInfo, SessionSettings};

use crate::gateway::ExecGateway;
use crate::session::Session;

/// Configuration for the session registry.
#[derive(Debug, Clone)]
pub struct SessionRegistryConfig {
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,

    /// Settings handed to every new session
    pub session: SessionSettings,
}

impl Default for SessionRegistryConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10,
            session: SessionSettings::default(),
        }
    }
}

impl From<&ServerConfig> for SessionRegistryConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_sessions: config.server.max_sessions,
            session: config.session.clone(),
        }
    }
}

/// Process-wide table of live exec sessions.
///
/// Entries are added by [`create_session`](Self::create_session) and removed
/// only by an explicit close. There is no expiry.
pub struct SessionRegistry {
    gateway: Arc<dyn ExecGateway>,
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    config: SessionRegistryConfig,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Create an empty registry opening sessions through `gateway`.
    pub fn new(gateway: Arc<dyn ExecGateway>, config: SessionRegistryConfig) -> Self {
        Self {
            gateway,
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Open a new session in `container_name` and register it.
    ///
    /// The new session is closed again if the registry filled up meanwhile
    /// or its truncated id is already taken by a live session.
    pub async fn create_session(&self, container_name: &str) -> Result<Arc<Session>> {
        // Check session limit
        if self.sessions.read().await.len() >= self.config.max_sessions {
            return Err(Error::SessionLimitReached(self.config.max_sessions));
        }

        let session = Arc::new(
            Session::create(
                self.gateway.as_ref(),
                container_name,
                self.config.session.clone(),
            )
            .await?,
        );
        let session_id = session.id().clone();

        let rejection = {
            let mut sessions = self.sessions.write().await;
            if sessions.len() >= self.config.max_sessions {
                Some(Error::SessionLimitReached(self.config.max_sessions))
            } else if sessions.contains_key(&session_id) {
                Some(Error::SessionIdCollision(session_id.clone()))
            } else {
                sessions.insert(session_id.clone(), Arc::clone(&session));
                None
            }
        };

        if let Some(err) = rejection {
            warn!("Rejecting new session {}: {}", session_id, err);
            session.close().await;
            return Err(err);
        }

        info!(
            "Registered session {} for container '{}'",
            session_id, container_name
        );
        Ok(session)
    }

    /// Get a session by ID.
    pub async fn get_session(&self, session_id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Look up a session on behalf of a caller naming `container_name`.
    pub async fn authorize(
        &self,
        session_id: &SessionId,
        container_name: &str,
    ) -> Result<Arc<Session>> {
        let session = self
            .get_session(session_id)
            .await
            .ok_or_else(|| Error::SessionNotFound(session_id.clone()))?;
        session.ensure_container(container_name)?;
        Ok(session)
    }

    /// Close a session by ID.
    ///
    /// Returns `false` when no such session is registered. The entry is
    /// removed before the session is closed, so no lookup can observe a
    /// closing session.
    pub async fn close_session(&self, session_id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(session_id);
        match removed {
            Some(session) => {
                session.close().await;
                true
            }
            None => {
                debug!("Close requested for unknown session {}", session_id);
                false
            }
        }
    }

    /// Close a session on behalf of a caller naming `container_name`.
    ///
    /// The ownership check and the removal happen under one write lock.
    pub async fn close_for(&self, session_id: &SessionId, container_name: &str) -> Result<()> {
        let session = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get(session_id)
                .ok_or_else(|| Error::SessionNotFound(session_id.clone()))?;
            session.ensure_container(container_name)?;
            sessions.remove(session_id)
        };

        if let Some(session) = session {
            session.close().await;
        }
        Ok(())
    }

    /// List all live sessions, oldest first.
    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .read()
            .await
            .values()
            .map(|session| session.info())
            .collect();
        infos.sort_by_key(|info| info.created_at);
        infos
    }

    /// Get the number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close all sessions.
    pub async fn close_all(&self) {
        let drained: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, session)| session).collect()
        };

        if !drained.is_empty() {
            info!("Closing {} remaining session(s)", drained.len());
        }
        for session in drained {
            session.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;
    use crate::testing::ScriptedGateway;

    fn registry_with(gateway: ScriptedGateway, max_sessions: usize) -> SessionRegistry {
        let config = SessionRegistryConfig {
            max_sessions,
            ..Default::default()
        };
        SessionRegistry::new(Arc::new(gateway), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_create() {
        let registry = registry_with(ScriptedGateway::new(), 10);
        assert_eq!(registry.session_count().await, 0);

        let session = registry.create_session("c1").await.unwrap();
        assert_eq!(session.container_name(), "c1");
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_create_failure_registers_nothing() {
        let gateway = ScriptedGateway::new().fail_create("No such container: ghost");
        let registry = registry_with(gateway, 10);

        let result = registry.create_session("ghost").await;
        assert!(matches!(result, Err(Error::SessionCreate(_))));
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_attach_failure_registers_nothing() {
        let gateway = ScriptedGateway::new().fail_attach("exec already running");
        let registry = registry_with(gateway, 10);

        let result = registry.create_session("c1").await;
        assert!(matches!(result, Err(Error::SessionCreate(msg)) if msg.contains("already running")));
        assert_eq!(registry.session_count().await, 0);
        assert!(registry.list_sessions().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_get_then_close() {
        let registry = registry_with(ScriptedGateway::new(), 10);
        let session = registry.create_session("c1").await.unwrap();
        let id = session.id().clone();

        assert!(registry.get_session(&id).await.is_some());
        assert!(registry.close_session(&id).await);
        assert!(registry.get_session(&id).await.is_none());
        assert_eq!(session.status().await, SessionStatus::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_close_unknown_session() {
        let registry = registry_with(ScriptedGateway::new(), 10);
        assert!(!registry.close_session(&SessionId::from("abc123abc123")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_authorize() {
        let registry = registry_with(ScriptedGateway::new(), 10);
        let session = registry.create_session("web1").await.unwrap();
        let id = session.id().clone();

        assert!(registry.authorize(&id, "web1").await.is_ok());
        assert!(matches!(
            registry.authorize(&id, "web2").await,
            Err(Error::ContainerMismatch { .. })
        ));
        assert!(matches!(
            registry.authorize(&SessionId::from("nope"), "web1").await,
            Err(Error::SessionNotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_close_for_checks_container() {
        let registry = registry_with(ScriptedGateway::new(), 10);
        let session = registry.create_session("web1").await.unwrap();
        let id = session.id().clone();

        let err = registry.close_for(&id, "web2").await.unwrap_err();
        assert!(matches!(err, Error::ContainerMismatch { .. }));
        assert_eq!(registry.session_count().await, 1);
        assert_eq!(session.status().await, SessionStatus::Open);

        registry.close_for(&id, "web1").await.unwrap();
        assert_eq!(registry.session_count().await, 0);

        assert!(matches!(
            registry.close_for(&id, "web1").await,
            Err(Error::SessionNotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_session_limit() {
        let registry = registry_with(ScriptedGateway::new(), 2);

        registry.create_session("c1").await.unwrap();
        registry.create_session("c1").await.unwrap();

        let result = registry.create_session("c1").await;
        assert!(matches!(result, Err(Error::SessionLimitReached(2))));
        assert_eq!(registry.session_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_rejects_id_collision() {
        let gateway = ScriptedGateway::new().with_exec_ids([
            format!("{}{}", "a".repeat(12), "1".repeat(52)),
            format!("{}{}", "a".repeat(12), "2".repeat(52)),
        ]);
        let registry = registry_with(gateway, 10);

        let first = registry.create_session("c1").await.unwrap();
        let result = registry.create_session("c1").await;

        assert!(matches!(result, Err(Error::SessionIdCollision(ref id)) if id == first.id()));
        assert_eq!(registry.session_count().await, 1);

        // The surviving entry is still the first session
        let kept = registry.get_session(first.id()).await.unwrap();
        assert!(kept.exec_id().ends_with(&"1".repeat(52)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_list_sessions() {
        let registry = registry_with(ScriptedGateway::new(), 10);
        registry.create_session("c1").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        registry.create_session("c2").await.unwrap();

        let sessions = registry.list_sessions().await;
        assert_eq!(sessions.len(), 2);
        let containers: Vec<_> = sessions.iter().map(|s| s.container_name.as_str()).collect();
        assert!(containers.contains(&"c1"));
        assert!(containers.contains(&"c2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_close_all() {
        let registry = registry_with(ScriptedGateway::new(), 10);
        let a = registry.create_session("c1").await.unwrap();
        let b = registry.create_session("c2").await.unwrap();
        assert_eq!(registry.session_count().await, 2);

        registry.close_all().await;
        assert_eq!(registry.session_count().await, 0);
        assert_eq!(a.status().await, SessionStatus::Closed);
        assert_eq!(b.status().await, SessionStatus::Closed);
    }
}
