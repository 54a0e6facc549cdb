use crate::banner::ErrorBanner;
use crate::forms::{FormState, RoleForm, SubmitError, TeamForm};
use crate::poller::FetchSequencer;
use crate::session::Session;
use gpudeck_backend::{ApiResult, ConsoleBackend};
use gpudeck_common::{group_permissions, Permission, Role, Team, TeamDetail};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct TeamsState {
    teams: Vec<Team>,
    permissions: Vec<Permission>,
    detail: Option<TeamDetail>,
    banner: ErrorBanner,
}

/// Teams list, one opened team with its roles, and the permission catalogue.
#[derive(Clone)]
pub struct TeamsPage {
    backend: Arc<dyn ConsoleBackend>,
    state: Arc<RwLock<TeamsState>>,
    list_seq: Arc<FetchSequencer>,
    detail_seq: Arc<FetchSequencer>,
}

impl TeamsPage {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            backend: session.backend(),
            state: Arc::new(RwLock::new(TeamsState::default())),
            list_seq: Arc::new(FetchSequencer::new()),
            detail_seq: Arc::new(FetchSequencer::new()),
        }
    }

    pub async fn refresh(&self) {
        let ticket = self.list_seq.ticket();
        let result = self.backend.list_teams().await;
        let mut st = self.state.write().await;
        if !self.list_seq.try_apply(ticket) {
            return;
        }
        st.teams = st.banner.settle("loading teams", result);
    }

    pub async fn teams(&self) -> Vec<Team> {
        self.state.read().await.teams.clone()
    }

    pub async fn banner(&self) -> ErrorBanner {
        self.state.read().await.banner.clone()
    }

    pub async fn load_permissions(&self) {
        let result = self.backend.list_permissions().await;
        let mut st = self.state.write().await;
        st.permissions = st.banner.settle("loading permissions", result);
    }

    /// Permission catalogue by category, for the role editor.
    pub async fn grouped_permissions(&self) -> BTreeMap<String, Vec<Permission>> {
        group_permissions(&self.state.read().await.permissions)
    }

    /// Fetch one team with its roles and keep it as the open team.
    pub async fn open_team(&self, id: i64) -> ApiResult<TeamDetail> {
        let ticket = self.detail_seq.ticket();
        let result = self.backend.get_team(id).await;
        let mut st = self.state.write().await;
        match result {
            Ok(detail) => {
                if self.detail_seq.try_apply(ticket) {
                    st.detail = Some(detail.clone());
                }
                Ok(detail)
            }
            Err(e) => {
                st.banner.report("loading team", &e);
                Err(e)
            }
        }
    }

    pub async fn open(&self) -> Option<TeamDetail> {
        self.state.read().await.detail.clone()
    }

    pub async fn close_team(&self) {
        self.state.write().await.detail = None;
    }

    pub async fn create_team(&self, form: &mut FormState<TeamForm>) -> Result<Team, SubmitError> {
        let backend = self.backend.clone();
        let team = form
            .submit(|req| async move { backend.create_team(&req).await })
            .await?;
        tracing::info!("👥 team '{}' created ({})", team.name, team.slug);
        self.refresh().await;
        Ok(team)
    }

    /// Create a role, then re-fetch the team so the list shows what the server stored.
    pub async fn create_role(
        &self,
        team_id: i64,
        form: &mut FormState<RoleForm>,
    ) -> Result<Role, SubmitError> {
        let backend = self.backend.clone();
        let role = form
            .submit(|req| async move { backend.create_role(team_id, &req).await })
            .await?;
        tracing::info!(
            "🔐 role '{}' added to team {} with {} permission(s)",
            role.name,
            team_id,
            role.permissions.len()
        );
        // refreshed detail is best effort; the role itself was stored
        let _ = self.open_team(team_id).await;
        Ok(role)
    }
}
