use crate::envelope::{extract_list, extract_object};
use crate::{ApiResult, ConsoleBackend};
use async_trait::async_trait;
use gpudeck_common::jobs::{CreateFinetuneRequest, CreateJobRequest, DownloadLink, JobLogs};
use gpudeck_common::nps::FollowUpRequest;
use gpudeck_common::reservations::CreateReservationRequest;
use gpudeck_common::teams::{CreateRoleRequest, CreateTeamRequest};
use gpudeck_common::{
    ApiError, Balance, CreateInstanceRequest, DocMenuItem, FinetuneJob, GpuPriceSummary, Instance,
    InstanceStatus, Job, NpsResponse, Permission, PriceAlert, PriceMonitorStatus, PricePoint,
    Reservation, ReservationStats, Role, SyncReport, Team, TeamDetail, Template,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub total: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            total: Duration::from_secs(20),
        }
    }
}

/// REST client for the console API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>, timeouts: HttpTimeouts) -> ApiResult<Self> {
        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.total)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;
        let token = token
            .as_deref()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let rb = self.client.request(method, url);
        match &self.token {
            Some(t) => rb.bearer_auth(t),
            None => rb,
        }
    }

    /// Send and return the JSON body (null for empty bodies), classifying failures.
    async fn send(&self, rb: RequestBuilder) -> ApiResult<Value> {
        let resp = rb
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status();
        let url = resp.url().path().to_string();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!("{} answered {}: {}", url, status.as_u16(), truncate(&text, 200));
            return Err(ApiError::from_status_body(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(format!("{}: {}", url, e)))
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str, key: &str) -> ApiResult<Vec<T>> {
        let v = self.send(self.request(Method::GET, path)).await?;
        extract_list(v, key)
    }

    async fn get_object<T: DeserializeOwned>(&self, path: &str, key: &str) -> ApiResult<T> {
        let v = self.send(self.request(Method::GET, path)).await?;
        extract_object(v, key)
    }

    async fn post_empty(&self, path: &str) -> ApiResult<()> {
        self.send(self.request(Method::POST, path)).await.map(|_| ())
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        self.send(self.request(Method::DELETE, path)).await.map(|_| ())
    }
}

fn enc(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl ConsoleBackend for HttpBackend {
    async fn list_instances(&self) -> ApiResult<Vec<Instance>> {
        self.get_list("/api/v1/instances", "instances").await
    }

    async fn balance(&self) -> ApiResult<Balance> {
        self.get_object("/api/v1/instances/balance", "balance").await
    }

    async fn create_instance(&self, req: &CreateInstanceRequest) -> ApiResult<Instance> {
        let v = self
            .send(self.request(Method::POST, "/api/v1/instances").json(req))
            .await?;
        // Some deployments only echo the new contract id.
        match extract_object::<Instance>(v.clone(), "instance") {
            Ok(i) => Ok(i),
            Err(decode_err) => {
                let id = v
                    .get("id")
                    .or_else(|| v.get("new_contract"))
                    .and_then(|x| x.as_i64())
                    .ok_or(decode_err)?;
                Ok(Instance {
                    id,
                    gpu_name: req.gpu_name.clone(),
                    num_gpus: req.num_gpus,
                    status: InstanceStatus::Loading,
                    actual_status: Some(InstanceStatus::Loading),
                    label: req.label.clone(),
                    dph_total: 0.0,
                    start_date: None,
                    public_ipaddr: None,
                    ssh_host: None,
                    ssh_port: None,
                    cpu_standby: None,
                })
            }
        }
    }

    async fn delete_instance(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("/api/v1/instances/{}", id)).await
    }

    async fn pause_instance(&self, id: i64) -> ApiResult<()> {
        self.post_empty(&format!("/api/v1/instances/{}/pause", id))
            .await
    }

    async fn resume_instance(&self, id: i64) -> ApiResult<()> {
        self.post_empty(&format!("/api/v1/instances/{}/resume", id))
            .await
    }

    async fn sync_instance(&self, id: i64, force: bool) -> ApiResult<SyncReport> {
        let path = if force {
            format!("/api/v1/instances/{}/sync?force=true", id)
        } else {
            format!("/api/v1/instances/{}/sync", id)
        };
        let v = self.send(self.request(Method::POST, &path)).await?;
        if v.is_null() {
            return Ok(SyncReport {
                forced: force,
                ..Default::default()
            });
        }
        extract_object(v, "sync")
    }

    async fn list_jobs(&self) -> ApiResult<Vec<Job>> {
        self.get_list("/api/v1/jobs", "jobs").await
    }

    async fn create_job(&self, req: &CreateJobRequest) -> ApiResult<Job> {
        let v = self
            .send(self.request(Method::POST, "/api/v1/jobs").json(req))
            .await?;
        extract_object(v, "job")
    }

    async fn cancel_job(&self, id: &str) -> ApiResult<()> {
        self.post_empty(&format!("/api/v1/jobs/{}/cancel", enc(id)))
            .await
    }

    async fn job_logs(&self, id: &str) -> ApiResult<JobLogs> {
        let v = self
            .send(self.request(Method::GET, &format!("/api/v1/jobs/{}/logs", enc(id))))
            .await?;
        Ok(JobLogs::from_value(v))
    }

    async fn list_finetune_jobs(&self) -> ApiResult<Vec<FinetuneJob>> {
        self.get_list("/api/v1/finetune/jobs", "jobs").await
    }

    async fn create_finetune_job(&self, req: &CreateFinetuneRequest) -> ApiResult<FinetuneJob> {
        let v = self
            .send(self.request(Method::POST, "/api/v1/finetune/jobs").json(req))
            .await?;
        extract_object(v, "job")
    }

    async fn cancel_finetune_job(&self, id: &str) -> ApiResult<()> {
        self.post_empty(&format!("/api/v1/finetune/jobs/{}/cancel", enc(id)))
            .await
    }

    async fn deploy_finetune_job(&self, id: &str) -> ApiResult<FinetuneJob> {
        let v = self
            .send(self.request(
                Method::POST,
                &format!("/api/v1/finetune/jobs/{}/deploy", enc(id)),
            ))
            .await?;
        extract_object(v, "job")
    }

    async fn delete_finetune_job(&self, id: &str) -> ApiResult<()> {
        self.delete(&format!("/api/v1/finetune/jobs/{}", enc(id)))
            .await
    }

    async fn finetune_logs(&self, id: &str) -> ApiResult<JobLogs> {
        let v = self
            .send(self.request(
                Method::GET,
                &format!("/api/v1/finetune/jobs/{}/logs", enc(id)),
            ))
            .await?;
        Ok(JobLogs::from_value(v))
    }

    async fn finetune_download(&self, id: &str) -> ApiResult<DownloadLink> {
        self.get_object(
            &format!("/api/v1/finetune/jobs/{}/download", enc(id)),
            "download",
        )
        .await
    }

    async fn list_teams(&self) -> ApiResult<Vec<Team>> {
        self.get_list("/api/v1/teams", "teams").await
    }

    async fn create_team(&self, req: &CreateTeamRequest) -> ApiResult<Team> {
        let v = self
            .send(self.request(Method::POST, "/api/v1/teams").json(req))
            .await?;
        extract_object(v, "team")
    }

    async fn get_team(&self, id: i64) -> ApiResult<TeamDetail> {
        self.get_object(&format!("/api/v1/teams/{}", id), "team")
            .await
    }

    async fn list_permissions(&self) -> ApiResult<Vec<Permission>> {
        self.get_list("/api/v1/permissions", "permissions").await
    }

    async fn create_role(&self, team_id: i64, req: &CreateRoleRequest) -> ApiResult<Role> {
        let v = self
            .send(
                self.request(Method::POST, &format!("/api/v1/teams/{}/roles", team_id))
                    .json(req),
            )
            .await?;
        extract_object(v, "role")
    }

    async fn docs_menu(&self) -> ApiResult<Vec<DocMenuItem>> {
        self.get_list("/api/docs/menu", "menu").await
    }

    async fn docs_content(&self, id: &str) -> ApiResult<String> {
        let v = self
            .send(self.request(Method::GET, &format!("/api/docs/content/{}", enc(id))))
            .await?;
        match v.get("content").and_then(|c| c.as_str()) {
            Some(c) => Ok(c.to_string()),
            None => Err(ApiError::Decode(format!("doc {} has no content", id))),
        }
    }

    async fn price_status(&self) -> ApiResult<PriceMonitorStatus> {
        self.get_object("/api/price-monitor/status", "status").await
    }

    async fn price_summary(&self) -> ApiResult<Vec<GpuPriceSummary>> {
        self.get_list("/api/price-monitor/summary", "summary").await
    }

    async fn price_history(&self, gpu_name: Option<&str>, hours: u32) -> ApiResult<Vec<PricePoint>> {
        let mut query: Vec<(&str, String)> = vec![("hours", hours.to_string())];
        if let Some(gpu) = gpu_name.filter(|g| !g.trim().is_empty()) {
            query.push(("gpu_name", gpu.trim().to_string()));
        }
        let v = self
            .send(
                self.request(Method::GET, "/api/price-monitor/history")
                    .query(&query),
            )
            .await?;
        extract_list(v, "history")
    }

    async fn price_alerts(&self) -> ApiResult<Vec<PriceAlert>> {
        self.get_list("/api/price-monitor/alerts", "alerts").await
    }

    async fn list_reservations(&self) -> ApiResult<Vec<Reservation>> {
        self.get_list("/api/reservations", "reservations").await
    }

    async fn reservation_stats(&self) -> ApiResult<ReservationStats> {
        self.get_object("/api/reservations/stats", "stats").await
    }

    async fn create_reservation(&self, req: &CreateReservationRequest) -> ApiResult<Reservation> {
        let v = self
            .send(self.request(Method::POST, "/api/reservations").json(req))
            .await?;
        extract_object(v, "reservation")
    }

    async fn cancel_reservation(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("/api/reservations/{}", id)).await
    }

    async fn list_nps_responses(&self) -> ApiResult<Vec<NpsResponse>> {
        self.get_list("/api/v1/nps/responses", "responses").await
    }

    async fn mark_nps_followed_up(&self, id: i64, notes: Option<&str>) -> ApiResult<()> {
        let body = FollowUpRequest {
            notes: notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        };
        self.send(
            self.request(
                Method::POST,
                &format!("/api/v1/nps/responses/{}/followup", id),
            )
            .json(&body),
        )
        .await
        .map(|_| ())
    }

    async fn list_templates(&self) -> ApiResult<Vec<Template>> {
        self.get_list("/api/v1/templates", "templates").await
    }
}
