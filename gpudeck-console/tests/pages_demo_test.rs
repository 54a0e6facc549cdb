// Page behavior in demo mode, on a paused clock

mod common;

use common::demo_session;
use gpudeck_backend::{ApiError, HttpBackend, HttpTimeouts};
use gpudeck_common::{InstanceStatus, JobStatus, Offer, ReservationStatus};
use gpudeck_console::forms::{FormState, JobForm, ReservationForm, RoleForm, SubmitError, TeamForm};
use gpudeck_console::pages::docs::DocsState;
use gpudeck_console::pages::machines::{NewMachine, HIGHLIGHT_FOR};
use gpudeck_console::pages::{
    DocsPage, JobsPage, MachinesPage, ReservationsPage, TeamsPage, TemplatesSlice,
};
use gpudeck_console::simulation::{FailoverDelays, FailoverPhase, PhaseDelay};
use gpudeck_console::sync_state::SyncState;
use gpudeck_console::{ConsoleStore, PollIntervals, Session};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn offer() -> Offer {
    Offer {
        id: 77,
        gpu_name: "RTX 4090".to_string(),
        num_gpus: 1,
        dph_total: 0.35,
        geolocation: Some("EU".to_string()),
    }
}

fn fixed_delays(d: Duration) -> FailoverDelays {
    FailoverDelays {
        lost: PhaseDelay::Fixed(d),
        failover_active: PhaseDelay::Fixed(d),
        searching: PhaseDelay::Fixed(d),
        provisioning: PhaseDelay::Fixed(d),
        restoring: PhaseDelay::Fixed(d),
    }
}

#[tokio::test(start_paused = true)]
async fn test_created_machine_boots_and_highlight_clears() {
    let (store, writers) = ConsoleStore::new();
    let page = MachinesPage::new(demo_session(), writers.racing_instance_ids);
    page.refresh().await;
    let before = page.machines().await.len();

    let created = page
        .create_machine(
            &offer(),
            NewMachine {
                label: Some("  ".to_string()),
                cpu_standby: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let list = page.machines().await;
    assert_eq!(list.len(), before + 1);
    let row = list.iter().find(|i| i.id == created.id).unwrap();
    assert_eq!(row.effective_status(), InstanceStatus::Loading);
    assert_eq!(row.label, None);
    assert_eq!(page.highlighted().await, Some(created.id));
    assert!(store.racing_instance_ids.get().contains(&created.id));

    tokio::time::sleep(Duration::from_millis(3500)).await;
    page.refresh().await;
    let row = page
        .machines()
        .await
        .into_iter()
        .find(|i| i.id == created.id)
        .unwrap();
    assert_eq!(row.effective_status(), InstanceStatus::Running);
    assert!(row.public_ipaddr.is_some());
    assert!(row.ssh_command().is_some());
    assert!(!store.racing_instance_ids.get().contains(&created.id));
    assert_eq!(page.highlighted().await, Some(created.id));

    tokio::time::sleep(HIGHLIGHT_FOR).await;
    assert_eq!(page.highlighted().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_failover_walkthrough_returns_machine_on_new_ip() {
    let (_store, writers) = ConsoleStore::new();
    let page = MachinesPage::new(demo_session(), writers.racing_instance_ids)
        .with_failover_delays(fixed_delays(Duration::from_secs(1)));
    page.refresh().await;

    page.simulate_failover(501).await.unwrap();
    let row = page
        .machines()
        .await
        .into_iter()
        .find(|i| i.id == 501)
        .unwrap();
    assert_eq!(row.effective_status(), InstanceStatus::Failover);

    let again = page.simulate_failover(501).await.unwrap_err();
    assert!(matches!(again, ApiError::Http { status: 409, .. }));

    let mut rx = page.subscribe_failover(501).await.unwrap();
    let mut phases = Vec::new();
    loop {
        let p = rx.borrow_and_update().clone();
        phases.push(p.phase);
        if p.phase.is_terminal() {
            break;
        }
        rx.changed().await.unwrap();
    }
    assert_eq!(phases.first(), Some(&FailoverPhase::Lost));
    assert_eq!(phases.last(), Some(&FailoverPhase::Complete));

    let row = page
        .machines()
        .await
        .into_iter()
        .find(|i| i.id == 501)
        .unwrap();
    assert_eq!(row.effective_status(), InstanceStatus::Running);
    assert!(row
        .public_ipaddr
        .as_deref()
        .is_some_and(|ip| ip.starts_with("198.51.100.")));
    assert_eq!(
        page.failover_progress(501).await.map(|p| p.phase),
        Some(FailoverPhase::Complete)
    );
}

#[tokio::test(start_paused = true)]
async fn test_finished_failover_yields_to_fetched_status() {
    let (_store, writers) = ConsoleStore::new();
    let page = MachinesPage::new(demo_session(), writers.racing_instance_ids)
        .with_failover_delays(fixed_delays(Duration::from_secs(1)));
    page.refresh().await;

    page.simulate_failover(501).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(
        page.failover_progress(501).await.map(|p| p.phase),
        Some(FailoverPhase::Complete)
    );

    page.pause_machine(501).await.unwrap();
    let (active, offline) = page.partitioned().await;
    assert!(!active.iter().any(|i| i.id == 501));
    let row = offline.iter().find(|i| i.id == 501).unwrap();
    assert_eq!(row.effective_status(), InstanceStatus::Stopped);
    assert_eq!(page.failover_progress(501).await, None);
}

#[tokio::test]
async fn test_failover_needs_demo_mode() {
    let backend = HttpBackend::new("http://127.0.0.1:9", None, HttpTimeouts::default()).unwrap();
    let session = Session::with_backend(Arc::new(backend), PollIntervals::default());
    let (_store, writers) = ConsoleStore::new();
    let page = MachinesPage::new(session, writers.racing_instance_ids);

    let err = page.simulate_failover(1).await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 400, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_second_sync_is_refused_while_first_runs() {
    let (_store, writers) = ConsoleStore::new();
    let page = MachinesPage::new(demo_session(), writers.racing_instance_ids);
    page.refresh().await;

    let syncing = page.clone();
    let first = tokio::spawn(async move { syncing.sync_machine(501, false).await });
    while !page.sync_state(501).await.is_busy() {
        tokio::task::yield_now().await;
    }

    let second = page.sync_machine(501, true).await.unwrap_err();
    assert!(matches!(second, ApiError::Http { status: 409, .. }));

    let report = first.await.unwrap().unwrap();
    assert!(!report.forced);
    assert!(report.snapshot_id.is_some());
    assert_eq!(page.sync_state(501).await, SyncState::Synced(report));
}

#[tokio::test(start_paused = true)]
async fn test_sync_settles_when_caller_gives_up() {
    let (_store, writers) = ConsoleStore::new();
    let page = MachinesPage::new(demo_session(), writers.racing_instance_ids);
    page.refresh().await;

    let syncing = page.clone();
    let caller = tokio::spawn(async move { syncing.sync_machine(501, true).await });
    while !page.sync_state(501).await.is_busy() {
        tokio::task::yield_now().await;
    }
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(matches!(page.sync_state(501).await, SyncState::Synced(_)));
    let report = page.sync_machine(501, false).await.unwrap();
    assert!(!report.forced);
}

#[tokio::test(start_paused = true)]
async fn test_pause_then_resume_through_page() {
    let (_store, writers) = ConsoleStore::new();
    let page = MachinesPage::new(demo_session(), writers.racing_instance_ids);
    page.refresh().await;

    page.pause_machine(502).await.unwrap();
    let (_, offline) = page.partitioned().await;
    assert!(offline.iter().any(|i| i.id == 502));

    page.resume_machine(502).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    page.refresh().await;
    let (active, offline) = page.partitioned().await;
    assert!(active.iter().any(|i| i.id == 502));
    assert!(!offline.iter().any(|i| i.id == 502));

    let err = page.delete_machine(9999).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
    assert!(page.banner().await.is_visible());
}

#[tokio::test(start_paused = true)]
async fn test_team_and_role_round_trip() {
    let page = TeamsPage::new(demo_session());
    page.refresh().await;

    let mut team_form = FormState::new(TeamForm::default());
    team_form.set("name", "  ML Platform  ").unwrap();
    team_form.set("description", "  Training infra ").unwrap();
    let team = page.create_team(&mut team_form).await.unwrap();
    assert_eq!(team.name, "ML Platform");
    assert_eq!(team.slug, "ml-platform");
    assert_eq!(team.description.as_deref(), Some("Training infra"));
    assert!(page.teams().await.iter().any(|t| t.id == team.id));

    let mut dup = FormState::new(TeamForm::default());
    dup.set("name", "ML platform").unwrap();
    let err = page.create_team(&mut dup).await.unwrap_err();
    assert_eq!(
        err,
        SubmitError::Server("A team with this slug already exists".to_string())
    );

    page.load_permissions().await;
    let grouped = page.grouped_permissions().await;
    assert_eq!(grouped["jobs"].len(), 2);

    let mut role_form = FormState::new(RoleForm::default());
    role_form.set("name", "  Trainer ").unwrap();
    role_form
        .set("permissions", "jobs.view, jobs.submit, jobs.view")
        .unwrap();
    let role = page.create_role(team.id, &mut role_form).await.unwrap();
    assert_eq!(role.name, "Trainer");

    let detail = page.open().await.unwrap();
    assert_eq!(detail.team.id, team.id);
    assert_eq!(detail.roles.len(), 1);
    assert_eq!(
        detail.roles[0].permission_set(),
        BTreeSet::from(["jobs.submit", "jobs.view"])
    );
}

#[tokio::test(start_paused = true)]
async fn test_jobs_poller_loads_and_submitted_job_runs() {
    let page = JobsPage::new(demo_session());
    let poller = page.start_polling();
    assert!(page.jobs().await.is_empty());

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(page.jobs().await.len(), 3);
    assert!(page.has_active());

    let mut form = FormState::new(JobForm::default());
    form.set("name", "bench").unwrap();
    form.set("source", "command").unwrap();
    form.set("command", "python bench.py").unwrap();
    form.set("gpu_type", "RTX 4090").unwrap();
    let job = page.submit(&mut form).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    tokio::time::sleep(Duration::from_secs(11)).await;
    let running = page
        .filtered(Some(JobStatus::Running))
        .await
        .into_iter()
        .any(|j| j.id == job.id);
    assert!(running);
    let counts = page.counts().await;
    assert_eq!(counts.len(), JobStatus::ALL.len());
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 4);

    poller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reservation_create_and_cancel() {
    let page = ReservationsPage::new(demo_session());
    page.refresh().await;
    let before = page.reservations().await.len();

    let mut form = FormState::new(ReservationForm::default());
    form.set("gpu_type", "H100 SXM").unwrap();
    form.set("gpu_count", "2").unwrap();
    form.set("start_time", "2030-01-01T00:00:00Z").unwrap();
    form.set("end_time", "2030-01-03T00:00:00Z").unwrap();
    let created = page.create(&mut form).await.unwrap();
    assert_eq!(created.status, ReservationStatus::Pending);
    assert!((created.discount_rate - 0.10).abs() < 1e-9);
    assert_eq!(page.reservations().await.len(), before + 1);

    page.cancel(created.id).await.unwrap();
    let cancelled = page.filtered(Some(ReservationStatus::Cancelled)).await;
    assert!(cancelled.iter().any(|r| r.id == created.id));
    assert!(page.cancel(created.id).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_templates_are_loaded_once_into_store() {
    let (store, writers) = ConsoleStore::new();
    let slice = TemplatesSlice::new(demo_session(), writers.templates);
    assert!(!slice.is_loaded());

    let n = slice.ensure_loaded().await.unwrap();
    assert_eq!(n, 3);
    assert_eq!(slice.ensure_loaded().await.unwrap(), 3);
    assert!(slice.is_loaded());
    assert_eq!(store.templates.get().len(), 3);
    let first = store.templates.get()[0].id.clone();
    assert!(slice.find(&first).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_demo_docs_render_failover_diagram() {
    let page = DocsPage::new(demo_session());
    page.load_menu().await;
    assert!(!page.menu().await.is_empty());
    assert_eq!(page.open("failover").await, DocsState::Loaded);
    assert_eq!(page.rendered().await.diagrams.len(), 1);
}
