//! Seed data for the demo backend.

use chrono::{DateTime, Duration, Utc};
use gpudeck_common::{
    Balance, CpuStandby, DocMenuItem, FinetuneJob, FinetuneStatus, GpuPriceSummary, Instance,
    InstanceStatus, Job, JobSource, JobSourceKind, JobStatus, NpsResponse, Permission, PriceAlert,
    PriceMonitorStatus, PricePoint, Reservation, ReservationStatus, Role, Team, TeamDetail,
    Template,
};
use std::collections::HashMap;

use super::DemoState;

pub(super) fn seed(now: DateTime<Utc>) -> DemoState {
    let history = price_history(now);
    DemoState {
        instances: instances(now),
        balance: Balance {
            credit: 142.37,
            currency: Some("USD".to_string()),
        },
        jobs: jobs(now),
        finetunes: finetunes(now),
        teams: teams(),
        permissions: permissions(),
        reservations: reservations(now),
        nps: nps_responses(now),
        price_status: PriceMonitorStatus {
            running: true,
            last_check: Some(now - Duration::minutes(4)),
            gpus_monitored: PRICED_GPUS.iter().map(|(n, _, _)| n.to_string()).collect(),
            interval_minutes: Some(15),
        },
        price_summary: price_summary(),
        price_history: history,
        price_alerts: price_alerts(now),
        docs_menu: docs_menu(),
        docs: docs(),
        templates: templates(),
        next_id: 1000,
    }
}

fn instance(id: i64, gpu: &str, n: u32, status: InstanceStatus, dph: f64) -> Instance {
    Instance {
        id,
        gpu_name: gpu.to_string(),
        num_gpus: n,
        status,
        actual_status: Some(status),
        label: None,
        dph_total: dph,
        start_date: None,
        public_ipaddr: None,
        ssh_host: None,
        ssh_port: None,
        cpu_standby: None,
    }
}

fn instances(now: DateTime<Utc>) -> Vec<Instance> {
    let epoch = now.timestamp() as f64;

    let mut a = instance(501, "RTX 4090", 1, InstanceStatus::Running, 0.42);
    a.label = Some("sd-xl-playground".into());
    a.start_date = Some(epoch - 5.5 * 3600.0);
    a.public_ipaddr = Some("203.0.113.14".into());
    a.ssh_host = Some("ssh4.gpudeck.dev".into());
    a.ssh_port = Some(22014);
    a.cpu_standby = Some(CpuStandby {
        enabled: true,
        state: Some("synced".into()),
        ip: Some("198.51.100.7".into()),
    });

    let mut b = instance(502, "A100 SXM4", 2, InstanceStatus::Running, 2.35);
    b.label = Some("llama-finetune".into());
    b.start_date = Some(epoch - 26.0 * 3600.0);
    b.public_ipaddr = Some("203.0.113.52".into());
    b.ssh_host = Some("ssh2.gpudeck.dev".into());
    b.ssh_port = Some(22052);

    let mut c = instance(503, "RTX 3090", 1, InstanceStatus::Stopped, 0.21);
    c.label = Some("notebook".into());

    vec![a, b, c]
}

fn job(id: &str, name: &str, status: JobStatus, source: JobSource, gpu: &str, at: DateTime<Utc>) -> Job {
    Job {
        id: id.to_string(),
        name: name.to_string(),
        status,
        source,
        gpu_type: Some(gpu.to_string()),
        disk_size: Some(50),
        timeout_minutes: Some(120),
        created_at: Some(at.to_rfc3339()),
        error_message: None,
        instance_id: None,
    }
}

fn jobs(now: DateTime<Utc>) -> Vec<Job> {
    let hf = |repo: &str| JobSource {
        kind: JobSourceKind::Huggingface,
        hf_repo: Some(repo.to_string()),
        ..Default::default()
    };
    let mut failed = job(
        "job-7f3a",
        "whisper-eval",
        JobStatus::Failed,
        JobSource {
            kind: JobSourceKind::Git,
            git_url: Some("https://github.com/acme/whisper-eval.git".into()),
            git_branch: Some("main".into()),
            ..Default::default()
        },
        "RTX 4090",
        now - Duration::hours(20),
    );
    failed.error_message = Some("CUDA out of memory".into());

    let mut running = job(
        "job-91c2",
        "mistral-benchmark",
        JobStatus::Running,
        hf("mistralai/Mistral-7B-v0.1"),
        "A100 SXM4",
        now - Duration::minutes(35),
    );
    running.instance_id = Some(502);

    vec![
        running,
        job(
            "job-44d0",
            "resnet-sweep",
            JobStatus::Completed,
            JobSource {
                kind: JobSourceKind::Command,
                command: Some("python sweep.py --epochs 10".into()),
                ..Default::default()
            },
            "RTX 3090",
            now - Duration::hours(6),
        ),
        failed,
    ]
}

fn finetunes(now: DateTime<Utc>) -> Vec<FinetuneJob> {
    vec![
        FinetuneJob {
            id: "ft-1021".into(),
            name: "support-bot-v2".into(),
            base_model: "meta-llama/Llama-3.1-8B".into(),
            dataset: Some("support_tickets.jsonl".into()),
            status: FinetuneStatus::Completed,
            progress: Some(100.0),
            gpu_type: Some("A100 SXM4".into()),
            epochs: Some(3),
            created_at: Some((now - Duration::days(2)).to_rfc3339()),
            deployed_endpoint: None,
            error_message: None,
        },
        FinetuneJob {
            id: "ft-1022".into(),
            name: "sql-coder".into(),
            base_model: "Qwen/Qwen2.5-7B".into(),
            dataset: Some("spider_train.jsonl".into()),
            status: FinetuneStatus::Running,
            progress: Some(42.0),
            gpu_type: Some("RTX 4090".into()),
            epochs: Some(2),
            created_at: Some((now - Duration::hours(1)).to_rfc3339()),
            deployed_endpoint: None,
            error_message: None,
        },
    ]
}

fn teams() -> Vec<TeamDetail> {
    vec![
        TeamDetail {
            team: Team {
                id: 1,
                name: "Research".into(),
                slug: "research".into(),
                description: Some("Model training and evaluation".into()),
                member_count: 4,
                user_role: Some("owner".into()),
            },
            roles: vec![
                Role {
                    name: "admin".into(),
                    description: Some("Full access".into()),
                    permissions: permissions().into_iter().map(|p| p.name).collect(),
                },
                Role {
                    name: "viewer".into(),
                    description: None,
                    permissions: vec!["machines.view".into(), "jobs.view".into()],
                },
            ],
        },
        TeamDetail {
            team: Team {
                id: 2,
                name: "Inference Ops".into(),
                slug: "inference-ops".into(),
                description: None,
                member_count: 2,
                user_role: Some("member".into()),
            },
            roles: vec![],
        },
    ]
}

fn permissions() -> Vec<Permission> {
    [
        ("machines.view", "machines", "See machines"),
        ("machines.manage", "machines", "Create, pause and delete machines"),
        ("jobs.view", "jobs", "See jobs and logs"),
        ("jobs.submit", "jobs", "Submit and cancel jobs"),
        ("billing.view", "billing", "See balance and invoices"),
        ("team.manage", "team", "Invite members and edit roles"),
    ]
    .into_iter()
    .map(|(name, category, description)| Permission {
        name: name.to_string(),
        description: Some(description.to_string()),
        category: category.to_string(),
    })
    .collect()
}

fn reservations(now: DateTime<Utc>) -> Vec<Reservation> {
    vec![
        Reservation {
            id: 301,
            gpu_type: "H100 SXM".into(),
            gpu_count: 8,
            start_time: now - Duration::hours(10),
            end_time: now + Duration::hours(14),
            status: ReservationStatus::Active,
            credits_used: 212.4,
            discount_rate: 0.15,
        },
        Reservation {
            id: 302,
            gpu_type: "A100 SXM4".into(),
            gpu_count: 2,
            start_time: now + Duration::days(3),
            end_time: now + Duration::days(3) + Duration::hours(48),
            status: ReservationStatus::Pending,
            credits_used: 0.0,
            discount_rate: 0.10,
        },
        Reservation {
            id: 303,
            gpu_type: "RTX 4090".into(),
            gpu_count: 1,
            start_time: now - Duration::days(9),
            end_time: now - Duration::days(8),
            status: ReservationStatus::Completed,
            credits_used: 8.9,
            discount_rate: 0.05,
        },
    ]
}

fn nps_responses(now: DateTime<Utc>) -> Vec<NpsResponse> {
    [
        (10, Some("Spinning up a 4090 takes seconds, love it")),
        (9, None),
        (8, Some("Good, but more EU regions please")),
        (6, Some("Machine got stuck in loading twice")),
        (3, Some("Lost my work when the host went offline")),
        (10, Some("Failover saved my weekend")),
        (7, None),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (score, comment))| NpsResponse {
        id: 40 + i as i64,
        score,
        category: None,
        comment: comment.map(String::from),
        followed_up: false,
        followup_notes: None,
        created_at: Some(now - Duration::days(i as i64 + 1)),
    })
    .collect()
}

/// (name, base $/h, offers)
const PRICED_GPUS: [(&str, f64, u32); 5] = [
    ("RTX 3090", 0.22, 310),
    ("RTX 4090", 0.44, 184),
    ("A100 PCIE", 1.29, 46),
    ("A100 SXM4", 1.62, 38),
    ("H100 SXM", 2.79, 21),
];

fn price_summary() -> Vec<GpuPriceSummary> {
    PRICED_GPUS
        .iter()
        .map(|(name, avg, offers)| GpuPriceSummary {
            gpu_name: name.to_string(),
            avg_price: *avg,
            min_price: (avg * 0.78 * 100.0).round() / 100.0,
            max_price: (avg * 1.35 * 100.0).round() / 100.0,
            total_offers: *offers,
            available_gpus: offers * 3,
        })
        .collect()
}

/// Hourly points over the last three days, gently oscillating around the base price.
fn price_history(now: DateTime<Utc>) -> Vec<PricePoint> {
    let mut out = Vec::new();
    for (idx, (name, base, offers)) in PRICED_GPUS.iter().enumerate() {
        for h in (0..72).rev() {
            let wave = ((h as f64 + idx as f64 * 5.0) / 7.0).sin() * 0.06;
            let avg = base * (1.0 + wave);
            out.push(PricePoint {
                timestamp: now - Duration::hours(h),
                gpu_name: name.to_string(),
                avg_price: avg,
                min_price: avg * 0.8,
                max_price: avg * 1.3,
                total_offers: *offers,
            });
        }
    }
    out
}

fn price_alerts(now: DateTime<Utc>) -> Vec<PriceAlert> {
    vec![
        PriceAlert {
            id: 9001,
            gpu_name: "H100 SXM".into(),
            alert_type: "price_drop".into(),
            old_value: 3.10,
            new_value: 2.79,
            change_percent: -10.0,
            created_at: Some(now - Duration::hours(3)),
        },
        PriceAlert {
            id: 9002,
            gpu_name: "RTX 4090".into(),
            alert_type: "price_spike".into(),
            old_value: 0.38,
            new_value: 0.44,
            change_percent: 15.8,
            created_at: Some(now - Duration::hours(11)),
        },
    ]
}

fn docs_menu() -> Vec<DocMenuItem> {
    vec![
        DocMenuItem {
            id: "getting-started".into(),
            title: "Getting started".into(),
            children: vec![
                DocMenuItem::leaf("quickstart", "Quickstart"),
                DocMenuItem::leaf("ssh-access", "SSH access"),
            ],
        },
        DocMenuItem {
            id: "reliability".into(),
            title: "Reliability".into(),
            children: vec![DocMenuItem::leaf("failover", "CPU standby & failover")],
        },
    ]
}

fn docs() -> HashMap<String, String> {
    let mut docs = HashMap::new();
    docs.insert(
        "getting-started".to_string(),
        "# Getting started\n\nPick a topic in the menu.\n".to_string(),
    );
    docs.insert(
        "quickstart".to_string(),
        "# Quickstart\n\n1. Pick an offer on the **Machines** page.\n2. Wait for the status to reach `running`.\n3. Connect with the SSH command shown on the card.\n\n```bash\nssh -p 22014 root@ssh4.gpudeck.dev\n```\n".to_string(),
    );
    docs.insert(
        "ssh-access".to_string(),
        "# SSH access\n\nKeys are read from your profile. Ports change when a machine is recreated.\n".to_string(),
    );
    docs.insert(
        "reliability".to_string(),
        "# Reliability\n\nHow machines survive host failures.\n".to_string(),
    );
    docs.insert(
        "failover".to_string(),
        "# CPU standby & failover\n\nEach GPU machine can keep a CPU standby in sync.\n\n```mermaid\ngraph LR\n  GPU -->|sync| Standby\n  Standby -->|restore| NewGPU\n```\n\nWhen the host is lost, traffic moves to the standby while a new GPU is provisioned.\n".to_string(),
    );
    docs
}

fn templates() -> Vec<Template> {
    vec![
        Template {
            id: "pytorch".into(),
            name: "PyTorch 2.4 + CUDA 12.4".into(),
            image: Some("pytorch/pytorch:2.4.0-cuda12.4-cudnn9-runtime".into()),
            description: Some("Jupyter, SSH, common ML libs".into()),
            gpu_recommendation: Some("RTX 4090".into()),
        },
        Template {
            id: "vllm".into(),
            name: "vLLM server".into(),
            image: Some("vllm/vllm-openai:latest".into()),
            description: Some("OpenAI-compatible inference endpoint".into()),
            gpu_recommendation: Some("A100 SXM4".into()),
        },
        Template {
            id: "comfyui".into(),
            name: "ComfyUI".into(),
            image: None,
            description: None,
            gpu_recommendation: None,
        },
    ]
}
