use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gpudeck_common::price_monitor::{PriceBand, PriceSort};
use gpudeck_common::{DocMenuItem, Instance, JobStatus, NpsCategory, Offer, ReservationStatus};
use gpudeck_console::forms::{FormState, JobForm, SubmitError};
use gpudeck_console::pages::machines::NewMachine;
use gpudeck_console::pages::nps::NpsFilter;
use gpudeck_console::pages::price_monitor::PriceFilter;
use gpudeck_console::pages::{
    DocsPage, FinetunePage, JobsPage, MachinesPage, NpsPage, PriceMonitorPage, ReservationsPage,
    TeamsPage,
};
use gpudeck_console::sync_state::human_bytes;
use gpudeck_console::{ConsoleConfig, ConsoleStore, ErrorBanner, Session};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gpudeck")]
#[command(about = "GPU cloud console")]
struct Cli {
    /// Use the scripted in-memory backend
    #[arg(long, global = true)]
    demo: bool,

    /// Console API base URL (overrides GPUDECK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List machines and the account balance
    Machines {
        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Rent a machine from an offer
    CreateMachine {
        #[arg(long)]
        offer: i64,
        #[arg(long)]
        gpu: String,
        #[arg(long, default_value_t = 1)]
        gpus: u32,
        #[arg(long)]
        label: Option<String>,
        /// Keep a CPU standby in sync
        #[arg(long)]
        standby: bool,
    },
    DeleteMachine {
        id: i64,
    },
    PauseMachine {
        id: i64,
    },
    ResumeMachine {
        id: i64,
    },
    /// Sync a machine to its CPU standby
    SyncMachine {
        id: i64,
        /// Re-send everything instead of the changes
        #[arg(long)]
        force: bool,
    },
    /// Walk through a simulated GPU failover (demo mode)
    Failover {
        id: i64,
    },
    Jobs {
        #[arg(long)]
        status: Option<String>,
    },
    SubmitJob {
        #[arg(long)]
        name: String,
        /// huggingface, git or command
        #[arg(long, default_value = "huggingface")]
        source: String,
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        git_url: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        command: Option<String>,
        #[arg(long)]
        gpu: String,
        #[arg(long)]
        disk: Option<String>,
        #[arg(long)]
        timeout: Option<String>,
    },
    CancelJob {
        id: String,
    },
    JobLogs {
        id: String,
        #[arg(long, default_value_t = 50)]
        tail: usize,
    },
    Finetunes,
    Teams {
        /// Show one team with its roles
        #[arg(long)]
        team: Option<i64>,
    },
    Reservations {
        #[arg(long)]
        status: Option<String>,
    },
    Nps {
        /// promoter, passive or detractor
        #[arg(long)]
        category: Option<String>,
    },
    Prices {
        /// Comma separated GPU patterns, `*` as wildcard
        #[arg(long)]
        gpu: Option<String>,
        #[arg(long, default_value_t = 24)]
        hours: u32,
        /// price, price_desc, offers or name
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
    },
    Docs {
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConsoleConfig::from_env().context("reading console configuration")?;
    if cli.demo {
        config.demo_mode = true;
    }
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    let session = Session::new(&config)?;
    run(session, cli.command).await
}

async fn run(session: Arc<Session>, command: Commands) -> Result<()> {
    let (_store, writers) = ConsoleStore::new();

    match command {
        Commands::Machines { watch } => {
            let page = MachinesPage::new(session.clone(), writers.racing_instance_ids);
            page.refresh_all().await;
            print_machines(&page).await;
            if watch {
                let _pollers = page.start_polling();
                let every = session.poll().machines;
                loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => break,
                        _ = tokio::time::sleep(every) => print_machines(&page).await,
                    }
                }
            }
        }
        Commands::CreateMachine {
            offer,
            gpu,
            gpus,
            label,
            standby,
        } => {
            let page = MachinesPage::new(session, writers.racing_instance_ids);
            let offer = Offer {
                id: offer,
                gpu_name: gpu,
                num_gpus: gpus,
                dph_total: 0.0,
                geolocation: None,
            };
            let opts = NewMachine {
                label,
                cpu_standby: standby,
                ..Default::default()
            };
            let created = page.create_machine(&offer, opts).await?;
            println!("machine {} requested ({})", created.id, created.effective_status());
        }
        Commands::DeleteMachine { id } => {
            MachinesPage::new(session, writers.racing_instance_ids)
                .delete_machine(id)
                .await?;
            println!("machine {} deleted", id);
        }
        Commands::PauseMachine { id } => {
            MachinesPage::new(session, writers.racing_instance_ids)
                .pause_machine(id)
                .await?;
            println!("machine {} paused", id);
        }
        Commands::ResumeMachine { id } => {
            MachinesPage::new(session, writers.racing_instance_ids)
                .resume_machine(id)
                .await?;
            println!("machine {} resuming", id);
        }
        Commands::SyncMachine { id, force } => {
            let page = MachinesPage::new(session, writers.racing_instance_ids);
            let report = page.sync_machine(id, force).await?;
            println!(
                "synced {} file(s), {} in {} ms{}",
                report.files_changed,
                human_bytes(report.bytes_transferred),
                report.duration_ms,
                report
                    .snapshot_id
                    .map(|s| format!(" (snapshot {})", s))
                    .unwrap_or_default()
            );
        }
        Commands::Failover { id } => {
            let page = MachinesPage::new(session, writers.racing_instance_ids);
            page.refresh().await;
            page.simulate_failover(id).await?;
            let Some(mut rx) = page.subscribe_failover(id).await else {
                bail!("failover for machine {} did not start", id);
            };
            loop {
                let progress = rx.borrow_and_update().clone();
                println!("[{}] {}", progress.phase.as_str(), progress.message);
                if progress.phase.is_terminal() {
                    if let Some(ip) = progress.new_ip {
                        println!("machine {} is back on GPU at {}", id, ip);
                    }
                    break;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
        Commands::Jobs { status } => {
            let filter = status.as_deref().map(parse_job_status).transpose()?;
            let page = JobsPage::new(session);
            page.refresh().await;
            show_banner(&page.banner().await);
            let rows = page
                .filtered(filter)
                .await
                .into_iter()
                .map(|j| {
                    vec![
                        j.id,
                        j.name,
                        j.status.as_str().to_string(),
                        j.source.describe(),
                        j.gpu_type.unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(&["ID", "NAME", "STATUS", "SOURCE", "GPU"], rows);
            let counts: Vec<String> = page
                .counts()
                .await
                .into_iter()
                .filter(|(_, n)| *n > 0)
                .map(|(s, n)| format!("{} {}", n, s.as_str()))
                .collect();
            if !counts.is_empty() {
                println!("\n{}", counts.join(", "));
            }
        }
        Commands::SubmitJob {
            name,
            source,
            repo,
            git_url,
            branch,
            command,
            gpu,
            disk,
            timeout,
        } => {
            let page = JobsPage::new(session);
            let mut form = FormState::new(JobForm::default());
            let inputs = [
                ("name", Some(name)),
                ("source", Some(source)),
                ("hf_repo", repo),
                ("git_url", git_url),
                ("git_branch", branch),
                ("command", command),
                ("gpu_type", Some(gpu)),
                ("disk_size", disk),
                ("timeout_minutes", timeout),
            ];
            for (field, value) in inputs {
                if let Some(v) = value {
                    form.set(field, &v)
                        .map_err(|e| anyhow::anyhow!("unknown form field {}", e.0))?;
                }
            }
            match page.submit(&mut form).await {
                Ok(job) => println!("job {} submitted ({})", job.id, job.status.as_str()),
                Err(SubmitError::Invalid(errors)) => {
                    for (field, msg) in errors.iter() {
                        eprintln!("{}: {}", field, msg);
                    }
                    bail!("job form has {} error(s)", errors.len());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::CancelJob { id } => {
            JobsPage::new(session).cancel(&id).await?;
            println!("job {} cancelled", id);
        }
        Commands::JobLogs { id, tail } => {
            let logs = JobsPage::new(session).logs(&id).await?;
            for line in logs.tail(tail) {
                println!("{}", line);
            }
        }
        Commands::Finetunes => {
            let page = FinetunePage::new(session);
            page.refresh().await;
            show_banner(&page.banner().await);
            let rows = page
                .jobs()
                .await
                .into_iter()
                .map(|j| {
                    vec![
                        j.id,
                        j.name,
                        j.base_model,
                        j.status.as_str().to_string(),
                        j.progress.map(|p| format!("{:.0}%", p)).unwrap_or_default(),
                        j.deployed_endpoint.unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(&["ID", "NAME", "BASE MODEL", "STATUS", "PROGRESS", "ENDPOINT"], rows);
        }
        Commands::Teams { team } => {
            let page = TeamsPage::new(session);
            match team {
                Some(id) => {
                    let detail = page.open_team(id).await?;
                    println!("{} ({})", detail.team.name, detail.team.slug);
                    let rows = detail
                        .roles
                        .into_iter()
                        .map(|r| vec![r.name, r.permissions.join(", ")])
                        .collect();
                    print_table(&["ROLE", "PERMISSIONS"], rows);
                }
                None => {
                    page.refresh().await;
                    show_banner(&page.banner().await);
                    let rows = page
                        .teams()
                        .await
                        .into_iter()
                        .map(|t| {
                            vec![
                                t.id.to_string(),
                                t.name,
                                t.slug,
                                t.member_count.to_string(),
                                t.user_role.unwrap_or_default(),
                            ]
                        })
                        .collect();
                    print_table(&["ID", "NAME", "SLUG", "MEMBERS", "YOUR ROLE"], rows);
                }
            }
        }
        Commands::Reservations { status } => {
            let page = ReservationsPage::new(session);
            page.refresh().await;
            show_banner(&page.banner().await);
            let filter = match status.as_deref() {
                Some(s) => Some(parse_reservation_status(s)?),
                None => None,
            };
            let rows = page
                .filtered(filter)
                .await
                .into_iter()
                .map(|r| {
                    vec![
                        r.id.to_string(),
                        format!("{}x {}", r.gpu_count, r.gpu_type),
                        r.start_time.format("%Y-%m-%d %H:%M").to_string(),
                        format!("{:.0} h", r.hours()),
                        r.status.as_str().to_string(),
                        format!("{:.0}%", r.discount_rate * 100.0),
                    ]
                })
                .collect();
            print_table(&["ID", "GPUS", "START", "LENGTH", "STATUS", "DISCOUNT"], rows);
            let s = page.stats().await;
            println!(
                "\n{} active, {} pending, {:.0} h reserved, {:.0}% average discount",
                s.active_count,
                s.pending_count,
                s.total_hours,
                s.average_discount * 100.0
            );
        }
        Commands::Nps { category } => {
            let page = NpsPage::new(session, writers.nps);
            page.refresh().await;
            show_banner(&page.banner().await);
            let filter = NpsFilter {
                category: match category.as_deref() {
                    Some(c) => Some(parse_nps_category(c)?),
                    None => None,
                },
                ..Default::default()
            };
            let rows = page
                .responses(&filter)
                .into_iter()
                .map(|r| {
                    vec![
                        r.id.to_string(),
                        r.score.to_string(),
                        r.category().as_str().to_string(),
                        if r.followed_up { "yes" } else { "no" }.to_string(),
                        r.comment.unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(&["ID", "SCORE", "CATEGORY", "FOLLOWED UP", "COMMENT"], rows);
            let s = page.summary(&filter);
            println!(
                "\nNPS {} ({} promoters, {} passives, {} detractors, {} to follow up)",
                s.score, s.promoters, s.passives, s.detractors, s.pending_follow_ups
            );
        }
        Commands::Prices {
            gpu,
            hours,
            sort,
            min_price,
            max_price,
        } => {
            let page = PriceMonitorPage::new(session);
            let mut filter = PriceFilter {
                hours,
                band: PriceBand {
                    min: min_price,
                    max: max_price,
                },
                ..Default::default()
            }
            .with_gpus(gpu.as_deref());
            if let Some(s) = sort.as_deref() {
                filter.sort = PriceSort::parse(s)
                    .with_context(|| format!("unknown sort '{}'", s))?;
            }
            page.set_filter(filter).await;
            page.refresh().await;
            show_banner(&page.banner().await);
            let view = page.view().await;
            let rows = view
                .summaries
                .into_iter()
                .map(|s| {
                    vec![
                        s.gpu_name,
                        format!("${:.3}", s.avg_price),
                        format!("${:.3}", s.min_price),
                        format!("${:.3}", s.max_price),
                        s.total_offers.to_string(),
                    ]
                })
                .collect();
            print_table(&["GPU", "AVG/H", "MIN/H", "MAX/H", "OFFERS"], rows);
            if !view.trends.is_empty() {
                println!();
            }
            for (gpu, t) in &view.trends {
                println!("{}: {:+.1}% over the last {} h", gpu, t, hours);
            }
            for a in view.alerts {
                println!(
                    "alert: {} {} {:+.1}% ({:.3} -> {:.3})",
                    a.gpu_name, a.alert_type, a.change_percent, a.old_value, a.new_value
                );
            }
        }
        Commands::Docs { id } => {
            let page = DocsPage::new(session);
            match id {
                None => {
                    page.load_menu().await;
                    print_menu(&page.menu().await, 0);
                }
                Some(id) => {
                    page.open(&id).await;
                    let doc = page.rendered().await;
                    println!("{}", doc.html);
                    for d in doc.diagrams {
                        println!("<!-- {} -->\n{}", d.id, d.source);
                    }
                }
            }
        }
    }
    Ok(())
}

async fn print_machines(page: &MachinesPage) {
    show_banner(&page.banner().await);
    let (active, offline) = page.partitioned().await;
    let row = |i: Instance| {
        vec![
            i.id.to_string(),
            format!("{}x {}", i.num_gpus, i.gpu_name),
            i.effective_status().to_string(),
            i.label.clone().unwrap_or_default(),
            format!("${:.3}/h", i.dph_total),
            i.ssh_command().unwrap_or_default(),
            i.cpu_standby
                .and_then(|s| s.enabled.then_some(s.state.unwrap_or_default()))
                .unwrap_or_default(),
        ]
    };
    let headers = ["ID", "GPU", "STATUS", "LABEL", "PRICE", "SSH", "STANDBY"];
    println!("Active");
    print_table(&headers, active.into_iter().map(row).collect());
    println!("\nOffline");
    print_table(&headers, offline.into_iter().map(row).collect());
    if let Some(b) = page.balance().await {
        println!(
            "\nBalance: {:.2} {}",
            b.credit,
            b.currency.as_deref().unwrap_or("USD")
        );
    }
}

fn print_menu(items: &[DocMenuItem], depth: usize) {
    for item in items {
        println!("{}{}  ({})", "  ".repeat(depth), item.title, item.id);
        print_menu(&item.children, depth + 1);
    }
}

fn show_banner(banner: &ErrorBanner) {
    if let Some(msg) = banner.message() {
        eprintln!("! {}", msg);
    }
}

fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    if rows.is_empty() {
        println!("(none)");
        return;
    }
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };
    line(headers.to_vec());
    for row in &rows {
        line(row.iter().map(String::as_str).collect());
    }
}

fn parse_job_status(s: &str) -> Result<JobStatus> {
    JobStatus::from_name(s).with_context(|| format!("unknown job status '{}'", s))
}

fn parse_reservation_status(s: &str) -> Result<ReservationStatus> {
    [
        ReservationStatus::Pending,
        ReservationStatus::Active,
        ReservationStatus::Completed,
        ReservationStatus::Cancelled,
    ]
    .into_iter()
    .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
    .with_context(|| format!("unknown reservation status '{}'", s))
}

fn parse_nps_category(s: &str) -> Result<NpsCategory> {
    [NpsCategory::Promoter, NpsCategory::Passive, NpsCategory::Detractor]
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
        .with_context(|| format!("unknown NPS category '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_flags_reject_unknown_names() {
        assert_eq!(parse_job_status("running").unwrap(), JobStatus::Running);
        assert!(parse_job_status("bogus").is_err());
        assert_eq!(
            parse_reservation_status("Active").unwrap(),
            ReservationStatus::Active
        );
        assert!(parse_reservation_status("later").is_err());
    }
}
