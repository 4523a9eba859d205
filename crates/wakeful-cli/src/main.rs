use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use wakeful_core::app::{CoordinatorBuilder, FiredEvent};
use wakeful_core::domain::{
    BackendHandle, BackendKind, FireOutcome, JobHandle, PlatformCapabilities, RawTaskConfig,
    TaskId,
};
use wakeful_core::execution::CompletionHandler;
use wakeful_core::impls::{
    InMemoryConfigStore, JsonFileConfigStore, RecordingAlarmScheduler, RecordingJobScheduler,
    StaticLifecycle,
};
use wakeful_core::ports::{Clock, ConfigStore, FixedClock};

/// Simulate background wake-ups against in-memory backends.
#[derive(Parser)]
#[command(name = "wakeful", version, about = "Background fetch coordinator simulator")]
struct Args {
    /// Fetch interval in minutes (raised to the platform minimum)
    #[arg(long, default_value = "15")]
    interval_minutes: u32,

    /// Number of wake-ups to deliver
    #[arg(long, default_value = "3")]
    fires: u32,

    /// Pretend the host application is in the foreground
    #[arg(long)]
    foreground: bool,

    /// Name of the headless handler to configure
    #[arg(long)]
    headless: Option<String>,

    /// Relaunch the host on background wake-ups
    #[arg(long)]
    force_reload: bool,

    /// Stop all schedules when a wake-up arrives while the host is terminated
    #[arg(long)]
    stop_on_terminate: Option<bool>,

    /// Keep the schedule across reboots
    #[arg(long)]
    start_on_boot: bool,

    /// Simulate a platform without the job scheduler
    #[arg(long)]
    legacy: bool,

    /// Persist task configuration to this JSON file
    #[arg(long)]
    store: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let capabilities = if args.legacy {
        PlatformCapabilities::legacy()
    } else {
        PlatformCapabilities::modern()
    };

    // シミュレーション用の時計: 発火ごとに interval 分進める
    let clock = Arc::new(FixedClock::new(chrono::Utc::now()));
    let jobs = Arc::new(RecordingJobScheduler::new());
    let alarms = Arc::new(RecordingAlarmScheduler::new());
    let store: Arc<dyn ConfigStore> = match &args.store {
        Some(path) => Arc::new(JsonFileConfigStore::new(path)),
        None => Arc::new(InMemoryConfigStore::new()),
    };

    let mut builder = CoordinatorBuilder::new()
        .capabilities(capabilities)
        .clock(clock.clone())
        .job_scheduler(jobs.clone())
        .alarm_scheduler(alarms.clone())
        .lifecycle(Arc::new(StaticLifecycle::new(args.foreground)))
        .config_store(store);
    if let Some(name) = &args.headless {
        let handler_name = name.clone();
        builder = builder
            .register_headless_fn(name.clone(), move |task_id: TaskId| {
                let handler_name = handler_name.clone();
                async move {
                    println!("headless handler '{handler_name}' ran for {task_id}");
                    Ok(())
                }
            })?
            .expect_handlers(&[name.as_str()]);
    }
    let coordinator = Arc::new(builder.build()?);

    let mut raw = RawTaskConfig::new()
        .with_interval_minutes(args.interval_minutes)
        .with_force_reload(args.force_reload)
        .with_start_on_boot(args.start_on_boot);
    if let Some(stop) = args.stop_on_terminate {
        raw = raw.with_stop_on_terminate(stop);
    }
    if let Some(name) = &args.headless {
        raw = raw.with_headless_handler(name.clone());
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<TaskId>();
    let validated = coordinator
        .configure(raw, move |task_id: &TaskId| {
            let _ = tx.send(task_id.clone());
        })
        .await
        .context("configure failed")?;
    for warning in &validated.warnings {
        println!("corrected: {warning}");
    }
    let config = validated.config;
    println!("configured {config}");

    let scheduled_at = clock.now();
    let backend = coordinator
        .snapshot()
        .configured
        .iter()
        .find(|task| task.task_id == *config.task_id())
        .and_then(|task| task.backend);
    tracing::info!(?backend, fires = args.fires, foreground = args.foreground, "simulating wake-ups");

    for round in 1..=args.fires {
        clock.advance(config.minimum_interval());

        let outcome = coordinator
            .on_fired(fired_event(&jobs, config.task_id(), scheduled_at, backend, round))
            .await?;
        print_outcome(round, &outcome)?;

        // 一部の backend は同じ発火を二重に配送する
        if round == 1 {
            let duplicate = coordinator
                .on_fired(fired_event(&jobs, config.task_id(), scheduled_at, backend, round))
                .await?;
            print_outcome(round, &duplicate)?;
        }

        match outcome {
            FireOutcome::Dispatched { .. } => {
                if let Some(task_id) = rx.recv().await {
                    println!("live callback fetching for {task_id}");
                    coordinator.finish(&task_id);
                }
            }
            FireOutcome::Stopped { .. } => break,
            _ => {}
        }
    }

    println!("job requests: {}, alarms set: {}", jobs.requests().len(), alarms.requests().len());
    println!("{}", serde_json::to_string_pretty(&coordinator.snapshot())?);
    Ok(())
}

/// Build the firing the backend would deliver.
///
/// The job scheduler hands back the payload it was registered with; the alarm
/// only carries its token.
fn fired_event(
    jobs: &RecordingJobScheduler,
    task_id: &TaskId,
    scheduled_at: chrono::DateTime<chrono::Utc>,
    backend: Option<BackendKind>,
    round: u32,
) -> FiredEvent {
    let completion = CompletionHandler::new(move || println!("round {round}: completion signalled"));
    let requests = jobs.requests();
    match (backend, requests.last()) {
        (Some(BackendKind::JobScheduler), Some(request)) => {
            // 記録用 scheduler の handle は 1 から順に払い出される
            let handle = BackendHandle::Job {
                job: JobHandle(requests.len() as u64),
            };
            FiredEvent::from_payload(request.payload.clone(), handle, completion)
        }
        _ => {
            let handle = BackendHandle::Alarm {
                token: task_id.to_string(),
            };
            FiredEvent::new(task_id.clone(), scheduled_at, handle, completion)
        }
    }
}

fn print_outcome(round: u32, outcome: &FireOutcome) -> anyhow::Result<()> {
    println!("round {round}: {}", serde_json::to_string(outcome)?);
    Ok(())
}
