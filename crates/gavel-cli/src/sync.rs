use std::{path::PathBuf, sync::Arc};

use gavel_broker::{AmqpTransport, BrokerConnector};
use gavel_config::{config::Config, repository::RepositoryDescriptor};
use gavel_core::{
    ChecksumDeduplicator, DieselStore, GavelError, RepositoryProvider, Result, SyncOptions,
    SyncOrchestrator,
};
use gavel_events::{ChannelSink, EventSinkHandle, NullSink, SyncSummary};
use gavel_index::{resolve_index_path, SnapshotCursor};
use tracing::{debug, info};

use crate::{
    cli::SyncArgs,
    progress::{spawn_event_handler, summary_json, ProgressGuard},
};

fn lookup_repository(config: &Config, name: &str) -> Result<RepositoryDescriptor> {
    config
        .find_by_name(name)
        .ok_or_else(|| GavelError::FatalSetup(format!("repository `{name}` is not configured")))
}

/// Applies command line overrides on top of the configured sync options.
fn sync_options(config: &Config, args: &SyncArgs) -> Result<SyncOptions> {
    let mut options = SyncOptions::from_config(&config.sync)?;
    if args.skip_known {
        options.skip_known = true;
    }
    if args.no_deadline {
        options.deadline = None;
    }
    Ok(options)
}

/// The snapshot file or directory to walk: `--index` when given, else the
/// repository's index directory.
fn snapshot_location(config: &Config, repo_name: &str, index: Option<&str>) -> PathBuf {
    match index {
        Some(path) => PathBuf::from(path),
        None => config.get_index_path(repo_name),
    }
}

pub async fn sync_repository(config: &Config, args: SyncArgs, json: bool) -> Result<SyncSummary> {
    let repository = lookup_repository(config, &args.repo)?;

    let mut broker = config.broker.resolve()?;
    if let Some(strategy) = args.strategy {
        broker.strategy = strategy;
    }
    let options = sync_options(config, &args)?;

    let db_path = config.get_db_path();
    debug!("using database {}", db_path.display());
    let store = Arc::new(DieselStore::open(&db_path)?);
    let dedup = ChecksumDeduplicator::new(store.clone(), store);

    let connector = BrokerConnector::from_settings(&broker, Arc::new(AmqpTransport));
    info!(
        "syncing {} via {:?} broker at {}:{}",
        repository.name, broker.strategy, broker.host, broker.port
    );

    let (events, guard): (EventSinkHandle, Option<ProgressGuard>) = if json {
        let events: EventSinkHandle = Arc::new(NullSink);
        (events, None)
    } else {
        let (sink, receiver) = ChannelSink::new();
        let events: EventSinkHandle = Arc::new(sink);
        (events, Some(spawn_event_handler(receiver)))
    };

    let location = snapshot_location(config, &repository.name, args.index.as_deref());
    let repo_name = repository.name.clone();

    let mut orchestrator =
        SyncOrchestrator::new(repository, connector.clone(), &broker, dedup, options)
            .with_events(events);
    let result = orchestrator
        .run(move || {
            let path = resolve_index_path(&location)?;
            debug!("opening index snapshot {}", path.display());
            SnapshotCursor::open(path)
        })
        .await;

    connector.shutdown().await;

    // the sink lives in the orchestrator; dropping it closes the channel
    drop(orchestrator);
    if let Some(guard) = guard {
        guard.finish();
    }

    let summary = result?;
    if json {
        println!("{}", summary_json(&repo_name, &summary));
    }
    Ok(summary)
}
