pub(crate) mod session;
pub(crate) mod utils;

use ::infrastructures::boundaries::AggregateView;
use ::infrastructures::boundaries::SimulatedPlayer;
use ::infrastructures::boundaries::TerminalView;
use ::infrastructures::gateways::clock::SystemClock;
use ::infrastructures::gateways::http::HttpBackend;
use ::infrastructures::gateways::simulated::JsonFileFeedProvider;
use ::infrastructures::gateways::simulated::SimulatedAdNetwork;
use ::infrastructures::gateways::simulated::SimulatedBackend;
use ::infrastructures::gateways::stores::InMemoryKeyValueStore;
use ::infrastructures::gateways::stores::JsonFileKeyValueStore;
use ::use_cases::boundaries::Accept;
use ::use_cases::boundaries::InteractionOutputBoundary;
use ::use_cases::boundaries::LockStateChanged;
use ::use_cases::boundaries::PlaybackOutputBoundary;
use ::use_cases::gateways::AdNetworkClient;
use ::use_cases::gateways::AuthorizationService;
use ::use_cases::gateways::BalanceBackend;
use ::use_cases::gateways::Clock;
use ::use_cases::gateways::ContentFeedProvider;
use ::use_cases::gateways::KeyValueStore;
use ::use_cases::gateways::LikeBackend;
use ::use_cases::gateways::SourceOptimizer;
use ::use_cases::interactors::authorization::AuthorizationAttachment;
use ::use_cases::interactors::likes::LikeInteractor;
use ::use_cases::interactors::monetization::MonetizationInteractor;
use ::use_cases::interactors::playback::PlaybackInteractor;
use ::use_cases::interactors::prefetcher::Prefetcher;
use ::use_cases::interactors::resolver::SourceResolver;
use ::use_cases::services::cache::SourceCache;
use ::use_cases::services::feed::FeedWindow;
use ::use_cases::services::quality::QualityPreferenceStore;
use ::use_cases::services::quota::QuotaStore;
use ::use_cases::settings::EngineSettings;

use crate::session::Session;
use crate::session::SessionStep;
use crate::utils::aliases::Fallible;
use crate::utils::extensions::OptionExt;

#[tokio::main]
async fn main() -> Fallible<()> {
    let command = ::clap::Command::new("reelgate")
        .about("Replays a feed session against the playback and monetization engine")
        .arg(
            ::clap::Arg::new("feed")
                .short('f')
                .long("feed")
                .required(true)
                .value_parser(::clap::value_parser!(::std::path::PathBuf)),
        )
        .arg(
            ::clap::Arg::new("store")
                .short('s')
                .long("store")
                .default_value("reelgate-store.json")
                .value_parser(::clap::value_parser!(::std::path::PathBuf)),
        )
        .arg(
            ::clap::Arg::new("ephemeral")
                .long("ephemeral")
                .action(::clap::ArgAction::SetTrue)
                .conflicts_with("store"),
        )
        .arg(
            ::clap::Arg::new("settings")
                .short('c')
                .long("settings")
                .value_parser(::clap::value_parser!(::std::path::PathBuf)),
        )
        .arg(
            ::clap::Arg::new("backend")
                .short('b')
                .long("backend")
                .value_parser(::clap::value_parser!(::std::string::String)),
        )
        .arg(
            ::clap::Arg::new("token")
                .long("token")
                .requires("backend")
                .value_parser(::clap::value_parser!(::std::string::String)),
        )
        .arg(
            ::clap::Arg::new("user")
                .short('u')
                .long("user")
                .default_value("guest")
                .value_parser(::clap::value_parser!(::std::string::String)),
        )
        .arg(
            ::clap::Arg::new("script")
                .long("script")
                .value_parser(::clap::value_parser!(::std::path::PathBuf)),
        )
        .arg(
            ::clap::Arg::new("logs")
                .long("logs")
                .default_value("logs")
                .value_parser(::clap::value_parser!(::std::path::PathBuf)),
        );

    let matches = command.get_matches();

    let writer = ::tracing_appender::rolling::daily(matches.get_one::<::std::path::PathBuf>("logs").ok()?, "reelgate.log");
    let (writer, _guard) = ::tracing_appender::non_blocking(writer);

    ::tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            ::tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| ::tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(false)
        .init();

    let settings = match matches.get_one::<::std::path::PathBuf>("settings") {
        Some(path) => ::serde_json::from_slice(&::tokio::fs::read(path).await?)?,
        None => EngineSettings::default(),
    };
    ::tracing::info!(?settings, "engine settings");

    let store: ::std::sync::Arc<dyn KeyValueStore> = match matches.get_flag("ephemeral") {
        true => ::std::sync::Arc::new(InMemoryKeyValueStore::default()),
        false => ::std::sync::Arc::new(
            JsonFileKeyValueStore::builder()
                .path(matches.get_one::<::std::path::PathBuf>("store").ok()?.to_owned())
                .build(),
        ),
    };
    let clock: ::std::sync::Arc<dyn Clock> = ::std::sync::Arc::new(SystemClock);

    let (authorization_service, balance_backend, like_backend, optimizer) =
        match matches.get_one::<::std::string::String>("backend") {
            Some(base_url) => {
                let backend = ::std::sync::Arc::new(
                    HttpBackend::builder()
                        .base_url(base_url.to_owned())
                        .maybe_token(matches.get_one::<::std::string::String>("token").cloned())
                        .build(),
                );

                (
                    ::std::sync::Arc::clone(&backend) as ::std::sync::Arc<dyn AuthorizationService>,
                    ::std::sync::Arc::clone(&backend) as ::std::sync::Arc<dyn BalanceBackend>,
                    ::std::sync::Arc::clone(&backend) as ::std::sync::Arc<dyn LikeBackend>,
                    backend as ::std::sync::Arc<dyn SourceOptimizer>,
                )
            },
            None => {
                let backend = ::std::sync::Arc::new(SimulatedBackend::builder().build());

                (
                    ::std::sync::Arc::clone(&backend) as ::std::sync::Arc<dyn AuthorizationService>,
                    ::std::sync::Arc::clone(&backend) as ::std::sync::Arc<dyn BalanceBackend>,
                    ::std::sync::Arc::clone(&backend) as ::std::sync::Arc<dyn LikeBackend>,
                    backend as ::std::sync::Arc<dyn SourceOptimizer>,
                )
            },
        };
    let ads: ::std::sync::Arc<dyn AdNetworkClient> = ::std::sync::Arc::new(SimulatedAdNetwork::builder().build());

    let provider: ::std::sync::Arc<dyn ContentFeedProvider> = ::std::sync::Arc::new(
        JsonFileFeedProvider::builder()
            .path(matches.get_one::<::std::path::PathBuf>("feed").ok()?.to_owned())
            .build(),
    );

    let (reports_tx, reports_rx) = ::tokio::sync::mpsc::unbounded_channel();
    let view = ::std::sync::Arc::new(AggregateView::new(
        ::std::sync::Arc::new(TerminalView::new()),
        ::std::sync::Arc::new(SimulatedPlayer::builder().reports(reports_tx).build()),
    ));

    let feed = ::std::sync::Arc::new(FeedWindow::default());
    let cache = ::std::sync::Arc::new(SourceCache::new(settings.cache_capacity, settings.cache_ttl));
    let resolver = ::std::sync::Arc::new(SourceResolver::new(cache, optimizer, settings.resolve_timeout));
    let quality = ::std::sync::Arc::new(QualityPreferenceStore::load(::std::sync::Arc::clone(&store)).await?);

    let prefetcher = ::std::sync::Arc::new(
        Prefetcher::builder()
            .feed(::std::sync::Arc::clone(&feed))
            .resolver(::std::sync::Arc::clone(&resolver))
            .quality(::std::sync::Arc::clone(&quality))
            .ahead(settings.prefetch_ahead)
            .worker_pool(settings.prefetch_concurrency)
            .build(),
    );

    let likes = ::std::sync::Arc::new(LikeInteractor {
        output_boundary: ::std::sync::Arc::clone(&view) as ::std::sync::Arc<dyn InteractionOutputBoundary>,
        feed: ::std::sync::Arc::clone(&feed),
        backend: like_backend,
    });

    let playback = ::std::sync::Arc::new(
        PlaybackInteractor::builder()
            .output_boundary(::std::sync::Arc::clone(&view) as ::std::sync::Arc<dyn PlaybackOutputBoundary>)
            .feed(::std::sync::Arc::clone(&feed))
            .resolver(resolver)
            .prefetcher(prefetcher)
            .authorization(::std::sync::Arc::new(AuthorizationAttachment::new(authorization_service)))
            .quality(quality)
            .likes(::std::sync::Arc::clone(&likes))
            .settings(settings.clone())
            .build(),
    );

    let monetization = ::std::sync::Arc::new(
        MonetizationInteractor::builder()
            .output_boundary(::std::sync::Arc::clone(&view) as ::std::sync::Arc<dyn InteractionOutputBoundary>)
            .ads(ads)
            .backend(balance_backend)
            .quota(::std::sync::Arc::new(QuotaStore::new(store, clock)))
            .feed(::std::sync::Arc::clone(&feed))
            .playback(::std::sync::Arc::clone(&playback) as ::std::sync::Arc<dyn Accept<LockStateChanged>>)
            .user_id(matches.get_one::<::std::string::String>("user").ok()?.to_owned())
            .settings(settings)
            .build(),
    );

    ::tokio::spawn({
        let playback = ::std::sync::Arc::clone(&playback);

        async move {
            use ::tokio_stream::StreamExt as _;

            let mut reports = ::tokio_stream::wrappers::UnboundedReceiverStream::new(reports_rx);

            while let Some(report) = reports.next().await {
                if let Err(error) = ::std::sync::Arc::clone(&playback).accept(report).await {
                    ::tracing::warn!(%error, "player report not applied");
                }
            }
        }
    });

    if let Err(error) = monetization.refresh_balance().await {
        ::tracing::warn!(%error, "balance unavailable");
    }

    ::tokio::spawn({
        let monetization = ::std::sync::Arc::clone(&monetization);

        async move {
            if let Err(error) = monetization.warm_up().await {
                ::tracing::warn!(%error, "ad warm-up failed");
            }
        }
    });

    let mut session = Session::builder()
        .playback(playback)
        .monetization(monetization)
        .likes(likes)
        .feed(::std::sync::Arc::clone(&feed))
        .provider(provider)
        .build();

    session.next_page().await?;

    let steps: Vec<SessionStep> = match matches.get_one::<::std::path::PathBuf>("script") {
        Some(path) => ::serde_json::from_slice(&::tokio::fs::read(path).await?)?,
        None => session::demo(&feed.items().await),
    };

    session.play(steps).await?;

    Ok(())
}
