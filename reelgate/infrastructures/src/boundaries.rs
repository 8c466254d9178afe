use ::async_trait::async_trait;
use ::derive_new::new;
use ::domain::ItemId;
use ::use_cases::boundaries::PlayerReport;
use ::use_cases::boundaries::Update;
use ::use_cases::models::events::AdLifecycle;
use ::use_cases::models::events::InteractionEvent;
use ::use_cases::models::events::PlaybackFailure;
use ::use_cases::models::events::PlayerCommand;
use ::use_cases::models::events::PlayerEvent;

use crate::utils::aliases::Fallible;

/// Renders player commands and interaction events as timestamped terminal lines.
#[derive(new)]
pub struct TerminalView {
    #[new(value = "::tokio::time::Instant::now()")]
    started: ::tokio::time::Instant,
}

impl TerminalView {
    fn print(&self, item_id: Option<&ItemId>, line: impl ::std::fmt::Display) {
        use ::colored::Colorize as _;

        let elapsed = format!("[{:>7.2}s]", self.started.elapsed().as_secs_f64()).dimmed();

        match item_id {
            Some(item_id) => {
                let item_id: &str = item_id;
                println!("{} {:<10} {}", elapsed, item_id.cyan().bold(), line)
            },
            None => println!("{} {:<10} {}", elapsed, "wallet".magenta().bold(), line),
        }
    }
}

#[async_trait]
impl Update<PlayerCommand> for TerminalView {
    async fn update(self: ::std::sync::Arc<Self>, command: &PlayerCommand) -> Fallible<()> {
        use ::colored::Colorize as _;

        ::tracing::debug!(?command, "player command");

        let line = match command {
            PlayerCommand::Attach { request, .. } => {
                let authenticated = match request.headers.is_empty() {
                    true => "",
                    false => " (authorized)",
                };

                format!("attach {} from {}ms{}", request.uri, request.start_position_ms, authenticated).blue()
            },
            PlayerCommand::Play { .. } => "play".green().bold(),
            PlayerCommand::Pause { .. } => "pause".yellow(),
            PlayerCommand::Seek { position_ms, .. } => format!("seek to {}ms", position_ms).normal(),
            PlayerCommand::Release { .. } => "release decoder".dimmed(),
            PlayerCommand::ShowThumbnail { thumbnail, .. } => format!("show thumbnail {}", thumbnail).red(),
            PlayerCommand::SetControlsVisible { visible: true, .. } => "controls shown".dimmed(),
            PlayerCommand::SetControlsVisible { visible: false, .. } => "controls hidden".dimmed(),
            PlayerCommand::SetGateVisible { visible: true, .. } => "locked".red().bold(),
            PlayerCommand::SetGateVisible { visible: false, .. } => "unlocked".green(),
        };

        self.print(Some(command.item_id()), line);

        Ok(())
    }
}

#[async_trait]
impl Update<InteractionEvent> for TerminalView {
    async fn update(self: ::std::sync::Arc<Self>, event: &InteractionEvent) -> Fallible<()> {
        use ::colored::Colorize as _;

        ::tracing::debug!(?event, "interaction event");

        match event {
            InteractionEvent::AdStateChanged { kind, state } => {
                let state = match state {
                    AdLifecycle::NotLoaded => "not loaded".red(),
                    AdLifecycle::Loading => "loading".dimmed(),
                    AdLifecycle::Loaded => "ready".green(),
                    AdLifecycle::Showing => "showing".yellow().bold(),
                    AdLifecycle::Closed => "closed".normal(),
                };

                self.print(None, format!("{} ad {}", kind, state));
            },
            InteractionEvent::AdLoading { kind } => {
                self.print(None, format!("{} ad is loading, try again shortly", kind).yellow());
            },
            InteractionEvent::QuotaExhausted { kind } => {
                self.print(None, format!("{} ads maxed out for today", kind).yellow().bold());
            },
            InteractionEvent::BalanceChanged { balance } => {
                self.print(None, format!("balance {} coins", balance).yellow());
            },
            InteractionEvent::LockChanged { item_id, locked } => {
                let line = match locked {
                    true => "relocked".red(),
                    false => "unlocked".green().bold(),
                };

                self.print(Some(item_id), line);
            },
            InteractionEvent::LikeChanged { item_id, liked, like_count } => {
                let heart = match liked {
                    true => "liked".red().bold(),
                    false => "not liked".normal(),
                };

                self.print(Some(item_id), format!("{} ({} likes)", heart, like_count));
            },
            InteractionEvent::CheckedIn { date } => {
                self.print(None, format!("checked in for {}", date).green());
            },
            InteractionEvent::Alert { message } => {
                self.print(None, format!("alert: {}", message).red().bold());
            },
        }

        Ok(())
    }
}

/// Stand-in for the platform video surfaces.
///
/// Attached sources load after `startup_delay` and then advance by `tick` while playing,
/// reporting back through `reports`. Sources whose location contains `broken` fail to load.
#[derive(::bon::Builder)]
pub struct SimulatedPlayer {
    reports: ::tokio::sync::mpsc::UnboundedSender<PlayerReport>,

    #[builder(default = ::std::time::Duration::from_millis(400))]
    startup_delay: ::std::time::Duration,

    #[builder(default = ::std::time::Duration::from_secs(15))]
    clip_duration: ::std::time::Duration,

    #[builder(default = ::std::time::Duration::from_millis(500))]
    tick: ::std::time::Duration,

    #[builder(skip)]
    surfaces: ::std::sync::Mutex<::std::collections::HashMap<ItemId, Surface>>,
}

#[derive(Default)]
struct Surface {
    position_ms: u64,
    loading: Option<::tokio::task::JoinHandle<()>>,
    ticking: Option<::tokio::task::JoinHandle<()>>,
}

impl Surface {
    fn stop(&mut self) {
        self.loading.take().into_iter().chain(self.ticking.take()).for_each(|task| task.abort());
    }
}

impl SimulatedPlayer {
    fn surfaces(&self) -> ::std::sync::MutexGuard<'_, ::std::collections::HashMap<ItemId, Surface>> {
        self.surfaces.lock().unwrap_or_else(::std::sync::PoisonError::into_inner)
    }

    fn report(&self, item_id: &ItemId, event: PlayerEvent) {
        if self.reports.send(PlayerReport::new(item_id.clone(), event)).is_err() {
            ::tracing::debug!(%item_id, "player report dropped after shutdown");
        }
    }

    fn tick_with(&self, item_id: &ItemId, task: Option<::tokio::task::JoinHandle<()>>) {
        let mut surfaces = self.surfaces();
        let surface = surfaces.entry(item_id.clone()).or_default();

        if let Some(previous) = ::std::mem::replace(&mut surface.ticking, task) {
            previous.abort();
        }
    }

    /// Moves the playhead forward, or `None` once the surface is released.
    fn advance(&self, item_id: &ItemId, by_ms: u64) -> Option<u64> {
        let mut surfaces = self.surfaces();
        let surface = surfaces.get_mut(item_id)?;

        surface.position_ms = surface.position_ms.saturating_add(by_ms);
        Some(surface.position_ms)
    }

    fn attach(this: &::std::sync::Arc<Self>, item_id: &ItemId, uri: &str, start_position_ms: u64) {
        let broken = uri.contains("broken");
        let task = ::tokio::spawn({
            let this = ::std::sync::Arc::clone(this);
            let item_id = item_id.clone();

            async move {
                ::tokio::time::sleep(this.startup_delay).await;

                let event = match broken {
                    true => PlayerEvent::Failed(PlaybackFailure::Network),
                    false => PlayerEvent::MetadataLoaded { duration_ms: this.clip_duration.as_millis() as u64 },
                };

                this.report(&item_id, event);
            }
        });

        let mut surfaces = this.surfaces();
        let surface = surfaces.entry(item_id.clone()).or_default();
        surface.stop();
        surface.position_ms = start_position_ms;
        surface.loading = Some(task);
    }

    fn play(this: &::std::sync::Arc<Self>, item_id: &ItemId) {
        let task = ::tokio::spawn({
            let this = ::std::sync::Arc::clone(this);
            let item_id = item_id.clone();

            async move {
                let tick_ms = this.tick.as_millis() as u64;
                let duration_ms = this.clip_duration.as_millis() as u64;

                loop {
                    ::tokio::time::sleep(this.tick).await;

                    let Some(position_ms) = this.advance(&item_id, tick_ms) else {
                        break;
                    };

                    if position_ms >= duration_ms {
                        this.report(&item_id, PlayerEvent::Progress { position_ms: duration_ms });
                        this.report(&item_id, PlayerEvent::Ended);
                        break;
                    }

                    this.report(&item_id, PlayerEvent::Progress { position_ms });
                }
            }
        });

        this.tick_with(item_id, Some(task));
    }
}

#[async_trait]
impl Update<PlayerCommand> for SimulatedPlayer {
    async fn update(self: ::std::sync::Arc<Self>, command: &PlayerCommand) -> Fallible<()> {
        match command {
            PlayerCommand::Attach { item_id, request } => {
                Self::attach(&self, item_id, &request.uri, request.start_position_ms)
            },
            PlayerCommand::Play { item_id } => Self::play(&self, item_id),
            PlayerCommand::Pause { item_id } => self.tick_with(item_id, None),
            PlayerCommand::Seek { item_id, position_ms } => {
                if let Some(surface) = self.surfaces().get_mut(item_id) {
                    surface.position_ms = *position_ms;
                }
            },
            PlayerCommand::Release { item_id } => {
                if let Some(mut surface) = self.surfaces().remove(item_id) {
                    surface.stop();
                }
            },
            PlayerCommand::ShowThumbnail { .. }
            | PlayerCommand::SetControlsVisible { .. }
            | PlayerCommand::SetGateVisible { .. } => {},
        }

        Ok(())
    }
}

/// Fans player commands out to the terminal and the simulated surfaces.
#[derive(new)]
pub struct AggregateView {
    terminal: ::std::sync::Arc<TerminalView>,
    player: ::std::sync::Arc<SimulatedPlayer>,
}

#[async_trait]
impl Update<PlayerCommand> for AggregateView {
    async fn update(self: ::std::sync::Arc<Self>, command: &PlayerCommand) -> Fallible<()> {
        ::std::sync::Arc::clone(&self.terminal).update(command).await?;
        ::std::sync::Arc::clone(&self.player).update(command).await
    }
}

#[async_trait]
impl Update<InteractionEvent> for AggregateView {
    async fn update(self: ::std::sync::Arc<Self>, event: &InteractionEvent) -> Fallible<()> {
        ::std::sync::Arc::clone(&self.terminal).update(event).await
    }
}
