use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use snafu::{OptionExt, ResultExt, Snafu};
use tokio::sync::mpsc;

use zova_message_cell::measure::min_single_line_height;
use zova_message_cell::{
    CellConfig, CellDelegate, ChannelDelegate, ConfigError, ContentView,
    DelegateMessage, Direction, DownloadStatus, EditModeBroadcast, GestureEvent, HeightCache,
    MenuAction, MessageCell, MessageId, MessageModel, PixelSize, Point, Rect, ThumbnailReady,
    ThumbnailRef, TransferIndicator,
};

const ROW_WIDTH: f32 = 375.;

#[derive(Debug, Clone)]
struct RunnerArgs {
    scenario: Scenario,
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum Scenario {
    OneLineText,
    ImageDownloading,
    EditMidScroll,
    DelegateGone,
    StaleThumbnail,
    HeightCache,
    All,
}

impl Scenario {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "one_line_text" => Some(Self::OneLineText),
            "image_downloading" => Some(Self::ImageDownloading),
            "edit_mid_scroll" => Some(Self::EditMidScroll),
            "delegate_gone" => Some(Self::DelegateGone),
            "stale_thumbnail" => Some(Self::StaleThumbnail),
            "height_cache" => Some(Self::HeightCache),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::OneLineText => "one_line_text",
            Self::ImageDownloading => "image_downloading",
            Self::EditMidScroll => "edit_mid_scroll",
            Self::DelegateGone => "delegate_gone",
            Self::StaleThumbnail => "stale_thumbnail",
            Self::HeightCache => "height_cache",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Snafu)]
enum RunnerError {
    #[snafu(display("missing required --scenario argument"))]
    MissingScenario { stage: &'static str },
    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown scenario '{raw}'"))]
    UnknownScenario { stage: &'static str, raw: String },
    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },
    #[snafu(display("cell config could not be loaded: {source}"))]
    LoadConfig {
        stage: &'static str,
        source: ConfigError,
    },
    #[snafu(display("scenario '{scenario}' failed: {reason}"))]
    ScenarioFailed {
        stage: &'static str,
        scenario: &'static str,
        reason: String,
    },
}

type RunnerResult<T> = Result<T, RunnerError>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(error) = run().await {
        println!("runner_ok=false");
        eprintln!("runner_error={error}");
        std::process::exit(1);
    }
}

async fn run() -> RunnerResult<()> {
    let args = parse_args(env::args().skip(1))?;
    println!("scenario={}", args.scenario.name());

    let config = match args.config_path.as_deref() {
        Some(path) => {
            println!("config_path={}", path.display());
            CellConfig::from_file(path).context(LoadConfigSnafu {
                stage: "load-config",
            })?
        }
        None => CellConfig::default(),
    };
    let config = Arc::new(config);

    match args.scenario {
        Scenario::OneLineText => run_one_line_text(&config),
        Scenario::ImageDownloading => run_image_downloading(&config),
        Scenario::EditMidScroll => run_edit_mid_scroll(&config),
        Scenario::DelegateGone => run_delegate_gone(&config),
        Scenario::StaleThumbnail => run_stale_thumbnail(&config).await,
        Scenario::HeightCache => run_height_cache(&config),
        Scenario::All => run_all(&config).await,
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> RunnerResult<RunnerArgs> {
    let mut scenario = None;
    let mut config_path = None;
    let mut pending = args.into_iter();

    while let Some(argument) = pending.next() {
        match argument.as_str() {
            "--scenario" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-scenario-value",
                    arg: "--scenario",
                })?;

                let parsed = Scenario::parse(&value).context(UnknownScenarioSnafu {
                    stage: "parse-args-scenario",
                    raw: value,
                })?;
                scenario = Some(parsed);
            }
            "--config" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-config-value",
                    arg: "--config",
                })?;
                config_path = Some(PathBuf::from(value));
            }
            _ => {
                return UnknownArgumentSnafu {
                    stage: "parse-args",
                    raw: argument,
                }
                .fail();
            }
        }
    }

    Ok(RunnerArgs {
        scenario: scenario.context(MissingScenarioSnafu {
            stage: "parse-args-scenario-required",
        })?,
        config_path,
    })
}

struct Fixture {
    cell: MessageCell,
    edit_mode: EditModeBroadcast,
    delegate: Rc<dyn CellDelegate>,
    receiver: mpsc::UnboundedReceiver<DelegateMessage>,
}

impl Fixture {
    fn new(config: &Arc<CellConfig>, menu_on_long_press: bool) -> Self {
        let edit_mode = EditModeBroadcast::new();
        let mut cell = MessageCell::new(Arc::clone(config), edit_mode.clone());
        let (delegate, receiver) = ChannelDelegate::new(menu_on_long_press);
        let delegate: Rc<dyn CellDelegate> = Rc::new(delegate);
        cell.set_delegate(Rc::downgrade(&delegate));
        Self {
            cell,
            edit_mode,
            delegate,
            receiver,
        }
    }

    fn drain(&mut self) -> Vec<DelegateMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push(message);
        }
        messages
    }
}

fn center(rect: Rect) -> Point {
    Point::new(
        rect.min_x() + rect.size.width / 2.,
        rect.min_y() + rect.size.height / 2.,
    )
}

fn check(scenario: &'static str, condition: bool, reason: &str) -> RunnerResult<()> {
    if condition {
        return Ok(());
    }
    ScenarioFailedSnafu {
        stage: "check-scenario",
        scenario,
        reason: reason.to_string(),
    }
    .fail()
}

fn run_one_line_text(config: &Arc<CellConfig>) -> RunnerResult<()> {
    let scenario = "one_line_text";
    let mut fixture = Fixture::new(config, false);
    let model = MessageModel::text(MessageId::new(1), Direction::FromMe, "hello");
    let height = MessageCell::height_for_model(&model, ROW_WIDTH, &config.metrics);

    fixture.cell.bind(Arc::new(model));
    fixture.cell.will_display_cell();
    let geometry = fixture.cell.layout(ROW_WIDTH);

    println!("height={height}");
    println!("avatar_max_x={}", geometry.avatar.max_x());
    println!("bubble_max_x={}", geometry.bubble.max_x());
    check(
        scenario,
        height == min_single_line_height(&config.metrics),
        "one-line text should use the minimum height",
    )?;
    check(
        scenario,
        geometry.bubble.max_x() == geometry.avatar.min_x() - config.metrics.content_avatar_margin,
        "bubble should sit directly left of the avatar",
    )?;

    println!("runner_ok=true");
    Ok(())
}

fn run_image_downloading(config: &Arc<CellConfig>) -> RunnerResult<()> {
    let scenario = "image_downloading";
    let mut fixture = Fixture::new(config, true);
    let model = MessageModel::image(MessageId::new(2), Direction::ToMe, PixelSize::new(640, 480))
        .with_download(DownloadStatus::Downloading);

    fixture.cell.bind(Arc::new(model));
    fixture.cell.will_display_cell();
    let geometry = fixture.cell.layout(ROW_WIDTH);
    let indicator = fixture.cell.visual_state().status_indicator();
    println!("status_indicator={indicator:?}");
    check(
        scenario,
        indicator == TransferIndicator::Spinner,
        "download in progress should show a spinner",
    )?;

    let start = Instant::now();
    fixture.cell.touch_began(center(geometry.content), start);
    fixture
        .cell
        .poll_long_press(start + config.long_press_threshold());
    fixture
        .cell
        .touch_ended(start + config.long_press_threshold() * 2);

    let actions = fixture
        .cell
        .presented_menu()
        .map(|menu| menu.spec.actions())
        .unwrap_or_default();
    println!(
        "menu={}",
        actions
            .iter()
            .map(|action| action.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );
    check(scenario, !actions.is_empty(), "long press should open the menu")?;
    check(
        scenario,
        !actions.contains(&MenuAction::SaveToAlbum),
        "save-to-album requires a finished download",
    )?;

    println!("runner_ok=true");
    Ok(())
}

fn run_edit_mid_scroll(config: &Arc<CellConfig>) -> RunnerResult<()> {
    let scenario = "edit_mid_scroll";
    let mut fixture = Fixture::new(config, false);
    fixture.cell.bind(Arc::new(MessageModel::text(
        MessageId::new(3),
        Direction::ToMe,
        "mid scroll",
    )));
    let idle = fixture.cell.layout(ROW_WIDTH);

    fixture.cell.touch_began(center(idle.content), Instant::now());
    fixture.cell.will_begin_scrolling();
    fixture.edit_mode.set_editing(true);
    fixture.cell.set_cell_editing_animated(true);
    let editing = fixture.cell.layout(ROW_WIDTH);
    fixture.cell.did_end_scrolling();

    let cancellations = fixture
        .drain()
        .into_iter()
        .filter(|message| {
            matches!(
                message,
                DelegateMessage::Content(event)
                    if matches!(event.event, GestureEvent::Cancelled(_))
            )
        })
        .count();
    let shift = editing.bubble.min_x() - idle.bubble.min_x();
    println!("cancellations={cancellations}");
    println!("bubble_shift={shift}");
    check(scenario, cancellations == 1, "gesture should be cancelled exactly once")?;
    check(
        scenario,
        shift == config.metrics.edit_control_size && editing.selection.is_some(),
        "edit mode should insert the selection slot",
    )?;

    println!("runner_ok=true");
    Ok(())
}

fn run_delegate_gone(config: &Arc<CellConfig>) -> RunnerResult<()> {
    let Fixture {
        mut cell, delegate, ..
    } = Fixture::new(config, true);
    cell.bind(Arc::new(MessageModel::text(
        MessageId::new(4),
        Direction::ToMe,
        "nobody listening",
    )));
    let geometry = cell.layout(ROW_WIDTH);
    drop(delegate);

    let start = Instant::now();
    cell.touch_began(center(geometry.content), start);
    let events = cell.touch_ended(start + Duration::from_millis(40));
    println!("tap_events={}", events.len());
    check(
        "delegate_gone",
        events == vec![GestureEvent::Tapped(ContentView::Bubble)],
        "tap should still resolve without a delegate",
    )?;

    println!("runner_ok=true");
    Ok(())
}

async fn run_stale_thumbnail(config: &Arc<CellConfig>) -> RunnerResult<()> {
    let scenario = "stale_thumbnail";
    let mut fixture = Fixture::new(config, false);
    let (pipeline, mut completions) = mpsc::unbounded_channel::<ThumbnailReady>();

    fixture.cell.bind(Arc::new(MessageModel::image(
        MessageId::new(5),
        Direction::ToMe,
        PixelSize::new(300, 300),
    )));
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let _ = pipeline.send(ThumbnailReady {
            message_id: MessageId::new(5),
            thumbnail: ThumbnailRef::new("thumb-5"),
        });
    });
    fixture.cell.bind(Arc::new(MessageModel::image(
        MessageId::new(6),
        Direction::ToMe,
        PixelSize::new(300, 300),
    )));

    let ready = completions.recv().await.context(ScenarioFailedSnafu {
        stage: "await-thumbnail",
        scenario,
        reason: "pipeline closed before completing".to_string(),
    })?;
    let applied = fixture.cell.update_thumbnail(ready);
    println!("stale_applied={applied}");
    check(
        scenario,
        !applied && fixture.cell.visual_state().thumbnail.is_none(),
        "thumbnail for the previous binding must be dropped",
    )?;

    println!("runner_ok=true");
    Ok(())
}

fn run_height_cache(config: &Arc<CellConfig>) -> RunnerResult<()> {
    let mut cache = HeightCache::new();
    let models = (0..20)
        .map(|raw| {
            MessageModel::text(
                MessageId::new(raw),
                Direction::from_flag(raw % 2 == 0),
                "lorem ipsum ".repeat(raw as usize + 1),
            )
        })
        .collect::<Vec<_>>();

    for _ in 0..2 {
        for model in &models {
            cache.height(model, ROW_WIDTH, &config.metrics);
        }
    }
    let active = models
        .iter()
        .take(5)
        .map(|model| model.id)
        .collect::<HashSet<_>>();
    cache.retain_ids(&active);

    let (hits, misses) = cache.stats();
    println!("cache_hits={hits}");
    println!("cache_misses={misses}");
    println!("cache_len={}", cache.len());
    check(
        "height_cache",
        hits == 20 && misses == 20 && cache.len() == 5,
        "second pass should be served from the cache",
    )?;

    println!("runner_ok=true");
    Ok(())
}

async fn run_all(config: &Arc<CellConfig>) -> RunnerResult<()> {
    run_one_line_text(config)?;
    run_image_downloading(config)?;
    run_edit_mid_scroll(config)?;
    run_delegate_gone(config)?;
    run_stale_thumbnail(config).await?;
    run_height_cache(config)?;

    println!("all_passed=true");
    Ok(())
}
