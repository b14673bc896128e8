#![deny(clippy::unwrap_used)]

use clap::Parser;
use driftward_backend_types::ProfileRecord;
use driftward_session::config::{Config, ConfigError};
use driftward_session::store::{memory::MemoryStore, postgres::PgStore, ProfileStore, SectorStore};
use driftward_session::sync::SessionInfo;
use driftward_session::{Session, SessionError};
use driftward_shared::item::{ItemId, SlotId};
use driftward_shared::object::ObjectId;
use driftward_shared::WorldState;
use env_logger::Env;
use log::{debug, info, warn};
use sqlx::{migrate::MigrateError, postgres::PgConnectOptions, PgPool};
use std::{io, path::PathBuf, str::FromStr, sync::Arc, time::Instant};
use thiserror::Error;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio::{runtime::Builder, select, sync::broadcast::error::RecvError};

#[derive(Parser)]
#[command(version)]
struct ClArgs {
	/// Postgres Connection Url, see: https://docs.rs/sqlx/latest/sqlx/postgres/struct.PgConnectOptions.html
	/// Without one the session runs against an in-memory store that is lost on exit
	#[arg(long)]
	postgres: Option<PgConnectOptions>,

	/// Path to a HOCON session config file
	#[arg(long)]
	config: Option<PathBuf>,

	/// Profile id to play as
	#[arg(long, default_value = "pilot")]
	player: String,

	/// Seed for every random roll, overrides the config file
	#[arg(long)]
	seed: Option<u64>,
}

fn main() -> Result<(), DriverError> {
	let start_time = Instant::now();

	let cl_args = ClArgs::parse();

	env_logger::init_from_env(Env::default().default_filter_or(if cfg!(debug_assertions) { "debug" } else { "info" }));

	info!("Driftward (Session) v{}", env!("CARGO_PKG_VERSION"));

	let mut config = match &cl_args.config {
		Some(path) => Config::load(path)?,
		None => Config::default(),
	};
	if cl_args.seed.is_some() {
		config.seed = cl_args.seed;
	}

	let runtime = Builder::new_current_thread().enable_all().build()?;
	runtime.block_on(async {
		let (profiles, sectors) = connect(&cl_args, &config).await?;

		let session = Session::new(
			SessionInfo {
				player: cl_args.player.as_str().into(),
				authenticated: true,
			},
			config,
			profiles,
			sectors,
		);
		let mut notifications = session.notifications();
		session.start().await?;

		info!("Ready! {:.0?}", Instant::now() - start_time);

		let mut lines = BufReader::new(stdin()).lines();
		loop {
			select! {
				line = lines.next_line() => {
					let Some(line) = line? else {
						break;
					};

					match execute(&session, &line).await {
						Ok(Flow::Continue) => {}
						Ok(Flow::Quit) => break,
						// rejections have already been published as notifications
						Err(CommandError::Session(error)) => debug!("{error}"),
						Err(error) => println!("{error}"),
					}
				},

				notification = notifications.recv() => match notification {
					Ok(notification) => println!("{notification}"),
					Err(RecvError::Lagged(skipped)) => warn!("missed {skipped} notifications"),
					Err(RecvError::Closed) => break,
				},
			}
		}

		session.save().await?;
		Ok::<_, DriverError>(())
	})
}

async fn connect(
	cl_args: &ClArgs,
	config: &Config,
) -> Result<(Arc<dyn ProfileStore>, Arc<dyn SectorStore>), DriverError> {
	match &cl_args.postgres {
		Some(options) => {
			let database = PgPool::connect_with(options.clone().application_name("driftward-session")).await?;
			sqlx::migrate!("../migrations").run(&database).await?;

			let store = Arc::new(PgStore::new(database));
			let (profiles, sectors): (Arc<dyn ProfileStore>, Arc<dyn SectorStore>) = (store.clone(), store);
			Ok((profiles, sectors))
		}
		None => {
			info!("No database given, progress will not outlive this session");

			let store = Arc::new(MemoryStore::new());
			store.seed_home();
			store.insert_profile(ProfileRecord::capture(
				&cl_args.player,
				WorldState::new(&config.ship).persistent(),
			));

			let (profiles, sectors): (Arc<dyn ProfileStore>, Arc<dyn SectorStore>) = (store.clone(), store);
			Ok((profiles, sectors))
		}
	}
}

enum Flow {
	Continue,
	Quit,
}

const HELP: &str = "\
status | map | close | plot <x:y> | warp | arrive
dock | undock | catalog | buy <name> | sell <resource> <quantity> | sell-item <item>
equip <item> <slot> | unequip <slot> | repair | refuel
engage <object> | attack | flee | mine <object> | stop | open <object> | loot
save | quit";

async fn execute(session: &Arc<Session>, line: &str) -> Result<Flow, CommandError> {
	let words: Vec<_> = line.split_whitespace().collect();
	let Some((command, arguments)) = words.split_first() else {
		return Ok(Flow::Continue);
	};

	match (*command, arguments) {
		("quit" | "exit", []) => return Ok(Flow::Quit),
		("help", _) => println!("{HELP}"),
		("status", []) => println!("{}", serde_json::to_string_pretty(&*session.state())?),

		("map", []) => session.open_map()?,
		("close", []) => session.close_map()?,
		("plot", [destination]) => {
			let course = session.plot_course(parse(destination, "plot <x:y>")?)?;
			println!("{course:?}");
		}
		("warp", []) => println!("warping, {} fuel spent", session.start_warp()?),
		("arrive", []) => println!("arrived at {}", session.complete_warp().await?),

		("dock", []) => session.dock()?,
		("undock", []) => session.undock()?,
		("catalog", []) => {
			for entry in &session.config().market.catalog {
				println!("{:>6}  {}", entry.price, entry.name);
			}
		}
		("buy", [_, ..]) => println!("bought item {}", session.buy(&arguments.join(" "))?),
		("sell", [resource, quantity]) => {
			let usage = "sell <resource> <quantity>";
			let earned = session.sell(parse(resource, usage)?, parse(quantity, usage)?)?;
			println!("earned {earned} credits");
		}
		("sell-item", [item]) => {
			let item = ItemId::from_raw(parse(item, "sell-item <item>")?);
			println!("earned {} credits", session.sell_item(item)?);
		}
		("equip", [item, slot]) => {
			let usage = "equip <item> <slot>";
			session.equip(ItemId::from_raw(parse(item, usage)?), parse::<SlotId>(slot, usage)?)?;
		}
		("unequip", [slot]) => session.unequip(parse(slot, "unequip <slot>")?)?,
		("repair", []) => println!("repaired {} hull", session.repair()?),
		("refuel", []) => println!("bought {} fuel", session.refuel()?),

		("engage", [object]) => session.engage(object_id(object, "engage <object>")?)?,
		("attack", []) => println!("{:?}", session.attack().await?),
		("flee", []) => println!("{:?}", session.flee().await?),
		("mine", [object]) => {
			let lasers = session.start_mining(object_id(object, "mine <object>")?)?;
			println!("mining with {lasers} lasers");
		}
		("stop", []) => session.stop_mining()?,
		("open", [object]) => session.open_container(object_id(object, "open <object>")?)?,
		("loot", []) => {
			let taken = session.take_loot()?;
			println!("took {} credits and {} items", taken.credits, taken.items.len());
		}

		("save", []) => println!("{:?}", session.save().await?),
		_ => return Err(CommandError::Usage(HELP)),
	}

	Ok(Flow::Continue)
}

fn parse<T: FromStr>(word: &str, usage: &'static str) -> Result<T, CommandError> {
	word.parse().map_err(|_| CommandError::Usage(usage))
}

fn object_id(word: &str, usage: &'static str) -> Result<ObjectId, CommandError> {
	parse(word.trim_start_matches('#'), usage).map(ObjectId::new)
}

#[derive(Debug, Error)]
enum CommandError {
	#[error("usage: {0}")]
	Usage(&'static str),

	#[error(transparent)]
	Session(#[from] SessionError),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
#[error(transparent)]
pub enum DriverError {
	Config(#[from] ConfigError),
	Io(#[from] io::Error),
	Migrate(#[from] MigrateError),
	Session(#[from] SessionError),
	Sqlx(#[from] sqlx::Error),
}
