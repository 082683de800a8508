// coursecart-cli/src/main.rs

//! `cartctl`: drive a file-backed cart from the shell.
//!
//! Each invocation starts an engine over the data directory, runs one command
//! and prints the toasts the engine raised along the way.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use coursecart::{
  format_price, CartConfig, CartEngine, CartError, CartEvent, FileStore, ItemId, LineItem, RawItem, Severity,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{event, Level};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

const DEFAULT_DATA_DIR: &str = ".cart-data";

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and edit a course/book cart stored on disk")]
struct Cli {
  /// Directory holding the durable cart files. Overrides CART_DATA_DIR.
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Print cart output as JSON.
  #[arg(long, global = true)]
  json: bool,

  /// Log engine activity to stderr.
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Print the cart contents and totals.
  Show,
  /// Add an item to the cart.
  Add(ItemArgs),
  /// Remove an item by id.
  Remove {
    id: String,
  },
  /// Set an item's quantity. Zero removes it.
  Qty {
    id: String,
    #[arg(allow_hyphen_values = true)]
    quantity: i64,
  },
  /// Empty the cart and every known storage location.
  Clear,
  /// Replace the cart with a single item and go straight to checkout.
  Enroll(ItemArgs),
  /// Rebuild the cart from whatever storage location still holds data.
  Recover,
  /// Proceed to checkout if the cart has items.
  Checkout,
  /// Dump engine state as JSON.
  Debug,
}

#[derive(Args, Debug)]
struct ItemArgs {
  /// A full item record as JSON. Individual flags override its fields.
  #[arg(long)]
  record: Option<String>,
  #[arg(long)]
  id: Option<String>,
  #[arg(long)]
  title: Option<String>,
  /// Numeric or text price such as "1,299.50 EGP".
  #[arg(long)]
  price: Option<String>,
  /// "course" or "book".
  #[arg(long = "type")]
  kind: Option<String>,
  #[arg(long)]
  instructor: Option<String>,
  #[arg(long)]
  author: Option<String>,
  #[arg(long)]
  subject: Option<String>,
  #[arg(long)]
  board: Option<String>,
  #[arg(long)]
  image: Option<String>,
  #[arg(long)]
  quantity: Option<u32>,
}

impl ItemArgs {
  fn into_raw(self) -> Result<RawItem> {
    let mut raw = match self.record {
      Some(json) => serde_json::from_str::<RawItem>(&json).context("--record is not a JSON object")?,
      None => RawItem::new(),
    };
    if let Some(id) = self.id {
      raw = raw.with_id(parse_id(&id));
    }
    if let Some(title) = self.title {
      raw = raw.with_title(title);
    }
    if let Some(price) = self.price {
      raw = raw.with_price(price);
    }
    if let Some(kind) = self.kind {
      raw = raw.with_kind(kind);
    }
    if let Some(instructor) = self.instructor {
      raw = raw.with_instructor(instructor);
    }
    if let Some(author) = self.author {
      raw = raw.with_author(author);
    }
    if let Some(subject) = self.subject {
      raw = raw.with_subject(subject);
    }
    if let Some(board) = self.board {
      raw = raw.with_board(board);
    }
    if let Some(image) = self.image {
      raw = raw.with_image(image);
    }
    if let Some(quantity) = self.quantity {
      raw = raw.with_quantity(quantity);
    }
    Ok(raw)
  }
}

/// Integers become numeric ids; anything else stays text.
fn parse_id(raw: &str) -> ItemId {
  match raw.trim().parse::<i64>() {
    Ok(n) => ItemId::from(n),
    Err(_) => ItemId::from(raw),
  }
}

fn init_tracing(verbose: bool) {
  let fallback = if verbose { "coursecart=debug,coursecart_cli=debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
    .with_span_events(FmtSpan::CLOSE)
    .with_writer(std::io::stderr)
    .init();
}

fn print_item(index: usize, item: &LineItem, currency: &str) {
  let byline = item.byline().map(|b| format!(" - {}", b)).unwrap_or_default();
  println!(
    "{:>3}. [{}] {} ({}){}  x{}  {}",
    index + 1,
    item.kind,
    item.title,
    item.id,
    byline,
    item.quantity,
    format_price(item.line_total(), currency)
  );
}

fn show(engine: &CartEngine, json: bool) -> Result<()> {
  let snapshot = engine.snapshot();
  if json {
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    return Ok(());
  }
  if snapshot.is_empty() {
    println!("Your cart is empty.");
    return Ok(());
  }
  for (i, item) in snapshot.items.iter().enumerate() {
    print_item(i, item, snapshot.currency_label());
  }
  println!("Items: {}  Total: {}", snapshot.count, snapshot.formatted_total());
  Ok(())
}

/// Prints whatever the engine announced. Returns true if checkout was requested.
fn report_events(rx: &mut broadcast::Receiver<CartEvent>) -> bool {
  let mut navigated = false;
  while let Ok(ev) = rx.try_recv() {
    match ev {
      CartEvent::Toast(toast) => match toast.severity {
        Severity::Error | Severity::Warning => eprintln!("[{}] {}", toast.severity, toast.message),
        Severity::Success | Severity::Info => println!("[{}] {}", toast.severity, toast.message),
      },
      CartEvent::NavigateToCheckout => navigated = true,
      CartEvent::StateChanged(_) => {}
    }
  }
  navigated
}

async fn run(cli: Cli) -> Result<()> {
  let mut config = CartConfig::from_env()?;
  if let Some(dir) = cli.data_dir {
    config.data_dir = Some(dir);
  }
  let data_dir = config.data_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
  event!(Level::DEBUG, data_dir = %data_dir.display(), "Opening cart data directory");

  let store = FileStore::open(&data_dir)
    .await
    .with_context(|| format!("cannot open cart data directory {}", data_dir.display()))?;
  let engine = CartEngine::new(Arc::new(store), config);
  let mut rx = engine.subscribe();

  // Startup failures still leave a usable memory-only cart; report and carry on.
  if let Err(e) = engine.initialize().await {
    event!(Level::WARN, error = %e, "Cart startup failed");
  }

  let outcome: Result<(), CartError> = match cli.command {
    Commands::Show => {
      report_events(&mut rx);
      return show(&engine, cli.json);
    }
    Commands::Add(args) => engine.add_item(args.into_raw()?).await.map(|_| ()),
    Commands::Remove { id } => engine.remove_item(&parse_id(&id)).await,
    Commands::Qty { id, quantity } => engine.update_quantity(&parse_id(&id), quantity).await,
    Commands::Clear => engine.clear().await,
    Commands::Enroll(args) => engine.enroll_now(args.into_raw()?).await.map(|_| ()),
    Commands::Recover => engine.recover().await.map(|_| ()),
    Commands::Checkout => engine.begin_checkout().await,
    Commands::Debug => {
      report_events(&mut rx);
      let report = engine.debug_report().await;
      println!("{}", serde_json::to_string_pretty(&report)?);
      return Ok(());
    }
  };

  let navigated = report_events(&mut rx);
  match outcome {
    Ok(()) => {
      if navigated {
        println!("Proceeding to checkout.");
      }
      show(&engine, cli.json)
    }
    Err(CartError::Validation { reason }) => bail!("item rejected: {}", reason),
    Err(e) => Err(e.into()),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);
  run(cli).await
}
