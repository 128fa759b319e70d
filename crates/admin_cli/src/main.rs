use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{Credits, Engine};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "packdesk_admin")]
#[command(about = "Admin utilities for PackDesk (bootstrap users, packs and settings)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./packdesk.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Pack(Pack),
    Threshold(Threshold),
    Language(Language),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
    /// Add credits to a user's balance.
    Topup(UserTopupArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    display_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Args, Debug)]
struct UserTopupArgs {
    #[arg(long)]
    user_id: i64,
    /// Decimal amount, e.g. `12.50`.
    #[arg(long, value_parser = parse_credits)]
    amount: Credits,
}

#[derive(Args, Debug)]
struct Pack {
    #[command(subcommand)]
    command: PackCommand,
}

#[derive(Subcommand, Debug)]
enum PackCommand {
    Publish(PackPublishArgs),
}

#[derive(Args, Debug)]
struct PackPublishArgs {
    #[arg(long)]
    author_id: i64,
    #[arg(long)]
    name: String,
    /// `free`, `per_use` or `subscription`.
    #[arg(long, default_value = "free")]
    pricing_mode: String,
    /// Whole credits.
    #[arg(long, default_value_t = 0)]
    price: i64,
}

#[derive(Args, Debug)]
struct Threshold {
    #[command(subcommand)]
    command: ThresholdCommand,
}

#[derive(Subcommand, Debug)]
enum ThresholdCommand {
    Get,
    Set { value: String },
}

#[derive(Args, Debug)]
struct Language {
    #[command(subcommand)]
    command: LanguageCommand,
}

#[derive(Subcommand, Debug)]
enum LanguageCommand {
    Get,
    Set { tag: String },
}

fn parse_credits(raw: &str) -> Result<Credits, String> {
    raw.parse::<Credits>().map_err(|err| err.to_string())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let display_name = args.display_name.unwrap_or_else(|| args.username.clone());
            let user = engine
                .create_user(&args.username, &display_name, args.email.as_deref())
                .await?;
            println!("created user: {} ({})", user.username, user.id);
        }
        Command::User(User {
            command: UserCommand::Topup(args),
        }) => {
            let balance = engine.purchase_credits(args.user_id, args.amount).await?;
            println!("user {} balance: {balance}", args.user_id);
        }
        Command::Pack(Pack {
            command: PackCommand::Publish(args),
        }) => {
            let pack = engine
                .publish_pack(args.author_id, &args.name, &args.pricing_mode, args.price)
                .await?;
            println!(
                "published pack: {} ({}, {} at {})",
                pack.name,
                pack.id,
                pack.pricing_mode.as_str(),
                pack.download_price()
            );
        }
        Command::Threshold(Threshold {
            command: ThresholdCommand::Get,
        }) => {
            println!("{}", engine.support_threshold().await);
        }
        Command::Threshold(Threshold {
            command: ThresholdCommand::Set { value },
        }) => {
            let threshold = engine
                .set_support_threshold_value(&serde_json::Value::String(value))
                .await?;
            println!("support threshold: {threshold}");
        }
        Command::Language(Language {
            command: LanguageCommand::Get,
        }) => match engine.default_language().await {
            Some(tag) => println!("{tag}"),
            None => println!("(not set)"),
        },
        Command::Language(Language {
            command: LanguageCommand::Set { tag },
        }) => {
            let tag = engine.set_default_language(&tag).await?;
            println!("default language: {tag}");
        }
    }

    Ok(())
}
