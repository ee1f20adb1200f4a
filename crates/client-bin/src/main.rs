use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use nutriplan_client::{
    auth::{SubmitError, SubmitRequest},
    config::{Settings, CONFIG_FILE},
    error::ClientError,
    ClientContext,
};
use nutriplan_common::{Diet, DietPatch, Meal, NewDiet};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "nutriplan", version, about = "Diet planning client")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in.
    ///
    /// Failed attempts are only counted within one run. A cooldown that has
    /// been armed is remembered between runs.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show the current session
    Whoami,
    /// Manage diets
    #[command(subcommand)]
    Diets(DietCommand),
    /// Print live notifications
    Listen {
        /// Stop after this many notifications
        #[arg(long)]
        count: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum DietCommand {
    /// Your diets
    Mine,
    /// Public diets, six per page
    Public {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Create a diet
    Create(CreateDiet),
    /// Change the name, dates or calories of one of your diets
    Edit(EditDiet),
    /// Add a meal to one day of a diet
    AddMeal {
        #[arg(long)]
        id: String,
        #[arg(long)]
        day: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        calories: u32,
        #[arg(long)]
        kind: String,
    },
    /// Delete a diet
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Args, Debug)]
struct CreateDiet {
    #[arg(long)]
    name: String,
    /// YYYY-MM-DD
    #[arg(long)]
    start: NaiveDate,
    /// YYYY-MM-DD
    #[arg(long)]
    end: Option<NaiveDate>,
    #[arg(long)]
    calories: Option<u32>,
}

#[derive(Args, Debug)]
struct EditDiet {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    start: Option<NaiveDate>,
    /// YYYY-MM-DD
    #[arg(long)]
    end: Option<NaiveDate>,
    #[arg(long)]
    calories: Option<u32>,
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn init_tracing(settings: &Settings) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_level.clone());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_diet(diet: &Diet) {
    let calories = diet
        .total_calories
        .map_or_else(|| "-".to_string(), |c| c.to_string());
    println!(
        "{}  {}  from {}  kcal {}",
        diet.id,
        diet.name,
        diet.start_date.format("%Y-%m-%d"),
        calories
    );
    for day in diet.weekly_menu.days() {
        for meal in &day.meals {
            println!("    {:<10} {:<10} {} ({} kcal)", day.day, meal.kind, meal.name, meal.calories);
        }
    }
}

async fn submit(ctx: &ClientContext, request: SubmitRequest) -> anyhow::Result<()> {
    let controller = ctx.submit_controller(Box::new(|path: &str| debug!(path, "redirect after sign-in")));
    match controller.submit(request).await {
        Ok(session) => {
            println!("Signed in as {} <{}>", session.display_name, session.email);
            Ok(())
        },
        Err(SubmitError::Busy) => bail!("another sign-in is already running"),
        Err(e) => {
            debug!(code = ClientError::from(e.clone()).error_code(), "sign-in refused");
            bail!("{e}")
        },
    }
}

async fn diets(ctx: &ClientContext, command: DietCommand) -> anyhow::Result<()> {
    ctx.sessions.restore_from_backend().await;
    if let DietCommand::Public { page } = command {
        let page = ctx.diets.public_page(page).await?;
        for diet in &page.items {
            print_diet(diet);
        }
        println!("page {} of {} ({} diets)", page.page, page.total_pages, page.total_items);
        return Ok(());
    }

    ctx.sessions
        .require_session()
        .map_err(|e| anyhow::anyhow!(e.sanitized_message()))?;
    ctx.diets.refresh().await?;

    match command {
        DietCommand::Mine => {
            let diets = ctx.diets.diets();
            if diets.is_empty() {
                println!("No diets yet.");
            }
            diets.iter().for_each(print_diet);
        },
        DietCommand::Create(args) => {
            let diet = NewDiet {
                end_date: args.end.map(midnight),
                total_calories: args.calories,
                ..NewDiet::new(args.name, midnight(args.start))
            };
            let created = ctx.diets.create(diet).await?;
            print_diet(&created);
        },
        DietCommand::Edit(args) => {
            let patch = DietPatch {
                name: args.name,
                start_date: args.start.map(midnight),
                end_date: args.end.map(midnight),
                total_calories: args.calories,
                ..DietPatch::default()
            };
            let diet = ctx.diets.update(&args.id, &patch).await?;
            print_diet(&diet);
        },
        DietCommand::AddMeal {
            id,
            day,
            name,
            calories,
            kind,
        } => {
            let diet = ctx
                .diets
                .add_meal(&id, &day, Meal::new(name, calories, kind))
                .await?;
            print_diet(&diet);
        },
        DietCommand::Delete { id } => {
            ctx.diets.delete(&id).await?;
            println!("Deleted {id}");
        },
        DietCommand::Public { .. } => {},
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    init_tracing(&settings);

    let ctx = ClientContext::with_file_storage(settings).context("starting client")?;
    info!(
        auth = %ctx.settings.auth_provider,
        diets = %ctx.settings.diet_provider,
        "client ready"
    );

    match cli.command {
        Command::Login { email, password } => {
            submit(&ctx, SubmitRequest::login(email, password)).await?;
        },
        Command::Register {
            email,
            name,
            password,
        } => {
            submit(&ctx, SubmitRequest::register(email, name, password)).await?;
        },
        Command::Logout => {
            ctx.sessions.logout().await;
            println!("Signed out");
        },
        Command::Whoami => {
            ctx.sessions.restore_from_backend().await;
            match ctx.sessions.wait_resolved().await.session {
                Some(session) => println!("{} <{}> ({})", session.display_name, session.email, session.id),
                None => println!("Not signed in"),
            }
        },
        Command::Diets(command) => diets(&ctx, command).await?,
        Command::Listen { count } => {
            let mut listener = ctx.listen().await?;
            let mut received = 0;
            while let Some(message) = listener.next().await {
                println!("{message}");
                received += 1;
                if count.is_some_and(|n| received >= n) {
                    break;
                }
            }
        },
    }

    Ok(())
}
