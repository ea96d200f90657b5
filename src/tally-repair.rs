//! An offline tool that recounts surveys from their stored responses and
//! repairs counters left short by failed increments.
//! It goes through the same tally engine as the server, so it agrees with
//! the results the API reports.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{error, info};
use mongodb::Client as MongoClient;
use thiserror::Error;

use survey_backend::{
    model::mongodb::{ensure_indexes_exist, Id},
    store::{mongo::MongoStore, Store},
    tally::{Reconciliation, TallyEngine},
};

const PROGRAM_NAME: &str = "tally-repair";

const ABOUT_TEXT: &str = "Recount survey counters from the response log.

Without --apply, only reports drift. With --apply, increments each drifted
counter by its difference. Counts are exact only while the survey is not
receiving submissions.

EXIT CODES:
     0: Every survey is consistent (or was repaired).
   255: Ran successfully, but drift was found and not repaired.
 Other: Error.";

const SURVEY_IDS: &str = "SURVEY_IDS";
const DB_URI: &str = "db-uri";
const DB_NAME: &str = "db-name";
const BATCH_SIZE: &str = "batch-size";
const APPLY: &str = "apply";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(SURVEY_IDS)
                .help("IDs of the surveys to recount")
                .action(ArgAction::Append)
                .value_parser(value_parser!(Id))
                .required(true),
        )
        .arg(
            Arg::new(DB_URI)
                .long(DB_URI)
                .help("MongoDB connection string")
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(DB_NAME)
                .long(DB_NAME)
                .help("Database holding the surveys")
                .action(ArgAction::Set)
                .default_value("surveys"),
        )
        .arg(
            Arg::new(BATCH_SIZE)
                .long(BATCH_SIZE)
                .help("Responses read per query")
                .action(ArgAction::Set)
                .value_parser(value_parser!(u32).range(1..))
                .default_value("500"),
        )
        .arg(
            Arg::new(APPLY)
                .long(APPLY)
                .help("Write the repairs instead of only reporting drift")
                .action(ArgAction::SetTrue),
        )
}

/// Errors that stop the tool before any survey is checked.
#[derive(Debug, Error)]
enum Error {
    #[error("Failed to connect to database: {0}")]
    Connect(#[from] mongodb::error::Error),
}

/// Recount every survey in `ids`, carrying on past failures.
async fn repair_all(
    store: &dyn Store,
    ids: &[Id],
    batch_size: u32,
    apply: bool,
) -> Vec<(Id, survey_backend::error::Result<Reconciliation>)> {
    let engine = TallyEngine::new(store);
    let mut outcomes = Vec::with_capacity(ids.len());
    for &id in ids {
        let outcome = engine.reconcile(id, batch_size, apply).await;
        if let Err(err) = &outcome {
            error!("Could not reconcile survey {id}: {err}");
        }
        outcomes.push((id, outcome));
    }
    outcomes
}

/// Print each outcome and pick the exit code.
fn report(outcomes: &[(Id, survey_backend::error::Result<Reconciliation>)]) -> u8 {
    let mut exit_code = 0;
    for (id, outcome) in outcomes {
        match outcome {
            Ok(reconciliation) => {
                println!("{reconciliation}");
                if !reconciliation.is_consistent() && !reconciliation.applied && exit_code == 0 {
                    exit_code = 255;
                }
            }
            Err(err) => {
                println!("survey {id}\n  failed: {err}");
                exit_code = 1;
            }
        }
    }
    exit_code
}

async fn run(args: &ArgMatches) -> Result<u8, Error> {
    // Required and defaulted arguments are guaranteed to be present.
    let ids: Vec<Id> = args.get_many(SURVEY_IDS).unwrap().copied().collect();
    let uri: &String = args.get_one(DB_URI).unwrap();
    let db_name: &String = args.get_one(DB_NAME).unwrap();
    let batch_size: u32 = *args.get_one(BATCH_SIZE).unwrap();
    let apply = args.get_flag(APPLY);

    let client = MongoClient::with_uri_str(uri).await?;
    let db = client.database(db_name);
    ensure_indexes_exist(&db).await?;
    info!("Connected to {db_name}, checking {} surveys", ids.len());

    let store = MongoStore::new(&db);
    let outcomes = repair_all(&store, &ids, batch_size, apply).await;
    Ok(report(&outcomes))
}

#[rocket::main]
async fn main() {
    if let Err(err) =
        log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
    {
        eprintln!("Logging disabled: {err}");
    }

    let args = cli().get_matches();
    let exit_code = match run(&args).await {
        Ok(code) => code,
        Err(err) => {
            println!("{err}");
            1
        }
    };
    std::process::exit(exit_code.into())
}
