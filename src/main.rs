extern crate clap;
extern crate log;
extern crate log4rs;
extern crate serde_json;
extern crate serde_yaml;

use std::fs::File;
use std::io::Read;
use std::process::exit;

use clap::{value_t, App, ArgMatches};
use serde::{Deserialize, Serialize};

use reading_ledger::contract::{CONTRACT_NAME, CONTRACT_TITLE};
use reading_ledger::database::{self, DatabaseParameters, PostgresStore};
use reading_ledger::{ContractError, LedgerStore, ReadingContract, StoreError, TransactionContext};

static DEFAULT_CONFIGURATION_PATH: &'static str = "resources/reading-ledger.yml";
static DEFAULT_LOG_CONFIGURATION_PATH: &'static str = "resources/log.yml";

#[derive(Serialize, Deserialize, Debug, Clone)]
struct Configuration {
    database_connection_parameters: DatabaseParameters,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// A single contract operation requested on the command line.
enum Invocation {
    Init,
    Exists { timestamp: i64 },
    Add { temperature: f32, relative_humidity: f32, timestamp: i64 },
    Get { timestamp: i64 },
    GetAll,
}

fn load_configuration(path: &str) -> Result<Configuration, String> {
    let mut configuration_file = File::open(path)
        .map_err(|err| format!("Cannot open the configuration file '{}': '{}'", path, err))?;

    let mut configuration_string = String::new();
    configuration_file
        .read_to_string(&mut configuration_string)
        .map_err(|err| format!("Cannot read the configuration from file: '{}'", err))?;

    serde_yaml::from_str::<Configuration>(configuration_string.as_str())
        .map_err(|err| format!("Cannot deserialize the configuration: '{}'", err))
}

fn parse_invocation(matches: &ArgMatches) -> Result<Invocation, clap::Error> {
    let invocation = match matches.subcommand() {
        ("init", _) => Invocation::Init,
        ("exists", Some(args)) => Invocation::Exists {
            timestamp: value_t!(args, "timestamp", i64)?,
        },
        ("add", Some(args)) => Invocation::Add {
            temperature: value_t!(args, "temperature", f32)?,
            relative_humidity: value_t!(args, "relative_humidity", f32)?,
            timestamp: value_t!(args, "timestamp", i64)?,
        },
        ("get", Some(args)) => Invocation::Get {
            timestamp: value_t!(args, "timestamp", i64)?,
        },
        ("get-all", _) => Invocation::GetAll,
        (name, _) => {
            return Err(clap::Error::with_description(
                &format!("Unknown subcommand '{}'", name),
                clap::ErrorKind::UnrecognizedSubcommand,
            ))
        }
    };
    Ok(invocation)
}

/// Runs one contract operation and renders its result as JSON.
fn execute<S: LedgerStore>(
    contract: &ReadingContract,
    ctx: &mut TransactionContext<S>,
    invocation: Invocation,
) -> Result<String, ContractError> {
    match invocation {
        Invocation::Exists { timestamp } => render(&contract.reading_exists(ctx, timestamp)?),
        Invocation::Add { temperature, relative_humidity, timestamp } => {
            render(&contract.add_reading(ctx, temperature, relative_humidity, timestamp)?)
        }
        Invocation::Get { timestamp } => render(&contract.get_reading(ctx, timestamp)?),
        Invocation::GetAll => render(&contract.get_all_readings(ctx)?),
        Invocation::Init => Ok(String::new()),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, ContractError> {
    serde_json::to_string(value).map_err(|err| {
        ContractError::Store(StoreError::Backend(format!("Cannot render result: '{}'", err)))
    })
}

fn main() {
    let cli_yaml = clap::load_yaml!("cli.yml");
    let matches = App::from(cli_yaml).get_matches();

    let log_configuration_path = matches
        .value_of("log-config")
        .unwrap_or(DEFAULT_LOG_CONFIGURATION_PATH);
    match log4rs::init_file(log_configuration_path, Default::default()) {
        Ok(_) => {}
        Err(err) => {
            eprintln!("Could not create logger from yaml configuration: {}", err);
            exit(-100);
        }
    };

    let invocation = match parse_invocation(&matches) {
        Ok(invocation) => invocation,
        Err(err) => err.exit(),
    };

    let configuration_path = matches.value_of("config").unwrap_or(DEFAULT_CONFIGURATION_PATH);
    let configuration = match load_configuration(configuration_path) {
        Ok(configuration) => configuration,
        Err(err) => {
            log::error!(target: "reading_ledger", "{}", err);
            exit(101);
        }
    };

    let mut database_client = match database::connect(&configuration.database_connection_parameters) {
        Ok(client) => client,
        Err(err) => {
            log::error!(target: "reading_ledger", "{}", err);
            exit(201);
        }
    };

    if invocation == Invocation::Init {
        match database::create_ledger(&mut database_client) {
            Ok(_) => exit(0),
            Err(err) => {
                log::error!(target: "reading_ledger", "Could not create the ledger table: '{}'", err);
                exit(202);
            }
        }
    }

    let store = match PostgresStore::begin(&mut database_client) {
        Ok(store) => store,
        Err(err) => {
            log::error!(target: "reading_ledger", "Could not start transaction: '{}'", err);
            exit(203);
        }
    };

    log::debug!(target: "reading_ledger", "Invoking {:?} on contract '{}' ({})", invocation, CONTRACT_NAME, CONTRACT_TITLE);
    let contract = ReadingContract::new();
    let mut ctx = TransactionContext::new(store);

    match execute(&contract, &mut ctx, invocation) {
        Ok(output) => {
            if let Err(err) = ctx.into_store().commit() {
                log::error!(target: "reading_ledger", "Could not commit transaction: '{}'", err);
                eprintln!("StoreError: {}", err);
                exit(301);
            }
            println!("{}", output);
        }
        Err(err) => {
            // Dropping the context rolls the transaction back.
            drop(ctx);
            eprintln!("{}: {}", err.code(), err);
            exit(1);
        }
    }

    exit(0);
}
