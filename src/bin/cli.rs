use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use docsql::{EngineConfig, Evaluator, MemoryStore, QueryResultSet, Schema, SimpleConnection};

const HISTORY_FILE: &str = ".docsql_history";

#[derive(Parser)]
#[command(author, version, about = "docsql - run SQL queries over document collections")]
struct Cli {
    /// Schema file (JSON) mapping tables onto collections
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Data file (JSON): database -> collection -> documents
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Database used for unqualified table names
    #[arg(long)]
    database: Option<String>,

    /// Engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive shell
    Shell,

    /// Execute a SQL query directly
    Query {
        /// SQL query to execute
        query: String,
    },

    /// Print the logical plan of a query
    Explain {
        /// SQL query to plan
        query: String,
    },

    /// Show the loaded schema
    Info,
}

/// Everything a shell session needs
struct Shell {
    evaluator: Evaluator,
    connection: SimpleConnection,
}

impl Shell {
    fn load(cli: &Cli) -> Result<Self> {
        let schema = match &cli.schema {
            Some(path) => Schema::from_json_str(&read(path)?)
                .with_context(|| format!("Invalid schema file {}", path.display()))?,
            None => Schema::default(),
        };
        let store = match &cli.data {
            Some(path) => MemoryStore::from_json_str(&read(path)?)
                .with_context(|| format!("Invalid data file {}", path.display()))?,
            None => MemoryStore::new(),
        };
        let config = match &cli.config {
            Some(path) => EngineConfig::from_json_str(&read(path)?)
                .with_context(|| format!("Invalid config file {}", path.display()))?,
            None => EngineConfig::default(),
        };

        let mut connection = SimpleConnection::new(Arc::new(store));
        if let Some(database) = &cli.database {
            connection.set_database(database.clone());
        }
        Ok(Shell {
            evaluator: Evaluator::new(Arc::new(schema), config),
            connection,
        })
    }

    fn execute_query(&self, query: &str) -> Result<QueryResultSet> {
        let (_, rows) = self.evaluator.evaluate("", query, None, &self.connection)?;
        Ok(rows.collect_result_set()?)
    }

    fn explain(&self, query: &str) -> Result<String> {
        let plan = self.evaluator.explain("", query, &self.connection)?;
        Ok(plan.to_string())
    }

    fn info(&self) {
        println!("docsql Information:");
        for database in &self.evaluator.schema().databases {
            println!("  Database: {}", database.name);
            for table in &database.tables {
                let columns: Vec<String> = table
                    .columns()
                    .iter()
                    .map(|c| format!("{} {}", c.name(), c.sql_type()))
                    .collect();
                println!("    {} ({}) <- {}", table.name(), columns.join(", "), table.collection());
            }
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn run_shell(shell: &mut Shell) -> Result<()> {
    println!("Welcome to docsql. Type 'help' for assistance or 'exit' to quit.");

    let mut rl = Editor::<(), DefaultHistory>::new()?;
    if let Err(err) = rl.load_history(HISTORY_FILE) {
        if !err.to_string().contains("No such file or directory") {
            println!("Error loading history: {}", err);
        }
    }

    loop {
        match rl.readline("docsql> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                let line = line.trim().trim_end_matches(';');
                if line.is_empty() {
                    continue;
                }
                let lower = line.to_lowercase();
                match lower.as_str() {
                    "exit" | "quit" => {
                        println!("Goodbye!");
                        break;
                    }
                    "help" => print_help(),
                    "info" => shell.info(),
                    _ if lower.starts_with("use ") => {
                        let database = line[4..].trim();
                        shell.connection.set_database(database);
                        println!("Database changed to {}", database);
                    }
                    _ if lower.starts_with("explain ") => match shell.explain(&line[8..]) {
                        Ok(plan) => println!("{}", plan),
                        Err(err) => println!("Error: {:#}", err),
                    },
                    _ => match shell.execute_query(line) {
                        Ok(result) => display_result(&result),
                        Err(err) => println!("Error: {:#}", err),
                    },
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    if let Err(err) = rl.save_history(HISTORY_FILE) {
        println!("Error saving history: {}", err);
    }
    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!("  SELECT ... FROM <table>       - Query collections through the schema");
    println!("  EXPLAIN <query>               - Show the logical plan of a query");
    println!("  USE <database>                - Select the default database");
    println!();
    println!("Aggregation functions:");
    println!("  COUNT(*), COUNT(<expr>)       - Count rows or non-null values");
    println!("  SUM, AVG, MIN, MAX            - Numeric and ordered aggregates");
    println!("  GROUP_CONCAT, STD             - Concatenation and standard deviation");
    println!();
    println!("Other commands:");
    println!("  info                          - Show the loaded schema");
    println!("  help                          - Display this help message");
    println!("  exit                          - Exit the shell");
}

fn display_result(result: &QueryResultSet) {
    print!("{}", result);
    match result.row_count() {
        1 => println!("(1 row)"),
        n => println!("({} rows)", n),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut shell = Shell::load(&cli).context("Failed to initialize docsql")?;

    match &cli.command {
        Some(Commands::Query { query }) => {
            let result = shell.execute_query(query).context("Error executing query")?;
            display_result(&result);
        }
        Some(Commands::Explain { query }) => {
            println!("{}", shell.explain(query).context("Error planning query")?);
        }
        Some(Commands::Info) => shell.info(),
        Some(Commands::Shell) | None => run_shell(&mut shell)?,
    }

    Ok(())
}
