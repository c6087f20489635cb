use anyhow::Result;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::{NamedTempFile, TempDir};

#[path = "../common/mod.rs"]
mod common;
use common::{write_temp_file, DATA_JSON, SCHEMA_JSON};

/// Schema and data files for one CLI run, plus a scratch working directory
/// for the shell history
struct CliFiles {
    schema: NamedTempFile,
    data: NamedTempFile,
    workdir: TempDir,
}

impl CliFiles {
    fn new() -> Result<Self> {
        Ok(CliFiles {
            schema: write_temp_file(SCHEMA_JSON)?,
            data: write_temp_file(DATA_JSON)?,
            workdir: tempfile::tempdir()?,
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_docsql"));
        command
            .current_dir(self.workdir.path())
            .arg("--schema")
            .arg(self.schema.path())
            .arg("--data")
            .arg(self.data.path())
            .args(["--database", "test"]);
        command
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Ok(self.command().args(args).output()?)
    }
}

/// Test that the CLI prints the loaded schema
#[test]
fn test_cli_info_command() -> Result<()> {
    let files = CliFiles::new()?;
    let output = files.run(&["info"])?;
    assert!(output.status.success(), "CLI info command failed");

    let output_str = String::from_utf8(output.stdout)?;
    assert!(output_str.contains("docsql Information:"), "Expected info output not found");
    assert!(output_str.contains("Database: test"), "Database not listed");
    assert!(output_str.contains("employees (id int, name varchar"), "Table columns not listed");
    assert!(output_str.contains("<- emp"), "Collection mapping not listed");
    Ok(())
}

/// Test that the CLI can execute a query and format results
#[test]
fn test_cli_query_execution() -> Result<()> {
    let files = CliFiles::new()?;
    let output = files.run(&["query", "SELECT name, salary FROM employees WHERE salary > 100 ORDER BY salary"])?;
    assert!(output.status.success(), "CLI query execution failed");

    let output_str = String::from_utf8(output.stdout)?;
    assert!(output_str.contains("name"), "Column header not found in query result");
    assert!(output_str.contains("salary"), "Column header not found in query result");
    assert!(output_str.contains("cid"), "Row not found in query result");
    assert!(output_str.contains("bob"), "Row not found in query result");
    assert!(!output_str.contains("ann"), "Filtered row present in query result");
    assert!(output_str.contains("(2 rows)"), "Row count not found in query result");
    Ok(())
}

/// Test that the CLI prints a plan with the pushed-down filter
#[test]
fn test_cli_explain() -> Result<()> {
    let files = CliFiles::new()?;
    let output = files.run(&["explain", "SELECT name FROM employees WHERE salary > 100"])?;
    assert!(output.status.success(), "CLI explain failed");

    let output_str = String::from_utf8(output.stdout)?;
    assert!(output_str.contains("Project:"), "Projection not in plan");
    assert!(output_str.contains("Scan: test.employees"), "Scan not in plan");
    assert!(output_str.contains("$gt"), "Pushed filter not in plan");
    Ok(())
}

/// Test the CLI shell functionality with input redirection
#[test]
fn test_cli_shell_interaction() -> Result<()> {
    let files = CliFiles::new()?;
    let mut input_file = NamedTempFile::new()?;
    writeln!(input_file, "SELECT count(*) AS n FROM employees;")?;
    writeln!(input_file, "use nowhere")?;
    writeln!(input_file, "SELECT name FROM employees")?;
    writeln!(input_file, "help")?;
    writeln!(input_file, "exit")?;
    input_file.flush()?;

    let output = files.command().stdin(Stdio::from(input_file.reopen()?)).output()?;
    assert!(output.status.success(), "CLI shell interaction failed");

    let output_str = String::from_utf8(output.stdout)?;
    assert!(output_str.contains("Welcome to docsql"), "Welcome message not found");
    assert!(output_str.contains("(1 row)"), "Count result not found");
    assert!(output_str.contains("Database changed to nowhere"), "USE not acknowledged");
    assert!(output_str.contains("Error:"), "Unknown table not reported");
    assert!(output_str.contains("Available commands:"), "Help message not found");
    assert!(output_str.contains("Goodbye!"), "Exit message not found");
    Ok(())
}

/// Test that the CLI handles errors gracefully
#[test]
fn test_cli_error_handling() -> Result<()> {
    let files = CliFiles::new()?;
    let output = files.run(&["query", "SELECT nope FROM employees"])?;
    assert!(!output.status.success(), "Invalid query should fail");
    let error_str = String::from_utf8(output.stderr)?;
    assert!(error_str.contains("Error executing query"), "Error context not reported");

    let output = Command::new(env!("CARGO_BIN_EXE_docsql"))
        .args(["--schema", "/nonexistent/schema.json", "info"])
        .output()?;
    assert!(!output.status.success(), "Missing schema file should fail");
    Ok(())
}
