mod common;

use anyhow::Result;
use clap::Parser;
use common::DemoUsers;
use tellerbook::cli::{Cli, Flow, Shell};
use tellerbook::domain::Transaction;
use tempfile::TempDir;

fn run_lines(shell: &mut Shell, lines: &[&str]) -> Result<String> {
    let mut out = Vec::new();
    for line in lines {
        shell.execute_line(line, &mut out)?;
    }
    Ok(String::from_utf8(out)?)
}

#[test]
fn test_shell_transfer_updates_both_users() -> Result<()> {
    let demo = DemoUsers::create()?;
    let mut shell = Shell::new(demo.service);

    run_lines(
        &mut shell,
        &["login user1 password1", "transfer user2 250.50", "logout"],
    )?;
    let output = run_lines(&mut shell, &["login user2 password2", "balance"])?;

    assert!(output.ends_with("ACC-1001: 750.50\n"));
    assert_eq!(shell.audit().len(), 2);
    assert_eq!(
        shell.notifications().recent(1),
        vec!["Incoming transfer of 250.50 to account ACC-1001".to_string()]
    );

    Ok(())
}

#[test]
fn test_shell_quit() -> Result<()> {
    let demo = DemoUsers::create()?;
    let mut shell = Shell::new(demo.service);
    let mut out = Vec::new();

    assert_eq!(shell.execute_line("quit", &mut out)?, Flow::Quit);
    assert_eq!(shell.execute_line("# quit", &mut out)?, Flow::Continue);

    Ok(())
}

#[test]
fn test_shell_export_to_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("history.json");
    let demo = DemoUsers::create()?;
    let mut shell = Shell::new(demo.service);

    let output = run_lines(
        &mut shell,
        &[
            "login user1 password1",
            "deposit 40",
            "withdraw 15",
            &format!("export json --output {}", path.display()),
        ],
    )?;

    assert!(output.contains("Exported 2 transactions to"));
    let records: Vec<Transaction> = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].balance_after, 1025.0);

    Ok(())
}

#[test]
fn test_failed_export_keeps_existing_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("history.csv");
    std::fs::write(&path, "previous export\n")?;
    let demo = DemoUsers::create()?;
    let mut shell = Shell::new(demo.service);

    let mut out = Vec::new();
    let err = shell
        .execute_line(&format!("export csv --output {}", path.display()), &mut out)
        .unwrap_err();

    assert_eq!(err.to_string(), "Not logged in");
    assert_eq!(std::fs::read_to_string(&path)?, "previous export\n");
    assert!(out.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_cli_runs_script() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let script = temp_dir.path().join("session.txt");
    let export = temp_dir.path().join("ledger.json");
    std::fs::write(
        &script,
        format!(
            "# demo session\n\
             login user1 password1\n\
             deposit 500\n\
             withdraw 1500\n\
             transfer user2 300\n\
             export snapshot --output {}\n\
             quit\n\
             deposit 1\n",
            export.display()
        ),
    )?;

    let cli = Cli::try_parse_from([
        "tellerbook",
        "--seed",
        "--script",
        script.to_str().unwrap(),
    ])?;
    cli.run().await?;

    let snapshot: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&export)?)?;
    let accounts = snapshot["accounts"].as_array().unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0]["balance"], 1200.0);
    assert_eq!(accounts[1]["balance"], 800.0);

    Ok(())
}

#[tokio::test]
async fn test_cli_missing_script_fails() {
    let cli = Cli::try_parse_from(["tellerbook", "--script", "/nonexistent/script.txt"]).unwrap();
    let err = cli.run().await.unwrap_err();
    assert!(err.to_string().contains("Failed to read script"));
}

#[test]
fn test_cli_options() {
    let cli = Cli::try_parse_from([
        "tellerbook",
        "--account-prefix",
        "BNK",
        "--first-account-number",
        "1",
        "--log-format",
        "json",
    ])
    .unwrap();

    let config = cli.config();
    assert_eq!(config.account_prefix, "BNK");
    assert_eq!(config.first_account_number, 1);
    assert!(cli.script.is_none());
    assert!(!cli.seed);
}
