use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::application::{
    AccountStatistics, AuditLogger, ChannelObserver, LedgerConfig, LedgerService,
    NotificationService, Session, TransactionEngine,
};
use crate::domain::{Amount, Transaction, format_amount, parse_amount};
use crate::io::Exporter;
use crate::telemetry::{self, LogFormat};

/// Tellerbook - in-memory banking ledger
#[derive(Parser, Debug)]
#[command(name = "tellerbook")]
#[command(about = "An in-memory banking ledger driven by a small command shell")]
#[command(version)]
pub struct Cli {
    /// Read shell commands from this file instead of standard input
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// Create the demo users user1 (1000.00) and user2 (500.00)
    #[arg(long)]
    pub seed: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Prefix for generated account numbers
    #[arg(long, default_value = "ACC")]
    pub account_prefix: String,

    /// First generated account number
    #[arg(long, default_value_t = 1000)]
    pub first_account_number: u64,
}

/// One line typed into the shell
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Create a user and open their account
    Register {
        username: String,
        /// Password (no spaces; may start with '-')
        #[arg(allow_hyphen_values = true)]
        password: String,
        /// Opening balance (e.g., "1000" or "1000.00")
        #[arg(allow_negative_numbers = true)]
        initial: String,
    },

    /// Log in as an existing user
    Login {
        username: String,
        /// Password (no spaces; may start with '-')
        #[arg(allow_hyphen_values = true)]
        password: String,
    },

    /// Log out the current user
    Logout,

    /// Show who is logged in
    Whoami,

    /// Show the current balance
    Balance,

    /// Deposit money into the current account
    Deposit {
        #[arg(allow_negative_numbers = true)]
        amount: String,
    },

    /// Withdraw money from the current account
    Withdraw {
        #[arg(allow_negative_numbers = true)]
        amount: String,
    },

    /// Transfer money to another user
    Transfer {
        /// Recipient username
        recipient: String,
        #[arg(allow_negative_numbers = true)]
        amount: String,
    },

    /// Show the current account's transaction history
    History,

    /// Show totals for the current account
    Stats,

    /// List every account with its balance
    Accounts,

    /// Show the audit log
    Audit {
        /// Only show the last N entries
        #[arg(long)]
        last: Option<usize>,
    },

    /// Show notifications
    Notifications {
        /// Only show the last N notifications
        #[arg(long)]
        last: Option<usize>,
    },

    /// Export history (csv, json) or the whole ledger (snapshot)
    Export {
        format: ExportFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
    Snapshot,
}

/// Whether the shell should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Running totals of every record streamed out of the engine
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeedSummary {
    pub records: usize,
    pub credited: Amount,
    pub debited: Amount,
}

impl FeedSummary {
    pub fn record(&mut self, transaction: &Transaction) {
        self.records += 1;
        if transaction.kind.is_credit() {
            self.credited += transaction.magnitude();
        } else {
            self.debited += transaction.magnitude();
        }
    }

    /// Drain `receiver` until every sender is gone.
    pub async fn collect(mut receiver: mpsc::UnboundedReceiver<Transaction>) -> Self {
        let mut summary = Self::default();
        while let Some(transaction) = receiver.recv().await {
            summary.record(&transaction);
        }
        summary
    }
}

/// Command interpreter over a logged-in session, with an audit log and
/// notification feed subscribed to the engine.
pub struct Shell {
    session: Session,
    audit: Arc<AuditLogger>,
    notifications: Arc<NotificationService>,
}

impl Shell {
    pub fn new(mut service: LedgerService) -> Self {
        let audit = Arc::new(AuditLogger::new());
        let notifications = Arc::new(NotificationService::new());
        service.subscribe(audit.clone());
        service.subscribe(notifications.clone());

        Self {
            session: Session::new(service),
            audit,
            notifications,
        }
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    /// Parse and run one line. Blank lines and `#` comments do nothing.
    pub fn execute_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Flow::Continue);
        }

        match ShellLine::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => self.run_command(parsed.command, out),
            Err(err) if err.kind() == clap::error::ErrorKind::DisplayHelp => {
                write!(out, "{}", err.render())?;
                Ok(Flow::Continue)
            }
            Err(err) => Err(anyhow!("{}", err.render().to_string().trim_end())),
        }
    }

    pub fn run_command<W: Write>(&mut self, command: ShellCommand, out: &mut W) -> Result<Flow> {
        match command {
            ShellCommand::Register {
                username,
                password,
                initial,
            } => {
                let initial = parse_amount(&initial).context("Invalid initial balance")?;
                let number = self.session.register(&username, &password, initial)?;
                writeln!(out, "Account created: {} ({})", number, username)?;
            }

            ShellCommand::Login { username, password } => {
                self.session.login(&username, &password)?;
                writeln!(out, "Logged in as {}", username)?;
            }

            ShellCommand::Logout => {
                self.session.logout();
                writeln!(out, "Logged out")?;
            }

            ShellCommand::Whoami => match self.session.current_username() {
                Some(username) => {
                    let account = self.session.current_account()?;
                    writeln!(out, "{} ({})", username, account.number())?;
                }
                None => writeln!(out, "Not logged in")?,
            },

            ShellCommand::Balance => {
                let account = self.session.current_account()?;
                writeln!(
                    out,
                    "{}: {}",
                    account.number(),
                    format_amount(account.balance())
                )?;
            }

            ShellCommand::Deposit { amount } => {
                let amount = parse_amount(&amount).context("Invalid amount")?;
                let record = self.session.deposit(amount)?;
                writeln!(
                    out,
                    "Deposited {}. New balance: {}",
                    format_amount(record.amount),
                    format_amount(record.balance_after)
                )?;
            }

            ShellCommand::Withdraw { amount } => {
                let amount = parse_amount(&amount).context("Invalid amount")?;
                let record = self.session.withdraw(amount)?;
                writeln!(
                    out,
                    "Withdrew {}. New balance: {}",
                    format_amount(record.magnitude()),
                    format_amount(record.balance_after)
                )?;
            }

            ShellCommand::Transfer { recipient, amount } => {
                let amount = parse_amount(&amount).context("Invalid amount")?;
                let record = self.session.transfer_to_user(&recipient, amount)?;
                writeln!(
                    out,
                    "Transferred {} to {}. New balance: {}",
                    format_amount(record.magnitude()),
                    recipient,
                    format_amount(record.balance_after)
                )?;
            }

            ShellCommand::History => {
                let history = self.session.history()?;
                write_history(out, history)?;
            }

            ShellCommand::Stats => {
                let stats = self.session.statistics()?;
                write_statistics(out, &stats)?;
            }

            ShellCommand::Accounts => {
                let accounts = self.session.service().accounts();
                if accounts.is_empty() {
                    writeln!(out, "No accounts found.")?;
                } else {
                    writeln!(out, "{:<12} {:<20} {:>12}", "ACCOUNT", "OWNER", "BALANCE")?;
                    writeln!(out, "{}", "-".repeat(46))?;
                    for account in accounts {
                        writeln!(
                            out,
                            "{:<12} {:<20} {:>12}",
                            account.number(),
                            truncate(account.owner(), 20),
                            format_amount(account.balance())
                        )?;
                    }
                }
            }

            ShellCommand::Audit { last } => {
                let entries = match last {
                    Some(n) => self.audit.recent(n),
                    None => self.audit.entries(),
                };
                write_lines(out, &entries, "Audit log is empty.")?;
            }

            ShellCommand::Notifications { last } => {
                let entries = match last {
                    Some(n) => self.notifications.recent(n),
                    None => self.notifications.notifications(),
                };
                write_lines(out, &entries, "No notifications.")?;
            }

            ShellCommand::Export { format, output } => {
                self.run_export(format, output, out)?;
            }

            ShellCommand::Quit => {
                writeln!(out, "Goodbye!")?;
                return Ok(Flow::Quit);
            }
        }

        Ok(Flow::Continue)
    }

    fn run_export<W: Write>(
        &self,
        format: ExportFormat,
        output: Option<PathBuf>,
        out: &mut W,
    ) -> Result<()> {
        let exporter = Exporter::new(self.session.service());

        // Render fully before touching the output file.
        let mut buffer = Vec::new();
        let count = match format {
            ExportFormat::Snapshot => exporter.export_snapshot_json(&mut buffer)?,
            ExportFormat::Csv => {
                let number = self.session.current_account()?.number();
                exporter.export_history_csv(number, &mut buffer)?
            }
            ExportFormat::Json => {
                let number = self.session.current_account()?.number();
                exporter.export_history_json(number, &mut buffer)?
            }
        };

        match &output {
            Some(path) => std::fs::write(path, &buffer)
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => out.write_all(&buffer)?,
        }

        if let Some(path) = output {
            let what = if format == ExportFormat::Snapshot {
                "accounts"
            } else {
                "transactions"
            };
            writeln!(out, "Exported {} {} to {}", count, what, path.display())?;
        } else if format == ExportFormat::Json || format == ExportFormat::Snapshot {
            writeln!(out)?;
        }
        Ok(())
    }
}

fn write_history<W: Write>(out: &mut W, history: &[Transaction]) -> Result<()> {
    if history.is_empty() {
        writeln!(out, "No transactions.")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<20} {:<13} {:>10} {:>12} {:>12} DESCRIPTION",
        "DATE", "TYPE", "AMOUNT", "BEFORE", "AFTER"
    )?;
    writeln!(out, "{}", "-".repeat(82))?;
    for record in history {
        writeln!(
            out,
            "{:<20} {:<13} {:>10} {:>12} {:>12} {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.kind.as_str(),
            format_amount(record.amount),
            format_amount(record.balance_before),
            format_amount(record.balance_after),
            truncate(record.description.as_deref().unwrap_or(""), 30)
        )?;
    }
    Ok(())
}

fn write_statistics<W: Write>(out: &mut W, stats: &AccountStatistics) -> Result<()> {
    writeln!(out, "Transactions:    {}", stats.transaction_count)?;
    writeln!(out, "Total deposits:  {}", format_amount(stats.total_deposits))?;
    writeln!(out, "Total withdrawn: {}", format_amount(stats.total_withdrawals))?;
    writeln!(out, "Transfers out:   {}", format_amount(stats.total_transfers_out))?;
    writeln!(out, "Transfers in:    {}", format_amount(stats.total_transfers_in))?;
    Ok(())
}

fn write_lines<W: Write>(out: &mut W, lines: &[String], empty: &str) -> Result<()> {
    if lines.is_empty() {
        writeln!(out, "{}", empty)?;
    }
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Register the two demo users.
pub fn seed_demo_users(service: &mut LedgerService) -> Result<()> {
    service
        .create_user("user1", "password1", 1000.0)
        .context("Failed to seed user1")?;
    service
        .create_user("user2", "password2", 500.0)
        .context("Failed to seed user2")?;
    Ok(())
}

/// Run one line against the shell, reporting errors without stopping.
fn step<W: Write>(shell: &mut Shell, line: &str, out: &mut W) -> Flow {
    match shell.execute_line(line, out) {
        Ok(flow) => flow,
        Err(err) => {
            let _ = writeln!(out, "Error: {:#}", err);
            Flow::Continue
        }
    }
}

impl Cli {
    pub fn config(&self) -> LedgerConfig {
        LedgerConfig {
            account_prefix: self.account_prefix.clone(),
            first_account_number: self.first_account_number,
        }
    }

    pub async fn run(self) -> Result<()> {
        let default_filter = if self.verbose { "debug" } else { "warn" };
        telemetry::init(self.log_format, default_filter);

        let mut service = LedgerService::with_config(TransactionEngine::new(), self.config());
        if self.seed {
            seed_demo_users(&mut service)?;
        }

        let (feed, receiver) = ChannelObserver::channel();
        service.subscribe(Arc::new(feed));
        let summary = tokio::spawn(FeedSummary::collect(receiver));

        let mut shell = Shell::new(service);

        match &self.script {
            Some(path) => {
                let script = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read script {}", path.display()))?;
                let mut stdout = std::io::stdout();
                for line in script.lines() {
                    if step(&mut shell, line, &mut stdout) == Flow::Quit {
                        break;
                    }
                }
            }
            None => {
                let interactive = std::io::stdin().is_terminal();
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                let mut stdout = std::io::stdout();
                loop {
                    if interactive {
                        write!(stdout, "> ")?;
                        stdout.flush()?;
                    }
                    let Some(line) = lines.next_line().await? else {
                        break;
                    };
                    if step(&mut shell, &line, &mut stdout) == Flow::Quit {
                        break;
                    }
                }
            }
        }

        // Dropping the shell drops the engine and with it the feed's sender.
        drop(shell);
        let summary = summary.await.context("Transaction feed task failed")?;
        println!(
            "Session summary: {} records, {} credited, {} debited",
            summary.records,
            format_amount(summary.credited),
            format_amount(summary.debited)
        );
        Ok(())
    }
}
