//! Command-line surface.
//!
//! Each subcommand maps onto one screen of the original system: dashboard,
//! the three record pages, the activity feed, analytics, settings, export,
//! and the wipe. Short id prefixes are accepted anywhere a record id is
//! expected.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::{Args, Parser, Subcommand};

use crate::auth::{AuthHandle, AuthService, HttpAuth, StaticAuth};
use crate::config::{Config, OutputConfig};
use crate::crm::types::{
    ActivityKind, ClientStatus, Currency, DealStage, EntityKind, EntityRef, LeadStatus,
};
use crate::crm::{LogOutcome, Session};
use crate::error::StoreError;
use crate::export::{ExportDocument, default_file_name};
use crate::form::{
    ClientDraft, ClientForm, DealDraft, DealForm, LeadDraft, LeadForm, validate_settings,
};
use crate::report::{DashboardSummary, Report};
use crate::store::RecordStore;
use crate::store::http::HttpStore;
use crate::store::memory::MemoryStore;
use crate::term::{self, NoticeLevel};
use crate::view::{ClientFilter, DealFilter, LeadFilter, TimeWindow, group_by_stage};

#[derive(Debug, Parser)]
#[command(
    name = "pipeboard",
    version,
    about = "Terminal CRM: leads, clients, and a deal pipeline over a hosted record store"
)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/pipeboard/config.toml).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run against the in-memory demo backend instead of the hosted store.
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Totals and the most recent activity.
    Dashboard,
    /// Manage leads.
    Leads {
        #[command(subcommand)]
        command: LeadsCommand,
    },
    /// Manage clients.
    Clients {
        #[command(subcommand)]
        command: ClientsCommand,
    },
    /// Manage deals and the pipeline board.
    Deals {
        #[command(subcommand)]
        command: DealsCommand,
    },
    /// Browse or record activity history.
    Activities {
        #[command(subcommand)]
        command: ActivitiesCommand,
    },
    /// Analytics over a trailing window.
    Report {
        /// Window in days: 7, 30, 90 or 365.
        #[arg(long, default_value_t = 30)]
        window: u32,
    },
    /// Show or change per-user settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Export all data to a JSON file.
    Export {
        /// Output path (default: crm-export-YYYY-MM-DD.json).
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Delete every record of every collection. Irreversible.
    Wipe {
        /// Confirm the wipe.
        #[arg(long)]
        yes: bool,
    },
    /// Show the signed-in user.
    Whoami,
    /// Establish a session against the hosted store.
    Login,
    /// Tear the session down.
    Logout,
}

fn parse_lead_status(raw: &str) -> Result<LeadStatus, String> {
    LeadStatus::from_value(raw).ok_or_else(|| {
        format!(
            "unknown status '{raw}' (expected one of: {})",
            LeadStatus::ALL.map(LeadStatus::as_str).join(", ")
        )
    })
}

fn parse_client_status(raw: &str) -> Result<ClientStatus, String> {
    ClientStatus::from_value(raw).ok_or_else(|| {
        format!(
            "unknown status '{raw}' (expected one of: {})",
            ClientStatus::ALL.map(ClientStatus::as_str).join(", ")
        )
    })
}

fn parse_stage(raw: &str) -> Result<DealStage, String> {
    DealStage::from_value(raw).ok_or_else(|| {
        format!(
            "unknown stage '{raw}' (expected one of: {})",
            DealStage::BOARD.map(DealStage::as_str).join(", ")
        )
    })
}

fn parse_user_kind(raw: &str) -> Result<ActivityKind, String> {
    ActivityKind::from_user_value(raw).ok_or_else(|| {
        format!(
            "unknown activity kind '{raw}' (expected one of: {})",
            ActivityKind::USER.map(ActivityKind::as_str).join(", ")
        )
    })
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::from_value(raw).ok_or_else(|| {
        format!(
            "unknown currency '{raw}' (expected one of: {})",
            Currency::ALL.map(Currency::as_str).join(", ")
        )
    })
}

#[derive(Debug, Subcommand)]
pub enum LeadsCommand {
    /// List leads, with optional search and filters.
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_parser = parse_lead_status)]
        status: Option<LeadStatus>,
        #[arg(long)]
        source: Option<String>,
    },
    /// Add a lead.
    Add(LeadAddArgs),
    /// Edit fields of an existing lead.
    Edit {
        id: String,
        #[command(flatten)]
        args: LeadEditArgs,
    },
    /// Delete a lead.
    Rm { id: String },
}

#[derive(Debug, Args)]
pub struct LeadAddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub position: Option<String>,
    #[arg(long, default_value = "website")]
    pub source: String,
    #[arg(long, default_value = "new", value_parser = parse_lead_status)]
    pub status: LeadStatus,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct LeadEditArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub position: Option<String>,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long, value_parser = parse_lead_status)]
    pub status: Option<LeadStatus>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ClientsCommand {
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_parser = parse_client_status)]
        status: Option<ClientStatus>,
    },
    Add(ClientAddArgs),
    Edit {
        id: String,
        #[command(flatten)]
        args: ClientEditArgs,
    },
    Rm { id: String },
}

#[derive(Debug, Args)]
pub struct ClientAddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub position: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long, default_value = "active", value_parser = parse_client_status)]
    pub status: ClientStatus,
    #[arg(long, default_value = "0")]
    pub total_value: rust_decimal::Decimal,
    #[arg(long)]
    pub last_contact: Option<chrono::NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct ClientEditArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub position: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long, value_parser = parse_client_status)]
    pub status: Option<ClientStatus>,
    #[arg(long)]
    pub total_value: Option<rust_decimal::Decimal>,
    #[arg(long)]
    pub last_contact: Option<chrono::NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum DealsCommand {
    List {
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Kanban board grouped by stage.
    Board {
        #[arg(long, default_value = "")]
        search: String,
    },
    Add(DealAddArgs),
    Edit {
        id: String,
        #[command(flatten)]
        args: DealEditArgs,
    },
    /// Move a deal to another stage.
    Stage {
        id: String,
        #[arg(value_parser = parse_stage)]
        stage: DealStage,
    },
    Rm { id: String },
}

#[derive(Debug, Args)]
pub struct DealAddArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub value: rust_decimal::Decimal,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, default_value = "new", value_parser = parse_stage)]
    pub stage: DealStage,
    #[arg(long, default_value_t = 50)]
    pub probability: u8,
    #[arg(long)]
    pub close_date: Option<chrono::NaiveDate>,
    /// Reference a lead by id. Mutually exclusive with --client.
    #[arg(long, conflicts_with = "client")]
    pub lead: Option<String>,
    /// Reference a client by id. Mutually exclusive with --lead.
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct DealEditArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub value: Option<rust_decimal::Decimal>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_parser = parse_stage)]
    pub stage: Option<DealStage>,
    #[arg(long)]
    pub probability: Option<u8>,
    #[arg(long)]
    pub close_date: Option<chrono::NaiveDate>,
    #[arg(long, conflicts_with = "client")]
    pub lead: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ActivitiesCommand {
    /// Most recent history entries.
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Record a call, email, meeting, note, or task.
    Log {
        #[arg(value_parser = parse_user_kind)]
        kind: ActivityKind,
        description: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with_all = ["client", "deal"])]
        lead: Option<String>,
        #[arg(long, conflicts_with = "deal")]
        client: Option<String>,
        #[arg(long)]
        deal: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show the stored settings.
    Show,
    /// Change one or more settings fields.
    Set(SettingsSetArgs),
}

#[derive(Debug, Args)]
pub struct SettingsSetArgs {
    #[arg(long)]
    pub company_name: Option<String>,
    #[arg(long)]
    pub company_address: Option<String>,
    #[arg(long)]
    pub company_phone: Option<String>,
    #[arg(long)]
    pub company_email: Option<String>,
    #[arg(long, value_parser = parse_currency)]
    pub currency: Option<Currency>,
    #[arg(long)]
    pub timezone: Option<String>,
    #[arg(long)]
    pub language: Option<String>,
    #[arg(long)]
    pub email_notifications: Option<bool>,
    #[arg(long)]
    pub push_notifications: Option<bool>,
    #[arg(long)]
    pub deal_reminders: Option<bool>,
    #[arg(long)]
    pub lead_auto_assignment: Option<bool>,
    /// Retention window in days (30–3650). Stored, not enforced.
    #[arg(long)]
    pub retention_days: Option<u32>,
}

/// Everything a signed-in command needs.
pub struct App {
    pub session: Session,
    pub output: OutputConfig,
}

impl App {
    fn say(&self, level: NoticeLevel, message: &str) {
        term::notify(self.output.color, level, message);
    }

    /// Warn when a tracked mutation ended up without a history row.
    fn report_history(&self, outcome: LogOutcome) {
        match outcome {
            LogOutcome::Written => {}
            LogOutcome::Deferred => self.say(
                NoticeLevel::Warning,
                "history entry could not be stored yet; it will be retried",
            ),
            LogOutcome::Dropped => self.say(
                NoticeLevel::Warning,
                "history entry was dropped; the change has no history row",
            ),
        }
    }

    async fn currency(&self) -> Currency {
        match self.session.settings().await {
            Ok(settings) => settings.currency,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default currency");
                Currency::Rub
            }
        }
    }
}

/// Expand a (possibly shortened) id against the loaded record set.
fn resolve_id<'a>(
    ids: impl Iterator<Item = &'a str>,
    prefix: &str,
    what: &str,
) -> Result<String, anyhow::Error> {
    let matches: Vec<&str> = ids.filter(|id| id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [id] => Ok((*id).to_string()),
        [] => anyhow::bail!("no {what} matches id '{prefix}'"),
        _ => anyhow::bail!("id '{prefix}' is ambiguous ({} matches)", matches.len()),
    }
}

/// Build the store and auth backends for this invocation.
pub fn backends(
    config: &Config,
    offline: bool,
) -> Result<(Arc<dyn RecordStore>, Arc<dyn AuthService>), StoreError> {
    if offline {
        Ok((Arc::new(MemoryStore::new()), Arc::new(StaticAuth::demo())))
    } else {
        Ok((
            Arc::new(HttpStore::new(&config.store)?),
            Arc::new(HttpAuth::new(&config.store)?),
        ))
    }
}

pub async fn execute(command: Command, app: &App) -> anyhow::Result<()> {
    match command {
        Command::Dashboard => dashboard(app).await,
        Command::Leads { command } => leads(command, app).await,
        Command::Clients { command } => clients(command, app).await,
        Command::Deals { command } => deals(command, app).await,
        Command::Activities { command } => activities(command, app).await,
        Command::Report { window } => report(window, app).await,
        Command::Settings { command } => settings(command, app).await,
        Command::Export { out } => export(out, app).await,
        Command::Wipe { yes } => wipe(yes, app).await,
        Command::Whoami | Command::Login | Command::Logout => {
            unreachable!("auth commands are handled before a session exists")
        }
    }
}

async fn dashboard(app: &App) -> anyhow::Result<()> {
    let snapshot = app.session.data().await?;
    let summary = DashboardSummary::build(&snapshot);
    print!("{}", term::render_dashboard(&summary, app.currency().await));
    Ok(())
}

async fn leads(command: LeadsCommand, app: &App) -> anyhow::Result<()> {
    match command {
        LeadsCommand::List {
            search,
            status,
            source,
        } => {
            let snapshot = app.session.data().await?;
            let filter = LeadFilter {
                search,
                status,
                source,
            };
            print!("{}", term::render_leads(&filter.apply(&snapshot.leads)));
        }
        LeadsCommand::Add(args) => {
            let mut form = LeadForm::create();
            form.draft = LeadDraft {
                name: args.name,
                email: args.email,
                phone: args.phone,
                company: args.company,
                position: args.position,
                source: args.source,
                status: args.status,
                notes: args.notes,
            };
            let (lead, outcome) = form.submit(&app.session).await?;
            app.say(
                NoticeLevel::Success,
                &format!("Lead created: {} [{}]", lead.name, term::short_id(&lead.id)),
            );
            app.report_history(outcome);
        }
        LeadsCommand::Edit { id, args } => {
            let snapshot = app.session.data().await?;
            let id = resolve_id(snapshot.leads.iter().map(|l| l.id.as_str()), &id, "lead")?;
            let lead = app.session.find_lead(&id).await?;

            let mut form = LeadForm::edit(&lead);
            let draft = &mut form.draft;
            if let Some(name) = args.name {
                draft.name = name;
            }
            if let Some(email) = args.email {
                draft.email = email;
            }
            if let Some(phone) = args.phone {
                draft.phone = Some(phone);
            }
            if let Some(company) = args.company {
                draft.company = Some(company);
            }
            if let Some(position) = args.position {
                draft.position = Some(position);
            }
            if let Some(source) = args.source {
                draft.source = source;
            }
            if let Some(status) = args.status {
                draft.status = status;
            }
            if let Some(notes) = args.notes {
                draft.notes = Some(notes);
            }

            let (lead, outcome) = form.submit(&app.session).await?;
            app.say(NoticeLevel::Success, &format!("Lead updated: {}", lead.name));
            app.report_history(outcome);
        }
        LeadsCommand::Rm { id } => {
            let snapshot = app.session.data().await?;
            let id = resolve_id(snapshot.leads.iter().map(|l| l.id.as_str()), &id, "lead")?;
            let outcome = app.session.delete_lead(&id).await?;
            app.say(NoticeLevel::Success, "Lead deleted");
            app.report_history(outcome);
        }
    }
    Ok(())
}

async fn clients(command: ClientsCommand, app: &App) -> anyhow::Result<()> {
    match command {
        ClientsCommand::List { search, status } => {
            let snapshot = app.session.data().await?;
            let filter = ClientFilter { search, status };
            print!(
                "{}",
                term::render_clients(&filter.apply(&snapshot.clients), app.currency().await)
            );
        }
        ClientsCommand::Add(args) => {
            let mut form = ClientForm::create();
            form.draft = ClientDraft {
                name: args.name,
                email: args.email,
                phone: args.phone,
                company: args.company,
                position: args.position,
                address: args.address,
                status: args.status,
                total_value: args.total_value,
                last_contact: args.last_contact,
                notes: args.notes,
            };
            let (client, outcome) = form.submit(&app.session).await?;
            app.say(
                NoticeLevel::Success,
                &format!(
                    "Client created: {} [{}]",
                    client.name,
                    term::short_id(&client.id)
                ),
            );
            app.report_history(outcome);
        }
        ClientsCommand::Edit { id, args } => {
            let snapshot = app.session.data().await?;
            let id = resolve_id(
                snapshot.clients.iter().map(|c| c.id.as_str()),
                &id,
                "client",
            )?;
            let client = app.session.find_client(&id).await?;

            let mut form = ClientForm::edit(&client);
            let draft = &mut form.draft;
            if let Some(name) = args.name {
                draft.name = name;
            }
            if let Some(email) = args.email {
                draft.email = email;
            }
            if let Some(phone) = args.phone {
                draft.phone = Some(phone);
            }
            if let Some(company) = args.company {
                draft.company = Some(company);
            }
            if let Some(position) = args.position {
                draft.position = Some(position);
            }
            if let Some(address) = args.address {
                draft.address = Some(address);
            }
            if let Some(status) = args.status {
                draft.status = status;
            }
            if let Some(total_value) = args.total_value {
                draft.total_value = total_value;
            }
            if let Some(last_contact) = args.last_contact {
                draft.last_contact = Some(last_contact);
            }
            if let Some(notes) = args.notes {
                draft.notes = Some(notes);
            }

            let (client, outcome) = form.submit(&app.session).await?;
            app.say(
                NoticeLevel::Success,
                &format!("Client updated: {}", client.name),
            );
            app.report_history(outcome);
        }
        ClientsCommand::Rm { id } => {
            let snapshot = app.session.data().await?;
            let id = resolve_id(
                snapshot.clients.iter().map(|c| c.id.as_str()),
                &id,
                "client",
            )?;
            let outcome = app.session.delete_client(&id).await?;
            app.say(NoticeLevel::Success, "Client deleted");
            app.report_history(outcome);
        }
    }
    Ok(())
}

async fn deals(command: DealsCommand, app: &App) -> anyhow::Result<()> {
    match command {
        DealsCommand::List { search } => {
            let snapshot = app.session.data().await?;
            let filter = DealFilter { search };
            print!(
                "{}",
                term::render_deals(&filter.apply(&snapshot.deals), app.currency().await)
            );
        }
        DealsCommand::Board { search } => {
            let snapshot = app.session.data().await?;
            let filter = DealFilter { search };
            let filtered: Vec<_> = filter.apply(&snapshot.deals).into_iter().cloned().collect();
            let columns = group_by_stage(&filtered);
            print!("{}", term::render_board(&columns, app.currency().await));
        }
        DealsCommand::Add(args) => {
            let mut form = DealForm::create();
            form.draft = DealDraft {
                title: args.title,
                description: args.description,
                value: args.value,
                stage: args.stage,
                probability: args.probability,
                expected_close_date: args.close_date,
                lead_id: None,
                client_id: None,
                notes: args.notes,
            };
            if let Some(lead) = args.lead {
                let snapshot = app.session.data().await?;
                form.draft
                    .set_lead(resolve_id(snapshot.leads.iter().map(|l| l.id.as_str()), &lead, "lead")?);
            }
            if let Some(client) = args.client {
                let snapshot = app.session.data().await?;
                form.draft.set_client(resolve_id(
                    snapshot.clients.iter().map(|c| c.id.as_str()),
                    &client,
                    "client",
                )?);
            }
            let (deal, outcome) = form.submit(&app.session).await?;
            app.say(
                NoticeLevel::Success,
                &format!("Deal created: {} [{}]", deal.title, term::short_id(&deal.id)),
            );
            app.report_history(outcome);
        }
        DealsCommand::Edit { id, args } => {
            let snapshot = app.session.data().await?;
            let id = resolve_id(snapshot.deals.iter().map(|d| d.id.as_str()), &id, "deal")?;
            let deal = app.session.find_deal(&id).await?;

            let mut form = DealForm::edit(&deal);
            let draft = &mut form.draft;
            if let Some(title) = args.title {
                draft.title = title;
            }
            if let Some(value) = args.value {
                draft.value = value;
            }
            if let Some(description) = args.description {
                draft.description = description;
            }
            if let Some(stage) = args.stage {
                draft.stage = stage;
            }
            if let Some(probability) = args.probability {
                draft.probability = probability;
            }
            if let Some(close_date) = args.close_date {
                draft.expected_close_date = Some(close_date);
            }
            if let Some(notes) = args.notes {
                draft.notes = Some(notes);
            }
            if let Some(lead) = args.lead {
                draft.set_lead(resolve_id(
                    snapshot.leads.iter().map(|l| l.id.as_str()),
                    &lead,
                    "lead",
                )?);
            }
            if let Some(client) = args.client {
                draft.set_client(resolve_id(
                    snapshot.clients.iter().map(|c| c.id.as_str()),
                    &client,
                    "client",
                )?);
            }

            let (deal, outcome) = form.submit(&app.session).await?;
            app.say(NoticeLevel::Success, &format!("Deal updated: {}", deal.title));
            app.report_history(outcome);
        }
        DealsCommand::Stage { id, stage } => {
            let snapshot = app.session.data().await?;
            let id = resolve_id(snapshot.deals.iter().map(|d| d.id.as_str()), &id, "deal")?;
            let (deal, outcome) = app.session.set_deal_stage(&id, stage).await?;
            app.say(
                NoticeLevel::Success,
                &format!("Deal \"{}\" moved to \"{}\"", deal.title, stage.label()),
            );
            app.report_history(outcome);
        }
        DealsCommand::Rm { id } => {
            let snapshot = app.session.data().await?;
            let id = resolve_id(snapshot.deals.iter().map(|d| d.id.as_str()), &id, "deal")?;
            let outcome = app.session.delete_deal(&id).await?;
            app.say(NoticeLevel::Success, "Deal deleted");
            app.report_history(outcome);
        }
    }
    Ok(())
}

async fn activities(command: ActivitiesCommand, app: &App) -> anyhow::Result<()> {
    match command {
        ActivitiesCommand::List { limit } => {
            let snapshot = app.session.data().await?;
            let shown: Vec<_> = snapshot.activities.iter().take(limit).cloned().collect();
            print!("{}", term::render_activities(&shown));
        }
        ActivitiesCommand::Log {
            kind,
            description,
            title,
            lead,
            client,
            deal,
        } => {
            let snapshot = app.session.data().await?;
            let entity = if let Some(lead) = lead {
                Some(EntityRef::new(
                    EntityKind::Lead,
                    resolve_id(snapshot.leads.iter().map(|l| l.id.as_str()), &lead, "lead")?,
                ))
            } else if let Some(client) = client {
                Some(EntityRef::new(
                    EntityKind::Client,
                    resolve_id(
                        snapshot.clients.iter().map(|c| c.id.as_str()),
                        &client,
                        "client",
                    )?,
                ))
            } else if let Some(deal) = deal {
                Some(EntityRef::new(
                    EntityKind::Deal,
                    resolve_id(snapshot.deals.iter().map(|d| d.id.as_str()), &deal, "deal")?,
                ))
            } else {
                None
            };

            app.session
                .log_activity(kind, title, description, entity)
                .await?;
            app.say(NoticeLevel::Success, "Activity recorded");
        }
    }
    Ok(())
}

async fn report(window_days: u32, app: &App) -> anyhow::Result<()> {
    let Some(window) = TimeWindow::from_days(window_days) else {
        anyhow::bail!(
            "unsupported window '{window_days}' (expected one of: {})",
            TimeWindow::ALL
                .map(|w| w.days().to_string())
                .join(", ")
        );
    };
    let snapshot = app.session.data().await?;
    let report = Report::build(&snapshot, window, Local::now());
    print!("{}", term::render_report(&report, app.currency().await));
    Ok(())
}

async fn settings(command: SettingsCommand, app: &App) -> anyhow::Result<()> {
    match command {
        SettingsCommand::Show => {
            let settings = app.session.settings().await?;
            println!("company_name         = {}", settings.company_name);
            println!("company_address      = {}", settings.company_address);
            println!("company_phone        = {}", settings.company_phone);
            println!("company_email        = {}", settings.company_email);
            println!("currency             = {}", settings.currency.as_str());
            println!("timezone             = {}", settings.timezone);
            println!("language             = {}", settings.language);
            println!("email_notifications  = {}", settings.email_notifications);
            println!("push_notifications   = {}", settings.push_notifications);
            println!("deal_reminders       = {}", settings.deal_reminders);
            println!("lead_auto_assignment = {}", settings.lead_auto_assignment);
            println!("data_retention_days  = {}", settings.data_retention_days);
        }
        SettingsCommand::Set(args) => {
            let mut settings = app.session.settings().await?;
            if let Some(v) = args.company_name {
                settings.company_name = v;
            }
            if let Some(v) = args.company_address {
                settings.company_address = v;
            }
            if let Some(v) = args.company_phone {
                settings.company_phone = v;
            }
            if let Some(v) = args.company_email {
                settings.company_email = v;
            }
            if let Some(v) = args.currency {
                settings.currency = v;
            }
            if let Some(v) = args.timezone {
                settings.timezone = v;
            }
            if let Some(v) = args.language {
                settings.language = v;
            }
            if let Some(v) = args.email_notifications {
                settings.email_notifications = v;
            }
            if let Some(v) = args.push_notifications {
                settings.push_notifications = v;
            }
            if let Some(v) = args.deal_reminders {
                settings.deal_reminders = v;
            }
            if let Some(v) = args.lead_auto_assignment {
                settings.lead_auto_assignment = v;
            }
            if let Some(v) = args.retention_days {
                settings.data_retention_days = v;
            }
            if let Err(message) = validate_settings(&settings) {
                anyhow::bail!(message);
            }
            app.session.save_settings(settings).await?;
            app.say(NoticeLevel::Success, "Settings saved");
        }
    }
    Ok(())
}

async fn export(out: Option<PathBuf>, app: &App) -> anyhow::Result<()> {
    let snapshot = app.session.data().await?;
    let settings = app.session.settings().await?;
    let document = ExportDocument::build(
        app.session.user(),
        settings,
        snapshot,
        chrono::Utc::now(),
    );
    let path = out.unwrap_or_else(|| PathBuf::from(default_file_name(Local::now().date_naive())));
    document.write_file(&path)?;
    app.say(
        NoticeLevel::Success,
        &format!("Data exported to {}", path.display()),
    );
    Ok(())
}

async fn wipe(yes: bool, app: &App) -> anyhow::Result<()> {
    let snapshot = app.session.data().await?;
    if !yes {
        app.say(
            NoticeLevel::Warning,
            &format!(
                "This would delete {} — re-run with --yes to confirm",
                term::render_totals(&snapshot)
            ),
        );
        return Ok(());
    }

    let report = app.session.wipe().await?;
    if report.failed == 0 {
        app.say(
            NoticeLevel::Success,
            &format!("All data deleted ({} records)", report.deleted),
        );
    } else {
        // Partial wipe: some records survive. No retry, no rollback.
        app.say(
            NoticeLevel::Warning,
            &format!(
                "Deleted {} records, {} deletes failed; remaining data is in a mixed state",
                report.deleted, report.failed
            ),
        );
    }
    Ok(())
}

/// Auth commands run without a data session.
pub async fn execute_auth(command: &Command, auth: &AuthHandle, output: &OutputConfig) -> anyhow::Result<bool> {
    match command {
        Command::Whoami => {
            let user = auth.resolve().await?;
            println!(
                "{} <{}> [{}]",
                user.display_name.as_deref().unwrap_or("(no name)"),
                user.email,
                user.id
            );
            Ok(true)
        }
        Command::Login => {
            let user = auth.login().await?;
            term::notify(
                output.color,
                NoticeLevel::Success,
                &format!("Signed in as {}", user.email),
            );
            Ok(true)
        }
        Command::Logout => {
            auth.logout().await?;
            term::notify(output.color, NoticeLevel::Success, "Signed out");
            Ok(true)
        }
        _ => Ok(false),
    }
}
