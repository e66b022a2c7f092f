mod commands;
mod render;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use client_core::{
    listing::{filter_companies, filter_stores, filter_users, paginate},
    load_settings,
    session::{ACCESS_DENIED_MESSAGE, LOGIN_FAILED_MESSAGE},
    ApiClient, AuthSession, Companies, FileSessionStore, Mutation, SessionStatus, Settings,
    Stores, SyncController, SyncOutcome, Users,
};
use commands::{Cli, Command, CompanyCommand, StoreCommand, UserCommand};
use shared::domain::{AdminUserDraft, CompanyDraft, CompanyEdit, StoreDraft, UserDraft};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SESSION_EXPIRED_MESSAGE: &str = "Sessão expirada. Faça login novamente.";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = cli.api_url {
        settings.api_base_url = url;
    }
    let store = FileSessionStore::new(session_path(&settings));
    info!(
        "console: api={} session={}",
        settings.api_base_url,
        store.path().display()
    );

    let session = AuthSession::new(Arc::new(store));
    let api = ApiClient::new(&settings, session.clone())
        .context("failed to build api client")?;

    match cli.command {
        Command::Login { email, password } => {
            let user = session
                .login(&api, &email, &password)
                .await
                .map_err(|err| anyhow!(err.user_message_or(LOGIN_FAILED_MESSAGE)))?;
            render::session_user(&user);
            return Ok(());
        }
        Command::Logout => {
            session.restore().await;
            let was_signed_in = session.is_authenticated().await;
            session.logout().await.context("failed to clear session")?;
            if was_signed_in {
                println!("Sessão encerrada.");
            } else {
                println!("Nenhuma sessão ativa.");
            }
            return Ok(());
        }
        command => {
            let Some(user) = session.restore().await else {
                bail!("Nenhuma sessão ativa. Use `admin-console login`.");
            };
            if !session.is_super_admin().await {
                bail!(ACCESS_DENIED_MESSAGE);
            }
            if matches!(command, Command::Whoami) {
                render::session_user(&user);
                return Ok(());
            }

            let controller = SyncController::new(api);
            watch_session(&session, &controller);
            let result = run(&controller, &settings, command).await;
            if session.status() == SessionStatus::Expired {
                bail!(SESSION_EXPIRED_MESSAGE);
            }
            result
        }
    }
}

/// Tears the controller down as soon as the backend rejects the token.
fn watch_session(session: &AuthSession, controller: &Arc<SyncController>) {
    let mut status = session.subscribe();
    let controller = Arc::clone(controller);
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            if *status.borrow() == SessionStatus::Expired {
                controller.teardown();
                break;
            }
        }
    });
}

async fn run(controller: &SyncController, settings: &Settings, command: Command) -> Result<()> {
    let outcome = controller.initialize().await;
    if outcome != SyncOutcome::Applied {
        return report(controller, outcome).await;
    }

    let per_page = settings.page_size;
    let outcome = match command {
        Command::Companies(list) => {
            let companies = controller.companies().await;
            let matched: Vec<_> = filter_companies(&companies, &list.search);
            render::companies(&paginate(&matched, list.page, per_page));
            return Ok(());
        }
        Command::Stores(scoped) => {
            let (companies, stores) = (controller.companies().await, controller.stores().await);
            let matched = filter_stores(&stores, scoped.company, &scoped.list.search);
            render::stores(&paginate(&matched, scoped.list.page, per_page), &companies);
            return Ok(());
        }
        Command::Users(scoped) => {
            let (companies, users) = (controller.companies().await, controller.users().await);
            let matched = filter_users(&users, scoped.company, &scoped.list.search);
            render::users(&paginate(&matched, scoped.list.page, per_page), &companies);
            return Ok(());
        }
        Command::Company(CompanyCommand::Show { id }) => {
            let details = controller
                .company_details(id)
                .await
                .map_err(|err| {
                    if err.is_session_expired() {
                        anyhow!(SESSION_EXPIRED_MESSAGE)
                    } else {
                        anyhow!(err.user_message())
                    }
                })?;
            let companies = controller.companies().await;
            render::company_details(companies.iter().find(|c| c.id == id), &details);
            return Ok(());
        }
        Command::Company(CompanyCommand::Create {
            fields,
            plan,
            inactive,
            admin_name,
            admin_email,
            admin_password,
        }) => {
            let admin = match (admin_name, admin_email, admin_password) {
                (Some(name), Some(email), Some(password)) => Some(AdminUserDraft {
                    name,
                    email,
                    password,
                }),
                (None, None, None) => None,
                _ => bail!(
                    "--admin-name, --admin-email e --admin-password devem ser informados juntos."
                ),
            };
            let draft = CompanyDraft {
                name: fields.name,
                tax_id: fields.tax_id,
                email: fields.email,
                subdomain: fields.subdomain,
                plan,
                active: !inactive,
                admin,
            };
            controller.mutate(Mutation::<Companies>::Create(draft)).await
        }
        Command::Company(CompanyCommand::Update { id, fields }) => {
            let body = CompanyEdit {
                name: fields.name,
                tax_id: fields.tax_id,
                email: fields.email,
                subdomain: fields.subdomain,
            };
            controller
                .mutate(Mutation::<Companies>::Update { id, body })
                .await
        }
        Command::Company(CompanyCommand::Delete { id }) => {
            controller.mutate(Mutation::<Companies>::Delete { id }).await
        }
        Command::Company(CompanyCommand::Plan { id, plan }) => {
            controller.set_company_plan(id, plan).await
        }
        Command::Company(CompanyCommand::Active { id, active }) => {
            controller.set_company_active(id, active).await
        }
        Command::Store(StoreCommand::Create { fields }) => {
            let draft = StoreDraft {
                name: fields.name,
                company_id: fields.company,
            };
            controller.mutate(Mutation::<Stores>::save(None, draft)).await
        }
        Command::Store(StoreCommand::Update { id, fields }) => {
            let draft = StoreDraft {
                name: fields.name,
                company_id: fields.company,
            };
            controller.mutate(Mutation::<Stores>::save(Some(id), draft)).await
        }
        Command::Store(StoreCommand::Delete { id }) => {
            controller.mutate(Mutation::<Stores>::Delete { id }).await
        }
        Command::User(UserCommand::Create { fields }) => {
            let draft = UserDraft {
                name: fields.name,
                email: fields.email,
                role: fields.role,
                company_id: fields.company,
                password: fields.password,
            };
            controller.mutate(Mutation::<Users>::save(None, draft)).await
        }
        Command::User(UserCommand::Update { id, fields }) => {
            let draft = UserDraft {
                name: fields.name,
                email: fields.email,
                role: fields.role,
                company_id: fields.company,
                password: fields.password,
            };
            controller.mutate(Mutation::<Users>::save(Some(id), draft)).await
        }
        Command::User(UserCommand::Delete { id }) => {
            controller.mutate(Mutation::<Users>::Delete { id }).await
        }
        Command::Login { .. } | Command::Logout | Command::Whoami => return Ok(()),
    };
    report(controller, outcome).await
}

async fn report(controller: &SyncController, outcome: SyncOutcome) -> Result<()> {
    let status = controller.status().await;
    match outcome {
        SyncOutcome::Applied => {
            if let Some(message) = status.last_success {
                println!("{message}");
            }
            Ok(())
        }
        SyncOutcome::Failed => Err(anyhow!(status
            .last_error
            .unwrap_or_else(|| client_core::error::GENERIC_ERROR_MESSAGE.to_string()))),
        SyncOutcome::Abandoned => bail!(SESSION_EXPIRED_MESSAGE),
    }
}

/// Configured session file, else `<config dir>/admin-console/session.json`.
fn session_path(settings: &Settings) -> PathBuf {
    settings.session_file.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("admin-console")
            .join("session.json")
    })
}
