//! Command-line surface of the console.

use clap::{Args, Parser, Subcommand};
use client_core::listing::digits_only;
use shared::domain::{CompanyId, Plan, Role, StoreId, UserId};

#[derive(Parser, Debug)]
#[command(name = "admin-console", about = "Super-admin console for companies, stores and users")]
pub struct Cli {
    /// Overrides the configured API base URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Signs in with a SUPER_ADMIN account.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami,
    Companies(ListArgs),
    Stores(ScopedListArgs),
    Users(ScopedListArgs),
    #[command(subcommand)]
    Company(CompanyCommand),
    #[command(subcommand)]
    Store(StoreCommand),
    #[command(subcommand)]
    User(UserCommand),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, default_value = "")]
    pub search: String,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
}

#[derive(Args, Debug)]
pub struct ScopedListArgs {
    #[arg(long, value_parser = parse_company_id)]
    pub company: Option<CompanyId>,
    #[command(flatten)]
    pub list: ListArgs,
}

#[derive(Subcommand, Debug)]
pub enum CompanyCommand {
    /// Shows a company with its stores and users.
    Show {
        #[arg(value_parser = parse_company_id)]
        id: CompanyId,
    },
    Create {
        #[command(flatten)]
        fields: CompanyFields,
        #[arg(long, default_value = "BASIC")]
        plan: Plan,
        #[arg(long)]
        inactive: bool,
        /// Initial administrator; name, e-mail and password go together.
        #[arg(long, value_parser = parse_name, requires_all = ["admin_email", "admin_password"])]
        admin_name: Option<String>,
        #[arg(long, value_parser = parse_email, requires_all = ["admin_name", "admin_password"])]
        admin_email: Option<String>,
        #[arg(long, value_parser = parse_password, requires_all = ["admin_name", "admin_email"])]
        admin_password: Option<String>,
    },
    Update {
        #[arg(value_parser = parse_company_id)]
        id: CompanyId,
        #[command(flatten)]
        fields: CompanyFields,
    },
    Delete {
        #[arg(value_parser = parse_company_id)]
        id: CompanyId,
    },
    Plan {
        #[arg(value_parser = parse_company_id)]
        id: CompanyId,
        plan: Plan,
    },
    Active {
        #[arg(value_parser = parse_company_id)]
        id: CompanyId,
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },
}

#[derive(Args, Debug)]
pub struct CompanyFields {
    #[arg(long, value_parser = parse_name)]
    pub name: String,
    #[arg(long, value_parser = parse_tax_id)]
    pub tax_id: String,
    #[arg(long, value_parser = parse_email)]
    pub email: String,
    #[arg(long)]
    pub subdomain: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    Create {
        #[command(flatten)]
        fields: StoreFields,
    },
    Update {
        #[arg(value_parser = parse_store_id)]
        id: StoreId,
        #[command(flatten)]
        fields: StoreFields,
    },
    Delete {
        #[arg(value_parser = parse_store_id)]
        id: StoreId,
    },
}

#[derive(Args, Debug)]
pub struct StoreFields {
    #[arg(long, value_parser = parse_name)]
    pub name: String,
    #[arg(long, value_parser = parse_company_id)]
    pub company: CompanyId,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    Create {
        #[command(flatten)]
        fields: UserFields,
    },
    Update {
        #[arg(value_parser = parse_user_id)]
        id: UserId,
        #[command(flatten)]
        fields: UserFields,
    },
    Delete {
        #[arg(value_parser = parse_user_id)]
        id: UserId,
    },
}

#[derive(Args, Debug)]
pub struct UserFields {
    #[arg(long, value_parser = parse_name)]
    pub name: String,
    #[arg(long, value_parser = parse_email)]
    pub email: String,
    #[arg(long, default_value = "ADMIN", value_parser = parse_role)]
    pub role: Role,
    #[arg(long, value_parser = parse_company_id)]
    pub company: CompanyId,
    #[arg(long)]
    pub password: Option<String>,
}

fn parse_id(raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| format!("'{raw}' is not a valid id"))
}

fn parse_company_id(raw: &str) -> Result<CompanyId, String> {
    parse_id(raw).map(CompanyId)
}

fn parse_store_id(raw: &str) -> Result<StoreId, String> {
    parse_id(raw).map(StoreId)
}

fn parse_user_id(raw: &str) -> Result<UserId, String> {
    parse_id(raw).map(UserId)
}

fn parse_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("name must not be empty".into());
    }
    Ok(name.to_string())
}

/// Accepts masked input (`12.345.678/0001-90`) and keeps only the digits.
pub fn parse_tax_id(raw: &str) -> Result<String, String> {
    let digits = digits_only(raw);
    if digits.len() != 14 {
        return Err(format!("CNPJ must have 14 digits, got {}", digits.len()));
    }
    Ok(digits)
}

pub fn parse_email(raw: &str) -> Result<String, String> {
    let email = raw.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(email.to_string())
        }
        _ => Err(format!("'{raw}' is not a valid email")),
    }
}

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn parse_password(raw: &str) -> Result<String, String> {
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "password must have at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(raw.to_string())
}

fn parse_role(raw: &str) -> Result<Role, String> {
    let role = raw.trim().to_ascii_uppercase();
    if role.is_empty() {
        return Err("role must not be empty".into());
    }
    Ok(Role::from(role))
}
