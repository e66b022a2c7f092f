//! Plain-text tables for the console's listings.

use client_core::{listing::Page, CompanyDetails};
use shared::{
    domain::{Company, Store, Timestamp, User},
    protocol::SessionUser,
};

pub fn session_user(user: &SessionUser) {
    println!("{} <{}> role={} id={}", user.name, user.email, user.role, user.id);
}

pub fn companies(page: &Page<&Company>) {
    println!(
        "{:<6} {:<32} {:<16} {:<12} {:<8} {:<17} {:<17}",
        "ID", "NOME", "CNPJ", "PLANO", "STATUS", "CRIAÇÃO", "ATUALIZAÇÃO"
    );
    for company in &page.items {
        println!(
            "{:<6} {:<32} {:<16} {:<12} {:<8} {:<17} {:<17}",
            company.id,
            company.name,
            company.tax_id,
            company.plan,
            if company.active { "ativa" } else { "inativa" },
            timestamp(company.created_at.as_ref()),
            timestamp(company.updated_at.as_ref())
        );
    }
    footer(page);
}

pub fn stores(page: &Page<&Store>, companies: &[Company]) {
    println!("{:<6} {:<32} {:<32}", "ID", "NOME", "EMPRESA");
    for store in &page.items {
        println!(
            "{:<6} {:<32} {:<32}",
            store.id,
            store.name,
            client_core::listing::company_label(companies, store.company_id)
        );
    }
    footer(page);
}

pub fn users(page: &Page<&User>, companies: &[Company]) {
    println!(
        "{:<6} {:<24} {:<32} {:<12} {:<24}",
        "ID", "NOME", "EMAIL", "PERFIL", "EMPRESA"
    );
    for user in &page.items {
        let company = user
            .company_id
            .map(|id| client_core::listing::company_label(companies, id))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<6} {:<24} {:<32} {:<12} {:<24}",
            user.id, user.name, user.email, user.role, company
        );
    }
    footer(page);
}

pub fn company_details(company: Option<&Company>, details: &CompanyDetails) {
    if let Some(company) = company {
        println!("{} (CNPJ {})", company.name, company.tax_id);
        println!(
            "plano={} status={} email={} subdominio={}",
            company.plan,
            if company.active { "ativa" } else { "inativa" },
            company.email.as_deref().unwrap_or("-"),
            company.subdomain.as_deref().unwrap_or("-")
        );
        println!(
            "criada em {} | atualizada em {}",
            timestamp(company.created_at.as_ref()),
            timestamp(company.updated_at.as_ref())
        );
    }
    println!("\nLojas ({})", details.stores.len());
    for store in &details.stores {
        println!("  {:<6} {}", store.id, store.name);
    }
    println!("\nUsuários ({})", details.users.len());
    for user in &details.users {
        println!("  {:<6} {:<24} {:<32} {}", user.id, user.name, user.email, user.role);
    }
}

fn timestamp(at: Option<&Timestamp>) -> String {
    at.map_or_else(|| "-".to_string(), Timestamp::to_string)
}

fn footer<T>(page: &Page<T>) {
    if page.total_items == 0 {
        println!("(nenhum registro)");
        return;
    }
    println!(
        "página {}/{} ({} registros)",
        page.page, page.total_pages, page.total_items
    );
}
