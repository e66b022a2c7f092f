//! Collection sync controller.
//!
//! Holds the companies, stores and users shown by the console and funnels
//! every mutation through one protocol: submit, re-fetch the whole target
//! collection, replace it, report. Failures never escape; they end up in
//! `last_error`.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use reqwest::Method;
use shared::{
    domain::{Company, CompanyId, Plan, Store, User},
    protocol::{ActiveChange, PlanChange},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

use crate::{
    api::ApiClient,
    error::{ClientError, ClientResult},
    resource::{CollectionKind, Companies, Mutation, Operation, Resource, Stores, Users},
};

pub const INITIAL_LOAD_FAILED_MESSAGE: &str = "Falha ao carregar dados iniciais.";
pub const PLAN_CHANGED_MESSAGE: &str = "Plano alterado com sucesso!";
pub const STATUS_CHANGED_MESSAGE: &str = "Status atualizado!";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collections {
    pub companies: Vec<Company>,
    pub stores: Vec<Store>,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub initial_loading: bool,
    pub operation_loading: bool,
    pub last_error: Option<String>,
    pub last_success: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub companies: Vec<Company>,
    pub stores: Vec<Store>,
    pub users: Vec<User>,
    pub initial_loading: bool,
    pub operation_loading: bool,
    pub last_error: Option<String>,
    pub last_success: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    CollectionReplaced(CollectionKind),
    StatusChanged(SyncStatus),
}

/// Terminal state of an `initialize` or mutation call. Only `Applied`
/// should dismiss an editing form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied,
    Failed,
    /// The controller was torn down or the session expired while the
    /// request was in flight; nothing was applied.
    Abandoned,
}

impl SyncOutcome {
    pub fn is_success(self) -> bool {
        self == SyncOutcome::Applied
    }
}

/// Stores and users of a single company, fetched on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyDetails {
    pub stores: Vec<Store>,
    pub users: Vec<User>,
}

#[derive(Default)]
struct SyncState {
    collections: Collections,
    initial_loading: bool,
    busy: usize,
    last_error: Option<String>,
    last_success: Option<String>,
    // Refresh tickets per collection: issued when a list request starts,
    // applied when its response replaces the collection.
    issued: [u64; 3],
    applied: [u64; 3],
}

impl SyncState {
    fn status(&self) -> SyncStatus {
        SyncStatus {
            initial_loading: self.initial_loading,
            operation_loading: self.busy > 0,
            last_error: self.last_error.clone(),
            last_success: self.last_success.clone(),
        }
    }

    fn clear_messages(&mut self) {
        self.last_error = None;
        self.last_success = None;
    }

    fn issue_ticket(&mut self, kind: CollectionKind) -> u64 {
        let slot = &mut self.issued[kind.index()];
        *slot += 1;
        *slot
    }

    /// Replaces a collection unless a newer refresh already landed.
    fn replace<R: Resource>(&mut self, ticket: u64, records: Vec<R::Record>) -> bool {
        let applied = &mut self.applied[R::KIND.index()];
        if ticket <= *applied {
            return false;
        }
        *applied = ticket;
        *R::slot(&mut self.collections) = records;
        true
    }
}

pub struct SyncController {
    api: ApiClient,
    inner: Mutex<SyncState>,
    alive: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncController {
    pub fn new(api: ApiClient) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            api,
            inner: Mutex::new(SyncState::default()),
            alive: AtomicBool::new(true),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn is_live(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Detaches the controller from its view. Responses that arrive
    /// afterwards are dropped instead of applied.
    pub fn teardown(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            info!("sync: controller torn down");
        }
    }

    pub async fn snapshot(&self) -> SyncSnapshot {
        let state = self.inner.lock().await;
        let status = state.status();
        SyncSnapshot {
            companies: state.collections.companies.clone(),
            stores: state.collections.stores.clone(),
            users: state.collections.users.clone(),
            initial_loading: status.initial_loading,
            operation_loading: status.operation_loading,
            last_error: status.last_error,
            last_success: status.last_success,
        }
    }

    pub async fn status(&self) -> SyncStatus {
        self.inner.lock().await.status()
    }

    pub async fn companies(&self) -> Vec<Company> {
        self.inner.lock().await.collections.companies.clone()
    }

    pub async fn stores(&self) -> Vec<Store> {
        self.inner.lock().await.collections.stores.clone()
    }

    pub async fn users(&self) -> Vec<User> {
        self.inner.lock().await.collections.users.clone()
    }

    pub async fn clear_messages(&self) {
        let mut state = self.inner.lock().await;
        state.clear_messages();
        self.publish_status(&state);
    }

    /// Bulk load of all three collections. Either all of them are replaced
    /// or none is.
    pub async fn initialize(&self) -> SyncOutcome {
        let tickets = {
            let mut state = self.inner.lock().await;
            state.initial_loading = true;
            state.clear_messages();
            self.publish_status(&state);
            CollectionKind::ALL.map(|kind| state.issue_ticket(kind))
        };
        info!("sync: bulk load started");

        let result = futures::try_join!(
            self.fetch_all::<Companies>(),
            self.fetch_all::<Stores>(),
            self.fetch_all::<Users>(),
        );

        let mut state = self.inner.lock().await;
        state.initial_loading = false;
        if !self.is_live() {
            return SyncOutcome::Abandoned;
        }

        let outcome = match result {
            Ok((companies, stores, users)) => {
                info!(
                    "sync: bulk load finished companies={} stores={} users={}",
                    companies.len(),
                    stores.len(),
                    users.len()
                );
                let replaced = [
                    state.replace::<Companies>(tickets[0], companies),
                    state.replace::<Stores>(tickets[1], stores),
                    state.replace::<Users>(tickets[2], users),
                ];
                for (kind, replaced) in CollectionKind::ALL.into_iter().zip(replaced) {
                    if replaced {
                        let _ = self.events.send(SyncEvent::CollectionReplaced(kind));
                    }
                }
                SyncOutcome::Applied
            }
            Err(ClientError::SessionExpired) => {
                warn!("sync: bulk load abandoned, session expired");
                SyncOutcome::Abandoned
            }
            Err(err) => {
                error!("sync: bulk load failed: {err}");
                state.last_error = Some(INITIAL_LOAD_FAILED_MESSAGE.to_string());
                SyncOutcome::Failed
            }
        };
        self.publish_status(&state);
        outcome
    }

    /// Create, update or delete one record, then replace the whole target
    /// collection with a fresh listing.
    pub async fn mutate<R: Resource>(&self, mutation: Mutation<R>) -> SyncOutcome {
        let operation = mutation.operation();
        let success_message = mutation.success_message();
        let api = &self.api;
        let submit = async move {
            match &mutation {
                Mutation::Create(body) => api.send_json(Method::POST, R::KIND.path(), body).await,
                Mutation::Update { id, body } => {
                    api.send_json(Method::PUT, &R::KIND.item_path(id), body)
                        .await
                }
                Mutation::Delete { id } => api.delete(&R::KIND.item_path(id)).await,
            }
        };
        self.run_operation::<R, _>(operation, success_message, submit)
            .await
    }

    pub async fn set_company_plan(&self, id: CompanyId, plan: Plan) -> SyncOutcome {
        let path = format!("{}/plano", CollectionKind::Companies.item_path(id));
        let body = PlanChange { plan };
        let submit = self.api.send_json(Method::PATCH, &path, &body);
        self.run_operation::<Companies, _>(Operation::Update, PLAN_CHANGED_MESSAGE, submit)
            .await
    }

    pub async fn set_company_active(&self, id: CompanyId, active: bool) -> SyncOutcome {
        let path = format!("{}/ativo", CollectionKind::Companies.item_path(id));
        let body = ActiveChange { active };
        let submit = self.api.send_json(Method::PATCH, &path, &body);
        self.run_operation::<Companies, _>(Operation::Update, STATUS_CHANGED_MESSAGE, submit)
            .await
    }

    /// Stores and users owned by one company. Does not touch controller
    /// state; callers handle the error themselves.
    pub async fn company_details(&self, id: CompanyId) -> ClientResult<CompanyDetails> {
        let query = [("empresaId", id.to_string())];
        let (stores, users) = futures::try_join!(
            self.api
                .get_json::<Vec<Store>>(CollectionKind::Stores.path(), &query),
            self.api
                .get_json::<Vec<User>>(CollectionKind::Users.path(), &query),
        )?;
        Ok(CompanyDetails { stores, users })
    }

    async fn fetch_all<R: Resource>(&self) -> ClientResult<Vec<R::Record>> {
        self.api.get_json(R::KIND.path(), &[]).await
    }

    async fn run_operation<R, F>(
        &self,
        operation: Operation,
        success_message: &'static str,
        submit: F,
    ) -> SyncOutcome
    where
        R: Resource,
        F: Future<Output = ClientResult<()>>,
    {
        {
            let mut state = self.inner.lock().await;
            state.busy += 1;
            state.clear_messages();
            self.publish_status(&state);
        }

        let result = match submit.await {
            Ok(()) => self.refresh::<R>().await,
            Err(err) => Err(err),
        };

        let mut state = self.inner.lock().await;
        state.busy = state.busy.saturating_sub(1);
        let outcome = if !self.is_live() {
            SyncOutcome::Abandoned
        } else {
            match result {
                Ok((ticket, records)) => {
                    if state.replace::<R>(ticket, records) {
                        let _ = self.events.send(SyncEvent::CollectionReplaced(R::KIND));
                    }
                    state.last_success = Some(success_message.to_string());
                    info!("sync: {operation} on {} applied", R::KIND);
                    SyncOutcome::Applied
                }
                Err(ClientError::SessionExpired) => {
                    warn!("sync: {operation} on {} abandoned, session expired", R::KIND);
                    SyncOutcome::Abandoned
                }
                Err(err) => {
                    warn!("sync: {operation} on {} failed: {err}", R::KIND);
                    state.last_error = Some(err.user_message());
                    SyncOutcome::Failed
                }
            }
        };
        self.publish_status(&state);
        outcome
    }

    async fn refresh<R: Resource>(&self) -> ClientResult<(u64, Vec<R::Record>)> {
        let ticket = self.inner.lock().await.issue_ticket(R::KIND);
        let records = self.fetch_all::<R>().await?;
        Ok((ticket, records))
    }

    fn publish_status(&self, state: &SyncState) {
        let _ = self.events.send(SyncEvent::StatusChanged(state.status()));
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
