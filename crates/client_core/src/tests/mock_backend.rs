//! In-process stand-in for the console backend used by the unit tests.

use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{
    net::TcpListener,
    sync::{watch, Mutex, Semaphore},
};

pub(crate) const COMPANIES: &str = "empresas";
pub(crate) const STORES: &str = "lojas";
pub(crate) const USERS: &str = "usuarios";

const OPEN_GATE_PERMITS: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct BackendState {
    collections: HashMap<&'static str, Vec<Value>>,
    next_id: i64,
    requests: Vec<RecordedRequest>,
    failing_lists: Vec<&'static str>,
    rejection: Option<(StatusCode, Option<String>)>,
    expired: bool,
    accounts: Vec<(String, String, Value)>,
}

#[derive(Clone)]
pub(crate) struct MockBackend {
    state: Arc<Mutex<BackendState>>,
    gate: Arc<Semaphore>,
    mutations: Arc<watch::Sender<usize>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self::with_gate(OPEN_GATE_PERMITS)
    }

    /// Mutations are accepted and recorded but only answered once
    /// [`MockBackend::release`] hands out permits.
    pub(crate) fn gated() -> Self {
        Self::with_gate(0)
    }

    fn with_gate(permits: usize) -> Self {
        let (mutations, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(BackendState {
                next_id: 100,
                ..BackendState::default()
            })),
            gate: Arc::new(Semaphore::new(permits)),
            mutations: Arc::new(mutations),
        }
    }

    pub(crate) async fn seed(&self, collection: &'static str, records: Vec<Value>) {
        self.state
            .lock()
            .await
            .collections
            .insert(collection, records);
    }

    pub(crate) async fn fail_list(&self, collection: &'static str) {
        self.state.lock().await.failing_lists.push(collection);
    }

    pub(crate) async fn reject_mutations(&self, status: StatusCode, message: Option<&str>) {
        self.state.lock().await.rejection = Some((status, message.map(str::to_string)));
    }

    pub(crate) async fn expire_sessions(&self) {
        self.state.lock().await.expired = true;
    }

    pub(crate) async fn add_account(&self, email: &str, password: &str, usuario: Value) {
        self.state
            .lock()
            .await
            .accounts
            .push((email.to_string(), password.to_string(), usuario));
    }

    pub(crate) async fn collection(&self, collection: &'static str) -> Vec<Value> {
        self.state
            .lock()
            .await
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().await.requests.clone()
    }

    pub(crate) async fn mutation_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .await
            .into_iter()
            .filter(|request| request.method != "GET")
            .collect()
    }

    pub(crate) fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub(crate) async fn wait_for_mutations(&self, count: usize) {
        let mut rx = self.mutations.subscribe();
        let _ = rx.wait_for(|seen| *seen >= count).await;
    }

    /// Serves the backend on an ephemeral port and returns its API base URL.
    pub(crate) async fn spawn(&self) -> Result<String> {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = Router::new();
        let app = collection_routes(app, "/api/superadmin/empresas", COMPANIES);
        let app = collection_routes(app, "/api/lojas", STORES);
        let app = collection_routes(app, "/api/usuarios", USERS)
            .route(
                "/api/superadmin/empresas/:id/plano",
                patch(
                    |State(backend): State<MockBackend>,
                     uri: Uri,
                     headers: HeaderMap,
                     Path(id): Path<i64>,
                     Json(body): Json<Value>| async move {
                        backend.patch_field(uri, &headers, id, "plano", body).await
                    },
                ),
            )
            .route(
                "/api/superadmin/empresas/:id/ativo",
                patch(
                    |State(backend): State<MockBackend>,
                     uri: Uri,
                     headers: HeaderMap,
                     Path(id): Path<i64>,
                     Json(body): Json<Value>| async move {
                        backend.patch_field(uri, &headers, id, "ativo", body).await
                    },
                ),
            )
            .route(
                "/api/auth/login",
                post(
                    |State(backend): State<MockBackend>, Json(body): Json<Value>| async move {
                        backend.login(body).await
                    },
                ),
            )
            .with_state(self.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(format!("http://{addr}/api"))
    }

    async fn record(
        &self,
        method: &'static str,
        uri: &Uri,
        headers: &HeaderMap,
        body: Option<Value>,
    ) -> bool {
        let mut state = self.state.lock().await;
        state.requests.push(RecordedRequest {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            body,
            authorization: headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        });
        if method != "GET" {
            self.mutations.send_modify(|seen| *seen += 1);
        }
        state.expired
    }

    /// Blocks until the gate lets the mutation through, then reports a
    /// configured rejection if there is one.
    async fn admit(&self) -> Option<Response> {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        let state = self.state.lock().await;
        state
            .rejection
            .clone()
            .map(|(status, message)| error_response(status, message))
    }

    async fn list(
        &self,
        collection: &'static str,
        uri: Uri,
        headers: &HeaderMap,
        query: HashMap<String, String>,
    ) -> Response {
        if self.record("GET", &uri, headers, None).await {
            return unauthorized();
        }
        let state = self.state.lock().await;
        if state.failing_lists.contains(&collection) {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some("falha ao listar".into()),
            );
        }

        let owner = query
            .get("empresaId")
            .and_then(|raw| raw.parse::<i64>().ok());
        let records: Vec<Value> = state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|record| owner.map_or(true, |id| record["empresaId"] == json!(id)))
            .collect();
        Json(records).into_response()
    }

    async fn create(
        &self,
        collection: &'static str,
        uri: Uri,
        headers: &HeaderMap,
        mut body: Value,
    ) -> Response {
        if self.record("POST", &uri, headers, Some(body.clone())).await {
            return unauthorized();
        }
        if let Some(rejection) = self.admit().await {
            return rejection;
        }

        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = state.next_id;
        if let Some(object) = body.as_object_mut() {
            object.insert("id".into(), json!(id));
            object.remove("usuario");
            object.remove("senha");
            if collection == COMPANIES {
                object.insert("dataCriacao".into(), json!("2024-06-01T10:00:00"));
            }
        }
        state
            .collections
            .entry(collection)
            .or_default()
            .push(body.clone());
        (StatusCode::CREATED, Json(body)).into_response()
    }

    async fn update(
        &self,
        collection: &'static str,
        uri: Uri,
        headers: &HeaderMap,
        id: i64,
        body: Value,
    ) -> Response {
        if self.record("PUT", &uri, headers, Some(body.clone())).await {
            return unauthorized();
        }
        if let Some(rejection) = self.admit().await {
            return rejection;
        }

        let mut state = self.state.lock().await;
        let Some(record) = find_mut(&mut state.collections, collection, id) else {
            return not_found();
        };
        if let (Some(target), Some(changes)) = (record.as_object_mut(), body.as_object()) {
            for (key, value) in changes {
                if key != "id" {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        Json(record.clone()).into_response()
    }

    async fn remove(
        &self,
        collection: &'static str,
        uri: Uri,
        headers: &HeaderMap,
        id: i64,
    ) -> Response {
        if self.record("DELETE", &uri, headers, None).await {
            return unauthorized();
        }
        if let Some(rejection) = self.admit().await {
            return rejection;
        }

        let mut state = self.state.lock().await;
        let records = state.collections.entry(collection).or_default();
        let before = records.len();
        records.retain(|record| record["id"] != json!(id));
        if records.len() == before {
            return not_found();
        }
        StatusCode::NO_CONTENT.into_response()
    }

    async fn patch_field(
        &self,
        uri: Uri,
        headers: &HeaderMap,
        id: i64,
        field: &str,
        body: Value,
    ) -> Response {
        if self.record("PATCH", &uri, headers, Some(body.clone())).await {
            return unauthorized();
        }
        if let Some(rejection) = self.admit().await {
            return rejection;
        }

        let mut state = self.state.lock().await;
        let Some(record) = find_mut(&mut state.collections, COMPANIES, id) else {
            return not_found();
        };
        record[field] = body[field].clone();
        Json(record.clone()).into_response()
    }

    async fn login(&self, body: Value) -> Response {
        let state = self.state.lock().await;
        let account = state.accounts.iter().find(|(email, password, _)| {
            body["email"] == json!(email) && body["senha"] == json!(password)
        });
        match account {
            Some((_, _, usuario)) => Json(json!({
                "token": format!("token-{}", usuario["id"]),
                "usuario": usuario,
            }))
            .into_response(),
            None => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Credenciais inválidas"})),
            )
                .into_response(),
        }
    }
}

fn collection_routes(
    router: Router<MockBackend>,
    base: &'static str,
    collection: &'static str,
) -> Router<MockBackend> {
    router
        .route(
            base,
            get(
                move |State(backend): State<MockBackend>,
                      uri: Uri,
                      headers: HeaderMap,
                      Query(query): Query<HashMap<String, String>>| async move {
                    backend.list(collection, uri, &headers, query).await
                },
            )
            .post(
                move |State(backend): State<MockBackend>,
                      uri: Uri,
                      headers: HeaderMap,
                      Json(body): Json<Value>| async move {
                    backend.create(collection, uri, &headers, body).await
                },
            ),
        )
        .route(
            &format!("{base}/:id"),
            put(
                move |State(backend): State<MockBackend>,
                      uri: Uri,
                      headers: HeaderMap,
                      Path(id): Path<i64>,
                      Json(body): Json<Value>| async move {
                    backend.update(collection, uri, &headers, id, body).await
                },
            )
            .delete(
                move |State(backend): State<MockBackend>,
                      uri: Uri,
                      headers: HeaderMap,
                      Path(id): Path<i64>| async move {
                    backend.remove(collection, uri, &headers, id).await
                },
            ),
        )
}

fn find_mut<'a>(
    collections: &'a mut HashMap<&'static str, Vec<Value>>,
    collection: &'static str,
    id: i64,
) -> Option<&'a mut Value> {
    collections
        .get_mut(collection)?
        .iter_mut()
        .find(|record| record["id"] == json!(id))
}

fn error_response(status: StatusCode, message: Option<String>) -> Response {
    match message {
        Some(message) => (status, Json(json!({ "message": message }))).into_response(),
        None => status.into_response(),
    }
}

fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, Some("Registro não encontrado".into()))
}

fn unauthorized() -> Response {
    error_response(StatusCode::UNAUTHORIZED, Some("Token inválido".into()))
}

pub(crate) fn company_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "nome": name,
        "cnpj": format!("{:014}", id),
        "email": format!("contato{id}@example.com"),
        "plano": "BASIC",
        "ativo": true
    })
}

pub(crate) fn store_json(id: i64, name: &str, company_id: i64) -> Value {
    json!({"id": id, "nome": name, "empresaId": company_id})
}

pub(crate) fn user_json(id: i64, name: &str, company_id: i64) -> Value {
    json!({
        "id": id,
        "nome": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "role": "ADMIN",
        "empresaId": company_id
    })
}
