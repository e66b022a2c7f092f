//! The three managed collections and the REST routes behind them.

use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use shared::domain::{
    Company, CompanyDraft, CompanyEdit, CompanyId, Store, StoreDraft, StoreId, User, UserDraft,
    UserId,
};

use crate::sync::Collections;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Companies,
    Stores,
    Users,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [
        CollectionKind::Companies,
        CollectionKind::Stores,
        CollectionKind::Users,
    ];

    pub fn path(self) -> &'static str {
        match self {
            CollectionKind::Companies => "superadmin/empresas",
            CollectionKind::Stores => "lojas",
            CollectionKind::Users => "usuarios",
        }
    }

    pub fn item_path(self, id: impl fmt::Display) -> String {
        format!("{}/{id}", self.path())
    }

    pub fn saved_message(self) -> &'static str {
        match self {
            CollectionKind::Companies => "Empresa salva com sucesso!",
            CollectionKind::Stores => "Loja salva com sucesso!",
            CollectionKind::Users => "Usuário salvo com sucesso!",
        }
    }

    pub fn deleted_message(self) -> &'static str {
        match self {
            CollectionKind::Companies => "Empresa excluída!",
            CollectionKind::Stores => "Loja excluída!",
            CollectionKind::Users => "Usuário excluído!",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            CollectionKind::Companies => 0,
            CollectionKind::Stores => 1,
            CollectionKind::Users => 2,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollectionKind::Companies => "companies",
            CollectionKind::Stores => "stores",
            CollectionKind::Users => "users",
        })
    }
}

/// Binds a collection to its record, identity and request body types.
pub trait Resource: Send + Sync + 'static {
    type Record: DeserializeOwned + Clone + Send + Sync + 'static;
    type Id: Copy + fmt::Display + Send + Sync;
    type CreateBody: Serialize + Send + Sync;
    type UpdateBody: Serialize + Send + Sync;

    const KIND: CollectionKind;

    fn slot(collections: &mut Collections) -> &mut Vec<Self::Record>;
}

pub struct Companies;
pub struct Stores;
pub struct Users;

impl Resource for Companies {
    type Record = Company;
    type Id = CompanyId;
    type CreateBody = CompanyDraft;
    type UpdateBody = CompanyEdit;

    const KIND: CollectionKind = CollectionKind::Companies;

    fn slot(collections: &mut Collections) -> &mut Vec<Company> {
        &mut collections.companies
    }
}

impl Resource for Stores {
    type Record = Store;
    type Id = StoreId;
    type CreateBody = StoreDraft;
    type UpdateBody = StoreDraft;

    const KIND: CollectionKind = CollectionKind::Stores;

    fn slot(collections: &mut Collections) -> &mut Vec<Store> {
        &mut collections.stores
    }
}

impl Resource for Users {
    type Record = User;
    type Id = UserId;
    type CreateBody = UserDraft;
    type UpdateBody = UserDraft;

    const KIND: CollectionKind = CollectionKind::Users;

    fn slot(collections: &mut Collections) -> &mut Vec<User> {
        &mut collections.users
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

/// A single change to one collection. Creation never carries an id; update
/// and delete always target one.
pub enum Mutation<R: Resource> {
    Create(R::CreateBody),
    Update { id: R::Id, body: R::UpdateBody },
    Delete { id: R::Id },
}

impl<R: Resource> Mutation<R> {
    pub fn operation(&self) -> Operation {
        match self {
            Mutation::Create(_) => Operation::Create,
            Mutation::Update { .. } => Operation::Update,
            Mutation::Delete { .. } => Operation::Delete,
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Mutation::Delete { .. } => R::KIND.deleted_message(),
            _ => R::KIND.saved_message(),
        }
    }
}

impl<R, B> Mutation<R>
where
    R: Resource<CreateBody = B, UpdateBody = B>,
{
    /// Form submission: an edited record carries its id, a new one does not.
    pub fn save(id: Option<R::Id>, body: B) -> Self {
        match id {
            Some(id) => Mutation::Update { id, body },
            None => Mutation::Create(body),
        }
    }
}
